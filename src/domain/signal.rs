//! Analyst signals and their reduction into expected-return scores.
//!
//! Each analyst agent emits at most one [`Signal`] per ticker. The aggregator
//! sums signed confidences across agents and rescales by 100, so a ticker with
//! unanimous full-confidence bullish calls from `k` agents scores `k`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Confidence values are expressed on a 0..=100 scale.
pub const CONFIDENCE_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SignalLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl SignalLabel {
    /// +1 for bullish, -1 for bearish, 0 for neutral.
    pub fn direction(self) -> f64 {
        match self {
            SignalLabel::Bullish => 1.0,
            SignalLabel::Bearish => -1.0,
            SignalLabel::Neutral => 0.0,
        }
    }
}

impl fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalLabel::Bullish => "bullish",
            SignalLabel::Bearish => "bearish",
            SignalLabel::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for SignalLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bullish" => Ok(SignalLabel::Bullish),
            "bearish" => Ok(SignalLabel::Bearish),
            "neutral" => Ok(SignalLabel::Neutral),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signal {
    pub label: SignalLabel,
    pub confidence: f64,
}

impl Signal {
    pub fn new(label: SignalLabel, confidence: f64) -> Self {
        Self { label, confidence }
    }

    pub fn bullish(confidence: f64) -> Self {
        Self::new(SignalLabel::Bullish, confidence)
    }

    pub fn bearish(confidence: f64) -> Self {
        Self::new(SignalLabel::Bearish, confidence)
    }

    pub fn neutral(confidence: f64) -> Self {
        Self::new(SignalLabel::Neutral, confidence)
    }

    /// Signed confidence: `+confidence`, `-confidence` or `0`.
    pub fn contribution(&self) -> f64 {
        self.label.direction() * self.confidence
    }
}

/// Signals keyed by agent, then by ticker.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregatedSignals {
    agents: BTreeMap<String, HashMap<String, Signal>>,
}

impl AggregatedSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `signal` for `ticker` from `agent`, replacing any earlier one.
    pub fn insert(&mut self, agent: &str, ticker: &str, signal: Signal) {
        self.agents
            .entry(agent.to_string())
            .or_default()
            .insert(ticker.to_string(), signal);
    }

    pub fn with_signal(mut self, agent: &str, ticker: &str, signal: Signal) -> Self {
        self.insert(agent, ticker, signal);
        self
    }

    pub fn get(&self, agent: &str, ticker: &str) -> Option<&Signal> {
        self.agents.get(agent).and_then(|m| m.get(ticker))
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.values().all(HashMap::is_empty)
    }

    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    /// Expected-return score for one ticker. Agents without a signal for the
    /// ticker contribute nothing.
    pub fn score(&self, ticker: &str) -> f64 {
        let total: f64 = self
            .agents
            .values()
            .filter_map(|signals| signals.get(ticker))
            .map(Signal::contribution)
            .sum();
        total / CONFIDENCE_SCALE
    }

    /// One score per ticker, in the order given.
    pub fn expected_returns(&self, tickers: &[String]) -> Vec<f64> {
        tickers.iter().map(|t| self.score(t)).collect()
    }
}
