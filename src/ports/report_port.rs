//! Result output port trait.

use crate::domain::error::SigallocError;
use crate::domain::optimizer::PortfolioWeights;
use crate::domain::risk_analysis::RiskReport;

/// Port for handing results to downstream collaborators.
pub trait ReportPort {
    fn write_weights(&mut self, weights: &PortfolioWeights) -> Result<(), SigallocError>;

    fn write_risk_report(&mut self, report: &RiskReport) -> Result<(), SigallocError>;
}
