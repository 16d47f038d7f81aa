// Justification calculation module
pub mod aggregate;
pub mod justification;

pub use aggregate::{
    dashboard_stats, company_totals, dossier_totals, ActionFilter, CompanyBreakdown,
    CompanyTotals, DashboardStats, DossierTotals, TreasuryPlan, ADVANCE_RATE,
};
pub use justification::calculate;
