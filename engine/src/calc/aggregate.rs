// Fold semantics for dashboards and company/dossier summaries. State is
// passed in explicitly: the action list and the input map are owned by the
// caller, never by this module.
use crate::calc::justification::calculate;
use shared::models::{ActionStatus, JustificationInput, TrainingAction};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Fixed advance-payment convention: 70% of the granted amount is disbursed
/// up front.
pub const ADVANCE_RATE: f64 = 0.70;

/// Caller-side view filter. An action with no recorded input counts as
/// Pending for status matching.
#[derive(Debug, Clone, Default)]
pub struct ActionFilter {
    pub company: Option<String>,
    pub dossier: Option<String>,
    pub status: Option<ActionStatus>,
    pub search: Option<String>,
}

impl ActionFilter {
    pub fn matches(&self, action: &TrainingAction, input: Option<&JustificationInput>) -> bool {
        if let Some(company) = &self.company {
            if &action.company != company {
                return false;
            }
        }
        if let Some(dossier) = &self.dossier {
            if &action.dossier != dossier {
                return false;
            }
        }
        if let Some(status) = self.status {
            let actual = input.map(|i| i.status).unwrap_or(ActionStatus::Pending);
            if actual != status {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            if !term.is_empty()
                && !action.title.to_lowercase().contains(&term)
                && !action.action_code.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        true
    }
}

/// Per-company slice of the dashboard totals.
#[derive(Debug, Clone, Default)]
pub struct CompanyBreakdown {
    pub granted: f64,
    pub financeable_real: f64,
    pub recognized: f64,
    pub dossiers: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardStats {
    pub total_granted: f64,
    pub total_financeable_real: f64,
    pub total_recognized: f64,
    pub total_granted_students: u32,
    pub total_finished_students: u32,
    pub justified_actions: usize,
    pub total_actions: usize,
    /// Finished / granted students, as a percentage. 0 when nothing granted.
    pub retention_rate: f64,
    pub companies: BTreeMap<String, CompanyBreakdown>,
}

fn retention_rate(finished: u32, granted: u32) -> f64 {
    if granted == 0 {
        0.0
    } else {
        finished as f64 / granted as f64 * 100.0
    }
}

/// Folds per-action results into dashboard totals. An action with no input
/// has not been downgraded by reality yet, so it contributes its nominal
/// granted figures to the financeable and finished-students totals.
pub fn dashboard_stats(
    actions: &[TrainingAction],
    inputs: &HashMap<String, JustificationInput>,
    filter: &ActionFilter,
) -> DashboardStats {
    let mut stats = DashboardStats::default();

    for action in actions {
        let input = inputs.get(&action.id);
        if !filter.matches(action, input) {
            continue;
        }

        stats.total_actions += 1;
        stats.total_granted += action.max_granted_amount;
        stats.total_granted_students += action.granted_students;

        let company = stats.companies.entry(action.company.clone()).or_default();
        company.granted += action.max_granted_amount;
        company.dossiers.insert(action.dossier.clone());

        match input {
            Some(input) => {
                stats.justified_actions += 1;
                let result = calculate(action, input);

                stats.total_financeable_real += result.real_financeable_amount;
                stats.total_recognized += result.total_recognized_costs;
                stats.total_finished_students += input.effective_students();

                company.financeable_real += result.real_financeable_amount;
                company.recognized += result.total_recognized_costs;
            }
            None => {
                stats.total_financeable_real += action.max_granted_amount;
                stats.total_finished_students += action.granted_students;

                company.financeable_real += action.max_granted_amount;
            }
        }
    }

    stats.retention_rate =
        retention_rate(stats.total_finished_students, stats.total_granted_students);
    stats
}

/// Treasury planning overlay derived from already-folded totals.
#[derive(Debug, Clone, PartialEq)]
pub struct TreasuryPlan {
    /// 70% of the granted amount, disbursed up front.
    pub advance: f64,
    /// Recognized minus advance: positive is still to collect, negative is
    /// to give back.
    pub settlement: f64,
    /// Advance minus what was actually paid out.
    pub cash_balance: f64,
}

impl TreasuryPlan {
    pub fn from_totals(granted: f64, recognized: f64, paid: f64) -> Self {
        let advance = granted * ADVANCE_RATE;
        TreasuryPlan {
            advance,
            settlement: recognized - advance,
            cash_balance: advance - paid,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompanyTotals {
    pub granted: f64,
    pub recognized: f64,
    pub paid: f64,
    pub pending_payment: f64,
    pub granted_students: u32,
    pub finished_students: u32,
    pub retention_rate: f64,
    pub actions: usize,
    pub dossiers: BTreeSet<String>,
}

impl CompanyTotals {
    pub fn treasury(&self) -> TreasuryPlan {
        TreasuryPlan::from_totals(self.granted, self.recognized, self.paid)
    }
}

/// Executive summary for one company, over its full (unfiltered) action set.
pub fn company_totals(
    actions: &[TrainingAction],
    inputs: &HashMap<String, JustificationInput>,
    company: &str,
) -> CompanyTotals {
    let mut totals = CompanyTotals::default();

    for action in actions.iter().filter(|a| a.company == company) {
        totals.actions += 1;
        totals.granted += action.max_granted_amount;
        totals.granted_students += action.granted_students;
        totals.dossiers.insert(action.dossier.clone());

        match inputs.get(&action.id) {
            Some(input) => {
                let result = calculate(action, input);
                totals.recognized += result.total_recognized_costs;
                totals.paid += input.paid_amount;
                totals.pending_payment += result.pending_payment;
                totals.finished_students += input.effective_students();
            }
            None => {
                totals.finished_students += action.granted_students;
            }
        }
    }

    totals.retention_rate = retention_rate(totals.finished_students, totals.granted_students);
    totals
}

#[derive(Debug, Clone, Default)]
pub struct DossierTotals {
    pub granted: f64,
    pub recognized: f64,
    pub paid: f64,
    pub pending_payment: f64,
    pub actions: usize,
}

impl DossierTotals {
    pub fn treasury(&self) -> TreasuryPlan {
        TreasuryPlan::from_totals(self.granted, self.recognized, self.paid)
    }
}

/// Same fold scoped to a single dossier.
pub fn dossier_totals(
    actions: &[TrainingAction],
    inputs: &HashMap<String, JustificationInput>,
    dossier: &str,
) -> DossierTotals {
    let mut totals = DossierTotals::default();

    for action in actions.iter().filter(|a| a.dossier == dossier) {
        totals.actions += 1;
        totals.granted += action.max_granted_amount;

        if let Some(input) = inputs.get(&action.id) {
            let result = calculate(action, input);
            totals.recognized += result.total_recognized_costs;
            totals.paid += input.paid_amount;
            totals.pending_payment += result.pending_payment;
        }
    }

    totals
}
