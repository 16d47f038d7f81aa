use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One funded course run under a dossier. Immutable after import; user
/// corrections go through [`JustificationInput`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingAction {
    /// Stable identity, normally `"{dossier}-{action_code}"` with whitespace
    /// removed so repeated imports of the same action merge onto one record.
    pub id: String,
    pub dossier: String,
    pub company: String,
    pub center: String,
    pub action_code: String,
    pub title: String,
    pub hours: f64,
    pub granted_students: u32,
    /// Rate in euros per student-hour.
    pub economic_module: f64,
    /// Contractual ceiling. The engine does not enforce it against the
    /// computed financeable amount.
    pub max_granted_amount: f64,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
}

impl TrainingAction {
    /// Derives the stable identity for a dossier/action-code pair. Falls back
    /// to a row-based marker when either part is missing.
    pub fn derive_id(dossier: &str, action_code: &str, row: usize) -> String {
        if dossier.trim().is_empty() || action_code.trim().is_empty() {
            return format!("GEN-{row}");
        }
        format!("{dossier}-{action_code}")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    }
}

/// Execution status of an action, as recorded by the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Pending,
    InExecution,
    Finished,
    NotExecutable,
}

impl Default for ActionStatus {
    fn default() -> Self {
        ActionStatus::Pending
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionStatus::Pending => "PENDING",
            ActionStatus::InExecution => "IN_EXECUTION",
            ActionStatus::Finished => "FINISHED",
            ActionStatus::NotExecutable => "NOT_EXECUTABLE",
        };
        f.write_str(s)
    }
}

impl FromStr for ActionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(ActionStatus::Pending),
            "IN_EXECUTION" => Ok(ActionStatus::InExecution),
            "FINISHED" => Ok(ActionStatus::Finished),
            "NOT_EXECUTABLE" => Ok(ActionStatus::NotExecutable),
            other => Err(format!("unknown action status '{other}'")),
        }
    }
}

/// The nine eligible direct-cost buckets (A1-A9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectCosts {
    #[serde(default)]
    pub personnel: f64,
    #[serde(default)]
    pub teaching_materials: f64,
    #[serde(default)]
    pub equipment_amortization: f64,
    #[serde(default)]
    pub classroom_rental: f64,
    #[serde(default)]
    pub equipment_rental: f64,
    #[serde(default)]
    pub insurance: f64,
    #[serde(default)]
    pub advertising: f64,
    #[serde(default)]
    pub recruitment: f64,
    #[serde(default)]
    pub other: f64,
}

impl DirectCosts {
    pub fn buckets(&self) -> [f64; 9] {
        [
            self.personnel,
            self.teaching_materials,
            self.equipment_amortization,
            self.classroom_rental,
            self.equipment_rental,
            self.insurance,
            self.advertising,
            self.recruitment,
            self.other,
        ]
    }

    pub fn total(&self) -> f64 {
        self.buckets().iter().sum()
    }
}

/// User-recorded execution data for one action. At most one per action;
/// each save fully replaces the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JustificationInput {
    pub action_id: String,
    #[serde(default)]
    pub status: ActionStatus,
    #[serde(default)]
    pub actual_start_date: Option<String>,
    #[serde(default)]
    pub actual_end_date: Option<String>,
    #[serde(default)]
    pub finished_students: u32,
    #[serde(default)]
    pub direct_costs: DirectCosts,
    #[serde(default)]
    pub indirect_costs: f64,
    #[serde(default)]
    pub paid_amount: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl JustificationInput {
    /// Student count that enters the financing formula: a non-executable
    /// action always counts as zero, whatever was typed in.
    pub fn effective_students(&self) -> u32 {
        if self.status == ActionStatus::NotExecutable {
            0
        } else {
            self.finished_students
        }
    }
}

/// Outcome classification of a justification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Ok,
    IndirectAdjusted,
    Exceeded,
    AdjustedAndExceeded,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResultStatus::Ok => "OK",
            ResultStatus::IndirectAdjusted => "INDIRECT_ADJUSTED",
            ResultStatus::Exceeded => "EXCEEDED",
            ResultStatus::AdjustedAndExceeded => "ADJUSTED_AND_EXCEEDED",
        };
        f.write_str(s)
    }
}

impl FromStr for ResultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OK" => Ok(ResultStatus::Ok),
            "INDIRECT_ADJUSTED" => Ok(ResultStatus::IndirectAdjusted),
            "EXCEEDED" => Ok(ResultStatus::Exceeded),
            "ADJUSTED_AND_EXCEEDED" => Ok(ResultStatus::AdjustedAndExceeded),
            other => Err(format!("unknown result status '{other}'")),
        }
    }
}

/// Derived figures for one action. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JustificationResult {
    /// Eligibility ceiling earned by actual execution:
    /// hours x effective students x economic module.
    pub real_financeable_amount: f64,
    pub total_direct_costs: f64,
    /// Raw user-entered indirect amount, before the cap.
    pub claimed_indirect_costs: f64,
    /// 10% cap, computed over the claimed (pre-cap) total.
    pub indirect_cost_limit: f64,
    pub recognized_indirect_costs: f64,
    pub total_recognized_costs: f64,
    /// Direct + claimed indirect. Treasury figures use this, not the
    /// recognized total.
    pub total_claimed_costs: f64,
    /// Financeable minus recognized. Negative means ineligible over-spend.
    pub deviation: f64,
    pub status: ResultStatus,
    pub pending_payment: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_id_strips_whitespace() {
        assert_eq!(
            TrainingAction::derive_id("EXP 2024/01", "AF 03", 7),
            "EXP2024/01-AF03"
        );
    }

    #[test]
    fn derive_id_falls_back_when_parts_missing() {
        assert_eq!(TrainingAction::derive_id("", "AF-03", 7), "GEN-7");
        assert_eq!(TrainingAction::derive_id("EXP-1", "  ", 12), "GEN-12");
    }

    #[test]
    fn direct_costs_total_sums_all_nine_buckets() {
        let costs = DirectCosts {
            personnel: 1.0,
            teaching_materials: 2.0,
            equipment_amortization: 3.0,
            classroom_rental: 4.0,
            equipment_rental: 5.0,
            insurance: 6.0,
            advertising: 7.0,
            recruitment: 8.0,
            other: 9.0,
        };
        assert_eq!(costs.total(), 45.0);
    }

    #[test]
    fn effective_students_zeroed_for_not_executable() {
        let input = JustificationInput {
            action_id: "A".to_string(),
            status: ActionStatus::NotExecutable,
            actual_start_date: None,
            actual_end_date: None,
            finished_students: 14,
            direct_costs: DirectCosts::default(),
            indirect_costs: 0.0,
            paid_amount: 0.0,
            notes: None,
        };
        assert_eq!(input.effective_students(), 0);
    }

    #[test]
    fn status_round_trips_through_wire_spelling() {
        for status in [
            ActionStatus::Pending,
            ActionStatus::InExecution,
            ActionStatus::Finished,
            ActionStatus::NotExecutable,
        ] {
            assert_eq!(status.to_string().parse::<ActionStatus>().unwrap(), status);
        }
    }
}
