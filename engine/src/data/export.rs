// Flattens actions, inputs and freshly computed results into one tabular
// report. The same row layout doubles as the backup format the importer can
// restore from.
use crate::calc::justification::calculate;
use crate::error::EngineError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::models::{
    ActionStatus, DirectCosts, JustificationInput, TrainingAction,
};
use std::collections::HashMap;
use std::io::Write;

/// One exported row. Every engine output field is present; nothing derived
/// is needed to read the file back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Dossier")]
    pub dossier: String,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Center")]
    pub center: String,
    #[serde(rename = "Action Code")]
    pub action_code: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Start Date")]
    pub start_date: Option<String>,
    #[serde(rename = "End Date")]
    pub end_date: Option<String>,
    #[serde(rename = "Actual Start Date")]
    pub actual_start_date: Option<String>,
    #[serde(rename = "Actual End Date")]
    pub actual_end_date: Option<String>,
    #[serde(rename = "Instructor")]
    pub instructor: Option<String>,
    #[serde(rename = "Hours")]
    pub hours: f64,
    #[serde(rename = "Module (EUR/h)")]
    pub economic_module: f64,
    #[serde(rename = "Granted Students")]
    pub granted_students: u32,
    #[serde(rename = "Finished Students")]
    pub finished_students: u32,
    #[serde(rename = "Granted Amount")]
    pub max_granted_amount: f64,
    #[serde(rename = "Real Financeable Amount")]
    pub real_financeable_amount: f64,
    #[serde(rename = "A1 Personnel")]
    pub personnel: f64,
    #[serde(rename = "A2 Teaching Materials")]
    pub teaching_materials: f64,
    #[serde(rename = "A3 Equipment Amortization")]
    pub equipment_amortization: f64,
    #[serde(rename = "A4 Classroom Rental")]
    pub classroom_rental: f64,
    #[serde(rename = "A5 Equipment Rental")]
    pub equipment_rental: f64,
    #[serde(rename = "A6 Insurance")]
    pub insurance: f64,
    #[serde(rename = "A7 Advertising")]
    pub advertising: f64,
    #[serde(rename = "A8 Recruitment")]
    pub recruitment: f64,
    #[serde(rename = "A9 Other Direct Costs")]
    pub other: f64,
    #[serde(rename = "Total Direct Costs")]
    pub total_direct_costs: f64,
    #[serde(rename = "Claimed Indirect Costs")]
    pub claimed_indirect_costs: f64,
    #[serde(rename = "Indirect Cost Limit (10%)")]
    pub indirect_cost_limit: f64,
    #[serde(rename = "Recognized Indirect Costs")]
    pub recognized_indirect_costs: f64,
    #[serde(rename = "Total Recognized Costs")]
    pub total_recognized_costs: f64,
    #[serde(rename = "Deviation")]
    pub deviation: f64,
    #[serde(rename = "Result")]
    pub result: String,
    #[serde(rename = "Paid Amount")]
    pub paid_amount: f64,
    #[serde(rename = "Pending Payment")]
    pub pending_payment: f64,
    #[serde(rename = "Notes")]
    pub notes: Option<String>,
}

impl ReportRow {
    pub fn build(action: &TrainingAction, input: Option<&JustificationInput>) -> Self {
        let result = input.map(|i| calculate(action, i));

        ReportRow {
            id: action.id.clone(),
            dossier: action.dossier.clone(),
            company: action.company.clone(),
            center: action.center.clone(),
            action_code: action.action_code.clone(),
            title: action.title.clone(),
            status: input
                .map(|i| i.status.to_string())
                .unwrap_or_else(|| ActionStatus::Pending.to_string()),
            start_date: action.start_date.clone(),
            end_date: action.end_date.clone(),
            actual_start_date: input.and_then(|i| i.actual_start_date.clone()),
            actual_end_date: input.and_then(|i| i.actual_end_date.clone()),
            instructor: action.instructor.clone(),
            hours: action.hours,
            economic_module: action.economic_module,
            granted_students: action.granted_students,
            // An untouched action is reported at its granted headcount.
            finished_students: input
                .map(|i| i.finished_students)
                .unwrap_or(action.granted_students),
            max_granted_amount: action.max_granted_amount,
            real_financeable_amount: result
                .as_ref()
                .map(|r| r.real_financeable_amount)
                .unwrap_or(0.0),
            personnel: input.map(|i| i.direct_costs.personnel).unwrap_or(0.0),
            teaching_materials: input
                .map(|i| i.direct_costs.teaching_materials)
                .unwrap_or(0.0),
            equipment_amortization: input
                .map(|i| i.direct_costs.equipment_amortization)
                .unwrap_or(0.0),
            classroom_rental: input.map(|i| i.direct_costs.classroom_rental).unwrap_or(0.0),
            equipment_rental: input.map(|i| i.direct_costs.equipment_rental).unwrap_or(0.0),
            insurance: input.map(|i| i.direct_costs.insurance).unwrap_or(0.0),
            advertising: input.map(|i| i.direct_costs.advertising).unwrap_or(0.0),
            recruitment: input.map(|i| i.direct_costs.recruitment).unwrap_or(0.0),
            other: input.map(|i| i.direct_costs.other).unwrap_or(0.0),
            total_direct_costs: result.as_ref().map(|r| r.total_direct_costs).unwrap_or(0.0),
            claimed_indirect_costs: result
                .as_ref()
                .map(|r| r.claimed_indirect_costs)
                .unwrap_or(0.0),
            indirect_cost_limit: result.as_ref().map(|r| r.indirect_cost_limit).unwrap_or(0.0),
            recognized_indirect_costs: result
                .as_ref()
                .map(|r| r.recognized_indirect_costs)
                .unwrap_or(0.0),
            total_recognized_costs: result
                .as_ref()
                .map(|r| r.total_recognized_costs)
                .unwrap_or(0.0),
            deviation: result.as_ref().map(|r| r.deviation).unwrap_or(0.0),
            result: result
                .as_ref()
                .map(|r| r.status.to_string())
                .unwrap_or_else(|| "PENDING".to_string()),
            paid_amount: input.map(|i| i.paid_amount).unwrap_or(0.0),
            pending_payment: result.as_ref().map(|r| r.pending_payment).unwrap_or(0.0),
            notes: input.and_then(|i| i.notes.clone()),
        }
    }

    /// Splits a row back into an action and, when the row shows any
    /// justification activity, the input that produced it.
    pub fn into_parts(self) -> (TrainingAction, Option<JustificationInput>) {
        let status: ActionStatus = self.status.parse().unwrap_or_default();

        let direct_costs = DirectCosts {
            personnel: self.personnel,
            teaching_materials: self.teaching_materials,
            equipment_amortization: self.equipment_amortization,
            classroom_rental: self.classroom_rental,
            equipment_rental: self.equipment_rental,
            insurance: self.insurance,
            advertising: self.advertising,
            recruitment: self.recruitment,
            other: self.other,
        };

        let has_activity = status != ActionStatus::Pending
            || direct_costs.total() > 0.0
            || self.claimed_indirect_costs > 0.0
            || self.paid_amount > 0.0
            || self.notes.as_deref().is_some_and(|n| !n.trim().is_empty());

        let action = TrainingAction {
            id: self.id.clone(),
            dossier: self.dossier,
            company: self.company,
            center: self.center,
            action_code: self.action_code,
            title: self.title,
            hours: self.hours,
            granted_students: self.granted_students,
            economic_module: self.economic_module,
            max_granted_amount: self.max_granted_amount,
            start_date: self.start_date,
            end_date: self.end_date,
            instructor: self.instructor,
        };

        let input = has_activity.then(|| JustificationInput {
            action_id: self.id,
            status,
            actual_start_date: self.actual_start_date,
            actual_end_date: self.actual_end_date,
            finished_students: self.finished_students,
            direct_costs,
            indirect_costs: self.claimed_indirect_costs,
            paid_amount: self.paid_amount,
            notes: self.notes,
        });

        (action, input)
    }
}

/// Writes the full report, one row per action, inputs and results inlined.
pub fn write_report<W: Write>(
    writer: W,
    actions: &[TrainingAction],
    inputs: &HashMap<String, JustificationInput>,
) -> Result<(), EngineError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for action in actions {
        wtr.serialize(ReportRow::build(action, inputs.get(&action.id)))?;
    }
    wtr.flush()?;
    tracing::info!(actions = actions.len(), "Report exported");
    Ok(())
}

pub fn default_report_filename(date: NaiveDate) -> String {
    format!("justification_report_{}.csv", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ActionStatus;

    fn sample_action() -> TrainingAction {
        TrainingAction {
            id: "EXP-1-AF-1".to_string(),
            dossier: "EXP-1".to_string(),
            company: "ACME SL".to_string(),
            center: "Centro Norte".to_string(),
            action_code: "AF-1".to_string(),
            title: "Soldadura básica".to_string(),
            hours: 100.0,
            granted_students: 10,
            economic_module: 5.0,
            max_granted_amount: 5000.0,
            start_date: Some("01/02/2026".to_string()),
            end_date: None,
            instructor: Some("J. Pérez".to_string()),
        }
    }

    fn sample_input() -> JustificationInput {
        JustificationInput {
            action_id: "EXP-1-AF-1".to_string(),
            status: ActionStatus::Finished,
            actual_start_date: Some("03/02/2026".to_string()),
            actual_end_date: None,
            finished_students: 8,
            direct_costs: DirectCosts {
                personnel: 3000.0,
                ..DirectCosts::default()
            },
            indirect_costs: 200.0,
            paid_amount: 1000.0,
            notes: Some("primer pago".to_string()),
        }
    }

    #[test]
    fn test_report_row_carries_computed_result() {
        let row = ReportRow::build(&sample_action(), Some(&sample_input()));
        assert_eq!(row.real_financeable_amount, 4000.0);
        assert_eq!(row.total_recognized_costs, 3200.0);
        assert_eq!(row.result, "OK");
        assert_eq!(row.pending_payment, 2200.0);
    }

    #[test]
    fn test_report_row_without_input_is_pending() {
        let row = ReportRow::build(&sample_action(), None);
        assert_eq!(row.status, "PENDING");
        assert_eq!(row.result, "PENDING");
        assert_eq!(row.finished_students, 10);
        assert_eq!(row.total_recognized_costs, 0.0);
    }

    #[test]
    fn test_into_parts_restores_input_when_active() {
        let row = ReportRow::build(&sample_action(), Some(&sample_input()));
        let (action, input) = row.into_parts();
        let input = input.expect("justified row must yield an input");

        assert_eq!(action.id, "EXP-1-AF-1");
        assert_eq!(input.status, ActionStatus::Finished);
        assert_eq!(input.finished_students, 8);
        assert_eq!(input.direct_costs.personnel, 3000.0);
        assert_eq!(input.indirect_costs, 200.0);
        assert_eq!(input.paid_amount, 1000.0);
    }

    #[test]
    fn test_into_parts_skips_untouched_rows() {
        let row = ReportRow::build(&sample_action(), None);
        let (_, input) = row.into_parts();
        assert!(input.is_none());
    }

    #[test]
    fn test_write_report_emits_headers_and_rows() {
        let actions = vec![sample_action()];
        let mut inputs = HashMap::new();
        inputs.insert("EXP-1-AF-1".to_string(), sample_input());

        let mut buf = Vec::new();
        write_report(&mut buf, &actions, &inputs).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("ID,"));
        assert!(header.contains("Recognized Indirect Costs"));
        let row = lines.next().unwrap();
        assert!(row.contains("EXP-1-AF-1"));
        assert!(row.contains("OK"));
    }

    #[test]
    fn test_default_report_filename() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(
            default_report_filename(date),
            "justification_report_2026-08-06.csv"
        );
    }
}
