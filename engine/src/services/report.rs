// Narrative-report boundary: builds an auditor-voiced prompt from a
// computed result and sends it to an external text-generation service.
// Strictly downstream of the numeric engine; a failed call never blocks
// the figures.
use crate::config::settings::EngineSettings;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use shared::models::{JustificationInput, JustificationResult, TrainingAction};

/// Assembles the generation prompt. Only the computed result fields and the
/// action's identifying data go out; no internal state.
pub fn build_report_prompt(
    action: &TrainingAction,
    input: &JustificationInput,
    result: &JustificationResult,
) -> String {
    format!(
        "Role: you are an expert auditor of publicly subsidized vocational \
training, reviewing the economic justification of one training action.\n\
Business rules: the real financeable amount is hours x finished students x \
economic module; indirect costs are recognized up to 10% of the claimed \
total (direct + claimed indirect) and clipped to that limit when exceeded.\n\
\n\
ACTION DATA:\n\
- Dossier: {dossier}\n\
- Action: {code} - {title}\n\
- Hours: {hours}\n\
- Students (granted/finished): {granted} / {finished}\n\
- Economic module: {module:.2} EUR/h\n\
\n\
ECONOMIC DATA:\n\
- Total direct costs: {direct:.2} EUR\n\
- Claimed indirect costs: {claimed_indirect:.2} EUR\n\
- Indirect cost limit (10%): {limit:.2} EUR\n\
\n\
SETTLEMENT RESULT:\n\
- Real financeable amount: {financeable:.2} EUR\n\
- Recognized indirect costs: {recognized_indirect:.2} EUR\n\
- Total recognized costs: {recognized:.2} EUR\n\
- Deviation (financeable - recognized): {deviation:.2} EUR (negative = \
ineligible over-spend)\n\
- Status: {status}\n\
- Paid so far: {paid:.2} EUR, pending: {pending:.2} EUR\n\
\n\
Write a plain-text executive report, 150 words maximum:\n\
1. STUDENTS: state whether a drop in finished students reduced the \
financeable amount.\n\
2. INDIRECTS: state whether the 10% rule clipped the claimed indirect \
costs.\n\
3. CONCLUSION: final standing; if the deviation is negative, quantify the \
non-subsidizable spend.",
        dossier = action.dossier,
        code = action.action_code,
        title = action.title,
        hours = action.hours,
        granted = action.granted_students,
        finished = input.finished_students,
        module = action.economic_module,
        direct = result.total_direct_costs,
        claimed_indirect = result.claimed_indirect_costs,
        limit = result.indirect_cost_limit,
        financeable = result.real_financeable_amount,
        recognized_indirect = result.recognized_indirect_costs,
        recognized = result.total_recognized_costs,
        deviation = result.deviation,
        status = result.status,
        paid = input.paid_amount,
        pending = result.pending_payment,
    )
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
    }
}

pub struct ReportClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl ReportClient {
    pub fn new(settings: &EngineSettings) -> Result<Self, EngineError> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            EngineError::ConfigError("narrative reports need GEMINI_API_KEY".to_string())
        })?;
        Ok(ReportClient {
            http: reqwest::Client::new(),
            api_base: settings.report_api_base.clone(),
            api_key,
            model: settings.report_model.clone(),
        })
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, EngineError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self.http.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(EngineError::ReportError(format!(
                "generation service returned {}",
                response.status()
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed
            .into_text()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| EngineError::ReportError("empty generation response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::justification::calculate;
    use shared::models::{ActionStatus, DirectCosts};

    fn fixtures() -> (TrainingAction, JustificationInput) {
        let action = TrainingAction {
            id: "EXP-1-AF-1".to_string(),
            dossier: "EXP-1".to_string(),
            company: "ACME SL".to_string(),
            center: String::new(),
            action_code: "AF-1".to_string(),
            title: "Soldadura básica".to_string(),
            hours: 100.0,
            granted_students: 10,
            economic_module: 5.0,
            max_granted_amount: 5000.0,
            start_date: None,
            end_date: None,
            instructor: None,
        };
        let input = JustificationInput {
            action_id: "EXP-1-AF-1".to_string(),
            status: ActionStatus::Finished,
            actual_start_date: None,
            actual_end_date: None,
            finished_students: 8,
            direct_costs: DirectCosts {
                personnel: 3000.0,
                ..DirectCosts::default()
            },
            indirect_costs: 500.0,
            paid_amount: 1000.0,
            notes: None,
        };
        (action, input)
    }

    #[test]
    fn test_prompt_carries_result_fields() {
        let (action, input) = fixtures();
        let result = calculate(&action, &input);
        let prompt = build_report_prompt(&action, &input, &result);

        assert!(prompt.contains("EXP-1"));
        assert!(prompt.contains("10 / 8"));
        assert!(prompt.contains("4000.00 EUR"));
        assert!(prompt.contains("350.00 EUR"));
        assert!(prompt.contains("INDIRECT_ADJUSTED"));
    }

    #[test]
    fn test_response_text_extraction() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Informe listo."}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_text().as_deref(), Some("Informe listo."));
    }

    #[test]
    fn test_empty_response_yields_none() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(parsed.into_text().is_none());
    }

    #[test]
    fn test_client_requires_api_key() {
        let settings = EngineSettings::default();
        assert!(matches!(
            ReportClient::new(&settings),
            Err(EngineError::ConfigError(_))
        ));
    }
}
