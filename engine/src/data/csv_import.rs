// Roster and backup CSV ingestion. Header names vary across the files the
// administration hands out, so fields are located by synonym with a
// positional fallback.
use crate::data::export::ReportRow;
use crate::error::EngineError;
use shared::models::{JustificationInput, TrainingAction};
use shared::utils::euro_format::parse_amount;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// What an import produced: a bare roster, or a full backup that also
/// restores justification inputs.
#[derive(Debug)]
pub enum ImportedFile {
    Roster(Vec<TrainingAction>),
    Backup(Vec<TrainingAction>, HashMap<String, JustificationInput>),
}

pub struct RosterCsvImporter;

impl RosterCsvImporter {
    /// Loads either a semicolon-delimited roster CSV or a backup CSV
    /// previously produced by the exporter (detected by its `ID` header).
    pub fn load_file(path: &Path) -> Result<ImportedFile, EngineError> {
        let mut first_line = String::new();
        BufReader::new(File::open(path)?).read_line(&mut first_line)?;

        if first_line.trim_start().starts_with("ID,") {
            let (actions, inputs) = Self::load_backup(File::open(path)?)?;
            Ok(ImportedFile::Backup(actions, inputs))
        } else {
            Ok(ImportedFile::Roster(Self::load_actions(File::open(path)?)?))
        }
    }

    // Roster header example:
    // Nº;EXPTE;EMPRESA;CENTRO;AF;DENOMINACION;HORAS;ALUM;MODULO;IMPORTE;F. INICIO;F. FIN;PROFESOR
    pub fn load_actions<R: Read>(reader: R) -> Result<Vec<TrainingAction>, EngineError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_uppercase())
            .collect();

        let col_dossier = Self::find_col(&headers, &["EXPTE"], 1);
        let col_company = Self::find_col(&headers, &["EMPRESA"], 2);
        let col_center = Self::find_col(&headers, &["CENTRO", "ESCUELA"], 3);
        let col_code = Self::find_col(&headers, &["AF", "CODIGO"], 4);
        let col_title = Self::find_col(&headers, &["DENOMINACION", "PROGRAMA"], 5);
        let col_hours = Self::find_col(&headers, &["HORAS"], 6);
        let col_students = Self::find_col(&headers, &["ALUM"], 7);
        let col_module = Self::find_col(&headers, &["MOD", "MODULO"], 8);
        let col_amount = Self::find_col(&headers, &["IMPORTE"], 9);
        let col_start = Self::find_col(&headers, &["F. INICIO", "FECHA INICIO", "INICIO"], 10);
        let col_end = Self::find_col(&headers, &["F. FIN", "FECHA FIN", "FIN"], 11);
        let col_instructor = Self::find_col(&headers, &["PROFESOR", "DOCENTE", "FORMADOR"], 12);

        let mut actions = Vec::new();
        let mut skipped = 0usize;

        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            let get = |col: usize| record.get(col).map(str::trim).unwrap_or("");

            let company = get(col_company);
            if !Self::is_valid_company(company) {
                skipped += 1;
                continue;
            }

            let dossier = get(col_dossier);
            let code = get(col_code);

            actions.push(TrainingAction {
                id: TrainingAction::derive_id(dossier, code, idx),
                dossier: dossier.to_string(),
                company: company.to_string(),
                center: get(col_center).to_string(),
                action_code: code.to_string(),
                title: get(col_title).to_string(),
                hours: parse_amount(get(col_hours)),
                granted_students: parse_amount(get(col_students)).max(0.0).round() as u32,
                economic_module: parse_amount(get(col_module)),
                max_granted_amount: parse_amount(get(col_amount)),
                start_date: Self::optional(get(col_start)),
                end_date: Self::optional(get(col_end)),
                instructor: Self::optional(get(col_instructor)),
            });
        }

        tracing::info!(loaded = actions.len(), skipped, "Roster CSV imported");
        Ok(actions)
    }

    /// Reads back a report produced by the exporter, restoring both the
    /// roster and the saved justification inputs.
    pub fn load_backup<R: Read>(
        reader: R,
    ) -> Result<(Vec<TrainingAction>, HashMap<String, JustificationInput>), EngineError> {
        let mut rdr = csv::Reader::from_reader(reader);

        let mut actions = Vec::new();
        let mut inputs = HashMap::new();

        for result in rdr.deserialize::<ReportRow>() {
            let row = result?;
            let (action, input) = row.into_parts();
            if !Self::is_valid_company(&action.company) {
                continue;
            }
            if let Some(input) = input {
                inputs.insert(action.id.clone(), input);
            }
            actions.push(action);
        }

        tracing::info!(
            actions = actions.len(),
            inputs = inputs.len(),
            "Backup CSV restored"
        );
        Ok((actions, inputs))
    }

    // Header artifacts in the source spreadsheets show up as data rows.
    fn is_valid_company(company: &str) -> bool {
        let upper = company.trim().to_uppercase();
        !upper.is_empty() && upper != "ALUM." && upper != "ALUM" && upper != "EMPRESA"
    }

    fn optional(value: &str) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    // Locates a column whose header contains any of the given fragments;
    // falls back to the conventional position when nothing matches.
    fn find_col(headers: &[String], fragments: &[&str], fallback: usize) -> usize {
        headers
            .iter()
            .position(|h| fragments.iter().any(|f| h.contains(f)))
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::export::write_report;
    use shared::models::{ActionStatus, DirectCosts};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    const ROSTER: &str = "\
Nº;EXPTE;EMPRESA;CENTRO;AF;DENOMINACION;HORAS;ALUM;MODULO;IMPORTE;F. INICIO;F. FIN;PROFESOR
1;EXP 2026/01;ACME SL;Centro Norte;AF-1;Soldadura básica;100;10;5,00;5.000,00;01/02/2026;30/04/2026;J. Pérez
2;EXP 2026/01;ACME SL;Centro Sur;AF-2;Carretillero;60;8;6,50;3.120,00;;;
3;;ALUM.;;;;;;;;;;";

    #[test]
    fn test_load_actions_from_roster() {
        let actions = RosterCsvImporter::load_actions(ROSTER.as_bytes()).unwrap();

        assert_eq!(actions.len(), 2);

        let first = &actions[0];
        assert_eq!(first.id, "EXP2026/01-AF-1");
        assert_eq!(first.dossier, "EXP 2026/01");
        assert_eq!(first.company, "ACME SL");
        assert_eq!(first.hours, 100.0);
        assert_eq!(first.granted_students, 10);
        assert_eq!(first.economic_module, 5.0);
        assert_eq!(first.max_granted_amount, 5000.0);
        assert_eq!(first.start_date.as_deref(), Some("01/02/2026"));
        assert_eq!(first.instructor.as_deref(), Some("J. Pérez"));

        let second = &actions[1];
        assert_eq!(second.start_date, None);
        assert_eq!(second.instructor, None);
    }

    #[test]
    fn test_header_synonyms_and_reordered_columns() {
        let csv = "\
EMPRESA;Nº EXPTE;CODIGO;PROGRAMA;HORAS;ALUMNOS;MOD. ECO;IMPORTE MAX
BETA SA;EXP-9;AF-7;Ofimática;40;12;4,00;1.920,00";
        let actions = RosterCsvImporter::load_actions(csv.as_bytes()).unwrap();

        assert_eq!(actions.len(), 1);
        let action = &actions[0];
        assert_eq!(action.company, "BETA SA");
        assert_eq!(action.dossier, "EXP-9");
        assert_eq!(action.action_code, "AF-7");
        assert_eq!(action.title, "Ofimática");
        assert_eq!(action.granted_students, 12);
        assert_eq!(action.max_granted_amount, 1920.0);
    }

    #[test]
    fn test_header_noise_rows_are_skipped() {
        let actions = RosterCsvImporter::load_actions(ROSTER.as_bytes()).unwrap();
        assert!(actions.iter().all(|a| a.company == "ACME SL"));
    }

    #[test]
    fn test_garbage_numeric_cells_coerce_to_zero() {
        let csv = "\
Nº;EXPTE;EMPRESA;CENTRO;AF;DENOMINACION;HORAS;ALUM;MODULO;IMPORTE
1;EXP-1;ACME SL;;AF-1;Curso;n/a;diez;;";
        let actions = RosterCsvImporter::load_actions(csv.as_bytes()).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].hours, 0.0);
        assert_eq!(actions[0].granted_students, 0);
        assert_eq!(actions[0].max_granted_amount, 0.0);
    }

    #[test]
    fn test_load_file_missing_path_errors() {
        let result = RosterCsvImporter::load_file(Path::new("missing_roster.csv"));
        assert!(matches!(result, Err(EngineError::IoError { .. })));
    }

    #[test]
    fn test_load_file_detects_roster() {
        let file = create_test_csv(ROSTER);
        match RosterCsvImporter::load_file(file.path()).unwrap() {
            ImportedFile::Roster(actions) => assert_eq!(actions.len(), 2),
            other => panic!("expected roster, got {other:?}"),
        }
    }

    #[test]
    fn test_backup_round_trip_restores_inputs() {
        let actions = RosterCsvImporter::load_actions(ROSTER.as_bytes()).unwrap();
        let mut inputs = HashMap::new();
        inputs.insert(
            actions[0].id.clone(),
            JustificationInput {
                action_id: actions[0].id.clone(),
                status: ActionStatus::Finished,
                actual_start_date: Some("03/02/2026".to_string()),
                actual_end_date: None,
                finished_students: 8,
                direct_costs: DirectCosts {
                    personnel: 3000.0,
                    insurance: 120.5,
                    ..DirectCosts::default()
                },
                indirect_costs: 200.0,
                paid_amount: 1000.0,
                notes: Some("primer pago".to_string()),
            },
        );

        let mut buf = Vec::new();
        write_report(&mut buf, &actions, &inputs).unwrap();
        let file = create_test_csv(std::str::from_utf8(&buf).unwrap());

        match RosterCsvImporter::load_file(file.path()).unwrap() {
            ImportedFile::Backup(restored_actions, restored_inputs) => {
                assert_eq!(restored_actions.len(), 2);
                assert_eq!(restored_inputs.len(), 1);
                let input = &restored_inputs[&actions[0].id];
                assert_eq!(input.status, ActionStatus::Finished);
                assert_eq!(input.finished_students, 8);
                assert_eq!(input.direct_costs.insurance, 120.5);
                assert_eq!(input.notes.as_deref(), Some("primer pago"));
            }
            other => panic!("expected backup, got {other:?}"),
        }
    }
}
