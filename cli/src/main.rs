// Command-line front end: owns the dataset file and drives the engine.
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use engine::calc::{company_totals, dashboard_stats, ActionFilter};
use engine::calc::justification::calculate;
use engine::config::settings::EngineSettings;
use engine::data::csv_import::{ImportedFile, RosterCsvImporter};
use engine::data::export::{default_report_filename, write_report};
use engine::data::store::DatasetStore;
use engine::services::report::{build_report_prompt, ReportClient};
use shared::models::{ActionStatus, JustificationInput, JustificationResult, TrainingAction};
use shared::utils::euro_format::format_eur;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "fpjust",
    version,
    about = "Justification workbench for subsidized vocational training actions"
)]
struct Cli {
    /// Dataset file (overrides FPJUST_DATA_FILE)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a roster CSV, or restore a backup report CSV
    Import { file: PathBuf },
    /// Record a justification input from a JSON file
    Record { input: PathBuf },
    /// Dashboard totals, optionally filtered
    Summary {
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        dossier: Option<String>,
        /// PENDING, IN_EXECUTION, FINISHED or NOT_EXECUTABLE
        #[arg(long)]
        status: Option<String>,
        /// Substring match on title or action code
        #[arg(long)]
        search: Option<String>,
    },
    /// Executive summary for one company, including the treasury plan
    Company { name: String },
    /// Export the flattened justification report
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show an action's computed result, then the AI narrative
    Report { action_id: String },
    /// Wipe the whole dataset
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut settings = EngineSettings::from_env();
    if let Some(data) = cli.data {
        settings.data_file = data;
    }

    match cli.command {
        Command::Import { file } => import(&settings, &file),
        Command::Record { input } => record(&settings, &input),
        Command::Summary {
            company,
            dossier,
            status,
            search,
        } => summary(&settings, company, dossier, status, search),
        Command::Company { name } => company(&settings, &name),
        Command::Export { output } => export(&settings, output),
        Command::Report { action_id } => report(&settings, &action_id).await,
        Command::Reset { yes } => reset(&settings, yes),
    }
}

fn import(settings: &EngineSettings, file: &PathBuf) -> Result<()> {
    let mut store = DatasetStore::load_from(&settings.data_file)?;

    match RosterCsvImporter::load_file(file)? {
        ImportedFile::Roster(actions) => {
            let count = actions.len();
            let preserved = store.load_actions(actions);
            println!("Imported {count} actions ({preserved} saved justifications kept).");
        }
        ImportedFile::Backup(actions, inputs) => {
            let (count, restored) = (actions.len(), inputs.len());
            store.restore(actions, inputs);
            println!("Backup restored: {count} actions, {restored} justifications.");
        }
    }

    store.save_to(&settings.data_file)?;
    Ok(())
}

fn record(settings: &EngineSettings, input_file: &PathBuf) -> Result<()> {
    let mut store = DatasetStore::load_from(&settings.data_file)?;

    let reader = BufReader::new(
        File::open(input_file)
            .with_context(|| format!("cannot open {}", input_file.display()))?,
    );
    let input: JustificationInput =
        serde_json::from_reader(reader).context("invalid justification input JSON")?;

    let action = store
        .action(&input.action_id)
        .ok_or_else(|| anyhow!("no action with id '{}' in the dataset", input.action_id))?
        .clone();

    let result = calculate(&action, &input);
    store.save_input(input);
    store.save_to(&settings.data_file)?;

    println!("Justification saved for {} - {}", action.action_code, action.title);
    print_result(&action, &result);
    Ok(())
}

fn summary(
    settings: &EngineSettings,
    company: Option<String>,
    dossier: Option<String>,
    status: Option<String>,
    search: Option<String>,
) -> Result<()> {
    let store = DatasetStore::load_from(&settings.data_file)?;
    if store.is_empty() {
        bail!("the dataset is empty; run `fpjust import <roster.csv>` first");
    }

    let status = status
        .map(|s| s.parse::<ActionStatus>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let filter = ActionFilter {
        company,
        dossier,
        status,
        search,
    };

    let stats = dashboard_stats(store.actions(), store.inputs(), &filter);

    println!("Actions:            {} ({} justified)", stats.total_actions, stats.justified_actions);
    println!("Granted:            {}", format_eur(stats.total_granted));
    println!("Financeable (real): {}", format_eur(stats.total_financeable_real));
    println!("Recognized:         {}", format_eur(stats.total_recognized));
    println!(
        "Students:           {} / {} finished ({:.1}% retention)",
        stats.total_finished_students, stats.total_granted_students, stats.retention_rate
    );

    if !stats.companies.is_empty() {
        println!();
        println!("Per company:");
        for (name, breakdown) in &stats.companies {
            println!(
                "  {name}: {} dossiers, granted {}, recognized {}",
                breakdown.dossiers.len(),
                format_eur(breakdown.granted),
                format_eur(breakdown.recognized),
            );
        }
    }
    Ok(())
}

fn company(settings: &EngineSettings, name: &str) -> Result<()> {
    let store = DatasetStore::load_from(&settings.data_file)?;
    let totals = company_totals(store.actions(), store.inputs(), name);
    if totals.actions == 0 {
        bail!("no actions for company '{name}'");
    }

    println!("{name}");
    println!(
        "  {} actions across {} dossiers",
        totals.actions,
        totals.dossiers.len()
    );
    println!("  Granted:     {}", format_eur(totals.granted));
    println!("  Recognized:  {}", format_eur(totals.recognized));
    println!(
        "  Students:    {} / {} finished ({:.1}% retention)",
        totals.finished_students, totals.granted_students, totals.retention_rate
    );
    println!("  Paid:        {}", format_eur(totals.paid));
    println!("  Pending:     {}", format_eur(totals.pending_payment));

    let treasury = totals.treasury();
    println!("  Treasury plan:");
    println!("    Advance (70%): {}", format_eur(treasury.advance));
    let direction = if treasury.settlement >= 0.0 { "to collect" } else { "to return" };
    println!(
        "    Settlement:    {} ({direction})",
        format_eur(treasury.settlement.abs())
    );
    println!("    Cash balance:  {}", format_eur(treasury.cash_balance));
    Ok(())
}

fn export(settings: &EngineSettings, output: Option<PathBuf>) -> Result<()> {
    let store = DatasetStore::load_from(&settings.data_file)?;
    if store.is_empty() {
        bail!("nothing to export; the dataset is empty");
    }

    let path = output.unwrap_or_else(|| {
        PathBuf::from(default_report_filename(chrono::Local::now().date_naive()))
    });
    let file = File::create(&path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    write_report(file, store.actions(), store.inputs())?;

    println!("Report written to {}", path.display());
    Ok(())
}

async fn report(settings: &EngineSettings, action_id: &str) -> Result<()> {
    let store = DatasetStore::load_from(&settings.data_file)?;

    let action = store
        .action(action_id)
        .ok_or_else(|| anyhow!("no action with id '{action_id}'"))?;
    let input = store
        .input(action_id)
        .ok_or_else(|| anyhow!("action '{action_id}' has no recorded justification yet"))?;

    // The numeric result always comes out, whatever happens to the
    // narrative call below.
    let result = calculate(action, input);
    print_result(action, &result);

    match ReportClient::new(settings) {
        Ok(client) => {
            info!(action = action_id, "Requesting narrative report");
            let prompt = build_report_prompt(action, input, &result);
            match client.generate(&prompt).await {
                Ok(text) => {
                    println!();
                    println!("--- Consultant report ---");
                    println!("{text}");
                }
                Err(e) => {
                    warn!(error = %e, "Narrative report failed");
                    println!();
                    println!("(narrative report unavailable: {e})");
                }
            }
        }
        Err(e) => {
            println!();
            println!("(narrative report skipped: {e})");
        }
    }
    Ok(())
}

fn reset(settings: &EngineSettings, yes: bool) -> Result<()> {
    if !yes {
        bail!("this deletes every action and justification; re-run with --yes to confirm");
    }
    let mut store = DatasetStore::load_from(&settings.data_file)?;
    store.reset();
    store.save_to(&settings.data_file)?;
    println!("Dataset cleared.");
    Ok(())
}

fn print_result(action: &TrainingAction, result: &JustificationResult) {
    println!(
        "{} - {} ({} / {})",
        action.action_code, action.title, action.dossier, action.company
    );
    println!("  Financeable (real):   {}", format_eur(result.real_financeable_amount));
    println!("  Direct costs:         {}", format_eur(result.total_direct_costs));
    println!(
        "  Indirect costs:       {} claimed, {} recognized (limit {})",
        format_eur(result.claimed_indirect_costs),
        format_eur(result.recognized_indirect_costs),
        format_eur(result.indirect_cost_limit),
    );
    println!("  Total recognized:     {}", format_eur(result.total_recognized_costs));
    println!("  Deviation:            {}", format_eur(result.deviation));
    println!("  Status:               {}", result.status);
    println!("  Pending payment:      {}", format_eur(result.pending_payment));
}
