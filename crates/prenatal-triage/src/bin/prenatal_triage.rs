//! Prenatal Triage CLI
//!
//! Evaluate a registered-user export offline.
//!
//! Usage:
//!   prenatal-triage status <snapshot> [--patient <id>]
//!   prenatal-triage alerts <snapshot> [--provider <id>]
//!   prenatal-triage dashboard <snapshot> [--provider <id>]
//!   prenatal-triage progress <snapshot> --patient <id>
//!   prenatal-triage notify <snapshot> --patient <id> --record <id>
//!   prenatal-triage log <snapshot> --patient <id> --draft <json|@file> [--dry-run]

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use prenatal_triage::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "prenatal-triage")]
#[command(author = "Mycelix Health")]
#[command(version = "0.1.0")]
#[command(about = "Classify pregnancy health records and generate provider alerts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Evaluation time, RFC 3339 (defaults to the current time)
    #[arg(long, global = true)]
    now: Option<String>,

    /// Clinical thresholds JSON file
    #[arg(short, long, global = true)]
    thresholds: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    format: Format,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Triage status of each patient
    Status {
        /// Registered-user export (JSON array)
        snapshot: PathBuf,

        /// Only this patient
        #[arg(short, long)]
        patient: Option<String>,
    },

    /// Alerts for a provider's patients
    Alerts {
        snapshot: PathBuf,

        /// Only patients under this provider's care (all patients if omitted)
        #[arg(short = 'P', long)]
        provider: Option<String>,
    },

    /// Provider dashboard: stats, patient list and alerts
    Dashboard {
        snapshot: PathBuf,

        #[arg(short = 'P', long)]
        provider: Option<String>,
    },

    /// Pregnancy progress of one patient
    Progress {
        snapshot: PathBuf,

        #[arg(short, long)]
        patient: String,
    },

    /// Provider notifications for an existing record
    Notify {
        snapshot: PathBuf,

        #[arg(short, long)]
        patient: String,

        /// Record id
        #[arg(short, long)]
        record: String,
    },

    /// Validate a record draft, append it to the snapshot file and notify
    /// the patient's providers
    Log {
        snapshot: PathBuf,

        #[arg(short, long)]
        patient: String,

        /// Draft JSON (inline or @file)
        #[arg(short, long)]
        draft: String,

        /// Record id (defaults to the evaluation time in milliseconds)
        #[arg(long)]
        id: Option<String>,

        /// Validate and notify without writing the snapshot file
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(serde::Serialize)]
struct StatusRow {
    id: String,
    name: String,
    status: PatientStatus,
}

#[derive(serde::Serialize)]
struct LogResult {
    record: HealthRecord,
    notifications: Vec<ProviderNotification>,
    undelivered: Vec<String>,
    saved: bool,
}

fn main() -> CliResult<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let now = evaluation_time(cli.now.as_deref())?;
    let thresholds = match &cli.thresholds {
        Some(path) => ClinicalThresholds::from_path(path)?,
        None => ClinicalThresholds::default(),
    };

    let (value, table) = match cli.command {
        Commands::Status { snapshot, patient } => {
            let store = load_store(&snapshot)?;
            let rows: Vec<StatusRow> = store
                .snapshots()
                .into_iter()
                .filter(|p| patient.as_deref().map_or(true, |id| p.id() == id))
                .map(|p| StatusRow {
                    id: p.id().to_string(),
                    name: p.name().to_string(),
                    status: classify_patient_status_with(&p.health_records, now, &thresholds),
                })
                .collect();
            if let Some(id) = patient {
                if rows.is_empty() {
                    return Err(TriageError::UnknownPatient(id).into());
                }
            }
            let table = status_table(&rows);
            (serde_json::to_value(rows)?, table)
        }
        Commands::Alerts { snapshot, provider } => {
            let store = load_store(&snapshot)?;
            let patients = panel(&store, provider.as_deref())?;
            let alerts = generate_alerts_with(&patients, now, &thresholds);
            let table = alert_table(&alerts);
            (serde_json::to_value(alerts)?, table)
        }
        Commands::Dashboard { snapshot, provider } => {
            let store = load_store(&snapshot)?;
            let patients = panel(&store, provider.as_deref())?;
            let dashboard = build_dashboard(&patients, now, &thresholds);
            let table = dashboard_table(&dashboard);
            (serde_json::to_value(dashboard)?, table)
        }
        Commands::Progress { snapshot, patient } => {
            let store = load_store(&snapshot)?;
            let profile = store
                .patient(&patient)
                .ok_or_else(|| TriageError::UnknownPatient(patient.clone()))?;
            let progress = pregnancy_progress(profile, now);
            let table = format!(
                "Week {} of {} ({}%), {} weeks remaining",
                progress.current_week,
                progress.total_weeks,
                progress.progress_percent,
                progress.weeks_remaining
            );
            (serde_json::to_value(progress)?, table)
        }
        Commands::Notify { snapshot, patient, record } => {
            let store = load_store(&snapshot)?;
            let profile = store
                .patient(&patient)
                .ok_or_else(|| TriageError::UnknownPatient(patient.clone()))?;
            let records = store.records_for_patient(&patient)?;
            let record = records
                .iter()
                .find(|r| r.id == record)
                .ok_or_else(|| format!("no record {} for patient {}", record, patient))?;

            let mut outbox: Vec<ProviderNotification> = Vec::new();
            for provider in store.providers_for_patient(&patient) {
                let notification = compose_notification(profile, provider, record);
                TracingNotificationSink.deliver(notification.clone())?;
                outbox.deliver(notification)?;
            }
            let table = notification_table(&outbox);
            (serde_json::to_value(outbox)?, table)
        }
        Commands::Log {
            snapshot,
            patient,
            draft,
            id,
            dry_run,
        } => {
            let export = fs::read_to_string(&snapshot)?;
            let mut store = InMemoryRecordStore::from_json(&export)?;
            let draft: RecordDraft = serde_json::from_str(&read_inline_or_file(&draft)?)?;
            let id = id.unwrap_or_else(|| now.timestamp_millis().to_string());
            let mut outbox: Vec<ProviderNotification> = Vec::new();
            let logged = store.log_record(&patient, id, draft, now, &mut outbox)?;

            if !dry_run {
                fs::write(&snapshot, append_to_export(&export, &logged.record)?)?;
                tracing::info!(record_id = %logged.record.id, path = %snapshot.display(), "record saved");
            }
            for notification in &outbox {
                TracingNotificationSink.deliver(notification.clone())?;
            }
            let table = notification_table(&outbox);
            (
                serde_json::to_value(LogResult {
                    record: logged.record,
                    notifications: outbox,
                    undelivered: logged
                        .undelivered
                        .into_iter()
                        .map(|failure| failure.reason)
                        .collect(),
                    saved: !dry_run,
                })?,
                table,
            )
        }
    };

    let output_str = match cli.format {
        Format::Json => serde_json::to_string_pretty(&value)?,
        Format::Table => table,
    };

    if let Some(output_path) = cli.output {
        fs::write(&output_path, &output_str)?;
        eprintln!("Output written to: {}", output_path.display());
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn evaluation_time(raw: Option<&str>) -> CliResult<DateTime<Utc>> {
    match raw {
        Some(raw) => {
            parse_record_date(raw).ok_or_else(|| format!("invalid --now timestamp: {}", raw).into())
        }
        None => Ok(Utc::now()),
    }
}

fn load_store(path: &Path) -> CliResult<InMemoryRecordStore> {
    let json = fs::read_to_string(path)?;
    Ok(InMemoryRecordStore::from_json(&json)?)
}

fn panel(store: &InMemoryRecordStore, provider: Option<&str>) -> CliResult<Vec<PatientSnapshot>> {
    match provider {
        Some(provider) => Ok(store.snapshot_for_provider(provider)?),
        None => Ok(store.snapshots()),
    }
}

fn read_inline_or_file(input: &str) -> CliResult<String> {
    match input.strip_prefix('@') {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => Ok(input.to_string()),
    }
}

fn status_table(rows: &[StatusRow]) -> String {
    let mut out = format!("{:<16} {:<24} {}\n", "ID", "NAME", "STATUS");
    for row in rows {
        out.push_str(&format!("{:<16} {:<24} {}\n", row.id, row.name, row.status));
    }
    out
}

fn alert_table(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "No alerts".to_string();
    }
    let mut out = format!("{:<8} {:<20} {:<14} {}\n", "SEVERITY", "PATIENT", "WHEN", "MESSAGE");
    for alert in alerts {
        out.push_str(&format!(
            "{:<8} {:<20} {:<14} {}\n",
            alert.severity, alert.patient_name, alert.time, alert.message
        ));
    }
    out
}

fn dashboard_table(dashboard: &ProviderDashboard) -> String {
    let stats = &dashboard.stats;
    let mut out = format!(
        "Patients: {}  Active this week: {}  Urgent: {}  Alerts: {}\n\n",
        stats.total_patients, stats.active_this_week, stats.urgent_cases, stats.alert_count
    );
    out.push_str(&format!(
        "{:<4} {:<24} {:<6} {:<12} {:<10} {}\n",
        "", "NAME", "WEEK", "DUE", "STATUS", "LAST UPDATE"
    ));
    for patient in &dashboard.patients {
        out.push_str(&format!(
            "{:<4} {:<24} {:<6} {:<12} {:<10} {}\n",
            patient.initials,
            patient.name,
            patient.week,
            patient.due_date.as_deref().unwrap_or("Not set"),
            patient.status,
            patient.last_update.as_deref().unwrap_or("No records")
        ));
    }
    out.push('\n');
    out.push_str(&alert_table(&dashboard.alerts));
    out
}

fn notification_table(notifications: &[ProviderNotification]) -> String {
    if notifications.is_empty() {
        return "No providers to notify".to_string();
    }
    notifications
        .iter()
        .map(|n| format!("To: {}\nSubject: {}\n{}\n", n.to, n.subject, n.body))
        .collect::<Vec<_>>()
        .join("\n")
}
