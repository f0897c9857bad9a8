//! Dashboard projections
//!
//! Provider overview (patient list with status, headline counts, alerts)
//! and the patient's pregnancy progress. Everything here is derived from a
//! snapshot at a given `now` and never stored.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::{generate_alerts_with, most_recent_record, Alert};
use crate::patient::{PatientProfile, PatientSnapshot};
use crate::record::{format_record_date, parse_record_date, HealthRecord, RecordKind};
use crate::status::{classify_patient_status_with, PatientStatus};
use crate::store::RecordSource;
use crate::thresholds::ClinicalThresholds;

/// Length of a full-term pregnancy in weeks
pub const PREGNANCY_WEEKS: u8 = 40;

/// One row of the provider's patient list
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
    pub initials: String,
    pub week: u8,
    pub due_date: Option<String>,
    pub status: PatientStatus,
    /// Date of the most recent readable record
    pub last_update: Option<String>,
}

/// Headline counts on the provider dashboard
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_patients: usize,
    /// Patients with a record since the start of the current week
    pub active_this_week: usize,
    /// Patients currently classified critical
    pub urgent_cases: usize,
    pub alert_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDashboard {
    pub stats: DashboardStats,
    pub patients: Vec<PatientSummary>,
    pub alerts: Vec<Alert>,
}

/// Patient-facing progress through the pregnancy
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PregnancyProgress {
    pub current_week: u8,
    pub total_weeks: u8,
    pub weeks_remaining: i64,
    pub progress_percent: u8,
}

pub fn summarize_patient(
    patient: &PatientSnapshot,
    now: DateTime<Utc>,
    thresholds: &ClinicalThresholds,
) -> PatientSummary {
    PatientSummary {
        id: patient.id().to_string(),
        name: patient.name().to_string(),
        initials: patient.profile.initials(),
        week: patient.profile.current_week,
        due_date: patient.profile.due_date.clone(),
        status: classify_patient_status_with(&patient.health_records, now, thresholds),
        last_update: most_recent_record(&patient.health_records)
            .map(|(_, at)| format_record_date(at)),
    }
}

/// Build the provider overview for `patients` as of `now`
pub fn build_dashboard(
    patients: &[PatientSnapshot],
    now: DateTime<Utc>,
    thresholds: &ClinicalThresholds,
) -> ProviderDashboard {
    let summaries: Vec<PatientSummary> = patients
        .iter()
        .map(|patient| summarize_patient(patient, now, thresholds))
        .collect();
    let alerts = generate_alerts_with(patients, now, thresholds);

    let week_start = start_of_week(now);
    let active_this_week = patients
        .iter()
        .filter(|patient| {
            patient
                .health_records
                .iter()
                .filter_map(HealthRecord::timestamp)
                .any(|at| at >= week_start)
        })
        .count();

    ProviderDashboard {
        stats: DashboardStats {
            total_patients: patients.len(),
            active_this_week,
            urgent_cases: summaries
                .iter()
                .filter(|s| s.status == PatientStatus::Critical)
                .count(),
            alert_count: alerts.len(),
        },
        patients: summaries,
        alerts,
    }
}

/// Load a provider's patients from `source` and build their dashboard
pub fn evaluate_provider_panel<S: RecordSource>(
    source: &S,
    provider_id: &str,
    now: DateTime<Utc>,
    thresholds: &ClinicalThresholds,
) -> Result<ProviderDashboard, S::Error> {
    let patients = source.snapshot_for_provider(provider_id)?;
    tracing::debug!(provider_id, patients = patients.len(), "evaluating provider panel");
    Ok(build_dashboard(&patients, now, thresholds))
}

/// Sunday 00:00 UTC of the week containing `now`
pub fn start_of_week(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_since_sunday = i64::from(now.weekday().num_days_from_sunday());
    let sunday = now.date_naive() - Duration::days(days_since_sunday);
    Utc.from_utc_datetime(&sunday.and_time(NaiveTime::MIN))
}

/// Whole weeks until the due date, rounded up; 0 when unknown or past
pub fn weeks_remaining(due_date: Option<&str>, now: DateTime<Utc>) -> i64 {
    let due = match due_date.and_then(parse_record_date) {
        Some(due) => due,
        None => return 0,
    };
    let millis = due.signed_duration_since(now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let week = Duration::weeks(1).num_milliseconds();
    (millis + week - 1) / week
}

/// Share of a full-term pregnancy completed, capped at 100
pub fn progress_percent(current_week: u8) -> u8 {
    let percent = (f64::from(current_week) / f64::from(PREGNANCY_WEEKS) * 100.0).round();
    percent.min(100.0) as u8
}

pub fn pregnancy_progress(profile: &PatientProfile, now: DateTime<Utc>) -> PregnancyProgress {
    PregnancyProgress {
        current_week: profile.current_week,
        total_weeks: PREGNANCY_WEEKS,
        weeks_remaining: weeks_remaining(profile.due_date.as_deref(), now),
        progress_percent: progress_percent(profile.current_week),
    }
}

/// Most recent record of `kind`, with the same tie-break as [`most_recent_record`]
pub fn latest_record(records: &[HealthRecord], kind: RecordKind) -> Option<&HealthRecord> {
    records
        .iter()
        .filter(|record| record.kind() == kind)
        .filter_map(|record| record.timestamp().map(|at| (record, at)))
        .fold(None, |latest: Option<(&HealthRecord, DateTime<Utc>)>, (record, at)| {
            match latest {
                Some((_, latest_at)) if latest_at >= at => latest,
                _ => Some((record, at)),
            }
        })
        .map(|(record, _)| record)
}
