//! Provider alerts
//!
//! Alerts are regenerated from the full patient snapshot on every call.
//! Per patient, in order:
//! - each reading from the alert window that breaches a threshold
//!   (blood pressure is urgent, sugar is a warning)
//! - one missed check-in notice when the latest record is stale
//!
//! The combined list is cut to the first `max_alerts` entries in that
//! generation order; it is never re-sorted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::patient::PatientSnapshot;
use crate::record::{HealthRecord, RecordData};
use crate::thresholds::ClinicalThresholds;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Urgent,
    Warning,
    Info,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Urgent => "urgent",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Info => "info",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Clinician-facing notice derived from recent readings or a stale record
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub patient_name: String,
    pub message: String,
    /// Relative time label, e.g. "3 hours ago"
    pub time: String,
    pub severity: AlertSeverity,
}

/// Generate alerts with the default clinical thresholds
pub fn generate_alerts(patients: &[PatientSnapshot], now: DateTime<Utc>) -> Vec<Alert> {
    generate_alerts_with(patients, now, &ClinicalThresholds::default())
}

/// Generate at most `thresholds.max_alerts` alerts for `patients` as of `now`
pub fn generate_alerts_with(
    patients: &[PatientSnapshot],
    now: DateTime<Utc>,
    thresholds: &ClinicalThresholds,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let window = thresholds.alert_window();

    for patient in patients {
        for record in &patient.health_records {
            let at = match record.timestamp() {
                Some(at) => at,
                None => continue,
            };
            if now.signed_duration_since(at) > window {
                continue;
            }
            if let Some(alert) = reading_alert(patient, record, at, now, thresholds) {
                alerts.push(alert);
            }
        }

        if let Some((_, last_at)) = most_recent_record(&patient.health_records) {
            let elapsed = now.signed_duration_since(last_at);
            if elapsed > thresholds.stale_after() {
                let days = elapsed.num_days();
                alerts.push(Alert {
                    id: format!("missed-{}", patient.id()),
                    patient_name: patient.name().to_string(),
                    message: format!("No health updates for {} days", days),
                    time: format!("{} days ago", days),
                    severity: AlertSeverity::Info,
                });
            }
        }
    }

    if alerts.len() > thresholds.max_alerts {
        tracing::debug!(
            generated = alerts.len(),
            kept = thresholds.max_alerts,
            "truncating alert list"
        );
        alerts.truncate(thresholds.max_alerts);
    }
    alerts
}

fn reading_alert(
    patient: &PatientSnapshot,
    record: &HealthRecord,
    at: DateTime<Utc>,
    now: DateTime<Utc>,
    thresholds: &ClinicalThresholds,
) -> Option<Alert> {
    let (id, message, severity) = match &record.data {
        RecordData::BloodPressure(bp) if thresholds.is_high_blood_pressure(bp) => (
            format!("bp-{}", record.id),
            format!("High blood pressure reading: {}/{}", bp.systolic, bp.diastolic),
            AlertSeverity::Urgent,
        ),
        RecordData::SugarLevel(sugar) if thresholds.is_high_sugar(sugar) => (
            format!("sugar-{}", record.id),
            format!("High sugar level: {} mg/dL ({})", sugar.level, sugar.test_type),
            AlertSeverity::Warning,
        ),
        _ => return None,
    };

    Some(Alert {
        id,
        patient_name: patient.name().to_string(),
        message,
        time: time_ago(at, now),
        severity,
    })
}

/// The latest record by date, skipping unreadable dates.
///
/// When several records share the latest date, the first one in input
/// order is returned.
pub fn most_recent_record(records: &[HealthRecord]) -> Option<(&HealthRecord, DateTime<Utc>)> {
    records
        .iter()
        .filter_map(|record| record.timestamp().map(|at| (record, at)))
        .fold(None, |latest, (record, at)| match latest {
            Some((_, latest_at)) if latest_at >= at => latest,
            _ => Some((record, at)),
        })
}

/// Relative label for a timestamp: "Just now", "5 hours ago", "1 day ago", "3 days ago"
pub fn time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = now.signed_duration_since(at).num_milliseconds() as f64 / MILLIS_PER_HOUR;

    if hours < 1.0 {
        "Just now".to_string()
    } else if hours < 24.0 {
        format!("{} hours ago", hours.floor() as i64)
    } else {
        let days = (hours / 24.0).floor() as i64;
        format!("{} day{} ago", days, if days > 1 { "s" } else { "" })
    }
}
