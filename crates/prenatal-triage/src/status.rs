//! Patient triage status
//!
//! Status is a projection of the record list: it is recomputed from a full
//! snapshot on every call and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::HealthRecord;
use crate::thresholds::ClinicalThresholds;

/// Three-valued triage tag shown next to each patient
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    Normal,
    Attention,
    Critical,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Normal => "normal",
            PatientStatus::Attention => "attention",
            PatientStatus::Critical => "critical",
        }
    }
}

impl std::fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Classify a patient with the default clinical thresholds.
///
/// See [`classify_patient_status_with`].
pub fn classify_patient_status(records: &[HealthRecord], now: DateTime<Utc>) -> PatientStatus {
    classify_patient_status_with(records, now, &ClinicalThresholds::default())
}

/// Classify a patient from their records as of `now`.
///
/// Rules, first match wins:
/// 1. no records at all: `Attention`
/// 2. a recent blood pressure or sugar reading over its limit: `Critical`
/// 3. nothing recent: `Attention`
/// 4. otherwise `Normal`
///
/// Record order is irrelevant. Records with unreadable dates are never
/// recent; malformed readings never breach.
pub fn classify_patient_status_with(
    records: &[HealthRecord],
    now: DateTime<Utc>,
    thresholds: &ClinicalThresholds,
) -> PatientStatus {
    if records.is_empty() {
        return PatientStatus::Attention;
    }

    let window = thresholds.status_window();
    let recent: Vec<&HealthRecord> = records
        .iter()
        .filter(|record| record.is_within(now, window))
        .collect();

    if recent
        .iter()
        .any(|record| thresholds.breach(&record.data).is_some())
    {
        PatientStatus::Critical
    } else if recent.is_empty() {
        PatientStatus::Attention
    } else {
        PatientStatus::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn bp(at: DateTime<Utc>, systolic: f64, diastolic: f64) -> HealthRecord {
        HealthRecord::new(
            "bp",
            "p1",
            at,
            RecordData::BloodPressure(BloodPressureData {
                systolic,
                diastolic,
                heart_rate: 78.0,
                notes: None,
            }),
        )
    }

    fn sugar(at: DateTime<Utc>, level: f64, test_type: SugarTestType) -> HealthRecord {
        HealthRecord::new(
            "sugar",
            "p1",
            at,
            RecordData::SugarLevel(SugarLevelData {
                level,
                test_type,
                notes: None,
            }),
        )
    }

    fn movement(at: DateTime<Utc>) -> HealthRecord {
        HealthRecord::new(
            "kick",
            "p1",
            at,
            RecordData::BabyMovement(BabyMovementData {
                count: 10.0,
                duration: 120.0,
                notes: None,
            }),
        )
    }

    #[test]
    fn test_empty_records_need_attention() {
        assert_eq!(classify_patient_status(&[], now()), PatientStatus::Attention);
    }

    #[test]
    fn test_high_blood_pressure_is_critical() {
        let records = vec![bp(now(), 150.0, 95.0)];
        assert_eq!(classify_patient_status(&records, now()), PatientStatus::Critical);
    }

    #[test]
    fn test_diastolic_alone_is_critical() {
        let records = vec![movement(now()), bp(now() - Duration::days(2), 120.0, 92.0)];
        assert_eq!(classify_patient_status(&records, now()), PatientStatus::Critical);
    }

    #[test]
    fn test_high_fasting_sugar_is_critical() {
        let records = vec![sugar(now(), 100.0, SugarTestType::Fasting)];
        assert_eq!(classify_patient_status(&records, now()), PatientStatus::Critical);
    }

    #[test]
    fn test_post_meal_uses_non_fasting_limit() {
        let ok = vec![sugar(now(), 130.0, SugarTestType::PostMeal)];
        assert_eq!(classify_patient_status(&ok, now()), PatientStatus::Normal);

        let high = vec![sugar(now(), 150.0, SugarTestType::PostMeal)];
        assert_eq!(classify_patient_status(&high, now()), PatientStatus::Critical);
    }

    #[test]
    fn test_old_breach_does_not_count() {
        let records = vec![
            bp(now() - Duration::days(8), 170.0, 110.0),
            movement(now() - Duration::days(1)),
        ];
        assert_eq!(classify_patient_status(&records, now()), PatientStatus::Normal);
    }

    #[test]
    fn test_nothing_recent_needs_attention() {
        let records = vec![sugar(now() - Duration::days(10), 80.0, SugarTestType::Fasting)];
        assert_eq!(classify_patient_status(&records, now()), PatientStatus::Attention);
    }

    #[test]
    fn test_unreadable_dates_are_not_recent() {
        let mut record = bp(now(), 180.0, 120.0);
        record.date = "yesterday-ish".to_string();
        assert_eq!(classify_patient_status(&[record], now()), PatientStatus::Attention);
    }

    #[test]
    fn test_malformed_reading_is_skipped() {
        let records = vec![bp(now(), f64::NAN, f64::NAN)];
        assert_eq!(classify_patient_status(&records, now()), PatientStatus::Normal);
    }

    #[test]
    fn test_unknown_test_type_uses_non_fasting_limit() {
        let ok = vec![sugar(now(), 120.0, SugarTestType::Unknown)];
        assert_eq!(classify_patient_status(&ok, now()), PatientStatus::Normal);

        let high = vec![sugar(now(), 200.0, SugarTestType::Unknown)];
        assert_eq!(classify_patient_status(&high, now()), PatientStatus::Critical);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = ClinicalThresholds {
            systolic_max: 130.0,
            ..ClinicalThresholds::default()
        };
        let records = vec![bp(now(), 135.0, 80.0)];
        assert_eq!(
            classify_patient_status_with(&records, now(), &thresholds),
            PatientStatus::Critical
        );
        assert_eq!(classify_patient_status(&records, now()), PatientStatus::Normal);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PatientStatus::Critical.to_string(), "critical");
        assert_eq!(
            serde_json::to_string(&PatientStatus::Attention).unwrap(),
            "\"attention\""
        );
    }
}
