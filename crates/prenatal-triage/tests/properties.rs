//! Property-based tests for the classifier
//!
//! Random record sets over a 30 day span check the invariants that hold
//! regardless of input: the alert cap, idempotence, order independence and
//! the status priority rules.

use chrono::{DateTime, Duration, TimeZone, Utc};
use prenatal_triage::*;
use proptest::prelude::*;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
}

fn arb_test_type() -> impl Strategy<Value = SugarTestType> {
    prop_oneof![
        Just(SugarTestType::Fasting),
        Just(SugarTestType::Random),
        Just(SugarTestType::PostMeal),
        Just(SugarTestType::Unknown),
    ]
}

fn arb_data() -> impl Strategy<Value = RecordData> {
    prop_oneof![
        (80.0..200.0f64, 50.0..130.0f64, 50.0..130.0f64).prop_map(|(s, d, hr)| {
            RecordData::BloodPressure(BloodPressureData {
                systolic: s.round(),
                diastolic: d.round(),
                heart_rate: hr.round(),
                notes: None,
            })
        }),
        (60.0..220.0f64, arb_test_type()).prop_map(|(level, test_type)| {
            RecordData::SugarLevel(SugarLevelData {
                level: level.round(),
                test_type,
                notes: None,
            })
        }),
        (0.0..30.0f64, 10.0..180.0f64).prop_map(|(count, duration)| {
            RecordData::BabyMovement(BabyMovementData {
                count: count.round(),
                duration: duration.round(),
                notes: None,
            })
        }),
        (45.0..110.0f64, 1u8..=10).prop_map(|(weight, mood)| {
            RecordData::WeeklyUpdate(WeeklyUpdateData {
                weight,
                mood,
                symptoms: Vec::new(),
                notes: None,
            })
        }),
    ]
}

/// Records dated up to 30 days before `now`
fn arb_records() -> impl Strategy<Value = Vec<HealthRecord>> {
    proptest::collection::vec((0i64..30 * 24 * 60, arb_data()), 0..12).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (minutes_ago, data))| {
                HealthRecord::new(
                    format!("r{}", i),
                    "p",
                    now() - Duration::minutes(minutes_ago),
                    data,
                )
            })
            .collect()
    })
}

fn arb_patients() -> impl Strategy<Value = Vec<PatientSnapshot>> {
    proptest::collection::vec(arb_records(), 0..8).prop_map(|sets| {
        sets.into_iter()
            .enumerate()
            .map(|(i, records)| {
                PatientSnapshot::new(
                    PatientProfile::new(format!("p{}", i), format!("Patient {}", i)),
                    records,
                )
            })
            .collect()
    })
}

proptest! {
    /// Never more than five alerts
    #[test]
    fn alerts_are_capped(patients in arb_patients()) {
        prop_assert!(generate_alerts(&patients, now()).len() <= 5);
    }

    /// Same input and clock, same output
    #[test]
    fn evaluation_is_idempotent(patients in arb_patients()) {
        prop_assert_eq!(generate_alerts(&patients, now()), generate_alerts(&patients, now()));
        for patient in &patients {
            prop_assert_eq!(
                classify_patient_status(&patient.health_records, now()),
                classify_patient_status(&patient.health_records, now())
            );
        }
    }

    /// Status does not depend on record order
    #[test]
    fn status_ignores_order(records in arb_records()) {
        let mut reversed = records.clone();
        reversed.reverse();
        prop_assert_eq!(
            classify_patient_status(&records, now()),
            classify_patient_status(&reversed, now())
        );
    }

    /// A recent blood pressure breach makes the patient critical whatever else is logged
    #[test]
    fn recent_breach_is_critical(records in arb_records(), minutes_ago in 0i64..7 * 24 * 60) {
        let mut records = records;
        records.push(HealthRecord::new(
            "breach",
            "p",
            now() - Duration::minutes(minutes_ago),
            RecordData::BloodPressure(BloodPressureData {
                systolic: 160.0,
                diastolic: 100.0,
                heart_rate: 90.0,
                notes: None,
            }),
        ));
        prop_assert_eq!(classify_patient_status(&records, now()), PatientStatus::Critical);
    }

    /// Status agrees with the priority rules
    #[test]
    fn status_follows_priority_rules(records in arb_records()) {
        let thresholds = ClinicalThresholds::default();
        let recent: Vec<&HealthRecord> = records
            .iter()
            .filter(|r| now() - r.timestamp().unwrap() <= Duration::days(7))
            .collect();
        let expected = if records.is_empty() {
            PatientStatus::Attention
        } else if recent.iter().any(|r| thresholds.breach(&r.data).is_some()) {
            PatientStatus::Critical
        } else if recent.is_empty() {
            PatientStatus::Attention
        } else {
            PatientStatus::Normal
        };
        prop_assert_eq!(classify_patient_status(&records, now()), expected);
    }

    /// Every alert id is traceable to a record or patient
    #[test]
    fn alert_ids_are_well_formed(patients in arb_patients()) {
        for alert in generate_alerts_with(&patients, now(), &ClinicalThresholds { max_alerts: usize::MAX, ..ClinicalThresholds::default() }) {
            let ok = match alert.severity {
                AlertSeverity::Urgent => alert.id.starts_with("bp-"),
                AlertSeverity::Warning => alert.id.starts_with("sugar-"),
                AlertSeverity::Info => alert.id.starts_with("missed-"),
            };
            prop_assert!(ok, "unexpected alert id {} for {:?}", alert.id, alert.severity);
        }
    }
}
