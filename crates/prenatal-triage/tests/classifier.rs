//! Integration tests for the triage classifier
//!
//! Drives the public API end to end: export loading, status, alerts,
//! dashboard, record logging and notifications.

use chrono::{DateTime, Duration, TimeZone, Utc};
use prenatal_triage::*;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
}

fn bp(id: &str, at: DateTime<Utc>, systolic: f64, diastolic: f64) -> HealthRecord {
    HealthRecord::new(
        id,
        "p1",
        at,
        RecordData::BloodPressure(BloodPressureData {
            systolic,
            diastolic,
            heart_rate: 80.0,
            notes: None,
        }),
    )
}

fn sugar(id: &str, at: DateTime<Utc>, level: f64, test_type: SugarTestType) -> HealthRecord {
    HealthRecord::new(
        id,
        "p1",
        at,
        RecordData::SugarLevel(SugarLevelData {
            level,
            test_type,
            notes: None,
        }),
    )
}

fn patient(id: &str, name: &str, records: Vec<HealthRecord>) -> PatientSnapshot {
    PatientSnapshot::new(PatientProfile::new(id, name), records)
}

// =============================================================================
// Reference scenarios
// =============================================================================

#[test]
fn test_high_blood_pressure_now() {
    let records = vec![bp("r1", now(), 150.0, 95.0)];
    assert_eq!(classify_patient_status(&records, now()), PatientStatus::Critical);

    let alerts = generate_alerts(&[patient("p1", "Priya Sharma", records)], now());
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Urgent);
    assert!(alerts[0].message.contains("150/95"));
    assert_eq!(alerts[0].time, "Just now");
}

#[test]
fn test_high_fasting_sugar_now() {
    let records = vec![sugar("r1", now(), 100.0, SugarTestType::Fasting)];
    assert_eq!(classify_patient_status(&records, now()), PatientStatus::Critical);

    let alerts = generate_alerts(&[patient("p1", "Priya Sharma", records)], now());
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    assert_eq!(alerts[0].message, "High sugar level: 100 mg/dL (fasting)");
}

#[test]
fn test_normal_sugar_ten_days_ago() {
    let records = vec![sugar(
        "r1",
        now() - Duration::days(10),
        80.0,
        SugarTestType::Fasting,
    )];
    assert_eq!(classify_patient_status(&records, now()), PatientStatus::Attention);

    let alerts = generate_alerts(&[patient("p1", "Priya Sharma", records)], now());
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Info);
    assert_eq!(alerts[0].id, "missed-p1");
    assert_eq!(alerts[0].time, "10 days ago");
}

#[test]
fn test_breach_wins_over_stale_history() {
    let records = vec![
        sugar("old", now() - Duration::days(30), 80.0, SugarTestType::Fasting),
        bp("new", now() - Duration::hours(3), 142.0, 85.0),
    ];
    assert_eq!(classify_patient_status(&records, now()), PatientStatus::Critical);
}

#[test]
fn test_empty_snapshot() {
    assert_eq!(classify_patient_status(&[], now()), PatientStatus::Attention);
    assert!(generate_alerts(&[], now()).is_empty());
    assert!(generate_alerts(&[patient("p1", "Priya Sharma", vec![])], now()).is_empty());
}

// =============================================================================
// Export -> dashboard
// =============================================================================

const EXPORT: &str = r#"[
    {"id": "dr-001", "name": "Dr. Mehta", "role": "doctor"},
    {"id": "p1", "name": "Priya Sharma", "role": "patient", "doctorId": "dr-001",
     "currentWeek": 30, "dueDate": "2024-08-19",
     "healthRecords": [
        {"id": "r1", "patientId": "p1", "date": "2024-06-10T09:00:00.000Z",
         "type": "blood_pressure", "data": {"systolic": 150, "diastolic": 95, "heartRate": 80}},
        {"id": "r2", "patientId": "p1", "date": "2024-06-10T10:00:00.000Z",
         "type": "sugar_level", "data": {"level": "nope", "testType": "fasting"}}
     ]},
    {"id": "p2", "name": "Anita Rao", "role": "patient", "doctorId": "dr-001",
     "currentWeek": 12,
     "healthRecords": [
        {"id": "r3", "patientId": "p2", "date": "2024-05-20T08:00:00.000Z",
         "type": "weekly_update", "data": {"weight": 61.5, "mood": 6, "symptoms": ["Nausea"]}}
     ]},
    {"id": "p3", "name": "Meera Iyer", "role": "patient", "doctorId": "dr-002"}
]"#;

#[test]
fn test_export_to_provider_dashboard() {
    let store = InMemoryRecordStore::from_json(EXPORT).unwrap();
    let dashboard =
        evaluate_provider_panel(&store, "dr-001", now(), &ClinicalThresholds::default()).unwrap();

    assert_eq!(dashboard.stats.total_patients, 2);
    assert_eq!(dashboard.stats.urgent_cases, 1);
    assert_eq!(dashboard.stats.active_this_week, 1);

    let ids: Vec<&str> = dashboard.alerts.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["bp-r1", "missed-p2"]);
    assert_eq!(dashboard.alerts[0].time, "3 hours ago");
    assert_eq!(dashboard.alerts[1].message, "No health updates for 21 days");

    assert_eq!(dashboard.patients[0].status, PatientStatus::Critical);
    assert_eq!(dashboard.patients[1].status, PatientStatus::Attention);
}

#[test]
fn test_other_provider_sees_only_their_patients() {
    let store = InMemoryRecordStore::from_json(EXPORT).unwrap();
    let patients = store.snapshot_for_provider("dr-002").unwrap();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0].id(), "p3");
    assert_eq!(
        classify_patient_status(&patients[0].health_records, now()),
        PatientStatus::Attention
    );
}

#[test]
fn test_log_record_flips_status() {
    let mut store = InMemoryRecordStore::from_json(EXPORT).unwrap();
    let thresholds = ClinicalThresholds::default();
    let before = evaluate_provider_panel(&store, "dr-001", now(), &thresholds).unwrap();
    assert_eq!(before.patients[1].status, PatientStatus::Attention);

    let draft: RecordDraft = serde_json::from_str(
        r#"{"type": "baby_movement", "form": {"count": "14", "duration": "90"}}"#,
    )
    .unwrap();
    let mut outbox: Vec<ProviderNotification> = Vec::new();
    store
        .log_record("p2", "r4", draft, now(), &mut outbox)
        .unwrap();

    let after = evaluate_provider_panel(&store, "dr-001", now(), &thresholds).unwrap();
    assert_eq!(after.patients[1].status, PatientStatus::Normal);
    assert_eq!(after.stats.active_this_week, 2);

    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].to, "dr-001");
    assert_eq!(outbox[0].subject, "Health Update from Anita Rao");
    assert!(outbox[0]
        .body
        .contains("Baby Movements: 14 movements in 90 minutes"));
}

#[test]
fn test_custom_thresholds_from_json() {
    let thresholds =
        ClinicalThresholds::from_json_str(r#"{"max_alerts": 1, "stale_after_days": 30}"#).unwrap();
    let store = InMemoryRecordStore::from_json(EXPORT).unwrap();
    let patients = store.snapshot_for_provider("dr-001").unwrap();

    let alerts = generate_alerts_with(&patients, now(), &thresholds);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, "bp-r1");
}

#[test]
fn test_progress_for_exported_patient() {
    let store = InMemoryRecordStore::from_json(EXPORT).unwrap();
    let profile = store.patient("p1").unwrap();
    let progress = pregnancy_progress(profile, now());
    assert_eq!(progress.progress_percent, 75);
    assert_eq!(progress.weeks_remaining, 10);
}

// =============================================================================
// Malformed fields in stored records
// =============================================================================

const MALFORMED_EXPORT: &str = r#"[
    {"id": "p1", "name": "Priya Sharma", "healthRecords": [
        {"id": "r1", "date": "2024-06-10T08:00:00Z", "type": "sugar_level", "data": {"level": 80}}
    ]},
    {"id": "p2", "name": "Anita Rao", "healthRecords": [
        {"id": "r2", "date": "2024-06-10T08:00:00Z", "type": "weekly_update",
         "data": {"weight": 60, "mood": 7.5, "symptoms": null, "notes": 3}}
    ]},
    {"id": "p3", "name": "Meera Iyer", "healthRecords": [
        {"id": "r3", "date": "2024-06-10T08:00:00Z", "type": "sugar_level", "data": {"level": 200}}
    ]}
]"#;

#[test]
fn test_malformed_fields_still_count_as_recent() {
    let snapshot = load_snapshot(MALFORMED_EXPORT).unwrap();
    let statuses: Vec<PatientStatus> = snapshot
        .patients
        .iter()
        .map(|p| classify_patient_status(&p.health_records, now()))
        .collect();

    assert_eq!(
        statuses,
        vec![
            PatientStatus::Normal,
            PatientStatus::Normal,
            PatientStatus::Critical
        ]
    );
}

#[test]
fn test_missing_test_type_still_alerts() {
    let snapshot = load_snapshot(MALFORMED_EXPORT).unwrap();
    let alerts = generate_alerts(&snapshot.patients, now());

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, "sugar-r3");
    assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    assert_eq!(alerts[0].patient_name, "Meera Iyer");
    assert_eq!(alerts[0].time, "4 hours ago");
}
