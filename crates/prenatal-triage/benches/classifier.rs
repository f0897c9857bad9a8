//! Classifier Benchmarks
//!
//! Status classification, alert generation and dashboard building over
//! synthetic provider panels.
//! Run with: cargo bench -p prenatal-triage

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prenatal_triage::*;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
}

/// One record every twelve hours, cycling through the four record kinds
fn synthetic_records(patient: usize, count: usize) -> Vec<HealthRecord> {
    (0..count)
        .map(|i| {
            let data = match i % 4 {
                0 => RecordData::BloodPressure(BloodPressureData {
                    systolic: 110.0 + (i % 40) as f64,
                    diastolic: 70.0 + (i % 25) as f64,
                    heart_rate: 78.0,
                    notes: None,
                }),
                1 => RecordData::SugarLevel(SugarLevelData {
                    level: 80.0 + (i % 30) as f64,
                    test_type: SugarTestType::Fasting,
                    notes: None,
                }),
                2 => RecordData::BabyMovement(BabyMovementData {
                    count: 10.0,
                    duration: 60.0,
                    notes: None,
                }),
                _ => RecordData::WeeklyUpdate(WeeklyUpdateData {
                    weight: 62.0,
                    mood: 6,
                    symptoms: vec!["Fatigue".to_string()],
                    notes: None,
                }),
            };
            HealthRecord::new(
                format!("r{}-{}", patient, i),
                format!("p{}", patient),
                now() - Duration::hours(12 * i as i64),
                data,
            )
        })
        .collect()
}

fn synthetic_panel(patients: usize, records_each: usize) -> Vec<PatientSnapshot> {
    (0..patients)
        .map(|p| {
            PatientSnapshot::new(
                PatientProfile::new(format!("p{}", p), format!("Patient {}", p)),
                synthetic_records(p, records_each),
            )
        })
        .collect()
}

fn bench_status(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_patient_status");

    for count in [10, 100, 1000] {
        let records = synthetic_records(0, count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &records, |b, records| {
            b.iter(|| classify_patient_status(black_box(records), now()))
        });
    }

    group.finish();
}

fn bench_alerts(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_alerts");

    for patients in [10, 50, 200] {
        let panel = synthetic_panel(patients, 60);
        group.bench_with_input(BenchmarkId::from_parameter(patients), &panel, |b, panel| {
            b.iter(|| generate_alerts(black_box(panel), now()))
        });
    }

    group.finish();
}

fn bench_dashboard(c: &mut Criterion) {
    let panel = synthetic_panel(50, 60);
    let thresholds = ClinicalThresholds::default();

    c.bench_function("build_dashboard_50x60", |b| {
        b.iter(|| build_dashboard(black_box(&panel), now(), &thresholds))
    });
}

criterion_group!(benches, bench_status, bench_alerts, bench_dashboard);
criterion_main!(benches);
