//! Prenatal Triage
//!
//! Health record triage for pregnancy care. Patients log blood pressure,
//! blood sugar, fetal movement counts and weekly updates; providers see a
//! triage status per patient and a short list of alerts.
//!
//! The core is a pure, synchronous classifier:
//! - [`classify_patient_status`] maps one patient's records to
//!   [`PatientStatus`]
//! - [`generate_alerts`] maps a provider's patients to at most five
//!   [`Alert`]s
//!
//! Both take an explicit `now` and a complete snapshot, never fail, and
//! give the same answer for the same input. Storage and delivery sit
//! behind [`RecordSource`], [`RecordSink`] and [`NotificationSink`] so the
//! same code runs natively and inside the Holochain zomes.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use prenatal_triage::{
//!     classify_patient_status, BloodPressureData, HealthRecord, PatientStatus, RecordData,
//! };
//!
//! let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
//! let reading = HealthRecord::new(
//!     "r1",
//!     "patient-7",
//!     now,
//!     RecordData::BloodPressure(BloodPressureData {
//!         systolic: 150.0,
//!         diastolic: 95.0,
//!         heart_rate: 80.0,
//!         notes: None,
//!     }),
//! );
//! assert_eq!(classify_patient_status(&[reading], now), PatientStatus::Critical);
//! ```

pub mod alerts;
pub mod dashboard;
pub mod draft;
pub mod error;
pub mod notification;
pub mod patient;
pub mod record;
pub mod snapshot;
pub mod status;
pub mod store;
pub mod thresholds;

pub use alerts::{generate_alerts, generate_alerts_with, most_recent_record, time_ago, Alert, AlertSeverity};
pub use dashboard::{
    build_dashboard, evaluate_provider_panel, latest_record, pregnancy_progress, progress_percent,
    start_of_week, summarize_patient, weeks_remaining, DashboardStats, PatientSummary,
    PregnancyProgress, ProviderDashboard, PREGNANCY_WEEKS,
};
pub use draft::{
    validate_record_data, BabyMovementDraft, BloodPressureDraft, RecordDraft, SugarLevelDraft,
    WeeklyUpdateDraft,
};
pub use error::TriageError;
pub use notification::{
    compose_notification, notification_content, NotificationSink, ProviderNotification,
    TracingNotificationSink,
};
pub use patient::{CareAssignment, CareRole, PatientProfile, PatientSnapshot};
pub use record::{
    format_record_date, parse_record_date, BabyMovementData, BloodPressureData, HealthRecord,
    RecordData, RecordKind, SugarLevelData, SugarTestType, WeeklyUpdateData,
};
pub use snapshot::{append_to_export, load_snapshot, Snapshot};
pub use status::{classify_patient_status, classify_patient_status_with, PatientStatus};
pub use store::{DeliveryFailure, InMemoryRecordStore, LoggedRecord, RecordSink, RecordSource};
pub use thresholds::ClinicalThresholds;
