//! Record access
//!
//! The classifier never fetches data itself. Callers hand it a complete
//! snapshot assembled through [`RecordSource`]; new records go in through
//! [`RecordSink`]. The coordinator zome implements both over the DHT, and
//! [`InMemoryRecordStore`] backs native tools and tests.

use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};

use crate::draft::{validate_record_data, RecordDraft};
use crate::error::TriageError;
use crate::notification::{compose_notification, NotificationSink, ProviderNotification};
use crate::patient::{CareAssignment, PatientProfile, PatientSnapshot};
use crate::record::HealthRecord;
use crate::snapshot::{load_snapshot, Snapshot};

/// Read side of record storage
pub trait RecordSource {
    type Error;

    /// Patients under the provider's active care, in registration order
    fn patients_for_provider(&self, provider_id: &str) -> Result<Vec<PatientProfile>, Self::Error>;

    /// Every record the patient has logged
    fn records_for_patient(&self, patient_id: &str) -> Result<Vec<HealthRecord>, Self::Error>;

    /// Full snapshot of a provider's patients, ready for classification
    fn snapshot_for_provider(&self, provider_id: &str) -> Result<Vec<PatientSnapshot>, Self::Error> {
        self.patients_for_provider(provider_id)?
            .into_iter()
            .map(|profile| {
                let records = self.records_for_patient(&profile.id)?;
                Ok(PatientSnapshot::new(profile, records))
            })
            .collect()
    }
}

/// Write side of record storage. Records are append-only.
pub trait RecordSink {
    type Error;

    fn append_record(&mut self, record: HealthRecord) -> Result<(), Self::Error>;
}

/// Store holding patients, their records and care assignments in memory
#[derive(Clone, Debug, Default)]
pub struct InMemoryRecordStore {
    patients: Vec<PatientProfile>,
    records: HashMap<String, Vec<HealthRecord>>,
    assignments: Vec<CareAssignment>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a loaded snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::new();
        for patient in snapshot.patients {
            store.records.insert(patient.profile.id.clone(), patient.health_records);
            store.patients.push(patient.profile);
        }
        store.assignments = snapshot.assignments;
        store
    }

    /// Build a store from a JSON array of registered users
    pub fn from_json(json: &str) -> Result<Self, TriageError> {
        Ok(Self::from_snapshot(load_snapshot(json)?))
    }

    /// Register a patient, replacing the profile if the id is already known
    pub fn add_patient(&mut self, profile: PatientProfile) {
        match self.patients.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => {
                self.records.entry(profile.id.clone()).or_default();
                self.patients.push(profile);
            }
        }
    }

    pub fn patient(&self, patient_id: &str) -> Option<&PatientProfile> {
        self.patients.iter().find(|p| p.id == patient_id)
    }

    pub fn patients(&self) -> &[PatientProfile] {
        &self.patients
    }

    pub fn assignments(&self) -> &[CareAssignment] {
        &self.assignments
    }

    /// Put a patient under a provider's care
    pub fn assign(&mut self, assignment: CareAssignment) -> Result<(), TriageError> {
        if self.patient(&assignment.patient_id).is_none() {
            return Err(TriageError::UnknownPatient(assignment.patient_id));
        }
        self.assignments.retain(|a| {
            !(a.provider_id == assignment.provider_id && a.patient_id == assignment.patient_id)
        });
        self.assignments.push(assignment);
        Ok(())
    }

    /// Providers actively caring for a patient
    pub fn providers_for_patient(&self, patient_id: &str) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|a| a.active && a.patient_id == patient_id)
            .map(|a| a.provider_id.as_str())
            .collect()
    }

    /// Snapshot of every registered patient
    pub fn snapshots(&self) -> Vec<PatientSnapshot> {
        self.patients
            .iter()
            .map(|profile| {
                let records = self.records.get(&profile.id).cloned().unwrap_or_default();
                PatientSnapshot::new(profile.clone(), records)
            })
            .collect()
    }

    /// Validate a draft, append it, and notify every active provider of the patient.
    ///
    /// Once the record is appended the call succeeds. Notifications the sink
    /// refuses come back in [`LoggedRecord::undelivered`]; retrying the whole
    /// call would store the record twice.
    pub fn log_record<N>(
        &mut self,
        patient_id: &str,
        record_id: impl Into<String>,
        draft: RecordDraft,
        now: DateTime<Utc>,
        sink: &mut N,
    ) -> Result<LoggedRecord, TriageError>
    where
        N: NotificationSink,
        N::Error: Display,
    {
        let profile = self
            .patient(patient_id)
            .cloned()
            .ok_or_else(|| TriageError::UnknownPatient(patient_id.to_string()))?;
        let record = draft.into_record(record_id, patient_id, now)?;
        self.append_record(record.clone())?;

        let providers: Vec<String> = self
            .providers_for_patient(patient_id)
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut undelivered = Vec::new();
        for provider in providers {
            let notification = compose_notification(&profile, provider, &record);
            if let Err(e) = sink.deliver(notification.clone()) {
                tracing::warn!(to = %notification.to, error = %e, "provider notification not delivered");
                undelivered.push(DeliveryFailure {
                    notification,
                    reason: e.to_string(),
                });
            }
        }
        Ok(LoggedRecord {
            record,
            undelivered,
        })
    }
}

/// A notification the sink refused
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub notification: ProviderNotification,
    pub reason: String,
}

/// Result of [`InMemoryRecordStore::log_record`]: the stored record and any
/// notifications that could not be delivered
#[derive(Clone, Debug, PartialEq)]
pub struct LoggedRecord {
    pub record: HealthRecord,
    pub undelivered: Vec<DeliveryFailure>,
}

impl RecordSource for InMemoryRecordStore {
    type Error = TriageError;

    fn patients_for_provider(&self, provider_id: &str) -> Result<Vec<PatientProfile>, Self::Error> {
        Ok(self
            .patients
            .iter()
            .filter(|patient| {
                self.assignments.iter().any(|a| {
                    a.active && a.provider_id == provider_id && a.patient_id == patient.id
                })
            })
            .cloned()
            .collect())
    }

    fn records_for_patient(&self, patient_id: &str) -> Result<Vec<HealthRecord>, Self::Error> {
        self.records
            .get(patient_id)
            .cloned()
            .ok_or_else(|| TriageError::UnknownPatient(patient_id.to_string()))
    }
}

impl RecordSink for InMemoryRecordStore {
    type Error = TriageError;

    fn append_record(&mut self, record: HealthRecord) -> Result<(), Self::Error> {
        validate_record_data(&record.data)?;
        let records = self
            .records
            .get_mut(&record.patient_id)
            .ok_or_else(|| TriageError::UnknownPatient(record.patient_id.clone()))?;
        tracing::debug!(patient_id = %record.patient_id, record_id = %record.id, kind = %record.kind().as_str(), "appending health record");
        records.push(record);
        Ok(())
    }
}
