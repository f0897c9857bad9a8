//! Snapshot loading
//!
//! Reads the registered-user export of the patient dashboard: a JSON array
//! of users, each patient carrying their own `healthRecords`. Loading is
//! lenient. A bad record is skipped with a warning instead of failing the
//! whole snapshot, and non-patient users are ignored.

use serde_json::Value;

use crate::error::TriageError;
use crate::patient::{CareAssignment, CareRole, PatientProfile, PatientSnapshot};
use crate::record::HealthRecord;

/// Patients and care assignments read from an export
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub patients: Vec<PatientSnapshot>,
    pub assignments: Vec<CareAssignment>,
}

/// Parse a registered-user export.
///
/// Fails only when the document is not a JSON array. A user's `doctorId`
/// becomes an obstetrician [`CareAssignment`]; an explicit `assignments`
/// array on the user is read as well.
pub fn load_snapshot(json: &str) -> Result<Snapshot, TriageError> {
    let users: Vec<Value> = serde_json::from_str(json)?;
    let mut snapshot = Snapshot::default();

    for (index, user) in users.into_iter().enumerate() {
        let role = user.get("role").and_then(Value::as_str);
        if role.map_or(false, |role| role != "patient") {
            tracing::debug!(index, role = ?role, "skipping non-patient user");
            continue;
        }

        let profile: PatientProfile = match serde_json::from_value(user.clone()) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping malformed patient");
                continue;
            }
        };

        if let Some(provider_id) = user.get("doctorId").and_then(Value::as_str) {
            snapshot.assignments.push(CareAssignment::new(
                provider_id,
                profile.id.clone(),
                CareRole::Obstetrician,
            ));
        }
        if let Some(Value::Array(assignments)) = user.get("assignments") {
            for raw in assignments {
                match serde_json::from_value::<CareAssignment>(raw.clone()) {
                    Ok(assignment) => snapshot.assignments.push(assignment),
                    Err(e) => {
                        tracing::warn!(patient_id = %profile.id, error = %e, "skipping malformed care assignment")
                    }
                }
            }
        }

        let records = match user.get("healthRecords") {
            Some(Value::Array(raw)) => read_records(&profile.id, raw),
            _ => Vec::new(),
        };
        snapshot.patients.push(PatientSnapshot::new(profile, records));
    }

    tracing::debug!(
        patients = snapshot.patients.len(),
        assignments = snapshot.assignments.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Append `record` to its patient's `healthRecords` in an export and return
/// the updated document. Every other user and field is kept as is.
pub fn append_to_export(json: &str, record: &HealthRecord) -> Result<String, TriageError> {
    let mut users: Vec<Value> = serde_json::from_str(json)?;
    let user = users
        .iter_mut()
        .find(|user| user.get("id").and_then(Value::as_str) == Some(record.patient_id.as_str()))
        .ok_or_else(|| TriageError::UnknownPatient(record.patient_id.clone()))?;

    let entry = serde_json::to_value(record)?;
    match user.get_mut("healthRecords") {
        Some(Value::Array(records)) => records.push(entry),
        _ => {
            if let Value::Object(fields) = user {
                fields.insert("healthRecords".to_string(), Value::Array(vec![entry]));
            }
        }
    }
    Ok(serde_json::to_string_pretty(&users)?)
}

fn read_records(patient_id: &str, raw: &[Value]) -> Vec<HealthRecord> {
    raw.iter()
        .filter_map(|value| {
            let mut value = value.clone();
            if let Value::Object(fields) = &mut value {
                fields
                    .entry("patientId")
                    .or_insert_with(|| Value::String(patient_id.to_string()));
            }
            match serde_json::from_value::<HealthRecord>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(patient_id, error = %e, "skipping malformed health record");
                    None
                }
            }
        })
        .collect()
}
