//! Prenatal Care Integrity Zome
//!
//! Defines entry types for pregnancy profiles, care providers, care
//! assignments and patient-logged health records. Health records are
//! append-only.

use hdi::prelude::*;
use prenatal_triage::{parse_record_date, validate_record_data, HealthRecord, PatientProfile};

pub use prenatal_triage::{CareRole, RecordData, RecordKind, SugarTestType};

/// Latest gestational week a profile may report
pub const MAX_GESTATIONAL_WEEK: u8 = 42;

/// Pregnancy profile of a patient
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct PregnancyProfile {
    /// Stable patient identifier
    pub patient_id: String,
    pub name: String,
    pub email: Option<String>,
    /// Estimated due date (ISO-8601)
    pub due_date: Option<String>,
    pub current_week: u8,
    /// Agent that registered the profile
    pub agent: AgentPubKey,
    pub created_at: Timestamp,
}

impl PregnancyProfile {
    /// Classifier view of the profile
    pub fn to_patient_profile(&self) -> PatientProfile {
        PatientProfile {
            id: self.patient_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            due_date: self.due_date.clone(),
            current_week: self.current_week,
        }
    }
}

/// Care provider (obstetrician, midwife, ...)
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub name: String,
    /// Where notifications are addressed
    pub contact: String,
    pub specialty: Option<String>,
    pub agent: AgentPubKey,
    pub created_at: Timestamp,
}

/// Puts a patient under a provider's care
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct CareAssignment {
    pub patient_hash: ActionHash,
    pub provider_hash: ActionHash,
    pub role: CareRole,
    pub assigned_at: Timestamp,
}

/// One observation logged by a patient
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct HealthRecordEntry {
    pub record_id: String,
    pub patient_hash: ActionHash,
    /// RFC 3339 timestamp of the observation
    pub date: String,
    pub data: RecordData,
}

impl HealthRecordEntry {
    /// Classifier view of the record, owned by `patient_id`
    pub fn to_health_record(&self, patient_id: &str) -> HealthRecord {
        HealthRecord {
            id: self.record_id.clone(),
            patient_id: patient_id.to_string(),
            date: self.date.clone(),
            data: self.data.clone(),
        }
    }
}

#[hdk_entry_types]
#[unit_enum(UnitEntryTypes)]
pub enum EntryTypes {
    PregnancyProfile(PregnancyProfile),
    ProviderProfile(ProviderProfile),
    CareAssignment(CareAssignment),
    HealthRecordEntry(HealthRecordEntry),
}

#[hdk_link_types]
pub enum LinkTypes {
    AllPatients,
    AllProviders,
    PatientToRecords,
    ProviderToPatients,
    PatientToProviders,
}

#[hdk_extern]
pub fn genesis_self_check(_data: GenesisSelfCheckData) -> ExternResult<ValidateCallbackResult> {
    Ok(ValidateCallbackResult::Valid)
}

#[hdk_extern]
pub fn validate(op: Op) -> ExternResult<ValidateCallbackResult> {
    match op.flattened::<EntryTypes, LinkTypes>()? {
        FlatOp::StoreEntry(store_entry) => match store_entry {
            OpEntry::CreateEntry { app_entry, .. } => validate_entry(&app_entry),
            OpEntry::UpdateEntry { app_entry, .. } => match app_entry {
                EntryTypes::HealthRecordEntry(_) => Ok(ValidateCallbackResult::Invalid(
                    "Health records are append-only".to_string(),
                )),
                other => validate_entry(&other),
            },
            _ => Ok(ValidateCallbackResult::Valid),
        },
        FlatOp::RegisterCreateLink { link_type, .. } => match link_type {
            LinkTypes::AllPatients => Ok(ValidateCallbackResult::Valid),
            LinkTypes::AllProviders => Ok(ValidateCallbackResult::Valid),
            LinkTypes::PatientToRecords => Ok(ValidateCallbackResult::Valid),
            LinkTypes::ProviderToPatients => Ok(ValidateCallbackResult::Valid),
            LinkTypes::PatientToProviders => Ok(ValidateCallbackResult::Valid),
        },
        FlatOp::RegisterDeleteLink { link_type, .. } => match link_type {
            LinkTypes::PatientToRecords => Ok(ValidateCallbackResult::Invalid(
                "Health records cannot be unlinked".to_string(),
            )),
            _ => Ok(ValidateCallbackResult::Valid),
        },
        _ => Ok(ValidateCallbackResult::Valid),
    }
}

fn validate_entry(entry: &EntryTypes) -> ExternResult<ValidateCallbackResult> {
    let result = match entry {
        EntryTypes::PregnancyProfile(profile) => check_pregnancy_profile(profile),
        EntryTypes::ProviderProfile(provider) => check_provider_profile(provider),
        EntryTypes::CareAssignment(assignment) => check_care_assignment(assignment),
        EntryTypes::HealthRecordEntry(record) => check_health_record(record),
    };
    Ok(match result {
        Ok(()) => ValidateCallbackResult::Valid,
        Err(reason) => ValidateCallbackResult::Invalid(reason),
    })
}

pub fn check_pregnancy_profile(profile: &PregnancyProfile) -> Result<(), String> {
    if profile.patient_id.trim().is_empty() {
        return Err("Patient ID cannot be empty".to_string());
    }
    if profile.name.trim().is_empty() {
        return Err("Patient name is required".to_string());
    }
    if profile.current_week > MAX_GESTATIONAL_WEEK {
        return Err(format!(
            "Current week must be at most {}",
            MAX_GESTATIONAL_WEEK
        ));
    }
    if let Some(due_date) = &profile.due_date {
        if parse_record_date(due_date).is_none() {
            return Err("Due date must be an ISO-8601 date".to_string());
        }
    }
    Ok(())
}

pub fn check_provider_profile(provider: &ProviderProfile) -> Result<(), String> {
    if provider.provider_id.trim().is_empty() {
        return Err("Provider ID cannot be empty".to_string());
    }
    if provider.name.trim().is_empty() {
        return Err("Provider name is required".to_string());
    }
    if provider.contact.trim().is_empty() {
        return Err("Provider contact is required".to_string());
    }
    Ok(())
}

pub fn check_care_assignment(assignment: &CareAssignment) -> Result<(), String> {
    match &assignment.role {
        CareRole::Other(role) if role.trim().is_empty() => {
            Err("Care role description is required".to_string())
        }
        _ => Ok(()),
    }
}

pub fn check_health_record(record: &HealthRecordEntry) -> Result<(), String> {
    if record.record_id.trim().is_empty() {
        return Err("Record ID cannot be empty".to_string());
    }
    if parse_record_date(&record.date).is_none() {
        return Err("Record date must be an RFC 3339 timestamp".to_string());
    }
    validate_record_data(&record.data).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prenatal_triage::{BloodPressureData, SugarLevelData};

    fn agent() -> AgentPubKey {
        AgentPubKey::from_raw_36(vec![0xdb; 36])
    }

    fn action_hash(byte: u8) -> ActionHash {
        ActionHash::from_raw_36(vec![byte; 36])
    }

    fn profile() -> PregnancyProfile {
        PregnancyProfile {
            patient_id: "p1".to_string(),
            name: "Priya Sharma".to_string(),
            email: None,
            due_date: Some("2024-09-01".to_string()),
            current_week: 28,
            agent: agent(),
            created_at: Timestamp::from_micros(0),
        }
    }

    fn blood_pressure(systolic: f64) -> HealthRecordEntry {
        HealthRecordEntry {
            record_id: "1718000000000".to_string(),
            patient_hash: action_hash(1),
            date: "2024-06-10T08:30:00.000Z".to_string(),
            data: RecordData::BloodPressure(BloodPressureData {
                systolic,
                diastolic: 80.0,
                heart_rate: 76.0,
                notes: None,
            }),
        }
    }

    #[test]
    fn test_valid_profile() {
        assert!(check_pregnancy_profile(&profile()).is_ok());
    }

    #[test]
    fn test_profile_week_limit() {
        let mut p = profile();
        p.current_week = 43;
        assert!(check_pregnancy_profile(&p).is_err());
        p.current_week = MAX_GESTATIONAL_WEEK;
        assert!(check_pregnancy_profile(&p).is_ok());
    }

    #[test]
    fn test_profile_due_date_must_parse() {
        let mut p = profile();
        p.due_date = Some("next spring".to_string());
        assert!(check_pregnancy_profile(&p).is_err());
        p.due_date = None;
        assert!(check_pregnancy_profile(&p).is_ok());
    }

    #[test]
    fn test_profile_requires_name() {
        let mut p = profile();
        p.name = "  ".to_string();
        assert_eq!(
            check_pregnancy_profile(&p),
            Err("Patient name is required".to_string())
        );
    }

    #[test]
    fn test_provider_requires_contact() {
        let provider = ProviderProfile {
            provider_id: "dr-001".to_string(),
            name: "Dr. Mehta".to_string(),
            contact: "".to_string(),
            specialty: Some("Obstetrics".to_string()),
            agent: agent(),
            created_at: Timestamp::from_micros(0),
        };
        assert!(check_provider_profile(&provider).is_err());
    }

    #[test]
    fn test_care_role_other_needs_description() {
        let mut assignment = CareAssignment {
            patient_hash: action_hash(1),
            provider_hash: action_hash(2),
            role: CareRole::Other(" ".to_string()),
            assigned_at: Timestamp::from_micros(0),
        };
        assert!(check_care_assignment(&assignment).is_err());
        assignment.role = CareRole::Other("Doula".to_string());
        assert!(check_care_assignment(&assignment).is_ok());
    }

    #[test]
    fn test_health_record_validation() {
        assert!(check_health_record(&blood_pressure(150.0)).is_ok());
        assert!(check_health_record(&blood_pressure(f64::NAN)).is_err());

        let mut bad_date = blood_pressure(120.0);
        bad_date.date = "yesterday".to_string();
        assert!(check_health_record(&bad_date).is_err());
    }

    #[test]
    fn test_to_health_record() {
        let entry = HealthRecordEntry {
            record_id: "r9".to_string(),
            patient_hash: action_hash(1),
            date: "2024-06-10T08:30:00.000Z".to_string(),
            data: RecordData::SugarLevel(SugarLevelData {
                level: 92.0,
                test_type: SugarTestType::Fasting,
                notes: None,
            }),
        };
        let record = entry.to_health_record("p1");
        assert_eq!(record.id, "r9");
        assert_eq!(record.patient_id, "p1");
        assert_eq!(record.kind(), RecordKind::SugarLevel);
    }

    #[test]
    fn test_profile_to_patient_profile() {
        let patient = profile().to_patient_profile();
        assert_eq!(patient.id, "p1");
        assert_eq!(patient.initials(), "PS");
        assert_eq!(patient.current_week, 28);
    }
}
