//! Patients and their care relationships

use serde::{Deserialize, Serialize};

use crate::record::HealthRecord;

/// Pregnancy profile of a registered patient
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Estimated due date, ISO-8601
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Gestational week the patient last reported
    #[serde(default)]
    pub current_week: u8,
}

impl PatientProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            due_date: None,
            current_week: 0,
        }
    }

    /// Avatar initials, e.g. "Priya Sharma" -> "PS"
    pub fn initials(&self) -> String {
        let initials: String = self
            .name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .collect();
        if initials.is_empty() {
            "P".to_string()
        } else {
            initials
        }
    }
}

/// A patient together with every record they have logged.
///
/// This is the complete snapshot the classifier works from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientSnapshot {
    #[serde(flatten)]
    pub profile: PatientProfile,
    #[serde(default)]
    pub health_records: Vec<HealthRecord>,
}

impl PatientSnapshot {
    pub fn new(profile: PatientProfile, health_records: Vec<HealthRecord>) -> Self {
        Self {
            profile,
            health_records,
        }
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }
}

/// Role a provider plays in a patient's care
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CareRole {
    Obstetrician,
    Midwife,
    Consultant,
    Other(String),
}

/// Explicit patient-provider relationship
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CareAssignment {
    pub provider_id: String,
    pub patient_id: String,
    pub role: CareRole,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

impl CareAssignment {
    pub fn new(provider_id: impl Into<String>, patient_id: impl Into<String>, role: CareRole) -> Self {
        Self {
            provider_id: provider_id.into(),
            patient_id: patient_id.into(),
            role,
            active: true,
        }
    }
}

fn active_by_default() -> bool {
    true
}
