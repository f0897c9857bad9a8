//! Record entry
//!
//! Patients fill in forms field by field; a [`RecordDraft`] holds the raw
//! text and turns into validated [`RecordData`] only when every required
//! field is present and readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TriageError;
use crate::record::{
    BabyMovementData, BloodPressureData, HealthRecord, RecordData, RecordKind, SugarLevelData,
    SugarTestType, WeeklyUpdateData,
};

pub const MOOD_MIN: u8 = 1;
pub const MOOD_MAX: u8 = 10;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BloodPressureDraft {
    pub systolic: String,
    pub diastolic: String,
    pub heart_rate: String,
    pub notes: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SugarLevelDraft {
    #[serde(default)]
    pub level: String,
    pub test_type: SugarTestType,
    #[serde(default)]
    pub notes: String,
}

impl Default for SugarLevelDraft {
    fn default() -> Self {
        Self {
            level: String::new(),
            test_type: SugarTestType::Fasting,
            notes: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BabyMovementDraft {
    pub count: String,
    /// Minutes
    pub duration: String,
    pub notes: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyUpdateDraft {
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub mood: u8,
    #[serde(default)]
    pub notes: String,
}

impl Default for WeeklyUpdateDraft {
    fn default() -> Self {
        Self {
            weight: String::new(),
            symptoms: Vec::new(),
            mood: 5,
            notes: String::new(),
        }
    }
}

/// Unsubmitted record form
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "form", rename_all = "snake_case")]
pub enum RecordDraft {
    BloodPressure(BloodPressureDraft),
    SugarLevel(SugarLevelDraft),
    BabyMovement(BabyMovementDraft),
    WeeklyUpdate(WeeklyUpdateDraft),
}

impl RecordDraft {
    /// Empty form for a record kind
    pub fn empty(kind: RecordKind) -> Self {
        match kind {
            RecordKind::BloodPressure => RecordDraft::BloodPressure(BloodPressureDraft::default()),
            RecordKind::SugarLevel => RecordDraft::SugarLevel(SugarLevelDraft::default()),
            RecordKind::BabyMovement => RecordDraft::BabyMovement(BabyMovementDraft::default()),
            RecordKind::WeeklyUpdate => RecordDraft::WeeklyUpdate(WeeklyUpdateDraft::default()),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            RecordDraft::BloodPressure(_) => RecordKind::BloodPressure,
            RecordDraft::SugarLevel(_) => RecordKind::SugarLevel,
            RecordDraft::BabyMovement(_) => RecordKind::BabyMovement,
            RecordDraft::WeeklyUpdate(_) => RecordKind::WeeklyUpdate,
        }
    }

    /// Parse and validate the form. Whole-number fields drop any fraction.
    pub fn into_record_data(self) -> Result<RecordData, TriageError> {
        let data = match self {
            RecordDraft::BloodPressure(form) => RecordData::BloodPressure(BloodPressureData {
                systolic: whole_number("systolic", &form.systolic)?,
                diastolic: whole_number("diastolic", &form.diastolic)?,
                heart_rate: whole_number("heartRate", &form.heart_rate)?,
                notes: notes(form.notes),
            }),
            RecordDraft::SugarLevel(form) => RecordData::SugarLevel(SugarLevelData {
                level: required_number("level", &form.level)?,
                test_type: form.test_type,
                notes: notes(form.notes),
            }),
            RecordDraft::BabyMovement(form) => RecordData::BabyMovement(BabyMovementData {
                count: whole_number("count", &form.count)?,
                duration: whole_number("duration", &form.duration)?,
                notes: notes(form.notes),
            }),
            RecordDraft::WeeklyUpdate(form) => RecordData::WeeklyUpdate(WeeklyUpdateData {
                weight: required_number("weight", &form.weight)?,
                mood: form.mood,
                symptoms: form
                    .symptoms
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                notes: notes(form.notes),
            }),
        };
        validate_record_data(&data)?;
        Ok(data)
    }

    /// Validate the form and stamp it as a new record at `now`
    pub fn into_record(
        self,
        id: impl Into<String>,
        patient_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<HealthRecord, TriageError> {
        let data = self.into_record_data()?;
        Ok(HealthRecord::new(id, patient_id, now, data))
    }
}

/// Check a payload is fit to be stored.
///
/// Stricter than the classifier, which tolerates whatever is already stored.
pub fn validate_record_data(data: &RecordData) -> Result<(), TriageError> {
    match data {
        RecordData::BloodPressure(bp) => {
            positive("systolic", bp.systolic)?;
            positive("diastolic", bp.diastolic)?;
            if !(20.0..=300.0).contains(&bp.heart_rate) {
                return Err(TriageError::OutOfRange {
                    field: "heartRate",
                    reason: "heart rate must be between 20 and 300 bpm".to_string(),
                });
            }
        }
        RecordData::SugarLevel(sugar) => {
            positive("level", sugar.level)?;
            if sugar.test_type == SugarTestType::Unknown {
                return Err(TriageError::MissingField { field: "testType" });
            }
        }
        RecordData::BabyMovement(movement) => {
            if !movement.count.is_finite() || movement.count < 0.0 {
                return Err(TriageError::OutOfRange {
                    field: "count",
                    reason: "movement count cannot be negative".to_string(),
                });
            }
            positive("duration", movement.duration)?;
        }
        RecordData::WeeklyUpdate(update) => {
            positive("weight", update.weight)?;
            if !(MOOD_MIN..=MOOD_MAX).contains(&update.mood) {
                return Err(TriageError::OutOfRange {
                    field: "mood",
                    reason: format!("mood must be between {} and {}", MOOD_MIN, MOOD_MAX),
                });
            }
        }
    }
    Ok(())
}

fn required_number(field: &'static str, raw: &str) -> Result<f64, TriageError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TriageError::MissingField { field });
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| TriageError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

fn whole_number(field: &'static str, raw: &str) -> Result<f64, TriageError> {
    required_number(field, raw).map(f64::trunc)
}

fn positive(field: &'static str, value: f64) -> Result<(), TriageError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TriageError::OutOfRange {
            field,
            reason: "must be a positive number".to_string(),
        })
    }
}

fn notes(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
