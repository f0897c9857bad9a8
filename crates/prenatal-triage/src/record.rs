//! Health record data model
//!
//! A [`HealthRecord`] is one timestamped observation logged by a patient.
//! The payload is a closed sum type keyed by record type, so a blood
//! pressure record can never be read as a sugar reading.
//!
//! The JSON shape matches what the patient dashboard stores:
//!
//! ```json
//! {"id": "1718000000000", "patientId": "patient-7", "date": "2024-06-10T08:30:00.000Z",
//!  "type": "blood_pressure", "data": {"systolic": 150, "diastolic": 95, "heartRate": 80}}
//! ```

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// One timestamped health observation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub id: String,
    pub patient_id: String,
    /// ISO-8601 timestamp as entered; may be unparseable in legacy data
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub date: String,
    #[serde(flatten)]
    pub data: RecordData,
}

impl HealthRecord {
    /// Create a record stamped at `recorded_at`
    pub fn new(
        id: impl Into<String>,
        patient_id: impl Into<String>,
        recorded_at: DateTime<Utc>,
        data: RecordData,
    ) -> Self {
        Self {
            id: id.into(),
            patient_id: patient_id.into(),
            date: format_record_date(recorded_at),
            data,
        }
    }

    /// Parsed timestamp, or `None` when the stored date is unreadable
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_record_date(&self.date)
    }

    pub fn kind(&self) -> RecordKind {
        self.data.kind()
    }

    /// Time elapsed from the record date to `now` (negative for future dates)
    pub fn elapsed_since(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.timestamp().map(|at| now.signed_duration_since(at))
    }

    /// Whether the record falls inside `window` before `now`.
    ///
    /// Records with unreadable dates are never inside any window.
    pub fn is_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.elapsed_since(now) {
            Some(elapsed) => elapsed <= window,
            None => {
                tracing::debug!(record_id = %self.id, date = %self.date, "record date unreadable, treated as not recent");
                false
            }
        }
    }
}

/// Record payload, tagged by record type
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RecordData {
    BloodPressure(BloodPressureData),
    SugarLevel(SugarLevelData),
    BabyMovement(BabyMovementData),
    WeeklyUpdate(WeeklyUpdateData),
}

impl RecordData {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordData::BloodPressure(_) => RecordKind::BloodPressure,
            RecordData::SugarLevel(_) => RecordKind::SugarLevel,
            RecordData::BabyMovement(_) => RecordKind::BabyMovement,
            RecordData::WeeklyUpdate(_) => RecordKind::WeeklyUpdate,
        }
    }

    pub fn notes(&self) -> Option<&str> {
        let notes = match self {
            RecordData::BloodPressure(d) => d.notes.as_deref(),
            RecordData::SugarLevel(d) => d.notes.as_deref(),
            RecordData::BabyMovement(d) => d.notes.as_deref(),
            RecordData::WeeklyUpdate(d) => d.notes.as_deref(),
        };
        notes.filter(|n| !n.trim().is_empty())
    }
}

/// Blood pressure reading (mmHg, bpm)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BloodPressureData {
    #[serde(default = "not_a_number", deserialize_with = "lenient_number")]
    pub systolic: f64,
    #[serde(default = "not_a_number", deserialize_with = "lenient_number")]
    pub diastolic: f64,
    #[serde(default = "not_a_number", deserialize_with = "lenient_number")]
    pub heart_rate: f64,
    #[serde(
        default,
        deserialize_with = "lenient_or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

/// Blood glucose reading (mg/dL)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SugarLevelData {
    #[serde(default = "not_a_number", deserialize_with = "lenient_number")]
    pub level: f64,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub test_type: SugarTestType,
    #[serde(
        default,
        deserialize_with = "lenient_or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

/// How the sugar sample was taken. Stored records with a missing or
/// unrecognised value read as `Unknown`, which is held to the non-fasting
/// limit.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SugarTestType {
    Fasting,
    Random,
    PostMeal,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SugarTestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SugarTestType::Fasting => "fasting",
            SugarTestType::Random => "random",
            SugarTestType::PostMeal => "post_meal",
            SugarTestType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SugarTestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Fetal movement count over a session (count, minutes)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BabyMovementData {
    #[serde(default = "not_a_number", deserialize_with = "lenient_number")]
    pub count: f64,
    #[serde(default = "not_a_number", deserialize_with = "lenient_number")]
    pub duration: f64,
    #[serde(
        default,
        deserialize_with = "lenient_or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

/// Weekly check-in: weight (kg), mood (1-10), symptoms
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyUpdateData {
    #[serde(default = "not_a_number", deserialize_with = "lenient_number")]
    pub weight: f64,
    #[serde(default = "default_mood", deserialize_with = "lenient_mood")]
    pub mood: u8,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub symptoms: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

/// Record type without payload
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    BloodPressure,
    SugarLevel,
    BabyMovement,
    WeeklyUpdate,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::BloodPressure,
        RecordKind::SugarLevel,
        RecordKind::BabyMovement,
        RecordKind::WeeklyUpdate,
    ];

    /// Wire tag, e.g. `blood_pressure`
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::BloodPressure => "blood_pressure",
            RecordKind::SugarLevel => "sugar_level",
            RecordKind::BabyMovement => "baby_movement",
            RecordKind::WeeklyUpdate => "weekly_update",
        }
    }

    /// Title-case label, e.g. `Blood Pressure`
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::BloodPressure => "Blood Pressure",
            RecordKind::SugarLevel => "Sugar Level",
            RecordKind::BabyMovement => "Baby Movement",
            RecordKind::WeeklyUpdate => "Weekly Update",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// Parse a stored record date.
///
/// Accepts RFC 3339 (`2024-06-10T08:30:00.000Z`), a zone-less date-time
/// (read as UTC) and a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_record_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format a timestamp the way records store it (millisecond RFC 3339, `Z`)
pub fn format_record_date(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn not_a_number() -> f64 {
    f64::NAN
}

fn default_mood() -> u8 {
    5
}

/// Numbers and numeric strings parse; anything else becomes NaN so it fails
/// every threshold comparison instead of rejecting the whole record.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

/// Whole moods read truncated; anything outside 0..=255 or non-numeric
/// falls back to the neutral default.
fn lenient_mood<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let mood = lenient_number(deserializer)?;
    if mood.is_finite() && (0.0..=f64::from(u8::MAX)).contains(&mood) {
        Ok(mood.trunc() as u8)
    } else {
        Ok(default_mood())
    }
}

/// Values of the wrong shape read as the field's default, so one bad field
/// never drops the record.
fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
