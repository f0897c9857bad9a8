//! Clinical thresholds
//!
//! The limits the classifier compares readings against, plus the time
//! windows it evaluates. Defaults follow the values the dashboard shipped
//! with; deployments can override any subset from JSON.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::alerts::AlertSeverity;
use crate::error::TriageError;
use crate::record::{BloodPressureData, RecordData, SugarLevelData, SugarTestType};

/// Configurable clinical parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClinicalThresholds {
    /// Systolic pressure above this is high (mmHg)
    pub systolic_max: f64,
    /// Diastolic pressure above this is high (mmHg)
    pub diastolic_max: f64,
    /// Fasting glucose above this is high (mg/dL)
    pub fasting_sugar_max: f64,
    /// Random or post-meal glucose above this is high (mg/dL)
    pub non_fasting_sugar_max: f64,
    /// Window for "recent" when classifying status
    pub status_window_days: u32,
    /// Window for readings that raise alerts
    pub alert_window_hours: u32,
    /// A patient with no record for longer than this gets a missed check-in alert
    pub stale_after_days: u32,
    /// Maximum number of alerts returned
    pub max_alerts: usize,
}

impl Default for ClinicalThresholds {
    fn default() -> Self {
        Self {
            systolic_max: 140.0,
            diastolic_max: 90.0,
            fasting_sugar_max: 95.0,
            non_fasting_sugar_max: 140.0,
            status_window_days: 7,
            alert_window_hours: 24,
            stale_after_days: 7,
            max_alerts: 5,
        }
    }
}

impl ClinicalThresholds {
    /// Parse thresholds from JSON; omitted fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, TriageError> {
        let thresholds: Self = serde_json::from_str(json)?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Load thresholds from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TriageError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), TriageError> {
        let limits = [
            ("systolic_max", self.systolic_max),
            ("diastolic_max", self.diastolic_max),
            ("fasting_sugar_max", self.fasting_sugar_max),
            ("non_fasting_sugar_max", self.non_fasting_sugar_max),
        ];
        for (name, value) in limits {
            if !value.is_finite() || value <= 0.0 {
                return Err(TriageError::InvalidThresholds(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if self.status_window_days == 0 || self.stale_after_days == 0 {
            return Err(TriageError::InvalidThresholds(
                "day windows must be at least one day".to_string(),
            ));
        }
        if self.alert_window_hours == 0 {
            return Err(TriageError::InvalidThresholds(
                "alert window must be at least one hour".to_string(),
            ));
        }
        Ok(())
    }

    pub fn status_window(&self) -> Duration {
        Duration::days(i64::from(self.status_window_days))
    }

    pub fn alert_window(&self) -> Duration {
        Duration::hours(i64::from(self.alert_window_hours))
    }

    pub fn stale_after(&self) -> Duration {
        Duration::days(i64::from(self.stale_after_days))
    }

    /// NaN readings never count as high
    pub fn is_high_blood_pressure(&self, reading: &BloodPressureData) -> bool {
        reading.systolic > self.systolic_max || reading.diastolic > self.diastolic_max
    }

    pub fn is_high_sugar(&self, reading: &SugarLevelData) -> bool {
        match reading.test_type {
            SugarTestType::Fasting => reading.level > self.fasting_sugar_max,
            SugarTestType::Random | SugarTestType::PostMeal | SugarTestType::Unknown => {
                reading.level > self.non_fasting_sugar_max
            }
        }
    }

    /// Severity of the breach this payload represents, if any
    pub fn breach(&self, data: &RecordData) -> Option<AlertSeverity> {
        match data {
            RecordData::BloodPressure(bp) if self.is_high_blood_pressure(bp) => {
                Some(AlertSeverity::Urgent)
            }
            RecordData::SugarLevel(sugar) if self.is_high_sugar(sugar) => {
                Some(AlertSeverity::Warning)
            }
            _ => None,
        }
    }
}
