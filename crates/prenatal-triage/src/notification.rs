//! Provider notifications
//!
//! Every logged record produces a short text summary for the patient's care
//! providers. Delivery is behind [`NotificationSink`]; nothing here sends
//! mail.

use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::patient::PatientProfile;
use crate::record::{parse_record_date, HealthRecord, RecordData};

/// Message addressed to one provider
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderNotification {
    /// Provider contact (email or agent key)
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// One-line summary of a record's payload
pub fn notification_content(data: &RecordData) -> String {
    match data {
        RecordData::BloodPressure(bp) => format!(
            "Blood Pressure: {}/{} mmHg, Heart Rate: {} bpm",
            bp.systolic, bp.diastolic, bp.heart_rate
        ),
        RecordData::SugarLevel(sugar) => {
            format!("Sugar Level: {} mg/dL ({})", sugar.level, sugar.test_type)
        }
        RecordData::BabyMovement(movement) => format!(
            "Baby Movements: {} movements in {} minutes",
            movement.count, movement.duration
        ),
        RecordData::WeeklyUpdate(update) => format!(
            "Weight: {} kg, Mood: {}/10, Symptoms: {}",
            update.weight,
            update.mood,
            update.symptoms.join(", ")
        ),
    }
}

/// Compose the notification sent to `to` when `patient` logs `record`
pub fn compose_notification(
    patient: &PatientProfile,
    to: impl Into<String>,
    record: &HealthRecord,
) -> ProviderNotification {
    let date = parse_record_date(&record.date)
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| record.date.clone());

    let mut body = format!(
        "Patient: {}\nRecord Type: {}\nDate: {}\n\n{}\n",
        patient.name,
        record.kind().label().to_uppercase(),
        date,
        notification_content(&record.data)
    );
    if let Some(notes) = record.data.notes() {
        body.push_str(&format!("Notes: {}\n", notes));
    }
    body.push_str("\nPlease review the patient's dashboard for complete details.");

    ProviderNotification {
        to: to.into(),
        subject: format!("Health Update from {}", patient.name),
        body,
    }
}

/// Destination for provider notifications
pub trait NotificationSink {
    type Error;

    fn deliver(&mut self, notification: ProviderNotification) -> Result<(), Self::Error>;
}

/// Writes notifications to the tracing log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    type Error = Infallible;

    fn deliver(&mut self, notification: ProviderNotification) -> Result<(), Self::Error> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            "provider notification\n{}",
            notification.body
        );
        Ok(())
    }
}

/// Collects notifications in memory
impl NotificationSink for Vec<ProviderNotification> {
    type Error = Infallible;

    fn deliver(&mut self, notification: ProviderNotification) -> Result<(), Self::Error> {
        self.push(notification);
        Ok(())
    }
}
