//! Mycelix Prenatal Shared Utilities
//!
//! Common functionality for the prenatal zomes:
//! - Anchor management
//! - Pagination and error types
//! - Batch record resolution from links
//! - Host time as `chrono` values for the triage classifier

use hdk::prelude::*;
use serde::{Deserialize, Serialize};

// Re-export commonly used items
pub use anchors::*;
pub use batch::*;
pub use time::*;
pub use types::*;

pub mod types {
    use super::*;
    use prenatal_triage::TriageError;

    /// Input for paginated queries
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PaginationInput {
        pub offset: usize,
        pub limit: usize,
    }

    impl PaginationInput {
        pub const MAX_LIMIT: usize = 100;

        pub fn validate(&self) -> ExternResult<()> {
            if self.limit > Self::MAX_LIMIT {
                return Err(PrenatalError::ValidationError(format!(
                    "Limit cannot exceed {}",
                    Self::MAX_LIMIT
                ))
                .into());
            }
            if self.limit == 0 {
                return Err(
                    PrenatalError::ValidationError("Limit must be greater than 0".to_string())
                        .into(),
                );
            }
            Ok(())
        }
    }

    impl Default for PaginationInput {
        fn default() -> Self {
            Self {
                offset: 0,
                limit: 50,
            }
        }
    }

    /// Result wrapper for paginated queries
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PaginatedResult<T> {
        pub items: Vec<T>,
        pub total: usize,
        pub offset: usize,
        pub limit: usize,
        pub has_more: bool,
    }

    impl<T> PaginatedResult<T> {
        pub fn new(items: Vec<T>, total: usize, pagination: &PaginationInput) -> Self {
            Self {
                has_more: pagination.offset + items.len() < total,
                items,
                total,
                offset: pagination.offset,
                limit: pagination.limit,
            }
        }

        pub fn empty(pagination: &PaginationInput) -> Self {
            Self {
                items: Vec::new(),
                total: 0,
                offset: pagination.offset,
                limit: pagination.limit,
                has_more: false,
            }
        }
    }

    /// Error types surfaced by the prenatal zomes
    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    pub enum PrenatalError {
        NotFound(String),
        ValidationError(String),
        /// Provider is not assigned to the patient
        NotAssigned(String),
        InternalError(String),
    }

    impl std::fmt::Display for PrenatalError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                PrenatalError::NotFound(msg) => write!(f, "Not found: {}", msg),
                PrenatalError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
                PrenatalError::NotAssigned(msg) => write!(f, "Not assigned: {}", msg),
                PrenatalError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            }
        }
    }

    impl From<PrenatalError> for WasmError {
        fn from(err: PrenatalError) -> Self {
            wasm_error!(WasmErrorInner::Guest(err.to_string()))
        }
    }

    impl From<TriageError> for PrenatalError {
        fn from(err: TriageError) -> Self {
            match err {
                TriageError::UnknownPatient(id) => PrenatalError::NotFound(format!("patient {}", id)),
                TriageError::Json(_) | TriageError::Io(_) | TriageError::Notification(_) => {
                    PrenatalError::InternalError(err.to_string())
                }
                other => PrenatalError::ValidationError(other.to_string()),
            }
        }
    }

    /// Input for paged record queries
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct GetPatientRecordsInput {
        pub patient_hash: ActionHash,
        pub pagination: Option<PaginationInput>,
    }
}

pub mod anchors {
    use super::*;

    pub const ALL_PATIENTS_ANCHOR: &str = "all_pregnancy_profiles";
    pub const ALL_PROVIDERS_ANCHOR: &str = "all_care_providers";

    /// Standard anchor entry type
    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
    pub struct Anchor(pub String);

    /// Get the entry hash for an anchor by hashing the serialized bytes
    pub fn anchor_hash(anchor_text: &str) -> ExternResult<EntryHash> {
        let anchor = Anchor(anchor_text.to_string());
        let bytes = serde_json::to_vec(&anchor).map_err(|e| {
            PrenatalError::InternalError(format!("Failed to serialize anchor: {}", e))
        })?;

        let entry = Entry::App(
            AppEntryBytes::try_from(
                SerializedBytes::try_from(UnsafeBytes::from(bytes)).map_err(|e| {
                    PrenatalError::InternalError(format!(
                        "Failed to create serialized bytes: {:?}",
                        e
                    ))
                })?,
            )
            .map_err(|e| {
                PrenatalError::InternalError(format!("Failed to create app entry bytes: {:?}", e))
            })?,
        );

        hash_entry(entry)
    }
}

pub mod batch {
    use super::*;

    /// Result of a batch get operation
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BatchGetResult {
        /// Successfully fetched records
        pub records: Vec<Record>,
        /// Hashes that were not found
        pub not_found: Vec<ActionHash>,
        pub total_requested: usize,
    }

    /// Fetch records for `hashes`, collecting misses instead of failing
    pub fn batch_get_records(hashes: Vec<ActionHash>) -> ExternResult<BatchGetResult> {
        let mut result = BatchGetResult {
            records: Vec::new(),
            not_found: Vec::new(),
            total_requested: hashes.len(),
        };

        for hash in hashes {
            match get(hash.clone(), GetOptions::default())? {
                Some(record) => result.records.push(record),
                None => result.not_found.push(hash),
            }
        }

        Ok(result)
    }

    /// Convert links to records with pagination
    pub fn links_to_records_paginated(
        links: Vec<Link>,
        pagination: &PaginationInput,
    ) -> ExternResult<PaginatedResult<Record>> {
        pagination.validate()?;

        let total = links.len();
        let hashes: Vec<ActionHash> = links
            .into_iter()
            .skip(pagination.offset)
            .take(pagination.limit)
            .filter_map(|link| link.target.into_action_hash())
            .collect();

        let batch_result = batch_get_records(hashes)?;
        Ok(PaginatedResult::new(batch_result.records, total, pagination))
    }

    /// Records at the targets of `links`, in link order
    pub fn links_to_records(links: Vec<Link>) -> ExternResult<Vec<Record>> {
        let hashes: Vec<ActionHash> = links
            .into_iter()
            .filter_map(|link| link.target.into_action_hash())
            .collect();

        Ok(batch_get_records(hashes)?.records)
    }

    /// Decode the app entries of `records`, skipping any that do not decode as `T`
    pub fn decode_entries<T>(records: Vec<Record>) -> Vec<(ActionHash, T)>
    where
        T: TryFrom<SerializedBytes, Error = SerializedBytesError>,
    {
        records
            .into_iter()
            .filter_map(|record| {
                let hash = record.action_address().clone();
                record
                    .entry()
                    .to_app_option::<T>()
                    .ok()
                    .flatten()
                    .map(|entry| (hash, entry))
            })
            .collect()
    }
}

/// Host time for the classifier
///
/// The classifier takes `now` explicitly; inside a zome it comes from
/// `sys_time()` rather than the OS clock.
pub mod time {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    const MICROS_PER_SECOND: i64 = 1_000_000;

    /// UTC date-time for microseconds since the Unix epoch
    pub fn micros_to_utc(micros: i64) -> Option<DateTime<Utc>> {
        let secs = micros.div_euclid(MICROS_PER_SECOND);
        let nanos = (micros.rem_euclid(MICROS_PER_SECOND) * 1_000) as u32;
        Utc.timestamp_opt(secs, nanos).single()
    }

    pub fn timestamp_to_utc(timestamp: Timestamp) -> ExternResult<DateTime<Utc>> {
        micros_to_utc(timestamp.as_micros()).ok_or_else(|| {
            PrenatalError::InternalError(format!("Timestamp out of range: {:?}", timestamp)).into()
        })
    }

    /// Current host time
    pub fn now_utc() -> ExternResult<DateTime<Utc>> {
        timestamp_to_utc(sys_time()?)
    }
}
