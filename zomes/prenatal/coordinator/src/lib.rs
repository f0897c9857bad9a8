//! Prenatal Care Coordinator Zome
//!
//! Extern API for pregnancy profiles, care assignments and health record
//! logging, plus the provider views: patient status, alerts and the
//! dashboard. Every view re-reads the linked records and runs the triage
//! classifier over the full snapshot; nothing derived is stored.

use hdk::prelude::*;
use mycelix_prenatal_shared::{
    anchor_hash, decode_entries, links_to_records, links_to_records_paginated, now_utc,
    GetPatientRecordsInput, PaginatedResult, PaginationInput, PrenatalError,
    ALL_PATIENTS_ANCHOR, ALL_PROVIDERS_ANCHOR,
};
use prenatal_integrity::*;
use prenatal_triage::{
    classify_patient_status_with, compose_notification, evaluate_provider_panel,
    generate_alerts_with, pregnancy_progress, Alert, ClinicalThresholds, HealthRecord,
    NotificationSink, PatientProfile, PatientStatus, PregnancyProgress, ProviderDashboard,
    ProviderNotification, RecordDraft, RecordSource,
};

// ============================================================================
// Configuration
// ============================================================================

/// DNA properties read by this zome
#[derive(Serialize, Deserialize, SerializedBytes, Debug, Default)]
pub struct PrenatalProperties {
    #[serde(default)]
    pub clinical_thresholds: ClinicalThresholds,
}

/// Thresholds from the DNA properties, or the defaults when unset or invalid
fn clinical_thresholds() -> ExternResult<ClinicalThresholds> {
    let properties = dna_info()?.modifiers.properties;
    let thresholds = match PrenatalProperties::try_from(properties) {
        Ok(properties) => properties.clinical_thresholds,
        Err(e) => {
            tracing::debug!(error = ?e, "no clinical thresholds in DNA properties, using defaults");
            return Ok(ClinicalThresholds::default());
        }
    };
    match thresholds.validate() {
        Ok(()) => Ok(thresholds),
        Err(e) => {
            tracing::warn!(error = %e, "invalid clinical thresholds in DNA properties, using defaults");
            Ok(ClinicalThresholds::default())
        }
    }
}

// ============================================================================
// Profiles
// ============================================================================

#[derive(Serialize, Deserialize, Debug)]
pub struct CreatePregnancyProfileInput {
    pub patient_id: String,
    pub name: String,
    pub email: Option<String>,
    pub due_date: Option<String>,
    pub current_week: u8,
}

#[hdk_extern]
pub fn create_pregnancy_profile(input: CreatePregnancyProfileInput) -> ExternResult<Record> {
    let profile = PregnancyProfile {
        patient_id: input.patient_id,
        name: input.name,
        email: input.email,
        due_date: input.due_date,
        current_week: input.current_week,
        agent: agent_info()?.agent_initial_pubkey,
        created_at: sys_time()?,
    };

    let profile_hash = create_entry(&EntryTypes::PregnancyProfile(profile))?;
    let record = get(profile_hash.clone(), GetOptions::default())?.ok_or(
        PrenatalError::NotFound("Could not find newly created pregnancy profile".to_string()),
    )?;

    create_link(
        anchor_hash(ALL_PATIENTS_ANCHOR)?,
        profile_hash,
        LinkTypes::AllPatients,
        (),
    )?;

    Ok(record)
}

#[hdk_extern]
pub fn get_pregnancy_profile(patient_hash: ActionHash) -> ExternResult<Option<Record>> {
    get(patient_hash, GetOptions::default())
}

#[hdk_extern]
pub fn get_all_patients(_: ()) -> ExternResult<Vec<Record>> {
    let links = links_oldest_first(anchor_hash(ALL_PATIENTS_ANCHOR)?, LinkTypes::AllPatients)?;
    links_to_records(links)
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreateProviderProfileInput {
    pub provider_id: String,
    pub name: String,
    pub contact: String,
    pub specialty: Option<String>,
}

#[hdk_extern]
pub fn create_provider_profile(input: CreateProviderProfileInput) -> ExternResult<Record> {
    let provider = ProviderProfile {
        provider_id: input.provider_id,
        name: input.name,
        contact: input.contact,
        specialty: input.specialty,
        agent: agent_info()?.agent_initial_pubkey,
        created_at: sys_time()?,
    };

    let provider_hash = create_entry(&EntryTypes::ProviderProfile(provider))?;
    let record = get(provider_hash.clone(), GetOptions::default())?.ok_or(
        PrenatalError::NotFound("Could not find newly created provider profile".to_string()),
    )?;

    create_link(
        anchor_hash(ALL_PROVIDERS_ANCHOR)?,
        provider_hash,
        LinkTypes::AllProviders,
        (),
    )?;

    Ok(record)
}

#[hdk_extern]
pub fn get_provider_profile(provider_hash: ActionHash) -> ExternResult<Option<Record>> {
    get(provider_hash, GetOptions::default())
}

// ============================================================================
// Care assignments
// ============================================================================

#[derive(Serialize, Deserialize, Debug)]
pub struct AssignCareProviderInput {
    pub patient_hash: ActionHash,
    pub provider_hash: ActionHash,
    pub role: CareRole,
}

/// Put a patient under a provider's care
#[hdk_extern]
pub fn assign_care_provider(input: AssignCareProviderInput) -> ExternResult<Record> {
    fetch_entry::<PregnancyProfile>(&input.patient_hash, "pregnancy profile")?;
    fetch_entry::<ProviderProfile>(&input.provider_hash, "provider profile")?;

    let existing = links_oldest_first(input.provider_hash.clone(), LinkTypes::ProviderToPatients)?;
    let already_assigned = existing
        .iter()
        .any(|link| link.target.clone().into_action_hash().as_ref() == Some(&input.patient_hash));
    if already_assigned {
        return Err(PrenatalError::ValidationError(
            "Provider is already assigned to this patient".to_string(),
        )
        .into());
    }

    let assignment = CareAssignment {
        patient_hash: input.patient_hash.clone(),
        provider_hash: input.provider_hash.clone(),
        role: input.role,
        assigned_at: sys_time()?,
    };
    let assignment_hash = create_entry(&EntryTypes::CareAssignment(assignment))?;
    let record = get(assignment_hash, GetOptions::default())?.ok_or(PrenatalError::NotFound(
        "Could not find newly created care assignment".to_string(),
    ))?;

    create_link(
        input.provider_hash.clone(),
        input.patient_hash.clone(),
        LinkTypes::ProviderToPatients,
        (),
    )?;
    create_link(
        input.patient_hash,
        input.provider_hash,
        LinkTypes::PatientToProviders,
        (),
    )?;

    Ok(record)
}

/// Pregnancy profiles of the provider's patients
#[hdk_extern]
pub fn get_provider_patients(provider_hash: ActionHash) -> ExternResult<Vec<Record>> {
    let links = links_oldest_first(provider_hash, LinkTypes::ProviderToPatients)?;
    links_to_records(links)
}

// ============================================================================
// Health records
// ============================================================================

#[derive(Serialize, Deserialize, Debug)]
pub struct LogHealthRecordInput {
    pub patient_hash: ActionHash,
    pub draft: RecordDraft,
}

/// Signals emitted by this zome
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum PrenatalSignal {
    /// A patient logged a record; addressed to one of their providers
    ProviderNotification {
        patient_hash: ActionHash,
        notification: ProviderNotification,
    },
}

/// Delivers provider notifications as zome signals
struct SignalNotificationSink {
    patient_hash: ActionHash,
}

impl NotificationSink for SignalNotificationSink {
    type Error = WasmError;

    fn deliver(&mut self, notification: ProviderNotification) -> Result<(), Self::Error> {
        emit_signal(PrenatalSignal::ProviderNotification {
            patient_hash: self.patient_hash.clone(),
            notification,
        })
    }
}

/// Validate and append a record, then notify each of the patient's providers
#[hdk_extern]
pub fn log_health_record(input: LogHealthRecordInput) -> ExternResult<Record> {
    let profile = fetch_entry::<PregnancyProfile>(&input.patient_hash, "pregnancy profile")?;
    let now = now_utc()?;

    let health_record = input
        .draft
        .into_record(
            now.timestamp_millis().to_string(),
            profile.patient_id.clone(),
            now,
        )
        .map_err(PrenatalError::from)?;

    let entry = HealthRecordEntry {
        record_id: health_record.id.clone(),
        patient_hash: input.patient_hash.clone(),
        date: health_record.date.clone(),
        data: health_record.data.clone(),
    };
    let entry_hash = create_entry(&EntryTypes::HealthRecordEntry(entry))?;
    let record = get(entry_hash.clone(), GetOptions::default())?.ok_or(
        PrenatalError::NotFound("Could not find newly logged health record".to_string()),
    )?;

    create_link(
        input.patient_hash.clone(),
        entry_hash,
        LinkTypes::PatientToRecords,
        (),
    )?;

    let provider_links = links_oldest_first(input.patient_hash.clone(), LinkTypes::PatientToProviders)?;
    let providers = decode_entries::<ProviderProfile>(links_to_records(provider_links)?);
    let patient = profile.to_patient_profile();
    let mut sink = SignalNotificationSink {
        patient_hash: input.patient_hash,
    };
    for (_, provider) in providers {
        sink.deliver(compose_notification(&patient, provider.contact, &health_record))?;
    }

    Ok(record)
}

#[hdk_extern]
pub fn get_patient_records(patient_hash: ActionHash) -> ExternResult<Vec<Record>> {
    links_to_records(patient_record_links(&patient_hash)?)
}

#[hdk_extern]
pub fn get_patient_records_paginated(
    input: GetPatientRecordsInput,
) -> ExternResult<PaginatedResult<Record>> {
    let pagination = input.pagination.unwrap_or_default();
    let links = patient_record_links(&input.patient_hash)?;
    if links.is_empty() {
        return Ok(PaginatedResult::empty(&pagination));
    }
    links_to_records_paginated(links, &pagination)
}

// ============================================================================
// Triage views
// ============================================================================

#[hdk_extern]
pub fn get_patient_status(patient_hash: ActionHash) -> ExternResult<PatientStatus> {
    let profile = fetch_entry::<PregnancyProfile>(&patient_hash, "pregnancy profile")?;
    let records = patient_health_records(&patient_hash, &profile.patient_id)?;
    Ok(classify_patient_status_with(
        &records,
        now_utc()?,
        &clinical_thresholds()?,
    ))
}

#[hdk_extern]
pub fn get_provider_alerts(provider_hash: ActionHash) -> ExternResult<Vec<Alert>> {
    let source = DhtRecordSource::for_provider(&provider_hash)?;
    let patients = source.snapshot_for_provider(&source.provider_id)?;
    Ok(generate_alerts_with(&patients, now_utc()?, &clinical_thresholds()?))
}

#[hdk_extern]
pub fn get_provider_dashboard(provider_hash: ActionHash) -> ExternResult<ProviderDashboard> {
    let source = DhtRecordSource::for_provider(&provider_hash)?;
    evaluate_provider_panel(
        &source,
        &source.provider_id,
        now_utc()?,
        &clinical_thresholds()?,
    )
}

#[hdk_extern]
pub fn get_pregnancy_progress(patient_hash: ActionHash) -> ExternResult<PregnancyProgress> {
    let profile = fetch_entry::<PregnancyProfile>(&patient_hash, "pregnancy profile")?;
    Ok(pregnancy_progress(&profile.to_patient_profile(), now_utc()?))
}

// ============================================================================
// DHT record source
// ============================================================================

/// A provider's patient panel, resolved from the DHT
pub struct DhtRecordSource {
    provider_id: String,
    patients: Vec<(ActionHash, PregnancyProfile)>,
}

impl DhtRecordSource {
    pub fn for_provider(provider_hash: &ActionHash) -> ExternResult<Self> {
        let links = links_oldest_first(provider_hash.clone(), LinkTypes::ProviderToPatients)?;
        let patients = unique_by_hash(decode_entries::<PregnancyProfile>(links_to_records(
            links,
        )?));
        Ok(Self {
            provider_id: provider_hash.to_string(),
            patients,
        })
    }
}

impl RecordSource for DhtRecordSource {
    type Error = WasmError;

    fn patients_for_provider(&self, provider_id: &str) -> Result<Vec<PatientProfile>, Self::Error> {
        if provider_id != self.provider_id {
            return Err(PrenatalError::NotAssigned(provider_id.to_string()).into());
        }
        Ok(self
            .patients
            .iter()
            .map(|(_, profile)| profile.to_patient_profile())
            .collect())
    }

    fn records_for_patient(&self, patient_id: &str) -> Result<Vec<HealthRecord>, Self::Error> {
        let (patient_hash, _) = self
            .patients
            .iter()
            .find(|(_, profile)| profile.patient_id == patient_id)
            .ok_or(PrenatalError::NotFound(format!("patient {}", patient_id)))?;
        patient_health_records(patient_hash, patient_id)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn fetch_entry<T>(hash: &ActionHash, what: &str) -> ExternResult<T>
where
    T: TryFrom<SerializedBytes, Error = SerializedBytesError>,
{
    let record = get(hash.clone(), GetOptions::default())?
        .ok_or(PrenatalError::NotFound(what.to_string()))?;
    record
        .entry()
        .to_app_option::<T>()
        .map_err(|e| PrenatalError::InternalError(format!("Malformed {}: {:?}", what, e)))?
        .ok_or_else(|| PrenatalError::NotFound(what.to_string()).into())
}

/// Links from `base`, oldest first, so every read of an unchanged DHT sees
/// the same order
fn links_oldest_first(
    base: impl Into<AnyLinkableHash>,
    link_type: LinkTypes,
) -> ExternResult<Vec<Link>> {
    let mut links = get_links(
        LinkQuery::try_new(base, link_type)?,
        GetStrategy::default(),
    )?;
    sort_oldest_first(&mut links, |link| link.timestamp);
    Ok(links)
}

/// Stable sort by creation time; ties keep their fetched order
fn sort_oldest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> Timestamp) {
    items.sort_by_key(|item| created_at(item));
}

/// Record links in the order the records were logged
fn patient_record_links(patient_hash: &ActionHash) -> ExternResult<Vec<Link>> {
    links_oldest_first(patient_hash.clone(), LinkTypes::PatientToRecords)
}

fn patient_health_records(
    patient_hash: &ActionHash,
    patient_id: &str,
) -> ExternResult<Vec<HealthRecord>> {
    let records = links_to_records(patient_record_links(patient_hash)?)?;
    Ok(decode_entries::<HealthRecordEntry>(records)
        .into_iter()
        .map(|(_, entry)| entry.to_health_record(patient_id))
        .collect())
}

/// Keep the first occurrence of each hash
fn unique_by_hash<T>(entries: Vec<(ActionHash, T)>) -> Vec<(ActionHash, T)> {
    let mut seen = std::collections::HashSet::new();
    entries
        .into_iter()
        .filter(|(hash, _)| seen.insert(hash.clone()))
        .collect()
}
