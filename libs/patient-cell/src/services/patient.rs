use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use shared_utils::clock::Clock;

use crate::models::{
    CreatePatientRequest, EmergencyContact, Patient, PatientError, PatientStatus, UpdatePatientRequest,
};
use crate::services::store::PatientStore;

const LIST_LIMIT: usize = 100;
const PHONE_PATTERN: &str = r"^\+?[\d\s\-\(\)]+$";

fn clean_name(value: &str, field: &str) -> Result<String, PatientError> {
    let value = value.trim().to_string();
    if value.is_empty() || value.chars().count() > 50 {
        return Err(PatientError::Validation(format!(
            "{} is required and cannot exceed 50 characters",
            field
        )));
    }
    Ok(value)
}

pub struct PatientService {
    store: Arc<dyn PatientStore>,
    clock: Arc<dyn Clock>,
    phone_regex: Option<Regex>,
    // one profile per account
    write_lock: Mutex<()>,
}

impl PatientService {
    pub fn new(store: Arc<dyn PatientStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            phone_regex: Regex::new(PHONE_PATTERN).ok(),
            write_lock: Mutex::new(()),
        }
    }

    fn check_phone(&self, phone: &str, field: &str) -> Result<String, PatientError> {
        let phone = phone.trim().to_string();
        let valid = !phone.is_empty()
            && self
                .phone_regex
                .as_ref()
                .map(|re| re.is_match(&phone))
                .unwrap_or(false);
        if !valid {
            return Err(PatientError::Validation(format!("{} is not a valid phone number", field)));
        }
        Ok(phone)
    }

    fn check_emergency_contact(&self, contact: EmergencyContact) -> Result<EmergencyContact, PatientError> {
        let name = contact.name.trim().to_string();
        let relationship = contact.relationship.trim().to_string();
        if name.is_empty() || relationship.is_empty() {
            return Err(PatientError::Validation(
                "emergency contact name and relationship are required".to_string(),
            ));
        }
        Ok(EmergencyContact {
            name,
            relationship,
            phone: self.check_phone(&contact.phone, "emergency contact phone")?,
        })
    }

    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        debug!("Creating patient profile for account {}", request.user_id);

        let first_name = clean_name(&request.first_name, "first name")?;
        let last_name = clean_name(&request.last_name, "last name")?;
        let now = self.clock.now();
        if request.date_of_birth > now.date_naive() {
            return Err(PatientError::Validation("date of birth cannot be in the future".to_string()));
        }
        let phone = self.check_phone(&request.phone, "phone")?;
        let alternate_phone = match request.alternate_phone.as_deref().map(str::trim) {
            Some(alt) if !alt.is_empty() => Some(self.check_phone(alt, "alternate phone")?),
            _ => None,
        };
        let emergency_contact = self.check_emergency_contact(request.emergency_contact)?;
        request.ayurvedic_profile.constitution.validate()?;

        let _guard = self.write_lock.lock().await;
        if self.store.find_by_id(request.user_id).await?.is_some() {
            return Err(PatientError::Validation(format!(
                "account {} already has a patient profile",
                request.user_id
            )));
        }

        let patient = Patient {
            id: request.user_id,
            first_name,
            last_name,
            date_of_birth: request.date_of_birth,
            gender: request.gender,
            phone,
            alternate_phone,
            address: request.address,
            emergency_contact,
            medical_history: request.medical_history,
            ayurvedic_profile: request.ayurvedic_profile,
            preferences: request.preferences,
            status: PatientStatus::Active,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        let saved = self.store.save(&patient).await?;
        info!("Patient {} created", saved.id);
        Ok(saved)
    }

    pub async fn get_patient(&self, id: Uuid) -> Result<Patient, PatientError> {
        self.store.find_by_id(id).await?.ok_or(PatientError::NotFound(id))
    }

    /// Active profiles, newest first.
    pub async fn list_active(&self) -> Result<Vec<Patient>, PatientError> {
        let mut patients: Vec<Patient> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(Patient::is_active)
            .collect();
        patients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        patients.truncate(LIST_LIMIT);
        Ok(patients)
    }

    pub async fn find_by_preferred_practitioner(&self, practitioner_id: Uuid) -> Result<Vec<Patient>, PatientError> {
        Ok(self
            .list_active()
            .await?
            .into_iter()
            .filter(|p| p.preferences.preferred_practitioner == Some(practitioner_id))
            .collect())
    }

    pub async fn update_patient(&self, id: Uuid, request: UpdatePatientRequest) -> Result<Patient, PatientError> {
        let _guard = self.write_lock.lock().await;
        let mut patient = self.get_patient(id).await?;

        if let Some(first_name) = request.first_name {
            patient.first_name = clean_name(&first_name, "first name")?;
        }
        if let Some(last_name) = request.last_name {
            patient.last_name = clean_name(&last_name, "last name")?;
        }
        if let Some(phone) = request.phone {
            patient.phone = self.check_phone(&phone, "phone")?;
        }
        if let Some(alt) = request.alternate_phone {
            patient.alternate_phone = if alt.trim().is_empty() {
                None
            } else {
                Some(self.check_phone(&alt, "alternate phone")?)
            };
        }
        if let Some(address) = request.address {
            patient.address = address;
        }
        if let Some(contact) = request.emergency_contact {
            patient.emergency_contact = self.check_emergency_contact(contact)?;
        }
        if let Some(history) = request.medical_history {
            patient.medical_history = history;
        }
        if let Some(profile) = request.ayurvedic_profile {
            profile.constitution.validate()?;
            patient.ayurvedic_profile = profile;
        }
        if let Some(preferences) = request.preferences {
            patient.preferences = preferences;
        }
        if request.notes.is_some() {
            patient.notes = request.notes;
        }
        patient.updated_at = self.clock.now();

        let saved = self.store.save(&patient).await?;
        info!("Patient {} updated", saved.id);
        Ok(saved)
    }

    /// Soft delete: the profile stays for appointment history.
    pub async fn deactivate(&self, id: Uuid) -> Result<Patient, PatientError> {
        let _guard = self.write_lock.lock().await;
        let mut patient = self.get_patient(id).await?;
        patient.status = PatientStatus::Inactive;
        patient.updated_at = self.clock.now();

        let saved = self.store.save(&patient).await?;
        info!("Patient {} deactivated", saved.id);
        Ok(saved)
    }

    /// Clinic date used for ages.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }
}
