// libs/booking-cell/src/services/wizard.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::warn;

use identity_cell::services::profile::ProfileService;
use schedule_cell::slots;
use shared_backend::ClinicApiClient;
use shared_models::auth::{SessionStore, UserProfile};

use crate::models::{
    BookingConfirmation, BookingDraft, BookingError, Category, DoctorPreference, Service,
    SlotAvailability, WizardStep,
};
use crate::services::catalog::CatalogService;
use crate::services::submission;
use crate::services::validation;

/// Personal-details fields that can be locked by profile prefill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalField {
    Name,
    Email,
    Phone,
    Address,
    Weight,
    Height,
}

/// The step-wise booking dialogue.
///
/// Owns one [`BookingDraft`] for its lifetime. Guards run on every forward
/// transition; moving back never discards entered data. The draft resets
/// only on a successful submission.
pub struct BookingWizard {
    client: Arc<ClinicApiClient>,
    catalog: CatalogService,
    profiles: ProfileService,
    sessions: SessionStore,
    step: WizardStep,
    draft: BookingDraft,
    prefilled: UserProfile,
    submitting: bool,
}

impl BookingWizard {
    pub fn new(client: Arc<ClinicApiClient>, sessions: SessionStore) -> Self {
        Self {
            catalog: CatalogService::new(Arc::clone(&client)),
            profiles: ProfileService::new(Arc::clone(&client)),
            client,
            sessions,
            step: WizardStep::PersonalDetails,
            draft: BookingDraft::default(),
            prefilled: UserProfile::default(),
            submitting: false,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn is_authenticated(&self) -> bool {
        self.sessions.is_authenticated()
    }

    /// Pre-fill personal details from the stored profile when a session is
    /// present. A failed fetch leaves the form empty rather than blocking
    /// the dialogue.
    pub async fn open(&mut self) {
        let Some(token) = self.sessions.token() else {
            return;
        };

        match self.profiles.fetch_user_details(&token).await {
            Ok(profile) => {
                self.draft.name = profile.name.clone();
                self.draft.email = profile.email.clone();
                self.draft.phone = profile.phone.clone();
                self.draft.address = profile.address.clone();
                self.draft.weight = profile.weight.clone();
                self.draft.height = profile.height.clone();
                self.prefilled = profile;
            }
            Err(e) => warn!("Could not fetch user details for prefill: {}", e),
        }
    }

    /// Pre-filled fields render disabled unless the stored profile left
    /// them empty.
    pub fn is_field_locked(&self, field: PersonalField) -> bool {
        if !self.sessions.is_authenticated() {
            return false;
        }
        let value = match field {
            PersonalField::Name => &self.prefilled.name,
            PersonalField::Email => &self.prefilled.email,
            PersonalField::Phone => &self.prefilled.phone,
            PersonalField::Address => &self.prefilled.address,
            PersonalField::Weight => &self.prefilled.weight,
            PersonalField::Height => &self.prefilled.height,
        };
        !value.is_empty()
    }

    pub fn set_name(&mut self, value: &str) {
        self.draft.name = value.to_string();
    }

    pub fn set_email(&mut self, value: &str) {
        self.draft.email = value.to_string();
    }

    pub fn set_phone(&mut self, value: &str) {
        self.draft.phone = value.to_string();
    }

    pub fn set_address(&mut self, value: &str) {
        self.draft.address = value.to_string();
    }

    pub fn set_weight(&mut self, value: &str) {
        self.draft.weight = value.to_string();
    }

    pub fn set_height(&mut self, value: &str) {
        self.draft.height = value.to_string();
    }

    pub fn set_doctor_preference(&mut self, preference: DoctorPreference) {
        self.draft.doctor_preference = preference;
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.draft.notes = notes.to_string();
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, BookingError> {
        self.catalog.fetch_categories().await
    }

    /// Choosing a category clears any previously selected service and
    /// returns the services available under it.
    pub async fn select_category(
        &mut self,
        category: Category,
    ) -> Result<Vec<Service>, BookingError> {
        let services = self.catalog.fetch_services_by_category(&category.id).await?;
        self.draft.category = Some(category);
        self.draft.service = None;
        Ok(services)
    }

    pub fn select_service(&mut self, service: Service) {
        self.draft.service = Some(service);
    }

    /// Choosing a date clears the previously chosen time and refreshes that
    /// date's booked-slot set.
    pub async fn select_date(&mut self, date: NaiveDate) -> Result<Vec<String>, BookingError> {
        let booked = self.catalog.fetch_booked_slots(date).await?;
        self.draft.date = Some(date);
        self.draft.slot = None;
        self.draft.booked_slots = booked.clone();
        Ok(booked)
    }

    pub fn select_slot(&mut self, label: &str, now: NaiveDateTime) -> Result<(), BookingError> {
        let date = self.draft.date.ok_or(BookingError::NoDateSelected)?;
        let candidate =
            slots::date_time_from_slot(date, label).ok_or(BookingError::InvalidAppointmentTime)?;

        if self.draft.booked_slots.iter().any(|s| s == label) {
            return Err(BookingError::SlotAlreadyBooked);
        }
        if !slots::is_valid_appointment_time(candidate, now) {
            return Err(BookingError::InvalidAppointmentTime);
        }

        self.draft.slot = Some(label.to_string());
        Ok(())
    }

    /// How each grid slot renders for the selected date: booked slots are
    /// disabled regardless of validity, elapsed/out-of-hours slots are
    /// unavailable, the rest are open.
    pub fn slot_states(&self, now: NaiveDateTime) -> Vec<(String, SlotAvailability)> {
        let Some(date) = self.draft.date else {
            return Vec::new();
        };

        slots::time_slots()
            .into_iter()
            .map(|label| {
                let availability = if self.draft.booked_slots.iter().any(|s| *s == label) {
                    SlotAvailability::Booked
                } else {
                    match slots::date_time_from_slot(date, &label) {
                        Some(candidate) if slots::is_valid_appointment_time(candidate, now) => {
                            SlotAvailability::Open
                        }
                        _ => SlotAvailability::Unavailable,
                    }
                };
                (label, availability)
            })
            .collect()
    }

    /// Run the current step's guard and move forward. The final step has no
    /// guard; advancing from it is a no-op (submission is explicit).
    pub async fn advance(&mut self, now: NaiveDateTime) -> Result<WizardStep, BookingError> {
        match self.step {
            WizardStep::PersonalDetails => self.guard_personal_details().await?,
            WizardStep::SelectService => {
                if self.draft.service.is_none() {
                    return Err(BookingError::NoServiceSelected);
                }
            }
            WizardStep::ChooseSchedule => {
                let candidate = self
                    .draft
                    .appointment_datetime()
                    .ok_or(BookingError::InvalidAppointmentTime)?;
                if !slots::is_valid_appointment_time(candidate, now) {
                    return Err(BookingError::InvalidAppointmentTime);
                }
            }
            WizardStep::AdditionalInfo => {}
        }

        self.step = self.step.next();
        Ok(self.step)
    }

    /// Always permitted except from the first step; entered data is kept.
    pub fn back(&mut self) -> WizardStep {
        self.step = self.step.previous();
        self.step
    }

    async fn guard_personal_details(&mut self) -> Result<(), BookingError> {
        let draft = &self.draft;
        if draft.name.trim().is_empty()
            || draft.email.trim().is_empty()
            || draft.phone.trim().is_empty()
            || draft.address.trim().is_empty()
        {
            return Err(BookingError::MissingRequiredFields);
        }
        if !validation::is_valid_name(&draft.name) {
            return Err(BookingError::InvalidName);
        }
        if !validation::is_valid_email(&draft.email) {
            return Err(BookingError::InvalidEmail);
        }
        let normalized =
            validation::normalize_phone(&draft.phone).ok_or(BookingError::InvalidPhone)?;
        self.draft.phone = normalized;

        // Guests may not book under an email that already has an account.
        if !self.sessions.is_authenticated() && self.profiles.email_exists(&self.draft.email).await?
        {
            return Err(BookingError::EmailAlreadyRegistered);
        }

        Ok(())
    }

    /// Assemble and send the appointment. For authenticated users the
    /// profile sync runs first and a failure there aborts the whole
    /// submission. The primary action stays disabled while a submission is
    /// in flight.
    pub async fn submit(&mut self, now: NaiveDateTime) -> Result<BookingConfirmation, BookingError> {
        if self.submitting {
            return Err(BookingError::RequestInFlight);
        }
        self.submitting = true;
        let result = self.do_submit(now).await;
        self.submitting = false;
        result
    }

    async fn do_submit(&mut self, now: NaiveDateTime) -> Result<BookingConfirmation, BookingError> {
        let confirmation =
            submission::submit_draft(&self.client, &self.profiles, &self.sessions, &self.draft, now)
                .await?;
        self.reset();
        Ok(confirmation)
    }

    /// Discard the draft and return to the first step.
    pub fn reset(&mut self) {
        self.draft = BookingDraft::default();
        self.step = WizardStep::PersonalDetails;
    }
}
