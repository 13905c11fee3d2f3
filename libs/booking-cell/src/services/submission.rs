// libs/booking-cell/src/services/submission.rs
//
// The submission protocol shared by the wizard and the chat session: both
// presentations collect the same draft and send the same requests in the
// same order.

use std::sync::Arc;

use chrono::NaiveDateTime;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use identity_cell::models::ProfileUpdate;
use identity_cell::services::profile::ProfileService;
use schedule_cell::slots;
use shared_backend::ClinicApiClient;
use shared_models::auth::SessionStore;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentStatus, BookingConfirmation, BookingDraft, BookingError,
    CreateAppointmentRequest,
};
use crate::services::validation;

/// Validate the draft, sync the profile when a session is present, then
/// create the appointment. The profile sync failing aborts the whole
/// submission; the draft is left untouched on every failure path so the
/// caller can retry without re-collecting anything.
pub async fn submit_draft(
    client: &Arc<ClinicApiClient>,
    profiles: &ProfileService,
    sessions: &SessionStore,
    draft: &BookingDraft,
    now: NaiveDateTime,
) -> Result<BookingConfirmation, BookingError> {
    let candidate = draft
        .appointment_datetime()
        .ok_or(BookingError::InvalidAppointmentTime)?;
    if !slots::is_valid_appointment_time(candidate, now) {
        return Err(BookingError::InvalidAppointmentTime);
    }
    let service = draft.service.as_ref().ok_or(BookingError::NoServiceSelected)?;

    let session = sessions.session();
    let authenticated = session.is_some();

    if let Some(session) = &session {
        let update = ProfileUpdate {
            phone: draft.phone.clone(),
            address: draft.address.clone(),
            weight: non_empty(&draft.weight),
            height: non_empty(&draft.height),
        };
        profiles.sync_profile(&session.token, &update).await?;
    }

    let wire_time = slots::local_to_utc(candidate).ok_or(BookingError::InvalidAppointmentTime)?;
    let request = CreateAppointmentRequest {
        name: draft.name.clone(),
        email: draft.email.clone(),
        phone: draft.phone.clone(),
        address: draft.address.clone(),
        treatment: service.id.clone(),
        appointment_time: slots::to_appointment_iso(&wire_time),
        status: AppointmentStatus::Confirmed,
        notes: validation::compose_notes(draft.doctor_preference, &draft.notes),
        doctor_preference: draft.doctor_preference,
        // Guests carry measurements on the appointment itself; for
        // authenticated users the profile sync above owns them.
        weight: if authenticated { None } else { non_empty(&draft.weight) },
        height: if authenticated { None } else { non_empty(&draft.height) },
    };

    debug!("Creating appointment for {}", request.email);
    let body =
        serde_json::to_value(&request).map_err(|e| BookingError::Api(AppError::Parse(e.to_string())))?;
    let response: Value = client
        .request(Method::POST, "/api/appointments/create", None, Some(body))
        .await?;
    let appointment: Option<Appointment> = serde_json::from_value(response).ok();

    info!("Appointment booked for {}", draft.email);

    let message = if authenticated {
        "Appointment booked successfully! You can view and manage your appointments in your dashboard."
    } else {
        "Appointment booked successfully! Create an account to manage your appointments and access additional features."
    };

    Ok(BookingConfirmation {
        message: message.to_string(),
        appointment,
    })
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
