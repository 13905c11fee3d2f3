// libs/booking-cell/src/services/management.rs
use std::sync::Arc;

use chrono::NaiveDateTime;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use schedule_cell::slots;
use shared_backend::ClinicApiClient;

use crate::models::{
    Appointment, AppointmentStatus, BookingError, RescheduleRequest, StatusChangeRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Rows-per-page choices offered by the staff table.
pub const ROWS_PER_PAGE_OPTIONS: [usize; 2] = [5, 10];

/// Staff-side appointment operations: listing, filtering, pagination and
/// the status-change / reschedule sub-flows.
pub struct AppointmentManagementService {
    client: Arc<ClinicApiClient>,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentManagementService {
    pub fn new(client: Arc<ClinicApiClient>) -> Self {
        Self {
            client,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub async fn list_appointments(&self, auth_token: &str) -> Result<Vec<Appointment>, BookingError> {
        debug!("Fetching appointment list");
        let appointments = self
            .client
            .request(Method::GET, "/api/appointments", Some(auth_token), None)
            .await?;
        Ok(appointments)
    }

    /// Appointments belonging to one patient, used by the chat manage flows.
    pub async fn list_patient_appointments(
        &self,
        email: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let path = format!("/api/appointments/patient?email={}", urlencoding::encode(email));
        let appointments = self
            .client
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(appointments)
    }

    /// The confirmed appointments a patient can still act on, soonest first.
    pub fn upcoming_confirmed(&self, appointments: &[Appointment]) -> Vec<Appointment> {
        let mut upcoming: Vec<Appointment> = appointments
            .iter()
            .filter(|apt| apt.status == AppointmentStatus::Confirmed)
            .cloned()
            .collect();
        upcoming.sort_by_key(|apt| apt.appointment_time);
        upcoming
    }

    /// Status filter plus case-insensitive search over patient name, email
    /// and treatment name.
    pub fn filter_appointments(
        &self,
        appointments: &[Appointment],
        status: Option<AppointmentStatus>,
        search: &str,
    ) -> Vec<Appointment> {
        let needle = search.trim().to_lowercase();
        appointments
            .iter()
            .filter(|apt| status.map_or(true, |s| apt.status == s))
            .filter(|apt| {
                if needle.is_empty() {
                    return true;
                }
                apt.name.to_lowercase().contains(&needle)
                    || apt.email.to_lowercase().contains(&needle)
                    || apt
                        .treatment
                        .name()
                        .map_or(false, |n| n.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    /// Order rows by appointment date for the staff table.
    pub fn sort_by_date(&self, appointments: &mut [Appointment], ascending: bool) {
        appointments.sort_by_key(|apt| apt.appointment_time);
        if !ascending {
            appointments.reverse();
        }
    }

    pub fn page<'a>(
        &self,
        appointments: &'a [Appointment],
        page: usize,
        rows_per_page: usize,
    ) -> &'a [Appointment] {
        let start = page.saturating_mul(rows_per_page).min(appointments.len());
        let end = (start + rows_per_page).min(appointments.len());
        &appointments[start..end]
    }

    pub fn page_count(&self, total: usize, rows_per_page: usize) -> usize {
        total.div_ceil(rows_per_page)
    }

    /// Move a confirmed appointment into a terminal state. Cancellation
    /// requires a non-empty trimmed reason; the note is appended to the
    /// appointment's history by the backend.
    pub async fn change_status(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        notes: &str,
        cancelled_by: Option<&str>,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        self.lifecycle
            .validate_status_transition(&appointment.status, &new_status)?;

        if new_status == AppointmentStatus::Cancelled && notes.trim().is_empty() {
            return Err(BookingError::ReasonRequired);
        }

        let request = StatusChangeRequest {
            status: new_status,
            notes: notes.trim().to_string(),
            cancelled_by: cancelled_by.map(String::from),
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| BookingError::Api(shared_models::error::AppError::Parse(e.to_string())))?;

        let path = format!("/api/appointments/{}/status", appointment.id);
        let _: Value = self
            .client
            .request(Method::PUT, &path, Some(auth_token), Some(body))
            .await?;

        info!(
            "Appointment {} marked as {}",
            appointment.id, request.status
        );
        Ok(())
    }

    /// Move a confirmed appointment to a new valid date/time. Both the
    /// reason and a valid new instant are required before any request goes
    /// out.
    pub async fn reschedule(
        &self,
        appointment: &Appointment,
        new_local_time: NaiveDateTime,
        reason: &str,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        if appointment.status.is_terminal() {
            return Err(BookingError::InvalidStatusTransition(appointment.status));
        }
        if reason.trim().is_empty() {
            return Err(BookingError::ReasonRequired);
        }
        if !slots::is_valid_appointment_time(new_local_time, now) {
            return Err(BookingError::InvalidAppointmentTime);
        }

        let wire_time =
            slots::local_to_utc(new_local_time).ok_or(BookingError::InvalidAppointmentTime)?;
        let request = RescheduleRequest {
            new_date_time: slots::to_appointment_iso(&wire_time),
            reason: reason.trim().to_string(),
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| BookingError::Api(shared_models::error::AppError::Parse(e.to_string())))?;

        let path = format!("/api/appointments/{}/reschedule", appointment.id);
        let _: Value = self
            .client
            .request(Method::PUT, &path, Some(auth_token), Some(body))
            .await?;

        info!("Appointment {} rescheduled", appointment.id);
        Ok(())
    }
}
