// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use schedule_cell::slots;
use shared_models::error::AppError;

// ==============================================================================
// CATALOG MODELS
// ==============================================================================

/// Treatment grouping. Read-only from the booking flow's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<serde_json::Value>,
}

/// Bookable treatment offering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub image: Option<serde_json::Value>,
}

/// The backend sometimes embeds the full category, sometimes only its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(String),
    Embedded(Category),
}

impl CategoryRef {
    pub fn id(&self) -> &str {
        match self {
            CategoryRef::Id(id) => id,
            CategoryRef::Embedded(category) => &category.id,
        }
    }
}

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub treatment: TreatmentRef,
    #[serde(rename = "appointmentTime")]
    pub appointment_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default, rename = "noteHistory")]
    pub note_history: Vec<NoteEntry>,
    #[serde(default, rename = "doctorPreference")]
    pub doctor_preference: DoctorPreference,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub height: Option<String>,
}

impl Appointment {
    pub fn treatment_name(&self) -> &str {
        self.treatment.name().unwrap_or("N/A")
    }
}

/// Appointment listings embed the treatment; the create call sends its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreatmentRef {
    Id(String),
    Embedded(Service),
}

impl TreatmentRef {
    pub fn id(&self) -> &str {
        match self {
            TreatmentRef::Id(id) => id,
            TreatmentRef::Embedded(service) => &service.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            TreatmentRef::Id(_) => None,
            TreatmentRef::Embedded(service) => Some(&service.name),
        }
    }
}

/// One entry of the append-only note history kept on an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteEntry {
    pub note: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub action: String,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Confirmed,
    Completed,
    NoShow,
    Cancelled,
}

impl AppointmentStatus {
    /// Terminal states absorb: no transition leads out of them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Confirmed)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::NoShow => "No Show",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DoctorPreference {
    #[default]
    Any,
    Male,
    Female,
}

impl DoctorPreference {
    /// The sentence prepended to the appointment notes; `Any` adds nothing.
    pub fn preference_note(&self) -> Option<&'static str> {
        match self {
            DoctorPreference::Any => None,
            DoctorPreference::Male => Some("Male doctor preferred"),
            DoctorPreference::Female => Some("Female doctor preferred"),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DoctorPreference::Any => "No Preference",
            DoctorPreference::Male => "Male Doctor",
            DoctorPreference::Female => "Female Doctor",
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateAppointmentRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub treatment: String,
    #[serde(rename = "appointmentTime")]
    pub appointment_time: String,
    pub status: AppointmentStatus,
    pub notes: String,
    #[serde(rename = "doctorPreference")]
    pub doctor_preference: DoctorPreference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookedSlotsResponse {
    #[serde(default, rename = "bookedSlots")]
    pub booked_slots: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChangeRequest {
    pub status: AppointmentStatus,
    pub notes: String,
    #[serde(rename = "cancelledBy", skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RescheduleRequest {
    #[serde(rename = "newDateTime")]
    pub new_date_time: String,
    pub reason: String,
}

/// Result of a successful submission, with the context-aware wording the
/// dialogue shows before resetting its draft.
#[derive(Debug, Clone)]
pub struct BookingConfirmation {
    pub message: String,
    pub appointment: Option<Appointment>,
}

// ==============================================================================
// DRAFT STATE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    PersonalDetails,
    SelectService,
    ChooseSchedule,
    AdditionalInfo,
}

impl WizardStep {
    pub const TITLES: [&'static str; 4] = [
        "Personal Details",
        "Select Service",
        "Choose Date and Time",
        "Additional Information",
    ];

    pub fn next(self) -> Self {
        match self {
            WizardStep::PersonalDetails => WizardStep::SelectService,
            WizardStep::SelectService => WizardStep::ChooseSchedule,
            WizardStep::ChooseSchedule | WizardStep::AdditionalInfo => WizardStep::AdditionalInfo,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            WizardStep::PersonalDetails | WizardStep::SelectService => WizardStep::PersonalDetails,
            WizardStep::ChooseSchedule => WizardStep::SelectService,
            WizardStep::AdditionalInfo => WizardStep::ChooseSchedule,
        }
    }
}

/// The in-progress form state. Lives for one wizard/chat session, owned by
/// its controller, discarded on close or successful submission.
#[derive(Debug, Clone, Default)]
pub struct BookingDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub weight: String,
    pub height: String,
    pub category: Option<Category>,
    pub service: Option<Service>,
    pub date: Option<NaiveDate>,
    pub slot: Option<String>,
    pub booked_slots: Vec<String>,
    pub doctor_preference: DoctorPreference,
    pub notes: String,
}

impl BookingDraft {
    /// The composed local appointment instant, once both halves are chosen.
    pub fn appointment_datetime(&self) -> Option<NaiveDateTime> {
        let date = self.date?;
        let slot = self.slot.as_deref()?;
        slots::date_time_from_slot(date, slot)
    }
}

/// How a slot button renders for the currently selected date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAvailability {
    Open,
    /// Taken by another appointment on that date.
    Booked,
    /// Fails the validity check (elapsed today, or out of hours).
    Unavailable,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Please fill in all required fields")]
    MissingRequiredFields,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please enter a valid name (at least 2 characters)")]
    InvalidName,

    #[error("Please enter a valid Malaysian phone number (e.g., +60123456789)")]
    InvalidPhone,

    #[error("This email is already registered. Please login to book an appointment.")]
    EmailAlreadyRegistered,

    #[error("Please select a service")]
    NoServiceSelected,

    #[error("Please select an appointment date first")]
    NoDateSelected,

    #[error("Please select a valid appointment time.")]
    InvalidAppointmentTime,

    #[error("That time slot is already booked")]
    SlotAlreadyBooked,

    #[error("Please provide a reason")]
    ReasonRequired,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("A request is already in progress")]
    RequestInFlight,

    #[error("{0}")]
    Api(#[from] AppError),
}

impl BookingError {
    /// The message rendered to the user. Server-provided messages win for
    /// transport failures; validation errors read as written.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::Api(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}
