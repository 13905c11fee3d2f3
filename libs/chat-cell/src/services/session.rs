// libs/chat-cell/src/services/session.rs
use std::mem;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use booking_cell::models::{Appointment, AppointmentStatus, BookingDraft, DoctorPreference};
use booking_cell::services::catalog::CatalogService;
use booking_cell::services::management::AppointmentManagementService;
use booking_cell::services::submission;
use booking_cell::services::validation;
use identity_cell::services::profile::ProfileService;
use schedule_cell::{calendar, slots};
use shared_backend::ClinicApiClient;
use shared_models::auth::SessionStore;

use crate::models::{
    ChatInput, ChatReply, ChatState, FlowKind, Intent, IntentOutcome, ManagementAction,
};
use crate::services::intent::{parse_management_action, IntentClassifier};
use crate::services::responses;

/// Appointments listed per page in the manage flows.
pub const APPOINTMENT_PAGE_SIZE: usize = 3;

const LOGIN_REQUIRED_MESSAGE: &str = "You are not logged in, kindly log in or create an account with your email address you have used before.\n\nOr you may contact our support at 012-3456789 for appointments rescheduling or cancellation";

const HELP_MENU: [(&str, Intent); 5] = [
    ("Book Appointment", Intent::Booking),
    ("Manage Appointments", Intent::Managing),
    ("Find Clinic Location", Intent::Location),
    ("Contact Us", Intent::Contact),
    ("Help/FAQ", Intent::Help),
];

/// The chat-guided booking dialogue.
///
/// One session owns one draft. Every turn is handled by [`handle`], the
/// single transition function: it validates the answer for the current
/// state and either advances or re-asks the same question with a
/// corrective prompt. Request failures reply with a readable message and
/// leave the session in a re-enterable state.
///
/// [`handle`]: ChatSession::handle
pub struct ChatSession {
    id: Uuid,
    client: Arc<ClinicApiClient>,
    catalog: CatalogService,
    profiles: ProfileService,
    management: AppointmentManagementService,
    sessions: SessionStore,
    classifier: IntentClassifier,
    state: ChatState,
    draft: BookingDraft,
    pending_action: Option<ManagementAction>,
    selected_appointment: Option<Appointment>,
    reschedule_target: Option<NaiveDateTime>,
}

impl ChatSession {
    pub fn new(
        client: Arc<ClinicApiClient>,
        sessions: SessionStore,
        classifier: IntentClassifier,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog: CatalogService::new(Arc::clone(&client)),
            profiles: ProfileService::new(Arc::clone(&client)),
            management: AppointmentManagementService::new(Arc::clone(&client)),
            client,
            sessions,
            classifier,
            state: ChatState::Idle,
            draft: BookingDraft::default(),
            pending_action: None,
            selected_appointment: None,
            reschedule_target: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Opening message for a fresh chat window.
    pub fn greet(&self) -> ChatReply {
        ChatReply::text(vec![responses::pick(&responses::WELCOME)])
    }

    /// Drop any in-progress flow and start over, keeping the transcript.
    pub fn reset(&mut self) {
        self.state = ChatState::Idle;
        self.draft = BookingDraft::default();
        self.pending_action = None;
        self.selected_appointment = None;
        self.reschedule_target = None;
    }

    /// Handle one user turn.
    pub async fn handle(&mut self, input: ChatInput) -> ChatReply {
        let now = Local::now().naive_local();
        let state = mem::replace(&mut self.state, ChatState::Idle);

        match (state, input) {
            (ChatState::Idle, ChatInput::Text(text)) => self.handle_free_text(&text).await,
            (ChatState::Idle, _) => {
                ChatReply::text(vec![responses::pick(&responses::WELCOME)])
            }

            (ChatState::OfferingHelp, ChatInput::Select(index)) => {
                match HELP_MENU.get(index) {
                    Some((_, intent)) => self.dispatch_intent(*intent).await,
                    None => self.offer_help(),
                }
            }
            (ChatState::OfferingHelp, ChatInput::Text(text)) => self.handle_free_text(&text).await,
            (ChatState::OfferingHelp, _) => self.offer_help(),

            (ChatState::AwaitingManageChoice, ChatInput::Select(index)) => match index {
                0 => self.start_manage(ManagementAction::Reschedule).await,
                1 => self.start_manage(ManagementAction::Cancel).await,
                _ => self.offer_manage_choice(responses::pick(&responses::MANAGING)),
            },
            (ChatState::AwaitingManageChoice, ChatInput::Text(text)) => {
                match parse_management_action(&text) {
                    Some(action) => self.start_manage(action).await,
                    None => self.offer_manage_choice(
                        "Would you like to reschedule or cancel an appointment? Please specify."
                            .to_string(),
                    ),
                }
            }
            (ChatState::AwaitingManageChoice, _) => {
                self.offer_manage_choice(responses::pick(&responses::MANAGING))
            }

            (ChatState::ChoosingCategory { categories }, ChatInput::Select(index)) => {
                match categories.get(index).cloned() {
                    Some(category) => self.select_category(category).await,
                    None => self.offer_categories(
                        categories,
                        "Please pick one of the listed categories:".to_string(),
                    ),
                }
            }
            (ChatState::ChoosingCategory { categories }, _) => self.offer_categories(
                categories,
                "Please pick one of the listed categories:".to_string(),
            ),

            (ChatState::ChoosingService { services }, ChatInput::Select(index)) => {
                match services.get(index).cloned() {
                    Some(service) => {
                        self.draft.service = Some(service);
                        self.state = ChatState::ChoosingDate {
                            page: 0,
                            flow: FlowKind::Booking,
                        };
                        self.offer_dates(
                            0,
                            "Please select your preferred appointment date:".to_string(),
                        )
                    }
                    None => self.offer_services(
                        services,
                        "Please pick one of the listed services:".to_string(),
                    ),
                }
            }
            (ChatState::ChoosingService { services }, _) => self.offer_services(
                services,
                "Please pick one of the listed services:".to_string(),
            ),

            (ChatState::ChoosingDate { page, flow }, ChatInput::Select(index)) => {
                let dates = calendar::paginated_dates(now.date(), page, calendar::DATE_PAGE_SIZE);
                match dates.get(index).copied() {
                    Some(date) => self.select_date(date, flow, now).await,
                    None => {
                        self.state = ChatState::ChoosingDate { page, flow };
                        self.offer_dates(page, "Please pick one of the listed dates:".to_string())
                    }
                }
            }
            (ChatState::ChoosingDate { page, flow }, ChatInput::NextPage) => {
                let page = (page + 1).min(calendar::MAX_DATE_PAGE);
                self.state = ChatState::ChoosingDate { page, flow };
                self.offer_dates(page, "Here are more dates:".to_string())
            }
            (ChatState::ChoosingDate { page, flow }, ChatInput::PrevPage) => {
                let page = page.saturating_sub(1);
                self.state = ChatState::ChoosingDate { page, flow };
                self.offer_dates(page, "Here are the earlier dates:".to_string())
            }
            (ChatState::ChoosingDate { page, flow }, _) => {
                self.state = ChatState::ChoosingDate { page, flow };
                self.offer_dates(page, "Please pick one of the listed dates:".to_string())
            }

            (ChatState::ChoosingSlot { flow }, ChatInput::Select(index)) => {
                self.select_slot(index, flow, now).await
            }
            (ChatState::ChoosingSlot { flow }, ChatInput::BackToDates) => {
                self.draft.date = None;
                self.draft.slot = None;
                self.draft.booked_slots.clear();
                self.state = ChatState::ChoosingDate { page: 0, flow };
                self.offer_dates(
                    0,
                    "Please select a new date for your appointment:".to_string(),
                )
            }
            (ChatState::ChoosingSlot { flow }, _) => {
                self.state = ChatState::ChoosingSlot { flow };
                self.offer_slots(now, "Please pick one of the listed time slots:".to_string())
            }

            (ChatState::ConfirmingDetails, ChatInput::Select(0)) => self.offer_doctor_preference(),
            (ChatState::ConfirmingDetails, _) => {
                self.state = ChatState::ConfirmingDetails;
                self.confirm_details_reply()
            }

            (ChatState::CollectingName, ChatInput::Text(value)) => {
                if !validation::is_valid_name(&value) {
                    self.state = ChatState::CollectingName;
                    return ChatReply::text(vec![
                        "Please enter a valid name (at least 2 characters):".to_string(),
                    ]);
                }
                self.draft.name = value.trim().to_string();
                self.state = ChatState::CollectingEmail;
                ChatReply::text(vec!["Please enter your email address:".to_string()])
            }
            (ChatState::CollectingName, _) => {
                self.state = ChatState::CollectingName;
                ChatReply::text(vec!["Please tell me your full name:".to_string()])
            }

            (ChatState::CollectingEmail, ChatInput::Text(value)) => {
                self.collect_email(value.trim()).await
            }
            (ChatState::CollectingEmail, _) => {
                self.state = ChatState::CollectingEmail;
                ChatReply::text(vec!["Please enter your email address:".to_string()])
            }

            (ChatState::CollectingPhone, ChatInput::Text(value)) => {
                match validation::normalize_phone(&value) {
                    Some(formatted) => {
                        self.draft.phone = formatted;
                        self.state = ChatState::CollectingAddress;
                        ChatReply::text(vec!["Please enter your complete address:".to_string()])
                    }
                    None => {
                        self.state = ChatState::CollectingPhone;
                        ChatReply::text(vec![
                            "Please enter a valid Malaysian phone number:\nExamples: 0123456789, +60123456789"
                                .to_string(),
                        ])
                    }
                }
            }
            (ChatState::CollectingPhone, _) => {
                self.state = ChatState::CollectingPhone;
                ChatReply::text(vec![
                    "Please enter your phone number (+601X-XXXXXXX):".to_string(),
                ])
            }

            (ChatState::CollectingAddress, ChatInput::Text(value)) => {
                if value.trim().is_empty() {
                    self.state = ChatState::CollectingAddress;
                    return ChatReply::text(vec!["Please enter a valid address:".to_string()]);
                }
                self.draft.address = value.trim().to_string();
                self.offer_doctor_preference()
            }
            (ChatState::CollectingAddress, _) => {
                self.state = ChatState::CollectingAddress;
                ChatReply::text(vec!["Please enter your complete address:".to_string()])
            }

            (ChatState::ChoosingDoctorPreference, ChatInput::Select(index)) => {
                let preference = match index {
                    0 => DoctorPreference::Any,
                    1 => DoctorPreference::Male,
                    2 => DoctorPreference::Female,
                    _ => {
                        return self.offer_doctor_preference();
                    }
                };
                self.draft.doctor_preference = preference;
                self.state = ChatState::CollectingNotes;
                ChatReply::optional_text(vec![
                    "Would you like to provide any additional information or specific concerns? (Optional)\nType your message or click Send to skip."
                        .to_string(),
                ])
            }
            (ChatState::ChoosingDoctorPreference, _) => self.offer_doctor_preference(),

            (ChatState::CollectingNotes, ChatInput::Text(value)) => {
                self.draft.notes = value.trim().to_string();
                self.finalize_booking(now).await
            }
            (ChatState::CollectingNotes, _) => {
                self.state = ChatState::CollectingNotes;
                ChatReply::optional_text(vec![
                    "Type your message or click Send to skip.".to_string(),
                ])
            }

            (ChatState::SelectingAppointment { appointments, page }, ChatInput::Select(index)) => {
                let global = page * APPOINTMENT_PAGE_SIZE + index;
                match appointments.get(global).cloned() {
                    Some(appointment) => self.select_appointment(appointment),
                    None => self.offer_appointments(
                        appointments,
                        page,
                        "Please pick one of the listed appointments:".to_string(),
                    ),
                }
            }
            (ChatState::SelectingAppointment { appointments, page }, ChatInput::NextPage) => {
                let last_page = appointments.len().saturating_sub(1) / APPOINTMENT_PAGE_SIZE;
                let page = (page + 1).min(last_page);
                self.offer_appointments(appointments, page, "Here are more appointments:".to_string())
            }
            (ChatState::SelectingAppointment { appointments, page }, ChatInput::PrevPage) => {
                let page = page.saturating_sub(1);
                self.offer_appointments(
                    appointments,
                    page,
                    "Here are the earlier appointments:".to_string(),
                )
            }
            (ChatState::SelectingAppointment { appointments, page }, _) => self.offer_appointments(
                appointments,
                page,
                "Please pick one of the listed appointments:".to_string(),
            ),

            (ChatState::CollectingRescheduleReason, ChatInput::Text(value)) => {
                self.collect_reschedule_reason(value.trim(), now).await
            }
            (ChatState::CollectingRescheduleReason, _) => {
                self.state = ChatState::CollectingRescheduleReason;
                ChatReply::text(vec![
                    "Please provide a reason for rescheduling (Required):".to_string(),
                ])
            }

            (ChatState::CollectingCancelReason, ChatInput::Text(value)) => {
                self.collect_cancel_reason(value.trim()).await
            }
            (ChatState::CollectingCancelReason, _) => {
                self.state = ChatState::CollectingCancelReason;
                ChatReply::text(vec![
                    "Please provide a reason for cancellation:".to_string(),
                ])
            }
        }
    }

    // ==========================================================================
    // Intent handling
    // ==========================================================================

    async fn handle_free_text(&mut self, text: &str) -> ChatReply {
        // Explicit reschedule/cancel wording skips classification entirely.
        if let Some(action) = parse_management_action(text) {
            return self.start_manage(action).await;
        }

        match self.classifier.classify(text).await {
            IntentOutcome::Match(intent) => self.dispatch_intent(intent).await,
            IntentOutcome::LowConfidence => ChatReply::text(vec![
                "I didn't quite catch that. Could you please rephrase your question so I can better assist you?"
                    .to_string(),
            ]),
            IntentOutcome::Unknown => ChatReply::text(vec![
                "I'm not sure I understood that. Could you please rephrase?".to_string(),
            ]),
        }
    }

    async fn dispatch_intent(&mut self, intent: Intent) -> ChatReply {
        match intent {
            Intent::Booking => self.start_booking().await,
            Intent::Managing => self.offer_manage_choice(responses::pick(&responses::MANAGING)),
            Intent::Greeting => ChatReply::text(vec![responses::pick(&responses::GREETING)]),
            Intent::Location => ChatReply::text(vec![responses::pick(&responses::LOCATION)]),
            Intent::Contact => ChatReply::text(vec![responses::pick(&responses::CONTACT)]),
            Intent::Help => self.offer_help(),
            Intent::Services => self.list_services().await,
        }
    }

    fn offer_help(&mut self) -> ChatReply {
        self.state = ChatState::OfferingHelp;
        ChatReply::choice(
            vec![responses::pick(&responses::HELP)],
            HELP_MENU.iter().map(|(label, _)| label.to_string()).collect(),
        )
    }

    async fn list_services(&mut self) -> ChatReply {
        match self.catalog.fetch_services().await {
            Ok(services) => {
                let mut names: Vec<String> =
                    services.iter().map(|s| format!("- {}", s.name)).collect();
                names.sort();
                ChatReply::text(vec![format!(
                    "Here are the services we offer:\n{}\nand more. \n\nFor more info, you may view our services on our website.",
                    names.join("\n")
                )])
            }
            Err(e) => {
                warn!("Could not list services: {}", e);
                ChatReply::text(vec![
                    "Sorry, I could not fetch the services at this time.".to_string(),
                ])
            }
        }
    }

    // ==========================================================================
    // Booking flow
    // ==========================================================================

    async fn start_booking(&mut self) -> ChatReply {
        self.reset();

        match self.catalog.fetch_categories().await {
            Ok(categories) => {
                let mut messages = Vec::new();
                if !self.sessions.is_authenticated() {
                    messages.push(
                        "Tip: If you have an account, logging in first will make booking faster as your details will be pre-filled."
                            .to_string(),
                    );
                }
                messages.push(
                    "Let's help you book an appointment. First, please select a service category:"
                        .to_string(),
                );
                let options = categories.iter().map(|c| c.name.clone()).collect();
                self.state = ChatState::ChoosingCategory { categories };
                ChatReply::choice(messages, options)
            }
            Err(e) => {
                warn!("Could not fetch categories: {}", e);
                ChatReply::text(vec![
                    "Sorry, I could not fetch the categories at this time.".to_string(),
                ])
            }
        }
    }

    fn offer_categories(
        &mut self,
        categories: Vec<booking_cell::models::Category>,
        message: String,
    ) -> ChatReply {
        let options = categories.iter().map(|c| c.name.clone()).collect();
        self.state = ChatState::ChoosingCategory { categories };
        ChatReply::choice(vec![message], options)
    }

    fn offer_services(
        &mut self,
        services: Vec<booking_cell::models::Service>,
        message: String,
    ) -> ChatReply {
        let options = services
            .iter()
            .map(|s| format!("{} - RM {}", s.name, s.price))
            .collect();
        self.state = ChatState::ChoosingService { services };
        ChatReply::choice(vec![message], options)
    }

    async fn select_category(&mut self, category: booking_cell::models::Category) -> ChatReply {
        match self.catalog.fetch_services_by_category(&category.id).await {
            Ok(services) => {
                let message = format!(
                    "Great! Here are the services available in {}:",
                    category.name
                );
                self.draft.category = Some(category);
                self.draft.service = None;
                self.offer_services(services, message)
            }
            Err(e) => {
                warn!("Could not fetch services: {}", e);
                self.state = ChatState::Idle;
                ChatReply::text(vec![
                    "Sorry, I could not fetch the services at this time.".to_string(),
                ])
            }
        }
    }

    fn offer_dates(&self, page: u32, message: String) -> ChatReply {
        let today = Local::now().date_naive();
        let dates = calendar::paginated_dates(today, page, calendar::DATE_PAGE_SIZE);
        let options = dates
            .iter()
            .map(|d| format!("{}, {}", calendar::weekday_name(*d), calendar::short_date(*d)))
            .collect();
        ChatReply::choice(vec![message], options).paged(page > 0, page < calendar::MAX_DATE_PAGE)
    }

    async fn select_date(&mut self, date: NaiveDate, flow: FlowKind, now: NaiveDateTime) -> ChatReply {
        match self.catalog.fetch_booked_slots(date).await {
            Ok(booked) => {
                self.draft.date = Some(date);
                self.draft.slot = None;
                self.draft.booked_slots = booked;
                self.state = ChatState::ChoosingSlot { flow };
                self.offer_slots(now, "Please select a preferred time:".to_string())
            }
            Err(e) => {
                warn!("Could not fetch booked slots: {}", e);
                self.state = ChatState::ChoosingDate { page: 0, flow };
                ChatReply::text(vec![
                    "Sorry, there was an error selecting that date. Please try again.".to_string(),
                ])
            }
        }
    }

    fn offer_slots(&self, now: NaiveDateTime, message: String) -> ChatReply {
        let options = slots::time_slots()
            .into_iter()
            .map(|label| {
                if self.draft.booked_slots.iter().any(|s| *s == label) {
                    format!("{} (Booked)", label)
                } else if !self.slot_is_valid(&label, now) {
                    format!("{} (Unavailable)", label)
                } else {
                    label
                }
            })
            .collect();
        ChatReply::choice(vec![message], options)
    }

    fn slot_is_valid(&self, label: &str, now: NaiveDateTime) -> bool {
        self.draft
            .date
            .and_then(|date| slots::date_time_from_slot(date, label))
            .map(|candidate| slots::is_valid_appointment_time(candidate, now))
            .unwrap_or(false)
    }

    async fn select_slot(&mut self, index: usize, flow: FlowKind, now: NaiveDateTime) -> ChatReply {
        let grid = slots::time_slots();
        let Some(label) = grid.get(index).cloned() else {
            self.state = ChatState::ChoosingSlot { flow };
            return self.offer_slots(now, "Please pick one of the listed time slots:".to_string());
        };

        if self.draft.booked_slots.iter().any(|s| *s == label) {
            self.state = ChatState::ChoosingSlot { flow };
            return self.offer_slots(
                now,
                "That slot is already booked. Please pick another time:".to_string(),
            );
        }
        if !self.slot_is_valid(&label, now) {
            self.state = ChatState::ChoosingSlot { flow };
            return self.offer_slots(
                now,
                "That time is not available. Please pick another time:".to_string(),
            );
        }

        self.draft.slot = Some(label.clone());

        match flow {
            FlowKind::Booking => self.after_booking_slot().await,
            FlowKind::Reschedule => {
                // The composed instant was just validated above.
                self.reschedule_target = self.draft.appointment_datetime();
                self.state = ChatState::CollectingRescheduleReason;
                ChatReply::text(vec![
                    "Please provide a reason for rescheduling (Required):".to_string(),
                ])
            }
        }
    }

    /// Authenticated users confirm their stored details; guests type them
    /// in turn by turn.
    async fn after_booking_slot(&mut self) -> ChatReply {
        let Some(token) = self.sessions.token() else {
            self.state = ChatState::CollectingName;
            return ChatReply::text(vec!["Please tell me your full name:".to_string()]);
        };

        match self.profiles.fetch_user_details(&token).await {
            Ok(profile) => {
                self.draft.name = profile.name;
                self.draft.email = profile.email;
                self.draft.phone = profile.phone;
                self.draft.address = profile.address;
                self.draft.weight = profile.weight;
                self.draft.height = profile.height;
                self.state = ChatState::ConfirmingDetails;
                self.confirm_details_reply()
            }
            Err(e) => {
                warn!("Could not fetch user details: {}", e);
                self.state = ChatState::CollectingName;
                ChatReply::text(vec!["Please tell me your full name:".to_string()])
            }
        }
    }

    fn confirm_details_reply(&self) -> ChatReply {
        ChatReply::choice(
            vec![format!(
                "Please confirm if these details are correct:\n\nName: {}\nEmail: {}\nPhone: {}\nAddress: {}",
                self.draft.name, self.draft.email, self.draft.phone, self.draft.address
            )],
            vec!["Confirm and Continue".to_string()],
        )
    }

    async fn collect_email(&mut self, value: &str) -> ChatReply {
        if !validation::is_valid_email(value) {
            self.state = ChatState::CollectingEmail;
            return ChatReply::text(vec![
                "That doesn't look like a valid email address. Please try again:".to_string(),
            ]);
        }

        // Same guest guard as the wizard's personal-details step.
        if !self.sessions.is_authenticated() {
            match self.profiles.email_exists(value).await {
                Ok(true) => {
                    self.state = ChatState::CollectingEmail;
                    return ChatReply::text(vec![
                        "This email is already registered. Please login to book an appointment."
                            .to_string(),
                    ]);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Email existence check failed: {}", e);
                    self.state = ChatState::CollectingEmail;
                    return ChatReply::text(vec![
                        "An error occurred. Please try again.".to_string(),
                    ]);
                }
            }
        }

        self.draft.email = value.to_string();
        self.state = ChatState::CollectingPhone;
        ChatReply::text(vec![
            "Please enter your phone number (+601X-XXXXXXX):".to_string(),
        ])
    }

    fn offer_doctor_preference(&mut self) -> ChatReply {
        self.state = ChatState::ChoosingDoctorPreference;
        ChatReply::choice(
            vec!["Please select your preferred doctor gender:".to_string()],
            vec![
                DoctorPreference::Any.label().to_string(),
                DoctorPreference::Male.label().to_string(),
                DoctorPreference::Female.label().to_string(),
            ],
        )
    }

    async fn finalize_booking(&mut self, now: NaiveDateTime) -> ChatReply {
        let result = submission::submit_draft(
            &self.client,
            &self.profiles,
            &self.sessions,
            &self.draft,
            now,
        )
        .await;

        match result {
            Ok(_confirmation) => {
                let summary = self.booking_summary();
                info!("Chat booking completed for {}", self.draft.email);
                self.reset();
                ChatReply::text(vec![summary])
            }
            Err(e) => {
                warn!("Chat booking failed: {}", e);
                // Stay on the notes turn so re-sending retries without
                // re-collecting earlier answers.
                self.state = ChatState::CollectingNotes;
                ChatReply::optional_text(vec![e.user_message()])
            }
        }
    }

    fn booking_summary(&self) -> String {
        let treatment = self
            .draft
            .service
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "N/A".to_string());
        let (date, time) = self
            .draft
            .appointment_datetime()
            .map(|dt| {
                (
                    calendar::format_appointment_date(dt),
                    calendar::format_appointment_time(dt),
                )
            })
            .unwrap_or_default();

        format!(
            "Great! Your appointment has been booked successfully.\n\nTreatment: {}\nDate: {}\nTime: {}\nName: {}\nEmail: {}\nPhone: {}\nAddress: {}\n\nWe hope to see you soon!",
            treatment,
            date,
            time,
            self.draft.name,
            self.draft.email,
            self.draft.phone,
            self.draft.address
        )
    }

    // ==========================================================================
    // Manage flows
    // ==========================================================================

    fn offer_manage_choice(&mut self, message: String) -> ChatReply {
        self.state = ChatState::AwaitingManageChoice;
        ChatReply::choice(
            vec![message],
            vec!["Reschedule".to_string(), "Cancel".to_string()],
        )
    }

    async fn start_manage(&mut self, action: ManagementAction) -> ChatReply {
        let Some(session) = self.sessions.session() else {
            self.state = ChatState::Idle;
            return ChatReply::text(vec![LOGIN_REQUIRED_MESSAGE.to_string()]);
        };

        match self
            .management
            .list_patient_appointments(&session.user.email, &session.token)
            .await
        {
            Ok(appointments) => {
                let upcoming = self.management.upcoming_confirmed(&appointments);
                if upcoming.is_empty() {
                    self.state = ChatState::Idle;
                    return ChatReply::text(vec![format!(
                        "You have no upcoming appointments to {}.",
                        action.verb()
                    )]);
                }
                self.pending_action = Some(action);
                let message = format!("Which appointments would you like to {}?", action.verb());
                self.offer_appointments(upcoming, 0, message)
            }
            Err(e) => {
                warn!("Could not fetch patient appointments: {}", e);
                self.state = ChatState::Idle;
                ChatReply::text(vec![
                    "Sorry, there was an error fetching your appointments. Please try again later."
                        .to_string(),
                ])
            }
        }
    }

    fn offer_appointments(
        &mut self,
        appointments: Vec<Appointment>,
        page: usize,
        message: String,
    ) -> ChatReply {
        let start = page * APPOINTMENT_PAGE_SIZE;
        let options = appointments
            .iter()
            .skip(start)
            .take(APPOINTMENT_PAGE_SIZE)
            .map(|apt| {
                let local = apt.appointment_time.with_timezone(&Local).naive_local();
                format!(
                    "{}: {} at {}",
                    apt.treatment_name(),
                    calendar::format_appointment_date(local),
                    calendar::format_appointment_time(local)
                )
            })
            .collect();
        let has_next = start + APPOINTMENT_PAGE_SIZE < appointments.len();
        self.state = ChatState::SelectingAppointment { appointments, page };
        ChatReply::choice(vec![message], options).paged(page > 0, has_next)
    }

    fn select_appointment(&mut self, appointment: Appointment) -> ChatReply {
        self.selected_appointment = Some(appointment);

        match self.pending_action {
            Some(ManagementAction::Reschedule) => {
                self.state = ChatState::ChoosingDate {
                    page: 0,
                    flow: FlowKind::Reschedule,
                };
                self.offer_dates(
                    0,
                    "Please select a new date for your appointment:".to_string(),
                )
            }
            Some(ManagementAction::Cancel) => {
                self.state = ChatState::CollectingCancelReason;
                ChatReply::text(vec![
                    "Please provide a reason for cancellation:".to_string(),
                ])
            }
            None => {
                self.reset();
                ChatReply::text(vec![responses::pick(&responses::WELCOME)])
            }
        }
    }

    async fn collect_reschedule_reason(&mut self, reason: &str, now: NaiveDateTime) -> ChatReply {
        if reason.is_empty() {
            self.state = ChatState::CollectingRescheduleReason;
            return ChatReply::text(vec![
                "Please provide a reason for rescheduling (Required):".to_string(),
            ]);
        }

        let (Some(appointment), Some(target)) =
            (self.selected_appointment.clone(), self.reschedule_target)
        else {
            self.reset();
            return ChatReply::text(vec![
                "Sorry, something went wrong. Let's start over.".to_string(),
            ]);
        };
        let Some(token) = self.sessions.token() else {
            self.reset();
            return ChatReply::text(vec![LOGIN_REQUIRED_MESSAGE.to_string()]);
        };

        match self
            .management
            .reschedule(&appointment, target, reason, now, &token)
            .await
        {
            Ok(()) => {
                let message = format!(
                    "Your appointment for {} has been rescheduled to {} at {}.",
                    appointment.treatment_name(),
                    calendar::format_appointment_date(target),
                    calendar::format_appointment_time(target)
                );
                self.reset();
                ChatReply::text(vec![message])
            }
            Err(e) => {
                warn!("Reschedule failed: {}", e);
                // Selection stays intact; another reason re-sends.
                self.state = ChatState::CollectingRescheduleReason;
                ChatReply::text(vec![
                    "Sorry, there was an error rescheduling your appointment. Please try again later."
                        .to_string(),
                ])
            }
        }
    }

    async fn collect_cancel_reason(&mut self, reason: &str) -> ChatReply {
        if reason.is_empty() {
            self.state = ChatState::CollectingCancelReason;
            return ChatReply::text(vec![
                "Please provide a reason for cancellation:".to_string(),
            ]);
        }

        let Some(appointment) = self.selected_appointment.clone() else {
            self.reset();
            return ChatReply::text(vec![
                "Sorry, something went wrong. Let's start over.".to_string(),
            ]);
        };
        let Some(token) = self.sessions.token() else {
            self.reset();
            return ChatReply::text(vec![LOGIN_REQUIRED_MESSAGE.to_string()]);
        };

        match self
            .management
            .change_status(&appointment, AppointmentStatus::Cancelled, reason, None, &token)
            .await
        {
            Ok(()) => {
                let local = appointment.appointment_time.with_timezone(&Local).naive_local();
                let message = format!(
                    "Your appointment has been cancelled successfully:\n\nTreatment: {}\nDate and Time: {} at {}\nCancellation Reason: {}",
                    appointment.treatment_name(),
                    calendar::format_appointment_date(local),
                    calendar::format_appointment_time(local),
                    reason
                );
                self.reset();
                ChatReply::text(vec![message])
            }
            Err(e) => {
                warn!("Cancellation failed: {}", e);
                self.state = ChatState::CollectingCancelReason;
                ChatReply::text(vec![
                    "Sorry, there was an error cancelling your appointment. Please try again later."
                        .to_string(),
                ])
            }
        }
    }
}

