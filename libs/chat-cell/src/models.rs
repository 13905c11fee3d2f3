// libs/chat-cell/src/models.rs
use booking_cell::models::{Appointment, Category, Service};

/// What the user is asking for, as far as the classifier can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Help,
    Booking,
    Managing,
    Location,
    Contact,
    Services,
}

#[derive(Debug, Clone, Copy)]
pub struct IntentClassification {
    pub intent: Intent,
    pub confidence: f32,
}

/// Result of the two-stage classification: deterministic keyword matches
/// come back as `Match` with full confidence; the remote model's answer is
/// demoted to `LowConfidence` below the configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    Match(Intent),
    LowConfidence,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementAction {
    Reschedule,
    Cancel,
}

impl ManagementAction {
    pub fn label(&self) -> &'static str {
        match self {
            ManagementAction::Reschedule => "Reschedule",
            ManagementAction::Cancel => "Cancel",
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            ManagementAction::Reschedule => "reschedule",
            ManagementAction::Cancel => "cancel",
        }
    }
}

/// Which guided flow the date/slot pickers are serving; the step after slot
/// selection differs between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Booking,
    Reschedule,
}

/// Every turn the session can be waiting on. One state, one question - an
/// invalid answer re-asks the same question and never advances.
#[derive(Debug)]
pub enum ChatState {
    Idle,
    /// The help menu is showing; a selection maps back to an intent.
    OfferingHelp,
    AwaitingManageChoice,
    ChoosingCategory {
        categories: Vec<Category>,
    },
    ChoosingService {
        services: Vec<Service>,
    },
    ChoosingDate {
        page: u32,
        flow: FlowKind,
    },
    ChoosingSlot {
        flow: FlowKind,
    },
    /// Authenticated users confirm their stored details instead of typing
    /// them again.
    ConfirmingDetails,
    CollectingName,
    CollectingEmail,
    CollectingPhone,
    CollectingAddress,
    ChoosingDoctorPreference,
    CollectingNotes,
    SelectingAppointment {
        appointments: Vec<Appointment>,
        page: usize,
    },
    CollectingRescheduleReason,
    CollectingCancelReason,
}

/// One user turn. Button presses arrive as `Select` indices into the
/// options of the latest reply.
#[derive(Debug, Clone)]
pub enum ChatInput {
    Text(String),
    Select(usize),
    NextPage,
    PrevPage,
    /// "Choose Different Date" while picking a time.
    BackToDates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputExpectation {
    /// A typed answer is required.
    FreeText,
    /// An empty answer skips the turn (notes).
    OptionalText,
    /// A selection from `options` (possibly with paging).
    Choice,
}

/// What the session says back, plus what it is now waiting for.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub messages: Vec<String>,
    pub options: Vec<String>,
    pub expects: InputExpectation,
    pub has_prev_page: bool,
    pub has_next_page: bool,
}

impl ChatReply {
    pub fn text(messages: Vec<String>) -> Self {
        Self {
            messages,
            options: Vec::new(),
            expects: InputExpectation::FreeText,
            has_prev_page: false,
            has_next_page: false,
        }
    }

    pub fn optional_text(messages: Vec<String>) -> Self {
        Self {
            expects: InputExpectation::OptionalText,
            ..Self::text(messages)
        }
    }

    pub fn choice(messages: Vec<String>, options: Vec<String>) -> Self {
        Self {
            messages,
            options,
            expects: InputExpectation::Choice,
            has_prev_page: false,
            has_next_page: false,
        }
    }

    pub fn paged(mut self, has_prev: bool, has_next: bool) -> Self {
        self.has_prev_page = has_prev;
        self.has_next_page = has_next;
        self
    }
}
