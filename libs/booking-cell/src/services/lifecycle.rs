// libs/booking-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentStatus, BookingError};

/// Status lifecycle rules: `confirmed` moves to exactly one terminal state;
/// terminal states absorb.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_status_transition(
        &self,
        current: &AppointmentStatus,
        new: &AppointmentStatus,
    ) -> Result<(), BookingError> {
        debug!("Validating status transition {:?} -> {:?}", current, new);

        if !self.valid_transitions(current).contains(new) {
            warn!("Invalid status transition attempted: {:?} -> {:?}", current, new);
            return Err(BookingError::InvalidStatusTransition(*current));
        }

        Ok(())
    }

    pub fn valid_transitions(&self, current: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::NoShow,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed
            | AppointmentStatus::NoShow
            | AppointmentStatus::Cancelled => vec![],
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn confirmed_reaches_every_terminal_state() {
        let lifecycle = AppointmentLifecycleService::new();
        for terminal in [
            AppointmentStatus::Completed,
            AppointmentStatus::NoShow,
            AppointmentStatus::Cancelled,
        ] {
            assert!(lifecycle
                .validate_status_transition(&AppointmentStatus::Confirmed, &terminal)
                .is_ok());
        }
    }

    #[test]
    fn terminal_states_absorb() {
        let lifecycle = AppointmentLifecycleService::new();
        for from in [
            AppointmentStatus::Completed,
            AppointmentStatus::NoShow,
            AppointmentStatus::Cancelled,
        ] {
            for to in [
                AppointmentStatus::Confirmed,
                AppointmentStatus::Completed,
                AppointmentStatus::NoShow,
                AppointmentStatus::Cancelled,
            ] {
                let result = lifecycle.validate_status_transition(&from, &to);
                assert_matches!(result, Err(BookingError::InvalidStatusTransition(s)) if s == from);
            }
        }
    }

    #[test]
    fn confirmed_cannot_reconfirm() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_matches!(
            lifecycle.validate_status_transition(
                &AppointmentStatus::Confirmed,
                &AppointmentStatus::Confirmed
            ),
            Err(BookingError::InvalidStatusTransition(_))
        );
    }
}
