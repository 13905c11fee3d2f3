// libs/booking-cell/src/services/validation.rs
//
// Field-level predicates shared by the wizard and the chat session. The
// phone heuristic is Malaysian-mobile policy; deployments targeting another
// region swap this function, not its call sites.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::DoctorPreference;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
}

fn mobile_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\+?60|0)?1[0-46-9][0-9]{7,8}$").expect("valid mobile pattern")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

pub fn is_valid_name(name: &str) -> bool {
    name.trim().chars().count() >= 2
}

/// Validate and normalize a Malaysian mobile number.
///
/// Accepts the `+60` / `60` / `0` prefix variants with arbitrary spacing and
/// dashes, and returns the canonical `+60` form. `None` means the input is
/// not a recognisable mobile number.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let cleaned: String = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if !mobile_regex().is_match(&cleaned) {
        return None;
    }

    let subscriber = cleaned
        .strip_prefix("+60")
        .or_else(|| cleaned.strip_prefix("60"))
        .or_else(|| cleaned.strip_prefix('0'))
        .unwrap_or(&cleaned);

    Some(format!("+60{}", subscriber))
}

/// Appointment notes: the doctor-preference sentence (when any) and the
/// free-text notes, non-empty parts separated by a blank line.
pub fn compose_notes(preference: DoctorPreference, notes: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(sentence) = preference.preference_note() {
        parts.push(sentence);
    }
    let trimmed = notes.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed);
    }
    parts.join("\n\n")
}
