// libs/schedule-cell/src/services/calendar.rs
//
// Weekday pagination for the date picker and the display formats shared by
// the wizard and the chat session.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::services::slots::{is_weekday, slot_label};

/// Dates offered per picker page.
pub const DATE_PAGE_SIZE: usize = 6;
/// Last reachable page index; together with [`LOOKAHEAD_DAYS`] this bounds
/// the booking horizon to 30 days.
pub const MAX_DATE_PAGE: u32 = 4;
/// Raw days scanned per page before giving up on filling it.
pub const LOOKAHEAD_DAYS: i64 = 30;

/// The weekdays shown on one picker page.
///
/// Starts at `today + page * per_page` days and walks forward day by day,
/// keeping weekdays, until `per_page` are collected or [`LOOKAHEAD_DAYS`]
/// raw days have been scanned. Pages near the horizon may come back short.
pub fn paginated_dates(today: NaiveDate, page: u32, per_page: usize) -> Vec<NaiveDate> {
    let start = today + Duration::days(page as i64 * per_page as i64);
    let mut dates = Vec::with_capacity(per_page);

    for offset in 0..LOOKAHEAD_DAYS {
        if dates.len() >= per_page {
            break;
        }
        let date = start + Duration::days(offset);
        if is_weekday(date) {
            dates.push(date);
        }
    }

    dates
}

/// `June 10, 2024`
pub fn format_appointment_date(dt: NaiveDateTime) -> String {
    dt.format("%B %-d, %Y").to_string()
}

/// `2:30 PM`
pub fn format_appointment_time(dt: NaiveDateTime) -> String {
    slot_label(dt.time())
}

/// `Monday` - used for the date picker buttons.
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// `Jun 10, 2024`
pub fn short_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Relative wording for dashboard listings.
pub fn relative_day_description(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if date == today + Duration::days(1) {
        "Tomorrow".to_string()
    } else if date < today {
        "Past".to_string()
    } else {
        date.format("%b %-d").to_string()
    }
}

pub fn business_hours_label() -> &'static str {
    "9:00 AM - 5:00 PM (Monday to Friday)"
}
