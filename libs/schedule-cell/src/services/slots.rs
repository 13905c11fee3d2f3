// libs/schedule-cell/src/services/slots.rs
//
// Appointment slot grid and validity predicates. Everything here is pure:
// "now" is always a parameter, never read from a clock, and all times are
// clinic-local until converted for the wire.

use chrono::{
    DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone,
    Timelike, Utc, Weekday,
};

/// First bookable hour of the day.
pub const OPENING_HOUR: u32 = 9;
/// Hour of the last bookable slot start. 17:00 itself is a valid slot; no
/// slot starts after it.
pub const CLOSING_HOUR: u32 = 17;
/// Slot grid interval in minutes.
pub const SLOT_INTERVAL_MINUTES: u32 = 30;

/// True for Monday through Friday.
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// True for times in the bookable window: any minute of hours 9..=16, plus
/// exactly 17:00.
pub fn is_within_business_hours(time: NaiveTime) -> bool {
    let hour = time.hour();
    hour >= OPENING_HOUR && (hour < CLOSING_HOUR || (hour == CLOSING_HOUR && time.minute() == 0))
}

/// Whether `candidate` is a bookable instant as seen from `now`.
///
/// A future calendar day only needs to be a weekday within business hours.
/// On the current day the instant must additionally not have elapsed;
/// exactly `now` still counts as bookable.
pub fn is_valid_appointment_time(candidate: NaiveDateTime, now: NaiveDateTime) -> bool {
    if candidate.date() != now.date() {
        return is_weekday(candidate.date()) && is_within_business_hours(candidate.time());
    }

    if candidate < now {
        return false;
    }

    is_weekday(candidate.date()) && is_within_business_hours(candidate.time())
}

/// The fixed daily slot grid: 17 labels from `9:00 AM` to `5:00 PM` on a
/// 30-minute raster. Deterministic and stateless.
pub fn time_slots() -> Vec<String> {
    let mut slots = Vec::new();

    for hour in OPENING_HOUR..=CLOSING_HOUR {
        for minute in (0..60).step_by(SLOT_INTERVAL_MINUTES as usize) {
            if hour == CLOSING_HOUR && minute > 0 {
                break;
            }
            if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
                slots.push(slot_label(time));
            }
        }
    }

    slots
}

/// 12-hour clock label for a slot start, e.g. `2:30 PM`.
pub fn slot_label(time: NaiveTime) -> String {
    let (is_pm, hour) = time.hour12();
    format!(
        "{}:{:02} {}",
        hour,
        time.minute(),
        if is_pm { "PM" } else { "AM" }
    )
}

/// Parse a `h:mm AM/PM` label back into a time of day. Returns `None` for
/// anything that is not a well-formed 12-hour label.
pub fn parse_slot_label(label: &str) -> Option<NaiveTime> {
    let mut parts = label.split_whitespace();
    let clock = parts.next()?;
    let period = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let (hour_str, minute_str) = clock.split_once(':')?;
    let hour: u32 = hour_str.parse().ok()?;
    let minute: u32 = minute_str.parse().ok()?;
    if !(1..=12).contains(&hour) {
        return None;
    }

    let hour24 = match period.to_ascii_uppercase().as_str() {
        "PM" if hour != 12 => hour + 12,
        "AM" if hour == 12 => 0,
        "AM" | "PM" => hour,
        _ => return None,
    };

    NaiveTime::from_hms_opt(hour24, minute, 0)
}

/// Compose a calendar date and a slot label into the local appointment
/// instant.
pub fn date_time_from_slot(date: NaiveDate, label: &str) -> Option<NaiveDateTime> {
    parse_slot_label(label).map(|time| date.and_time(time))
}

/// Resolve a clinic-local instant to the UTC instant sent on the wire.
/// Returns `None` for local times skipped by a DST transition.
pub fn local_to_utc(local: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Canonical wire format: UTC RFC 3339 with millisecond precision.
pub fn to_appointment_iso<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    dt.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an appointment timestamp from an API response.
pub fn parse_appointment_time(iso: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(iso)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn weekdays_are_monday_through_friday() {
        // 2024-06-10 is a Monday
        assert!(is_weekday(date(2024, 6, 10)));
        assert!(is_weekday(date(2024, 6, 14)));
        assert!(!is_weekday(date(2024, 6, 15))); // Saturday
        assert!(!is_weekday(date(2024, 6, 16))); // Sunday
    }

    #[test]
    fn business_hours_include_the_five_pm_boundary() {
        assert!(!is_within_business_hours(time(8, 59)));
        assert!(is_within_business_hours(time(9, 0)));
        assert!(is_within_business_hours(time(12, 45)));
        assert!(is_within_business_hours(time(16, 59)));
        assert!(is_within_business_hours(time(17, 0)));
        assert!(!is_within_business_hours(time(17, 1)));
        assert!(!is_within_business_hours(time(17, 30)));
        assert!(!is_within_business_hours(time(18, 0)));
    }

    #[test]
    fn future_weekday_in_hours_is_valid() {
        let now = date(2024, 6, 10).and_time(time(10, 0));
        assert!(is_valid_appointment_time(
            date(2024, 6, 11).and_time(time(9, 30)),
            now
        ));
        // Weekend days are never valid regardless of hour
        assert!(!is_valid_appointment_time(
            date(2024, 6, 15).and_time(time(10, 0)),
            now
        ));
        // Out of hours on a future weekday
        assert!(!is_valid_appointment_time(
            date(2024, 6, 11).and_time(time(18, 0)),
            now
        ));
    }

    #[test]
    fn same_day_elapsed_times_are_invalid() {
        let now = date(2024, 6, 10).and_time(time(16, 45));
        // 4:30 PM today has already passed
        assert!(!is_valid_appointment_time(
            date(2024, 6, 10).and_time(time(16, 30)),
            now
        ));
        // 5:00 PM today is still ahead
        assert!(is_valid_appointment_time(
            date(2024, 6, 10).and_time(time(17, 0)),
            now
        ));
        // Exactly now is treated as valid
        assert!(is_valid_appointment_time(now, now));
        // One second earlier is not
        assert!(!is_valid_appointment_time(
            now - chrono::Duration::seconds(1),
            now
        ));
    }

    #[test]
    fn slot_grid_has_seventeen_increasing_labels() {
        let slots = time_slots();
        assert_eq!(slots.len(), 17);
        assert_eq!(slots.first().map(String::as_str), Some("9:00 AM"));
        assert_eq!(slots.last().map(String::as_str), Some("5:00 PM"));

        let times: Vec<NaiveTime> = slots
            .iter()
            .map(|s| parse_slot_label(s).unwrap())
            .collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));

        // Pure: repeated calls yield the identical grid
        assert_eq!(slots, time_slots());
    }

    #[test]
    fn slot_labels_round_trip() {
        for label in time_slots() {
            let parsed = parse_slot_label(&label).unwrap();
            assert_eq!(slot_label(parsed), label);
        }
    }

    #[test]
    fn malformed_labels_are_rejected() {
        assert_eq!(parse_slot_label(""), None);
        assert_eq!(parse_slot_label("9:00"), None);
        assert_eq!(parse_slot_label("25:00 PM"), None);
        assert_eq!(parse_slot_label("9:00 XM"), None);
        assert_eq!(parse_slot_label("9:00 AM extra"), None);
    }

    #[test]
    fn composing_date_and_slot() {
        let composed = date_time_from_slot(date(2024, 6, 10), "2:30 PM").unwrap();
        assert_eq!(composed, date(2024, 6, 10).and_time(time(14, 30)));
        assert_eq!(date_time_from_slot(date(2024, 6, 10), "nope"), None);
    }

    #[test]
    fn wire_format_is_utc_millis() {
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let dt = offset
            .from_local_datetime(&date(2024, 6, 10).and_time(time(17, 0)))
            .unwrap();
        assert_eq!(to_appointment_iso(&dt), "2024-06-10T09:00:00.000Z");

        let parsed = parse_appointment_time("2024-06-10T09:00:00.000Z").unwrap();
        assert_eq!(to_appointment_iso(&parsed), "2024-06-10T09:00:00.000Z");
    }
}
