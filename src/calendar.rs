//! Booking-window validation and ISO-week resolution.
//!
//! A legal booking window starts on the hour, between 09:00 and 23:00
//! inclusive, on a single day. Week listings resolve any date to the Monday
//! of its ISO week and cover Monday through the following Sunday.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

/// First bookable hour of the day.
pub const OPENING_HOUR: u32 = 9;
/// Last bookable start hour of the day.
pub const CLOSING_HOUR: u32 = 23;

/// True iff `start` is a legal booking start: minutes exactly zero, hour in
/// `[OPENING_HOUR, CLOSING_HOUR]`. Duration is validated by the caller.
pub fn is_valid_window(start: NaiveDateTime) -> bool {
    start.minute() == 0 && (OPENING_HOUR..=CLOSING_HOUR).contains(&start.hour())
}

/// True iff a booking of `duration_hours` starting at `start` would run past
/// midnight. Whether that is rejected is a policy decision, not the window
/// validator's.
pub fn crosses_midnight(start: NaiveDateTime, duration_hours: u32) -> bool {
    start.hour() + duration_hours > 24
}

/// The Monday of the ISO week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// `[Monday, Sunday]` of the ISO week containing `date`, both inclusive.
pub fn week_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = monday_of(date);
    (monday, monday + Duration::days(6))
}
