//! Meeting slot suggestions for meeting-type replies.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Fixed daily windows, one per suggested day, in order.
const SLOT_WINDOWS: [(&str, &str); 3] = [
    ("10:00 AM - 10:30 AM", "Morning slot, fresh start"),
    ("2:00 PM - 2:30 PM", "After lunch, good energy"),
    ("4:00 PM - 4:30 PM", "End of day, wrap-up time"),
];

/// A proposed meeting time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingSlot {
    pub date: NaiveDate,
    /// Full weekday name ("Tuesday").
    pub day: String,
    pub window: String,
    pub reason: String,
}

fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Three slots on the next three business days after `from`.
///
/// `from` itself is never offered. Weekends are skipped, so a Friday start
/// proposes Monday through Wednesday.
pub fn suggest_meeting_slots(from: NaiveDate) -> Vec<MeetingSlot> {
    let mut slots = Vec::with_capacity(SLOT_WINDOWS.len());
    let mut date = from;

    for (window, reason) in SLOT_WINDOWS {
        date = next_business_day(date);
        slots.push(MeetingSlot {
            date,
            day: weekday_name(date.weekday()).to_string(),
            window: window.to_string(),
            reason: reason.to_string(),
        });
    }

    slots
}

fn next_business_day(mut date: NaiveDate) -> NaiveDate {
    loop {
        // NaiveDate::MAX is far beyond any real inbox date.
        date = date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
        if is_business_day(date) || date == NaiveDate::MAX {
            return date;
        }
    }
}
