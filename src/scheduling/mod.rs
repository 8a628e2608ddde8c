//! Fixed consultation slots for appointment booking.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: &'static str,
    pub end_time: &'static str,
}

/// Every bookable date offers these three slots.
pub const TIME_SLOTS: [TimeSlot; 3] = [
    TimeSlot { start_time: "09:00", end_time: "10:30" },
    TimeSlot { start_time: "10:30", end_time: "12:00" },
    TimeSlot { start_time: "13:00", end_time: "14:30" },
];

pub fn find_slot(start_time: &str, end_time: &str) -> Option<TimeSlot> {
    TIME_SLOTS
        .iter()
        .copied()
        .find(|s| s.start_time == start_time && s.end_time == end_time)
}

/// Slots on a date not covered by `booked_start_times`.
pub fn available_slots<S: AsRef<str>>(booked_start_times: &[S]) -> Vec<TimeSlot> {
    TIME_SLOTS
        .iter()
        .copied()
        .filter(|slot| !booked_start_times.iter().any(|b| b.as_ref() == slot.start_time))
        .collect()
}

pub fn is_fully_booked<S: AsRef<str>>(booked_start_times: &[S]) -> bool {
    available_slots(booked_start_times).is_empty()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub date: chrono::NaiveDate,
    pub available: Vec<TimeSlot>,
    pub fully_booked: bool,
}

impl Availability {
    pub fn for_date<S: AsRef<str>>(date: chrono::NaiveDate, booked_start_times: &[S]) -> Self {
        let available = available_slots(booked_start_times);
        Self {
            date,
            fully_booked: available.is_empty(),
            available,
        }
    }
}
