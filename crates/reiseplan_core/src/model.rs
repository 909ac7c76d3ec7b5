//! Core data types for the trip-planning collection.
//!
//! A [`Note`] is one planning entry: a labelled, dated stop on a trip with an
//! optional map location and free-text metadata. Notes are identified by a
//! stable UUID assigned at creation and never reassigned; the id is the sole
//! identity of an entry across replicas and transport round-trips.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ReiseplanError;

/// A calendar date without time-of-day or timezone.
///
/// Serialized as structured `{year, month, day}` rather than an epoch
/// timestamp so that values round-trip exactly between replicas in different
/// timezones. The derived ordering is lexicographic over (year, month, day),
/// which matches chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarDate {
    /// Calendar year
    pub year: i32,
    /// Month of year, 1-12
    pub month: u32,
    /// Day of month, 1-31
    pub day: u32,
}

impl CalendarDate {
    /// Create a date from its components. Not validated against the calendar.
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// The next calendar day, with month and year rollover.
    ///
    /// Dates that don't exist on the calendar (e.g. month 13) advance
    /// numerically instead, so iteration always makes progress.
    pub fn succ(&self) -> CalendarDate {
        match self.to_naive().and_then(|d| d.succ_opt()) {
            Some(next) => CalendarDate::from_naive(next),
            None => CalendarDate::new(self.year, self.month, self.day + 1),
        }
    }

    /// Convert to a `chrono::NaiveDate`, if the date exists on the calendar.
    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    /// Convert from a `chrono::NaiveDate`.
    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

impl std::fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl std::str::FromStr for CalendarDate {
    type Err = ReiseplanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(CalendarDate::from_naive)
            .map_err(|_| ReiseplanError::InvalidDate(s.to_string()))
    }
}

/// An inclusive range of calendar days.
///
/// Invariant: `start <= end`. Every producer in this crate maintains it;
/// imported data is taken as-is, like the rest of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the stay
    pub start: CalendarDate,
    /// Last day of the stay, inclusive
    pub end: CalendarDate,
}

impl DateRange {
    /// Create a range from `start` to `end` inclusive.
    pub fn new(start: CalendarDate, end: CalendarDate) -> Self {
        Self { start, end }
    }

    /// A single-day range.
    pub fn single(day: CalendarDate) -> Self {
        Self { start: day, end: day }
    }

    /// Whether `day` falls inside the range, bounds included.
    pub fn contains(&self, day: &CalendarDate) -> bool {
        self.start <= *day && *day <= self.end
    }
}

/// A geographic point picked on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl GeoPoint {
    /// Create a point from latitude and longitude.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One planning entry in the shared collection.
///
/// Field names serialize in camelCase; this is the wire format used by both
/// transport channels and must stay compatible across replicas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Stable unique identifier, assigned at creation, never reassigned.
    pub id: String,

    /// Free text label.
    pub name: String,

    /// Map location; absent (`null` on the wire) until the user picks one.
    pub location: Option<GeoPoint>,

    /// Inclusive date range of the stay.
    pub date: DateRange,

    /// Free text, who is coming along.
    pub participants: String,

    /// Free text, where to sleep.
    pub sleeping_place: String,

    /// Ordered free-text lines attached to the entry.
    pub notes: Vec<String>,
}

impl Note {
    /// Create an empty note with a fresh UUID and the default date.
    ///
    /// Callers that want the entry scheduled should overwrite `date` with the
    /// allocator's next free slot (see [`crate::schedule::first_free_day`]).
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: String::new(),
            location: None,
            date: DateRange::single(CalendarDate::new(2025, 1, 1)),
            participants: String::new(),
            sleeping_place: String::new(),
            notes: Vec::new(),
        }
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_date_ordering() {
        let a = CalendarDate::new(2025, 6, 1);
        let b = CalendarDate::new(2025, 6, 2);
        let c = CalendarDate::new(2025, 7, 1);
        let d = CalendarDate::new(2026, 1, 1);
        assert!(a < b);
        assert!(b < c);
        assert!(c < d);
        assert_eq!(a, CalendarDate::new(2025, 6, 1));
    }

    #[test]
    fn test_succ_rolls_over_month_and_year() {
        assert_eq!(
            CalendarDate::new(2025, 1, 31).succ(),
            CalendarDate::new(2025, 2, 1)
        );
        assert_eq!(
            CalendarDate::new(2025, 12, 31).succ(),
            CalendarDate::new(2026, 1, 1)
        );
        // 2024 is a leap year
        assert_eq!(
            CalendarDate::new(2024, 2, 28).succ(),
            CalendarDate::new(2024, 2, 29)
        );
        assert_eq!(
            CalendarDate::new(2025, 2, 28).succ(),
            CalendarDate::new(2025, 3, 1)
        );
    }

    #[test]
    fn test_succ_of_invalid_date_still_advances() {
        let weird = CalendarDate::new(2025, 13, 1);
        assert_eq!(weird.succ(), CalendarDate::new(2025, 13, 2));
    }

    #[test]
    fn test_date_parse_and_display() {
        let date: CalendarDate = "2025-06-01".parse().unwrap();
        assert_eq!(date, CalendarDate::new(2025, 6, 1));
        assert_eq!(date.to_string(), "2025-06-01");

        assert!("2025-6".parse::<CalendarDate>().is_err());
        assert!("yesterday".parse::<CalendarDate>().is_err());
    }

    #[test]
    fn test_date_range_contains_is_inclusive() {
        let range = DateRange::new(CalendarDate::new(2025, 6, 1), CalendarDate::new(2025, 6, 3));
        assert!(range.contains(&CalendarDate::new(2025, 6, 1)));
        assert!(range.contains(&CalendarDate::new(2025, 6, 2)));
        assert!(range.contains(&CalendarDate::new(2025, 6, 3)));
        assert!(!range.contains(&CalendarDate::new(2025, 5, 31)));
        assert!(!range.contains(&CalendarDate::new(2025, 6, 4)));
    }

    #[test]
    fn test_new_note_defaults() {
        let note = Note::new();
        assert!(!note.id.is_empty());
        assert!(note.name.is_empty());
        assert!(note.location.is_none());
        assert_eq!(note.date, DateRange::single(CalendarDate::new(2025, 1, 1)));
        assert!(note.participants.is_empty());
        assert!(note.sleeping_place.is_empty());
        assert!(note.notes.is_empty());

        // Each creation mints a fresh id
        assert_ne!(Note::new().id, Note::new().id);
    }

    #[test]
    fn test_note_wire_format() {
        let mut note = Note::new();
        note.id = "abc".to_string();
        note.name = "Lisbon".to_string();
        note.date = DateRange::new(CalendarDate::new(2025, 6, 1), CalendarDate::new(2025, 6, 3));
        note.participants = "Ana, Bo".to_string();
        note.sleeping_place = "Hostel".to_string();
        note.notes = vec!["bring sunscreen".to_string()];

        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "abc",
                "name": "Lisbon",
                "location": null,
                "date": {
                    "start": {"year": 2025, "month": 6, "day": 1},
                    "end": {"year": 2025, "month": 6, "day": 3}
                },
                "participants": "Ana, Bo",
                "sleepingPlace": "Hostel",
                "notes": ["bring sunscreen"]
            })
        );
    }

    #[test]
    fn test_note_round_trips_through_json() {
        let mut note = Note::new();
        note.name = "Porto".to_string();
        note.location = Some(GeoPoint::new(41.1579, -8.6291));

        let json = serde_json::to_string(&note).unwrap();
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(note, back);
    }
}
