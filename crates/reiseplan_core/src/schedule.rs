//! Date-slot allocation for new entries.
//!
//! [`first_free_day`] answers "where does the next stop go?": the earliest
//! day that is not covered by any existing entry, scanning entries in start
//! order. It is a greedy one-pass search, deliberately kept that way:
//! correct for the non-overlapping itineraries the planner produces, and
//! merely approximate for overlapping hand-imported data (a later entry
//! whose range still covers an already-adjusted candidate is not revisited).
//! It always terminates.

use crate::model::{CalendarDate, Note};

/// Candidate start when the collection is empty.
pub const BASELINE_DAY: CalendarDate = CalendarDate {
    year: 2025,
    month: 6,
    day: 1,
};

/// Entries ordered by start date, ascending and stable.
pub fn sort_by_start(notes: &[Note]) -> Vec<Note> {
    let mut sorted = notes.to_vec();
    sorted.sort_by_key(|note| note.date.start);
    sorted
}

/// The earliest day after the first entry's end (or [`BASELINE_DAY`] for an
/// empty collection) that no entry's date range covers.
pub fn first_free_day(notes: &[Note]) -> CalendarDate {
    let sorted = sort_by_start(notes);

    let mut day = match sorted.first() {
        Some(first) => first.date.end.succ(),
        None => BASELINE_DAY,
    };

    for note in &sorted {
        if day < note.date.start {
            // Entries are in ascending start order, nothing later can
            // cover an earlier candidate.
            break;
        }
        if day > note.date.end {
            continue;
        }
        day = note.date.end.succ();
    }

    day
}
