//! Deterministic entry colors.
//!
//! Colors are derived from an entry's current position in the collection and
//! are never stored: reordering the collection implicitly recolors it. The
//! palette runs red to rose; collections longer than the palette clamp to the
//! last color.

use crate::model::{CalendarDate, Note};
use crate::schedule::sort_by_start;

/// One palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteColor {
    /// Human-readable color name
    pub name: &'static str,
    /// CSS hex value
    pub hex: &'static str,
}

/// Card palette, in assignment order.
pub const CARD_COLORS: [NoteColor; 17] = [
    NoteColor { name: "red", hex: "#f87171" },
    NoteColor { name: "orange", hex: "#fb923c" },
    NoteColor { name: "amber", hex: "#fbbf24" },
    NoteColor { name: "yellow", hex: "#facc15" },
    NoteColor { name: "lime", hex: "#a3e635" },
    NoteColor { name: "green", hex: "#4ade80" },
    NoteColor { name: "emerald", hex: "#34d399" },
    NoteColor { name: "teal", hex: "#2dd4bf" },
    NoteColor { name: "cyan", hex: "#22d3ee" },
    NoteColor { name: "sky", hex: "#38bdf8" },
    NoteColor { name: "blue", hex: "#60a5fa" },
    NoteColor { name: "indigo", hex: "#818cf8" },
    NoteColor { name: "violet", hex: "#a78bfa" },
    NoteColor { name: "purple", hex: "#c084fc" },
    NoteColor { name: "fuchsia", hex: "#e879f9" },
    NoteColor { name: "pink", hex: "#f472b6" },
    NoteColor { name: "rose", hex: "#fb7185" },
];

/// Color for the entry with the given id.
///
/// Position-indexed into [`CARD_COLORS`], clamped to the last color for
/// positions past the palette. Unknown ids also get the last color, so
/// stale references render consistently instead of panicking.
pub fn color_for(id: &str, notes: &[Note]) -> &'static NoteColor {
    let last = CARD_COLORS.len() - 1;
    match notes.iter().position(|note| note.id == id) {
        None => &CARD_COLORS[last],
        Some(index) => &CARD_COLORS[index.min(last)],
    }
}

/// Color covering a calendar day, if any entry's range contains it.
///
/// When ranges overlap, the entry with the latest start wins, matching how
/// the calendar paints its cells.
pub fn color_on_day(day: &CalendarDate, notes: &[Note]) -> Option<&'static NoteColor> {
    sort_by_start(notes)
        .iter()
        .rev()
        .find(|note| note.date.contains(day))
        .map(|note| color_for(&note.id, notes))
}
