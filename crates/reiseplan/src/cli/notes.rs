//! Handlers for the note subcommands: add, list, edit, remove,
//! set-location and the free-day query

use reiseplan_core::model::{CalendarDate, DateRange, GeoPoint, Note};
use reiseplan_core::planner::Planner;

/// Add a stop, scheduling it on the next free day unless dates are given
pub fn handle_add(
    planner: &Planner,
    name: &str,
    start: Option<String>,
    end: Option<String>,
    participants: Option<String>,
    sleeping_place: Option<String>,
    note_lines: Vec<String>,
) -> bool {
    let date = match resolve_dates(planner, start, end) {
        Some(date) => date,
        None => return false,
    };

    let mut note = Note::new();
    note.name = name.to_string();
    note.date = date;
    if let Some(participants) = participants {
        note.participants = participants;
    }
    if let Some(sleeping_place) = sleeping_place {
        note.sleeping_place = sleeping_place;
    }
    note.notes = note_lines;

    match planner.add_note(&note) {
        Ok(()) => {
            println!(
                "✓ Added '{}' ({} to {})",
                note.name, note.date.start, note.date.end
            );
            println!("  id: {}", note.id);
            true
        }
        Err(e) => {
            eprintln!("✗ Could not add note: {}", e);
            false
        }
    }
}

/// Turn the optional --start/--end strings into a date range
fn resolve_dates(
    planner: &Planner,
    start: Option<String>,
    end: Option<String>,
) -> Option<DateRange> {
    let start = match start {
        Some(s) => match s.parse::<CalendarDate>() {
            Ok(date) => Some(date),
            Err(e) => {
                eprintln!("✗ {}", e);
                return None;
            }
        },
        None => None,
    };
    let end = match end {
        Some(s) => match s.parse::<CalendarDate>() {
            Ok(date) => Some(date),
            Err(e) => {
                eprintln!("✗ {}", e);
                return None;
            }
        },
        None => None,
    };

    match (start, end) {
        (Some(start), Some(end)) => {
            if start > end {
                eprintln!("✗ Start {} is after end {}", start, end);
                None
            } else {
                Some(DateRange::new(start, end))
            }
        }
        (Some(start), None) => Some(DateRange::single(start)),
        (None, Some(_)) => {
            eprintln!("✗ --end requires --start");
            None
        }
        (None, None) => Some(DateRange::single(planner.first_free_day())),
    }
}

/// List the collection in order, as a table or as raw JSON
pub fn handle_list(planner: &Planner, json: bool) -> bool {
    let notes = planner.notes();

    if json {
        return match serde_json::to_string_pretty(&notes) {
            Ok(out) => {
                println!("{}", out);
                true
            }
            Err(e) => {
                eprintln!("✗ Could not serialize notes: {}", e);
                false
            }
        };
    }

    if notes.is_empty() {
        println!("No stops yet. Add one with 'reiseplan add <name>'.");
        return true;
    }

    for note in &notes {
        let short_id = note.id.get(..8).unwrap_or(&note.id);
        println!(
            "{}  {} to {}  {}  [{}]",
            short_id,
            note.date.start,
            note.date.end,
            note.name,
            planner.color_of(&note.id).name
        );
        if let Some(location) = &note.location {
            println!("    location: {}, {}", location.lat, location.lng);
        }
        if !note.participants.is_empty() {
            println!("    participants: {}", note.participants);
        }
        if !note.sleeping_place.is_empty() {
            println!("    sleeping place: {}", note.sleeping_place);
        }
        for line in &note.notes {
            println!("    - {}", line);
        }
    }
    true
}

/// Edit fields of an existing stop
pub fn handle_edit(
    planner: &Planner,
    id: &str,
    name: Option<String>,
    start: Option<String>,
    end: Option<String>,
    participants: Option<String>,
    sleeping_place: Option<String>,
    note_lines: Vec<String>,
) -> bool {
    if name.is_none()
        && start.is_none()
        && end.is_none()
        && participants.is_none()
        && sleeping_place.is_none()
        && note_lines.is_empty()
    {
        eprintln!(
            "✗ Nothing to change. Pass at least one of --name, --start, --end, --participants, --sleeping-place or --note."
        );
        return false;
    }

    let mut note = match resolve_note(planner, id) {
        Some(note) => note,
        None => return false,
    };

    if let Some(name) = name {
        note.name = name;
    }
    if let Some(participants) = participants {
        note.participants = participants;
    }
    if let Some(sleeping_place) = sleeping_place {
        note.sleeping_place = sleeping_place;
    }
    note.notes.extend(note_lines);
    if let Some(start) = start {
        match start.parse::<CalendarDate>() {
            Ok(date) => note.date.start = date,
            Err(e) => {
                eprintln!("✗ {}", e);
                return false;
            }
        }
    }
    if let Some(end) = end {
        match end.parse::<CalendarDate>() {
            Ok(date) => note.date.end = date,
            Err(e) => {
                eprintln!("✗ {}", e);
                return false;
            }
        }
    }
    if note.date.start > note.date.end {
        eprintln!("✗ Start {} is after end {}", note.date.start, note.date.end);
        return false;
    }

    match planner.update_note(&note.id, &note) {
        Ok(true) => {
            println!("✓ Updated '{}'", note.name);
            true
        }
        Ok(false) => {
            eprintln!("✗ No note with id '{}'", id);
            false
        }
        Err(e) => {
            eprintln!("✗ Could not update note: {}", e);
            false
        }
    }
}

/// Remove a stop
pub fn handle_remove(planner: &Planner, id: &str) -> bool {
    let note = match resolve_note(planner, id) {
        Some(note) => note,
        None => return false,
    };

    match planner.delete_note(&note.id) {
        Ok(true) => {
            println!("✓ Removed '{}'", note.name);
            true
        }
        Ok(false) => {
            eprintln!("✗ No note with id '{}'", id);
            false
        }
        Err(e) => {
            eprintln!("✗ Could not remove note: {}", e);
            false
        }
    }
}

/// Set or clear a stop's map location
pub fn handle_set_location(
    planner: &Planner,
    id: &str,
    lat: Option<f64>,
    lng: Option<f64>,
    clear: bool,
) -> bool {
    let note = match resolve_note(planner, id) {
        Some(note) => note,
        None => return false,
    };

    let point = if clear {
        None
    } else {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => {
                // clap enforces this already; belt and braces for direct callers
                eprintln!("✗ Both latitude and longitude are required");
                return false;
            }
        }
    };

    match planner.set_note_location(&note.id, point) {
        Ok(true) => {
            if clear {
                println!("✓ Cleared location of '{}'", note.name);
            } else {
                println!("✓ Set location of '{}'", note.name);
            }
            true
        }
        Ok(false) => {
            eprintln!("✗ No note with id '{}'", id);
            false
        }
        Err(e) => {
            eprintln!("✗ Could not update note: {}", e);
            false
        }
    }
}

/// Print the next free day for a new stop
pub fn handle_free_day(planner: &Planner) -> bool {
    println!("{}", planner.first_free_day());
    true
}

/// Find the single note matching `id`, accepting the full id or a unique prefix
fn resolve_note(planner: &Planner, id: &str) -> Option<Note> {
    let notes = planner.notes();
    if let Some(note) = notes.iter().find(|n| n.id == id) {
        return Some(note.clone());
    }

    let matches: Vec<&Note> = notes.iter().filter(|n| n.id.starts_with(id)).collect();
    match matches.len() {
        0 => {
            eprintln!("✗ No note with id '{}'", id);
            None
        }
        1 => Some(matches[0].clone()),
        n => {
            eprintln!("✗ Id prefix '{}' is ambiguous ({} matches)", id, n);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reiseplan_core::crdt::MemoryStorage;
    use reiseplan_core::notify::RecordingSink;
    use reiseplan_core::transport::MemoryClipboard;
    use std::sync::Arc;

    fn test_planner() -> Planner {
        Planner::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryClipboard::new()),
            Arc::new(RecordingSink::new()),
            "default",
        )
    }

    fn add_with_id(planner: &Planner, id: &str, name: &str) {
        let mut note = Note::new();
        note.id = id.to_string();
        note.name = name.to_string();
        planner.add_note(&note).unwrap();
    }

    #[test]
    fn test_resolve_note_exact_and_prefix() {
        let planner = test_planner();
        add_with_id(&planner, "aaaa1111", "Lisbon");
        add_with_id(&planner, "bbbb2222", "Porto");

        assert_eq!(resolve_note(&planner, "aaaa1111").unwrap().name, "Lisbon");
        assert_eq!(resolve_note(&planner, "bbbb").unwrap().name, "Porto");
        assert_eq!(resolve_note(&planner, "aa").unwrap().name, "Lisbon");
    }

    #[test]
    fn test_resolve_note_rejects_ambiguous_prefix() {
        let planner = test_planner();
        add_with_id(&planner, "abc1", "Lisbon");
        add_with_id(&planner, "abc2", "Porto");

        assert!(resolve_note(&planner, "abc").is_none());
        // The full id still resolves even though it is a prefix of nothing else
        assert_eq!(resolve_note(&planner, "abc1").unwrap().name, "Lisbon");
    }

    #[test]
    fn test_resolve_note_unknown_id() {
        let planner = test_planner();
        add_with_id(&planner, "abc1", "Lisbon");
        assert!(resolve_note(&planner, "zzz").is_none());
    }

    #[test]
    fn test_add_defaults_to_next_free_day() {
        let planner = test_planner();

        assert!(handle_add(&planner, "Lisbon", None, None, None, None, vec![]));
        assert!(handle_add(&planner, "Porto", None, None, None, None, vec![]));

        let notes = planner.notes();
        assert_eq!(notes[0].date, DateRange::single(CalendarDate::new(2025, 6, 1)));
        assert_eq!(notes[1].date, DateRange::single(CalendarDate::new(2025, 6, 2)));
    }

    #[test]
    fn test_add_with_explicit_range() {
        let planner = test_planner();

        assert!(handle_add(
            &planner,
            "Lisbon",
            Some("2025-07-01".to_string()),
            Some("2025-07-03".to_string()),
            Some("Ana, Bo".to_string()),
            Some("Hostel".to_string()),
            vec!["bring sunscreen".to_string()],
        ));

        let notes = planner.notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(
            notes[0].date,
            DateRange::new(CalendarDate::new(2025, 7, 1), CalendarDate::new(2025, 7, 3))
        );
        assert_eq!(notes[0].participants, "Ana, Bo");
        assert_eq!(notes[0].sleeping_place, "Hostel");
        assert_eq!(notes[0].notes, vec!["bring sunscreen".to_string()]);
    }

    #[test]
    fn test_add_rejects_bad_dates() {
        let planner = test_planner();

        // End without start
        assert!(!handle_add(
            &planner,
            "Lisbon",
            None,
            Some("2025-07-03".to_string()),
            None,
            None,
            vec![],
        ));
        // Backwards range
        assert!(!handle_add(
            &planner,
            "Lisbon",
            Some("2025-07-03".to_string()),
            Some("2025-07-01".to_string()),
            None,
            None,
            vec![],
        ));
        // Unparseable date
        assert!(!handle_add(
            &planner,
            "Lisbon",
            Some("july 1st".to_string()),
            None,
            None,
            None,
            vec![],
        ));

        assert!(planner.notes().is_empty());
    }

    #[test]
    fn test_edit_requires_at_least_one_flag() {
        let planner = test_planner();
        add_with_id(&planner, "abc1", "Lisbon");

        assert!(!handle_edit(&planner, "abc1", None, None, None, None, None, vec![]));
        assert_eq!(planner.notes()[0].name, "Lisbon");
    }

    #[test]
    fn test_edit_updates_fields() {
        let planner = test_planner();
        add_with_id(&planner, "abc1", "Lisbon");

        assert!(handle_edit(
            &planner,
            "abc1",
            Some("Lisboa".to_string()),
            Some("2025-08-01".to_string()),
            Some("2025-08-02".to_string()),
            None,
            None,
            vec![],
        ));

        let note = planner.find_note("abc1").unwrap();
        assert_eq!(note.name, "Lisboa");
        assert_eq!(
            note.date,
            DateRange::new(CalendarDate::new(2025, 8, 1), CalendarDate::new(2025, 8, 2))
        );
    }

    #[test]
    fn test_edit_appends_note_lines() {
        let planner = test_planner();
        add_with_id(&planner, "abc1", "Lisbon");

        assert!(handle_edit(
            &planner,
            "abc1",
            None,
            None,
            None,
            None,
            None,
            vec!["pack sunscreen".to_string()],
        ));
        assert!(handle_edit(
            &planner,
            "abc1",
            None,
            None,
            None,
            None,
            None,
            vec!["book museum".to_string()],
        ));

        assert_eq!(
            planner.find_note("abc1").unwrap().notes,
            vec!["pack sunscreen".to_string(), "book museum".to_string()]
        );
    }

    #[test]
    fn test_edit_rejects_backwards_range() {
        let planner = test_planner();
        add_with_id(&planner, "abc1", "Lisbon");

        assert!(!handle_edit(
            &planner,
            "abc1",
            None,
            Some("2025-08-05".to_string()),
            Some("2025-08-01".to_string()),
            None,
            None,
            vec![],
        ));
    }

    #[test]
    fn test_remove_by_prefix() {
        let planner = test_planner();
        add_with_id(&planner, "aaaa1111", "Lisbon");
        add_with_id(&planner, "bbbb2222", "Porto");

        assert!(handle_remove(&planner, "aaaa"));

        let notes = planner.notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].name, "Porto");
    }

    #[test]
    fn test_set_and_clear_location() {
        let planner = test_planner();
        add_with_id(&planner, "abc1", "Lisbon");

        assert!(handle_set_location(&planner, "abc1", Some(38.72), Some(-9.14), false));
        assert_eq!(
            planner.find_note("abc1").unwrap().location,
            Some(GeoPoint::new(38.72, -9.14))
        );

        assert!(handle_set_location(&planner, "abc1", None, None, true));
        assert_eq!(planner.find_note("abc1").unwrap().location, None);
    }
}
