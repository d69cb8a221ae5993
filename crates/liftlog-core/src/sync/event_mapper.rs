//! Mapping between workout sessions and the calendar wire format.
//!
//! The structured exercise entries are flattened into the event description
//! as `key: value` lines, one blank-line-separated block per entry. Decoding
//! exists only for the legacy read path: it reconstructs at most the first
//! entry of events created by an older app version.

use serde::{Deserialize, Serialize};

use crate::workout::{ExerciseEntry, WorkoutSession};

/// Fixed localized event title.
pub const EVENT_SUMMARY: &str = "トレーニング";

/// The provider's 11-value event color palette.
pub const COLOR_PALETTE: [&str; 11] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11",
];

/// Color applied when the configured color is not in the palette.
pub const DEFAULT_COLOR_ID: &str = "9";

const KEY_EXERCISE: &str = "種目";
const KEY_WEIGHT: &str = "重量";
const KEY_SETS: &str = "セット数";
const KEY_REPS: &str = "回数";

/// Wire representation of a calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub color_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

impl EventDateTime {
    fn utc(instant: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            date_time: instant.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            time_zone: "UTC".to_string(),
        }
    }
}

/// Build the wire event for a session.
///
/// Unknown color ids fall back to [`DEFAULT_COLOR_ID`] rather than letting
/// the provider reject the whole event.
pub fn to_remote_event(session: &WorkoutSession, color_id: &str) -> RemoteEvent {
    let color_id = if COLOR_PALETTE.contains(&color_id) {
        color_id.to_string()
    } else {
        DEFAULT_COLOR_ID.to_string()
    };

    RemoteEvent {
        summary: EVENT_SUMMARY.to_string(),
        description: encode_description(&session.exercise_entries),
        start: EventDateTime::utc(session.start_time),
        end: EventDateTime::utc(session.end_time),
        color_id,
    }
}

/// Deterministic textual encoding of the exercise entries.
pub fn encode_description(entries: &[ExerciseEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{KEY_EXERCISE}: {}\n{KEY_WEIGHT}: {} kg\n{KEY_SETS}: {}\n{KEY_REPS}: {}",
                entry.name,
                format_weight(entry.weight),
                entry.sets,
                entry.reps,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Parse a description back into the first exercise entry.
///
/// Tolerates unknown and missing keys by returning `None` instead of
/// erroring. Reads at most one entry; events written by the current encoder
/// carry their full data locally, so this only serves events created by
/// older versions.
pub fn from_description(description: &str) -> Option<ExerciseEntry> {
    let mut fields = std::collections::HashMap::new();
    for line in description.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        // First block only: don't let a later entry overwrite the first.
        fields.entry(key).or_insert(value);
    }

    let name = fields.get(KEY_EXERCISE)?.to_string();
    let weight = parse_weight(fields.get(KEY_WEIGHT)?)?;
    let sets = fields.get(KEY_SETS)?.parse::<u32>().ok()?;
    let reps = fields.get(KEY_REPS)?.parse::<u32>().ok()?;

    Some(ExerciseEntry {
        name,
        weight,
        reps,
        sets,
    })
}

/// "60 kg" / "62.5kg" / "60" all parse back to kilograms.
fn parse_weight(value: &str) -> Option<f64> {
    value
        .trim_end_matches("kg")
        .trim()
        .parse::<f64>()
        .ok()
}

/// Whole kilograms print without a decimal point.
fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{weight:.0}")
    } else {
        format!("{weight}")
    }
}
