//! Duration helpers for MusicXML
//!
//! MusicXML stores the length of a note twice. `<duration>` holds the exact length as a tick
//! count relative to the part's `<divisions>` (ticks per quarter note), and `<type>`, `<dot>`
//! and `<time-modification>` describe how the note is drawn. Reading only needs the ticks.
//! Writing needs both: [`compute_divisions`] and [`to_ticks`] produce the exact count and
//! [`encode`] the drawn form.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;

use super::helpers::lcm;
use crate::error::{NotationError, Result};
use crate::models::RationalDuration;

/// The fixed note type symbols, shortest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteType {
    N1024th,
    N512th,
    N256th,
    N128th,
    N64th,
    N32nd,
    N16th,
    Eighth,
    Quarter,
    Half,
    Whole,
    Breve,
    Long,
    Maxima,
}

impl NoteType {
    pub const ALL: [NoteType; 14] = [
        NoteType::N1024th,
        NoteType::N512th,
        NoteType::N256th,
        NoteType::N128th,
        NoteType::N64th,
        NoteType::N32nd,
        NoteType::N16th,
        NoteType::Eighth,
        NoteType::Quarter,
        NoteType::Half,
        NoteType::Whole,
        NoteType::Breve,
        NoteType::Long,
        NoteType::Maxima,
    ];

    /// Get the MusicXML `<type>` text for this note type
    pub fn xml_name(&self) -> &'static str {
        match self {
            NoteType::N1024th => "1024th",
            NoteType::N512th => "512th",
            NoteType::N256th => "256th",
            NoteType::N128th => "128th",
            NoteType::N64th => "64th",
            NoteType::N32nd => "32nd",
            NoteType::N16th => "16th",
            NoteType::Eighth => "eighth",
            NoteType::Quarter => "quarter",
            NoteType::Half => "half",
            NoteType::Whole => "whole",
            NoteType::Breve => "breve",
            NoteType::Long => "long",
            NoteType::Maxima => "maxima",
        }
    }

    /// Length as (numerator, denominator) of a whole note, in lowest terms
    pub fn fraction(&self) -> (u32, u32) {
        match self {
            NoteType::N1024th => (1, 1024),
            NoteType::N512th => (1, 512),
            NoteType::N256th => (1, 256),
            NoteType::N128th => (1, 128),
            NoteType::N64th => (1, 64),
            NoteType::N32nd => (1, 32),
            NoteType::N16th => (1, 16),
            NoteType::Eighth => (1, 8),
            NoteType::Quarter => (1, 4),
            NoteType::Half => (1, 2),
            NoteType::Whole => (1, 1),
            NoteType::Breve => (2, 1),
            NoteType::Long => (4, 1),
            NoteType::Maxima => (8, 1),
        }
    }

    pub fn duration(&self) -> Result<RationalDuration> {
        let (numerator, denominator) = self.fraction();
        RationalDuration::of(numerator, denominator)
    }

    /// The note type whose length is exactly `duration`, dots ignored
    pub fn from_duration(duration: &RationalDuration) -> Option<NoteType> {
        let key = (duration.numerator(), duration.denominator());
        NoteType::ALL.iter().copied().find(|t| t.fraction() == key)
    }
}

static NOTE_TYPES_BY_NAME: Lazy<HashMap<&'static str, NoteType>> =
    Lazy::new(|| NoteType::ALL.iter().map(|t| (t.xml_name(), *t)).collect());

impl FromStr for NoteType {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        match NOTE_TYPES_BY_NAME.get(name) {
            Some(note_type) => Ok(*note_type),
            // Older files spell the 32nd as "32th"
            None if name == "32th" => Ok(NoteType::N32nd),
            None => Err(NotationError::UnsupportedFeature(format!(
                "unknown note type '{}'",
                name
            ))),
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xml_name())
    }
}

/// `actual_notes` notes are played in the time of `normal_notes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupletRatio {
    pub actual_notes: u32,
    pub normal_notes: u32,
}

/// How a duration is drawn: a note type, dots and an optional tuplet ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolicDuration {
    pub base_type: NoteType,
    pub dot_count: u8,
    pub tuplet: Option<TupletRatio>,
}

impl SymbolicDuration {
    /// The exact length this symbol stands for
    pub fn to_duration(&self) -> Result<RationalDuration> {
        let mut duration = self.base_type.duration()?;
        if let Some(tuplet) = self.tuplet {
            duration = duration.multiply(tuplet.normal_notes)?.divide(tuplet.actual_notes)?;
        }
        for _ in 0..self.dot_count {
            duration = duration.add_dot()?;
        }
        Ok(duration)
    }
}

/// Tuplet divisors in priority order
const TUPLET_DIVISORS: [u32; 3] = [7, 5, 3];

/// Find the drawn form of `duration`.
///
/// Returns `None` when the duration has no clean symbol. Such notes are still written with
/// an exact tick count, only without `<type>`.
pub fn encode(duration: &RationalDuration) -> Option<SymbolicDuration> {
    let undotted = duration.remove_dots().ok()?;
    let dot_count = duration.dot_count();

    if let Some(base_type) = NoteType::from_duration(&undotted) {
        return Some(SymbolicDuration {
            base_type,
            dot_count,
            tuplet: None,
        });
    }

    let denominator = undotted.denominator();
    let actual_notes = TUPLET_DIVISORS
        .iter()
        .copied()
        .find(|k| denominator % k == 0)?;

    let shown = greatest_power_of_two_below(denominator);
    let base_type = NoteType::from_duration(&RationalDuration::of(1, shown).ok()?)?;

    let split = undotted.multiply(actual_notes).ok()?;
    let normal_notes = (split.numerator() as u64 * shown as u64 / split.denominator() as u64) as u32;
    if normal_notes == 0 {
        return None;
    }

    Some(SymbolicDuration {
        base_type,
        dot_count,
        tuplet: Some(TupletRatio {
            actual_notes,
            normal_notes,
        }),
    })
}

// The shortest plain note type that is longer than 1/denominator
fn greatest_power_of_two_below(denominator: u32) -> u32 {
    let mut power: u64 = 1;
    while power < denominator as u64 {
        power *= 2;
    }
    (power / 2).max(1) as u32
}

/// Duration of `ticks` when a quarter note takes `divisions` ticks
pub fn decode(ticks: u32, divisions: u32) -> Result<RationalDuration> {
    if ticks == 0 {
        return Err(NotationError::InvalidDuration(
            "duration must be at least one tick".to_string(),
        ));
    }
    if divisions == 0 {
        return Err(NotationError::InvalidDuration(
            "divisions must be at least 1".to_string(),
        ));
    }
    let whole = divisions.checked_mul(4).ok_or_else(|| {
        NotationError::InvalidDuration(format!("divisions {} is too large", divisions))
    })?;
    RationalDuration::of(ticks, whole)
}

/// Ticks per quarter note so that every one of `durations` is a whole number of ticks
pub fn compute_divisions<'a, I>(durations: I) -> Result<u32>
where
    I: IntoIterator<Item = &'a RationalDuration>,
{
    let mut whole = 4;
    for duration in durations {
        whole = lcm(whole, duration.denominator()).ok_or_else(|| {
            NotationError::InvalidDuration(format!(
                "no divisions fit both 1/{} and {}",
                whole, duration
            ))
        })?;
    }
    Ok(whole / 4)
}

/// Tick count of `duration` at the given divisions
pub fn to_ticks(duration: &RationalDuration, divisions: u32) -> Result<u32> {
    let whole = divisions.checked_mul(4).ok_or_else(|| {
        NotationError::InvalidDuration(format!("divisions {} is too large", divisions))
    })?;
    if whole % duration.denominator() != 0 {
        return Err(NotationError::InvalidDuration(format!(
            "{} is not a whole number of ticks at {} divisions",
            duration, divisions
        )));
    }
    (whole / duration.denominator())
        .checked_mul(duration.numerator())
        .ok_or_else(|| {
            NotationError::InvalidDuration(format!(
                "{} is too long for {} divisions",
                duration, divisions
            ))
        })
}
