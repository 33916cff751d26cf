//! Immutable score model
//!
//! These types are produced by the builders in [`crate::builders`] and consumed by the
//! MusicXML writer. Notes are shared through `Arc` so that a note reached through a tie
//! chain and the same note stored in its measure are one object.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::duration::RationalDuration;
use super::notation::{Connection, Notation};
use super::pitch::Pitch;

// ============================================================================
// NOTE-LEVEL TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Articulation {
    Accent,
    StrongAccent,
    Staccato,
    Staccatissimo,
    Tenuto,
    DetachedLegato,
    Spiccato,
    Stress,
    Unstress,
    Fermata,
}

/// Marks written under `<ornaments>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ornament {
    Trill,
    Mordent,
    InvertedMordent,
    Turn,
    InvertedTurn,
    DelayedTurn,
    DelayedInvertedTurn,
    /// Strokes through the stem, 1..=8
    Tremolo(u8),
}

#[derive(Debug, Clone)]
pub struct Note {
    pub(crate) pitch: Pitch,
    pub(crate) unpitched: bool,
    pub(crate) duration: RationalDuration,
    pub(crate) articulations: Vec<Articulation>,
    pub(crate) ornaments: Vec<Ornament>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) preceding_grace_notes: Vec<Ornamental>,
    pub(crate) succeeding_grace_notes: Vec<Ornamental>,
}

impl Note {
    /// Pitch, or the display position for unpitched notes
    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    pub fn is_unpitched(&self) -> bool {
        self.unpitched
    }

    pub fn duration(&self) -> RationalDuration {
        self.duration
    }

    pub fn articulations(&self) -> &[Articulation] {
        &self.articulations
    }

    pub fn ornaments(&self) -> &[Ornament] {
        &self.ornaments
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, notation: &Notation) -> Option<&Connection> {
        self.connections.iter().find(|c| c.notation() == notation)
    }

    pub fn notations(&self) -> impl Iterator<Item = &Notation> {
        self.connections.iter().map(|c| c.notation())
    }

    pub fn preceding_grace_notes(&self) -> &[Ornamental] {
        &self.preceding_grace_notes
    }

    pub fn succeeding_grace_notes(&self) -> &[Ornamental] {
        &self.succeeding_grace_notes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraceNoteKind {
    Grace,
    Acciaccatura,
    Appoggiatura,
}

#[derive(Debug, Clone)]
pub struct GraceNote {
    pub(crate) pitch: Pitch,
    pub(crate) unpitched: bool,
    pub(crate) display_duration: RationalDuration,
    pub(crate) kind: GraceNoteKind,
    pub(crate) articulations: Vec<Articulation>,
    pub(crate) ornaments: Vec<Ornament>,
    pub(crate) connections: Vec<Connection>,
}

impl GraceNote {
    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    pub fn is_unpitched(&self) -> bool {
        self.unpitched
    }

    /// The duration the grace note is drawn with. It takes no time in the measure.
    pub fn display_duration(&self) -> RationalDuration {
        self.display_duration
    }

    pub fn kind(&self) -> GraceNoteKind {
        self.kind
    }

    pub fn articulations(&self) -> &[Articulation] {
        &self.articulations
    }

    pub fn ornaments(&self) -> &[Ornament] {
        &self.ornaments
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, notation: &Notation) -> Option<&Connection> {
        self.connections.iter().find(|c| c.notation() == notation)
    }
}

/// A grace note or a chord of grace notes attached to a principal note
#[derive(Debug, Clone)]
pub enum Ornamental {
    Single(Arc<GraceNote>),
    Chord(Vec<Arc<GraceNote>>),
}

impl Ornamental {
    pub fn notes(&self) -> &[Arc<GraceNote>] {
        match self {
            Ornamental::Single(note) => std::slice::from_ref(note),
            Ornamental::Chord(notes) => notes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rest {
    pub(crate) duration: RationalDuration,
}

impl Rest {
    pub fn duration(&self) -> RationalDuration {
        self.duration
    }
}

#[derive(Debug, Clone)]
pub struct Chord {
    pub(crate) notes: Vec<Arc<Note>>,
}

impl Chord {
    pub fn notes(&self) -> &[Arc<Note>] {
        &self.notes
    }

    /// Length of the longest member
    pub fn duration(&self) -> Option<RationalDuration> {
        self.notes.iter().map(|n| n.duration()).max()
    }
}

#[derive(Debug, Clone)]
pub enum Durational {
    Note(Arc<Note>),
    Rest(Rest),
    Chord(Chord),
}

impl Durational {
    pub fn duration(&self) -> Option<RationalDuration> {
        match self {
            Durational::Note(note) => Some(note.duration()),
            Durational::Rest(rest) => Some(rest.duration()),
            Durational::Chord(chord) => chord.duration(),
        }
    }

    pub fn as_note(&self) -> Option<&Arc<Note>> {
        match self {
            Durational::Note(note) => Some(note),
            _ => None,
        }
    }

    pub fn as_chord(&self) -> Option<&Chord> {
        match self {
            Durational::Chord(chord) => Some(chord),
            _ => None,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Durational::Rest(_))
    }
}

// ============================================================================
// MEASURE ATTRIBUTES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClefSign {
    G,
    F,
    C,
    Percussion,
    Tab,
}

impl ClefSign {
    pub fn default_line(&self) -> u8 {
        match self {
            ClefSign::G => 2,
            ClefSign::F => 4,
            ClefSign::C => 3,
            ClefSign::Percussion | ClefSign::Tab => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clef {
    pub sign: ClefSign,
    pub line: u8,
}

impl Clef {
    pub fn treble() -> Self {
        Self { sign: ClefSign::G, line: 2 }
    }

    pub fn bass() -> Self {
        Self { sign: ClefSign::F, line: 4 }
    }
}

/// Position on the circle of fifths, -7..=7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignature {
    pub fifths: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: u32,
    pub beat_type: u32,
}

/// Bar line drawn at one side of a measure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Barline {
    #[default]
    None,
    Single,
    Double,
    RepeatLeft,
    RepeatRight,
    Final,
    Dashed,
    Thick,
    Invisible,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureAttributes {
    pub key_signature: Option<KeySignature>,
    pub time_signature: Option<TimeSignature>,
    pub clef: Option<Clef>,
}

// ============================================================================
// CONTAINERS
// ============================================================================

#[derive(Debug, Clone)]
pub struct Measure {
    pub(crate) number: u32,
    pub(crate) attributes: MeasureAttributes,
    pub(crate) left_barline: Barline,
    pub(crate) right_barline: Barline,
    pub(crate) voices: BTreeMap<u32, Vec<Durational>>,
}

impl Measure {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn attributes(&self) -> &MeasureAttributes {
        &self.attributes
    }

    pub fn left_barline(&self) -> Barline {
        self.left_barline
    }

    pub fn right_barline(&self) -> Barline {
        self.right_barline
    }

    pub fn voices(&self) -> &BTreeMap<u32, Vec<Durational>> {
        &self.voices
    }

    pub fn voice(&self, number: u32) -> &[Durational] {
        self.voices.get(&number).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.voices.values().all(|v| v.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Part {
    pub(crate) id: String,
    pub(crate) name: Option<String>,
    pub(crate) staves: BTreeMap<u32, Vec<Measure>>,
}

impl Part {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn staves(&self) -> &BTreeMap<u32, Vec<Measure>> {
        &self.staves
    }

    pub fn staff(&self, number: u32) -> &[Measure] {
        self.staves.get(&number).map(|m| m.as_slice()).unwrap_or(&[])
    }

    pub fn is_multi_staff(&self) -> bool {
        self.staves.len() > 1
    }

    pub fn measure_count(&self) -> usize {
        self.staves.values().map(|m| m.len()).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Score {
    pub title: Option<String>,
    pub movement_title: Option<String>,
    pub composer: Option<String>,
    pub(crate) parts: Vec<Part>,
}

impl Score {
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            parts,
            ..Self::default()
        }
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == id)
    }
}
