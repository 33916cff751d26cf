//! Measure and part builders
//!
//! These hold [`BuilderId`]s until the whole part is read, then build every note through the
//! shared [`BuilderArena`] so tied and slurred notes end up pointing at the same objects the
//! measures hold.

use std::collections::BTreeMap;

use crate::error::{NotationError, Result};
use crate::models::{
    Barline, Chord, Durational, Measure, MeasureAttributes, Part, RationalDuration, Rest,
};

use super::{BuilderArena, BuilderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestBuilder {
    duration: RationalDuration,
}

impl RestBuilder {
    pub fn new(duration: RationalDuration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> RationalDuration {
        self.duration
    }

    pub fn build(&self) -> Rest {
        Rest {
            duration: self.duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationalBuilder {
    Note(BuilderId),
    Rest(RestBuilder),
    Chord(Vec<BuilderId>),
}

impl DurationalBuilder {
    pub fn build(&self, arena: &mut BuilderArena) -> Result<Durational> {
        match self {
            DurationalBuilder::Note(id) => Ok(Durational::Note(arena.build_note(*id)?)),
            DurationalBuilder::Rest(rest) => Ok(Durational::Rest(rest.build())),
            DurationalBuilder::Chord(ids) => {
                if ids.is_empty() {
                    return Err(NotationError::InvalidInput("chord without notes".to_string()));
                }
                let mut notes = Vec::with_capacity(ids.len());
                for id in ids {
                    notes.push(arena.build_note(*id)?);
                }
                Ok(Durational::Chord(Chord { notes }))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MeasureBuilder {
    number: u32,
    attributes: MeasureAttributes,
    left_barline: Barline,
    right_barline: Barline,
    voices: BTreeMap<u32, Vec<DurationalBuilder>>,
}

impl MeasureBuilder {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            attributes: MeasureAttributes::default(),
            left_barline: Barline::None,
            right_barline: Barline::Single,
            voices: BTreeMap::new(),
        }
    }

    /// Next measure on the same staff, carrying the attributes forward. Bar lines start over.
    pub fn following(&self, number: u32) -> Self {
        Self {
            attributes: self.attributes,
            ..Self::new(number)
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn set_number(&mut self, number: u32) {
        self.number = number;
    }

    pub fn attributes(&self) -> &MeasureAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut MeasureAttributes {
        &mut self.attributes
    }

    pub fn left_barline(&self) -> Barline {
        self.left_barline
    }

    pub fn set_left_barline(&mut self, barline: Barline) {
        self.left_barline = barline;
    }

    pub fn right_barline(&self) -> Barline {
        self.right_barline
    }

    pub fn set_right_barline(&mut self, barline: Barline) {
        self.right_barline = barline;
    }

    pub fn add_to_voice(&mut self, voice: u32, durational: DurationalBuilder) {
        self.voices.entry(voice).or_default().push(durational);
    }

    pub fn voice(&self, voice: u32) -> &[DurationalBuilder] {
        self.voices.get(&voice).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.voices.values().all(|v| v.is_empty())
    }

    pub fn build(&self, arena: &mut BuilderArena) -> Result<Measure> {
        let mut voices = BTreeMap::new();
        for (number, durationals) in &self.voices {
            let mut built = Vec::with_capacity(durationals.len());
            for durational in durationals {
                built.push(durational.build(arena)?);
            }
            voices.insert(*number, built);
        }
        Ok(Measure {
            number: self.number,
            attributes: self.attributes,
            left_barline: self.left_barline,
            right_barline: self.right_barline,
            voices,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PartBuilder {
    id: String,
    name: Option<String>,
    staves: BTreeMap<u32, Vec<MeasureBuilder>>,
}

impl PartBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            staves: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn add_to_staff(&mut self, staff: u32, measure: MeasureBuilder) {
        self.staves.entry(staff).or_default().push(measure);
    }

    pub fn staff(&self, staff: u32) -> &[MeasureBuilder] {
        self.staves.get(&staff).map(|m| m.as_slice()).unwrap_or(&[])
    }

    pub fn build(&self, arena: &mut BuilderArena) -> Result<Part> {
        let mut staves = BTreeMap::new();
        for (number, measures) in &self.staves {
            let mut built = Vec::with_capacity(measures.len());
            for measure in measures {
                built.push(measure.build(arena)?);
            }
            staves.insert(*number, built);
        }
        Ok(Part {
            id: self.id.clone(),
            name: self.name.clone(),
            staves,
        })
    }
}
