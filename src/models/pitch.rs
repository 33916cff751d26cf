//! Pitch representation
//!
//! Pitches are spelled the way MusicXML spells them: a diatonic step, a chromatic
//! alteration in semitones and an octave number where octave 4 holds middle C.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NotationError, Result};

pub const MIN_ALTER: i8 = -2;
pub const MAX_ALTER: i8 = 2;
pub const MAX_OCTAVE: u8 = 9;

/// Diatonic step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Semitones above C
    pub fn semitones(&self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }
}

impl FromStr for Step {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "C" | "c" => Ok(Step::C),
            "D" | "d" => Ok(Step::D),
            "E" | "e" => Ok(Step::E),
            "F" | "f" => Ok(Step::F),
            "G" | "g" => Ok(Step::G),
            "A" | "a" => Ok(Step::A),
            "B" | "b" => Ok(Step::B),
            other => Err(NotationError::InvalidInput(format!("unknown step '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    step: Step,
    alter: i8,
    octave: u8,
}

impl Pitch {
    pub fn new(step: Step, alter: i8, octave: u8) -> Result<Self> {
        if !(MIN_ALTER..=MAX_ALTER).contains(&alter) {
            return Err(NotationError::InvalidInput(format!(
                "alter must be within {}..={}, was {}",
                MIN_ALTER, MAX_ALTER, alter
            )));
        }
        if octave > MAX_OCTAVE {
            return Err(NotationError::InvalidInput(format!(
                "octave must be at most {}, was {}",
                MAX_OCTAVE, octave
            )));
        }
        Ok(Self { step, alter, octave })
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn alter(&self) -> i8 {
        self.alter
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    /// Semitone number where C0 is 0 and middle C (C4) is 48
    pub fn to_int(&self) -> i32 {
        self.octave as i32 * 12 + self.step.semitones() + self.alter as i32
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accidental = match self.alter {
            -2 => "bb",
            -1 => "b",
            1 => "#",
            2 => "x",
            _ => "",
        };
        write!(f, "{}{}{}", self.step.as_str(), accidental, self.octave)
    }
}
