//! Per-part reading state
//!
//! MusicXML lists the notes of a part one after another. A note with `<chord/>` joins the
//! note before it, grace notes wait for the note they ornament, and the staff and voice
//! numbers persist until changed. [`PartContext`] keeps these buffers per staff and hands
//! finished measures to the [`PartBuilder`].

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::resolution::{NotationResolutionTable, Scope};
use crate::builders::{
    BuilderArena, BuilderId, DurationalBuilder, MeasureBuilder, OrnamentalGroup, PartBuilder,
    RestBuilder,
};
use crate::error::Result;
use crate::models::{Barline, Clef, GraceNoteKind, MeasureAttributes};

pub const DEFAULT_STAFF: u32 = 1;
pub const DEFAULT_VOICE: u32 = 1;

/// Notes of the chord currently being read on one staff
#[derive(Debug, Default)]
struct ChordBuffer {
    notes: Vec<BuilderId>,
    voice: u32,
}

/// Grace notes waiting for their principal note on one staff
#[derive(Debug, Default)]
struct OrnamentalBuffer {
    chord: Vec<BuilderId>,
    voice: u32,
    groups: Vec<OrnamentalGroup>,
}

impl OrnamentalBuffer {
    fn is_empty(&self) -> bool {
        self.chord.is_empty() && self.groups.is_empty()
    }

    fn flush_chord(
        &mut self,
        staff: u32,
        table: &mut NotationResolutionTable,
        arena: &mut BuilderArena,
    ) -> Result<()> {
        match self.chord.len() {
            0 => {}
            1 => self.groups.push(OrnamentalGroup::Single(self.chord[0])),
            _ => {
                // Arpeggios over grace chords only hold grace notes, so there is no
                // principal to hand back
                table.resolve_arpeggios(Scope::new(staff, self.voice), arena)?;
                self.groups.push(OrnamentalGroup::Chord(self.chord.clone()));
            }
        }
        self.chord.clear();
        Ok(())
    }
}

#[derive(Debug)]
pub struct PartContext {
    staff: u32,
    voice: u32,
    measure_number: u32,
    divisions: u32,
    has_chord_tag: bool,
    staves: BTreeSet<u32>,
    part: PartBuilder,
    prev_note: Option<BuilderId>,
    chord_buffers: BTreeMap<u32, ChordBuffer>,
    ornamentals: BTreeMap<u32, OrnamentalBuffer>,
    measures: BTreeMap<u32, MeasureBuilder>,
}

impl PartContext {
    pub fn new(part: PartBuilder) -> Self {
        let mut context = Self {
            staff: DEFAULT_STAFF,
            voice: DEFAULT_VOICE,
            measure_number: 0,
            divisions: 1,
            has_chord_tag: false,
            staves: BTreeSet::new(),
            part,
            prev_note: None,
            chord_buffers: BTreeMap::new(),
            ornamentals: BTreeMap::new(),
            measures: BTreeMap::new(),
        };
        context.set_staff(DEFAULT_STAFF);
        context
    }

    pub fn staff(&self) -> u32 {
        self.staff
    }

    pub fn voice(&self) -> u32 {
        self.voice
    }

    pub fn scope(&self) -> Scope {
        Scope::new(self.staff, self.voice)
    }

    pub fn set_voice(&mut self, voice: u32) {
        self.voice = voice;
    }

    pub fn set_staff(&mut self, staff: u32) {
        if !self.staves.contains(&staff) {
            self.add_staff(staff);
        }
        self.staff = staff;
    }

    /// Register a staff without switching to it
    pub fn add_staff(&mut self, staff: u32) {
        if !self.staves.insert(staff) {
            return;
        }
        let measure = match self.measures.get(&self.staff) {
            Some(current) => current.following(self.measure_number),
            None => MeasureBuilder::new(self.measure_number),
        };
        self.measures.insert(staff, measure);
        self.chord_buffers.insert(staff, ChordBuffer::default());
        self.ornamentals.insert(staff, OrnamentalBuffer::default());
        debug!("part {}: staff {} added", self.part.id(), staff);
    }

    pub fn set_chord_tag(&mut self, has_chord_tag: bool) {
        self.has_chord_tag = has_chord_tag;
    }

    pub fn divisions(&self) -> u32 {
        self.divisions
    }

    pub fn set_divisions(&mut self, divisions: u32) {
        self.divisions = divisions;
    }

    pub fn measure_number(&self) -> u32 {
        self.measure_number
    }

    pub fn set_measure_number(&mut self, number: u32) {
        self.measure_number = number;
        for measure in self.measures.values_mut() {
            measure.set_number(number);
        }
    }

    pub fn increment_measure_number(&mut self) {
        self.set_measure_number(self.measure_number + 1);
    }

    fn measure_mut(&mut self, staff: u32) -> &mut MeasureBuilder {
        let number = self.measure_number;
        self.measures
            .entry(staff)
            .or_insert_with(|| MeasureBuilder::new(number))
    }

    /// Apply an attribute change to every staff of the part
    pub fn update_attributes<F>(&mut self, mut update: F)
    where
        F: FnMut(&mut MeasureAttributes),
    {
        for measure in self.measures.values_mut() {
            update(measure.attributes_mut());
        }
    }

    /// Bar lines are not staff specific, so every staff's measure gets them
    pub fn set_left_barline(&mut self, barline: Barline) {
        for measure in self.measures.values_mut() {
            measure.set_left_barline(barline);
        }
    }

    pub fn set_right_barline(&mut self, barline: Barline) {
        for measure in self.measures.values_mut() {
            measure.set_right_barline(barline);
        }
    }

    /// Set the clef of `staff`, or of the current staff when no number is given
    pub fn set_clef(&mut self, staff: Option<u32>, clef: Clef) {
        let staff = staff.filter(|s| *s > 0).unwrap_or(self.staff);
        self.add_staff(staff);
        self.measure_mut(staff).attributes_mut().clef = Some(clef);
    }

    pub fn add_note(
        &mut self,
        note: BuilderId,
        table: &mut NotationResolutionTable,
        arena: &mut BuilderArena,
    ) -> Result<()> {
        let staff = self.staff;
        if !self.has_chord_tag {
            self.flush_chord_buffer(staff, table, arena)?;
        }

        let voice = self.voice;
        let buffer = self.chord_buffers.entry(staff).or_default();
        buffer.notes.push(note);
        buffer.voice = voice;
        self.prev_note = Some(note);

        if self.has_grace_notes(staff) {
            self.add_preceding_ornamentals(note, table, arena)?;
        }
        Ok(())
    }

    pub fn add_rest(
        &mut self,
        rest: RestBuilder,
        table: &mut NotationResolutionTable,
        arena: &mut BuilderArena,
    ) -> Result<()> {
        let staff = self.staff;
        if !self.has_chord_tag {
            self.flush_chord_buffer(staff, table, arena)?;
        }
        let voice = self.voice;
        self.measure_mut(staff)
            .add_to_voice(voice, DurationalBuilder::Rest(rest));
        Ok(())
    }

    pub fn add_grace_note(
        &mut self,
        grace: BuilderId,
        table: &mut NotationResolutionTable,
        arena: &mut BuilderArena,
    ) -> Result<()> {
        let staff = self.staff;
        let has_chord_tag = self.has_chord_tag;
        let voice = self.voice;
        let buffer = self.ornamentals.entry(staff).or_default();
        if !has_chord_tag {
            buffer.flush_chord(staff, table, arena)?;
        }
        buffer.chord.push(grace);
        buffer.voice = voice;
        Ok(())
    }

    fn has_grace_notes(&self, staff: u32) -> bool {
        self.ornamentals
            .get(&staff)
            .map(|buffer| !buffer.is_empty())
            .unwrap_or(false)
    }

    fn pop_ornamentals(
        &mut self,
        staff: u32,
        table: &mut NotationResolutionTable,
        arena: &mut BuilderArena,
    ) -> Result<Vec<OrnamentalGroup>> {
        let buffer = self.ornamentals.entry(staff).or_default();
        buffer.flush_chord(staff, table, arena)?;
        Ok(std::mem::take(&mut buffer.groups))
    }

    fn add_preceding_ornamentals(
        &mut self,
        principal: BuilderId,
        table: &mut NotationResolutionTable,
        arena: &mut BuilderArena,
    ) -> Result<()> {
        let staff = self.staff;
        let groups = self.pop_ornamentals(staff, table, arena)?;

        if let [OrnamentalGroup::Single(grace)] = groups.as_slice() {
            if is_appoggiatura(arena, principal, *grace)? {
                arena.builder_mut(*grace)?.set_grace_kind(GraceNoteKind::Appoggiatura);
            }
        }
        arena.set_preceding_grace_notes(principal, groups)
    }

    /// Attach the pending grace notes of the current staff after `principal`
    pub fn add_succeeding_ornamentals(
        &mut self,
        principal: BuilderId,
        table: &mut NotationResolutionTable,
        arena: &mut BuilderArena,
    ) -> Result<()> {
        let staff = self.staff;
        let groups = self.pop_ornamentals(staff, table, arena)?;
        if groups.is_empty() {
            return Ok(());
        }
        let mut succeeding = arena.succeeding_grace_notes(principal).to_vec();
        succeeding.extend(groups);
        arena.set_succeeding_grace_notes(principal, succeeding)
    }

    fn flush_chord_buffer(
        &mut self,
        staff: u32,
        table: &mut NotationResolutionTable,
        arena: &mut BuilderArena,
    ) -> Result<()> {
        let buffer = self.chord_buffers.entry(staff).or_default();
        let notes = std::mem::take(&mut buffer.notes);
        let voice = buffer.voice;

        let durational = match notes.len() {
            0 => return Ok(()),
            1 => DurationalBuilder::Note(notes[0]),
            _ => {
                let principals = table.resolve_arpeggios(Scope::new(staff, voice), arena)?;
                for principal in principals {
                    self.add_succeeding_ornamentals(principal, table, arena)?;
                }
                DurationalBuilder::Chord(notes)
            }
        };
        self.measure_mut(staff).add_to_voice(voice, durational);
        Ok(())
    }

    /// Close the current measure on every staff and start the next ones
    pub fn finish_measure(
        &mut self,
        table: &mut NotationResolutionTable,
        arena: &mut BuilderArena,
    ) -> Result<()> {
        let staff = self.staff;
        if let Some(prev) = self.prev_note {
            if self.has_grace_notes(staff) {
                self.add_succeeding_ornamentals(prev, table, arena)?;
            }
        }

        let staves: Vec<u32> = self.staves.iter().copied().collect();
        for staff in &staves {
            self.flush_chord_buffer(*staff, table, arena)?;
        }

        for staff in staves {
            if let Some(measure) = self.measures.get_mut(&staff) {
                let next = measure.following(self.measure_number);
                let finished = std::mem::replace(measure, next);
                self.part.add_to_staff(staff, finished);
            }
        }
        debug!("part {}: measure {} finished", self.part.id(), self.measure_number);
        Ok(())
    }

    pub fn into_part_builder(self) -> PartBuilder {
        self.part
    }
}

/// A lone grace note within a whole step of its principal, drawn at half the principal's
/// length and not slashed, is read as an appoggiatura
fn is_appoggiatura(arena: &BuilderArena, principal: BuilderId, grace: BuilderId) -> Result<bool> {
    let note = arena.builder(principal)?;
    let grace = arena.builder(grace)?;
    let interval = note.pitch().to_int() - grace.pitch().to_int();
    let half = match note.duration().divide(2) {
        Ok(half) => half,
        Err(_) => return Ok(false),
    };
    Ok(interval.abs() <= 2
        && half == grace.duration()
        && grace.grace_kind() != Some(GraceNoteKind::Acciaccatura))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::NoteBuilder;
    use crate::models::{NotationKind, NotationStyle, Pitch, RationalDuration, Step};

    fn pitch(step: Step) -> Pitch {
        Pitch::new(step, 0, 4).unwrap()
    }

    fn quarter() -> RationalDuration {
        RationalDuration::of(1, 4).unwrap()
    }

    fn eighth() -> RationalDuration {
        RationalDuration::of(1, 8).unwrap()
    }

    struct Fixture {
        context: PartContext,
        table: NotationResolutionTable,
        arena: BuilderArena,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                context: PartContext::new(PartBuilder::new("P1")),
                table: NotationResolutionTable::new(false),
                arena: BuilderArena::new(),
            }
        }

        fn note(&mut self, step: Step, chord: bool) -> BuilderId {
            let id = self.arena.add(NoteBuilder::new(pitch(step), quarter()));
            self.context.set_chord_tag(chord);
            self.context
                .add_note(id, &mut self.table, &mut self.arena)
                .unwrap();
            let scope = self.context.scope();
            self.table.end_notations(scope, id, &mut self.arena).unwrap();
            self.table.start_or_continue_notations(scope, id);
            self.table.continue_ongoing_notations(scope, id);
            id
        }

        fn grace(&mut self, step: Step, kind: GraceNoteKind, chord: bool) -> BuilderId {
            let id = self.arena.add(NoteBuilder::grace(pitch(step), eighth(), kind));
            self.context.set_chord_tag(chord);
            self.context
                .add_grace_note(id, &mut self.table, &mut self.arena)
                .unwrap();
            id
        }

        fn finish(mut self) -> crate::models::Part {
            self.context
                .finish_measure(&mut self.table, &mut self.arena)
                .unwrap();
            self.context.into_part_builder().build(&mut self.arena).unwrap()
        }
    }

    #[test]
    fn test_chord_tag_groups_notes() {
        let mut fixture = Fixture::new();
        fixture.context.set_measure_number(1);
        fixture.note(Step::C, false);
        fixture.note(Step::E, true);
        fixture.note(Step::G, true);
        fixture.note(Step::C, false);

        let part = fixture.finish();
        let measure = &part.staff(1)[0];
        assert_eq!(measure.number(), 1);
        assert_eq!(measure.voice(1).len(), 2);
        assert_eq!(measure.voice(1)[0].as_chord().unwrap().notes().len(), 3);
        assert!(measure.voice(1)[1].as_note().is_some());
    }

    #[test]
    fn test_arpeggio_closed_by_chord_flush() {
        let mut fixture = Fixture::new();
        for (step, chord) in [(Step::C, false), (Step::E, true), (Step::G, true)] {
            fixture
                .table
                .queue_start(0, NotationKind::Arpeggiate, NotationStyle::Solid);
            fixture.note(step, chord);
        }
        let part = fixture.finish();
        let chord = part.staff(1)[0].voice(1)[0].as_chord().unwrap();
        let first = &chord.notes()[0].connections()[0];
        assert_eq!(first.notation().kind(), NotationKind::Arpeggiate);
        assert_eq!(first.following().len(), 2);
    }

    #[test]
    fn test_appoggiatura_detection() {
        let mut fixture = Fixture::new();
        let grace = fixture.grace(Step::D, GraceNoteKind::Grace, false);
        let principal = fixture.note(Step::C, false);
        assert_eq!(fixture.arena.preceding_grace_notes(principal).len(), 1);
        assert_eq!(
            fixture.arena.builder(grace).unwrap().grace_kind(),
            Some(GraceNoteKind::Appoggiatura)
        );
    }

    #[test]
    fn test_slashed_grace_stays_acciaccatura() {
        let mut fixture = Fixture::new();
        let grace = fixture.grace(Step::D, GraceNoteKind::Acciaccatura, false);
        fixture.note(Step::C, false);
        assert_eq!(
            fixture.arena.builder(grace).unwrap().grace_kind(),
            Some(GraceNoteKind::Acciaccatura)
        );
    }

    #[test]
    fn test_grace_chord_and_trailing_grace_notes() {
        let mut fixture = Fixture::new();
        fixture.grace(Step::E, GraceNoteKind::Grace, false);
        fixture.grace(Step::G, GraceNoteKind::Grace, true);
        let principal = fixture.note(Step::C, false);
        fixture.grace(Step::B, GraceNoteKind::Grace, false);

        let preceding = fixture.arena.preceding_grace_notes(principal).to_vec();
        assert!(matches!(preceding.as_slice(), [OrnamentalGroup::Chord(ids)] if ids.len() == 2));

        let part = fixture.finish();
        let note = part.staff(1)[0].voice(1)[0].as_note().unwrap().clone();
        assert_eq!(note.preceding_grace_notes()[0].notes().len(), 2);
        assert_eq!(note.succeeding_grace_notes().len(), 1);
    }

    #[test]
    fn test_attributes_carry_to_new_staves_and_measures() {
        let mut fixture = Fixture::new();
        fixture.context.set_measure_number(1);
        fixture.context.update_attributes(|a| {
            a.key_signature = Some(crate::models::KeySignature { fifths: 2 })
        });
        fixture.context.set_clef(Some(2), Clef::bass());
        fixture.note(Step::C, false);
        fixture
            .context
            .finish_measure(&mut fixture.table, &mut fixture.arena)
            .unwrap();
        fixture.context.set_measure_number(2);

        let part = fixture.finish();
        assert_eq!(part.staves().len(), 2);
        let second_bass = &part.staff(2)[1];
        assert_eq!(second_bass.number(), 2);
        assert_eq!(second_bass.attributes().clef, Some(Clef::bass()));
        assert_eq!(second_bass.attributes().key_signature.unwrap().fifths, 2);
    }
}
