//! MusicXML writer
//!
//! Walks a built [`Score`] measure by measure and emits a `score-partwise` document. Durations
//! become tick counts at a per-part divisions value plus the drawn note type from the
//! duration codec. Notations spanning several notes are written as start and stop markers
//! numbered by a [`NotationNumberAllocator`] that lives for one part.

pub mod allocator;
pub mod builder;

use std::collections::BTreeMap;

use log::{debug, info, warn};

use super::duration::{compute_divisions, encode, to_ticks};
use super::tags;
use crate::config::WriterOptions;
use crate::error::{NotationError, Result};
use crate::models::{
    Articulation, Barline, Clef, Connection, ConnectionRole, Durational, GraceNote,
    GraceNoteKind, Measure, MeasureAttributes, NotationKind, Note, Ornament, Ornamental, Part,
    Pitch, RationalDuration, Score,
};

pub use allocator::NotationNumberAllocator;
pub use builder::XmlEmitter;

/// Write `score` as a `score-partwise` document
pub fn write_score(score: &Score, options: &WriterOptions) -> Result<String> {
    let mut out = XmlEmitter::new(options);
    out.prolog(&options.version);
    out.start(tags::SCORE_PARTWISE, &[(tags::ATTR_VERSION, &options.version)]);

    write_header(&mut out, score);

    let ids: Vec<String> = score
        .parts()
        .iter()
        .enumerate()
        .map(|(index, part)| match part.id() {
            "" => format!("P{}", index + 1),
            id => id.to_string(),
        })
        .collect();

    out.start(tags::PART_LIST, &[]);
    for (part, id) in score.parts().iter().zip(&ids) {
        out.start(tags::SCORE_PART, &[(tags::ATTR_ID, id)]);
        match part.name() {
            Some(name) => out.text(tags::PART_NAME, name),
            None => out.empty(tags::PART_NAME, &[]),
        }
        out.end(tags::SCORE_PART);
    }
    out.end(tags::PART_LIST);

    for (part, id) in score.parts().iter().zip(&ids) {
        PartWriter::new(part)
            .map_err(|e| match e {
                NotationError::InvalidDuration(message) => {
                    NotationError::InvalidDuration(format!("part {}: {}", id, message))
                }
                other => other,
            })?
            .write(&mut out, id)?;
    }

    out.end(tags::SCORE_PARTWISE);
    info!("wrote {} parts", score.parts().len());
    Ok(out.finish())
}

fn write_header(out: &mut XmlEmitter, score: &Score) {
    if let Some(title) = &score.title {
        out.start(tags::WORK, &[]);
        out.text(tags::WORK_TITLE, title);
        out.end(tags::WORK);
    }
    if let Some(movement_title) = &score.movement_title {
        out.text(tags::MOVEMENT_TITLE, movement_title);
    }
    if let Some(composer) = &score.composer {
        out.start(tags::IDENTIFICATION, &[]);
        out.text_with(tags::CREATOR, &[(tags::ATTR_TYPE, tags::COMPOSER)], composer);
        out.end(tags::IDENTIFICATION);
    }
}

/// Every length that needs a whole number of ticks in `part`
fn part_durations(part: &Part) -> Vec<RationalDuration> {
    part.staves()
        .values()
        .flatten()
        .flat_map(|measure| measure.voices().values().flatten())
        .flat_map(|durational| match durational {
            Durational::Note(note) => vec![note.duration()],
            Durational::Rest(rest) => vec![rest.duration()],
            Durational::Chord(chord) => chord.notes().iter().map(|n| n.duration()).collect(),
        })
        .collect()
}

/// Fields shared by notes and grace notes
struct NoteView<'a> {
    pitch: Pitch,
    unpitched: bool,
    grace: Option<GraceNoteKind>,
    duration: RationalDuration,
    articulations: &'a [Articulation],
    ornaments: &'a [Ornament],
    connections: &'a [Connection],
}

impl<'a> NoteView<'a> {
    fn note(note: &'a Note) -> Self {
        Self {
            pitch: note.pitch(),
            unpitched: note.is_unpitched(),
            grace: None,
            duration: note.duration(),
            articulations: note.articulations(),
            ornaments: note.ornaments(),
            connections: note.connections(),
        }
    }

    fn grace(note: &'a GraceNote) -> Self {
        Self {
            pitch: note.pitch(),
            unpitched: note.is_unpitched(),
            grace: Some(note.kind()),
            duration: note.display_duration(),
            articulations: note.articulations(),
            ornaments: note.ornaments(),
            connections: note.connections(),
        }
    }
}

/// Position of a note on its staff
#[derive(Debug, Clone, Copy)]
struct Placement {
    staff: u32,
    voice: u32,
}

struct PartWriter<'a> {
    part: &'a Part,
    divisions: u32,
    multi_staff: bool,
    numbers: NotationNumberAllocator,
}

impl<'a> PartWriter<'a> {
    fn new(part: &'a Part) -> Result<Self> {
        let durations = part_durations(part);
        Ok(Self {
            part,
            divisions: compute_divisions(&durations)?,
            multi_staff: part.is_multi_staff(),
            numbers: NotationNumberAllocator::new(),
        })
    }

    fn write(mut self, out: &mut XmlEmitter, id: &str) -> Result<()> {
        debug!("writing part {} at {} divisions", id, self.divisions);
        out.start(tags::PART, &[(tags::ATTR_ID, id)]);

        let part = self.part;
        let staves: Vec<u32> = part.staves().keys().copied().collect();
        let mut previous: BTreeMap<u32, MeasureAttributes> = BTreeMap::new();

        for index in 0..part.measure_count() {
            let measures: Vec<(u32, &Measure)> = staves
                .iter()
                .filter_map(|staff| part.staff(*staff).get(index).map(|m| (*staff, m)))
                .collect();
            let number = measures
                .first()
                .map(|(_, m)| m.number())
                .unwrap_or(index as u32 + 1);

            out.start(tags::MEASURE, &[(tags::ATTR_NUMBER, &number.to_string())]);
            // Bar lines are the same on every staff, the first one speaks for the part
            let lead = measures.first().map(|(_, m)| *m);
            if let Some(measure) = lead.filter(|m| m.left_barline() != Barline::None) {
                write_barline(out, tags::LEFT, measure.left_barline());
            }
            self.write_attributes(out, index == 0, &measures, &mut previous);

            let mut position = 0u32;
            for (staff, measure) in &measures {
                for (voice, durationals) in measure.voices() {
                    if durationals.is_empty() {
                        continue;
                    }
                    if position > 0 {
                        out.start(tags::BACKUP, &[]);
                        out.text(tags::DURATION, position);
                        out.end(tags::BACKUP);
                        position = 0;
                    }
                    let at = Placement {
                        staff: *staff,
                        voice: *voice,
                    };
                    for durational in durationals {
                        let ticks = self.write_durational(out, durational, at)?;
                        position = position.checked_add(ticks).ok_or_else(|| {
                            NotationError::InvalidDuration(format!(
                                "measure {}: voice {} runs past {} ticks",
                                number,
                                voice,
                                u32::MAX
                            ))
                        })?;
                    }
                }
            }
            if let Some(measure) = lead.filter(|m| {
                !matches!(m.right_barline(), Barline::Single | Barline::None)
            }) {
                write_barline(out, tags::RIGHT, measure.right_barline());
            }
            out.end(tags::MEASURE);
        }

        if self.numbers.open_count() > 0 {
            warn!(
                "part {}: {} notations were started but never stopped",
                id,
                self.numbers.open_count()
            );
        }
        out.end(tags::PART);
        Ok(())
    }

    fn write_attributes(
        &self,
        out: &mut XmlEmitter,
        first: bool,
        measures: &[(u32, &Measure)],
        previous: &mut BTreeMap<u32, MeasureAttributes>,
    ) {
        let (lead_staff, lead) = match measures.first() {
            Some((staff, measure)) => (*staff, *measure.attributes()),
            None => return,
        };
        let before = previous.get(&lead_staff).copied().unwrap_or_default();

        let key = lead
            .key_signature
            .filter(|_| lead.key_signature != before.key_signature);
        let time = lead
            .time_signature
            .filter(|_| lead.time_signature != before.time_signature);
        let clefs: Vec<(u32, Clef)> = measures
            .iter()
            .filter_map(|(staff, measure)| {
                let clef = measure.attributes().clef?;
                let old = previous.get(staff).and_then(|a| a.clef);
                (old != Some(clef)).then_some((*staff, clef))
            })
            .collect();

        for (staff, measure) in measures {
            previous.insert(*staff, *measure.attributes());
        }

        let staves = first && self.multi_staff;
        if !first && key.is_none() && time.is_none() && clefs.is_empty() {
            return;
        }

        out.start(tags::ATTRIBUTES, &[]);
        if first {
            out.text(tags::DIVISIONS, self.divisions);
        }
        if let Some(key) = key {
            out.start(tags::KEY, &[]);
            out.text(tags::FIFTHS, key.fifths);
            out.end(tags::KEY);
        }
        if let Some(time) = time {
            out.start(tags::TIME, &[]);
            out.text(tags::BEATS, time.beats);
            out.text(tags::BEAT_TYPE, time.beat_type);
            out.end(tags::TIME);
        }
        if staves {
            out.text(tags::STAVES, self.part.staves().len());
        }
        for (staff, clef) in clefs {
            let number = staff.to_string();
            if self.multi_staff {
                out.start(tags::CLEF, &[(tags::ATTR_NUMBER, &number)]);
            } else {
                out.start(tags::CLEF, &[]);
            }
            out.text(tags::SIGN, tags::clef_sign_tag(clef.sign));
            out.text(tags::LINE, clef.line);
            out.end(tags::CLEF);
        }
        out.end(tags::ATTRIBUTES);
    }

    /// Write one durational and return how many ticks it advances
    fn write_durational(
        &mut self,
        out: &mut XmlEmitter,
        durational: &Durational,
        at: Placement,
    ) -> Result<u32> {
        match durational {
            Durational::Note(note) => {
                self.write_ornamentals(out, note.preceding_grace_notes(), at)?;
                self.write_note(out, &NoteView::note(note), false, at)?;
                self.write_ornamentals(out, note.succeeding_grace_notes(), at)?;
                self.ticks(&note.duration())
            }
            Durational::Rest(rest) => {
                out.start(tags::NOTE, &[]);
                out.empty(tags::REST, &[]);
                out.text(tags::DURATION, self.ticks(&rest.duration())?);
                out.text(tags::VOICE, at.voice);
                self.write_type(out, &rest.duration());
                if self.multi_staff {
                    out.text(tags::STAFF, at.staff);
                }
                out.end(tags::NOTE);
                self.ticks(&rest.duration())
            }
            Durational::Chord(chord) => {
                for note in chord.notes() {
                    self.write_ornamentals(out, note.preceding_grace_notes(), at)?;
                }
                for (index, note) in chord.notes().iter().enumerate() {
                    self.write_note(out, &NoteView::note(note), index > 0, at)?;
                }
                for note in chord.notes() {
                    self.write_ornamentals(out, note.succeeding_grace_notes(), at)?;
                }
                let duration = chord
                    .duration()
                    .ok_or_else(|| NotationError::InvalidInput("empty chord".to_string()))?;
                self.ticks(&duration)
            }
        }
    }

    fn write_ornamentals(
        &mut self,
        out: &mut XmlEmitter,
        ornamentals: &[Ornamental],
        at: Placement,
    ) -> Result<()> {
        for ornamental in ornamentals {
            for (index, grace) in ornamental.notes().iter().enumerate() {
                self.write_note(out, &NoteView::grace(grace), index > 0, at)?;
            }
        }
        Ok(())
    }

    fn write_note(
        &mut self,
        out: &mut XmlEmitter,
        note: &NoteView<'_>,
        in_chord: bool,
        at: Placement,
    ) -> Result<()> {
        out.start(tags::NOTE, &[]);
        match note.grace {
            Some(GraceNoteKind::Acciaccatura) => out.empty(tags::GRACE, &[(tags::ATTR_SLASH, "yes")]),
            Some(_) => out.empty(tags::GRACE, &[]),
            None => {}
        }
        if in_chord {
            out.empty(tags::CHORD, &[]);
        }
        write_pitch(out, note.pitch, note.unpitched);
        if note.grace.is_none() {
            out.text(tags::DURATION, self.ticks(&note.duration)?);
        }

        // Sound ties, the drawn ones go under <notations>
        for tie in note
            .connections
            .iter()
            .filter(|c| c.notation().kind() == NotationKind::Tie)
        {
            if tie.role() != ConnectionRole::Begin {
                out.empty(tags::TIE, &[(tags::ATTR_TYPE, "stop")]);
            }
            if tie.role() != ConnectionRole::End {
                out.empty(tags::TIE, &[(tags::ATTR_TYPE, "start")]);
            }
        }

        out.text(tags::VOICE, at.voice);
        self.write_type(out, &note.duration);
        if self.multi_staff {
            out.text(tags::STAFF, at.staff);
        }
        self.write_notations(out, note);
        out.end(tags::NOTE);
        Ok(())
    }

    fn write_type(&self, out: &mut XmlEmitter, duration: &RationalDuration) {
        let symbol = match encode(duration) {
            Some(symbol) => symbol,
            None => {
                debug!("{} has no note type, written with ticks only", duration);
                return;
            }
        };
        out.text(tags::TYPE, symbol.base_type.xml_name());
        for _ in 0..symbol.dot_count {
            out.empty(tags::DOT, &[]);
        }
        if let Some(tuplet) = symbol.tuplet {
            out.start(tags::TIME_MODIFICATION, &[]);
            out.text(tags::ACTUAL_NOTES, tuplet.actual_notes);
            out.text(tags::NORMAL_NOTES, tuplet.normal_notes);
            out.end(tags::TIME_MODIFICATION);
        }
    }

    fn write_notations(&mut self, out: &mut XmlEmitter, note: &NoteView<'_>) {
        let articulations = note.articulations;
        if articulations.is_empty()
            && note.ornaments.is_empty()
            && !note.connections.iter().any(is_written)
        {
            return;
        }

        out.start(tags::NOTATIONS, &[]);
        for connection in note.connections {
            self.write_connection(out, connection);
        }

        let marks: Vec<&Articulation> = articulations
            .iter()
            .filter(|a| **a != Articulation::Fermata)
            .collect();
        if !marks.is_empty() {
            out.start(tags::ARTICULATIONS, &[]);
            for articulation in marks {
                out.empty(tags::articulation_tag(*articulation), &[]);
            }
            out.end(tags::ARTICULATIONS);
        }
        if !note.ornaments.is_empty() {
            out.start(tags::ORNAMENTS, &[]);
            for ornament in note.ornaments {
                match ornament {
                    Ornament::Tremolo(strokes) => out.text_with(
                        tags::TREMOLO,
                        &[(tags::ATTR_TYPE, "single")],
                        strokes,
                    ),
                    other => out.empty(tags::ornament_tag(*other), &[]),
                }
            }
            out.end(tags::ORNAMENTS);
        }
        if articulations.contains(&Articulation::Fermata) {
            out.empty(tags::FERMATA, &[]);
        }
        out.end(tags::NOTATIONS);
    }

    fn write_connection(&mut self, out: &mut XmlEmitter, connection: &Connection) {
        let notation = connection.notation();
        let kind = notation.kind();
        let element = tags::notation_element(kind);

        match (kind, connection.role()) {
            (NotationKind::NonArpeggiate, ConnectionRole::Begin) => {
                match self.numbers.start(notation) {
                    Some(number) => out.empty(
                        element,
                        &[
                            (tags::ATTR_TYPE, "bottom"),
                            (tags::ATTR_NUMBER, &number.to_string()),
                        ],
                    ),
                    None => out.empty(element, &[(tags::ATTR_TYPE, "bottom")]),
                }
            }
            (NotationKind::NonArpeggiate, ConnectionRole::End) => {
                match self.numbers.stop(notation) {
                    Some(number) => out.empty(
                        element,
                        &[(tags::ATTR_TYPE, "top"), (tags::ATTR_NUMBER, &number.to_string())],
                    ),
                    None => out.empty(element, &[(tags::ATTR_TYPE, "top")]),
                }
            }
            (NotationKind::NonArpeggiate, ConnectionRole::Middle) => {}
            (kind, _) if kind.is_arpeggiation() => match tags::arpeggio_direction(kind) {
                Some(direction) => out.empty(element, &[(tags::ATTR_DIRECTION, direction)]),
                None => out.empty(element, &[]),
            },
            (_, ConnectionRole::Begin) => {
                if let Some(number) = self.numbers.start(notation) {
                    out.empty(
                        element,
                        &[
                            (tags::ATTR_TYPE, "start"),
                            (tags::ATTR_NUMBER, &number.to_string()),
                            (tags::ATTR_LINE_TYPE, tags::line_type(notation.style())),
                        ],
                    );
                }
            }
            (_, ConnectionRole::End) => match self.numbers.stop(notation) {
                Some(number) => out.empty(
                    element,
                    &[
                        (tags::ATTR_TYPE, "stop"),
                        (tags::ATTR_NUMBER, &number.to_string()),
                    ],
                ),
                None => debug!("{} stops before it was started, not written", notation),
            },
            (_, ConnectionRole::Middle) => {}
        }
    }

    fn ticks(&self, duration: &RationalDuration) -> Result<u32> {
        to_ticks(duration, self.divisions)
    }
}

/// Whether a connection produces a marker on its note
fn is_written(connection: &Connection) -> bool {
    match connection.notation().kind() {
        NotationKind::Arpeggiate | NotationKind::ArpeggiateUp | NotationKind::ArpeggiateDown => {
            true
        }
        _ => connection.role() != ConnectionRole::Middle,
    }
}

fn write_barline(out: &mut XmlEmitter, location: &str, barline: Barline) {
    out.start(tags::BARLINE, &[(tags::ATTR_LOCATION, location)]);
    out.text(tags::BAR_STYLE, tags::bar_style_tag(barline));
    if let Some(direction) = tags::repeat_direction(barline) {
        out.empty(tags::REPEAT, &[(tags::ATTR_DIRECTION, direction)]);
    }
    out.end(tags::BARLINE);
}

fn write_pitch(out: &mut XmlEmitter, pitch: Pitch, unpitched: bool) {
    if unpitched {
        out.start(tags::UNPITCHED, &[]);
        out.text(tags::DISPLAY_STEP, pitch.step().as_str());
        out.text(tags::DISPLAY_OCTAVE, pitch.octave());
        out.end(tags::UNPITCHED);
        return;
    }
    out.start(tags::PITCH, &[]);
    out.text(tags::STEP, pitch.step().as_str());
    if pitch.alter() != 0 {
        out.text(tags::ALTER, pitch.alter());
    }
    out.text(tags::OCTAVE, pitch.octave());
    out.end(tags::PITCH);
}
