//! Streaming MusicXML reader
//!
//! Reads `score-partwise` documents element by element with `quick-xml`. Nothing is kept as a
//! tree: notes become [`NoteBuilder`]s as they are met, cross-note notations are tracked in a
//! [`NotationResolutionTable`], and the builders are turned into an immutable [`Score`] when
//! each part ends.

pub mod context;
pub mod resolution;

use std::collections::HashMap;
use std::io::BufRead;
use std::str::FromStr;

use log::{debug, info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::duration::{decode, NoteType};
use super::helpers::measure_number_digits;
use super::tags::{self, Marker};
use crate::builders::{BuilderArena, NoteBuilder, PartBuilder, RestBuilder};
use crate::config::ReaderOptions;
use crate::error::{NotationError, Result};
use crate::models::{
    Articulation, Clef, GraceNoteKind, KeySignature, Ornament, Part, Pitch, RationalDuration,
    Score, Step, TimeSignature,
};

use context::PartContext;
use resolution::NotationResolutionTable;

/// Read a `score-partwise` document
pub fn read_score<R: BufRead>(source: R, options: &ReaderOptions) -> Result<Score> {
    MusicXmlReader::new(source, options.clone()).read()
}

/// Start tag or empty tag with its attributes decoded
#[derive(Debug, Clone)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    is_empty: bool,
}

impl Element {
    fn from_start(start: &BytesStart<'_>, is_empty: bool) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            is_empty,
        })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Values of one `<note>` element
#[derive(Debug, Default)]
struct NoteElement {
    pitch: Option<Pitch>,
    invalid_pitch: bool,
    unpitched: bool,
    rest: bool,
    chord: bool,
    grace: Option<GraceNoteKind>,
    ticks: Option<u32>,
    dots: u8,
    voice: Option<u32>,
    staff: Option<u32>,
    note_type: Option<NoteType>,
    articulations: Vec<Articulation>,
    ornaments: Vec<Ornament>,
}

struct MusicXmlReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    options: ReaderOptions,
    table: NotationResolutionTable,
    arena: BuilderArena,
}

impl<R: BufRead> MusicXmlReader<R> {
    fn new(source: R, options: ReaderOptions) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            table: NotationResolutionTable::new(options.strict),
            options,
            arena: BuilderArena::new(),
        }
    }

    fn next_event(&mut self) -> Result<Event<'_>> {
        self.buf.clear();
        let reader = &mut self.reader;
        reader.read_event_into(&mut self.buf).map_err(|e| {
            NotationError::parse(format!(
                "XML error at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })
    }

    /// The next child element of `parent`, or `None` once `parent` is closed
    fn next_child(&mut self, parent: &Element) -> Result<Option<Element>> {
        if parent.is_empty {
            return Ok(None);
        }
        loop {
            match self.next_event()? {
                Event::Start(ref e) => return Ok(Some(Element::from_start(e, false)?)),
                Event::Empty(ref e) => return Ok(Some(Element::from_start(e, true)?)),
                Event::End(ref e) if e.name().as_ref() == parent.name.as_bytes() => {
                    return Ok(None)
                }
                Event::Eof => {
                    return Err(NotationError::parse(format!(
                        "document ended inside <{}>",
                        parent.name
                    )))
                }
                _ => {}
            }
        }
    }

    /// Text content of `element`, consuming it
    fn read_text(&mut self, element: &Element) -> Result<String> {
        let mut text = String::new();
        if element.is_empty {
            return Ok(text);
        }
        let mut depth = 0usize;
        loop {
            match self.next_event()? {
                Event::Text(ref t) if depth == 0 => text.push_str(&t.unescape()?),
                Event::CData(ref c) if depth == 0 => {
                    text.push_str(&String::from_utf8_lossy(c))
                }
                Event::Start(_) => depth += 1,
                Event::End(_) if depth > 0 => depth -= 1,
                Event::End(_) => return Ok(text),
                Event::Eof => {
                    return Err(NotationError::parse(format!(
                        "document ended inside <{}>",
                        element.name
                    )))
                }
                _ => {}
            }
        }
    }

    fn read_number<T: FromStr>(&mut self, element: &Element) -> Result<T> {
        let text = self.read_text(element)?;
        text.trim().parse().map_err(|_| {
            NotationError::parse(format!("<{}> is not a number: '{}'", element.name, text))
        })
    }

    /// Consume `element` and everything inside it
    fn skip(&mut self, element: &Element) -> Result<()> {
        if element.is_empty {
            return Ok(());
        }
        let mut depth = 0usize;
        loop {
            match self.next_event()? {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(()),
                Event::End(_) => depth -= 1,
                Event::Eof => {
                    return Err(NotationError::parse(format!(
                        "document ended inside <{}>",
                        element.name
                    )))
                }
                _ => {}
            }
        }
    }

    /// Log a recoverable problem, or fail with it when reading strictly
    fn tolerate(&self, error: NotationError) -> Result<()> {
        if self.options.strict {
            return Err(error);
        }
        warn!("{}", error);
        Ok(())
    }

    fn read(mut self) -> Result<Score> {
        let root = loop {
            match self.next_event()? {
                Event::Start(ref e) => break Element::from_start(e, false)?,
                Event::Empty(ref e) => break Element::from_start(e, true)?,
                Event::Eof => return Err(NotationError::parse("document has no root element")),
                _ => {}
            }
        };

        match root.name.as_str() {
            tags::SCORE_PARTWISE => {}
            tags::SCORE_TIMEWISE => {
                return Err(NotationError::UnsupportedFeature(
                    "timewise scores, convert to score-partwise first".to_string(),
                ))
            }
            other => {
                return Err(NotationError::parse(format!(
                    "expected <{}>, found <{}>",
                    tags::SCORE_PARTWISE,
                    other
                )))
            }
        }
        debug!("reading MusicXML version {}", root.attr(tags::ATTR_VERSION).unwrap_or("?"));

        let mut score = Score::default();
        let mut part_names: HashMap<String, String> = HashMap::new();

        while let Some(child) = self.next_child(&root)? {
            match child.name.as_str() {
                tags::WORK => {
                    while let Some(work) = self.next_child(&child)? {
                        if work.name == tags::WORK_TITLE {
                            score.title = Some(self.read_text(&work)?);
                        } else {
                            self.skip(&work)?;
                        }
                    }
                }
                tags::MOVEMENT_TITLE => score.movement_title = Some(self.read_text(&child)?),
                tags::IDENTIFICATION => {
                    while let Some(identification) = self.next_child(&child)? {
                        if identification.name == tags::CREATOR
                            && identification.attr(tags::ATTR_TYPE) == Some(tags::COMPOSER)
                        {
                            score.composer = Some(self.read_text(&identification)?);
                        } else {
                            self.skip(&identification)?;
                        }
                    }
                }
                tags::PART_LIST => self.read_part_list(&child, &mut part_names)?,
                tags::PART => {
                    let part = self.read_part(&child, &part_names, score.parts.len())?;
                    score.parts.push(part);
                }
                _ => self.skip(&child)?,
            }
        }

        info!("read {} parts", score.parts.len());
        Ok(score)
    }

    fn read_part_list(
        &mut self,
        element: &Element,
        part_names: &mut HashMap<String, String>,
    ) -> Result<()> {
        while let Some(child) = self.next_child(element)? {
            if child.name != tags::SCORE_PART {
                self.skip(&child)?;
                continue;
            }
            let id = child.attr(tags::ATTR_ID).map(str::to_string);
            while let Some(score_part) = self.next_child(&child)? {
                match (score_part.name.as_str(), &id) {
                    (tags::PART_NAME, Some(id)) => {
                        let name = self.read_text(&score_part)?;
                        if !name.is_empty() {
                            part_names.insert(id.clone(), name);
                        }
                    }
                    _ => self.skip(&score_part)?,
                }
            }
        }
        Ok(())
    }

    fn read_part(
        &mut self,
        element: &Element,
        part_names: &HashMap<String, String>,
        index: usize,
    ) -> Result<Part> {
        let id = element
            .attr(tags::ATTR_ID)
            .map(str::to_string)
            .unwrap_or_else(|| format!("P{}", index + 1));
        debug!("reading part {}", id);

        let mut builder = PartBuilder::new(id.clone());
        if let Some(name) = part_names.get(&id) {
            builder.set_name(name.clone());
        }
        let mut context = PartContext::new(builder);
        self.table.reset();

        while let Some(child) = self.next_child(element)? {
            if child.name == tags::MEASURE {
                self.read_measure(&child, &mut context)?;
            } else {
                self.skip(&child)?;
            }
        }

        let open = self.table.reset();
        if open > 0 {
            warn!("part {}: dropped {} notations that were never closed", id, open);
        }
        context.into_part_builder().build(&mut self.arena)
    }

    fn read_measure(&mut self, element: &Element, context: &mut PartContext) -> Result<()> {
        match element.attr(tags::ATTR_NUMBER).and_then(measure_number_digits) {
            Some(number) => context.set_measure_number(number),
            None => context.increment_measure_number(),
        }

        while let Some(child) = self.next_child(element)? {
            match child.name.as_str() {
                tags::NOTE => self.read_note(&child, context)?,
                tags::ATTRIBUTES => self.read_attributes(&child, context)?,
                tags::BARLINE => self.read_barline(&child, context)?,
                tags::BACKUP | tags::FORWARD => {
                    debug!("measure {}: <{}> ignored", context.measure_number(), child.name);
                    self.skip(&child)?;
                }
                _ => self.skip(&child)?,
            }
        }

        context.finish_measure(&mut self.table, &mut self.arena)
    }

    fn read_barline(&mut self, element: &Element, context: &mut PartContext) -> Result<()> {
        let mut style = None;
        let mut repeat = None;
        while let Some(child) = self.next_child(element)? {
            match child.name.as_str() {
                tags::BAR_STYLE => style = Some(self.read_text(&child)?),
                tags::REPEAT => {
                    repeat = child.attr(tags::ATTR_DIRECTION).map(str::to_string);
                    self.skip(&child)?;
                }
                _ => {
                    debug!("measure {}: <{}> in <barline> ignored", context.measure_number(), child.name);
                    self.skip(&child)?;
                }
            }
        }

        let barline = tags::barline_from_style(style.as_deref(), repeat.as_deref());
        match element.attr(tags::ATTR_LOCATION) {
            Some(tags::LEFT) => context.set_left_barline(barline),
            Some(tags::RIGHT) | None => context.set_right_barline(barline),
            Some(other) => debug!("barline at '{}' ignored", other),
        }
        Ok(())
    }

    fn read_attributes(&mut self, element: &Element, context: &mut PartContext) -> Result<()> {
        while let Some(child) = self.next_child(element)? {
            match child.name.as_str() {
                tags::DIVISIONS => {
                    let divisions: u32 = self.read_number(&child)?;
                    if divisions == 0 {
                        self.tolerate(NotationError::InvalidDuration(
                            "divisions must be at least 1".to_string(),
                        ))?;
                    } else {
                        context.set_divisions(divisions);
                    }
                }
                tags::KEY => {
                    let mut fifths = None;
                    while let Some(key) = self.next_child(&child)? {
                        if key.name == tags::FIFTHS {
                            fifths = Some(self.read_number::<i8>(&key)?);
                        } else {
                            self.skip(&key)?;
                        }
                    }
                    if let Some(fifths) = fifths {
                        context.update_attributes(|a| a.key_signature = Some(KeySignature { fifths }));
                    }
                }
                tags::TIME => self.read_time(&child, context)?,
                tags::STAVES => {
                    let staves: u32 = self.read_number(&child)?;
                    for staff in 1..=staves {
                        context.add_staff(staff);
                    }
                }
                tags::CLEF => self.read_clef(&child, context)?,
                _ => self.skip(&child)?,
            }
        }
        Ok(())
    }

    fn read_time(&mut self, element: &Element, context: &mut PartContext) -> Result<()> {
        let mut beats = None;
        let mut beat_type = None;
        while let Some(child) = self.next_child(element)? {
            match child.name.as_str() {
                tags::BEATS => beats = Some(self.read_text(&child)?),
                tags::BEAT_TYPE => beat_type = Some(self.read_text(&child)?),
                _ => self.skip(&child)?,
            }
        }

        let parsed = match (&beats, &beat_type) {
            (Some(beats), Some(beat_type)) => beats
                .trim()
                .parse::<u32>()
                .ok()
                .zip(beat_type.trim().parse::<u32>().ok()),
            _ => None,
        };
        match parsed {
            Some((beats, beat_type)) => context.update_attributes(|a| {
                a.time_signature = Some(TimeSignature { beats, beat_type })
            }),
            None => self.tolerate(NotationError::UnsupportedFeature(format!(
                "time signature {}/{}",
                beats.unwrap_or_default(),
                beat_type.unwrap_or_default()
            )))?,
        }
        Ok(())
    }

    fn read_clef(&mut self, element: &Element, context: &mut PartContext) -> Result<()> {
        let staff = element.attr(tags::ATTR_NUMBER).and_then(|n| n.trim().parse().ok());
        let mut sign = None;
        let mut line = None;
        while let Some(child) = self.next_child(element)? {
            match child.name.as_str() {
                tags::SIGN => sign = Some(self.read_text(&child)?),
                tags::LINE => line = Some(self.read_number::<u8>(&child)?),
                _ => self.skip(&child)?,
            }
        }

        match sign.as_deref().and_then(|s| tags::clef_sign_from_tag(s.trim())) {
            Some(sign) => {
                let line = line.unwrap_or_else(|| sign.default_line());
                context.set_clef(staff, Clef { sign, line });
            }
            None => self.tolerate(NotationError::UnsupportedFeature(format!(
                "clef sign '{}'",
                sign.unwrap_or_default()
            )))?,
        }
        Ok(())
    }

    fn read_note(&mut self, element: &Element, context: &mut PartContext) -> Result<()> {
        let mut note = NoteElement::default();

        while let Some(child) = self.next_child(element)? {
            match child.name.as_str() {
                tags::PITCH => {
                    note.pitch = self.read_pitch(&child, tags::STEP, tags::OCTAVE)?;
                    note.invalid_pitch = note.pitch.is_none();
                }
                tags::UNPITCHED => {
                    note.unpitched = true;
                    note.pitch =
                        self.read_pitch(&child, tags::DISPLAY_STEP, tags::DISPLAY_OCTAVE)?;
                    note.invalid_pitch = note.pitch.is_none();
                }
                tags::REST => {
                    note.rest = true;
                    self.skip(&child)?;
                }
                tags::CHORD => {
                    note.chord = true;
                    self.skip(&child)?;
                }
                tags::GRACE => {
                    note.grace = Some(match child.attr(tags::ATTR_SLASH) {
                        Some("yes") => GraceNoteKind::Acciaccatura,
                        _ => GraceNoteKind::Grace,
                    });
                    self.skip(&child)?;
                }
                tags::DURATION => note.ticks = Some(self.read_number(&child)?),
                tags::VOICE => note.voice = Some(self.read_number(&child)?),
                tags::STAFF => note.staff = Some(self.read_number(&child)?),
                tags::TYPE => {
                    let text = self.read_text(&child)?;
                    match text.parse::<NoteType>() {
                        Ok(note_type) => note.note_type = Some(note_type),
                        Err(e) => self.tolerate(e)?,
                    }
                }
                tags::DOT => {
                    note.dots = note.dots.saturating_add(1);
                    self.skip(&child)?;
                }
                tags::NOTATIONS => self.read_notations(&child, &mut note)?,
                _ => self.skip(&child)?,
            }
        }

        context.set_chord_tag(note.chord);
        if let Some(voice) = note.voice {
            context.set_voice(voice);
        }
        if let Some(staff) = note.staff {
            context.set_staff(staff);
        }

        if note.rest {
            if self.table.has_queued() {
                let dropped = self.table.discard_queued();
                warn!(
                    "measure {}: {} connected notations on a rest dropped",
                    context.measure_number(),
                    dropped
                );
            }
            if let Some(duration) = self.note_duration(&note, context)? {
                context.add_rest(RestBuilder::new(duration), &mut self.table, &mut self.arena)?;
            }
            return Ok(());
        }

        let pitch = match note.pitch {
            Some(pitch) => pitch,
            None if note.invalid_pitch => {
                self.table.discard_queued();
                return Ok(());
            }
            None => {
                self.table.discard_queued();
                return self.tolerate(NotationError::parse(format!(
                    "measure {}: note without pitch",
                    context.measure_number()
                )));
            }
        };

        let mut builder = match note.grace {
            Some(kind) => {
                let mut display = match note.note_type {
                    Some(note_type) => note_type.duration()?,
                    None => NoteType::Eighth.duration()?,
                };
                for _ in 0..note.dots {
                    display = display.add_dot()?;
                }
                NoteBuilder::grace(pitch, display, kind)
            }
            None => match self.note_duration(&note, context)? {
                Some(duration) => NoteBuilder::new(pitch, duration),
                None => return Ok(()),
            },
        };
        if note.unpitched {
            builder = builder.unpitched();
        }
        for articulation in note.articulations {
            builder.add_articulation(articulation);
        }
        for ornament in note.ornaments {
            builder.add_ornament(ornament);
        }

        let id = self.arena.add(builder);
        if note.grace.is_some() {
            context.add_grace_note(id, &mut self.table, &mut self.arena)?;
        } else {
            context.add_note(id, &mut self.table, &mut self.arena)?;
        }

        let scope = context.scope();
        for principal in self.table.end_notations(scope, id, &mut self.arena)? {
            context.add_succeeding_ornamentals(principal, &mut self.table, &mut self.arena)?;
        }
        self.table.start_or_continue_notations(scope, id);
        self.table.continue_ongoing_notations(scope, id);
        Ok(())
    }

    /// Exact duration of a note or rest, `None` when it is invalid and skipped
    fn note_duration(
        &mut self,
        note: &NoteElement,
        context: &PartContext,
    ) -> Result<Option<RationalDuration>> {
        let duration = decode(note.ticks.unwrap_or(0), context.divisions()).and_then(|d| {
            RationalDuration::of_dotted(d.numerator(), d.denominator(), note.dots)
        });
        match duration {
            Ok(duration) => Ok(Some(duration)),
            Err(e) => {
                self.table.discard_queued();
                self.tolerate(NotationError::InvalidDuration(format!(
                    "measure {}: {}",
                    context.measure_number(),
                    e
                )))?;
                Ok(None)
            }
        }
    }

    /// Pitch of a `<pitch>` or `<unpitched>` element, `None` when it is invalid and skipped
    fn read_pitch(
        &mut self,
        element: &Element,
        step_tag: &str,
        octave_tag: &str,
    ) -> Result<Option<Pitch>> {
        let mut step = None;
        let mut alter = 0i8;
        let mut octave = None;
        let mut problems = Vec::new();
        while let Some(child) = self.next_child(element)? {
            let name = child.name.as_str();
            if name == step_tag {
                match self.read_text(&child)?.parse::<Step>() {
                    Ok(value) => step = Some(value),
                    Err(e) => problems.push(e),
                }
            } else if name == octave_tag {
                let text = self.read_text(&child)?;
                match text.trim().parse::<u8>() {
                    Ok(value) => octave = Some(value),
                    Err(_) => problems.push(NotationError::InvalidInput(format!(
                        "octave '{}'",
                        text
                    ))),
                }
            } else if name == tags::ALTER {
                let text = self.read_text(&child)?;
                match text.trim().parse::<f64>() {
                    Ok(value) if value.fract() != 0.0 => {
                        self.tolerate(NotationError::UnsupportedFeature(format!(
                            "microtonal alter {}",
                            value
                        )))?;
                        alter = value.round().clamp(i8::MIN as f64, i8::MAX as f64) as i8;
                    }
                    Ok(value) => alter = value.clamp(i8::MIN as f64, i8::MAX as f64) as i8,
                    Err(_) => problems.push(NotationError::InvalidInput(format!(
                        "alter '{}'",
                        text
                    ))),
                }
            } else {
                self.skip(&child)?;
            }
        }

        let pitch = match (step, octave) {
            (Some(step), Some(octave)) if problems.is_empty() => Pitch::new(step, alter, octave),
            _ => Err(problems.into_iter().next().unwrap_or_else(|| {
                NotationError::parse(format!("<{}> without step or octave", element.name))
            })),
        };
        match pitch {
            Ok(pitch) => Ok(Some(pitch)),
            Err(e) => {
                self.tolerate(e)?;
                Ok(None)
            }
        }
    }

    fn read_notations(&mut self, element: &Element, note: &mut NoteElement) -> Result<()> {
        while let Some(child) = self.next_child(element)? {
            let name = child.name.as_str();
            if let Some(kind) = tags::notation_kind(name, child.attr(tags::ATTR_DIRECTION)) {
                let number = match child.attr(tags::ATTR_NUMBER) {
                    None => 0,
                    Some(value) => match value.trim().parse::<i32>() {
                        Ok(number) => number,
                        Err(_) => {
                            self.tolerate(NotationError::parse(format!(
                                "<{}> has a bad number '{}'",
                                name, value
                            )))?;
                            0
                        }
                    },
                };
                match Marker::from_type(child.attr(tags::ATTR_TYPE)) {
                    Marker::Start => {
                        let style = tags::style_from_line_type(child.attr(tags::ATTR_LINE_TYPE));
                        self.table.queue_start(number, kind, style);
                    }
                    Marker::End => self.table.queue_end(number, kind),
                }
                self.skip(&child)?;
                continue;
            }

            match name {
                tags::ARTICULATIONS => {
                    while let Some(articulation) = self.next_child(&child)? {
                        match tags::articulation_from_tag(&articulation.name) {
                            Some(a) => note.articulations.push(a),
                            None => self.tolerate(NotationError::UnsupportedFeature(format!(
                                "articulation <{}>",
                                articulation.name
                            )))?,
                        }
                        self.skip(&articulation)?;
                    }
                }
                tags::FERMATA => {
                    note.articulations.push(Articulation::Fermata);
                    self.skip(&child)?;
                }
                tags::ORNAMENTS => self.read_ornaments(&child, note)?,
                // Tuplet brackets repeat what the tick count already says
                "tuplet" => self.skip(&child)?,
                _ => {
                    self.tolerate(NotationError::UnsupportedFeature(format!(
                        "notation <{}>",
                        name
                    )))?;
                    self.skip(&child)?;
                }
            }
        }
        Ok(())
    }
}

impl<R: BufRead> MusicXmlReader<R> {
    fn read_ornaments(&mut self, element: &Element, note: &mut NoteElement) -> Result<()> {
        while let Some(child) = self.next_child(element)? {
            if child.name == tags::TREMOLO {
                let text = self.read_text(&child)?;
                let strokes = match text.trim() {
                    "" => Some(1),
                    value => value.parse::<u8>().ok().filter(|n| (1..=8).contains(n)),
                };
                match strokes {
                    Some(strokes) => note.ornaments.push(Ornament::Tremolo(strokes)),
                    None => self.tolerate(NotationError::UnsupportedFeature(format!(
                        "tremolo with '{}' strokes",
                        text
                    )))?,
                }
                continue;
            }

            match tags::ornament_from_tag(&child.name) {
                Some(ornament) => note.ornaments.push(ornament),
                None => self.tolerate(NotationError::UnsupportedFeature(format!(
                    "ornament <{}>",
                    child.name
                )))?,
            }
            self.skip(&child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Barline, ConnectionRole, NotationKind, NotationStyle};

    fn read_str(xml: &str) -> Result<Score> {
        read_score(xml.as_bytes(), &ReaderOptions::default())
    }

    fn document(measures: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="4.0">
  <part-list>
    <score-part id="P1"><part-name>Violin</part-name></score-part>
  </part-list>
  <part id="P1">
{}
  </part>
</score-partwise>"#,
            measures
        )
    }

    const ATTRIBUTES: &str = r#"<attributes>
        <divisions>2</divisions>
        <key><fifths>-1</fifths></key>
        <time><beats>4</beats><beat-type>4</beat-type></time>
        <clef><sign>G</sign><line>2</line></clef>
      </attributes>"#;

    #[test]
    fn test_read_metadata_and_attributes() {
        let xml = r#"<?xml version="1.0"?>
<score-partwise version="3.1">
  <work><work-title>Sonata &amp; Fugue</work-title></work>
  <movement-title>Allegro</movement-title>
  <identification><creator type="composer">A. Composer</creator></identification>
  <part-list><score-part id="P1"><part-name>Piano</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions><key><fifths>2</fifths></key>
      <time><beats>3</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>3</duration><type>half</type><dot/></note>
    </measure>
  </part>
</score-partwise>"#;

        let score = read_str(xml).unwrap();
        assert_eq!(score.title.as_deref(), Some("Sonata & Fugue"));
        assert_eq!(score.movement_title.as_deref(), Some("Allegro"));
        assert_eq!(score.composer.as_deref(), Some("A. Composer"));

        let part = &score.parts()[0];
        assert_eq!(part.name(), Some("Piano"));
        let measure = &part.staff(1)[0];
        assert_eq!(measure.attributes().key_signature, Some(KeySignature { fifths: 2 }));
        assert_eq!(
            measure.attributes().time_signature,
            Some(TimeSignature { beats: 3, beat_type: 4 })
        );
        let note = measure.voice(1)[0].as_note().unwrap();
        assert_eq!(note.duration(), RationalDuration::of(3, 4).unwrap());
        assert_eq!(note.duration().dot_count(), 1);
    }

    #[test]
    fn test_read_tie_across_barline() {
        let xml = document(&format!(
            r#"<measure number="1">{}
      <note><pitch><step>G</step><octave>4</octave></pitch><duration>8</duration><tie type="start"/>
        <notations><tied type="start"/></notations></note>
    </measure>
    <measure number="2">
      <note><pitch><step>G</step><octave>4</octave></pitch><duration>8</duration><tie type="stop"/>
        <notations><tied type="stop"/></notations></note>
    </measure>"#,
            ATTRIBUTES
        ));

        let score = read_str(&xml).unwrap();
        let part = &score.parts()[0];
        let first = part.staff(1)[0].voice(1)[0].as_note().unwrap();
        let second = part.staff(1)[1].voice(1)[0].as_note().unwrap();

        let tie = &first.connections()[0];
        assert_eq!(tie.notation().kind(), NotationKind::Tie);
        assert_eq!(tie.role(), ConnectionRole::Begin);
        assert!(std::sync::Arc::ptr_eq(tie.next().unwrap().as_note().unwrap(), second));
        assert_eq!(second.connections()[0].role(), ConnectionRole::End);
    }

    #[test]
    fn test_read_dashed_slur_over_three_notes() {
        let xml = document(&format!(
            r#"<measure number="1">{}
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>2</duration>
        <notations><slur type="start" number="1" line-type="dashed"/></notations></note>
      <note><pitch><step>D</step><octave>5</octave></pitch><duration>2</duration></note>
      <note><pitch><step>E</step><octave>5</octave></pitch><duration>2</duration>
        <notations><slur type="stop" number="1"/></notations></note>
      <note><rest/><duration>2</duration></note>
    </measure>"#,
            ATTRIBUTES
        ));

        let score = read_str(&xml).unwrap();
        let voice = score.parts()[0].staff(1)[0].voice(1);
        assert_eq!(voice.len(), 4);
        let roles: Vec<ConnectionRole> = voice[..3]
            .iter()
            .map(|d| d.as_note().unwrap().connections()[0].role())
            .collect();
        assert_eq!(
            roles,
            vec![ConnectionRole::Begin, ConnectionRole::Middle, ConnectionRole::End]
        );
        let slur = voice[0].as_note().unwrap().connections()[0].notation();
        assert_eq!(slur.style(), NotationStyle::Dashed);
        assert!(voice[3].is_rest());
    }

    #[test]
    fn test_read_arpeggiated_chord() {
        let xml = document(&format!(
            r#"<measure number="1">{}
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration>
        <notations><arpeggiate direction="up"/></notations></note>
      <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration>
        <notations><arpeggiate direction="up"/></notations></note>
      <note><chord/><pitch><step>G</step><octave>4</octave></pitch><duration>4</duration>
        <notations><arpeggiate direction="up"/></notations></note>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>4</duration></note>
    </measure>"#,
            ATTRIBUTES
        ));

        let score = read_str(&xml).unwrap();
        let voice = score.parts()[0].staff(1)[0].voice(1);
        let chord = voice[0].as_chord().unwrap();
        let arpeggio = &chord.notes()[0].connections()[0];
        assert_eq!(arpeggio.notation().kind(), NotationKind::ArpeggiateUp);
        assert_eq!(arpeggio.following().len(), 2);
        assert!(voice[1].as_note().unwrap().connections().is_empty());
    }

    #[test]
    fn test_read_grace_notes() {
        let xml = document(&format!(
            r#"<measure number="1">{}
      <note><grace slash="yes"/><pitch><step>D</step><octave>4</octave></pitch><type>16th</type></note>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>8</duration></note>
      <note><grace/><pitch><step>B</step><octave>3</octave></pitch></note>
    </measure>"#,
            ATTRIBUTES
        ));

        let score = read_str(&xml).unwrap();
        let note = score.parts()[0].staff(1)[0].voice(1)[0].as_note().unwrap().clone();
        let preceding = &note.preceding_grace_notes()[0].notes()[0];
        assert_eq!(preceding.kind(), GraceNoteKind::Acciaccatura);
        assert_eq!(preceding.display_duration(), RationalDuration::of(1, 16).unwrap());
        let succeeding = &note.succeeding_grace_notes()[0].notes()[0];
        assert_eq!(succeeding.display_duration(), RationalDuration::of(1, 8).unwrap());
    }

    #[test]
    fn test_read_unpitched_and_articulations() {
        let xml = document(&format!(
            r#"<measure number="1">{}
      <note><unpitched><display-step>E</display-step><display-octave>4</display-octave></unpitched>
        <duration>2</duration>
        <notations><articulations><staccato/><accent/><doit/></articulations><fermata/></notations></note>
    </measure>"#,
            ATTRIBUTES
        ));

        let score = read_str(&xml).unwrap();
        let note = score.parts()[0].staff(1)[0].voice(1)[0].as_note().unwrap().clone();
        assert!(note.is_unpitched());
        assert_eq!(
            note.articulations(),
            &[Articulation::Staccato, Articulation::Accent, Articulation::Fermata]
        );

        let strict = read_score(xml.as_bytes(), &ReaderOptions::strict());
        assert!(matches!(strict, Err(NotationError::UnsupportedFeature(_))));
    }

    #[test]
    fn test_read_multi_staff_part() {
        let xml = document(
            r#"<measure number="1">
      <attributes><divisions>1</divisions><staves>2</staves>
        <clef number="1"><sign>G</sign><line>2</line></clef>
        <clef number="2"><sign>F</sign><line>4</line></clef></attributes>
      <note><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration><voice>1</voice><staff>1</staff></note>
      <backup><duration>4</duration></backup>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>4</duration><voice>2</voice><staff>2</staff></note>
    </measure>"#,
        );

        let score = read_str(&xml).unwrap();
        let part = &score.parts()[0];
        assert!(part.is_multi_staff());
        assert_eq!(part.staff(2)[0].attributes().clef, Some(Clef::bass()));
        assert_eq!(part.staff(2)[0].voice(2).len(), 1);
        assert_eq!(part.staff(1)[0].voice(1).len(), 1);
    }

    #[test]
    fn test_measure_number_without_digits_increments() {
        let xml = document(&format!(
            r#"<measure number="1">{}<note><rest/><duration>8</duration></note></measure>
    <measure number="X"><note><rest/><duration>8</duration></note></measure>
    <measure number="7a"><note><rest/><duration>8</duration></note></measure>"#,
            ATTRIBUTES
        ));
        let score = read_str(&xml).unwrap();
        let numbers: Vec<u32> = score.parts()[0].staff(1).iter().map(|m| m.number()).collect();
        assert_eq!(numbers, vec![1, 2, 7]);
    }

    #[test]
    fn test_invalid_duration_is_skipped_unless_strict() {
        let xml = document(&format!(
            r#"<measure number="1">{}
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>0</duration></note>
      <note><pitch><step>D</step><octave>4</octave></pitch><duration>2</duration></note>
    </measure>"#,
            ATTRIBUTES
        ));
        let score = read_str(&xml).unwrap();
        assert_eq!(score.parts()[0].staff(1)[0].voice(1).len(), 1);

        let strict = read_score(xml.as_bytes(), &ReaderOptions::strict());
        assert!(matches!(strict, Err(NotationError::InvalidDuration(_))));
    }

    #[test]
    fn test_unclosed_slur_does_not_leak_into_next_part() {
        let xml = r#"<score-partwise>
  <part id="P1"><measure number="1"><attributes><divisions>1</divisions></attributes>
    <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration>
      <notations><slur type="start"/></notations></note></measure></part>
  <part id="P2"><measure number="1"><attributes><divisions>1</divisions></attributes>
    <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration>
      <notations><slur type="stop"/></notations></note></measure></part>
</score-partwise>"#;
        let score = read_str(xml).unwrap();
        assert_eq!(score.parts().len(), 2);
        for part in score.parts() {
            let note = part.staff(1)[0].voice(1)[0].as_note().unwrap();
            assert!(note.connections().is_empty());
        }
    }

    #[test]
    fn test_timewise_is_rejected() {
        let result = read_str("<score-timewise version=\"4.0\"></score-timewise>");
        assert!(matches!(result, Err(NotationError::UnsupportedFeature(_))));
    }

    #[test]
    fn test_bad_pitch_is_skipped_unless_strict() {
        let xml = document(&format!(
            r#"<measure number="1">{}
      <note><pitch><step>C</step><alter>3</alter><octave>4</octave></pitch><duration>2</duration>
        <notations><slur type="start"/></notations></note>
      <note><pitch><step>H</step><octave>4</octave></pitch><duration>2</duration></note>
      <note><pitch><step>E</step><octave>12</octave></pitch><duration>2</duration></note>
      <note><pitch><step>F</step><octave>4</octave></pitch><duration>2</duration>
        <notations><slur type="stop"/></notations></note>
    </measure>"#,
            ATTRIBUTES
        ));
        let score = read_str(&xml).unwrap();
        let voice = score.parts()[0].staff(1)[0].voice(1);
        assert_eq!(voice.len(), 1);
        let f4 = voice[0].as_note().unwrap();
        assert_eq!(f4.pitch().step(), Step::F);
        assert!(f4.connections().is_empty());

        let strict = read_score(xml.as_bytes(), &ReaderOptions::strict());
        assert!(matches!(strict, Err(NotationError::InvalidInput(_))));
    }

    #[test]
    fn test_read_ornaments() {
        let xml = document(&format!(
            r#"<measure number="1">{}
      <note><pitch><step>A</step><octave>4</octave></pitch><duration>4</duration>
        <notations><ornaments><trill-mark/><wavy-line type="start"/></ornaments></notations></note>
      <note><pitch><step>B</step><octave>4</octave></pitch><duration>2</duration>
        <notations><ornaments><inverted-mordent/><tremolo type="single">3</tremolo></ornaments></notations></note>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>2</duration>
        <notations><ornaments><delayed-turn/></ornaments><articulations><accent/></articulations></notations></note>
    </measure>"#,
            ATTRIBUTES
        ));
        let score = read_str(&xml).unwrap();
        let voice = score.parts()[0].staff(1)[0].voice(1);
        assert_eq!(voice[0].as_note().unwrap().ornaments(), &[Ornament::Trill]);
        assert_eq!(
            voice[1].as_note().unwrap().ornaments(),
            &[Ornament::InvertedMordent, Ornament::Tremolo(3)]
        );
        let c5 = voice[2].as_note().unwrap();
        assert_eq!(c5.ornaments(), &[Ornament::DelayedTurn]);
        assert_eq!(c5.articulations(), &[Articulation::Accent]);

        // wavy-line has no model counterpart
        let strict = read_score(xml.as_bytes(), &ReaderOptions::strict());
        assert!(matches!(strict, Err(NotationError::UnsupportedFeature(_))));
    }

    #[test]
    fn test_read_barlines_on_every_staff() {
        let xml = document(
            r#"<measure number="1">
      <attributes><divisions>1</divisions><staves>2</staves></attributes>
      <barline location="left"><bar-style>heavy-light</bar-style><repeat direction="forward"/></barline>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>4</duration><staff>1</staff></note>
      <backup><duration>4</duration></backup>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>4</duration><staff>2</staff></note>
      <barline location="right"><bar-style>light-heavy</bar-style><repeat direction="backward"/></barline>
    </measure>
    <measure number="2">
      <note><pitch><step>D</step><octave>5</octave></pitch><duration>4</duration><staff>1</staff></note>
      <barline><bar-style>light-heavy</bar-style><ending number="1" type="stop"/></barline>
    </measure>
    <measure number="3">
      <note><pitch><step>E</step><octave>5</octave></pitch><duration>4</duration><staff>1</staff></note>
    </measure>"#,
        );
        let score = read_str(&xml).unwrap();
        let part = &score.parts()[0];
        for staff in [1, 2] {
            let measures = part.staff(staff);
            assert_eq!(measures[0].left_barline(), Barline::RepeatLeft);
            assert_eq!(measures[0].right_barline(), Barline::RepeatRight);
            assert_eq!(measures[1].left_barline(), Barline::None);
            assert_eq!(measures[1].right_barline(), Barline::Final);
            assert_eq!(measures[2].right_barline(), Barline::Single);
        }
    }

    #[test]
    fn test_truncated_document() {
        let result = read_str("<score-partwise><part id=\"P1\"><measure number=\"1\">");
        assert!(matches!(result, Err(NotationError::Parse { .. })));
    }
}
