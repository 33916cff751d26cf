//! MusicXML element names and the mappings between wire strings and model values

use crate::models::{Articulation, Barline, ClefSign, NotationKind, NotationStyle, Ornament};

// Document
pub const SCORE_PARTWISE: &str = "score-partwise";
pub const SCORE_TIMEWISE: &str = "score-timewise";
pub const WORK: &str = "work";
pub const WORK_TITLE: &str = "work-title";
pub const MOVEMENT_TITLE: &str = "movement-title";
pub const IDENTIFICATION: &str = "identification";
pub const CREATOR: &str = "creator";
pub const COMPOSER: &str = "composer";
pub const PART_LIST: &str = "part-list";
pub const SCORE_PART: &str = "score-part";
pub const PART_NAME: &str = "part-name";
pub const PART: &str = "part";

// Measure
pub const MEASURE: &str = "measure";
pub const ATTRIBUTES: &str = "attributes";
pub const DIVISIONS: &str = "divisions";
pub const KEY: &str = "key";
pub const FIFTHS: &str = "fifths";
pub const TIME: &str = "time";
pub const BEATS: &str = "beats";
pub const BEAT_TYPE: &str = "beat-type";
pub const STAVES: &str = "staves";
pub const CLEF: &str = "clef";
pub const SIGN: &str = "sign";
pub const LINE: &str = "line";
pub const BARLINE: &str = "barline";
pub const BAR_STYLE: &str = "bar-style";
pub const REPEAT: &str = "repeat";
pub const BACKUP: &str = "backup";
pub const FORWARD: &str = "forward";

// Note
pub const NOTE: &str = "note";
pub const PITCH: &str = "pitch";
pub const STEP: &str = "step";
pub const ALTER: &str = "alter";
pub const OCTAVE: &str = "octave";
pub const UNPITCHED: &str = "unpitched";
pub const DISPLAY_STEP: &str = "display-step";
pub const DISPLAY_OCTAVE: &str = "display-octave";
pub const REST: &str = "rest";
pub const CHORD: &str = "chord";
pub const GRACE: &str = "grace";
pub const DURATION: &str = "duration";
pub const TIE: &str = "tie";
pub const VOICE: &str = "voice";
pub const TYPE: &str = "type";
pub const DOT: &str = "dot";
pub const TIME_MODIFICATION: &str = "time-modification";
pub const ACTUAL_NOTES: &str = "actual-notes";
pub const NORMAL_NOTES: &str = "normal-notes";
pub const STAFF: &str = "staff";

// Notations
pub const NOTATIONS: &str = "notations";
pub const TIED: &str = "tied";
pub const SLUR: &str = "slur";
pub const GLISSANDO: &str = "glissando";
pub const SLIDE: &str = "slide";
pub const ARPEGGIATE: &str = "arpeggiate";
pub const NON_ARPEGGIATE: &str = "non-arpeggiate";
pub const ARTICULATIONS: &str = "articulations";
pub const FERMATA: &str = "fermata";
pub const ORNAMENTS: &str = "ornaments";
pub const TREMOLO: &str = "tremolo";

// Attributes
pub const ATTR_VERSION: &str = "version";
pub const ATTR_ID: &str = "id";
pub const ATTR_NUMBER: &str = "number";
pub const ATTR_TYPE: &str = "type";
pub const ATTR_LINE_TYPE: &str = "line-type";
pub const ATTR_DIRECTION: &str = "direction";
pub const ATTR_SLASH: &str = "slash";
pub const ATTR_LOCATION: &str = "location";

pub const LEFT: &str = "left";
pub const RIGHT: &str = "right";
pub const FORWARD_REPEAT: &str = "forward";
pub const BACKWARD_REPEAT: &str = "backward";

/// Whether a notation element opens (or continues) a notation or closes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    End,
}

impl Marker {
    /// `start`, `continue` and `bottom` open, `stop` and `top` close. Missing means open.
    pub fn from_type(value: Option<&str>) -> Marker {
        match value {
            Some("stop") | Some("top") => Marker::End,
            _ => Marker::Start,
        }
    }
}

/// The notation kind an element under `<notations>` stands for
pub fn notation_kind(element: &str, direction: Option<&str>) -> Option<NotationKind> {
    match element {
        TIED => Some(NotationKind::Tie),
        SLUR => Some(NotationKind::Slur),
        GLISSANDO | SLIDE => Some(NotationKind::Glissando),
        ARPEGGIATE => Some(match direction {
            Some("up") => NotationKind::ArpeggiateUp,
            Some("down") => NotationKind::ArpeggiateDown,
            _ => NotationKind::Arpeggiate,
        }),
        NON_ARPEGGIATE => Some(NotationKind::NonArpeggiate),
        _ => None,
    }
}

/// Element name for writing a notation kind
pub fn notation_element(kind: NotationKind) -> &'static str {
    match kind {
        NotationKind::Tie => TIED,
        NotationKind::Slur => SLUR,
        NotationKind::Glissando => GLISSANDO,
        NotationKind::Arpeggiate | NotationKind::ArpeggiateUp | NotationKind::ArpeggiateDown => {
            ARPEGGIATE
        }
        NotationKind::NonArpeggiate => NON_ARPEGGIATE,
    }
}

pub fn arpeggio_direction(kind: NotationKind) -> Option<&'static str> {
    match kind {
        NotationKind::ArpeggiateUp => Some("up"),
        NotationKind::ArpeggiateDown => Some("down"),
        _ => None,
    }
}

pub fn style_from_line_type(value: Option<&str>) -> NotationStyle {
    match value {
        Some("dashed") => NotationStyle::Dashed,
        Some("dotted") => NotationStyle::Dotted,
        Some("wavy") => NotationStyle::Wavy,
        _ => NotationStyle::Solid,
    }
}

pub fn line_type(style: NotationStyle) -> &'static str {
    match style {
        NotationStyle::Solid => "solid",
        NotationStyle::Dashed => "dashed",
        NotationStyle::Dotted => "dotted",
        NotationStyle::Wavy => "wavy",
    }
}

pub fn articulation_from_tag(tag: &str) -> Option<Articulation> {
    match tag {
        "accent" => Some(Articulation::Accent),
        "strong-accent" => Some(Articulation::StrongAccent),
        "staccato" => Some(Articulation::Staccato),
        "staccatissimo" => Some(Articulation::Staccatissimo),
        "tenuto" => Some(Articulation::Tenuto),
        "detached-legato" => Some(Articulation::DetachedLegato),
        "spiccato" => Some(Articulation::Spiccato),
        "stress" => Some(Articulation::Stress),
        "unstress" => Some(Articulation::Unstress),
        FERMATA => Some(Articulation::Fermata),
        _ => None,
    }
}

/// Get the MusicXML element name for this articulation
pub fn articulation_tag(articulation: Articulation) -> &'static str {
    match articulation {
        Articulation::Accent => "accent",
        Articulation::StrongAccent => "strong-accent",
        Articulation::Staccato => "staccato",
        Articulation::Staccatissimo => "staccatissimo",
        Articulation::Tenuto => "tenuto",
        Articulation::DetachedLegato => "detached-legato",
        Articulation::Spiccato => "spiccato",
        Articulation::Stress => "stress",
        Articulation::Unstress => "unstress",
        Articulation::Fermata => FERMATA,
    }
}

/// Ornaments other than tremolo, whose stroke count is its text
pub fn ornament_from_tag(tag: &str) -> Option<Ornament> {
    match tag {
        "trill-mark" => Some(Ornament::Trill),
        "mordent" => Some(Ornament::Mordent),
        "inverted-mordent" => Some(Ornament::InvertedMordent),
        "turn" => Some(Ornament::Turn),
        "inverted-turn" => Some(Ornament::InvertedTurn),
        "delayed-turn" => Some(Ornament::DelayedTurn),
        "delayed-inverted-turn" => Some(Ornament::DelayedInvertedTurn),
        _ => None,
    }
}

pub fn ornament_tag(ornament: Ornament) -> &'static str {
    match ornament {
        Ornament::Trill => "trill-mark",
        Ornament::Mordent => "mordent",
        Ornament::InvertedMordent => "inverted-mordent",
        Ornament::Turn => "turn",
        Ornament::InvertedTurn => "inverted-turn",
        Ornament::DelayedTurn => "delayed-turn",
        Ornament::DelayedInvertedTurn => "delayed-inverted-turn",
        Ornament::Tremolo(_) => TREMOLO,
    }
}

/// Bar line from `<bar-style>` and the direction of `<repeat>`, both possibly absent
pub fn barline_from_style(style: Option<&str>, repeat: Option<&str>) -> Barline {
    match (style.unwrap_or_default(), repeat) {
        ("dashed", _) => Barline::Dashed,
        ("heavy", _) => Barline::Thick,
        ("heavy-light", _) => Barline::RepeatLeft,
        ("none", _) => Barline::Invisible,
        ("light-heavy", Some(BACKWARD_REPEAT)) => Barline::RepeatRight,
        ("light-heavy", _) => Barline::Final,
        ("light-light", _) => Barline::Double,
        ("", Some(FORWARD_REPEAT)) => Barline::RepeatLeft,
        ("", Some(BACKWARD_REPEAT)) => Barline::RepeatRight,
        _ => Barline::Single,
    }
}

pub fn bar_style_tag(barline: Barline) -> &'static str {
    match barline {
        Barline::Single => "regular",
        Barline::Double => "light-light",
        Barline::RepeatLeft => "heavy-light",
        Barline::RepeatRight | Barline::Final => "light-heavy",
        Barline::Dashed => "dashed",
        Barline::Thick => "heavy",
        Barline::Invisible | Barline::None => "none",
    }
}

pub fn repeat_direction(barline: Barline) -> Option<&'static str> {
    match barline {
        Barline::RepeatLeft => Some(FORWARD_REPEAT),
        Barline::RepeatRight => Some(BACKWARD_REPEAT),
        _ => None,
    }
}

pub fn clef_sign_from_tag(tag: &str) -> Option<ClefSign> {
    match tag {
        "G" => Some(ClefSign::G),
        "F" => Some(ClefSign::F),
        "C" => Some(ClefSign::C),
        "percussion" => Some(ClefSign::Percussion),
        "TAB" => Some(ClefSign::Tab),
        _ => None,
    }
}

pub fn clef_sign_tag(sign: ClefSign) -> &'static str {
    match sign {
        ClefSign::G => "G",
        ClefSign::F => "F",
        ClefSign::C => "C",
        ClefSign::Percussion => "percussion",
        ClefSign::Tab => "TAB",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        assert_eq!(Marker::from_type(Some("start")), Marker::Start);
        assert_eq!(Marker::from_type(Some("continue")), Marker::Start);
        assert_eq!(Marker::from_type(Some("bottom")), Marker::Start);
        assert_eq!(Marker::from_type(None), Marker::Start);
        assert_eq!(Marker::from_type(Some("stop")), Marker::End);
        assert_eq!(Marker::from_type(Some("top")), Marker::End);
    }

    #[test]
    fn test_notation_kinds() {
        assert_eq!(notation_kind("slide", None), Some(NotationKind::Glissando));
        assert_eq!(notation_kind("arpeggiate", Some("up")), Some(NotationKind::ArpeggiateUp));
        assert_eq!(notation_kind("arpeggiate", None), Some(NotationKind::Arpeggiate));
        assert_eq!(notation_kind("wavy-line", None), None);
        assert_eq!(notation_element(NotationKind::ArpeggiateDown), "arpeggiate");
    }

    #[test]
    fn test_articulation_tags() {
        for tag in ["accent", "staccato", "detached-legato", "fermata"] {
            let articulation = articulation_from_tag(tag).unwrap();
            assert_eq!(articulation_tag(articulation), tag);
        }
        assert!(articulation_from_tag("doit").is_none());
    }

    #[test]
    fn test_ornament_tags() {
        for tag in ["trill-mark", "mordent", "inverted-turn", "delayed-inverted-turn"] {
            let ornament = ornament_from_tag(tag).unwrap();
            assert_eq!(ornament_tag(ornament), tag);
        }
        assert_eq!(ornament_tag(Ornament::Tremolo(2)), "tremolo");
        assert!(ornament_from_tag("schleifer").is_none());
    }

    #[test]
    fn test_barline_styles() {
        assert_eq!(barline_from_style(Some("light-heavy"), None), Barline::Final);
        assert_eq!(
            barline_from_style(Some("light-heavy"), Some("backward")),
            Barline::RepeatRight
        );
        assert_eq!(barline_from_style(Some("heavy-light"), Some("forward")), Barline::RepeatLeft);
        assert_eq!(barline_from_style(None, Some("forward")), Barline::RepeatLeft);
        assert_eq!(barline_from_style(Some("regular"), None), Barline::Single);
        assert_eq!(barline_from_style(None, None), Barline::Single);
        assert_eq!(barline_from_style(Some("none"), None), Barline::Invisible);

        for barline in [
            Barline::Single,
            Barline::Double,
            Barline::RepeatLeft,
            Barline::RepeatRight,
            Barline::Final,
            Barline::Dashed,
            Barline::Thick,
            Barline::Invisible,
        ] {
            let read = barline_from_style(Some(bar_style_tag(barline)), repeat_direction(barline));
            assert_eq!(read, barline);
        }
    }
}
