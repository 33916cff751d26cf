// Structure of written documents, checked with an independent XML parser

use notation_xml::{read_str, write_string, ReaderOptions, WriterOptions};
use roxmltree::{Document, Node, ParsingOptions};

const QUARTET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="4.0">
  <part-list>
    <score-part id="P1"><part-name>Piano</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>2</divisions>
        <key><fifths>-2</fifths></key>
        <time><beats>2</beats><beat-type>4</beat-type></time>
        <staves>2</staves>
        <clef number="1"><sign>G</sign><line>2</line></clef>
        <clef number="2"><sign>F</sign><line>4</line></clef>
      </attributes>
      <note><pitch><step>B</step><alter>-1</alter><octave>4</octave></pitch><duration>2</duration><voice>1</voice><staff>1</staff>
        <notations><slur type="start" number="3"/><slur type="start" number="5" line-type="dotted"/></notations></note>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>2</duration><voice>1</voice><staff>1</staff>
        <notations><slur type="stop" number="3"/><slur type="stop" number="5"/></notations></note>
      <backup><duration>4</duration></backup>
      <note><pitch><step>B</step><alter>-1</alter><octave>2</octave></pitch><duration>4</duration><voice>2</voice><staff>2</staff></note>
    </measure>
    <measure number="2">
      <note><unpitched><display-step>E</display-step><display-octave>4</display-octave></unpitched><duration>4</duration><voice>1</voice><staff>1</staff>
        <notations><articulations><accent/></articulations></notations></note>
      <backup><duration>4</duration></backup>
      <note><pitch><step>F</step><octave>2</octave></pitch><duration>1</duration><voice>2</voice><staff>2</staff>
        <notations><non-arpeggiate type="bottom"/></notations></note>
      <note><chord/><pitch><step>C</step><octave>3</octave></pitch><duration>1</duration><voice>2</voice><staff>2</staff>
        <notations><non-arpeggiate type="top"/></notations></note>
      <note><rest/><duration>3</duration><voice>2</voice><staff>2</staff></note>
    </measure>
  </part>
</score-partwise>
"#;

fn written() -> String {
    let _ = env_logger::builder().is_test(true).try_init();
    let score = read_str(QUARTET, &ReaderOptions::strict()).unwrap();
    write_string(&score, &WriterOptions::default()).unwrap()
}

fn parse(xml: &str) -> Document<'_> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml, options).expect("written document should be well-formed")
}

fn children<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Vec<Node<'a, 'input>> {
    node.children().filter(|n| n.has_tag_name(name)).collect()
}

fn child_names(node: Node<'_, '_>) -> Vec<String> {
    node.children()
        .filter(|n| n.is_element())
        .map(|n| n.tag_name().name().to_string())
        .collect()
}

#[test]
fn test_root_and_part_list() {
    let xml = written();
    let doc = parse(&xml);
    let root = doc.root_element();

    assert!(root.has_tag_name("score-partwise"));
    assert_eq!(root.attribute("version"), Some("4.0"));
    assert_eq!(child_names(root), vec!["part-list", "part"]);

    let score_part = root.descendants().find(|n| n.has_tag_name("score-part")).unwrap();
    assert_eq!(score_part.attribute("id"), Some("P1"));
}

#[test]
fn test_multi_staff_attributes_and_backup() {
    let xml = written();
    let doc = parse(&xml);
    let part = children(doc.root_element(), "part")[0];
    let measures = children(part, "measure");
    assert_eq!(measures.len(), 2);

    let attributes = children(measures[0], "attributes")[0];
    assert_eq!(
        child_names(attributes),
        vec!["divisions", "key", "time", "staves", "clef", "clef"]
    );
    let clef_numbers: Vec<&str> = children(attributes, "clef")
        .iter()
        .filter_map(|c| c.attribute("number"))
        .collect();
    assert_eq!(clef_numbers, vec!["1", "2"]);

    // No attribute changes in the second measure
    assert!(children(measures[1], "attributes").is_empty());

    for measure in &measures {
        assert_eq!(children(*measure, "backup").len(), 1);
        for note in children(*measure, "note") {
            assert_eq!(children(note, "staff").len(), 1);
        }
    }
}

#[test]
fn test_note_children_order() {
    let xml = written();
    let doc = parse(&xml);
    let note = doc.descendants().find(|n| n.has_tag_name("note")).unwrap();
    assert_eq!(
        child_names(note),
        vec!["pitch", "duration", "voice", "type", "staff", "notations"]
    );

    let alter = note.descendants().find(|n| n.has_tag_name("alter")).unwrap();
    assert_eq!(alter.text(), Some("-1"));
}

#[test]
fn test_overlapping_slurs_get_low_numbers() {
    let xml = written();
    let doc = parse(&xml);
    let slurs: Vec<(String, String)> = doc
        .descendants()
        .filter(|n| n.has_tag_name("slur"))
        .map(|n| {
            (
                n.attribute("type").unwrap_or_default().to_string(),
                n.attribute("number").unwrap_or_default().to_string(),
            )
        })
        .collect();

    let mut starts: Vec<&str> = slurs
        .iter()
        .filter(|(t, _)| t == "start")
        .map(|(_, n)| n.as_str())
        .collect();
    starts.sort();
    assert_eq!(starts, vec!["1", "2"]);
    assert_eq!(slurs.iter().filter(|(t, _)| t == "stop").count(), 2);

    let dotted = doc
        .descendants()
        .filter(|n| n.has_tag_name("slur"))
        .filter(|n| n.attribute("line-type") == Some("dotted"))
        .count();
    assert_eq!(dotted, 1);
}

#[test]
fn test_unpitched_and_non_arpeggiate() {
    let xml = written();
    let doc = parse(&xml);

    let unpitched = doc.descendants().find(|n| n.has_tag_name("unpitched")).unwrap();
    assert_eq!(child_names(unpitched), vec!["display-step", "display-octave"]);
    assert!(doc.descendants().any(|n| n.has_tag_name("accent")));

    let brackets: Vec<(Option<&str>, Option<&str>)> = doc
        .descendants()
        .filter(|n| n.has_tag_name("non-arpeggiate"))
        .map(|n| (n.attribute("type"), n.attribute("number")))
        .collect();
    assert_eq!(
        brackets,
        vec![(Some("bottom"), Some("1")), (Some("top"), Some("1"))]
    );

    let chords = doc.descendants().filter(|n| n.has_tag_name("chord")).count();
    assert_eq!(chords, 1);
}
