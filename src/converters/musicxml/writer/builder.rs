// MusicXML element emitter

use std::fmt::Display;

use crate::config::WriterOptions;
use crate::converters::musicxml::helpers::xml_escape;

/// Writes elements into a string buffer, indenting by nesting depth unless minified
pub struct XmlEmitter {
    buffer: String,
    depth: usize,
    indent: usize,
    minify: bool,
}

impl XmlEmitter {
    pub fn new(options: &WriterOptions) -> Self {
        Self {
            buffer: String::new(),
            depth: 0,
            indent: options.indent,
            minify: options.minify,
        }
    }

    /// XML declaration and the partwise DOCTYPE
    pub fn prolog(&mut self, version: &str) {
        self.line("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>");
        self.line(&format!(
            "<!DOCTYPE score-partwise PUBLIC \"-//Recordare//DTD MusicXML {} Partwise//EN\" \"http://www.musicxml.org/dtds/partwise.dtd\">",
            xml_escape(version)
        ));
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) {
        let tag = format!("<{}{}>", name, render_attributes(attributes));
        self.line(&tag);
        self.depth += 1;
    }

    pub fn end(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(&format!("</{}>", name));
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) {
        let tag = format!("<{}{}/>", name, render_attributes(attributes));
        self.line(&tag);
    }

    /// Element holding only text
    pub fn text<T: Display>(&mut self, name: &str, value: T) {
        self.text_with(name, &[], value);
    }

    pub fn text_with<T: Display>(&mut self, name: &str, attributes: &[(&str, &str)], value: T) {
        let value = xml_escape(&value.to_string());
        self.line(&format!(
            "<{}{}>{}</{}>",
            name,
            render_attributes(attributes),
            value,
            name
        ));
    }

    pub fn finish(self) -> String {
        self.buffer
    }

    fn line(&mut self, content: &str) {
        if self.minify {
            self.buffer.push_str(content);
            return;
        }
        for _ in 0..self.depth * self.indent {
            self.buffer.push(' ');
        }
        self.buffer.push_str(content);
        self.buffer.push('\n');
    }
}

fn render_attributes(attributes: &[(&str, &str)]) -> String {
    attributes
        .iter()
        .map(|(key, value)| format!(" {}=\"{}\"", key, xml_escape(value)))
        .collect()
}
