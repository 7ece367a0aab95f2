// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use srdf::RDFFormat;

use crate::error::{Result, ValidatorError};

/// The RDF syntaxes a user may hand us, whether or not the engine can read them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RdfSyntax {
    Turtle,
    NTriples,
    NQuads,
    TriG,
    RdfXml,
    JsonLd,
    N3,
}

impl RdfSyntax {
    pub fn all() -> [RdfSyntax; 7] {
        [
            RdfSyntax::Turtle,
            RdfSyntax::NTriples,
            RdfSyntax::NQuads,
            RdfSyntax::TriG,
            RdfSyntax::RdfXml,
            RdfSyntax::JsonLd,
            RdfSyntax::N3,
        ]
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            RdfSyntax::Turtle => "text/turtle",
            RdfSyntax::NTriples => "application/n-triples",
            RdfSyntax::NQuads => "application/n-quads",
            RdfSyntax::TriG => "application/trig",
            RdfSyntax::RdfXml => "application/rdf+xml",
            RdfSyntax::JsonLd => "application/ld+json",
            RdfSyntax::N3 => "text/n3",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            RdfSyntax::Turtle => "ttl",
            RdfSyntax::NTriples => "nt",
            RdfSyntax::NQuads => "nq",
            RdfSyntax::TriG => "trig",
            RdfSyntax::RdfXml => "rdf",
            RdfSyntax::JsonLd => "jsonld",
            RdfSyntax::N3 => "n3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RdfSyntax::Turtle => "Turtle",
            RdfSyntax::NTriples => "N-Triples",
            RdfSyntax::NQuads => "N-Quads",
            RdfSyntax::TriG => "TriG",
            RdfSyntax::RdfXml => "RDF/XML",
            RdfSyntax::JsonLd => "JSON-LD",
            RdfSyntax::N3 => "N3",
        }
    }

    /// N3 is recognised so that we can give a precise error, but nothing
    /// we link reads it.
    pub fn is_supported(&self) -> bool {
        !matches!(self, RdfSyntax::N3)
    }

    pub(crate) fn rdf_format(&self) -> Result<RDFFormat> {
        match self {
            RdfSyntax::Turtle => Ok(RDFFormat::Turtle),
            RdfSyntax::NTriples => Ok(RDFFormat::NTriples),
            RdfSyntax::NQuads => Ok(RDFFormat::NQuads),
            RdfSyntax::TriG => Ok(RDFFormat::TriG),
            RdfSyntax::RdfXml => Ok(RDFFormat::RDFXML),
            RdfSyntax::JsonLd => Ok(RDFFormat::JsonLd),
            other => Err(ValidatorError::UnsupportedSyntax(*other)),
        }
    }

    /// Look up a media type, ignoring case and parameters such as `charset`.
    pub fn from_media_type(media_type: &str) -> Option<RdfSyntax> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/turtle" | "application/x-turtle" | "application/turtle" => Some(RdfSyntax::Turtle),
            "application/n-triples" => Some(RdfSyntax::NTriples),
            "application/n-quads" | "text/x-nquads" => Some(RdfSyntax::NQuads),
            "application/trig" | "application/x-trig" => Some(RdfSyntax::TriG),
            "application/rdf+xml" | "application/xml" | "text/xml" => Some(RdfSyntax::RdfXml),
            "application/ld+json" | "application/json" => Some(RdfSyntax::JsonLd),
            "text/n3" | "text/rdf+n3" => Some(RdfSyntax::N3),
            _ => None,
        }
    }

    /// Guess from the extension of a file name or URL, skipping `.gz`.
    pub fn from_file_name(name: &str) -> Option<RdfSyntax> {
        let path = name.split(['?', '#']).next().unwrap_or_default();
        let last_segment = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
        let last_segment = last_segment.strip_suffix(".gz").unwrap_or(&last_segment);
        let (_, extension) = last_segment.rsplit_once('.')?;
        match extension {
            "ttl" | "turtle" => Some(RdfSyntax::Turtle),
            "nt" | "ntriples" => Some(RdfSyntax::NTriples),
            "nq" | "nquads" => Some(RdfSyntax::NQuads),
            "trig" => Some(RdfSyntax::TriG),
            "rdf" | "owl" | "xml" => Some(RdfSyntax::RdfXml),
            "jsonld" | "json" => Some(RdfSyntax::JsonLd),
            "n3" => Some(RdfSyntax::N3),
            _ => None,
        }
    }

    /// Best-effort guess from the content itself.
    pub fn sniff(content: &str) -> RdfSyntax {
        let trimmed = content.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with("<?xml") || trimmed.starts_with("<rdf:RDF") {
            return RdfSyntax::RdfXml;
        }
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return RdfSyntax::JsonLd;
        }

        let mut statements = trimmed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .peekable();
        if statements.peek().is_none() {
            return RdfSyntax::Turtle;
        }

        let mut quads = false;
        for line in statements {
            let lowered = line.to_ascii_lowercase();
            if lowered.starts_with("@prefix")
                || lowered.starts_with("@base")
                || lowered.starts_with("prefix ")
                || lowered.starts_with("base ")
            {
                return RdfSyntax::Turtle;
            }
            if !(line.starts_with('<') || line.starts_with("_:")) || !line.ends_with('.') {
                return RdfSyntax::Turtle;
            }
            // a fourth term before the final dot means a graph name
            if term_count(line) == 4 {
                quads = true;
            }
        }
        if quads {
            RdfSyntax::NQuads
        } else {
            RdfSyntax::NTriples
        }
    }

    /// The explicit choice wins, then the file name, then the content. The
    /// web form's `"empty"` placeholder counts as no explicit choice.
    pub fn resolve(
        explicit: Option<&str>,
        file_name: Option<&str>,
        content: &str,
    ) -> Result<RdfSyntax> {
        if let Some(explicit) = explicit.map(str::trim).filter(|s| !s.is_empty() && *s != "empty") {
            return explicit
                .parse()
                .map_err(|_| ValidatorError::UnknownSyntax(explicit.to_string()));
        }
        Ok(file_name
            .and_then(RdfSyntax::from_file_name)
            .unwrap_or_else(|| RdfSyntax::sniff(content)))
    }
}

/// Count the terms of an N-Triples/N-Quads line, ignoring what is inside
/// IRIs and literals.
fn term_count(line: &str) -> usize {
    let mut count = 0;
    let mut chars = line.trim_end_matches('.').trim_end().chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' => {
                count += 1;
                for c in chars.by_ref() {
                    if c == '>' {
                        break;
                    }
                }
            }
            '"' => {
                count += 1;
                let mut escaped = false;
                for c in chars.by_ref() {
                    match c {
                        '\\' if !escaped => escaped = true,
                        '"' if !escaped => break,
                        _ => escaped = false,
                    }
                }
                // language tag or datatype belong to the literal
                while let Some(next) = chars.peek() {
                    if next.is_whitespace() {
                        break;
                    }
                    if *next == '<' {
                        chars.next();
                        for c in chars.by_ref() {
                            if c == '>' {
                                break;
                            }
                        }
                    } else {
                        chars.next();
                    }
                }
            }
            '_' => {
                count += 1;
                while chars.peek().is_some_and(|c| !c.is_whitespace()) {
                    chars.next();
                }
            }
            _ => {}
        }
    }
    count
}

impl fmt::Display for RdfSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.media_type())
    }
}

impl FromStr for RdfSyntax {
    type Err = ValidatorError;

    /// Accepts a media type, an extension or one of our own names.
    fn from_str(s: &str) -> Result<Self> {
        if let Some(syntax) = RdfSyntax::from_media_type(s) {
            return Ok(syntax);
        }
        let lowered = s.trim().to_ascii_lowercase();
        let by_name = match lowered.as_str() {
            "turtle" => Some(RdfSyntax::Turtle),
            "n-triples" | "ntriples" => Some(RdfSyntax::NTriples),
            "n-quads" | "nquads" => Some(RdfSyntax::NQuads),
            "rdf/xml" | "rdfxml" | "rdf-xml" => Some(RdfSyntax::RdfXml),
            "json-ld" | "jsonld" => Some(RdfSyntax::JsonLd),
            _ => RdfSyntax::all()
                .into_iter()
                .find(|syntax| syntax.extension() == lowered),
        };
        by_name.ok_or_else(|| ValidatorError::UnknownSyntax(s.to_string()))
    }
}
