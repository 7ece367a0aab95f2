// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, str::FromStr};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidatorError};
use crate::input::LoadedInput;
use crate::rdf::{parse_document, RdfDocument};
use crate::syntax::RdfSyntax;

const DCAT_AP_SHAPES: &str = include_str!("../shapes/dcat-ap.ttl");
const DCAT_AP_ES_SHAPES: &str = include_str!("../shapes/dcat-ap-es.ttl");
const NTI_RISP_SHAPES: &str = include_str!("../shapes/nti-risp.ttl");

/// The shape sets a catalog can be validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    DcatAp,
    DcatApEs,
    NtiRisp,
    /// Only the shapes the user provides.
    Custom,
}

impl Profile {
    pub fn all() -> [Profile; 4] {
        [
            Profile::DcatAp,
            Profile::DcatApEs,
            Profile::NtiRisp,
            Profile::Custom,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            Profile::DcatAp => "dcat-ap",
            Profile::DcatApEs => "dcat-ap-es",
            Profile::NtiRisp => "nti-risp",
            Profile::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Profile::DcatAp => "DCAT-AP",
            Profile::DcatApEs => "DCAT-AP-ES",
            Profile::NtiRisp => "NTI-RISP",
            Profile::Custom => "User-provided shapes",
        }
    }

    /// Embedded shape documents, base profile first.
    pub fn shapes_sources(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            Profile::DcatAp => vec![("dcat-ap.ttl", DCAT_AP_SHAPES)],
            Profile::DcatApEs => vec![
                ("dcat-ap.ttl", DCAT_AP_SHAPES),
                ("dcat-ap-es.ttl", DCAT_AP_ES_SHAPES),
            ],
            Profile::NtiRisp => vec![("nti-risp.ttl", NTI_RISP_SHAPES)],
            Profile::Custom => Vec::new(),
        }
    }

    /// The embedded shapes as one Turtle document.
    pub fn shapes_turtle(&self) -> Result<String> {
        ShapeSet::for_profile(*self, &[]).and_then(|shapes| shapes.to_turtle())
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Profile {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Profile::all()
            .into_iter()
            .find(|profile| profile.id() == normalized)
            .ok_or_else(|| ValidatorError::UnknownProfile(s.to_string()))
    }
}

/// The shapes actually used for one validation: a profile's embedded
/// documents plus anything the user supplied.
#[derive(Debug, Clone)]
pub struct ShapeSet {
    profile: Profile,
    document: RdfDocument,
    sources: Vec<String>,
}

impl ShapeSet {
    pub fn for_profile(profile: Profile, external: &[LoadedInput]) -> Result<Self> {
        if profile == Profile::Custom && external.is_empty() {
            return Err(ValidatorError::MissingShapes);
        }

        let mut document = RdfDocument::default();
        let mut sources = Vec::new();

        for (name, turtle) in profile.shapes_sources() {
            document.merge(parse_document(turtle, RdfSyntax::Turtle, None, name)?);
            sources.push(name.to_string());
        }
        for shapes in external {
            let parsed = parse_document(
                &shapes.content,
                shapes.syntax,
                shapes.base_iri.as_deref(),
                &shapes.origin,
            )?;
            debug!("Adding {} shape triples from {}", parsed.len(), shapes.origin);
            document.merge(parsed);
            sources.push(shapes.origin.clone());
        }

        info!(
            "Using {} shape triples for profile {} from {} document(s)",
            document.len(),
            profile.label(),
            sources.len()
        );
        Ok(Self {
            profile,
            document,
            sources,
        })
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn document(&self) -> &RdfDocument {
        &self.document
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn to_turtle(&self) -> Result<String> {
        self.document.to_turtle()
    }
}
