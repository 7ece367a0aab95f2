// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

//! Validation of DCAT data catalogs against SHACL shape sets and analysis of
//! SHACL validation reports.

pub mod engine;
pub mod error;
#[cfg(feature = "native")]
pub mod fetch;
pub mod input;
pub mod profiles;
pub mod rdf;
pub mod report;
pub mod settings;
pub mod syntax;
pub mod validator;
pub mod vocab;
#[cfg(feature = "native")]
pub mod worker;

pub use engine::{RudofEngine, ShaclEngine};
pub use error::{Result, ValidatorError};
pub use input::{InputSource, LoadedInput};
pub use profiles::{Profile, ShapeSet};
pub use rdf::{OutputSyntax, RdfDocument};
pub use report::{
    AnalyzedReport, Outcome, ResultFilter, ResultGroup, Severity, SeverityCounts,
    ValidationReport, ValidationResultRow,
};
#[cfg(feature = "native")]
pub use settings::Preferences;
pub use settings::Settings;
pub use syntax::RdfSyntax;
pub use validator::{CatalogValidator, ExternalShapes, ValidationOutcome, ValidationRequest};
#[cfg(feature = "native")]
pub use worker::{ReportWorker, WorkerEvent};
