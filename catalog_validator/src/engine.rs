// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

use std::io::Cursor;

use log::debug;
use shacl_validation::shacl_processor::{GraphValidation, ShaclProcessor, ShaclValidationMode};
use shacl_validation::store::graph::Graph;
use shacl_validation::store::ShaclDataManager;
use shacl_validation::validate_error::ValidateError;
use shacl_validation::validation_report::report::ValidationReport;
use sparql_service::RdfData;
use srdf::{BuildRDF, RDFFormat, SRDFGraph};

use crate::error::{Result, ValidatorError};
use crate::rdf::{parse_document, RdfDocument};
use crate::syntax::RdfSyntax;

/// The SHACL processor we delegate to. Implementations return the report as
/// an RDF graph so that it flows through the same post-processing as an
/// imported report.
pub trait ShaclEngine {
    fn validate(&self, shapes_turtle: &str, data_ntriples: &str) -> Result<RdfDocument>;
}

/// Native-mode validation with the rudof SHACL processor.
#[derive(Debug, Default, Clone, Copy)]
pub struct RudofEngine;

impl ShaclEngine for RudofEngine {
    fn validate(&self, shapes_turtle: &str, data_ntriples: &str) -> Result<RdfDocument> {
        let report = validate_triples(shapes_turtle, data_ntriples).map_err(ValidatorError::engine)?;
        debug!("Engine finished, conforms: {}", report.conforms());

        let mut report_graph = SRDFGraph::new();
        report
            .to_rdf(&mut report_graph)
            .map_err(ValidatorError::engine)?;
        let mut buffer = Vec::new();
        report_graph
            .serialize(&RDFFormat::NTriples, &mut buffer)
            .map_err(ValidatorError::engine)?;
        let ntriples = String::from_utf8(buffer).map_err(|_| ValidatorError::Encoding)?;

        parse_document(&ntriples, RdfSyntax::NTriples, None, "validation report")
    }
}

/// Validate N-Triples data against Turtle shapes.
fn validate_triples(shapes: &str, triples: &str) -> std::result::Result<ValidationReport, ValidateError> {
    let schema = ShaclDataManager::load(Cursor::new(shapes), RDFFormat::Turtle, None)?;

    let srdf_graph = SRDFGraph::from_str(
        triples,
        &RDFFormat::NTriples,
        None,
        &srdf::ReaderMode::default(),
    )?;

    let data = RdfData::from_graph(srdf_graph)?;

    let graph = Graph::from_data(data);

    let endpoint_validation = GraphValidation::from_graph(graph, ShaclValidationMode::Native);

    endpoint_validation.validate(&schema)
}
