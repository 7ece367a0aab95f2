// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

use log::debug;
use oxrdf::{Graph, TermRef, Triple};
use oxttl::{
    NQuadsParser, NTriplesParser, NTriplesSerializer, TriGParser, TurtleParser, TurtleSerializer,
};
use serde::{Deserialize, Serialize};
use srdf::SRDFGraph;

use crate::error::{Result, ValidatorError};
use crate::syntax::RdfSyntax;
use crate::vocab::{owl, WELL_KNOWN_PREFIXES};

/// Syntaxes we write. Reports and shapes go out as Turtle unless asked otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputSyntax {
    #[default]
    Turtle,
    NTriples,
    RdfXml,
    JsonLd,
}

impl OutputSyntax {
    pub fn syntax(&self) -> RdfSyntax {
        match self {
            OutputSyntax::Turtle => RdfSyntax::Turtle,
            OutputSyntax::NTriples => RdfSyntax::NTriples,
            OutputSyntax::RdfXml => RdfSyntax::RdfXml,
            OutputSyntax::JsonLd => RdfSyntax::JsonLd,
        }
    }
}

impl std::str::FromStr for OutputSyntax {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.parse::<RdfSyntax>()? {
            RdfSyntax::Turtle => Ok(OutputSyntax::Turtle),
            RdfSyntax::NTriples => Ok(OutputSyntax::NTriples),
            RdfSyntax::RdfXml => Ok(OutputSyntax::RdfXml),
            RdfSyntax::JsonLd => Ok(OutputSyntax::JsonLd),
            other => Err(ValidatorError::UnsupportedSyntax(other)),
        }
    }
}

/// A parsed RDF graph together with the prefixes its author declared.
#[derive(Debug, Clone, Default)]
pub struct RdfDocument {
    pub graph: Graph,
    pub prefixes: Vec<(String, String)>,
}

impl RdfDocument {
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Union of both graphs. A prefix name keeps its first binding.
    pub fn merge(&mut self, other: RdfDocument) {
        for triple in other.graph.iter() {
            self.graph.insert(triple);
        }
        for (name, iri) in other.prefixes {
            if !self.prefixes.iter().any(|(existing, _)| *existing == name) {
                self.prefixes.push((name, iri));
            }
        }
    }

    pub fn to_turtle(&self) -> Result<String> {
        let mut serializer = TurtleSerializer::new();
        for (name, iri) in &self.prefixes {
            serializer = serializer
                .with_prefix(name.as_str(), iri.as_str())
                .map_err(|e| ValidatorError::Serialize(e.to_string()))?;
        }
        let mut writer = serializer.for_writer(Vec::new());
        for triple in self.graph.iter() {
            writer.serialize_triple(triple)?;
        }
        let bytes = writer.finish()?;
        String::from_utf8(bytes).map_err(|e| ValidatorError::Serialize(e.to_string()))
    }

    pub fn to_ntriples(&self) -> Result<String> {
        let mut writer = NTriplesSerializer::new().for_writer(Vec::new());
        for triple in self.graph.iter() {
            writer.serialize_triple(triple)?;
        }
        String::from_utf8(writer.finish()).map_err(|e| ValidatorError::Serialize(e.to_string()))
    }

    pub fn serialize(&self, syntax: OutputSyntax) -> Result<String> {
        match syntax {
            OutputSyntax::Turtle => self.to_turtle(),
            OutputSyntax::NTriples => self.to_ntriples(),
            // oxttl has no writer for these, the engine's graph does
            OutputSyntax::RdfXml | OutputSyntax::JsonLd => {
                let syntax = syntax.syntax();
                convert_with_engine(&self.to_ntriples()?, RdfSyntax::NTriples, syntax, None)
                    .map_err(|e| ValidatorError::Serialize(format!("{}: {e}", syntax.label())))
            }
        }
    }

    /// Targets of `owl:imports` statements, in graph order.
    pub fn owl_imports(&self) -> Vec<String> {
        self.graph
            .iter()
            .filter(|triple| triple.predicate == owl::IMPORTS)
            .filter_map(|triple| match triple.object {
                TermRef::NamedNode(node) => Some(node.as_str().to_string()),
                _ => None,
            })
            .collect()
    }
}

/// Parse `text` in the given syntax. Named graphs are folded into the default
/// graph since SHACL validation runs over a single data graph.
pub fn parse_document(
    text: &str,
    syntax: RdfSyntax,
    base_iri: Option<&str>,
    origin: &str,
) -> Result<RdfDocument> {
    let mut document = RdfDocument::default();
    let parse_error = |err: &dyn std::fmt::Display| ValidatorError::parse(syntax, origin, err);

    match syntax {
        RdfSyntax::Turtle => {
            let mut parser = TurtleParser::new();
            if let Some(base) = base_iri {
                parser = parser.with_base_iri(base).map_err(|e| parse_error(&e))?;
            }
            let mut reader = parser.for_reader(text.as_bytes());
            for triple in reader.by_ref() {
                document.graph.insert(&triple.map_err(|e| parse_error(&e))?);
            }
            document.prefixes = reader
                .prefixes()
                .map(|(name, iri)| (name.to_string(), iri.to_string()))
                .collect();
        }
        RdfSyntax::TriG => {
            let mut parser = TriGParser::new();
            if let Some(base) = base_iri {
                parser = parser.with_base_iri(base).map_err(|e| parse_error(&e))?;
            }
            let mut reader = parser.for_reader(text.as_bytes());
            for quad in reader.by_ref() {
                let quad = quad.map_err(|e| parse_error(&e))?;
                document
                    .graph
                    .insert(&Triple::new(quad.subject, quad.predicate, quad.object));
            }
            document.prefixes = reader
                .prefixes()
                .map(|(name, iri)| (name.to_string(), iri.to_string()))
                .collect();
        }
        RdfSyntax::NTriples => {
            for triple in NTriplesParser::new().for_reader(text.as_bytes()) {
                document.graph.insert(&triple.map_err(|e| parse_error(&e))?);
            }
        }
        RdfSyntax::NQuads => {
            for quad in NQuadsParser::new().for_reader(text.as_bytes()) {
                let quad = quad.map_err(|e| parse_error(&e))?;
                document
                    .graph
                    .insert(&Triple::new(quad.subject, quad.predicate, quad.object));
            }
        }
        RdfSyntax::RdfXml | RdfSyntax::JsonLd => {
            // the engine's own reader understands these; hand its output back
            // to the line-based parser
            let ntriples = convert_with_engine(text, syntax, RdfSyntax::NTriples, base_iri)
                .map_err(|e| parse_error(&e))?;
            return parse_document(&ntriples, RdfSyntax::NTriples, None, origin);
        }
        unsupported => return Err(ValidatorError::UnsupportedSyntax(unsupported)),
    }

    debug!(
        "Parsed {} triples of {} from {}",
        document.graph.len(),
        syntax.label(),
        origin
    );
    Ok(document)
}

/// Read `text` into an `SRDFGraph` and write it back out in `to`.
fn convert_with_engine(
    text: &str,
    from: RdfSyntax,
    to: RdfSyntax,
    base_iri: Option<&str>,
) -> std::result::Result<String, Box<dyn std::error::Error>> {
    let graph = SRDFGraph::from_str(
        text,
        &from.rdf_format()?,
        base_iri,
        &srdf::ReaderMode::default(),
    )?;
    let mut buffer = Vec::new();
    srdf::BuildRDF::serialize(&graph, &to.rdf_format()?, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Shortens IRIs for display. Later bindings never shadow earlier ones.
#[derive(Debug, Clone)]
pub struct PrefixMap {
    entries: Vec<(String, String)>,
}

impl Default for PrefixMap {
    fn default() -> Self {
        Self {
            entries: WELL_KNOWN_PREFIXES
                .iter()
                .map(|(name, iri)| (name.to_string(), iri.to_string()))
                .collect(),
        }
    }
}

impl PrefixMap {
    pub fn extend(&mut self, prefixes: &[(String, String)]) {
        for (name, iri) in prefixes {
            let known = self
                .entries
                .iter()
                .any(|(existing_name, existing_iri)| existing_name == name || existing_iri == iri);
            if !known && !iri.is_empty() {
                self.entries.push((name.clone(), iri.clone()));
            }
        }
    }

    /// `prefix:local` for the longest matching namespace, `<iri>` otherwise.
    pub fn compact(&self, iri: &str) -> String {
        self.entries
            .iter()
            .filter(|(_, namespace)| iri.starts_with(namespace.as_str()))
            .max_by_key(|(_, namespace)| namespace.len())
            .map(|(name, namespace)| (name, &iri[namespace.len()..]))
            .filter(|(_, local)| is_simple_local_name(local))
            .map(|(name, local)| format!("{name}:{local}"))
            .unwrap_or_else(|| format!("<{iri}>"))
    }

    pub fn render(&self, term: TermRef<'_>) -> String {
        match term {
            TermRef::NamedNode(node) => self.compact(node.as_str()),
            TermRef::BlankNode(node) => format!("_:{}", node.as_str()),
            TermRef::Literal(literal) => literal.value().to_string(),
            #[allow(unreachable_patterns)]
            other => other.to_string(),
        }
    }
}

fn is_simple_local_name(local: &str) -> bool {
    !local.is_empty()
        && !local.ends_with('.')
        && local
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use oxrdf::{NamedNodeRef, TermRef};

    use super::{parse_document, OutputSyntax, PrefixMap};
    use crate::syntax::RdfSyntax;

    const CATALOG: &str = r#"
        @prefix dcat: <http://www.w3.org/ns/dcat#> .
        @prefix dct: <http://purl.org/dc/terms/> .
        @prefix ex: <http://example.org/> .
        @prefix owl: <http://www.w3.org/2002/07/owl#> .

        ex:catalog a dcat:Catalog ;
            dct:title "Catalogue"@en ;
            owl:imports <http://example.org/extra.ttl> ;
            dcat:dataset <datasets/1> .
    "#;

    #[test]
    fn turtle_keeps_prefixes_and_resolves_base() {
        let document =
            parse_document(CATALOG, RdfSyntax::Turtle, Some("http://example.org/"), "-").unwrap();
        assert_eq!(document.len(), 4);
        assert!(document
            .prefixes
            .iter()
            .any(|(name, iri)| name == "dcat" && iri == "http://www.w3.org/ns/dcat#"));

        let dataset = NamedNodeRef::new_unchecked("http://example.org/datasets/1");
        assert!(document
            .graph
            .iter()
            .any(|triple| triple.object == TermRef::NamedNode(dataset)));
        assert_eq!(document.owl_imports(), vec!["http://example.org/extra.ttl"]);
    }

    #[test]
    fn quads_fold_into_one_graph() {
        let quads = "<http://ex.org/a> <http://ex.org/p> \"1\" <http://ex.org/g1> .\n\
                     <http://ex.org/a> <http://ex.org/p> \"1\" <http://ex.org/g2> .\n\
                     <http://ex.org/b> <http://ex.org/p> \"2\" .\n";
        let document = parse_document(quads, RdfSyntax::NQuads, None, "dump.nq").unwrap();
        assert_eq!(document.len(), 2);
    }

    #[test]
    fn parse_errors_name_the_origin() {
        let err = parse_document("ex:a ex:b", RdfSyntax::Turtle, None, "broken.ttl").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("broken.ttl"), "{message}");
        assert!(message.contains("Turtle"), "{message}");
    }

    #[test]
    fn unsupported_syntaxes_are_rejected() {
        assert!(parse_document("@prefix : <#> .", RdfSyntax::N3, None, "-").is_err());
        assert!(matches!(
            "text/n3".parse::<OutputSyntax>(),
            Err(crate::error::ValidatorError::UnsupportedSyntax(RdfSyntax::N3))
        ));
    }

    #[test]
    fn json_ld_is_read() {
        let json_ld = r#"{
            "@context": {
                "dct": "http://purl.org/dc/terms/",
                "dcat": "http://www.w3.org/ns/dcat#"
            },
            "@id": "http://example.org/catalog",
            "@type": "dcat:Catalog",
            "dct:title": "Catalogue",
            "dct:publisher": { "@id": "http://example.org/publisher" }
        }"#;
        let document = parse_document(json_ld, RdfSyntax::JsonLd, None, "catalog.jsonld").unwrap();
        assert_eq!(document.len(), 3);
        let publisher = NamedNodeRef::new_unchecked("http://example.org/publisher");
        assert!(document
            .graph
            .iter()
            .any(|triple| triple.object == TermRef::NamedNode(publisher)));
    }

    #[test]
    fn rdf_xml_and_json_ld_output() {
        let document = parse_document(CATALOG, RdfSyntax::Turtle, Some("http://example.org/"), "-")
            .unwrap();

        let rdf_xml = document.serialize(OutputSyntax::RdfXml).unwrap();
        assert!(rdf_xml.contains("rdf:RDF"), "{rdf_xml}");
        let reparsed = parse_document(&rdf_xml, RdfSyntax::RdfXml, None, "-").unwrap();
        assert_eq!(reparsed.graph, document.graph);

        let json_ld = document.serialize(OutputSyntax::JsonLd).unwrap();
        let reparsed = parse_document(&json_ld, RdfSyntax::JsonLd, None, "-").unwrap();
        assert_eq!(reparsed.graph, document.graph);

        assert_eq!("application/rdf+xml".parse::<OutputSyntax>().unwrap(), OutputSyntax::RdfXml);
        assert_eq!("jsonld".parse::<OutputSyntax>().unwrap(), OutputSyntax::JsonLd);
    }

    #[test]
    fn rdf_xml_is_read() {
        let rdf_xml = r#"<?xml version="1.0"?>
            <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                     xmlns:dct="http://purl.org/dc/terms/">
              <rdf:Description rdf:about="http://example.org/catalog">
                <dct:title>Catalogue</dct:title>
                <dct:publisher rdf:resource="http://example.org/publisher"/>
              </rdf:Description>
            </rdf:RDF>"#;
        let document = parse_document(rdf_xml, RdfSyntax::RdfXml, None, "catalog.rdf").unwrap();
        assert_eq!(document.len(), 2);
    }

    #[test]
    fn serialization_round_trips() {
        let document = parse_document(CATALOG, RdfSyntax::Turtle, Some("http://example.org/"), "-")
            .unwrap();

        let turtle = document.serialize(OutputSyntax::Turtle).unwrap();
        assert!(turtle.contains("@prefix dcat: <http://www.w3.org/ns/dcat#>"));
        let reparsed = parse_document(&turtle, RdfSyntax::Turtle, None, "-").unwrap();
        assert_eq!(reparsed.graph, document.graph);

        let ntriples = document.serialize(OutputSyntax::NTriples).unwrap();
        assert_eq!(ntriples.lines().count(), 4);
    }

    #[test]
    fn merge_keeps_first_prefix_binding() {
        let mut first = parse_document(
            "@prefix ex: <http://example.org/> . ex:a ex:p ex:b .",
            RdfSyntax::Turtle,
            None,
            "-",
        )
        .unwrap();
        let second = parse_document(
            "@prefix ex: <http://other.org/> . <http://other.org/c> <http://other.org/p> \"x\" .",
            RdfSyntax::Turtle,
            None,
            "-",
        )
        .unwrap();
        first.merge(second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.prefixes, vec![("ex".to_string(), "http://example.org/".to_string())]);
    }

    #[test]
    fn compaction() {
        let mut prefixes = PrefixMap::default();
        prefixes.extend(&[("ex".to_string(), "http://example.org/".to_string())]);

        assert_eq!(prefixes.compact("http://www.w3.org/ns/dcat#Dataset"), "dcat:Dataset");
        assert_eq!(prefixes.compact("http://example.org/catalog"), "ex:catalog");
        assert_eq!(
            prefixes.compact("http://example.org/datasets/1"),
            "<http://example.org/datasets/1>"
        );
        assert_eq!(prefixes.compact("urn:uuid:1234"), "<urn:uuid:1234>");
    }
}
