// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

//! Flattening of SHACL validation reports into presentation rows.
//!
//! Reports produced by the engine and reports imported by the user are both
//! RDF graphs and go through [`analyze`]: result nodes are located, their
//! properties rendered to strings, exact duplicates removed and the rest
//! grouped. Counts, groups and exports always cover every result even when
//! the displayed rows are cut at `max_detailed_results`.

pub mod export;
pub mod filter;
pub mod group;
mod path;

use std::collections::HashSet;
use std::fmt;

use log::{debug, warn};
use oxrdf::{Graph, NamedNodeRef, SubjectRef, TermRef};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rdf::{parse_document, PrefixMap, RdfDocument};
use crate::settings::Settings;
use crate::syntax::RdfSyntax;
use crate::vocab::{rdf, sh};

pub use filter::{Facets, ResultFilter};
pub use group::{group_results, message_fingerprint, ResultGroup};

/// Ordered so that the most severe sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Violation,
    Warning,
    Info,
}

impl Severity {
    /// Custom severities are not something we can rank, so they count as
    /// violations.
    pub fn from_term(term: Option<TermRef<'_>>) -> Self {
        match term {
            Some(TermRef::NamedNode(node)) if node == sh::WARNING => Severity::Warning,
            Some(TermRef::NamedNode(node)) if node == sh::INFO => Severity::Info,
            Some(TermRef::NamedNode(node)) if node == sh::VIOLATION => Severity::Violation,
            Some(other) => {
                warn!("Unknown result severity {}, treating it as a violation", other);
                Severity::Violation
            }
            None => Severity::Violation,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Violation => "Violation",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "violation" | "error" | "errors" | "violations" => Ok(Severity::Violation),
            "warning" | "warnings" => Ok(Severity::Warning),
            "info" | "infos" => Ok(Severity::Info),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// One `sh:ValidationResult`, rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValidationResultRow {
    pub severity: Severity,
    pub focus_node: String,
    pub result_path: Option<String>,
    pub value: Option<String>,
    pub source_shape: Option<String>,
    pub constraint_component: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub violations: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl SeverityCounts {
    pub fn of(rows: &[ValidationResultRow]) -> Self {
        let mut counts = SeverityCounts::default();
        for row in rows {
            match row.severity {
                Severity::Violation => counts.violations += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Info => counts.infos += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.violations + self.warnings + self.infos
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Violation => self.violations,
            Severity::Warning => self.warnings,
            Severity::Info => self.infos,
        }
    }
}

/// Overall verdict: a single violation fails, warnings without violations
/// warn, and infos alone still succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Success,
    Warning,
    Failure,
}

impl From<SeverityCounts> for Outcome {
    fn from(counts: SeverityCounts) -> Self {
        if counts.violations > 0 {
            Outcome::Failure
        } else if counts.warnings > 0 {
            Outcome::Warning
        } else {
            Outcome::Success
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Success => "SUCCESS",
            Outcome::Warning => "WARNING",
            Outcome::Failure => "FAILURE",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub preferred_language: String,
    pub max_detailed_results: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions::from(&Settings::default())
    }
}

impl From<&Settings> for ReportOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            preferred_language: settings.preferred_language.clone(),
            max_detailed_results: settings.max_detailed_results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub conforms: bool,
    pub outcome: Outcome,
    pub counts: SeverityCounts,
    /// Sorted and free of exact duplicates; cut when `truncated` is set.
    pub results: Vec<ValidationResultRow>,
    pub truncated: bool,
}

/// A report plus everything derived from it for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedReport {
    pub report: ValidationReport,
    pub groups: Vec<ResultGroup>,
    pub facets: Facets,
    /// Every deduplicated row, including those cut from `report.results`.
    /// Not serialized; a deserialized report exports its detailed rows.
    #[serde(skip)]
    all_results: Vec<ValidationResultRow>,
}

impl AnalyzedReport {
    /// Displayed rows that pass the filter.
    pub fn filtered(&self, filter: &ResultFilter) -> Vec<&ValidationResultRow> {
        filter.apply(&self.report.results)
    }

    /// Every row, truncated or not.
    pub fn all_results(&self) -> &[ValidationResultRow] {
        if self.all_results.is_empty() {
            &self.report.results
        } else {
            &self.all_results
        }
    }

    /// Rows for downloads: the whole report narrowed by the filter.
    pub fn exported(&self, filter: &ResultFilter) -> Vec<&ValidationResultRow> {
        filter.apply(self.all_results())
    }
}

impl ValidationReport {
    /// Flatten a report graph into sorted, deduplicated rows.
    pub fn from_document(document: &RdfDocument, options: &ReportOptions) -> Self {
        let (conforms, results) = flatten(document, options);
        Self::from_rows(conforms, &results, options.max_detailed_results)
    }

    fn from_rows(conforms: bool, results: &[ValidationResultRow], max_detailed: usize) -> Self {
        let counts = SeverityCounts::of(results);
        let truncated = results.len() > max_detailed;
        if truncated {
            warn!(
                "Report has {} results, showing the first {} in detail",
                results.len(),
                max_detailed
            );
        }
        let results = results[..results.len().min(max_detailed)].to_vec();
        Self {
            conforms,
            outcome: Outcome::from(counts),
            counts,
            results,
            truncated,
        }
    }

    pub fn counts(&self) -> SeverityCounts {
        self.counts
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }
}

/// Flatten, deduplicate, count and group a report graph.
pub fn analyze(document: &RdfDocument, options: &ReportOptions) -> AnalyzedReport {
    let (conforms, results) = flatten(document, options);
    let groups = group_results(&results);
    let facets = Facets::of(&results);
    let report = ValidationReport::from_rows(conforms, &results, options.max_detailed_results);
    let all_results = if report.truncated { results } else { Vec::new() };
    AnalyzedReport {
        report,
        groups,
        facets,
        all_results,
    }
}

fn flatten(document: &RdfDocument, options: &ReportOptions) -> (bool, Vec<ValidationResultRow>) {
    let mut prefixes = PrefixMap::default();
    prefixes.extend(&document.prefixes);

    let graph = &document.graph;
    let mut results: Vec<ValidationResultRow> = result_nodes(graph)
        .into_iter()
        .map(|node| read_result(graph, node, &prefixes, &options.preferred_language))
        .collect();
    let found = results.len();
    results.sort();
    results.dedup();
    if results.len() < found {
        debug!("Collapsed {} duplicate results", found - results.len());
    }

    let conforms = declared_conformance(graph).unwrap_or(results.is_empty());
    (conforms, results)
}

/// Import a validation report that was produced elsewhere.
pub fn parse_report(
    text: &str,
    syntax: RdfSyntax,
    options: &ReportOptions,
) -> Result<AnalyzedReport> {
    let document = parse_document(text, syntax, None, "validation report")?;
    Ok(analyze(&document, options))
}

fn declared_conformance(graph: &Graph) -> Option<bool> {
    graph
        .iter()
        .filter(|triple| triple.predicate == sh::CONFORMS)
        .find_map(|triple| match triple.object {
            TermRef::Literal(literal) => match literal.value() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
}

/// Objects of `sh:result`, nodes typed `sh:ValidationResult` and anything
/// with a `sh:focusNode`, in first-seen order. Nested `sh:detail` results
/// belong to their parent and are left out.
fn result_nodes(graph: &Graph) -> Vec<SubjectRef<'_>> {
    let details: HashSet<SubjectRef<'_>> = graph
        .triples_for_predicate(sh::DETAIL)
        .filter_map(|triple| as_subject(triple.object))
        .collect();
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    for triple in graph.iter() {
        let node = if triple.predicate == sh::RESULT {
            as_subject(triple.object)
        } else if (triple.predicate == rdf::TYPE
            && triple.object == TermRef::NamedNode(sh::VALIDATION_RESULT))
            || triple.predicate == sh::FOCUS_NODE
        {
            Some(triple.subject)
        } else {
            None
        };
        if let Some(node) = node.filter(|node| !details.contains(node)) {
            if seen.insert(node) {
                nodes.push(node);
            }
        }
    }
    nodes
}

fn as_subject(term: TermRef<'_>) -> Option<SubjectRef<'_>> {
    match term {
        TermRef::NamedNode(node) => Some(SubjectRef::NamedNode(node)),
        TermRef::BlankNode(node) => Some(SubjectRef::BlankNode(node)),
        _ => None,
    }
}

fn read_result(
    graph: &Graph,
    node: SubjectRef<'_>,
    prefixes: &PrefixMap,
    preferred_language: &str,
) -> ValidationResultRow {
    let object = |predicate: NamedNodeRef<'static>| graph.object_for_subject_predicate(node, predicate);
    let render = |predicate: NamedNodeRef<'static>| object(predicate).map(|term| prefixes.render(term));

    ValidationResultRow {
        severity: Severity::from_term(object(sh::RESULT_SEVERITY)),
        focus_node: render(sh::FOCUS_NODE).unwrap_or_default(),
        result_path: object(sh::RESULT_PATH).map(|path| path::render_path(graph, path, prefixes)),
        value: render(sh::VALUE),
        source_shape: render(sh::SOURCE_SHAPE),
        constraint_component: render(sh::SOURCE_CONSTRAINT_COMPONENT),
        message: pick_message(graph, node, preferred_language),
    }
}

/// The message in the preferred language, else an untagged one, else the
/// first in lexical order.
fn pick_message(graph: &Graph, node: SubjectRef<'_>, preferred_language: &str) -> Option<String> {
    let mut candidates: Vec<(Option<&str>, &str)> = graph
        .objects_for_subject_predicate(node, sh::RESULT_MESSAGE)
        .filter_map(|term| match term {
            TermRef::Literal(literal) => Some((literal.language(), literal.value())),
            _ => None,
        })
        .collect();
    candidates.sort();

    let preferred = preferred_language.to_ascii_lowercase();
    let in_preferred = |language: &str| {
        let language = language.to_ascii_lowercase();
        language == preferred || language.starts_with(&format!("{preferred}-"))
    };

    candidates
        .iter()
        .find(|(language, _)| language.is_some_and(|language| in_preferred(language)))
        .or_else(|| candidates.iter().find(|(language, _)| language.is_none()))
        .or_else(|| candidates.first())
        .map(|(_, value)| value.to_string())
}
