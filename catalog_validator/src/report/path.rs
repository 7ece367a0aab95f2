// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

//! Rendering of `sh:resultPath` values as SPARQL property paths.

use oxrdf::{Graph, NamedNodeRef, SubjectRef, TermRef};

use crate::rdf::PrefixMap;
use crate::vocab::{rdf, sh};

// deeper structures are almost certainly cyclic
const MAX_DEPTH: usize = 16;

pub fn render_path(graph: &Graph, path: TermRef<'_>, prefixes: &PrefixMap) -> String {
    render(graph, path, prefixes, 0).text
}

struct Rendered {
    text: String,
    /// Top level is a `/` sequence and needs parentheses under an operator.
    sequence: bool,
}

impl Rendered {
    fn step(text: String) -> Self {
        Self {
            text,
            sequence: false,
        }
    }

    fn operand(self) -> String {
        if self.sequence {
            format!("({})", self.text)
        } else {
            self.text
        }
    }
}

fn render(graph: &Graph, path: TermRef<'_>, prefixes: &PrefixMap, depth: usize) -> Rendered {
    let node = match path {
        TermRef::BlankNode(node) if depth < MAX_DEPTH => node,
        other => return Rendered::step(prefixes.render(other)),
    };
    let subject = SubjectRef::BlankNode(node);
    let single = |predicate: NamedNodeRef<'static>| graph.object_for_subject_predicate(subject, predicate);
    let operand = |inner| render(graph, inner, prefixes, depth + 1).operand();

    if let Some(inner) = single(sh::INVERSE_PATH) {
        return Rendered::step(format!("^{}", operand(inner)));
    }
    if let Some(inner) = single(sh::ZERO_OR_MORE_PATH) {
        return Rendered::step(format!("{}*", operand(inner)));
    }
    if let Some(inner) = single(sh::ONE_OR_MORE_PATH) {
        return Rendered::step(format!("{}+", operand(inner)));
    }
    if let Some(inner) = single(sh::ZERO_OR_ONE_PATH) {
        return Rendered::step(format!("{}?", operand(inner)));
    }
    if let Some(list) = single(sh::ALTERNATIVE_PATH) {
        let members: Vec<String> = list_members(graph, list)
            .into_iter()
            .map(|member| render(graph, member, prefixes, depth + 1).text)
            .collect();
        return Rendered::step(format!("({})", members.join("|")));
    }
    if single(rdf::FIRST).is_some() {
        let members: Vec<String> = list_members(graph, path)
            .into_iter()
            .map(|member| render(graph, member, prefixes, depth + 1).text)
            .collect();
        return Rendered {
            sequence: members.len() > 1,
            text: members.join("/"),
        };
    }
    Rendered::step(prefixes.render(path))
}

/// Members of an RDF collection, stopping at `rdf:nil` or a malformed cell.
fn list_members<'a>(graph: &'a Graph, head: TermRef<'a>) -> Vec<TermRef<'a>> {
    let mut members = Vec::new();
    let mut current = head;
    while members.len() < MAX_DEPTH * 4 {
        let cell = match current {
            TermRef::BlankNode(node) => SubjectRef::BlankNode(node),
            TermRef::NamedNode(node) if node != rdf::NIL => SubjectRef::NamedNode(node),
            _ => break,
        };
        match graph.object_for_subject_predicate(cell, rdf::FIRST) {
            Some(first) => members.push(first),
            None => break,
        }
        match graph.object_for_subject_predicate(cell, rdf::REST) {
            Some(rest) => current = rest,
            None => break,
        }
    }
    members
}
