// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

//! Grouping of results that report the same problem on different nodes.
//!
//! Two results belong to the same group when they share severity, source
//! shape, constraint component and message fingerprint. The fingerprint is
//! taken over the message with its variable parts (IRIs, quoted literals,
//! numbers) replaced, so "Value 3 is not ..." and "Value 7 is not ..." land
//! together.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Severity, ValidationResultRow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultGroup {
    pub severity: Severity,
    pub source_shape: Option<String>,
    pub constraint_component: Option<String>,
    pub fingerprint: String,
    /// Message of the first member, as a representative.
    pub message: Option<String>,
    pub count: usize,
    /// Distinct focus nodes, in first-seen order.
    pub focus_nodes: Vec<String>,
    /// Distinct result paths, in first-seen order.
    pub paths: Vec<String>,
}

type GroupKey = (Severity, Option<String>, Option<String>, String);

pub fn group_results(rows: &[ValidationResultRow]) -> Vec<ResultGroup> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(ResultGroup, HashSet<String>, HashSet<String>)> = Vec::new();

    for row in rows {
        let fingerprint = message_fingerprint(row.message.as_deref());
        let key = (
            row.severity,
            row.source_shape.clone(),
            row.constraint_component.clone(),
            fingerprint.clone(),
        );
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((
                ResultGroup {
                    severity: row.severity,
                    source_shape: row.source_shape.clone(),
                    constraint_component: row.constraint_component.clone(),
                    fingerprint,
                    message: row.message.clone(),
                    count: 0,
                    focus_nodes: Vec::new(),
                    paths: Vec::new(),
                },
                HashSet::new(),
                HashSet::new(),
            ));
            groups.len() - 1
        });

        let (group, focus_nodes, paths) = &mut groups[slot];
        group.count += 1;
        if focus_nodes.insert(row.focus_node.clone()) {
            group.focus_nodes.push(row.focus_node.clone());
        }
        if let Some(path) = &row.result_path {
            if paths.insert(path.clone()) {
                group.paths.push(path.clone());
            }
        }
    }

    let mut groups: Vec<ResultGroup> = groups.into_iter().map(|(group, _, _)| group).collect();
    groups.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.source_shape.cmp(&b.source_shape))
            .then_with(|| a.constraint_component.cmp(&b.constraint_component))
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });
    groups
}

/// First 16 hex digits of the SHA-256 of the normalized message.
pub fn message_fingerprint(message: Option<&str>) -> String {
    let normalized = normalize_message(message.unwrap_or_default());
    let digest = Sha256::digest(normalized.as_bytes());
    digest[..8].iter().map(|byte| format!("{byte:02x}")).collect()
}

fn normalize_message(message: &str) -> String {
    let mut normalized = String::with_capacity(message.len());
    let mut chars = message.chars().peekable();
    let mut pending_space = false;
    let mut previous: Option<char> = None;

    while let Some(c) = chars.next() {
        // a single quote only opens a literal at the start of a token
        let starts_token = previous
            .map_or(true, |p| p.is_whitespace() || matches!(p, '(' | '[' | ':' | '='));
        previous = Some(c);
        match c {
            c if c.is_whitespace() => pending_space = true,
            '<' => {
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '>' {
                        closed = true;
                        break;
                    }
                }
                push(&mut normalized, if closed { "<iri>" } else { "<" }, &mut pending_space);
            }
            '"' => {
                skip_literal(&mut chars, '"');
                push(&mut normalized, "\"lit\"", &mut pending_space);
            }
            '\'' if starts_token => {
                skip_literal(&mut chars, '\'');
                push(&mut normalized, "\"lit\"", &mut pending_space);
            }
            c if c.is_ascii_digit() => {
                while chars
                    .peek()
                    .is_some_and(|next| next.is_ascii_digit() || *next == '.' || *next == ',')
                {
                    chars.next();
                }
                push(&mut normalized, "#", &mut pending_space);
            }
            c if c.is_alphabetic() => {
                let mut word = String::from(c);
                while let Some(next) = chars.peek().copied() {
                    if next.is_whitespace() || matches!(next, '<' | '"') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                if let Some(last) = word.chars().last() {
                    previous = Some(last);
                }
                if word.starts_with("http://") || word.starts_with("https://") || word.starts_with("urn:") {
                    push(&mut normalized, "<iri>", &mut pending_space);
                } else {
                    push(&mut normalized, &word.to_lowercase(), &mut pending_space);
                }
            }
            other => {
                let mut buffer = [0u8; 4];
                push(&mut normalized, other.encode_utf8(&mut buffer), &mut pending_space);
            }
        }
    }
    normalized
}

/// Consume up to and including the closing `quote`. A closing single quote
/// must end a token, so apostrophes inside the literal survive.
fn skip_literal(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) {
    while let Some(next) = chars.next() {
        if next == quote
            && (quote == '"' || chars.peek().map_or(true, |after| !after.is_alphanumeric()))
        {
            break;
        }
    }
}

fn push(normalized: &mut String, token: &str, pending_space: &mut bool) {
    if *pending_space && !normalized.is_empty() {
        normalized.push(' ');
    }
    *pending_space = false;
    normalized.push_str(token);
}
