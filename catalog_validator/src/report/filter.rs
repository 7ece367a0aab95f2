// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{ResultGroup, Severity, SeverityCounts, ValidationResultRow};

/// Narrows the rows shown to the user. Empty criteria match everything and
/// text comparisons ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultFilter {
    pub severities: Vec<Severity>,
    pub shape: Option<String>,
    pub component: Option<String>,
    pub focus_node: Option<String>,
    /// Free text searched in focus node, path, value, message and shape.
    pub text: Option<String>,
}

impl ResultFilter {
    pub fn is_empty(&self) -> bool {
        self == &ResultFilter::default()
    }

    pub fn matches(&self, row: &ValidationResultRow) -> bool {
        if !self.severities.is_empty() && !self.severities.contains(&row.severity) {
            return false;
        }
        if !field_matches(self.shape.as_deref(), row.source_shape.as_deref()) {
            return false;
        }
        if !field_matches(self.component.as_deref(), row.constraint_component.as_deref()) {
            return false;
        }
        if !field_matches(self.focus_node.as_deref(), Some(&row.focus_node)) {
            return false;
        }
        match needle(self.text.as_deref()) {
            None => true,
            Some(needle) => [
                Some(row.focus_node.as_str()),
                row.result_path.as_deref(),
                row.value.as_deref(),
                row.message.as_deref(),
                row.source_shape.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|haystack| haystack.to_lowercase().contains(&needle)),
        }
    }

    pub fn apply<'a>(&self, rows: &'a [ValidationResultRow]) -> Vec<&'a ValidationResultRow> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }

    /// Groups keep their own members, so only the group level criteria apply.
    pub fn apply_groups<'a>(&self, groups: &'a [ResultGroup]) -> Vec<&'a ResultGroup> {
        groups
            .iter()
            .filter(|group| self.severities.is_empty() || self.severities.contains(&group.severity))
            .filter(|group| field_matches(self.shape.as_deref(), group.source_shape.as_deref()))
            .filter(|group| {
                field_matches(self.component.as_deref(), group.constraint_component.as_deref())
            })
            .filter(|group| match needle(self.text.as_deref()) {
                None => true,
                Some(needle) => group
                    .message
                    .as_deref()
                    .is_some_and(|message| message.to_lowercase().contains(&needle)),
            })
            .collect()
    }
}

fn needle(criterion: Option<&str>) -> Option<String> {
    criterion
        .map(str::trim)
        .filter(|criterion| !criterion.is_empty())
        .map(str::to_lowercase)
}

fn field_matches(criterion: Option<&str>, value: Option<&str>) -> bool {
    match needle(criterion) {
        None => true,
        Some(needle) => value.is_some_and(|value| value.to_lowercase().contains(&needle)),
    }
}

/// The distinct values the filter criteria can take in a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub severities: SeverityCounts,
    pub shapes: Vec<String>,
    pub components: Vec<String>,
}

impl Facets {
    pub fn of(rows: &[ValidationResultRow]) -> Self {
        let shapes: BTreeSet<&str> = rows.iter().filter_map(|row| row.source_shape.as_deref()).collect();
        let components: BTreeSet<&str> = rows
            .iter()
            .filter_map(|row| row.constraint_component.as_deref())
            .collect();
        Facets {
            severities: SeverityCounts::of(rows),
            shapes: shapes.into_iter().map(str::to_string).collect(),
            components: components.into_iter().map(str::to_string).collect(),
        }
    }
}
