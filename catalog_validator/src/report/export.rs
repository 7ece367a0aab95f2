// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

//! Export of analyzed reports as CSV, JSON or a plain text summary.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::Serialize;

use super::{AnalyzedReport, ResultFilter, ResultGroup, ValidationResultRow};
use crate::error::Result;

pub const CSV_HEADER: [&str; 7] = [
    "severity",
    "focus_node",
    "result_path",
    "value",
    "source_shape",
    "constraint_component",
    "message",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    #[default]
    Text,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "text" | "txt" => Ok(ExportFormat::Text),
            other => Err(format!("unknown export format '{other}', expected csv, json or text")),
        }
    }
}

/// Display rows in RFC 4180 CSV, header first.
pub struct CsvFormatter<'a> {
    pub rows: Vec<&'a ValidationResultRow>,
}

impl Display for CsvFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&CSV_HEADER.join(","))?;
        f.write_str("\r\n")?;

        for row in &self.rows {
            let severity = row.severity.to_string();
            let fields = [
                Some(severity.as_str()),
                Some(row.focus_node.as_str()),
                row.result_path.as_deref(),
                row.value.as_deref(),
                row.source_shape.as_deref(),
                row.constraint_component.as_deref(),
                row.message.as_deref(),
            ];
            for (index, field) in fields.into_iter().enumerate() {
                if index > 0 {
                    f.write_str(",")?;
                }
                write_csv_field(f, field.unwrap_or_default())?;
            }
            f.write_str("\r\n")?;
        }
        Ok(())
    }
}

fn write_csv_field(f: &mut fmt::Formatter<'_>, field: &str) -> fmt::Result {
    if field.contains([',', '"', '\r', '\n']) {
        write!(f, "\"{}\"", field.replace('"', "\"\""))
    } else {
        f.write_str(field)
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    conforms: bool,
    outcome: super::Outcome,
    counts: super::SeverityCounts,
    results: Vec<&'a ValidationResultRow>,
    groups: Vec<&'a ResultGroup>,
}

/// Display a short human readable summary, one line per group.
pub struct TextSummary<'a> {
    pub analyzed: &'a AnalyzedReport,
    pub groups: Vec<&'a ResultGroup>,
}

impl Display for TextSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = &self.analyzed.report;
        writeln!(
            f,
            "{}: {} violations, {} warnings, {} infos (conforms: {})",
            report.outcome,
            report.counts.violations,
            report.counts.warnings,
            report.counts.infos,
            report.conforms
        )?;
        if report.truncated {
            writeln!(f, "Only the first {} results are listed in detail", report.results.len())?;
        }
        for group in &self.groups {
            writeln!(
                f,
                "[{}] x{} {} {}: {}",
                group.severity,
                group.count,
                group.source_shape.as_deref().unwrap_or("-"),
                group.constraint_component.as_deref().unwrap_or("-"),
                group.message.as_deref().unwrap_or("(no message)")
            )?;
            for path in &group.paths {
                writeln!(f, "    path {path}")?;
            }
        }
        Ok(())
    }
}

pub fn to_csv(analyzed: &AnalyzedReport, filter: &ResultFilter) -> String {
    CsvFormatter {
        rows: analyzed.exported(filter),
    }
    .to_string()
}

pub fn to_json(analyzed: &AnalyzedReport, filter: &ResultFilter) -> Result<String> {
    let report = &analyzed.report;
    let export = JsonExport {
        conforms: report.conforms,
        outcome: report.outcome,
        counts: report.counts,
        results: analyzed.exported(filter),
        groups: filter.apply_groups(&analyzed.groups),
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Just the rows that pass the filter, as a JSON array.
pub fn rows_to_json(analyzed: &AnalyzedReport, filter: &ResultFilter) -> Result<String> {
    Ok(serde_json::to_string_pretty(&analyzed.exported(filter))?)
}

pub fn groups_to_json(analyzed: &AnalyzedReport, filter: &ResultFilter) -> Result<String> {
    Ok(serde_json::to_string_pretty(&filter.apply_groups(&analyzed.groups))?)
}

pub fn to_text(analyzed: &AnalyzedReport, filter: &ResultFilter) -> String {
    TextSummary {
        analyzed,
        groups: filter.apply_groups(&analyzed.groups),
    }
    .to_string()
}

pub fn export(analyzed: &AnalyzedReport, filter: &ResultFilter, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Csv => Ok(to_csv(analyzed, filter)),
        ExportFormat::Json => to_json(analyzed, filter),
        ExportFormat::Text => Ok(to_text(analyzed, filter)),
    }
}

#[cfg(test)]
mod tests {
    use super::{export, groups_to_json, rows_to_json, to_csv, to_json, to_text, ExportFormat};
    use crate::report::{parse_report, ReportOptions, ResultFilter, Severity};
    use crate::syntax::RdfSyntax;

    const SAMPLE_REPORT: &str = include_str!("../../testdata/sample_report.ttl");

    #[test]
    fn csv_quotes_where_needed() {
        let analyzed = parse_report(SAMPLE_REPORT, RdfSyntax::Turtle, &ReportOptions::default()).unwrap();
        let csv = to_csv(&analyzed, &ResultFilter::default());
        let lines: Vec<&str> = csv.split("\r\n").filter(|line| !line.is_empty()).collect();

        assert_eq!(
            lines[0],
            "severity,focus_node,result_path,value,source_shape,constraint_component,message"
        );
        assert_eq!(lines.len(), 8);
        assert!(lines
            .iter()
            .any(|line| line.ends_with(",\"Value \"\"yesterday\"\" is not a valid xsd:date\"")));
    }

    #[test]
    fn json_honors_the_filter() {
        let analyzed = parse_report(SAMPLE_REPORT, RdfSyntax::Turtle, &ReportOptions::default()).unwrap();
        let filter = ResultFilter {
            severities: vec![Severity::Warning],
            ..ResultFilter::default()
        };
        let json: serde_json::Value = serde_json::from_str(&to_json(&analyzed, &filter).unwrap()).unwrap();
        assert_eq!(json["outcome"], "FAILURE");
        assert_eq!(json["counts"]["violations"], 4);
        assert_eq!(json["results"].as_array().unwrap().len(), 2);
        assert_eq!(json["groups"].as_array().unwrap().len(), 1);
        assert_eq!(json["groups"][0]["count"], 2);

        let rows: serde_json::Value =
            serde_json::from_str(&rows_to_json(&analyzed, &filter).unwrap()).unwrap();
        assert_eq!(rows[0]["severity"], "warning");
        let groups: serde_json::Value =
            serde_json::from_str(&groups_to_json(&analyzed, &ResultFilter::default()).unwrap()).unwrap();
        assert_eq!(groups.as_array().unwrap().len(), analyzed.groups.len());
    }

    #[test]
    fn downloads_ignore_the_display_limit() {
        let options = ReportOptions {
            max_detailed_results: 2,
            ..ReportOptions::default()
        };
        let analyzed = parse_report(SAMPLE_REPORT, RdfSyntax::Turtle, &options).unwrap();
        assert!(analyzed.report.truncated);
        let total = analyzed.report.counts.total();

        let csv = to_csv(&analyzed, &ResultFilter::default());
        let rows = csv.split("\r\n").filter(|line| !line.is_empty()).count() - 1;
        assert_eq!(rows, total);

        let json: serde_json::Value =
            serde_json::from_str(&to_json(&analyzed, &ResultFilter::default()).unwrap()).unwrap();
        assert_eq!(json["results"].as_array().unwrap().len(), total);
        let rows: serde_json::Value =
            serde_json::from_str(&rows_to_json(&analyzed, &ResultFilter::default()).unwrap()).unwrap();
        assert_eq!(rows.as_array().unwrap().len(), total);

        assert!(to_text(&analyzed, &ResultFilter::default())
            .contains("Only the first 2 results are listed in detail"));
    }

    #[test]
    fn text_summary_lists_groups() {
        let analyzed = parse_report(SAMPLE_REPORT, RdfSyntax::Turtle, &ReportOptions::default()).unwrap();
        let text = to_text(&analyzed, &ResultFilter::default());
        assert!(text.starts_with("FAILURE: 4 violations, 2 warnings, 1 infos"));
        assert!(text.contains("x2"));
        assert_eq!(
            export(&analyzed, &ResultFilter::default(), ExportFormat::Text).unwrap(),
            text
        );
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
