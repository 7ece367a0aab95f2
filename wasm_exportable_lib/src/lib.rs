// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

//! Browser entry points. Everything crosses the boundary as JSON or Turtle
//! strings; failures are thrown as their error message.

use catalog_validator::input::{load_base64, load_text, LoadedInput};
use catalog_validator::report::export::{export, ExportFormat};
use catalog_validator::{
    AnalyzedReport, CatalogValidator, OutputSyntax, Profile, ResultFilter, RudofEngine, Settings,
    ShapeSet,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct ValidationResponse<'a> {
    profile: &'a str,
    analyzed: &'a AnalyzedReport,
    report: &'a str,
    shapes: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ProfileEntry {
    id: &'static str,
    label: &'static str,
}

fn settings(settings_json: Option<String>) -> Result<Settings, String> {
    match settings_json.filter(|json| !json.trim().is_empty()) {
        Some(json) => Settings::from_json(&json).map_err(|e| e.to_string()),
        None => Ok(Settings::default()),
    }
}

fn filter(filter_json: Option<String>) -> Result<ResultFilter, String> {
    match filter_json.filter(|json| !json.trim().is_empty()) {
        Some(json) => serde_json::from_str(&json).map_err(|e| e.to_string()),
        None => Ok(ResultFilter::default()),
    }
}

fn load(content: &str, syntax: Option<&str>, base64: bool) -> Result<LoadedInput, String> {
    if base64 {
        load_base64(content, syntax)
    } else {
        load_text(content, syntax)
    }
    .map_err(|e| e.to_string())
}

#[wasm_bindgen]
/// Validate pasted or uploaded catalog content against a profile and return
/// the analyzed report together with the downloadable artifacts.
pub fn validate_catalog(
    content: &str,
    syntax: Option<String>,
    profile: &str,
    external_shapes: Option<String>,
    external_shapes_syntax: Option<String>,
    output_syntax: Option<String>,
    settings_json: Option<String>,
) -> Result<String, String> {
    let profile: Profile = profile.parse().map_err(|e: catalog_validator::ValidatorError| e.to_string())?;
    let output_syntax = output_syntax
        .filter(|syntax| !syntax.trim().is_empty())
        .map(|syntax| syntax.parse::<OutputSyntax>())
        .transpose()
        .map_err(|e| e.to_string())?;

    let data = load(content, syntax.as_deref(), false)?;
    let shapes = match external_shapes.filter(|shapes| !shapes.trim().is_empty()) {
        Some(shapes) => vec![load(&shapes, external_shapes_syntax.as_deref(), false)?],
        None => Vec::new(),
    };

    let validator = CatalogValidator::new(settings(settings_json)?, RudofEngine);
    let outcome = validator
        .validate_loaded(&data, &shapes, profile, output_syntax)
        .map_err(|e| e.to_string())?;

    serde_json::to_string(&ValidationResponse {
        profile: profile.id(),
        analyzed: &outcome.analyzed,
        report: &outcome.report,
        shapes: &outcome.shapes,
        content: &outcome.content,
    })
    .map_err(|e| e.to_string())
}

#[wasm_bindgen]
/// Import an existing SHACL report, given as text or BASE64.
pub fn analyze_report(
    report: &str,
    syntax: Option<String>,
    base64: bool,
    settings_json: Option<String>,
) -> Result<String, String> {
    let input = load(report, syntax.as_deref(), base64)?;
    let validator = CatalogValidator::new(settings(settings_json)?, RudofEngine);
    let analyzed = validator
        .analyze_report(&input.content, Some(input.syntax.media_type()))
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&analyzed).map_err(|e| e.to_string())
}

#[wasm_bindgen]
/// Render a report as `csv`, `json` or `text` after applying a JSON filter.
pub fn export_report(
    report: &str,
    syntax: Option<String>,
    format: &str,
    filter_json: Option<String>,
) -> Result<String, String> {
    let format: ExportFormat = format.parse()?;
    let filter = filter(filter_json)?;
    let input = load(report, syntax.as_deref(), false)?;
    let analyzed = CatalogValidator::new(Settings::default(), RudofEngine)
        .analyze_report(&input.content, Some(input.syntax.media_type()))
        .map_err(|e| e.to_string())?;
    export(&analyzed, &filter, format).map_err(|e| e.to_string())
}

#[wasm_bindgen]
/// The aggregated shapes of a built-in profile, in Turtle.
pub fn get_profile_shapes(profile: &str) -> Result<String, String> {
    let profile: Profile = profile.parse().map_err(|e: catalog_validator::ValidatorError| e.to_string())?;
    ShapeSet::for_profile(profile, &[])
        .and_then(|shapes| shapes.to_turtle())
        .map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn list_profiles() -> String {
    let profiles: Vec<ProfileEntry> = Profile::all()
        .into_iter()
        .map(|profile| ProfileEntry {
            id: profile.id(),
            label: profile.label(),
        })
        .collect();
    serde_json::to_string(&profiles).unwrap_or_else(|_| "[]".to_string())
}
