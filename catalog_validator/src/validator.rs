// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

//! Orchestration of a validation run: load, normalize, aggregate shapes,
//! validate and analyze.

use log::{debug, info};

use crate::engine::{RudofEngine, ShaclEngine};
use crate::error::Result;
use crate::input::{InputSource, LoadedInput};
use crate::profiles::{Profile, ShapeSet};
use crate::rdf::{parse_document, OutputSyntax, RdfDocument};
use crate::report::{analyze, parse_report, AnalyzedReport, ReportOptions};
use crate::settings::Settings;
use crate::syntax::RdfSyntax;

/// A user-supplied shapes document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalShapes {
    pub source: InputSource,
    /// Media type, name or extension; resolved like the data when absent.
    pub syntax: Option<String>,
}

impl ExternalShapes {
    pub fn new(source: InputSource, syntax: Option<String>) -> Self {
        Self { source, syntax }
    }
}

impl From<InputSource> for ExternalShapes {
    fn from(source: InputSource) -> Self {
        Self::new(source, None)
    }
}

/// Everything a user chooses before pressing "validate".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    pub input: InputSource,
    /// Media type, name or extension; resolved from the content when absent.
    pub syntax: Option<String>,
    pub profile: Profile,
    pub external_shapes: Vec<ExternalShapes>,
    /// Follow `owl:imports` found in the data.
    pub load_imports: bool,
    /// Syntax of the downloadable report; the settings decide when absent.
    pub output_syntax: Option<OutputSyntax>,
}

impl ValidationRequest {
    pub fn new(input: InputSource, profile: Profile) -> Self {
        Self {
            input,
            syntax: None,
            profile,
            external_shapes: Vec::new(),
            load_imports: false,
            output_syntax: None,
        }
    }
}

/// The analyzed report plus the three downloads offered after a run.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub analyzed: AnalyzedReport,
    pub profile: Profile,
    pub output_syntax: OutputSyntax,
    /// The engine's report serialized in `output_syntax`.
    pub report: String,
    /// The aggregated shapes, in Turtle.
    pub shapes: String,
    /// The validated content after normalization and import merging.
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogValidator<E = RudofEngine> {
    settings: Settings,
    engine: E,
}

impl<E: ShaclEngine> CatalogValidator<E> {
    pub fn new(settings: Settings, engine: E) -> Self {
        Self { settings, engine }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validate content that is already in memory. Imports are not followed.
    pub fn validate_loaded(
        &self,
        data: &LoadedInput,
        external_shapes: &[LoadedInput],
        profile: Profile,
        output_syntax: Option<OutputSyntax>,
    ) -> Result<ValidationOutcome> {
        let document = parse_document(
            &data.content,
            data.syntax,
            data.base_iri.as_deref(),
            &data.origin,
        )?;
        self.validate_document(document, external_shapes, profile, output_syntax)
    }

    fn validate_document(
        &self,
        document: RdfDocument,
        external_shapes: &[LoadedInput],
        profile: Profile,
        output_syntax: Option<OutputSyntax>,
    ) -> Result<ValidationOutcome> {
        let output_syntax = output_syntax.unwrap_or(self.settings.output_syntax);
        let shapes = ShapeSet::for_profile(profile, external_shapes)?;
        let shapes_turtle = shapes.to_turtle()?;

        info!(
            "Validating {} triples against {} ({} shape documents)",
            document.len(),
            profile.label(),
            shapes.sources().len()
        );
        let report_document = self.engine.validate(&shapes_turtle, &document.to_ntriples()?)?;
        let analyzed = analyze(&report_document, &ReportOptions::from(&self.settings));
        info!(
            "Validation finished with {}: {} violations, {} warnings, {} infos",
            analyzed.report.outcome,
            analyzed.report.counts.violations,
            analyzed.report.counts.warnings,
            analyzed.report.counts.infos
        );

        Ok(ValidationOutcome {
            analyzed,
            profile,
            output_syntax,
            report: report_document.serialize(output_syntax)?,
            shapes: shapes_turtle,
            content: document.serialize(output_syntax)?,
        })
    }

    /// Import and analyze a report produced elsewhere.
    pub fn analyze_report(&self, text: &str, syntax: Option<&str>) -> Result<AnalyzedReport> {
        let syntax = RdfSyntax::resolve(syntax, None, text)?;
        debug!("Analyzing an imported {} report", syntax.label());
        parse_report(text, syntax, &ReportOptions::from(&self.settings))
    }
}

#[cfg(feature = "native")]
mod native {
    use std::collections::{HashSet, VecDeque};

    use log::{info, warn};

    use super::{CatalogValidator, ValidationOutcome, ValidationRequest};
    use crate::engine::ShaclEngine;
    use crate::error::{Result, ValidatorError};
    use crate::input::{load, InputSource};
    use crate::rdf::{parse_document, RdfDocument};

    impl<E: ShaclEngine + Clone + Send + 'static> CatalogValidator<E> {
        /// Load, follow imports, then validate on the blocking pool.
        pub async fn validate(&self, request: ValidationRequest) -> Result<ValidationOutcome> {
            let data = load(&request.input, request.syntax.as_deref(), &self.settings).await?;

            let mut external_shapes = Vec::with_capacity(request.external_shapes.len());
            for shapes in &request.external_shapes {
                external_shapes.push(load(&shapes.source, shapes.syntax.as_deref(), &self.settings).await?);
            }

            let mut document = parse_document(
                &data.content,
                data.syntax,
                data.base_iri.as_deref(),
                &data.origin,
            )?;
            if request.load_imports {
                self.merge_imports(&mut document).await;
            }

            let validator = self.clone();
            let (profile, output_syntax) = (request.profile, request.output_syntax);
            tokio::task::spawn_blocking(move || {
                validator.validate_document(document, &external_shapes, profile, output_syntax)
            })
            .await
            .map_err(|e| ValidatorError::Worker(e.to_string()))?
        }

        /// Pull in `owl:imports` targets breadth first, each IRI once and at
        /// most `max_imports` of them. Imports that fail to load are skipped.
        async fn merge_imports(&self, document: &mut RdfDocument) {
            let mut seen: HashSet<String> = HashSet::new();
            let mut queue: VecDeque<String> = document.owl_imports().into();
            let mut loaded = 0;

            while let Some(iri) = queue.pop_front() {
                if !seen.insert(iri.clone()) {
                    continue;
                }
                if loaded >= self.settings.max_imports {
                    warn!(
                        "Not following more than {} imports, skipping {}",
                        self.settings.max_imports, iri
                    );
                    continue;
                }
                loaded += 1;

                let imported = match load(&InputSource::Url(iri.clone()), None, &self.settings).await {
                    Ok(input) => parse_document(
                        &input.content,
                        input.syntax,
                        input.base_iri.as_deref(),
                        &input.origin,
                    ),
                    Err(e) => Err(e),
                };
                match imported {
                    Ok(imported) => {
                        info!("Merged {} triples imported from {}", imported.len(), iri);
                        queue.extend(imported.owl_imports());
                        document.merge(imported);
                    }
                    Err(e) => warn!("Skipping import {}: {}", iri, e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::{CatalogValidator, ExternalShapes, ValidationRequest};
    use crate::engine::{RudofEngine, ShaclEngine};
    use crate::error::{Result, ValidatorError};
    use crate::fetch::test_server::{serve, Route};
    use crate::input::{load_text, InputSource};
    use crate::profiles::Profile;
    use crate::rdf::{parse_document, OutputSyntax, RdfDocument};
    use crate::report::{Outcome, Severity};
    use crate::settings::Settings;
    use crate::syntax::RdfSyntax;

    const VALID_CATALOG: &str = include_str!("../testdata/valid_catalog.ttl");
    const VALID_CATALOG_XML: &str = include_str!("../testdata/valid_catalog.rdf");
    const INVALID_CATALOG: &str = include_str!("../testdata/invalid_catalog.ttl");
    const SAMPLE_REPORT: &str = include_str!("../testdata/sample_report.ttl");

    /// Returns a canned report and records what it was asked to validate.
    #[derive(Default, Clone)]
    struct CannedEngine {
        seen_data: RefCell<String>,
    }

    impl ShaclEngine for CannedEngine {
        fn validate(&self, _shapes: &str, data: &str) -> Result<RdfDocument> {
            *self.seen_data.borrow_mut() = data.to_string();
            parse_document(SAMPLE_REPORT, RdfSyntax::Turtle, None, "canned")
        }
    }

    fn validator() -> CatalogValidator {
        CatalogValidator::new(Settings::default(), RudofEngine)
    }

    #[test]
    fn valid_catalog_conforms() {
        let data = load_text(VALID_CATALOG, None).unwrap();
        let outcome = validator()
            .validate_loaded(&data, &[], Profile::DcatAp, None)
            .unwrap();
        assert!(outcome.analyzed.report.conforms, "{:?}", outcome.analyzed.report.results);
        assert_eq!(outcome.analyzed.report.outcome, Outcome::Success);
        assert!(outcome.shapes.contains("Dataset_Shape"));
    }

    #[test]
    fn rdf_xml_is_normalized_before_validation() {
        let data = load_text(VALID_CATALOG_XML, None).unwrap();
        assert_eq!(data.syntax, RdfSyntax::RdfXml);
        let outcome = validator()
            .validate_loaded(&data, &[], Profile::DcatAp, Some(OutputSyntax::NTriples))
            .unwrap();
        assert!(outcome.analyzed.report.conforms);
        assert!(outcome
            .content
            .contains("<http://example.org/catalog> <http://purl.org/dc/terms/publisher> <http://example.org/council> ."));
    }

    #[test]
    fn invalid_catalog_fails() {
        let data = load_text(INVALID_CATALOG, None).unwrap();
        let outcome = validator()
            .validate_loaded(&data, &[], Profile::DcatAp, None)
            .unwrap();
        let report = &outcome.analyzed.report;
        assert!(!report.conforms);
        assert_eq!(report.outcome, Outcome::Failure);
        assert!(report.results.iter().any(|row| {
            row.severity == Severity::Violation
                && row.result_path.as_deref() == Some("dct:description")
        }));
        assert!(report
            .results
            .iter()
            .any(|row| row.result_path.as_deref() == Some("dcat:theme")));
        assert!(outcome.report.contains("ValidationReport"));
    }

    #[test]
    fn custom_profile_needs_shapes() {
        let data = load_text(VALID_CATALOG, None).unwrap();
        let err = validator()
            .validate_loaded(&data, &[], Profile::Custom, None)
            .unwrap_err();
        assert!(matches!(err, ValidatorError::MissingShapes));
    }

    #[test]
    fn data_reaches_the_engine_as_ntriples() {
        let engine = CannedEngine::default();
        let validator = CatalogValidator::new(Settings::default(), engine);
        let data = load_text(VALID_CATALOG, None).unwrap();
        let outcome = validator
            .validate_loaded(&data, &[], Profile::NtiRisp, None)
            .unwrap();
        assert_eq!(outcome.analyzed.report.counts.total(), 7);
        assert_eq!(outcome.profile, Profile::NtiRisp);
        assert!(validator
            .engine
            .seen_data
            .borrow()
            .contains("<http://example.org/council> <http://xmlns.com/foaf/0.1/name> \"Example Town Council\" ."));
    }

    #[test]
    fn imported_reports_resolve_their_syntax() {
        let analyzed = validator().analyze_report(SAMPLE_REPORT, None).unwrap();
        assert_eq!(analyzed.report.counts.warnings, 2);
        let err = validator()
            .analyze_report(SAMPLE_REPORT, Some("text/n3"))
            .unwrap_err();
        assert!(matches!(err, ValidatorError::UnsupportedSyntax(_)), "{err}");
    }

    #[tokio::test]
    async fn validates_a_request() {
        let mut request = ValidationRequest::new(
            InputSource::Text(INVALID_CATALOG.to_string()),
            Profile::DcatApEs,
        );
        request.syntax = Some("text/turtle".to_string());
        let outcome = validator().validate(request).await.unwrap();
        assert_eq!(outcome.analyzed.report.outcome, Outcome::Failure);
        assert!(outcome
            .analyzed
            .report
            .results
            .iter()
            .any(|row| row.focus_node == "<http://example.org/catalog>"
                && row.result_path.as_deref() == Some("dct:issued")));
    }

    #[tokio::test]
    async fn unreachable_imports_are_skipped() {
        let catalog = format!(
            "@prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
             <http://example.org/catalog> owl:imports <http://127.0.0.1:9/missing.ttl> .\n{VALID_CATALOG}"
        );
        let settings = Settings {
            fetch_timeout_secs: 2,
            ..Settings::default()
        };
        let mut request = ValidationRequest::new(InputSource::Text(catalog), Profile::DcatAp);
        request.load_imports = true;
        let outcome = CatalogValidator::new(settings, RudofEngine)
            .validate(request)
            .await
            .unwrap();
        assert!(outcome.analyzed.report.conforms);
    }

    #[tokio::test]
    async fn imports_are_followed_transitively_once_each() {
        let (base, requested) = serve(vec![
            Route::new(
                "/a.ttl",
                "text/turtle",
                "@prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
                 @prefix dct: <http://purl.org/dc/terms/> .\n\
                 <a> dct:title \"From A\" ; owl:imports <b.ttl> .\n",
            ),
            Route::new(
                "/b.ttl",
                "text/turtle",
                "@prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
                 @prefix dct: <http://purl.org/dc/terms/> .\n\
                 <b> dct:title \"From B\" ; owl:imports <a.ttl> .\n",
            ),
        ])
        .await;
        let catalog = format!(
            "@prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
             <http://example.org/catalog> owl:imports <{base}/a.ttl> , <{base}/a.ttl> .\n{VALID_CATALOG}"
        );
        let mut request = ValidationRequest::new(InputSource::Text(catalog), Profile::DcatAp);
        request.load_imports = true;
        request.output_syntax = Some(OutputSyntax::NTriples);

        let validator = CatalogValidator::new(Settings::default(), CannedEngine::default());
        let outcome = validator.validate(request).await.unwrap();

        assert!(outcome
            .content
            .contains(&format!("<{base}/a> <http://purl.org/dc/terms/title> \"From A\" .")));
        assert!(outcome
            .content
            .contains(&format!("<{base}/b> <http://purl.org/dc/terms/title> \"From B\" .")));
        assert_eq!(*requested.lock().unwrap(), vec!["/a.ttl", "/b.ttl"]);
    }

    #[tokio::test]
    async fn imports_stop_at_the_limit() {
        let (base, requested) = serve(vec![
            Route::new(
                "/a.ttl",
                "text/turtle",
                "<a> <http://www.w3.org/2002/07/owl#imports> <b.ttl> .\n",
            ),
            Route::new("/b.ttl", "text/turtle", "<b> <http://purl.org/dc/terms/title> \"B\" .\n"),
        ])
        .await;
        let catalog = format!(
            "<http://example.org/catalog> <http://www.w3.org/2002/07/owl#imports> <{base}/a.ttl> .\n"
        );
        let settings = Settings {
            max_imports: 1,
            ..Settings::default()
        };
        let mut request = ValidationRequest::new(InputSource::Text(catalog), Profile::DcatAp);
        request.load_imports = true;
        request.output_syntax = Some(OutputSyntax::NTriples);

        let outcome = CatalogValidator::new(settings, CannedEngine::default())
            .validate(request)
            .await
            .unwrap();
        assert_eq!(*requested.lock().unwrap(), vec!["/a.ttl"]);
        assert!(!outcome.content.contains("\"B\""));
    }

    #[tokio::test]
    async fn external_shapes_keep_their_syntax() {
        let shapes = "@prefix sh: <http://www.w3.org/ns/shacl#> .\n\
                      @prefix ex: <http://example.org/> .\n\
                      ex:ThingShape a sh:NodeShape ; sh:targetClass ex:Thing .\n";
        let mut request =
            ValidationRequest::new(InputSource::Text(VALID_CATALOG.to_string()), Profile::Custom);
        request.external_shapes.push(ExternalShapes::new(
            InputSource::Text(shapes.to_string()),
            Some("text/turtle".to_string()),
        ));

        let validator = CatalogValidator::new(Settings::default(), CannedEngine::default());
        let outcome = validator.validate(request.clone()).await.unwrap();
        assert!(outcome.shapes.contains("ThingShape"));

        request.external_shapes[0].syntax = Some("application/n-triples".to_string());
        let err = validator.validate(request).await.unwrap_err();
        assert!(
            matches!(err, ValidatorError::Parse { syntax: RdfSyntax::NTriples, .. }),
            "{err}"
        );
    }
}
