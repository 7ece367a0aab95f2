// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

use std::io::Read;
use std::path::{Path, PathBuf};

use argh::FromArgs;
use log::{error, info, warn};

use catalog_validator::input::is_remote_url;
use catalog_validator::report::export::{export, ExportFormat};
use catalog_validator::worker::Stage;
use catalog_validator::{
    AnalyzedReport, CatalogValidator, ExternalShapes, InputSource, Outcome, OutputSyntax,
    Preferences, Profile, ReportWorker, ResultFilter, RudofEngine, Settings, Severity, ShapeSet,
    ValidationRequest, ValidatorError, WorkerEvent,
};

#[derive(FromArgs)]
/// Validate DCAT data catalogs against SHACL shapes and analyze SHACL reports
struct CatalogValidatorArgs {
    /// log level
    #[argh(option, default = "log::Level::Info")]
    log_level: log::Level,

    /// JSON settings file
    #[argh(option)]
    settings: Option<PathBuf>,

    /// JSON file remembering the last profile and recently validated URLs
    #[argh(option)]
    preferences: Option<PathBuf>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Validate(ValidateArgs),
    Report(ReportArgs),
    Profiles(ProfilesArgs),
}

#[derive(FromArgs)]
/// Validate a catalog given as a file, a URL or `-` for standard input
#[argh(subcommand, name = "validate")]
struct ValidateArgs {
    /// file, http(s) URL or -
    #[argh(positional)]
    input: String,

    /// content syntax as a media type, name or extension
    #[argh(option)]
    syntax: Option<String>,

    /// dcat-ap, dcat-ap-es, nti-risp or custom
    #[argh(option, short = 'p')]
    profile: Option<Profile>,

    /// additional shapes file or URL, may be repeated
    #[argh(option)]
    shapes: Vec<String>,

    /// syntax of the matching --shapes document, in the same order
    #[argh(option)]
    shapes_syntax: Vec<String>,

    /// also validate the documents reached through owl:imports
    #[argh(switch)]
    load_imports: bool,

    /// syntax of the written report and content: turtle, n-triples, rdf/xml or json-ld
    #[argh(option)]
    output_syntax: Option<OutputSyntax>,

    /// write the validation report here
    #[argh(option)]
    report_out: Option<PathBuf>,

    /// write the aggregated shapes here
    #[argh(option)]
    shapes_out: Option<PathBuf>,

    /// write the normalized content here
    #[argh(option)]
    content_out: Option<PathBuf>,

    #[argh(option, default = "ExportFormat::Text")]
    /// text, csv or json
    format: ExportFormat,

    /// only show these severities, may be repeated
    #[argh(option)]
    severity: Vec<Severity>,

    /// only show results whose text contains this
    #[argh(option)]
    search: Option<String>,
}

#[derive(FromArgs)]
/// Analyze an existing SHACL validation report
#[argh(subcommand, name = "report")]
struct ReportArgs {
    /// report file or -
    #[argh(positional)]
    input: String,

    /// report syntax as a media type, name or extension
    #[argh(option)]
    syntax: Option<String>,

    #[argh(option, default = "ExportFormat::Text")]
    /// text, csv or json
    format: ExportFormat,

    /// only show these severities, may be repeated
    #[argh(option)]
    severity: Vec<Severity>,

    /// only show results from shapes matching this
    #[argh(option)]
    shape: Option<String>,

    /// only show results whose text contains this
    #[argh(option)]
    search: Option<String>,
}

#[derive(FromArgs)]
/// List the built-in profiles or print the shapes of one
#[argh(subcommand, name = "profiles")]
struct ProfilesArgs {
    /// print the aggregated shapes of this profile
    #[argh(option)]
    shapes: Option<Profile>,
}

fn read_stdin() -> Result<String, ValidatorError> {
    let mut content = String::new();
    std::io::stdin().read_to_string(&mut content)?;
    Ok(content)
}

fn input_source(input: &str) -> Result<InputSource, ValidatorError> {
    if input == "-" {
        Ok(InputSource::Text(read_stdin()?))
    } else if is_remote_url(input) {
        Ok(InputSource::Url(input.to_string()))
    } else {
        Ok(InputSource::File(PathBuf::from(input)))
    }
}

fn write_artifact(path: &Option<PathBuf>, content: &str) -> Result<(), ValidatorError> {
    if let Some(path) = path {
        std::fs::write(path, content)?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

async fn run_validate(
    args: ValidateArgs,
    settings: Settings,
    preferences: Option<&mut Preferences>,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let profile = args
        .profile
        .or_else(|| preferences.as_ref().and_then(|p| p.last_profile))
        .unwrap_or(settings.default_profile);

    let mut request = ValidationRequest::new(input_source(&args.input)?, profile);
    request.syntax = args.syntax;
    request.load_imports = args.load_imports;
    request.output_syntax = args.output_syntax;
    if args.shapes_syntax.len() > args.shapes.len() {
        return Err("more --shapes-syntax values than --shapes documents".into());
    }
    for (index, shapes) in args.shapes.iter().enumerate() {
        let syntax = args.shapes_syntax.get(index).cloned();
        request
            .external_shapes
            .push(ExternalShapes::new(input_source(shapes)?, syntax));
    }

    let validator = CatalogValidator::new(settings, RudofEngine);
    let outcome = validator.validate(request).await?;

    if let Some(preferences) = preferences {
        preferences.remember_profile(profile);
        if is_remote_url(&args.input) {
            preferences.remember_source(&args.input);
        }
        if let Err(e) = preferences.save() {
            warn!("Could not save preferences: {}", e);
        }
    }

    write_artifact(&args.report_out, &outcome.report)?;
    write_artifact(&args.shapes_out, &outcome.shapes)?;
    write_artifact(&args.content_out, &outcome.content)?;

    let filter = ResultFilter {
        severities: args.severity,
        text: args.search,
        ..ResultFilter::default()
    };
    print!("{}", export(&outcome.analyzed, &filter, args.format)?);
    Ok(outcome.analyzed.report.outcome)
}

async fn analyze_in_background(
    worker: &ReportWorker,
    input: &str,
    syntax: Option<String>,
) -> Result<AnalyzedReport, ValidatorError> {
    let mut events = if input == "-" {
        worker.analyze_text(read_stdin()?, syntax)
    } else {
        worker.analyze_file(Path::new(input).to_path_buf(), syntax)
    };

    while let Some(event) = events.recv().await {
        match event {
            WorkerEvent::Progress {
                stage: Stage::Reading,
                fraction: Some(fraction),
            } => log::debug!("Read {:.0}% of {}", fraction * 100.0, input),
            WorkerEvent::Progress { stage, .. } => log::debug!("{:?} {}", stage, input),
            WorkerEvent::Finished(analyzed) => return Ok(*analyzed),
            WorkerEvent::Failed(message) => return Err(ValidatorError::Worker(message)),
        }
    }
    Err(ValidatorError::Worker(
        "worker stopped without a result".to_string(),
    ))
}

async fn run_report(args: ReportArgs, settings: Settings) -> Result<Outcome, Box<dyn std::error::Error>> {
    let worker = ReportWorker::new(settings);
    let analyzed = analyze_in_background(&worker, &args.input, args.syntax).await?;

    let filter = ResultFilter {
        severities: args.severity,
        shape: args.shape,
        text: args.search,
        ..ResultFilter::default()
    };
    print!("{}", export(&analyzed, &filter, args.format)?);
    Ok(analyzed.report.outcome)
}

fn run_profiles(args: ProfilesArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.shapes {
        Some(profile) => print!("{}", ShapeSet::for_profile(profile, &[])?.to_turtle()?),
        None => {
            for profile in Profile::all() {
                println!("{:<12} {}", profile.id(), profile.label());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: CatalogValidatorArgs = argh::from_env();

    env_logger::Builder::new()
        .filter_level(args.log_level.to_level_filter())
        .init();

    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let mut preferences = args.preferences.as_deref().map(Preferences::open);

    let outcome = match args.command {
        Command::Validate(validate) => run_validate(validate, settings, preferences.as_mut()).await?,
        Command::Report(report) => run_report(report, settings).await?,
        Command::Profiles(profiles) => {
            run_profiles(profiles)?;
            return Ok(());
        }
    };

    if outcome == Outcome::Failure {
        error!("The content does not conform to the shapes");
        std::process::exit(1);
    }
    Ok(())
}
