// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

//! Off-thread analysis of large validation reports.
//!
//! Parsing and grouping a report with hundreds of thousands of results takes
//! long enough to freeze an interactive caller. [`ReportWorker`] does the work
//! on tokio's blocking pool and streams [`WorkerEvent`]s back.

use std::path::PathBuf;

use log::{debug, error, info};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::input::{load_text, read_chunked, LoadedInput, ReadProgress};
use crate::report::{parse_report, AnalyzedReport, ReportOptions};
use crate::settings::Settings;

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reading,
    Parsing,
    Analyzing,
}

#[derive(Debug)]
pub enum WorkerEvent {
    /// `fraction` is only known while reading input of known size.
    Progress { stage: Stage, fraction: Option<f64> },
    Finished(Box<AnalyzedReport>),
    Failed(String),
}

enum Job {
    File(PathBuf),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct ReportWorker {
    settings: Settings,
}

impl ReportWorker {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Must be called from within a tokio runtime.
    pub fn analyze_file(&self, path: PathBuf, syntax: Option<String>) -> mpsc::Receiver<WorkerEvent> {
        self.spawn(Job::File(path), syntax)
    }

    pub fn analyze_text(&self, text: String, syntax: Option<String>) -> mpsc::Receiver<WorkerEvent> {
        self.spawn(Job::Text(text), syntax)
    }

    fn spawn(&self, job: Job, syntax: Option<String>) -> mpsc::Receiver<WorkerEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let settings = self.settings.clone();
        tokio::task::spawn_blocking(move || {
            let event = match run(job, syntax.as_deref(), &settings, &tx) {
                Ok(analyzed) => WorkerEvent::Finished(Box::new(analyzed)),
                Err(e) => {
                    error!("Report analysis failed: {}", e);
                    WorkerEvent::Failed(e.to_string())
                }
            };
            if tx.blocking_send(event).is_err() {
                debug!("Report receiver dropped before the result was delivered");
            }
        });
        rx
    }
}

fn run(
    job: Job,
    syntax: Option<&str>,
    settings: &Settings,
    tx: &mpsc::Sender<WorkerEvent>,
) -> Result<AnalyzedReport> {
    let progress = |stage: Stage, fraction: Option<f64>| {
        // progress is advisory, a full channel just skips an update
        let _ = tx.try_send(WorkerEvent::Progress { stage, fraction });
    };

    let input = match job {
        Job::Text(text) => load_text(&text, syntax)?,
        Job::File(path) => {
            let file = std::fs::File::open(&path)?;
            let total = file.metadata()?.len();
            let content = read_chunked(
                file,
                settings.chunk_size,
                settings.max_input_bytes,
                Some(total),
                |read: ReadProgress| progress(Stage::Reading, read.fraction()),
            )?;
            let name = path.display().to_string();
            LoadedInput::new(content, syntax, Some(&name), name.clone())?
        }
    };

    progress(Stage::Parsing, None);
    info!("Analyzing {} report from {}", input.syntax.label(), input.origin);
    let analyzed = parse_report(&input.content, input.syntax, &ReportOptions::from(settings))?;
    progress(Stage::Analyzing, Some(1.0));
    Ok(analyzed)
}
