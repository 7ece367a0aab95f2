// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;

use base64::Engine;
use log::debug;
use oxrdf::NamedNode;

use crate::error::{Result, ValidatorError};
use crate::syntax::RdfSyntax;

/// Origin label for content that has no file name or URL.
pub const DIRECT_INPUT_ORIGIN: &str = "-";

/// Where the content to validate comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Pasted into the editor.
    Text(String),
    File(PathBuf),
    Url(String),
    Base64(String),
}

impl InputSource {
    /// Interpret a raw value the way the REST input model does: the caller
    /// may name the embedding, otherwise anything that is an http(s) URL is
    /// fetched and everything else is literal content.
    pub fn from_content(content: &str, embedding: Option<EmbeddingMethod>) -> Self {
        match embedding.unwrap_or_else(|| EmbeddingMethod::detect(content)) {
            EmbeddingMethod::Url => InputSource::Url(content.trim().to_string()),
            EmbeddingMethod::Base64 => InputSource::Base64(content.to_string()),
            EmbeddingMethod::String => InputSource::Text(content.to_string()),
        }
    }

    pub fn origin(&self) -> String {
        match self {
            InputSource::File(path) => path.display().to_string(),
            InputSource::Url(url) => url.clone(),
            InputSource::Text(_) | InputSource::Base64(_) => DIRECT_INPUT_ORIGIN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingMethod {
    String,
    Url,
    Base64,
}

impl EmbeddingMethod {
    pub fn detect(content: &str) -> Self {
        if is_remote_url(content.trim()) {
            EmbeddingMethod::Url
        } else {
            EmbeddingMethod::String
        }
    }
}

impl FromStr for EmbeddingMethod {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STRING" => Ok(EmbeddingMethod::String),
            "URL" | "URI" => Ok(EmbeddingMethod::Url),
            "BASE64" => Ok(EmbeddingMethod::Base64),
            _ => Err(ValidatorError::UnknownSyntax(s.to_string())),
        }
    }
}

pub fn is_remote_url(value: &str) -> bool {
    let lowered = value.to_ascii_lowercase();
    (lowered.starts_with("http://") || lowered.starts_with("https://"))
        && !value.contains(char::is_whitespace)
        && NamedNode::new(value).is_ok()
}

/// Content ready to be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedInput {
    pub content: String,
    pub syntax: RdfSyntax,
    /// File name, URL, or `-` for direct input.
    pub origin: String,
    /// Used to resolve relative IRIs; set for remote documents.
    pub base_iri: Option<String>,
}

impl LoadedInput {
    /// Resolve the syntax and reject empty content.
    pub fn new(
        content: String,
        explicit_syntax: Option<&str>,
        file_name: Option<&str>,
        origin: String,
    ) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(ValidatorError::EmptyInput);
        }
        let syntax = RdfSyntax::resolve(explicit_syntax, file_name, &content)?;
        if !syntax.is_supported() {
            return Err(ValidatorError::UnsupportedSyntax(syntax));
        }
        debug!("Loaded {} bytes of {} from {}", content.len(), syntax.label(), origin);
        Ok(Self {
            content,
            syntax,
            origin,
            base_iri: None,
        })
    }

    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Self {
        self.base_iri = Some(base_iri.into());
        self
    }
}

pub fn load_text(content: &str, explicit_syntax: Option<&str>) -> Result<LoadedInput> {
    LoadedInput::new(
        content.to_string(),
        explicit_syntax,
        None,
        DIRECT_INPUT_ORIGIN.to_string(),
    )
}

pub fn load_base64(encoded: &str, explicit_syntax: Option<&str>) -> Result<LoadedInput> {
    let compact: String = encoded.split_whitespace().collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
    let content = decode_utf8(bytes)?;
    LoadedInput::new(
        content,
        explicit_syntax,
        None,
        DIRECT_INPUT_ORIGIN.to_string(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadProgress {
    pub bytes_read: u64,
    /// Unknown for compressed or streamed input.
    pub total: Option<u64>,
}

impl ReadProgress {
    pub fn fraction(&self) -> Option<f64> {
        self.total
            .filter(|total| *total > 0)
            .map(|total| (self.bytes_read as f64 / total as f64).min(1.0))
    }
}

/// Read `reader` to the end in `chunk_size` pieces, reporting progress after
/// each piece and refusing to go past `max_bytes`.
pub fn read_chunked<R: Read>(
    mut reader: R,
    chunk_size: usize,
    max_bytes: u64,
    total: Option<u64>,
    mut on_progress: impl FnMut(ReadProgress),
) -> Result<String> {
    if let Some(size) = total.filter(|size| *size > max_bytes) {
        return Err(ValidatorError::InputTooLarge {
            size,
            max: max_bytes,
        });
    }

    let mut chunk = vec![0u8; chunk_size.max(1)];
    let mut content = Vec::with_capacity(total.unwrap_or_default().min(max_bytes) as usize);
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        content.extend_from_slice(&chunk[..read]);
        let bytes_read = content.len() as u64;
        if bytes_read > max_bytes {
            return Err(ValidatorError::InputTooLarge {
                size: bytes_read,
                max: max_bytes,
            });
        }
        on_progress(ReadProgress { bytes_read, total });
    }
    decode_utf8(content)
}

pub(crate) fn decode_utf8(mut bytes: Vec<u8>) -> Result<String> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        bytes.drain(..3);
    }
    String::from_utf8(bytes).map_err(|_| ValidatorError::Encoding)
}

#[cfg(feature = "native")]
pub use native::{load, load_file};

#[cfg(feature = "native")]
mod native {
    use std::fs::File;
    use std::io::Read;
    use std::path::Path;

    use flate2::read::GzDecoder;
    use log::info;

    use super::{load_base64, load_text, read_chunked, InputSource, LoadedInput, ReadProgress};
    use crate::error::Result;
    use crate::fetch::fetch;
    use crate::settings::Settings;

    fn open_reader(path: &Path) -> Result<(Box<dyn Read>, Option<u64>)> {
        let file = File::open(path)?;
        if path.extension().and_then(|e| e.to_str()) == Some("gz") {
            Ok((Box::new(GzDecoder::new(file)), None))
        } else {
            let size = file.metadata()?.len();
            Ok((Box::new(file), Some(size)))
        }
    }

    /// Read a local file, gzipped or not.
    pub fn load_file(
        path: &Path,
        explicit_syntax: Option<&str>,
        settings: &Settings,
        on_progress: impl FnMut(ReadProgress),
    ) -> Result<LoadedInput> {
        let (reader, total) = open_reader(path)?;
        let content = read_chunked(
            reader,
            settings.chunk_size,
            settings.max_input_bytes,
            total,
            on_progress,
        )?;
        let name = path.display().to_string();
        LoadedInput::new(content, explicit_syntax, Some(&name), name.clone())
    }

    pub async fn load(
        source: &InputSource,
        explicit_syntax: Option<&str>,
        settings: &Settings,
    ) -> Result<LoadedInput> {
        match source {
            InputSource::Text(text) => load_text(text, explicit_syntax),
            InputSource::Base64(encoded) => load_base64(encoded, explicit_syntax),
            InputSource::File(path) => load_file(path, explicit_syntax, settings, |progress| {
                if let Some(fraction) = progress.fraction() {
                    log::debug!("Read {:.0}% of {}", fraction * 100.0, path.display());
                }
            }),
            InputSource::Url(url) => {
                info!("Retrieving {}", url);
                let fetched = fetch(url, settings, |progress| {
                    log::debug!("Received {} bytes of {}", progress.bytes_read, url);
                })
                .await?;
                let media_type = fetched.content_type.as_deref();
                // an explicit choice wins over what the server claims
                let syntax_hint = explicit_syntax
                    .filter(|s| !s.trim().is_empty() && *s != "empty")
                    .or(media_type.filter(|m| crate::syntax::RdfSyntax::from_media_type(m).is_some()));
                Ok(
                    LoadedInput::new(fetched.body, syntax_hint, Some(url), url.clone())?
                        .with_base_iri(url.clone()),
                )
            }
        }
    }
}
