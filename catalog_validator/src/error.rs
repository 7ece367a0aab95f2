// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::syntax::RdfSyntax;

pub type Result<T> = std::result::Result<T, ValidatorError>;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("No content was provided to validate")]
    EmptyInput,

    #[error("Input of {size} bytes exceeds the maximum of {max} bytes")]
    InputTooLarge { size: u64, max: u64 },

    #[error("Input is not valid UTF-8 text")]
    Encoding,

    #[error("Provided content syntax type is not valid: {0}")]
    UnknownSyntax(String),

    #[error("The {} syntax is not supported", .0.label())]
    UnsupportedSyntax(RdfSyntax),

    #[error("Could not parse {label} content from {origin}: {message}", label = .syntax.label())]
    Parse {
        syntax: RdfSyntax,
        origin: String,
        message: String,
    },

    #[error("Could not serialize RDF: {0}")]
    Serialize(String),

    #[error("Provided validation type is not valid: {0}")]
    UnknownProfile(String),

    #[error("The custom profile requires at least one user-provided shapes document")]
    MissingShapes,

    #[error("Invalid BASE64 content: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to retrieve {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("SHACL engine error: {0}")]
    Engine(String),

    #[error("Background worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ValidatorError {
    pub(crate) fn parse(syntax: RdfSyntax, origin: &str, err: impl std::fmt::Display) -> Self {
        ValidatorError::Parse {
            syntax,
            origin: origin.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn engine(err: impl std::fmt::Display) -> Self {
        ValidatorError::Engine(err.to_string())
    }
}
