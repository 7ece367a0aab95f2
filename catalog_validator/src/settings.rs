// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::profiles::Profile;
use crate::rdf::OutputSyntax;

/// Tunables shared by every entry point. All fields have defaults so a
/// settings file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bytes read per chunk when loading files.
    pub chunk_size: usize,
    /// Inputs above this size are refused.
    pub max_input_bytes: u64,
    pub fetch_timeout_secs: u64,
    /// Above this many results only the counts and groups are kept in full.
    pub max_detailed_results: usize,
    /// Language picked among several `sh:resultMessage` values.
    pub preferred_language: String,
    pub default_profile: Profile,
    pub output_syntax: OutputSyntax,
    /// Upper bound on documents pulled in through `owl:imports`.
    pub max_imports: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024,
            max_input_bytes: 256 * 1024 * 1024,
            fetch_timeout_secs: 60,
            max_detailed_results: 5000,
            preferred_language: "en".to_string(),
            default_profile: Profile::DcatAp,
            output_syntax: OutputSyntax::Turtle,
            max_imports: 20,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "native")]
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

#[cfg(feature = "native")]
pub use preferences::Preferences;

#[cfg(feature = "native")]
mod preferences {
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};

    use log::{debug, warn};
    use serde::{Deserialize, Serialize};

    use crate::profiles::Profile;

    const MAX_RECENT_SOURCES: usize = 10;

    /// What the tool remembers between runs: the last profile and the most
    /// recently validated URLs, newest first.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Preferences {
        pub last_profile: Option<Profile>,
        pub recent_sources: VecDeque<String>,
        #[serde(skip)]
        path: PathBuf,
    }

    impl Preferences {
        /// A missing or unreadable file yields empty preferences.
        pub fn open(path: &Path) -> Self {
            let mut preferences = match std::fs::read_to_string(path) {
                Ok(json) => serde_json::from_str(&json).unwrap_or_else(|err| {
                    warn!("Ignoring unreadable preferences {}: {}", path.display(), err);
                    Preferences::default()
                }),
                Err(_) => Preferences::default(),
            };
            preferences.path = path.to_path_buf();
            preferences
        }

        /// Move `source` to the front, dropping duplicates and the oldest
        /// entries past the limit.
        pub fn remember_source(&mut self, source: &str) {
            self.recent_sources.retain(|existing| existing != source);
            self.recent_sources.push_front(source.to_string());
            self.recent_sources.truncate(MAX_RECENT_SOURCES);
        }

        pub fn remember_profile(&mut self, profile: Profile) {
            self.last_profile = Some(profile);
        }

        pub fn save(&self) -> crate::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, serde_json::to_string_pretty(self)?)?;
            debug!("Saved preferences to {}", self.path.display());
            Ok(())
        }
    }

}
