// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Runtime configuration.
//!
//! Loaded from `<config_dir>/zukai/config.json` unless a path is given explicitly. Every field is
//! optional; a missing file means defaults.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::credential::CREDENTIAL_FILENAME;

pub const APP_DIR_NAME: &str = "zukai";
pub const CONFIG_FILENAME: &str = "config.json";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-pro";

pub const API_BASE_ENV: &str = "ZUKAI_API_BASE";
pub const MODEL_ENV: &str = "ZUKAI_MODEL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api_base: String,
    pub model: String,
    /// No deadline unless set.
    pub request_timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub credential_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            request_timeout_secs: None,
            output_dir: None,
            credential_path: None,
            log_file: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no platform config directory found; pass --config or set HOME")]
    NoConfigDir,
}

impl Config {
    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// An explicit path must exist; the default location may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match default_config_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default().with_env_overrides()),
            },
        };

        let config = match fs::read_to_string(&path) {
            Ok(raw) => Self::from_json(&raw).map_err(|source| ConfigError::Json {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !required => Self::default(),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        Ok(config.with_env_overrides())
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(base) = non_empty_env(API_BASE_ENV) {
            self.api_base = base;
        }
        if let Some(model) = non_empty_env(MODEL_ENV) {
            self.model = model;
        }
        self
    }

    /// Full `generateContent` URL, without the key query parameter.
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn credential_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.credential_path {
            Some(path) => Ok(path.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR_NAME).join(CREDENTIAL_FILENAME))
                .ok_or(ConfigError::NoConfigDir),
        }
    }

    /// Directory rendered SVG files are written to.
    pub fn output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .unwrap_or_else(env::temp_dir)
                .join(APP_DIR_NAME)
                .join("diagrams"),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILENAME))
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
