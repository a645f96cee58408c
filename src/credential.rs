// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Credential persistence.
//!
//! Exactly one secret is stored: the Gemini API key, under the `geminiApiKey` key of a small JSON
//! document. Writes go through a temp file and an atomic rename so a crash never leaves a
//! half-written key behind.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Literal prefix every Gemini API key starts with.
pub const REQUIRED_KEY_PREFIX: &str = "AIza";

pub const CREDENTIAL_FILENAME: &str = "credentials.json";

/// An API key. `Debug` and `Display` never print the full secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a trimmed, non-empty key. Returns `None` for blank input.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Heuristic check only; a matching prefix says nothing about whether the key works.
    pub fn has_expected_prefix(&self) -> bool {
        self.0.starts_with(REQUIRED_KEY_PREFIX)
    }

    /// `AIza…xyz9`-style rendering for logs and the settings screen.
    pub fn masked(&self) -> String {
        let chars = self.0.chars().collect::<Vec<_>>();
        if chars.len() <= 8 {
            return "…".to_owned();
        }
        let head = chars[..4].iter().collect::<String>();
        let tail = chars[chars.len() - 4..].iter().collect::<String>();
        format!("{head}…{tail}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("credential store at {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("refusing to write credential through symlink: {path}")]
    SymlinkRefused { path: PathBuf },
}

/// Key/value storage holding the single API key.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored key, or `None` when nothing (or only whitespace) is stored.
    fn load(&self) -> Result<Option<Credential>, CredentialError>;

    fn save(&self, credential: &Credential) -> Result<(), CredentialError>;

    fn clear(&self) -> Result<(), CredentialError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialDocument {
    #[serde(rename = "geminiApiKey", default, skip_serializing_if = "Option::is_none")]
    gemini_api_key: Option<String>,
}

/// JSON file backed store, normally `<config_dir>/zukai/credentials.json`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_document(&self, document: &CredentialDocument) -> Result<(), CredentialError> {
        let contents =
            serde_json::to_vec_pretty(document).map_err(|source| CredentialError::Json {
                path: self.path.clone(),
                source,
            })?;
        write_atomic(&self.path, &contents)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CredentialError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CredentialError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let document: CredentialDocument =
            serde_json::from_slice(&raw).map_err(|source| CredentialError::Json {
                path: self.path.clone(),
                source,
            })?;
        Ok(document.gemini_api_key.and_then(Credential::new))
    }

    fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        self.write_document(&CredentialDocument {
            gemini_api_key: Some(credential.expose().to_owned()),
        })
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CredentialError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// In-process store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    key: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: &str) -> Self {
        Self {
            key: Mutex::new(Credential::new(key)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CredentialError> {
        Ok(self.key.lock().unwrap_or_else(|err| err.into_inner()).clone())
    }

    fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        *self.key.lock().unwrap_or_else(|err| err.into_inner()) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.key.lock().unwrap_or_else(|err| err.into_inner()) = None;
        Ok(())
    }
}

fn io_err(path: &Path, source: io::Error) -> CredentialError {
    CredentialError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CredentialError> {
    let Some(parent) = path.parent() else {
        return Err(io_err(path, io::Error::other("path has no parent")));
    };
    let Some(file_name) = path.file_name() else {
        return Err(io_err(path, io::Error::other("path has no file name")));
    };

    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent).map_err(|source| io_err(parent, source))?;
    }

    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => {
            return Err(CredentialError::SymlinkRefused {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(io_err(path, source)),
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = parent.join(format!(
        ".zukai.tmp.{}.{}",
        file_name.to_string_lossy(),
        nanos
    ));

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(&tmp_path)
        .map_err(|source| io_err(&tmp_path, source))?;

    if let Err(source) = file.write_all(contents).and_then(|()| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(&tmp_path, source));
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(path, source));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    struct StoreCtx {
        _tmp: TempDir,
        store: FileCredentialStore,
    }

    #[fixture]
    fn ctx() -> StoreCtx {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FileCredentialStore::new(tmp.path().join("zukai").join(CREDENTIAL_FILENAME));
        StoreCtx { _tmp: tmp, store }
    }

    #[rstest]
    fn missing_file_loads_as_none(ctx: StoreCtx) {
        assert_eq!(ctx.store.load().unwrap(), None);
    }

    #[rstest]
    fn save_writes_single_gemini_key(ctx: StoreCtx) {
        let key = Credential::new("AIzaSyExampleKey1234").unwrap();
        ctx.store.save(&key).unwrap();

        let raw = std::fs::read_to_string(ctx.store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let object = json.as_object().expect("json object");
        assert_eq!(object.len(), 1);
        assert_eq!(object["geminiApiKey"], "AIzaSyExampleKey1234");

        assert_eq!(ctx.store.load().unwrap(), Some(key));
    }

    #[rstest]
    fn save_overwrites_and_leaves_no_temp_files(ctx: StoreCtx) {
        ctx.store.save(&Credential::new("AIzaFirstKey0000").unwrap()).unwrap();
        ctx.store.save(&Credential::new("AIzaSecondKey111").unwrap()).unwrap();

        assert_eq!(ctx.store.load().unwrap().unwrap().expose(), "AIzaSecondKey111");
        let parent = ctx.store.path().parent().unwrap();
        let leftovers = std::fs::read_dir(parent)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".zukai.tmp."))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[rstest]
    fn blank_stored_key_counts_as_missing(ctx: StoreCtx) {
        std::fs::create_dir_all(ctx.store.path().parent().unwrap()).unwrap();
        std::fs::write(ctx.store.path(), r#"{"geminiApiKey":"   "}"#).unwrap();
        assert_eq!(ctx.store.load().unwrap(), None);
    }

    #[rstest]
    fn corrupt_file_is_reported_with_path(ctx: StoreCtx) {
        std::fs::create_dir_all(ctx.store.path().parent().unwrap()).unwrap();
        std::fs::write(ctx.store.path(), "not json").unwrap();
        let err = ctx.store.load().unwrap_err();
        assert!(matches!(err, CredentialError::Json { .. }));
        assert!(err.to_string().contains(CREDENTIAL_FILENAME));
    }

    #[rstest]
    fn clear_is_idempotent(ctx: StoreCtx) {
        ctx.store.clear().unwrap();
        ctx.store.save(&Credential::new("AIzaSomething999").unwrap()).unwrap();
        ctx.store.clear().unwrap();
        assert_eq!(ctx.store.load().unwrap(), None);
    }

    #[test]
    fn credential_formatting_masks_secret() {
        let key = Credential::new("  AIzaSyVerySecretKey9876  ").unwrap();
        assert_eq!(key.expose(), "AIzaSyVerySecretKey9876");
        assert_eq!(key.masked(), "AIza…9876");
        assert!(!format!("{key:?}").contains("VerySecret"));
        assert!(key.has_expected_prefix());
        assert!(!Credential::new("sk-123456789").unwrap().has_expected_prefix());
        assert!(Credential::new("   ").is_none());
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.load().unwrap(), None);
        let key = Credential::new("AIzaMemoryKey123").unwrap();
        store.save(&key).unwrap();
        assert_eq!(store.load().unwrap(), Some(key));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
