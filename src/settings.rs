// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! API key form: one masked input plus a transient banner.

use std::time::{Duration, Instant};

use crate::credential::{Credential, CredentialStore};
use crate::gemini::KeyValidator;

pub const SUCCESS_BANNER_TTL: Duration = Duration::from_secs(5);
pub const ERROR_BANNER_TTL: Duration = Duration::from_secs(8);

pub const EMPTY_KEY_MESSAGE: &str = "Enter an API key.";
pub const BAD_PREFIX_MESSAGE: &str = "Enter a valid Gemini API key.";
pub const SAVED_MESSAGE: &str = "Settings saved.";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load settings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    expires_at: Instant,
}

impl Banner {
    pub fn success(message: impl Into<String>, now: Instant) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
            expires_at: now + SUCCESS_BANNER_TTL,
        }
    }

    pub fn error(message: impl Into<String>, now: Instant) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
            expires_at: now + ERROR_BANNER_TTL,
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
pub struct SettingsForm {
    input: String,
    banner: Option<Banner>,
}

impl SettingsForm {
    /// Form prefilled with the stored key, or empty when there is none.
    pub fn load(store: &dyn CredentialStore) -> Self {
        match store.load() {
            Ok(key) => Self {
                input: key.map(|key| key.expose().to_owned()).unwrap_or_default(),
                banner: None,
            },
            Err(err) => {
                tracing::error!(error = %err, "failed to load stored API key");
                Self {
                    input: String::new(),
                    banner: Some(Banner::error(LOAD_FAILED_MESSAGE, Instant::now())),
                }
            }
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Input as shown on screen: every character replaced by a bullet.
    pub fn masked_input(&self) -> String {
        "•".repeat(self.input.chars().count())
    }

    pub fn push_char(&mut self, ch: char) {
        if !ch.is_control() {
            self.input.push(ch);
        }
    }

    pub fn push_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.push_char(ch);
        }
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Banner still visible at `now`; expired banners are dropped.
    pub fn banner(&mut self, now: Instant) -> Option<&Banner> {
        if self.banner.as_ref().is_some_and(|banner| !banner.is_visible(now)) {
            self.banner = None;
        }
        self.banner.as_ref()
    }

    pub fn show(&mut self, banner: Banner) {
        self.banner = Some(banner);
    }

    /// Local checks only: the trimmed input must be non-empty and carry the expected prefix.
    ///
    /// On failure the error banner is already shown.
    pub fn prepare(&mut self, now: Instant) -> Option<Credential> {
        self.banner = None;
        let Some(key) = Credential::new(self.input.as_str()) else {
            self.show(Banner::error(EMPTY_KEY_MESSAGE, now));
            return None;
        };
        if !key.has_expected_prefix() {
            self.show(Banner::error(BAD_PREFIX_MESSAGE, now));
            return None;
        }
        Some(key)
    }

    /// Validates, then persists. Returns whether the key was saved.
    pub async fn submit(
        &mut self,
        store: &dyn CredentialStore,
        validator: &dyn KeyValidator,
    ) -> bool {
        let Some(key) = self.prepare(Instant::now()) else {
            return false;
        };
        let banner = validate_and_save(key, store, validator).await;
        let saved = banner.kind == BannerKind::Success;
        self.show(banner);
        saved
    }
}

/// Network half of a submit; the returned banner reports the result.
pub async fn validate_and_save(
    key: Credential,
    store: &dyn CredentialStore,
    validator: &dyn KeyValidator,
) -> Banner {
    if let Err(err) = validator.validate_key(&key).await {
        tracing::warn!(key = %key, error = %err, "API key validation failed");
        return Banner::error(format!("Failed to save settings: {err}"), Instant::now());
    }
    if let Err(err) = store.save(&key) {
        tracing::error!(error = %err, "failed to persist API key");
        return Banner::error(format!("Failed to save settings: {err}"), Instant::now());
    }
    tracing::info!(key = %key, "API key saved");
    Banner::success(SAVED_MESSAGE, Instant::now())
}
