// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! `mermaid-rs-renderer` as the rendering library.

use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use async_trait::async_trait;
use mermaid_rs_renderer::{
    config::LayoutConfig, layout::compute_layout, parser::parse_mermaid,
    render::render_svg as layout_to_svg,
    theme::Theme as EngineTheme,
};
use regex::Regex;

use super::loader::{LibrarySource, LoadError};

/// Diagram rendered while loading to prove the engine works.
const PROBE_DIAGRAM: &str = "flowchart TD\n  probe[probe] --> ok[ok]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityLevel {
    /// Removes `<script>` elements and inline `on*` handlers from the SVG.
    Strict,
    /// Keeps the markup as generated, inline interactivity included.
    #[default]
    Loose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Default,
    /// Light text on a transparent background, for dark viewers.
    Dark,
}

impl Theme {
    /// The renderer palette for this theme.
    pub fn palette(self) -> EngineTheme {
        match self {
            Self::Default => EngineTheme::modern(),
            Self::Dark => EngineTheme {
                background: "#00000000".to_string(),
                primary_color: "#313244".to_string(),
                primary_text_color: "#cdd6f4".to_string(),
                primary_border_color: "#585b70".to_string(),
                line_color: "#7f849c".to_string(),
                secondary_color: "#45475a".to_string(),
                tertiary_color: "#313244".to_string(),
                edge_label_background: "#00000000".to_string(),
                cluster_background: "#18182580".to_string(),
                cluster_border: "#45475a".to_string(),
                text_color: "#cdd6f4".to_string(),
                ..EngineTheme::modern()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Render nothing until asked; the only render during load is the probe.
    pub start_on_load: bool,
    pub theme: Theme,
    pub security_level: SecurityLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            start_on_load: false,
            theme: Theme::Default,
            security_level: SecurityLevel::Loose,
        }
    }
}

/// A loaded library that turns diagram text into SVG markup.
pub trait DiagramLibrary: Send + Sync + 'static {
    fn render_svg(&self, source: &str) -> Result<String, String>;
}

#[derive(Debug, Clone, Default)]
pub struct MermaidSource {
    config: EngineConfig,
}

impl MermaidSource {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LibrarySource for MermaidSource {
    type Library = MermaidLibrary;

    async fn load(&self) -> Result<MermaidLibrary, LoadError> {
        let library = MermaidLibrary {
            config: self.config,
        };
        if self.config.start_on_load {
            tracing::debug!("start_on_load has no page diagrams to render; ignoring");
        }

        let probe = library.clone();
        tokio::task::spawn_blocking(move || probe.render_svg(PROBE_DIAGRAM))
            .await
            .map_err(|err| LoadError::new(format!("probe worker failed: {err}")))?
            .map_err(|err| LoadError::new(format!("probe render failed: {err}")))?;

        Ok(library)
    }
}

#[derive(Debug, Clone)]
pub struct MermaidLibrary {
    config: EngineConfig,
}

impl MermaidLibrary {
    pub fn config(&self) -> EngineConfig {
        self.config
    }
}

impl DiagramLibrary for MermaidLibrary {
    fn render_svg(&self, source: &str) -> Result<String, String> {
        // The renderer can panic on inputs it does not expect; contain it to this call.
        let theme = self.config.theme.palette();
        let rendered = panic::catch_unwind(AssertUnwindSafe(|| -> Result<String, String> {
            let parsed = parse_mermaid(source).map_err(|err| format!("Parse error: {err}"))?;
            let layout_config = LayoutConfig::default();
            let layout = compute_layout(&parsed.graph, &theme, &layout_config);
            Ok(layout_to_svg(&layout, &theme, &layout_config))
        }))
        .map_err(|payload| format!("renderer panicked: {}", panic_message(&payload)))??;

        Ok(match self.config.security_level {
            SecurityLevel::Loose => rendered,
            SecurityLevel::Strict => sanitize_svg(&rendered),
        })
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

fn script_regex() -> &'static Regex {
    static SCRIPT: OnceLock<Regex> = OnceLock::new();
    SCRIPT.get_or_init(|| {
        Regex::new(r"(?is)<script\b.*?(?:</script\s*>|/>)").expect("valid script regex")
    })
}

fn handler_regex() -> &'static Regex {
    static HANDLER: OnceLock<Regex> = OnceLock::new();
    HANDLER.get_or_init(|| {
        Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*')"#).expect("valid handler regex")
    })
}

/// Strips scripts and inline event handlers.
pub fn sanitize_svg(svg: &str) -> String {
    let without_scripts = script_regex().replace_all(svg, "");
    handler_regex().replace_all(&without_scripts, "").into_owned()
}
