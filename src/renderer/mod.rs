// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Diagram rendering.
//!
//! Cleans the model reply, renders it through a lazily loaded library, and saves the resulting
//! SVG. Every failure is reported once as a [`RenderError`]; nothing is retried.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

mod fence;
pub mod loader;
pub mod mermaid;

pub use fence::strip_fences;
pub use loader::{LibraryLoader, LibrarySource, LoadError};
pub use mermaid::{DiagramLibrary, EngineConfig, MermaidLibrary, MermaidSource, SecurityLevel, Theme};

use crate::overlay::{DiagramImage, Overlay};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("diagram description is empty")]
    EmptySource,
    #[error("{0}")]
    Library(String),
    #[error("render worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Message shown to the user when rendering fails.
pub fn render_failure_message(err: &RenderError) -> String {
    format!("Failed to render diagram: {err}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    /// Cleaned diagram text that was rendered.
    pub source: String,
    pub svg: String,
}

impl RenderedDiagram {
    pub fn dimensions(&self) -> (Option<f64>, Option<f64>) {
        svg_dimensions(&self.svg)
    }

    pub fn image(&self, path: Option<PathBuf>) -> DiagramImage {
        let (width, height) = self.dimensions();
        DiagramImage {
            path,
            width,
            height,
            svg_bytes: self.svg.len(),
        }
    }

    /// Result overlay for this diagram.
    pub fn overlay(&self, saved_path: Option<PathBuf>) -> Overlay {
        Overlay::diagram(self.image(saved_path), self.source.clone())
    }
}

pub struct Renderer<S: LibrarySource> {
    loader: LibraryLoader<S>,
}

impl<S> Renderer<S>
where
    S: LibrarySource,
    S::Library: DiagramLibrary,
{
    pub fn new(source: S) -> Self {
        Self {
            loader: LibraryLoader::new(source),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loader.is_loaded()
    }

    pub fn loader(&self) -> &LibraryLoader<S> {
        &self.loader
    }

    /// Loads the library if needed, strips fences, and renders to SVG.
    pub async fn render(&self, raw: &str) -> Result<RenderedDiagram, RenderError> {
        let library = self.loader.get().await?;

        let source = strip_fences(raw);
        if source.is_empty() {
            return Err(RenderError::EmptySource);
        }

        let job_source = source.clone();
        let svg = tokio::task::spawn_blocking(move || library.render_svg(&job_source))
            .await?
            .map_err(RenderError::Library)?;

        tracing::info!(
            source_lines = source.lines().count(),
            svg_bytes = svg.len(),
            "rendered diagram"
        );
        Ok(RenderedDiagram { source, svg })
    }
}

impl Renderer<MermaidSource> {
    pub fn mermaid(config: EngineConfig) -> Self {
        Self::new(MermaidSource::new(config))
    }
}

fn dimension_regexes() -> &'static (Regex, Regex, Regex) {
    static DIMENSIONS: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    DIMENSIONS.get_or_init(|| {
        (
            Regex::new(r#"(?s)<svg\b[^>]*?\bviewBox\s*=\s*["']\s*[-\d.eE]+[\s,]+[-\d.eE]+[\s,]+([\d.eE+]+)[\s,]+([\d.eE+]+)"#)
                .expect("valid viewBox regex"),
            Regex::new(r#"(?s)<svg\b[^>]*?\swidth\s*=\s*["']([\d.]+)(?:px)?["']"#)
                .expect("valid width regex"),
            Regex::new(r#"(?s)<svg\b[^>]*?\sheight\s*=\s*["']([\d.]+)(?:px)?["']"#)
                .expect("valid height regex"),
        )
    })
}

/// Reads the root element's size, preferring explicit `width`/`height` over `viewBox`.
pub fn svg_dimensions(svg: &str) -> (Option<f64>, Option<f64>) {
    let (view_box, width, height) = dimension_regexes();
    let capture = |re: &Regex, idx: usize| {
        re.captures(svg)
            .and_then(|caps| caps.get(idx))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    };

    let view_box_size = view_box
        .captures(svg)
        .and_then(|caps| {
            let w = caps.get(1)?.as_str().parse::<f64>().ok()?;
            let h = caps.get(2)?.as_str().parse::<f64>().ok()?;
            Some((w, h))
        });

    let w = capture(width, 1).or(view_box_size.map(|(w, _)| w));
    let h = capture(height, 1).or(view_box_size.map(|(_, h)| h));
    (w, h)
}

static SAVE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `svg` into `dir` under a fresh `diagram-*.svg` name.
pub fn save_svg(dir: &Path, svg: &str) -> io::Result<PathBuf> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let counter = SAVE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = dir.join(format!("diagram-{millis}-{counter}.svg"));
    save_svg_as(&path, svg)?;
    Ok(path)
}

/// Writes `svg` to exactly `path`.
///
/// The bytes are staged in a temp file next to `path`; the temp file is removed on any failure and
/// only renamed into place once fully written.
pub fn save_svg_as(path: &Path, svg: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".zukai-render-")
        .suffix(".svg")
        .tempfile_in(dir)?;
    staged.write_all(svg.as_bytes())?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Where a rendered SVG goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SvgTarget {
    /// A fresh file inside this directory per diagram.
    Dir(PathBuf),
    /// Exactly this file, overwritten.
    File(PathBuf),
}

impl SvgTarget {
    pub fn save(&self, svg: &str) -> io::Result<PathBuf> {
        match self {
            Self::Dir(dir) => save_svg(dir, svg),
            Self::File(path) => save_svg_as(path, svg).map(|()| path.clone()),
        }
    }
}

/// Renders `raw`, saves the SVG, and returns the overlay to show: the diagram on success, an
/// error overlay otherwise.
pub async fn render_to_overlay<S>(renderer: &Renderer<S>, raw: &str, target: &SvgTarget) -> Overlay
where
    S: LibrarySource,
    S::Library: DiagramLibrary,
{
    let rendered = match renderer.render(raw).await {
        Ok(rendered) => rendered,
        Err(err) => {
            tracing::error!(error = %err, "diagram rendering failed");
            return Overlay::error(render_failure_message(&err));
        }
    };

    match target.save(&rendered.svg) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "saved diagram");
            rendered.overlay(Some(path))
        }
        Err(err) => {
            tracing::error!(error = %err, "saving diagram failed");
            Overlay::error(format!("Failed to save diagram: {err}"))
        }
    }
}
