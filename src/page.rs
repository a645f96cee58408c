// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The page side of the pipeline.
//!
//! A page owns the selection and the overlay. The dispatcher only talks to it through
//! [`PageAgent`], so the same flow drives the terminal viewer and headless runs.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::overlay::{Overlay, OverlayHost};
use crate::renderer::{render_to_overlay, DiagramLibrary, LibrarySource, Renderer, SvgTarget};

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("page is no longer available")]
    Closed,
}

#[async_trait]
pub trait PageAgent: Send + Sync {
    /// Currently selected text, if any.
    async fn selection(&self) -> Result<Option<String>, PageError>;

    /// Renders the model reply and shows it; render failures are shown as an error overlay.
    async fn render_diagram(&self, diagram_text: String) -> Result<(), PageError>;

    /// Shows `message` in an error overlay.
    async fn show_error(&self, message: String) -> Result<(), PageError>;
}

/// Page for non-interactive runs: fixed selection, overlay kept in memory.
pub struct HeadlessPage<S: LibrarySource> {
    selection: Option<String>,
    renderer: Arc<Renderer<S>>,
    target: SvgTarget,
    host: Mutex<OverlayHost>,
}

impl<S> HeadlessPage<S>
where
    S: LibrarySource,
    S::Library: DiagramLibrary,
{
    pub fn new(selection: Option<String>, renderer: Arc<Renderer<S>>, target: SvgTarget) -> Self {
        Self {
            selection,
            renderer,
            target,
            host: Mutex::new(OverlayHost::new()),
        }
    }

    fn lock_host(&self) -> MutexGuard<'_, OverlayHost> {
        self.host.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Overlay currently mounted, if any.
    pub fn overlay(&self) -> Option<Overlay> {
        self.lock_host().current().cloned()
    }

    /// Removes and returns the mounted overlay.
    pub fn take_overlay(&self) -> Option<Overlay> {
        self.lock_host().dismiss()
    }
}

#[async_trait]
impl<S> PageAgent for HeadlessPage<S>
where
    S: LibrarySource,
    S::Library: DiagramLibrary,
{
    async fn selection(&self) -> Result<Option<String>, PageError> {
        Ok(self.selection.clone())
    }

    async fn render_diagram(&self, diagram_text: String) -> Result<(), PageError> {
        let overlay = render_to_overlay(&self.renderer, &diagram_text, &self.target).await;
        self.lock_host().mount(overlay);
        Ok(())
    }

    async fn show_error(&self, message: String) -> Result<(), PageError> {
        self.lock_host().mount(Overlay::error(message));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::overlay::{Tone, DIAGRAM_HEADING};
    use crate::renderer::LoadError;

    struct StubLibrary;

    impl DiagramLibrary for StubLibrary {
        fn render_svg(&self, source: &str) -> Result<String, String> {
            if source.starts_with("flowchart") || source.contains("-->") {
                Ok(format!("<svg width=\"8\" height=\"8\"><text>{source}</text></svg>"))
            } else {
                Err(format!("No diagram type detected for text: {source}"))
            }
        }
    }

    struct StubSource;

    #[async_trait]
    impl LibrarySource for StubSource {
        type Library = StubLibrary;

        async fn load(&self) -> Result<StubLibrary, LoadError> {
            Ok(StubLibrary)
        }
    }

    fn page(dir: &std::path::Path, selection: Option<&str>) -> HeadlessPage<StubSource> {
        HeadlessPage::new(
            selection.map(str::to_owned),
            Arc::new(Renderer::new(StubSource)),
            SvgTarget::Dir(dir.to_path_buf()),
        )
    }

    #[tokio::test]
    async fn reports_fixed_selection() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            page(tmp.path(), Some("notes")).selection().await.unwrap(),
            Some("notes".to_owned())
        );
        assert_eq!(page(tmp.path(), None).selection().await.unwrap(), None);
    }

    #[tokio::test]
    async fn renders_into_diagram_overlay() {
        let tmp = tempfile::tempdir().unwrap();
        let page = page(tmp.path(), None);
        page.render_diagram("```mermaid\nA-->B\n```".to_owned())
            .await
            .unwrap();

        let overlay = page.take_overlay().unwrap();
        assert_eq!(overlay.heading(), DIAGRAM_HEADING);
        assert_eq!(overlay.details_body(), Some("A-->B"));
        assert!(page.overlay().is_none());
    }

    #[tokio::test]
    async fn render_failure_replaces_previous_overlay_with_error() {
        let tmp = tempfile::tempdir().unwrap();
        let page = page(tmp.path(), None);
        page.render_diagram("A-->B".to_owned()).await.unwrap();
        page.render_diagram("just prose".to_owned()).await.unwrap();

        let overlay = page.overlay().unwrap();
        assert_eq!(overlay.tone(), Tone::Error);
        assert!(overlay
            .to_plain_text()
            .contains("Failed to render diagram: No diagram type detected"));
    }

    #[tokio::test]
    async fn show_error_mounts_message() {
        let tmp = tempfile::tempdir().unwrap();
        let page = page(tmp.path(), None);
        page.show_error("Gemini API error: 429".to_owned())
            .await
            .unwrap();
        assert!(page.overlay().unwrap().to_plain_text().contains("429"));
    }
}
