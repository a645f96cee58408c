// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Page agent for the terminal viewer.
//!
//! Pipeline runs execute on the async runtime while the viewer owns its state on the UI thread;
//! everything a run wants to show travels back as a [`PageEvent`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::dispatch::DispatchOutcome;
use crate::overlay::Overlay;
use crate::page::{PageAgent, PageError};
use crate::renderer::{render_to_overlay, DiagramLibrary, LibrarySource, Renderer, SvgTarget};
use crate::settings::Banner;

#[derive(Debug)]
pub enum PageEvent {
    Mount(Overlay),
    /// A pipeline run ended; `Err` carries a page failure.
    Finished(Result<DispatchOutcome, String>),
    /// Settings submit ended.
    KeyChecked(Banner),
}

pub struct TerminalPage<S: LibrarySource> {
    /// Selection as it was when the menu item was chosen.
    selection: Option<String>,
    renderer: Arc<Renderer<S>>,
    target: SvgTarget,
    events: UnboundedSender<PageEvent>,
}

impl<S> TerminalPage<S>
where
    S: LibrarySource,
    S::Library: DiagramLibrary,
{
    pub fn new(
        selection: Option<String>,
        renderer: Arc<Renderer<S>>,
        target: SvgTarget,
        events: UnboundedSender<PageEvent>,
    ) -> Self {
        Self {
            selection,
            renderer,
            target,
            events,
        }
    }

    fn send(&self, event: PageEvent) -> Result<(), PageError> {
        self.events.send(event).map_err(|_| PageError::Closed)
    }

    pub fn finish(&self, outcome: Result<DispatchOutcome, String>) {
        if self.send(PageEvent::Finished(outcome)).is_err() {
            tracing::debug!("viewer closed before pipeline finished");
        }
    }
}

#[async_trait]
impl<S> PageAgent for TerminalPage<S>
where
    S: LibrarySource,
    S::Library: DiagramLibrary,
{
    async fn selection(&self) -> Result<Option<String>, PageError> {
        Ok(self.selection.clone())
    }

    async fn render_diagram(&self, diagram_text: String) -> Result<(), PageError> {
        if self.events.is_closed() {
            return Err(PageError::Closed);
        }
        let overlay = render_to_overlay(&self.renderer, &diagram_text, &self.target).await;
        self.send(PageEvent::Mount(overlay))
    }

    async fn show_error(&self, message: String) -> Result<(), PageError> {
        self.send(PageEvent::Mount(Overlay::error(message)))
    }
}
