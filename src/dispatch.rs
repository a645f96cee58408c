// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Menu click → request → render/error, across the page boundary.

use std::sync::Arc;

use crate::diagram::DiagramKind;
use crate::gemini::DiagramRequester;
use crate::page::{PageAgent, PageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing was selected; no request was made.
    NoSelection,
    /// The reply was handed to the page for rendering.
    Rendered,
    /// The request failed and the page was asked to show this message.
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Page(#[from] PageError),
}

pub struct Dispatcher<R: ?Sized> {
    requester: Arc<R>,
}

impl<R: ?Sized> Clone for Dispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            requester: self.requester.clone(),
        }
    }
}

impl<R> Dispatcher<R>
where
    R: DiagramRequester + ?Sized,
{
    pub fn new(requester: Arc<R>) -> Self {
        Self { requester }
    }

    /// Runs one pipeline for a click on `menu_item_id`.
    pub async fn handle_menu_click<P>(
        &self,
        menu_item_id: &str,
        page: &P,
    ) -> Result<DispatchOutcome, DispatchError>
    where
        P: PageAgent + ?Sized,
    {
        let kind = DiagramKind::from_menu_item(menu_item_id);

        let text = match page.selection().await? {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                tracing::warn!(menu_item = menu_item_id, "no text selected; nothing to diagram");
                return Ok(DispatchOutcome::NoSelection);
            }
        };

        tracing::info!(kind = %kind, selection_chars = text.chars().count(), "generating diagram");
        match self.requester.request_diagram(&text, kind).await {
            Ok(diagram_text) => {
                page.render_diagram(diagram_text).await?;
                Ok(DispatchOutcome::Rendered)
            }
            Err(err) => {
                tracing::error!(kind = %kind, error = %err, "diagram request failed");
                let message = err.to_string();
                page.show_error(message.clone()).await?;
                Ok(DispatchOutcome::Failed(message))
            }
        }
    }
}
