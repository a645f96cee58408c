// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Dismissible overlay shared by diagram results and errors.
//!
//! The overlay is a dimmed backdrop with a centered panel and a close control. It is dismissed by
//! the close control, a click on the backdrop (not the panel), or Escape. [`OverlayHost`] holds at
//! most one overlay; mounting a new one replaces the old.

use std::path::PathBuf;

/// Identifier of the one overlay that may be mounted.
pub const OVERLAY_ID: &str = "zukai-diagram-overlay";

pub const DIAGRAM_HEADING: &str = "Generated diagram";
pub const ERROR_HEADING: &str = "Error";
pub const SOURCE_DETAILS_SUMMARY: &str = "Mermaid source";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Normal,
    /// Red-accented heading.
    Error,
}

/// Rendered SVG as the overlay knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramImage {
    /// Where the SVG was saved, if it was.
    pub path: Option<PathBuf>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub svg_bytes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Text(String),
    Image(DiagramImage),
    /// Collapsible block; collapsed until toggled.
    Details {
        summary: String,
        body: String,
        expanded: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    id: &'static str,
    heading: String,
    tone: Tone,
    sections: Vec<Section>,
}

impl Overlay {
    pub fn new(heading: impl Into<String>, tone: Tone, sections: Vec<Section>) -> Self {
        Self {
            id: OVERLAY_ID,
            heading: heading.into(),
            tone,
            sections,
        }
    }

    /// Result overlay: heading, image, collapsible cleaned source.
    pub fn diagram(image: DiagramImage, source: impl Into<String>) -> Self {
        Self::new(
            DIAGRAM_HEADING,
            Tone::Normal,
            vec![
                Section::Image(image),
                Section::Details {
                    summary: SOURCE_DETAILS_SUMMARY.to_owned(),
                    body: source.into(),
                    expanded: false,
                },
            ],
        )
    }

    /// Error overlay: red heading, message as plain text.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ERROR_HEADING, Tone::Error, vec![Section::Text(message.into())])
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn heading(&self) -> &str {
        &self.heading
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn image(&self) -> Option<&DiagramImage> {
        self.sections.iter().find_map(|section| match section {
            Section::Image(image) => Some(image),
            _ => None,
        })
    }

    /// Body of the first details section (the Mermaid source for diagram overlays).
    pub fn details_body(&self) -> Option<&str> {
        self.sections.iter().find_map(|section| match section {
            Section::Details { body, .. } => Some(body.as_str()),
            _ => None,
        })
    }

    /// Flips every details section. Returns whether any section exists.
    pub fn toggle_details(&mut self) -> bool {
        let mut toggled = false;
        for section in &mut self.sections {
            if let Section::Details { expanded, .. } = section {
                *expanded = !*expanded;
                toggled = true;
            }
        }
        toggled
    }

    /// Plain-text rendition for non-interactive output.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.heading);
        out.push('\n');
        for section in &self.sections {
            out.push('\n');
            match section {
                Section::Text(text) => out.push_str(text),
                Section::Image(image) => out.push_str(&describe_image(image)),
                Section::Details { summary, body, .. } => {
                    out.push_str(summary);
                    out.push_str(":\n");
                    out.push_str(body);
                }
            }
            out.push('\n');
        }
        out
    }
}

/// One-line description of a rendered image, e.g. `SVG 640×480 (12.3 KiB) → /tmp/d.svg`.
pub fn describe_image(image: &DiagramImage) -> String {
    let mut out = String::from("SVG");
    if let (Some(width), Some(height)) = (image.width, image.height) {
        out.push_str(&format!(" {}×{}", width.round(), height.round()));
    }
    out.push_str(&format!(" ({:.1} KiB)", image.svg_bytes as f64 / 1024.0));
    if let Some(path) = &image.path {
        out.push_str(&format!(" → {}", path.display()));
    }
    out
}

/// What a pointer event landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Backdrop,
    Panel,
    CloseControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    Escape,
    /// Any key other than Escape.
    OtherKey,
    Click(HitTarget),
}

impl OverlayEvent {
    pub fn dismisses(self) -> bool {
        matches!(
            self,
            Self::Escape | Self::Click(HitTarget::Backdrop) | Self::Click(HitTarget::CloseControl)
        )
    }
}

/// Mount point for the single overlay.
#[derive(Debug, Default)]
pub struct OverlayHost {
    current: Option<Overlay>,
}

impl OverlayHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts `overlay`, replacing (and returning) whatever was mounted.
    pub fn mount(&mut self, overlay: Overlay) -> Option<Overlay> {
        self.current.replace(overlay)
    }

    pub fn dismiss(&mut self) -> Option<Overlay> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&Overlay> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Overlay> {
        self.current.as_mut()
    }

    pub fn is_mounted(&self) -> bool {
        self.current.is_some()
    }

    /// Applies `event`; returns `true` if it removed the overlay.
    pub fn handle(&mut self, event: OverlayEvent) -> bool {
        if self.current.is_none() || !event.dismisses() {
            return false;
        }
        self.current = None;
        true
    }
}
