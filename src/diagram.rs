// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Diagram kinds and the context-menu surface that selects them.

use std::fmt;
use std::str::FromStr;

pub const MENU_PARENT_ID: &str = "zukai-parent";
pub const MENU_FLOWCHART_ID: &str = "zukai-flowchart";
pub const MENU_MINDMAP_ID: &str = "zukai-mindmap";
pub const MENU_SEQUENCE_ID: &str = "zukai-sequence";

/// Prefix shared by every menu item this crate registers.
pub const MENU_ID_PREFIX: &str = "zukai-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiagramKind {
    #[default]
    Flowchart,
    MindMap,
    Sequence,
}

impl DiagramKind {
    pub const ALL: [Self; 3] = [Self::Flowchart, Self::MindMap, Self::Sequence];

    /// Maps a clicked menu item to a diagram kind.
    ///
    /// Unrecognized identifiers fall back to [`DiagramKind::Flowchart`].
    pub fn from_menu_item(menu_item_id: &str) -> Self {
        match menu_item_id {
            MENU_FLOWCHART_ID => Self::Flowchart,
            MENU_MINDMAP_ID => Self::MindMap,
            MENU_SEQUENCE_ID => Self::Sequence,
            _ => Self::Flowchart,
        }
    }

    pub fn menu_item_id(self) -> &'static str {
        match self {
            Self::Flowchart => MENU_FLOWCHART_ID,
            Self::MindMap => MENU_MINDMAP_ID,
            Self::Sequence => MENU_SEQUENCE_ID,
        }
    }

    /// Canonical label embedded in the generation prompt.
    pub fn label(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::MindMap => "mind map",
            Self::Sequence => "sequence diagram",
        }
    }

    /// Title shown in the context menu.
    pub fn menu_title(self) -> &'static str {
        match self {
            Self::Flowchart => "Flowchart",
            Self::MindMap => "Mind map",
            Self::Sequence => "Sequence diagram",
        }
    }

    /// Mermaid header keyword the model is asked to start with.
    pub fn mermaid_keyword(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::MindMap => "mindmap",
            Self::Sequence => "sequenceDiagram",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown diagram kind: {0} (expected flowchart, mindmap, or sequence)")]
pub struct ParseDiagramKindError(String);

impl FromStr for DiagramKind {
    type Err = ParseDiagramKindError;

    /// Accepts short names (`flowchart`, `mindmap`, `sequence`) and full menu ids.
    ///
    /// Unlike [`DiagramKind::from_menu_item`] this is strict: it backs CLI input where a typo
    /// should be reported rather than silently mapped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let short = normalized.strip_prefix(MENU_ID_PREFIX).unwrap_or(&normalized);
        match short {
            "flowchart" | "flow" => Ok(Self::Flowchart),
            "mindmap" | "mind-map" | "mind_map" => Ok(Self::MindMap),
            "sequence" | "sequencediagram" | "seq" => Ok(Self::Sequence),
            _ => Err(ParseDiagramKindError(s.to_owned())),
        }
    }
}

/// One entry of the context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub id: &'static str,
    pub parent_id: Option<&'static str>,
    pub title: &'static str,
}

pub const MENU_PARENT: MenuItem = MenuItem {
    id: MENU_PARENT_ID,
    parent_id: None,
    title: "AI diagram",
};

pub const MENU_ITEMS: [MenuItem; 3] = [
    MenuItem {
        id: MENU_FLOWCHART_ID,
        parent_id: Some(MENU_PARENT_ID),
        title: "Flowchart",
    },
    MenuItem {
        id: MENU_MINDMAP_ID,
        parent_id: Some(MENU_PARENT_ID),
        title: "Mind map",
    },
    MenuItem {
        id: MENU_SEQUENCE_ID,
        parent_id: Some(MENU_PARENT_ID),
        title: "Sequence diagram",
    },
];

/// Returns the selectable menu entries; the menu only exists while text is selected.
pub fn context_menu(has_selection: bool) -> &'static [MenuItem] {
    if has_selection {
        &MENU_ITEMS
    } else {
        &[]
    }
}
