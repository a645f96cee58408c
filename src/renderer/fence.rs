// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::OnceLock;

use regex::Regex;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    // `mermaid` is removed even when the payload continues on the same line; any other tag only
    // counts when it ends the line, so "```graph TD" keeps its header.
    FENCE.get_or_init(|| {
        Regex::new(r"```(?:mermaid\b|[\w+.-]*[ \t]*(?:\r?\n|$))|```").expect("valid fence regex")
    })
}

/// Removes triple-backtick fence markers and surrounding whitespace.
///
/// Stripping is idempotent: a stripped string contains no fence markers.
pub fn strip_fences(raw: &str) -> String {
    fence_regex().replace_all(raw, "").trim().to_owned()
}
