// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Zukai: select text, get an AI-generated diagram.
//!
//! The pipeline is menu click → [`dispatch`] → [`gemini`] → [`renderer`] → [`overlay`], with the
//! page side (selection and overlay) behind [`page::PageAgent`]. The terminal viewer lives in
//! [`tui`]; [`page::HeadlessPage`] drives the same flow without a terminal.

pub mod config;
pub mod credential;
pub mod diagram;
pub mod dispatch;
pub mod gemini;
pub mod logging;
pub mod overlay;
pub mod page;
pub mod renderer;
pub mod settings;
pub mod tui;
