// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Zukai CLI entrypoint.
//!
//! By default this opens the terminal viewer on a text file (or the demo document). `generate`
//! runs the same pipeline headless, and `settings` manages the stored Gemini API key.

use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};

use zukai::config::Config;
use zukai::credential::{CredentialStore, FileCredentialStore};
use zukai::diagram::DiagramKind;
use zukai::dispatch::{DispatchOutcome, Dispatcher};
use zukai::gemini::{DiagramRequester, GeminiClient, GeminiRequester};
use zukai::logging::{self, LogTarget};
use zukai::overlay::{describe_image, Overlay, Section, Tone};
use zukai::page::HeadlessPage;
use zukai::renderer::{EngineConfig, Renderer, SvgTarget};
use zukai::settings::SettingsForm;
use zukai::tui::{self, Document};

#[derive(Debug, Parser)]
#[command(name = "zukai", version, about = "Turn selected text into AI-generated diagrams")]
struct Cli {
    /// Text file to open in the viewer (defaults to the demo document).
    #[arg(value_name = "FILE", conflicts_with = "demo")]
    file: Option<PathBuf>,

    /// Open the built-in demo document.
    #[arg(long)]
    demo: bool,

    /// Config file (default: <config dir>/zukai/config.json).
    #[arg(long, global = true, value_name = "PATH", env = "ZUKAI_CONFIG")]
    config: Option<PathBuf>,

    /// Write logs to this file.
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Abort Gemini requests after this many seconds.
    #[arg(long, global = true, value_name = "N")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate one diagram from a file or stdin, without the viewer.
    Generate {
        /// flowchart, mindmap, sequence, or a menu item id.
        #[arg(long, default_value = "flowchart")]
        kind: DiagramKind,

        /// Read the text from this file instead of stdin.
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Write the SVG here instead of the output directory.
        #[arg(long, value_name = "FILE.svg")]
        out: Option<PathBuf>,
    },
    /// Manage the stored Gemini API key.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Test the key against Gemini and store it if it works.
    SetKey { key: String },
    /// Print the stored key, masked.
    Show,
    /// Remove the stored key.
    Clear,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("zukai: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(secs) = cli.timeout_secs {
        config.request_timeout_secs = Some(secs);
    }
    if let Some(path) = cli.log_file {
        config.log_file = Some(path);
    }

    let store = Arc::new(FileCredentialStore::new(config.credential_path()?));
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

    match cli.command {
        Some(Commands::Generate { kind, input, out }) => {
            logging::init(log_target(&config, LogTarget::Stderr))?;
            runtime.block_on(generate(&config, store, kind, input.as_deref(), out))
        }
        Some(Commands::Settings { action }) => {
            logging::init(log_target(&config, LogTarget::Stderr))?;
            runtime.block_on(settings(&config, &store, action))
        }
        None => {
            // The viewer owns the terminal, so logs only go to a file when one is configured.
            logging::init(log_target(&config, LogTarget::Off))?;
            let document = match &cli.file {
                Some(path) => Document::open(path)
                    .map_err(|err| format!("failed to open {}: {err}", path.display()))?,
                None => Document::demo(),
            };
            view(&config, store, document, &runtime)
        }
    }
}

fn log_target<'a>(config: &'a Config, fallback: LogTarget<'static>) -> LogTarget<'a> {
    config.log_file.as_deref().map_or(fallback, LogTarget::File)
}

fn view(
    config: &Config,
    store: Arc<FileCredentialStore>,
    document: Document,
    runtime: &tokio::runtime::Runtime,
) -> Result<(), Box<dyn Error>> {
    let client = GeminiClient::from_config(config)?;
    let requester: Arc<dyn DiagramRequester> =
        Arc::new(GeminiRequester::new(client.clone(), store.clone()));
    let services = tui::Services {
        dispatcher: Dispatcher::new(requester),
        renderer: Arc::new(Renderer::mermaid(EngineConfig::default())),
        target: SvgTarget::Dir(config.output_dir()),
        store,
        validator: Arc::new(client),
    };

    let tui_result = runtime.block_on(async move {
        let handle = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || {
            tui::run(document, services, handle).map_err(|err| err.to_string())
        })
        .await
    })?;
    tui_result.map_err(|err| -> Box<dyn Error> { err.into() })
}

async fn generate(
    config: &Config,
    store: Arc<FileCredentialStore>,
    kind: DiagramKind,
    input: Option<&Path>,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let text = match input {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| format!("failed to read {}: {err}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let client = GeminiClient::from_config(config)?;
    let dispatcher = Dispatcher::new(Arc::new(GeminiRequester::new(client, store)));
    let target = match out {
        Some(path) => SvgTarget::File(path),
        None => SvgTarget::Dir(config.output_dir()),
    };
    let renderer = Arc::new(Renderer::mermaid(EngineConfig::default()));
    let page = HeadlessPage::new(Some(text), renderer, target);

    let outcome = dispatcher.handle_menu_click(kind.menu_item_id(), &page).await?;
    if outcome == DispatchOutcome::NoSelection {
        return Err("input is empty; nothing to diagram".into());
    }

    let Some(overlay) = page.take_overlay() else {
        return Err("no diagram was produced".into());
    };
    if overlay.tone() == Tone::Error {
        return Err(overlay_message(&overlay).into());
    }

    if let Some(source) = overlay.details_body() {
        println!("{source}");
    }
    if let Some(image) = overlay.image() {
        eprintln!("zukai: {}", describe_image(image));
    }
    Ok(())
}

fn overlay_message(overlay: &Overlay) -> String {
    overlay
        .sections()
        .iter()
        .find_map(|section| match section {
            Section::Text(text) => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_else(|| overlay.heading().to_owned())
}

async fn settings(
    config: &Config,
    store: &FileCredentialStore,
    action: SettingsAction,
) -> Result<(), Box<dyn Error>> {
    match action {
        SettingsAction::SetKey { key } => {
            let client = GeminiClient::from_config(config)?;
            let mut form = SettingsForm::default();
            form.push_str(&key);
            let saved = form.submit(store, &client).await;
            let message = form
                .banner(Instant::now())
                .map(|banner| banner.message.clone())
                .unwrap_or_default();
            if !saved {
                return Err(message.into());
            }
            println!("{message} ({})", store.path().display());
        }
        SettingsAction::Show => match store.load()? {
            Some(key) => println!("{}", key.masked()),
            None => println!("No API key stored ({})", store.path().display()),
        },
        SettingsAction::Clear => {
            store.clear()?;
            println!("API key removed ({})", store.path().display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_empty_args() {
        let cli = Cli::try_parse_from(["zukai"]).expect("parse");
        assert!(cli.file.is_none());
        assert!(!cli.demo);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_file_and_globals() {
        let cli = Cli::try_parse_from(["zukai", "notes.txt", "--timeout-secs", "30"])
            .expect("parse");
        assert_eq!(cli.file.as_deref(), Some(Path::new("notes.txt")));
        assert_eq!(cli.timeout_secs, Some(30));
    }

    #[test]
    fn rejects_demo_with_file() {
        Cli::try_parse_from(["zukai", "--demo", "notes.txt"]).unwrap_err();
    }

    #[test]
    fn parses_generate_kinds() {
        let cli = Cli::try_parse_from(["zukai", "generate", "--kind", "zukai-mindmap"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Generate {
                kind: DiagramKind::MindMap,
                ..
            })
        ));

        let cli = Cli::try_parse_from(["zukai", "generate"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Generate {
                kind: DiagramKind::Flowchart,
                input: None,
                out: None
            })
        ));
    }

    #[test]
    fn rejects_unknown_generate_kind() {
        Cli::try_parse_from(["zukai", "generate", "--kind", "gantt"]).unwrap_err();
    }

    #[test]
    fn parses_settings_actions() {
        let cli = Cli::try_parse_from(["zukai", "settings", "set-key", "AIzaKey"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Settings {
                action: SettingsAction::SetKey { ref key }
            }) if key == "AIzaKey"
        ));
        Cli::try_parse_from(["zukai", "settings", "show"]).expect("parse");
        Cli::try_parse_from(["zukai", "settings", "clear"]).expect("parse");
        Cli::try_parse_from(["zukai", "settings"]).unwrap_err();
    }

    #[test]
    fn log_target_prefers_configured_file() {
        let mut config = Config::default();
        assert_eq!(log_target(&config, LogTarget::Off), LogTarget::Off);
        assert_eq!(log_target(&config, LogTarget::Stderr), LogTarget::Stderr);

        config.log_file = Some(PathBuf::from("/tmp/zukai.log"));
        assert_eq!(
            log_target(&config, LogTarget::Off),
            LogTarget::File(Path::new("/tmp/zukai.log"))
        );
    }

    #[test]
    fn overlay_message_prefers_text_section() {
        assert_eq!(
            overlay_message(&Overlay::error("Gemini API error: 429")),
            "Gemini API error: 429"
        );
    }
}
