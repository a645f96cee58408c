// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::{
    draw, footer_line, osc52_sequence, overlay_lines, shell_single_quote, spawn_command, App,
    AppCommand, Document, ExternalAction, PageEvent, Services, TerminalPage,
};
use crate::credential::{Credential, CredentialStore, MemoryCredentialStore};
use crate::diagram::{DiagramKind, MENU_FLOWCHART_ID, MENU_MINDMAP_ID};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::gemini::{DiagramRequester, KeyValidationError, KeyValidator, RequestError};
use crate::overlay::{Overlay, Tone, DIAGRAM_HEADING};
use crate::page::{PageAgent, PageError};
use crate::renderer::{DiagramLibrary, LibrarySource, LoadError, Renderer, SvgTarget};
use crate::settings::{Banner, BannerKind, BAD_PREFIX_MESSAGE};
use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{backend::TestBackend, layout::Position, Terminal};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

fn line_to_string(line: &ratatui::text::Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect::<String>()
}

fn sample_document() -> Document {
    Document::new("notes.txt", "first line\nsecond line\nthird line\nfourth line")
}

fn app() -> App {
    App::new(sample_document(), Arc::new(MemoryCredentialStore::new()))
}

fn app_with_store(store: Arc<MemoryCredentialStore>) -> App {
    App::new(sample_document(), store)
}

fn render(app: &mut App) -> Terminal<TestBackend> {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).expect("test terminal");
    terminal.draw(|frame| draw(frame, app)).expect("draw");
    terminal
}

fn click(app: &mut App, x: u16, y: u16) {
    app.handle_mouse(MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column: x,
        row: y,
        modifiers: KeyModifiers::NONE,
    });
}

fn select_first_two_lines(app: &mut App) {
    app.handle_key_code(KeyCode::Char('v'));
    app.handle_key_code(KeyCode::Char('j'));
}

#[test]
fn document_keeps_at_least_one_line() {
    assert_eq!(Document::new("empty", "").lines(), [String::new()]);
    assert_eq!(Document::demo().title(), "demo.txt");
    assert!(Document::demo().lines().len() > 10);
}

#[test]
fn visual_selection_spans_lines_in_either_direction() {
    let mut app = app();
    assert_eq!(app.selected_text(), None);

    app.handle_key_code(KeyCode::Char('j'));
    app.handle_key_code(KeyCode::Char('j'));
    app.handle_key_code(KeyCode::Char('v'));
    app.handle_key_code(KeyCode::Char('k'));
    assert_eq!(app.selection_range(), Some((1, 2)));
    assert_eq!(app.selected_text().as_deref(), Some("second line\nthird line"));

    app.handle_key_code(KeyCode::Char('v'));
    assert_eq!(app.selected_text(), None);
}

#[test]
fn cursor_is_clamped_to_document() {
    let mut app = app();
    app.handle_key_code(KeyCode::Char('k'));
    assert_eq!(app.cursor, 0);
    app.handle_key_code(KeyCode::Char('G'));
    app.handle_key_code(KeyCode::Char('j'));
    assert_eq!(app.cursor, 3);
}

#[test]
fn select_all_covers_document() {
    let mut app = app();
    app.handle_key_code(KeyCode::Char('a'));
    assert_eq!(
        app.selected_text().as_deref(),
        Some("first line\nsecond line\nthird line\nfourth line")
    );
}

#[test]
fn menu_requires_selection() {
    let mut app = app();
    app.handle_key_code(KeyCode::Enter);
    assert!(app.menu.is_none());
    assert!(app.toast.as_ref().is_some_and(|toast| toast.message.contains("Select text")));
    assert!(app.take_commands().is_empty());
}

#[test]
fn choosing_menu_item_queues_generation_with_selection() {
    let mut app = app();
    select_first_two_lines(&mut app);
    app.handle_key_code(KeyCode::Char('m'));
    assert_eq!(app.menu.as_ref().map(|menu| menu.items.len()), Some(3));

    app.handle_key_code(KeyCode::Char('j'));
    app.handle_key_code(KeyCode::Enter);

    assert!(app.menu.is_none());
    assert_eq!(app.pending, 1);
    let commands = app.take_commands();
    assert_eq!(commands.len(), 1);
    match &commands[0] {
        AppCommand::Generate {
            menu_item_id,
            selection,
        } => {
            assert_eq!(*menu_item_id, MENU_MINDMAP_ID);
            assert_eq!(selection.as_deref(), Some("first line\nsecond line"));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn escape_closes_menu_then_clears_selection() {
    let mut app = app();
    select_first_two_lines(&mut app);
    app.handle_key_code(KeyCode::Enter);
    app.handle_key_code(KeyCode::Esc);
    assert!(app.menu.is_none());
    assert!(app.anchor.is_some());
    app.handle_key_code(KeyCode::Esc);
    assert!(app.anchor.is_none());
}

#[test]
fn escape_dismisses_overlay_before_anything_else() {
    let mut app = app();
    select_first_two_lines(&mut app);
    app.apply_page_event(PageEvent::Mount(Overlay::error("Gemini API error: 429")));

    assert!(!app.handle_key_code(KeyCode::Char('q')));
    assert!(app.overlay.is_mounted());
    app.handle_key_code(KeyCode::Char('x'));
    assert!(app.overlay.is_mounted());

    app.handle_key_code(KeyCode::Esc);
    assert!(!app.overlay.is_mounted());
    assert!(app.anchor.is_some());
}

#[test]
fn overlay_mouse_hits_follow_backdrop_panel_and_close_control() {
    let mut app = app();
    app.apply_page_event(PageEvent::Mount(Overlay::error("boom")));
    render(&mut app);

    let panel = app.hit_areas.overlay_panel.expect("panel area");
    let close = app.hit_areas.overlay_close.expect("close area");
    assert!(panel.contains(Position::new(close.x, close.y)));

    click(&mut app, panel.x + panel.width / 2, panel.y + panel.height / 2);
    assert!(app.overlay.is_mounted());

    click(&mut app, 0, 0);
    assert!(!app.overlay.is_mounted());

    app.apply_page_event(PageEvent::Mount(Overlay::error("again")));
    render(&mut app);
    click(&mut app, close.x + 1, close.y);
    assert!(!app.overlay.is_mounted());
}

#[test]
fn overlay_renders_heading_and_close_control() {
    let mut app = app();
    app.apply_page_event(PageEvent::Mount(Overlay::error("Gemini API error: 429")));
    let terminal = render(&mut app);

    let screen = terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|cell| cell.symbol())
        .collect::<String>();
    assert!(screen.contains("Error"));
    assert!(screen.contains("429"));
    assert!(screen.contains("[×]"));
}

#[test]
fn details_toggle_reveals_source_lines() {
    let image = crate::overlay::DiagramImage {
        path: None,
        width: Some(100.0),
        height: Some(50.0),
        svg_bytes: 512,
    };
    let mut app = app();
    app.apply_page_event(PageEvent::Mount(Overlay::diagram(image, "flowchart TD\nA-->B")));

    let collapsed = overlay_lines(app.overlay.current().unwrap())
        .iter()
        .map(line_to_string)
        .collect::<Vec<_>>();
    assert!(collapsed.iter().any(|line| line.starts_with("▸ Mermaid source")));
    assert!(!collapsed.iter().any(|line| line.contains("A-->B")));

    app.handle_key_code(KeyCode::Char('d'));
    let expanded = overlay_lines(app.overlay.current().unwrap())
        .iter()
        .map(line_to_string)
        .collect::<Vec<_>>();
    assert!(expanded.iter().any(|line| line.starts_with("▾ Mermaid source")));
    assert!(expanded.contains(&"  A-->B".to_owned()));
}

#[test]
fn open_requires_saved_svg() {
    let mut app = app();
    app.apply_page_event(PageEvent::Mount(Overlay::error("boom")));
    app.handle_key_code(KeyCode::Char('o'));
    assert_eq!(app.take_external_action(), None);

    let image = crate::overlay::DiagramImage {
        path: Some("/tmp/zukai/diagram.svg".into()),
        width: None,
        height: None,
        svg_bytes: 10,
    };
    app.apply_page_event(PageEvent::Mount(Overlay::diagram(image, "A-->B")));
    app.handle_key_code(KeyCode::Char('o'));
    assert_eq!(
        app.take_external_action(),
        Some(ExternalAction::OpenSvg("/tmp/zukai/diagram.svg".into()))
    );
}

#[test]
fn drag_selects_lines_under_pointer() {
    let mut app = app();
    render(&mut app);
    let doc = app.hit_areas.document.expect("document area");

    click(&mut app, doc.x + 3, doc.y + 1);
    app.handle_mouse(MouseEvent {
        kind: MouseEventKind::Drag(MouseButton::Left),
        column: doc.x + 3,
        row: doc.y + 3,
        modifiers: KeyModifiers::NONE,
    });
    assert_eq!(app.selection_range(), Some((0, 2)));
}

#[test]
fn right_click_opens_menu_and_click_chooses_item() {
    let mut app = app();
    select_first_two_lines(&mut app);
    render(&mut app);
    let doc = app.hit_areas.document.expect("document area");

    app.handle_mouse(MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Right),
        column: doc.x + 3,
        row: doc.y + 1,
        modifiers: KeyModifiers::NONE,
    });
    assert!(app.menu.is_some());
    render(&mut app);
    let menu = app.hit_areas.menu.expect("menu area");

    click(&mut app, menu.x + 2, menu.y + 1);
    let commands = app.take_commands();
    assert!(matches!(
        commands.as_slice(),
        [AppCommand::Generate { menu_item_id, .. }] if *menu_item_id == MENU_FLOWCHART_ID
    ));
}

#[test]
fn finished_runs_update_pending_and_toast() {
    let mut app = app();
    app.pending = 2;
    app.apply_page_event(PageEvent::Finished(Ok(DispatchOutcome::NoSelection)));
    assert_eq!(app.pending, 1);
    assert!(app.toast.as_ref().is_some_and(|toast| toast.message == "No text selected"));

    app.apply_page_event(PageEvent::Finished(Err("page is no longer available".to_owned())));
    assert_eq!(app.pending, 0);
    app.apply_page_event(PageEvent::Finished(Ok(DispatchOutcome::Rendered)));
    assert_eq!(app.pending, 0);
}

#[test]
fn footer_shows_pending_count() {
    let mut app = app();
    app.pending = 2;
    let footer = line_to_string(&footer_line(&app, ""));
    assert!(footer.contains("Pending:2"), "{footer}");
    assert!(footer.contains("Diagram:m"), "{footer}");
}

#[test]
fn settings_form_checks_prefix_before_queueing() {
    let store = Arc::new(MemoryCredentialStore::with_key("AIzaStored"));
    let mut app = app_with_store(store.clone());

    app.handle_key_code(KeyCode::Char('s'));
    assert_eq!(app.settings.as_ref().map(|form| form.input()), Some("AIzaStored"));

    app.handle_key_code(KeyCode::Delete);
    for ch in "sk-123".chars() {
        app.handle_key_code(KeyCode::Char(ch));
    }
    app.handle_key_code(KeyCode::Enter);
    assert!(app.take_commands().is_empty());
    let banner = app.settings.as_mut().and_then(|form| form.banner(Instant::now()).cloned());
    assert_eq!(banner.map(|banner| banner.message), Some(BAD_PREFIX_MESSAGE.to_owned()));

    app.handle_key_code(KeyCode::Delete);
    for ch in "AIzaFresh".chars() {
        app.handle_key_code(KeyCode::Char(ch));
    }
    app.handle_key_code(KeyCode::Enter);
    assert!(app.settings_checking);
    assert!(matches!(app.take_commands().as_slice(), [AppCommand::CheckKey(_)]));

    app.apply_page_event(PageEvent::KeyChecked(Banner::success("Settings saved.", Instant::now())));
    assert!(!app.settings_checking);
    let banner = app.settings.as_mut().and_then(|form| form.banner(Instant::now()).cloned());
    assert_eq!(banner.map(|banner| banner.kind), Some(BannerKind::Success));
}

#[test]
fn osc52_wraps_base64_payload() {
    assert_eq!(osc52_sequence("A-->B"), "\x1b]52;c;QS0tPkI=\x1b\\");
}

#[test]
fn shell_quote_escapes_single_quotes() {
    assert_eq!(shell_single_quote("it's.svg"), "'it'\\''s.svg'");
}

struct StubLibrary;

impl DiagramLibrary for StubLibrary {
    fn render_svg(&self, source: &str) -> Result<String, String> {
        Ok(format!("<svg width=\"4\" height=\"4\"><desc>{source}</desc></svg>"))
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

struct FixedRequester;

#[async_trait]
impl DiagramRequester for FixedRequester {
    async fn request_diagram(&self, _text: &str, kind: DiagramKind) -> Result<String, RequestError> {
        Ok(format!("```mermaid\n{}\nA-->B\n```", kind.mermaid_keyword()))
    }
}

struct AcceptingValidator;

#[async_trait]
impl KeyValidator for AcceptingValidator {
    async fn validate_key(&self, _key: &Credential) -> Result<(), KeyValidationError> {
        Ok(())
    }
}

fn services(dir: &std::path::Path, store: Arc<MemoryCredentialStore>) -> Services<StubSource> {
    let requester: Arc<dyn DiagramRequester> = Arc::new(FixedRequester);
    Services {
        dispatcher: Dispatcher::new(requester),
        renderer: Arc::new(Renderer::new(StubSource)),
        target: SvgTarget::Dir(dir.to_path_buf()),
        store,
        validator: Arc::new(AcceptingValidator),
    }
}

#[tokio::test]
async fn generate_command_mounts_diagram_then_finishes() {
    let tmp = tempfile::tempdir().unwrap();
    let services = services(tmp.path(), Arc::new(MemoryCredentialStore::new()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    spawn_command(
        &tokio::runtime::Handle::current(),
        &services,
        &tx,
        AppCommand::Generate {
            menu_item_id: MENU_FLOWCHART_ID,
            selection: Some("A then B".to_owned()),
        },
    );

    let mut app = app();
    app.pending = 1;
    match rx.recv().await {
        Some(event @ PageEvent::Mount(_)) => app.apply_page_event(event),
        other => panic!("expected mount, got {other:?}"),
    }
    let overlay = app.overlay.current().expect("overlay");
    assert_eq!(overlay.heading(), DIAGRAM_HEADING);
    assert_eq!(overlay.details_body(), Some("flowchart\nA-->B"));

    match rx.recv().await {
        Some(event @ PageEvent::Finished(Ok(DispatchOutcome::Rendered))) => {
            app.apply_page_event(event)
        }
        other => panic!("expected finish, got {other:?}"),
    }
    assert_eq!(app.pending, 0);
}

#[tokio::test]
async fn check_key_command_saves_and_reports() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryCredentialStore::new());
    let services = services(tmp.path(), store.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();

    spawn_command(
        &tokio::runtime::Handle::current(),
        &services,
        &tx,
        AppCommand::CheckKey(Credential::new("AIzaFresh").unwrap()),
    );

    match rx.recv().await {
        Some(PageEvent::KeyChecked(banner)) => assert_eq!(banner.kind, BannerKind::Success),
        other => panic!("expected key check, got {other:?}"),
    }
    assert_eq!(store.load().unwrap().unwrap().expose(), "AIzaFresh");
}

#[tokio::test]
async fn terminal_page_reports_closed_viewer() {
    let tmp = tempfile::tempdir().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let page = TerminalPage::new(
        None,
        Arc::new(Renderer::new(StubSource)),
        SvgTarget::Dir(tmp.path().to_path_buf()),
        tx,
    );
    drop(rx);

    assert!(matches!(
        page.render_diagram("A-->B".to_owned()).await,
        Err(PageError::Closed)
    ));
    assert!(matches!(
        page.show_error("boom".to_owned()).await,
        Err(PageError::Closed)
    ));
}

#[tokio::test]
async fn terminal_page_sends_error_overlay() {
    let tmp = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let page = TerminalPage::new(
        Some("text".to_owned()),
        Arc::new(Renderer::new(StubSource)),
        SvgTarget::Dir(tmp.path().to_path_buf()),
        tx,
    );

    assert_eq!(page.selection().await.unwrap().as_deref(), Some("text"));
    page.show_error("Gemini API error: 429".to_owned()).await.unwrap();
    match rx.recv().await {
        Some(PageEvent::Mount(overlay)) => {
            assert_eq!(overlay.tone(), Tone::Error);
            assert!(overlay.to_plain_text().contains("429"));
        }
        other => panic!("expected mount, got {other:?}"),
    }
}
