// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Terminal UI.
//!
//! A document viewer (ratatui + crossterm) that acts as the page: lines are selected with the
//! keyboard or mouse, the AI diagram menu starts a pipeline run on the async runtime, and results
//! come back as a dismissible overlay.

use std::{
    env,
    error::Error,
    fs, io,
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
    time::{Duration, Instant},
};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::credential::{Credential, CredentialStore};
use crate::diagram::{context_menu, DiagramKind, MenuItem, MENU_PARENT};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::gemini::{DiagramRequester, KeyValidator};
use crate::overlay::{describe_image, HitTarget, Overlay, OverlayEvent, OverlayHost, Section, Tone};
use crate::renderer::{DiagramLibrary, LibrarySource, Renderer, SvgTarget};
use crate::settings::{validate_and_save, BannerKind, SettingsForm};

mod page;

pub use page::{PageEvent, TerminalPage};

const FOCUS_COLOR: Color = Color::LightGreen;
const SELECTION_BG: Color = Color::Blue;
const FOOTER_LABEL_COLOR: Color = Color::Gray;
const FOOTER_KEY_COLOR: Color = Color::Cyan;
const FOOTER_BRAND_COLOR: Color = Color::White;
const FOOTER_BRAND: &str = "図解 zukai ";
const CLOSE_CONTROL: &str = "[×]";
const TOAST_TTL: Duration = Duration::from_secs(3);

/// Text shown in the viewer, one entry per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    title: String,
    lines: Vec<String>,
}

impl Document {
    pub fn new(title: impl Into<String>, text: &str) -> Self {
        let mut lines = text.lines().map(str::to_owned).collect::<Vec<_>>();
        if lines.is_empty() {
            lines.push(String::new());
        }
        Self {
            title: title.into(),
            lines,
        }
    }

    pub fn open(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(title, &text))
    }

    pub fn demo() -> Self {
        Self::new("demo.txt", DEMO_TEXT)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

const DEMO_TEXT: &str = "\
Zukai demo document
===================

Select a passage (v, then j/k), press Enter, and pick a diagram type.

Order fulfilment
----------------
A customer places an order in the web shop. The shop checks stock with the warehouse.
If every item is in stock, payment is captured and the warehouse picks and packs the order.
If something is missing, the customer is offered a partial shipment or a refund.
Packed orders are handed to the carrier, and the customer receives a tracking link.

Support escalation
------------------
Customer: reports that the tracking link shows no movement for three days.
Support agent: checks the carrier status and opens a ticket with the carrier.
Carrier: replies that the parcel was misrouted and gives a new delivery date.
Support agent: forwards the new date to the customer and offers a voucher.

Team retrospective
------------------
What went well: faster packing after the new shelf layout; fewer refund requests.
What was hard: carrier hand-off at peak hours; unclear stock numbers on Mondays.
Ideas: a second pickup slot, nightly stock sync, and a shared incident channel.
";

/// Everything a pipeline run or settings submit needs outside the UI thread.
pub struct Services<S: LibrarySource> {
    pub dispatcher: Dispatcher<dyn DiagramRequester>,
    pub renderer: Arc<Renderer<S>>,
    pub target: SvgTarget,
    pub store: Arc<dyn CredentialStore>,
    pub validator: Arc<dyn KeyValidator>,
}

/// Runs the interactive viewer until the user quits.
///
/// Must be called off the async runtime's worker threads (e.g. from `spawn_blocking`); pipeline
/// runs are spawned onto `runtime`.
pub fn run<S>(
    document: Document,
    services: Services<S>,
    runtime: Handle,
) -> Result<(), Box<dyn Error>>
where
    S: LibrarySource,
    S::Library: DiagramLibrary,
{
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut terminal = TerminalSession::new()?;
    let mut app = App::new(document, services.store.clone());

    while !app.should_quit {
        while let Ok(event) = events_rx.try_recv() {
            app.apply_page_event(event);
        }
        for command in app.take_commands() {
            spawn_command(&runtime, &services, &events_tx, command);
        }
        terminal.draw(|frame| draw(frame, &mut app))?;

        if event::poll(Duration::from_millis(250))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
            if let Some(action) = app.take_external_action() {
                let result = terminal.run_external_action(|| execute_external_action(&action));
                match result {
                    Ok(()) => app.set_toast("Opened diagram"),
                    Err(err) => app.set_toast(format!("External action failed: {err}")),
                }
            }
        }
    }

    Ok(())
}

fn spawn_command<S>(
    runtime: &Handle,
    services: &Services<S>,
    events: &UnboundedSender<PageEvent>,
    command: AppCommand,
) where
    S: LibrarySource,
    S::Library: DiagramLibrary,
{
    match command {
        AppCommand::Generate {
            menu_item_id,
            selection,
        } => {
            let page = TerminalPage::new(
                selection,
                services.renderer.clone(),
                services.target.clone(),
                events.clone(),
            );
            let dispatcher = services.dispatcher.clone();
            runtime.spawn(async move {
                let outcome = dispatcher
                    .handle_menu_click(menu_item_id, &page)
                    .await
                    .map_err(|err| {
                        tracing::error!(error = %err, "pipeline could not reach the viewer");
                        err.to_string()
                    });
                page.finish(outcome);
            });
        }
        AppCommand::CheckKey(key) => {
            let store = services.store.clone();
            let validator = services.validator.clone();
            let events = events.clone();
            runtime.spawn(async move {
                let banner = validate_and_save(key, store.as_ref(), validator.as_ref()).await;
                if events.send(PageEvent::KeyChecked(banner)).is_err() {
                    tracing::debug!("viewer closed before key check finished");
                }
            });
        }
    }
}

fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.area();
    app.hit_areas = HitAreas::default();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    let main_area = layout[0];
    let status_area = layout[1];

    render_document(frame, app, main_area);

    let toast_snapshot = app.toast.as_ref().map(|toast| (toast.message.clone(), toast.expires_at));
    let toast_suffix = match toast_snapshot {
        Some((message, expires_at)) if expires_at > Instant::now() => format!(" | {message}"),
        Some(_) => {
            app.toast = None;
            String::new()
        }
        None => String::new(),
    };
    let status = Paragraph::new(footer_line(app, &toast_suffix));
    frame.render_widget(status, status_area);
    let brand = Paragraph::new(footer_brand_line()).alignment(Alignment::Right);
    frame.render_widget(brand, status_area);

    if app.menu.is_some() {
        render_menu(frame, app, main_area);
    }
    if app.settings.is_some() {
        render_settings(frame, app, main_area);
    }
    if app.show_help {
        render_help(frame, app, main_area);
    }
    if app.overlay.is_mounted() {
        render_overlay(frame, app, area);
    }
}

// Document, popup, overlay, and footer rendering helpers.
include!("chrome.rs");

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
enum AppCommand {
    Generate {
        menu_item_id: &'static str,
        selection: Option<String>,
    },
    CheckKey(Credential),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExternalAction {
    OpenSvg(PathBuf),
}

#[derive(Debug, Clone)]
struct ContextMenu {
    items: &'static [MenuItem],
    state: ListState,
}

impl ContextMenu {
    fn new(items: &'static [MenuItem]) -> Self {
        Self {
            items,
            state: ListState::default().with_selected(Some(0)),
        }
    }

    fn selected(&self) -> usize {
        self.state.selected().unwrap_or(0).min(self.items.len().saturating_sub(1))
    }

    fn move_by(&mut self, delta: isize) {
        let len = self.items.len() as isize;
        if len == 0 {
            return;
        }
        let next = (self.selected() as isize + delta).rem_euclid(len);
        self.state.select(Some(next as usize));
    }
}

/// Screen regions from the last draw, for mouse hit-testing.
#[derive(Debug, Clone, Copy, Default)]
struct HitAreas {
    document: Option<Rect>,
    menu: Option<Rect>,
    overlay_panel: Option<Rect>,
    overlay_close: Option<Rect>,
}

struct App {
    document: Document,
    cursor: usize,
    anchor: Option<usize>,
    scroll: usize,
    viewport_height: usize,
    menu: Option<ContextMenu>,
    overlay: OverlayHost,
    overlay_scroll: u16,
    store: Arc<dyn CredentialStore>,
    settings: Option<SettingsForm>,
    settings_checking: bool,
    show_help: bool,
    help_scroll: u16,
    toast: Option<Toast>,
    pending: usize,
    commands: Vec<AppCommand>,
    pending_external_action: Option<ExternalAction>,
    hit_areas: HitAreas,
    should_quit: bool,
}

impl App {
    fn new(document: Document, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            document,
            cursor: 0,
            anchor: None,
            scroll: 0,
            viewport_height: 1,
            menu: None,
            overlay: OverlayHost::new(),
            overlay_scroll: 0,
            store,
            settings: None,
            settings_checking: false,
            show_help: false,
            help_scroll: 0,
            toast: None,
            pending: 0,
            commands: Vec::new(),
            pending_external_action: None,
            hit_areas: HitAreas::default(),
            should_quit: false,
        }
    }

    fn last_line(&self) -> usize {
        self.document.lines.len().saturating_sub(1)
    }

    /// Inclusive line range of the selection.
    fn selection_range(&self) -> Option<(usize, usize)> {
        let anchor = self.anchor?;
        Some((anchor.min(self.cursor), anchor.max(self.cursor)))
    }

    fn selected_text(&self) -> Option<String> {
        let (start, end) = self.selection_range()?;
        Some(self.document.lines[start..=end].join("\n"))
    }

    fn move_cursor(&mut self, delta: isize) {
        let next = (self.cursor as isize + delta).clamp(0, self.last_line() as isize);
        self.cursor = next as usize;
    }

    fn ensure_cursor_visible(&mut self) {
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + self.viewport_height {
            self.scroll = self.cursor + 1 - self.viewport_height;
        }
    }

    fn toggle_selection(&mut self) {
        self.anchor = match self.anchor {
            Some(_) => None,
            None => Some(self.cursor),
        };
    }

    fn select_all(&mut self) {
        self.anchor = Some(0);
        self.cursor = self.last_line();
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.handle_key_code(key.code) {
            self.should_quit = true;
        }
    }

    /// Applies one key press; returns `true` when the viewer should quit.
    fn handle_key_code(&mut self, code: KeyCode) -> bool {
        if code == KeyCode::Esc {
            self.escape();
            return false;
        }
        if self.overlay.is_mounted() {
            self.handle_overlay_key(code);
            return false;
        }
        if self.settings.is_some() {
            self.handle_settings_key(code);
            return false;
        }
        if self.menu.is_some() {
            self.handle_menu_key(code);
            return false;
        }
        if self.show_help {
            match code {
                KeyCode::Char('?') => self.show_help = false,
                KeyCode::Char('q') => return true,
                KeyCode::Down | KeyCode::Char('j') => {
                    self.help_scroll = self.help_scroll.saturating_add(1)
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.help_scroll = self.help_scroll.saturating_sub(1)
                }
                _ => {}
            }
            return false;
        }

        let page = self.viewport_height.max(1) as isize;
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::PageDown => self.move_cursor(page),
            KeyCode::PageUp => self.move_cursor(-page),
            KeyCode::Home | KeyCode::Char('g') => self.cursor = 0,
            KeyCode::End | KeyCode::Char('G') => self.cursor = self.last_line(),
            KeyCode::Char('v') => self.toggle_selection(),
            KeyCode::Char('a') => self.select_all(),
            KeyCode::Enter | KeyCode::Char('m') => self.open_menu(),
            KeyCode::Char('s') => self.open_settings(),
            KeyCode::Char('?') => {
                self.show_help = true;
                self.help_scroll = 0;
            }
            _ => {}
        }
        false
    }

    /// Escape closes the topmost layer; the overlay always goes first.
    fn escape(&mut self) {
        if self.overlay.handle(OverlayEvent::Escape) {
            self.overlay_scroll = 0;
            return;
        }
        if self.menu.take().is_some() || self.settings.take().is_some() {
            return;
        }
        if self.show_help {
            self.show_help = false;
            return;
        }
        self.anchor = None;
    }

    fn handle_overlay_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('d') => {
                if let Some(overlay) = self.overlay.current_mut() {
                    overlay.toggle_details();
                }
            }
            KeyCode::Char('o') => self.open_saved_svg(),
            KeyCode::Char('y') => self.copy_source(),
            KeyCode::Down | KeyCode::Char('j') => {
                self.overlay_scroll = self.overlay_scroll.saturating_add(1)
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.overlay_scroll = self.overlay_scroll.saturating_sub(1)
            }
            _ => {
                self.overlay.handle(OverlayEvent::OtherKey);
            }
        }
    }

    fn handle_settings_key(&mut self, code: KeyCode) {
        let Some(form) = self.settings.as_mut() else {
            return;
        };
        match code {
            KeyCode::Enter => self.submit_settings(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Delete => form.clear_input(),
            KeyCode::Char(ch) => form.push_char(ch),
            _ => {}
        }
    }

    fn handle_menu_key(&mut self, code: KeyCode) {
        let Some(menu) = self.menu.as_mut() else {
            return;
        };
        match code {
            KeyCode::Down | KeyCode::Char('j') => menu.move_by(1),
            KeyCode::Up | KeyCode::Char('k') => menu.move_by(-1),
            KeyCode::Enter => {
                let index = menu.selected();
                self.choose_menu_item(index);
            }
            _ => {}
        }
    }

    fn open_menu(&mut self) {
        let items = context_menu(self.anchor.is_some());
        if items.is_empty() {
            self.set_toast("Select text first (v)");
            return;
        }
        self.menu = Some(ContextMenu::new(items));
    }

    fn choose_menu_item(&mut self, index: usize) {
        let Some(menu) = self.menu.take() else {
            return;
        };
        let Some(item) = menu.items.get(index) else {
            return;
        };

        let kind = DiagramKind::from_menu_item(item.id);
        self.commands.push(AppCommand::Generate {
            menu_item_id: item.id,
            selection: self.selected_text(),
        });
        self.pending += 1;
        self.set_toast(format!("Generating {}…", kind.label()));
    }

    fn open_settings(&mut self) {
        self.settings = Some(SettingsForm::load(self.store.as_ref()));
    }

    fn submit_settings(&mut self) {
        if self.settings_checking {
            return;
        }
        let Some(form) = self.settings.as_mut() else {
            return;
        };
        if let Some(key) = form.prepare(Instant::now()) {
            self.commands.push(AppCommand::CheckKey(key));
            self.settings_checking = true;
        }
    }

    fn apply_page_event(&mut self, event: PageEvent) {
        match event {
            PageEvent::Mount(overlay) => {
                self.overlay.mount(overlay);
                self.overlay_scroll = 0;
            }
            PageEvent::Finished(outcome) => {
                self.pending = self.pending.saturating_sub(1);
                match outcome {
                    Ok(DispatchOutcome::NoSelection) => self.set_toast("No text selected"),
                    Ok(DispatchOutcome::Rendered | DispatchOutcome::Failed(_)) => {}
                    Err(err) => self.set_toast(err),
                }
            }
            PageEvent::KeyChecked(banner) => {
                self.settings_checking = false;
                match self.settings.as_mut() {
                    Some(form) => form.show(banner),
                    None => self.set_toast(banner.message),
                }
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let position = Position::new(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.click(position),
            MouseEventKind::Down(MouseButton::Right) => self.right_click(position),
            MouseEventKind::Drag(MouseButton::Left) => self.drag(position),
            MouseEventKind::ScrollDown if self.overlay.is_mounted() => {
                self.overlay_scroll = self.overlay_scroll.saturating_add(1)
            }
            MouseEventKind::ScrollUp if self.overlay.is_mounted() => {
                self.overlay_scroll = self.overlay_scroll.saturating_sub(1)
            }
            MouseEventKind::ScrollDown => self.move_cursor(1),
            MouseEventKind::ScrollUp => self.move_cursor(-1),
            _ => {}
        }
    }

    fn overlay_hit(&self, position: Position) -> HitTarget {
        if self.hit_areas.overlay_close.is_some_and(|close| close.contains(position)) {
            HitTarget::CloseControl
        } else if self.hit_areas.overlay_panel.is_some_and(|panel| panel.contains(position)) {
            HitTarget::Panel
        } else {
            HitTarget::Backdrop
        }
    }

    fn line_at(&self, position: Position) -> Option<usize> {
        let area = self.hit_areas.document?;
        if !area.contains(position) {
            return None;
        }
        let row = position.y.checked_sub(area.y.saturating_add(1))?;
        Some((self.scroll + usize::from(row)).min(self.last_line()))
    }

    fn click(&mut self, position: Position) {
        if self.overlay.is_mounted() {
            let target = self.overlay_hit(position);
            if self.overlay.handle(OverlayEvent::Click(target)) {
                self.overlay_scroll = 0;
            }
            return;
        }
        if self.menu.is_some() {
            let row = self
                .hit_areas
                .menu
                .filter(|area| area.contains(position))
                .and_then(|area| position.y.checked_sub(area.y.saturating_add(1)));
            match row {
                Some(row) => self.choose_menu_item(usize::from(row)),
                None => self.menu = None,
            }
            return;
        }
        if self.settings.is_some() || self.show_help {
            return;
        }
        if let Some(line) = self.line_at(position) {
            self.cursor = line;
            self.anchor = None;
        }
    }

    fn drag(&mut self, position: Position) {
        if self.overlay.is_mounted() || self.menu.is_some() || self.settings.is_some() {
            return;
        }
        if let Some(line) = self.line_at(position) {
            if self.anchor.is_none() {
                self.anchor = Some(self.cursor);
            }
            self.cursor = line;
        }
    }

    fn right_click(&mut self, position: Position) {
        if self.overlay.is_mounted() || self.settings.is_some() {
            return;
        }
        if let Some(line) = self.line_at(position) {
            let inside_selection = self
                .selection_range()
                .is_some_and(|(start, end)| (start..=end).contains(&line));
            if !inside_selection {
                self.cursor = line;
                self.anchor = None;
            }
            self.open_menu();
        }
    }

    fn open_saved_svg(&mut self) {
        let path = self
            .overlay
            .current()
            .and_then(Overlay::image)
            .and_then(|image| image.path.clone());
        match path {
            Some(path) => self.pending_external_action = Some(ExternalAction::OpenSvg(path)),
            None => self.set_toast("No saved diagram to open"),
        }
    }

    fn copy_source(&mut self) {
        let Some(source) = self.overlay.current().and_then(Overlay::details_body) else {
            self.set_toast("Nothing to copy");
            return;
        };
        match copy_to_clipboard(source) {
            Ok(backend) => self.set_toast(format!("Copied Mermaid source ({backend})")),
            Err(err) => self.set_toast(format!("Clipboard error: {err}")),
        }
    }

    fn take_commands(&mut self) -> Vec<AppCommand> {
        std::mem::take(&mut self.commands)
    }

    fn take_external_action(&mut self) -> Option<ExternalAction> {
        self.pending_external_action.take()
    }

    fn set_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            expires_at: Instant::now() + TOAST_TTL,
        });
    }
}

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture).map_err(|err| {
            teardown_terminal();
            err
        })?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(|err| {
            teardown_terminal();
            err
        })?;
        terminal.clear().map_err(|err| {
            teardown_terminal();
            err
        })?;

        Ok(Self { terminal })
    }

    fn draw(&mut self, draw_fn: impl FnOnce(&mut Frame<'_>)) -> io::Result<()> {
        self.terminal.draw(draw_fn)?;
        Ok(())
    }

    fn run_external_action(
        &mut self,
        action: impl FnOnce() -> Result<(), String>,
    ) -> Result<(), String> {
        let _suspend = TerminalSuspendGuard::new(&mut self.terminal)
            .map_err(|err| format!("terminal suspend failed: {err}"))?;
        action()
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        teardown_terminal();
    }
}

struct TerminalSuspendGuard<'a> {
    terminal: &'a mut Terminal<CrosstermBackend<io::Stdout>>,
}

impl<'a> TerminalSuspendGuard<'a> {
    fn new(terminal: &'a mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<Self> {
        terminal.show_cursor()?;
        disable_raw_mode()?;

        if let Err(err) = execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)
        {
            let _ = enable_raw_mode();
            let _ = execute!(terminal.backend_mut(), EnterAlternateScreen, EnableMouseCapture);
            let _ = terminal.hide_cursor();
            let _ = ratatui::backend::Backend::flush(terminal.backend_mut());
            return Err(err);
        }

        ratatui::backend::Backend::flush(terminal.backend_mut())?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalSuspendGuard<'_> {
    fn drop(&mut self) {
        let _ = enable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), EnterAlternateScreen, EnableMouseCapture);
        let _ = self.terminal.clear();
        let _ = self.terminal.hide_cursor();
        let _ = ratatui::backend::Backend::flush(self.terminal.backend_mut());
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, DisableMouseCapture, LeaveAlternateScreen);
}

fn copy_to_clipboard(text: &str) -> Result<&'static str, String> {
    let mut stdout = io::stdout();
    execute!(stdout, Print(osc52_sequence(text))).map_err(|err| err.to_string())?;
    Ok("osc52")
}

fn osc52_sequence(text: &str) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    let encoded = STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x1b\\")
}

const VIEWER_ENV: &str = "ZUKAI_VIEWER";

fn resolve_viewer_command() -> String {
    env::var(VIEWER_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| platform_opener().to_owned())
}

fn platform_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

fn execute_external_action(action: &ExternalAction) -> Result<(), String> {
    match action {
        ExternalAction::OpenSvg(path) => launch_viewer_command(&resolve_viewer_command(), path),
    }
}

fn launch_viewer_command(command: &str, path: &Path) -> Result<(), String> {
    let path_text = path.to_string_lossy();
    if path_text.starts_with('-') {
        return Err("invalid diagram path".to_owned());
    }

    tracing::info!(command, path = %path.display(), "opening diagram");
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("{command} {}", shell_single_quote(path_text.as_ref())))
        .status()
        .map_err(|err| format!("failed to run viewer command `{command}`: {err}"))?;
    if !status.success() {
        return Err(format!("viewer command failed with status {status}"));
    }
    Ok(())
}

fn shell_single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests;
