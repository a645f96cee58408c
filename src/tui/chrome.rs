// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Document, popup, overlay, footer, and help rendering used by `draw`.
fn render_document(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    app.viewport_height = usize::from(area.height.saturating_sub(2)).max(1);
    app.ensure_cursor_visible();
    app.hit_areas.document = Some(area);

    let selection = app.selection_range();
    let tail = selection.map(|(start, end)| {
        if start == end {
            format!("[line {}]", start + 1)
        } else {
            format!("[lines {}–{}]", start + 1, end + 1)
        }
    });
    let title = view_title(&app.document.title, tail.as_deref());

    let lines = app
        .document
        .lines
        .iter()
        .enumerate()
        .skip(app.scroll)
        .take(app.viewport_height)
        .map(|(idx, text)| {
            let is_selected = selection.is_some_and(|(start, end)| (start..=end).contains(&idx));
            let gutter = if idx == app.cursor { "› " } else { "  " };
            let style = if is_selected {
                Style::default().bg(SELECTION_BG).fg(Color::White)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(gutter.to_owned(), Style::default().fg(FOOTER_KEY_COLOR)),
                Span::styled(text.clone(), style),
            ])
        })
        .collect::<Vec<_>>();

    let border_style = if selection.is_some() {
        Style::default().fg(FOCUS_COLOR)
    } else {
        Style::default()
    };
    let document = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style),
    );
    frame.render_widget(document, area);
}

fn view_title(label: &str, tail: Option<&str>) -> String {
    let mut title = format!("─ {label}");
    if let Some(tail) = tail {
        let tail = tail.trim();
        if !tail.is_empty() {
            title.push(' ');
            title.push_str(tail);
        }
    }
    title.push(' ');
    title
}

/// Popup anchored just below the cursor line, kept inside `bounds`.
fn menu_rect(app: &App, items: usize, bounds: Rect) -> Rect {
    let width = app
        .menu
        .as_ref()
        .map(|menu| menu.items.iter().map(|item| item.title.chars().count()).max().unwrap_or(0))
        .unwrap_or(0)
        .max(MENU_PARENT.title.chars().count() + 2) as u16
        + 6;
    let height = items as u16 + 2;

    let doc = app.hit_areas.document.unwrap_or(bounds);
    let cursor_row = app.cursor.saturating_sub(app.scroll) as u16;
    let x = doc.x.saturating_add(4);
    let mut y = doc.y.saturating_add(2).saturating_add(cursor_row);
    if y.saturating_add(height) > bounds.bottom() {
        y = bounds.bottom().saturating_sub(height);
    }
    Rect {
        x,
        y,
        width,
        height,
    }
    .intersection(bounds)
}

fn render_menu(frame: &mut Frame<'_>, app: &mut App, bounds: Rect) {
    let Some(count) = app.menu.as_ref().map(|menu| menu.items.len()) else {
        return;
    };
    let area = menu_rect(app, count, bounds);
    app.hit_areas.menu = Some(area);
    let Some(menu) = app.menu.as_mut() else {
        return;
    };

    frame.render_widget(Clear, area);
    let items = menu
        .items
        .iter()
        .map(|item| ListItem::new(Line::from(item.title.to_owned())))
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", MENU_PARENT.title))
                .border_style(Style::default().fg(FOCUS_COLOR)),
        )
        .highlight_style(Style::default().bg(SELECTION_BG).add_modifier(Modifier::BOLD))
        .highlight_symbol("› ");
    frame.render_stateful_widget(list, area, &mut menu.state);
}

fn render_settings(frame: &mut Frame<'_>, app: &mut App, bounds: Rect) {
    let checking = app.settings_checking;
    let Some(form) = app.settings.as_mut() else {
        return;
    };
    let area = centered_rect(60, 40, bounds);
    frame.render_widget(Clear, area);

    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled("Gemini API key", help_header_style())),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(FOOTER_KEY_COLOR)),
            Span::raw(form.masked_input()),
            Span::styled("▏", Style::default().fg(FOOTER_KEY_COLOR)),
        ]),
        Line::from(String::new()),
    ];
    if checking {
        lines.push(Line::from(Span::styled("Checking key…", dim)));
    } else if let Some(banner) = form.banner(Instant::now()) {
        let color = match banner.kind {
            BannerKind::Success => Color::LightGreen,
            BannerKind::Error => Color::LightRed,
        };
        lines.push(Line::from(Span::styled(
            banner.message.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(String::new()));
    lines.push(Line::from(Span::styled(
        "Enter: test & save   Del: clear   Esc: close",
        dim,
    )));

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Settings ")
            .border_style(Style::default().fg(FOCUS_COLOR)),
    );
    frame.render_widget(paragraph, area);
}

fn render_overlay(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let Some(overlay) = app.overlay.current() else {
        return;
    };

    frame
        .buffer_mut()
        .set_style(area, Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM));

    let panel = centered_rect(80, 80, area);
    frame.render_widget(Clear, panel);

    let (accent, heading_style) = match overlay.tone() {
        Tone::Error => (
            Color::LightRed,
            Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
        ),
        Tone::Normal => (FOCUS_COLOR, help_header_style()),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent))
        .title(Line::from(Span::styled(
            format!(" {} ", overlay.heading()),
            heading_style,
        )));
    let paragraph = Paragraph::new(overlay_lines(overlay))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.overlay_scroll, 0));
    frame.render_widget(paragraph, panel);

    let close = Rect {
        x: panel.x.saturating_add(panel.width.saturating_sub(5)),
        y: panel.y,
        width: 3,
        height: 1,
    }
    .intersection(panel);
    frame.render_widget(
        Paragraph::new(Span::styled(CLOSE_CONTROL, Style::default().fg(accent))),
        close,
    );

    app.hit_areas.overlay_panel = Some(panel);
    app.hit_areas.overlay_close = Some(close);
}

fn overlay_lines(overlay: &Overlay) -> Vec<Line<'static>> {
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::<Line<'static>>::new();
    for (idx, section) in overlay.sections().iter().enumerate() {
        if idx > 0 {
            lines.push(Line::from(String::new()));
        }
        match section {
            Section::Text(text) => {
                lines.extend(text.lines().map(|line| Line::from(line.to_owned())));
            }
            Section::Image(image) => {
                lines.push(Line::from(vec![
                    Span::styled("▣ ", Style::default().fg(FOCUS_COLOR)),
                    Span::raw(describe_image(image)),
                ]));
                if image.path.is_some() {
                    lines.push(Line::from(Span::styled(
                        "o: open in viewer   y: copy source",
                        dim,
                    )));
                }
            }
            Section::Details {
                summary,
                body,
                expanded,
            } => {
                let marker = if *expanded { "▾" } else { "▸" };
                lines.push(Line::from(vec![
                    Span::styled(format!("{marker} {summary}"), help_header_style()),
                    Span::styled(" (d)", dim),
                ]));
                if *expanded {
                    lines.extend(body.lines().map(|line| Line::from(format!("  {line}"))));
                }
            }
        }
    }
    lines
}

fn footer_line(app: &App, toast_suffix: &str) -> Line<'static> {
    let mut spans = Vec::<Span<'static>>::new();
    if app.overlay.is_mounted() {
        push_footer_entry(&mut spans, "CLOSE", "Esc");
        push_footer_entry(&mut spans, "DETAILS", "d");
        push_footer_entry(&mut spans, "OPEN", "o");
        push_footer_entry(&mut spans, "COPY", "y");
    } else if app.settings.is_some() {
        push_footer_entry(&mut spans, "SAVE", "Enter");
        push_footer_entry(&mut spans, "CLOSE", "Esc");
    } else if app.menu.is_some() {
        push_footer_entry(&mut spans, "CHOOSE", "Enter");
        push_footer_entry(&mut spans, "CLOSE", "Esc");
    } else {
        let select = if app.anchor.is_some() { "v◼ " } else { "v◻ " };
        push_footer_entry(&mut spans, "SELECT", select);
        push_footer_entry(&mut spans, "DIAGRAM", "m");
        push_footer_entry(&mut spans, "SETTINGS", "s");
        push_footer_entry(&mut spans, "HELP", "?");
        push_footer_entry(&mut spans, "QUIT", "q");
    }

    if app.pending > 0 {
        push_footer_entry(&mut spans, "PENDING", &app.pending.to_string());
    }
    if !toast_suffix.is_empty() {
        spans.push(Span::raw(toast_suffix.to_owned()));
    }
    Line::from(spans)
}

fn footer_brand_line() -> Line<'static> {
    Line::from(vec![Span::styled(
        FOOTER_BRAND.to_owned(),
        Style::default().fg(FOOTER_BRAND_COLOR),
    )])
}

fn help_key_style() -> Style {
    Style::default()
        .fg(FOOTER_KEY_COLOR)
        .add_modifier(Modifier::BOLD)
}

fn help_header_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical_margin = (100u16.saturating_sub(height_percent)) / 2;
    let horizontal_margin = (100u16.saturating_sub(width_percent)) / 2;

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(vertical_margin),
            Constraint::Percentage(height_percent),
            Constraint::Percentage(vertical_margin),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(horizontal_margin),
            Constraint::Percentage(width_percent),
            Constraint::Percentage(horizontal_margin),
        ])
        .split(vertical[1])[1]
}

fn help_kv(key: &str, desc: &str, key_width: usize, key_style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{key:>width$}", width = key_width), key_style),
        Span::raw("  "),
        Span::raw(desc.to_owned()),
    ])
}

fn render_help(frame: &mut Frame<'_>, app: &mut App, main_area: Rect) {
    let area = centered_rect(70, 80, main_area);
    frame.render_widget(Clear, area);

    let key_style = help_key_style();
    let header_style = help_header_style();
    let key_col_width = ["j/k, ↑/↓, PgUp/PgDn", "Enter/m/right-click"]
        .iter()
        .map(|s| s.chars().count())
        .max()
        .unwrap_or(0);

    let mut lines = Vec::<Line<'static>>::new();
    lines.push(Line::from(Span::styled("--- Document ---", header_style)));
    lines.push(help_kv("j/k, ↑/↓, PgUp/PgDn", "Move cursor", key_col_width, key_style));
    lines.push(help_kv("g/G", "First/last line", key_col_width, key_style));
    lines.push(help_kv("v", "Start/stop selecting lines", key_col_width, key_style));
    lines.push(help_kv("a", "Select everything", key_col_width, key_style));
    lines.push(help_kv("drag", "Select lines with the mouse", key_col_width, key_style));
    lines.push(help_kv(
        "Enter/m/right-click",
        "AI diagram menu for the selection",
        key_col_width,
        key_style,
    ));
    lines.push(help_kv("s", "Settings (Gemini API key)", key_col_width, key_style));
    lines.push(help_kv("?", "Help (toggle)", key_col_width, key_style));
    lines.push(help_kv("q", "Quit", key_col_width, key_style));
    lines.push(Line::from(String::new()));
    lines.push(Line::from(Span::styled("--- Diagram overlay ---", header_style)));
    lines.push(help_kv("Esc", "Close (also click outside or [×])", key_col_width, key_style));
    lines.push(help_kv("d", "Show/hide Mermaid source", key_col_width, key_style));
    lines.push(help_kv("o", "Open SVG in external viewer", key_col_width, key_style));
    lines.push(help_kv("y", "Copy Mermaid source (OSC 52)", key_col_width, key_style));
    lines.push(help_kv("j/k", "Scroll", key_col_width, key_style));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .border_style(Style::default().fg(FOCUS_COLOR)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.help_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn push_footer_entry(spans: &mut Vec<Span<'static>>, label: &str, value: &str) {
    if !spans.is_empty() {
        spans.push(Span::styled(
            " | ".to_owned(),
            Style::default().fg(FOOTER_LABEL_COLOR),
        ));
    }
    spans.push(Span::styled(
        format!("{}:", footer_label_ucfirst(label)),
        Style::default().fg(FOOTER_LABEL_COLOR),
    ));
    spans.push(Span::styled(
        value.to_owned(),
        Style::default()
            .fg(FOOTER_KEY_COLOR)
            .add_modifier(Modifier::BOLD),
    ));
}

fn footer_label_ucfirst(label: &str) -> String {
    let lower = label.to_lowercase();
    let mut chars = lower.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut out = first.to_uppercase().collect::<String>();
    out.push_str(chars.as_str());
    out
}
