use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use logis_core::shortcuts::welcome_queries;
use logis_core::{ChatRole, PRODUCT_LINES, QUICK_QUERIES};
use crate::app::{App, FocusPane, InputMode};

const SIDEBAR_WIDTH: u16 = 34;
const MAX_INPUT_LINES: u16 = 5;
const PLACEHOLDER: &str = "Preguntá sobre stock, precios o solicitá un análisis estratégico...";

/// Split a line on `**` and `` ` `` markers into styled spans.
/// Unclosed markers are kept as literal text.
fn inline_spans(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let next_bold = rest.find("**");
        let next_code = rest.find('`');
        let (start, marker, style) = match (next_bold, next_code) {
            (Some(b), Some(c)) if c < b => (c, "`", base.fg(Color::Green)),
            (Some(b), _) => (b, "**", base.add_modifier(Modifier::BOLD)),
            (None, Some(c)) => (c, "`", base.fg(Color::Green)),
            (None, None) => break,
        };

        let after = &rest[start + marker.len()..];
        match after.find(marker) {
            Some(end) if end > 0 => {
                if start > 0 {
                    spans.push(Span::styled(rest[..start].to_string(), base));
                }
                spans.push(Span::styled(after[..end].to_string(), style));
                rest = &after[end + marker.len()..];
            }
            _ => {
                // No closing marker: emit through the opener and keep scanning
                spans.push(Span::styled(rest[..start + marker.len()].to_string(), base));
                rest = after;
            }
        }
    }

    if !rest.is_empty() {
        spans.push(Span::styled(rest.to_string(), base));
    }
    spans
}

/// Render one line of an assistant reply with light Markdown styling:
/// headings, bullet lists, bold, and inline code.
fn markdown_line(text: &str) -> Line<'static> {
    let trimmed = text.trim_start();

    if let Some(heading) = trimmed.strip_prefix('#') {
        let heading = heading.trim_start_matches('#').trim();
        let style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        return Line::from(inline_spans(heading, style));
    }

    let bullet = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("• "));
    if let Some(item) = bullet {
        let indent = " ".repeat(text.len() - trimmed.len());
        let mut spans = vec![Span::styled(
            format!("{}• ", indent),
            Style::default().fg(Color::Yellow),
        )];
        spans.extend(inline_spans(item, Style::default()));
        return Line::from(spans);
    }

    if text.is_empty() {
        Line::default()
    } else {
        Line::from(inline_spans(text, Style::default()))
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [body_area, footer_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [sidebar_area, main_area] = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH),
        Constraint::Min(0),
    ])
    .areas(body_area);

    app.sidebar_area = Some(sidebar_area);

    render_sidebar(app, frame, sidebar_area);
    render_main(app, frame, main_area);
    render_footer(app, frame, footer_area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    let [brand_area, status_area, queries_area, lines_area, session_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(4),
        Constraint::Length(PRODUCT_LINES.len() as u16 + 2),
        Constraint::Length(3),
    ])
    .areas(area);

    let brand = Paragraph::new(vec![
        Line::from(Span::styled(" 🛢  LOGIS", Style::default().fg(Color::Cyan).bold())),
        Line::from(Span::styled(
            " Inteligencia operativa en cada movimiento.",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    frame.render_widget(brand, brand_area);

    let status = if app.conversation.connected() {
        Span::styled(" ● API activa ", Style::default().fg(Color::Black).bg(Color::Green))
    } else {
        Span::styled(" ○ Sin conexión ", Style::default().fg(Color::White).bg(Color::Red))
    };
    frame.render_widget(Paragraph::new(Line::from(vec![Span::raw(" "), status])), status_area);

    // Quick queries
    let queries_focused = app.focus == FocusPane::Shortcuts;
    let queries_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if queries_focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Consultas rápidas ");

    let items: Vec<ListItem> = QUICK_QUERIES
        .iter()
        .map(|query| ListItem::new(format!("{} {}", query.icon, query.text)))
        .collect();

    let queries = List::new(items)
        .block(queries_block)
        .highlight_style(
            Style::default()
                .bg(if queries_focused { Color::Cyan } else { Color::DarkGray })
                .fg(Color::Black),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(queries, queries_area, &mut app.shortcut_state);

    // Product lines
    let lines: Vec<ListItem> = PRODUCT_LINES
        .iter()
        .map(|label| ListItem::new(format!(" · {}", label)))
        .collect();
    let product_lines = List::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Líneas de producto "),
    );
    frame.render_widget(product_lines, lines_area);

    // Session footer
    let session = match app.conversation.session_label() {
        Some(label) => Span::styled(format!(" ◷ {}", label), Style::default().fg(Color::Yellow)),
        None => Span::styled(" ◷ Sin sesión activa", Style::default().fg(Color::DarkGray)),
    };
    let session_info = Paragraph::new(vec![
        Line::from(session),
        Line::from(vec![
            Span::styled(" n ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" Nueva sesión"),
        ]),
    ])
    .block(Block::default().borders(Borders::TOP).border_style(Style::default().fg(Color::DarkGray)));
    frame.render_widget(session_info, session_area);
}

fn render_main(app: &mut App, frame: &mut Frame, area: Rect) {
    let input_lines = (app.conversation.draft().split('\n').count() as u16).clamp(1, MAX_INPUT_LINES);

    let [topbar_area, transcript_area, input_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(input_lines + 2),
    ])
    .areas(area);

    render_topbar(app, frame, topbar_area);
    render_transcript(app, frame, transcript_area);
    render_input(app, frame, input_area);
}

fn render_topbar(app: &App, frame: &mut Frame, area: Rect) {
    let responses = app.conversation.assistant_turns();
    let subtitle = if app.conversation.turns().is_empty() {
        "Listo para recibir consultas".to_string()
    } else {
        format!(
            "He identificado {} respuesta{} en esta sesión",
            responses,
            if responses != 1 { "s" } else { "" }
        )
    };

    let [title_area, badge_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(app.api_url.chars().count() as u16 + 2),
    ])
    .areas(area);

    let title = Paragraph::new(vec![
        Line::from(Span::styled(" Asistente de Stock & Precios", Style::default().bold())),
        Line::from(Span::styled(format!(" {}", subtitle), Style::default().fg(Color::DarkGray))),
    ]);
    frame.render_widget(title, title_area);

    let badge = Paragraph::new(Span::styled(
        format!(" {} ", app.api_url),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(badge, badge_area);
}

fn welcome_text(app: &App) -> Text<'static> {
    let inventory = match app.conversation.product_count() {
        Some(count) => format!("He identificado {} productos en tu inventario.", count),
        None => "Consultame sobre tu inventario.".to_string(),
    };

    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            "Bienvenido a Logis",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(inventory),
        Line::from(Span::styled(
            "Consultame sobre stock, precios o pedime un análisis estratégico de reposición.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::default(),
    ];

    for (i, query) in welcome_queries().iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!(" {} ", i + 1),
                Style::default().bg(Color::DarkGray).fg(Color::White),
            ),
            Span::raw(format!(" {} {}", query.icon, query.text)),
        ]));
    }

    Text::from(lines)
}

fn transcript_text(app: &App) -> Text<'static> {
    if app.conversation.turns().is_empty() && !app.conversation.pending() {
        welcome_text(app)
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for turn in app.conversation.turns() {
            let (avatar, color) = match turn.role() {
                ChatRole::User => ("👤", Color::Cyan),
                ChatRole::Assistant => ("🤖", Color::Yellow),
            };
            lines.push(Line::from(vec![
                Span::raw(format!("{} ", avatar)),
                Span::styled(
                    turn.role().display_name(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  {}", turn.time_label()), Style::default().fg(Color::DarkGray)),
            ]));

            match turn.role() {
                ChatRole::User => {
                    for line in turn.content().lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                ChatRole::Assistant => {
                    for line in turn.content().lines() {
                        lines.push(markdown_line(line));
                    }
                }
            }
            lines.push(Line::default());
        }

        if app.conversation.pending() {
            lines.push(Line::from(vec![
                Span::raw("🤖 "),
                Span::styled(
                    ChatRole::Assistant.display_name(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
            ]));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Consultando inventario{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    }
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.transcript_area = Some(area);
    app.transcript_height = area.height.saturating_sub(2);
    app.transcript_width = area.width.saturating_sub(2);

    let transcript = Paragraph::new(transcript_text(app)).wrap(Wrap { trim: false });

    // Wrapped rows as ratatui lays them out, so the bottom is really the bottom
    let rows = transcript.line_count(app.transcript_width);
    app.transcript_rows = u16::try_from(rows).unwrap_or(u16::MAX);
    if app.follow_bottom {
        app.scroll_transcript_to_bottom();
    }

    let focused = app.focus == FocusPane::Transcript;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }));

    let transcript = transcript.block(block).scroll((app.transcript_scroll, 0));
    frame.render_widget(transcript, area);
}

/// Row and column of the cursor inside a multi-line draft, in characters.
fn cursor_position(draft: &str, cursor: usize) -> (usize, usize) {
    let before: String = draft.chars().take(cursor).collect();
    let row = before.matches('\n').count();
    let col = before.rsplit('\n').next().map(|line| line.chars().count()).unwrap_or(0);
    (row, col)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing {
        Color::Yellow
    } else if app.focus == FocusPane::Input {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let send_hint = if app.conversation.pending() {
        " Consultando... "
    } else if app.conversation.can_send_draft() {
        " Enter consultar · Alt+Enter nueva línea "
    } else {
        " Alt+Enter nueva línea "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Consulta ")
        .title_bottom(Line::from(send_hint).right_aligned());

    let draft = app.conversation.draft();
    if draft.is_empty() {
        let placeholder = Paragraph::new(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)))
            .block(block);
        frame.render_widget(placeholder, area);
        if editing {
            frame.set_cursor_position((area.x + 1, area.y + 1));
        }
        return;
    }

    // Keep the cursor row and column inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let (row, col) = cursor_position(draft, app.input_cursor);

    let row_offset = if inner_height > 0 && row >= inner_height { row - inner_height + 1 } else { 0 };
    let col_offset = if inner_width > 0 && col >= inner_width { col - inner_width + 1 } else { 0 };

    let visible: Vec<Line> = draft
        .split('\n')
        .skip(row_offset)
        .take(inner_height)
        .map(|line| Line::from(line.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((
            area.x + 1 + (col - col_offset) as u16,
            area.y + 1 + (row - row_offset) as u16,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " ESCRIBIR ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" enviar ", label_style),
            Span::styled(" Alt+Enter ", key_style),
            Span::styled(" nueva línea ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" dejar de escribir ", label_style),
        ],
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" Tab ", key_style),
                Span::styled(" foco ", label_style),
            ];
            match app.focus {
                FocusPane::Shortcuts => hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" elegir ", label_style),
                    Span::styled(" Enter ", key_style),
                    Span::styled(" consultar ", label_style),
                ]),
                _ => hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" desplazar ", label_style),
                ]),
            }
            if app.conversation.turns().is_empty() {
                hints.extend(vec![
                    Span::styled(" 1-4 ", key_style),
                    Span::styled(" consulta rápida ", label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" i ", key_style),
                Span::styled(" escribir ", label_style),
                Span::styled(" n ", key_style),
                Span::styled(" nueva sesión ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" salir ", label_style),
            ]);
            hints
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, routing::post, Json, Router};
    use logis_core::{LogisClient, SessionController};
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;
    use tokio::net::TcpListener;

    /// Backend that is healthy and answers every question with `reply`.
    async fn spawn_backend(reply: String) -> String {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/health", get(|| async { Json(json!({"status": "ok", "productos": 50})) }))
            .route(
                "/chat",
                post(move || {
                    let reply = reply.clone();
                    async move { Json(json!({"session_id": "abc123", "response": reply})) }
                }),
            );
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn bold_and_code_are_styled() {
        let line = markdown_line("Quedan **4 unidades** del `ELF-5W40`.");
        assert_eq!(plain(&line), "Quedan 4 unidades del ELF-5W40.");
        assert_eq!(line.spans.len(), 5);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(line.spans[3].style.fg, Some(Color::Green));
    }

    #[test]
    fn unclosed_bold_stays_literal() {
        let line = markdown_line("precio **sin cerrar");
        assert_eq!(plain(&line), "precio **sin cerrar");
    }

    #[test]
    fn headings_drop_hashes() {
        let line = markdown_line("## Alertas de stock");
        assert_eq!(plain(&line), "Alertas de stock");
        assert!(line.spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn bullets_keep_indent() {
        let line = markdown_line("  - Filtro de aire **agotado**");
        assert_eq!(plain(&line), "  • Filtro de aire agotado");
    }

    #[test]
    fn empty_line_renders_empty() {
        assert!(markdown_line("").spans.is_empty());
    }

    #[test]
    fn cursor_position_counts_rows_and_chars() {
        assert_eq!(cursor_position("", 0), (0, 0));
        assert_eq!(cursor_position("qué\nstock", 3), (0, 3));
        assert_eq!(cursor_position("qué\nstock", 4), (1, 0));
        assert_eq!(cursor_position("qué\nstock", 9), (1, 5));
    }

    #[tokio::test]
    async fn word_wrapped_reply_scrolls_fully_into_view() {
        // Each line is 80 chars of three words, so word wrapping needs more
        // rows than a plain character count suggests
        let prose = format!("{} {} {}", "x".repeat(30), "y".repeat(30), "z".repeat(18));
        let mut reply = vec![prose; 6];
        reply.push("FINALMARK".to_string());
        let url = spawn_backend(reply.join("\n")).await;

        let (controller, probe) = SessionController::start(LogisClient::new(&url));
        assert!(probe.await.unwrap());
        let mut app = App::new(controller, url);
        let mut rx = app.controller.subscribe();

        app.submit(Some("stock de lubricantes".to_string()));
        rx.wait_for(|state| state.turns().len() == 2 && !state.pending())
            .await
            .unwrap();
        app.refresh();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        assert!(app.follow_bottom);
        assert!(app.transcript_scroll > 0);
        assert!(screen_text(&terminal).contains("FINALMARK"));
    }
}
