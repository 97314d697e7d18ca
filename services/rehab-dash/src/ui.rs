// services/rehab-dash/src/ui.rs
//
// Rendering for the terminal dashboard

use ratatui::{prelude::*, widgets::*};

use crate::app::App;
use crate::poller::IndicatorPhase;
use crate::state::{Focus, OverlayField, Suggestions};
use crate::store::FormField;
use crate::submit::NoticeLevel;

// Color palette: Red, White, Silver, Gold
mod colors {
    use ratatui::style::Color;

    pub const RED: Color = Color::Rgb(220, 50, 47);
    pub const DARK_RED: Color = Color::Rgb(139, 0, 0);
    pub const WHITE: Color = Color::Rgb(253, 246, 227);
    pub const SILVER: Color = Color::Rgb(147, 161, 161);
    pub const GOLD: Color = Color::Rgb(255, 193, 37);
    pub const DARK_GOLD: Color = Color::Rgb(184, 134, 11);
    pub const BG_DARK: Color = Color::Rgb(0, 20, 30);
    pub const BG_PANEL: Color = Color::Rgb(7, 30, 41);
    pub const SUCCESS: Color = Color::Rgb(133, 153, 0);
}

const PATIENT_FIELDS: [FormField; 4] = [
    FormField::Weight,
    FormField::CalfLength,
    FormField::Sessions,
    FormField::Height,
];

const MACHINE_FIELDS: [FormField; 3] = [
    FormField::Degrees,
    FormField::Repetitions,
    FormField::StopDegrees,
];

const DROPDOWN_ROWS: usize = 6;

pub fn draw(frame: &mut Frame, app: &App, demo_mode: bool) {
    let area = frame.area();

    frame.render_widget(
        Block::default().style(Style::default().bg(colors::BG_DARK)),
        area,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(21),   // Form + Activity
            Constraint::Length(1), // Notice
            Constraint::Length(3), // Footer
        ])
        .split(area);

    draw_header(frame, chunks[0], app, demo_mode);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    draw_form(frame, body[0], app);
    draw_activity_panel(frame, body[1], app);
    draw_notice(frame, chunks[2], app);
    draw_footer(frame, chunks[3], app);

    if app.view.overlay.is_some() {
        draw_overlay(frame, area, app);
    }
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App, demo_mode: bool) {
    let indicator = app.dashboard.indicator();
    let indicator_color = match indicator.phase {
        IndicatorPhase::Loading => colors::SILVER,
        IndicatorPhase::ConnectionError => colors::RED,
        IndicatorPhase::Reported if indicator.available => colors::SUCCESS,
        IndicatorPhase::Reported => colors::GOLD,
    };

    let (mode_text, mode_color) = if demo_mode {
        ("DEMO", colors::GOLD)
    } else {
        ("LIVE", colors::SUCCESS)
    };

    let machine = app
        .dashboard
        .store()
        .selection()
        .selected_machine_id
        .clone()
        .unwrap_or_else(|| "-".to_string());

    let title = Line::from(vec![
        Span::styled(
            " REHAB-DASH ",
            Style::default().fg(colors::WHITE).bg(colors::DARK_RED).bold(),
        ),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", mode_text),
            Style::default().fg(mode_color).bold(),
        ),
        Span::raw("  "),
        Span::styled(
            format!("Máquina {}: ", machine),
            Style::default().fg(colors::SILVER),
        ),
        Span::styled(indicator.text, Style::default().fg(indicator_color).bold()),
    ]);

    let header = Paragraph::new(title)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(colors::DARK_RED))
                .style(Style::default().bg(colors::BG_DARK)),
        );

    frame.render_widget(header, area);
}

fn draw_form(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Patient
            Constraint::Length(3), // Patient measures
            Constraint::Length(3), // Machine
            Constraint::Length(3), // Session parameters
            Constraint::Length(3), // Mode
            Constraint::Length(3), // Start
            Constraint::Min(0),
        ])
        .split(area);

    let selection = app.dashboard.store().selection();
    let focus = app.view.focus;

    draw_input(frame, rows[0], "PACIENTE", &selection.patient_text, focus == Focus::Patient);
    draw_field_row(frame, rows[1], &PATIENT_FIELDS, app);
    draw_input(frame, rows[2], "MÁQUINA", &selection.machine_text, focus == Focus::Machine);
    draw_field_row(frame, rows[3], &MACHINE_FIELDS, app);
    draw_modes(frame, rows[4], app);
    draw_start(frame, rows[5], app);

    // Dropdowns go last so they sit above the rows beneath their input.
    if let Some(list) = &app.view.patient_suggestions {
        let lines = suggestion_lines(list, |p| p.name.as_str());
        draw_dropdown(frame, below(rows[0], area, lines.len()), lines);
    }
    if let Some(list) = &app.view.machine_suggestions {
        let lines = suggestion_lines(list, |m| m.number.as_str());
        draw_dropdown(frame, below(rows[2], area, lines.len()), lines);
    }
}

fn panel(title: &str, focused: bool) -> Block<'_> {
    let border = if focused { colors::GOLD } else { colors::SILVER };
    Block::default()
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(colors::WHITE).bold(),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(colors::BG_PANEL))
}

fn draw_input(frame: &mut Frame, area: Rect, title: &str, value: &str, focused: bool) {
    let mut spans = vec![Span::styled(value, Style::default().fg(colors::WHITE))];
    if focused {
        spans.push(Span::styled("_", Style::default().fg(colors::GOLD)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).block(panel(title, focused)), area);
}

fn draw_field_row(frame: &mut Frame, area: Rect, fields: &[FormField], app: &App) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, fields.len() as u32); fields.len()])
        .split(area);

    let values = &app.dashboard.store().selection().fields;
    for (field, cell) in fields.iter().zip(cells.iter()) {
        let focused = app.view.focus == Focus::Field(*field);
        let line = Line::from(vec![
            Span::styled("[-] ", Style::default().fg(colors::SILVER).add_modifier(Modifier::DIM)),
            Span::styled(values.get(*field), Style::default().fg(colors::WHITE).bold()),
            Span::styled(" [+]", Style::default().fg(colors::SILVER).add_modifier(Modifier::DIM)),
        ]);
        frame.render_widget(
            Paragraph::new(line)
                .alignment(Alignment::Center)
                .block(panel(field.label(), focused)),
            *cell,
        );
    }
}

fn draw_modes(frame: &mut Frame, area: Rect, app: &App) {
    let store = app.dashboard.store();
    let active = store.active_mode_index();

    let mut spans = Vec::new();
    for (i, mode) in store.modes().iter().enumerate() {
        let style = if Some(i) == active {
            Style::default().fg(colors::BG_DARK).bg(colors::GOLD).bold()
        } else {
            Style::default().fg(colors::SILVER)
        };
        spans.push(Span::styled(format!(" {} ", mode.label), style));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(panel("MODO", app.view.focus == Focus::Mode)),
        area,
    );
}

fn draw_start(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.view.focus == Focus::Start;

    let line = if app.view.submitting {
        Line::from(Span::styled("Enviando...", Style::default().fg(colors::GOLD).bold()))
    } else if app.dashboard.is_start_enabled() {
        Line::from(Span::styled(
            " INICIAR ",
            Style::default().fg(colors::BG_DARK).bg(colors::SUCCESS).bold(),
        ))
    } else {
        let missing: Vec<&str> = app
            .dashboard
            .unmet_requirements()
            .iter()
            .map(|r| r.describe())
            .collect();
        Line::from(vec![
            Span::styled(" INICIAR ", Style::default().fg(colors::SILVER).add_modifier(Modifier::DIM)),
            Span::raw("  "),
            Span::styled(
                format!("Faltan: {}", missing.join(", ")),
                Style::default().fg(colors::SILVER),
            ),
        ])
    };

    frame.render_widget(
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .block(panel("INICIO", focused)),
        area,
    );
}

fn suggestion_lines<T>(list: &Suggestions<T>, label: impl Fn(&T) -> &str) -> Vec<Line<'static>> {
    list.items
        .iter()
        .enumerate()
        .take(DROPDOWN_ROWS)
        .map(|(i, item)| {
            let style = if i == list.highlighted {
                Style::default().fg(colors::BG_DARK).bg(colors::GOLD)
            } else {
                Style::default().fg(colors::WHITE)
            };
            Line::from(Span::styled(label(item).to_string(), style))
        })
        .collect()
}

/// Area directly under `anchor`, clipped to `bounds`.
fn below(anchor: Rect, bounds: Rect, rows: usize) -> Rect {
    let y = anchor.y + anchor.height;
    let height = (rows as u16 + 2).min(bounds.bottom().saturating_sub(y));
    Rect::new(anchor.x + 1, y, anchor.width.saturating_sub(2), height)
}

fn draw_dropdown(frame: &mut Frame, area: Rect, lines: Vec<Line>) {
    if area.height == 0 {
        return;
    }
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::DARK_GOLD))
                .style(Style::default().bg(colors::BG_DARK)),
        ),
        area,
    );
}

fn draw_activity_panel(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(Span::styled(
            " ACTIVIDAD ",
            Style::default().fg(colors::WHITE).bold(),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::SILVER))
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(colors::BG_PANEL));

    let logs: Vec<Line> = app
        .view
        .activity_log
        .iter()
        .rev()
        .skip(app.view.scroll_offset)
        .take(20)
        .map(|entry| {
            let (prefix, color) = match entry.level.as_str() {
                "ERROR" => ("[ERR]", colors::RED),
                "WARN" => ("[WRN]", colors::GOLD),
                "INFO" => ("[INF]", colors::SUCCESS),
                _ => ("[---]", colors::SILVER),
            };

            Line::from(vec![
                Span::styled(
                    format!("{} ", entry.timestamp.format("%H:%M:%S")),
                    Style::default().fg(colors::SILVER).add_modifier(Modifier::DIM),
                ),
                Span::styled(format!("{} ", prefix), Style::default().fg(color)),
                Span::styled(&entry.message, Style::default().fg(colors::WHITE)),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(logs)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn draw_notice(frame: &mut Frame, area: Rect, app: &App) {
    let Some(notice) = &app.view.notice else {
        return;
    };
    let color = match notice.level {
        NoticeLevel::Success => colors::SUCCESS,
        NoticeLevel::Failure => colors::RED,
    };
    frame.render_widget(
        Paragraph::new(Span::styled(&notice.message, Style::default().fg(color).bold()))
            .alignment(Alignment::Center),
        area,
    );
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let keys: &[(&str, &str, Color)] = if app.view.overlay.is_some() {
        &[
            (" [ENTER] ", " Guardar ", colors::GOLD),
            (" [TAB] ", " Campo ", colors::WHITE),
            (" [ESC] ", " Cerrar ", colors::SILVER),
        ]
    } else {
        &[
            (" [F10] ", " Salir ", colors::RED),
            (" [TAB] ", " Campo ", colors::WHITE),
            (" [ENTER] ", " Elegir/Iniciar ", colors::GOLD),
            (" [+/-] ", " Ajustar ", colors::SILVER),
            (" [F2] ", " Nuevo paciente ", colors::GOLD),
            (" [ESC] ", " Cerrar ", colors::SILVER),
        ]
    };

    let mut spans = Vec::new();
    for (key, label, color) in keys {
        spans.push(Span::styled(*key, Style::default().fg(colors::BG_DARK).bg(*color)));
        spans.push(Span::styled(*label, Style::default().fg(colors::SILVER)));
        spans.push(Span::raw("  "));
    }

    let footer = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(colors::DARK_RED))
                .style(Style::default().bg(colors::BG_DARK)),
        );

    frame.render_widget(footer, area);
}

fn draw_overlay(frame: &mut Frame, area: Rect, app: &App) {
    let width = area.width.min(50);
    let height = (OverlayField::ORDER.len() as u16) * 3 + 2;
    let popup = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height.min(area.height),
    );

    frame.render_widget(Clear, popup);
    let block = Block::default()
        .title(Span::styled(
            " NUEVO PACIENTE ",
            Style::default().fg(colors::GOLD).bold(),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::DARK_GOLD))
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(colors::BG_DARK));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3); 4])
        .split(inner);

    let focused = app.view.overlay.as_ref().map(|o| o.focus);
    for (field, row) in OverlayField::ORDER.iter().zip(rows.iter()) {
        draw_input(
            frame,
            *row,
            field.label(),
            app.overlay_field_value(*field),
            focused == Some(*field),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Dashboard;
    use crate::mock::MockClinic;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use std::sync::Arc;
    use std::time::Duration;
    use svckit::types::default_modes;
    use tokio::sync::mpsc;

    fn rendered(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|frame| draw(frame, app, true)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    async fn mounted() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let dashboard = Dashboard::new(Arc::new(MockClinic::new()), default_modes(), Duration::from_millis(500));
        let mut app = App::new(dashboard, tx);
        app.mount().await;
        app
    }

    #[tokio::test]
    async fn test_initial_screen() {
        let app = mounted().await;
        let screen = rendered(&app);
        assert!(screen.contains("[DEMO]"));
        assert!(screen.contains("Cargando..."));
        assert!(screen.contains("Faltan:"));
        assert!(screen.contains("Connected to demo clinic"));
    }

    #[tokio::test]
    async fn test_dropdown_and_overlay_render() {
        let mut app = mounted().await;
        for c in "ana".chars() {
            app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        assert!(rendered(&app).contains("Ana Martínez"));

        app.handle_key(KeyEvent::new(KeyCode::F(2), KeyModifiers::NONE));
        let screen = rendered(&app);
        assert!(screen.contains("NUEVO PACIENTE"));
        assert!(screen.contains("Guardar"));
    }
}
