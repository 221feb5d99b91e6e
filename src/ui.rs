//! Layout and drawing: playfield, tray, stats, toasts, pause and game over.

use crate::app::{Screen, Toast};
use crate::theme::{Theme, shade};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use sandtris::game::{Cell, PieceKind, PieceState};
use sandtris::GameState;
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

const SIDEBAR_WIDTH: u16 = 24;
const SIDEBAR_HEIGHT: u16 = 18;

/// Tray preview: 4x2 blocks, two columns per block.
const PREVIEW_COLS: u16 = 4;
const PREVIEW_ROWS: u16 = 2;
const MINI_CELL_W: u16 = 2;

/// Landing blink half-period in ms.
const LANDING_BLINK_MS: f64 = 60.0;

/// Playfield size in terminal cells (border + grid); two grains per cell vertically.
fn playfield_size(state: &GameState) -> (u16, u16) {
    let gw = state.grid().width() as u16;
    let gh = state.grid().height() as u16;
    (gw + 2, gh.div_ceil(2) + 2)
}

/// Playfield (with border) and sidebar rects, centred in `area`.
fn game_layout(area: Rect, state: &GameState) -> (Rect, Rect) {
    let (pw, ph) = playfield_size(state);
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(pw + SIDEBAR_WIDTH),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph.max(SIDEBAR_HEIGHT)),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let playfield = Rect {
        height: ph.min(inner[0].height),
        ..inner[0]
    };
    (playfield, inner[1])
}

/// Board rect inside the playfield border.
fn board_rect(area: Rect, state: &GameState) -> Rect {
    let (playfield, _) = game_layout(area, state);
    Block::default().borders(Borders::ALL).inner(playfield)
}

/// Buffer positions covered by flagged match cells.
fn match_buffer_positions(board: Rect, state: &GameState) -> HashSet<(u16, u16)> {
    let mask = state.match_mask();
    (0..mask.len())
        .filter(|&i| mask.at(i))
        .map(|i| {
            let (x, y) = mask.coords(i);
            (board.x + x as u16, board.y + (y / 2) as u16)
        })
        .filter(|&(x, y)| x < board.x + board.width && y < board.y + board.height)
        .collect()
}

/// Create or update the match fade and process it (TachyonFX: fade flagged cells to bg
/// over the flash duration).
fn apply_match_effect(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    effect: &mut Option<Effect>,
    process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(area, state);
    let delta = process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or_default();
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    *process_time = Some(now);

    if effect.is_none() {
        let positions = match_buffer_positions(board, state);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let fade_ms = state.config().match_flash.as_millis().min(u128::from(u32::MAX)) as u32;
        *effect = Some(
            fx::fade_to(theme.bg, theme.bg, (fade_ms, Interpolation::Linear))
                .with_filter(filter)
                .with_area(board),
        );
    }
    if let Some(effect) = effect {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

/// Draw the current screen. While a match flash runs with animations on, the flagged
/// cells fade out through `match_effect`.
pub fn draw(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    screen: Screen,
    paused: bool,
    aim_x: i32,
    toasts: &[Toast],
    match_effect: &mut Option<Effect>,
    match_effect_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    draw_game(frame, state, theme, area, toasts, no_animation);
    if screen == Screen::Playing && state.is_idle() {
        draw_aim(frame, state, theme, area, aim_x);
    }
    if state.match_active() && !no_animation {
        apply_match_effect(frame, state, theme, area, match_effect, match_effect_time, now);
    }
    match screen {
        Screen::Playing if paused => draw_pause_overlay(frame, theme, area),
        Screen::Playing => {}
        Screen::GameOver => draw_game_over(frame, state, theme, area),
    }
}

fn draw_game(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    toasts: &[Toast],
    no_animation: bool,
) {
    let (playfield, sidebar) = game_layout(area, state);
    draw_playfield(frame, state, theme, playfield, toasts, no_animation);
    draw_sidebar(frame, state, theme, sidebar);
}

/// Colour of one grain, including piece overlay, dissolve remainder and match flash.
fn grain_color(state: &GameState, theme: &Theme, x: i32, y: i32, no_animation: bool) -> Color {
    let grid = state.grid();
    let Some(idx) = grid.index(x, y) else {
        return theme.bg;
    };
    if state.occupancy().at(idx) {
        return match state.state() {
            PieceState::Dissolving(d) => shade(theme.sand_color(d.color()), -18),
            PieceState::Landing { piece, elapsed_ms } => {
                let lit = (elapsed_ms / LANDING_BLINK_MS) as u64 % 2 == 0;
                shade(theme.sand_color(piece.color()), if lit { 40 } else { 0 })
            }
            PieceState::Active { piece, .. } => theme.sand_color(piece.color()),
            PieceState::Idle => theme.bg,
        };
    }
    match grid.at(idx) {
        Cell::Empty => theme.bg,
        Cell::Sand(c) => {
            if state.match_mask().at(idx) && (!no_animation || state.match_flash_on()) {
                return theme.flash;
            }
            // lower rows a touch brighter, freshly moved grains brighter still
            let row = (y * 18 / grid.height() as i32 - 9) as i16;
            let motion = if state.sand_moved().at(idx) { 8 } else { 0 };
            shade(theme.sand_color(c), row + motion)
        }
    }
}

fn draw_playfield(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    toasts: &[Toast],
    no_animation: bool,
) {
    let title = format!(" Sandtris  | Score: {} ", state.score());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let gw = state.grid().width() as i32;
    let gh = state.grid().height() as i32;
    let buf = frame.buffer_mut();

    // Two grains per terminal row: top in fg, bottom in bg.
    for y in (0..gh).step_by(2) {
        for x in 0..gw {
            let rx = inner.x + x as u16;
            let ry = inner.y + (y / 2) as u16;
            if rx >= inner.x + inner.width || ry >= inner.y + inner.height {
                continue;
            }
            let top = grain_color(state, theme, x, y, no_animation);
            let bottom = grain_color(state, theme, x, y + 1, no_animation);
            buf[(rx, ry)]
                .set_symbol("▀")
                .set_style(Style::default().fg(top).bg(bottom));
        }
    }

    for toast in toasts {
        let width = toast.text.chars().count() as u16;
        let max_x = (inner.x + inner.width).saturating_sub(width);
        let rx = (inner.x + (toast.x as u16).saturating_sub(width / 2)).min(max_x);
        // drift upward as the toast ages
        let rise = (toast.age.as_millis() / 300) as u16;
        let ry = (inner.y + (toast.y as u16 / 2)).saturating_sub(rise).max(inner.y);
        if ry < inner.y + inner.height {
            let style = Style::default()
                .fg(theme.flash)
                .bg(theme.bg)
                .add_modifier(Modifier::BOLD);
            buf.set_string(rx, ry, &toast.text, style);
        }
    }
}

/// Mark the drop column on the playfield's bottom border.
fn draw_aim(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect, aim_x: i32) {
    let (playfield, _) = game_layout(area, state);
    let board = board_rect(area, state);
    let span = 4 * state.config().block as i32;
    let y = playfield.y + playfield.height.saturating_sub(1);
    let style = Style::default().fg(theme.flash).bg(theme.bg);
    let buf = frame.buffer_mut();
    for x in aim_x.max(0)..(aim_x + span).min(board.width as i32) {
        buf[(board.x + x as u16, y)].set_symbol("▲").set_style(style);
    }
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Tray (border + title + previews + slot numbers)
            Constraint::Length(1), // gap
            Constraint::Length(6), // Stats (border + score, lines, level, state)
            Constraint::Length(1), // gap
            Constraint::Length(4), // Wind (border + label + gauge)
        ])
        .split(area);

    // --- Tray ---
    let tray_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let tray_inner = tray_block.inner(chunks[0]);
    tray_block.render(chunks[0], frame.buffer_mut());
    let tray_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(PREVIEW_ROWS),
            Constraint::Length(1),
        ])
        .split(tray_inner);
    Paragraph::new(Line::from(Span::styled("Tray", title_style)))
        .render(tray_layout[0], frame.buffer_mut());
    let slot_w = 7;
    for (i, slot) in state.tray().slots().iter().enumerate() {
        let x = tray_layout[1].x + i as u16 * slot_w;
        if x + slot_w > tray_inner.x + tray_inner.width {
            break;
        }
        let preview = Rect {
            x,
            y: tray_layout[1].y,
            width: slot_w,
            height: tray_layout[1].height,
        };
        let label_style = if slot.is_some() {
            fg_style
        } else {
            Style::default().fg(theme.div_line)
        };
        if let Some(kind) = slot {
            draw_piece_preview(frame, theme, preview, *kind);
        }
        frame.buffer_mut().set_string(
            x + slot_w / 2 - 1,
            tray_layout[2].y,
            format!("{}", i + 1),
            label_style,
        );
    }

    // --- Stats ---
    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let stat = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, fg_style)])
    };
    let stats_lines = vec![
        stat("Score: ", state.score().to_string()),
        stat("Lines: ", state.lines().to_string()),
        stat("Level: ", state.level().to_string()),
        stat("Piece: ", state.state().name().to_string()),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    // --- Wind ---
    let wind_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let wind_inner = wind_block.inner(chunks[4]);
    wind_block.render(chunks[4], frame.buffer_mut());
    let wind_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(wind_inner);
    let factor = state.config().wind_factor;
    let ratio = if factor > 0.0 {
        ((state.wind() / factor + 1.0) / 2.0).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let arrow = if state.wind() > 0.0 { "→" } else { "←" };
    Paragraph::new(Line::from(vec![
        Span::styled("Wind ", title_style),
        Span::styled(format!("{arrow} {:+.2}", state.wind()), fg_style),
    ]))
    .render(wind_layout[0], frame.buffer_mut());
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(theme.main_fg).bg(theme.bg))
        .render(wind_layout[1], frame.buffer_mut());
}

/// Draw a tray piece at rotation 0, centred in `area`.
fn draw_piece_preview(frame: &mut Frame, theme: &Theme, area: Rect, kind: PieceKind) {
    let inner = Rect {
        width: area.width.min(PREVIEW_COLS * MINI_CELL_W),
        height: area.height.min(PREVIEW_ROWS),
        ..area
    };
    let b = kind.bounds(0);
    let bw = (b.max_x - b.min_x + 1) as u16;
    let bh = (b.max_y - b.min_y + 1) as u16;
    let off_x = inner.width.saturating_sub(bw * MINI_CELL_W) / 2;
    let off_y = inner.height.saturating_sub(bh) / 2;
    let color = theme.sand_color(kind.color());

    for &(dx, dy) in kind.cells(0) {
        let px = (i32::from(dx) - b.min_x) as u16;
        let py = (i32::from(dy) - b.min_y) as u16;
        let r = Rect {
            x: inner.x + off_x + px * MINI_CELL_W,
            y: inner.y + off_y + py,
            width: MINI_CELL_W,
            height: 1,
        };
        if r.y < inner.y + inner.height {
            Paragraph::new("██")
                .style(Style::default().fg(color).bg(theme.bg))
                .render(r, frame.buffer_mut());
        }
    }
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Paused ", Style::default().fg(Color::Black).bg(Color::Yellow))),
        Line::from(""),
        Line::from(Span::styled(" P: Resume    Q: Quit ", Style::default().fg(theme.main_fg))),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let popup = centered(area, 30, 10);
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Game Over ", Style::default().fg(Color::White).bg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", state.score()), fg)),
        Line::from(Span::styled(format!(" Lines: {} ", state.lines()), fg)),
        Line::from(Span::styled(format!(" Level: {} ", state.level()), fg)),
        Line::from(""),
        Line::from(Span::styled(" R: Restart    Q: Quit ", fg)),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Sandtris ", theme.title)),
        )
        .render(popup, frame.buffer_mut());
}
