//! App: terminal init, main loop, tick and key handling.

use crate::Args;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use sandtris::{GameConfig, GameEvent, GameState, PlaceError};
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, info};

/// DAS (Delayed Auto-Shift): delay before movement starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated moves while holding.
const REPEAT_INTERVAL_MS: u64 = 50;
/// Without release events, soft drop stays on this long after the last key press.
const SOFT_DROP_HOLD_MS: u64 = 150;
/// Lifetime of a score toast.
const TOAST_MS: u64 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

/// Floating "+points" label anchored at a grain coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub age: Duration,
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    state: GameState,
    screen: Screen,
    paused: bool,
    /// Column the next tray piece drops in at; left/right move it while no piece is in play.
    aim_x: i32,
    last_tick: Instant,
    /// Terminal reports key releases (kitty keyboard protocol).
    release_events: bool,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    soft_drop_until: Option<Instant>,
    toasts: Vec<Toast>,
    /// TachyonFX fade for the match flash (created when a flash starts).
    match_effect: Option<Effect>,
    /// Last time the match effect was processed (for delta).
    match_effect_time: Option<Instant>,
}

impl App {
    pub fn new(args: Args, config: GameConfig, seed: u64) -> Result<Self> {
        let state = GameState::new(config.clone(), seed)?;
        let (aim_x, _) = state.spawn_origin();
        Ok(Self {
            theme: args.theme(),
            args,
            config,
            state,
            screen: Screen::Playing,
            paused: false,
            aim_x,
            last_tick: Instant::now(),
            release_events: false,
            repeat_state: None,
            last_repeat_fire: None,
            soft_drop_until: None,
            toasts: Vec::new(),
            match_effect: None,
            match_effect_time: None,
        })
    }

    fn reset_game(&mut self) -> Result<()> {
        let seed = self.args.seed.unwrap_or_else(rand::random);
        info!(seed, score = self.state.score(), "restarting");
        self.state = GameState::new(self.config.clone(), seed)?;
        self.screen = Screen::Playing;
        self.paused = false;
        self.aim_x = self.state.spawn_origin().0;
        self.last_tick = Instant::now();
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.soft_drop_until = None;
        self.toasts.clear();
        self.match_effect = None;
        self.match_effect_time = None;
        Ok(())
    }

    fn place(&mut self, slot: usize) {
        match self.state.drop_from_tray(slot, self.aim_x) {
            Ok(()) => {}
            Err(PlaceError::Blocked) => {
                self.toasts.push(Toast {
                    text: "no room".into(),
                    x: f64::from(self.aim_x + 2 * self.config.block as i32),
                    y: 0.0,
                    age: Duration::ZERO,
                });
            }
            Err(err) => debug!(%err, slot, "placement ignored"),
        }
    }

    /// Move the drop column by whole blocks, keeping the 4-block box within reach of
    /// every board column.
    fn move_aim(&mut self, dir: i32) {
        let b = self.config.block as i32;
        let gw = self.state.grid().width() as i32;
        self.aim_x = (self.aim_x + dir * b).clamp(-3 * b, gw - b);
    }

    fn apply_action(&mut self, action: Action, now: Instant) {
        match action {
            Action::MoveLeft | Action::MoveRight => {
                let dir = if action == Action::MoveLeft { -1 } else { 1 };
                if self.state.is_idle() {
                    self.move_aim(dir);
                } else {
                    self.state.shift(dir);
                }
            }
            Action::RotateCw => {
                self.state.rotate(1);
            }
            Action::RotateCcw => {
                self.state.rotate(-1);
            }
            Action::SoftDrop => {
                self.state.set_soft_drop(true);
                self.soft_drop_until = Some(now + Duration::from_millis(SOFT_DROP_HOLD_MS));
            }
            Action::HardDrop => {
                self.state.hard_drop();
                self.repeat_state = None;
            }
            Action::PlaceSlot(slot) => self.place(slot),
            Action::Pause | Action::Restart | Action::Quit | Action::None => {}
        }
        // the next piece drops where the last one was steered
        if let Some(piece) = self.state.piece() {
            self.aim_x = piece.x;
        }
    }

    fn tick_repeat(&mut self, now: Instant) {
        let Some((action, first)) = self.repeat_state else {
            return;
        };
        if now.duration_since(first) < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let interval = Duration::from_millis(REPEAT_INTERVAL_MS);
        let next = self.last_repeat_fire.unwrap_or(first) + interval;
        if now >= next {
            self.apply_action(action, now);
            self.last_repeat_fire = Some(now);
        }
    }

    fn release(&mut self, action: Action) {
        if self.repeat_state.map(|(a, _)| a) == Some(action) {
            self.repeat_state = None;
            self.last_repeat_fire = None;
        }
        if action == Action::SoftDrop {
            self.state.set_soft_drop(false);
            self.soft_drop_until = None;
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
                PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events make held soft drop and DAS exact; fall back to OS repeats.
        self.release_events = supports_keyboard_enhancement().unwrap_or(false);
        if self.release_events {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        debug!(release_events = self.release_events, "terminal ready");

        let mut terminal = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        let result = self.run_loop(&mut terminal);

        if self.release_events {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        info!(score = self.state.score(), lines = self.state.lines(), "exiting");
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            if !self.state.match_active() {
                self.match_effect = None;
                self.match_effect_time = None;
            }
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    &self.state,
                    &self.theme,
                    self.screen,
                    self.paused,
                    self.aim_x,
                    &self.toasts,
                    &mut self.match_effect,
                    &mut self.match_effect_time,
                    now,
                    self.args.no_animation,
                )
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    let action = key_to_action(key);
                    match key.kind {
                        KeyEventKind::Release => {
                            self.release(action);
                            continue;
                        }
                        // Held keys: we repeat movement ourselves, soft drop just stays on.
                        KeyEventKind::Repeat if self.release_events => {
                            if action == Action::SoftDrop {
                                self.apply_action(action, Instant::now());
                            }
                            continue;
                        }
                        _ => {}
                    }
                    if self.handle_press(action)? {
                        return Ok(());
                    }
                }
            }

            let now = Instant::now();
            let dt = now.duration_since(self.last_tick);
            self.last_tick = now;
            if self.screen != Screen::Playing || self.paused {
                continue;
            }

            if self.release_events {
                self.tick_repeat(now);
            }
            if self.soft_drop_until.is_some_and(|t| now >= t) {
                self.state.set_soft_drop(false);
                self.soft_drop_until = None;
            }

            self.state.tick(dt);
            self.collect_events();
            self.toasts.retain_mut(|t| {
                t.age += dt;
                t.age < Duration::from_millis(TOAST_MS)
            });

            if self.state.is_idle() && self.state.board_full() {
                info!(score = self.state.score(), lines = self.state.lines(), "game over");
                self.screen = Screen::GameOver;
            }
        }
    }

    /// Returns true when the app should exit.
    fn handle_press(&mut self, action: Action) -> Result<bool> {
        match (self.screen, action) {
            (_, Action::Quit) => return Ok(true),
            (Screen::GameOver, Action::Restart) => self.reset_game()?,
            (Screen::GameOver, _) => {}
            (Screen::Playing, Action::Pause) => {
                self.paused = !self.paused;
                self.repeat_state = None;
                self.state.set_soft_drop(false);
            }
            (Screen::Playing, _) if self.paused => {}
            (Screen::Playing, action) => {
                let now = Instant::now();
                self.apply_action(action, now);
                if self.release_events && action.repeats() {
                    self.repeat_state = Some((action, now));
                    self.last_repeat_fire = None;
                }
            }
        }
        Ok(false)
    }

    fn collect_events(&mut self) {
        let block = self.config.block as f64;
        let mid_x = self.state.grid().width() as f64 / 2.0;
        let toasts: Vec<Toast> = self
            .state
            .drain_events()
            .filter_map(|event| match event {
                GameEvent::MatchCleared {
                    points, centroid, ..
                } if points > 0 => Some(Toast {
                    text: format!("+{points}"),
                    x: centroid.0,
                    y: centroid.1,
                    age: Duration::ZERO,
                }),
                GameEvent::RowsCleared { rows, points } => Some(Toast {
                    text: format!("+{points} ({rows} rows)"),
                    x: mid_x,
                    y: block * 2.0,
                    age: Duration::ZERO,
                }),
                _ => None,
            })
            .collect();
        self.toasts.extend(toasts);
    }
}
