use crate::model::{GameMode, StatKind};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Which stat a tap feeds. Down is unbound.
    pub(crate) fn stat(self) -> Option<StatKind> {
        match self {
            Direction::Up => Some(StatKind::Health),
            Direction::Right => Some(StatKind::Happiness),
            Direction::Left => Some(StatKind::Imagination),
            Direction::Down => None,
        }
    }
}

/// Source of directional taps. Each tap is handed out once.
pub(crate) trait InputSource {
    fn take_direction(&mut self) -> Option<Direction>;
}

/// Keeps only the most recent tap until someone consumes it.
#[derive(Clone, Debug, Default)]
pub(crate) struct TapInput {
    pending: Option<Direction>,
}

impl TapInput {
    pub(crate) fn press(&mut self, dir: Direction) {
        self.pending = Some(dir);
    }

    pub(crate) fn clear(&mut self) {
        self.pending = None;
    }
}

impl InputSource for TapInput {
    fn take_direction(&mut self) -> Option<Direction> {
        self.pending.take()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Move(Direction),
    Start,
    PauseToggle,
    HelpToggle,
    Back,
    NewGame,
    Quit,
}

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            // Repeats are dropped: one press, one tap.
            if k.kind == KeyEventKind::Press {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

fn direction_for(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Direction::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Direction::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Direction::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Direction::Right),
        _ => None,
    }
}

pub(crate) fn map_event_to_command(mode: &GameMode, ev: InputEvent) -> Option<Command> {
    // Global
    if matches!(ev.key, KeyCode::Char('c')) && ev.mods.contains(KeyModifiers::CONTROL) {
        return Some(Command::Quit);
    }
    match ev.key {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Some(Command::Quit),
        KeyCode::Char('h') | KeyCode::Char('H') => return Some(Command::HelpToggle),
        _ => {}
    }

    match mode {
        GameMode::MainMenu => match ev.key {
            KeyCode::Enter | KeyCode::Char(' ') => Some(Command::Start),
            KeyCode::Char('n') | KeyCode::Char('N') => Some(Command::NewGame),
            _ => None,
        },
        GameMode::Gameplay => match ev.key {
            KeyCode::Esc | KeyCode::Char('p') | KeyCode::Char('P') => Some(Command::PauseToggle),
            key => direction_for(key).map(Command::Move),
        },
        GameMode::Paused => match ev.key {
            KeyCode::Esc | KeyCode::Char('p') | KeyCode::Char('P') => Some(Command::PauseToggle),
            KeyCode::Char('m') | KeyCode::Char('M') => Some(Command::Back),
            _ => None,
        },
        GameMode::Help => match ev.key {
            KeyCode::Esc => Some(Command::Back),
            _ => None,
        },
        GameMode::Ending(_) => match ev.key {
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Enter => Some(Command::NewGame),
            KeyCode::Esc => Some(Command::Back),
            _ => None,
        },
    }
}
