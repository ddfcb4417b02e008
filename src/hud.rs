use crate::events::{EventSink, SimEvent};
use crate::model::{EndingKind, GameMode, Stat, StatKind};
use crate::sim::StatSimulation;
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

const BANNER_SECS: f32 = 3.0;
const FLOAT_SECS: f32 = 1.0;
const BAR_WIDTH: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    w: u16,
    h: u16,
    cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            *c = Cell {
                bg,
                ..Cell::default()
            };
        }
    }
}

pub(crate) struct Terminal {
    out: io::Stdout,
    cols: u16,
    rows: u16,
    prev: CellBuffer,
    cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// The back buffer the next `present` diffs against the screen.
    pub(crate) fn frame_mut(&mut self) -> &mut CellBuffer {
        &mut self.cur
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<()> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(());
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        // Fresh `prev` matches nothing on screen; wipe so diffing starts clean.
        execute!(self.out, Clear(ClearType::All))?;
        Ok(())
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Cosmetic effects driven by sim events
------------------------------ */

#[derive(Clone, Debug)]
struct FloatingText {
    stat: StatKind,
    text: String,
    age: f32,
}

/// Short-lived HUD decorations: day banner, "+1" popups, Bob's spot.
#[derive(Clone, Debug, Default)]
pub(crate) struct Effects {
    banner: Option<(u32, f32)>,
    floats: Vec<FloatingText>,
    bob_at: Option<StatKind>,
}

impl Effects {
    pub(crate) fn show_day(&mut self, day: u32) {
        self.banner = Some((day, 0.0));
    }

    pub(crate) fn on_event(&mut self, ev: &SimEvent) {
        match *ev {
            SimEvent::DayAdvanced { day } => self.show_day(day),
            SimEvent::StatIncremented { stat, .. } => {
                self.bob_at = Some(stat);
                self.floats.push(FloatingText {
                    stat,
                    text: "+1".to_string(),
                    age: 0.0,
                });
            }
            _ => {}
        }
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        if let Some((_, age)) = &mut self.banner {
            *age += dt;
        }
        if matches!(self.banner, Some((_, age)) if age >= BANNER_SECS) {
            self.banner = None;
        }
        for f in &mut self.floats {
            f.age += dt;
        }
        self.floats.retain(|f| f.age < FLOAT_SECS);
    }

    /// Fade in for 1s, hold, fade out over the last second.
    fn banner_alpha(&self) -> f32 {
        match self.banner {
            Some((_, age)) => {
                let fade_in = age.min(1.0);
                let fade_out = (BANNER_SECS - age).clamp(0.0, 1.0);
                fade_in.min(fade_out)
            }
            None => 0.0,
        }
    }
}

/* -----------------------------
   Drawing
------------------------------ */

fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

fn bar(value01: f32, width: usize) -> String {
    let v = value01.clamp(0.0, 1.0);
    let fill = (v * width as f32 + 0.5) as usize;
    let mut s = String::new();
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { '·' });
    }
    s.push(']');
    s
}

fn stat_color(stat: &Stat, color: bool) -> Color {
    if !color {
        return Color::White;
    }
    if stat.frozen || !stat.active {
        return Color::DarkGrey;
    }
    match stat.kind {
        StatKind::Health => Color::Red,
        StatKind::Happiness => Color::Yellow,
        StatKind::Imagination => Color::Magenta,
    }
}

fn grey_ramp(alpha: f32) -> Color {
    let v = (alpha.clamp(0.0, 1.0) * 255.0) as u8;
    Color::Rgb { r: v, g: v, b: v }
}

pub(crate) fn draw_hud<S: EventSink>(
    buf: &mut CellBuffer,
    sim: &StatSimulation<S>,
    effects: &Effects,
    color: bool,
) {
    let bg = Color::Black;
    let fg = Color::White;

    let title = format!("Bob's Days  |  Day {}", sim.day());
    draw_text(buf, 1, 0, &title, fg, bg);

    let timer = format!(
        "Next Day: {}s  (x{:.1} decay)",
        sim.clock().seconds_left(),
        sim.decay_multiplier()
    );
    draw_text(buf, 1, 1, &timer, fg, bg);

    let day_len = sim.day_length().max(f32::EPSILON);
    let progress = bar(1.0 - sim.clock().countdown / day_len, BAR_WIDTH);
    draw_text(buf, 1, 2, &progress, Color::DarkGrey, bg);

    for (i, kind) in StatKind::ALL.iter().enumerate() {
        let stat = sim.stat(*kind);
        let y = 4 + (i as u16) * 2;
        let key = match kind {
            StatKind::Health => '↑',
            StatKind::Happiness => '→',
            StatKind::Imagination => '←',
        };
        let line = if stat.active {
            format!(
                "{key} {} {:<11} {} {:>3}{}",
                kind.icon(),
                kind.label(),
                bar(sim.value(*kind) / 100.0, BAR_WIDTH),
                sim.value(*kind).floor() as i32,
                if stat.frozen { " frozen" } else { "" }
            )
        } else {
            format!(
                "{key} {} {:<11} locked until day {}",
                kind.icon(),
                kind.label(),
                stat.activation_day
            )
        };
        draw_text(buf, 1, y, &line, stat_color(stat, color), bg);

        if effects.bob_at == Some(*kind) {
            draw_text(buf, 0, y, "»", Color::Cyan, bg);
        }

        let float_x = 1 + line.chars().count() as u16 + 2;
        let float_fg = if color { Color::Green } else { Color::White };
        for f in effects.floats.iter().filter(|f| f.stat == *kind) {
            draw_text(buf, float_x, y, &f.text, float_fg, bg);
        }
    }

    if let Some(needy) = sim.needy() {
        let bubble = format!(
            "Bob: I need {} {}!",
            needy.stat.label().to_lowercase(),
            needy.stat.icon()
        );
        draw_text(buf, 1, 11, &bubble, Color::Cyan, bg);
    }

    if let Some((day, _)) = effects.banner {
        let alpha = effects.banner_alpha();
        if alpha > 0.05 {
            let text = format!("~ Day {day} ~");
            let x = buf.w.saturating_sub(text.chars().count() as u16) / 2;
            draw_text(buf, x, buf.h / 2, &text, grey_ramp(alpha), bg);
        }
    }
}

pub(crate) fn footer(buf: &mut CellBuffer, mode: &GameMode) {
    let help = match mode {
        GameMode::MainMenu => "Enter start | n new game | h help | q quit",
        GameMode::Gameplay => "Arrows/WASD feed Bob | p pause | h help | q quit",
        GameMode::Paused => "Paused: p resume | m main menu | q quit",
        GameMode::Help => "Help: esc back | q quit",
        GameMode::Ending(_) => "n new game | esc main menu | q quit",
    };
    draw_text(buf, 1, buf.h.saturating_sub(1), help, Color::White, Color::Black);
}

pub(crate) fn ending_text(kind: EndingKind, days: u32) -> String {
    let flavour = match kind {
        EndingKind::Bad => "Bob ran out of everything.",
        EndingKind::Delulu => "Bob got a little too delulu.",
    };
    format!("{flavour}\n\nBob survived {days} days\n\nPress N for a new game.")
}

pub(crate) fn draw_center_box(buf: &mut CellBuffer, title: &str, body: &str) {
    let w = buf.w;
    let h = buf.h;
    let fg = Color::White;
    let bg = Color::Black;

    let bw = w.saturating_sub(4).min(60);
    let bh = h.saturating_sub(4).min(16);
    if bw < 4 || bh < 4 {
        return;
    }

    let x0 = (w - bw) / 2;
    let y0 = (h - bh) / 2;

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            let edge_x = x == x0 || x == x0 + bw - 1;
            let edge_y = y == y0 || y == y0 + bh - 1;
            let ch = match (edge_x, edge_y) {
                (true, true) => match (x == x0, y == y0) {
                    (true, true) => '┌',
                    (false, true) => '┐',
                    (true, false) => '└',
                    (false, false) => '┘',
                },
                (true, false) => '│',
                (false, true) => '─',
                (false, false) => ' ',
            };
            buf.set(x, y, Cell { ch, fg, bg });
        }
    }

    draw_text(buf, x0 + 2, y0 + 1, title, fg, bg);

    let mut yy = y0 + 3;
    for line in body.lines() {
        if yy >= y0 + bh - 1 {
            break;
        }
        draw_text(buf, x0 + 2, yy, line, fg, bg);
        yy += 1;
    }
}
