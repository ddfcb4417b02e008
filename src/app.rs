use crate::balance::Balance;
use crate::config::{load_balance, load_settings, save_settings_atomic, Paths, Settings};
use crate::events::SimEvent;
use crate::hud::{
    draw_center_box, draw_hud, ending_text, footer, CellBuffer, Effects, Terminal,
};
use crate::input::{collect_input_nonblocking, map_event_to_command, Command, TapInput};
use crate::model::GameMode;
use crate::sim::StatSimulation;
use crate::storage::{clear_save, load_save, save_atomic, SaveFile};
use crate::Args;
use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const HELP_TEXT: &str = "Keep Bob going, one day at a time.\n\
    Stats drain every second; each new day drains faster.\n\n\
    Up    +1 Health\n\
    Right +1 Happiness (unlocks on day 3)\n\
    Left  +1 Imagination (unlocks on day 2)\n\n\
    A stat that hits 0 or 100 freezes for good.\n\
    Two stats at 0: bad ending. Two at 100: delulu.\n\
    On odd days Bob gets needy and one stat drains double.\n\n\
    Esc or H to close.";

/// Mode machine and run state: everything but the terminal.
struct Session {
    settings: Settings,
    paths: Paths,
    sim: StatSimulation<Vec<SimEvent>>,
    mode: GameMode,
    help_return: GameMode,
    effects: Effects,
    taps: TapInput,
    resumed_from: Option<DateTime<Utc>>,
    should_quit: bool,
}

impl Session {
    fn new(
        settings: Settings,
        paths: Paths,
        balance: Balance,
        new_game: bool,
    ) -> anyhow::Result<Self> {
        let mut sim = StatSimulation::new(balance, settings.seed, Vec::new());
        // Menus come first; nothing drains until the player starts.
        sim.set_running(false);

        let mut resumed_from = None;
        if new_game {
            clear_save(&paths.save_path)?;
        } else if let Some(save) = load_save(&paths.save_path) {
            sim.restore(&save.snapshot);
            sim.set_running(false);
            resumed_from = Some(save.saved_at);
        }

        Ok(Self {
            settings,
            paths,
            sim,
            mode: GameMode::MainMenu,
            help_return: GameMode::MainMenu,
            effects: Effects::default(),
            taps: TapInput::default(),
            resumed_from,
            should_quit: false,
        })
    }

    fn handle(&mut self, cmd: Command) -> anyhow::Result<()> {
        match cmd {
            Command::Quit => self.should_quit = true,
            Command::Start => {
                if self.sim.endings().any() {
                    return self.handle(Command::NewGame);
                }
                self.mode = GameMode::Gameplay;
                self.effects.show_day(self.sim.day());
            }
            Command::NewGame => {
                self.sim.restart();
                self.sim.sink_mut().clear();
                clear_save(&self.paths.save_path)?;
                self.resumed_from = None;
                self.effects = Effects::default();
                self.taps.clear();
                self.effects.show_day(self.sim.day());
                self.mode = GameMode::Gameplay;
            }
            Command::PauseToggle => {
                self.mode = match self.mode {
                    GameMode::Gameplay => GameMode::Paused,
                    GameMode::Paused => GameMode::Gameplay,
                    other => other,
                };
                debug!(mode = ?self.mode, "pause toggled");
            }
            Command::HelpToggle => {
                if self.mode == GameMode::Help {
                    self.mode = self.help_return;
                } else {
                    // Help over gameplay is a pause.
                    self.help_return = match self.mode {
                        GameMode::Gameplay => GameMode::Paused,
                        other => other,
                    };
                    self.mode = GameMode::Help;
                }
            }
            Command::Back => {
                self.mode = match self.mode {
                    GameMode::Help => self.help_return,
                    GameMode::Paused => {
                        self.save_now()?;
                        self.resumed_from = Some(Utc::now());
                        GameMode::MainMenu
                    }
                    GameMode::Ending(_) => GameMode::MainMenu,
                    other => other,
                };
            }
            Command::Move(dir) => self.taps.press(dir),
        }
        Ok(())
    }

    /// Gate the sim on the mode and feed it the pending tap.
    fn sync_sim(&mut self) {
        self.sim.set_running(self.mode == GameMode::Gameplay);
        self.sim.apply_input(&mut self.taps);
    }

    fn drain_events(&mut self) -> anyhow::Result<()> {
        let events = std::mem::take(self.sim.sink_mut());
        for ev in events {
            debug!(?ev, "sim event");
            self.effects.on_event(&ev);
            if let SimEvent::EndingTriggered { kind } = ev {
                // First ending wins; the run stops here.
                if !matches!(self.mode, GameMode::Ending(_)) {
                    info!(?kind, day = self.sim.day(), "run over");
                    self.mode = GameMode::Ending(kind);
                    self.sim.set_running(false);
                    clear_save(&self.paths.save_path)?;
                }
            }
        }
        Ok(())
    }

    fn draw(&self, buf: &mut CellBuffer) {
        buf.clear(crossterm::style::Color::Black);
        let color = self.settings.enable_color;

        match self.mode {
            GameMode::MainMenu => {
                let body = match self.resumed_from {
                    Some(at) => format!(
                        "Bob is waiting on day {}.\nSaved {}\n\nEnter to resume, N for a new game.",
                        self.sim.day(),
                        at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                    ),
                    None => "Keep Bob's stats alive as the days speed up.\n\nEnter to start."
                        .to_string(),
                };
                draw_center_box(buf, "Bob's Days", &body);
            }
            GameMode::Help => {
                if self.help_return != GameMode::MainMenu {
                    draw_hud(buf, &self.sim, &self.effects, color);
                }
                draw_center_box(buf, "How to play", HELP_TEXT);
            }
            GameMode::Gameplay => {
                draw_hud(buf, &self.sim, &self.effects, color);
            }
            GameMode::Paused => {
                draw_hud(buf, &self.sim, &self.effects, color);
                draw_center_box(buf, "Paused", "P to resume, M for the main menu.");
            }
            GameMode::Ending(kind) => {
                draw_hud(buf, &self.sim, &self.effects, color);
                draw_center_box(buf, kind.title(), &ending_text(kind, self.sim.day()));
            }
        }
        footer(buf, &self.mode);
    }

    fn save_now(&self) -> anyhow::Result<()> {
        if self.sim.endings().any() {
            return clear_save(&self.paths.save_path);
        }
        // Nothing worth keeping before the first start.
        if self.mode == GameMode::MainMenu && self.resumed_from.is_none() && self.sim.day() == 1 {
            return Ok(());
        }
        save_atomic(&self.paths.save_path, &SaveFile::new(self.sim.snapshot()))
            .context("autosave")?;
        Ok(())
    }
}

pub(crate) struct App {
    session: Session,
    term: Terminal,
    autosave_at: Instant,
}

impl App {
    fn init(args: &Args, paths: Paths) -> anyhow::Result<Self> {
        let mut settings = load_settings(&paths.settings_path);
        if let Some(fps) = args.fps {
            settings.fps_cap = fps;
        }
        if let Some(seed) = args.seed {
            settings.seed = seed;
        }
        if args.no_color {
            settings.enable_color = false;
        }

        let balance_path = args.balance.clone().unwrap_or_else(|| paths.balance_path.clone());
        let balance = load_balance(&balance_path)?;
        let session = Session::new(settings, paths, balance, args.new_game)?;

        let term = Terminal::begin()?;
        info!(
            seed = session.settings.seed,
            resumed = session.resumed_from.is_some(),
            "session started"
        );

        Ok(Self {
            autosave_at: Instant::now() + autosave_every(&session.settings),
            session,
            term,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.session.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let sim_step = Duration::from_millis(self.session.settings.sim_step_ms.max(1));

        let mut last_frame = Instant::now();
        let mut sim_accum = Duration::ZERO;

        while !self.session.should_quit {
            self.term.resize_if_needed()?;

            for ev in collect_input_nonblocking(frame_dt)? {
                if let Some(cmd) = map_event_to_command(&self.session.mode, ev) {
                    self.session.handle(cmd)?;
                }
                if self.session.should_quit {
                    break;
                }
            }

            self.session.sync_sim();

            let now = Instant::now();
            let real_dt = now.saturating_duration_since(last_frame);
            last_frame = now;

            if self.session.sim.is_running() {
                sim_accum = sim_accum.saturating_add(real_dt);
                while sim_accum >= sim_step && self.session.sim.is_running() {
                    self.session.sim.tick(sim_step.as_secs_f32());
                    sim_accum = sim_accum.saturating_sub(sim_step);
                    self.session.drain_events()?;
                }
                self.session.effects.advance(real_dt.as_secs_f32());
            } else {
                sim_accum = Duration::ZERO;
            }
            // Taps outside the tick loop still emit events.
            self.session.drain_events()?;

            self.session.draw(self.term.frame_mut());
            self.term.present()?;

            if Instant::now() >= self.autosave_at {
                self.session.save_now()?;
                self.autosave_at = Instant::now() + autosave_every(&self.session.settings);
            }

            spin_sleep(frame_dt, Instant::now());
        }

        self.session.save_now()?;
        self.term.end()?;
        save_settings_atomic(&self.session.paths.settings_path, &self.session.settings)
            .context("saving settings")?;
        info!(day = self.session.sim.day(), "session ended");
        Ok(())
    }
}

fn autosave_every(settings: &Settings) -> Duration {
    Duration::from_secs(settings.autosave_secs.max(1))
}

pub(crate) fn run(args: &Args, paths: Paths) -> anyhow::Result<()> {
    let mut app = App::init(args, paths)?;
    let result = app.run();
    if result.is_err() {
        // Leave the terminal usable even when the loop bailed.
        let _ = app.term.end();
    }
    result
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
