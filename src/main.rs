//! Entry point and game loop.

use std::fs::OpenOptions;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossterm::event::KeyCode;
use env_logger::Env;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use mergecube::config::GameConfig;
use mergecube::domain::tile::{Coord, Tile};
use mergecube::sim::controller::BoardController;
use mergecube::sim::drag::{DragController, DropOutcome};
use mergecube::sim::event::{dispatch, EndReason, GameEvent, LevelEnd, Presenter};
use mergecube::sim::flow::{FlowError, FlowHost, LevelFlow, RatingAction, Reward};
use mergecube::sim::hooks::{HandleFactory, Hooks, NoBinding};
use mergecube::sim::level::{LevelState, Rating, Transition};
use mergecube::sim::reveal::RevealTracker;
use mergecube::sim::stats::{FileStats, Stat};
use mergecube::ui::input::{is_ctrl_c, Command, InputState};
use mergecube::ui::renderer::{Overlay, Renderer, View};

const FRAME_SLEEP: Duration = Duration::from_millis(16);
const REVEAL_TIME: Duration = Duration::from_millis(600);
const CELEBRATE_TIME: Duration = Duration::from_millis(1500);
const REWARD_TIME: Duration = Duration::from_millis(2500);
/// Ghosts opened per "open" helper use.
const HELPER_OPEN: usize = 2;
const REWARD_CHANCE: f64 = 0.5;
const REWARDS: [&str; 6] = [
    "Copper cube", "Glass cube", "Jade cube", "Obsidian cube", "Opal cube", "Golden cube",
];

fn main() {
    let config = GameConfig::load();
    init_logging(&config.log_file);

    let seed = config.seed.unwrap_or_else(clock_seed);
    info!("starting: seed={seed} board={}x{} mode={:?}", config.board.rows, config.board.cols, config.mode);

    let hooks = Hooks {
        tiles: Box::new(HandleFactory::default()),
        drag: Box::new(NoBinding),
        stats: Box::new(FileStats::open(&config.stats_file)),
    };
    let mut session = Session::new(&config, seed, hooks);
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let started = Instant::now();
    let result = game_loop(&mut session, &mut renderer);
    session.ctl.stats_mut().increment(Stat::TimePlayed, started.elapsed().as_secs());

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Merge Cube!");
    println!("Final Score: {}  (level {})", session.level.score, session.level.level);
}

/// Log to the configured file so the terminal screen stays intact.
/// Falls back to stderr if the file cannot be opened.
fn init_logging(path: &Path) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => eprintln!("could not open log file {}: {e}", path.display()),
    }
    let _ = builder.try_init();
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}

// ══════════════════════════════════════════════════════════════
// Session state
// ══════════════════════════════════════════════════════════════

/// Collects what the presenter hooks report.
#[derive(Default)]
struct Hud {
    message: String,
    pending_end: Option<LevelEnd>,
}

impl Presenter for Hud {
    fn on_merge_complete(&mut self, tile: &Tile) {
        self.message = if tile.is_ghost() {
            "Cube cracked!".to_string()
        } else if tile.stack > 1 {
            format!("Stacked {} x{}", tile.value, tile.stack)
        } else {
            format!("Merged into {}", tile.value)
        };
    }

    fn on_level_end(&mut self, end: &LevelEnd) {
        self.pending_end = Some(*end);
    }
}

struct Reveal {
    tracker: RevealTracker,
    started: Instant,
    last: Instant,
}

struct Session {
    ctl: BoardController,
    drag: DragController,
    flow: LevelFlow,
    level: LevelState,
    cursor: Coord,
    hud: Hud,
    reveal: Option<Reveal>,
    rng: StdRng,
}

impl Session {
    fn new(config: &GameConfig, seed: u64, hooks: Hooks) -> Self {
        Session {
            ctl: BoardController::new(config.board.clone(), config.spawn, seed, hooks),
            drag: DragController::with_snap_overlap(config.snap_overlap),
            flow: LevelFlow::new(config.mode, config.scoring.clone()),
            level: LevelState::new(),
            cursor: Coord::new(0, 0),
            hud: Hud::default(),
            reveal: None,
            rng: StdRng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15),
        }
    }

    fn rebuild(&mut self) {
        self.drag.cancel();
        let events = self.ctl.rebuild(&mut self.level);
        self.absorb(events);
    }

    fn absorb(&mut self, events: Vec<GameEvent>) {
        for event in &events {
            match event {
                GameEvent::BoardRebuilt { opened, .. } => {
                    let now = Instant::now();
                    self.reveal = Some(Reveal {
                        tracker: RevealTracker::new(*opened, REVEAL_TIME),
                        started: now,
                        last: now,
                    });
                    self.hud.message = format!("Board {}", self.level.board);
                }
                GameEvent::TilesOpened { ids } => {
                    self.hud.message = format!("Opened {} tile(s)", ids.len());
                }
                GameEvent::WildGranted { .. } => self.hud.message = "A wild cube appears".to_string(),
                _ => {}
            }
        }
        dispatch(&events, &mut self.hud);
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Move { dx, dy } => {
                let board = self.ctl.board();
                let col = (self.cursor.col as i32 + dx).clamp(0, board.cols() as i32 - 1);
                let row = (self.cursor.row as i32 + dy).clamp(0, board.rows() as i32 - 1);
                self.cursor = Coord::new(col as usize, row as usize);
                if self.drag.is_dragging() {
                    let target = board.tile_at(self.cursor).map(|t| t.id);
                    let _ = self.drag.hover(board, target, 1.0);
                }
            }
            Command::Grab if self.drag.is_dragging() => {
                match self.drag.release(&mut self.ctl, &mut self.level) {
                    Ok(DropOutcome::Merged(outcome)) => self.absorb(outcome.events),
                    Ok(DropOutcome::Declined { .. }) => self.hud.message = "Those cubes don't merge".to_string(),
                    Err(e) => self.hud.message = e.to_string(),
                }
            }
            Command::Grab => {
                let Some(id) = self.ctl.board().tile_at(self.cursor).map(|t| t.id) else { return };
                if let Err(e) = self.drag.begin(self.ctl.board(), id) {
                    self.hud.message = e.to_string();
                }
            }
            Command::Cancel => {
                self.drag.cancel();
            }
            Command::OpenTiles => {
                let events = self.ctl.open_locked_tiles(HELPER_OPEN, None, &mut self.level);
                self.absorb(events);
            }
            Command::GrantWild => {
                let events = self.ctl.grant_wild(&mut self.level);
                self.absorb(events);
            }
            Command::Rebuild => {
                self.level.apply(Transition::Retry { level: self.level.level, reset_score: false });
                self.rebuild();
            }
            Command::Quit => {}
        }
    }

    /// Step the cosmetic deal-in. Logical state is already final.
    fn tick_reveal(&mut self) {
        let Some(reveal) = self.reveal.as_mut() else { return };
        let now = Instant::now();
        let mut events = Vec::new();
        events.extend(reveal.tracker.advance(now - reveal.last));
        reveal.last = now;

        let frac = (now - reveal.started).as_secs_f64() / REVEAL_TIME.as_secs_f64();
        let due = ((reveal.tracker.total() as f64) * frac).ceil() as usize;
        while reveal.tracker.shown() < due.min(reveal.tracker.total()) {
            events.extend(reveal.tracker.tile_shown());
        }
        if reveal.tracker.is_done() {
            events.extend(reveal.tracker.finish());
            self.reveal = None;
        }
        dispatch(&events, &mut self.hud);
    }

    fn view(&self) -> View<'_> {
        let held = self.drag.session().map(|s| s.tile);
        View {
            board: self.ctl.board(),
            level: &self.level,
            status: self.ctl.status(),
            cursor: self.cursor,
            held,
            can_drop: self.drag.session().map_or(false, |s| s.can_drop),
            revealed: self.reveal.as_ref().map(|r| r.tracker.shown()),
            message: &self.hud.message,
        }
    }

    /// Run the level flow. Returns false when the player quits.
    fn finish_level(&mut self, end: &LevelEnd, renderer: &mut Renderer, input: &mut InputState) -> bool {
        self.drag.cancel();
        let mut host = TermHost { renderer, input, drag: &mut self.drag, rng: &mut self.rng, quit: false };
        let outcome = self.flow.run(&mut host, end, self.ctl.stats_mut());
        if host.quit || outcome.transition == Transition::Quit {
            return false;
        }
        if let Some(reward) = &outcome.reward {
            info!("reward unlocked: {}", reward.name);
        }
        self.level.apply(outcome.transition);
        self.rebuild();
        true
    }
}

fn game_loop(s: &mut Session, renderer: &mut Renderer) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    s.rebuild();

    loop {
        kb.drain_events();
        if kb.ctrl_c_pressed() {
            break;
        }
        let commands: Vec<Command> = kb.commands().collect();
        if commands.contains(&Command::Quit) {
            break;
        }
        for cmd in commands {
            s.handle(cmd);
        }

        s.tick_reveal();
        if s.reveal.is_none() {
            if let Some(end) = s.hud.pending_end.take() {
                renderer.render(&s.view())?;
                if !s.finish_level(&end, renderer, &mut kb) {
                    break;
                }
            }
        }

        renderer.render(&s.view())?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Terminal flow host
// ══════════════════════════════════════════════════════════════

struct TermHost<'a> {
    renderer: &'a mut Renderer,
    input: &'a mut InputState,
    drag: &'a mut DragController,
    rng: &'a mut StdRng,
    quit: bool,
}

impl TermHost<'_> {
    fn show(&mut self, overlay: &Overlay) -> Result<(), FlowError> {
        self.renderer.render_overlay(overlay).map_err(|e| FlowError::Step(e.to_string()))
    }

    /// Hold the current screen until a key or `timeout`.
    fn pause(&mut self, timeout: Duration) -> Result<(), FlowError> {
        match self.input.wait_key(timeout) {
            Some(key) if is_ctrl_c(&key) => {
                self.quit = true;
                Err(FlowError::Aborted)
            }
            _ => Ok(()),
        }
    }
}

impl FlowHost for TermHost<'_> {
    fn set_input_locked(&mut self, locked: bool) {
        self.drag.set_enabled(!locked);
    }

    fn set_grid_visible(&mut self, visible: bool) {
        if !visible {
            if let Err(e) = self.renderer.render_blank() {
                warn!("could not clear screen: {e}");
            }
        }
    }

    fn celebrate(&mut self, end: &LevelEnd) -> Result<(), FlowError> {
        self.show(&Overlay {
            title: "Board clean!",
            lines: vec![format!("Score {}  in {} moves", end.score, end.moves)],
            footer: "",
        })?;
        self.pause(CELEBRATE_TIME)
    }

    fn present_reward(&mut self, _end: &LevelEnd) -> Result<Option<Reward>, FlowError> {
        let reward = if self.rng.gen_bool(REWARD_CHANCE) {
            REWARDS.choose(&mut *self.rng).map(|name| Reward { name: name.to_string() })
        } else {
            None
        };
        let line = match &reward {
            Some(r) => format!("You found: {}", r.name),
            None => "The box is empty.".to_string(),
        };
        self.show(&Overlay { title: "Mystery prize", lines: vec![line], footer: "any key" })?;
        self.pause(REWARD_TIME)?;
        Ok(reward)
    }

    fn rate(&mut self, end: &LevelEnd, rating: &Rating) -> Result<RatingAction, FlowError> {
        let stars: String = (0..3).map(|i| if i < rating.stars { '★' } else { '☆' }).collect();
        let verdict = if rating.passed { "Level passed" } else { "Level failed" };
        let reason = match end.reason {
            EndReason::BoardClean => "board cleaned",
            EndReason::NoMoves => "no moves left",
        };
        let [t1, t2, t3] = rating.thresholds;
        self.show(&Overlay {
            title: verdict,
            lines: vec![
                format!("{stars}   score {} ({reason})", end.score),
                format!("stars at {t1} / {t2} / {t3}"),
            ],
            footer: "[c]ontinue  [r]estart  [q]uit",
        })?;

        loop {
            let Some(key) = self.input.wait_key(Duration::from_secs(3600)) else { continue };
            if is_ctrl_c(&key) {
                self.quit = true;
                return Err(FlowError::Aborted);
            }
            match key.code {
                KeyCode::Char('c') | KeyCode::Enter => {
                    return Ok(RatingAction::Continue);
                }
                KeyCode::Char('r') => return Ok(RatingAction::Restart),
                KeyCode::Char('q') => return Ok(RatingAction::Quit),
                _ => {}
            }
        }
    }
}
