/// Entry point and game loop.

use std::time::{Duration, Instant};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use sokoban::config::GameConfig;
use sokoban::domain::entity::Command;
use sokoban::sim::engine::{Phase, UndoResult};
use sokoban::sim::level::Catalog;
use sokoban::sim::save::{FileStorage, Storage};
use sokoban::sim::session::{Completion, GameSession, Outcome, Update};
use sokoban::ui::input::{Action, InputState};
use sokoban::ui::renderer::{Overlay, Renderer, THEMES};
use sokoban::ui::sound::{self, SoundEngine};

/// Pause between the winning move and the completion dialog.
const CELEBRATION_DELAY: Duration = Duration::from_secs(1);

fn main() {
    let config = GameConfig::load();

    if let Err(e) = setup_logging(&config) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let catalog = Catalog::load(config.levels_file.as_deref());
    let storage = match FileStorage::new(&config.data_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Cannot open save directory {}: {e}", config.data_dir.display());
            return;
        }
    };

    let mut session = GameSession::new(catalog, storage);
    if !session.start() {
        eprintln!("No playable level found.");
        return;
    }

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sfx = SoundEngine::new();
    if sfx.is_none() {
        tracing::warn!("no audio output device, sound disabled");
    }

    let result = game_loop(&mut session, &mut renderer, sfx.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        tracing::error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    let solved = session.settings().completed_levels.len();
    println!();
    println!("Thanks for playing Sokoban!");
    println!("Levels solved: {solved}/{}", session.catalog().len());
}

/// File-only tracing: stderr belongs to the TUI.
fn setup_logging(config: &GameConfig) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.data_dir)?;

    let file_appender = tracing_appender::rolling::never(&config.data_dir, "sokoban.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    // Leak the guard to keep the file writer alive
    std::mem::forget(guard);

    tracing::info!("log file: {}/sokoban.log", config.data_dir.display());
    Ok(())
}

struct Frontend {
    overlay: Overlay,
    /// Completion waiting for the celebration delay.
    pending: Option<(Instant, Completion)>,
    last_tick: Instant,
    quit: bool,
}

impl Frontend {
    fn new() -> Self {
        Frontend {
            overlay: Overlay::default(),
            pending: None,
            last_tick: Instant::now(),
            quit: false,
        }
    }

    /// Whether a play-clock second has elapsed at `now`. Time behind the
    /// tutorial card is not play time.
    fn clock_due(&mut self, now: Instant, tick_rate: Duration) -> bool {
        if self.overlay.tutorial {
            self.last_tick = now;
            false
        } else if now.saturating_duration_since(self.last_tick) >= tick_rate {
            self.last_tick += tick_rate;
            true
        } else {
            false
        }
    }

    /// Fresh level on screen: drop dialogs and restart the second counter.
    fn level_changed(&mut self) {
        self.overlay = Overlay::default();
        self.pending = None;
        self.last_tick = Instant::now();
    }
}

fn game_loop<S: Storage>(
    session: &mut GameSession<S>,
    renderer: &mut Renderer,
    sfx: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut fe = Frontend::new();
    fe.overlay.tutorial = !session.tutorial_completed();
    let tick_rate = Duration::from_millis(config.clock.tick_ms);
    let frame_sleep = Duration::from_millis(config.clock.frame_ms);

    while !fe.quit {
        kb.drain_events();
        for action in kb.actions() {
            handle_action(session, &mut fe, sfx, action);
            if fe.quit {
                break;
            }
        }

        if fe.clock_due(Instant::now(), tick_rate) {
            session.tick();
        }

        if let Some((at, c)) = fe.pending {
            if at.elapsed() >= CELEBRATION_DELAY {
                fe.overlay.completion = Some(c);
                fe.pending = None;
            }
        }

        renderer.render(session, &fe.overlay)?;
        std::thread::sleep(frame_sleep);
    }

    Ok(())
}

fn handle_action<S: Storage>(
    session: &mut GameSession<S>,
    fe: &mut Frontend,
    sfx: Option<&SoundEngine>,
    action: Action,
) {
    if fe.overlay.tutorial && action != Action::Quit {
        fe.overlay.tutorial = false;
        session.complete_tutorial();
        fe.last_tick = Instant::now();
        return;
    }

    let phase = session.engine().phase();
    let current = session.engine().level_id();

    match action {
        Action::Move(dir) => {
            let update = session.handle(Command::Move(dir));
            fe.overlay.message.clear();
            play(session, sfx, &update);
            if let Some(c) = update.completion {
                fe.pending = Some((Instant::now(), c));
            }
        }
        Action::Undo => {
            let update = session.handle(Command::Undo);
            if update.outcome == Outcome::Undo(UndoResult::NothingToUndo) {
                fe.overlay.message = "Nothing to undo".into();
            }
            play(session, sfx, &update);
        }
        Action::Reset => {
            if let Some(id) = current {
                session.handle(Command::Reset(id));
                fe.level_changed();
            }
        }
        Action::TogglePause => match phase {
            Phase::Active => {
                session.handle(Command::Pause);
            }
            Phase::Paused => {
                session.handle(Command::Resume);
                fe.last_tick = Instant::now();
            }
            _ => {}
        },
        Action::Next => {
            if phase == Phase::Complete && fe.overlay.completion.is_some() {
                if session.next_level().is_some() {
                    fe.level_changed();
                } else {
                    fe.overlay.all_done = true;
                }
            }
        }
        Action::PrevLevel | Action::NextLevel => {
            let Some(id) = current else { return };
            let target = if action == Action::PrevLevel { id.saturating_sub(1) } else { id + 1 };
            let update = session.handle(Command::LoadLevel(target));
            if update.outcome == Outcome::Load(true) {
                fe.level_changed();
            }
        }
        Action::CycleTheme => {
            let theme = &session.settings().theme;
            let idx = THEMES.iter().position(|t| *t == theme.as_str()).map_or(0, |i| (i + 1) % THEMES.len());
            session.set_theme(THEMES[idx]);
            fe.overlay.message = format!("Theme: {}", THEMES[idx]);
        }
        Action::ToggleSound => {
            let on = !session.settings().sound;
            session.set_sound(on);
            fe.overlay.message = format!("Sound {}", if on { "on" } else { "off" });
        }
        Action::Quit => fe.quit = true,
    }
}

fn play<S: Storage>(session: &GameSession<S>, sfx: Option<&SoundEngine>, update: &Update) {
    if !session.settings().sound {
        return;
    }
    if let Some(sfx) = sfx {
        sound::play_events(sfx, &update.events);
    }
}
