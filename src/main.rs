mod audio;
mod completion;
mod config;
mod controls;
mod display;
mod error;
#[cfg(test)]
mod fake_audio;
mod gauge;
mod input;
mod library;
mod lyrics;
mod now_playing;
mod playlist;
mod progress;
mod session;
mod tags;
mod terminal;
mod theme;

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{Context, bail};
use clap::Parser;
use ratatui::DefaultTerminal;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::audio::RodioBackend;
use crate::config::Settings;
use crate::display::DisplayCoordinator;
use crate::input::KeyReader;
use crate::playlist::{Exit, Playlist, PlaylistController};
use crate::terminal::TerminalSink;
use crate::theme::{Theme, theme_by_name};

#[derive(Parser, Debug)]
#[command(name = "tui-karaoke", version, about = "Terminal audio player with synchronized lyrics")]
struct Cli {
    /// Audio file, or a directory to play recursively
    path: PathBuf,

    /// Shuffle the playlist before starting
    #[arg(long)]
    shuffle: bool,

    /// Track to start from (1-based)
    #[arg(long, value_name = "N")]
    start: Option<usize>,

    /// Color theme name
    #[arg(long)]
    theme: Option<String>,

    /// Save the effective settings as the new defaults
    #[arg(long)]
    write_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings_path = config::settings_path();
    let (mut settings, settings_error) = match config::load_settings(&settings_path) {
        Ok(settings) => (settings, None),
        Err(err) => (Settings::default(), Some(err)),
    };
    if let Some(theme) = cli.theme {
        settings.theme = theme;
    }
    settings.shuffle |= cli.shuffle;

    init_logging(&settings.log_level)?;
    if let Some(err) = settings_error {
        tracing::warn!(%err, "settings unusable, using defaults");
    }
    tracing::info!(?settings, "starting");

    if cli.write_config {
        config::save_settings(&settings_path, &settings)
            .with_context(|| format!("writing {}", settings_path.display()))?;
    }

    let tracks = library::collect_tracks(&cli.path);
    if tracks.is_empty() {
        bail!("no playable audio (mp3, flac, wav) found at {}", cli.path.display());
    }
    let mut playlist = Playlist::new(tracks);
    if settings.shuffle {
        playlist.shuffle_with(&mut rand::rng());
    }
    let start = cli.start.unwrap_or(1).saturating_sub(1);

    let backend = RodioBackend::open_default().context("opening audio output")?;
    let theme = theme_by_name(&settings.theme);

    let terminal = ratatui::init();
    let result = run(terminal, theme, &settings, backend, playlist, start);
    ratatui::restore();

    match result? {
        Exit::ReturnedToMenu => println!("Returned to menu."),
    }
    Ok(())
}

fn run(
    terminal: DefaultTerminal,
    theme: &'static Theme,
    settings: &Settings,
    backend: RodioBackend,
    playlist: Playlist,
    start: usize,
) -> anyhow::Result<Exit> {
    let sink = Arc::new(TerminalSink::new(terminal, theme));
    let display = Arc::new(DisplayCoordinator::new(
        sink,
        settings.progress_interval(),
        settings.lyric_interval(),
    ));
    let mut controller = PlaylistController::new(Box::new(backend), display);
    let _keys = KeyReader::spawn(controller.sender(), settings.input_poll());

    controller.load(playlist, start).context("starting playlist")?;
    let exit = controller.run().context("playing")?;
    tracing::info!(?exit, "player stopped");
    Ok(exit)
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging(default_level: &str) -> anyhow::Result<()> {
    let path = config::log_path();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
    Ok(())
}
