use std::path::{Path, PathBuf};

use cart_deck_core::{
    AppConfig, CartError, EditorSession, MoveRequest, SourceDescriptor, SourceHandle, StackId,
    StackRegistry,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> cart_deck_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Info { input } => run_info(&config, &input),
        Commands::Extract { input, output, start, end } => {
            run_edit(&config, &input, &output, start, end, EditKind::Extract)
        }
        Commands::Ripple { input, output, start, end } => {
            run_edit(&config, &input, &output, start, end, EditKind::Ripple)
        }
        Commands::Demo { files } => run_demo(&config, &files),
    }
}

fn run_info(config: &AppConfig, input: &Path) -> cart_deck_core::Result<()> {
    let session = open_session(config, input)?;
    let buffer = session.buffer().ok_or(CartError::NoBuffer)?;

    println!("file:        {}", input.display());
    println!("sample rate: {} Hz", buffer.sample_rate());
    println!("channels:    {}", buffer.channel_count());
    println!("frames:      {}", buffer.frame_count());
    println!("duration:    {:.3} s", buffer.duration_seconds());
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum EditKind {
    Extract,
    Ripple,
}

fn run_edit(
    config: &AppConfig,
    input: &Path,
    output: &Path,
    start: f64,
    end: f64,
    kind: EditKind,
) -> cart_deck_core::Result<()> {
    tracing::info!(?input, ?output, start, end, ?kind, "editing region");

    let mut session = open_session(config, input)?;
    session.select(cart_deck_core::Region::new(start, end)?)?;

    let bytes = match kind {
        EditKind::Extract => session.export_selection()?,
        EditKind::Ripple => match session.ripple_delete_selection()? {
            Some(outcome) => {
                if outcome.is_cleared() {
                    tracing::warn!("selection covered the whole file; writing an empty WAV");
                }
                Some(session.export_buffer()?)
            }
            None => None,
        },
    };

    match bytes {
        Some(bytes) => {
            std::fs::write(output, &bytes)?;
            tracing::info!(bytes = bytes.len(), ?output, "wrote wav");
            Ok(())
        }
        None => Err(CartError::msg("the selected region is shorter than one sample frame")),
    }
}

fn run_demo(config: &AppConfig, files: &[PathBuf]) -> cart_deck_core::Result<()> {
    let mut registry = StackRegistry::new(config.stacks.clone());
    let stacks = registry.stack_ids();
    let first = stacks.first().cloned().ok_or_else(|| CartError::msg("no stacks configured"))?;

    let sources = files.iter().map(|path| {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        SourceDescriptor::new(SourceHandle::Path(path.clone()), mime_for(path), name)
    });
    let added = registry.add_sources(&first, sources)?;
    tracing::info!(stack = %first, carts = added.len(), "loaded carts");

    if let Some(cart) = registry.play_top(&first) {
        tracing::info!(title = cart.title(), locator = %cart.stream_locator(), "on air");
        registry.playback_ended(cart.id());
    }

    let next = registry
        .queue(&first)
        .and_then(|queue| queue.top())
        .map(|cart| cart.id());
    if let (Some(second), Some(cart_id)) = (stacks.get(1), next) {
        let outcome = registry.move_across(MoveRequest {
            cart_id,
            source_stack: first.clone(),
            target_stack: second.clone(),
            before_id: None,
        });
        tracing::info!(?outcome, "moved next cart");
    }

    for snapshot in registry.snapshot() {
        print_stack(&snapshot.id, &snapshot.items, snapshot.active);
    }
    Ok(())
}

fn print_stack(
    id: &StackId,
    items: &[cart_deck_core::CartItem],
    active: Option<cart_deck_core::CartId>,
) {
    println!("[{id}]");
    for item in items {
        let marker = if Some(item.id()) == active { '>' } else { ' ' };
        println!("  {marker} {:<32} {:?}", item.title(), item.status());
    }
}

fn open_session(config: &AppConfig, input: &Path) -> cart_deck_core::Result<EditorSession> {
    let bytes = std::fs::read(input)?;
    let mut session = EditorSession::new(config.editor.clone());
    let name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    session.load_wav(name, &bytes)?;
    Ok(session)
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Cart stacks and waveform region editing", long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the layout of a WAV file.
    Info {
        input: PathBuf,
    },
    /// Write the region between `start` and `end` seconds to a new WAV file.
    Extract {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        start: f64,
        #[arg(long)]
        end: f64,
    },
    /// Cut the region out of the file, closing the gap, and write the rest.
    Ripple {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        start: f64,
        #[arg(long)]
        end: f64,
    },
    /// Load files into the first stack and walk through a short session.
    Demo {
        files: Vec<PathBuf>,
    },
}
