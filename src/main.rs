use anyhow::{Context, Result};
use clap::Parser;
use nckit::report::move_line;
use nckit::{
    init_logging, AppEvent, Config, EventBus, EventCategory, EventFilter, Job, Playback, Report,
    ReportFormat, SelectionEvent,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Interpret an NC program and list the machine moves it produces
#[derive(Parser)]
#[command(name = "nckit")]
#[command(version = nckit::VERSION)]
#[command(long_about = None)]
struct Cli {
    /// NC program to interpret (.nc, .tap)
    file: PathBuf,

    /// Settings file (.toml or .json); defaults to the platform config dir
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report format: text or json
    #[arg(long, default_value = "text")]
    format: ReportFormat,

    /// Select the move at this index after processing
    #[arg(long)]
    select: Option<usize>,

    /// Step through every move with the playback cursor
    #[arg(long)]
    play: bool,

    /// Milliseconds between steps while playing
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config =
        Config::load_or_default(cli.config.as_deref()).context("Failed to load settings")?;
    init_logging(&config.logging.level, cli.log_json || config.logging.json)?;
    tracing::debug!("nckit {} (built {})", nckit::VERSION, nckit::BUILD_DATE);

    let events = Arc::new(EventBus::with_config(config.job.event_bus_config()));
    let job = Job::with_events(config.interpreter.clone(), events);

    let snapshot = job
        .load_file(&cli.file)
        .await
        .with_context(|| format!("Failed to read {}", cli.file.display()))?
        .wait()
        .await
        .with_context(|| format!("Failed to process {}", cli.file.display()))?;

    let report = Report::new(&snapshot)
        .render(cli.format)
        .context("Failed to render report")?;
    print!("{}", report);

    if let Some(index) = cli.select {
        let mv = job
            .select_index(index)
            .with_context(|| format!("Cannot select move {}", index))?;
        println!("selected {}", move_line(&mv));
    }

    if cli.play && !snapshot.moves.is_empty() {
        let interval = cli
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.playback.step_interval());

        let published = Arc::clone(&snapshot);
        let subscription = job.events().subscribe(
            EventFilter::Categories(vec![EventCategory::Selection]),
            move |event| {
                if let AppEvent::Selection(SelectionEvent::MoveSelected { index, .. }) = event {
                    if let Some(mv) = published.moves.get(index) {
                        println!("play {}", move_line(mv));
                    }
                }
            },
        );

        let playback = Playback::new(job.clone());
        playback.seek(0).context("Playback lost its move list")?;
        playback.toggle_play();
        let steps = playback
            .run(interval)
            .await
            .context("Playback lost its move list")?;
        job.events().unsubscribe(subscription);
        tracing::info!("Played {} moves", steps + 1);
    }

    Ok(())
}
