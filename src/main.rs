use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use spotify2csv::export::{DEFAULT_PREVIEW_ROWS, FIELD_SETS};
use spotify2csv::{
    Aggregator, Config, EnrichmentReport, PlaylistSnapshot, Selection, SpotifyClient,
    export_filename, preview, start_server, to_delimited_text,
};

#[derive(Parser)]
#[command(name = "spotify2csv")]
#[command(about = "Export Spotify playlists to CSV, enriched with track details and audio features")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (or set BIND_ADDR env var)
        #[arg(long, env = "BIND_ADDR")]
        bind: Option<String>,
    },

    /// Export a playlist to a CSV file
    Export {
        /// Playlist URL, URI or ID
        playlist: String,

        /// Comma-separated field sets, e.g. basic,audio
        #[arg(long, default_value = "basic")]
        sets: String,

        /// Output file (defaults to "<playlist name>_playlist.csv")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Tracks enriched at a time (or set ENRICH_CONCURRENCY env var)
        #[arg(long, env = "ENRICH_CONCURRENCY")]
        concurrency: Option<usize>,
    },

    /// Show the first rows of a playlist export
    Preview {
        /// Playlist URL, URI or ID
        playlist: String,

        /// Comma-separated field sets, e.g. basic,audio
        #[arg(long, default_value = "basic")]
        sets: String,

        /// Number of rows to show
        #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
        rows: usize,
    },

    /// List the available field sets
    Fields,

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    if let Err(e) = run(cli.command).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Serve { bind } => serve(bind).await,
        Commands::Export {
            playlist,
            sets,
            output,
            concurrency,
        } => export(&playlist, &sets, output, concurrency).await,
        Commands::Preview {
            playlist,
            sets,
            rows,
        } => show_preview(&playlist, &sets, rows).await,
        Commands::Fields => {
            list_fields();
            Ok(())
        }
        Commands::Setup => {
            show_setup_guide();
            Ok(())
        }
    }
}

fn load_config() -> Result<Config> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let missing = config.get_missing_config();
    if !missing.is_empty() {
        println!("{}", "Missing configuration:".red());
        for item in &missing {
            println!("   - {}", item);
        }
        println!(
            "\n{}",
            "Please copy .env.example to .env and fill in your credentials.".yellow()
        );
        std::process::exit(1);
    }

    Ok(config)
}

async fn serve(bind: Option<String>) -> Result<()> {
    println!("{}", "Spotify Playlist Exporter API".cyan().bold());
    println!("{}", "=".repeat(50));

    let mut config = load_config()?;
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }

    start_server(&config).await.context("Server failed")?;
    Ok(())
}

/// Parse `--sets`, refusing a selection with nothing to show.
fn parse_selection(sets: &str) -> Result<Selection> {
    let selection = Selection::parse(sets)?;
    if selection.is_empty() {
        bail!("No field sets selected");
    }
    Ok(selection)
}

/// Fetch and enrich a playlist, reporting progress on the terminal.
async fn fetch_enriched(
    config: &Config,
    playlist: &str,
    concurrency: usize,
) -> Result<(PlaylistSnapshot, EnrichmentReport)> {
    let playlist_id = SpotifyClient::parse_playlist_url(playlist)?;
    let client = SpotifyClient::from_config(config);

    let snapshot = client
        .get_playlist(&playlist_id)
        .await
        .context("Failed to fetch playlist")?;

    println!(
        "Playlist: {} ({} tracks)",
        snapshot.name.green(),
        snapshot.tracks.len()
    );

    let pb = ProgressBar::new(snapshot.tracks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Enriching tracks");

    let report = Aggregator::new(&client, concurrency)
        .with_progress(pb)
        .enrich(&snapshot.tracks)
        .await;

    if !report.failed_tracks.is_empty() {
        println!(
            "{}",
            format!(
                "{} tracks could not be enriched; their detail columns are left blank:",
                report.failed
            )
            .yellow()
        );
        for failed in &report.failed_tracks {
            println!("   - {} by {}: {}", failed.name, failed.artist, failed.reason);
        }
    }

    Ok((snapshot, report))
}

async fn export(
    playlist: &str,
    sets: &str,
    output: Option<PathBuf>,
    concurrency: Option<usize>,
) -> Result<()> {
    println!("{}", "Spotify Playlist Exporter".cyan().bold());
    println!("{}", "=".repeat(50));

    let selection = parse_selection(sets)?;

    let config = load_config()?;
    let concurrency = concurrency.unwrap_or(config.enrich_concurrency);
    let (snapshot, report) = fetch_enriched(&config, playlist, concurrency).await?;

    let Some(text) = to_delimited_text(&snapshot.tracks, &report.records, &selection) else {
        bail!("No field sets selected");
    };

    let path = output.unwrap_or_else(|| PathBuf::from(export_filename(&snapshot.name)));
    std::fs::write(&path, text)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "\n{}",
        format!(
            "Exported {} tracks ({:.1}% enriched) to {}",
            report.total_tracks,
            report.success_rate,
            path.display()
        )
        .green()
    );

    Ok(())
}

async fn show_preview(playlist: &str, sets: &str, rows: usize) -> Result<()> {
    let selection = parse_selection(sets)?;

    let config = load_config()?;
    let (snapshot, report) = fetch_enriched(&config, playlist, config.enrich_concurrency).await?;

    let Some(preview) = preview(&snapshot.tracks, &report.records, &selection, rows) else {
        bail!("No field sets selected");
    };

    let mut builder = Builder::default();
    builder.push_record(preview.headers);
    for row in preview.rows {
        builder.push_record(row);
    }
    let mut table = builder.build();
    table.with(Style::rounded());

    println!("{}", table);
    if snapshot.tracks.len() > rows {
        println!(
            "{}",
            format!("... and {} more tracks", snapshot.tracks.len() - rows).cyan()
        );
    }

    Ok(())
}

fn list_fields() {
    println!("{}", "Available Field Sets".cyan().bold());
    println!("{}", "=".repeat(50));

    for set in FIELD_SETS.iter() {
        let default_marker = if set.default_selected { " (default)" } else { "" };
        println!(
            "\n{}{}  {}",
            set.id.name().green(),
            default_marker.yellow(),
            set.label
        );
        println!("   {}", set.description);
        let columns: Vec<_> = set.fields.iter().map(|field| field.key()).collect();
        println!("   columns: {}", columns.join(", "));
    }
}

fn show_setup_guide() {
    println!("{}", "Spotify Playlist Exporter Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Spotify API Setup".yellow());
    println!("   - Go to https://developer.spotify.com/dashboard/");
    println!("   - Create a new app");
    println!("   - Copy your Client ID and Client Secret");

    println!("\n{}", "2. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     SPOTIFY_CLIENT_ID=your_spotify_client_id");
    println!("     SPOTIFY_CLIENT_SECRET=your_spotify_client_secret");
    println!("   - Optional:");
    println!("     BIND_ADDR=127.0.0.1:3000");
    println!("     ENRICH_CONCURRENCY=5");
    println!("     RETRY_MAX_ATTEMPTS=3");
    println!("     RETRY_BASE_DELAY_MS=1000");

    println!("\n{}", "3. Usage".yellow());
    println!("   - spotify2csv fields                          (to see the field sets)");
    println!("   - spotify2csv preview <playlist-url>          (to check a playlist)");
    println!("   - spotify2csv export <playlist-url> --sets basic,audio");
    println!("   - spotify2csv serve                           (to run the HTTP API)");

    println!("\n{}", "Ready to export!".green());
}
