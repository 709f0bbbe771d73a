//! Chronomap CLI
//!
//! Command-line entry point: fetches historical events for a city over a
//! year range and renders them as map markers plus a chronological listing.
//!
//! # Usage
//!
//! ```bash
//! # Events for a city over an era preset
//! chronomap events --city "Санкт-Петербург" --era imperial
//!
//! # Explicit year range, raw JSON output
//! chronomap events --city "Москва" --start 1700 --end 1900 --json
//!
//! # No network: built-in sample catalogue
//! chronomap events --city "Санкт-Петербург" --offline
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level (default: info)
//! - `CHRONOMAP_CONFIG`: Config file path (default: chronomap.toml)
//! - `CHRONOMAP_PROFILE_PATH`: Profile location override

use std::env;

use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use chronomap::api::MapView;
use chronomap::config::AppConfig;
use chronomap::models::event::DESCRIPTION_PLACEHOLDER;
use chronomap::models::time::{current_year, Era, TimeRange, MIN_QUERY_YEAR};
use chronomap::services::{EventPipeline, PipelineOutcome};
use chronomap::session::{AppState, DeepLink, UserProfile};
use chronomap::sources::{CityResolver, WikidataClient};

#[derive(Parser)]
#[command(
    name = "chronomap",
    version,
    about = "Historical city events from Wikidata and Wikipedia"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and display events for a city
    Events(EventsArgs),
    /// Resolve a city name to its knowledge-base identifier
    City {
        /// City name in Russian, e.g. "Санкт-Петербург"
        name: String,
    },
    /// List the era presets
    Eras,
    /// Show or update the stored profile
    Profile(ProfileArgs),
}

#[derive(Args)]
struct EventsArgs {
    /// City name; defaults to the stored profile's city
    #[arg(long)]
    city: Option<String>,
    /// Era preset (see `chronomap eras`)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    era: Option<Era>,
    /// First year of an explicit range
    #[arg(long, requires = "end")]
    start: Option<i32>,
    /// Last year of an explicit range
    #[arg(long, requires = "start")]
    end: Option<i32>,
    /// Cap the number of events shown
    #[arg(long)]
    limit: Option<usize>,
    /// Serve the built-in sample catalogue, no network
    #[arg(long)]
    offline: bool,
    /// Skip supplemental info lookups
    #[arg(long)]
    no_enrich: bool,
    /// Render a shared deep link (query string) instead of fetching
    #[arg(long, conflicts_with = "offline")]
    link: Option<String>,
    /// Print the raw outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ProfileArgs {
    #[command(subcommand)]
    action: ProfileAction,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the stored profile
    Show,
    /// Create or replace the stored profile
    Set {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        city: String,
        /// Era preset stored as the default time period
        #[arg(long)]
        era: Option<Era>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Command::Events(args) => run_events(&config, args).await,
        Command::City { name } => run_city(&config, &name).await,
        Command::Eras => {
            print_eras();
            Ok(())
        }
        Command::Profile(args) => run_profile(&config, args),
    }
}

async fn run_events(config: &AppConfig, args: EventsArgs) -> anyhow::Result<()> {
    if let Some(query) = &args.link {
        return render_deep_link(query);
    }

    let profile = UserProfile::load(&config.profile_path).ok();
    let city = match args.city.clone().or_else(|| {
        profile.as_ref().map(|p| p.city.clone())
    }) {
        Some(city) => city,
        None => anyhow::bail!(
            "no city given; pass --city or store one with `chronomap profile set`"
        ),
    };
    let range = resolve_range(&args, profile.as_ref())?;
    info!(city, %range, "Fetching events");

    let pipeline = if args.offline {
        EventPipeline::offline_demo()
    } else {
        let pipeline = EventPipeline::from_config(config)?;
        if args.no_enrich {
            pipeline.without_enricher()
        } else {
            pipeline
        }
    };

    let mut outcome = pipeline.run(&city, range).await?;
    if let Some(limit) = args.limit {
        outcome.events.truncate(limit);
    }
    print_outcome(&outcome, &pipeline.tracker().summary(), args.json)
}

/// Year range priority: explicit years, then era preset, then the
/// profile's preset, then the default window.
fn resolve_range(args: &EventsArgs, profile: Option<&UserProfile>) -> anyhow::Result<TimeRange> {
    if let (Some(start), Some(end)) = (args.start, args.end) {
        return TimeRange::bounded(start, end, MIN_QUERY_YEAR, current_year())
            .map_err(|e| anyhow::anyhow!(e));
    }
    if let Some(era) = args.era {
        return Ok(era.range());
    }
    Ok(profile.map(UserProfile::range).unwrap_or_default())
}

fn render_deep_link(query: &str) -> anyhow::Result<()> {
    let link = DeepLink::parse(query)
        .ok_or_else(|| anyhow::anyhow!("deep link has no event parameter"))?;
    let mut state = AppState::new();
    state.set_deep_link(link);

    if let Some(event) = state.take_deep_link_event() {
        println!("{}  {}", event.date, event.title);
        if let Some(point) = event.coordinates {
            println!("    {:.4}, {:.4}", point.latitude, point.longitude);
        }
    }
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome, summary: &str, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    let view = MapView::from_events(outcome.city.name.as_str(), outcome.range, &outcome.events);
    println!(
        "{} ({}): {} событий, {} меток на карте",
        view.city,
        view.range,
        view.listing.len(),
        view.markers.len()
    );
    println!(
        "Источники: wikidata {}, wikipedia {}",
        outcome.counts.wikidata, outcome.counts.wikipedia
    );
    println!();

    for entry in &view.listing {
        println!("{:>12}  {} [{}]", entry.date, entry.title, entry.origin);
        if entry.description != DESCRIPTION_PLACEHOLDER {
            println!("              {}", entry.description);
        }
        if let Some(url) = &entry.source_url {
            println!("              {}", url);
        }
    }

    println!();
    println!("{summary}");
    Ok(())
}

async fn run_city(config: &AppConfig, name: &str) -> anyhow::Result<()> {
    let client = WikidataClient::new(config.wikidata.clone())?;
    let city = client.resolve(name).await?;

    println!("{}  {}", city.name, city.id);
    println!("URI: {}", city.id.entity_uri());
    if let Some(point) = city.coordinates {
        println!("Координаты: {:.4}, {:.4}", point.latitude, point.longitude);
    }
    Ok(())
}

fn print_eras() {
    println!("{:<20} {:<26} {}", "Preset", "Период", "Годы");
    for era in Era::ALL {
        let range = era.range();
        println!("{:<20} {:<26} {}", era.name(), era.title(), range);
    }
}

fn run_profile(config: &AppConfig, args: ProfileArgs) -> anyhow::Result<()> {
    match args.action {
        ProfileAction::Show => {
            let profile =
                UserProfile::load(&config.profile_path).map_err(|e| anyhow::anyhow!(e))?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
        ProfileAction::Set {
            first_name,
            last_name,
            email,
            city,
            era,
        } => {
            let profile = UserProfile {
                first_name,
                last_name,
                email,
                city,
                time_period: era.map(|e| e.name().to_string()),
            };
            profile
                .save(&config.profile_path)
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("Профиль сохранён: {}", config.profile_path.display());
            Ok(())
        }
    }
}
