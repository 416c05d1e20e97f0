//! Command line front-end: load an itinerary, apply a filter and print the
//! map, timeline or list projection. Also manages per-location notes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use log::error;
use trip_itinerary::{
    DirectionsProvider, Filter, ItineraryEngine, ListEntry, MapLayers, NotesEntry, NotesStore,
    OfflineDirections, OsrmClient, RenderPass, Result, RouteResolver, SqliteBackend, Timeline,
    ViewerConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Trip itinerary map, timeline and notes", long_about = None)]
struct Cli {
    /// Viewer settings JSON (palette, keyword tables, directions server)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// SQLite file holding location notes
    #[arg(long, global = true, default_value = "itinerary-notes.db", value_hint = ValueHint::FilePath)]
    notes_db: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print markers and drive routes as a GeoJSON FeatureCollection
    Map {
        #[command(flatten)]
        view: ViewArgs,

        /// Skip directions lookups and draw every drive as a straight line
        #[arg(long, action = ArgAction::SetTrue)]
        offline: bool,
    },
    /// Print the itinerary grouped by day
    Timeline {
        #[command(flatten)]
        view: ViewArgs,

        /// Emit JSON instead of text
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Print one JSON entry per row
    List {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Print the dates and regions available for filtering
    Dates {
        /// Itinerary CSV
        #[arg(value_hint = ValueHint::FilePath)]
        csv: PathBuf,
    },
    /// Show or edit location notes
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Itinerary CSV
    #[arg(value_hint = ValueHint::FilePath)]
    csv: PathBuf,

    /// Case-insensitive text matched against location, activity and notes
    #[arg(long)]
    text: Option<String>,

    /// Region name
    #[arg(long)]
    region: Option<String>,

    /// Exact date
    #[arg(long)]
    date: Option<String>,
}

impl ViewArgs {
    fn filter(&self) -> Filter {
        let mut filter = Filter::default();
        if let Some(text) = &self.text {
            filter = filter.with_text(text);
        }
        if let Some(region) = &self.region {
            filter = filter.with_region(region);
        }
        if let Some(date) = &self.date {
            filter = filter.with_date(date);
        }
        filter
    }
}

#[derive(Subcommand, Debug)]
enum NotesAction {
    /// Print notes for one location, or all of them
    Show { location: Option<String> },
    /// Replace the note text for a location
    Set { location: String, text: String },
    /// Append a link to a location
    AddLink {
        location: String,
        url: String,

        /// Link title (defaults to the URL)
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Remove a link by its position (0-based)
    RemoveLink { location: String, index: usize },
    /// Delete everything saved for a location
    Clear { location: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ViewerConfig::from_json_file(path)?,
        None => ViewerConfig::default(),
    };

    match cli.command {
        Command::Map { view, offline } => {
            let mut engine = load(config, &view)?;
            let pass = engine.begin_pass(&view.filter());
            if offline {
                resolve_routes(&mut engine, &pass, OfflineDirections).await?;
            } else {
                let client = OsrmClient::new(&engine.config().directions)?;
                resolve_routes(&mut engine, &pass, client).await?;
            }
            print_json(&MapLayers::from_engine(&engine).to_geojson())
        }
        Command::Timeline { view, json } => {
            let mut engine = load(config, &view)?;
            engine.begin_pass(&view.filter());
            let timeline = Timeline::from_engine(&engine);
            if json {
                print_json(&timeline)
            } else {
                print!("{}", timeline.to_text());
                Ok(())
            }
        }
        Command::List { view } => {
            let mut engine = load(config, &view)?;
            engine.begin_pass(&view.filter());
            let store = NotesStore::open(SqliteBackend::open(&cli.notes_db)?);
            let entries = ListEntry::from_engine(&engine, |location| store.has_notes(location));
            print_json(&entries)
        }
        Command::Dates { csv } => {
            let mut engine = ItineraryEngine::new(config)?;
            engine.load_csv(&csv)?;
            let options = serde_json::json!({
                "dates": engine.itinerary().dates(),
                "regions": engine.regions().regions_present(engine.itinerary().rows()),
            });
            print_json(&options)
        }
        Command::Notes { action } => {
            let store = NotesStore::open(SqliteBackend::open(&cli.notes_db)?);
            run_notes(store, action)
        }
    }
}

fn load(config: ViewerConfig, view: &ViewArgs) -> Result<ItineraryEngine> {
    let mut engine = ItineraryEngine::new(config)?;
    engine.load_csv(&view.csv)?;
    Ok(engine)
}

/// Resolve every drive of `pass` and install the paths.
async fn resolve_routes<P: DirectionsProvider>(
    engine: &mut ItineraryEngine,
    pass: &RenderPass,
    provider: P,
) -> Result<()> {
    let resolver = RouteResolver::new(provider);
    let resolved = resolver
        .resolve_all(&pass.segments, engine.itinerary(), &pass.token)
        .await;
    engine.commit(resolved)
}

fn run_notes(mut store: NotesStore<SqliteBackend>, action: NotesAction) -> Result<()> {
    match action {
        NotesAction::Show { location: Some(location) } => {
            let entry = store.note(&location).cloned().unwrap_or_default();
            print_json(&entry)
        }
        NotesAction::Show { location: None } => {
            let all: BTreeMap<&str, &NotesEntry> = store
                .locations()
                .filter_map(|loc| store.note(loc).map(|entry| (loc, entry)))
                .collect();
            print_json(&all)
        }
        NotesAction::Set { location, text } => store.set_note(&location, &text),
        NotesAction::AddLink {
            location,
            url,
            title,
        } => store.add_link(&location, &title, &url),
        NotesAction::RemoveLink { location, index } => {
            match store.remove_link(&location, index)? {
                Some(link) => println!("Removed {}", link.url),
                None => println!("No link at position {} for {}", index, location),
            }
            Ok(())
        }
        NotesAction::Clear { location } => {
            if !store.clear_location(&location)? {
                println!("No notes for {}", location);
            }
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
