use anyhow::{anyhow, bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use video_sub_renamer::settings::{self, JsonSettingsStore, Overrides, SettingsStore};
use video_sub_renamer::{
    CommitReport, Config, MatchStore, Processor, ScanReport, ScanStatus, ScorerRegistry, Strategy,
};

/// A manual edit requested on the command line
#[derive(Debug)]
enum Edit {
    Pair(String, String),
    Unpair(String, String),
    Swap(String, String),
}

fn matching_args() -> Vec<Arg> {
    vec![
        Arg::new("dir")
            .value_name("DIR")
            .help("Folder to scan (defaults to the last folder used)"),
        Arg::new("strategy")
            .short('s')
            .long("strategy")
            .value_name("ID")
            .help("Matching strategy (see `strategies`); remembered for later runs"),
        Arg::new("threshold")
            .short('t')
            .long("threshold")
            .value_name("SCORE")
            .help("Minimum score a pair must exceed"),
        Arg::new("recursive")
            .short('r')
            .long("recursive")
            .help("Include subdirectories")
            .action(ArgAction::SetTrue),
        Arg::new("extended")
            .long("extended")
            .help("Also recognise .flv, .webm and .vtt files")
            .action(ArgAction::SetTrue),
        Arg::new("skip-prefix")
            .long("skip-prefix")
            .value_name("PREFIX")
            .help("Leave videos starting with PREFIX out of matching"),
        Arg::new("no-markers")
            .long("no-markers")
            .help("Do not rename unmatched videos with the -- prefix")
            .action(ArgAction::SetTrue),
        Arg::new("parallel")
            .long("parallel")
            .help("Score candidate pairs on a worker pool")
            .action(ArgAction::SetTrue),
        Arg::new("json")
            .long("json")
            .help("Print results as JSON")
            .action(ArgAction::SetTrue),
    ]
}

fn cli() -> Command {
    Command::new("Video/Subtitle Renamer")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Pairs subtitle files with videos by filename and renames them to match")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file to use instead of the default locations")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("scan")
                .about("Match subtitles to videos and mark unmatched videos")
                .args(matching_args()),
        )
        .subcommand(
            Command::new("rename")
                .about("Scan, apply manual edits, then rename subtitles after their videos")
                .args(matching_args())
                .arg(
                    Arg::new("pair")
                        .long("pair")
                        .value_name("VIDEO=SUBTITLE")
                        .help("Pair a video with a subtitle")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("unpair")
                        .long("unpair")
                        .value_name("VIDEO=SUBTITLE")
                        .help("Remove a pairing")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("swap")
                        .long("swap")
                        .value_name("VIDEO1,VIDEO2")
                        .help("Exchange the subtitles of two paired videos")
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(Command::new("strategies").about("List available matching strategies"))
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };

    // Initialize logging
    let level = if verbose { "debug" } else { config.output.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(format!("video_sub_renamer={},warn", level))
        .init();

    if verbose {
        info!("Verbose logging enabled");
    }

    match matches.subcommand() {
        Some(("strategies", _)) => {
            list_strategies();
            Ok(())
        }
        Some(("scan", sub)) => run_scan(sub, config),
        Some(("rename", sub)) => run_rename(sub, config),
        _ => Err(anyhow!("No command given")),
    }
}

fn list_strategies() {
    let registry = ScorerRegistry::standard();
    for (id, description) in registry.describe() {
        let marker = if id == Strategy::Default.id() { " (default)" } else { "" };
        println!("{:<12} {}{}", id, description, marker);
    }
}

/// Values passed explicitly for the shared matching flags
fn overrides(sub: &ArgMatches) -> Result<Overrides> {
    let threshold = match sub.get_one::<String>("threshold") {
        Some(value) => Some(
            value
                .parse()
                .with_context(|| format!("Invalid threshold '{}'", value))?,
        ),
        None => None,
    };

    Ok(Overrides {
        strategy: sub.get_one::<String>("strategy").cloned(),
        threshold,
        skip_prefix: sub.get_one::<String>("skip-prefix").cloned(),
        recursive: sub.get_flag("recursive"),
        extended: sub.get_flag("extended"),
        no_markers: sub.get_flag("no-markers"),
        parallel: sub.get_flag("parallel"),
    })
}

/// Merge persisted settings and command-line flags into `config`, remember
/// the folder (and an explicitly chosen strategy), and return both
fn prepare(sub: &ArgMatches, config: Config) -> Result<(Config, PathBuf)> {
    let store = match JsonSettingsStore::open_default() {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("Settings will not be persisted: {}", e);
            None
        }
    };
    let saved = store.as_ref().map(|s| s.load()).unwrap_or_default();
    let overrides = overrides(sub)?;
    let config = settings::resolve(config, &saved, &overrides)?;
    debug!("{}", config.summary());

    let folder = match sub.get_one::<String>("dir") {
        Some(dir) => PathBuf::from(dir),
        None => match saved.last_folder {
            Some(dir) => {
                info!("📁 Using last folder: {}", dir);
                PathBuf::from(dir)
            }
            None => bail!("No folder given and no previous folder saved"),
        },
    };

    if let Some(store) = &store {
        if let Err(e) = settings::remember(store, &folder, &overrides) {
            warn!("Failed to save settings: {}", e);
        }
    }

    Ok((config, folder))
}

fn run_scan(sub: &ArgMatches, config: Config) -> Result<()> {
    let (config, folder) = prepare(sub, config)?;
    let processor = Processor::new(config);

    let report = processor.scan(&folder);
    print_scan(&report, sub.get_flag("json"))?;
    ensure_valid(&report)
}

fn run_rename(sub: &ArgMatches, config: Config) -> Result<()> {
    let edits = collect_edits(sub)?;
    let (config, folder) = prepare(sub, config)?;
    let processor = Processor::new(config);
    let as_json = sub.get_flag("json");

    let mut report = processor.scan(&folder);
    ensure_valid(&report)?;

    for edit in &edits {
        apply_edit(&mut report.store, edit).with_context(|| format!("Failed to apply {:?}", edit))?;
    }

    let commit = processor.commit(&report.store);
    print_commit(&commit, as_json)?;

    let rescanned = processor.scan(&folder);
    print_scan(&rescanned, as_json)?;

    if !commit.is_clean() {
        bail!("{} subtitle(s) could not be renamed", commit.errors.len());
    }
    Ok(())
}

fn ensure_valid(report: &ScanReport) -> Result<()> {
    match &report.status {
        ScanStatus::InvalidDirectory(reason) => Err(anyhow!("Invalid folder: {}", reason)),
        _ => Ok(()),
    }
}

/// Edits in the order they appeared on the command line
fn collect_edits(sub: &ArgMatches) -> Result<Vec<Edit>> {
    let mut edits = Vec::new();

    for id in ["pair", "unpair", "swap"] {
        let (Some(values), Some(indices)) = (sub.get_many::<String>(id), sub.indices_of(id)) else {
            continue;
        };
        for (value, index) in values.zip(indices) {
            edits.push((index, parse_edit(id, value)?));
        }
    }

    edits.sort_by_key(|(index, _)| *index);
    Ok(edits.into_iter().map(|(_, edit)| edit).collect())
}

fn parse_edit(id: &str, value: &str) -> Result<Edit> {
    let separator = if id == "swap" { ',' } else { '=' };
    let (left, right) = value
        .split_once(separator)
        .map(|(l, r)| (l.trim().to_string(), r.trim().to_string()))
        .filter(|(l, r)| !l.is_empty() && !r.is_empty())
        .ok_or_else(|| anyhow!("Invalid --{} value '{}'", id, value))?;

    Ok(match id {
        "pair" => Edit::Pair(left, right),
        "unpair" => Edit::Unpair(left, right),
        _ => Edit::Swap(left, right),
    })
}

fn apply_edit(store: &mut MatchStore, edit: &Edit) -> Result<()> {
    match edit {
        Edit::Pair(video, subtitle) => store.create(video, subtitle)?,
        Edit::Unpair(video, subtitle) => {
            if !store.remove(video, subtitle) {
                warn!("No pairing {} -> {} to remove", video, subtitle);
            }
        }
        Edit::Swap(first, second) => {
            let first_subtitle = paired_subtitle(store, first)?;
            let second_subtitle = paired_subtitle(store, second)?;
            store.swap(first, &first_subtitle, second, &second_subtitle)?;
        }
    }
    Ok(())
}

fn paired_subtitle(store: &MatchStore, video: &str) -> Result<String> {
    store
        .resolve_primary(video)
        .and_then(|name| store.match_for_primary(&name).map(|m| m.auxiliary.clone()))
        .ok_or_else(|| anyhow!("'{}' has no subtitle to swap", video))
}

fn print_scan(report: &ScanReport, as_json: bool) -> Result<()> {
    let store = &report.store;

    if as_json {
        let output = json!({
            "status": report.status,
            "folder": store.folder(),
            "matches": store.matches(),
            "unmatched_videos": store.unmatched_primaries(),
            "unmatched_subtitles": store.unmatched_auxiliaries(),
            "skipped": store.ignored(),
            "marker_errors": store.marker_errors(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", report.status);
    for m in store.matches() {
        println!("  {}  <-  {}", m.primary, m.auxiliary);
    }
    print_list("Unmatched videos", &store.unmatched_primaries());
    print_list("Unmatched subtitles", &store.unmatched_auxiliaries());
    print_list("Skipped videos", &store.ignored().iter().map(String::as_str).collect::<Vec<_>>());
    print_list("Marker errors", &store.marker_errors().iter().map(String::as_str).collect::<Vec<_>>());
    Ok(())
}

fn print_commit(report: &CommitReport, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "Renamed {} subtitle(s), {} already named",
        report.renamed, report.skipped
    );
    print_list("Errors", &report.errors.iter().map(String::as_str).collect::<Vec<_>>());
    Ok(())
}

fn print_list(title: &str, items: &[&str]) {
    if items.is_empty() {
        return;
    }
    println!("{}:", title);
    for item in items {
        println!("  {}", item);
    }
}
