//! `flightlog` - CLI for the personal flight log
//!
//! This binary provides the command-line interface for logging flights,
//! reviewing statistics and achievements, rendering itinerary cards and
//! checking fares.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;

use flightlog::cli::{
    AchievementsCommand, AddCommand, CardCommand, Cli, Command, ConfigCommand, ImportCommand,
    ListCommand, OutputFormat, PriceCommand, StatsCommand,
};
use flightlog::store::{PriceAlertStore, StoreSummary};
use flightlog::{
    init_logging, CardRenderer, Config, ExportBundle, FlightLog, FlightRecord, FlightStatistics,
    HttpFareSource, ImportSummary, NewFlight, PriceAlert, PriceMonitor, RecordQuery,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let verbosity = cli.verbosity();

    // `config validate` reports problems instead of failing on them
    let command = match cli.command {
        Command::Config(config_cmd) => {
            init_logging(verbosity, None);
            return handle_config(cli.config, &config_cmd);
        }
        other => other,
    };

    let config = Config::load_from(cli.config).context("loading configuration")?;
    init_logging(verbosity, config.logging.file.as_deref());

    let mut log = FlightLog::open(&config).context("opening flight log")?;

    match command {
        Command::Add(cmd) => handle_add(&mut log, &config, &cmd),
        Command::List(cmd) => handle_list(&log, &cmd),
        Command::Stats(cmd) => handle_stats(&log, &cmd),
        Command::Achievements(cmd) => handle_achievements(&log, &cmd),
        Command::Card(cmd) => handle_card(&log, &config, &cmd),
        Command::Import(cmd) => handle_import(&mut log, &cmd),
        Command::Export(cmd) => handle_export(&log, cmd.output.as_deref()),
        Command::Price(cmd) => handle_price(&mut log, &config, &cmd),
        Command::Status(cmd) => handle_status(&log, &config, cmd.json),
        Command::Config(_) => Ok(()),
    }
}

fn handle_add(log: &mut FlightLog, config: &Config, cmd: &AddCommand) -> anyhow::Result<()> {
    let outcome = log.add_flight(cmd.to_new_flight())?;

    if cmd.json {
        let value = serde_json::json!({
            "record": outcome.record,
            "duplicate": outcome.duplicate,
            "unlocked": outcome.unlocked,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if outcome.duplicate {
        println!(
            "{} on {} is already logged.",
            outcome.record.flight_number,
            outcome.record.departure.format("%Y-%m-%d %H:%M")
        );
    } else {
        println!("Logged {}", describe(&outcome.record));
        for achievement in &outcome.unlocked {
            println!(
                "  {} Achievement unlocked: {} - {}",
                achievement.icon(),
                achievement.name,
                achievement.description
            );
        }
    }

    if cmd.card && !outcome.duplicate {
        let path = CardRenderer::new(config.card_output_dir()).render(&outcome.record)?;
        if !cmd.json {
            println!("Card: {}", path.display());
        }
    }
    Ok(())
}

fn describe(record: &FlightRecord) -> String {
    let block = record.duration();
    format!(
        "{} {} {} ({}, {}, {} km, {}h{:02}m)",
        record.departure.format("%Y-%m-%d %H:%M"),
        record.flight_number,
        record.route(),
        record.carrier,
        record.cabin,
        record.distance_km,
        block.num_hours(),
        block.num_minutes() % 60
    )
}

fn handle_list(log: &FlightLog, cmd: &ListCommand) -> anyhow::Result<()> {
    let records = log.records(&cmd.to_query())?;

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Plain => {
            for record in &records {
                println!("{}", describe(record));
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No flights logged.");
                return Ok(());
            }
            println!(
                "{:<16}  {:<8}  {:<13}  {:<20}  {:<14}  {:>8}",
                "Departure", "Flight", "Route", "Airline", "Cabin", "km"
            );
            println!("{}", "-".repeat(88));
            for r in &records {
                println!(
                    "{:<16}  {:<8}  {:<13}  {:<20}  {:<14}  {:>8}",
                    r.departure.format("%Y-%m-%d %H:%M"),
                    r.flight_number,
                    r.route(),
                    truncate(&r.carrier, 20),
                    r.cabin.to_string(),
                    r.distance_km
                );
            }
            println!();
            println!("{} flight(s)", records.len());
        }
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

fn handle_stats(log: &FlightLog, cmd: &StatsCommand) -> anyhow::Result<()> {
    let stats = log.statistics(cmd.year, cmd.month)?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}

fn print_stats(stats: &FlightStatistics) {
    println!("Flight statistics ({})", stats.period);
    println!("==========================");
    println!("Flights:         {}", stats.total_flights);
    println!("Distance:        {} km", stats.total_distance_km);
    println!("Average:         {:.0} km", stats.average_distance_km);
    println!("International:   {}", stats.international_flights);
    println!("Domestic:        {}", stats.domestic_flights);
    println!("Tier:            {}", stats.tier);
    if let Some(top) = &stats.top_carrier {
        println!("Top airline:     {top}");
    }
    if let (Some(longest), Some(shortest)) = (&stats.longest_flight, &stats.shortest_flight) {
        println!("Longest flight:  {longest}");
        println!("Shortest flight: {shortest}");
    }

    if !stats.per_carrier.is_empty() {
        println!();
        println!("[Airlines]");
        for (carrier, count) in &stats.per_carrier {
            println!("  {carrier:<24} {count}");
        }
        println!();
        println!("[Cabins]");
        for (cabin, count) in &stats.per_cabin {
            println!("  {:<24} {count}", cabin.to_string());
        }
    }
}

fn handle_achievements(log: &FlightLog, cmd: &AchievementsCommand) -> anyhow::Result<()> {
    if cmd.all {
        let progress = log.achievement_progress()?;
        if cmd.json {
            println!("{}", serde_json::to_string_pretty(&progress)?);
            return Ok(());
        }
        for p in &progress {
            let mark = if p.unlocked { "✓" } else { " " };
            println!("[{mark}] {:<24} {}/{}", p.name, p.current.min(p.target), p.target);
        }
        return Ok(());
    }

    let achievements = log.achievements()?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&achievements)?);
    } else if achievements.is_empty() {
        println!("No achievements unlocked yet.");
    } else {
        for a in &achievements {
            println!(
                "{} {} - {} ({})",
                a.icon(),
                a.name,
                a.description,
                a.unlocked_at.format("%Y-%m-%d")
            );
        }
    }
    Ok(())
}

fn handle_card(log: &FlightLog, config: &Config, cmd: &CardCommand) -> anyhow::Result<()> {
    let records = match &cmd.flight {
        Some(flight) => {
            let wanted = flight.to_ascii_uppercase();
            let matching: Vec<FlightRecord> = log
                .records(&RecordQuery::default())?
                .into_iter()
                .filter(|r| r.flight_number == wanted)
                .collect();
            if matching.is_empty() {
                bail!("no logged flight {wanted}");
            }
            matching
        }
        None => log.records(&RecordQuery {
            limit: Some(cmd.latest),
            ..RecordQuery::default()
        })?,
    };

    if records.is_empty() {
        println!("No flights logged.");
        return Ok(());
    }

    let output_dir = cmd
        .output_dir
        .clone()
        .unwrap_or_else(|| config.card_output_dir());
    let renderer = CardRenderer::new(output_dir);
    for record in &records {
        let path = renderer.render(record)?;
        println!("{}", path.display());
    }
    Ok(())
}

/// Flights to import: a plain array, or a bundle written by `export`.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Flights(Vec<NewFlight>),
    Bundle(Box<ExportBundle>),
}

fn handle_import(log: &mut FlightLog, cmd: &ImportCommand) -> anyhow::Result<()> {
    let contents = fs::read_to_string(&cmd.file)
        .with_context(|| format!("reading {}", cmd.file.display()))?;
    let input: ImportFile = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", cmd.file.display()))?;

    let summary = match input {
        ImportFile::Flights(flights) => log.import(flights)?,
        ImportFile::Bundle(bundle) => log.restore(*bundle)?,
    };
    print_import(&summary);
    Ok(())
}

fn print_import(summary: &ImportSummary) {
    println!(
        "Imported {} flight(s), {} duplicate(s), {} rejected.",
        summary.added,
        summary.duplicates,
        summary.rejected.len()
    );
    for rejection in &summary.rejected {
        println!(
            "  #{} {}: {}",
            rejection.index, rejection.flight_number, rejection.reason
        );
    }
    for achievement in &summary.unlocked {
        println!(
            "  {} Achievement unlocked: {}",
            achievement.icon(),
            achievement.name
        );
    }
}

fn handle_export(log: &FlightLog, output: Option<&Path>) -> anyhow::Result<()> {
    let bundle = log.export()?;
    let json = serde_json::to_string_pretty(&bundle)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            println!(
                "Exported {} flight(s) and {} achievement(s) to {}",
                bundle.summary.total_records,
                bundle.summary.total_achievements,
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn handle_price(log: &mut FlightLog, config: &Config, cmd: &PriceCommand) -> anyhow::Result<()> {
    match cmd {
        PriceCommand::Check {
            threshold, json, ..
        } => {
            let query = cmd.fare_query().context("missing route")?;
            let monitor = PriceMonitor::new(HttpFareSource::from_config(&config.price)?);
            let alert = monitor.check(log.backend_mut(), &query, *threshold)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&alert)?);
            } else {
                print_alert(&alert);
            }
        }
        PriceCommand::List { json } => {
            let alerts = log.backend().alerts()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&alerts)?);
            } else if alerts.is_empty() {
                println!("No routes tracked.");
            } else {
                let interval = config.check_interval();
                let now = Utc::now();
                for alert in &alerts {
                    print_alert(alert);
                    if alert.is_due(interval, now) {
                        println!("    due for another check");
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_alert(alert: &PriceAlert) {
    let change = match (alert.previous_price, alert.drop_amount()) {
        (_, Some(amount)) if alert.price_drop => format!("dropped {amount:.2}"),
        (Some(previous), _) => format!("was {previous:.2}"),
        (None, _) => "first check".to_string(),
    };
    println!(
        "{} {} > {} on {}: {:.2} ({change}) checked {}",
        if alert.price_drop { "↓" } else { " " },
        alert.origin,
        alert.destination,
        alert.travel_date,
        alert.current_price,
        alert.checked_at.format("%Y-%m-%d %H:%M")
    );
}

fn handle_status(log: &FlightLog, config: &Config, json: bool) -> anyhow::Result<()> {
    let summary = StoreSummary::collect(log.backend())?;
    let fare_api = config.price.api_url.is_some() && config.price.api_key.is_some();
    let interval = config.check_interval();
    let now = Utc::now();
    let due = log
        .backend()
        .alerts()?
        .iter()
        .filter(|alert| alert.is_due(interval, now))
        .count();

    if json {
        let status = serde_json::json!({
            "storage": summary,
            "cards_dir": config.card_output_dir(),
            "fare_api_configured": fare_api,
            "check_interval_hours": config.price.check_interval_hours,
            "routes_due": due,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("flightlog status");
        println!("----------------");
        println!("Backend:       {}", summary.backend);
        println!("Location:      {}", summary.location);
        println!("Flights:       {}", summary.flights);
        println!("Achievements:  {}", summary.achievements);
        println!("Price alerts:  {} ({due} due)", summary.price_alerts);
        println!("Cards:         {}", config.card_output_dir().display());
        println!(
            "Fare API:      {}",
            if fare_api { "configured" } else { "not configured" }
        );
    }
    Ok(())
}

fn handle_config(
    config_path: Option<std::path::PathBuf>,
    cmd: &ConfigCommand,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("loading configuration")?;
            let shown = config.redacted();
            if *json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print_config(&shown);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .clone()
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_config(config: &Config) {
    let or_unset = |value: &Option<String>| value.clone().unwrap_or_else(|| "(unset)".to_string());

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Storage]");
    println!("  Backend:            {}", config.storage.backend);
    println!("  Data directory:     {}", config.storage.data_dir.display());
    println!();
    println!("[Achievements]");
    println!(
        "  Domestic pattern:   {}",
        config.achievements.domestic_code_pattern
    );
    println!(
        "  Frequent flyer:     {} flights/year",
        config.achievements.frequent_flyer_flights
    );
    println!(
        "  Long distance:      {} km",
        config.achievements.long_distance_km
    );
    println!();
    println!("[Price]");
    println!("  API URL:            {}", or_unset(&config.price.api_url));
    println!("  API key:            {}", or_unset(&config.price.api_key));
    println!("  Cookie:             {}", or_unset(&config.price.cookie));
    println!("  Timeout:            {}s", config.price.timeout_secs);
    println!(
        "  Check interval:     {}h",
        config.price.check_interval_hours
    );
    println!();
    println!("[Cards]");
    println!("  Output directory:   {}", config.card_output_dir().display());
    if let Some(file) = &config.logging.file {
        println!();
        println!("[Logging]");
        println!("  File:               {}", file.display());
    }
}
