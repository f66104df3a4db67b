//! Operator CLI: the same adapt -> store -> evaluate sequence the pipeline
//! coordinator runs, driveable by hand against a local snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use civicwatch_adapters::{
    CivicClerkAdapter, FloridaNoticeAdapter, SourceAdapter, SrwmdPermitAdapter,
};
use civicwatch_common::{CivicEvent, Config, EventType};
use civicwatch_rules::RulesEngine;
use civicwatch_store::{EventFilter, EventStore};

#[derive(Parser)]
#[command(
    name = "civicwatch",
    about = "Civic event intelligence over scraped government sources"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Adapt a JSON file of raw scraped records, store them, evaluate rules
    Ingest {
        /// One of: civicclerk, srwmd-applications, srwmd-issuances, florida-notices
        source: String,
        /// JSON file containing an array of raw records
        file: PathBuf,
        /// CivicClerk portal site slug
        #[arg(long, default_value = "alachua")]
        site: String,
    },
    /// List stored events, newest event time first
    List {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        event_type: Option<String>,
        /// Require ALL of these tags
        #[arg(long)]
        tag: Vec<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Events discovered in the last N hours
    WhatsNew {
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
    /// Events with an event time in the next N days
    Upcoming {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Distinct source ids in the store
    Sources,
    /// Distinct tags in the store
    Tags,
    /// Load the rule file and print the resulting rule set
    CheckRules,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let store = EventStore::open(config.store_path())?;

    match cli.command {
        Command::Ingest { source, file, site } => ingest(&config, &store, &source, &file, &site),
        Command::List {
            source,
            event_type,
            tag,
            limit,
        } => {
            let mut filter = EventFilter::default().limit(limit);
            if let Some(source) = source {
                filter = filter.source(source);
            }
            if let Some(raw) = event_type {
                let Some(parsed) = EventType::parse(&raw) else {
                    bail!("unknown event type '{raw}'");
                };
                filter = filter.event_type(parsed);
            }
            for tag in tag {
                filter = filter.tag(tag);
            }
            print_events(&store.get_events(&filter));
            Ok(())
        }
        Command::WhatsNew { hours } => {
            print_events(&store.get_whats_new(hours, None, None));
            Ok(())
        }
        Command::Upcoming { days } => {
            print_events(&store.get_upcoming(days, None));
            Ok(())
        }
        Command::Sources => {
            for source in store.get_sources() {
                println!("{source}");
            }
            Ok(())
        }
        Command::Tags => {
            for tag in store.get_all_tags() {
                println!("{tag}");
            }
            Ok(())
        }
        Command::CheckRules => {
            let engine = RulesEngine::from_path(&config.rules_path);
            for rule in engine.rules() {
                println!(
                    "{:<32} {:<8} enabled={} {}",
                    rule.name,
                    rule.severity.to_string(),
                    rule.enabled,
                    rule.description
                );
            }
            Ok(())
        }
    }
}

fn ingest(
    config: &Config,
    store: &EventStore,
    source: &str,
    file: &Path,
    site: &str,
) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("reading raw records from {}", file.display()))?;
    let values: Vec<serde_json::Value> =
        serde_json::from_str(&text).context("raw record file must be a JSON array")?;

    let events: Vec<CivicEvent> = match source {
        "civicclerk" => CivicClerkAdapter::new(site).adapt_values(&values),
        "srwmd-applications" => SrwmdPermitAdapter::applications().adapt_values(&values),
        "srwmd-issuances" => SrwmdPermitAdapter::issuances().adapt_values(&values),
        "florida-notices" | "florida-public-notices" => {
            FloridaNoticeAdapter::new().adapt_values(&values)
        }
        other => bail!("unknown source '{other}'"),
    };
    info!(
        source,
        raw = values.len(),
        adapted = events.len(),
        "Adapted raw records"
    );

    let counts = store.save_events(events.clone());
    println!(
        "{} adapted: {} new, {} updated, {} unchanged, {} failed",
        events.len(),
        counts.new,
        counts.updated,
        counts.unchanged,
        counts.failed
    );

    let engine = RulesEngine::from_path(&config.rules_path);
    let alerts = engine.evaluate_batch(&events);
    for alert in &alerts {
        println!("[{}] {}: {}", alert.severity, alert.rule_name, alert.message);
    }
    if alerts.is_empty() {
        println!("no rules matched");
    }
    Ok(())
}

fn print_events(events: &[CivicEvent]) {
    for event in events {
        println!(
            "{}  {:<20} {:<24} {}",
            event.timestamp.format("%Y-%m-%d %H:%M"),
            event.event_type.to_string(),
            event.source_id,
            event.title
        );
    }
    if events.is_empty() {
        println!("no events");
    }
}
