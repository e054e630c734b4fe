use clap::Parser;
use libsyn_media::{
    EmbedFormatter, EmbedSettings, LibsynMediaSource, MetadataAttribute, PodcastError, Settings,
};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

/// Inspect a Libsyn episode page the way a media host would see it.
///
/// # Examples
///
/// ```sh
/// # All attributes
/// libsyn-probe https://myshow.libsyn.com/episode-12
///
/// # Only the episode id, as JSON
/// libsyn-probe https://myshow.libsyn.com/episode-12 -a episode_id --json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Episode page URL
    url: String,

    /// Attribute to resolve (repeatable); defaults to all of them
    #[arg(short, long = "attribute")]
    attributes: Vec<MetadataAttribute>,

    /// Optional path to a JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for downloaded thumbnails (overrides the settings file)
    #[arg(short, long)]
    thumbnail_dir: Option<PathBuf>,

    /// Request timeout in seconds (overrides the settings file)
    #[arg(long)]
    timeout: Option<u64>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Also print the player render data with default display settings
    #[arg(long)]
    render: bool,
}

fn run(cli: Cli) -> Result<(), PodcastError> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(dir) = cli.thumbnail_dir {
        settings.thumbnail_destination = dir;
    }
    if let Some(timeout) = cli.timeout {
        settings.request_timeout_secs = timeout;
    }

    let source = LibsynMediaSource::from_settings(&settings)?;
    let record = HashMap::from([(settings.source_field.clone(), cli.url.clone())]);

    let attributes = if cli.attributes.is_empty() {
        MetadataAttribute::ALL.to_vec()
    } else {
        cli.attributes
    };

    info!(url = %cli.url, count = attributes.len(), "Resolving attributes");

    let mut values = BTreeMap::new();
    for attribute in attributes {
        values.insert(attribute, source.get_metadata(&record, attribute)?);
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&values)?;
        println!("{}", json);
    } else {
        for (attribute, value) in &values {
            match value {
                Some(value) => println!("{}: {}", attribute, value),
                None => println!("{}: (not available)", attribute),
            }
        }
    }

    if cli.render {
        let formatter = EmbedFormatter::new(EmbedSettings::default())?;
        let elements = formatter.view_elements(&source, &record, 1);
        if elements.is_empty() {
            println!("\nNo player can be rendered for this page.");
        } else {
            let json = serde_json::to_string_pretty(&elements)?;
            println!("\n{}", json);
        }
    }

    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
