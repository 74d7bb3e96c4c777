// src/main.rs
//
// postpolish — build-side helpers for a static blog
//
// Subcommands:
//   build            : copy passthrough assets, then enhance every rendered page in the
//                      output directory (config from --config, ./site.json, or defaults)
//   enhance IN [OUT] : enhance one rendered page; default output overwrites the input
//   date DATE        : run the toDateString filter (--context post-page for the long form)
//   widows TEXT      : run the removeWidows filter
//   filters          : list the registered template filters
//
// Logging goes to stderr; RUST_LOG overrides the default level.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use postpolish::build::{build, enhance_file};
use postpolish::filters::{parse_date, remove_widows, to_date_string, FilterRegistry};
use postpolish::{Profile, SiteConfig};

/// CLI flags
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy passthrough assets and enhance all rendered pages
    Build {
        /// Config file (default: ./site.json if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the config's markup profile
        #[arg(long, value_enum)]
        profile: Option<Profile>,
    },
    /// Enhance a single rendered page
    Enhance {
        /// Markup profile
        #[arg(long, value_enum, default_value = "current")]
        profile: Profile,

        /// Directory that `/`-rooted image URLs resolve against
        #[arg(long)]
        root: Option<PathBuf>,

        /// Input file
        input: PathBuf,

        /// Output file (default: overwrite input)
        output: Option<PathBuf>,
    },
    /// Format a date the way the templates do
    Date {
        /// Rendering context; "post-page" selects the long form
        #[arg(long)]
        context: Option<String>,

        /// Date, e.g. 2020-03-23
        date: String,
    },
    /// Guard the last word of a text against being orphaned
    Widows {
        /// Text to guard
        text: String,
    },
    /// List the registered template filters
    Filters,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={level}", env!("CARGO_PKG_NAME")))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build { config, profile } => {
            let mut config = SiteConfig::discover(config.as_deref())
                .context("failed to load site configuration")?;
            if let Some(profile) = profile {
                config.profile = profile;
            }
            let report = build(&config).context("build failed")?;
            info!(
                "{} files copied, {} pages scanned, {} changed",
                report.files_copied, report.pages_scanned, report.pages_changed
            );
        }
        Command::Enhance {
            profile,
            root,
            input,
            output,
        } => {
            let settings = postpolish::EnhanceSettings::for_profile(profile);
            let root = match root {
                Some(r) => r,
                None => input
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(".")),
            };
            let out_path = output.as_ref().unwrap_or(&input);
            let report = enhance_file(&input, Some(out_path.as_path()), &settings, &root)
                .with_context(|| format!("failed to enhance {}", input.display()))?;
            info!("{}: {:?}", out_path.display(), report);
        }
        Command::Date { context, date } => {
            let parsed = parse_date(&date)?;
            println!("{}", to_date_string(parsed, context.as_deref()));
        }
        Command::Widows { text } => {
            println!("{}", remove_widows(&text));
        }
        Command::Filters => {
            for name in FilterRegistry::default().names() {
                println!("{name}");
            }
        }
    }
    Ok(())
}
