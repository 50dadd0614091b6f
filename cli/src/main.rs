mod commands;
mod config;
mod server;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use asa24_core::export::ExportFormat;
use asa24_core::report::Page;
use asa24_core::service::Session;

use crate::commands::{Selection, cmd_export, cmd_glossary, cmd_report, cmd_subjects};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "asa24",
    version,
    about = "Summaries, HEI-2015 scores and exports for ASA24 dietary recalls"
)]
struct Cli {
    /// ASA24 export directory (remembered after the first successful load)
    #[arg(short, long, global = true, value_name = "PATH")]
    dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ReportArgs {
    /// Only include this subject (repeatable, default: all subjects)
    #[arg(short, long = "subject", value_name = "USERNAME")]
    subjects: Vec<String>,
    /// One row per recall day instead of per-subject means
    #[arg(long)]
    per_day: bool,
    /// Restrict to one meal occasion, e.g. "Dinner" (nutrients and food-groups only)
    #[arg(long)]
    meal: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl ReportArgs {
    fn split(self) -> (Selection, bool) {
        let selection = Selection {
            subjects: self.subjects,
            per_day: self.per_day,
            meal: self.meal,
        };
        (selection, self.json)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the subjects in the loaded data
    Subjects {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mean daily nutrient intake per subject
    Nutrients(ReportArgs),
    /// Mean daily food pattern equivalents per subject
    FoodGroups(ReportArgs),
    /// Total supplement amounts per subject, supplement and unit
    Supplements(ReportArgs),
    /// Every reported supplement by recall day
    SupplementIntake(ReportArgs),
    /// Energy and nutrients per meal occasion
    Meals(ReportArgs),
    /// How often each subject reports each meal occasion
    MealPattern(ReportArgs),
    /// Every reported food item
    FoodItems(ReportArgs),
    /// Healthy Eating Index 2015 component and total scores
    Hei(ReportArgs),
    /// Write a report to a spreadsheet or CSV file
    Export {
        /// Report page: nutrients, food-groups, supplements, supplement-intake,
        /// meals, meal-pattern, food-items, hei
        page: Page,
        #[command(flatten)]
        args: ReportArgs,
        /// File format: xlsx or csv
        #[arg(short, long, default_value = "xlsx")]
        format: ExportFormat,
        /// Output file or directory (default: suggested file name in the current directory)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Explain the abbreviations and terms used on a report page
    Glossary {
        /// Report page
        page: Page,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the web dashboard
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[tokio::main]
async fn main() {
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::registry().with(stderr_layer).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Load `dir` (or the remembered directory) into a fresh session.
fn open_session(config: &Config, dir: Option<PathBuf>) -> Result<Session> {
    let dir = config.resolve_asa24_dir(dir)?;
    let mut session = Session::new();
    session
        .load(&dir)
        .with_context(|| format!("Failed to load ASA24 data from {}", dir.display()))?;
    config.remember_asa24_dir(&dir)?;
    Ok(session)
}

async fn run(cli: Cli) -> Result<()> {
    let Cli { dir, command } = cli;
    let config = Config::load()?;

    let (page, args) = match command {
        Commands::Subjects { json } => {
            let session = open_session(&config, dir)?;
            return cmd_subjects(&session, json);
        }
        Commands::Nutrients(args) => (Page::Nutrients, args),
        Commands::FoodGroups(args) => (Page::FoodGroups, args),
        Commands::Supplements(args) => (Page::Supplements, args),
        Commands::SupplementIntake(args) => (Page::SupplementIntake, args),
        Commands::Meals(args) => (Page::Meals, args),
        Commands::MealPattern(args) => (Page::MealPattern, args),
        Commands::FoodItems(args) => (Page::FoodItems, args),
        Commands::Hei(args) => (Page::Hei, args),
        Commands::Export {
            page,
            args,
            format,
            output,
        } => {
            let mut session = open_session(&config, dir)?;
            let (selection, json) = args.split();
            return cmd_export(&mut session, page, selection, format, output, json);
        }
        Commands::Glossary { page, json } => return cmd_glossary(page, json),
        Commands::Serve { port, bind } => {
            // An explicit --dir must load; a remembered one may have gone stale.
            let session = match dir {
                Some(dir) => open_session(&config, Some(dir))?,
                None => match open_session(&config, None) {
                    Ok(session) => session,
                    Err(e) => {
                        tracing::warn!("Starting without data: {e:#}");
                        Session::new()
                    }
                },
            };
            return server::start_server(session, Some(config), port, &bind).await;
        }
    };

    let mut session = open_session(&config, dir)?;
    let (selection, json) = args.split();
    cmd_report(&mut session, page, selection, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_report_flags_parse() {
        let cli = Cli::try_parse_from([
            "asa24", "hei", "--dir", "/data", "-s", "u1", "-s", "u2", "--per-day", "--json",
        ])
        .unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("/data")));
        let Commands::Hei(args) = cli.command else {
            panic!("expected hei");
        };
        let (selection, json) = args.split();
        assert_eq!(selection.subjects, vec!["u1", "u2"]);
        assert!(selection.per_day);
        assert!(json);
    }

    #[test]
    fn test_export_parses_page_and_format() {
        let cli = Cli::try_parse_from(["asa24", "export", "meal-pattern", "--format", "csv"])
            .unwrap();
        let Commands::Export { page, format, .. } = cli.command else {
            panic!("expected export");
        };
        assert_eq!(page, Page::MealPattern);
        assert_eq!(format, ExportFormat::Csv);

        assert!(Cli::try_parse_from(["asa24", "export", "recipes"]).is_err());
    }

    #[test]
    fn test_open_session_remembers_dir() {
        let home = tempfile::TempDir::new().unwrap();
        let data = testing::write_fixture();
        let config = Config::at(home.path()).unwrap();

        let session = open_session(&config, Some(data.path().to_path_buf())).unwrap();
        assert_eq!(session.subjects().unwrap(), vec!["u1", "u2"]);

        let again = open_session(&config, None).unwrap();
        assert!(again.is_loaded());
    }
}
