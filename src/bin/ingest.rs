use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};

use sportkava::identity::AliasIndex;
use sportkava::runner::{run_adapter, RunContext, RunSummary};
use sportkava::sources::basket_ee::{BasketEeAdapter, BasketEeConfig};
use sportkava::sources::estlatbl_live::{EstlatblLiveAdapter, EstlatblLiveConfig};
use sportkava::sources::estlatbl_schedule::{EstlatblScheduleAdapter, EstlatblScheduleConfig};
use sportkava::sources::football::{FootballAdapter, FootballConfig};
use sportkava::sources::hockey::{HockeyAdapter, HockeyConfig};
use sportkava::sources::skating::{SkatingAdapter, SkatingConfig};
use sportkava::sources::SourceAdapter;
use sportkava::tracing::init_tracing;
use sportkava::util::env::{env_flag, env_opt, env_parse, env_req, preflight_check};
use sportkava::{AppConfig, Db, UnmappedPolicy};

#[derive(Parser, Debug)]
#[command(name = "ingest", version, about = "Sports schedule ingestion CLI")]
struct Cli {
    /// Year applied to dates the source publishes without one
    #[arg(long)]
    reference_year: Option<i32>,

    /// Drop events whose team identities resolve to no known alias
    /// (default: store them with free text only)
    #[arg(long, action = ArgAction::SetTrue)]
    drop_unmapped: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Basketball schedule via a scripted browser session (estlatbl.com)
    EstlatblLive,
    /// Basketball schedule from server-rendered HTML (estlatbl.com)
    Estlatbl,
    /// National basketball schedule, paginated tables (basket.ee)
    BasketEe,
    /// Hockey schedule API, one call per division (hockeydata.net)
    Hockey,
    /// Football day-calendar sweep (jalgpall.ee)
    Football {
        /// First day, DD.MM.YYYY
        from: String,
        /// Last day, DD.MM.YYYY (defaults to FROM)
        to: Option<String>,
    },
    /// Skating season calendar (uisuliit.ee)
    Skating,
}

fn parse_cli_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d.%m.%Y")
        .with_context(|| format!("expected DD.MM.YYYY date, got {raw:?}"))
}

fn build_adapter(command: &Command) -> Result<Box<dyn SourceAdapter>> {
    Ok(match command {
        Command::EstlatblLive => {
            let mut cfg = EstlatblLiveConfig::default();
            if let Some(url) = env_opt("WEBDRIVER_URL") {
                cfg.webdriver_url = url;
            }
            Box::new(EstlatblLiveAdapter::new(cfg))
        }
        Command::Estlatbl => Box::new(EstlatblScheduleAdapter::new(
            EstlatblScheduleConfig::default(),
        )?),
        Command::BasketEe => {
            let mut cfg = BasketEeConfig::default();
            cfg.fetch.max_pages = env_parse("BASKETEE_MAX_PAGES", cfg.fetch.max_pages);
            if env_flag("BASKETEE_NO_SNAPSHOT", false) {
                cfg.snapshot_path = None;
            }
            if let Some(list) = env_opt("BASKETEE_LEAGUE_ALLOWLIST") {
                cfg.league_allowlist = list
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            Box::new(BasketEeAdapter::new(cfg)?)
        }
        Command::Hockey => {
            let api_key = env_req("HOCKEY_API_KEY")?;
            Box::new(HockeyAdapter::new(HockeyConfig::new(api_key))?)
        }
        Command::Football { from, to } => {
            let from = parse_cli_date(from)?;
            let to = match to {
                Some(raw) => parse_cli_date(raw)?,
                None => from,
            };
            if to < from {
                anyhow::bail!("range end {to} precedes start {from}");
            }
            Box::new(FootballAdapter::new(FootballConfig::new(from, to))?)
        }
        Command::Skating => Box::new(SkatingAdapter::new(SkatingConfig::default())?),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info,sqlx=warn")?;
    let cli = Cli::parse();

    let required: &[&str] = match cli.command {
        Command::Hockey => &["HOCKEY_API_KEY"],
        _ => &[],
    };
    preflight_check(
        "ingest",
        required,
        &["DATABASE_URL", "HOCKEY_API_KEY", "WEBDRIVER_URL"],
    )?;

    let mut app = AppConfig::from_env()?;
    if let Some(year) = cli.reference_year {
        app.reference_year = year;
    }
    if cli.drop_unmapped {
        app.unmapped_policy = UnmappedPolicy::Drop;
    }

    let adapter = build_adapter(&cli.command)?;

    let db = Db::connect(&app.database_url, app.max_connections).await?;
    let aliases = AliasIndex::load(&db, adapter.sport().as_str()).await?;

    let ctx = RunContext {
        db: &db,
        aliases: &aliases,
        reference_year: app.reference_year,
        unmapped_policy: app.unmapped_policy,
    };

    match run_adapter(&ctx, adapter.as_ref()).await {
        Ok(summary) => {
            println!("{summary}");
            Ok(())
        }
        Err(e) => {
            // nothing was written past the abort; the summary still prints
            let summary = RunSummary {
                source: adapter.source().to_string(),
                ..RunSummary::default()
            };
            println!("{summary}");
            eprintln!("SCRAPE FAILED: {e:#}");
            Err(e)
        }
    }
}
