use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use chrono::NaiveDate;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use tipsheet_football::cache::ResultCache;
use tipsheet_football::config::Config;
use tipsheet_football::data::{MatchData, Snapshot};
use tipsheet_football::domain::{FixtureId, SeasonId, TeamId};
use tipsheet_football::print;
use tipsheet_football::quota::Caller;
use tipsheet_football::service::Service;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// snapshot of leagues, teams, played matches, fixtures and tables
    #[clap(short = 'd', long)]
    data: PathBuf,

    /// engine configuration; defaults apply when omitted
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// file to load the result cache from and save it to
    #[clap(long)]
    cache: Option<PathBuf>,

    /// analyse every fixture on this date (YYYY-MM-DD)
    #[clap(long)]
    date: Option<NaiveDate>,

    /// restrict the date's fixtures to one season
    #[clap(long)]
    season: Option<SeasonId>,

    /// predict a single fixture
    #[clap(short = 'f', long)]
    fixture: Option<FixtureId>,

    /// bypass cached predictions
    #[clap(short = 'r', long)]
    refresh: bool,

    /// page of batch results to print (1-based)
    #[clap(long, default_value = "1")]
    page: usize,

    /// batch results per page
    #[clap(long, default_value = "50")]
    page_size: usize,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.date.is_none() && self.fixture.is_none() || self.date.is_some() && self.fixture.is_some() {
            bail!("either the --date or the --fixture flag must be specified");
        }
        if self.season.is_some() && self.date.is_none() {
            bail!("--season applies only with --date");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let snapshot = Arc::new(Snapshot::load(&args.data)?);
    let cache = match &args.cache {
        Some(path) if path.exists() => ResultCache::load(path)?,
        _ => ResultCache::new(),
    };
    info!("loaded {} cached predictions", cache.len());
    let service = Service::new(snapshot.clone(), Arc::new(cache), &config)?;
    let sweeper = service.spawn_sweeper();
    let team_name = |team_id: TeamId| {
        snapshot
            .team(team_id)
            .ok()
            .flatten()
            .map(|team| team.name)
            .unwrap_or_else(|| format!("#{team_id}"))
    };

    if let Some(fixture_id) = args.fixture {
        let cached = service.predict_fixture(fixture_id, args.refresh)?;
        let prediction = &cached.result;
        info!("fixture {fixture_id} (cache hit: {})", cached.cache_hit);
        let home = team_name(prediction.home_team_id);
        let away = team_name(prediction.away_team_id);
        let console = Console::default();
        println!("{home} v {away}");
        println!("{}", console.render(&print::tabulate_prediction(prediction, &home, &away)));
        println!(
            "Correct scores:\n{}",
            console.render(&print::tabulate_correct_scores(prediction))
        );
    } else if let Some(date) = args.date {
        let caller = Caller::User(env::var("USER").unwrap_or_else(|_| "local".into()));
        let job_id = service.start_batch(&caller, date, args.season, args.refresh)?;
        let status = service.coordinator().wait(&job_id, POLL_INTERVAL).await?;
        let page = service.results(&job_id, args.page, args.page_size)?;
        let console = Console::default();
        println!("{}", console.render(&print::tabulate_status(&status)));
        println!(
            "Results (page {} of {}, {} fixtures):\n{}",
            page.page,
            page.total_pages,
            page.total_items,
            console.render(&print::tabulate_results(&page, team_name))
        );
    }

    let stats = service.coordinator().cache().stats();
    info!(
        "cache: {} hits, {} misses, hit rate {:.1}%",
        stats.hits,
        stats.misses,
        stats.hit_rate() * 100.0
    );
    if let Some(path) = &args.cache {
        service.coordinator().cache().save(path)?;
    }
    sweeper.abort();
    Ok(())
}
