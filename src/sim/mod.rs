//! Simulation mode: drives a viewer and a grid over a synthetic catalog with
//! injected failures and prints `key=value` progress lines.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::cache::LoadStatus;
use crate::carousel::PreloadHint;
use crate::config::CoordinatorConfig;
use crate::error::Error;
use crate::models::{CatalogItem, MediaKey};
use crate::retry::RetryScheduler;
use crate::reveal::{ContainerId, Presentation, VisibilitySignal};
use crate::session::MediaSession;

const BASE_URL: &str = "https://media.sim/";
const EXTENSIONS: [&str; 4] = ["webp", "mp4", "jpg", "mp3"];
const MAX_ROUNDS: usize = 10_000;

pub const USAGE: &str = "usage: mediaload --simulate [--items N] [--fail-every K] \
[--broken-every K] [--runs N] [--base-delay-ms MS] [--list]";

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationArgs {
    pub items: usize,
    pub fail_every: usize,
    pub broken_every: usize,
    pub runs: usize,
    pub base_delay_ms: u64,
    pub list: bool,
}

impl Default for SimulationArgs {
    fn default() -> Self {
        Self {
            items: 120,
            fail_every: 7,
            broken_every: 23,
            runs: 1,
            base_delay_ms: 20,
            list: false,
        }
    }
}

/// Which catalog positions fail, and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePlan {
    /// Every k-th item fails its first attempt only. 0 disables.
    pub fail_every: usize,
    /// Every k-th item never loads. 0 disables.
    pub broken_every: usize,
}

impl FailurePlan {
    pub fn is_broken(&self, index: usize) -> bool {
        self.broken_every > 0 && index % self.broken_every == self.broken_every - 1
    }

    pub fn is_flaky(&self, index: usize) -> bool {
        self.fail_every > 0 && index % self.fail_every == self.fail_every - 1
    }

    /// Whether the `attempt`-th fetch (1-based) of item `index` fails.
    pub fn fails(&self, index: usize, attempt: u32) -> bool {
        self.is_broken(index) || (self.is_flaky(index) && attempt == 1)
    }
}

/// Stand-in for the network: answers fetches according to a `FailurePlan`.
#[derive(Debug)]
struct SimulatedBackend {
    plan: FailurePlan,
    attempts: HashMap<usize, u32>,
    total_attempts: usize,
    total_failures: usize,
}

impl SimulatedBackend {
    fn new(plan: FailurePlan) -> Self {
        Self {
            plan,
            attempts: HashMap::new(),
            total_attempts: 0,
            total_failures: 0,
        }
    }

    /// Returns whether the fetch succeeded.
    fn fetch(&mut self, index: usize) -> bool {
        let attempt = self.attempts.entry(index).or_insert(0);
        *attempt += 1;
        self.total_attempts += 1;
        let failed = self.plan.fails(index, *attempt);
        if failed {
            self.total_failures += 1;
        }
        !failed
    }
}

#[derive(Debug, Default)]
struct ViewerPhase {
    visited: usize,
    fetched: usize,
    failed: usize,
    skipped: usize,
    played: usize,
}

#[derive(Debug, Default)]
struct RevealPhase {
    rounds: usize,
    fetched: usize,
    failed: usize,
    window: usize,
}

#[derive(Debug)]
struct SimulationRun {
    elapsed_ms: u128,
    loaded: usize,
    exhausted: usize,
    unexpected: usize,
}

pub fn maybe_parse_args() -> Result<Option<SimulationArgs>> {
    parse_args(env::args().skip(1))
}

pub fn parse_args<I>(args: I) -> Result<Option<SimulationArgs>>
where
    I: IntoIterator<Item = String>,
{
    let mut simulate = false;
    let mut parsed = SimulationArgs::default();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--simulate" => simulate = true,
            "--items" => parsed.items = parse_value("--items", args.next())?,
            "--fail-every" => parsed.fail_every = parse_value("--fail-every", args.next())?,
            "--broken-every" => parsed.broken_every = parse_value("--broken-every", args.next())?,
            "--runs" => parsed.runs = parse_value("--runs", args.next())?,
            "--base-delay-ms" => {
                parsed.base_delay_ms = parse_value("--base-delay-ms", args.next())?
            }
            "--list" => parsed.list = true,
            other => debug!(arg = other, "Ignoring unknown argument"),
        }
    }

    if !simulate {
        return Ok(None);
    }
    if parsed.items == 0 {
        bail!("--items must be greater than 0");
    }
    if parsed.runs == 0 {
        bail!("--runs must be greater than 0");
    }
    if parsed.base_delay_ms == 0 {
        bail!("--base-delay-ms must be greater than 0");
    }
    Ok(Some(parsed))
}

fn parse_value<T: FromStr>(name: &'static str, value: Option<String>) -> Result<T> {
    let value = value.with_context(|| format!("Missing value for {name} in simulation mode"))?;
    match value.trim().parse::<T>() {
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(Error::InvalidArgument { name, value }.into()),
    }
}

fn catalog(items: usize) -> Vec<CatalogItem> {
    (0..items)
        .map(|index| {
            let ext = EXTENSIONS[index % EXTENSIONS.len()];
            CatalogItem::from_storage_key(format!("sim/{index:04}.{ext}"))
                .with_title(format!("Item {index}"))
        })
        .collect()
}

/// Run the simulation `args.runs` times. Returns the process exit code: 0
/// when every healthy item loaded and every broken item was given up on.
pub fn run_simulation(args: SimulationArgs) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime for simulation")?;

    let plan = FailurePlan {
        fail_every: args.fail_every,
        broken_every: args.broken_every,
    };
    let mut config = CoordinatorConfig::from_env();
    config.retry.base_delay = Duration::from_millis(args.base_delay_ms);
    config.retry.cap_delay = Duration::from_millis(args.base_delay_ms.saturating_mul(16));

    let mut runs = Vec::with_capacity(args.runs);
    for run_index in 0..args.runs {
        let run_number = run_index + 1;
        let run = runtime
            .block_on(simulate_once(&args, plan, config, run_number))
            .with_context(|| format!("Simulation run {run_number} failed"))?;
        println!(
            "run={} phase=end ms={} loaded={} exhausted={} unexpected={}",
            run_number, run.elapsed_ms, run.loaded, run.exhausted, run.unexpected
        );
        runs.push(run);
    }

    let total_ms: u128 = runs.iter().map(|run| run.elapsed_ms).sum();
    let min_ms = runs.iter().map(|run| run.elapsed_ms).min().unwrap_or(0);
    let max_ms = runs.iter().map(|run| run.elapsed_ms).max().unwrap_or(0);
    let unexpected: usize = runs.iter().map(|run| run.unexpected).sum();
    println!(
        "Simulation complete: runs={} avg_ms={:.1} min_ms={} max_ms={} unexpected={}",
        runs.len(),
        total_ms as f64 / runs.len().max(1) as f64,
        min_ms,
        max_ms,
        unexpected
    );

    Ok(if unexpected == 0 { 0 } else { 1 })
}

async fn simulate_once(
    args: &SimulationArgs,
    plan: FailurePlan,
    config: CoordinatorConfig,
    run_number: usize,
) -> Result<SimulationRun> {
    println!(
        "run={} phase=begin items={} fail_every={} broken_every={} presentation={}",
        run_number,
        args.items,
        args.fail_every,
        args.broken_every,
        if args.list { "list" } else { "grid" }
    );

    let start = Instant::now();
    let session = MediaSession::new(BASE_URL, config);
    let items = catalog(args.items);
    let keys: Vec<MediaKey> = items.iter().map(|item| session.media_key(item)).collect();
    let mut backend = SimulatedBackend::new(plan);

    println!("run={} phase=viewer start", run_number);
    let viewer = walk_viewer(&session, &items, &mut backend)?;
    println!(
        "run={} phase=viewer done visited={} fetched={} failed={} skipped={} played={}",
        run_number, viewer.visited, viewer.fetched, viewer.failed, viewer.skipped, viewer.played
    );

    println!("run={} phase=reveal start", run_number);
    let reveal = reveal_all(&session, &items, &keys, args, &mut backend).await?;
    println!(
        "run={} phase=reveal done rounds={} fetched={} failed={} window={} attempts={} failures={}",
        run_number,
        reveal.rounds,
        reveal.fetched,
        reveal.failed,
        reveal.window,
        backend.total_attempts,
        backend.total_failures
    );

    let cache = session.cache();
    let mut loaded = 0;
    let mut exhausted = 0;
    let mut unexpected = 0;
    for (index, key) in keys.iter().enumerate() {
        let is_loaded = cache.is_loaded(key);
        let is_exhausted = cache.has_max_retries(key);
        loaded += usize::from(is_loaded);
        exhausted += usize::from(is_exhausted);
        let expected = if plan.is_broken(index) {
            is_exhausted
        } else {
            is_loaded
        };
        if !expected {
            debug!(%key, index, status = ?cache.status(key), "Unexpected final state");
            unexpected += 1;
        }
    }

    Ok(SimulationRun {
        elapsed_ms: start.elapsed().as_millis(),
        loaded,
        exhausted,
        unexpected,
    })
}

/// Walk a viewer over the first third of the catalog, fetching whatever the
/// preload hints ask for.
fn walk_viewer(
    session: &MediaSession,
    items: &[CatalogItem],
    backend: &mut SimulatedBackend,
) -> Result<ViewerPhase> {
    let shared = &items[..items.len().div_ceil(3)];
    let mut viewer = session.viewer(shared)?;
    let mut phase = ViewerPhase::default();

    if !viewer.open(0) {
        return Ok(phase);
    }
    loop {
        phase.visited += 1;
        for index in viewer.preload_neighborhood().indices {
            if viewer.preload_hint(index) == PreloadHint::None {
                phase.skipped += 1;
                continue;
            }
            let key = session.media_key(&shared[index]);
            if session.cache().status(&key) == LoadStatus::Loaded {
                continue;
            }
            viewer.on_media_loading(index);
            phase.fetched += 1;
            if backend.fetch(index) {
                viewer.on_media_loaded(index);
            } else {
                phase.failed += 1;
                viewer.on_media_error(index);
            }
        }
        if viewer.is_media_loaded() && viewer.play() {
            phase.played += 1;
        }
        if !viewer.next() {
            break;
        }
    }
    viewer.close();
    Ok(phase)
}

/// Reveal the whole catalog in one container, scrolling to the end every
/// round, until every item is loaded or given up on.
async fn reveal_all(
    session: &MediaSession,
    items: &[CatalogItem],
    keys: &[MediaKey],
    args: &SimulationArgs,
    backend: &mut SimulatedBackend,
) -> Result<RevealPhase> {
    let presentation = if args.list {
        Presentation::List
    } else {
        Presentation::Grid
    };
    let id = ContainerId::new("simulation");
    let mut container = session.container(id.clone(), presentation, items);
    let mut retries = RetryScheduler::new(session.cache().clone())?;
    let cache = session.cache();
    let pause = Duration::from_millis(args.base_delay_ms);
    let mut phase = RevealPhase::default();

    container.open();
    container.mark_content_loaded();

    loop {
        phase.rounds += 1;
        if phase.rounds > MAX_ROUNDS {
            bail!("Catalog did not settle after {MAX_ROUNDS} rounds");
        }

        for index in container.loadable_indices() {
            let key = &keys[index];
            if cache.is_loaded(key) {
                continue;
            }
            cache.mark_loading(key);
            phase.fetched += 1;
            if backend.fetch(index) {
                cache.mark_loaded(key);
                retries.cancel(key);
            } else {
                phase.failed += 1;
                cache.mark_error(key);
                retries.schedule_after_failure(key);
            }
        }

        let settled = keys
            .iter()
            .all(|key| cache.is_loaded(key) || cache.has_max_retries(key));
        if settled {
            break;
        }

        session
            .signals()
            .emit(&id, VisibilitySignal::NearEnd { remaining: 0.0 });
        container.pump();
        tokio::time::sleep(pause).await;
    }

    phase.window = container.window().len();
    Ok(phase)
}
