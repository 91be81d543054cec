// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! fanout-cli
//!
//! Runs one fanout operation over the numbers given on the command line, either
//! sequentially or as a concurrent fan-out. Every element sleeps for a
//! staggered delay first (earlier elements sleep longer), so concurrent units
//! complete roughly in reverse; the printed result is still in input order.
//!
//! The result goes to stdout as one JSON object; logs go to stderr (`RUST_LOG`).

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use fanout::{
    cancel, sequential, ConfigService, FanOut, Priority, RunnerConfig, TokioSpawner,
};
use fanout_config_fs::FsConfigStore;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run fanout operations over a list of numbers")]
struct Args {
    /// Execution mode
    #[arg(long, value_enum, default_value_t = Mode::Concurrent)]
    mode: Mode,
    /// Operation to run
    #[arg(long, value_enum, default_value_t = Op::Map)]
    op: Op,
    /// Make the unit for this value fail
    #[arg(long, allow_negative_numbers = true)]
    fail_on: Option<i64>,
    /// Priority hint for every unit (background, low, medium, high)
    #[arg(long)]
    priority: Option<Priority>,
    /// Config directory (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Persist the effective runner config before running
    #[arg(long)]
    write_config: bool,
    /// Delay step in milliseconds
    #[arg(long, default_value_t = 10)]
    step_ms: u64,
    /// Input numbers
    #[arg(required = true, allow_negative_numbers = true)]
    numbers: Vec<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
enum Mode {
    Sequential,
    Concurrent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
enum Op {
    Map,
    CompactMap,
    FlatMap,
    Filter,
    ForEach,
    Fold,
}

/// One input number plus the time its unit sleeps before applying the op.
#[derive(Clone, Copy, Debug)]
struct Element {
    value: i64,
    delay: Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(io::stderr)
        .init();

    let config = load_config(&args)?;
    let mut runner = FanOut::from_config(TokioSpawner::new(), &config);
    if let Some(priority) = args.priority {
        runner = runner.with_priority(priority);
    }
    info!(mode = ?args.mode, op = ?args.op, priority = ?runner.priority(), elements = args.numbers.len(), "running");

    let input = stagger(&args.numbers, Duration::from_millis(args.step_ms));
    let result = run(&args, &runner, input).await?;

    let report = json!({
        "mode": args.mode,
        "op": args.op,
        "priority": runner.priority(),
        "result": result,
    });
    let mut out = io::stdout().lock();
    writeln!(out, "{}", serde_json::to_string(&report)?)?;
    Ok(())
}

fn load_config(args: &Args) -> Result<RunnerConfig> {
    let store = match &args.config {
        Some(dir) => FsConfigStore::at(dir)
            .with_context(|| format!("open config dir {}", dir.display()))?,
        None => match FsConfigStore::new() {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "no config dir; using defaults");
                return Ok(RunnerConfig::default());
            }
        },
    };
    debug!(dir = %store.base().display(), "config store");
    let service = ConfigService::new(store);
    let mut config = service.load_runner().context("load runner config")?;
    if args.write_config {
        if args.priority.is_some() {
            config.default_priority = args.priority;
        }
        service.save_runner(&config).context("save runner config")?;
        info!(default_priority = ?config.default_priority, "runner config saved");
    }
    Ok(config)
}

/// Earlier elements get longer delays, plus a little per-value jitter.
fn stagger(numbers: &[i64], step: Duration) -> Vec<Element> {
    let n = numbers.len();
    numbers
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            let steps = u32::try_from(n - index).unwrap_or(u32::MAX);
            let jitter = Duration::from_millis(value.unsigned_abs() % 3);
            Element {
                value,
                delay: step.saturating_mul(steps) + jitter,
            }
        })
        .collect()
}

/// Sleeps for the element's delay, then yields its value or the injected failure.
///
/// A cancelled unit stops sleeping and reports that; the runner already holds
/// the error that caused it.
async fn settle(element: Element, fail_on: Option<i64>) -> Result<i64> {
    tokio::select! {
        () = tokio::time::sleep(element.delay) => {}
        () = cancel::cancelled() => {
            debug!(value = element.value, "unit cancelled");
            bail!("element {} cancelled", element.value);
        }
    }
    if fail_on == Some(element.value) {
        bail!("element {} failed", element.value);
    }
    Ok(element.value)
}

async fn square(element: Element, fail_on: Option<i64>) -> Result<i64> {
    let x = settle(element, fail_on).await?;
    x.checked_mul(x).context("square overflows i64")
}

async fn halve_even(element: Element, fail_on: Option<i64>) -> Result<Option<i64>> {
    let x = settle(element, fail_on).await?;
    Ok((x % 2 == 0).then_some(x / 2))
}

async fn mirror(element: Element, fail_on: Option<i64>) -> Result<[i64; 2]> {
    let x = settle(element, fail_on).await?;
    Ok([x, -x])
}

async fn is_positive(element: Element, fail_on: Option<i64>) -> Result<bool> {
    Ok(settle(element, fail_on).await? > 0)
}

async fn visit(element: Element, fail_on: Option<i64>) -> Result<()> {
    let x = settle(element, fail_on).await?;
    info!(value = x, "visited");
    Ok(())
}

async fn subtract(acc: i64, element: Element, fail_on: Option<i64>) -> Result<i64> {
    let x = settle(element, fail_on).await?;
    acc.checked_sub(x).context("fold overflows i64")
}

fn values(elements: Vec<Element>) -> Vec<i64> {
    elements.into_iter().map(|e| e.value).collect()
}

async fn run(args: &Args, runner: &FanOut, input: Vec<Element>) -> Result<Value> {
    let fail_on = args.fail_on;
    let visited = input.len();
    let value = match (args.op, args.mode) {
        (Op::Map, Mode::Sequential) => {
            json!(sequential::try_map(input, |e| square(e, fail_on)).await?)
        }
        (Op::Map, Mode::Concurrent) => {
            json!(runner.try_map(input, move |e| square(e, fail_on)).await?)
        }
        (Op::CompactMap, Mode::Sequential) => {
            json!(sequential::try_compact_map(input, |e| halve_even(e, fail_on)).await?)
        }
        (Op::CompactMap, Mode::Concurrent) => {
            json!(runner.try_compact_map(input, move |e| halve_even(e, fail_on)).await?)
        }
        (Op::FlatMap, Mode::Sequential) => {
            json!(sequential::try_flat_map(input, |e| mirror(e, fail_on)).await?)
        }
        (Op::FlatMap, Mode::Concurrent) => {
            json!(runner.try_flat_map(input, move |e| mirror(e, fail_on)).await?)
        }
        (Op::Filter, Mode::Sequential) => {
            let kept = sequential::try_filter(input, |e: &Element| is_positive(*e, fail_on)).await?;
            json!(values(kept))
        }
        (Op::Filter, Mode::Concurrent) => {
            let kept = runner
                .try_filter(input, move |e: &Element| is_positive(*e, fail_on))
                .await?;
            json!(values(kept))
        }
        (Op::ForEach, Mode::Sequential) => {
            sequential::try_for_each(input, |e| visit(e, fail_on)).await?;
            json!({ "visited": visited })
        }
        (Op::ForEach, Mode::Concurrent) => {
            runner.try_for_each(input, move |e| visit(e, fail_on)).await?;
            json!({ "visited": visited })
        }
        (Op::Fold, mode) => {
            if mode == Mode::Concurrent {
                warn!("fold has no concurrent form; running sequentially");
            }
            json!(sequential::try_fold(input, 0i64, |acc, e| subtract(acc, e, fail_on)).await?)
        }
    };
    Ok(value)
}
