use crate::config::AppConfig;
use crate::engine::StrategyEvaluator;
use crate::errors::{StrategyError, StrategyResult};
use crate::loader;
use crate::output::chart::HtmlChart;
use crate::output::report::TextReport;
use crate::output::{self, Artifact, ArtifactRenderer};
use chrono::NaiveDateTime;
use portable_atomic::{AtomicU64, Ordering};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Everything one strategy needs, shared read-only across workers.
pub struct Pipeline {
    pub evaluator: StrategyEvaluator,
    pub renderers: Vec<Box<dyn ArtifactRenderer>>,
    pub output_dir: PathBuf,
    pub valuation_time: NaiveDateTime,
}

impl Pipeline {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            evaluator: StrategyEvaluator::new(config.grid_points, config.bounds_rule),
            renderers: vec![Box::new(HtmlChart), Box::new(TextReport)],
            output_dir: config.output_dir.clone(),
            valuation_time: config.valuation_time,
        }
    }
}

/// What a finished strategy left on disk.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub name: String,
    pub legs: usize,
    pub cost: f64,
    pub artifacts: Vec<PathBuf>,
}

/// Batch counters. Workers bump them, the summary reads them once at the end.
#[derive(Debug, Default)]
pub struct BatchCounters {
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: u64,
    pub failed: u64,
}

impl BatchSummary {
    #[inline]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Load, evaluate, render every artifact, then write them.
/// Nothing touches the output directory until all rendering has succeeded.
pub fn process_strategy(path: &Path, pipeline: &Pipeline) -> StrategyResult<StrategyOutcome> {
    let strategy = loader::load_strategy(path, pipeline.valuation_time)?;
    let evaluation = pipeline.evaluator.evaluate(&strategy.legs)?;

    let artifacts: Vec<Artifact> = pipeline
        .renderers
        .iter()
        .map(|r| {
            tracing::debug!(strategy = %strategy.name, renderer = r.name(), "rendering");
            Artifact::render(r.as_ref(), &strategy.name, &evaluation)
        })
        .collect();

    let written = artifacts
        .iter()
        .map(|a| output::write_atomic(&pipeline.output_dir, a))
        .collect::<StrategyResult<Vec<_>>>()?;

    Ok(StrategyOutcome {
        name: strategy.name,
        legs: evaluation.legs.len(),
        cost: evaluation.cost,
        artifacts: written,
    })
}

/// Process every strategy file in the input directory.
///
/// Strategies run as blocking jobs, at most `max_parallel` at once.
/// A failing strategy is logged and counted; the rest of the batch continues.
/// Only a missing or unreadable input directory fails the whole run.
pub async fn run_batch(config: &AppConfig) -> StrategyResult<BatchSummary> {
    let span = tracing::info_span!("batch", run_id = %uuid::Uuid::new_v4());
    run_batch_inner(config).instrument(span).await
}

async fn run_batch_inner(config: &AppConfig) -> StrategyResult<BatchSummary> {
    let paths = loader::discover(&config.input_dir)?;
    tracing::info!(
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        strategies = paths.len(),
        valuation_time = %config.valuation_time,
        "batch starting"
    );

    let pipeline = Arc::new(Pipeline::from_config(config));
    let counters = Arc::new(BatchCounters::default());
    let permits = Arc::new(Semaphore::new(config.max_parallel));
    let mut jobs = JoinSet::new();

    for path in paths {
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| StrategyError::Configuration(format!("worker pool closed: {e}")))?;
        let pipeline = pipeline.clone();
        let display_name = loader::strategy_name(&path).unwrap_or_else(|_| path.display().to_string());

        jobs.spawn_blocking(move || {
            let _permit = permit;
            (display_name, process_strategy(&path, &pipeline))
        });
    }

    while let Some(joined) = jobs.join_next().await {
        match joined {
            Ok((_, Ok(outcome))) => {
                counters.succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    strategy = %outcome.name,
                    legs = outcome.legs,
                    cost = outcome.cost,
                    artifacts = outcome.artifacts.len(),
                    "strategy finished"
                );
            }
            Ok((name, Err(e))) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(strategy = %name, error = %e, "strategy failed");
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %e, "strategy worker panicked");
            }
        }
    }

    let summary = BatchSummary {
        succeeded: counters.succeeded.load(Ordering::Relaxed),
        failed: counters.failed.load(Ordering::Relaxed),
    };
    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "batch complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::grid::BoundsRule;

    fn scratch() -> (PathBuf, PathBuf) {
        let root = std::env::temp_dir().join(format!("payoff_batch_{}", uuid::Uuid::new_v4()));
        let input = root.join("input");
        std::fs::create_dir_all(&input).unwrap();
        (input, root.join("output"))
    }

    fn config(input: PathBuf, output: PathBuf) -> AppConfig {
        AppConfig {
            input_dir: input,
            output_dir: output,
            grid_points: 1_000,
            bounds_rule: BoundsRule::FirstLast,
            max_parallel: 2,
            valuation_time: chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        }
    }

    const LONG_CALL: &str =
        r#"[{"kind": "call", "strike": 100, "quantity": 1, "unit_value": 5, "expiry": "2024-02-01", "label": "X"}]"#;
    const EXPIRED_PUT: &str =
        r#"[{"kind": "put", "strike": 100, "quantity": 1, "unit_value": 5, "expiry": "2023-12-01", "label": "OLD"}]"#;
    const EXPIRES_TODAY: &str =
        r#"[{"kind": "call", "strike": 100, "quantity": 1, "unit_value": 5, "expiry": "2024-01-02", "label": "TODAY"}]"#;

    #[test]
    fn test_process_strategy_writes_both_artifacts() {
        let (input, output) = scratch();
        let path = input.join("long-call.json");
        std::fs::write(&path, LONG_CALL).unwrap();

        let pipeline = Pipeline::from_config(&config(input.clone(), output.clone()));
        let outcome = process_strategy(&path, &pipeline).unwrap();

        assert_eq!(outcome.name, "long-call");
        assert_eq!(outcome.legs, 1);
        assert!((outcome.cost - 5.0).abs() < 1e-12);
        assert!(output.join("long-call.html").is_file());
        assert!(output.join("long-call.txt").is_file());

        std::fs::remove_dir_all(input.parent().unwrap()).ok();
    }

    #[test]
    fn test_failed_strategy_writes_nothing() {
        let (input, output) = scratch();
        let path = input.join("expired.json");
        std::fs::write(&path, EXPIRED_PUT).unwrap();

        let pipeline = Pipeline::from_config(&config(input.clone(), output.clone()));
        assert!(process_strategy(&path, &pipeline).is_err());
        assert!(!output.join("expired.txt").exists());
        assert!(!output.join("expired.html").exists());

        std::fs::remove_dir_all(input.parent().unwrap()).ok();
    }

    #[test]
    fn test_option_expiring_on_valuation_day_is_expired() {
        let (input, output) = scratch();
        let path = input.join("today.json");
        std::fs::write(&path, EXPIRES_TODAY).unwrap();

        let pipeline = Pipeline::from_config(&config(input.clone(), output.clone()));
        assert!(matches!(
            process_strategy(&path, &pipeline),
            Err(StrategyError::Configuration(_))
        ));
        assert!(!output.join("today.txt").exists());

        std::fs::remove_dir_all(input.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let (input, output) = scratch();
        std::fs::write(input.join("long-call.json"), LONG_CALL).unwrap();
        std::fs::write(input.join("expired.json"), EXPIRED_PUT).unwrap();
        std::fs::write(input.join("garbage.json"), "not json").unwrap();
        std::fs::write(input.join("empty.json"), "[]").unwrap();

        let summary = run_batch(&config(input.clone(), output.clone())).await.unwrap();
        assert_eq!(summary, BatchSummary { succeeded: 1, failed: 3 });
        assert!(!summary.all_succeeded());

        let report = std::fs::read_to_string(output.join("long-call.txt")).unwrap();
        assert!(report.contains("You built a strategy with 1 legs"));
        assert!(!output.join("garbage.txt").exists());

        std::fs::remove_dir_all(input.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn test_missing_input_dir_fails_run() {
        let root = std::env::temp_dir().join(format!("payoff_none_{}", uuid::Uuid::new_v4()));
        let result = run_batch(&config(root.join("input"), root.join("output"))).await;
        assert!(matches!(result, Err(StrategyError::Io(_))));
    }
}
