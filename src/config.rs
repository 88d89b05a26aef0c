use crate::engine::evaluator::REPORT_ROWS;
use crate::engine::grid::{BoundsRule, DEFAULT_GRID_POINTS};
use crate::errors::{StrategyError, StrategyResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub grid_points: usize,
    pub bounds_rule: BoundsRule,
    pub max_parallel: usize,
    /// Instant that days-to-expiry are counted from.
    pub valuation_time: NaiveDateTime,
}

impl AppConfig {
    pub fn from_env() -> StrategyResult<Self> {
        dotenvy::dotenv().ok();

        let grid_points = parse_grid_points(&env_var_or("GRID_POINTS", &DEFAULT_GRID_POINTS.to_string()))?;

        let bounds_rule = env_var_or("GRID_BOUNDS", "first-last").parse::<BoundsRule>()?;

        let max_parallel = env_var_or("MAX_PARALLEL", "4")
            .parse::<usize>()
            .map_err(|e| StrategyError::Configuration(format!("MAX_PARALLEL: {e}")))?;
        if max_parallel == 0 {
            return Err(StrategyError::Configuration(
                "MAX_PARALLEL must be at least 1".into(),
            ));
        }

        let valuation_time = match std::env::var("VALUATION_DATE") {
            Ok(raw) => parse_valuation_time(&raw)?,
            Err(_) => chrono::Local::now().naive_local(),
        };

        Ok(Self {
            input_dir: PathBuf::from(env_var_or("INPUT_DIR", "input")),
            output_dir: PathBuf::from(env_var_or("OUTPUT_DIR", "output")),
            grid_points,
            bounds_rule,
            max_parallel,
            valuation_time,
        })
    }
}

/// The report samples 11 grid rows, so smaller grids would repeat prices.
fn parse_grid_points(raw: &str) -> StrategyResult<usize> {
    let grid_points = raw
        .trim()
        .parse::<usize>()
        .map_err(|e| StrategyError::Configuration(format!("GRID_POINTS: {e}")))?;
    if grid_points < REPORT_ROWS {
        return Err(StrategyError::Configuration(format!(
            "GRID_POINTS must be at least {REPORT_ROWS}, got {grid_points}"
        )));
    }
    Ok(grid_points)
}

/// `YYYY-MM-DDTHH:MM:SS`, or a bare `YYYY-MM-DD` meaning midnight.
fn parse_valuation_time(raw: &str) -> StrategyResult<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(at);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|e| StrategyError::Configuration(format!("VALUATION_DATE '{raw}': {e}")))
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_points_floor() {
        assert_eq!(parse_grid_points("10000").unwrap(), 10_000);
        assert_eq!(parse_grid_points(" 11 ").unwrap(), 11);
        for raw in ["5", "10", "0", "-3", "many"] {
            assert!(
                matches!(parse_grid_points(raw), Err(StrategyError::Configuration(_))),
                "GRID_POINTS={raw} must be refused"
            );
        }
    }

    #[test]
    fn test_valuation_time_formats() {
        let midnight = parse_valuation_time("2024-01-02").unwrap();
        assert_eq!(midnight.to_string(), "2024-01-02 00:00:00");

        let mid_day = parse_valuation_time("2024-01-02T14:30:00").unwrap();
        assert_eq!(mid_day.to_string(), "2024-01-02 14:30:00");

        assert!(matches!(
            parse_valuation_time("02/01/2024"),
            Err(StrategyError::Configuration(_))
        ));
    }
}
