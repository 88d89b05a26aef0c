use crate::errors::{StrategyError, StrategyResult};
use crate::instrument::{Instrument, LegRecord};
use chrono::NaiveDateTime;
use smallvec::SmallVec;
use std::path::{Path, PathBuf};

pub const STRATEGY_EXTENSION: &str = "json";

/// Legs of one strategy, in file order. Most strategies fit inline.
pub type Legs = SmallVec<[Instrument; 8]>;

#[derive(Debug, Clone)]
pub struct Strategy {
    pub name: String,
    pub legs: Legs,
}

/// List strategy files in `input_dir`, sorted by file name.
/// Hidden files and files without the `.json` extension are skipped.
pub fn discover(input_dir: &Path) -> StrategyResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(input_dir).map_err(|e| {
        StrategyError::Io(format!("read input dir {}: {e}", input_dir.display()))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(true);
        let is_strategy = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(STRATEGY_EXTENSION))
            .unwrap_or(false);
        if !hidden && is_strategy {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

/// Strategy name = file stem.
pub fn strategy_name(path: &Path) -> StrategyResult<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| StrategyError::Io(format!("no usable file name: {}", path.display())))
}

pub fn load_strategy(path: &Path, valuation_time: NaiveDateTime) -> StrategyResult<Strategy> {
    let name = strategy_name(path)?;
    let contents = std::fs::read_to_string(path)
        .map_err(|e| StrategyError::Io(format!("read {}: {e}", path.display())))?;
    parse_strategy(name, &contents, valuation_time)
}

/// Parse a JSON array of leg records and resolve expiry dates to day counts.
pub fn parse_strategy(
    name: String,
    contents: &str,
    valuation_time: NaiveDateTime,
) -> StrategyResult<Strategy> {
    let records: Vec<LegRecord> = serde_json::from_str(contents)?;
    if records.is_empty() {
        return Err(StrategyError::Configuration(format!(
            "strategy '{name}' has no legs"
        )));
    }

    let legs = records
        .iter()
        .map(|r| Instrument::from_record(r, valuation_time))
        .collect::<StrategyResult<Legs>>()?;

    tracing::debug!(strategy = %name, legs = legs.len(), "strategy loaded");
    Ok(Strategy { name, legs })
}
