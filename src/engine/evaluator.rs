use crate::engine::grid::{BoundsRule, GridBounds, PriceGrid, DEFAULT_GRID_POINTS};
use crate::engine::payoff;
use crate::errors::{StrategyError, StrategyResult};
use crate::instrument::{Instrument, NormalizedLeg};
use std::collections::HashSet;

pub const PAYOFF_COMBINED: &str = "Payoff_Combined";
pub const RESULT_COMBINED: &str = "Result_Combined";

/// Sampled rows in the report table: ten evenly spaced plus the last point.
pub const REPORT_ROWS: usize = 11;

// ── Curve view ──

/// One named line over the shared price grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSeries {
    pub name: String,
    pub dashed: bool,
    pub values: Vec<f64>,
}

/// Flat record form of the curve view, as a chart consumes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint<'a> {
    pub price: f64,
    pub series: &'a str,
    pub value: f64,
    pub dashed: bool,
}

/// Combined series first (payoff, then result), then one payoff series per leg
/// in input order. Every series has exactly one value per grid price.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveView {
    pub prices: Vec<f64>,
    pub series: Vec<CurveSeries>,
}

impl CurveView {
    #[cfg(test)]
    pub fn series(&self, name: &str) -> Option<&CurveSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    #[cfg(test)]
    pub fn combined_payoff(&self) -> Option<&CurveSeries> {
        self.series(PAYOFF_COMBINED)
    }

    #[cfg(test)]
    pub fn combined_result(&self) -> Option<&CurveSeries> {
        self.series(RESULT_COMBINED)
    }

    /// All (price, series, value, dashed) records, series-major.
    pub fn points(&self) -> impl Iterator<Item = CurvePoint<'_>> + '_ {
        self.series.iter().flat_map(move |s| {
            self.prices
                .iter()
                .zip(s.values.iter())
                .map(move |(&price, &value)| CurvePoint {
                    price,
                    series: s.name.as_str(),
                    value,
                    dashed: s.dashed,
                })
        })
    }

    /// Number of distinct series names. Legs sharing a name collapse into one.
    pub fn distinct_series(&self) -> usize {
        self.series
            .iter()
            .map(|s| s.name.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

// ── Report table ──

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportRow {
    pub price: f64,
    pub payoff: f64,
    pub result: f64,
    /// result / (payoff - result) * 100, i.e. result over cost.
    pub return_pct: f64,
}

impl ReportRow {
    fn new(price: f64, payoff: f64, result: f64) -> Self {
        Self {
            price,
            payoff,
            result,
            return_pct: result / (payoff - result) * 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    /// Strategy cost recovered from the first row: payoff - result.
    /// Cost does not depend on price, so any row gives the same figure.
    pub fn strategy_cost(&self) -> f64 {
        self.rows
            .first()
            .map(|r| r.payoff - r.result)
            .unwrap_or_default()
    }
}

/// Grid indices sampled into the report: {0, n/10, ..., 9n/10, n-1}.
/// Strictly increasing only for n >= REPORT_ROWS; the evaluator refuses smaller grids.
pub fn sample_indices(n: usize) -> [usize; REPORT_ROWS] {
    let mut idx = [0usize; REPORT_ROWS];
    for (k, slot) in idx.iter_mut().take(REPORT_ROWS - 1).enumerate() {
        *slot = k * (n / 10);
    }
    idx[REPORT_ROWS - 1] = n.saturating_sub(1);
    idx
}

// ── Evaluation ──

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub bounds: GridBounds,
    pub legs: Vec<NormalizedLeg>,
    pub curves: CurveView,
    pub table: ReportTable,
    pub cost: f64,
}

impl Evaluation {
    /// Leg count as reported: distinct series minus the two combined ones.
    pub fn leg_count(&self) -> usize {
        self.curves.distinct_series().saturating_sub(2)
    }
}

/// Turns an ordered list of legs into the curve view and the report table.
/// Holds no state between calls; one instance can serve many strategies.
#[derive(Debug, Clone, Copy)]
pub struct StrategyEvaluator {
    grid_points: usize,
    bounds_rule: BoundsRule,
}

impl Default for StrategyEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_POINTS, BoundsRule::FirstLast)
    }
}

impl StrategyEvaluator {
    pub fn new(grid_points: usize, bounds_rule: BoundsRule) -> Self {
        Self {
            grid_points,
            bounds_rule,
        }
    }

    pub fn evaluate(&self, instruments: &[Instrument]) -> StrategyResult<Evaluation> {
        if instruments.is_empty() {
            return Err(StrategyError::Configuration("strategy has no legs".into()));
        }
        if self.grid_points < REPORT_ROWS {
            return Err(StrategyError::Configuration(format!(
                "price grid needs at least {REPORT_ROWS} points for the report table, got {}",
                self.grid_points
            )));
        }

        let legs = instruments
            .iter()
            .map(Instrument::normalize)
            .collect::<StrategyResult<Vec<_>>>()?;

        let bounds = GridBounds::select(&legs, self.bounds_rule)?;
        let grid = PriceGrid::from_bounds(&bounds, self.grid_points)?;
        let prices = grid.prices();

        // Payoff matrix, one row per leg.
        let leg_payoffs: Vec<Vec<f64>> = legs
            .iter()
            .map(|leg| prices.iter().map(|&p| payoff::payoff(leg, p)).collect())
            .collect();

        let mut combined_payoff = vec![0.0; prices.len()];
        let mut combined_result = vec![0.0; prices.len()];
        for (leg, row) in legs.iter().zip(&leg_payoffs) {
            for (i, (&value, &price)) in row.iter().zip(prices).enumerate() {
                combined_payoff[i] += value;
                combined_result[i] += payoff::result(leg, price);
            }
        }

        let table = ReportTable {
            rows: sample_indices(prices.len())
                .iter()
                .map(|&i| ReportRow::new(prices[i], combined_payoff[i], combined_result[i]))
                .collect(),
        };
        let cost = table.strategy_cost();

        let mut series = Vec::with_capacity(legs.len() + 2);
        series.push(CurveSeries {
            name: PAYOFF_COMBINED.to_string(),
            dashed: true,
            values: combined_payoff,
        });
        series.push(CurveSeries {
            name: RESULT_COMBINED.to_string(),
            dashed: true,
            values: combined_result,
        });
        series.extend(legs.iter().zip(leg_payoffs).map(|(leg, values)| CurveSeries {
            name: leg.series_name(),
            dashed: false,
            values,
        }));

        tracing::debug!(
            legs = legs.len(),
            grid_points = prices.len(),
            lower = bounds.grid_lower(),
            upper = bounds.grid_upper(),
            cost,
            "strategy evaluated"
        );

        Ok(Evaluation {
            bounds,
            legs,
            curves: CurveView {
                prices: prices.to_vec(),
                series,
            },
            table,
            cost,
        })
    }
}
