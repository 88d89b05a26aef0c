use crate::errors::{StrategyError, StrategyResult};
use crate::instrument::NormalizedLeg;

pub const DEFAULT_GRID_POINTS: usize = 10_000;

/// Widening applied to the bounding strikes: [lo / 1.1, hi * 1.1].
pub const GRID_WIDENING: f64 = 1.1;

/// How the bounding strikes are picked from the normalized legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsRule {
    /// First and last leg in input order. Reordering legs moves the grid.
    #[default]
    FirstLast,
    /// Smallest and largest normalized strike.
    Extremes,
}

impl std::str::FromStr for BoundsRule {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-last" | "first_last" => Ok(Self::FirstLast),
            "extremes" | "min-max" => Ok(Self::Extremes),
            other => Err(StrategyError::Configuration(format!(
                "GRID_BOUNDS: unknown rule '{other}' (expected first-last or extremes)"
            ))),
        }
    }
}

/// Explicit price range of the sweep, before widening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBounds {
    pub lower_strike: f64,
    pub upper_strike: f64,
}

impl GridBounds {
    pub fn select(legs: &[NormalizedLeg], rule: BoundsRule) -> StrategyResult<Self> {
        let (first, last) = match (legs.first(), legs.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => {
                return Err(StrategyError::Configuration(
                    "cannot bound a price grid without legs".into(),
                ))
            }
        };

        let bounds = match rule {
            BoundsRule::FirstLast => Self {
                lower_strike: first.strike,
                upper_strike: last.strike,
            },
            BoundsRule::Extremes => Self {
                lower_strike: legs.iter().map(|l| l.strike).fold(f64::INFINITY, f64::min),
                upper_strike: legs.iter().map(|l| l.strike).fold(f64::NEG_INFINITY, f64::max),
            },
        };

        Ok(bounds)
    }

    #[inline]
    pub fn grid_lower(&self) -> f64 {
        self.lower_strike / GRID_WIDENING
    }

    #[inline]
    pub fn grid_upper(&self) -> f64 {
        self.upper_strike * GRID_WIDENING
    }
}

/// Ordered terminal-price samples. Strictly increasing, both ends included.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceGrid {
    prices: Vec<f64>,
}

impl PriceGrid {
    /// Linearly spaced samples over [start, stop]:
    ///
    /// p_i = start + i * (stop - start) / (count - 1),  p_{count-1} = stop exactly.
    pub fn generate(start: f64, stop: f64, count: usize) -> StrategyResult<Self> {
        if count < 2 {
            return Err(StrategyError::Configuration(format!(
                "price grid needs at least 2 points, got {count}"
            )));
        }
        if !start.is_finite() || !stop.is_finite() || start >= stop {
            return Err(StrategyError::Configuration(format!(
                "degenerate price range [{start}, {stop}]"
            )));
        }

        let step = (stop - start) / (count - 1) as f64;
        let mut prices: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();
        prices[count - 1] = stop;

        Ok(Self { prices })
    }

    pub fn from_bounds(bounds: &GridBounds, count: usize) -> StrategyResult<Self> {
        Self::generate(bounds.grid_lower(), bounds.grid_upper(), count)
    }

    #[inline]
    pub fn prices(&self) -> &[f64] {
        &self.prices
    }
}
