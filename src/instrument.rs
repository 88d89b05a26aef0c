use crate::errors::{StrategyError, StrategyResult};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

/// Day-count basis for compounding the risk-free leg.
pub const RISK_FREE_DAY_BASIS: f64 = 360.0;

// ── Instrument Kind ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    #[serde(alias = "Call")]
    Call,
    #[serde(alias = "Put")]
    Put,
    #[serde(alias = "Equity")]
    Equity,
    #[serde(alias = "RiskFree")]
    RiskFree,
}

impl InstrumentKind {
    /// Whether an expired position of this kind is meaningless.
    #[inline]
    pub fn requires_expiry(self) -> bool {
        !matches!(self, Self::Equity)
    }
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "Call"),
            Self::Put => write!(f, "Put"),
            Self::Equity => write!(f, "Equity"),
            Self::RiskFree => write!(f, "RiskFree"),
        }
    }
}

// ── Raw input record ──

/// One leg as it appears in a strategy file. Everything except `kind` is
/// optional here so that missing fields surface as configuration errors
/// naming the leg, not as opaque parse errors.
#[derive(Debug, Clone, Deserialize)]
pub struct LegRecord {
    pub kind: InstrumentKind,
    #[serde(default)]
    pub strike: Option<f64>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_value: Option<f64>,
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
    #[serde(default)]
    pub label: Option<String>,
}

// ── Instrument ──

/// A strategy leg with its expiry reduced to a day count.
/// For `RiskFree`, `strike` is an annualized rate until normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub kind: InstrumentKind,
    pub strike: f64,
    pub quantity: f64,
    pub unit_value: f64,
    pub days_to_expiry: Option<i64>,
    pub label: String,
}

impl Instrument {
    pub fn new(
        kind: InstrumentKind,
        strike: f64,
        quantity: f64,
        unit_value: f64,
        days_to_expiry: Option<i64>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            strike,
            quantity,
            unit_value,
            days_to_expiry,
            label: label.into(),
        }
    }

    /// Validate a raw record and turn its expiry date into whole days
    /// from `valuation_time`. The absolute date is not kept.
    pub fn from_record(record: &LegRecord, valuation_time: NaiveDateTime) -> StrategyResult<Self> {
        let label = record
            .label
            .clone()
            .ok_or_else(|| missing(record.kind, "<unlabelled>", "label"))?;

        let quantity = record
            .quantity
            .ok_or_else(|| missing(record.kind, &label, "quantity"))?;
        let unit_value = record
            .unit_value
            .ok_or_else(|| missing(record.kind, &label, "unit_value"))?;

        let strike = match (record.kind, record.strike) {
            (_, Some(strike)) => strike,
            // An equity leg has no contractual strike; its entry price anchors the grid.
            (InstrumentKind::Equity, None) => unit_value,
            (kind, None) => return Err(missing(kind, &label, "strike")),
        };

        let days_to_expiry = match record.expiry {
            Some(expiry) => Some(days_until(expiry, valuation_time)),
            None if record.kind.requires_expiry() => {
                return Err(missing(record.kind, &label, "expiry"))
            }
            None => None,
        };

        for (field, value) in [("strike", strike), ("quantity", quantity), ("unit_value", unit_value)] {
            if !value.is_finite() {
                return Err(StrategyError::Configuration(format!(
                    "{} leg '{label}': {field} is not a finite number",
                    record.kind
                )));
            }
        }

        Ok(Self::new(record.kind, strike, quantity, unit_value, days_to_expiry, label))
    }

    /// Signed cash outflow to establish the leg (positive = debit).
    #[inline]
    pub fn cost(&self) -> f64 {
        self.unit_value * self.quantity
    }

    /// Resolve the strike used for payoff evaluation and fix the cost.
    ///
    /// RiskFree: K' = unit_value * (1 + rate)^(days / 360)
    /// Others:   K' = strike
    ///
    /// Pure function. `days_to_expiry` does not survive this step.
    pub fn normalize(&self) -> StrategyResult<NormalizedLeg> {
        if self.kind.requires_expiry() {
            match self.days_to_expiry {
                None => return Err(missing(self.kind, &self.label, "expiry")),
                Some(days) if days < 0 => {
                    return Err(StrategyError::Configuration(format!(
                        "{} leg '{}' expired {} day(s) ago",
                        self.kind,
                        self.label,
                        -days
                    )))
                }
                Some(_) => {}
            }
        }

        let strike = match self.kind {
            InstrumentKind::RiskFree => {
                let days = self.days_to_expiry.unwrap_or_default() as f64;
                self.unit_value * (1.0 + self.strike).powf(days / RISK_FREE_DAY_BASIS)
            }
            InstrumentKind::Call | InstrumentKind::Put | InstrumentKind::Equity => self.strike,
        };

        if !strike.is_finite() {
            return Err(StrategyError::Configuration(format!(
                "{} leg '{}': normalized strike is not finite",
                self.kind, self.label
            )));
        }

        Ok(NormalizedLeg {
            kind: self.kind,
            strike,
            quantity: self.quantity,
            cost: self.cost(),
            label: self.label.clone(),
        })
    }
}

/// Whole days from `valuation_time` to midnight at the start of `expiry`, floored.
/// An expiry later on the valuation day itself is already -1.
pub fn days_until(expiry: NaiveDate, valuation_time: NaiveDateTime) -> i64 {
    let remaining = expiry.and_time(NaiveTime::MIN) - valuation_time;
    let days = remaining.num_days();
    // num_days truncates toward zero
    if remaining < Duration::days(days) {
        days - 1
    } else {
        days
    }
}

fn missing(kind: InstrumentKind, label: &str, field: &str) -> StrategyError {
    StrategyError::Configuration(format!("{kind} leg '{label}' is missing {field}"))
}

// ── Normalized leg ──

/// A leg ready for grid evaluation. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLeg {
    pub kind: InstrumentKind,
    pub strike: f64,
    pub quantity: f64,
    pub cost: f64,
    pub label: String,
}

impl NormalizedLeg {
    /// Chart series name: `[qty] Kind (label)`.
    pub fn series_name(&self) -> String {
        format!("[{}] {} ({})", format_quantity(self.quantity), self.kind, self.label)
    }
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 && quantity.abs() < 1e15 {
        format!("{}", quantity as i64)
    } else {
        format!("{quantity}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_time(NaiveTime::MIN)
    }

    fn at(y: i32, m: u32, d: u32, hour: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(hour, 0, 0).unwrap()
    }

    fn record(kind: InstrumentKind) -> LegRecord {
        LegRecord {
            kind,
            strike: Some(100.0),
            quantity: Some(1.0),
            unit_value: Some(5.0),
            expiry: Some(date(2024, 2, 1)),
            label: Some("X".into()),
        }
    }

    #[test]
    fn test_days_from_expiry_date() {
        let inst = Instrument::from_record(&record(InstrumentKind::Call), midnight(2024, 1, 2)).unwrap();
        assert_eq!(inst.days_to_expiry, Some(30));
        assert_eq!(inst.cost(), 5.0);
    }

    #[test]
    fn test_days_floor_on_time_of_day() {
        let expiry = date(2024, 2, 1);
        assert_eq!(days_until(expiry, midnight(2024, 1, 2)), 30);
        assert_eq!(days_until(expiry, at(2024, 1, 2, 10)), 29);
        assert_eq!(days_until(expiry, at(2024, 1, 31, 23)), 0);
        assert_eq!(days_until(expiry, midnight(2024, 2, 1)), 0);
        assert_eq!(days_until(expiry, at(2024, 2, 1, 0) + Duration::seconds(1)), -1);
        assert_eq!(days_until(expiry, at(2024, 2, 3, 12)), -3);
    }

    #[test]
    fn test_option_expiring_on_valuation_day() {
        let mut rec = record(InstrumentKind::Call);
        rec.expiry = Some(date(2024, 1, 2));

        let intraday = Instrument::from_record(&rec, at(2024, 1, 2, 10)).unwrap();
        assert_eq!(intraday.days_to_expiry, Some(-1));
        assert!(
            matches!(intraday.normalize(), Err(StrategyError::Configuration(_))),
            "an option expiring earlier today is already expired"
        );

        let at_open = Instrument::from_record(&rec, midnight(2024, 1, 2)).unwrap();
        assert_eq!(at_open.days_to_expiry, Some(0));
        assert!(at_open.normalize().is_ok());
    }

    #[test]
    fn test_risk_free_compounds_over_floored_days() {
        let mut rec = record(InstrumentKind::RiskFree);
        rec.strike = Some(0.10);
        rec.unit_value = Some(1000.0);
        rec.expiry = Some(date(2024, 12, 27));

        let leg = Instrument::from_record(&rec, at(2024, 1, 2, 9)).unwrap();
        assert_eq!(leg.days_to_expiry, Some(359));
        let strike = leg.normalize().unwrap().strike;
        let expected = 1000.0 * 1.1_f64.powf(359.0 / 360.0);
        assert!((strike - expected).abs() < 1e-9, "strike {strike} vs {expected}");
    }

    #[test]
    fn test_risk_free_compounding() {
        let inst = Instrument::new(InstrumentKind::RiskFree, 0.10, 2.0, 1000.0, Some(360), "CDB");
        let leg = inst.normalize().unwrap();
        assert!((leg.strike - 1100.0).abs() < 1e-9, "one 360-day year at 10%: {}", leg.strike);
        assert_eq!(leg.cost, 2000.0);
    }

    #[test]
    fn test_risk_free_zero_days_keeps_principal() {
        let inst = Instrument::new(InstrumentKind::RiskFree, 0.13, 1.0, 500.0, Some(0), "T");
        assert_eq!(inst.normalize().unwrap().strike, 500.0);
    }

    #[test]
    fn test_non_risk_free_strike_unchanged() {
        for kind in [InstrumentKind::Call, InstrumentKind::Put, InstrumentKind::Equity] {
            let inst = Instrument::new(kind, 42.5, -3.0, 1.2, Some(10), "L");
            let leg = inst.normalize().unwrap();
            assert_eq!(leg.strike, 42.5);
            assert!((leg.cost - -3.6).abs() < 1e-12, "short leg is a credit: {}", leg.cost);
        }
    }

    #[test]
    fn test_expired_option_rejected() {
        let inst = Instrument::new(InstrumentKind::Put, 100.0, 1.0, 2.0, Some(-1), "P");
        assert!(matches!(inst.normalize(), Err(StrategyError::Configuration(_))));
    }

    #[test]
    fn test_expired_equity_is_fine() {
        let inst = Instrument::new(InstrumentKind::Equity, 100.0, 1.0, 100.0, Some(-5), "S");
        assert!(inst.normalize().is_ok());
    }

    #[test]
    fn test_risk_free_missing_fields_rejected() {
        let mut rec = record(InstrumentKind::RiskFree);
        rec.unit_value = None;
        assert!(matches!(
            Instrument::from_record(&rec, midnight(2024, 1, 1)),
            Err(StrategyError::Configuration(_))
        ));

        let mut rec = record(InstrumentKind::RiskFree);
        rec.strike = None;
        assert!(Instrument::from_record(&rec, midnight(2024, 1, 1)).is_err());

        let mut rec = record(InstrumentKind::RiskFree);
        rec.expiry = None;
        assert!(Instrument::from_record(&rec, midnight(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_equity_strike_defaults_to_unit_value() {
        let mut rec = record(InstrumentKind::Equity);
        rec.strike = None;
        rec.expiry = None;
        rec.unit_value = Some(37.0);
        let inst = Instrument::from_record(&rec, midnight(2024, 1, 1)).unwrap();
        assert_eq!(inst.strike, 37.0);
        assert_eq!(inst.days_to_expiry, None);
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut rec = record(InstrumentKind::Call);
        rec.strike = Some(f64::NAN);
        assert!(Instrument::from_record(&rec, midnight(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_series_name() {
        let leg = Instrument::new(InstrumentKind::Call, 100.0, -1.0, 5.0, Some(3), "PETR4")
            .normalize()
            .unwrap();
        assert_eq!(leg.series_name(), "[-1] Call (PETR4)");

        let leg = Instrument::new(InstrumentKind::Equity, 10.0, 0.5, 10.0, None, "VALE3")
            .normalize()
            .unwrap();
        assert_eq!(leg.series_name(), "[0.5] Equity (VALE3)");
    }

    #[test]
    fn test_kind_deserializes_both_cases() {
        let a: InstrumentKind = serde_json::from_str("\"risk_free\"").unwrap();
        let b: InstrumentKind = serde_json::from_str("\"RiskFree\"").unwrap();
        assert_eq!(a, InstrumentKind::RiskFree);
        assert_eq!(b, InstrumentKind::RiskFree);
    }
}
