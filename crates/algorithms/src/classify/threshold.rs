//! Ordered threshold classification
//!
//! A [`ThresholdTable`] turns a continuous raster into class values. Rules
//! are applied as successive overwrites, so where several rules match a
//! pixel the LAST one in table order decides. Each rule carries its own
//! interval edges; nothing assumes a `[min, max)` convention.

use crate::graph::RasterExpr;
use aridex_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether an interval edge includes its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub value: f64,
    pub edge: Edge,
}

impl Bound {
    pub fn open(value: f64) -> Self {
        Self {
            value,
            edge: Edge::Open,
        }
    }

    pub fn closed(value: f64) -> Self {
        Self {
            value,
            edge: Edge::Closed,
        }
    }
}

/// A possibly half-unbounded interval over pixel values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<Bound>,
}

impl Interval {
    /// `x < value`
    pub fn lt(value: f64) -> Self {
        Self {
            lower: None,
            upper: Some(Bound::open(value)),
        }
    }

    /// `x <= value`
    pub fn le(value: f64) -> Self {
        Self {
            lower: None,
            upper: Some(Bound::closed(value)),
        }
    }

    /// `x > value`
    pub fn gt(value: f64) -> Self {
        Self {
            lower: Some(Bound::open(value)),
            upper: None,
        }
    }

    /// `x >= value`
    pub fn ge(value: f64) -> Self {
        Self {
            lower: Some(Bound::closed(value)),
            upper: None,
        }
    }

    pub fn between(lower: Bound, upper: Bound) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    /// `[lo, hi]`
    pub fn closed(lo: f64, hi: f64) -> Self {
        Self::between(Bound::closed(lo), Bound::closed(hi))
    }

    /// `[lo, hi)`
    pub fn half_open(lo: f64, hi: f64) -> Self {
        Self::between(Bound::closed(lo), Bound::open(hi))
    }

    /// `(lo, hi]`
    pub fn left_open(lo: f64, hi: f64) -> Self {
        Self::between(Bound::open(lo), Bound::closed(hi))
    }

    pub fn contains(&self, x: f64) -> bool {
        if x.is_nan() {
            return false;
        }
        let above = match self.lower {
            None => true,
            Some(Bound { value, edge: Edge::Open }) => x > value,
            Some(Bound { value, edge: Edge::Closed }) => x >= value,
        };
        let below = match self.upper {
            None => true,
            Some(Bound { value, edge: Edge::Open }) => x < value,
            Some(Bound { value, edge: Edge::Closed }) => x <= value,
        };
        above && below
    }

    /// Reject intervals that could never be compared or never match.
    pub fn validate(&self) -> Result<()> {
        let bounds = [self.lower, self.upper];
        if bounds.iter().all(Option::is_none) {
            return Err(Error::config("threshold rule", "interval has no bounds"));
        }
        for bound in bounds.iter().flatten() {
            if !bound.value.is_finite() {
                return Err(Error::config(
                    "threshold rule",
                    format!("bound {} is not comparable", bound.value),
                ));
            }
        }
        if let (Some(lo), Some(hi)) = (self.lower, self.upper) {
            let empty = lo.value > hi.value
                || (lo.value == hi.value && (lo.edge == Edge::Open || hi.edge == Edge::Open));
            if empty {
                return Err(Error::config("threshold rule", format!("interval {} is empty", self)));
            }
        }
        Ok(())
    }

    /// Graph node that is 1 where `source` falls inside the interval.
    pub fn predicate(&self, source: &RasterExpr) -> RasterExpr {
        let lower = self.lower.map(|b| match b.edge {
            Edge::Open => source.gt(b.value),
            Edge::Closed => source.gte(b.value),
        });
        let upper = self.upper.map(|b| match b.edge {
            Edge::Open => source.lt(b.value),
            Edge::Closed => source.lte(b.value),
        });
        match (lower, upper) {
            (Some(lo), Some(hi)) => lo.and(&hi),
            (Some(one), None) | (None, Some(one)) => one,
            // validate() rejects this; an unbounded interval matches everything
            (None, None) => RasterExpr::constant(1.0),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lower {
            Some(Bound { value, edge: Edge::Closed }) => write!(f, "[{}", value)?,
            Some(Bound { value, edge: Edge::Open }) => write!(f, "({}", value)?,
            None => write!(f, "(-inf")?,
        }
        match self.upper {
            Some(Bound { value, edge: Edge::Closed }) => write!(f, ", {}]", value),
            Some(Bound { value, edge: Edge::Open }) => write!(f, ", {})", value),
            None => write!(f, ", inf)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub interval: Interval,
    pub class: f64,
}

impl ThresholdRule {
    pub fn new(interval: Interval, class: f64) -> Self {
        Self { interval, class }
    }
}

/// Ordered rule list; the last matching rule wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ThresholdRule>", into = "Vec<ThresholdRule>")]
pub struct ThresholdTable {
    rules: Vec<ThresholdRule>,
}

impl TryFrom<Vec<ThresholdRule>> for ThresholdTable {
    type Error = Error;

    fn try_from(rules: Vec<ThresholdRule>) -> Result<Self> {
        Self::new(rules)
    }
}

impl From<ThresholdTable> for Vec<ThresholdRule> {
    fn from(table: ThresholdTable) -> Self {
        table.rules
    }
}

impl ThresholdTable {
    pub fn new(rules: Vec<ThresholdRule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(Error::config("threshold table", "no rules"));
        }
        for (i, rule) in rules.iter().enumerate() {
            rule.interval.validate().map_err(|e| match e {
                Error::Configuration { reason, .. } => {
                    Error::config(format!("threshold rule {}", i), reason)
                }
                other => other,
            })?;
            if !rule.class.is_finite() {
                return Err(Error::config(
                    format!("threshold rule {}", i),
                    "class value must be finite",
                ));
            }
        }
        Ok(Self { rules })
    }

    /// Build from `(interval, class)` pairs.
    pub fn from_pairs(pairs: &[(Interval, f64)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(interval, class)| ThresholdRule::new(interval, class))
                .collect(),
        )
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    /// Class of a scalar, or `None` when no rule matches.
    pub fn class_of(&self, x: f64) -> Option<f64> {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.interval.contains(x))
            .map(|rule| rule.class)
    }

    /// Like [`class_of`](Self::class_of) but unmatched values are an error.
    pub fn classify_scalar(&self, context: &str, x: f64) -> Result<f64> {
        self.class_of(x)
            .ok_or_else(|| Error::config(context, format!("{} matches no rule", x)))
    }

    /// Classify `source` into a raster of class values.
    ///
    /// Every pixel starts at `sentinel` and is overwritten by each matching
    /// rule in order. Pixels still at `sentinel` afterwards (no match, or a
    /// masked source) are masked out.
    pub fn classify(&self, source: &RasterExpr, sentinel: f64) -> Result<RasterExpr> {
        if let Some(rule) = self.rules.iter().find(|r| r.class == sentinel) {
            return Err(Error::config(
                "threshold table",
                format!("class {} collides with the no-data sentinel", rule.class),
            ));
        }
        let classified = self
            .rules
            .iter()
            .fold(RasterExpr::constant(sentinel), |acc, rule| {
                acc.set_where(&rule.interval.predicate(source), rule.class)
            });
        Ok(classified.update_mask(&classified.not_equals(sentinel)))
    }
}
