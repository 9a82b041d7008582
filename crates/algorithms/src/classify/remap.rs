//! Categorical remapping
//!
//! Replace each categorical code with the weight paired to it. Codes the
//! table does not list are handled by the table's [`MissPolicy`].

use crate::graph::RasterExpr;
use aridex_core::{Error, Result};
use serde::{Deserialize, Serialize};

const CODE_TOLERANCE: f64 = 1e-9;

/// What an unmapped code turns into
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissPolicy {
    /// Mask the pixel out
    #[default]
    Mask,
    /// Abort evaluation with [`Error::RemapMiss`]
    Fail,
    /// Write a fixed value
    Fill { value: f64 },
}

/// Index-aligned `codes → values` lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRemapTable")]
pub struct RemapTable {
    codes: Vec<f64>,
    values: Vec<f64>,
    #[serde(default)]
    miss: MissPolicy,
}

#[derive(Deserialize)]
struct RawRemapTable {
    codes: Vec<f64>,
    values: Vec<f64>,
    #[serde(default)]
    miss: MissPolicy,
}

impl TryFrom<RawRemapTable> for RemapTable {
    type Error = Error;

    fn try_from(raw: RawRemapTable) -> Result<Self> {
        Ok(RemapTable::new(raw.codes, raw.values)?.with_miss_policy(raw.miss))
    }
}

impl RemapTable {
    pub fn new(codes: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if codes.len() != values.len() {
            return Err(Error::config(
                "remap table",
                format!("{} codes but {} values", codes.len(), values.len()),
            ));
        }
        if codes.is_empty() {
            return Err(Error::config("remap table", "no entries"));
        }
        if let Some(bad) = codes.iter().chain(&values).find(|v| !v.is_finite()) {
            return Err(Error::config("remap table", format!("{} is not a number", bad)));
        }
        for (i, code) in codes.iter().enumerate() {
            if codes[..i].iter().any(|c| (c - code).abs() < CODE_TOLERANCE) {
                return Err(Error::config("remap table", format!("code {} listed twice", code)));
            }
        }
        Ok(Self {
            codes,
            values,
            miss: MissPolicy::Mask,
        })
    }

    /// Build a table whose values are divided by `divisor`.
    pub fn scaled(codes: Vec<f64>, values: &[f64], divisor: f64) -> Result<Self> {
        if divisor == 0.0 || !divisor.is_finite() {
            return Err(Error::config("remap table", format!("divisor {} is unusable", divisor)));
        }
        Self::new(codes, values.iter().map(|v| v / divisor).collect())
    }

    pub fn with_miss_policy(mut self, miss: MissPolicy) -> Self {
        self.miss = miss;
        self
    }

    pub fn miss_policy(&self) -> MissPolicy {
        self.miss
    }

    pub fn codes(&self) -> &[f64] {
        &self.codes
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Value paired with `code`, if listed.
    pub fn lookup(&self, code: f64) -> Option<f64> {
        self.codes
            .iter()
            .position(|c| (c - code).abs() < CODE_TOLERANCE)
            .map(|i| self.values[i])
    }

    /// Apply the miss policy: `Ok(None)` means the pixel is masked.
    pub fn resolve(&self, code: f64) -> Result<Option<f64>> {
        match self.lookup(code) {
            Some(v) => Ok(Some(v)),
            None => match self.miss {
                MissPolicy::Mask => Ok(None),
                MissPolicy::Fill { value } => Ok(Some(value)),
                MissPolicy::Fail => Err(Error::RemapMiss { code }),
            },
        }
    }

    pub fn apply(&self, source: &RasterExpr) -> RasterExpr {
        source.remap(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture_table() -> RemapTable {
        let codes = (1..=13).map(f64::from).collect();
        let values = vec![1.0, 1.0, 1.2, 1.2, 1.4, 1.4, 1.6, 1.6, 1.8, 1.8, 2.0, 2.0, 2.0];
        RemapTable::new(codes, values).unwrap()
    }

    #[test]
    fn test_code_maps_to_paired_value() {
        let table = texture_table();
        assert_eq!(table.lookup(5.0), Some(table.values()[4]));
        assert_eq!(table.lookup(13.0), Some(2.0));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = RemapTable::new(vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_duplicate_codes_rejected() {
        assert!(RemapTable::new(vec![1.0, 1.0], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_miss_policies() {
        let table = texture_table();
        assert_eq!(table.resolve(14.0).unwrap(), None);

        let filled = table.clone().with_miss_policy(MissPolicy::Fill { value: 0.0 });
        assert_eq!(filled.resolve(14.0).unwrap(), Some(0.0));

        let strict = table.with_miss_policy(MissPolicy::Fail);
        match strict.resolve(14.0) {
            Err(Error::RemapMiss { code }) => assert_eq!(code, 14.0),
            other => panic!("expected remap miss, got {:?}", other),
        }
    }

    #[test]
    fn test_scaled_values() {
        let table = RemapTable::scaled(vec![10.0, 20.0], &[12.0, 20.0], 10.0).unwrap();
        assert_eq!(table.lookup(10.0), Some(1.2));
        assert!(RemapTable::scaled(vec![10.0], &[12.0], 0.0).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok = r#"{"codes":[1,2],"values":[2,1.4],"miss":{"kind":"fill","value":1}}"#;
        let table: RemapTable = serde_json::from_str(ok).unwrap();
        assert_eq!(table.miss_policy(), MissPolicy::Fill { value: 1.0 });

        let bad = r#"{"codes":[1,2,3],"values":[2,1.4]}"#;
        assert!(serde_json::from_str::<RemapTable>(bad).is_err());
    }
}
