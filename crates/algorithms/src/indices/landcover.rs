//! ESA CCI land cover shared by the vegetation and management indices

use super::IndexContext;
use crate::classify::RemapTable;
use crate::datasets::Dataset;
use crate::graph::RasterExpr;
use aridex_core::{Error, Result};

/// The 34 ESA CCI land cover codes, in matrix order
pub const ESA_CCI_CODES: [f64; 34] = [
    10.0, 11.0, 12.0, 20.0, 30.0, 40.0, 50.0, 60.0, 61.0, 62.0, 70.0, 71.0, 72.0, 80.0, 81.0,
    82.0, 90.0, 100.0, 110.0, 120.0, 121.0, 122.0, 130.0, 140.0, 150.0, 151.0, 152.0, 153.0,
    160.0, 170.0, 180.0, 200.0, 201.0, 202.0,
];

/// Years covered by the land cover stack
pub const FIRST_YEAR: i32 = 1992;
pub const LAST_YEAR: i32 = 2018;

/// Matrix weights are given ×10
pub const MATRIX_DIVISOR: f64 = 10.0;

/// Normalized land cover band for `year`.
pub fn land_cover(ctx: &IndexContext, year: i32) -> Result<RasterExpr> {
    if !(FIRST_YEAR..=LAST_YEAR).contains(&year) {
        return Err(Error::config(
            "land cover",
            format!("year {} outside {}..={}", year, FIRST_YEAR, LAST_YEAR),
        ));
    }
    let stack = ctx.image(Dataset::EsaCciLandCover).clip(&ctx.region);
    Ok(ctx.normalizer.apply(&stack).select(format!("y{}", year)))
}

/// Remap table from a caller's 34-entry weight matrix.
pub fn matrix_table(name: &str, matrix: &[f64]) -> Result<RemapTable> {
    if matrix.len() != ESA_CCI_CODES.len() {
        return Err(Error::config(
            name,
            format!("matrix has {} entries, expected {}", matrix.len(), ESA_CCI_CODES.len()),
        ));
    }
    RemapTable::new(ESA_CCI_CODES.to_vec(), matrix.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aridex_core::{EdgeMode, Region};

    #[test]
    fn test_year_bounds() {
        let ctx = IndexContext::new(Region::rectangle(0.0, 0.0, 1.0, 1.0, EdgeMode::Planar).unwrap());
        assert!(land_cover(&ctx, 1991).is_err());
        assert!(land_cover(&ctx, 2018).is_ok());
    }

    #[test]
    fn test_matrix_length() {
        assert!(matrix_table("drought", &[1.0; 33]).is_err());
        let t = matrix_table("drought", &[12.0; 34]).unwrap();
        assert_eq!(t.lookup(202.0), Some(12.0));
    }
}
