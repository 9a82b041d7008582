//! Area path: mask × pixel area
//!
//! The forest layers report area directly. A 0/1 mask is multiplied by the
//! area of each pixel and zero cells are masked, so summing the output over
//! a region gives the covered area in m².

use crate::graph::RasterExpr;

/// Area in m² of each pixel where `mask` is 1; masked elsewhere.
pub fn area_of(mask: &RasterExpr) -> RasterExpr {
    mask.multiply(RasterExpr::pixel_area()).self_mask()
}
