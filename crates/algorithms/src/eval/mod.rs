//! Local reference evaluator
//!
//! Evaluates an expression graph against materialised rasters with the
//! masking rules of the remote platform: a masked pixel is NaN, arithmetic
//! and comparisons keep it masked, grid-less values (constants, pixel area)
//! broadcast onto the image they meet, and images on different grids are
//! never combined implicitly.

mod catalog;
mod collection;
mod pixel;
mod spatial;

pub use catalog::MemoryCatalog;

use crate::graph::{BinaryOp, Node, RasterExpr, ReprojectTarget};
use aridex_core::{Error, Image, Result};
use chrono::NaiveDate;
use pixel::Value;
use std::collections::HashMap;
use tracing::debug;

/// One dated image of a collection
#[derive(Debug, Clone)]
pub struct Scene {
    pub date: NaiveDate,
    pub image: Image,
}

/// Source of the datasets a graph names.
pub trait DatasetProvider {
    fn image(&self, id: &str) -> Result<Image>;

    /// Every scene of a collection, in any order.
    fn collection(&self, id: &str) -> Result<Vec<Scene>>;
}

/// Memo of evaluated nodes, keyed by node identity
type Memo = HashMap<usize, Value>;

pub struct LocalEvaluator<'a, P: DatasetProvider + ?Sized> {
    provider: &'a P,
}

impl<'a, P: DatasetProvider + ?Sized> LocalEvaluator<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Evaluate `expr` to an image. Shared subtrees are evaluated once.
    pub fn evaluate(&self, expr: &RasterExpr) -> Result<Image> {
        debug!("evaluating graph of {} nodes", expr.node_count());
        let mut memo = Memo::new();
        self.eval(expr, &mut memo)?.into_image("the graph root")
    }

    /// Evaluate a graph that reduces to one value, such as a constant.
    pub fn evaluate_scalar(&self, expr: &RasterExpr) -> Result<f64> {
        match self.eval(expr, &mut Memo::new())? {
            Value::Constant(v) => Ok(v),
            _ => Err(Error::Other("graph does not reduce to a scalar".into())),
        }
    }

    fn eval(&self, expr: &RasterExpr, memo: &mut Memo) -> Result<Value> {
        if let Some(hit) = memo.get(&expr.id()) {
            return Ok(hit.clone());
        }
        let value = self.eval_node(expr.node(), memo)?;
        memo.insert(expr.id(), value.clone());
        Ok(value)
    }

    fn eval_node(&self, node: &Node, memo: &mut Memo) -> Result<Value> {
        let value = match node {
            Node::Image { dataset } => Value::Image(self.provider.image(dataset)?),
            Node::Collection { query } => {
                let scenes = self.provider.collection(&query.dataset)?;
                Value::Image(collection::reduce(scenes, query)?)
            }
            Node::Constant { value } => Value::Constant(*value),
            Node::PixelArea => Value::PixelArea,

            Node::Select { input, bands } => {
                Value::Image(self.eval(input, memo)?.into_image("select")?.select(bands)?)
            }
            Node::Rename { input, name } => match self.eval(input, memo)? {
                Value::Image(image) => Value::Image(image.renamed(name)),
                other => other,
            },

            Node::Binary { op, lhs, rhs } => {
                let (a, b) = (self.eval(lhs, memo)?, self.eval(rhs, memo)?);
                let op = *op;
                pixel::zip_values(a, b, move |x, y| arithmetic(op, x, y))?
            }
            Node::Compare { op, input, value } => {
                let (op, rhs) = (*op, *value);
                pixel::map_value(self.eval(input, memo)?, move |x| {
                    if x.is_nan() {
                        f64::NAN
                    } else {
                        f64::from(u8::from(op.test(x, rhs)))
                    }
                })?
            }
            Node::And { lhs, rhs } => {
                let (a, b) = (self.eval(lhs, memo)?, self.eval(rhs, memo)?);
                pixel::zip_values(a, b, |x, y| {
                    if x.is_nan() || y.is_nan() {
                        f64::NAN
                    } else {
                        f64::from(u8::from(x != 0.0 && y != 0.0))
                    }
                })?
            }
            Node::BitwiseAnd { input, mask } => {
                let mask = *mask;
                pixel::map_value(self.eval(input, memo)?, move |x| {
                    if x.is_nan() {
                        f64::NAN
                    } else {
                        ((x as i64 as u64) & mask) as f64
                    }
                })?
            }

            Node::Where {
                input,
                condition,
                value,
            } => {
                let (base, cond) = (self.eval(input, memo)?, self.eval(condition, memo)?);
                let replacement = *value;
                pixel::zip_values(base, cond, move |x, c| {
                    if x.is_nan() {
                        x
                    } else if !c.is_nan() && c != 0.0 {
                        replacement
                    } else {
                        x
                    }
                })?
            }
            Node::UpdateMask { input, mask } => {
                let (base, mask) = (self.eval(input, memo)?, self.eval(mask, memo)?);
                pixel::zip_values(base, mask, |x, m| {
                    if m.is_nan() || m == 0.0 {
                        f64::NAN
                    } else {
                        x
                    }
                })?
            }
            Node::Remap { input, table } => pixel::remap(self.eval(input, memo)?, table)?,
            Node::WeightedProduct { terms } => {
                let values = terms
                    .iter()
                    .map(|t| Ok((self.eval(&t.raster, memo)?, t.exponent)))
                    .collect::<Result<Vec<_>>>()?;
                pixel::weighted_product(values)?
            }
            Node::NormalizedDifference {
                input,
                first,
                second,
            } => {
                let image = self.eval(input, memo)?.into_image("normalized difference")?;
                Value::Image(pixel::normalized_difference(&image, first, second)?)
            }
            Node::Aspect { input } => {
                let dem = self.eval(input, memo)?.into_image("aspect")?;
                Value::Image(Image::single("aspect", spatial::aspect(dem.first())?))
            }

            Node::Clip { input, region } => match self.eval(input, memo)? {
                Value::Image(image) => {
                    Value::Image(image.map_bands(|r| spatial::clip(r, region))?)
                }
                // Clipping a grid-less value is deferred to the grid it meets.
                other => other,
            },
            Node::Reproject { input, target } => {
                let image = match self.eval(input, memo)? {
                    Value::Image(image) => image,
                    // A grid-less value already fits any grid.
                    other => return Ok(other),
                };
                match target {
                    ReprojectTarget::Like { reference } => {
                        let reference = self.eval(reference, memo)?.into_image("reprojection reference")?;
                        let grid = reference.first();
                        Value::Image(image.map_bands(|r| spatial::resample_like(r, grid))?)
                    }
                    ReprojectTarget::Crs { crs, scale } => {
                        let src = image.first();
                        if !aridex_core::crs::compatible(src.crs(), Some(crs)) {
                            return Err(spatial::crs_mismatch(src.crs(), Some(crs)));
                        }
                        match scale {
                            Some(scale) => Value::Image(image.map_bands(|r| spatial::rescale(r, *scale))?),
                            None => Value::Image(image),
                        }
                    }
                }
            }
        };
        Ok(value)
    }
}

fn arithmetic(op: BinaryOp, x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        return f64::NAN;
    }
    let out = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Subtract => x - y,
        BinaryOp::Multiply => x * y,
        BinaryOp::Divide => {
            if y == 0.0 {
                return f64::NAN;
            }
            x / y
        }
        BinaryOp::Pow => x.powf(y),
    };
    if out.is_finite() {
        out
    } else {
        f64::NAN
    }
}
