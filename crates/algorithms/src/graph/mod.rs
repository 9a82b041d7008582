//! Declarative raster expression graph
//!
//! Index functions never touch pixels. They build a tree of [`Node`]s
//! through [`RasterExpr`] handles and hand it to an evaluator: the remote
//! platform in production, [`crate::eval::LocalEvaluator`] in tests.
//!
//! Handles are cheap to clone (`Arc`), so a source raster referenced by
//! every rule of a threshold table is one shared subtree, not seven copies.
//! That sharing survives serialization: the wire form is a flat node table
//! where inputs are positions, not nested copies.

mod query;

pub use query::{CollectionQuery, DateRange, Reducer, SceneMask};

use crate::classify::RemapTable;
use aridex_core::{Region, CRS};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Pixel-wise arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Pow,
}

/// Comparison of each pixel against a scalar, yielding 1 or 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn test(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
        }
    }
}

/// Where a reprojection lands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReprojectTarget<I = RasterExpr> {
    /// The grid (CRS, origin and cell size) of another expression
    Like { reference: I },
    /// A CRS, optionally with a new cell size
    Crs { crs: CRS, scale: Option<f64> },
}

/// One factor of a [`Node::WeightedProduct`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedTerm<I = RasterExpr> {
    pub raster: I,
    pub exponent: f64,
}

/// A node of the expression graph.
///
/// `I` is how a node refers to its inputs: a [`RasterExpr`] handle in
/// memory, a position in the node table on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Node<I = RasterExpr> {
    /// A single image asset
    Image { dataset: String },
    /// A filtered, optionally cloud-masked and reduced image collection
    Collection { query: CollectionQuery },
    /// A constant with no grid of its own; it takes the grid it meets
    Constant { value: f64 },
    /// Area of each pixel in m², on the grid it meets
    PixelArea,
    Select { input: I, bands: Vec<String> },
    Rename { input: I, name: String },
    Binary {
        #[serde(rename = "operator")]
        op: BinaryOp,
        lhs: I,
        rhs: I,
    },
    Compare {
        #[serde(rename = "operator")]
        op: CompareOp,
        input: I,
        value: f64,
    },
    And { lhs: I, rhs: I },
    BitwiseAnd { input: I, mask: u64 },
    /// Overwrite `input` with `value` wherever `condition` is non-zero
    Where { input: I, condition: I, value: f64 },
    /// Mask `input` wherever `mask` is zero or masked
    UpdateMask { input: I, mask: I },
    Remap { input: I, table: RemapTable },
    /// `∏ factorᵢ ^ exponentᵢ` with masking for domain errors
    WeightedProduct { terms: Vec<WeightedTerm<I>> },
    /// `(a − b) / (a + b)` over two bands of `input`
    NormalizedDifference { input: I, first: String, second: String },
    /// Terrain aspect in degrees clockwise from north
    Aspect { input: I },
    Clip { input: I, region: Region },
    Reproject { input: I, target: ReprojectTarget<I> },
}

impl<I> Node<I> {
    /// Direct inputs, in field order.
    pub fn inputs(&self) -> Vec<&I> {
        match self {
            Node::Image { .. } | Node::Collection { .. } | Node::Constant { .. } | Node::PixelArea => {
                Vec::new()
            }
            Node::Select { input, .. }
            | Node::Rename { input, .. }
            | Node::Compare { input, .. }
            | Node::BitwiseAnd { input, .. }
            | Node::Remap { input, .. }
            | Node::NormalizedDifference { input, .. }
            | Node::Aspect { input }
            | Node::Clip { input, .. } => vec![input],
            Node::Binary { lhs, rhs, .. } | Node::And { lhs, rhs } => vec![lhs, rhs],
            Node::Where { input, condition, .. } => vec![input, condition],
            Node::UpdateMask { input, mask } => vec![input, mask],
            Node::WeightedProduct { terms } => terms.iter().map(|t| &t.raster).collect(),
            Node::Reproject { input, target } => match target {
                ReprojectTarget::Like { reference } => vec![input, reference],
                ReprojectTarget::Crs { .. } => vec![input],
            },
        }
    }

    /// The same node with every input passed through `f`.
    pub fn try_map_inputs<J, E>(
        &self,
        f: &mut impl FnMut(&I) -> Result<J, E>,
    ) -> Result<Node<J>, E> {
        Ok(match self {
            Node::Image { dataset } => Node::Image {
                dataset: dataset.clone(),
            },
            Node::Collection { query } => Node::Collection {
                query: query.clone(),
            },
            Node::Constant { value } => Node::Constant { value: *value },
            Node::PixelArea => Node::PixelArea,
            Node::Select { input, bands } => Node::Select {
                input: f(input)?,
                bands: bands.clone(),
            },
            Node::Rename { input, name } => Node::Rename {
                input: f(input)?,
                name: name.clone(),
            },
            Node::Binary { op, lhs, rhs } => Node::Binary {
                op: *op,
                lhs: f(lhs)?,
                rhs: f(rhs)?,
            },
            Node::Compare { op, input, value } => Node::Compare {
                op: *op,
                input: f(input)?,
                value: *value,
            },
            Node::And { lhs, rhs } => Node::And {
                lhs: f(lhs)?,
                rhs: f(rhs)?,
            },
            Node::BitwiseAnd { input, mask } => Node::BitwiseAnd {
                input: f(input)?,
                mask: *mask,
            },
            Node::Where {
                input,
                condition,
                value,
            } => Node::Where {
                input: f(input)?,
                condition: f(condition)?,
                value: *value,
            },
            Node::UpdateMask { input, mask } => Node::UpdateMask {
                input: f(input)?,
                mask: f(mask)?,
            },
            Node::Remap { input, table } => Node::Remap {
                input: f(input)?,
                table: table.clone(),
            },
            Node::WeightedProduct { terms } => Node::WeightedProduct {
                terms: terms
                    .iter()
                    .map(|t| {
                        Ok(WeightedTerm {
                            raster: f(&t.raster)?,
                            exponent: t.exponent,
                        })
                    })
                    .collect::<Result<_, E>>()?,
            },
            Node::NormalizedDifference {
                input,
                first,
                second,
            } => Node::NormalizedDifference {
                input: f(input)?,
                first: first.clone(),
                second: second.clone(),
            },
            Node::Aspect { input } => Node::Aspect { input: f(input)? },
            Node::Clip { input, region } => Node::Clip {
                input: f(input)?,
                region: region.clone(),
            },
            Node::Reproject { input, target } => Node::Reproject {
                input: f(input)?,
                target: match target {
                    ReprojectTarget::Like { reference } => ReprojectTarget::Like {
                        reference: f(reference)?,
                    },
                    ReprojectTarget::Crs { crs, scale } => ReprojectTarget::Crs {
                        crs: crs.clone(),
                        scale: *scale,
                    },
                },
            },
        })
    }
}

/// Handle to a node of the expression graph.
///
/// Serializes as a [`GraphTable`]: each distinct node once, so shared
/// subtrees stay shared across a round trip.
#[derive(Debug, Clone)]
pub struct RasterExpr {
    node: Arc<Node>,
}

impl From<Node> for RasterExpr {
    fn from(node: Node) -> Self {
        Self::wrap(node)
    }
}

impl From<&RasterExpr> for RasterExpr {
    fn from(expr: &RasterExpr) -> Self {
        expr.clone()
    }
}

impl From<f64> for RasterExpr {
    fn from(value: f64) -> Self {
        RasterExpr::constant(value)
    }
}

impl RasterExpr {
    // Leaves

    fn wrap(node: Node) -> Self {
        Self { node: Arc::new(node) }
    }

    pub fn image(dataset: impl Into<String>) -> Self {
        Self::wrap(Node::Image {
            dataset: dataset.into(),
        })
    }

    pub fn collection(query: CollectionQuery) -> Self {
        Self::wrap(Node::Collection { query })
    }

    pub fn constant(value: f64) -> Self {
        Self::wrap(Node::Constant { value })
    }

    pub fn pixel_area() -> Self {
        Self::wrap(Node::PixelArea)
    }

    /// Product of each term raised to its exponent.
    pub fn weighted_product(terms: Vec<WeightedTerm>) -> Self {
        Self::wrap(Node::WeightedProduct { terms })
    }

    // Band handling

    pub fn select(&self, band: impl Into<String>) -> Self {
        self.select_bands(vec![band.into()])
    }

    pub fn select_bands(&self, bands: Vec<String>) -> Self {
        Node::Select {
            input: self.clone(),
            bands,
        }
        .into()
    }

    pub fn rename(&self, name: impl Into<String>) -> Self {
        Node::Rename {
            input: self.clone(),
            name: name.into(),
        }
        .into()
    }

    // Arithmetic

    fn binary(&self, op: BinaryOp, rhs: impl Into<RasterExpr>) -> Self {
        Node::Binary {
            op,
            lhs: self.clone(),
            rhs: rhs.into(),
        }
        .into()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(&self, rhs: impl Into<RasterExpr>) -> Self {
        self.binary(BinaryOp::Add, rhs)
    }

    pub fn subtract(&self, rhs: impl Into<RasterExpr>) -> Self {
        self.binary(BinaryOp::Subtract, rhs)
    }

    pub fn multiply(&self, rhs: impl Into<RasterExpr>) -> Self {
        self.binary(BinaryOp::Multiply, rhs)
    }

    pub fn divide(&self, rhs: impl Into<RasterExpr>) -> Self {
        self.binary(BinaryOp::Divide, rhs)
    }

    pub fn pow(&self, rhs: impl Into<RasterExpr>) -> Self {
        self.binary(BinaryOp::Pow, rhs)
    }

    // Comparisons

    pub fn compare(&self, op: CompareOp, value: f64) -> Self {
        Node::Compare {
            op,
            input: self.clone(),
            value,
        }
        .into()
    }

    pub fn lt(&self, value: f64) -> Self {
        self.compare(CompareOp::Lt, value)
    }

    pub fn lte(&self, value: f64) -> Self {
        self.compare(CompareOp::Le, value)
    }

    pub fn gt(&self, value: f64) -> Self {
        self.compare(CompareOp::Gt, value)
    }

    pub fn gte(&self, value: f64) -> Self {
        self.compare(CompareOp::Ge, value)
    }

    pub fn equals(&self, value: f64) -> Self {
        self.compare(CompareOp::Eq, value)
    }

    pub fn not_equals(&self, value: f64) -> Self {
        self.compare(CompareOp::Ne, value)
    }

    pub fn and(&self, rhs: &RasterExpr) -> Self {
        Node::And {
            lhs: self.clone(),
            rhs: rhs.clone(),
        }
        .into()
    }

    pub fn bitwise_and(&self, mask: u64) -> Self {
        Node::BitwiseAnd {
            input: self.clone(),
            mask,
        }
        .into()
    }

    // Masking and remapping

    /// Overwrite with `value` wherever `condition` holds.
    pub fn set_where(&self, condition: &RasterExpr, value: f64) -> Self {
        Node::Where {
            input: self.clone(),
            condition: condition.clone(),
            value,
        }
        .into()
    }

    pub fn update_mask(&self, mask: &RasterExpr) -> Self {
        Node::UpdateMask {
            input: self.clone(),
            mask: mask.clone(),
        }
        .into()
    }

    /// Mask every pixel that is zero (a layer used as its own mask).
    pub fn self_mask(&self) -> Self {
        self.update_mask(self)
    }

    pub fn remap(&self, table: RemapTable) -> Self {
        Node::Remap {
            input: self.clone(),
            table,
        }
        .into()
    }

    // Derived layers

    pub fn normalized_difference(&self, first: impl Into<String>, second: impl Into<String>) -> Self {
        Node::NormalizedDifference {
            input: self.clone(),
            first: first.into(),
            second: second.into(),
        }
        .into()
    }

    pub fn aspect(&self) -> Self {
        Node::Aspect { input: self.clone() }.into()
    }

    // Spatial

    pub fn clip(&self, region: &Region) -> Self {
        Node::Clip {
            input: self.clone(),
            region: region.clone(),
        }
        .into()
    }

    pub fn reproject(&self, target: ReprojectTarget) -> Self {
        Node::Reproject {
            input: self.clone(),
            target,
        }
        .into()
    }

    /// Resample onto the grid of `reference`.
    pub fn reproject_like(&self, reference: &RasterExpr) -> Self {
        self.reproject(ReprojectTarget::Like {
            reference: reference.clone(),
        })
    }

    // Inspection

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Identity of the underlying node, stable for the handle's lifetime.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.node) as usize
    }

    /// Direct inputs of this node, in field order.
    pub fn children(&self) -> Vec<&RasterExpr> {
        self.node().inputs()
    }

    /// Number of distinct nodes reachable from here.
    pub fn node_count(&self) -> usize {
        let mut seen = HashSet::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            if seen.insert(expr.id()) {
                stack.extend(expr.children());
            }
        }
        seen.len()
    }

    /// Dataset ids referenced by the graph, in first-use order.
    pub fn datasets(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.walk(&mut seen, &mut |expr| {
            let id = match expr.node() {
                Node::Image { dataset } => dataset,
                Node::Collection { query } => &query.dataset,
                _ => return,
            };
            if !out.contains(id) {
                out.push(id.clone());
            }
        });
        out
    }

    fn walk<'a>(&'a self, seen: &mut HashSet<usize>, visit: &mut dyn FnMut(&'a RasterExpr)) {
        if !seen.insert(self.id()) {
            return;
        }
        for child in self.children() {
            child.walk(seen, visit);
        }
        visit(self);
    }

    /// Distinct nodes with every input ahead of its users; `self` is last.
    fn post_order(&self) -> Vec<&RasterExpr> {
        let mut order = Vec::new();
        self.walk(&mut HashSet::new(), &mut |expr| order.push(expr));
        order
    }

    fn to_table(&self) -> Result<GraphTable, String> {
        let order = self.post_order();
        let mut index: HashMap<usize, usize> = HashMap::with_capacity(order.len());
        let mut nodes: Vec<Node<usize>> = Vec::with_capacity(order.len());
        for expr in order {
            let node = expr.node().try_map_inputs(&mut |input: &RasterExpr| {
                index
                    .get(&input.id())
                    .copied()
                    .ok_or_else(|| format!("input of node {} visited after its user", nodes.len()))
            })?;
            index.insert(expr.id(), nodes.len());
            nodes.push(node);
        }
        Ok(GraphTable {
            root: nodes.len() - 1,
            nodes,
        })
    }

    /// Pretty JSON of the whole graph
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Wire form of a graph.
///
/// Each distinct node appears once in `nodes`, after every node it
/// reads, and refers to its inputs by position in the table.
#[derive(Debug, Serialize, Deserialize)]
struct GraphTable {
    root: usize,
    nodes: Vec<Node<usize>>,
}

impl GraphTable {
    fn into_expr(self) -> Result<RasterExpr, String> {
        let mut built: Vec<RasterExpr> = Vec::with_capacity(self.nodes.len());
        for (pos, node) in self.nodes.iter().enumerate() {
            let node = node.try_map_inputs(&mut |&input: &usize| {
                built.get(input).cloned().ok_or_else(|| {
                    format!("node {pos} reads node {input}, which does not precede it")
                })
            })?;
            built.push(RasterExpr::wrap(node));
        }
        built
            .get(self.root)
            .cloned()
            .ok_or_else(|| format!("root {} is outside the {} node table", self.root, built.len()))
    }
}

impl Serialize for RasterExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let table = self.to_table().map_err(<S::Error as serde::ser::Error>::custom)?;
        table.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RasterExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        GraphTable::deserialize(deserializer)?
            .into_expr()
            .map_err(serde::de::Error::custom)
    }
}

/// Prints the graph as an expression. Nodes read by more than one
/// other node are bound once as `%n = ...` lines and then referred to
/// by name, so output stays linear in the node count.
impl fmt::Display for RasterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = self.post_order();
        let mut uses: HashMap<usize, usize> = HashMap::new();
        for expr in &order {
            for child in expr.children() {
                *uses.entry(child.id()).or_default() += 1;
            }
        }

        let mut names = HashMap::new();
        for expr in order {
            let shared = uses.get(&expr.id()).is_some_and(|&n| n > 1);
            if expr.id() == self.id() || !shared || expr.children().is_empty() {
                continue;
            }
            let name = format!("%{}", names.len());
            writeln!(f, "{} = {}", name, Inline::full(expr, &names))?;
            names.insert(expr.id(), name);
        }
        write!(f, "{}", Inline::full(self, &names))
    }
}

struct Inline<'a> {
    expr: &'a RasterExpr,
    names: &'a HashMap<usize, String>,
    top: bool,
}

impl<'a> Inline<'a> {
    fn full(expr: &'a RasterExpr, names: &'a HashMap<usize, String>) -> Self {
        Self { expr, names, top: true }
    }

    fn child(&self, expr: &'a RasterExpr) -> Self {
        Self {
            expr,
            names: self.names,
            top: false,
        }
    }
}

impl fmt::Display for Inline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.top {
            if let Some(name) = self.names.get(&self.expr.id()) {
                return f.write_str(name);
            }
        }
        match self.expr.node() {
            Node::Image { dataset } => write!(f, "Image({})", dataset),
            Node::Collection { query } => write!(f, "{}", query),
            Node::Constant { value } => write!(f, "{}", value),
            Node::PixelArea => write!(f, "PixelArea"),
            Node::Select { input, bands } => {
                write!(f, "{}.select({})", self.child(input), bands.join(","))
            }
            Node::Rename { input, name } => write!(f, "{}.rename({})", self.child(input), name),
            Node::Binary { op, lhs, rhs } => {
                write!(f, "({} {:?} {})", self.child(lhs), op, self.child(rhs))
            }
            Node::Compare { op, input, value } => {
                write!(f, "({} {:?} {})", self.child(input), op, value)
            }
            Node::And { lhs, rhs } => write!(f, "({} and {})", self.child(lhs), self.child(rhs)),
            Node::BitwiseAnd { input, mask } => write!(f, "({} & {:#x})", self.child(input), mask),
            Node::Where {
                input,
                condition,
                value,
            } => write!(
                f,
                "{}.where({}, {})",
                self.child(input),
                self.child(condition),
                value
            ),
            Node::UpdateMask { input, mask } => {
                write!(f, "{}.updateMask({})", self.child(input), self.child(mask))
            }
            Node::Remap { input, table } => {
                write!(f, "{}.remap({} codes)", self.child(input), table.len())
            }
            Node::WeightedProduct { terms } => {
                write!(f, "product[")?;
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?;
                    }
                    write!(f, "{}^{:.4}", self.child(&t.raster), t.exponent)?;
                }
                write!(f, "]")
            }
            Node::NormalizedDifference {
                input,
                first,
                second,
            } => write!(
                f,
                "{}.normalizedDifference({}, {})",
                self.child(input),
                first,
                second
            ),
            Node::Aspect { input } => write!(f, "aspect({})", self.child(input)),
            Node::Clip { input, region } => {
                write!(f, "{}.clip({:?})", self.child(input), region.edges())
            }
            Node::Reproject { input, .. } => write!(f, "{}.reproject()", self.child(input)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling_chain(depth: usize) -> RasterExpr {
        let mut expr = RasterExpr::image("x").select("b");
        for _ in 0..depth {
            expr = expr.add(&expr);
        }
        expr
    }

    #[test]
    fn test_shared_subtree_counted_once() {
        let src = RasterExpr::image("WORLDCLIM/V1/BIO").select("bio12");
        let a = src.gt(650.0);
        let b = src.lt(280.0);
        let both = a.and(&b);
        // image, select, two comparisons, and
        assert_eq!(both.node_count(), 5);
    }

    #[test]
    fn test_datasets_first_use_order() {
        let rain = RasterExpr::image("WORLDCLIM/V1/BIO").select("bio12");
        let dem = RasterExpr::image("USGS/SRTMGL1_003");
        let expr = rain.multiply(dem.aspect()).add(rain.clone());
        assert_eq!(expr.datasets(), vec!["WORLDCLIM/V1/BIO", "USGS/SRTMGL1_003"]);
    }

    #[test]
    fn test_graph_serializes_as_node_table() {
        let expr = RasterExpr::image("x").select("b").gte(2.0);
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json["root"], 2);
        let nodes = &json["nodes"];
        assert_eq!(nodes[0]["op"], "image");
        assert_eq!(nodes[0]["dataset"], "x");
        assert_eq!(nodes[1]["op"], "select");
        assert_eq!(nodes[1]["input"], 0);
        assert_eq!(nodes[2]["op"], "compare");
        assert_eq!(nodes[2]["operator"], "ge");
        assert_eq!(nodes[2]["input"], 1);

        let back: RasterExpr = serde_json::from_value(json).unwrap();
        assert_eq!(back.to_string(), expr.to_string());
    }

    #[test]
    fn test_round_trip_keeps_sharing() {
        let src = RasterExpr::image("WORLDCLIM/V1/BIO").select("bio12");
        let classified = RasterExpr::constant(-32768.0)
            .set_where(&src.gt(650.0), 1.0)
            .set_where(&src.lt(280.0), 4.0);
        let expr = classified.update_mask(&classified.not_equals(-32768.0));

        let back: RasterExpr = serde_json::from_str(&serde_json::to_string(&expr).unwrap()).unwrap();
        assert_eq!(back.node_count(), expr.node_count());

        let deep = doubling_chain(24);
        let back: RasterExpr = serde_json::from_str(&serde_json::to_string(&deep).unwrap()).unwrap();
        assert_eq!(back.node_count(), 26);
    }

    #[test]
    fn test_json_size_linear_in_nodes() {
        let short = serde_json::to_string(&doubling_chain(10)).unwrap();
        let long = serde_json::to_string(&doubling_chain(20)).unwrap();
        // twice the nodes; a tree encoding would be 1024 times larger
        assert!(long.len() < 3 * short.len(), "{} vs {}", long.len(), short.len());
    }

    #[test]
    fn test_rejects_forward_and_dangling_refs() {
        let forward = r#"{"root":1,"nodes":[
            {"op":"select","input":1,"bands":["b"]},
            {"op":"image","dataset":"x"}]}"#;
        let err = serde_json::from_str::<RasterExpr>(forward).unwrap_err();
        assert!(err.to_string().contains("does not precede"), "{}", err);

        let cycle = r#"{"root":0,"nodes":[{"op":"aspect","input":0}]}"#;
        assert!(serde_json::from_str::<RasterExpr>(cycle).is_err());

        let bad_root = r#"{"root":3,"nodes":[{"op":"image","dataset":"x"}]}"#;
        assert!(serde_json::from_str::<RasterExpr>(bad_root).is_err());
    }

    #[test]
    fn test_display_is_readable() {
        let expr = RasterExpr::image("x").select("b").multiply(1000.0);
        assert_eq!(expr.to_string(), "(Image(x).select(b) Multiply 1000)");
    }

    #[test]
    fn test_display_names_shared_nodes() {
        let src = RasterExpr::image("x").select("b");
        let expr = src.gt(1.0).and(&src.lt(5.0));
        assert_eq!(
            expr.to_string(),
            "%0 = Image(x).select(b)\n((%0 Gt 1) and (%0 Lt 5))"
        );

        let text = doubling_chain(30).to_string();
        assert!(text.len() < 2_000, "{} bytes", text.len());
    }
}
