//! Row iteration that is parallel with the `parallel` feature and
//! sequential without it.
//!
//! The default build is single-threaded; pixel loops are written once
//! against `into_par_iter()` and resolve to either rayon or plain iterators.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Stand-in for rayon's `IntoParallelIterator` that just calls `into_iter()`.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;

/// Evaluate `f(row, col)` for every cell, row-major.
pub(crate) fn map_cells<F>(rows: usize, cols: usize, f: F) -> Vec<f64>
where
    F: Fn(usize, usize) -> f64 + Sync + Send,
{
    (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                *cell = f(row, col);
            }
            row_data
        })
        .collect()
}
