use itertools::iproduct;
use nalgebra::{DMatrix, DVector};
use std::ops::Range;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::{PartitionError, PartitionedVector, Partitioning};

/// A dense matrix split into a grid of tiles.
///
/// Tile `(r, c)` has `rows.size(r)` rows and `cols.size(c)` columns.
///
/// # Example
///
/// ```
/// # use partgp::partition::PartitionedMatrix;
/// use nalgebra::DMatrix;
///
/// let dense = DMatrix::from_fn(5, 4, |i, j| (i * 4 + j) as f64);
/// let mat = PartitionedMatrix::from_dense(&dense, 2, 3).unwrap();
///
/// assert_eq!(mat.n_row_blocks(), 3);
/// assert_eq!(mat.n_col_blocks(), 2);
/// assert_eq!(mat.tile(2, 1).shape(), (1, 1));
/// assert_eq!(mat.to_dense(), dense);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "serde1", serde(try_from = "PartitionedMatrixRaw"))]
pub struct PartitionedMatrix {
    rows: Partitioning,
    cols: Partitioning,
    /// Row-major over `(row-block, col-block)`
    tiles: Vec<DMatrix<f64>>,
}

#[cfg(feature = "serde1")]
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct PartitionedMatrixRaw {
    rows: Partitioning,
    cols: Partitioning,
    tiles: Vec<DMatrix<f64>>,
}

#[cfg(feature = "serde1")]
impl TryFrom<PartitionedMatrixRaw> for PartitionedMatrix {
    type Error = PartitionError;

    fn try_from(raw: PartitionedMatrixRaw) -> Result<Self, Self::Error> {
        let PartitionedMatrixRaw { rows, cols, tiles } = raw;
        if tiles.len() != rows.n_blocks() * cols.n_blocks() {
            return Err(PartitionError::InvalidPartitioning {
                reason: format!(
                    "expected {} tiles, found {}",
                    rows.n_blocks() * cols.n_blocks(),
                    tiles.len()
                ),
            });
        }
        let grid = iproduct!(0..rows.n_blocks(), 0..cols.n_blocks());
        for ((r, c), tile) in grid.zip(tiles.iter()) {
            if tile.shape() != (rows.size(r), cols.size(c)) {
                return Err(PartitionError::InvalidPartitioning {
                    reason: format!(
                        "tile ({r}, {c}) has shape {:?}",
                        tile.shape()
                    ),
                });
            }
        }
        Ok(Self::new_unchecked(rows, cols, tiles))
    }
}

impl PartitionedMatrix {
    pub(crate) fn new_unchecked(
        rows: Partitioning,
        cols: Partitioning,
        tiles: Vec<DMatrix<f64>>,
    ) -> Self {
        debug_assert_eq!(tiles.len(), rows.n_blocks() * cols.n_blocks());
        Self { rows, cols, tiles }
    }

    /// Build from `((row-block, col-block), tile)` pairs. Every tile of the
    /// grid must be present exactly once, tiles in the same block row must
    /// have the same number of rows, and tiles in the same block column the
    /// same number of columns.
    pub fn from_tiles(
        mut tiles: Vec<((usize, usize), DMatrix<f64>)>,
    ) -> Result<Self, PartitionError> {
        let invalid = |reason: String| {
            Err(PartitionError::InvalidPartitioning { reason })
        };

        if tiles.is_empty() {
            return Ok(Self::zeros(&Partitioning::default(), &Partitioning::default()));
        }

        let n_rows = tiles.iter().map(|((r, _), _)| r + 1).max().unwrap_or(0);
        let n_cols = tiles.iter().map(|((_, c), _)| c + 1).max().unwrap_or(0);

        if tiles.len() != n_rows * n_cols {
            return invalid(format!(
                "expected {} tiles for a {n_rows}x{n_cols} grid, found {}",
                n_rows * n_cols,
                tiles.len()
            ));
        }

        tiles.sort_by_key(|(ix, _)| *ix);
        for (expected, (ix, _)) in iproduct!(0..n_rows, 0..n_cols).zip(tiles.iter()) {
            if *ix != expected {
                return invalid(format!("tile {expected:?} is missing or duplicated"));
            }
        }

        let row_sizes: Vec<usize> =
            (0..n_rows).map(|r| tiles[r * n_cols].1.nrows()).collect();
        let col_sizes: Vec<usize> =
            (0..n_cols).map(|c| tiles[c].1.ncols()).collect();

        for ((r, c), tile) in &tiles {
            if tile.shape() != (row_sizes[*r], col_sizes[*c]) {
                return invalid(format!(
                    "tile ({r}, {c}) has shape {:?}, expected {:?}",
                    tile.shape(),
                    (row_sizes[*r], col_sizes[*c])
                ));
            }
        }

        let rows = Partitioning::from_sizes(row_sizes)?;
        let cols = Partitioning::from_sizes(col_sizes)?;
        let tiles = tiles.into_iter().map(|(_, t)| t).collect();

        Ok(Self::new_unchecked(rows, cols, tiles))
    }

    /// Cut a dense matrix into tiles of `row_block` × `col_block`; edge tiles
    /// may be smaller.
    pub fn from_dense(
        dense: &DMatrix<f64>,
        row_block: usize,
        col_block: usize,
    ) -> Result<Self, PartitionError> {
        let rows = Partitioning::uniform(dense.nrows(), row_block)?;
        let cols = Partitioning::uniform(dense.ncols(), col_block)?;
        Ok(Self::from_dense_with(dense, &rows, &cols))
    }

    pub(crate) fn from_dense_with(
        dense: &DMatrix<f64>,
        rows: &Partitioning,
        cols: &Partitioning,
    ) -> Self {
        let tiles = iproduct!(0..rows.n_blocks(), 0..cols.n_blocks())
            .map(|(r, c)| {
                dense
                    .view(
                        (rows.offset(r), cols.offset(c)),
                        (rows.size(r), cols.size(c)),
                    )
                    .clone_owned()
            })
            .collect();
        Self::new_unchecked(rows.clone(), cols.clone(), tiles)
    }

    /// Build from a function of the logical `(row, col)` index
    #[must_use]
    pub fn from_fn<F>(rows: &Partitioning, cols: &Partitioning, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let tiles = iproduct!(0..rows.n_blocks(), 0..cols.n_blocks())
            .map(|(r, c)| {
                let (r0, c0) = (rows.offset(r), cols.offset(c));
                DMatrix::from_fn(rows.size(r), cols.size(c), |i, j| {
                    f(r0 + i, c0 + j)
                })
            })
            .collect();
        Self::new_unchecked(rows.clone(), cols.clone(), tiles)
    }

    #[must_use]
    pub fn zeros(rows: &Partitioning, cols: &Partitioning) -> Self {
        Self::from_fn(rows, cols, |_, _| 0.0)
    }

    /// Identity with the same row and column partitioning
    #[must_use]
    pub fn identity(partitioning: &Partitioning) -> Self {
        Self::from_fn(partitioning, partitioning, |i, j| {
            if i == j {
                1.0
            } else {
                0.0
            }
        })
    }

    #[inline]
    #[must_use]
    pub fn rows(&self) -> &Partitioning {
        &self.rows
    }

    #[inline]
    #[must_use]
    pub fn cols(&self) -> &Partitioning {
        &self.cols
    }

    /// Logical `(rows, cols)`
    #[inline]
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }

    #[inline]
    #[must_use]
    pub fn n_row_blocks(&self) -> usize {
        self.rows.n_blocks()
    }

    #[inline]
    #[must_use]
    pub fn n_col_blocks(&self) -> usize {
        self.cols.n_blocks()
    }

    #[inline]
    #[must_use]
    pub fn tile(&self, row_block: usize, col_block: usize) -> &DMatrix<f64> {
        &self.tiles[row_block * self.cols.n_blocks() + col_block]
    }

    /// Iterate over `((row-block, col-block), tile)` in row-major order
    pub fn tiles(
        &self,
    ) -> impl Iterator<Item = ((usize, usize), &DMatrix<f64>)> {
        iproduct!(0..self.rows.n_blocks(), 0..self.cols.n_blocks())
            .zip(self.tiles.iter())
    }

    /// Entry at logical `(i, j)`
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        let (rb, ri) = self.rows.locate(i)?;
        let (cb, ci) = self.cols.locate(j)?;
        Some(self.tile(rb, cb)[(ri, ci)])
    }

    /// Assemble the dense matrix
    #[must_use]
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.rows.len(), self.cols.len());
        for ((r, c), tile) in self.tiles() {
            dense
                .view_mut(
                    (self.rows.offset(r), self.cols.offset(c)),
                    tile.shape(),
                )
                .copy_from(tile);
        }
        dense
    }

    #[must_use]
    pub fn map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(f64) -> f64,
    {
        Self::new_unchecked(
            self.rows.clone(),
            self.cols.clone(),
            self.tiles.iter().map(|t| t.map(&mut f)).collect(),
        )
    }

    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        self.map(|x| x * factor)
    }

    fn try_zip_map<F>(
        &self,
        other: &Self,
        op: &'static str,
        mut f: F,
    ) -> Result<Self, PartitionError>
    where
        F: FnMut(f64, f64) -> f64,
    {
        self.rows.ensure_same(&other.rows, op)?;
        self.cols.ensure_same(&other.cols, op)?;
        let tiles = self
            .tiles
            .iter()
            .zip(other.tiles.iter())
            .map(|(a, b)| a.zip_map(b, &mut f))
            .collect();
        Ok(Self::new_unchecked(
            self.rows.clone(),
            self.cols.clone(),
            tiles,
        ))
    }

    /// Tile-wise sum
    pub fn try_add(&self, other: &Self) -> Result<Self, PartitionError> {
        self.try_zip_map(other, "add", |a, b| a + b)
    }

    /// Tile-wise difference
    pub fn try_sub(&self, other: &Self) -> Result<Self, PartitionError> {
        self.try_zip_map(other, "sub", |a, b| a - b)
    }

    /// Transpose. The row and column partitionings swap.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let tiles = iproduct!(0..self.cols.n_blocks(), 0..self.rows.n_blocks())
            .map(|(c, r)| self.tile(r, c).transpose())
            .collect();
        Self::new_unchecked(self.cols.clone(), self.rows.clone(), tiles)
    }

    /// `[self other]`
    pub fn hconcat(&self, other: &Self) -> Result<Self, PartitionError> {
        self.rows.ensure_same(&other.rows, "hconcat")?;
        let tiles = (0..self.rows.n_blocks())
            .flat_map(move |r| {
                (0..self.cols.n_blocks())
                    .map(move |c| self.tile(r, c))
                    .chain((0..other.cols.n_blocks()).map(move |c| other.tile(r, c)))
            })
            .cloned()
            .collect();
        Ok(Self::new_unchecked(
            self.rows.clone(),
            self.cols.concat(&other.cols),
            tiles,
        ))
    }

    /// `[self; other]`
    pub fn vconcat(&self, other: &Self) -> Result<Self, PartitionError> {
        self.cols.ensure_same(&other.cols, "vconcat")?;
        let tiles = self.tiles.iter().chain(other.tiles.iter()).cloned().collect();
        Ok(Self::new_unchecked(
            self.rows.concat(&other.rows),
            self.cols.clone(),
            tiles,
        ))
    }

    /// The tiles in the given block ranges, re-indexed from zero
    pub fn slice_blocks(
        &self,
        row_blocks: Range<usize>,
        col_blocks: Range<usize>,
    ) -> Result<Self, PartitionError> {
        let rows = self.rows.slice(row_blocks.clone())?;
        let cols = self.cols.slice(col_blocks.clone())?;
        let tiles = iproduct!(row_blocks, col_blocks)
            .map(|(r, c)| self.tile(r, c).clone())
            .collect();
        Ok(Self::new_unchecked(rows, cols, tiles))
    }

    /// `A·x`, blocked. `x` must be partitioned like the columns of `A`.
    pub fn mul_vector(
        &self,
        x: &PartitionedVector,
    ) -> Result<PartitionedVector, PartitionError> {
        self.cols.ensure_same(x.partitioning(), "mul_vector")?;
        let blocks = (0..self.rows.n_blocks())
            .map(|r| {
                let mut acc = DVector::zeros(self.rows.size(r));
                for (c, xc) in x.blocks() {
                    acc += self.tile(r, c) * xc;
                }
                acc
            })
            .collect();
        Ok(PartitionedVector::new_unchecked(self.rows.clone(), blocks))
    }

    /// `A·B`, blocked. The column partitioning of `A` must equal the row
    /// partitioning of `B`.
    pub fn mul_matrix(&self, other: &Self) -> Result<Self, PartitionError> {
        self.cols.ensure_same(&other.rows, "mul_matrix")?;
        let tiles = iproduct!(0..self.rows.n_blocks(), 0..other.cols.n_blocks())
            .map(|(r, c)| {
                let mut acc = DMatrix::zeros(self.rows.size(r), other.cols.size(c));
                for l in 0..self.cols.n_blocks() {
                    acc += self.tile(r, l) * other.tile(l, c);
                }
                acc
            })
            .collect();
        Ok(Self::new_unchecked(
            self.rows.clone(),
            other.cols.clone(),
            tiles,
        ))
    }

    fn ensure_square(&self, op: &'static str) -> Result<(), PartitionError> {
        self.rows.ensure_same(&self.cols, op)
    }

    /// The diagonal tiles of a matrix with identical row and column
    /// partitioning
    pub fn diagonal_blocks(&self) -> Result<Vec<&DMatrix<f64>>, PartitionError> {
        self.ensure_square("diagonal_blocks")?;
        Ok((0..self.rows.n_blocks()).map(|b| self.tile(b, b)).collect())
    }

    /// The diagonal entries, partitioned like the rows
    pub fn diagonal(&self) -> Result<PartitionedVector, PartitionError> {
        let blocks = self
            .diagonal_blocks()?
            .into_iter()
            .map(|t| t.diagonal())
            .collect();
        PartitionedVector::from_dvectors(blocks)
    }

    pub fn trace(&self) -> Result<f64, PartitionError> {
        Ok(self.diagonal_blocks()?.into_iter().map(|t| t.trace()).sum())
    }

    /// `tr(A·B)` without forming the product
    ///
    /// # Example
    ///
    /// ```
    /// # use partgp::partition::PartitionedMatrix;
    /// use nalgebra::DMatrix;
    ///
    /// let a = DMatrix::from_fn(5, 3, |i, j| (i + 2 * j) as f64);
    /// let b = DMatrix::from_fn(3, 5, |i, j| (i * j) as f64 - 1.0);
    ///
    /// let pa = PartitionedMatrix::from_dense(&a, 2, 2).unwrap();
    /// let pb = PartitionedMatrix::from_dense(&b, 2, 2).unwrap();
    ///
    /// let tr = pa.trace_product(&pb).unwrap();
    /// assert!((tr - (&a * &b).trace()).abs() < 1e-12);
    /// ```
    pub fn trace_product(&self, other: &Self) -> Result<f64, PartitionError> {
        self.cols.ensure_same(&other.rows, "trace_product")?;
        self.rows.ensure_same(&other.cols, "trace_product")?;
        Ok(iproduct!(0..self.rows.n_blocks(), 0..self.cols.n_blocks())
            .map(|(r, l)| self.tile(r, l).dot(&other.tile(l, r).transpose()))
            .sum())
    }

    /// Squared Euclidean norm of every column, partitioned like the columns
    #[must_use]
    pub fn column_norms_squared(&self) -> PartitionedVector {
        let blocks = (0..self.cols.n_blocks())
            .map(|c| {
                let mut acc = DVector::zeros(self.cols.size(c));
                for r in 0..self.rows.n_blocks() {
                    for (j, col) in self.tile(r, c).column_iter().enumerate() {
                        acc[j] += col.norm_squared();
                    }
                }
                acc
            })
            .collect();
        PartitionedVector::new_unchecked(self.cols.clone(), blocks)
    }

    #[must_use]
    pub fn frobenius_norm(&self) -> f64 {
        self.tiles
            .iter()
            .map(DMatrix::norm_squared)
            .sum::<f64>()
            .sqrt()
    }

    /// Entry-wise comparison with relative and absolute tolerance
    #[must_use]
    pub fn relative_eq(&self, other: &Self, rel: f64, abs: f64) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self
                .tiles
                .iter()
                .zip(other.tiles.iter())
                .all(|(a, b)| a.relative_eq(b, rel, abs))
    }

    pub(crate) fn into_tiles(self) -> (Partitioning, Partitioning, Vec<DMatrix<f64>>) {
        (self.rows, self.cols, self.tiles)
    }
}
