use itertools::iproduct;
use nalgebra::{DMatrix, DVector};
use std::borrow::Cow;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::{
    PartitionError, PartitionedMatrix, PartitionedPsdMatrix, PartitionedVector,
    Partitioning,
};

/// Packed position of lower tile `(r, c)`, `c <= r`
#[inline]
pub(crate) fn lower_index(r: usize, c: usize) -> usize {
    debug_assert!(c <= r);
    r * (r + 1) / 2 + c
}

/// Packed position of upper tile `(r, c)`, `r <= c`. Upper tile `(c, r)`
/// shares its slot with lower tile `(r, c)`, so transposing keeps the order.
#[inline]
pub(crate) fn upper_index(r: usize, c: usize) -> usize {
    debug_assert!(r <= c);
    c * (c + 1) / 2 + r
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Triangle {
    Lower,
    Upper,
}

impl Triangle {
    fn contains(self, r: usize, c: usize) -> bool {
        match self {
            Self::Lower => r >= c,
            Self::Upper => r <= c,
        }
    }

    fn index(self, r: usize, c: usize) -> usize {
        match self {
            Self::Lower => lower_index(r, c),
            Self::Upper => upper_index(r, c),
        }
    }

    /// Tile coordinates in packed order
    fn positions(self, k: usize) -> impl Iterator<Item = (usize, usize)> {
        (0..k).flat_map(move |a| {
            (0..=a).map(move |b| match self {
                Self::Lower => (a, b),
                Self::Upper => (b, a),
            })
        })
    }

    fn name(self) -> &'static str {
        match self {
            Self::Lower => "lower",
            Self::Upper => "upper",
        }
    }
}

/// Validate tiles and lay them out in packed order. Omitted tiles are zero,
/// diagonal tiles keep only their own triangle.
fn pack(
    partitioning: &Partitioning,
    tiles: Vec<((usize, usize), DMatrix<f64>)>,
    triangle: Triangle,
) -> Result<Vec<DMatrix<f64>>, PartitionError> {
    let k = partitioning.n_blocks();
    let mut packed: Vec<Option<DMatrix<f64>>> = vec![None; k * (k + 1) / 2];

    for ((r, c), tile) in tiles {
        let invalid = |reason: String| {
            Err(PartitionError::InvalidPartitioning { reason })
        };
        if r >= k || c >= k || !triangle.contains(r, c) {
            return invalid(format!(
                "tile ({r}, {c}) is outside the {} triangle of {k} blocks",
                triangle.name()
            ));
        }
        let expected = (partitioning.size(r), partitioning.size(c));
        if tile.shape() != expected {
            return invalid(format!(
                "tile ({r}, {c}) has shape {:?}, expected {expected:?}",
                tile.shape()
            ));
        }
        let slot = &mut packed[triangle.index(r, c)];
        if slot.is_some() {
            return invalid(format!("tile ({r}, {c}) given twice"));
        }
        *slot = Some(if r != c {
            tile
        } else if triangle == Triangle::Lower {
            tile.lower_triangle()
        } else {
            tile.upper_triangle()
        });
    }

    Ok(packed
        .into_iter()
        .zip(triangle.positions(k))
        .map(|(tile, (r, c))| {
            tile.unwrap_or_else(|| {
                DMatrix::zeros(partitioning.size(r), partitioning.size(c))
            })
        })
        .collect())
}

#[derive(Clone, Copy)]
enum Sweep {
    Forward,
    Backward,
}

/// Block substitution over one column of right-hand-side tiles.
///
/// `off(i, j, x_j)` is the contribution of the solved block `j` to row `i`
/// and `diag(i, r)` solves the diagonal system of row `i`.
fn substitute<F, D>(
    mut x: Vec<DMatrix<f64>>,
    sweep: Sweep,
    off: F,
    diag: D,
) -> Result<Vec<DMatrix<f64>>, PartitionError>
where
    F: Fn(usize, usize, &DMatrix<f64>) -> DMatrix<f64>,
    D: Fn(usize, &DMatrix<f64>) -> Option<DMatrix<f64>>,
{
    let k = x.len();
    let order: Vec<usize> = match sweep {
        Sweep::Forward => (0..k).collect(),
        Sweep::Backward => (0..k).rev().collect(),
    };
    for (step, &i) in order.iter().enumerate() {
        let mut residual = x[i].clone();
        for &j in &order[..step] {
            residual -= off(i, j, &x[j]);
        }
        x[i] = diag(i, &residual)
            .ok_or(PartitionError::SingularBlock { block: i })?;
    }
    Ok(x)
}

/// Run `solve` on every column block of `b`
fn solve_columns<S>(
    b: &PartitionedMatrix,
    solve: S,
) -> Result<PartitionedMatrix, PartitionError>
where
    S: Fn(Vec<DMatrix<f64>>) -> Result<Vec<DMatrix<f64>>, PartitionError>,
{
    let (n_rows, n_cols) = (b.n_row_blocks(), b.n_col_blocks());
    let mut columns = Vec::with_capacity(n_cols);
    for c in 0..n_cols {
        let rhs = (0..n_rows).map(|r| b.tile(r, c).clone()).collect();
        columns.push(solve(rhs)?);
    }
    let tiles = iproduct!(0..n_rows, 0..n_cols)
        .map(|(r, c)| columns[c][r].clone())
        .collect();
    Ok(PartitionedMatrix::new_unchecked(
        b.rows().clone(),
        b.cols().clone(),
        tiles,
    ))
}

macro_rules! impl_triangular_common {
    ($kind: ident, $triangle: expr) => {
        impl $kind {
            pub(crate) fn new_unchecked(
                partitioning: Partitioning,
                tiles: Vec<DMatrix<f64>>,
            ) -> Self {
                let k = partitioning.n_blocks();
                debug_assert_eq!(tiles.len(), k * (k + 1) / 2);
                Self {
                    partitioning,
                    tiles,
                }
            }

            /// Build from `((row-block, col-block), tile)` pairs on the
            /// triangle. Missing tiles are zero and the opposite triangle of
            /// each diagonal tile is zeroed.
            pub fn from_tiles(
                partitioning: &Partitioning,
                tiles: Vec<((usize, usize), DMatrix<f64>)>,
            ) -> Result<Self, PartitionError> {
                let tiles = pack(partitioning, tiles, $triangle)?;
                Ok(Self::new_unchecked(partitioning.clone(), tiles))
            }

            /// Take the triangle of a square dense matrix
            pub fn from_dense(
                dense: &DMatrix<f64>,
                block_size: usize,
            ) -> Result<Self, PartitionError> {
                if !dense.is_square() {
                    return Err(PartitionError::InvalidPartitioning {
                        reason: format!(
                            "triangular matrix must be square, got {:?}",
                            dense.shape()
                        ),
                    });
                }
                let part = Partitioning::uniform(dense.nrows(), block_size)?;
                let full = PartitionedMatrix::from_dense_with(dense, &part, &part);
                let tiles = $triangle
                    .positions(part.n_blocks())
                    .map(|(r, c)| ((r, c), full.tile(r, c).clone()))
                    .collect();
                Self::from_tiles(&part, tiles)
            }

            /// The shared row and column partitioning
            #[inline]
            #[must_use]
            pub fn partitioning(&self) -> &Partitioning {
                &self.partitioning
            }

            #[inline]
            #[must_use]
            pub fn n_blocks(&self) -> usize {
                self.partitioning.n_blocks()
            }

            /// Tile `(r, c)`; tiles off the triangle are an implicit zero
            #[must_use]
            pub fn tile(&self, r: usize, c: usize) -> Cow<'_, DMatrix<f64>> {
                if $triangle.contains(r, c) {
                    Cow::Borrowed(&self.tiles[$triangle.index(r, c)])
                } else {
                    Cow::Owned(DMatrix::zeros(
                        self.partitioning.size(r),
                        self.partitioning.size(c),
                    ))
                }
            }

            #[inline]
            fn diag_tile(&self, b: usize) -> &DMatrix<f64> {
                &self.tiles[$triangle.index(b, b)]
            }

            /// Diagonal entries, partitioned like the matrix
            #[must_use]
            pub fn diagonal(&self) -> PartitionedVector {
                let blocks = (0..self.n_blocks())
                    .map(|b| self.diag_tile(b).diagonal())
                    .collect();
                PartitionedVector::new_unchecked(self.partitioning.clone(), blocks)
            }

            /// `ln |det|`, the sum of the log absolute diagonal
            #[must_use]
            pub fn ln_det(&self) -> f64 {
                (0..self.n_blocks())
                    .map(|b| self.diag_tile(b).diagonal().map(|d| d.abs().ln()).sum())
                    .sum()
            }

            /// Product of the diagonal
            #[must_use]
            pub fn determinant(&self) -> f64 {
                (0..self.n_blocks())
                    .map(|b| self.diag_tile(b).diagonal().product())
                    .product()
            }

            /// The full partitioned matrix with explicit zero tiles
            #[must_use]
            pub fn to_partitioned(&self) -> PartitionedMatrix {
                let k = self.n_blocks();
                let tiles = iproduct!(0..k, 0..k)
                    .map(|(r, c)| self.tile(r, c).into_owned())
                    .collect();
                PartitionedMatrix::new_unchecked(
                    self.partitioning.clone(),
                    self.partitioning.clone(),
                    tiles,
                )
            }

            #[must_use]
            pub fn to_dense(&self) -> DMatrix<f64> {
                self.to_partitioned().to_dense()
            }

            /// Blocked product with a vector, skipping the zero tiles
            pub fn mul_vector(
                &self,
                x: &PartitionedVector,
            ) -> Result<PartitionedVector, PartitionError> {
                self.partitioning.ensure_same(x.partitioning(), "mul_vector")?;
                let k = self.n_blocks();
                let blocks = (0..k)
                    .map(|r| {
                        let mut acc = DVector::zeros(self.partitioning.size(r));
                        for (c, xc) in x.blocks() {
                            if $triangle.contains(r, c) {
                                acc += &self.tiles[$triangle.index(r, c)] * xc;
                            }
                        }
                        acc
                    })
                    .collect();
                Ok(PartitionedVector::new_unchecked(
                    self.partitioning.clone(),
                    blocks,
                ))
            }

            /// Blocked product with a partitioned matrix
            pub fn mul_matrix(
                &self,
                b: &PartitionedMatrix,
            ) -> Result<PartitionedMatrix, PartitionError> {
                self.to_partitioned().mul_matrix(b)
            }

            /// Solve `A·x = b`
            pub fn solve_vector(
                &self,
                b: &PartitionedVector,
            ) -> Result<PartitionedVector, PartitionError> {
                self.partitioning.ensure_same(b.partitioning(), "solve")?;
                let x = self.solve_column(b.to_columns())?;
                Ok(PartitionedVector::from_columns(b.partitioning(), x))
            }

            /// Solve `A·X = B`. The result is partitioned like `B`.
            pub fn solve_matrix(
                &self,
                b: &PartitionedMatrix,
            ) -> Result<PartitionedMatrix, PartitionError> {
                self.partitioning.ensure_same(b.rows(), "solve")?;
                solve_columns(b, |rhs| self.solve_column(rhs))
            }

            /// Solve `Aᵀ·x = b`
            pub fn tr_solve_vector(
                &self,
                b: &PartitionedVector,
            ) -> Result<PartitionedVector, PartitionError> {
                self.partitioning.ensure_same(b.partitioning(), "tr_solve")?;
                let x = self.tr_solve_column(b.to_columns())?;
                Ok(PartitionedVector::from_columns(b.partitioning(), x))
            }

            /// Solve `Aᵀ·X = B`. The result is partitioned like `B`.
            pub fn tr_solve_matrix(
                &self,
                b: &PartitionedMatrix,
            ) -> Result<PartitionedMatrix, PartitionError> {
                self.partitioning.ensure_same(b.rows(), "tr_solve")?;
                solve_columns(b, |rhs| self.tr_solve_column(rhs))
            }
        }
    };
}

/// Lower block-triangular partitioned matrix.
///
/// Only the tiles on or below the block diagonal are stored; the diagonal
/// tiles are themselves lower triangular. This is the output of
/// [`PartitionedPsdMatrix::cholesky`].
///
/// # Example
///
/// ```
/// # use partgp::partition::{LowerTriPartitionedMatrix, PartitionedVector};
/// use nalgebra::DMatrix;
///
/// let dense = DMatrix::from_row_slice(3, 3, &[
///     2.0, 0.0, 0.0,
///     1.0, 1.0, 0.0,
///     0.5, 3.0, 4.0,
/// ]);
/// let l = LowerTriPartitionedMatrix::from_dense(&dense, 2).unwrap();
/// let b = PartitionedVector::from_slice(&[2.0, 2.0, 11.5], 2).unwrap();
///
/// let x = l.solve_vector(&b).unwrap();
/// assert_eq!(x.to_vec(), vec![1.0, 1.0, 2.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "serde1", serde(try_from = "TriangularRaw"))]
pub struct LowerTriPartitionedMatrix {
    partitioning: Partitioning,
    /// Packed by block row: `(0,0), (1,0), (1,1), (2,0), …`
    tiles: Vec<DMatrix<f64>>,
}

/// Upper block-triangular partitioned matrix
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "serde1", serde(try_from = "TriangularRaw"))]
pub struct UpperTriPartitionedMatrix {
    partitioning: Partitioning,
    /// Packed by block column: `(0,0), (0,1), (1,1), (0,2), …`
    tiles: Vec<DMatrix<f64>>,
}

#[cfg(feature = "serde1")]
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct TriangularRaw {
    partitioning: Partitioning,
    tiles: Vec<DMatrix<f64>>,
}

// packed tiles must match the partitioning tile by tile
#[cfg(feature = "serde1")]
fn check_packed(
    raw: &TriangularRaw,
    triangle: Triangle,
) -> Result<(), PartitionError> {
    let k = raw.partitioning.n_blocks();
    if raw.tiles.len() != k * (k + 1) / 2 {
        return Err(PartitionError::InvalidPartitioning {
            reason: format!(
                "expected {} packed tiles for {k} blocks, found {}",
                k * (k + 1) / 2,
                raw.tiles.len()
            ),
        });
    }
    for (r, c) in triangle.positions(k) {
        let shape = raw.tiles[triangle.index(r, c)].shape();
        if shape != (raw.partitioning.size(r), raw.partitioning.size(c)) {
            return Err(PartitionError::InvalidPartitioning {
                reason: format!("tile ({r}, {c}) has shape {shape:?}"),
            });
        }
    }
    Ok(())
}

#[cfg(feature = "serde1")]
impl TryFrom<TriangularRaw> for LowerTriPartitionedMatrix {
    type Error = PartitionError;

    fn try_from(raw: TriangularRaw) -> Result<Self, Self::Error> {
        check_packed(&raw, Triangle::Lower)?;
        Ok(Self::new_unchecked(raw.partitioning, raw.tiles))
    }
}

#[cfg(feature = "serde1")]
impl TryFrom<TriangularRaw> for UpperTriPartitionedMatrix {
    type Error = PartitionError;

    fn try_from(raw: TriangularRaw) -> Result<Self, Self::Error> {
        check_packed(&raw, Triangle::Upper)?;
        Ok(Self::new_unchecked(raw.partitioning, raw.tiles))
    }
}

impl_triangular_common!(LowerTriPartitionedMatrix, Triangle::Lower);
impl_triangular_common!(UpperTriPartitionedMatrix, Triangle::Upper);

impl LowerTriPartitionedMatrix {
    /// The transpose, an upper triangular matrix
    #[must_use]
    pub fn transpose(&self) -> UpperTriPartitionedMatrix {
        UpperTriPartitionedMatrix::new_unchecked(
            self.partitioning.clone(),
            self.tiles.iter().map(DMatrix::transpose).collect(),
        )
    }

    // forward substitution
    fn solve_column(
        &self,
        rhs: Vec<DMatrix<f64>>,
    ) -> Result<Vec<DMatrix<f64>>, PartitionError> {
        substitute(
            rhs,
            Sweep::Forward,
            |i, j, xj| &self.tiles[lower_index(i, j)] * xj,
            |i, r| self.tiles[lower_index(i, i)].solve_lower_triangular(r),
        )
    }

    // back substitution with the transpose
    fn tr_solve_column(
        &self,
        rhs: Vec<DMatrix<f64>>,
    ) -> Result<Vec<DMatrix<f64>>, PartitionError> {
        substitute(
            rhs,
            Sweep::Backward,
            |i, j, xj| self.tiles[lower_index(j, i)].tr_mul(xj),
            |i, r| self.tiles[lower_index(i, i)].tr_solve_lower_triangular(r),
        )
    }

    /// `(L·Lᵀ)⁻¹` for a Cholesky factor `L`, by a forward then a backward
    /// blocked solve against the identity
    pub fn cholesky_inverse(&self) -> Result<PartitionedPsdMatrix, PartitionError> {
        let eye = PartitionedMatrix::identity(&self.partitioning);
        let inv = self.tr_solve_matrix(&self.solve_matrix(&eye)?)?;
        Ok(PartitionedPsdMatrix::new_unchecked(inv))
    }
}

impl UpperTriPartitionedMatrix {
    /// The transpose, a lower triangular matrix
    #[must_use]
    pub fn transpose(&self) -> LowerTriPartitionedMatrix {
        LowerTriPartitionedMatrix::new_unchecked(
            self.partitioning.clone(),
            self.tiles.iter().map(DMatrix::transpose).collect(),
        )
    }

    // back substitution
    fn solve_column(
        &self,
        rhs: Vec<DMatrix<f64>>,
    ) -> Result<Vec<DMatrix<f64>>, PartitionError> {
        substitute(
            rhs,
            Sweep::Backward,
            |i, j, xj| &self.tiles[upper_index(i, j)] * xj,
            |i, r| self.tiles[upper_index(i, i)].solve_upper_triangular(r),
        )
    }

    // forward substitution with the transpose
    fn tr_solve_column(
        &self,
        rhs: Vec<DMatrix<f64>>,
    ) -> Result<Vec<DMatrix<f64>>, PartitionError> {
        substitute(
            rhs,
            Sweep::Forward,
            |i, j, xj| self.tiles[upper_index(j, i)].tr_mul(xj),
            |i, r| self.tiles[upper_index(i, i)].tr_solve_upper_triangular(r),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::arb_dense;
    use proptest::prelude::*;

    fn lower_dense(n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                2.0 + i as f64
            } else if i > j {
                ((i + 2 * j) % 3) as f64 - 1.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn packed_indices_line_up_under_transpose() {
        for r in 0..6 {
            for c in 0..=r {
                assert_eq!(lower_index(r, c), upper_index(c, r));
            }
        }
        let positions: Vec<_> = Triangle::Upper.positions(3).collect();
        assert_eq!(positions, vec![(0, 0), (0, 1), (1, 1), (0, 2), (1, 2), (2, 2)]);
        for (ix, (r, c)) in positions.into_iter().enumerate() {
            assert_eq!(upper_index(r, c), ix);
        }
    }

    #[test]
    fn from_tiles_fills_zeros_and_rejects_upper() {
        let part = Partitioning::from_sizes(vec![2, 1]).unwrap();
        let l = LowerTriPartitionedMatrix::from_tiles(
            &part,
            vec![((0, 0), DMatrix::from_element(2, 2, 1.0))],
        )
        .unwrap();
        // upper triangle of the diagonal tile is dropped
        assert_eq!(l.tile(0, 0)[(0, 1)], 0.0);
        assert_eq!(*l.tile(1, 0), DMatrix::<f64>::zeros(1, 2));
        assert_eq!(l.tile(0, 1).shape(), (2, 1));

        let bad = LowerTriPartitionedMatrix::from_tiles(
            &part,
            vec![((0, 1), DMatrix::zeros(2, 1))],
        );
        assert!(matches!(
            bad,
            Err(PartitionError::InvalidPartitioning { .. })
        ));
    }

    #[test]
    fn transpose_round_trip() {
        let l = LowerTriPartitionedMatrix::from_dense(&lower_dense(5), 2).unwrap();
        let u = l.transpose();
        assert_eq!(u.to_dense(), lower_dense(5).transpose());
        assert_eq!(u.transpose(), l);
        assert::close(l.determinant(), u.determinant(), 1e-12);
        assert::close(l.ln_det(), (2.0_f64 * 3.0 * 4.0 * 5.0 * 6.0).ln(), 1e-12);
    }

    #[test]
    fn singular_diagonal_names_the_block() {
        let mut dense = lower_dense(5);
        dense[(3, 3)] = 0.0;
        let l = LowerTriPartitionedMatrix::from_dense(&dense, 2).unwrap();
        let b = PartitionedVector::from_element(l.partitioning(), 1.0);
        assert_eq!(
            l.solve_vector(&b).unwrap_err(),
            PartitionError::SingularBlock { block: 1 }
        );
        assert_eq!(
            l.tr_solve_vector(&b).unwrap_err(),
            PartitionError::SingularBlock { block: 1 }
        );
    }

    #[test]
    fn rhs_partitioning_must_match() {
        let l = LowerTriPartitionedMatrix::from_dense(&lower_dense(4), 2).unwrap();
        let b = PartitionedVector::from_slice(&[1.0; 4], 3).unwrap();
        assert!(matches!(
            l.solve_vector(&b),
            Err(PartitionError::DimensionMismatch { op: "solve", .. })
        ));
    }

    #[test]
    fn cholesky_inverse_matches_dense_inverse() {
        let part = Partitioning::uniform(5, 2).unwrap();
        let k = PartitionedPsdMatrix::from_symmetric_fn(&part, |i, j| {
            if i == j {
                3.0
            } else {
                1.0 / (1.0 + (i as f64 - j as f64).abs())
            }
        });
        let inv = k.cholesky().unwrap().cholesky_inverse().unwrap();
        let expected = k.to_dense().try_inverse().unwrap();
        assert!(inv.to_dense().relative_eq(&expected, 1e-10, 1e-10));
    }

    proptest! {
        #[test]
        fn solves_invert_products(
            b in arb_dense(7..8, 1..4),
            bs in 1_usize..5,
            cbs in 1_usize..3,
        ) {
            let dense = lower_dense(7);
            let l = LowerTriPartitionedMatrix::from_dense(&dense, bs).unwrap();
            let u = l.transpose();
            let part = l.partitioning().clone();
            let cols = Partitioning::uniform(b.ncols(), cbs).unwrap();
            let pb = PartitionedMatrix::from_dense_with(&b, &part, &cols);

            for x in [
                l.mul_matrix(&l.solve_matrix(&pb).unwrap()).unwrap(),
                l.to_partitioned()
                    .transpose()
                    .mul_matrix(&l.tr_solve_matrix(&pb).unwrap())
                    .unwrap(),
                u.mul_matrix(&u.solve_matrix(&pb).unwrap()).unwrap(),
                u.to_partitioned()
                    .transpose()
                    .mul_matrix(&u.tr_solve_matrix(&pb).unwrap())
                    .unwrap(),
            ] {
                prop_assert!(x.relative_eq(&pb, 1e-9, 1e-9));
            }

            let v = PartitionedVector::from_fn(7, bs, |i| (i as f64).sin()).unwrap();
            let fwd = l.solve_vector(&v).unwrap();
            prop_assert!(l.mul_vector(&fwd).unwrap().relative_eq(&v, 1e-9, 1e-9));
            let back = u.solve_vector(&v).unwrap();
            prop_assert!(u.mul_vector(&back).unwrap().relative_eq(&v, 1e-9, 1e-9));
            prop_assert!(u.solve_vector(&v).unwrap().relative_eq(
                &l.tr_solve_vector(&v).unwrap(), 1e-10, 1e-10
            ));
        }
    }

    #[cfg(feature = "serde1")]
    #[test]
    fn serde_round_trip_and_validation() {
        let dense = DMatrix::from_fn(3, 3, |i, j| (i + j) as f64 + 1.0);
        let l = LowerTriPartitionedMatrix::from_dense(&dense, 2).unwrap();
        let s = serde_json::to_string(&l).unwrap();
        let back: LowerTriPartitionedMatrix = serde_json::from_str(&s).unwrap();
        assert_eq!(l, back);

        let u = l.transpose();
        let s_u = serde_json::to_string(&u).unwrap();
        let back: UpperTriPartitionedMatrix = serde_json::from_str(&s_u).unwrap();
        assert_eq!(u, back);

        let mut value: serde_json::Value = serde_json::from_str(&s).unwrap();
        value["partitioning"] = serde_json::json!([1, 2]);
        let res: Result<LowerTriPartitionedMatrix, _> =
            serde_json::from_value(value);
        assert!(res.is_err());
    }
}
