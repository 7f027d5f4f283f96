use nalgebra::DVector;

/// Index types living in a Euclidean space
///
/// Points of different dimension have no distance; the vector
/// implementations panic on a length mismatch.
pub trait Euclidean {
    /// Squared L2 distance
    fn sq_distance(&self, other: &Self) -> f64;

    /// Dot product
    fn inner(&self, other: &Self) -> f64;
}

#[inline]
fn sq_distance_iter<'a, A, B>(a: A, b: B) -> f64
where
    A: IntoIterator<Item = &'a f64>,
    B: IntoIterator<Item = &'a f64>,
{
    a.into_iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

#[inline]
fn inner_iter<'a, A, B>(a: A, b: B) -> f64
where
    A: IntoIterator<Item = &'a f64>,
    B: IntoIterator<Item = &'a f64>,
{
    a.into_iter().zip(b).map(|(x, y)| x * y).sum()
}

impl Euclidean for f64 {
    #[inline]
    fn sq_distance(&self, other: &Self) -> f64 {
        (self - other) * (self - other)
    }

    #[inline]
    fn inner(&self, other: &Self) -> f64 {
        self * other
    }
}

impl<const N: usize> Euclidean for [f64; N] {
    fn sq_distance(&self, other: &Self) -> f64 {
        sq_distance_iter(self, other)
    }

    fn inner(&self, other: &Self) -> f64 {
        inner_iter(self, other)
    }
}

impl Euclidean for Vec<f64> {
    fn sq_distance(&self, other: &Self) -> f64 {
        assert_eq!(self.len(), other.len(), "points differ in dimension");
        sq_distance_iter(self, other)
    }

    fn inner(&self, other: &Self) -> f64 {
        assert_eq!(self.len(), other.len(), "points differ in dimension");
        inner_iter(self, other)
    }
}

impl Euclidean for DVector<f64> {
    fn sq_distance(&self, other: &Self) -> f64 {
        assert_eq!(self.len(), other.len(), "points differ in dimension");
        sq_distance_iter(self.iter(), other.iter())
    }

    fn inner(&self, other: &Self) -> f64 {
        assert_eq!(self.len(), other.len(), "points differ in dimension");
        inner_iter(self.iter(), other.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_index_types_agree() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 6.0, 3.0];
        assert_eq!(a.sq_distance(&b), 25.0);
        assert_eq!(a.to_vec().sq_distance(&b.to_vec()), 25.0);
        assert_eq!(
            DVector::from_column_slice(&a)
                .sq_distance(&DVector::from_column_slice(&b)),
            25.0
        );
        assert_eq!(a.inner(&b), 25.0);
        assert_eq!(2.0_f64.sq_distance(&-1.0), 9.0);
    }

    #[test]
    #[should_panic(expected = "points differ in dimension")]
    fn vec_dimension_mismatch_panics() {
        vec![0.0_f64, 0.0].sq_distance(&vec![0.0, 0.0, 100.0]);
    }

    #[test]
    #[should_panic(expected = "points differ in dimension")]
    fn dvector_dimension_mismatch_panics() {
        DVector::from_column_slice(&[1.0_f64]).inner(&DVector::zeros(2));
    }
}
