use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// Location of a hyperparameter inside a (possibly composite) kernel.
///
/// Composite kernels prefix the paths of their children, so the length scale
/// of an RBF kernel on the left of a sum reads `lhs/rbf/length_scale`.
///
/// # Example
///
/// ```
/// # use partgp::process::gaussian::kernel::HyperPath;
/// let path = HyperPath::new(["rbf", "length_scale"]).prefixed("lhs");
///
/// assert_eq!(path.to_string(), "lhs/rbf/length_scale");
/// assert_eq!(
///     path.strip_prefix("lhs"),
///     Some(HyperPath::new(["rbf", "length_scale"]))
/// );
/// assert_eq!(path.strip_prefix("rhs"), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct HyperPath(Vec<String>);

impl HyperPath {
    pub fn new<S, T>(segments: T) -> Self
    where
        S: Into<String>,
        T: IntoIterator<Item = S>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Path of a hyperparameter named `name` on a kernel labelled `kernel`
    #[must_use]
    pub fn leaf(kernel: &str, name: &str) -> Self {
        Self::new([kernel, name])
    }

    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// New path with `prefix` as the first segment
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.push(prefix.to_string());
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }

    /// The rest of the path if its first segment is `prefix`
    #[must_use]
    pub fn strip_prefix(&self, prefix: &str) -> Option<Self> {
        match self.0.split_first() {
            Some((head, rest)) if head == prefix => Some(Self(rest.to_vec())),
            _ => None,
        }
    }
}

impl fmt::Display for HyperPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Hyperparameter values, or gradients, keyed by path
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Hyperparameters(BTreeMap<HyperPath, f64>);

impl Hyperparameters {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn get(&self, path: &HyperPath) -> Option<f64> {
        self.0.get(path).copied()
    }

    /// Insert a value, returning the one it replaces
    pub fn insert(&mut self, path: HyperPath, value: f64) -> Option<f64> {
        self.0.insert(path, value)
    }

    /// Builder form of [`insert`](Self::insert)
    #[must_use]
    pub fn with(mut self, path: HyperPath, value: f64) -> Self {
        self.0.insert(path, value);
        self
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, path: &HyperPath) -> bool {
        self.0.contains_key(path)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, HyperPath, f64> {
        self.0.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &HyperPath> {
        self.0.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.values().copied()
    }

    /// Every path with `prefix` prepended
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> Self {
        self.0
            .iter()
            .map(|(path, &value)| (path.prefixed(prefix), value))
            .collect()
    }

    /// The entries under `prefix`, with the prefix removed. Other entries are
    /// dropped.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &str) -> Self {
        self.0
            .iter()
            .filter_map(|(path, &value)| {
                path.strip_prefix(prefix).map(|p| (p, value))
            })
            .collect()
    }

    /// Map every value, keeping the paths
    #[must_use]
    pub fn map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&HyperPath, f64) -> f64,
    {
        self.0
            .iter()
            .map(|(path, &value)| (path.clone(), f(path, value)))
            .collect()
    }
}

impl FromIterator<(HyperPath, f64)> for Hyperparameters {
    fn from_iter<T: IntoIterator<Item = (HyperPath, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<(HyperPath, f64)> for Hyperparameters {
    fn extend<T: IntoIterator<Item = (HyperPath, f64)>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Hyperparameters {
    type Item = (HyperPath, f64);
    type IntoIter = btree_map::IntoIter<HyperPath, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Hyperparameters {
    type Item = (&'a HyperPath, &'a f64);
    type IntoIter = btree_map::Iter<'a, HyperPath, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (path, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{path}: {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespacing_round_trip() {
        let hp: Hyperparameters = [
            (HyperPath::leaf("rbf", "length_scale"), 1.5),
            (HyperPath::leaf("white", "noise_level"), 0.1),
        ]
        .into_iter()
        .collect();

        let outer = hp.prefixed("covariance");
        assert_eq!(
            outer.get(&HyperPath::new(["covariance", "rbf", "length_scale"])),
            Some(1.5)
        );
        assert_eq!(outer.strip_prefix("covariance"), hp);
        assert!(outer.strip_prefix("noise").is_empty());
    }

    #[test]
    fn display_joins_segments() {
        let hp = Hyperparameters::new()
            .with(HyperPath::new(["lhs", "constant", "value"]), 2.0);
        assert_eq!(hp.to_string(), "{lhs/constant/value: 2}");
    }
}
