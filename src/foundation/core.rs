use std::fmt;

use smallvec::SmallVec;

use crate::foundation::error::{GridflowError, GridflowResult};

/// Per-axis lattice coordinates. Axis 0 is the fastest-varying axis.
pub type IndexVec = SmallVec<[i64; 4]>;

/// Per-axis extents.
pub type SizeVec = SmallVec<[u64; 4]>;

/// Axis-aligned window `[index, index + size)` over an N-dimensional integer lattice.
///
/// A region with any zero-extent axis holds no samples. `Region::default()` has dimension 0 and
/// marks a data object whose extent is not known yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RegionParts")]
pub struct Region {
    index: IndexVec,
    size: SizeVec,
}

#[derive(serde::Deserialize)]
struct RegionParts {
    index: IndexVec,
    size: SizeVec,
}

impl TryFrom<RegionParts> for Region {
    type Error = GridflowError;

    fn try_from(parts: RegionParts) -> GridflowResult<Self> {
        if parts.index.is_empty() && parts.size.is_empty() {
            return Ok(Region::default());
        }
        Region::new(&parts.index, &parts.size)
    }
}

impl Region {
    /// Create a region from its start index and per-axis extent.
    pub fn new(index: &[i64], size: &[u64]) -> GridflowResult<Self> {
        if index.len() != size.len() {
            return Err(GridflowError::configuration(format!(
                "region index has {} axes but size has {}",
                index.len(),
                size.len()
            )));
        }
        if index.is_empty() {
            return Err(GridflowError::configuration(
                "region must have at least one axis",
            ));
        }
        for (axis, (&i, &s)) in index.iter().zip(size).enumerate() {
            if i64::try_from(s).ok().and_then(|s| i.checked_add(s)).is_none() {
                return Err(GridflowError::invalid_region(format!(
                    "region axis {axis} overflows the lattice (index {i}, size {s})"
                )));
            }
        }
        if size.iter().try_fold(1u64, |n, &s| n.checked_mul(s)).is_none() {
            return Err(GridflowError::invalid_region(format!(
                "region of size {size:?} holds more samples than a u64 can count"
            )));
        }
        Ok(Self {
            index: SmallVec::from_slice(index),
            size: SmallVec::from_slice(size),
        })
    }

    /// Create a region starting at the lattice origin.
    pub fn from_size(size: &[u64]) -> GridflowResult<Self> {
        let index = vec![0i64; size.len()];
        Self::new(&index, size)
    }

    /// Zero-extent region of the given dimension, anchored at the origin.
    pub fn empty(dimension: usize) -> Self {
        Self {
            index: SmallVec::from_elem(0, dimension),
            size: SmallVec::from_elem(0, dimension),
        }
    }

    /// Number of axes.
    pub fn dimension(&self) -> usize {
        self.size.len()
    }

    /// Start index per axis.
    pub fn index(&self) -> &[i64] {
        &self.index
    }

    /// Extent per axis.
    pub fn size(&self) -> &[u64] {
        &self.size
    }

    /// First index along `axis`.
    pub fn start(&self, axis: usize) -> i64 {
        self.index[axis]
    }

    /// Extent along `axis`.
    pub fn extent(&self, axis: usize) -> u64 {
        self.size[axis]
    }

    /// One past the last index along `axis`.
    pub fn end(&self, axis: usize) -> i64 {
        self.index[axis] + self.size[axis] as i64
    }

    /// Total number of samples covered.
    ///
    /// Construction rejects regions whose count overflows `u64`.
    pub fn number_of_samples(&self) -> u64 {
        if self.size.is_empty() {
            return 0;
        }
        self.size.iter().product()
    }

    /// Return `true` when the region covers no samples.
    pub fn is_empty(&self) -> bool {
        self.size.is_empty() || self.size.contains(&0)
    }

    pub(crate) fn check_dimension(&self, other: &Region) -> GridflowResult<()> {
        if self.dimension() != other.dimension() {
            return Err(GridflowError::configuration(format!(
                "dimension mismatch: {}-D region against {}-D region",
                self.dimension(),
                other.dimension()
            )));
        }
        Ok(())
    }

    /// Overlap of two regions; disjoint regions intersect to an empty region.
    pub fn intersect(&self, other: &Region) -> GridflowResult<Region> {
        self.check_dimension(other)?;
        let mut index = IndexVec::with_capacity(self.dimension());
        let mut size = SizeVec::with_capacity(self.dimension());
        for axis in 0..self.dimension() {
            let lo = self.start(axis).max(other.start(axis));
            let hi = self.end(axis).min(other.end(axis));
            if hi <= lo {
                return Ok(Region {
                    index: self.index.clone(),
                    size: SmallVec::from_elem(0, self.dimension()),
                });
            }
            index.push(lo);
            size.push((hi - lo) as u64);
        }
        Ok(Region { index, size })
    }

    /// Return `true` when every sample of `other` lies inside `self`.
    ///
    /// An empty region is contained in any region of the same dimension.
    pub fn contains(&self, other: &Region) -> bool {
        if self.dimension() != other.dimension() {
            return false;
        }
        if other.is_empty() {
            return true;
        }
        (0..self.dimension())
            .all(|axis| other.start(axis) >= self.start(axis) && other.end(axis) <= self.end(axis))
    }

    /// Return `true` when `idx` addresses a sample inside the region.
    pub fn contains_index(&self, idx: &[i64]) -> bool {
        idx.len() == self.dimension()
            && idx
                .iter()
                .enumerate()
                .all(|(axis, &i)| i >= self.start(axis) && i < self.end(axis))
    }

    /// Smallest region covering both `self` and `other`.
    pub fn bounding_union(&self, other: &Region) -> GridflowResult<Region> {
        self.check_dimension(other)?;
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }
        let mut index = IndexVec::with_capacity(self.dimension());
        let mut size = SizeVec::with_capacity(self.dimension());
        for axis in 0..self.dimension() {
            let lo = self.start(axis).min(other.start(axis));
            let hi = self.end(axis).max(other.end(axis));
            index.push(lo);
            size.push(hi.abs_diff(lo));
        }
        Region::new(&index, &size)
    }

    /// Grow the region by `radius[axis]` samples on both sides of each axis.
    pub fn padded(&self, radius: &[u64]) -> GridflowResult<Region> {
        if radius.len() != self.dimension() {
            return Err(GridflowError::configuration(format!(
                "padding radius has {} axes but region has {}",
                radius.len(),
                self.dimension()
            )));
        }
        let mut index = IndexVec::with_capacity(self.dimension());
        let mut size = SizeVec::with_capacity(self.dimension());
        for (axis, &r) in radius.iter().enumerate() {
            let start = i64::try_from(r)
                .ok()
                .and_then(|r| self.start(axis).checked_sub(r));
            let extent = r.checked_mul(2).and_then(|d| self.extent(axis).checked_add(d));
            let (Some(start), Some(extent)) = (start, extent) else {
                return Err(GridflowError::invalid_region(format!(
                    "padding {self} by {r} along axis {axis} overflows the lattice"
                )));
            };
            index.push(start);
            size.push(extent);
        }
        Region::new(&index, &size)
    }

    /// Copy of the region restricted to `[start, start + extent)` along `axis`.
    pub(crate) fn with_axis(&self, axis: usize, start: i64, extent: u64) -> Region {
        let mut out = self.clone();
        out.index[axis] = start;
        out.size[axis] = extent;
        out
    }

    /// Linear offset of `idx` inside the region, row-major with axis 0 fastest.
    pub fn offset_of(&self, idx: &[i64]) -> Option<usize> {
        if !self.contains_index(idx) {
            return None;
        }
        let mut offset = 0u64;
        let mut stride = 1u64;
        for (axis, &i) in idx.iter().enumerate() {
            offset += (i - self.start(axis)) as u64 * stride;
            stride *= self.extent(axis);
        }
        usize::try_from(offset).ok()
    }

    /// Iterate every index of the region, axis 0 fastest.
    pub fn iter(&self) -> RegionIter {
        RegionIter::new(self.clone())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[index={:?}, size={:?}]", self.index.as_slice(), self.size.as_slice())
    }
}

/// Row-major walk over every index of a [`Region`].
#[derive(Clone, Debug)]
pub struct RegionIter {
    region: Region,
    next: IndexVec,
    remaining: u64,
}

impl RegionIter {
    fn new(region: Region) -> Self {
        let remaining = region.number_of_samples();
        let next = region.index.clone();
        Self {
            region,
            next,
            remaining,
        }
    }
}

impl Iterator for RegionIter {
    type Item = IndexVec;

    fn next(&mut self) -> Option<IndexVec> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let out = self.next.clone();
        for axis in 0..self.region.dimension() {
            self.next[axis] += 1;
            if self.next[axis] < self.region.end(axis) {
                break;
            }
            self.next[axis] = self.region.start(axis);
        }
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
