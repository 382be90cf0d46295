use crate::foundation::core::Region;
use crate::foundation::error::{GridflowError, GridflowResult};

/// Stateless partitioner of a region into disjoint, covering sub-regions.
///
/// Splits along the axis with the largest extent among eligible axes. `excluded_axis` (axis 0,
/// the fastest-varying one, by default) keeps each worker's rows contiguous; it is used anyway
/// when it is the only axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RegionSplitter {
    /// Axis never chosen for splitting, unless no other axis exists.
    pub excluded_axis: Option<usize>,
}

impl Default for RegionSplitter {
    fn default() -> Self {
        Self {
            excluded_axis: Some(0),
        }
    }
}

impl RegionSplitter {
    /// Splitter that may choose any axis.
    pub fn any_axis() -> Self {
        Self {
            excluded_axis: None,
        }
    }

    /// Axis [`RegionSplitter::split`] would cut `region` along. Ties go to the higher axis.
    pub fn split_axis(&self, region: &Region) -> Option<usize> {
        let d = region.dimension();
        if d == 0 {
            return None;
        }
        let eligible = |axis: usize| d == 1 || Some(axis) != self.excluded_axis;
        (0..d)
            .filter(|&axis| eligible(axis))
            .max_by_key(|&axis| (region.extent(axis), axis))
    }

    /// Partition `region` into at most `count` non-empty pieces.
    ///
    /// Produces exactly `count` pieces when the chosen axis is at least `count` long, otherwise
    /// one piece per index along it. An empty region yields no pieces.
    pub fn split(&self, region: &Region, count: usize) -> GridflowResult<Vec<Region>> {
        if count == 0 {
            return Err(GridflowError::configuration("split count must be >= 1"));
        }
        let Some(axis) = self.split_axis(region) else {
            return Ok(Vec::new());
        };
        split_along(region, axis, count as u64)
    }
}

/// Cut `region` along `axis` into at most `count` slabs, in ascending order.
///
/// Slabs are `extent / pieces` long; the last one absorbs the remainder.
pub fn split_along(region: &Region, axis: usize, count: u64) -> GridflowResult<Vec<Region>> {
    if axis >= region.dimension() {
        return Err(GridflowError::configuration(format!(
            "split axis {axis} does not exist in a {}-D region",
            region.dimension()
        )));
    }
    if count == 0 {
        return Err(GridflowError::configuration("split count must be >= 1"));
    }
    if region.is_empty() {
        return Ok(Vec::new());
    }
    let extent = region.extent(axis);
    let pieces = count.min(extent);
    let base = extent / pieces;
    Ok((0..pieces)
        .map(|i| {
            let start = region.start(axis) + (i * base) as i64;
            let len = if i + 1 == pieces {
                extent - base * (pieces - 1)
            } else {
                base
            };
            region.with_axis(axis, start, len)
        })
        .collect())
}

/// Check that `pieces` are non-empty, pairwise disjoint, and exactly cover `region`.
pub fn verify_partition(region: &Region, pieces: &[Region]) -> GridflowResult<()> {
    let mut covered = 0u64;
    for (i, piece) in pieces.iter().enumerate() {
        if piece.is_empty() || !region.contains(piece) {
            return Err(GridflowError::invalid_region(format!(
                "piece {i} {piece} is empty or outside {region}"
            )));
        }
        for (j, other) in pieces.iter().enumerate().skip(i + 1) {
            if !piece.intersect(other)?.is_empty() {
                return Err(GridflowError::invalid_region(format!(
                    "pieces {i} {piece} and {j} {other} overlap"
                )));
            }
        }
        covered += piece.number_of_samples();
    }
    if covered != region.number_of_samples() {
        return Err(GridflowError::invalid_region(format!(
            "pieces cover {covered} samples but {region} holds {}",
            region.number_of_samples()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/split/splitter.rs"]
mod tests;
