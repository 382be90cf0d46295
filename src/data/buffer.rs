use std::any::Any;
use std::fmt;
use std::ops::Deref;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::foundation::core::Region;
use crate::foundation::error::{GridflowError, GridflowResult};

/// Element type a data object can hold.
pub trait Sample: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> Sample for T where T: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {}

fn sample_len(region: &Region) -> GridflowResult<usize> {
    usize::try_from(region.number_of_samples()).map_err(|_| {
        GridflowError::configuration(format!("region {region} does not fit in memory"))
    })
}

/// Copy the samples of `region` between two row-major buffers.
///
/// `region` must lie inside both `src_region` and `dst_region`. Rows along axis 0 are
/// contiguous in both buffers and are copied as slices.
pub(crate) fn copy_rows<T: Copy>(
    src_region: &Region,
    src: &[T],
    dst_region: &Region,
    dst: &mut [T],
    region: &Region,
) -> GridflowResult<()> {
    if region.is_empty() {
        return Ok(());
    }
    if !src_region.contains(region) || !dst_region.contains(region) {
        return Err(GridflowError::invalid_region(format!(
            "copy region {region} is outside source {src_region} or destination {dst_region}"
        )));
    }
    let row_len = region.extent(0) as usize;
    let rows = region.with_axis(0, region.start(0), 1);
    for row in rows.iter() {
        let (Some(so), Some(doff)) = (src_region.offset_of(&row), dst_region.offset_of(&row))
        else {
            return Err(GridflowError::invalid_region(format!(
                "row {:?} has no offset in the copied buffers",
                row.as_slice()
            )));
        };
        dst[doff..doff + row_len].copy_from_slice(&src[so..so + row_len]);
    }
    Ok(())
}

/// Samples covering one region, row-major with axis 0 fastest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PixelBuffer<T> {
    region: Region,
    data: Vec<T>,
}

impl<T: Sample> PixelBuffer<T> {
    /// Allocate a default-filled buffer for `region`.
    pub fn new(region: Region) -> GridflowResult<Self> {
        let n = sample_len(&region)?;
        Ok(Self {
            region,
            data: vec![T::default(); n],
        })
    }

    /// Wrap existing samples; `data.len()` must equal the region's sample count.
    pub fn from_vec(region: Region, data: Vec<T>) -> GridflowResult<Self> {
        let n = sample_len(&region)?;
        if data.len() != n {
            return Err(GridflowError::configuration(format!(
                "region {region} holds {n} samples but {} were supplied",
                data.len()
            )));
        }
        Ok(Self { region, data })
    }

    /// Region the buffer covers.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// All samples in offset order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Sample at `idx`, or `None` outside the buffer.
    pub fn get(&self, idx: &[i64]) -> Option<T> {
        self.region.offset_of(idx).map(|o| self.data[o])
    }

    /// Copy out the samples of a sub-region in offset order.
    pub fn extract(&self, region: &Region) -> GridflowResult<Vec<T>> {
        let mut out = vec![T::default(); sample_len(region)?];
        copy_rows(&self.region, &self.data, region, &mut out, region)?;
        Ok(out)
    }

    /// Point the buffer at `region`, reallocating only when the sample count changes.
    pub(crate) fn reshape(&mut self, region: Region) -> GridflowResult<()> {
        let n = sample_len(&region)?;
        if n != self.data.len() {
            self.data = vec![T::default(); n];
        }
        self.region = region;
        Ok(())
    }

    pub(crate) fn write_tile(&mut self, tile: &Tile<T>) -> GridflowResult<()> {
        self.write_region(&tile.region, &tile.data)
    }

    /// Store samples covering `region` (offset order) at their place in this buffer.
    pub(crate) fn write_region(&mut self, region: &Region, samples: &[T]) -> GridflowResult<()> {
        if samples.len() != sample_len(region)? {
            return Err(GridflowError::invalid_region(format!(
                "{} samples supplied for {region}",
                samples.len()
            )));
        }
        copy_rows(region, samples, &self.region, &mut self.data, region)
    }
}

/// Worker-owned output window for one sub-region.
///
/// A worker fills its tile; the dispatcher copies finished tiles into the output buffer after all
/// workers have joined.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile<T> {
    region: Region,
    data: Vec<T>,
}

impl<T: Sample> Tile<T> {
    pub(crate) fn new(region: Region) -> GridflowResult<Self> {
        let n = sample_len(&region)?;
        Ok(Self {
            region,
            data: vec![T::default(); n],
        })
    }

    /// Region this tile owns.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Sample at `idx`, or `None` outside the tile.
    pub fn get(&self, idx: &[i64]) -> Option<T> {
        self.region.offset_of(idx).map(|o| self.data[o])
    }

    /// Mutable sample at `idx`, or `None` outside the tile.
    pub fn get_mut(&mut self, idx: &[i64]) -> Option<&mut T> {
        self.region.offset_of(idx).map(|o| &mut self.data[o])
    }

    /// Write one sample; writing outside the tile is an [`GridflowError::InvalidRegion`].
    pub fn set(&mut self, idx: &[i64], value: T) -> GridflowResult<()> {
        let offset = self.region.offset_of(idx).ok_or_else(|| {
            GridflowError::invalid_region(format!(
                "index {idx:?} is outside the worker tile {}",
                self.region
            ))
        })?;
        self.data[offset] = value;
        Ok(())
    }

    /// Fill every sample from its index, in offset order.
    pub fn fill_with<F>(&mut self, mut f: F) -> GridflowResult<()>
    where
        F: FnMut(&[i64]) -> GridflowResult<T>,
    {
        for (slot, idx) in self.data.iter_mut().zip(self.region.iter()) {
            *slot = f(&idx)?;
        }
        Ok(())
    }

    /// All samples in offset order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// All samples in offset order, mutable.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// Shared read access to a data object's buffer.
#[derive(Debug)]
pub struct ImageView<'a, T> {
    guard: RwLockReadGuard<'a, PixelBuffer<T>>,
}

impl<T> Deref for ImageView<'_, T> {
    type Target = PixelBuffer<T>;

    fn deref(&self) -> &PixelBuffer<T> {
        &self.guard
    }
}

pub(crate) trait AnyTile: Send {
    fn region(&self) -> &Region;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Sample> AnyTile for Tile<T> {
    fn region(&self) -> &Region {
        &self.region
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Type-erased sample storage owned by a data object.
pub(crate) trait SampleStorage: Send + Sync {
    fn sample_type(&self) -> &'static str;
    fn sample_size(&self) -> usize;
    fn reshape(&self, region: &Region) -> GridflowResult<()>;
    fn release(&self);
    fn new_tile(&self, region: &Region) -> GridflowResult<Box<dyn AnyTile>>;
    fn commit(&self, tile: Box<dyn AnyTile>) -> GridflowResult<()>;
    fn as_any(&self) -> &dyn Any;
}

pub(crate) struct TypedStorage<T> {
    buffer: RwLock<PixelBuffer<T>>,
}

impl<T: Sample> TypedStorage<T> {
    pub(crate) fn new(buffer: PixelBuffer<T>) -> Self {
        Self {
            buffer: RwLock::new(buffer),
        }
    }

    pub(crate) fn view(&self) -> ImageView<'_, T> {
        ImageView {
            guard: self.buffer.read(),
        }
    }
}

impl<T: Sample> SampleStorage for TypedStorage<T> {
    fn sample_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn sample_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    fn reshape(&self, region: &Region) -> GridflowResult<()> {
        self.buffer.write().reshape(region.clone())
    }

    fn release(&self) {
        *self.buffer.write() = PixelBuffer::default();
    }

    fn new_tile(&self, region: &Region) -> GridflowResult<Box<dyn AnyTile>> {
        Ok(Box::new(Tile::<T>::new(region.clone())?))
    }

    fn commit(&self, tile: Box<dyn AnyTile>) -> GridflowResult<()> {
        let tile = tile.into_any().downcast::<Tile<T>>().map_err(|_| {
            GridflowError::configuration(format!(
                "worker tile does not hold {} samples",
                std::any::type_name::<T>()
            ))
        })?;
        self.buffer.write().write_tile(&tile)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/data/buffer.rs"]
mod tests;
