use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::data::buffer::{AnyTile, ImageView, PixelBuffer, Sample, SampleStorage, TypedStorage};
use crate::foundation::clock::TimeStamp;
use crate::foundation::core::Region;
use crate::foundation::error::{GridflowError, GridflowResult};
use crate::foundation::ids::ObjectId;
use crate::pipeline::producer::ProducerNode;
use crate::pipeline::update::{self, UpdateStats};

/// Metadata a producer computes during the information pass and hands downstream.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageInfo {
    /// Full extent the producer can deliver.
    pub largest: Region,
    /// Physical distance between samples, per axis.
    pub spacing: SmallVec<[f64; 4]>,
    /// Physical position of index zero, per axis.
    pub origin: SmallVec<[f64; 4]>,
}

impl ImageInfo {
    /// Info with unit spacing and zero origin.
    pub fn new(largest: Region) -> Self {
        let d = largest.dimension();
        Self {
            largest,
            spacing: SmallVec::from_elem(1.0, d),
            origin: SmallVec::from_elem(0.0, d),
        }
    }

    /// Number of axes.
    pub fn dimension(&self) -> usize {
        self.largest.dimension()
    }

    /// Replace the spacing; every component must be finite and positive.
    pub fn with_spacing(mut self, spacing: &[f64]) -> GridflowResult<Self> {
        if spacing.len() != self.dimension() {
            return Err(GridflowError::configuration(format!(
                "spacing has {} axes but the image has {}",
                spacing.len(),
                self.dimension()
            )));
        }
        if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(GridflowError::configuration(
                "spacing components must be finite and > 0",
            ));
        }
        self.spacing = SmallVec::from_slice(spacing);
        Ok(self)
    }

    /// Replace the origin.
    pub fn with_origin(mut self, origin: &[f64]) -> GridflowResult<Self> {
        if origin.len() != self.dimension() {
            return Err(GridflowError::configuration(format!(
                "origin has {} axes but the image has {}",
                origin.len(),
                self.dimension()
            )));
        }
        self.origin = SmallVec::from_slice(origin);
        Ok(self)
    }
}

#[derive(Debug)]
struct ObjectState {
    info: ImageInfo,
    requested: Option<Region>,
    requested_by_caller: bool,
    buffered: Region,
    mtime: TimeStamp,
    pipeline_mtime: TimeStamp,
    update_time: TimeStamp,
}

/// A data object's request as it stood before a streamed update.
#[derive(Clone, Debug)]
pub(crate) struct SavedRequest {
    requested: Option<Region>,
    by_caller: bool,
}

pub(crate) struct SourceLink {
    producer: Weak<dyn ProducerNode>,
    output: usize,
}

/// Data at one point of the pipeline graph.
///
/// Tracks three regions (largest possible, requested, buffered) and three stamps: `mtime` for
/// direct modification, the pipeline mtime (newest change anywhere upstream, known after the
/// information pass) and the update time (when the buffered contents were last produced).
///
/// Shared as `Arc<DataObject>`. The producing stage holds it strongly; the object points back at
/// its producer weakly.
pub struct DataObject {
    id: ObjectId,
    state: Mutex<ObjectState>,
    source: Mutex<Option<SourceLink>>,
    storage: Box<dyn SampleStorage>,
}

impl std::fmt::Debug for DataObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataObject")
            .field("id", &self.id)
            .field("sample_type", &self.storage.sample_type())
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl DataObject {
    fn with_storage(info: ImageInfo, buffered: Region, storage: Box<dyn SampleStorage>) -> Self {
        Self {
            id: ObjectId::fresh(),
            state: Mutex::new(ObjectState {
                info,
                requested: None,
                requested_by_caller: false,
                buffered,
                mtime: TimeStamp::next(),
                pipeline_mtime: TimeStamp::ZERO,
                update_time: TimeStamp::ZERO,
            }),
            source: Mutex::new(None),
            storage,
        }
    }

    /// Empty object holding `T` samples: no buffer and an unknown extent.
    pub fn new<T: Sample>() -> Self {
        Self::with_storage(
            ImageInfo::default(),
            Region::default(),
            Box::new(TypedStorage::new(PixelBuffer::<T>::default())),
        )
    }

    /// Source-less object that already holds data covering `region`.
    pub fn from_samples<T: Sample>(region: Region, samples: Vec<T>) -> GridflowResult<Self> {
        Self::from_buffer(ImageInfo::new(region.clone()), PixelBuffer::from_vec(region, samples)?)
    }

    /// Source-less object from a filled buffer; the buffer must cover `info.largest`.
    pub fn from_buffer<T: Sample>(info: ImageInfo, buffer: PixelBuffer<T>) -> GridflowResult<Self> {
        if buffer.region() != &info.largest {
            return Err(GridflowError::configuration(format!(
                "buffer covers {} but the largest possible region is {}",
                buffer.region(),
                info.largest
            )));
        }
        let buffered = buffer.region().clone();
        let obj = Self::with_storage(info, buffered, Box::new(TypedStorage::new(buffer)));
        obj.state.lock().update_time = TimeStamp::next();
        Ok(obj)
    }

    /// Process-unique identity.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Number of axes of the largest possible region (0 until known).
    pub fn dimension(&self) -> usize {
        self.state.lock().info.dimension()
    }

    /// Rust type name of the held samples.
    pub fn sample_type(&self) -> &'static str {
        self.storage.sample_type()
    }

    /// Size in bytes of one sample.
    pub fn sample_size(&self) -> usize {
        self.storage.sample_size()
    }

    /// Metadata computed by the last information pass (or set directly).
    pub fn info(&self) -> ImageInfo {
        self.state.lock().info.clone()
    }

    /// Replace the metadata of a source-less object and mark it modified.
    pub fn set_info(&self, info: ImageInfo) {
        self.state.lock().info = info;
        self.modified();
    }

    pub(crate) fn store_information(&self, info: ImageInfo) {
        self.state.lock().info = info;
    }

    /// Full extent available from the producer.
    pub fn largest_possible_region(&self) -> Region {
        self.state.lock().info.largest.clone()
    }

    /// Replace the largest possible region and mark the object modified.
    pub fn set_largest_possible_region(&self, region: Region) {
        self.state.lock().info.largest = region;
        self.modified();
    }

    /// Region a consumer currently needs; defaults to the largest possible region.
    pub fn requested_region(&self) -> Region {
        let st = self.state.lock();
        st.requested.clone().unwrap_or_else(|| st.info.largest.clone())
    }

    /// Set the region a consumer needs.
    ///
    /// Fails with [`GridflowError::InvalidRegion`] unless `region` lies inside the largest
    /// possible region; run [`DataObject::update_output_information`] first when the extent is
    /// not known yet.
    pub fn set_requested_region(&self, region: Region) -> GridflowResult<()> {
        let mut st = self.state.lock();
        if !st.info.largest.contains(&region) {
            return Err(GridflowError::invalid_region(format!(
                "requested region {region} is outside the largest possible region {}",
                st.info.largest
            )));
        }
        st.requested = Some(region);
        st.requested_by_caller = true;
        Ok(())
    }

    /// Forget any request; the object is then updated over its whole largest possible region.
    pub fn set_requested_region_to_largest_possible_region(&self) {
        let mut st = self.state.lock();
        st.requested = None;
        st.requested_by_caller = false;
    }

    /// Region an update of this object must produce: the caller's request, or the whole extent
    /// when none was made. Requests left behind by earlier propagation do not count.
    pub(crate) fn demanded_region(&self) -> Region {
        let st = self.state.lock();
        match &st.requested {
            Some(r) if st.requested_by_caller => r.clone(),
            _ => st.info.largest.clone(),
        }
    }

    /// Current request, including whether the caller set it.
    pub(crate) fn saved_request(&self) -> SavedRequest {
        let st = self.state.lock();
        SavedRequest {
            requested: st.requested.clone(),
            by_caller: st.requested_by_caller,
        }
    }

    /// Put back a request taken with [`DataObject::saved_request`].
    pub(crate) fn restore_request(&self, saved: SavedRequest) {
        let mut st = self.state.lock();
        st.requested = saved.requested;
        st.requested_by_caller = saved.by_caller;
    }

    /// Store a request computed by the requested-region pass.
    pub(crate) fn store_requested_region(&self, region: Region) {
        let mut st = self.state.lock();
        st.requested = Some(region);
        st.requested_by_caller = false;
    }

    /// Region currently materialized in memory.
    pub fn buffered_region(&self) -> Region {
        self.state.lock().buffered.clone()
    }

    /// Point the buffer at `region`, reallocating when the sample count changes.
    pub fn set_buffered_region(&self, region: Region) -> GridflowResult<()> {
        self.storage.reshape(&region)?;
        self.state.lock().buffered = region;
        Ok(())
    }

    /// Advance the object's modification stamp.
    pub fn modified(&self) {
        self.state.lock().mtime = TimeStamp::next();
    }

    /// Last direct modification.
    pub fn mtime(&self) -> TimeStamp {
        self.state.lock().mtime
    }

    /// When the buffered contents were last produced; [`TimeStamp::ZERO`] when invalid.
    pub fn update_time(&self) -> TimeStamp {
        self.state.lock().update_time
    }

    /// Newest change anywhere upstream, as of the last information pass.
    pub fn pipeline_mtime(&self) -> TimeStamp {
        let st = self.state.lock();
        st.pipeline_mtime.max(st.mtime)
    }

    /// Newest event that could have changed the buffered samples.
    pub(crate) fn data_time(&self) -> TimeStamp {
        let st = self.state.lock();
        st.update_time.max(st.mtime)
    }

    pub(crate) fn set_pipeline_mtime(&self, t: TimeStamp) {
        self.state.lock().pipeline_mtime = t;
    }

    pub(crate) fn set_update_time(&self, t: TimeStamp) {
        self.state.lock().update_time = t;
    }

    /// Propagate metadata from upstream (information pass only).
    pub fn update_output_information(&self) -> GridflowResult<()> {
        update::update_output_information(self)
    }

    /// Bring the requested region up to date: information, requested-region and data passes.
    pub fn update(&self) -> GridflowResult<UpdateStats> {
        update::update(self)
    }

    /// Shared read access to the buffered samples.
    pub fn view<T: Sample>(&self) -> GridflowResult<ImageView<'_, T>> {
        let typed = self
            .storage
            .as_any()
            .downcast_ref::<TypedStorage<T>>()
            .ok_or_else(|| {
                GridflowError::configuration(format!(
                    "object holds {} samples but {} were requested",
                    self.storage.sample_type(),
                    std::any::type_name::<T>()
                ))
            })?;
        Ok(typed.view())
    }

    /// Drop the buffer; the next update recomputes it.
    pub fn release_data(&self) {
        self.storage.release();
        let mut st = self.state.lock();
        st.buffered = Region::empty(st.info.dimension());
        st.update_time = TimeStamp::ZERO;
    }

    pub(crate) fn new_tile(&self, region: &Region) -> GridflowResult<Box<dyn AnyTile>> {
        self.storage.new_tile(region)
    }

    pub(crate) fn commit_tile(&self, tile: Box<dyn AnyTile>) -> GridflowResult<()> {
        self.storage.commit(tile)
    }

    pub(crate) fn set_source(&self, producer: Weak<dyn ProducerNode>, output: usize) {
        *self.source.lock() = Some(SourceLink { producer, output });
    }

    /// Producer that generates this object, if it is still alive.
    pub(crate) fn source(&self) -> Option<(Arc<dyn ProducerNode>, usize)> {
        let link = self.source.lock();
        let link = link.as_ref()?;
        link.producer.upgrade().map(|p| (p, link.output))
    }

    /// Return `true` when a live producer generates this object.
    pub fn has_source(&self) -> bool {
        self.source().is_some()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/data/object.rs"]
mod tests;
