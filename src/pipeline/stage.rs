use std::sync::Arc;

use crate::data::buffer::{AnyTile, ImageView, Sample, Tile};
use crate::data::object::{DataObject, ImageInfo};
use crate::foundation::core::Region;
use crate::foundation::error::{GridflowError, GridflowResult};

/// A transformation stage: the algorithm behind a [`Producer`](crate::Producer).
///
/// The update coordinator drives the hooks in a fixed order:
/// 1. [`Stage::generate_output_information`] once inputs' metadata is current,
/// 2. [`Stage::enlarge_output_requested_region`] then [`Stage::generate_input_requested_region`]
///    once downstream requests are known,
/// 3. [`Stage::generate_data`] once per sub-region, possibly on several worker threads at once.
///
/// Parameter changes go through [`Producer::configure`](crate::Producer::configure) or
/// [`Producer::set`](crate::Producer::set) so the producer's stamp moves with them.
pub trait Stage: Send + Sync + 'static {
    /// Name used in logs and error messages.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Inputs that must be connected before an update may run.
    fn required_inputs(&self) -> usize {
        1
    }

    /// Create the (empty) output data objects this stage fills. Called once, at construction.
    fn make_outputs(&self) -> Vec<DataObject>;

    /// Whether [`Stage::generate_data`] may run on disjoint sub-regions independently.
    fn splittable(&self) -> bool {
        true
    }

    /// Compute every output's metadata from the inputs' metadata.
    ///
    /// Default: copy the first input's info to every output.
    fn generate_output_information(&self, info: &mut InformationContext<'_>) -> GridflowResult<()> {
        info.copy_first_input()
    }

    /// Grow a downstream request on output `output` before input requests are derived.
    ///
    /// The result is clipped to `largest` by the coordinator.
    fn enlarge_output_requested_region(
        &self,
        _output: usize,
        _requested: &mut Region,
        _largest: &Region,
    ) -> GridflowResult<()> {
        Ok(())
    }

    /// Derive each input's requested region from the output request.
    ///
    /// Default: the output request, clipped to each input's largest possible region.
    fn generate_input_requested_region(&self, req: &mut RequestContext) -> GridflowResult<()> {
        req.copy_output_to_inputs()
    }

    /// Fill `outputs.region()` of every output from already-buffered inputs.
    fn generate_data(&self, inputs: &StageInputs<'_>, outputs: &mut OutputTiles) -> GridflowResult<()>;
}

/// Metadata view handed to [`Stage::generate_output_information`].
pub struct InformationContext<'a> {
    inputs: &'a [Option<ImageInfo>],
    outputs: &'a mut [ImageInfo],
}

impl<'a> InformationContext<'a> {
    pub(crate) fn new(inputs: &'a [Option<ImageInfo>], outputs: &'a mut [ImageInfo]) -> Self {
        Self { inputs, outputs }
    }

    /// Number of input slots (connected or not).
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Metadata of input `idx`.
    pub fn input(&self, idx: usize) -> GridflowResult<&ImageInfo> {
        self.inputs
            .get(idx)
            .and_then(Option::as_ref)
            .ok_or_else(|| GridflowError::configuration(format!("input {idx} is not connected")))
    }

    /// Number of outputs.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Mutable metadata of output `idx`.
    pub fn output_mut(&mut self, idx: usize) -> GridflowResult<&mut ImageInfo> {
        let n = self.outputs.len();
        self.outputs
            .get_mut(idx)
            .ok_or_else(|| GridflowError::configuration(format!("output {idx} of {n} does not exist")))
    }

    /// Set every output's metadata to `info`.
    pub fn set_all_outputs(&mut self, info: &ImageInfo) {
        for out in self.outputs.iter_mut() {
            *out = info.clone();
        }
    }

    /// Copy the first input's metadata to every output.
    ///
    /// All connected inputs must share the first input's dimension.
    pub fn copy_first_input(&mut self) -> GridflowResult<()> {
        let first = self.input(0)?.clone();
        for (idx, other) in self.inputs.iter().enumerate().skip(1) {
            if let Some(other) = other
                && other.dimension() != first.dimension()
            {
                return Err(GridflowError::configuration(format!(
                    "input {idx} is {}-D but input 0 is {}-D",
                    other.dimension(),
                    first.dimension()
                )));
            }
        }
        self.set_all_outputs(&first);
        Ok(())
    }
}

/// Region bookkeeping handed to [`Stage::generate_input_requested_region`].
pub struct RequestContext {
    output_requested: Region,
    inputs_largest: Vec<Option<Region>>,
    inputs_requested: Vec<Option<Region>>,
}

impl RequestContext {
    pub(crate) fn new(output_requested: Region, inputs_largest: Vec<Option<Region>>) -> Self {
        let n = inputs_largest.len();
        Self {
            output_requested,
            inputs_largest,
            inputs_requested: vec![None; n],
        }
    }

    /// The (already enlarged) region this stage owes downstream.
    pub fn output_requested(&self) -> &Region {
        &self.output_requested
    }

    /// Number of input slots.
    pub fn input_count(&self) -> usize {
        self.inputs_largest.len()
    }

    /// Largest possible region of input `idx`.
    pub fn input_largest(&self, idx: usize) -> GridflowResult<&Region> {
        self.inputs_largest
            .get(idx)
            .and_then(Option::as_ref)
            .ok_or_else(|| GridflowError::configuration(format!("input {idx} is not connected")))
    }

    /// Intersect `region` with input `idx`'s largest possible region.
    pub fn clip_to_input(&self, idx: usize, region: &Region) -> GridflowResult<Region> {
        region.intersect(self.input_largest(idx)?)
    }

    /// Record the region input `idx` must deliver; it must lie inside that input's extent.
    pub fn set_input_requested(&mut self, idx: usize, region: Region) -> GridflowResult<()> {
        let largest = self.input_largest(idx)?;
        if !largest.contains(&region) {
            return Err(GridflowError::invalid_region(format!(
                "input {idx} request {region} is outside its largest possible region {largest}"
            )));
        }
        self.inputs_requested[idx] = Some(region);
        Ok(())
    }

    /// Request the output region (clipped) from every connected input.
    pub fn copy_output_to_inputs(&mut self) -> GridflowResult<()> {
        for idx in 0..self.input_count() {
            if self.inputs_largest[idx].is_none() {
                continue;
            }
            let clipped = self.clip_to_input(idx, &self.output_requested)?;
            self.set_input_requested(idx, clipped)?;
        }
        Ok(())
    }

    pub(crate) fn into_requests(self) -> Vec<Option<Region>> {
        self.inputs_requested
    }
}

/// Read access to a stage's inputs during [`Stage::generate_data`].
pub struct StageInputs<'a> {
    objects: &'a [Option<Arc<DataObject>>],
}

impl<'a> StageInputs<'a> {
    pub(crate) fn new(objects: &'a [Option<Arc<DataObject>>]) -> Self {
        Self { objects }
    }

    /// Number of input slots.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Return `true` when the stage has no input slots.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The data object connected to slot `idx`.
    pub fn object(&self, idx: usize) -> GridflowResult<&'a DataObject> {
        self.objects
            .get(idx)
            .and_then(Option::as_deref)
            .ok_or_else(|| GridflowError::configuration(format!("input {idx} is not connected")))
    }

    /// Buffered samples of input `idx`.
    pub fn image<T: Sample>(&self, idx: usize) -> GridflowResult<ImageView<'a, T>> {
        self.object(idx)?.view::<T>()
    }
}

/// One worker's output windows: a tile per output, covering the worker's sub-region clipped to
/// that output's buffered region. The tile is empty when the two do not overlap.
pub struct OutputTiles {
    region: Region,
    tiles: Vec<Box<dyn AnyTile>>,
}

impl OutputTiles {
    pub(crate) fn new(region: Region, tiles: Vec<Box<dyn AnyTile>>) -> Self {
        Self { region, tiles }
    }

    /// The sub-region this worker owes, across all outputs.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Number of outputs.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Return `true` when there are no outputs.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Typed tile for output `idx`.
    pub fn tile<T: Sample>(&mut self, idx: usize) -> GridflowResult<&mut Tile<T>> {
        let n = self.tiles.len();
        let tile = self
            .tiles
            .get_mut(idx)
            .ok_or_else(|| GridflowError::configuration(format!("output {idx} of {n} does not exist")))?;
        tile.as_any_mut().downcast_mut::<Tile<T>>().ok_or_else(|| {
            GridflowError::configuration(format!(
                "output {idx} does not hold {} samples",
                std::any::type_name::<T>()
            ))
        })
    }

    pub(crate) fn into_tiles(self) -> Vec<Box<dyn AnyTile>> {
        self.tiles
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/stage.rs"]
mod tests;
