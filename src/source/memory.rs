use std::sync::Arc;

use crate::data::buffer::{PixelBuffer, Sample, copy_rows};
use crate::data::object::{DataObject, ImageInfo};
use crate::foundation::error::GridflowResult;
use crate::pipeline::property::Property;
use crate::pipeline::stage::{InformationContext, OutputTiles, Stage, StageInputs};

/// Source stage serving samples that already live in memory.
///
/// The buffer is shared, not copied, until a worker reads its part of the requested region.
pub struct MemorySource<T> {
    buffer: Arc<PixelBuffer<T>>,
    /// Physical sample spacing reported downstream.
    pub spacing: Property<Vec<f64>>,
    /// Physical origin reported downstream.
    pub origin: Property<Vec<f64>>,
}

impl<T: Sample> MemorySource<T> {
    /// Serve `buffer` with unit spacing and a zero origin.
    pub fn new(buffer: PixelBuffer<T>) -> Self {
        let d = buffer.region().dimension();
        Self {
            buffer: Arc::new(buffer),
            spacing: Property::new(vec![1.0; d]),
            origin: Property::new(vec![0.0; d]),
        }
    }

    /// The served samples.
    pub fn buffer(&self) -> &PixelBuffer<T> {
        &self.buffer
    }

    /// Replace the served samples. Call through [`Producer::configure`](crate::Producer::configure)
    /// so downstream caches are invalidated.
    pub fn set_buffer(&mut self, buffer: PixelBuffer<T>) {
        let d = buffer.region().dimension();
        if d != self.buffer.region().dimension() {
            self.spacing.set(vec![1.0; d]);
            self.origin.set(vec![0.0; d]);
        }
        self.buffer = Arc::new(buffer);
    }
}

impl<T: Sample> Stage for MemorySource<T> {
    fn name(&self) -> &'static str {
        "memory-source"
    }

    fn required_inputs(&self) -> usize {
        0
    }

    fn make_outputs(&self) -> Vec<DataObject> {
        vec![DataObject::new::<T>()]
    }

    fn generate_output_information(&self, info: &mut InformationContext<'_>) -> GridflowResult<()> {
        let out = ImageInfo::new(self.buffer.region().clone())
            .with_spacing(self.spacing.get())?
            .with_origin(self.origin.get())?;
        info.set_all_outputs(&out);
        Ok(())
    }

    fn generate_data(&self, _inputs: &StageInputs<'_>, outputs: &mut OutputTiles) -> GridflowResult<()> {
        let tile = outputs.tile::<T>(0)?;
        let region = tile.region().clone();
        copy_rows(
            self.buffer.region(),
            self.buffer.as_slice(),
            &region,
            tile.as_mut_slice(),
            &region,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/memory.rs"]
mod tests;
