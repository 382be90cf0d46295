use std::sync::Arc;

use crate::data::buffer::Sample;
use crate::data::object::{DataObject, ImageInfo};
use crate::foundation::core::Region;
use crate::foundation::error::GridflowResult;
use crate::pipeline::property::Property;
use crate::pipeline::stage::{InformationContext, OutputTiles, Stage, StageInputs};

type SampleFn<T> = Arc<dyn Fn(&[i64]) -> T + Send + Sync>;

/// Source stage computing every sample from its index.
pub struct GeneratorSource<T> {
    /// Extent the source reports as its largest possible region.
    pub largest: Property<Region>,
    generator: SampleFn<T>,
}

impl<T: Sample> GeneratorSource<T> {
    /// Source over `largest` whose sample at `idx` is `f(idx)`. `f` must be pure.
    pub fn new(largest: Region, f: impl Fn(&[i64]) -> T + Send + Sync + 'static) -> Self {
        Self {
            largest: Property::new(largest),
            generator: Arc::new(f),
        }
    }

    /// Swap the sample function. Call through [`Producer::configure`](crate::Producer::configure).
    pub fn set_generator(&mut self, f: impl Fn(&[i64]) -> T + Send + Sync + 'static) {
        self.generator = Arc::new(f);
    }
}

impl<T: Sample> Stage for GeneratorSource<T> {
    fn name(&self) -> &'static str {
        "generator-source"
    }

    fn required_inputs(&self) -> usize {
        0
    }

    fn make_outputs(&self) -> Vec<DataObject> {
        vec![DataObject::new::<T>()]
    }

    fn generate_output_information(&self, info: &mut InformationContext<'_>) -> GridflowResult<()> {
        info.set_all_outputs(&ImageInfo::new(self.largest.get().clone()));
        Ok(())
    }

    fn generate_data(&self, _inputs: &StageInputs<'_>, outputs: &mut OutputTiles) -> GridflowResult<()> {
        let f = &self.generator;
        outputs.tile::<T>(0)?.fill_with(|idx| Ok(f(idx)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/generator.rs"]
mod tests;
