//! Gridflow is a demand-driven execution engine for N-dimensional sample grids.
//!
//! A pipeline is a graph of [`Producer`]s, each running a [`Stage`] that reads input
//! [`DataObject`]s and fills its outputs. Asking an object to [`DataObject::update`] runs three
//! passes over everything upstream of it:
//!
//! - information: every output learns its largest possible region and metadata
//! - requested region: the request travels upstream, grown by each stage's halo
//! - data: stale producers run over exactly what was asked for, split across worker threads
//!
//! Unchanged producers are skipped by comparing modification stamps against the last successful
//! run, and a [`StreamingController`] repeats the update slab by slab for outputs too large to
//! hold at once.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Data objects and typed sample storage.
pub mod data;
/// Producers, stages and the update coordinator.
pub mod pipeline;
/// Stages with no inputs.
pub mod source;
/// Region partitioning and threaded dispatch.
pub mod split;
/// Piecewise (streamed) updates.
pub mod stream;

pub use crate::foundation::clock::TimeStamp;
pub use crate::foundation::core::{IndexVec, Region, RegionIter, SizeVec};
pub use crate::foundation::error::{GridflowError, GridflowResult};
pub use crate::foundation::ids::{ObjectId, ProducerId};

pub use crate::data::buffer::{ImageView, PixelBuffer, Sample, Tile};
pub use crate::data::object::{DataObject, ImageInfo};
pub use crate::pipeline::producer::{Producer, ProducerHandle};
pub use crate::pipeline::property::Property;
pub use crate::pipeline::stage::{
    InformationContext, OutputTiles, RequestContext, Stage, StageInputs,
};
pub use crate::pipeline::update::UpdateStats;
pub use crate::source::generator::GeneratorSource;
pub use crate::source::memory::MemorySource;
pub use crate::split::dispatch::ThreadingOpts;
pub use crate::split::splitter::{RegionSplitter, split_along, verify_partition};
pub use crate::stream::controller::{StreamStats, StreamingController, StreamingOpts};
pub use crate::stream::sink::{InMemoryRegionSink, RegionSink};
