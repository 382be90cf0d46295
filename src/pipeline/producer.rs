use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::data::object::{DataObject, ImageInfo};
use crate::foundation::clock::{AtomicTimeStamp, TimeStamp};
use crate::foundation::core::Region;
use crate::foundation::error::{GridflowError, GridflowResult};
use crate::foundation::ids::ProducerId;
use crate::pipeline::property::Property;
use crate::pipeline::stage::{InformationContext, OutputTiles, RequestContext, Stage, StageInputs};
use crate::pipeline::update::UpdateStats;
use crate::split::dispatch::{self, ThreadingOpts};

/// Type-erased producer interface the update coordinator walks.
pub(crate) trait ProducerNode: Send + Sync {
    fn id(&self) -> ProducerId;
    fn name(&self) -> &'static str;
    fn mtime(&self) -> TimeStamp;
    fn modified(&self);
    fn information_time(&self) -> TimeStamp;
    fn set_information_time(&self, t: TimeStamp);
    fn required_inputs(&self) -> usize;
    fn inputs(&self) -> Vec<Option<Arc<DataObject>>>;
    fn set_input(&self, idx: usize, input: Option<Arc<DataObject>>);
    fn outputs(&self) -> &[Arc<DataObject>];
    fn generate_output_information(&self) -> GridflowResult<()>;
    fn enlarge_output_requested_region(
        &self,
        output: usize,
        requested: &mut Region,
    ) -> GridflowResult<()>;
    fn generate_input_requested_region(
        &self,
        requested: &Region,
    ) -> GridflowResult<Vec<Option<Region>>>;
    /// Run the stage over the union of the outputs' buffered regions; returns the number of pieces
    /// dispatched.
    fn generate_data(&self) -> GridflowResult<usize>;
}

struct ProducerInner<S> {
    id: ProducerId,
    stage: RwLock<S>,
    mtime: AtomicTimeStamp,
    information_time: AtomicTimeStamp,
    inputs: Mutex<Vec<Option<Arc<DataObject>>>>,
    outputs: Vec<Arc<DataObject>>,
    threading: Mutex<ThreadingOpts>,
}

impl<S: Stage> ProducerNode for ProducerInner<S> {
    fn id(&self) -> ProducerId {
        self.id
    }

    fn name(&self) -> &'static str {
        self.stage.read().name()
    }

    fn mtime(&self) -> TimeStamp {
        self.mtime.get()
    }

    fn modified(&self) {
        self.mtime.touch();
    }

    fn information_time(&self) -> TimeStamp {
        self.information_time.get()
    }

    fn set_information_time(&self, t: TimeStamp) {
        self.information_time.set(t);
    }

    fn required_inputs(&self) -> usize {
        self.stage.read().required_inputs()
    }

    fn inputs(&self) -> Vec<Option<Arc<DataObject>>> {
        self.inputs.lock().clone()
    }

    fn set_input(&self, idx: usize, input: Option<Arc<DataObject>>) {
        let mut inputs = self.inputs.lock();
        if inputs.len() <= idx {
            if input.is_none() {
                return;
            }
            inputs.resize(idx + 1, None);
        }
        let same = match (&inputs[idx], &input) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }
        inputs[idx] = input;
        while matches!(inputs.last(), Some(None)) {
            inputs.pop();
        }
        drop(inputs);
        self.modified();
    }

    fn outputs(&self) -> &[Arc<DataObject>] {
        &self.outputs
    }

    fn generate_output_information(&self) -> GridflowResult<()> {
        let inputs: Vec<Option<ImageInfo>> = self
            .inputs()
            .iter()
            .map(|i| i.as_ref().map(|o| o.info()))
            .collect();
        let mut infos: Vec<ImageInfo> = self.outputs.iter().map(|o| o.info()).collect();
        self.stage
            .read()
            .generate_output_information(&mut InformationContext::new(&inputs, &mut infos))?;
        for (out, info) in self.outputs.iter().zip(infos) {
            out.store_information(info);
        }
        Ok(())
    }

    fn enlarge_output_requested_region(
        &self,
        output: usize,
        requested: &mut Region,
    ) -> GridflowResult<()> {
        let largest = self.outputs[output].largest_possible_region();
        self.stage
            .read()
            .enlarge_output_requested_region(output, requested, &largest)?;
        *requested = requested.intersect(&largest)?;
        Ok(())
    }

    fn generate_input_requested_region(
        &self,
        requested: &Region,
    ) -> GridflowResult<Vec<Option<Region>>> {
        let largest = self
            .inputs()
            .iter()
            .map(|i| i.as_ref().map(|o| o.largest_possible_region()))
            .collect();
        let mut req = RequestContext::new(requested.clone(), largest);
        self.stage.read().generate_input_requested_region(&mut req)?;
        Ok(req.into_requests())
    }

    fn generate_data(&self) -> GridflowResult<usize> {
        let stage = self.stage.read();
        let inputs = self.inputs();
        let threading = self.threading.lock().clone();
        let outputs = &self.outputs;
        let mut region = outputs[0].buffered_region();
        for out in &outputs[1..] {
            region = region.bounding_union(&out.buffered_region())?;
        }
        let stage_ref: &S = &stage;

        let results = dispatch::run(&region, &threading, stage_ref.splittable(), |piece| {
            let mut tiles = Vec::with_capacity(outputs.len());
            for out in outputs {
                tiles.push(out.new_tile(&piece.intersect(&out.buffered_region())?)?);
            }
            let mut tiles = OutputTiles::new(piece.clone(), tiles);
            stage_ref.generate_data(&StageInputs::new(&inputs), &mut tiles)?;
            Ok(tiles)
        })?;

        // Every finished tile is committed, even when a sibling failed.
        let pieces = results.len();
        let mut first_err = None;
        for result in results {
            match result {
                Ok(tiles) => {
                    for (out, tile) in outputs.iter().zip(tiles.into_tiles()) {
                        out.commit_tile(tile)?;
                    }
                }
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(pieces),
        }
    }
}

/// A pipeline node running stage `S`: owns the outputs, borrows the inputs.
///
/// Cloning yields another handle to the same node.
pub struct Producer<S: Stage> {
    inner: Arc<ProducerInner<S>>,
}

impl<S: Stage> Clone for Producer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Stage> Producer<S> {
    /// Wrap `stage`, creating its outputs.
    pub fn new(stage: S) -> GridflowResult<Self> {
        let outputs: Vec<Arc<DataObject>> =
            stage.make_outputs().into_iter().map(Arc::new).collect();
        if outputs.is_empty() {
            return Err(GridflowError::configuration(format!(
                "stage {} declares no outputs",
                stage.name()
            )));
        }
        let inner = Arc::new_cyclic(|weak: &Weak<ProducerInner<S>>| {
            let node: Weak<dyn ProducerNode> = weak.clone();
            for (idx, out) in outputs.iter().enumerate() {
                out.set_source(node.clone(), idx);
            }
            ProducerInner {
                id: ProducerId::fresh(),
                stage: RwLock::new(stage),
                mtime: AtomicTimeStamp::new(TimeStamp::next()),
                information_time: AtomicTimeStamp::new(TimeStamp::ZERO),
                inputs: Mutex::new(Vec::new()),
                outputs,
                threading: Mutex::new(ThreadingOpts::default()),
            }
        });
        Ok(Self { inner })
    }

    /// Process-unique identity.
    pub fn id(&self) -> ProducerId {
        self.inner.id
    }

    /// Stage name.
    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    /// Output `idx`.
    pub fn output(&self, idx: usize) -> GridflowResult<Arc<DataObject>> {
        self.inner.outputs.get(idx).cloned().ok_or_else(|| {
            GridflowError::configuration(format!(
                "{} has {} outputs, not {}",
                self.name(),
                self.inner.outputs.len(),
                idx + 1
            ))
        })
    }

    /// Output 0.
    pub fn primary_output(&self) -> Arc<DataObject> {
        Arc::clone(&self.inner.outputs[0])
    }

    /// All outputs.
    pub fn outputs(&self) -> &[Arc<DataObject>] {
        &self.inner.outputs
    }

    /// Connect `input` to slot `idx`; stamps the producer when the connection changes.
    pub fn set_input(&self, idx: usize, input: &Arc<DataObject>) {
        self.inner.set_input(idx, Some(Arc::clone(input)));
    }

    /// Disconnect slot `idx`.
    pub fn clear_input(&self, idx: usize) {
        self.inner.set_input(idx, None);
    }

    /// Object connected to slot `idx`.
    pub fn input(&self, idx: usize) -> Option<Arc<DataObject>> {
        self.inner.inputs.lock().get(idx).cloned().flatten()
    }

    /// Number of input slots (highest connected slot + 1).
    pub fn number_of_inputs(&self) -> usize {
        self.inner.inputs.lock().len()
    }

    /// Read the stage's current parameters.
    pub fn stage(&self) -> RwLockReadGuard<'_, S> {
        self.inner.stage.read()
    }

    /// Mutate the stage and stamp the producer.
    pub fn configure<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let out = f(&mut self.inner.stage.write());
        self.modified();
        out
    }

    /// Set one [`Property`] of the stage; stamps the producer only when the value changed.
    pub fn set<T: PartialEq>(
        &self,
        field: impl FnOnce(&mut S) -> &mut Property<T>,
        value: T,
    ) -> bool {
        let changed = field(&mut self.inner.stage.write()).set(value);
        if changed {
            self.modified();
        }
        changed
    }

    /// Stamp the producer as changed.
    pub fn modified(&self) {
        self.inner.modified();
    }

    /// Last change to the stage's parameters or connections.
    pub fn mtime(&self) -> TimeStamp {
        self.inner.mtime()
    }

    /// Fork/join settings used by the data pass.
    pub fn threading(&self) -> ThreadingOpts {
        self.inner.threading.lock().clone()
    }

    /// Replace the fork/join settings. Results do not depend on them, so no stamp is taken.
    pub fn set_threading(&self, opts: ThreadingOpts) {
        *self.inner.threading.lock() = opts;
    }

    /// Run the information pass for output 0.
    pub fn update_output_information(&self) -> GridflowResult<()> {
        self.inner.outputs[0].update_output_information()
    }

    /// Update output 0 over its requested region.
    pub fn update(&self) -> GridflowResult<UpdateStats> {
        self.inner.outputs[0].update()
    }

    /// Type-erased handle to this producer.
    pub fn handle(&self) -> ProducerHandle {
        ProducerHandle {
            node: self.inner.clone(),
        }
    }
}

impl<S: Stage> From<Producer<S>> for ProducerHandle {
    fn from(p: Producer<S>) -> Self {
        p.handle()
    }
}

/// Producer of unknown stage type, for holding heterogeneous graphs in one collection.
#[derive(Clone)]
pub struct ProducerHandle {
    node: Arc<dyn ProducerNode>,
}

impl ProducerHandle {
    /// Process-unique identity.
    pub fn id(&self) -> ProducerId {
        self.node.id()
    }

    /// Stage name.
    pub fn name(&self) -> &'static str {
        self.node.name()
    }

    /// Number of inputs that must be connected.
    pub fn required_inputs(&self) -> usize {
        self.node.required_inputs()
    }

    /// Output `idx`.
    pub fn output(&self, idx: usize) -> GridflowResult<Arc<DataObject>> {
        self.node.outputs().get(idx).cloned().ok_or_else(|| {
            GridflowError::configuration(format!("{} has no output {idx}", self.name()))
        })
    }

    /// Output 0.
    pub fn primary_output(&self) -> Arc<DataObject> {
        Arc::clone(&self.node.outputs()[0])
    }

    /// Connect `input` to slot `idx`.
    pub fn set_input(&self, idx: usize, input: &Arc<DataObject>) {
        self.node.set_input(idx, Some(Arc::clone(input)));
    }

    /// Stamp the producer as changed.
    pub fn modified(&self) {
        self.node.modified();
    }

    /// Last change to the producer.
    pub fn mtime(&self) -> TimeStamp {
        self.node.mtime()
    }

    /// Update output 0 over its requested region.
    pub fn update(&self) -> GridflowResult<UpdateStats> {
        self.node.outputs()[0].update()
    }
}

impl std::fmt::Debug for ProducerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerHandle")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/producer.rs"]
mod tests;
