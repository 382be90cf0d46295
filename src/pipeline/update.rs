use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::data::object::DataObject;
use crate::foundation::clock::TimeStamp;
use crate::foundation::core::Region;
use crate::foundation::error::{GridflowError, GridflowResult};
use crate::foundation::ids::{ObjectId, ProducerId};
use crate::pipeline::producer::ProducerNode;

/// Counters for one `update()` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Producers in the transitive input closure of the updated object.
    pub producers_total: u64,
    /// Producers whose stage ran.
    pub producers_executed: u64,
    /// Producers whose cached outputs were reused.
    pub producers_skipped: u64,
    /// Sub-regions handed to workers across all executed producers.
    pub pieces_dispatched: u64,
}

/// Producers upstream of `object`, upstream-first (every producer after all of its sources).
fn collect_graph(object: &DataObject) -> GridflowResult<Vec<Arc<dyn ProducerNode>>> {
    let mut order = Vec::new();
    if let Some((root, _)) = object.source() {
        let mut done = HashSet::new();
        let mut on_path = HashSet::new();
        visit(root, &mut done, &mut on_path, &mut order)?;
    }
    Ok(order)
}

fn visit(
    node: Arc<dyn ProducerNode>,
    done: &mut HashSet<ProducerId>,
    on_path: &mut HashSet<ProducerId>,
    order: &mut Vec<Arc<dyn ProducerNode>>,
) -> GridflowResult<()> {
    let id = node.id();
    if done.contains(&id) {
        return Ok(());
    }
    if !on_path.insert(id) {
        return Err(GridflowError::configuration(format!(
            "producer graph has a cycle through {}",
            node.name()
        )));
    }
    for input in node.inputs().into_iter().flatten() {
        if let Some((upstream, _)) = input.source() {
            visit(upstream, done, on_path, order)?;
        }
    }
    on_path.remove(&id);
    done.insert(id);
    order.push(node);
    Ok(())
}

fn verify_inputs(node: &dyn ProducerNode) -> GridflowResult<()> {
    let required = node.required_inputs();
    let inputs = node.inputs();
    for idx in 0..required {
        if inputs.get(idx).is_none_or(Option::is_none) {
            return Err(GridflowError::configuration(format!(
                "{} requires {required} inputs but input {idx} is not connected",
                node.name()
            )));
        }
    }
    Ok(())
}

/// Information pass: regenerate metadata wherever a producer or anything upstream changed.
fn propagate_information(order: &[Arc<dyn ProducerNode>]) -> GridflowResult<()> {
    for node in order {
        verify_inputs(node.as_ref())?;
        let mut newest = node.mtime();
        for input in node.inputs().iter().flatten() {
            newest = newest.max(input.pipeline_mtime());
        }
        let info_time = node.information_time();
        if info_time.is_zero() || newest > info_time {
            tracing::debug!(producer = node.name(), "generating output information");
            node.generate_output_information()?;
            node.set_information_time(TimeStamp::next());
        }
        for out in node.outputs() {
            out.set_pipeline_mtime(newest);
        }
    }
    Ok(())
}

/// Requested-region pass, downstream-first.
///
/// A producer is visited only after every consumer inside the closure has added its request, so
/// an object shared by several consumers is asked for the bounding union of their needs. Every
/// object in the closure except `object` itself gets its computed request stored.
fn propagate_requested_region(
    object: &DataObject,
    target: &Region,
    order: &[Arc<dyn ProducerNode>],
) -> GridflowResult<HashMap<ObjectId, Region>> {
    let largest = object.largest_possible_region();
    if !largest.contains(target) {
        return Err(GridflowError::invalid_region(format!(
            "requested region {target} is outside the largest possible region {largest}"
        )));
    }
    let mut requests = HashMap::new();
    requests.insert(object.id(), target.clone());

    for node in order.iter().rev() {
        let mut combined: Option<Region> = None;
        for (idx, out) in node.outputs().iter().enumerate() {
            let Some(req) = requests.get(&out.id()) else {
                continue;
            };
            let mut req = req.clone();
            node.enlarge_output_requested_region(idx, &mut req)?;
            combined = Some(match combined {
                Some(c) => c.bounding_union(&req)?,
                None => req,
            });
        }
        let Some(combined) = combined else {
            continue;
        };
        tracing::trace!(producer = node.name(), requested = %combined, "output request");
        for out in node.outputs() {
            let clipped = combined.intersect(&out.largest_possible_region())?;
            if out.id() != object.id() {
                out.store_requested_region(clipped.clone());
            }
            requests.insert(out.id(), clipped);
        }

        let input_requests = node.generate_input_requested_region(&combined)?;
        for (input, req) in node.inputs().iter().zip(input_requests) {
            let (Some(input), Some(req)) = (input, req) else {
                continue;
            };
            let merged = match requests.get(&input.id()) {
                Some(prev) => prev.bounding_union(&req)?,
                None => req,
            };
            input.store_requested_region(merged.clone());
            requests.insert(input.id(), merged);
        }
    }
    Ok(requests)
}

fn needs_execution(
    node: &dyn ProducerNode,
    inputs: &[Option<Arc<DataObject>>],
    requests: &HashMap<ObjectId, Region>,
) -> bool {
    let outputs = node.outputs();
    let last = outputs
        .iter()
        .map(|o| o.update_time())
        .min()
        .unwrap_or(TimeStamp::ZERO);
    if last.is_zero() || node.mtime() > last {
        return true;
    }
    if inputs.iter().flatten().any(|i| i.data_time() > last) {
        return true;
    }
    outputs.iter().any(|o| {
        o.mtime() > last
            || requests
                .get(&o.id())
                .is_some_and(|req| !o.buffered_region().contains(req))
    })
}

/// Data pass, upstream-first: run each stale producer once over its requested region.
fn generate(
    order: &[Arc<dyn ProducerNode>],
    requests: &HashMap<ObjectId, Region>,
) -> GridflowResult<UpdateStats> {
    let mut stats = UpdateStats {
        producers_total: order.len() as u64,
        ..UpdateStats::default()
    };
    for node in order {
        let outputs = node.outputs();
        if !outputs.iter().any(|o| requests.contains_key(&o.id())) {
            stats.producers_skipped += 1;
            continue;
        }
        let inputs = node.inputs();
        for input in inputs.iter().flatten() {
            if let Some(req) = requests.get(&input.id())
                && !input.buffered_region().contains(req)
            {
                return Err(GridflowError::invalid_region(format!(
                    "{} needs {req} from an input that only buffers {}",
                    node.name(),
                    input.buffered_region()
                )));
            }
        }

        if !needs_execution(node.as_ref(), &inputs, requests) {
            tracing::debug!(producer = node.name(), "cache hit");
            stats.producers_skipped += 1;
            continue;
        }

        // Stays invalid unless generation succeeds, so a failed run is retried in full.
        for out in outputs {
            out.set_update_time(TimeStamp::ZERO);
            let region = requests
                .get(&out.id())
                .cloned()
                .unwrap_or_else(|| out.requested_region());
            out.set_buffered_region(region)?;
        }
        tracing::debug!(
            producer = node.name(),
            region = %outputs[0].buffered_region(),
            "executing"
        );
        let pieces = node.generate_data()?;
        let t = TimeStamp::next();
        for out in outputs {
            out.set_update_time(t);
        }
        stats.producers_executed += 1;
        stats.pieces_dispatched += pieces as u64;
    }
    Ok(stats)
}

/// Information pass only.
pub(crate) fn update_output_information(object: &DataObject) -> GridflowResult<()> {
    let order = collect_graph(object)?;
    propagate_information(&order)
}

/// Full three-pass update of `object`'s requested region.
///
/// Each pass completes over the whole closure before the next one starts.
#[tracing::instrument(skip(object), fields(object = object.id().0))]
pub(crate) fn update(object: &DataObject) -> GridflowResult<UpdateStats> {
    let order = collect_graph(object)?;
    propagate_information(&order)?;
    let target = object.demanded_region();
    let requests = propagate_requested_region(object, &target, &order)?;
    let stats = generate(&order, &requests)?;

    let buffered = object.buffered_region();
    if !buffered.contains(&target) {
        return Err(GridflowError::invalid_region(format!(
            "object buffers {buffered} but {target} was requested and it has no producer"
        )));
    }
    tracing::debug!(
        executed = stats.producers_executed,
        skipped = stats.producers_skipped,
        "update finished"
    );
    Ok(stats)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/update.rs"]
mod tests;
