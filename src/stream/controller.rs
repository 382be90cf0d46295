use crate::data::buffer::Sample;
use crate::data::object::DataObject;
use crate::foundation::core::Region;
use crate::foundation::error::{GridflowError, GridflowResult};
use crate::split::splitter::split_along;
use crate::stream::sink::RegionSink;

/// How a streamed update is cut into pieces.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StreamingOpts {
    /// Upper bound on the bytes one piece of the streamed object may occupy.
    pub memory_budget_bytes: Option<u64>,
    /// Fixed piece count; takes precedence over the budget.
    pub number_of_pieces: Option<u64>,
    /// Axis the pieces are stacked along. `None` means the slowest-varying axis.
    pub axis: Option<usize>,
    /// Drop the streamed object's buffer after each piece is committed. Objects without a
    /// producer keep their data.
    pub release_after_commit: bool,
}

impl Default for StreamingOpts {
    fn default() -> Self {
        Self {
            memory_budget_bytes: None,
            number_of_pieces: None,
            axis: None,
            release_after_commit: true,
        }
    }
}

impl StreamingOpts {
    /// Stream in at most `pieces` pieces.
    pub fn pieces(pieces: u64) -> Self {
        Self {
            number_of_pieces: Some(pieces),
            ..Self::default()
        }
    }

    /// Stream in pieces no larger than `bytes`.
    pub fn budget(bytes: u64) -> Self {
        Self {
            memory_budget_bytes: Some(bytes),
            ..Self::default()
        }
    }

    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> GridflowResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| GridflowError::configuration(format!("streaming options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    fn validate(&self) -> GridflowResult<()> {
        if self.number_of_pieces == Some(0) {
            return Err(GridflowError::configuration(
                "streaming 'number_of_pieces' must be >= 1 when set",
            ));
        }
        if self.memory_budget_bytes == Some(0) {
            return Err(GridflowError::configuration(
                "streaming 'memory_budget_bytes' must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

/// Counters for one streamed update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Pieces committed to the sink.
    pub pieces: u64,
    /// Samples committed to the sink.
    pub samples_committed: u64,
    /// Producer executions summed over all pieces.
    pub producers_executed: u64,
    /// Producer cache hits summed over all pieces.
    pub producers_skipped: u64,
    /// Worker sub-regions summed over all pieces.
    pub pieces_dispatched: u64,
}

/// Drives one update per piece of an object's full extent and hands each piece to a sink.
#[derive(Clone, Debug, Default)]
pub struct StreamingController {
    opts: StreamingOpts,
}

impl StreamingController {
    /// Controller using `opts`.
    pub fn new(opts: StreamingOpts) -> Self {
        Self { opts }
    }

    /// Current options.
    pub fn opts(&self) -> &StreamingOpts {
        &self.opts
    }

    /// Partition `largest` into ascending slabs along the streaming axis.
    ///
    /// With a piece count every slab but the last is `extent / count` long. With a budget each
    /// piece holds as many whole index planes as fit in it (at least one). The final piece takes
    /// the remainder either way.
    pub fn plan(&self, largest: &Region, sample_size: usize) -> GridflowResult<Vec<Region>> {
        self.opts.validate()?;
        let d = largest.dimension();
        if d == 0 || largest.is_empty() {
            return Ok(Vec::new());
        }
        let axis = self.opts.axis.unwrap_or(d - 1);
        if axis >= d {
            return Err(GridflowError::configuration(format!(
                "streaming axis {axis} does not exist in a {d}-D region"
            )));
        }
        if let Some(count) = self.opts.number_of_pieces {
            return split_along(largest, axis, count);
        }
        let Some(budget) = self.opts.memory_budget_bytes else {
            return Ok(vec![largest.clone()]);
        };

        let extent = largest.extent(axis);
        let plane_bytes = (largest.number_of_samples() / extent).saturating_mul(sample_size as u64);
        let mut planes_per_piece = budget / plane_bytes.max(1);
        if planes_per_piece == 0 {
            tracing::warn!(
                budget,
                plane_bytes,
                "streaming budget is smaller than one index plane; streaming one plane per piece"
            );
            planes_per_piece = 1;
        }

        let mut pieces = Vec::new();
        let mut offset = 0u64;
        while offset < extent {
            let len = planes_per_piece.min(extent - offset);
            pieces.push(largest.with_axis(axis, largest.start(axis) + offset as i64, len));
            offset += len;
        }
        Ok(pieces)
    }

    /// Update `object` piece by piece over its whole largest possible region, committing every
    /// piece to `sink` before the next one is computed.
    ///
    /// On return the object's requested region is whatever it was before the call.
    #[tracing::instrument(skip_all, fields(object = object.id().0))]
    pub fn stream<T: Sample>(
        &self,
        object: &DataObject,
        sink: &mut dyn RegionSink<T>,
    ) -> GridflowResult<StreamStats> {
        object.update_output_information()?;
        let info = object.info();
        let pieces = self.plan(&info.largest, object.sample_size())?;
        tracing::debug!(largest = %info.largest, pieces = pieces.len(), "streaming");

        let saved = object.saved_request();
        sink.begin(&info)?;
        let mut stats = StreamStats::default();
        let result = self.stream_pieces(object, sink, &pieces, &mut stats);
        object.restore_request(saved);
        result?;
        sink.end()?;
        Ok(stats)
    }

    fn stream_pieces<T: Sample>(
        &self,
        object: &DataObject,
        sink: &mut dyn RegionSink<T>,
        pieces: &[Region],
        stats: &mut StreamStats,
    ) -> GridflowResult<()> {
        for piece in pieces {
            object.set_requested_region(piece.clone())?;
            let update = object.update()?;
            let samples = object.view::<T>()?.extract(piece)?;
            sink.commit(piece, &samples)?;
            tracing::trace!(%piece, "piece committed");
            if self.opts.release_after_commit && object.has_source() {
                object.release_data();
            }

            stats.pieces += 1;
            stats.samples_committed += samples.len() as u64;
            stats.producers_executed += update.producers_executed;
            stats.producers_skipped += update.producers_skipped;
            stats.pieces_dispatched += update.pieces_dispatched;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream/controller.rs"]
mod tests;
