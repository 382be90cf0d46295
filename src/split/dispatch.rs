use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use rayon::prelude::*;

use crate::foundation::core::Region;
use crate::foundation::error::{GridflowError, GridflowResult};
use crate::split::splitter::{RegionSplitter, verify_partition};

/// Fork/join controls for a producer's data pass.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ThreadingOpts {
    /// Split the region across workers when `true`; run one piece on the calling thread otherwise.
    pub parallel: bool,
    /// Worker count. `None` uses the rayon global pool size.
    pub threads: Option<usize>,
    /// How the region is partitioned.
    pub splitter: RegionSplitter,
}

impl Default for ThreadingOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            splitter: RegionSplitter::default(),
        }
    }
}

impl ThreadingOpts {
    /// Single piece, calling thread.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Parallel with an explicit worker count.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            ..Self::default()
        }
    }

    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> GridflowResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| GridflowError::configuration(format!("threading options: {e}")))?;
        opts.worker_count()?;
        Ok(opts)
    }

    /// Number of pieces a splittable region is cut into.
    pub fn worker_count(&self) -> GridflowResult<usize> {
        match self.threads {
            Some(0) => Err(GridflowError::configuration(
                "threading 'threads' must be >= 1 when set",
            )),
            Some(n) => Ok(n),
            None => Ok(rayon::current_num_threads().max(1)),
        }
    }
}

/// Split `region` and run `work` once per piece, joining all workers before returning.
///
/// Results come back in piece order. A worker error or panic does not stop its siblings; it is
/// reported in its own slot once everything has joined.
pub(crate) fn run<T, F>(
    region: &Region,
    opts: &ThreadingOpts,
    splittable: bool,
    work: F,
) -> GridflowResult<Vec<GridflowResult<T>>>
where
    T: Send,
    F: Fn(&Region) -> GridflowResult<T> + Sync,
{
    let workers = if splittable && opts.parallel {
        opts.worker_count()?
    } else {
        1
    };
    let pieces = if region.is_empty() {
        Vec::new()
    } else if workers == 1 {
        vec![region.clone()]
    } else {
        opts.splitter.split(region, workers)?
    };
    verify_partition(region, &pieces)?;
    tracing::trace!(%region, workers, pieces = pieces.len(), "dispatching");

    if pieces.len() <= 1 {
        return Ok(pieces.iter().map(|p| guarded(&work, p)).collect());
    }

    let job = || {
        pieces
            .par_iter()
            .map(|p| guarded(&work, p))
            .collect::<Vec<_>>()
    };
    match opts.threads {
        Some(n) => Ok(build_thread_pool(n)?.install(job)),
        None => Ok(job()),
    }
}

fn guarded<T, F>(work: &F, piece: &Region) -> GridflowResult<T>
where
    F: Fn(&Region) -> GridflowResult<T>,
{
    match catch_unwind(AssertUnwindSafe(|| work(piece))) {
        Ok(result) => result,
        Err(payload) => Err(GridflowError::compute(format!(
            "worker for {piece} panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return *s;
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.as_str();
    }
    "non-string panic payload"
}

fn build_thread_pool(threads: usize) -> GridflowResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| GridflowError::compute(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/split/dispatch.rs"]
mod tests;
