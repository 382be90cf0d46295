use crate::data::buffer::{PixelBuffer, Sample};
use crate::data::object::ImageInfo;
use crate::foundation::core::Region;
use crate::foundation::error::{GridflowError, GridflowResult};

/// Destination for a streamed output.
///
/// Ordering contract: `commit` is called once per piece, in ascending order along the streamed
/// axis, and the committed pieces exactly partition `info.largest`.
pub trait RegionSink<T>: Send {
    /// Called once before any piece is committed.
    fn begin(&mut self, info: &ImageInfo) -> GridflowResult<()>;
    /// Store the samples of one piece, in offset order.
    fn commit(&mut self, region: &Region, samples: &[T]) -> GridflowResult<()>;
    /// Called once after the last piece.
    fn end(&mut self) -> GridflowResult<()>;
}

/// Sink that reassembles committed pieces into one full-extent buffer.
#[derive(Debug, Default)]
pub struct InMemoryRegionSink<T> {
    info: Option<ImageInfo>,
    buffer: Option<PixelBuffer<T>>,
    pieces: Vec<Region>,
    finished: bool,
}

impl<T: Sample> InMemoryRegionSink<T> {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self {
            info: None,
            buffer: None,
            pieces: Vec::new(),
            finished: false,
        }
    }

    /// Metadata captured in `begin`, if any.
    pub fn info(&self) -> Option<&ImageInfo> {
        self.info.as_ref()
    }

    /// Committed piece regions, in commit order.
    pub fn pieces(&self) -> &[Region] {
        &self.pieces
    }

    /// Return `true` once `end` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The assembled buffer.
    pub fn buffer(&self) -> Option<&PixelBuffer<T>> {
        self.buffer.as_ref()
    }

    /// Take the assembled buffer.
    pub fn into_buffer(self) -> Option<PixelBuffer<T>> {
        self.buffer
    }
}

impl<T: Sample> RegionSink<T> for InMemoryRegionSink<T> {
    fn begin(&mut self, info: &ImageInfo) -> GridflowResult<()> {
        self.buffer = Some(PixelBuffer::new(info.largest.clone())?);
        self.info = Some(info.clone());
        self.pieces.clear();
        self.finished = false;
        Ok(())
    }

    fn commit(&mut self, region: &Region, samples: &[T]) -> GridflowResult<()> {
        let buffer = self
            .buffer
            .as_mut()
            .ok_or_else(|| GridflowError::configuration("sink received a piece before begin"))?;
        buffer.write_region(region, samples)?;
        self.pieces.push(region.clone());
        Ok(())
    }

    fn end(&mut self) -> GridflowResult<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream/sink.rs"]
mod tests;
