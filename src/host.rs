//! Traits the embedding host implements, and the handoff value it receives.

use crate::foundation::core::Rect;
use crate::raster::buffer::RasterBuffer;

/// Host-side producer of content snapshots.
///
/// Called from worker threads at build time, so implementations must be able
/// to rasterize off the interactive thread. The engine holds sources weakly;
/// a source that has been dropped simply stops casting a shadow.
pub trait SnapshotSource: Send + Sync {
    /// Rasterize the current content at `scale` device pixels per logical
    /// point. Returns `None` when there is nothing to rasterize.
    fn snapshot(&self, scale: f32) -> Option<RasterBuffer>;
}

/// Host-side consumer of finished shadows.
///
/// [`PresentationSink::present`] is invoked only from the thread driving
/// [`ShadowEngine::tick`](crate::engine::ShadowEngine::tick), so sinks may
/// touch interactive-thread state without further synchronization. Sinks are
/// held weakly; a dropped sink turns handoff into a no-op.
pub trait PresentationSink: Send + Sync {
    /// Display a finished shadow, or clear the current one when `None`.
    fn present(&self, surface: Option<ShadowSurface>);
}

/// A finished shadow ready for display.
#[derive(Clone, Debug)]
pub struct ShadowSurface {
    /// Shadow pixels, premultiplied RGBA8.
    pub image: RasterBuffer,
    /// Where to place the image in the owner's logical coordinate space:
    /// centered on the owner's center plus the recipe offset, sized to the
    /// image's logical size.
    pub placement: Rect,
    /// Display opacity to apply at composition time; not baked into pixels,
    /// so cached images can be reused across opacity changes.
    pub opacity: f32,
}
