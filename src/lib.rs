//! Diffuse renders soft, content-shaped drop shadows: snapshot a view's
//! pixels, blur them off the interactive thread, and hand the finished bitmap
//! back for display.
//!
//! The public API is engine-oriented:
//!
//! - Implement [`SnapshotSource`] and [`PresentationSink`] for your UI layer
//! - Register owners with a [`ShadowEngine`] and describe their shadows with
//!   a [`ShadowRecipe`]
//! - Call [`ShadowEngine::request_refresh`] freely; same-tick requests for an
//!   owner coalesce into one build
//! - Call [`ShadowEngine::tick`] once per idle cycle from the interactive
//!   thread; finished shadows arrive at the sink there
//!
//! Builds run on a worker pool, results are cached by caller-supplied content
//! identity, and every failure degrades to "no shadow" instead of surfacing
//! to the host.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cache;
pub mod engine;
pub mod host;
pub mod raster;
pub mod recipe;

mod foundation;
mod pipeline;
mod schedule;

pub use crate::cache::{ShadowCache, ShadowCacheOpts, ShadowCacheStats};
pub use crate::engine::{EngineStats, OwnerConfig, ShadowEngine, ShadowEngineOpts, TickStats};
pub use crate::foundation::core::{ContentKey, OwnerId, Point, Rect, Rgba8Premul, Size, Vec2};
pub use crate::foundation::error::{DiffuseError, DiffuseResult};
pub use crate::host::{PresentationSink, ShadowSurface, SnapshotSource};
pub use crate::raster::buffer::RasterBuffer;
pub use crate::recipe::{ShadowMode, ShadowRecipe};
