//! Premultiplied-RGBA8 pixel buffers and the transforms that shape shadows.
//!
//! Every operation takes immutable inputs and returns a new buffer; identity
//! cases return a clone sharing the input's pixel storage.

/// Gaussian-approximating three-pass box blur.
pub mod blur;
/// Validated pixel buffer type.
pub mod buffer;
/// Bridges to and from `image` crate types at the host boundary.
pub mod convert;
/// Stateless shadow transform kernels.
pub mod ops;
