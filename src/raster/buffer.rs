use crate::foundation::core::{Rgba8Premul, Size};
use crate::foundation::error::{DiffuseError, DiffuseResult};
use std::sync::Arc;

/// Immutable premultiplied-RGBA8 pixel buffer tagged with a device scale.
///
/// Pixels are tightly packed rows (`stride == width * 4`). The payload lives
/// behind an [`Arc`], so clones are cheap and buffers can cross worker
/// threads without copying. Buffers are never empty: constructors reject
/// zero-area dimensions, which keeps every downstream transform total.
///
/// `scale` is the density the buffer was rasterized at (device pixels per
/// logical point); [`RasterBuffer::logical_size`] is the size the buffer
/// occupies in the owner's coordinate space.
#[derive(Clone, Debug)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    scale: f32,
    data: Arc<Vec<u8>>,
}

impl RasterBuffer {
    /// Wrap premultiplied pixel bytes, validating `data.len() == w * h * 4`.
    pub fn new(width: u32, height: u32, scale: f32, data: Vec<u8>) -> DiffuseResult<Self> {
        if width == 0 || height == 0 {
            return Err(DiffuseError::validation(
                "RasterBuffer dimensions must be non-zero",
            ));
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(DiffuseError::validation("RasterBuffer scale must be > 0"));
        }
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| DiffuseError::validation("RasterBuffer size overflow"))?;
        if data.len() != expected_len {
            return Err(DiffuseError::validation(
                "RasterBuffer data must match width*height*4",
            ));
        }
        Ok(Self {
            width,
            height,
            scale,
            data: Arc::new(data),
        })
    }

    /// Synthesize a buffer filled with one premultiplied color.
    pub fn solid(color: Rgba8Premul, width: u32, height: u32, scale: f32) -> DiffuseResult<Self> {
        let px = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| DiffuseError::validation("RasterBuffer size overflow"))?;
        Self::new(width, height, scale, color.to_bytes().repeat(px))
    }

    /// Same pixels under a different density tag. Shares storage.
    pub fn with_scale(&self, scale: f32) -> DiffuseResult<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(DiffuseError::validation("RasterBuffer scale must be > 0"));
        }
        let mut out = self.clone();
        out.scale = scale;
        Ok(out)
    }

    /// Width in device pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in device pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Device pixels per logical point.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Raw premultiplied RGBA8 bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes per row.
    pub fn stride_bytes(&self) -> usize {
        self.width as usize * 4
    }

    /// Total payload size in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Size in logical points (`pixels / scale`).
    pub fn logical_size(&self) -> Size {
        let s = f64::from(self.scale);
        Size::new(f64::from(self.width) / s, f64::from(self.height) / s)
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8Premul> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some(Rgba8Premul {
            r: self.data[i],
            g: self.data[i + 1],
            b: self.data[i + 2],
            a: self.data[i + 3],
        })
    }

    /// `true` when both buffers share the same pixel storage.
    ///
    /// Identity transforms and cache hits hand back storage-sharing clones;
    /// this distinguishes those from merely equal pixels.
    pub fn shares_pixels(&self, other: &RasterBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_payload_length() {
        assert!(RasterBuffer::new(2, 2, 1.0, vec![0u8; 16]).is_ok());
        assert!(RasterBuffer::new(2, 2, 1.0, vec![0u8; 15]).is_err());
        assert!(RasterBuffer::new(0, 2, 1.0, vec![]).is_err());
        assert!(RasterBuffer::new(2, 2, 0.0, vec![0u8; 16]).is_err());
        assert!(RasterBuffer::new(2, 2, f32::NAN, vec![0u8; 16]).is_err());
    }

    #[test]
    fn solid_fills_every_pixel() {
        let c = Rgba8Premul::opaque(9, 8, 7);
        let buf = RasterBuffer::solid(c, 3, 2, 1.0).unwrap();
        assert_eq!(buf.byte_len(), 24);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(buf.pixel(x, y), Some(c));
            }
        }
        assert_eq!(buf.pixel(3, 0), None);
    }

    #[test]
    fn logical_size_divides_by_scale() {
        let buf = RasterBuffer::solid(Rgba8Premul::transparent(), 40, 20, 2.0).unwrap();
        assert_eq!(buf.logical_size(), Size::new(20.0, 10.0));
        assert_eq!(buf.stride_bytes(), 160);
    }

    #[test]
    fn with_scale_shares_storage() {
        let buf = RasterBuffer::solid(Rgba8Premul::transparent(), 4, 4, 2.0).unwrap();
        let retagged = buf.with_scale(1.0).unwrap();
        assert!(buf.shares_pixels(&retagged));
        assert_eq!(retagged.logical_size(), Size::new(4.0, 4.0));
        assert!(buf.with_scale(0.0).is_err());
    }
}
