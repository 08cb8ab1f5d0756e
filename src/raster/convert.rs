use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{DiffuseError, DiffuseResult};
use crate::raster::buffer::RasterBuffer;

/// Premultiply a straight-alpha [`image::RgbaImage`] into a [`RasterBuffer`].
///
/// `scale` tags the buffer with the density the image was rasterized at.
pub fn image_to_buffer(img: &image::RgbaImage, scale: f32) -> DiffuseResult<RasterBuffer> {
    let (w, h) = img.dimensions();
    let mut data = Vec::with_capacity(img.as_raw().len());
    for px in img.as_raw().chunks_exact(4) {
        let p = Rgba8Premul::from_straight_rgba(px[0], px[1], px[2], px[3]);
        data.extend_from_slice(&p.to_bytes());
    }
    RasterBuffer::new(w, h, scale, data)
}

/// Unpremultiply a [`RasterBuffer`] into a straight-alpha [`image::RgbaImage`].
///
/// Fully transparent pixels come out as transparent black; their color is
/// unrecoverable after premultiplication.
pub fn buffer_to_image(buf: &RasterBuffer) -> DiffuseResult<image::RgbaImage> {
    fn unpremul(c: u8, a: u8) -> u8 {
        let v = (u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a);
        v.min(255) as u8
    }

    let mut data = Vec::with_capacity(buf.byte_len());
    for px in buf.data().chunks_exact(4) {
        let a = px[3];
        if a == 0 {
            data.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        data.extend_from_slice(&[unpremul(px[0], a), unpremul(px[1], a), unpremul(px[2], a), a]);
    }
    image::RgbaImage::from_raw(buf.width(), buf.height(), data)
        .ok_or_else(|| DiffuseError::raster("image dimensions do not match payload"))
}
