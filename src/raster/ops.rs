use crate::foundation::error::{DiffuseError, DiffuseResult};
use crate::foundation::math::mul_div255_u8;
use crate::raster::buffer::RasterBuffer;

/// Scale RGB toward black by `amount` (clamped to `[0, 1]`), preserving alpha.
///
/// `amount = 0` is identity; `amount = 1` yields the black silhouette of the
/// source's alpha shape. Premultiplied validity is preserved since channels
/// only ever shrink.
pub fn darken(src: &RasterBuffer, amount: f32) -> DiffuseResult<RasterBuffer> {
    let amount = if amount.is_nan() {
        0.0
    } else {
        amount.clamp(0.0, 1.0)
    };
    if amount <= 0.0 {
        return Ok(src.clone());
    }

    let keep = 255u16 - ((amount * 255.0).round() as u16);
    let mut out = src.data().to_vec();
    for px in out.chunks_exact_mut(4) {
        px[0] = mul_div255_u8(u16::from(px[0]), keep);
        px[1] = mul_div255_u8(u16::from(px[1]), keep);
        px[2] = mul_div255_u8(u16::from(px[2]), keep);
    }
    RasterBuffer::new(src.width(), src.height(), src.scale(), out)
}

/// Grow the canvas by `space_px` transparent pixels on every side, keeping
/// the content centered. `space_px = 0` is identity.
pub fn add_transparent_border(src: &RasterBuffer, space_px: u32) -> DiffuseResult<RasterBuffer> {
    if space_px == 0 {
        return Ok(src.clone());
    }

    let grow = space_px
        .checked_mul(2)
        .ok_or_else(|| DiffuseError::raster("border space overflows dimensions"))?;
    let width = src
        .width()
        .checked_add(grow)
        .ok_or_else(|| DiffuseError::raster("border space overflows dimensions"))?;
    let height = src
        .height()
        .checked_add(grow)
        .ok_or_else(|| DiffuseError::raster("border space overflows dimensions"))?;
    let total = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| DiffuseError::raster("border space overflows dimensions"))?;

    let src_stride = src.stride_bytes();
    let dst_stride = width as usize * 4;
    let x_off = space_px as usize * 4;
    let mut out = vec![0u8; total];
    for y in 0..src.height() as usize {
        let s = y * src_stride;
        let d = (y + space_px as usize) * dst_stride + x_off;
        out[d..d + src_stride].copy_from_slice(&src.data()[s..s + src_stride]);
    }
    RasterBuffer::new(width, height, src.scale(), out)
}

/// Bilinear resample to exactly `width x height` pixels.
///
/// Interpolating premultiplied channels directly is correct here; straight
/// alpha would bleed fringe colors out of transparent regions.
pub fn resize_to(src: &RasterBuffer, width: u32, height: u32) -> DiffuseResult<RasterBuffer> {
    if width == 0 || height == 0 {
        return Err(DiffuseError::raster("resize target must have non-zero area"));
    }
    if width == src.width() && height == src.height() {
        return Ok(src.clone());
    }

    let total = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| DiffuseError::raster("resize target size overflow"))?;

    let sw = src.width() as usize;
    let sh = src.height() as usize;
    let data = src.data();
    let x_ratio = src.width() as f32 / width as f32;
    let y_ratio = src.height() as f32 / height as f32;

    let mut out = Vec::with_capacity(total);
    for y in 0..height {
        let sy = ((y as f32 + 0.5) * y_ratio - 0.5).clamp(0.0, (sh - 1) as f32);
        let y0 = sy as usize;
        let y1 = (y0 + 1).min(sh - 1);
        let fy = sy - y0 as f32;
        for x in 0..width {
            let sx = ((x as f32 + 0.5) * x_ratio - 0.5).clamp(0.0, (sw - 1) as f32);
            let x0 = sx as usize;
            let x1 = (x0 + 1).min(sw - 1);
            let fx = sx - x0 as f32;

            let i00 = (y0 * sw + x0) * 4;
            let i10 = (y0 * sw + x1) * 4;
            let i01 = (y1 * sw + x0) * 4;
            let i11 = (y1 * sw + x1) * 4;
            for c in 0..4 {
                let p00 = f32::from(data[i00 + c]);
                let p10 = f32::from(data[i10 + c]);
                let p01 = f32::from(data[i01 + c]);
                let p11 = f32::from(data[i11 + c]);
                let top = p00 + (p10 - p00) * fx;
                let bot = p01 + (p11 - p01) * fx;
                let v = top + (bot - top) * fy;
                out.push(v.round().clamp(0.0, 255.0) as u8);
            }
        }
    }
    RasterBuffer::new(width, height, src.scale(), out)
}

/// Change total width by `delta_px`, scaling height proportionally so the
/// aspect ratio is preserved. Negative deltas shrink; a delta that collapses
/// either dimension below one pixel is an error. `delta_px = 0` is identity.
pub fn resize_by_delta(src: &RasterBuffer, delta_px: i32) -> DiffuseResult<RasterBuffer> {
    if delta_px == 0 {
        return Ok(src.clone());
    }

    let width = i64::from(src.width()) + i64::from(delta_px);
    if width < 1 {
        return Err(DiffuseError::raster("resize delta collapses width"));
    }
    let width = u32::try_from(width)
        .map_err(|_| DiffuseError::raster("resize delta overflows width"))?;
    let height = (f64::from(width) * f64::from(src.height()) / f64::from(src.width())).round();
    if height < 1.0 {
        return Err(DiffuseError::raster("resize delta collapses height"));
    }
    resize_to(src, width, height as u32)
}

/// Multiply coverage of a rounded rectangle spanning the full buffer.
///
/// Corners get a one-pixel antialiased edge; straight edges keep full
/// coverage. The radius is capped at half the smaller dimension, and
/// `radius_px <= 0` is identity.
pub fn clip_rounded_corners(src: &RasterBuffer, radius_px: f32) -> DiffuseResult<RasterBuffer> {
    if !radius_px.is_finite() || radius_px <= 0.0 {
        return Ok(src.clone());
    }

    let w = src.width() as usize;
    let h = src.height() as usize;
    let wf = w as f32;
    let hf = h as f32;
    let r = radius_px.min(wf / 2.0).min(hf / 2.0);

    let mut out = src.data().to_vec();
    for y in 0..h {
        let py = y as f32 + 0.5;
        // Only the four r x r corner squares can lose coverage.
        if py > r && py < hf - r {
            continue;
        }
        for x in 0..w {
            let px = x as f32 + 0.5;
            if px > r && px < wf - r {
                continue;
            }
            let coverage = rounded_rect_coverage(px, py, wf, hf, r);
            if coverage >= 1.0 {
                continue;
            }
            let m = (coverage * 255.0).round() as u16;
            let i = (y * w + x) * 4;
            for c in 0..4 {
                out[i + c] = mul_div255_u8(u16::from(out[i + c]), m);
            }
        }
    }
    RasterBuffer::new(src.width(), src.height(), src.scale(), out)
}

// Coverage from the signed distance to a rounded rect over [0,w] x [0,h],
// with a one-pixel linear ramp across the boundary.
fn rounded_rect_coverage(px: f32, py: f32, w: f32, h: f32, r: f32) -> f32 {
    let qx = (px - w / 2.0).abs() - (w / 2.0 - r);
    let qy = (py - h / 2.0).abs() - (h / 2.0 - r);
    let outside = qx.max(0.0).hypot(qy.max(0.0));
    let inside = qx.max(qy).min(0.0);
    let d = outside + inside - r;
    (0.5 - d).clamp(0.0, 1.0)
}
