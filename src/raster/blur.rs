use crate::foundation::error::DiffuseResult;
use crate::raster::buffer::RasterBuffer;

/// Box kernel width in pixels for a blur level at a device scale.
///
/// Truncates `level * scale` and forces the result odd, so the kernel is
/// always symmetric and at least 1 (identity).
pub fn blur_kernel_px(level: f32, scale: f32) -> u32 {
    let px = level.max(0.0) * scale.max(0.0);
    if !px.is_finite() {
        return 1;
    }
    (px as u32) | 1
}

/// Three passes of the same odd box kernel, approximating a Gaussian.
///
/// Out-of-range taps clamp to the nearest edge pixel, so uniform images pass
/// through unchanged. Even kernels are forced up to the next odd width; a
/// kernel of 1 is identity and shares the input's storage.
pub fn box_blur3(src: &RasterBuffer, kernel_px: u32) -> DiffuseResult<RasterBuffer> {
    let kernel = kernel_px | 1;
    if kernel <= 1 {
        return Ok(src.clone());
    }
    let radius = (kernel / 2) as usize;
    let w = src.width() as usize;
    let h = src.height() as usize;

    let mut front = src.data().to_vec();
    let mut back = vec![0u8; front.len()];
    for _ in 0..3 {
        box_pass_h(&front, &mut back, w, h, radius);
        box_pass_v(&back, &mut front, w, h, radius);
    }
    RasterBuffer::new(src.width(), src.height(), src.scale(), front)
}

// Sliding-window row mean; the seed window clamps left taps to x = 0.
fn box_pass_h(src: &[u8], dst: &mut [u8], w: usize, h: usize, radius: usize) {
    let window = (2 * radius + 1) as u32;
    let half = window / 2;
    let clamp_x = |x: isize| -> usize { x.clamp(0, w as isize - 1) as usize };

    for y in 0..h {
        let row = y * w * 4;
        let mut acc = [0u32; 4];
        for i in -(radius as isize)..=(radius as isize) {
            let idx = row + clamp_x(i) * 4;
            for c in 0..4 {
                acc[c] += u32::from(src[idx + c]);
            }
        }
        for x in 0..w {
            let out = row + x * 4;
            for c in 0..4 {
                dst[out + c] = ((acc[c] + half) / window) as u8;
            }
            if x + 1 < w {
                let add = row + clamp_x(x as isize + radius as isize + 1) * 4;
                let sub = row + clamp_x(x as isize - radius as isize) * 4;
                for c in 0..4 {
                    acc[c] += u32::from(src[add + c]);
                    acc[c] -= u32::from(src[sub + c]);
                }
            }
        }
    }
}

// Column counterpart of `box_pass_h`.
fn box_pass_v(src: &[u8], dst: &mut [u8], w: usize, h: usize, radius: usize) {
    let window = (2 * radius + 1) as u32;
    let half = window / 2;
    let clamp_y = |y: isize| -> usize { y.clamp(0, h as isize - 1) as usize };

    for x in 0..w {
        let col = x * 4;
        let mut acc = [0u32; 4];
        for i in -(radius as isize)..=(radius as isize) {
            let idx = clamp_y(i) * w * 4 + col;
            for c in 0..4 {
                acc[c] += u32::from(src[idx + c]);
            }
        }
        for y in 0..h {
            let out = y * w * 4 + col;
            for c in 0..4 {
                dst[out + c] = ((acc[c] + half) / window) as u8;
            }
            if y + 1 < h {
                let add = clamp_y(y as isize + radius as isize + 1) * w * 4 + col;
                let sub = clamp_y(y as isize - radius as isize) * w * 4 + col;
                for c in 0..4 {
                    acc[c] += u32::from(src[add + c]);
                    acc[c] -= u32::from(src[sub + c]);
                }
            }
        }
    }
}
