use crate::foundation::core::{Point, Rect, Size, Vec2};
use crate::foundation::error::DiffuseResult;
use crate::foundation::math::{pt_to_px, pt_to_px_signed};
use crate::host::{ShadowSurface, SnapshotSource};
use crate::raster::blur::{blur_kernel_px, box_blur3};
use crate::raster::buffer::RasterBuffer;
use crate::raster::ops::{add_transparent_border, clip_rounded_corners, darken, resize_by_delta, resize_to};
use crate::recipe::{ShadowMode, ShadowRecipe};
use std::sync::Weak;

/// Everything a worker needs to build one shadow, snapshotted from the
/// owner's config at dispatch time so later mutations cannot tear the run.
pub(crate) struct BuildParams {
    pub(crate) source: Weak<dyn SnapshotSource>,
    pub(crate) bounds: Size,
    pub(crate) device_scale: f32,
    pub(crate) corner_radius: f64,
    pub(crate) recipe: ShadowRecipe,
    pub(crate) capture_ratio: f32,
}

/// Run the fixed-order shadow build: acquire source, darken, clip, pad,
/// blur, resize, place.
///
/// Returns `None` ("no shadow") for every failure: a gone or empty snapshot,
/// zero-area bounds, a resize that collapses the bitmap. Failures are logged
/// at debug level and never propagate; a missing shadow must not take the
/// host down with it.
#[tracing::instrument(skip(params), fields(mode = ?params.recipe.mode()))]
pub(crate) fn compose_shadow(params: &BuildParams) -> Option<ShadowSurface> {
    let src = acquire_source(params)?;
    let scale = src.scale();
    let recipe = &params.recipe;

    let dark = absorb(darken(&src, 1.0 - recipe.brightness()), "darken")?;

    let clipped = if params.corner_radius > 0.0 {
        let radius_px = params.corner_radius * f64::from(scale);
        absorb(clip_rounded_corners(&dark, radius_px as f32), "clip")?
    } else {
        dark
    };

    // 10 extra points of apron keeps the blur halo off the canvas edge.
    let space_px = pt_to_px(f64::from(10.0 + recipe.level()), scale);
    let padded = absorb(add_transparent_border(&clipped, space_px), "pad")?;

    let kernel = blur_kernel_px(recipe.level(), scale);
    let blurred = absorb(box_blur3(&padded, kernel), "blur")?;

    let shrunk = absorb(
        resize_by_delta(&blurred, pt_to_px_signed(f64::from(-recipe.level()), scale)),
        "shrink",
    )?;
    let image = absorb(
        resize_by_delta(&shrunk, pt_to_px_signed(f64::from(recipe.range()), scale)),
        "range",
    )?;

    let placement = placement_for(params.bounds, recipe.offset(), &image);
    Some(ShadowSurface {
        image,
        placement,
        opacity: recipe.opacity(),
    })
}

/// Placement rect in the owner's logical space: centered at the owner's
/// center plus the recipe offset, sized to the image.
pub(crate) fn placement_for(bounds: Size, offset: Vec2, image: &RasterBuffer) -> Rect {
    let center = Point::new(
        bounds.width / 2.0 + offset.x,
        bounds.height / 2.0 + offset.y,
    );
    Rect::from_center_size(center, image.logical_size())
}

fn acquire_source(params: &BuildParams) -> Option<RasterBuffer> {
    let capture_scale = params.device_scale * params.capture_ratio;
    let w = pt_to_px(params.bounds.width, capture_scale);
    let h = pt_to_px(params.bounds.height, capture_scale);
    if w == 0 || h == 0 {
        tracing::debug!("degenerate bounds, no shadow");
        return None;
    }

    match params.recipe.mode() {
        ShadowMode::Auto => {
            let source = params.source.upgrade()?;
            let snap = source.snapshot(capture_scale)?;
            // Normalize the snapshot to the owner's bounds at capture scale so
            // downstream point/pixel conversions see one consistent density.
            let sized = absorb(resize_to(&snap, w, h), "normalize")?;
            absorb(sized.with_scale(capture_scale), "retag")
        }
        ShadowMode::Custom => {
            let color = params.recipe.substitute()?;
            absorb(RasterBuffer::solid(color, w, h, capture_scale), "solid")
        }
    }
}

fn absorb<T>(res: DiffuseResult<T>, step: &str) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::debug!(step, %err, "shadow build step failed, no shadow");
            None
        }
    }
}
