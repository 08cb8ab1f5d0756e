//! Shadow appearance parameters.

use crate::foundation::core::{Rgba8Premul, Vec2};

/// How the shadow source image is produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ShadowMode {
    /// Shaped by a snapshot of the owner's content.
    #[default]
    Auto,
    /// A flat color silhouette of the owner's bounds, using
    /// [`ShadowRecipe::substitute`].
    Custom,
}

/// Shadow appearance parameters.
///
/// * `opacity`: display opacity in `[0, 1]`, applied by the sink at
///   presentation time, never baked into the pixels
/// * `offset`: placement offset from the owner's center, in logical points
/// * `level`: blur strength `>= 0`; the box kernel is `level * scale`
///   forced odd
/// * `range`: signed post-blur growth (`> 0`) or shrink (`< 0`) of the
///   shadow width, in logical points
/// * `brightness`: content brightness in `[0, 1]`; `1` keeps snapshot
///   colors, `0` casts a black silhouette
/// * `substitute`: flat premultiplied color used by [`ShadowMode::Custom`]
///
/// Out-of-range writes clamp instead of failing; non-finite writes are
/// ignored. Deserialized values pass through the same clamping.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "RecipeWire")]
pub struct ShadowRecipe {
    opacity: f32,
    offset: Vec2,
    level: f32,
    range: f32,
    brightness: f32,
    substitute: Option<Rgba8Premul>,
    mode: ShadowMode,
}

impl Default for ShadowRecipe {
    /// A mostly-opaque shadow cast 15 points below the content with a soft
    /// 20 point blur.
    fn default() -> Self {
        Self {
            opacity: 0.8,
            offset: Vec2::new(0.0, 15.0),
            level: 20.0,
            range: 0.0,
            brightness: 1.0,
            substitute: None,
            mode: ShadowMode::Auto,
        }
    }
}

impl ShadowRecipe {
    /// Display opacity in `[0, 1]`.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Placement offset from the owner's center, in logical points.
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Blur strength in logical points.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Signed post-blur width growth, in logical points.
    pub fn range(&self) -> f32 {
        self.range
    }

    /// Content brightness in `[0, 1]`.
    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    /// Flat color for [`ShadowMode::Custom`].
    pub fn substitute(&self) -> Option<Rgba8Premul> {
        self.substitute
    }

    /// Source selection mode.
    pub fn mode(&self) -> ShadowMode {
        self.mode
    }

    /// Set opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f32) {
        if opacity.is_finite() {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    /// Set the placement offset.
    pub fn set_offset(&mut self, offset: Vec2) {
        if offset.x.is_finite() && offset.y.is_finite() {
            self.offset = offset;
        }
    }

    /// Set blur strength, floored at 0.
    pub fn set_level(&mut self, level: f32) {
        if level.is_finite() {
            self.level = level.max(0.0);
        }
    }

    /// Set the signed post-blur width growth.
    pub fn set_range(&mut self, range: f32) {
        if range.is_finite() {
            self.range = range;
        }
    }

    /// Set content brightness, clamped to `[0, 1]`.
    pub fn set_brightness(&mut self, brightness: f32) {
        if brightness.is_finite() {
            self.brightness = brightness.clamp(0.0, 1.0);
        }
    }

    /// Set the flat color used by [`ShadowMode::Custom`].
    pub fn set_substitute(&mut self, substitute: Option<Rgba8Premul>) {
        self.substitute = substitute;
    }

    /// Set the source selection mode.
    pub fn set_mode(&mut self, mode: ShadowMode) {
        self.mode = mode;
    }
}

// Deserialization funnels raw values through the clamping setters so a recipe
// read from disk honors the same invariants as one mutated at runtime.
#[derive(serde::Deserialize)]
#[serde(default)]
struct RecipeWire {
    opacity: f32,
    offset: Vec2,
    level: f32,
    range: f32,
    brightness: f32,
    substitute: Option<Rgba8Premul>,
    mode: ShadowMode,
}

impl Default for RecipeWire {
    fn default() -> Self {
        let r = ShadowRecipe::default();
        Self {
            opacity: r.opacity,
            offset: r.offset,
            level: r.level,
            range: r.range,
            brightness: r.brightness,
            substitute: r.substitute,
            mode: r.mode,
        }
    }
}

impl From<RecipeWire> for ShadowRecipe {
    fn from(w: RecipeWire) -> Self {
        let mut r = Self::default();
        r.set_opacity(w.opacity);
        r.set_offset(w.offset);
        r.set_level(w.level);
        r.set_range(w.range);
        r.set_brightness(w.brightness);
        r.set_substitute(w.substitute);
        r.set_mode(w.mode);
        r
    }
}
