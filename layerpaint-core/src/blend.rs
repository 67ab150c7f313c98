//! # Blending
//!
//! Per-layer blend settings, and the compositing used when layers are merged or flattened.
//! Surfaces are straight alpha, so every channel is un- and re-multiplied around the
//! separable blend function (W3C Compositing and Blending, "source-over" with a blend function).

#[derive(
    strum::AsRefStr,
    strum::EnumIter,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Multiply,
    Overlay,
}
impl BlendMode {
    /// Separable blend function for one normalized channel.
    fn channel(self, backdrop: f32, source: f32) -> f32 {
        match self {
            Self::Normal => source,
            Self::Add => (backdrop + source).min(1.0),
            Self::Multiply => backdrop * source,
            Self::Overlay => {
                if backdrop <= 0.5 {
                    2.0 * backdrop * source
                } else {
                    1.0 - 2.0 * (1.0 - backdrop) * (1.0 - source)
                }
            }
        }
    }
}

/// Blend mode for a layer, including a mode and opacity modulate.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Blend {
    #[serde(default)]
    pub mode: BlendMode,
    /// Clamped to `[0, 1]` when compositing.
    #[serde(default = "Blend::full_opacity")]
    pub opacity: f32,
}
impl Default for Blend {
    fn default() -> Self {
        Self {
            mode: BlendMode::default(),
            opacity: Self::full_opacity(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("surface sizes differ: destination is {destination:?}, layer is {layer:?}")]
pub struct SizeMismatch {
    pub destination: (u32, u32),
    /// Size of the layer being composited.
    pub layer: (u32, u32),
}

impl Blend {
    fn full_opacity() -> f32 {
        1.0
    }
    /// Composite a single `source` pixel over `backdrop`.
    #[must_use]
    pub fn composite(&self, backdrop: image::Rgba<u8>, source: image::Rgba<u8>) -> image::Rgba<u8> {
        // NaN opacity behaves as fully transparent.
        let opacity = if self.opacity.is_nan() {
            0.0
        } else {
            self.opacity.clamp(0.0, 1.0)
        };
        let source_alpha = f32::from(source[3]) / 255.0 * opacity;
        if source_alpha <= 0.0 {
            return backdrop;
        }
        // Opaque normal paint replaces the backdrop exactly, no rounding involved.
        if self.mode == BlendMode::Normal && source_alpha >= 1.0 {
            return source;
        }

        let backdrop_alpha = f32::from(backdrop[3]) / 255.0;
        let out_alpha = source_alpha + backdrop_alpha * (1.0 - source_alpha);

        let mut out = [0u8; 4];
        for (channel, out) in out.iter_mut().enumerate().take(3) {
            let cb = f32::from(backdrop[channel]) / 255.0;
            let cs = f32::from(source[channel]) / 255.0;
            let mixed = self.mode.channel(cb, cs);
            let premul = source_alpha * (1.0 - backdrop_alpha) * cs
                + source_alpha * backdrop_alpha * mixed
                + (1.0 - source_alpha) * backdrop_alpha * cb;
            *out = to_u8(premul / out_alpha);
        }
        out[3] = to_u8(out_alpha);
        image::Rgba(out)
    }
    /// Composite every pixel of `source` onto the same position of `destination`.
    pub fn composite_image(
        &self,
        destination: &mut image::RgbaImage,
        source: &image::RgbaImage,
    ) -> Result<(), SizeMismatch> {
        if destination.dimensions() != source.dimensions() {
            return Err(SizeMismatch {
                destination: destination.dimensions(),
                layer: source.dimensions(),
            });
        }
        for (backdrop, source) in destination.pixels_mut().zip(source.pixels()) {
            *backdrop = self.composite(*backdrop, *source);
        }
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(normalized: f32) -> u8 {
    (normalized.clamp(0.0, 1.0) * 255.0).round() as u8
}
