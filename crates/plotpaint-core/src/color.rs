//! Color specifications and conversion to paint.

use palette::Srgba;
use tiny_skia::{Color, Paint};

use crate::error::{RenderError, Result};

/// Straight (non-premultiplied) RGBA with components in `0.0..=1.0`.
pub type Rgba = Srgba<f64>;

/// A color as supplied by the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum ColorSpec {
    /// Opaque RGB.
    Rgb([f64; 3]),
    /// RGB carrying its own alpha.
    Rgba([f64; 4]),
    /// CSS-style name or hex string (`"red"`, `"#ff000080"`).
    Named(String),
}

impl ColorSpec {
    /// Build from a 3- or 4-component slice.
    pub fn from_components(c: &[f64]) -> Result<Self> {
        match *c {
            [r, g, b] => Ok(Self::Rgb([r, g, b])),
            [r, g, b, a] => Ok(Self::Rgba([r, g, b, a])),
            _ => Err(RenderError::invalid(format!(
                "color must have 3 or 4 components, got {}",
                c.len()
            ))),
        }
    }

    pub fn to_rgba(&self) -> Result<Rgba> {
        match self {
            Self::Rgb([r, g, b]) => Ok(Rgba::new(*r, *g, *b, 1.0)),
            Self::Rgba([r, g, b, a]) => Ok(Rgba::new(*r, *g, *b, *a)),
            Self::Named(name) => {
                let c = csscolorparser::parse(name)
                    .map_err(|e| RenderError::invalid(format!("invalid color {name:?}: {e}")))?;
                Ok(Rgba::new(c.r, c.g, c.b, c.a))
            }
        }
    }
}

impl From<Rgba> for ColorSpec {
    fn from(c: Rgba) -> Self {
        Self::Rgba([c.red, c.green, c.blue, c.alpha])
    }
}

impl From<&str> for ColorSpec {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

/// Substitute the global alpha override, if any.
pub(crate) fn with_alpha(color: Rgba, alpha: Option<f64>) -> Rgba {
    match alpha {
        Some(a) => Rgba::new(color.red, color.green, color.blue, a),
        None => color,
    }
}

pub(crate) fn skia_color(color: Rgba) -> Color {
    let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) as f32 };
    Color::from_rgba(
        clamp(color.red),
        clamp(color.green),
        clamp(color.blue),
        clamp(color.alpha),
    )
    .unwrap_or(Color::TRANSPARENT)
}

pub(crate) fn solid_paint(color: Rgba, anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = anti_alias;
    paint
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_pick_variant() {
        assert_eq!(
            ColorSpec::from_components(&[1.0, 0.0, 0.0]).unwrap(),
            ColorSpec::Rgb([1.0, 0.0, 0.0])
        );
        assert!(matches!(
            ColorSpec::from_components(&[1.0, 0.0, 0.0, 0.5]).unwrap(),
            ColorSpec::Rgba(_)
        ));
        assert!(ColorSpec::from_components(&[1.0, 0.0]).is_err());
    }

    #[test]
    fn rgb_is_opaque() {
        let c = ColorSpec::Rgb([0.2, 0.4, 0.6]).to_rgba().unwrap();
        assert_eq!(c.alpha, 1.0);
        assert_eq!(c.green, 0.4);
    }

    #[test]
    fn named_colors_parse() {
        let red = ColorSpec::from("red").to_rgba().unwrap();
        assert_eq!((red.red, red.green, red.blue, red.alpha), (1.0, 0.0, 0.0, 1.0));
        let half = ColorSpec::from("#0000ff80").to_rgba().unwrap();
        assert!((half.alpha - 128.0 / 255.0).abs() < 1e-6);
        assert!(ColorSpec::from("not-a-color").to_rgba().is_err());
    }

    #[test]
    fn alpha_override_replaces_alpha() {
        let c = Rgba::new(1.0, 0.5, 0.0, 0.2);
        assert_eq!(with_alpha(c, Some(0.7)).alpha, 0.7);
        assert_eq!(with_alpha(c, None).alpha, 0.2);
    }
}
