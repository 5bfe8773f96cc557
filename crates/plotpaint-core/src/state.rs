//! Drawing state carried on the context's save/restore stack.

use std::rc::Rc;
use std::str::FromStr;

use tiny_skia::{Mask, Stroke, StrokeDash};

use crate::color::Rgba;
use crate::error::RenderError;
use crate::path::Path;

/// Antialiasing mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Antialias {
    None,
    Fast,
    Good,
    Best,
    #[default]
    Default,
}

impl Antialias {
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }
}

impl From<bool> for Antialias {
    fn from(on: bool) -> Self {
        if on { Self::Fast } else { Self::None }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl FromStr for LineCap {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "butt" => Ok(Self::Butt),
            "round" => Ok(Self::Round),
            "projecting" => Ok(Self::Square),
            other => Err(RenderError::invalid(format!("invalid capstyle: {other}"))),
        }
    }
}

impl From<LineCap> for tiny_skia::LineCap {
    fn from(cap: LineCap) -> Self {
        match cap {
            LineCap::Butt => Self::Butt,
            LineCap::Round => Self::Round,
            LineCap::Square => Self::Square,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl FromStr for LineJoin {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "miter" => Ok(Self::Miter),
            "round" => Ok(Self::Round),
            "bevel" => Ok(Self::Bevel),
            other => Err(RenderError::invalid(format!("invalid joinstyle: {other}"))),
        }
    }
}

impl From<LineJoin> for tiny_skia::LineJoin {
    fn from(join: LineJoin) -> Self {
        match join {
            LineJoin::Miter => Self::Miter,
            LineJoin::Round => Self::Round,
            LineJoin::Bevel => Self::Bevel,
        }
    }
}

/// Dash pattern in device pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Dash {
    pub offset: f64,
    pub lengths: Vec<f64>,
}

impl Dash {
    /// Build from an offset and lengths in points; `None` lengths means solid.
    pub(crate) fn from_points(
        offset: Option<f64>,
        lengths: Option<&[f64]>,
        px_per_pt: f64,
    ) -> Result<Option<Self>, RenderError> {
        let Some(lengths) = lengths else {
            return Ok(None);
        };
        let offset = offset.ok_or_else(|| RenderError::invalid("missing dash offset"))?;
        Ok(Some(Self {
            offset: offset * px_per_pt,
            lengths: lengths.iter().map(|l| l * px_per_pt).collect(),
        }))
    }

    /// `None` when the pattern cannot produce any dash (empty, negative or all zero).
    pub(crate) fn to_skia(&self) -> Option<StrokeDash> {
        let mut lengths: Vec<f32> = self.lengths.iter().map(|&l| l as f32).collect();
        if lengths.len() % 2 == 1 {
            lengths.extend_from_within(..);
        }
        StrokeDash::new(lengths, self.offset as f32)
    }
}

/// Hatch fill: `path` lives in a unit square with y up and is repeated once per inch.
#[derive(Clone, Debug)]
pub struct Hatch {
    pub path: Path,
    pub color: Rgba,
    pub linewidth_pt: f64,
}

/// One level of the state stack.
#[derive(Clone, Debug)]
pub struct DrawState {
    pub antialias: Antialias,
    pub cap: LineCap,
    pub join: LineJoin,
    /// Device pixels.
    pub line_width: f64,
    pub dash: Option<Dash>,
    pub source: Rgba,
    pub clip: Option<Rc<Mask>>,
    pub hatch: Option<Hatch>,
}

impl DrawState {
    pub fn new(antialias: Antialias) -> Self {
        Self {
            antialias,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            line_width: 2.0,
            dash: None,
            source: Rgba::new(0.0, 0.0, 0.0, 1.0),
            clip: None,
            hatch: None,
        }
    }

    pub(crate) fn stroke(&self) -> Stroke {
        Stroke {
            width: self.line_width as f32,
            miter_limit: 10.0,
            line_cap: self.cap.into(),
            line_join: self.join.into(),
            dash: self.dash.as_ref().and_then(Dash::to_skia),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_and_join_names() {
        assert_eq!("projecting".parse::<LineCap>().unwrap(), LineCap::Square);
        assert_eq!("round".parse::<LineJoin>().unwrap(), LineJoin::Round);
        assert!(matches!("square".parse::<LineCap>(), Err(RenderError::InvalidInput(_))));
        assert!("mitre".parse::<LineJoin>().is_err());
    }

    #[test]
    fn bool_antialias() {
        assert_eq!(Antialias::from(true), Antialias::Fast);
        assert!(!Antialias::from(false).is_enabled());
        assert!(Antialias::Default.is_enabled());
    }

    #[test]
    fn dash_from_points_scales() {
        let dash = Dash::from_points(Some(1.0), Some(&[2.0, 4.0]), 2.0).unwrap().unwrap();
        assert_eq!(dash, Dash { offset: 2.0, lengths: vec![4.0, 8.0] });
        assert!(Dash::from_points(Some(1.0), None, 2.0).unwrap().is_none());
        assert!(Dash::from_points(None, Some(&[1.0]), 2.0).is_err());
    }

    #[test]
    fn odd_dash_is_repeated() {
        let dash = Dash { offset: 0.0, lengths: vec![3.0] };
        assert!(dash.to_skia().is_some());
        let empty = Dash { offset: 0.0, lengths: vec![] };
        assert!(empty.to_skia().is_none());
    }

    #[test]
    fn stroke_reflects_state() {
        let mut state = DrawState::new(Antialias::Default);
        state.line_width = 4.0;
        state.cap = LineCap::Round;
        let stroke = state.stroke();
        assert_eq!(stroke.width, 4.0);
        assert_eq!(stroke.line_cap, tiny_skia::LineCap::Round);
        assert!(stroke.dash.is_none());
    }
}
