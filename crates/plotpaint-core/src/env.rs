//! Process-scoped rendering environment.

use std::sync::Arc;

use plotpaint_config::TextConfig;
use plotpaint_text::{FontResolver, MathLayoutEngine, PlainMathLayout, SystemFontResolver};

use crate::path::Path;

/// Shared collaborators and canonical shapes, built once and handed to every renderer.
///
/// The unit circle is compared by identity: only markers drawn with the
/// exact [`RenderEnv::unit_circle`] instance qualify for the solid-circle
/// fast path.
pub struct RenderEnv {
    unit_circle: Arc<Path>,
    fonts: Arc<dyn FontResolver>,
    math: Arc<dyn MathLayoutEngine>,
}

impl RenderEnv {
    pub fn new(fonts: Arc<dyn FontResolver>, math: Arc<dyn MathLayoutEngine>) -> Self {
        Self {
            unit_circle: Arc::new(Path::unit_circle()),
            fonts,
            math,
        }
    }

    /// System fonts plus the single-line math layout.
    pub fn from_config(text: &TextConfig) -> Self {
        let fonts: Arc<dyn FontResolver> = Arc::new(
            SystemFontResolver::new(text.default_family.clone()).with_fallback(text.font.clone()),
        );
        let math = Arc::new(PlainMathLayout::new(fonts.clone()));
        Self::new(fonts, math)
    }

    pub fn unit_circle(&self) -> &Path {
        &self.unit_circle
    }

    pub fn is_unit_circle(&self, path: &Path) -> bool {
        std::ptr::eq(path, Arc::as_ptr(&self.unit_circle))
    }

    pub fn fonts(&self) -> &Arc<dyn FontResolver> {
        &self.fonts
    }

    pub fn math(&self) -> &Arc<dyn MathLayoutEngine> {
        &self.math
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use plotpaint_text::{FontHandle, FontStyle, MathLayout, TextError};

    pub(crate) struct NoFonts;

    impl FontResolver for NoFonts {
        fn resolve(&self, style: &FontStyle) -> plotpaint_text::Result<FontHandle> {
            Err(TextError::FontNotFound(style.families.join(", ")))
        }
    }

    impl MathLayoutEngine for NoFonts {
        fn layout(&self, _text: &str, _dpi: f64, _style: &FontStyle) -> plotpaint_text::Result<MathLayout> {
            Err(TextError::Layout("no math engine".into()))
        }
    }

    pub(crate) fn env() -> Arc<RenderEnv> {
        Arc::new(RenderEnv::new(Arc::new(NoFonts), Arc::new(NoFonts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_circle_identity_is_strict() {
        let env = testing::env();
        assert!(env.is_unit_circle(env.unit_circle()));
        let copy = env.unit_circle().clone();
        assert_eq!(&copy, env.unit_circle());
        assert!(!env.is_unit_circle(&copy));
    }
}
