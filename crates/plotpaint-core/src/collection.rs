//! Batched drawing of many paths with cyclically broadcast styles.

use log::{debug, trace};

use crate::affine::{AffineMatrix, Transform};
use crate::color::{ColorSpec, Rgba, with_alpha};
use crate::context::Context;
use crate::error::Result;
use crate::path::{Path, to_skia_path};
use crate::renderer::Renderer;
use crate::state::Dash;

/// Where collection offsets live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OffsetPosition {
    /// Offsets go through the offset transform and translate in device space.
    #[default]
    Screen,
    /// Offsets are data coordinates mapped through each instance's transform.
    Data,
}

/// Dash offset and lengths in points, as accepted by [`Renderer::set_dashes`].
pub type DashSpec = (Option<f64>, Option<Vec<f64>>);

/// Everything a collection draw needs besides the master transform.
///
/// Each list is indexed modulo its own length; empty style lists leave the
/// corresponding step out.
pub struct PathCollection<'a> {
    pub paths: &'a [Path],
    pub transforms: &'a [[[f64; 3]; 3]],
    pub offsets: &'a [[f64; 2]],
    pub offset_transform: &'a dyn Transform,
    pub face_colors: &'a [ColorSpec],
    pub edge_colors: &'a [ColorSpec],
    pub line_widths: &'a [f64],
    pub dashes: &'a [DashSpec],
    /// Accepted for interface parity; not applied per instance.
    pub antialiased: &'a [bool],
    /// Accepted for interface parity; links are not a pixel concern.
    pub urls: &'a [Option<String>],
    pub offset_position: OffsetPosition,
}

impl<'a> PathCollection<'a> {
    pub fn new(paths: &'a [Path], offset_transform: &'a dyn Transform) -> Self {
        Self {
            paths,
            transforms: &[],
            offsets: &[],
            offset_transform,
            face_colors: &[],
            edge_colors: &[],
            line_widths: &[],
            dashes: &[],
            antialiased: &[],
            urls: &[],
            offset_position: OffsetPosition::Screen,
        }
    }
}

/// Indices used by one collection instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instance {
    pub index: usize,
    pub path: usize,
    /// `None` when there are no per-instance transforms (the master applies).
    pub transform: Option<usize>,
    pub offset: Option<usize>,
}

/// `max(paths, transforms, offsets)` instances, each list cycled by index.
pub fn instance_plan(
    n_paths: usize,
    n_transforms: usize,
    n_offsets: usize,
) -> impl Iterator<Item = Instance> {
    let n = if n_paths == 0 {
        0
    } else {
        n_paths.max(n_transforms).max(n_offsets)
    };
    (0..n).map(move |i| Instance {
        index: i,
        path: i % n_paths,
        transform: (n_transforms > 0).then(|| i % n_transforms),
        offset: (n_offsets > 0).then(|| i % n_offsets),
    })
}

fn cycle<T>(items: &[T], i: usize) -> Option<&T> {
    if items.is_empty() {
        None
    } else {
        items.get(i % items.len())
    }
}

impl Renderer {
    pub fn draw_path_collection(
        &self,
        master_transform: &dyn Transform,
        collection: &PathCollection<'_>,
    ) -> Result<()> {
        let Some(mut ctx) = self.scope()? else {
            return Ok(());
        };
        let height = ctx.surface().height() as f64;
        let master = AffineMatrix::from_transform(master_transform, height)?;
        let matrices = collection
            .transforms
            .iter()
            .map(|t| AffineMatrix::compose_transform(t, &master))
            .collect::<Result<Vec<_>>>()?;
        let faces = collection
            .face_colors
            .iter()
            .map(|c| c.to_rgba().map(|c| with_alpha(c, self.alpha())))
            .collect::<Result<Vec<_>>>()?;
        let edges = collection
            .edge_colors
            .iter()
            .map(|c| c.to_rgba().map(|c| with_alpha(c, self.alpha())))
            .collect::<Result<Vec<_>>>()?;
        if !collection.antialiased.is_empty() || !collection.urls.is_empty() {
            trace!("per-instance antialias flags and urls are ignored");
        }

        let offset_matrix = match collection.offset_position {
            OffsetPosition::Screen => AffineMatrix::from_transform(collection.offset_transform, 0.0)?,
            OffsetPosition::Data => {
                debug!("data-space offsets: drawing collection instance by instance");
                AffineMatrix::IDENTITY
            }
        };

        let plan = instance_plan(
            collection.paths.len(),
            collection.transforms.len(),
            collection.offsets.len(),
        );
        for inst in plan {
            let base = inst.transform.map_or(master, |t| matrices[t]);
            let offset = inst.offset.map_or([0.0, 0.0], |o| collection.offsets[o]);
            let delta = match collection.offset_position {
                OffsetPosition::Screen => offset_matrix.transform_point(offset),
                OffsetPosition::Data => {
                    let at = base.transform_point(offset);
                    let origin = base.transform_point([0.0, 0.0]);
                    [at[0] - origin[0], at[1] - origin[1]]
                }
            };
            if !(delta[0].is_finite() && delta[1].is_finite()) {
                continue;
            }
            let matrix = base.then(&AffineMatrix::translate(delta[0], delta[1]));

            let depth = ctx.depth();
            ctx.save();
            self.apply_instance_style(&mut ctx, collection, inst.index)?;
            let path = &collection.paths[inst.path];
            let face = cycle(&faces, inst.index).copied();
            let edge = cycle(&edges, inst.index).copied();
            let drawn = match collection.offset_position {
                OffsetPosition::Screen => {
                    paint_instance(&mut ctx, path, &matrix, face, edge);
                    Ok(())
                }
                OffsetPosition::Data => {
                    match edge {
                        Some(edge) => ctx.state_mut().source = edge,
                        None => ctx.state_mut().line_width = 0.0,
                    }
                    self.paint_path(&mut ctx, path, &matrix, face)
                }
            };
            ctx.restore_to(depth);
            drawn?;
        }
        Ok(())
    }

    fn apply_instance_style(&self, ctx: &mut Context, collection: &PathCollection<'_>, i: usize) -> Result<()> {
        if let Some(&lw) = cycle(collection.line_widths, i) {
            ctx.state_mut().line_width = self.points_to_pixels(lw);
        }
        if let Some((offset, lengths)) = cycle(collection.dashes, i) {
            ctx.state_mut().dash = Dash::from_points(*offset, lengths.as_deref(), self.points_to_pixels(1.0))?;
        }
        Ok(())
    }
}

/// Stroke with the edge color, then fill with the face color on top.
fn paint_instance(ctx: &mut Context, path: &Path, matrix: &AffineMatrix, face: Option<Rgba>, edge: Option<Rgba>) {
    let Some(device) = to_skia_path(&path.segments(matrix)) else {
        return;
    };
    if let Some(edge) = edge {
        ctx.stroke(&device, edge);
    }
    if let Some(face) = face {
        ctx.fill(&device, face);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_uses_longest_list() {
        let plan: Vec<_> = instance_plan(3, 1, 5).collect();
        assert_eq!(plan.len(), 5);
        assert!(plan.iter().all(|inst| inst.transform == Some(0)));
        let paths: Vec<_> = plan.iter().map(|inst| inst.path).collect();
        assert_eq!(paths, vec![0, 1, 2, 0, 1]);
        let offsets: Vec<_> = plan.iter().map(|inst| inst.offset).collect();
        assert_eq!(offsets, vec![Some(0), Some(1), Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn missing_lists_fall_back() {
        let plan: Vec<_> = instance_plan(2, 0, 0).collect();
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|inst| inst.transform.is_none() && inst.offset.is_none()));
    }

    #[test]
    fn no_paths_draws_nothing() {
        assert_eq!(instance_plan(0, 4, 9).count(), 0);
    }

    #[test]
    fn cycle_wraps() {
        assert_eq!(cycle(&[1, 2, 3], 7), Some(&2));
        assert_eq!(cycle::<u8>(&[], 7), None);
    }
}
