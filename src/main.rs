use std::sync::Arc;

use anyhow::{Context, Result};
use plotpaint_config::PlotpaintConfig;
use plotpaint_core::{
    AffineMatrix, ColorSpec, FontStyle, GouraudMesh, Hatch, Path, PathCollection, RenderEnv, Renderer, Rgba,
    RgbaRaster,
};

fn main() -> Result<()> {
    env_logger::init();

    let config = PlotpaintConfig::load();
    let env = Arc::new(RenderEnv::from_config(&config.text));
    let mut renderer = Renderer::new(env.clone(), config.render.clone());
    let (width, height) = (config.output.width, config.output.height);
    renderer
        .bind_new_surface(width, height)
        .with_context(|| format!("Failed to allocate a {width}x{height} surface"))?;

    draw_scene(&mut renderer, &env)?;

    let surface = renderer.surface().context("Renderer lost its surface")?;
    let image = image::RgbaImage::from_raw(width, height, surface.to_rgba8())
        .context("Surface size does not match the output image")?;
    image
        .save(&config.output.path)
        .with_context(|| format!("Failed to write {}", config.output.path.display()))?;
    log::info!("wrote {}", config.output.path.display());
    Ok(())
}

fn draw_scene(r: &mut Renderer, env: &RenderEnv) -> Result<()> {
    let w = r.width() as f64;
    let h = r.height() as f64;

    // Background.
    r.set_linewidth(0.0);
    r.draw_path(
        &Path::unit_rectangle(),
        &AffineMatrix::scale(w, h),
        Some(&ColorSpec::from("white")),
    )?;

    // A dashed sine curve clipped to the plot area.
    let mut gc = r.new_handle();
    gc.set_clip_rectangle(Some([40.0, 40.0, w - 80.0, h - 80.0]))?;
    gc.set_foreground(&ColorSpec::from("steelblue"))?;
    gc.set_linewidth(2.0);
    gc.set_capstyle("round")?;
    gc.set_dashes(Some(0.0), Some(&[6.0, 3.0][..]))?;
    let curve: Vec<[f64; 2]> = (0..=200)
        .map(|i| {
            let t = i as f64 / 200.0;
            [40.0 + t * (w - 80.0), h / 2.0 + (t * std::f64::consts::TAU * 2.0).sin() * h / 4.0]
        })
        .collect();
    gc.draw_path(&Path::polyline(curve.clone()), &AffineMatrix::IDENTITY, None)?;

    // Solid circle markers on every tenth sample.
    gc.set_dashes(None, None)?;
    gc.set_foreground(&ColorSpec::from("crimson"))?;
    let samples: Vec<[f64; 2]> = curve.iter().step_by(10).copied().collect();
    gc.draw_markers(
        env.unit_circle(),
        &AffineMatrix::scale(4.0, 4.0),
        &Path::polyline(samples),
        &AffineMatrix::IDENTITY,
        Some(&ColorSpec::from("crimson")),
    )?;
    drop(gc);

    // A row of squares with cycling colors.
    let squares = [Path::unit_rectangle()];
    let offsets: Vec<[f64; 2]> = (0..8).map(|i| [60.0 + i as f64 * 30.0, 60.0]).collect();
    let transforms = [[[20.0, 0.0, 0.0], [0.0, 20.0, 0.0], [0.0, 0.0, 1.0]]];
    let faces = [ColorSpec::from("gold"), ColorSpec::from("seagreen"), ColorSpec::Rgba([0.5, 0.2, 0.8, 0.6])];
    let edges = [ColorSpec::from("black")];
    let line_widths = [1.0, 2.0];
    let identity = AffineMatrix::IDENTITY;
    let mut collection = PathCollection::new(&squares, &identity);
    collection.transforms = &transforms;
    collection.offsets = &offsets;
    collection.face_colors = &faces;
    collection.edge_colors = &edges;
    collection.line_widths = &line_widths;
    r.draw_path_collection(&AffineMatrix::IDENTITY, &collection)?;

    // Hatched triangle.
    let mut gc = r.new_handle();
    gc.set_hatch(Some(Hatch {
        path: Path::polyline(vec![[0.0, 0.0], [1.0, 1.0]]),
        color: Rgba::new(0.2, 0.2, 0.2, 1.0),
        linewidth_pt: 1.0,
    }));
    gc.set_foreground(&ColorSpec::from("black"))?;
    gc.set_linewidth(1.0);
    let triangle = Path::polyline(vec![[w - 200.0, 60.0], [w - 60.0, 60.0], [w - 130.0, 180.0], [w - 200.0, 60.0]]);
    gc.draw_path(&triangle, &AffineMatrix::IDENTITY, Some(&ColorSpec::from("lightyellow")))?;
    drop(gc);

    // Shaded triangle.
    let mesh = GouraudMesh::new(
        vec![[[w - 200.0, h - 60.0], [w - 60.0, h - 60.0], [w - 130.0, h - 180.0]]],
        vec![[[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]]],
    )?;
    r.draw_gouraud_triangles(&mesh, &AffineMatrix::IDENTITY)?;

    // A small gradient image.
    let (iw, ih) = (64u32, 32u32);
    let pixels: Vec<u8> = (0..ih)
        .flat_map(|y| (0..iw).flat_map(move |x| [(x * 4) as u8, (y * 8) as u8, 128, 255]))
        .collect();
    r.draw_image(60.0, h - 120.0, &RgbaRaster::new(iw, ih, pixels)?)?;

    // Text needs a system font; a missing font is not fatal for the demo.
    let style = FontStyle::new(14.0).with_family("sans-serif");
    for (text, is_math, angle) in [("plotpaint", false, 0.0), ("$y = sin(x)$", true, 0.0), ("axis", false, 90.0)] {
        if let Err(err) = r.draw_text(40.0, 20.0 + angle / 3.0, text, &style, angle, is_math) {
            log::warn!("skipping text '{text}': {err}");
        }
    }
    Ok(())
}
