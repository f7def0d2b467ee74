// ============================================================
// Layer 6 — Image Grid Writer
// ============================================================
// Tiles a batch of images into one PNG, like torchvision's
// make_grid + save_image:
//
//   - `nrow` images per row, rows = ceil(N / nrow)
//   - 2 px black padding around and between tiles
//   - values clamped to [-1, 1], mapped to [0, 255] with rounding
//   - 1-channel images written as gray RGB, alpha dropped
//
// Input layout is NCHW, flattened.

use anyhow::{bail, Context, Result};
use image::{Rgb, RgbImage};
use std::{fs, path::Path};

pub const GRID_PADDING: usize = 2;

/// [-1, 1] → u8 with round-half-up
fn to_u8(v: f32) -> u8 {
    let unit = (v.clamp(-1.0, 1.0) + 1.0) / 2.0;
    (unit * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

pub fn make_grid(data: &[f32], shape: [usize; 4], nrow: usize) -> Result<RgbImage> {
    let [n, c, h, w] = shape;
    if data.len() != n * c * h * w {
        bail!("grid data has {} values, shape {:?} needs {}", data.len(), shape, n * c * h * w);
    }
    if n == 0 || nrow == 0 {
        bail!("cannot build a grid of {n} images with {nrow} per row");
    }
    if !matches!(c, 1 | 3 | 4) {
        bail!("unsupported channel count {c}");
    }

    let xmaps  = nrow.min(n);
    let ymaps  = n.div_ceil(xmaps);
    let cell_h = h + GRID_PADDING;
    let cell_w = w + GRID_PADDING;
    let mut grid = RgbImage::new(
        (xmaps * cell_w + GRID_PADDING) as u32,
        (ymaps * cell_h + GRID_PADDING) as u32,
    );

    let plane = h * w;
    for k in 0..n {
        let image = &data[k * c * plane..(k + 1) * c * plane];
        let ox = (k % xmaps) * cell_w + GRID_PADDING;
        let oy = (k / xmaps) * cell_h + GRID_PADDING;

        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let px = if c == 1 {
                    let g = to_u8(image[i]);
                    [g, g, g]
                } else {
                    [to_u8(image[i]), to_u8(image[plane + i]), to_u8(image[2 * plane + i])]
                };
                grid.put_pixel((ox + x) as u32, (oy + y) as u32, Rgb(px));
            }
        }
    }
    Ok(grid)
}

/// Build the grid and write it as PNG, creating parent directories.
pub fn save_grid(data: &[f32], shape: [usize; 4], nrow: usize, path: &Path) -> Result<()> {
    let grid = make_grid(data, shape, nrow)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    grid.save(path)
        .with_context(|| format!("Cannot write image grid '{}'", path.display()))?;
    tracing::info!("Wrote {} samples to '{}'", shape[0], path.display());
    Ok(())
}
