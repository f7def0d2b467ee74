// ============================================================
// Layer 4 — Image Transform
// ============================================================
// Turns a decoded image into a normalised CHW float vector of
// shape [channels, size, size], following the usual torchvision
// pipeline:
//
//   Resize(size)      shorter edge → size, aspect preserved,
//                     bilinear filter
//   CenterCrop(c)     centred c×c window, zero padding where
//                     the image is smaller than the window
//   ToTensor          u8 → [0, 1], HWC → CHW
//   Normalize(.5,.5)  [0, 1] → [-1, 1]
//
// Channel handling: images are expanded to RGBA and the first
// `channels` planes are kept, so
//   1 channel  → red plane (gray for grayscale sources)
//   3 channels → RGB, grayscale images are replicated
//   4 channels → RGBA, opaque alpha added when missing
//
// Reference: image crate documentation (imageops)

use anyhow::{bail, Context, Result};
use image::{imageops::{self, FilterType}, DynamicImage, Rgba, RgbaImage};
use std::path::Path;

use crate::domain::dataset_kind::CropPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransform {
    pub policy:   CropPolicy,
    pub size:     u32,
    pub channels: usize,
}

impl ImageTransform {
    pub fn new(policy: CropPolicy, size: u32, channels: usize) -> Result<Self> {
        if size == 0 {
            bail!("image size must be positive");
        }
        if !matches!(channels, 1 | 3 | 4) {
            bail!("unsupported channel count {channels} (expected 1, 3 or 4)");
        }
        Ok(Self { policy, size, channels })
    }

    /// Number of floats produced per image
    pub fn numel(&self) -> usize {
        self.channels * (self.size as usize) * (self.size as usize)
    }

    /// Decode a file and run the full pipeline
    pub fn load(&self, path: &Path) -> Result<Vec<f32>> {
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        Ok(self.to_chw(&self.geometry(&img)))
    }

    /// Crop and resize according to the dataset policy
    pub fn geometry(&self, img: &DynamicImage) -> RgbaImage {
        let rgba = img.to_rgba8();
        match self.policy {
            CropPolicy::CropThenResize(crop) => {
                let cropped = center_crop(&rgba, crop);
                let resized = resize_shorter_edge(&cropped, self.size);
                // Square crops resize to exactly size×size; crop again in
                // case of rounding on odd inputs.
                center_crop(&resized, self.size)
            }
            CropPolicy::ResizeThenCrop => {
                let resized = resize_shorter_edge(&rgba, self.size);
                center_crop(&resized, self.size)
            }
        }
    }

    /// HWC u8 → CHW f32 in [-1, 1]
    pub fn to_chw(&self, img: &RgbaImage) -> Vec<f32> {
        let (w, h) = img.dimensions();
        let plane  = (w * h) as usize;
        let mut out = vec![0.0f32; self.channels * plane];

        for (x, y, px) in img.enumerate_pixels() {
            let i = (y * w + x) as usize;
            for (c, &v) in px.0.iter().take(self.channels).enumerate() {
                out[c * plane + i] = normalize(v);
            }
        }
        out
    }
}

fn normalize(v: u8) -> f32 {
    (v as f32 / 255.0 - 0.5) / 0.5
}

/// Scale so the shorter edge equals `size`. The longer edge is
/// truncated, e.g. 178×218 → 64×78.
pub fn resize_shorter_edge(img: &RgbaImage, size: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || w.min(h) == size {
        return img.clone();
    }
    let (nw, nh) = if w <= h {
        (size, (size as u64 * h as u64 / w as u64) as u32)
    } else {
        ((size as u64 * w as u64 / h as u64) as u32, size)
    };
    imageops::resize(img, nw.max(1), nh.max(1), FilterType::Triangle)
}

/// Centred `size × size` window; areas outside the source are black.
pub fn center_crop(img: &RgbaImage, size: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == size && h == size {
        return img.clone();
    }

    let (src_x, dst_x) = crop_offsets(w, size);
    let (src_y, dst_y) = crop_offsets(h, size);
    let copy_w = w.min(size);
    let copy_h = h.min(size);

    let mut canvas = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 255]));
    let window = imageops::crop_imm(img, src_x, src_y, copy_w, copy_h).to_image();
    imageops::replace(&mut canvas, &window, dst_x as i64, dst_y as i64);
    canvas
}

/// (offset into source, offset into output) along one axis.
/// Half-pixel margins round to even, e.g. 85 → 64 starts at 10.
fn crop_offsets(extent: u32, size: u32) -> (u32, u32) {
    if extent >= size {
        (((extent - size) as f64 / 2.0).round_ties_even() as u32, 0)
    } else {
        (0, (size - extent) / 2)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_resize_keeps_aspect() {
        let img = RgbaImage::new(178, 218);
        let out = resize_shorter_edge(&img, 64);
        assert_eq!(out.dimensions(), (64, 78));

        let wide = RgbaImage::new(300, 100);
        assert_eq!(resize_shorter_edge(&wide, 50).dimensions(), (150, 50));
    }

    #[test]
    fn test_center_crop_takes_middle() {
        let mut img = RgbaImage::from_pixel(5, 5, Rgba([0, 0, 0, 255]));
        img.put_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let out = center_crop(&img, 1);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_center_crop_pads_small_images() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let out = center_crop(&img, 4);
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(1, 1).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(2, 2).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(3, 3).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_policies_produce_square_output() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(178, 218));
        for policy in [CropPolicy::CropThenResize(128), CropPolicy::ResizeThenCrop] {
            let t = ImageTransform::new(policy, 64, 3).unwrap();
            assert_eq!(t.geometry(&img).dimensions(), (64, 64));
        }
    }

    #[test]
    fn test_to_chw_normalises_to_unit_range() {
        let t = ImageTransform::new(CropPolicy::ResizeThenCrop, 2, 3).unwrap();
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([255, 0, 0, 255]));
        let chw = t.to_chw(&img);

        assert_eq!(chw.len(), t.numel());
        // red plane, pixel (1, 0)
        assert_eq!(chw[1], 1.0);
        // green plane, pixel (1, 0)
        assert_eq!(chw[4 + 1], -1.0);
    }

    #[test]
    fn test_grayscale_is_replicated_to_rgb() {
        let t = ImageTransform::new(CropPolicy::ResizeThenCrop, 2, 3).unwrap();
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([51])));
        let chw = t.to_chw(&t.geometry(&gray));
        let expected = 51.0 / 127.5 - 1.0;
        assert!(chw.iter().all(|v| (v - expected).abs() < 1e-6));
    }

    #[test]
    fn test_crop_offsets_round_half_to_even() {
        // margin 10.5 → 10, margin 11.5 → 12, margin 2 → 2
        assert_eq!(crop_offsets(85, 64), (10, 0));
        assert_eq!(crop_offsets(87, 64), (12, 0));
        assert_eq!(crop_offsets(68, 64), (2, 0));
        assert_eq!(crop_offsets(61, 64), (0, 1));
    }

    #[test]
    fn test_odd_margin_crop_window() {
        // 85 wide: columns 10..74 survive, column 10 is marked
        let mut img = RgbaImage::from_pixel(85, 64, Rgba([0, 0, 0, 255]));
        for y in 0..64 {
            img.put_pixel(10, y, Rgba([255, 255, 255, 255]));
        }
        let out = center_crop(&img, 64);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_single_channel_keeps_red_plane() {
        let t = ImageTransform::new(CropPolicy::ResizeThenCrop, 1, 1).unwrap();
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        assert_eq!(t.to_chw(&img), vec![1.0]);

        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([0])));
        assert_eq!(t.to_chw(&t.geometry(&gray)), vec![-1.0]);
    }

    #[test]
    fn test_four_channels_keep_alpha() {
        let t = ImageTransform::new(CropPolicy::ResizeThenCrop, 1, 4).unwrap();
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        assert_eq!(t.to_chw(&img), vec![-1.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_rejects_bad_channel_count() {
        assert!(ImageTransform::new(CropPolicy::ResizeThenCrop, 64, 2).is_err());
        assert!(ImageTransform::new(CropPolicy::ResizeThenCrop, 0, 3).is_err());
    }
}
