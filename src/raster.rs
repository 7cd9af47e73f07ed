use std::io::Cursor;

use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbaImage};

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("invalid image dimensions")]
    Dimensions,
}

/// Decodes arbitrary image bytes to RGBA8, honoring any EXIF
/// orientation and optionally capping the larger dimension.
pub fn decode_rgba(bytes: &[u8], max_dim: Option<u32>) -> Result<RgbaImage, RasterError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| RasterError::Decode(err.to_string()))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|err| RasterError::Decode(err.to_string()))?;
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder)
        .map_err(|err| RasterError::Decode(err.to_string()))?;
    image.apply_orientation(orientation);
    let rgba = resize_to_max_dim(image.to_rgba8(), max_dim);
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(RasterError::Dimensions);
    }
    Ok(rgba)
}

pub fn resize_to_max_dim(rgba: RgbaImage, max_dim: Option<u32>) -> RgbaImage {
    let Some(max_dim) = max_dim else {
        return rgba;
    };
    if max_dim == 0 {
        return rgba;
    }
    let (width, height) = rgba.dimensions();
    let max_axis = width.max(height);
    if max_axis <= max_dim {
        return rgba;
    }
    let scale = max_dim as f32 / max_axis as f32;
    let next_width = ((width as f32) * scale).round().max(1.0) as u32;
    let next_height = ((height as f32) * scale).round().max(1.0) as u32;
    image::imageops::resize(&rgba, next_width, next_height, FilterType::Lanczos3)
}

/// Even-odd scanline fill of a closed polyline. `origin` is the
/// outline-space position of the mask's top-left pixel corner; pixel
/// centers inside the polygon become 255.
pub fn fill_mask(outline: &[(f32, f32)], width: u32, height: u32, origin: (f32, f32)) -> Vec<u8> {
    let mut mask = vec![0u8; (width as usize) * (height as usize)];
    if outline.len() < 3 {
        return mask;
    }
    let count = outline.len();
    let mut crossings: Vec<f32> = Vec::new();
    for py in 0..height {
        let y = origin.1 + py as f32 + 0.5;
        crossings.clear();
        for i in 0..count {
            let (x0, y0) = outline[i];
            let (x1, y1) = outline[(i + 1) % count];
            if (y0 <= y && y1 > y) || (y1 <= y && y0 > y) {
                let t = (y - y0) / (y1 - y0);
                crossings.push(x0 + t * (x1 - x0));
            }
        }
        crossings.sort_by(f32::total_cmp);
        let row = (py as usize) * (width as usize);
        for pair in crossings.chunks(2) {
            let [enter, exit] = pair else {
                continue;
            };
            let from = ((enter - origin.0 - 0.5).ceil().max(0.0)) as usize;
            let to = ((exit - origin.0 - 0.5).ceil().max(0.0)) as usize;
            let to = to.min(width as usize);
            for px in from..to {
                mask[row + px] = 255;
            }
        }
    }
    mask
}

/// Strokes a closed polyline into the image with simple alpha-over
/// blending, sampling each segment at sub-pixel steps.
pub fn stroke_polyline(
    image: &mut RgbaImage,
    outline: &[(f32, f32)],
    origin: (f32, f32),
    color: [u8; 3],
    alpha: u8,
) {
    let count = outline.len();
    if count < 2 {
        return;
    }
    for i in 0..count {
        let (x0, y0) = outline[i];
        let (x1, y1) = outline[(i + 1) % count];
        let dx = x1 - x0;
        let dy = y1 - y0;
        let steps = ((dx * dx + dy * dy).sqrt().ceil() as usize).max(1);
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let x = x0 + dx * t - origin.0;
            let y = y0 + dy * t - origin.1;
            if x < 0.0 || y < 0.0 {
                continue;
            }
            let (px, py) = (x as u32, y as u32);
            if px >= image.width() || py >= image.height() {
                continue;
            }
            blend_pixel(image, px, py, color, alpha);
        }
    }
}

/// The same polyline scaled toward its centroid; used for the lighter
/// inner highlight stroke just inside a piece's rim.
pub fn shrink_toward_centroid(outline: &[(f32, f32)], factor: f32) -> Vec<(f32, f32)> {
    if outline.is_empty() {
        return Vec::new();
    }
    let inv = 1.0 / outline.len() as f32;
    let (cx, cy) = outline
        .iter()
        .fold((0.0f32, 0.0f32), |acc, p| (acc.0 + p.0, acc.1 + p.1));
    let (cx, cy) = (cx * inv, cy * inv);
    outline
        .iter()
        .map(|&(x, y)| (cx + (x - cx) * factor, cy + (y - cy) * factor))
        .collect()
}

fn blend_pixel(image: &mut RgbaImage, x: u32, y: u32, color: [u8; 3], alpha: u8) {
    let pixel = image.get_pixel_mut(x, y);
    if pixel.0[3] == 0 {
        return;
    }
    let a = alpha as u32;
    let inv = 255 - a;
    for channel in 0..3 {
        let base = pixel.0[channel] as u32;
        pixel.0[channel] = ((color[channel] as u32 * a + base * inv) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_fills_a_rectangle_exactly() {
        let rect = vec![(0.0, 0.0), (8.0, 0.0), (8.0, 8.0), (0.0, 8.0)];
        let mask = fill_mask(&rect, 8, 8, (0.0, 0.0));
        assert!(mask.iter().all(|&v| v == 255));
    }

    #[test]
    fn mask_respects_origin_offset() {
        let rect = vec![(2.0, 2.0), (6.0, 2.0), (6.0, 6.0), (2.0, 6.0)];
        let mask = fill_mask(&rect, 8, 8, (0.0, 0.0));
        assert_eq!(mask[0], 0);
        assert_eq!(mask[3 * 8 + 3], 255);
        assert_eq!(mask[7 * 8 + 7], 0);
    }

    #[test]
    fn degenerate_outline_fills_nothing() {
        let mask = fill_mask(&[(0.0, 0.0), (4.0, 4.0)], 4, 4, (0.0, 0.0));
        assert!(mask.iter().all(|&v| v == 0));
    }

    #[test]
    fn resize_caps_the_larger_axis() {
        let image = RgbaImage::new(200, 100);
        let resized = resize_to_max_dim(image, Some(50));
        assert_eq!(resized.dimensions(), (50, 25));
    }

    #[test]
    fn shrink_preserves_point_count() {
        let rect = vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)];
        let inner = shrink_toward_centroid(&rect, 0.5);
        assert_eq!(inner.len(), 4);
        assert_eq!(inner[0], (1.0, 1.0));
    }
}
