use image::RgbaImage;

use tsugihagi_core::{
    board_geometry, outline_pad, piece_outline, BoardGeometry, EdgePlan, TabProfile,
};

use crate::raster::{fill_mask, shrink_toward_centroid, stroke_polyline};

const OUTLINE_COLOR: [u8; 3] = [31, 35, 41];
const OUTLINE_ALPHA: u8 = 200;
const HIGHLIGHT_COLOR: [u8; 3] = [255, 255, 255];
const HIGHLIGHT_ALPHA: u8 = 90;
const HIGHLIGHT_SHRINK: f32 = 0.96;

/// Immutable description of one generated piece: grid cell, outline in
/// piece-local space and the clipped texture. Produced once at level
/// start.
pub struct PieceSpec {
    pub id: usize,
    pub col: u32,
    pub row: u32,
    pub outline: Vec<(f32, f32)>,
    pub texture: RgbaImage,
    /// Texture top-left relative to the piece position (tabs overhang
    /// the nominal cell on every side).
    pub texture_offset: (f32, f32),
}

pub struct GeneratedLevel {
    pub geometry: BoardGeometry,
    pub plan: EdgePlan,
    pub specs: Vec<PieceSpec>,
}

/// Cuts a source image into interlocking pieces. The same seed and
/// profile always reproduce the same shapes.
pub struct ShapeGenerator {
    pub seed: u32,
    pub profile: TabProfile,
}

impl ShapeGenerator {
    pub fn new(seed: u32, profile: TabProfile) -> Self {
        Self { seed, profile }
    }

    pub fn generate(
        &self,
        source: &RgbaImage,
        target_count: u32,
        origin: (f32, f32),
    ) -> GeneratedLevel {
        let geometry = board_geometry(source.width(), source.height(), target_count, origin);
        let plan = EdgePlan::build(geometry.cols, geometry.rows, self.seed);
        let pad = outline_pad(geometry.piece_width, geometry.piece_height, &self.profile);
        let tex_width = (geometry.piece_width + pad * 2.0).ceil() as u32;
        let tex_height = (geometry.piece_height + pad * 2.0).ceil() as u32;

        let mut specs = Vec::with_capacity(geometry.piece_count());
        for row in 0..geometry.rows {
            for col in 0..geometry.cols {
                let id = geometry.piece_id(col, row);
                let outline =
                    piece_outline(col, row, &geometry, &plan, self.seed, &self.profile);
                let texture = clip_texture(
                    source,
                    &outline,
                    (
                        col as f32 * geometry.piece_width,
                        row as f32 * geometry.piece_height,
                    ),
                    tex_width,
                    tex_height,
                    pad,
                );
                specs.push(PieceSpec {
                    id,
                    col,
                    row,
                    outline,
                    texture,
                    texture_offset: (-pad, -pad),
                });
            }
        }
        GeneratedLevel {
            geometry,
            plan,
            specs,
        }
    }
}

fn clip_texture(
    source: &RgbaImage,
    outline: &[(f32, f32)],
    cell_origin: (f32, f32),
    width: u32,
    height: u32,
    pad: f32,
) -> RgbaImage {
    let mask_origin = (-pad, -pad);
    let mask = fill_mask(outline, width, height, mask_origin);
    let mut texture = RgbaImage::new(width, height);
    for py in 0..height {
        for px in 0..width {
            if mask[(py as usize) * (width as usize) + px as usize] == 0 {
                continue;
            }
            let src_x = cell_origin.0 - pad + px as f32 + 0.5;
            let src_y = cell_origin.1 - pad + py as f32 + 0.5;
            if src_x < 0.0 || src_y < 0.0 {
                continue;
            }
            let (sx, sy) = (src_x as u32, src_y as u32);
            if sx >= source.width() || sy >= source.height() {
                continue;
            }
            let mut pixel = *source.get_pixel(sx, sy);
            pixel.0[3] = 255;
            texture.put_pixel(px, py, pixel);
        }
    }
    stroke_polyline(&mut texture, outline, mask_origin, OUTLINE_COLOR, OUTLINE_ALPHA);
    let inner = shrink_toward_centroid(outline, HIGHLIGHT_SHRINK);
    stroke_polyline(&mut texture, &inner, mask_origin, HIGHLIGHT_COLOR, HIGHLIGHT_ALPHA);
    texture
}
