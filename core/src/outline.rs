use serde::{Deserialize, Serialize};

use crate::edge::{boundary_seed, EdgePlan, AXIS_HORIZONTAL, AXIS_VERTICAL};
use crate::grid::BoardGeometry;
use crate::math::{append_cubic, rand_range};

pub const TAB_SIZE_RATIO_MIN: f32 = 0.1;
pub const TAB_SIZE_RATIO_MAX: f32 = 0.4;
pub const NECK_RATIO_MIN: f32 = 0.3;
pub const NECK_RATIO_MAX: f32 = 0.9;
pub const HEAD_RATIO_MIN: f32 = 0.6;
pub const HEAD_RATIO_MAX: f32 = 1.6;
pub const DEPTH_RATIO_MIN: f32 = 0.4;
pub const DEPTH_RATIO_MAX: f32 = 1.2;
pub const SHOULDER_LIFT_MIN: f32 = 0.2;
pub const SHOULDER_LIFT_MAX: f32 = 0.9;
pub const MID_JITTER_MAX: f32 = 0.15;
pub const DEPTH_JITTER_MAX: f32 = 0.4;
pub const DEPTH_CAP_RATIO_MIN: f32 = 0.2;
pub const DEPTH_CAP_RATIO_MAX: f32 = 0.45;
pub const CURVE_STEPS_MIN: u32 = 4;
pub const CURVE_STEPS_MAX: u32 = 32;

/// Tuned tab silhouette parameters. These are presentation settings,
/// not part of the placement contract: any profile produces valid
/// interlocking shapes, the defaults just look right.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TabProfile {
    /// Tab size as a fraction of `min(piece_width, piece_height)`.
    pub tab_size_ratio: f32,
    /// Neck width as a fraction of the tab size.
    pub neck_ratio: f32,
    /// Head width as a fraction of the tab size.
    pub head_ratio: f32,
    /// Tab depth as a fraction of the tab size.
    pub depth_ratio: f32,
    /// Height of the neck shoulder control points, fraction of depth.
    pub shoulder_lift: f32,
    /// Seeded apex drift along the edge, fraction of edge length.
    pub mid_jitter: f32,
    /// Seeded depth variation, fraction of nominal depth.
    pub depth_jitter: f32,
    /// Hard cap on depth as a fraction of the smaller piece dimension.
    pub depth_cap_ratio: f32,
    /// Sample count per cubic segment.
    pub curve_steps: u32,
}

impl Default for TabProfile {
    fn default() -> Self {
        Self {
            tab_size_ratio: 0.25,
            neck_ratio: 0.6,
            head_ratio: 1.0,
            depth_ratio: 0.8,
            shoulder_lift: 0.6,
            mid_jitter: 0.08,
            depth_jitter: 0.15,
            depth_cap_ratio: 0.32,
            curve_steps: 12,
        }
    }
}

impl TabProfile {
    pub fn clamped(&self) -> Self {
        Self {
            tab_size_ratio: self.tab_size_ratio.clamp(TAB_SIZE_RATIO_MIN, TAB_SIZE_RATIO_MAX),
            neck_ratio: self.neck_ratio.clamp(NECK_RATIO_MIN, NECK_RATIO_MAX),
            head_ratio: self.head_ratio.clamp(HEAD_RATIO_MIN, HEAD_RATIO_MAX),
            depth_ratio: self.depth_ratio.clamp(DEPTH_RATIO_MIN, DEPTH_RATIO_MAX),
            shoulder_lift: self.shoulder_lift.clamp(SHOULDER_LIFT_MIN, SHOULDER_LIFT_MAX),
            mid_jitter: self.mid_jitter.clamp(0.0, MID_JITTER_MAX),
            depth_jitter: self.depth_jitter.clamp(0.0, DEPTH_JITTER_MAX),
            depth_cap_ratio: self.depth_cap_ratio.clamp(DEPTH_CAP_RATIO_MIN, DEPTH_CAP_RATIO_MAX),
            curve_steps: self.curve_steps.clamp(CURVE_STEPS_MIN, CURVE_STEPS_MAX),
        }
    }
}

pub fn tab_size(piece_width: f32, piece_height: f32, profile: &TabProfile) -> f32 {
    piece_width.min(piece_height) * profile.tab_size_ratio
}

/// Largest outward excursion any edge of any piece can reach; callers
/// pad piece-local textures and masks by this much on every side.
pub fn outline_pad(piece_width: f32, piece_height: f32, profile: &TabProfile) -> f32 {
    let profile = profile.clamped();
    let min_dim = piece_width.min(piece_height);
    let nominal = tab_size(piece_width, piece_height, &profile)
        * profile.depth_ratio
        * (1.0 + profile.depth_jitter);
    nominal.min(min_dim * profile.depth_cap_ratio).ceil()
}

/// Curve for one boundary in boundary space: x runs 0..len along the
/// boundary, y is the signed displacement (+1 polarity displaces toward
/// positive y/x in grid space). Both adjacent cells sample this exact
/// polyline, which is what keeps shared edges complementary.
pub fn boundary_polyline(
    len: f32,
    tab: f32,
    depth_cap: f32,
    polarity: i8,
    seed: u32,
    profile: &TabProfile,
) -> Vec<(f32, f32)> {
    if polarity == 0 {
        return vec![(0.0, 0.0), (len, 0.0)];
    }
    let profile = profile.clamped();
    let neck = tab * profile.neck_ratio;
    let head = tab * profile.head_ratio;
    let depth_scale = 1.0 + rand_range(seed, 1, -profile.depth_jitter, profile.depth_jitter);
    let depth = (tab * profile.depth_ratio * depth_scale).min(depth_cap);
    let mid_shift = rand_range(seed, 2, -profile.mid_jitter, profile.mid_jitter) * len;
    let margin = head * 0.5 + len * 0.05;
    let mid = (len * 0.5 + mid_shift).clamp(margin, len - margin);
    let d = depth * polarity as f32;
    let lift = d * profile.shoulder_lift;

    let neck_in = (mid - neck * 0.5, 0.0);
    let neck_out = (mid + neck * 0.5, 0.0);
    let apex = (mid, d);

    let mut points = Vec::with_capacity(profile.curve_steps as usize * 2 + 4);
    points.push((0.0, 0.0));
    points.push(neck_in);
    append_cubic(
        &mut points,
        neck_in,
        (neck_in.0, lift),
        (mid - head * 0.5, d),
        apex,
        profile.curve_steps,
    );
    append_cubic(
        &mut points,
        apex,
        (mid + head * 0.5, d),
        (neck_out.0, lift),
        neck_out,
        profile.curve_steps,
    );
    points.push((len, 0.0));
    points
}

/// Closed outline of one piece in piece-local coordinates (cell origin
/// at 0,0). Tabs extend outside the nominal rect by up to
/// `outline_pad`; the final point is not repeated.
pub fn piece_outline(
    col: u32,
    row: u32,
    geometry: &BoardGeometry,
    plan: &EdgePlan,
    seed: u32,
    profile: &TabProfile,
) -> Vec<(f32, f32)> {
    let pw = geometry.piece_width;
    let ph = geometry.piece_height;
    let tab = tab_size(pw, ph, &profile.clamped());
    let depth_cap = pw.min(ph) * profile.clamped().depth_cap_ratio;

    let top = boundary_polyline(
        pw,
        tab,
        depth_cap,
        plan.horizontal[row as usize][col as usize],
        boundary_seed(seed, AXIS_HORIZONTAL, row, col),
        profile,
    );
    let right = boundary_polyline(
        ph,
        tab,
        depth_cap,
        plan.vertical[row as usize][(col + 1) as usize],
        boundary_seed(seed, AXIS_VERTICAL, row, col + 1),
        profile,
    );
    let bottom = boundary_polyline(
        pw,
        tab,
        depth_cap,
        plan.horizontal[(row + 1) as usize][col as usize],
        boundary_seed(seed, AXIS_HORIZONTAL, row + 1, col),
        profile,
    );
    let left = boundary_polyline(
        ph,
        tab,
        depth_cap,
        plan.vertical[row as usize][col as usize],
        boundary_seed(seed, AXIS_VERTICAL, row, col),
        profile,
    );

    let mut outline = Vec::with_capacity(top.len() + right.len() + bottom.len() + left.len());
    // Top boundary, left to right, displacement is +y in local space.
    outline.extend(top.iter().map(|&(t, d)| (t, d)));
    // Right boundary, top to bottom, displacement is +x.
    outline.extend(right.iter().skip(1).map(|&(t, d)| (pw + d, t)));
    // Bottom boundary traversed right to left.
    outline.extend(bottom.iter().rev().skip(1).map(|&(t, d)| (t, ph + d)));
    // Left boundary traversed bottom to top; drop the closing corner.
    let left_len = left.len();
    outline.extend(
        left.iter()
            .rev()
            .skip(1)
            .take(left_len.saturating_sub(2))
            .map(|&(t, d)| (d, t)),
    );
    outline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::board_geometry;

    fn test_setup() -> (BoardGeometry, EdgePlan) {
        let geometry = board_geometry(400, 400, 16, (0.0, 0.0));
        let plan = EdgePlan::build(geometry.cols, geometry.rows, 0x5EED);
        (geometry, plan)
    }

    #[test]
    fn flat_boundary_is_a_straight_segment() {
        let points = boundary_polyline(100.0, 25.0, 32.0, 0, 1, &TabProfile::default());
        assert_eq!(points, vec![(0.0, 0.0), (100.0, 0.0)]);
    }

    #[test]
    fn tab_boundary_starts_and_ends_on_the_line() {
        let points = boundary_polyline(100.0, 25.0, 32.0, 1, 9, &TabProfile::default());
        assert_eq!(points[0], (0.0, 0.0));
        assert_eq!(*points.last().unwrap(), (100.0, 0.0));
        let max_d = points.iter().fold(0.0f32, |acc, p| acc.max(p.1.abs()));
        assert!(max_d > 0.0);
        assert!(max_d <= 32.0 + 1e-3);
    }

    #[test]
    fn polarity_mirrors_displacement() {
        let profile = TabProfile::default();
        let out = boundary_polyline(100.0, 25.0, 32.0, 1, 9, &profile);
        let inn = boundary_polyline(100.0, 25.0, 32.0, -1, 9, &profile);
        assert_eq!(out.len(), inn.len());
        for (a, b) in out.iter().zip(inn.iter()) {
            assert_eq!(a.0, b.0);
            assert_eq!(a.1, -b.1);
        }
    }

    #[test]
    fn corner_piece_outline_contains_its_corners() {
        let (geometry, plan) = test_setup();
        let outline = piece_outline(0, 0, &geometry, &plan, 0x5EED, &TabProfile::default());
        assert!(outline.contains(&(0.0, 0.0)));
        let pw = geometry.piece_width;
        let ph = geometry.piece_height;
        assert!(outline.contains(&(pw, 0.0)));
        assert!(outline.contains(&(0.0, ph)));
    }

    #[test]
    fn neighbours_share_exact_boundary_points() {
        let (geometry, plan) = test_setup();
        let profile = TabProfile::default();
        let seed = 0x5EED;
        let a = piece_outline(1, 1, &geometry, &plan, seed, &profile);
        let b = piece_outline(2, 1, &geometry, &plan, seed, &profile);
        let pw = geometry.piece_width;
        let ph = geometry.piece_height;
        let shared = boundary_polyline(
            ph,
            tab_size(pw, ph, &profile),
            pw.min(ph) * profile.depth_cap_ratio,
            plan.vertical[1][2],
            boundary_seed(seed, AXIS_VERTICAL, 1, 2),
            &profile,
        );
        // The boundary between (1,1) and (2,1) must appear verbatim in
        // both pieces' local frames.
        for &(t, d) in &shared {
            assert!(a.iter().any(|&q| q == (pw + d, t)));
            assert!(b.iter().any(|&q| q == (d, t)));
        }
    }

    #[test]
    fn outline_stays_within_pad() {
        let (geometry, plan) = test_setup();
        let profile = TabProfile::default();
        let pad = outline_pad(geometry.piece_width, geometry.piece_height, &profile);
        for row in 0..geometry.rows {
            for col in 0..geometry.cols {
                let outline = piece_outline(col, row, &geometry, &plan, 0x5EED, &profile);
                for (x, y) in outline {
                    assert!(x >= -pad - 1e-3 && x <= geometry.piece_width + pad + 1e-3);
                    assert!(y >= -pad - 1e-3 && y <= geometry.piece_height + pad + 1e-3);
                }
            }
        }
    }
}
