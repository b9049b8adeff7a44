//! Reference (CPU) evaluation of pass programs.
//!
//! These functions define the per-pixel results every backend must reproduce.
//! The WGSL generator in `compile::wgsl` emits the same formulas.

use crate::coords::Vec2;
use crate::paint::Color;
use crate::scene::{Boolean, Camera2D, Composite, Material, Pattern, Shape2D};

use super::program::{ShapeProgram, EMPTY_SHAPE};

/// Signed distance from `p` (shape-local) to `shape`, in world units.
pub fn sd_shape(shape: Shape2D, p: Vec2) -> f32 {
    match shape {
        Shape2D::Circle { radius } => p.length() - radius,
        Shape2D::Box { half_size, rounding } => {
            let r = rounding.max(0.0);
            let q = p.abs() - half_size + Vec2::splat(r);
            q.max(Vec2::zero()).length() + q.x.max(q.y).min(0.0) - r
        }
        Shape2D::Ring { radius, thickness } => (p.length() - radius).abs() - thickness * 0.5,
    }
}

/// Shape-pass value at `pixel` (pixel center coordinates).
pub fn eval_shapes(program: &ShapeProgram, camera: Camera2D, pixel: Vec2, resolution: Vec2) -> [f32; 4] {
    let world = camera.pixel_to_world(pixel, resolution);
    let zoom = camera.effective_zoom();

    let mut acc = EMPTY_SHAPE;
    for placed in &program.shapes {
        let local = placed.transform.to_local(world);
        let d = sd_shape(placed.shape, local) * zoom;
        match placed.boolean {
            Boolean::Union => {
                if d < acc[0] {
                    acc = [d, -1.0, placed.material as f32, placed.id as f32];
                }
            }
            Boolean::Subtract => acc[0] = acc[0].max(-d),
            Boolean::Intersect => acc[0] = acc[0].max(d),
        }
    }
    acc
}

/// Background value at `pixel`.
pub fn eval_pattern(pattern: &Pattern, camera: Camera2D, pixel: Vec2, resolution: Vec2) -> [f32; 4] {
    match pattern {
        Pattern::Solid { color } => color.to_array(),
        Pattern::Checker { a, b, cell } => {
            let cell = if *cell > 0.0 { *cell } else { 1.0 };
            let world = camera.pixel_to_world(pixel, resolution);
            let s = (world.x / cell).floor() + (world.y / cell).floor();
            let parity = s - 2.0 * (s * 0.5).floor();
            if parity > 0.5 { b.to_array() } else { a.to_array() }
        }
        Pattern::VerticalGradient { top, bottom } => {
            let t = (pixel.y / resolution.y.max(1.0)).clamp(0.0, 1.0);
            top.lerp(*bottom, t).to_array()
        }
    }
}

/// Looks up the material encoded in a shape-pass value.
pub fn material_at(materials: &[Material], index: f32) -> Material {
    if index < 0.0 || !index.is_finite() {
        return Material::default();
    }
    materials.get(index.round() as usize).copied().unwrap_or_default()
}

/// Composition of one pixel: shape material "over" the background.
pub fn eval_composite(
    composite: &Composite,
    materials: &[Material],
    shape: [f32; 4],
    back: [f32; 4],
) -> [f32; 4] {
    let aa = composite.antialias.max(1e-4);
    let d = shape[0];
    let coverage = (0.5 - d / aa).clamp(0.0, 1.0);

    let mut color: Color = material_at(materials, shape[2]).color;
    if let Some(border) = composite.border.filter(|b| b.width > 0.0) {
        let t = (0.5 + (d + border.width) / aa).clamp(0.0, 1.0);
        color = color.lerp(border.color, t);
    }

    let src = color.to_array();
    let k = 1.0 - coverage * src[3];
    [
        back[0] * k + src[0] * coverage,
        back[1] * k + src[1] * coverage,
        back[2] * k + src[2] * coverage,
        back[3] * k + src[3] * coverage,
    ]
}
