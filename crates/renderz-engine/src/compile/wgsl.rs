//! WGSL generation for pass programs.
//!
//! Every generated module has the same interface so the wgpu backend can build
//! all passes with one pipeline layout:
//! - `@group(0) @binding(0)`: `FrameInfo` uniform (target resolution)
//! - `@group(0) @binding(1..)`: input textures, read with `textureLoad`
//! - `vs_main`: fullscreen triangle, `fs_main`: per-pixel program
//!
//! The formulas mirror `compile::eval`.

use crate::paint::Color;
use crate::scene::{Boolean, Camera2D, Composite, Material, Pattern, Shape2D};

use super::program::{PassProgram, ShapeProgram, EMPTY_DISTANCE};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Size in bytes of the `FrameInfo` uniform.
pub const FRAME_UNIFORM_SIZE: u64 = 16;

const COMMON: &str = r#"struct FrameInfo {
    resolution: vec2<f32>,
    pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> u_frame: FrameInfo;

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((vi << 1u) & 2u), f32(vi & 2u));
    return vec4<f32>(uv * 2.0 - vec2<f32>(1.0, 1.0), 0.0, 1.0);
}
"#;

const SDF_FNS: &str = r#"
fn sd_circle(p: vec2<f32>, r: f32) -> f32 {
    return length(p) - r;
}

fn sd_box(p: vec2<f32>, b: vec2<f32>, r: f32) -> f32 {
    let q = abs(p) - b + vec2<f32>(r, r);
    return length(max(q, vec2<f32>(0.0, 0.0))) + min(max(q.x, q.y), 0.0) - r;
}

fn sd_ring(p: vec2<f32>, r: f32, t: f32) -> f32 {
    return abs(length(p) - r) - t * 0.5;
}

fn op_union(a: vec4<f32>, b: vec4<f32>) -> vec4<f32> {
    return select(a, b, b.x < a.x);
}
"#;

/// Blits `src_tex` onto the whole target, nearest-neighbour scaled.
pub const PRESENT_SHADER: &str = r#"struct FrameInfo {
    resolution: vec2<f32>,
    pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> u_frame: FrameInfo;
@group(0) @binding(1) var src_tex: texture_2d<f32>;

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((vi << 1u) & 2u), f32(vi & 2u));
    return vec4<f32>(uv * 2.0 - vec2<f32>(1.0, 1.0), 0.0, 1.0);
}

@fragment
fn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let dims = vec2<f32>(textureDimensions(src_tex));
    let uv = frag.xy / max(u_frame.resolution, vec2<f32>(1.0, 1.0));
    let px = vec2<i32>(min(uv * dims, dims - vec2<f32>(1.0, 1.0)));
    return textureLoad(src_tex, px, 0);
}
"#;

/// Formats a float as a WGSL literal. Non-finite values become `0.0`.
pub fn lit(v: f32) -> String {
    if v.is_finite() { format!("{v:?}") } else { "0.0".to_string() }
}

fn vec2_lit(x: f32, y: f32) -> String {
    format!("vec2<f32>({}, {})", lit(x), lit(y))
}

fn vec4_lit(v: [f32; 4]) -> String {
    format!("vec4<f32>({}, {}, {}, {})", lit(v[0]), lit(v[1]), lit(v[2]), lit(v[3]))
}

fn color_lit(c: Color) -> String {
    vec4_lit(c.to_array())
}

/// Generates the full WGSL module for `program`.
pub fn generate(program: &PassProgram) -> String {
    let mut out = String::from(COMMON);
    match program {
        PassProgram::Pattern { camera, pattern } => {
            out.push_str(&camera_fn(*camera));
            out.push_str(&pattern_fragment(pattern));
        }
        PassProgram::Shapes { camera, program } => {
            out.push_str(SDF_FNS);
            out.push_str(&camera_fn(*camera));
            out.push_str(&shapes_fragment(*camera, program));
        }
        PassProgram::Composite { composite, materials } => {
            out.push_str(&composite_fragment(composite, materials));
        }
    }
    out
}

fn camera_fn(camera: Camera2D) -> String {
    format!(
        "\nfn to_world(pixel: vec2<f32>) -> vec2<f32> {{\n    \
         return (pixel - 0.5 * u_frame.resolution) / {} + {};\n}}\n",
        lit(camera.effective_zoom()),
        vec2_lit(camera.offset.x, camera.offset.y),
    )
}

fn pattern_fragment(pattern: &Pattern) -> String {
    let body = match pattern {
        Pattern::Solid { color } => format!("    return {};\n", color_lit(*color)),
        Pattern::Checker { a, b, cell } => {
            let cell = if *cell > 0.0 { *cell } else { 1.0 };
            format!(
                "    let p = to_world(frag.xy);\n    \
                 let s = floor(p.x / {c}) + floor(p.y / {c});\n    \
                 let parity = s - 2.0 * floor(s * 0.5);\n    \
                 return select({a}, {b}, parity > 0.5);\n",
                c = lit(cell),
                a = color_lit(*a),
                b = color_lit(*b),
            )
        }
        Pattern::VerticalGradient { top, bottom } => format!(
            "    let t = clamp(frag.y / max(u_frame.resolution.y, 1.0), 0.0, 1.0);\n    \
             return mix({}, {}, t);\n",
            color_lit(*top),
            color_lit(*bottom),
        ),
    };
    format!(
        "\n@fragment\nfn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {{\n{body}}}\n"
    )
}

fn shapes_fragment(camera: Camera2D, program: &ShapeProgram) -> String {
    let zoom = lit(camera.effective_zoom());
    let mut body = String::new();
    body.push_str("    let p = to_world(frag.xy);\n");
    body.push_str(&format!("    var acc = vec4<f32>({e}, {e}, {e}, {e});\n", e = lit(EMPTY_DISTANCE)));

    for placed in &program.shapes {
        let (s, c) = (-placed.transform.rotation.to_radians()).sin_cos();
        let sd = match placed.shape {
            Shape2D::Circle { radius } => format!("sd_circle(q, {})", lit(radius)),
            Shape2D::Box { half_size, rounding } => format!(
                "sd_box(q, {}, {})",
                vec2_lit(half_size.x, half_size.y),
                lit(rounding.max(0.0)),
            ),
            Shape2D::Ring { radius, thickness } => {
                format!("sd_ring(q, {}, {})", lit(radius), lit(thickness))
            }
        };
        let combine = match placed.boolean {
            Boolean::Union => format!(
                "acc = op_union(acc, vec4<f32>(d, -1.0, {}, {}));",
                lit(placed.material as f32),
                lit(placed.id as f32),
            ),
            Boolean::Subtract => "acc.x = max(acc.x, -d);".to_string(),
            Boolean::Intersect => "acc.x = max(acc.x, d);".to_string(),
        };
        body.push_str(&format!(
            "    {{\n        \
             let q0 = p - {offset};\n        \
             let q = vec2<f32>(q0.x * {c} - q0.y * {s}, q0.x * {s} + q0.y * {c});\n        \
             let d = {sd} * {zoom};\n        \
             {combine}\n    }}\n",
            offset = vec2_lit(placed.transform.offset.x, placed.transform.offset.y),
            c = lit(c),
            s = lit(s),
        ));
    }
    body.push_str("    return acc;\n");

    format!(
        "\n@fragment\nfn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {{\n{body}}}\n"
    )
}

fn composite_fragment(composite: &Composite, materials: &[Material]) -> String {
    let mut out = String::from(
        "\n@group(0) @binding(1) var shape_tex: texture_2d<f32>;\n\
         @group(0) @binding(2) var back_tex: texture_2d<f32>;\n",
    );

    out.push_str(&format!(
        "\nfn material_color(index: f32) -> vec4<f32> {{\n    \
         var c = {};\n    \
         switch i32(round(index)) {{\n",
        color_lit(Material::default().color),
    ));
    for (i, m) in materials.iter().enumerate() {
        out.push_str(&format!("        case {i}: {{ c = {}; }}\n", color_lit(m.color)));
    }
    out.push_str("        default: {}\n    }\n    return c;\n}\n");

    let aa = lit(composite.antialias.max(1e-4));
    let border = match composite.border.filter(|b| b.width > 0.0) {
        Some(b) => format!(
            "    let t = clamp(0.5 + (d + {}) / {aa}, 0.0, 1.0);\n    \
             color = mix(color, {}, t);\n",
            lit(b.width),
            color_lit(b.color),
        ),
        None => String::new(),
    };

    out.push_str(&format!(
        "\n@fragment\nfn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {{\n    \
         let px = vec2<i32>(frag.xy);\n    \
         let enc = textureLoad(shape_tex, px, 0);\n    \
         let back = textureLoad(back_tex, px, 0);\n    \
         let d = enc.x;\n    \
         let coverage = clamp(0.5 - d / {aa}, 0.0, 1.0);\n    \
         var color = material_color(enc.z);\n\
         {border}    \
         return back * (1.0 - coverage * color.a) + color * coverage;\n}}\n"
    ));
    out
}
