use renderz_engine::coords::Vec2;
use renderz_engine::paint::Color;
use renderz_engine::scene::{
    Boolean, Border, Camera2D, CodeComponent, Composite, Material, Pattern, Scene, Shape2D,
    StageItem, StageKind, Transform2D,
};

/// Checkerboard background, a rounded panel with a punched hole, and an orbit of
/// rings inheriting the panel's transform.
pub fn demo_scene() -> Scene {
    let camera = StageItem::new("camera")
        .with_default_component(CodeComponent::camera("Camera", Camera2D::new(Vec2::zero(), 1.0)));

    let background = StageItem::new("background").with_default_component(CodeComponent::pattern(
        "Checker",
        Pattern::Checker {
            a: Color::from_srgb_u8(38, 40, 46, 255),
            b: Color::from_srgb_u8(30, 32, 37, 255),
            cell: 32.0,
        },
    ));

    let hole = CodeComponent::placed_shape(
        "Hole",
        Shape2D::Circle { radius: 48.0 },
        Transform2D::identity(),
        Boolean::Subtract,
    );
    let panel = StageItem::new("panel")
        .with_transform(Transform2D::translate(-120.0, 0.0).with_rotation(12.0))
        .with_material(Material::new(Color::from_srgb_u8(224, 108, 60, 255)))
        .with_shapes(vec![
            CodeComponent::shape(
                "Panel",
                Shape2D::Box { half_size: Vec2::new(110.0, 80.0), rounding: 18.0 },
            ),
            hole,
        ]);

    let orbit = (0..3).fold(StageItem::new("orbit"), |orbit, i| {
        let ring = StageItem::new(format!("ring{i}"))
            .with_transform(Transform2D::translate(70.0 * i as f32, -150.0))
            .with_shapes(vec![CodeComponent::shape(
                "Ring",
                Shape2D::Ring { radius: 26.0, thickness: 6.0 },
            )]);
        orbit.with_child(ring)
    });
    let orbit = orbit
        .with_material(Material::new(Color::from_srgb_u8(92, 176, 222, 255)))
        .with_shapes(Vec::new());

    let disk = StageItem::new("disk")
        .with_transform(Transform2D::translate(180.0, 60.0))
        .with_material(Material::new(Color::from_srgb_u8(120, 200, 120, 255)))
        .with_shapes(vec![CodeComponent::shape("Disk", Shape2D::Circle { radius: 70.0 })]);

    let composite = Composite {
        antialias: 1.5,
        border: Some(Border { width: 3.0, color: Color::from_srgb_u8(16, 16, 20, 255) }),
    };
    let render = StageItem::new("render").with_default_component(CodeComponent::render("Composite", composite));

    Scene::new()
        .with_item(StageKind::Pre, camera)
        .with_item(StageKind::Pre, background)
        .with_item(StageKind::Shape, panel.with_child(orbit))
        .with_item(StageKind::Shape, disk)
        .with_item(StageKind::Render, render)
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderz_engine::backend::CpuBackend;
    use renderz_engine::pipeline::{Pipeline, Pipeline2D};
    use renderz_engine::texture::GpuTexture;

    #[test]
    fn demo_scene_builds_and_renders() {
        let scene = demo_scene();
        let mut pipeline = Pipeline2D::new(CpuBackend::default());
        pipeline.build(&scene).unwrap();
        assert!(pipeline.is_built());

        // panel, hole, three rings, disk
        assert_eq!(pipeline.ids().len(), 6);

        pipeline.render(64.0, 48.0, None).unwrap();
        let fin = pipeline.final_texture().unwrap();
        assert_eq!((fin.width(), fin.height()), (64, 48));
    }
}
