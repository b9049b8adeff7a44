use std::collections::{BTreeMap, HashMap};

use crate::backend::Backend;
use crate::compile::{PassProgram, SdfStream, ShapeRef, EMPTY_SHAPE};
use crate::error::{RenderError, RenderResult};
use crate::scene::{
    Camera2D, ComponentBody, ComponentKind, Material, Scene, StageItem, StageKind, SHAPES_LIST,
};
use crate::texture::{round_extent, GpuTexture, TextureCache, TextureDesc, TextureFormat};

use super::{OutputType, Pipeline, RenderSettings};

/// Instance keys.
pub const PRE_INSTANCE: &str = "pre";
pub const SHAPE_INSTANCE: &str = "shape";
pub const RENDER_INSTANCE: &str = "render";

/// Cache texture ids.
pub const BACK_TEXTURE: &str = "back";
pub const DEPTH_TEXTURE: &str = "depth";
pub const RESULT_TEXTURE: &str = "result";

const PASS_COUNT: u32 = 3;

/// 2D signed-distance-field pipeline.
///
/// Passes, in order:
/// 1. `back` (Bgra8Unorm): background pattern, or transparent black
/// 2. `depth` (Rgba16Float): shape distances, or the empty sentinel
/// 3. `result` (Bgra8Unorm): composition of `[depth, back]`; without a
///    composition instance the result is `back` itself
pub struct Pipeline2D<B: Backend> {
    backend: B,
    cache: TextureCache<B::Texture>,
    instances: HashMap<&'static str, B::Instance>,
    built: bool,

    stream: SdfStream,
    ids: BTreeMap<u32, ShapeRef>,

    final_texture: Option<B::Texture>,
    fallback: Option<B::Texture>,

    output_type: OutputType,
    minimal_preview: bool,
    samples: u32,
    render_id: u64,
}

/// Output of a successful compile, swapped into the pipeline as a whole.
struct Compiled<I> {
    instances: HashMap<&'static str, I>,
    ids: BTreeMap<u32, ShapeRef>,
}

impl<B: Backend> Pipeline2D<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: TextureCache::new(),
            instances: HashMap::new(),
            built: false,
            stream: SdfStream::new(),
            ids: BTreeMap::new(),
            final_texture: None,
            fallback: None,
            output_type: OutputType::default(),
            minimal_preview: false,
            samples: 0,
            render_id: 0,
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn is_built(&self) -> bool {
        self.built
    }

    #[inline]
    pub fn has_instance(&self, key: &str) -> bool {
        self.instances.contains_key(key)
    }

    /// Hit-test ids: shape id -> where the shape came from.
    #[inline]
    pub fn ids(&self) -> &BTreeMap<u32, ShapeRef> {
        &self.ids
    }

    /// Renders completed since the last build or cancel.
    #[inline]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Incremented by every cancel.
    #[inline]
    pub fn render_id(&self) -> u64 {
        self.render_id
    }

    #[inline]
    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    /// Takes effect on the next render.
    pub fn set_output_type(&mut self, output_type: OutputType) {
        self.output_type = output_type;
    }

    #[inline]
    pub fn minimal_preview(&self) -> bool {
        self.minimal_preview
    }

    /// Like [`Pipeline::get_texture_of_id`], but never fails on a missing id.
    ///
    /// A missing entry is logged and replaced by a 1x1 transparent texture.
    /// Only a failure to allocate that fallback is returned as an error.
    pub fn texture_or_fallback(&mut self, id: &str) -> RenderResult<B::Texture> {
        match self.cache.get_texture_of_id(id) {
            Ok(texture) => Ok(texture.clone()),
            Err(err) => {
                log::error!("{err}; substituting fallback texture");
                self.fallback_texture()
            }
        }
    }

    /// Releases every cache texture and the fallback. The final texture handle
    /// is dropped as well, so the next render starts from scratch.
    pub fn clear_textures(&mut self) {
        self.cache.clear(&mut self.backend);
        if let Some(fallback) = self.fallback.take() {
            self.backend.release_texture(fallback);
        }
        self.final_texture = None;
    }

    fn fallback_texture(&mut self) -> RenderResult<B::Texture> {
        if let Some(texture) = &self.fallback {
            return Ok(texture.clone());
        }
        let texture = self
            .backend
            .allocate_texture(TextureDesc::new(1, 1, TextureFormat::Bgra8Unorm))?;
        self.backend.render_clear(&texture, [0.0; 4])?;
        self.fallback = Some(texture.clone());
        Ok(texture)
    }

    // ── build ─────────────────────────────────────────────────────────────

    fn compile(&mut self, scene: &Scene) -> RenderResult<Compiled<B::Instance>> {
        let mut instances = HashMap::new();

        // Pre stage: camera + first pattern.
        let pre = scene.stage(StageKind::Pre);
        let camera = match pre.first_component_of_kind(ComponentKind::Camera2D).map(|c| &c.body) {
            Some(ComponentBody::Camera2D(camera)) => *camera,
            _ => {
                log::warn!("pre stage has no Camera2D component; using the default camera");
                Camera2D::default()
            }
        };

        if let Some(component) = pre.first_component_of_kind(ComponentKind::Pattern)
            && let ComponentBody::Pattern(pattern) = &component.body
        {
            let program = PassProgram::Pattern { camera, pattern: pattern.clone() };
            instances.insert(PRE_INSTANCE, self.backend.build(&program)?);
        }

        // Shape stage: one stream over every top-level item with a shape list.
        let (materials, ids) = self.compile_shapes(scene, camera, &mut instances)?;

        // Render stage: default component of the first child.
        let render = scene.stage(StageKind::Render);
        if let Some(component) = render.children().first().and_then(StageItem::default_component) {
            match &component.body {
                ComponentBody::Render(composite) => {
                    let program = PassProgram::Composite { composite: *composite, materials };
                    instances.insert(RENDER_INSTANCE, self.backend.build(&program)?);
                }
                _ => log::warn!(
                    "render stage component `{}` is not a render component; skipping composition",
                    component.name
                ),
            }
        }

        Ok(Compiled { instances, ids })
    }

    /// Returns the material table and hit-test ids collected from the shape stage.
    fn compile_shapes(
        &mut self,
        scene: &Scene,
        camera: Camera2D,
        instances: &mut HashMap<&'static str, B::Instance>,
    ) -> RenderResult<(Vec<Material>, BTreeMap<u32, ShapeRef>)> {
        self.stream.reset();

        let items: Vec<&StageItem> = scene
            .stage(StageKind::Shape)
            .children()
            .iter()
            .filter(|item| item.component_list(SHAPES_LIST).is_some())
            .collect();
        if items.is_empty() {
            return Ok((vec![Material::default()], BTreeMap::new()));
        }

        self.stream.open_stream(camera);
        for item in items {
            push_item_recursive(&mut self.stream, item);
        }
        let program = self.stream.close_stream();
        let ids = self.stream.take_ids();

        let materials = program.materials.clone();
        if !program.is_empty() {
            let pass = PassProgram::Shapes { camera, program };
            instances.insert(SHAPE_INSTANCE, self.backend.build(&pass)?);
        }
        Ok((materials, ids))
    }
}

fn push_item_recursive(stream: &mut SdfStream, item: &StageItem) {
    let Some(shapes) = item.component_list(SHAPES_LIST) else { return };
    stream.push_stage_item(item);
    for shape in shapes {
        stream.push_component(shape);
    }
    for child in &item.children {
        push_item_recursive(stream, child);
    }
    stream.pull_stage_item();
}

impl<B: Backend> Pipeline for Pipeline2D<B> {
    type Texture = B::Texture;

    fn build(&mut self, scene: &Scene) -> RenderResult<()> {
        let Compiled { instances, ids } = match self.compile(scene) {
            Ok(compiled) => compiled,
            Err(err) => {
                if self.built {
                    log::warn!("pipeline2d: build failed ({err}); keeping the previous build");
                }
                return Err(err);
            }
        };

        let mut keys: Vec<_> = instances.keys().copied().collect();
        keys.sort_unstable();
        log::debug!("pipeline2d: built {keys:?}, {} shape ids", ids.len());

        self.instances = instances;
        self.ids = ids;
        self.samples = 0;
        self.built = true;
        Ok(())
    }

    fn render(&mut self, width: f32, height: f32, settings: Option<RenderSettings>) -> RenderResult<()> {
        if !self.built {
            log::debug!("pipeline2d: render before build");
            return Err(RenderError::NotBuilt);
        }
        let mut settings = settings.unwrap_or_default();
        let (w, h) = (round_extent(width), round_extent(height));

        // 1. background
        let back = self
            .cache
            .alloc_texture_id(&mut self.backend, BACK_TEXTURE, w, h, TextureFormat::Bgra8Unorm)?
            .clone();
        match self.instances.get(PRE_INSTANCE) {
            Some(pre) if !settings.transparent => self.backend.render(pre, &back, &[])?,
            _ => self.backend.render_clear(&back, [0.0; 4])?,
        }
        settings.report_progress(1, PASS_COUNT);

        // 2. shape distances
        let depth = self
            .cache
            .alloc_texture_id(&mut self.backend, DEPTH_TEXTURE, w, h, TextureFormat::Rgba16Float)?
            .clone();
        match self.instances.get(SHAPE_INSTANCE) {
            Some(shape) => self.backend.render(shape, &depth, &[])?,
            None => self.backend.render_clear(&depth, EMPTY_SHAPE)?,
        }
        settings.report_progress(2, PASS_COUNT);

        // 3. composition
        let composite = self.instances.get(RENDER_INSTANCE).filter(|_| !self.minimal_preview);
        let result = match composite {
            Some(render) => {
                let result = self
                    .cache
                    .alloc_texture_id(&mut self.backend, RESULT_TEXTURE, w, h, TextureFormat::Bgra8Unorm)?
                    .clone();
                self.backend.render(render, &result, &[&depth, &back])?;
                result
            }
            None => {
                self.cache.free_texture_id(&mut self.backend, RESULT_TEXTURE);
                back
            }
        };
        settings.report_progress(3, PASS_COUNT);

        let final_texture = match self.output_type {
            OutputType::FinalImage => result,
            OutputType::DepthMap => depth,
        };
        let desc = final_texture.desc();
        self.final_texture = Some(final_texture);
        self.samples = self.samples.saturating_add(1);

        log::trace!("pipeline2d: rendered {w}x{h}");
        settings.finish(desc);
        Ok(())
    }

    #[inline]
    fn final_texture(&self) -> Option<&B::Texture> {
        self.final_texture.as_ref()
    }

    fn get_texture_of_id(&self, id: &str) -> RenderResult<&B::Texture> {
        self.cache.get_texture_of_id(id)
    }

    fn cancel(&mut self) {
        self.samples = 0;
        self.render_id = self.render_id.wrapping_add(1);
    }

    fn reset_ids(&mut self) {
        self.ids.clear();
        self.stream.reset();
    }

    fn set_minimal_preview(&mut self, minimal: bool) {
        self.minimal_preview = minimal;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::{CpuBackend, CpuBackendConfig};
    use crate::coords::Vec2;
    use crate::paint::Color;
    use crate::scene::{CodeComponent, Composite, Pattern, Shape2D, Transform2D};

    const RED: Color = Color::from_premul(1.0, 0.0, 0.0, 1.0);
    const BLUE: Color = Color::from_premul(0.0, 0.0, 1.0, 1.0);

    fn camera_item() -> StageItem {
        StageItem::new("camera").with_default_component(CodeComponent::camera("Camera", Camera2D::default()))
    }

    fn background(color: Color) -> StageItem {
        StageItem::new("background")
            .with_default_component(CodeComponent::pattern("Solid", Pattern::Solid { color }))
    }

    fn pre_only_scene() -> Scene {
        Scene::new()
            .with_item(StageKind::Pre, camera_item())
            .with_item(StageKind::Pre, background(BLUE))
    }

    fn full_scene() -> Scene {
        let disk = StageItem::new("disk")
            .with_material(Material::new(RED))
            .with_shapes(vec![CodeComponent::shape("Disk", Shape2D::Circle { radius: 10.0 })]);
        let ring = StageItem::new("ring")
            .with_transform(Transform2D::translate(30.0, 0.0))
            .with_shapes(vec![CodeComponent::shape(
                "Ring",
                Shape2D::Ring { radius: 6.0, thickness: 2.0 },
            )]);
        pre_only_scene()
            .with_item(StageKind::Shape, disk.with_child(ring))
            .with_item(
                StageKind::Render,
                StageItem::new("render").with_default_component(CodeComponent::render("Composite", Composite::default())),
            )
    }

    fn pipeline() -> Pipeline2D<CpuBackend> {
        Pipeline2D::new(CpuBackend::default())
    }

    fn built(scene: &Scene) -> Pipeline2D<CpuBackend> {
        let mut p = pipeline();
        p.build(scene).unwrap();
        p
    }

    // ── build ─────────────────────────────────────────────────────────────

    #[test]
    fn build_compiles_present_stages_only() {
        let p = built(&pre_only_scene());
        assert!(p.has_instance(PRE_INSTANCE));
        assert!(!p.has_instance(SHAPE_INSTANCE));
        assert!(!p.has_instance(RENDER_INSTANCE));

        let p = built(&full_scene());
        assert!(p.has_instance(PRE_INSTANCE));
        assert!(p.has_instance(SHAPE_INSTANCE));
        assert!(p.has_instance(RENDER_INSTANCE));
    }

    #[test]
    fn build_records_hit_test_ids_for_nested_shapes() {
        let p = built(&full_scene());
        let ids: Vec<_> = p.ids().iter().map(|(id, r)| (*id, r.component.as_str())).collect();
        assert_eq!(ids, vec![(0, "Disk"), (1, "Ring")]);
        assert_eq!(p.ids()[&1].path, vec!["disk".to_string(), "ring".to_string()]);
    }

    #[test]
    fn rebuild_restarts_ids_and_replaces_instances() {
        let mut p = built(&full_scene());
        p.build(&pre_only_scene()).unwrap();
        assert!(p.ids().is_empty());
        assert!(!p.has_instance(SHAPE_INSTANCE));

        p.build(&full_scene()).unwrap();
        assert_eq!(p.ids().keys().copied().collect::<Vec<_>>(), vec![0, 1]);
    }

    /// Valid shapes, but a composition pass no backend accepts.
    fn bad_composite_scene() -> Scene {
        let disk = StageItem::new("disk")
            .with_shapes(vec![CodeComponent::shape("Disk", Shape2D::Circle { radius: 10.0 })]);
        pre_only_scene().with_item(StageKind::Shape, disk).with_item(
            StageKind::Render,
            StageItem::new("render").with_default_component(CodeComponent::render(
                "Composite",
                Composite { antialias: 0.0, border: None },
            )),
        )
    }

    #[test]
    fn failed_build_records_no_ids() {
        let mut p = pipeline();
        let err = p.build(&bad_composite_scene()).unwrap_err();
        assert!(matches!(err, RenderError::Compile { ref pass, .. } if pass == "composite"));

        assert!(!p.is_built());
        assert!(p.ids().is_empty());
        assert_eq!(p.render(4.0, 4.0, None), Err(RenderError::NotBuilt));
    }

    #[test]
    fn failed_rebuild_keeps_previous_build() {
        let mut p = built(&full_scene());
        p.render(4.0, 4.0, None).unwrap();

        assert!(p.build(&bad_composite_scene()).is_err());
        assert!(p.is_built());
        assert!(p.has_instance(RENDER_INSTANCE));
        let ids: Vec<_> = p.ids().values().map(|r| r.component.as_str()).collect();
        assert_eq!(ids, vec!["Disk", "Ring"]);

        p.render(4.0, 4.0, None).unwrap();
        assert_eq!(p.samples(), 2);
    }

    #[test]
    fn missing_camera_falls_back_to_default() {
        let scene = Scene::new().with_item(StageKind::Pre, background(BLUE));
        let mut p = built(&scene);
        p.render(4.0, 4.0, None).unwrap();
        assert!(p.final_texture().unwrap().is_filled_with(BLUE.to_array()));
    }

    // ── render preconditions ──────────────────────────────────────────────

    #[test]
    fn render_before_build_fails_without_gpu_work() {
        let mut p = pipeline();
        assert_eq!(p.render(100.0, 100.0, None), Err(RenderError::NotBuilt));
        assert_eq!(p.backend().stats(), Default::default());
        assert!(p.final_texture().is_none());
    }

    #[test]
    fn cancel_and_reset_ids_are_safe_before_build() {
        let mut p = pipeline();
        p.cancel();
        p.reset_ids();
        p.set_minimal_preview(true);
        assert!(!p.is_built());
        assert_eq!(p.render_id(), 1);
    }

    // ── render ────────────────────────────────────────────────────────────

    #[test]
    fn without_shape_instance_depth_holds_sentinel() {
        let mut p = built(&pre_only_scene());
        p.render(16.0, 8.0, None).unwrap();
        let depth = p.get_texture_of_id(DEPTH_TEXTURE).unwrap();
        assert_eq!(depth.format(), TextureFormat::Rgba16Float);
        assert!(depth.is_filled_with([10000.0; 4]));
    }

    #[test]
    fn transparent_background_is_cleared_before_composition() {
        let mut p = built(&pre_only_scene());
        p.render(8.0, 8.0, Some(RenderSettings::transparent())).unwrap();
        assert!(p.get_texture_of_id(BACK_TEXTURE).unwrap().is_filled_with([0.0; 4]));
        assert_eq!(p.backend().stats().passes, 0);
    }

    #[test]
    fn without_render_instance_final_is_back_texture() {
        let mut p = built(&pre_only_scene());
        p.render(100.0, 100.0, None).unwrap();

        let back = p.get_texture_of_id(BACK_TEXTURE).unwrap();
        let fin = p.final_texture().unwrap();
        assert!(fin.same_texture(back));
        assert!(fin.is_filled_with(BLUE.to_array()));
        assert!(p.get_texture_of_id(RESULT_TEXTURE).is_err());
    }

    #[test]
    fn composition_draws_shapes_over_background() {
        let mut p = built(&full_scene());
        p.render(100.0, 60.0, None).unwrap();

        let fin = p.final_texture().unwrap();
        let result = p.get_texture_of_id(RESULT_TEXTURE).unwrap();
        assert!(fin.same_texture(result));
        assert_eq!(fin.format(), TextureFormat::Bgra8Unorm);

        // Center of the disk (world origin) is red, the corner is background.
        assert_eq!(fin.pixel(50, 30), Some(RED.to_array()));
        assert_eq!(fin.pixel(0, 0), Some(BLUE.to_array()));
        // The ring inherits the disk's material: its band around world (35.5, 0.5) is red too.
        assert_eq!(fin.pixel(85, 30), Some(RED.to_array()));
        // Inside the ring hole: background.
        assert_eq!(fin.pixel(80, 30), Some(BLUE.to_array()));
    }

    #[test]
    fn depth_map_output_exposes_shape_texture() {
        let mut p = built(&full_scene());
        p.set_output_type(OutputType::DepthMap);
        p.render(100.0, 60.0, None).unwrap();

        let depth = p.get_texture_of_id(DEPTH_TEXTURE).unwrap();
        let fin = p.final_texture().unwrap();
        assert!(fin.same_texture(depth));
        let center = fin.pixel(50, 30).unwrap();
        assert!(center[0] < 0.0);
        assert_eq!(&center[1..], &[-1.0, 1.0, 0.0]);
    }

    #[test]
    fn minimal_preview_skips_composition() {
        let mut p = built(&full_scene());
        p.set_minimal_preview(true);
        p.render(20.0, 20.0, None).unwrap();
        assert!(p.final_texture().unwrap().same_texture(p.get_texture_of_id(BACK_TEXTURE).unwrap()));
        assert_eq!(p.backend().stats().passes, 2);
    }

    #[test]
    fn fractional_sizes_round_to_pixels() {
        let mut p = built(&pre_only_scene());
        p.render(99.6, 0.2, None).unwrap();
        let fin = p.final_texture().unwrap();
        assert_eq!((fin.width(), fin.height()), (100, 1));
    }

    // ── resolution tracking ───────────────────────────────────────────────

    #[test]
    fn unchanged_resolution_does_no_gpu_work() {
        let mut p = built(&full_scene());
        p.render(200.0, 150.0, None).unwrap();
        p.backend_mut().reset_stats();

        assert!(!p.render_if_resolution_changed(200.0, 150.0).unwrap());
        assert_eq!(p.backend().stats().gpu_work(), 0);
        assert_eq!(p.backend().stats(), Default::default());
    }

    #[test]
    fn changed_resolution_renders_and_reallocates() {
        let mut p = built(&full_scene());
        assert!(p.render_if_resolution_changed(40.0, 30.0).unwrap());
        let allocations = p.backend().stats().allocations;

        assert!(p.render_if_resolution_changed(41.0, 30.0).unwrap());
        let fin = p.final_texture().unwrap();
        assert_eq!((fin.width(), fin.height()), (41, 30));
        assert_eq!(p.backend().stats().allocations, allocations + 3);
        // Old textures were released, only back/depth/result stay live.
        assert_eq!(p.backend().live_textures(), 3);
    }

    #[test]
    fn same_size_renders_reuse_cache_textures() {
        let mut p = built(&full_scene());
        p.render(32.0, 32.0, None).unwrap();
        let back = p.get_texture_of_id(BACK_TEXTURE).unwrap().clone();
        p.render(32.0, 32.0, None).unwrap();
        assert!(back.same_texture(p.get_texture_of_id(BACK_TEXTURE).unwrap()));
        assert_eq!(p.backend().stats().allocations, 3);
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn allocation_failure_keeps_previous_final_texture() {
        let mut p = Pipeline2D::new(CpuBackend::new(CpuBackendConfig {
            max_dimension: 64,
            memory_budget: None,
        }));
        p.build(&full_scene()).unwrap();
        p.render(32.0, 32.0, None).unwrap();
        let previous = p.final_texture().unwrap().clone();

        let err = p.render(128.0, 32.0, None).unwrap_err();
        assert!(matches!(err, RenderError::AllocationFailed { .. }));
        assert!(p.final_texture().unwrap().same_texture(&previous));
        // The cache still holds the last successful allocation.
        assert_eq!(p.get_texture_of_id(BACK_TEXTURE).unwrap().width(), 32);
    }

    #[test]
    fn budget_exhaustion_mid_frame_keeps_previous_final_texture() {
        let mut p = built(&full_scene());
        p.render(8.0, 8.0, None).unwrap();
        let previous = p.final_texture().unwrap().clone();

        // Room for the new back texture only.
        let live = p.backend().live_bytes();
        p.backend_mut().set_memory_budget(Some(live + 16 * 16 * 4));
        assert!(p.render(16.0, 16.0, None).is_err());
        assert!(p.final_texture().unwrap().same_texture(&previous));
        assert_eq!(p.get_texture_of_id(DEPTH_TEXTURE).unwrap().width(), 8);
    }

    #[test]
    fn fallback_substitutes_missing_ids() {
        let mut p = built(&pre_only_scene());
        let a = p.texture_or_fallback("missing").unwrap();
        let b = p.texture_or_fallback("also-missing").unwrap();
        assert!(a.same_texture(&b));
        assert_eq!((a.width(), a.height()), (1, 1));
        assert!(a.is_filled_with([0.0; 4]));

        p.render(4.0, 4.0, None).unwrap();
        let back = p.texture_or_fallback(BACK_TEXTURE).unwrap();
        assert_eq!(back.width(), 4);
    }

    // ── settings & bookkeeping ────────────────────────────────────────────

    #[test]
    fn progress_and_finished_callbacks_fire() {
        let progress = Rc::new(RefCell::new(Vec::new()));
        let finished = Rc::new(RefCell::new(None));

        let settings = RenderSettings::default()
            .with_progress({
                let progress = progress.clone();
                move |done, total| progress.borrow_mut().push((done, total))
            })
            .with_finished({
                let finished = finished.clone();
                move |desc| *finished.borrow_mut() = Some(desc)
            });

        let mut p = built(&full_scene());
        p.render(10.0, 20.0, Some(settings)).unwrap();

        assert_eq!(*progress.borrow(), vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(
            *finished.borrow(),
            Some(TextureDesc::new(10, 20, TextureFormat::Bgra8Unorm))
        );
    }

    #[test]
    fn samples_count_renders_until_cancel() {
        let mut p = built(&pre_only_scene());
        p.render(4.0, 4.0, None).unwrap();
        p.render(4.0, 4.0, None).unwrap();
        assert_eq!(p.samples(), 2);
        p.cancel();
        assert_eq!(p.samples(), 0);
        p.build(&pre_only_scene()).unwrap();
        assert_eq!(p.samples(), 0);
    }

    #[test]
    fn reset_ids_clears_hit_test_map() {
        let mut p = built(&full_scene());
        assert!(!p.ids().is_empty());
        p.reset_ids();
        assert!(p.ids().is_empty());
    }

    #[test]
    fn clear_textures_releases_everything() {
        let mut p = built(&full_scene());
        p.render(8.0, 8.0, None).unwrap();
        let _ = p.texture_or_fallback("missing");
        p.clear_textures();
        assert_eq!(p.backend().live_textures(), 0);
        assert!(p.final_texture().is_none());
        assert!(p.resolution_changed(8.0, 8.0));
    }

    #[test]
    fn camera_offset_moves_shapes() {
        let scene = Scene::new()
            .with_item(
                StageKind::Pre,
                StageItem::new("camera").with_default_component(CodeComponent::camera(
                    "Camera",
                    Camera2D::new(Vec2::new(20.0, 0.0), 1.0),
                )),
            )
            .with_item(StageKind::Pre, background(BLUE))
            .with_item(
                StageKind::Shape,
                StageItem::new("disk")
                    .with_material(Material::new(RED))
                    .with_shapes(vec![CodeComponent::shape("Disk", Shape2D::Circle { radius: 5.0 })]),
            )
            .with_item(
                StageKind::Render,
                StageItem::new("render").with_default_component(CodeComponent::render("Composite", Composite::default())),
            );
        let mut p = built(&scene);
        p.render(100.0, 100.0, None).unwrap();
        let fin = p.final_texture().unwrap();
        // World origin is now 20 px left of the center.
        assert_eq!(fin.pixel(30, 50), Some(RED.to_array()));
        assert_eq!(fin.pixel(50, 50), Some(BLUE.to_array()));
    }
}
