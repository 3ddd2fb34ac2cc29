//! The volume renderer: owns every GPU resource and sequences the passes.
//!
//! A frame runs the boundary pass(es), an optional single-texel pick pass with
//! a blocking readback, and the final full-viewport pass:
//!
//! ```text
//! entry map ─┐
//! exit map ──┼─> [pick texel -> readback -> u_picked] -> final pass
//! volume ────┘
//! ```
//!
//! Boundary and pick passes are submitted before the readback; the final pass
//! is submitted afterwards so it sees the updated `u_picked`.

use std::time::Duration;

use glam::Mat4;
use volspy_core::clip::{view_plane_to_model, ClipPlane};
use volspy_core::color_mode::{ColorMode, ColorModes};
use volspy_core::error::VolspyError;
use volspy_core::geometry::{make_cube_clipped, ClippedCube};
use volspy_core::options::RendererOptions;
use volspy_core::pick::{PickReadback, PickWindow, Viewport};
use volspy_core::recent::{AgedUniform, RecentUniforms};
use volspy_core::uniforms::{UniformValue, GAIN_UNIFORM, NUM_CHANNELS_UNIFORM, PICKED_UNIFORM};

use crate::boundary::{BoundaryFaces, BoundaryRasterizer, RayBound};
use crate::error::{RenderError, RenderResult};
use crate::pick::WindowBinding;
use crate::program::{ProgramInputs, TargetLoad, VolumeBindGroupLayouts, VolumeProgram};
use crate::shader::ProgramKind;
use crate::targets::{RayTargets, PICK_FORMAT};
use crate::volume::{create_volume_sampler, VolumeTexture};

/// Callback receiving the raw pick readback.
pub type PickCallback<'a> = &'a mut dyn FnMut(PickReadback);

/// Two-pass volume ray-caster and slicer.
pub struct VolumeRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    options: RendererOptions,
    boundary: BoundaryRasterizer,
    targets: RayTargets,
    slicers: Vec<VolumeProgram>,
    ray_casters: Vec<VolumeProgram>,
    modes: ColorModes,
    full_window: WindowBinding,
    pick_window: WindowBinding,
    recent: RecentUniforms,
    view: Option<Mat4>,
    anti_view: Option<Mat4>,
    clip_plane: Option<ClipPlane>,
}

impl VolumeRenderer {
    /// Creates a renderer with the three built-in compositing modes.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        volume: &VolumeTexture,
        options: RendererOptions,
    ) -> RenderResult<Self> {
        Self::with_modes(device, queue, volume, options, ColorMode::defaults(), None)
    }

    /// Creates a renderer with custom modes.
    ///
    /// `pick_index` selects a dedicated mode for pick passes; otherwise picks
    /// render with the current mode.
    pub fn with_modes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        volume: &VolumeTexture,
        options: RendererOptions,
        modes: Vec<ColorMode>,
        pick_index: Option<usize>,
    ) -> RenderResult<Self> {
        options.validate()?;
        let modes = ColorModes::new(modes, pick_index)?;

        let targets = RayTargets::new(device, options.fbo_size);
        let volume_sampler = create_volume_sampler(device, options.interpolation);
        let layouts = VolumeBindGroupLayouts::new(device);
        let inputs = ProgramInputs {
            volume,
            volume_sampler: &volume_sampler,
            targets: &targets,
        };

        let max_steps = options.max_ray_steps();
        let mut slicers = Vec::with_capacity(modes.len());
        let mut ray_casters = Vec::with_capacity(modes.len());
        for mode in modes.modes() {
            slicers.push(VolumeProgram::new(
                device,
                ProgramKind::Slice,
                &mode.parts,
                max_steps,
                &layouts,
                &inputs,
            )?);
            ray_casters.push(VolumeProgram::new(
                device,
                ProgramKind::RayCast,
                &mode.parts,
                max_steps,
                &layouts,
                &inputs,
            )?);
        }

        let boundary = BoundaryRasterizer::new(device, queue)?;
        let full_window = WindowBinding::new(device, &layouts.window, PickWindow::FULL);
        let pick_window = WindowBinding::new(device, &layouts.window, PickWindow::FULL);
        let recent = RecentUniforms::new(
            options.uniform_history_limit,
            Duration::from_secs_f64(options.uniform_history_age_secs),
        );

        let mut renderer = Self {
            device: device.clone(),
            queue: queue.clone(),
            options,
            boundary,
            targets,
            slicers,
            ray_casters,
            modes,
            full_window,
            pick_window,
            recent,
            view: None,
            anti_view: None,
            clip_plane: None,
        };
        renderer.init_program_uniforms(volume.channels())?;

        log::info!(
            "volume renderer ready: {} mode(s), {}x{} ray maps, {} ray steps",
            renderer.modes.len(),
            renderer.options.fbo_size.0,
            renderer.options.fbo_size.1,
            max_steps
        );
        Ok(renderer)
    }

    /// Per-program initial values; these bypass the recent-uniform record.
    fn init_program_uniforms(&mut self, channels: u32) -> RenderResult<()> {
        let gain = self.options.initial_gain;
        let slice_gain = gain * self.options.slice_gain_scale;
        let channels = i32::try_from(channels).map_err(|_| VolspyError::InvalidChannelCount(channels))?;

        let programs = self
            .slicers
            .iter_mut()
            .map(|p| (p, slice_gain))
            .chain(self.ray_casters.iter_mut().map(|p| (p, gain)));
        for (program, gain) in programs {
            if program.declares(NUM_CHANNELS_UNIFORM) {
                program.set_uniform(NUM_CHANNELS_UNIFORM, UniformValue::Int(channels))?;
            }
            if program.declares(GAIN_UNIFORM) {
                program.set_uniform(GAIN_UNIFORM, UniformValue::Float(gain))?;
            }
        }
        Ok(())
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    // ========== Mode State ==========

    /// Jumps to mode `index` (modulo the mode count) or steps one mode
    /// forward/backward when `index` is `None`. Returns the new mode index.
    pub fn set_color_mode(&mut self, index: Option<usize>, reverse: bool) -> usize {
        let current = self.modes.set(index, reverse);
        log::info!(
            "color mode {current} {}",
            self.modes.current_mode().description
        );
        current
    }

    pub fn color_mode(&self) -> usize {
        self.modes.current()
    }

    pub fn color_mode_description(&self) -> &str {
        &self.modes.current_mode().description
    }

    pub fn color_modes(&self) -> &ColorModes {
        &self.modes
    }

    /// Pipelines built so far across all programs, one per (format, mask) drawn.
    pub fn pipeline_count(&self) -> usize {
        self.slicers
            .iter()
            .chain(&self.ray_casters)
            .map(VolumeProgram::pipeline_count)
            .sum()
    }

    // ========== View, Projection, Clipping ==========

    /// Sets the camera view matrix and its inverse.
    pub fn set_vol_view(&mut self, view: Mat4, anti_view: Mat4) {
        self.boundary.set_view(&self.queue, view);
        self.view = Some(view);
        self.anti_view = Some(anti_view);
    }

    pub fn set_vol_projection(&mut self, projection: Mat4) {
        self.boundary.set_projection(&self.queue, projection);
    }

    /// Clips the volume with a view-space plane `[A, B, C, D]`, removing the
    /// negative half-space. `None` restores the whole cube.
    ///
    /// Requires [`Self::set_vol_view`] to have been called for a plane.
    pub fn set_clip_plane(&mut self, view_plane: Option<[f32; 4]>) -> RenderResult<()> {
        let Some(view_plane) = view_plane else {
            self.boundary.set_geometry(&self.queue, make_cube_clipped(None));
            self.clip_plane = None;
            log::debug!("clip plane cleared");
            return Ok(());
        };

        let view_plane = ClipPlane::from_array(view_plane)?;
        let anti_view = self.anti_view.ok_or(VolspyError::MissingViewMatrix)?;
        let model_plane = view_plane_to_model(&view_plane, anti_view)?;
        let geometry = make_cube_clipped(Some(&model_plane));

        log::debug!(
            "clip plane {:?} -> model {:?}: {} solid / {} cap triangles",
            view_plane.to_array(),
            model_plane.to_array(),
            geometry.solid_triangle_count(),
            geometry.cap_triangle_count()
        );

        self.boundary.set_geometry(&self.queue, geometry);
        self.clip_plane = Some(view_plane);
        Ok(())
    }

    /// The normalized view-space clip plane, if any.
    pub fn clip_plane(&self) -> Option<ClipPlane> {
        self.clip_plane
    }

    /// The bounding geometry currently rasterized.
    pub fn clipped_geometry(&self) -> &ClippedCube {
        self.boundary.geometry()
    }

    // ========== Uniforms ==========

    /// Sets `name` on every program that declares it.
    ///
    /// Slice programs receive `u_gain` multiplied by the configured slice gain
    /// scale. The unscaled value is recorded in the recent-uniform cache.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> RenderResult<()> {
        let value = value.into();

        let mut declared = false;
        for program in self.slicers.iter().chain(&self.ray_casters) {
            if let Some(field) = program.uniforms().layout().field(name) {
                if field.decl.ty != value.ty() {
                    return Err(VolspyError::UniformTypeMismatch {
                        name: name.to_string(),
                        expected: field.decl.ty,
                        actual: value.ty(),
                    }
                    .into());
                }
                declared = true;
            }
        }
        if !declared {
            return Err(VolspyError::UnknownUniform(name.to_string()).into());
        }

        let slice_value = if name == GAIN_UNIFORM {
            value.scaled(self.options.slice_gain_scale)
        } else {
            value
        };
        for program in &mut self.slicers {
            if program.declares(name) {
                program.set_uniform(name, slice_value)?;
            }
        }
        for program in &mut self.ray_casters {
            if program.declares(name) {
                program.set_uniform(name, value)?;
            }
        }

        self.recent.insert(name, value);
        Ok(())
    }

    /// Current value of `name` in the active ray-cast program.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.ray_casters[self.modes.current()].uniform(name)
    }

    /// Current value of `name` in the active slice program.
    pub fn slice_uniform(&self, name: &str) -> Option<UniformValue> {
        self.slicers[self.modes.current()].uniform(name)
    }

    pub fn recent_uniforms(&self) -> &RecentUniforms {
        &self.recent
    }

    /// Recently set uniforms that have not expired, soonest to expire first.
    pub fn items_aged(&mut self) -> Vec<AgedUniform> {
        self.recent.items_aged()
    }

    /// Writes `u_picked` into every program.
    fn set_picked(&mut self, value: UniformValue) -> RenderResult<()> {
        for program in self.slicers.iter_mut().chain(self.ray_casters.iter_mut()) {
            program.set_uniform(PICKED_UNIFORM, value)?;
        }
        Ok(())
    }

    // ========== Drawing ==========

    /// Ray-casts the volume into `viewport` of `target`.
    ///
    /// With `pick` (target pixel, top-left origin) the active program is first
    /// evaluated at that pixel; the readback is fed back as `u_picked`, handed
    /// to `on_pick`, and returned.
    pub fn draw_volume(
        &mut self,
        target: &wgpu::Texture,
        viewport: Viewport,
        color_mask: wgpu::ColorWrites,
        pick: Option<(u32, u32)>,
        on_pick: Option<PickCallback<'_>>,
    ) -> RenderResult<Option<PickReadback>> {
        self.draw(ProgramKind::RayCast, target, viewport, color_mask, pick, on_pick)
    }

    /// Renders the cross-section on the clip plane; same protocol as [`Self::draw_volume`].
    pub fn draw_slice(
        &mut self,
        target: &wgpu::Texture,
        viewport: Viewport,
        color_mask: wgpu::ColorWrites,
        pick: Option<(u32, u32)>,
        on_pick: Option<PickCallback<'_>>,
    ) -> RenderResult<Option<PickReadback>> {
        self.draw(ProgramKind::Slice, target, viewport, color_mask, pick, on_pick)
    }

    fn draw(
        &mut self,
        kind: ProgramKind,
        target: &wgpu::Texture,
        viewport: Viewport,
        color_mask: wgpu::ColorWrites,
        pick: Option<(u32, u32)>,
        on_pick: Option<PickCallback<'_>>,
    ) -> RenderResult<Option<PickReadback>> {
        check_viewport(&viewport, target.width(), target.height())?;
        let pick_window = pick
            .map(|(x, y)| {
                PickWindow::at_pixel(&viewport, x, y).ok_or(RenderError::PickOutOfViewport { x, y })
            })
            .transpose()?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Volume Boundary Encoder"),
            });

        match kind {
            ProgramKind::RayCast => {
                self.boundary.encode(
                    &mut encoder,
                    &self.targets.entry.view,
                    RayBound::Entry,
                    BoundaryFaces::Solid,
                );
                self.boundary.encode(
                    &mut encoder,
                    &self.targets.exit.view,
                    RayBound::Exit,
                    BoundaryFaces::Solid,
                );
            }
            ProgramKind::Slice => {
                self.boundary.encode(
                    &mut encoder,
                    &self.targets.entry.view,
                    RayBound::Entry,
                    BoundaryFaces::Cap,
                );
            }
        }

        let readback = match pick_window {
            Some(window) => {
                self.set_picked(UniformValue::PICK_SENTINEL)?;
                self.pick_window.set(&self.queue, window);

                let index = self.modes.pick_index();
                let programs = match kind {
                    ProgramKind::Slice => &mut self.slicers,
                    ProgramKind::RayCast => &mut self.ray_casters,
                };
                programs[index].draw(
                    &self.device,
                    &self.queue,
                    &mut encoder,
                    &self.targets.pick.view,
                    PICK_FORMAT,
                    color_mask,
                    None,
                    self.pick_window.bind_group(),
                    TargetLoad::Clear,
                );
                self.targets.copy_pick_texel(&mut encoder);
                self.queue.submit(std::iter::once(encoder.finish()));

                let readback = self.targets.read_pick_texel(&self.device)?;
                self.set_picked(readback.normalized().into())?;
                log::debug!("picked {:?} at {:?}", readback.rgba(), pick);

                if let Some(on_pick) = on_pick {
                    on_pick(readback);
                }

                encoder = self
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("Volume Final Encoder"),
                    });
                Some(readback)
            }
            None => {
                self.set_picked(UniformValue::PICK_SENTINEL)?;
                None
            }
        };

        let load = if color_mask == wgpu::ColorWrites::ALL {
            TargetLoad::Clear
        } else {
            TargetLoad::Keep
        };
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let current = self.modes.current();
        let programs = match kind {
            ProgramKind::Slice => &mut self.slicers,
            ProgramKind::RayCast => &mut self.ray_casters,
        };
        programs[current].draw(
            &self.device,
            &self.queue,
            &mut encoder,
            &target_view,
            target.format(),
            color_mask,
            Some(viewport),
            self.full_window.bind_group(),
            load,
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        Ok(readback)
    }
}

fn check_viewport(viewport: &Viewport, width: u32, height: u32) -> RenderResult<()> {
    let fits = |start: u32, len: u32, limit: u32| start.checked_add(len).is_some_and(|end| end <= limit);
    if viewport.is_empty()
        || !fits(viewport.x, viewport.width, width)
        || !fits(viewport.y, viewport.height, height)
    {
        return Err(RenderError::InvalidViewport {
            viewport: *viewport,
            width,
            height,
        });
    }
    Ok(())
}
