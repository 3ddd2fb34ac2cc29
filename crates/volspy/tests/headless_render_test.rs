//! Headless rendering integration tests.
//!
//! These tests render a synthetic volume without a window. They require a GPU
//! adapter (real or software fallback); without one they print a notice and
//! return early.

use volspy::*;

const SIZE: u32 = 64;
const CENTRE: (u32, u32) = (SIZE / 2, SIZE / 2);

fn context() -> Option<(wgpu::Device, wgpu::Queue)> {
    init();
    match headless_context() {
        Ok(context) => Some(context),
        Err(e) => {
            eprintln!("Skipping headless test: no GPU adapter available ({e})");
            None
        }
    }
}

fn test_options() -> RendererOptions {
    RendererOptions {
        max_texture_size: 64,
        fbo_size: (SIZE, SIZE),
        ..RendererOptions::default()
    }
}

/// A uniform single-channel volume at half intensity.
fn half_volume(device: &wgpu::Device, queue: &wgpu::Queue) -> VolumeTexture {
    let dims = [16, 16, 16];
    let data = VolumeData::from_u8(dims, 1, vec![128; 16 * 16 * 16]).unwrap();
    VolumeTexture::new(device, queue, &data).unwrap()
}

/// Renderer looking down -Z at the cube from three units away.
fn renderer(device: &wgpu::Device, queue: &wgpu::Queue) -> VolumeRenderer {
    let volume = half_volume(device, queue);
    let mut renderer = VolumeRenderer::new(device, queue, &volume, test_options()).unwrap();
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y);
    renderer.set_vol_view(view, view.inverse());
    renderer.set_vol_projection(Mat4::perspective_rh(0.8, 1.0, 0.1, 10.0));
    renderer
}

fn pixel(pixels: &[u8], x: u32, y: u32) -> [u8; 4] {
    pixel_in(pixels, SIZE, x, y)
}

fn pixel_in(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

fn is_black(px: [u8; 4]) -> bool {
    px[..3].iter().all(|&c| c == 0)
}

#[test]
fn headless_raycast_every_mode() {
    let Some((device, queue)) = context() else {
        return;
    };
    let mut renderer = renderer(&device, &queue);

    for mode in 0..renderer.color_modes().len() {
        assert_eq!(renderer.set_color_mode(Some(mode), false), mode);
        let pixels = render_volume_to_image(&mut renderer, ProgramKind::RayCast, SIZE, SIZE).unwrap();
        assert_eq!(pixels.len(), (SIZE * SIZE * 4) as usize);

        let centre = pixel(&pixels, CENTRE.0, CENTRE.1);
        assert!(!is_black(centre), "mode {mode}: centre pixel shows no volume");
        assert_eq!(centre[3], 255);

        // the cube covers well under half of the frame
        assert!(is_black(pixel(&pixels, 0, 0)), "mode {mode}: corner not background");
        assert!(is_black(pixel(&pixels, SIZE - 1, SIZE - 1)));
    }
}

#[test]
fn headless_max_intensity_matches_sample() {
    let Some((device, queue)) = context() else {
        return;
    };
    let mut renderer = renderer(&device, &queue);
    renderer.set_color_mode(Some(2), false);

    let pixels = render_volume_to_image(&mut renderer, ProgramKind::RayCast, SIZE, SIZE).unwrap();
    let centre = pixel(&pixels, CENTRE.0, CENTRE.1);
    for c in &centre[..3] {
        assert!((i32::from(*c) - 128).abs() <= 3, "unexpected MIP value {centre:?}");
    }
}

#[test]
fn headless_pick_feeds_back_u_picked() {
    let Some((device, queue)) = context() else {
        return;
    };
    let mut renderer = renderer(&device, &queue);
    let target = create_frame_texture(&device, SIZE, SIZE);
    let viewport = Viewport::full(SIZE, SIZE);

    let mut seen = Vec::new();
    let mut on_pick = |readback: PickReadback| seen.push(readback);
    let readback = renderer
        .draw_volume(
            &target,
            viewport,
            wgpu::ColorWrites::ALL,
            Some(CENTRE),
            Some(&mut on_pick),
        )
        .unwrap()
        .expect("pick requested");

    assert_eq!(seen, vec![readback]);
    assert!(!readback.is_background());
    assert_eq!(
        renderer.uniform(PICKED_UNIFORM),
        Some(UniformValue::from(readback.normalized()))
    );

    // the pick texel evaluates the same fragment as the final pass
    let frame = read_frame(&device, &queue, &target).unwrap();
    let centre = pixel(&frame, CENTRE.0, CENTRE.1);
    for (a, b) in centre.iter().zip(readback.rgba()) {
        assert!((i32::from(*a) - i32::from(b)).abs() <= 2, "{centre:?} vs {readback:?}");
    }

    // a draw without a pick resets the sentinel
    let none = renderer
        .draw_volume(&target, viewport, wgpu::ColorWrites::ALL, None, None)
        .unwrap();
    assert!(none.is_none());
    assert_eq!(renderer.uniform(PICKED_UNIFORM), Some(UniformValue::PICK_SENTINEL));
}

#[test]
fn headless_pick_rejects_outside_viewport() {
    let Some((device, queue)) = context() else {
        return;
    };
    let mut renderer = renderer(&device, &queue);
    let target = create_frame_texture(&device, SIZE, SIZE);

    let result = renderer.draw_volume(
        &target,
        Viewport::new(0, 0, SIZE / 2, SIZE / 2),
        wgpu::ColorWrites::ALL,
        Some((SIZE - 1, 0)),
        None,
    );
    assert!(matches!(result, Err(RenderError::PickOutOfViewport { .. })));

    let oversized = renderer.draw_volume(
        &target,
        Viewport::new(8, 0, SIZE, SIZE),
        wgpu::ColorWrites::ALL,
        None,
        None,
    );
    assert!(matches!(oversized, Err(RenderError::InvalidViewport { .. })));
}

#[test]
fn headless_slice_on_clip_plane() {
    let Some((device, queue)) = context() else {
        return;
    };
    let mut renderer = renderer(&device, &queue);

    // without a clip plane there is no cap to slice
    let pixels = render_volume_to_image(&mut renderer, ProgramKind::Slice, SIZE, SIZE).unwrap();
    assert!(pixels.chunks_exact(4).all(|px| px[..3].iter().all(|&c| c == 0)));

    // remove the half nearer the camera; the cap through the centre faces the viewer
    renderer.set_clip_plane(Some([0.0, 0.0, -1.0, -3.0])).unwrap();
    assert!(renderer.clipped_geometry().cap_triangle_count() > 0);

    let pixels = render_volume_to_image(&mut renderer, ProgramKind::Slice, SIZE, SIZE).unwrap();
    let centre = pixel(&pixels, CENTRE.0, CENTRE.1);
    // slice gain is four times the ray-cast gain, saturating the half-intensity sample
    assert!(centre[0] > 200, "slice centre {centre:?}");
    assert_eq!(centre[0], centre[1]);
    assert!(is_black(pixel(&pixels, 0, 0)));

    // the clipped volume still ray-casts
    let pixels = render_volume_to_image(&mut renderer, ProgramKind::RayCast, SIZE, SIZE).unwrap();
    assert!(!is_black(pixel(&pixels, CENTRE.0, CENTRE.1)));

    renderer.set_clip_plane(None).unwrap();
    assert!(renderer.clip_plane().is_none());
    assert_eq!(renderer.clipped_geometry().cap_triangle_count(), 0);
}

#[test]
fn headless_clip_plane_needs_view() {
    let Some((device, queue)) = context() else {
        return;
    };
    let volume = half_volume(&device, &queue);
    let mut renderer = VolumeRenderer::new(&device, &queue, &volume, test_options()).unwrap();

    let result = renderer.set_clip_plane(Some([0.0, 0.0, 1.0, 0.0]));
    assert!(matches!(
        result,
        Err(RenderError::Core(VolspyError::MissingViewMatrix))
    ));
    assert!(renderer.clip_plane().is_none());
}

#[test]
fn headless_uniform_fan_out() {
    let Some((device, queue)) = context() else {
        return;
    };
    let mut renderer = renderer(&device, &queue);

    renderer.set_uniform(GAIN_UNIFORM, 2.0f32).unwrap();
    assert_eq!(renderer.uniform(GAIN_UNIFORM), Some(UniformValue::Float(2.0)));
    assert_eq!(renderer.slice_uniform(GAIN_UNIFORM), Some(UniformValue::Float(8.0)));

    // every mode received the value
    renderer.set_color_mode(None, false);
    assert_eq!(renderer.uniform(GAIN_UNIFORM), Some(UniformValue::Float(2.0)));

    let aged = renderer.items_aged();
    assert_eq!(aged.len(), 1);
    assert_eq!(aged[0].name, GAIN_UNIFORM);
    assert_eq!(aged[0].value, UniformValue::Float(2.0));

    let mismatch = renderer.set_uniform(GAIN_UNIFORM, 2i32);
    assert!(matches!(
        mismatch,
        Err(RenderError::Core(VolspyError::UniformTypeMismatch { .. }))
    ));
    let unknown = renderer.set_uniform("u_missing", 1.0f32);
    assert!(matches!(
        unknown,
        Err(RenderError::Core(VolspyError::UnknownUniform(_)))
    ));
    assert_eq!(renderer.uniform(GAIN_UNIFORM), Some(UniformValue::Float(2.0)));
}

#[test]
fn headless_frame_size_validation() {
    let Some((device, queue)) = context() else {
        return;
    };
    let mut renderer = renderer(&device, &queue);
    assert!(matches!(
        render_volume_to_image(&mut renderer, ProgramKind::RayCast, 0, SIZE),
        Err(FrameError::InvalidSize { .. })
    ));
}

#[test]
fn headless_render_to_file() {
    let Some((device, queue)) = context() else {
        return;
    };
    let mut renderer = renderer(&device, &queue);
    let path = std::env::temp_dir().join("volspy_headless_test.png");

    render_volume_to_file(&mut renderer, ProgramKind::RayCast, &path, SIZE, SIZE).unwrap();
    assert!(path.exists());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn headless_partial_color_mask_keeps_other_channels() {
    let Some((device, queue)) = context() else {
        return;
    };
    let mut renderer = renderer(&device, &queue);
    let target = create_frame_texture(&device, SIZE, SIZE);
    let viewport = Viewport::full(SIZE, SIZE);
    assert_eq!(renderer.pipeline_count(), 0);

    renderer
        .draw_volume(&target, viewport, wgpu::ColorWrites::ALL, None, None)
        .unwrap();
    let full = pixel(&read_frame(&device, &queue, &target).unwrap(), CENTRE.0, CENTRE.1);
    assert!(full[..3].iter().all(|&c| c > 0), "full frame {full:?}");
    assert_eq!(renderer.pipeline_count(), 1);

    // a zero-gain pass limited to red must not clear green and blue
    renderer.set_uniform(GAIN_UNIFORM, 0.0f32).unwrap();
    renderer
        .draw_volume(&target, viewport, wgpu::ColorWrites::RED, None, None)
        .unwrap();
    let masked = pixel(&read_frame(&device, &queue, &target).unwrap(), CENTRE.0, CENTRE.1);
    assert_eq!(masked, [0, full[1], full[2], full[3]]);
    assert_eq!(renderer.pipeline_count(), 2);

    // same format and mask reuse the cached pipeline
    renderer
        .draw_volume(&target, viewport, wgpu::ColorWrites::RED, None, None)
        .unwrap();
    assert_eq!(renderer.pipeline_count(), 2);
}

#[test]
fn headless_pick_in_offset_viewport() {
    let Some((device, queue)) = context() else {
        return;
    };
    let mut renderer = renderer(&device, &queue);
    renderer.set_clip_plane(Some([0.0, 0.0, -1.0, -3.0])).unwrap();

    let width = 2 * SIZE;
    let target = create_frame_texture(&device, width, width);
    let viewport = Viewport::new(40, 24, SIZE, SIZE);
    let pick = (viewport.x + SIZE / 2, viewport.y + SIZE / 2);

    for kind in [ProgramKind::Slice, ProgramKind::RayCast] {
        let readback = match kind {
            ProgramKind::Slice => {
                renderer.draw_slice(&target, viewport, wgpu::ColorWrites::ALL, Some(pick), None)
            }
            ProgramKind::RayCast => {
                renderer.draw_volume(&target, viewport, wgpu::ColorWrites::ALL, Some(pick), None)
            }
        }
        .unwrap()
        .expect("pick requested");

        let frame = read_frame(&device, &queue, &target).unwrap();
        let at_pick = pixel_in(&frame, width, pick.0, pick.1);
        assert!(!readback.is_background(), "{kind:?} picked background");
        for (a, b) in at_pick.iter().zip(readback.rgba()) {
            assert!(
                (i32::from(*a) - i32::from(b)).abs() <= 1,
                "{kind:?}: frame {at_pick:?} vs pick {readback:?}"
            );
        }
        // outside the viewport the cleared target stays black
        assert!(is_black(pixel_in(&frame, width, 0, 0)));
        assert!(is_black(pixel_in(&frame, width, width - 1, width - 1)));
    }
}

#[test]
fn headless_identity_view_keeps_negative_model_z() {
    let Some((device, queue)) = context() else {
        return;
    };
    let volume = half_volume(&device, &queue);
    let mut renderer = VolumeRenderer::new(&device, &queue, &volume, test_options()).unwrap();
    renderer.set_vol_view(Mat4::IDENTITY, Mat4::IDENTITY);

    // the axis correction turns view +Z into model -Z
    renderer.set_clip_plane(Some([0.0, 0.0, 1.0, 0.0])).unwrap();
    let cube = renderer.clipped_geometry();
    assert!(cube.cap_triangle_count() > 0);
    assert!(cube.vertices.iter().all(|v| v.position().z <= 1e-6));
    assert!(cube.vertices.iter().any(|v| (v.position().z + 0.5).abs() < 1e-6));
    for &i in &cube.cap_indices {
        assert!(cube.vertices[i as usize].position().z.abs() < 1e-6);
    }
}
