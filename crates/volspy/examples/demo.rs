//! Renders a synthetic two-channel volume headlessly in every color mode,
//! then a clipped view and its slice, writing PNG files to the working directory.
//!
//! Run with `RUST_LOG=debug cargo run --example demo` to see the pass log.

use volspy::*;

const DIM: u32 = 48;

/// A shell in the red channel and a dense core in the green channel.
fn synthetic_volume() -> Vec<u8> {
    let mut samples = Vec::with_capacity((DIM * DIM * DIM * 2) as usize);
    let c = (DIM as f32 - 1.0) / 2.0;
    for z in 0..DIM {
        for y in 0..DIM {
            for x in 0..DIM {
                let r = Vec3::new(x as f32 - c, y as f32 - c, z as f32 - c).length() / c;
                let shell = (1.0 - (r - 0.8).abs() * 10.0).clamp(0.0, 1.0);
                let core = (1.0 - r * 3.0).clamp(0.0, 1.0);
                samples.push((shell * 255.0) as u8);
                samples.push((core * 255.0) as u8);
            }
        }
    }
    samples
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init();

    let (device, queue) = headless_context()?;
    let data = VolumeData::from_u8([DIM; 3], 2, synthetic_volume())?;
    let volume = VolumeTexture::new(&device, &queue, &data)?;

    let options = RendererOptions {
        fbo_size: (512, 512),
        ..RendererOptions::from_env()
    };
    let mut renderer = VolumeRenderer::new(&device, &queue, &volume, options)?;

    let view = Mat4::look_at_rh(Vec3::new(1.2, 0.9, 1.6), Vec3::ZERO, Vec3::Y);
    renderer.set_vol_view(view, view.inverse());
    renderer.set_vol_projection(Mat4::perspective_rh(0.9, 1.0, 0.1, 10.0));
    renderer.set_uniform("u_gain", 1.5f32)?;

    for mode in 0..renderer.color_modes().len() {
        renderer.set_color_mode(Some(mode), false);
        let filename = format!("volspy_mode_{mode}.png");
        render_volume_to_file(&mut renderer, ProgramKind::RayCast, &filename, 512, 512)?;
        println!("{filename}: {}", renderer.color_mode_description());
    }

    // cut away the half of the volume nearest the camera
    let distance = view.transform_point3(Vec3::ZERO).z;
    renderer.set_clip_plane(Some([0.0, 0.0, -1.0, distance]))?;
    renderer.set_color_mode(Some(0), false);
    render_volume_to_file(&mut renderer, ProgramKind::RayCast, "volspy_clipped.png", 512, 512)?;
    render_volume_to_file(&mut renderer, ProgramKind::Slice, "volspy_slice.png", 512, 512)?;
    println!("volspy_clipped.png, volspy_slice.png: clipped at view depth {distance:.2}");

    Ok(())
}
