use globe3d::prelude::*;

async fn run() -> globe3d::error::Result<()> {
    let options = scene_options();
    let ico = &options.icosahedron;

    let mut window = Window::new_with_setup(
        "globe3d: icosahedron",
        800,
        600,
        options.canvas,
    )
    .await?;
    window.set_tone_mapping(ico.tone_mapping);
    window.set_output_color_space(ico.output_color_space);

    let mut app = App::new(window, ico.camera.build(), options.asset_root.as_ref());

    let sky = Light::hemisphere(color::from_hex(ico.sky_color), color::from_hex(ico.ground_color))
        .with_intensity(ico.light_intensity);
    let _ = app.scene.add_light(sky);

    let geometry = procedural::icosphere(1.0, ico.detail);
    let mut mesh = app.scene.add_mesh(
        geometry.clone(),
        SurfaceParams::standard(color::WHITE).with_flat_shading(true),
    );
    // Child of the solid mesh so both turn together.
    let s = ico.wireframe_scale;
    let _ = mesh
        .add_mesh(geometry, SurfaceParams::basic(color::WHITE).with_wireframe(true))
        .set_local_scale(s, s, s);

    app.render_loop.spin_y(&mesh, ico.spin);
    app.run().await;
    Ok(())
}

fn scene_options() -> SceneOptions {
    #[cfg(all(feature = "serde", not(target_arch = "wasm32")))]
    if let Some(path) = std::env::args().nth(1) {
        match SceneOptions::load(&path) {
            Ok(options) => return options,
            Err(e) => log::warn!("{e}, falling back to the default scene"),
        }
    }

    SceneOptions::default()
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        env_logger::init();
        if let Err(e) = globe3d::pollster::block_on(run()) {
            log::error!("{e}");
            std::process::exit(1);
        }
    }

    #[cfg(target_arch = "wasm32")]
    globe3d::wasm_bindgen_futures::spawn_local(async {
        if let Err(e) = run().await {
            log::error!("{e}");
        }
    });
}
