use globe3d::prelude::*;

async fn run() -> globe3d::error::Result<()> {
    let options = scene_options();
    let earth = &options.earth;

    let mut window =
        Window::new_with_setup("globe3d: earth", 800, 600, options.canvas).await?;
    window.set_background_color(color::BLACK);
    window.set_tone_mapping(earth.tone_mapping);
    window.set_output_color_space(earth.output_color_space);

    let mut app = App::new(window, earth.camera.build(), options.asset_root.as_ref());

    // Every image is requested up front. Until one arrives, the layer
    // sampling it draws nothing.
    let loader = app.render_loop.loader();
    for file in [
        &earth.day_map,
        &earth.specular_map,
        &earth.bump_map,
        &earth.night_map,
        &earth.cloud_map,
        &earth.cloud_alpha_map,
    ] {
        loader.load_texture(file, file, TextureColorSpace::Linear);
    }

    let mut globe = app.scene.add_group();
    let _ = globe.set_rotation(Quat::from_rotation_z(earth.axial_tilt_degrees.to_radians()));

    let sphere = Rc::new(RefCell::new(GpuMesh3d::from_render_mesh(
        procedural::icosphere(1.0, earth.detail),
    )));

    let surface = globe.add_shared_mesh(
        sphere.clone(),
        SurfaceParams::phong(color::WHITE)
            .with_map(&earth.day_map)
            .with_specular_map(&earth.specular_map)
            .with_bump_map(&earth.bump_map, earth.bump_scale),
    );
    let night = globe.add_shared_mesh(
        sphere.clone(),
        SurfaceParams::basic(color::WHITE)
            .with_map(&earth.night_map)
            .with_blending(Blending::Additive),
    );
    let mut clouds = globe.add_shared_mesh(
        sphere.clone(),
        SurfaceParams::standard(color::WHITE)
            .with_map(&earth.cloud_map)
            .with_alpha_map(&earth.cloud_alpha_map)
            .with_opacity(earth.cloud_opacity)
            .with_transparent(true)
            .with_blending(Blending::Additive),
    );
    let _ = clouds.set_local_scale(earth.cloud_scale, earth.cloud_scale, earth.cloud_scale);

    let mut glow = globe.add_shared_mesh(sphere, earth.glow());
    let s = earth.glow_shell_scale;
    let _ = glow.set_local_scale(s, s, s);

    let stars = app.scene.add_mesh(
        procedural::starfield(earth.star_count, earth.star_seed),
        PointsParams::new(earth.star_size),
    );

    let _ = app
        .scene
        .add_light(Light::directional().with_intensity(earth.sun_intensity))
        .set_position(Vec3::from(earth.sun_position));

    let root = app.scene.clone();
    let text = earth.text.clone();
    let geometry = earth.text_geometry.clone();
    let text_color = earth.text_color();
    let text_position = Vec3::from(earth.text_position);
    app.render_loop.loader().load_bytes(&earth.font, move |bytes| {
        let font = Font::from_bytes(bytes)?;
        let mesh = extrude_text(&font, &text, &geometry)?;
        let mut child = SceneNode3d::new_mesh(mesh, SurfaceParams::standard(text_color));
        let _ = child.set_position(text_position);
        Ok(Some(PendingChange::Insert {
            parent: root,
            child,
        }))
    });

    app.render_loop.spin_y(&surface, earth.earth_spin);
    app.render_loop.spin_y(&night, earth.earth_spin);
    app.render_loop.spin_y(&clouds, earth.cloud_spin);
    app.render_loop.spin_y(&glow, earth.earth_spin);
    app.render_loop.spin_y(&stars, earth.star_spin);

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
