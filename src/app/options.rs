//! Tunable parameters of the two demo scenes.
//!
//! Every default reproduces the reference scenes. With the `serde` feature,
//! options can be read from a TOML file where any field may be omitted.

use crate::builtin::FresnelParams;
use crate::camera::{OrbitCamera3d, OrbitControls};
use crate::color::{self, Color};
use crate::resource::{OutputColorSpace, ToneMapping};
use crate::text::TextGeometry;
use crate::window::CanvasSetup;
use glamx::Vec3;

/// A perspective camera on the +Z axis, orbiting the origin.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CameraOptions {
    /// Vertical field of view, in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Initial distance to the origin.
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Damping factor of the orbit controls; 0 disables inertia.
    pub damping: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        CameraOptions {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            distance: 5.0,
            min_distance: 1.4,
            max_distance: 5.0,
            damping: 0.05,
        }
    }
}

impl CameraOptions {
    pub fn controls(&self) -> OrbitControls {
        let controls = OrbitControls::with_distance_bounds(self.min_distance, self.max_distance);
        if self.damping > 0.0 {
            controls.with_damping(self.damping)
        } else {
            controls
        }
    }

    pub fn build(&self) -> OrbitCamera3d {
        OrbitCamera3d::new_with_frustum(
            self.fov_degrees.to_radians(),
            self.near,
            self.far,
            Vec3::new(0.0, 0.0, self.distance),
            Vec3::ZERO,
        )
        .with_controls(self.controls())
    }
}

/// The textured Earth scene.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EarthOptions {
    /// Subdivision level of the globe icosphere.
    pub detail: u32,
    /// Rotation of the whole globe around Z, in degrees.
    pub axial_tilt_degrees: f32,
    pub day_map: String,
    pub specular_map: String,
    pub bump_map: String,
    pub bump_scale: f32,
    pub night_map: String,
    pub cloud_map: String,
    pub cloud_alpha_map: String,
    pub cloud_opacity: f32,
    pub cloud_scale: f32,
    /// Rim color of the atmosphere, as `0xRRGGBB`.
    pub glow_color: u32,
    pub glow_bias: f32,
    pub glow_scale: f32,
    pub glow_power: f32,
    pub glow_shell_scale: f32,
    pub star_count: usize,
    pub star_size: f32,
    pub star_seed: u64,
    pub sun_position: [f32; 3],
    pub sun_intensity: f32,
    pub text: String,
    pub font: String,
    /// Text color, as `0xRRGGBB`.
    pub text_color: u32,
    pub text_position: [f32; 3],
    pub text_geometry: TextGeometry,
    /// Per-tick rotation of the globe, night lights and glow.
    pub earth_spin: f32,
    pub cloud_spin: f32,
    pub star_spin: f32,
    pub tone_mapping: ToneMapping,
    pub output_color_space: OutputColorSpace,
    pub camera: CameraOptions,
}

impl Default for EarthOptions {
    fn default() -> Self {
        EarthOptions {
            detail: 12,
            axial_tilt_degrees: -23.4,
            day_map: "earth.jpg".to_string(),
            specular_map: "earthspec1k.jpg".to_string(),
            bump_map: "earthbump1k.jpg".to_string(),
            bump_scale: 0.04,
            night_map: "earth-at-night.jpg".to_string(),
            cloud_map: "earthcloudmap.jpg".to_string(),
            cloud_alpha_map: "earthcloudmaptrans.jpg".to_string(),
            cloud_opacity: 0.8,
            cloud_scale: 1.003,
            glow_color: 0x0088ff,
            glow_bias: 0.1,
            glow_scale: 1.0,
            glow_power: 4.0,
            glow_shell_scale: 1.01,
            star_count: 2000,
            star_size: 0.2,
            star_seed: 0x5eed,
            sun_position: [-2.0, 0.5, 1.5],
            sun_intensity: 2.0,
            text: "hello world!".to_string(),
            font: "DejaVuSans.ttf".to_string(),
            text_color: 0xfff44f,
            text_position: [-1.75, 1.5, 0.0],
            text_geometry: TextGeometry::default(),
            earth_spin: 0.002,
            cloud_spin: 0.0023,
            star_spin: -0.0002,
            tone_mapping: ToneMapping::AcesFilmic,
            output_color_space: OutputColorSpace::Linear,
            camera: CameraOptions::default(),
        }
    }
}

impl EarthOptions {
    /// Parameters of the atmosphere glow shell.
    pub fn glow(&self) -> FresnelParams {
        FresnelParams::new(color::from_hex(self.glow_color), color::BLACK)
            .with_bias(self.glow_bias)
            .with_scale(self.glow_scale)
            .with_power(self.glow_power)
    }

    pub fn text_color(&self) -> Color {
        color::from_hex(self.text_color)
    }
}

/// The spinning icosahedron scene.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IcosahedronOptions {
    pub detail: u32,
    pub wireframe_scale: f32,
    /// Hemisphere light colors, as `0xRRGGBB`.
    pub sky_color: u32,
    pub ground_color: u32,
    pub light_intensity: f32,
    pub spin: f32,
    pub tone_mapping: ToneMapping,
    pub output_color_space: OutputColorSpace,
    pub camera: CameraOptions,
}

impl Default for IcosahedronOptions {
    fn default() -> Self {
        IcosahedronOptions {
            detail: 5,
            wireframe_scale: 1.05,
            sky_color: 0x0099ff,
            ground_color: 0xaa5500,
            light_intensity: 1.0,
            spin: 0.001,
            tone_mapping: ToneMapping::None,
            output_color_space: OutputColorSpace::Srgb,
            camera: CameraOptions {
                far: 10.0,
                distance: 2.0,
                min_distance: 1.2,
                ..CameraOptions::default()
            },
        }
    }
}

/// Options of both demos and of the window they open.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SceneOptions {
    /// Directory (or base URL on the web) assets are loaded from.
    pub asset_root: AssetRoot,
    pub canvas: CanvasSetup,
    pub earth: EarthOptions,
    pub icosahedron: IcosahedronOptions,
}

/// Where assets are loaded from. Defaults to `assets`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AssetRoot(pub String);

impl Default for AssetRoot {
    fn default() -> Self {
        AssetRoot("assets".to_string())
    }
}

impl AsRef<std::path::Path> for AssetRoot {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

#[cfg(feature = "serde")]
impl SceneOptions {
    /// Parses options from TOML. Missing fields keep their default.
    pub fn from_toml_str(source: &str) -> crate::error::Result<SceneOptions> {
        toml::from_str(source).map_err(|e| crate::error::Error::OptionsParse(e.to_string()))
    }

    /// Reads options from a TOML file.
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::error::Result<SceneOptions> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| crate::error::Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let options = Self::from_toml_str(&source)?;
        log::info!("loaded scene options from {}", path.display());
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera3d;

    #[test]
    fn earth_defaults_match_the_reference_scene() {
        let earth = EarthOptions::default();
        assert_eq!(earth.detail, 12);
        assert_eq!(earth.axial_tilt_degrees, -23.4);
        assert_eq!(earth.bump_scale, 0.04);
        assert_eq!(earth.cloud_opacity, 0.8);
        assert_eq!(earth.cloud_scale, 1.003);
        assert_eq!(earth.glow_shell_scale, 1.01);
        assert_eq!(earth.glow(), FresnelParams::default());
        assert_eq!(earth.star_count, 2000);
        assert_eq!(earth.sun_position, [-2.0, 0.5, 1.5]);
        assert_eq!(earth.sun_intensity, 2.0);
        assert_eq!(earth.text, "hello world!");
        assert_eq!(earth.text_color(), color::from_hex(0xfff44f));
        assert_eq!((earth.earth_spin, earth.cloud_spin, earth.star_spin), (0.002, 0.0023, -0.0002));
        assert_eq!(earth.tone_mapping, ToneMapping::AcesFilmic);
    }

    #[test]
    fn icosahedron_camera_is_closer() {
        let options = IcosahedronOptions::default();
        assert_eq!(options.detail, 5);
        assert_eq!(options.camera.far, 10.0);
        assert_eq!(options.camera.distance, 2.0);
        assert_eq!(options.camera.min_distance, 1.2);
        assert_eq!(options.camera.max_distance, 5.0);
    }

    #[test]
    fn cameras_start_on_the_z_axis() {
        let camera = IcosahedronOptions::default().camera.build();
        assert!((camera.eye() - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
        assert_eq!(camera.clip_planes(), (0.1, 10.0));
        assert_eq!(camera.controls().damping, Some(0.05));

        let undamped = CameraOptions {
            damping: 0.0,
            ..Default::default()
        };
        assert_eq!(undamped.controls().damping, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_toml_keeps_the_defaults() {
        let options = SceneOptions::from_toml_str(
            r#"
            asset_root = "static"

            [earth]
            star_count = 500
            text = "bonjour"

            [earth.camera]
            max_distance = 8.0
            "#,
        )
        .unwrap();

        assert_eq!(options.asset_root.0, "static");
        assert_eq!(options.earth.star_count, 500);
        assert_eq!(options.earth.text, "bonjour");
        assert_eq!(options.earth.camera.max_distance, 8.0);
        assert_eq!(options.earth.camera.min_distance, 1.4);
        assert_eq!(options.earth.detail, 12);
        assert_eq!(options.icosahedron, IcosahedronOptions::default());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn invalid_toml_is_reported() {
        let err = SceneOptions::from_toml_str("earth = 3").unwrap_err();
        assert!(matches!(err, crate::error::Error::OptionsParse(_)));
    }
}
