//! A resource manager for materials.

use crate::builtin::{FresnelMaterial, PointsMaterial, SurfaceMaterial};
use crate::resource::Material3d;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A shared, mutable material.
pub type SharedMaterial = Rc<RefCell<Box<dyn Material3d + 'static>>>;

/// The material manager.
///
/// Upon construction, it contains:
/// * the `surface` material, drawing lit or unlit triangle meshes and wireframes.
/// * the `fresnel` material, drawing view-dependent rim glows.
/// * the `points` material, drawing point clouds as round sprites.
pub struct MaterialManager3d {
    default_material: SharedMaterial,
    materials: HashMap<String, SharedMaterial>,
}

impl MaterialManager3d {
    /// Creates the built-in materials. Requires the GPU context.
    pub fn new() -> MaterialManager3d {
        let mut materials = HashMap::new();

        let surface: SharedMaterial = Rc::new(RefCell::new(Box::new(SurfaceMaterial::new())));
        let _ = materials.insert(SurfaceMaterial::NAME.to_string(), surface.clone());

        let fresnel: SharedMaterial = Rc::new(RefCell::new(Box::new(FresnelMaterial::new())));
        let _ = materials.insert(FresnelMaterial::NAME.to_string(), fresnel);

        let points: SharedMaterial = Rc::new(RefCell::new(Box::new(PointsMaterial::new())));
        let _ = materials.insert(PointsMaterial::NAME.to_string(), points);

        MaterialManager3d {
            default_material: surface,
            materials,
        }
    }

    /// Mutably applies a function to the material manager of this thread.
    ///
    /// # Panics
    /// Panics if no window has been opened.
    pub fn get_global_manager<T, F: FnOnce(&mut MaterialManager3d) -> T>(f: F) -> T {
        crate::window::WINDOW_CACHE.with(|cache| {
            let mut cache = cache.borrow_mut();
            let manager = cache
                .material_manager
                .as_mut()
                .expect("material manager not initialized: open a window first.");
            f(manager)
        })
    }

    /// The material used for objects naming an unknown material.
    pub fn get_default(&self) -> SharedMaterial {
        self.default_material.clone()
    }

    pub fn get(&self, name: &str) -> Option<SharedMaterial> {
        self.materials.get(name).cloned()
    }

    /// The material registered under `name`, or the default one.
    pub fn get_or_default(&self, name: &str) -> SharedMaterial {
        self.get(name).unwrap_or_else(|| {
            log::warn!("unknown material `{name}`, using the default one");
            self.get_default()
        })
    }

    /// Adds a material with the specified name, replacing any previous one.
    pub fn add(&mut self, material: SharedMaterial, name: &str) {
        let _ = self.materials.insert(name.to_string(), material);
    }

    /// Signals the start of a new frame to all materials.
    pub fn begin_frame(&mut self) {
        for material in self.materials.values() {
            material.borrow_mut().begin_frame();
        }
    }

    /// Uploads the uniforms every material recorded this frame.
    pub fn flush(&mut self) {
        for material in self.materials.values() {
            material.borrow_mut().flush();
        }
    }
}
