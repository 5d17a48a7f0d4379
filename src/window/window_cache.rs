use std::cell::RefCell;

use crate::resource::{MaterialManager3d, TextureManager};

/// Globally accessible cache of objects.
///
/// Textures can be registered before a window exists, materials need the GPU
/// context and only exist while a window is open.
#[derive(Default)]
pub(crate) struct WindowCache {
    pub(crate) texture_manager: TextureManager,
    pub(crate) material_manager: Option<MaterialManager3d>,
}

thread_local!(pub(crate) static WINDOW_CACHE: RefCell<WindowCache> = RefCell::new(WindowCache::default()));

impl WindowCache {
    /// Creates the built-in materials. Requires the GPU context.
    pub fn populate() {
        WINDOW_CACHE.with(|cache| {
            cache.borrow_mut().material_manager = Some(MaterialManager3d::new());
        });
    }

    /// Releases every GPU resource held by the cache.
    ///
    /// This should be called before thread-local storage destruction begins
    /// to avoid TLS access order issues with wgpu internals.
    pub fn reset() {
        WINDOW_CACHE.with(|cache| {
            let mut cache = cache.borrow_mut();
            cache.material_manager = None;
            cache.texture_manager = TextureManager::new();
        });
    }
}
