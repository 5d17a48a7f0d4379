//! Data structure of a renderable object.

use crate::builtin::MaterialParams;
use crate::camera::Camera3d;
use crate::light::LightCollection;
use crate::procedural::RenderMesh;
use crate::resource::{GpuData, GpuMesh3d, MaterialManager3d, RenderContext, SharedMaterial};
use glamx::{Pose3, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

/// Rendering properties of a scene object.
///
/// The parameters select the material drawing the object and carry
/// everything that material needs besides the geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectData3d {
    params: MaterialParams,
}

impl ObjectData3d {
    pub fn new(params: MaterialParams) -> Self {
        ObjectData3d { params }
    }

    #[inline]
    pub fn params(&self) -> &MaterialParams {
        &self.params
    }

    #[inline]
    pub fn params_mut(&mut self) -> &mut MaterialParams {
        &mut self.params
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.params.is_transparent()
    }
}

/// A renderable 3D object: a mesh and the parameters it is drawn with.
///
/// No GPU resource exists until the object is first prepared for drawing, so
/// objects can be built before a window is opened.
pub struct Object3d {
    data: ObjectData3d,
    mesh: Rc<RefCell<GpuMesh3d>>,
    material: Option<SharedMaterial>,
    gpu_data: Option<Box<dyn GpuData>>,
}

impl Object3d {
    pub fn new(mesh: Rc<RefCell<GpuMesh3d>>, params: MaterialParams) -> Object3d {
        Object3d {
            data: ObjectData3d::new(params),
            mesh,
            material: None,
            gpu_data: None,
        }
    }

    /// Wraps a CPU-side mesh.
    pub fn from_render_mesh(mesh: RenderMesh, params: MaterialParams) -> Object3d {
        Self::new(
            Rc::new(RefCell::new(GpuMesh3d::from_render_mesh(mesh))),
            params,
        )
    }

    #[doc(hidden)]
    pub fn prepare(
        &mut self,
        transform: &Pose3,
        scale: Vec3,
        camera: &dyn Camera3d,
        lights: &LightCollection,
        context: &RenderContext,
    ) {
        let material = MaterialManager3d::get_global_manager(|mm| {
            mm.get_or_default(self.data.params.material_name())
        });

        // Per-object data belongs to one material: recreate it on a switch.
        let switched = !self
            .material
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, &material));
        if switched || self.gpu_data.is_none() {
            self.gpu_data = Some(material.borrow().create_gpu_data());
            self.material = Some(material.clone());
        }

        if let Some(gpu_data) = self.gpu_data.as_mut() {
            material.borrow_mut().prepare(
                transform,
                scale,
                camera,
                lights,
                &self.data,
                &mut self.mesh.borrow_mut(),
                &mut **gpu_data,
                context,
            );
        }
    }

    #[doc(hidden)]
    pub fn render(&mut self, pass: &mut wgpu::RenderPass<'_>, context: &RenderContext) {
        let (Some(material), Some(gpu_data)) = (&self.material, self.gpu_data.as_mut()) else {
            return;
        };

        material.borrow_mut().render(
            &self.data,
            &self.mesh.borrow(),
            &mut **gpu_data,
            pass,
            context,
        );
    }

    /// Gets the data of this object.
    #[inline]
    pub fn data(&self) -> &ObjectData3d {
        &self.data
    }

    /// Gets the data of this object.
    #[inline]
    pub fn data_mut(&mut self) -> &mut ObjectData3d {
        &mut self.data
    }

    /// The mesh of this object, possibly shared with other objects.
    #[inline]
    pub fn mesh(&self) -> &Rc<RefCell<GpuMesh3d>> {
        &self.mesh
    }

    /// Whether the object was prepared at least once.
    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.gpu_data.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{FresnelParams, SurfaceParams};
    use crate::color;
    use crate::procedural;

    #[test]
    fn objects_are_built_without_a_gpu() {
        let object = Object3d::from_render_mesh(
            procedural::icosphere(1.0, 1),
            SurfaceParams::basic(color::WHITE).into(),
        );
        assert!(!object.is_prepared());
        assert_eq!(object.mesh().borrow().num_triangles(), 80);
    }

    #[test]
    fn transparency_follows_the_params() {
        let mut data = ObjectData3d::default();
        assert!(!data.is_transparent());

        *data.params_mut() = FresnelParams::default().into();
        assert!(data.is_transparent());
    }
}
