use crate::builtin::MaterialParams;
use crate::camera::Camera3d;
use crate::light::{Light, LightCollection};
use crate::procedural::RenderMesh;
use crate::resource::{GpuMesh3d, RenderContext};
use crate::scene::Object3d;
use glamx::{Pose3, Quat, Vec3};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

/// Which objects a render traversal draws.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderPhase {
    /// Objects whose parameters are not transparent.
    Opaque,
    /// Transparent objects, drawn after every opaque one.
    Transparent,
}

/// The data contained by a `SceneNode3d`.
pub struct SceneNodeData3d {
    local_scale: Vec3,
    local_transform: Pose3,
    world_scale: Vec3,
    world_transform: Pose3,
    visible: bool,
    up_to_date: bool,
    children: Vec<SceneNode3d>,
    object: Option<Object3d>,
    light: Option<Light>,
    parent: Option<Weak<RefCell<SceneNodeData3d>>>,
}

/// A node of the scene graph.
///
/// This may represent a group of other nodes, a light, and/or contain an
/// object that can be rendered. Cloning a node clones the handle, not the
/// node.
#[derive(Clone)]
pub struct SceneNode3d {
    data: Rc<RefCell<SceneNodeData3d>>,
}

/// World transform of a child, given the world transform and scale of its parent.
///
/// The parent's scale stretches the child's offset but not its orientation.
fn compose(parent: &Pose3, parent_scale: Vec3, local: &Pose3) -> Pose3 {
    let mut world = Pose3::from(parent.rotation * local.rotation);
    world.translation = parent.translation + parent.rotation * (parent_scale * local.translation);
    world
}

impl SceneNodeData3d {
    fn remove(&mut self, o: &SceneNode3d) {
        if let Some(i) = self
            .children
            .iter()
            .rposition(|e| Rc::ptr_eq(&o.data, &e.data))
        {
            let _ = self.children.remove(i);
        }
    }

    /// Whether this node contains an `Object3d`.
    #[inline]
    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }

    /// Whether this node has no parent.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The children of this node, in insertion order.
    #[inline]
    pub fn children(&self) -> &[SceneNode3d] {
        &self.children
    }

    /// A reference to the object possibly contained by this node.
    #[inline]
    pub fn object(&self) -> Option<&Object3d> {
        self.object.as_ref()
    }

    /// A mutable reference to the object possibly contained by this node.
    #[inline]
    pub fn object_mut(&mut self) -> Option<&mut Object3d> {
        self.object.as_mut()
    }

    /// Prepares uniforms for the scene graph rooted by this node.
    ///
    /// First refreshes the world transforms, then gathers every enabled light,
    /// then prepares each visible object with the complete light collection.
    pub fn prepare(
        &mut self,
        camera: &dyn Camera3d,
        lights: &mut LightCollection,
        context: &RenderContext,
    ) {
        self.do_propagate_transforms(&Pose3::IDENTITY, Vec3::ONE, false);

        if self.visible {
            self.do_collect_lights(lights);
            self.do_prepare_objects(camera, lights, context);
        }
    }

    fn do_propagate_transforms(&mut self, parent: &Pose3, parent_scale: Vec3, force: bool) {
        let force = force || !self.up_to_date;
        if force {
            self.world_transform = compose(parent, parent_scale, &self.local_transform);
            self.world_scale = parent_scale * self.local_scale;
            self.up_to_date = true;
        }

        let (world, scale) = (self.world_transform, self.world_scale);
        for c in self.children.iter_mut() {
            c.data_mut().do_propagate_transforms(&world, scale, force);
        }
    }

    fn do_collect_lights(&mut self, lights: &mut LightCollection) {
        if let Some(light) = &self.light {
            if light.enabled && !lights.add(light.collect(&self.world_transform)) {
                log::warn!("light dropped: more than {} lights in the scene", crate::light::MAX_LIGHTS);
            }
        }

        for c in self.children.iter_mut() {
            let mut bc = c.data_mut();
            if bc.visible {
                bc.do_collect_lights(lights);
            }
        }
    }

    fn do_prepare_objects(
        &mut self,
        camera: &dyn Camera3d,
        lights: &LightCollection,
        context: &RenderContext,
    ) {
        if let Some(o) = &mut self.object {
            o.prepare(&self.world_transform, self.world_scale, camera, lights, context);
        }

        for c in self.children.iter_mut() {
            let mut bc = c.data_mut();
            if bc.visible {
                bc.do_prepare_objects(camera, lights, context);
            }
        }
    }

    /// Draws the objects of the given phase, depth-first in insertion order.
    ///
    /// Transparent objects are not sorted by depth: overlapping translucent
    /// layers blend in the order they were added. Add them inner first, like
    /// concentric shells around a globe.
    pub fn render(
        &mut self,
        phase: RenderPhase,
        pass: &mut wgpu::RenderPass<'_>,
        context: &RenderContext,
    ) {
        if !self.visible {
            return;
        }

        if let Some(o) = &mut self.object {
            let transparent = o.data().is_transparent();
            if transparent == (phase == RenderPhase::Transparent) {
                o.render(pass, context);
            }
        }

        for c in self.children.iter_mut() {
            c.data_mut().render(phase, pass, context);
        }
    }

    fn invalidate(&mut self) {
        self.up_to_date = false;
    }

    fn update(&mut self) {
        let parent = self.parent.as_ref().and_then(Weak::upgrade);
        match parent {
            Some(parent) => {
                let mut parent = parent.borrow_mut();
                parent.update();
                self.world_transform =
                    compose(&parent.world_transform, parent.world_scale, &self.local_transform);
                self.world_scale = parent.world_scale * self.local_scale;
            }
            None => {
                self.world_transform = self.local_transform;
                self.world_scale = self.local_scale;
            }
        }
    }
}

impl Default for SceneNode3d {
    fn default() -> SceneNode3d {
        SceneNode3d::empty()
    }
}

impl SceneNode3d {
    /// Creates a new unrooted scene node.
    pub fn new(local_scale: Vec3, local_transform: Pose3, object: Option<Object3d>) -> SceneNode3d {
        let data = SceneNodeData3d {
            local_scale,
            local_transform,
            world_transform: local_transform,
            world_scale: local_scale,
            visible: true,
            up_to_date: false,
            children: Vec::new(),
            object,
            light: None,
            parent: None,
        };

        SceneNode3d {
            data: Rc::new(RefCell::new(data)),
        }
    }

    /// Creates a new empty scene node with identity transformations.
    pub fn empty() -> SceneNode3d {
        SceneNode3d::new(Vec3::ONE, Pose3::IDENTITY, None)
    }

    /// Creates an unrooted node drawing `mesh` with `params`.
    ///
    /// Used to build nodes away from the graph, e.g. when an asset finishes
    /// loading, before queueing their insertion.
    pub fn new_mesh(mesh: RenderMesh, params: impl Into<MaterialParams>) -> SceneNode3d {
        SceneNode3d::new(
            Vec3::ONE,
            Pose3::IDENTITY,
            Some(Object3d::from_render_mesh(mesh, params.into())),
        )
    }

    /// Creates an unrooted node carrying a light.
    pub fn new_light(light: Light) -> SceneNode3d {
        let node = SceneNode3d::empty();
        node.data.borrow_mut().light = Some(light);
        node
    }

    /// Returns an immutable reference to this node's internal data.
    pub fn data(&self) -> Ref<'_, SceneNodeData3d> {
        self.data.borrow()
    }

    /// Returns a mutable reference to this node's internal data.
    pub fn data_mut(&mut self) -> RefMut<'_, SceneNodeData3d> {
        self.data.borrow_mut()
    }

    /// Whether `self` and `other` are handles to the same node.
    pub fn ptr_eq(&self, other: &SceneNode3d) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Removes this node from its parent in the scene graph.
    pub fn detach(&mut self) {
        let parent = self.data().parent.as_ref().and_then(Weak::upgrade);
        if let Some(parent) = parent {
            parent.borrow_mut().remove(self);
        }
        let mut data = self.data_mut();
        data.parent = None;
        data.invalidate();
    }

    /*
     *
     * Methods to add nodes.
     *
     */
    /// Adds an empty group node as a child of this node.
    pub fn add_group(&mut self) -> SceneNode3d {
        let node = SceneNode3d::empty();
        self.add_child(node.clone());
        node
    }

    /// Adds an existing node as a child of this node.
    ///
    /// # Panics
    /// Panics if the node already has a parent.
    pub fn add_child(&mut self, node: SceneNode3d) {
        assert!(
            node.data().is_root(),
            "The added node must not have a parent yet."
        );

        let mut node = node;
        {
            let mut data = node.data_mut();
            data.parent = Some(Rc::downgrade(&self.data));
            data.invalidate();
        }
        self.data_mut().children.push(node)
    }

    /// Adds a child node drawing `mesh` with `params`.
    pub fn add_mesh(&mut self, mesh: RenderMesh, params: impl Into<MaterialParams>) -> SceneNode3d {
        let node = SceneNode3d::new_mesh(mesh, params);
        self.add_child(node.clone());
        node
    }

    /// Adds a child node drawing a mesh shared with other nodes.
    pub fn add_shared_mesh(
        &mut self,
        mesh: Rc<RefCell<GpuMesh3d>>,
        params: impl Into<MaterialParams>,
    ) -> SceneNode3d {
        let node = SceneNode3d::new(
            Vec3::ONE,
            Pose3::IDENTITY,
            Some(Object3d::new(mesh, params.into())),
        );
        self.add_child(node.clone());
        node
    }

    /// Adds a child node carrying `light`.
    pub fn add_light(&mut self, light: Light) -> SceneNode3d {
        let node = SceneNode3d::new_light(light);
        self.add_child(node.clone());
        node
    }

    /// The light carried by this node.
    pub fn light(&self) -> Option<Light> {
        self.data().light.clone()
    }

    /// Mutably applies `f` to the light of this node, if any.
    pub fn modify_light<F: FnOnce(&mut Light)>(&mut self, f: F) {
        if let Some(light) = self.data_mut().light.as_mut() {
            f(light)
        }
    }

    /// Mutably applies `f` to the material parameters of this node's object, if any.
    pub fn modify_params<F: FnOnce(&mut MaterialParams)>(&mut self, f: F) {
        if let Some(object) = self.data_mut().object.as_mut() {
            f(object.data_mut().params_mut())
        }
    }

    /// Whether this node and its children are drawn.
    pub fn is_visible(&self) -> bool {
        self.data().visible
    }

    /// Shows or hides this node and its children.
    pub fn set_visible(&mut self, visible: bool) -> Self {
        self.data_mut().visible = visible;
        self.clone()
    }

    /*
     *
     * Transformation methods.
     *
     */
    /// Sets the local scaling factors of the node.
    #[inline]
    pub fn set_local_scale(&mut self, sx: f32, sy: f32, sz: f32) -> Self {
        let mut data = self.data_mut();
        data.invalidate();
        data.local_scale = Vec3::new(sx, sy, sz);
        drop(data);
        self.clone()
    }

    /// Returns the scaling factors of the node.
    #[inline]
    pub fn local_scale(&self) -> Vec3 {
        self.data().local_scale
    }

    /// This node local transformation.
    #[inline]
    pub fn local_transformation(&self) -> Pose3 {
        self.data().local_transform
    }

    /// This node world transformation.
    ///
    /// Walks up the parents to account for transforms changed since the last
    /// frame.
    #[inline]
    pub fn world_pose(&self) -> Pose3 {
        let mut data = self.data.borrow_mut();
        data.update();
        data.world_transform
    }

    /// This node world scale.
    #[inline]
    pub fn world_scale(&self) -> Vec3 {
        let mut data = self.data.borrow_mut();
        data.update();
        data.world_scale
    }

    /// Sets this node's local transformation, replacing the current one.
    #[inline]
    pub fn set_pose(&mut self, t: Pose3) -> Self {
        let mut data = self.data_mut();
        data.invalidate();
        data.local_transform = t;
        drop(data);
        self.clone()
    }

    /// Returns this node's local translation.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.data().local_transform.translation
    }

    /// Sets this node's local translation, replacing the current one.
    #[inline]
    pub fn set_position(&mut self, t: Vec3) -> Self {
        let mut data = self.data_mut();
        data.invalidate();
        data.local_transform.translation = t;
        drop(data);
        self.clone()
    }

    /// Returns this node's local rotation.
    #[inline]
    pub fn rotation(&self) -> Quat {
        self.data().local_transform.rotation
    }

    /// Sets this node's local rotation, replacing the current one.
    #[inline]
    pub fn set_rotation(&mut self, r: Quat) -> Self {
        let mut data = self.data_mut();
        data.invalidate();
        data.local_transform.rotation = r;
        drop(data);
        self.clone()
    }

    /// Rotates this node in place by `r`, applied after its current rotation.
    #[inline]
    pub fn rotate(&mut self, r: Quat) -> Self {
        let mut data = self.data_mut();
        data.invalidate();
        data.local_transform.rotation = r * data.local_transform.rotation;
        drop(data);
        self.clone()
    }

    /// Prepares uniforms for the scene graph rooted by this node.
    pub fn prepare(
        &mut self,
        camera: &dyn Camera3d,
        lights: &mut LightCollection,
        context: &RenderContext,
    ) {
        self.data_mut().prepare(camera, lights, context)
    }

    /// Draws the objects of `phase` in the scene graph rooted by this node.
    pub fn render(
        &mut self,
        phase: RenderPhase,
        pass: &mut wgpu::RenderPass<'_>,
        context: &RenderContext,
    ) {
        self.data_mut().render(phase, pass, context)
    }

    /// Applies `f` to this node and all its descendants, depth-first.
    pub fn apply_to_scene_nodes<F: FnMut(&SceneNode3d)>(&self, f: &mut F) {
        f(self);

        for c in self.data().children.iter() {
            c.apply_to_scene_nodes(f)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::SurfaceParams;
    use crate::color;
    use crate::procedural;
    use std::f32::consts::FRAC_PI_2;

    fn assert_near(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1.0e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn children_follow_their_parent() {
        let mut root = SceneNode3d::empty();
        let mut group = root.add_group();
        group.set_position(Vec3::new(1.0, 0.0, 0.0));
        group.set_rotation(Quat::from_rotation_y(FRAC_PI_2));

        let mut child = group.add_group();
        child.set_position(Vec3::new(0.0, 0.0, 1.0));

        // +Z rotated a quarter turn around Y is +X.
        assert_near(child.world_pose().translation, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn translucent_shells_keep_their_insertion_order() {
        let mut root = SceneNode3d::empty();
        let mut globe = root.add_group();
        let sphere = procedural::icosphere(1.0, 0);
        let clouds = globe.add_mesh(
            sphere.clone(),
            SurfaceParams::standard(color::WHITE).with_transparent(true),
        );
        let glow = globe.add_mesh(sphere, SurfaceParams::basic(color::WHITE).with_transparent(true));

        let mut order = Vec::new();
        root.apply_to_scene_nodes(&mut |node| {
            if node.data().object().is_some_and(|o| o.data().is_transparent()) {
                order.push(node.clone());
            }
        });

        assert_eq!(order.len(), 2);
        assert!(order[0].ptr_eq(&clouds));
        assert!(order[1].ptr_eq(&glow));
    }

    #[test]
    fn parent_scale_stretches_offsets_and_children() {
        let mut root = SceneNode3d::empty();
        let mut group = root.add_group();
        group.set_local_scale(2.0, 2.0, 2.0);

        let mut child = group.add_group();
        child.set_position(Vec3::new(0.0, 1.0, 0.0));
        child.set_local_scale(1.05, 1.05, 1.05);

        assert_near(child.world_pose().translation, Vec3::new(0.0, 2.0, 0.0));
        assert_near(child.world_scale(), Vec3::splat(2.1));
    }

    #[test]
    fn rotating_a_parent_invalidates_its_children() {
        let mut root = SceneNode3d::empty();
        let mut group = root.add_group();
        let mut child = group.add_group();
        child.set_position(Vec3::X);
        assert_near(child.world_pose().translation, Vec3::X);

        group.set_rotation(Quat::from_rotation_z(FRAC_PI_2));
        root.data_mut()
            .do_propagate_transforms(&Pose3::IDENTITY, Vec3::ONE, false);
        assert_near(child.data().world_transform.translation, Vec3::Y);
    }

    #[test]
    fn lights_are_gathered_from_visible_nodes() {
        let mut root = SceneNode3d::empty();
        let _ = root.add_light(Light::directional().with_intensity(2.0));
        let mut hidden = root.add_group();
        let _ = hidden.add_light(Light::directional());
        hidden.set_visible(false);

        let mut lights = LightCollection::new();
        root.data_mut().do_collect_lights(&mut lights);
        assert_eq!(lights.len(), 1);
        assert_eq!(lights.lights[0].intensity, 2.0);
    }

    #[test]
    fn detached_nodes_leave_the_graph() {
        let mut root = SceneNode3d::empty();
        let mut mesh = root.add_mesh(
            procedural::icosphere(1.0, 0),
            SurfaceParams::basic(color::WHITE),
        );
        assert_eq!(root.data().children().len(), 1);
        assert!(mesh.data().has_object());

        mesh.detach();
        assert!(root.data().children().is_empty());
        assert!(mesh.data().is_root());

        root.add_child(mesh.clone());
        assert!(root.data().children()[0].ptr_eq(&mesh));
    }

    #[test]
    #[should_panic]
    fn a_node_has_a_single_parent() {
        let mut a = SceneNode3d::empty();
        let mut b = SceneNode3d::empty();
        let child = a.add_group();
        b.add_child(child);
    }
}
