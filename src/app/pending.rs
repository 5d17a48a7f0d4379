use crate::resource::{TextureColorSpace, TextureManager};
use crate::scene::SceneNode3d;
use image::RgbaImage;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A scene change produced outside of the render loop, applied between two
/// frames.
pub enum PendingChange {
    /// Attaches `child` to `parent`.
    Insert {
        parent: SceneNode3d,
        child: SceneNode3d,
    },
    /// Registers a decoded image. Materials naming it switch from the
    /// placeholder on the next frame.
    Texture {
        name: String,
        image: RgbaImage,
        color_space: TextureColorSpace,
    },
}

impl PendingChange {
    pub fn apply(self) {
        match self {
            PendingChange::Insert { mut parent, child } => parent.add_child(child),
            PendingChange::Texture {
                name,
                image,
                color_space,
            } => TextureManager::get_global_manager(|tm| tm.add_rgba(&name, image, color_space)),
        }
    }
}

/// First-in first-out queue of [`PendingChange`]s, shared between the
/// render loop and whatever completes asynchronously.
#[derive(Clone, Default)]
pub struct PendingQueue {
    changes: Rc<RefCell<VecDeque<PendingChange>>>,
}

impl PendingQueue {
    pub fn new() -> PendingQueue {
        PendingQueue::default()
    }

    pub fn push(&self, change: PendingChange) {
        self.changes.borrow_mut().push_back(change);
    }

    /// Queues the insertion of `child` under `parent`.
    pub fn insert(&self, parent: &SceneNode3d, child: SceneNode3d) {
        self.push(PendingChange::Insert {
            parent: parent.clone(),
            child,
        })
    }

    /// Removes the oldest change without applying it.
    pub fn pop(&self) -> Option<PendingChange> {
        self.changes.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.changes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.borrow().is_empty()
    }

    /// Applies every queued change in arrival order and returns how many
    /// there were.
    ///
    /// Changes queued while applying wait for the next call.
    pub fn apply_all(&self) -> usize {
        let changes: Vec<_> = self.changes.borrow_mut().drain(..).collect();
        let count = changes.len();
        for change in changes {
            change.apply();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertions_apply_in_fifo_order() {
        let root = SceneNode3d::empty();
        let queue = PendingQueue::new();
        let (a, b) = (SceneNode3d::empty(), SceneNode3d::empty());

        queue.insert(&root, a.clone());
        queue.insert(&root, b.clone());
        assert_eq!(root.data().children().len(), 0);

        assert_eq!(queue.apply_all(), 2);
        let data = root.data();
        let children = data.children();
        assert!(children[0].ptr_eq(&a));
        assert!(children[1].ptr_eq(&b));
        assert!(queue.is_empty());
    }

    #[test]
    fn textures_register_with_the_manager() {
        let queue = PendingQueue::new();
        queue.push(PendingChange::Texture {
            name: "pending-test".to_string(),
            image: RgbaImage::new(2, 2),
            color_space: TextureColorSpace::Linear,
        });
        assert_eq!(queue.len(), 1);

        let _ = queue.apply_all();
        assert!(TextureManager::get_global_manager(|tm| tm.is_pending("pending-test")));
    }
}
