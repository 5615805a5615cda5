use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// A single-threaded shared handle to a collaborator.
///
/// `StSystem` is how collaborators are shared between the renderer and the
/// rest of the application in a single-threaded context: the graphics device
/// is created once and handed to every component that draws with it. The
/// container uses `Rc<RefCell<T>>` internally to provide interior mutability.
///
/// # Examples
///
/// ```
/// use voxel_map_renderer::core::StSystem;
///
/// let system = StSystem::new(42u32);
/// assert_eq!(*system.get(), 42);
///
/// *system.get_mut() = 100;
/// assert_eq!(*system.get(), 100);
/// ```
///
/// # Panics
/// - Panics if a borrow is held while trying to mutably borrow
/// - Panics if a mutable borrow is held while trying to borrow
pub struct StSystem<T> {
    system: Rc<RefCell<T>>,
}

impl<T> StSystem<T> {
    /// Creates a new `StSystem` containing the given value.
    pub fn new(system: T) -> Self {
        Self {
            system: Rc::new(RefCell::new(system)),
        }
    }

    /// Returns an immutable reference to the contained collaborator.
    ///
    /// # Panics
    /// Panics if the value is currently mutably borrowed.
    pub fn get(&self) -> Ref<'_, T> {
        self.system.borrow()
    }

    /// Returns a mutable reference to the contained collaborator.
    ///
    /// # Panics
    /// Panics if the value is currently borrowed.
    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.system.borrow_mut()
    }
}

impl<T> Clone for StSystem<T> {
    fn clone(&self) -> Self {
        Self {
            system: self.system.clone(),
        }
    }
}
