use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` provides synchronized access to a value of type `T` that can be shared
/// between the control thread and callbacks that outlive a single borrow of it, such as
/// the eviction handler installed into the chunk cache.
///
/// Lock poisoning is not treated as fatal: a panic on another thread while holding the
/// lock leaves the data in whatever state it reached, and the streaming engine only stores
/// append-only logs behind this type, so the guard is recovered and handed out anyway.
///
/// # Examples
///
/// ```
/// use voxel_streaming::core::MtResource;
///
/// let log = MtResource::new(Vec::new());
/// let writer = log.clone();
///
/// writer.get_mut().push(1);
/// assert_eq!(log.get().len(), 1);
/// ```
pub struct MtResource<T: Send + Sync> {
    resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard over the contained value.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a mutable guard over the contained value.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the contained value with its default and returns the previous value.
    pub fn take(&self) -> T
    where
        T: Default,
    {
        std::mem::take(&mut *self.get_mut())
    }

    /// Number of handles currently sharing this resource.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

impl<T: Send + Sync + Default> Default for MtResource<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
