use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use parking_lot::RwLock;

/// A cloneable handle to a value behind a shared read-write lock.
///
/// Clones point at the same value. Access goes through closures so a guard
/// never outlives the call.
pub struct Shared<T> {
    cell: Arc<RwLock<T>>,
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Shared {
            cell: Arc::new(RwLock::new(value)),
        }
    }

    #[inline]
    pub fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.read())
    }

    #[inline]
    pub fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.cell.write())
    }

    /// Stores `value` and hands back the previous one.
    pub fn replace(&self, value: T) -> T {
        self.write_with(|current| std::mem::replace(current, value))
    }
}

impl<T: Clone> Shared<T> {
    pub fn get(&self) -> T {
        self.read_with(T::clone)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Shared::new(T::default())
    }
}

impl<T: Debug> Debug for Shared<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.read_with(|value| value.fmt(f))
    }
}
