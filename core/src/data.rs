// core/src/data.rs
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::sync::Arc;

/// Context shared by every hook of a flow run, and by branch routes that
/// hand a piece of it to a sub-flow.
///
/// Locks are `parking_lot` locks: blocking, never poisoned. Drop guards
/// before awaiting; `with` and `update` scope the guard to a closure.
pub struct FlowData<T>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> FlowData<T> {
  pub fn new(data: T) -> Self {
    Self(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Runs `f` under the read lock and returns what it computed.
  pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
    f(&self.0.read())
  }

  /// Runs `f` under the write lock.
  pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
    f(&mut self.0.write())
  }

  /// True when both handles point at the same run.
  pub fn same_as(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl<T: Clone + Send + Sync + 'static> FlowData<T> {
  pub fn snapshot(&self) -> T {
    self.with(T::clone)
  }
}

impl<T> Clone for FlowData<T> {
  fn clone(&self) -> Self {
    Self(Arc::clone(&self.0))
  }
}

impl<T: Default + Send + Sync + 'static> Default for FlowData<T> {
  fn default() -> Self {
    Self::new(T::default())
  }
}

impl<T: fmt::Debug> fmt::Debug for FlowData<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0.try_read() {
      Some(data) => f.debug_tuple("FlowData").field(&*data).finish(),
      None => f.write_str("FlowData(<locked>)"),
    }
  }
}
