//! Device shared between tasks

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::Device;

/// A [`Device`] behind an async mutex
///
/// Cloning is cheap. Each holder locks the device for the duration of an
/// exchange or workflow, so exchanges from different tasks never interleave
/// on the wire.
pub struct SharedDevice<T> {
    inner: Arc<Mutex<Device<T>>>,
}

impl<T> SharedDevice<T> {
    pub fn new(device: Device<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(device)),
        }
    }

    /// Wait for exclusive access to the device
    pub async fn lock(&self) -> MutexGuard<'_, Device<T>> {
        self.inner.lock().await
    }

    /// Exclusive access if nobody holds the device right now
    pub fn try_lock(&self) -> Option<MutexGuard<'_, Device<T>>> {
        self.inner.try_lock().ok()
    }
}

impl<T> Clone for SharedDevice<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
