//! RAII ownership of driver tasks.
//!
//! A [`Task`] owns exactly one driver handle. Discarding it stops and clears
//! the handle; a task that is dropped without being discarded is cleared in
//! `Drop`, so handles never outlive their owner.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::driver::{DaqmxDriver, TaskHandle};
use crate::error::Result;

/// An exclusively owned driver task.
pub struct Task {
    handle: TaskHandle,
    driver: Arc<dyn DaqmxDriver>,
    released: bool,
}

impl Task {
    /// Create a new empty task.
    pub fn create(driver: &Arc<dyn DaqmxDriver>) -> Result<Self> {
        let handle = driver.create_task()?;
        debug!(task = %handle, "Created DAQmx task");
        Ok(Self {
            handle,
            driver: Arc::clone(driver),
            released: false,
        })
    }

    /// Create a task, let `configure` add its channels and timing, then start it.
    ///
    /// If any step fails the half-built task is dropped, which clears it.
    pub fn build<F>(driver: &Arc<dyn DaqmxDriver>, configure: F) -> Result<Self>
    where
        F: FnOnce(&Task) -> Result<()>,
    {
        let task = Self::create(driver)?;
        configure(&task)?;
        task.start()?;
        Ok(task)
    }

    /// Get the raw driver handle.
    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    /// Get the driver this task belongs to.
    pub fn driver(&self) -> &dyn DaqmxDriver {
        self.driver.as_ref()
    }

    /// Start the task.
    pub fn start(&self) -> Result<()> {
        self.driver.start_task(self.handle)
    }

    /// Stop the task.
    pub fn stop(&self) -> Result<()> {
        self.driver.stop_task(self.handle)
    }

    /// Stop then start the task. Finite acquisitions have to be re-armed this
    /// way before every read. A failed stop is only logged.
    pub fn restart(&self) -> Result<()> {
        if let Err(e) = self.stop() {
            warn!(task = %self.handle, error = %e, "Failed to stop task before restart");
        }
        self.start()
    }

    /// Stop and clear the task. Both calls are attempted; the first failure
    /// is returned.
    pub fn discard(mut self) -> Result<()> {
        self.released = true;
        let stopped = self.driver.stop_task(self.handle);
        let cleared = self.driver.clear_task(self.handle);
        debug!(task = %self.handle, "Discarded DAQmx task");
        stopped.and(cleared)
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let _ = self.driver.stop_task(self.handle);
        if let Err(e) = self.driver.clear_task(self.handle) {
            warn!(task = %self.handle, error = %e, "Error clearing DAQmx task");
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("handle", &self.handle).finish()
    }
}

/// Discard the task in `slot`, if any, logging failures against `channel`.
///
/// The slot is always left empty: a task whose stop or clear failed is not
/// reused.
pub(crate) fn teardown(slot: &mut Option<Task>, channel: &str) {
    if let Some(task) = slot.take() {
        let handle = task.handle();
        if let Err(e) = task.discard() {
            warn!(channel, task = %handle, error = %e, "Failed to tear down task");
        }
    }
}
