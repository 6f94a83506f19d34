use std::future::Future;

use sre_tunnel_core::prelude::{ShutdownHandle, ShutdownSignalError};

/// Bridges the synchronous worker hooks onto the run's Tokio runtime.
///
/// Only the interrupt handle, fired by Ctrl-C, reaches into in-flight work. The soft stop that
/// ends a run at its duration or iteration bound is observed by the worker loop between
/// iterations and never shows up here.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    interrupt_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, interrupt_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            interrupt_handle,
        }
    }

    /// Block the calling worker thread on `fut` and hand back its result.
    ///
    /// An interrupt abandons the future and yields a [ShutdownSignalError], which the worker loop
    /// swallows. A run that merely reached its bound lets the future finish.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut interrupted = self.interrupt_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = interrupted.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    /// Fire and forget `fut` on the runtime.
    ///
    /// Nothing awaits it and an interrupt does not cancel it. Runner timers use this, worker
    /// behaviour should stay on [Executor::execute_in_place] so an iteration does not end before
    /// its requests do.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}
