use tokio::signal;
use sre_tunnel_core::prelude::ShutdownHandle;

/// Listen for Ctrl-C and fire both the soft stop and the hard shutdown.
///
/// The soft stop lets workers finish their current iteration. The hard shutdown also cancels any
/// futures running through [crate::executor::Executor::execute_in_place].
pub(crate) fn start_shutdown_listener(
    runtime: &tokio::runtime::Runtime,
    stop_handle: ShutdownHandle,
) -> ShutdownHandle {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C, the run can only end by its bound: {e:?}");
            return;
        }
        println!("Received shutdown signal, shutting down...");
        stop_handle.shutdown();
        listener_handle.shutdown();
    });

    handle
}
