mod bail;
mod shutdown;

pub mod prelude {
    pub use crate::bail::WorkerBailError;
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError};
}
