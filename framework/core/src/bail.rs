/// Return this error from a worker's behaviour function to indicate that the worker is bailing.
///
/// This should be used when a worker encounters an error that is fatal to that worker but not
/// to the scenario. For example, if the worker cannot obtain the record it was assigned then it
/// may bail and the scenario will continue with the other workers.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct WorkerBailError {
    msg: String,
}

impl WorkerBailError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl Default for WorkerBailError {
    fn default() -> Self {
        Self {
            msg: "Worker is bailing".to_string(),
        }
    }
}
