use thiserror::Error;

/// Errors that can arise from configuring or operating the scheduler.
///
/// The scheduler never wraps or reinterprets errors coming from the external
/// collaborators (the [`crate::Dag`] and [`crate::Executor`] implementations);
/// it only reports failures in its own setup and worker-pool lifecycle.
#[derive(Error, Debug)]
pub enum Error {
    /// The supplied [`crate::Config`] was invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker thread failed to spawn while provisioning a device's run queue.
    #[error("failed to spawn worker {index} for device {device}: {source}")]
    WorkerSpawn {
        /// Device the worker was being spawned for.
        device: String,
        /// Index of the worker within the device's pool.
        index: usize,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for results returned by this crate's own fallible
/// operations (configuration and registry setup).
pub type Result<T> = std::result::Result<T, Error>;
