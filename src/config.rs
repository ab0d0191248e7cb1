use crate::error::Error;

/// Tunables for the scheduler's worker pools.
///
/// Loading this from a file or environment is out of scope for this crate;
/// callers build a `Config` themselves and pass it to
/// [`crate::RunQueueRegistry::new`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of worker threads spawned for each device's run queue, the
    /// first time that device is touched.
    pub threads_per_queue: usize,
    /// When `false`, the batching policy behaves as if every model had
    /// `batchsize == 0`: every op runs alone.
    pub batching_enabled: bool,
}

impl Config {
    /// Checks that the configuration is usable. A zero-size worker pool would
    /// leave every device queue permanently undrained.
    pub fn validate(&self) -> Result<(), Error> {
        if self.threads_per_queue == 0 {
            return Err(Error::InvalidConfig(
                "threads_per_queue must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    /// Mirrors how the surrounding application would typically size a worker
    /// pool: one worker per logical CPU, batching on.
    fn default() -> Self {
        Config {
            threads_per_queue: num_cpus::get().max(1),
            batching_enabled: true,
        }
    }
}
