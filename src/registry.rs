use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::config::Config;
use crate::dag::Executor;
use crate::device::DeviceName;
use crate::error::Error;
use crate::queue::Queue;
use crate::run_info::RunInfo;
use crate::worker;

/// Per-device run queue: the queue itself, its condvar, and the fixed worker
/// pool draining it.
///
/// Once inserted into a [`RunQueueRegistry`] a `RunQueueInfo` lives until the
/// registry itself is dropped; its workers hold a clone of the surrounding
/// `Arc` for their entire lifetime.
pub struct RunQueueInfo {
    device: DeviceName,
    config: Config,
    pub(crate) queue: Mutex<Queue<Arc<RunInfo>>>,
    pub(crate) cond: Condvar,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutting_down: AtomicBool,
}

impl RunQueueInfo {
    fn new(device: DeviceName, config: Config) -> Self {
        RunQueueInfo {
            device,
            config,
            queue: Mutex::new(Queue::new()),
            cond: Condvar::new(),
            workers: Mutex::new(Vec::new()),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// The normalized device this queue drains.
    pub fn device(&self) -> &DeviceName {
        &self.device
    }

    /// The scheduler configuration this queue was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether this queue's workers have been asked to stop. Checked at the
    /// top of the worker loop, after every wake.
    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Number of items currently queued, for diagnostics and tests.
    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        // Hold the queue lock while notifying so no worker can observe a
        // stale "not shutting down" read between our store and the wake.
        let _guard = self.queue.lock().unwrap();
        self.cond.notify_all();
    }
}

/// Global, case-insensitive mapping from device name to its [`RunQueueInfo`].
/// Lazily and idempotently populated by [`RunQueueRegistry::ensure_run_queue`];
/// entries are never removed except when the registry itself is dropped.
pub struct RunQueueRegistry {
    queues: Mutex<HashMap<DeviceName, Arc<RunQueueInfo>>>,
    config: Config,
    executor: Arc<dyn Executor>,
}

impl RunQueueRegistry {
    /// Creates an empty registry. No worker threads are spawned until the
    /// first call to [`Self::ensure_run_queue`] or [`Self::enqueue`] touches a
    /// device.
    pub fn new(config: Config, executor: Arc<dyn Executor>) -> Self {
        RunQueueRegistry {
            queues: Mutex::new(HashMap::new()),
            config,
            executor,
        }
    }

    /// Returns the [`RunQueueInfo`] for `device`, normalizing case and
    /// creating (with its full worker pool) on first touch. Idempotent
    /// and thread-safe: concurrent callers for the same device race on the
    /// registry's own mutex, not on a per-device one, so exactly one caller
    /// performs the creation.
    pub fn ensure_run_queue(
        &self,
        device: impl Into<DeviceName>,
    ) -> Result<Arc<RunQueueInfo>, Error> {
        let device = device.into();
        let mut queues = self.queues.lock().unwrap();
        if let Some(existing) = queues.get(&device) {
            return Ok(existing.clone());
        }

        info!(
            "provisioning run queue for {device} with {} workers",
            self.config.threads_per_queue
        );
        let rq = Arc::new(RunQueueInfo::new(device.clone(), self.config.clone()));
        let mut workers = Vec::with_capacity(self.config.threads_per_queue);
        for index in 0..self.config.threads_per_queue {
            let rq_clone = rq.clone();
            let executor = self.executor.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("device-worker-{device}-{index}"))
                .spawn(move || worker::run(rq_clone, executor));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    // Roll back: stop and join whatever workers already
                    // started, then drop the partially-built queue entirely
                    // rather than leaving it in the registry.
                    error!("worker {index} failed to spawn for {device}, rolling back");
                    rq.shutdown();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(Error::WorkerSpawn {
                        device: device.to_string(),
                        index,
                        source,
                    });
                }
            }
        }
        *rq.workers.lock().unwrap() = workers;

        queues.insert(device, rq.clone());
        Ok(rq)
    }

    /// Pushes `rinfo` onto `device`'s queue (creating it if necessary) and
    /// signals its condvar. This is the sole entry point the host command
    /// layer uses to hand a DAG's per-device reference to the scheduler.
    pub fn enqueue(&self, device: impl Into<DeviceName>, rinfo: Arc<RunInfo>) -> Result<(), Error> {
        let rq = self.ensure_run_queue(device)?;
        let mut guard = rq.queue.lock().unwrap();
        guard.push_back(rinfo);
        rq.cond.notify_one();
        Ok(())
    }

    /// Number of distinct devices with a queue, for diagnostics and tests.
    pub fn device_count(&self) -> usize {
        self.queues.lock().unwrap().len()
    }
}

impl Drop for RunQueueRegistry {
    /// Signals every queue's workers to stop and joins them before the
    /// registry's storage is freed.
    fn drop(&mut self) {
        let queues = self.queues.lock().unwrap();
        debug!("tearing down {} run queue(s)", queues.len());
        for rq in queues.values() {
            rq.shutdown();
        }
        for rq in queues.values() {
            let mut workers = rq.workers.lock().unwrap();
            for handle in workers.drain(..) {
                if handle.join().is_err() {
                    warn!("worker for {} panicked during shutdown", rq.device());
                }
            }
        }
    }
}
