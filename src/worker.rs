use std::sync::Arc;
use std::time::Duration;

use crate::dag::{Dag, Executor};
use crate::registry::RunQueueInfo;
use crate::run_info::RunInfo;
use crate::scheduler::{scan, Decision};

/// How long a worker sleeps in the retry-with-empty-queue branch before
/// re-scanning. The sole timed wait in the design; required so that a DAG
/// blocked on another device's progress yields the CPU instead of busy-
/// spinning.
const RETRY_SLEEP: Duration = Duration::from_millis(1);

fn retire(rinfo: Arc<RunInfo>) {
    if let Some(client) = rinfo.retire() {
        let error = rinfo.has_error();
        trace!("unblocking client (error = {error})");
        client.unblock(error);
    }
}

/// Body of one worker thread for a single device's run queue.
///
/// This is a single unified loop: both "queue empty" and "batch below
/// `batch_min`" route through the same blocking wait on the queue's condvar,
/// so the worker never spins. The predicate is re-checked by calling `scan`
/// again after every wake, since condvar signals are not gated to a specific
/// cause.
pub(crate) fn run(rq: Arc<RunQueueInfo>, executor: Arc<dyn Executor>) {
    let mut guard = rq.queue.lock().unwrap();
    loop {
        if rq.is_shutting_down() {
            trace!("worker for {} shutting down", rq.device());
            return;
        }

        match scan(&guard, rq.device(), rq.config()) {
            Decision::Wait => {
                trace!("{}: nothing runnable, waiting", rq.device());
                guard = rq.cond.wait(guard).unwrap();
            }

            Decision::Retry { item, promote } => {
                let demoted = guard.evict(item);
                match promote {
                    Some(promote) => {
                        let promoted = guard.evict(promote);
                        guard.push_front(demoted);
                        guard.push_front(promoted);
                        rq.cond.notify_all();
                    }
                    None => {
                        guard.push_front(demoted);
                        drop(guard);
                        std::thread::sleep(RETRY_SLEEP);
                        guard = rq.queue.lock().unwrap();
                    }
                }
            }

            Decision::Retire { item } => {
                let rinfo = guard.evict(item);
                drop(guard);
                retire(rinfo);
                guard = rq.queue.lock().unwrap();
            }

            Decision::Run { item } => {
                let rinfo = guard.evict(item);
                drop(guard);
                debug!("{}: running single step", rq.device());
                if !executor.run_step(rinfo.dag(), rq.device()) {
                    rinfo.set_error();
                }
                guard = rq.queue.lock().unwrap();
                if rinfo.has_error() {
                    drop(guard);
                    retire(rinfo);
                    guard = rq.queue.lock().unwrap();
                } else {
                    guard.push_front(rinfo);
                    rq.cond.notify_one();
                }
            }

            Decision::RunBatch { items } => {
                let evicted: Vec<Arc<RunInfo>> =
                    items.into_iter().map(|h| guard.evict(h)).collect();
                drop(guard);
                debug!("{}: running batched step of {}", rq.device(), evicted.len());
                {
                    let dags: Vec<&dyn Dag> = evicted.iter().map(|r| r.dag()).collect();
                    let results = executor.run_batched_step(&dags, rq.device());
                    debug_assert_eq!(results.len(), evicted.len());
                    for (rinfo, ok) in evicted.iter().zip(results) {
                        if !ok {
                            rinfo.set_error();
                        }
                    }
                }
                guard = rq.queue.lock().unwrap();
                // Re-queue in reverse iteration order so the original head
                // stays the head after everyone is pushed to the front.
                for rinfo in evicted.into_iter().rev() {
                    if rinfo.has_error() {
                        drop(guard);
                        retire(rinfo);
                        guard = rq.queue.lock().unwrap();
                    } else {
                        guard.push_front(rinfo);
                    }
                }
                rq.cond.notify_one();
            }
        }
    }
}
