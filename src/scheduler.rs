use std::sync::Arc;

use crate::config::Config;
use crate::device::DeviceName;
use crate::queue::{ItemHandle, Queue};
use crate::run_info::RunInfo;

/// What the worker loop's SCAN state decided to do with the queue (see
/// DESIGN.md for the full state machine). `EVICT`, `RUN`, and `REFLECT` are
/// driven by [`crate::worker`] off of this value; `scan` itself never
/// mutates the queue.
#[derive(Debug)]
pub enum Decision {
    /// Nothing runnable; block on the queue's condvar.
    Wait,
    /// The head item's current op is not ready; requeue with a one-slot
    /// demotion, promoting `promote` (if any) ahead of it.
    Retry {
        /// The head item, to be pushed back to front behind `promote`.
        item: ItemHandle,
        /// The item that was directly behind the head at scan time, if any.
        promote: Option<ItemHandle>,
    },
    /// The head item's DAG is sticky-errored, device-complete, or
    /// dag-complete: retire it without running anything.
    Retire {
        /// The item to evict and retire.
        item: ItemHandle,
    },
    /// Run a single, non-batched (or singleton-batch) step.
    Run {
        /// The item to evict and run.
        item: ItemHandle,
    },
    /// Run a fused step across more than one DAG.
    RunBatch {
        /// The items to evict and run together, in queue order.
        items: Vec<ItemHandle>,
    },
}

/// Implements the SCAN state's transitions and opportunistic batching over a
/// device's queue of `Arc<RunInfo>`. Called with the queue's mutex already
/// held by the caller; never blocks and never mutates the queue.
pub fn scan(queue: &Queue<Arc<RunInfo>>, device: &DeviceName, config: &Config) -> Decision {
    let head = match queue.front() {
        Some(h) => h,
        None => return Decision::Wait,
    };
    let head_info = queue.get(head);

    if head_info.has_error() {
        return Decision::Retire { item: head };
    }

    let current = head_info.dag().current_op(device);
    if current.dag_complete || current.device_complete {
        return Decision::Retire { item: head };
    }

    let op = match current.op {
        Some(op) => op,
        None => return Decision::Retire { item: head },
    };

    if !current.ready {
        let promote = queue.next(head);
        return Decision::Retry {
            item: head,
            promote,
        };
    }

    if !current.batchable || !config.batching_enabled {
        return Decision::Run { item: head };
    }

    let info = head_info.dag().op_batch_info(op);
    let mut items = vec![head];
    let mut sum = info.in_batch_size;

    let mut cursor = queue.next(head);
    while let Some(candidate) = cursor {
        let candidate_info = queue.get(candidate);
        cursor = queue.next(candidate);

        if candidate_info.has_error() {
            continue;
        }
        let candidate_current = candidate_info.dag().current_op(device);
        if !candidate_current.ready || !candidate_current.batchable {
            continue;
        }
        let candidate_op = match candidate_current.op {
            Some(op) => op,
            None => continue,
        };
        let (compatible, contribution) =
            head_info
                .dag()
                .batching_match(op, candidate_info.dag(), candidate_op);
        if !compatible {
            continue;
        }
        if sum + contribution > info.batch_target {
            break;
        }
        sum += contribution;
        items.push(candidate);
    }

    if info.batch_min > 0 && sum < info.batch_min {
        return Decision::Wait;
    }

    if items.len() == 1 {
        Decision::Run { item: head }
    } else {
        Decision::RunBatch { items }
    }
}
