#![allow(dead_code)]

//! In-process fakes for the `Dag`, `Executor`, and `Client` traits: a `Dag`
//! whose ops form a fixed device-tagged chain (for the ordering/cross-device/
//! error scenarios) and a `Dag` that is a single batchable model invocation
//! (for the batching scenarios), plus a `Client` that records whether and
//! with what error state it was unblocked.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use device_scheduler::{Client, CurrentOp, Dag, DeviceName, Executor, OpBatchInfo, OpId};

/// Initializes logging once per test binary, mirroring how the rest of the
/// workspace wires up `env_logger` in its test harnesses.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_nanos()
        .is_test(true)
        .try_init();
}

/// Blocks the calling thread until `predicate` holds or `timeout` elapses.
/// Returns whether the predicate was observed true.
pub fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// A `Client` that records, at most once, whether it was unblocked and with
/// what error state.
#[derive(Clone)]
pub struct RecordingClient {
    unblocked: Arc<AtomicBool>,
    unblocked_twice: Arc<AtomicBool>,
    errored: Arc<AtomicBool>,
}

impl RecordingClient {
    pub fn new() -> (Box<dyn Client>, RecordingClient) {
        let handle = RecordingClient {
            unblocked: Arc::new(AtomicBool::new(false)),
            unblocked_twice: Arc::new(AtomicBool::new(false)),
            errored: Arc::new(AtomicBool::new(false)),
        };
        (Box::new(handle.clone()), handle)
    }

    pub fn was_unblocked(&self) -> bool {
        self.unblocked.load(Ordering::SeqCst)
    }

    pub fn was_unblocked_more_than_once(&self) -> bool {
        self.unblocked_twice.load(Ordering::SeqCst)
    }

    pub fn had_error(&self) -> bool {
        self.errored.load(Ordering::SeqCst)
    }
}

impl Client for RecordingClient {
    fn unblock(self: Box<Self>, error: bool) {
        if self.unblocked.swap(true, Ordering::SeqCst) {
            self.unblocked_twice.store(true, Ordering::SeqCst);
        }
        self.errored.store(error, Ordering::SeqCst);
    }
}

struct LinearInner {
    steps: Vec<DeviceName>,
    state: Mutex<LinearState>,
}

struct LinearState {
    executed: usize,
    fail_at: Option<usize>,
}

/// A DAG modeled as a fixed, device-tagged chain of ops executed strictly in
/// order: op `i` is only ready once ops `0..i` have run, regardless of which
/// device's worker is asking. Used for the single- and multi-device ordering
/// scenarios (S1, S2, S6); never reports a batchable op.
///
/// Carries no error state of its own: a failing step is reported through
/// [`LinearDag::run_next`]'s return value, and the caller (the scheduler's
/// worker loop) is the one that records the sticky error.
#[derive(Clone)]
pub struct LinearDag(Arc<LinearInner>);

impl LinearDag {
    /// `steps[i]` is the device op `i` runs on. `fail_at`, if set, makes that
    /// step fail instead of completing successfully.
    pub fn new(steps: Vec<DeviceName>, fail_at: Option<usize>) -> Self {
        LinearDag(Arc::new(LinearInner {
            steps,
            state: Mutex::new(LinearState {
                executed: 0,
                fail_at,
            }),
        }))
    }

    pub fn executed_count(&self) -> usize {
        self.0.state.lock().unwrap().executed
    }

    /// Advances past the current op. Returns `false` (and leaves `executed`
    /// unchanged) if this step was configured to fail.
    fn run_next(&self) -> bool {
        let mut state = self.0.state.lock().unwrap();
        let at = state.executed;
        if state.fail_at == Some(at) {
            return false;
        }
        state.executed = at + 1;
        true
    }
}

impl Dag for LinearDag {
    fn current_op(&self, device: &DeviceName) -> CurrentOp {
        let state = self.0.state.lock().unwrap();
        let executed = state.executed;
        if executed >= self.0.steps.len() {
            return CurrentOp {
                op: None,
                ready: false,
                batchable: false,
                device_complete: true,
                dag_complete: true,
            };
        }
        match self.0.steps[executed..].iter().position(|d| d == device) {
            None => CurrentOp {
                op: None,
                ready: false,
                batchable: false,
                device_complete: true,
                dag_complete: false,
            },
            Some(0) => CurrentOp {
                op: Some(executed),
                ready: true,
                batchable: false,
                device_complete: false,
                dag_complete: false,
            },
            Some(offset) => CurrentOp {
                op: Some(executed + offset),
                ready: false,
                batchable: false,
                device_complete: false,
                dag_complete: false,
            },
        }
    }

    fn op_batch_info(&self, _op: OpId) -> OpBatchInfo {
        unreachable!("LinearDag never reports a batchable op")
    }

    fn batching_match(&self, _op: OpId, _other: &dyn Dag, _other_op: OpId) -> (bool, usize) {
        unreachable!("LinearDag never reports a batchable op")
    }

    fn has_error(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Executes [`LinearDag`] steps, counting invocations so tests can assert on
/// the exact number of `run_step` calls made.
#[derive(Default)]
pub struct LinearExecutor {
    run_count: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl LinearExecutor {
    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }
}

impl Executor for LinearExecutor {
    fn run_step(&self, dag: &dyn Dag, _device: &DeviceName) -> bool {
        self.run_count.fetch_add(1, Ordering::SeqCst);
        dag.as_any()
            .downcast_ref::<LinearDag>()
            .expect("LinearExecutor only drives LinearDag")
            .run_next()
    }

    fn run_batched_step(&self, _dags: &[&dyn Dag], _device: &DeviceName) -> Vec<bool> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        unreachable!("LinearDag never reports a batchable op, so it never batches")
    }
}

struct ModelInner {
    batch_target: usize,
    batch_min: usize,
    in_batch_size: usize,
    /// Gates readiness, modeling "inputs not yet produced by another
    /// device" so tests can control exactly when a group of DAGs becomes
    /// simultaneously schedulable without racing worker threads.
    gate: Option<Arc<AtomicBool>>,
    state: Mutex<ModelState>,
}

struct ModelState {
    executed: bool,
}

/// A DAG that is a single batchable model invocation on one device. Used for
/// the opportunistic-batching scenarios (S3, S4, S5).
#[derive(Clone)]
pub struct ModelDag(Arc<ModelInner>);

impl ModelDag {
    pub fn new(batch_target: usize, batch_min: usize, in_batch_size: usize) -> Self {
        Self::with_gate(batch_target, batch_min, in_batch_size, None)
    }

    pub fn with_gate(
        batch_target: usize,
        batch_min: usize,
        in_batch_size: usize,
        gate: Option<Arc<AtomicBool>>,
    ) -> Self {
        ModelDag(Arc::new(ModelInner {
            batch_target,
            batch_min,
            in_batch_size,
            gate,
            state: Mutex::new(ModelState { executed: false }),
        }))
    }

    pub fn is_executed(&self) -> bool {
        self.0.state.lock().unwrap().executed
    }

    fn run(&self) {
        self.0.state.lock().unwrap().executed = true;
    }

    fn is_ready(&self) -> bool {
        match &self.0.gate {
            Some(gate) => gate.load(Ordering::SeqCst),
            None => true,
        }
    }
}

impl Dag for ModelDag {
    fn current_op(&self, _device: &DeviceName) -> CurrentOp {
        if self.0.state.lock().unwrap().executed {
            return CurrentOp {
                op: None,
                ready: false,
                batchable: false,
                device_complete: true,
                dag_complete: true,
            };
        }
        CurrentOp {
            op: Some(0),
            ready: self.is_ready(),
            batchable: true,
            device_complete: false,
            dag_complete: false,
        }
    }

    fn op_batch_info(&self, _op: OpId) -> OpBatchInfo {
        OpBatchInfo {
            batch_target: self.0.batch_target,
            batch_min: self.0.batch_min,
            in_batch_size: self.0.in_batch_size,
        }
    }

    fn batching_match(&self, _op: OpId, other: &dyn Dag, other_op: OpId) -> (bool, usize) {
        let info = other.op_batch_info(other_op);
        (true, info.in_batch_size)
    }

    fn has_error(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Executes [`ModelDag`] steps, recording the aggregate batch-dimension size
/// of every call (single steps record their own `in_batch_size`).
#[derive(Default)]
pub struct ModelExecutor {
    batch_sizes: Mutex<Vec<usize>>,
}

impl ModelExecutor {
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

impl Executor for ModelExecutor {
    fn run_step(&self, dag: &dyn Dag, _device: &DeviceName) -> bool {
        let model = dag
            .as_any()
            .downcast_ref::<ModelDag>()
            .expect("ModelExecutor only drives ModelDag");
        model.run();
        self.batch_sizes.lock().unwrap().push(model.0.in_batch_size);
        true
    }

    fn run_batched_step(&self, dags: &[&dyn Dag], _device: &DeviceName) -> Vec<bool> {
        let mut total = 0;
        for dag in dags {
            let model = dag
                .as_any()
                .downcast_ref::<ModelDag>()
                .expect("ModelExecutor only drives ModelDag");
            model.run();
            total += model.0.in_batch_size;
        }
        self.batch_sizes.lock().unwrap().push(total);
        vec![true; dags.len()]
    }
}
