use crate::device::DeviceName;

/// Identifies a single operation within a DAG, opaque to the scheduler.
pub type OpId = usize;

/// What [`Dag::current_op`] reports about the next unexecuted operation of a
/// DAG on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentOp {
    /// The operation itself, if one remains to run on this device.
    pub op: Option<OpId>,
    /// Whether `op`'s inputs are all present and it can run now.
    pub ready: bool,
    /// Whether `op` is a model invocation eligible for opportunistic batching.
    pub batchable: bool,
    /// Whether every op of this DAG assigned to this device has completed.
    pub device_complete: bool,
    /// Whether every op of the whole DAG has completed.
    pub dag_complete: bool,
}

/// Batch-dimension sizing for a single op, as reported by the model it calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpBatchInfo {
    /// Maximum aggregate batch-dimension size the model accepts in one call.
    pub batch_target: usize,
    /// Minimum aggregate batch-dimension size required to commit a call.
    /// `0` means any non-empty batch may commit.
    pub batch_min: usize,
    /// This op's own contribution along the batch dimension.
    pub in_batch_size: usize,
}

/// The DAG inspection interface: everything the scheduler needs to know
/// about a DAG's current progress on a given device, without the scheduler
/// ever touching tensors, models, or the DAG's internal representation
/// itself. Implementations own whatever synchronization their own progress
/// bookkeeping needs.
pub trait Dag: Send + Sync {
    /// Reports the next unexecuted op of this DAG on `device`, along with the
    /// readiness/batchability/completion flags SCAN needs.
    fn current_op(&self, device: &DeviceName) -> CurrentOp;

    /// Batch-dimension sizing for `op`, which must be batchable.
    fn op_batch_info(&self, op: OpId) -> OpBatchInfo;

    /// Whether `op` on `self` may be fused into the same batched call as
    /// `other_op` on `other`, and if so, `other_op`'s contribution to the
    /// aggregate batch size. Compatibility requires the same underlying
    /// model and matching non-batch dimensions.
    fn batching_match(&self, op: OpId, other: &dyn Dag, other_op: OpId) -> (bool, usize);

    /// Whether this DAG has a sticky execution error recorded.
    fn has_error(&self) -> bool;

    /// Recovers the concrete DAG type so a host [`Executor`] implementation
    /// (which is written against the same concrete type, not this trait
    /// object) can resolve tensors and mutate progress state. The scheduler
    /// itself never calls this; it exists only so `Executor` implementations
    /// receiving `&dyn Dag` from a batch can downcast.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// The execution interface: invoked while no queue lock is held. Implementations
/// coordinate updates to a DAG's own state under that DAG's own lock.
///
/// Both methods report whether each op completed successfully. The caller
/// (the worker loop) is the one that turns a `false` into a sticky error on
/// the corresponding `RunInfo`; a `Dag` implementation is free to also track
/// its own error state and surface it through [`Dag::has_error`], but the
/// scheduler only needs the return value here to do the right thing.
pub trait Executor: Send + Sync {
    /// Executes the current op of one DAG on one device. Returns `false` if
    /// the op failed.
    fn run_step(&self, dag: &dyn Dag, device: &DeviceName) -> bool;

    /// Executes a single fused op across multiple DAGs that were matched
    /// batchable by [`Dag::batching_match`]. Returns one success flag per
    /// `dag`, in the same order, so one DAG's failure never implies another's.
    fn run_batched_step(&self, dags: &[&dyn Dag], device: &DeviceName) -> Vec<bool>;
}

/// The client unblock interface. Consumed by value so a client can be
/// resumed at most once.
pub trait Client: Send {
    /// Resumes the originating request. `error` reflects whether the DAG
    /// ended in a sticky error state.
    fn unblock(self: Box<Self>, error: bool);
}
