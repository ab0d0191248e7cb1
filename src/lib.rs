//! Per-device background execution scheduler with opportunistic batching for
//! DAG-structured inference workloads.
//!
//! A client submits a DAG of tensor operations, model invocations, and script
//! calls, each tagged with a target device (`CPU`, `GPU:0`, ...). This crate
//! does not parse, validate, or execute the DAG itself: it decouples
//! client-facing dispatch from execution by draining one [`Queue`] per
//! device, advancing every in-flight DAG one device-local step at a time, and
//! opportunistically fusing compatible model calls into a single batched
//! execution.
//!
//! The pieces:
//!
//! - [`DeviceName`] — a case-normalized device identifier.
//! - [`RunQueueRegistry`] — the process-wide, lazily populated map from
//!   device to its queue and worker pool.
//! - [`RunInfo`] — the shared, reference-counted record for one in-flight
//!   DAG, carrying its sticky error flag and the refcount that drives
//!   at-most-once client unblocking.
//! - [`Dag`], [`Executor`], [`Client`] — the traits through which this crate
//!   talks to the DAG representation, the execution kernels, and the host
//!   command layer. All three are out of scope for this crate; callers
//!   supply implementations.
//! - [`Config`] — the scheduler's only tunables: worker pool size per queue
//!   and a global batching on/off toggle.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use device_scheduler::{Client, Config, CurrentOp, Dag, DeviceName, Executor, OpBatchInfo,
//!                         OpId, RunInfo, RunQueueRegistry};
//!
//! struct OneShotDag;
//! impl Dag for OneShotDag {
//!     fn current_op(&self, _device: &DeviceName) -> CurrentOp {
//!         CurrentOp { op: None, ready: false, batchable: false, device_complete: true, dag_complete: true }
//!     }
//!     fn op_batch_info(&self, _op: OpId) -> OpBatchInfo { unreachable!() }
//!     fn batching_match(&self, _op: OpId, _other: &dyn Dag, _other_op: OpId) -> (bool, usize) { unreachable!() }
//!     fn has_error(&self) -> bool { false }
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//! }
//!
//! struct NoopExecutor;
//! impl Executor for NoopExecutor {
//!     fn run_step(&self, _dag: &dyn Dag, _device: &DeviceName) -> bool { true }
//!     fn run_batched_step(&self, dags: &[&dyn Dag], _device: &DeviceName) -> Vec<bool> { vec![true; dags.len()] }
//! }
//!
//! struct ChannelClient(std::sync::mpsc::Sender<bool>);
//! impl Client for ChannelClient {
//!     fn unblock(self: Box<Self>, error: bool) { let _ = self.0.send(error); }
//! }
//!
//! let registry = RunQueueRegistry::new(Config::default(), Arc::new(NoopExecutor));
//! let (tx, rx) = std::sync::mpsc::channel();
//! let rinfo = Arc::new(RunInfo::new(Box::new(OneShotDag), 1, Some(Box::new(ChannelClient(tx)))));
//! registry.enqueue("cpu", rinfo).unwrap();
//! assert_eq!(rx.recv().unwrap(), false);
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod config;
mod dag;
mod device;
mod error;
mod queue;
mod registry;
mod run_info;
mod scheduler;
mod worker;

pub use config::Config;
pub use dag::{Client, CurrentOp, Dag, Executor, OpBatchInfo, OpId};
pub use device::DeviceName;
pub use error::{Error, Result};
pub use queue::{ItemHandle, Queue};
pub use registry::{RunQueueInfo, RunQueueRegistry};
pub use run_info::RunInfo;
