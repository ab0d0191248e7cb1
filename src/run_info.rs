use std::sync::Mutex;

use crate::dag::{Client, Dag};

/// Shared, reference-counted state for one in-flight DAG run.
///
/// A single `RunInfo` is handed to every device queue the DAG touches; each
/// queue holds an unterminated reference counted in `ref_count` until its
/// worker retires the DAG from that device. See DESIGN.md for the full
/// lifecycle.
pub struct RunInfo {
    dag: Box<dyn Dag>,
    state: Mutex<State>,
    client: Mutex<Option<Box<dyn Client>>>,
}

struct State {
    error: bool,
    ref_count: usize,
}

impl RunInfo {
    /// Wraps `dag` for scheduling across `ref_count` device queues, with an
    /// optional client to resume on completion.
    pub fn new(dag: Box<dyn Dag>, ref_count: usize, client: Option<Box<dyn Client>>) -> Self {
        RunInfo {
            dag,
            state: Mutex::new(State {
                error: false,
                ref_count,
            }),
            client: Mutex::new(client),
        }
    }

    /// The DAG this run info tracks.
    pub fn dag(&self) -> &dyn Dag {
        self.dag.as_ref()
    }

    /// Whether a sticky execution error has been recorded for this DAG,
    /// either by the worker loop calling [`Self::set_error`] after an
    /// [`crate::dag::Executor`] call reports failure, or by the dag
    /// reporting its own error through [`Dag::has_error`].
    pub fn has_error(&self) -> bool {
        self.state.lock().unwrap().error || self.dag.has_error()
    }

    /// Records a sticky error. Called by the worker loop when an
    /// [`Executor`] call reports that an op failed. Once set, no further
    /// steps are scheduled for this DAG on any device.
    pub fn set_error(&self) {
        self.state.lock().unwrap().error = true;
    }

    /// Decrements the reference count for one device's retiring reference,
    /// and if it reaches zero, consumes the bound client (if any) and
    /// returns it so the caller can unblock it outside the lock. Guarantees
    /// at-most-once unblock: only the worker that observes the transition to
    /// zero receives `Some`.
    pub fn retire(&self) -> Option<Box<dyn Client>> {
        let mut state = self.state.lock().unwrap();
        debug_assert!(state.ref_count > 0, "ref_count underflow on retire");
        state.ref_count -= 1;
        if state.ref_count == 0 {
            self.client.lock().unwrap().take()
        } else {
            None
        }
    }

    /// Current reference count, for diagnostics and tests.
    pub fn ref_count(&self) -> usize {
        self.state.lock().unwrap().ref_count
    }
}
