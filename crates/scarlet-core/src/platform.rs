//! Platform abstraction for scheduling reconciliation passes.
//!
//! The graph never drives its own loop. When a state location is written the
//! runtime asks the host, through this trait, to schedule a frame in which
//! [`Graph::process_invalidations`](crate::Graph::process_invalidations) runs.

/// Schedules work for the Scarlet runtime.
///
/// Implementations are responsible for arranging a call back into the graph
/// on the thread that owns it. They must be safe to share across threads.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host schedule a new frame.
    fn schedule_frame(&self);
}
