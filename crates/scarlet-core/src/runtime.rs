use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::collections::map::HashSet;
use crate::node::Replay;
use crate::platform::RuntimeScheduler;
use crate::NodeKey;

pub(crate) type InvalidNode = (NodeKey, Weak<dyn Replay>);

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    needs_frame: RefCell<bool>,
    invalid_nodes: RefCell<HashSet<NodeKey>>, // FUTURE(no_std): replace HashSet with sparse bitset.
    node_queue: RefCell<Vec<InvalidNode>>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            needs_frame: RefCell::new(false),
            invalid_nodes: RefCell::new(HashSet::default()),
            node_queue: RefCell::new(Vec::new()),
        }
    }

    fn schedule(&self) {
        *self.needs_frame.borrow_mut() = true;
        self.scheduler.schedule_frame();
    }

    fn register_invalid_node(&self, key: NodeKey, node: Weak<dyn Replay>) {
        let mut invalid = self.invalid_nodes.borrow_mut();
        if invalid.insert(key) {
            self.node_queue.borrow_mut().push((key, node));
            self.schedule();
        }
    }

    fn mark_node_replayed(&self, key: NodeKey) {
        self.invalid_nodes.borrow_mut().remove(&key);
        if !self.has_invalid_nodes() {
            *self.needs_frame.borrow_mut() = false;
        }
    }

    fn take_invalidated_nodes(&self) -> Vec<InvalidNode> {
        self.node_queue.borrow_mut().drain(..).collect()
    }

    fn has_invalid_nodes(&self) -> bool {
        !self.invalid_nodes.borrow().is_empty()
    }
}

/// Owns the invalidation queue shared by every state location of one graph.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn needs_frame(&self) -> bool {
        *self.inner.needs_frame.borrow()
    }

    pub fn set_needs_frame(&self, value: bool) {
        *self.inner.needs_frame.borrow_mut() = value;
    }

    pub fn has_invalid_nodes(&self) -> bool {
        self.inner.has_invalid_nodes()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Arc::new(DefaultScheduler))
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}

#[cfg(test)]
#[derive(Default)]
pub struct TestScheduler {
    frames: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl TestScheduler {
    pub fn frames(&self) -> usize {
        self.frames.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(test)]
impl RuntimeScheduler for TestScheduler {
    fn schedule_frame(&self) {
        self.frames
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }
}

/// Weak handle held by state locations; every call is a no-op once the
/// runtime is gone.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub(crate) fn register_invalid_node(&self, key: NodeKey, node: Weak<dyn Replay>) {
        if let Some(inner) = self.0.upgrade() {
            inner.register_invalid_node(key, node);
        } else {
            log::debug!(target: "scarlet::state", "runtime dropped, node {key} not invalidated");
        }
    }

    pub(crate) fn mark_node_replayed(&self, key: NodeKey) {
        if let Some(inner) = self.0.upgrade() {
            inner.mark_node_replayed(key);
        }
    }

    pub(crate) fn take_invalidated_nodes(&self) -> Vec<InvalidNode> {
        self.0
            .upgrade()
            .map(|inner| inner.take_invalidated_nodes())
            .unwrap_or_default()
    }

    pub fn has_invalid_nodes(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_invalid_nodes())
            .unwrap_or(false)
    }

    pub fn needs_frame(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| *inner.needs_frame.borrow())
            .unwrap_or(false)
    }
}
