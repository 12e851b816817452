use std::rc::Rc;

use crate::context::{Context, UpdateObserver};
use crate::element::Element;
use crate::node::{dump_nodes, AnyNode, ElementNode, UpdateResult};
use crate::runtime::{Runtime, RuntimeHandle};
use crate::target::TargetRef;

/// A mounted element tree: the root node, the runtime its state writes go
/// to and the context every update starts from.
pub struct Graph<E: Element> {
    root: E::Node,
    runtime: Runtime,
    context: Context,
}

pub struct GraphBuilder<E: Element> {
    element: E,
    runtime: Option<Runtime>,
    host: Option<TargetRef>,
    observer: Option<Rc<dyn UpdateObserver>>,
}

impl<E: Element> GraphBuilder<E> {
    pub fn runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Target receiving the root's targets as children.
    pub fn host(mut self, host: TargetRef) -> Self {
        self.host = Some(host);
        self
    }

    pub fn observer(mut self, observer: Rc<dyn UpdateObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Graph<E> {
        let runtime = self.runtime.unwrap_or_default();
        let mut context = Context::root(runtime.handle());
        if let Some(observer) = self.observer {
            context = context.with_observer(observer);
        }
        if let Some(host) = self.host {
            context = context.with_host(host);
        }
        log::debug!(
            target: "scarlet::node",
            "mounting {}",
            E::display_name()
        );
        let root = E::Node::make_node(self.element, 0, &context);
        let mut graph = Graph {
            root,
            runtime,
            context,
        };
        graph.process_invalidations();
        graph
    }
}

impl<E: Element> Graph<E> {
    pub fn new(element: E) -> Self {
        Self::builder(element).build()
    }

    pub fn builder(element: E) -> GraphBuilder<E> {
        GraphBuilder {
            element,
            runtime: None,
            host: None,
            observer: None,
        }
    }

    /// Reconciles the tree against a new root element, then replays any
    /// node invalidated along the way.
    pub fn update(&mut self, element: E) -> UpdateResult {
        let result = self
            .root
            .compare_and_update(Some(element), 0, &self.context);
        self.process_invalidations();
        result
    }

    /// Replays every node whose state was written since the last call, in
    /// write order. Returns how many nodes were replayed.
    pub fn process_invalidations(&mut self) -> usize {
        let handle = self.runtime.handle();
        let mut replayed = 0;
        loop {
            let pending = handle.take_invalidated_nodes();
            if pending.is_empty() {
                break;
            }
            for (key, node) in pending {
                handle.mark_node_replayed(key);
                let Some(node) = node.upgrade() else {
                    log::debug!(target: "scarlet::state", "node {key} dropped before replay");
                    continue;
                };
                replayed += 1;
                if node.replay() {
                    // Positions stored below the root are stale now.
                    log::trace!(target: "scarlet::state", "node {key} changed its target count, settling");
                    self.root.compare_and_update(None, 0, &self.context);
                }
            }
        }
        self.runtime.set_needs_frame(false);
        replayed
    }

    pub fn needs_update(&self) -> bool {
        self.runtime.has_invalid_nodes()
    }

    /// Target of the root node, if the root element is substantial.
    pub fn root_target(&self) -> Option<TargetRef> {
        self.root.target()
    }

    pub fn host(&self) -> Option<&TargetRef> {
        self.context.host()
    }

    pub fn root(&self) -> &E::Node {
        &self.root
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn dump_nodes(&self) -> String {
        dump_nodes(&self.root)
    }
}
