use crate::context::Context;
use crate::element::Element;
use crate::node::{AnyNode, NodeCore, NodeShape, PassThroughShape, UpdateResult};

/// Element without edges. Substantial when its element declares a target.
///
/// A leaf is the end of the comparison chain, so it skips an element equal
/// to the one it already applied.
pub struct LeafShape<E> {
    core: NodeCore,
    element: Option<E>,
}

impl<E: Element> NodeShape for LeafShape<E> {
    type Element = E;
    type Output = ();

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn make(&self, _element: &E) {}

    fn update_edges(&mut self, _output: Option<()>, position: usize, _context: &Context) -> UpdateResult {
        UpdateResult {
            target_position: position,
            target_count: 0,
        }
    }

    fn visit_edges(&self, _visitor: &mut dyn FnMut(&dyn AnyNode)) {}

    fn persist(&mut self, element: Option<E>, _context: &Context, _position: usize) {
        if element.is_some() {
            self.element = element;
        }
    }
}

impl<E: Element> PassThroughShape for LeafShape<E> {
    fn new(core: NodeCore) -> Self {
        Self {
            core,
            element: None,
        }
    }

    fn is_unchanged(&self, element: &E) -> bool {
        self.element
            .as_ref()
            .is_some_and(|stored| stored.element_eq(element))
    }
}
