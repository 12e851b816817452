use crate::context::Context;
use crate::element::Element;
use crate::node::{
    detach, AnyNode, ElementNode, NodeCore, NodeShape, PassThroughShape, UpdateResult,
};

/// One edge that may be absent. `Some(None)` as output means "remove the
/// edge", while no output at all means "unchanged".
pub struct OptionalShape<E: Element> {
    core: NodeCore,
    edge: Option<E::Node>,
}

impl<E: Element> NodeShape for OptionalShape<E> {
    type Element = Option<E>;
    type Output = Option<E>;

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn make(&self, element: &Option<E>) -> Option<E> {
        element.clone()
    }

    fn update_edges(
        &mut self,
        output: Option<Option<E>>,
        position: usize,
        context: &Context,
    ) -> UpdateResult {
        let target_count = match output {
            None => self.edge.as_mut().map_or(0, |edge| {
                edge.compare_and_update(None, position, context).target_count
            }),
            Some(Some(element)) => match self.edge.as_mut() {
                Some(edge) => {
                    edge.compare_and_update(Some(element), position, context)
                        .target_count
                }
                None => {
                    let edge = E::Node::make_node(element, position, context);
                    let count = edge.target_count();
                    self.edge = Some(edge);
                    count
                }
            },
            Some(None) => {
                if let Some(edge) = self.edge.take() {
                    log::debug!(
                        target: "scarlet::node",
                        "{}#{} dropping {}#{}",
                        self.core.display_name(),
                        self.core.key(),
                        edge.display_name(),
                        edge.key()
                    );
                    detach(&edge, context, position);
                }
                0
            }
        };
        UpdateResult {
            target_position: position,
            target_count,
        }
    }

    fn visit_edges(&self, visitor: &mut dyn FnMut(&dyn AnyNode)) {
        if let Some(edge) = &self.edge {
            visitor(edge);
        }
    }
}

impl<E: Element> PassThroughShape for OptionalShape<E> {
    fn new(core: NodeCore) -> Self {
        Self { core, edge: None }
    }
}
