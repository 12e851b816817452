use crate::context::Context;
use crate::element::{Either, Element};
use crate::node::{
    detach, AnyNode, ElementNode, NodeCore, NodeShape, PassThroughShape, UpdateResult,
};

/// One edge of either of two element types. Switching branches destroys
/// the old branch (detaching all of its targets) before building the new one.
pub struct ConditionalShape<A: Element, B: Element> {
    core: NodeCore,
    edge: Option<Either<A::Node, B::Node>>,
}

impl<A: Element, B: Element> ConditionalShape<A, B> {
    fn edge_node(&self) -> Option<&dyn AnyNode> {
        match &self.edge {
            Some(Either::First(node)) => Some(node),
            Some(Either::Second(node)) => Some(node),
            None => None,
        }
    }

    fn drop_edge(&mut self, context: &Context, position: usize) {
        if let Some(edge) = self.edge_node() {
            log::debug!(
                target: "scarlet::node",
                "{}#{} switching away from {}#{}",
                self.core.display_name(),
                self.core.key(),
                edge.display_name(),
                edge.key()
            );
            detach(edge, context, position);
        }
        self.edge = None;
    }
}

impl<A: Element, B: Element> NodeShape for ConditionalShape<A, B> {
    type Element = Either<A, B>;
    type Output = Either<A, B>;

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn make(&self, element: &Either<A, B>) -> Either<A, B> {
        element.clone()
    }

    fn update_edges(
        &mut self,
        output: Option<Either<A, B>>,
        position: usize,
        context: &Context,
    ) -> UpdateResult {
        let target_count = match output {
            None => match self.edge.as_mut() {
                Some(Either::First(node)) => node.compare_and_update(None, position, context),
                Some(Either::Second(node)) => node.compare_and_update(None, position, context),
                None => UpdateResult::default(),
            }
            .target_count,
            Some(Either::First(element)) => match self.edge.as_mut() {
                Some(Either::First(node)) => {
                    node.compare_and_update(Some(element), position, context)
                        .target_count
                }
                _ => {
                    self.drop_edge(context, position);
                    let node = A::Node::make_node(element, position, context);
                    let count = node.target_count();
                    self.edge = Some(Either::First(node));
                    count
                }
            },
            Some(Either::Second(element)) => match self.edge.as_mut() {
                Some(Either::Second(node)) => {
                    node.compare_and_update(Some(element), position, context)
                        .target_count
                }
                _ => {
                    self.drop_edge(context, position);
                    let node = B::Node::make_node(element, position, context);
                    let count = node.target_count();
                    self.edge = Some(Either::Second(node));
                    count
                }
            },
        };
        UpdateResult {
            target_position: position,
            target_count,
        }
    }

    fn visit_edges(&self, visitor: &mut dyn FnMut(&dyn AnyNode)) {
        if let Some(edge) = self.edge_node() {
            visitor(edge);
        }
    }
}

impl<A: Element, B: Element> PassThroughShape for ConditionalShape<A, B> {
    fn new(core: NodeCore) -> Self {
        Self { core, edge: None }
    }
}
