use crate::attributes::AttributeField;
use crate::context::Context;
use crate::element::{Attributed, Element};
use crate::nodes::StaticNode;
use crate::equality::ElementEq;
use crate::node::{AnyNode, ElementNode, NodeCore, NodeShape, PassThroughShape, UpdateResult};
use crate::properties::ElementFields;
use crate::target::NoTarget;
use crate::{fatal, NodeError};

/// A fixed, typed set of edges. Implemented for tuples of one to eight
/// elements.
pub trait Edges: 'static {
    type Nodes: 'static;

    const LEN: usize;

    /// Builds one node per edge, each starting where the previous edges'
    /// targets end. Returns the nodes and their total target count.
    fn make_nodes(self, position: usize, context: &Context) -> (Self::Nodes, usize);

    fn update_nodes(
        edges: Option<Self>,
        nodes: &mut Self::Nodes,
        position: usize,
        context: &Context,
    ) -> usize
    where
        Self: Sized;

    fn visit_nodes(nodes: &Self::Nodes, visitor: &mut dyn FnMut(&dyn AnyNode));
}

/// Element deriving a fixed number of typed edges.
pub trait StaticElement: Element {
    type Edges: Edges;

    fn edges(&self) -> Self::Edges;
}

/// Fixed-arity shape. Never compares itself: each edge decides on its own
/// whether it changed.
pub struct StaticShape<E: StaticElement> {
    core: NodeCore,
    edges: Option<<E::Edges as Edges>::Nodes>,
}

impl<E: StaticElement> NodeShape for StaticShape<E> {
    type Element = E;
    type Output = E::Edges;

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn make(&self, element: &E) -> E::Edges {
        element.edges()
    }

    fn update_edges(
        &mut self,
        output: Option<E::Edges>,
        position: usize,
        context: &Context,
    ) -> UpdateResult {
        let target_count = match self.edges.as_mut() {
            Some(nodes) => E::Edges::update_nodes(output, nodes, position, context),
            None => {
                let Some(edges) = output else {
                    fatal(NodeError::MissingOutput {
                        node: self.core.display_name().to_owned(),
                    })
                };
                log::trace!(
                    target: "scarlet::node",
                    "{}#{} creating {} edges",
                    self.core.display_name(),
                    self.core.key(),
                    <E::Edges as Edges>::LEN
                );
                let (nodes, count) = edges.make_nodes(position, context);
                self.edges = Some(nodes);
                count
            }
        };
        UpdateResult {
            target_position: position,
            target_count,
        }
    }

    fn visit_edges(&self, visitor: &mut dyn FnMut(&dyn AnyNode)) {
        if let Some(nodes) = &self.edges {
            E::Edges::visit_nodes(nodes, visitor);
        }
    }
}

impl<E: StaticElement> PassThroughShape for StaticShape<E> {
    fn new(core: NodeCore) -> Self {
        Self { core, edges: None }
    }
}

macro_rules! impl_static_tuple {
    ($len:expr; $($name:ident: $index:tt),+) => {
        impl<$($name: Element),+> Edges for ($($name,)+) {
            type Nodes = ($(<$name as Element>::Node,)+);

            const LEN: usize = $len;

            fn make_nodes(self, position: usize, context: &Context) -> (Self::Nodes, usize) {
                let mut count = 0;
                let nodes = ($({
                    let node = <<$name as Element>::Node as ElementNode>::make_node(self.$index, position + count, context);
                    count += node.target_count();
                    node
                },)+);
                (nodes, count)
            }

            fn update_nodes(
                edges: Option<Self>,
                nodes: &mut Self::Nodes,
                position: usize,
                context: &Context,
            ) -> usize {
                let mut count = 0;
                match edges {
                    Some(edges) => {
                        $(count += nodes.$index
                            .compare_and_update(Some(edges.$index), position + count, context)
                            .target_count;)+
                    }
                    None => {
                        $(count += nodes.$index
                            .compare_and_update(None, position + count, context)
                            .target_count;)+
                    }
                }
                count
            }

            fn visit_nodes(nodes: &Self::Nodes, visitor: &mut dyn FnMut(&dyn AnyNode)) {
                $(visitor(&nodes.$index);)+
            }
        }

        impl<$($name: Element),+> Element for ($($name,)+) {
            type Node = StaticNode<Self>;
            type Target = NoTarget;

            fn display_name() -> &'static str {
                "Static"
            }
        }

        impl<$($name: Element),+> ElementFields for ($($name,)+) {}

        impl<$($name: Element),+> StaticElement for ($($name,)+) {
            type Edges = Self;

            fn edges(&self) -> Self {
                self.clone()
            }
        }
    };
}

impl_static_tuple!(1; A: 0);
impl_static_tuple!(2; A: 0, B: 1);
impl_static_tuple!(3; A: 0, B: 1, C: 2);
impl_static_tuple!(4; A: 0, B: 1, C: 2, D: 3);
impl_static_tuple!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_static_tuple!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_static_tuple!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_static_tuple!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

impl<C: Element, A: AttributeField + ElementEq + Clone + 'static> StaticElement for Attributed<C, A> {
    type Edges = (C,);

    fn edges(&self) -> (C,) {
        (self.content.clone(),)
    }
}
