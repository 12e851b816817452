use std::rc::Rc;

use crate::context::Context;
use crate::element::{AnyElement, Element, Modified, ModifierContent};
use crate::node::{AnyNode, ElementNode, NodeCore, NodeShape, PassThroughShape, UpdateResult};
use crate::{fatal, NodeError};

/// Content wrapped by a modifier. The modifier is the only real edge; the
/// content travels down the context's modifier-content stack until the
/// [`ModifierContent`] placeholder inside the modifier body picks it up.
pub struct ModifiedShape<C: Element, M: Element> {
    core: NodeCore,
    content: Option<Rc<dyn AnyElement>>,
    edge: Option<M::Node>,
    _content: std::marker::PhantomData<C>,
}

impl<C: Element, M: Element> NodeShape for ModifiedShape<C, M> {
    type Element = Modified<C, M>;
    type Output = (C, M);

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn make(&self, element: &Modified<C, M>) -> (C, M) {
        (element.content.clone(), element.modifier.clone())
    }

    fn update_edges(
        &mut self,
        output: Option<(C, M)>,
        position: usize,
        context: &Context,
    ) -> UpdateResult {
        let (modifier, changed) = match output {
            Some((content, modifier)) => {
                let content: Rc<dyn AnyElement> = Rc::new(content);
                self.content = Some(content);
                (Some(modifier), true)
            }
            None => (None, false),
        };
        let Some(content) = self.content.clone() else {
            fatal(NodeError::MissingOutput {
                node: self.core.display_name().to_owned(),
            })
        };
        let context = context.pushing_modifier_content(content, changed);
        let target_count = match self.edge.as_mut() {
            Some(edge) => edge.compare_and_update(modifier, position, &context).target_count,
            None => {
                let Some(modifier) = modifier else {
                    fatal(NodeError::MissingOutput {
                        node: self.core.display_name().to_owned(),
                    })
                };
                let edge = M::Node::make_node(modifier, position, &context);
                let count = edge.target_count();
                self.edge = Some(edge);
                count
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

impl<C: Element, M: Element> PassThroughShape for ModifiedShape<C, M> {
    fn new(core: NodeCore) -> Self {
        Self {
            core,
            content: None,
            edge: None,
            _content: std::marker::PhantomData,
        }
    }
}

/// Placeholder for modifier content. Its single edge is built from
/// whatever element the nearest enclosing modifier pushed, so the edge is
/// type-erased.
pub struct ModifierContentShape {
    core: NodeCore,
    edge: Option<Box<dyn AnyNode>>,
}

impl NodeShape for ModifierContentShape {
    type Element = ModifierContent;
    type Output = ();

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn make(&self, _element: &ModifierContent) {}

    fn update_edges(&mut self, _output: Option<()>, position: usize, context: &Context) -> UpdateResult {
        let (popped, context) = context.popping_modifier_content(self.core.display_name());
        let target_count = match self.edge.as_mut() {
            Some(edge) => {
                let content = popped.changed.then_some(&*popped.content);
                edge.update_any(content, position, &context).target_count
            }
            None => {
                let edge = popped.content.make_any_node(position, &context);
                let count = edge.target_count();
                self.edge = Some(edge);
                count
            }
        };
        UpdateResult {
            target_position: position,
            target_count,
        }
    }

    fn visit_edges(&self, visitor: &mut dyn FnMut(&dyn AnyNode)) {
        if let Some(edge) = &self.edge {
            visitor(edge.as_ref());
        }
    }
}

impl PassThroughShape for ModifierContentShape {
    fn new(core: NodeCore) -> Self {
        Self { core, edge: None }
    }
}
