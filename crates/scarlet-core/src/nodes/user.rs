use std::any::type_name;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::context::Context;
use crate::element::{AnyElement, Component, Element, ModifierContent, ViewModifier};
use crate::environment::environment_keys_of;
use crate::node::{
    attach, update_erased, AnyNode, ElementNode, NodeCore, NodeShape, Replay, UpdateResult,
};
use crate::properties::Installer;
use crate::target::TargetRef;
use crate::{fatal, NodeError, NodeKey};

/// How a body-bearing element derives its body.
pub trait BodyStrategy<E>: 'static {
    type Body: Element;

    fn body(element: &E) -> Self::Body;
}

pub struct ComponentBody;

impl<C: Component> BodyStrategy<C> for ComponentBody {
    type Body = C::Body;

    fn body(element: &C) -> C::Body {
        element.body()
    }
}

pub struct ModifierBody;

impl<M: ViewModifier> BodyStrategy<M> for ModifierBody {
    type Body = M::Body;

    fn body(element: &M) -> M::Body {
        element.body(ModifierContent)
    }
}

/// Body-bearing shape. The only shape that installs dynamic properties and
/// compares its element before deriving.
pub struct UserShape<E: Element, B: BodyStrategy<E>> {
    core: NodeCore,
    this: Weak<RefCell<Self>>,
    element: E,
    context: Option<Context>,
    position: usize,
    edge: Option<<B::Body as Element>::Node>,
    _strategy: PhantomData<B>,
}

impl<E: Element, B: BodyStrategy<E>> UserShape<E, B> {
    pub fn element(&self) -> &E {
        &self.element
    }

    fn install(&self, mut element: E, context: &Context, first: bool) -> E {
        let replay: Weak<dyn Replay> = self.this.clone();
        let installer = Installer {
            owner: self.core.key(),
            replay,
            runtime: context.runtime().clone(),
            environment: context.environment(),
            changed_environment: context.changed_environment(),
            first,
        };
        element.install_dynamic_properties(&self.element, &installer);
        element
    }

    fn mount(&mut self, position: usize, context: &Context) -> UpdateResult {
        let element = self.install(self.element.clone(), context, true);
        self.update(Some(element), position, context, true)
    }

    fn compare_and_update(
        &mut self,
        element: Option<E>,
        position: usize,
        context: &Context,
    ) -> UpdateResult {
        let environment_changed = context
            .changed_environment()
            .any_changed(&environment_keys_of::<E>());
        let element = match element {
            None if environment_changed => {
                log::trace!(
                    target: "scarlet::node",
                    "{}#{} re-deriving for changed environment",
                    self.core.display_name(),
                    self.core.key()
                );
                Some(self.install(self.element.clone(), context, false))
            }
            None => None,
            Some(element) => {
                let should_update = !self.element.element_eq(&element);
                if context.has_state_changed() || environment_changed || should_update {
                    Some(self.install(element, context, false))
                } else {
                    log::trace!(
                        target: "scarlet::node",
                        "{}#{} unchanged",
                        self.core.display_name(),
                        self.core.key()
                    );
                    None
                }
            }
        };
        self.update(element, position, context, false)
    }

    fn replay(&mut self) -> bool {
        let Some(context) = self.context.clone() else {
            return false;
        };
        log::debug!(
            target: "scarlet::state",
            "replaying {}#{} at {}",
            self.core.display_name(),
            self.core.key(),
            self.position
        );
        let previous = self.core.target_count();
        let element = self.element.clone();
        let result = self.update(
            Some(element),
            self.position,
            &context.setting_state_change(),
            false,
        );
        previous != result.target_count
    }
}

impl<E: Element, B: BodyStrategy<E>> NodeShape for UserShape<E, B> {
    type Element = E;
    type Output = B::Body;

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn make(&self, element: &E) -> B::Body {
        B::body(element)
    }

    fn update_edges(
        &mut self,
        output: Option<B::Body>,
        position: usize,
        context: &Context,
    ) -> UpdateResult {
        let target_count = match self.edge.as_mut() {
            Some(edge) => edge.compare_and_update(output, position, context).target_count,
            None => {
                let Some(body) = output else {
                    fatal(NodeError::MissingOutput {
                        node: self.core.display_name().to_owned(),
                    })
                };
                let edge = <B::Body as Element>::Node::make_node(body, position, context);
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

    fn persist(&mut self, element: Option<E>, context: &Context, position: usize) {
        if let Some(element) = element {
            self.element = element;
        }
        self.context = Some(context.for_replay());
        self.position = position;
    }
}

impl<E: Element, B: BodyStrategy<E>> Replay for RefCell<UserShape<E, B>> {
    fn replay(&self) -> bool {
        match self.try_borrow_mut() {
            Ok(mut shape) => shape.replay(),
            Err(_) => {
                log::debug!(
                    target: "scarlet::state",
                    "{} is being updated, replay skipped",
                    type_name::<E>()
                );
                false
            }
        }
    }
}

/// Node of a body-bearing element. The shape is shared with the state
/// locations it installs (weakly) so they can replay it.
pub struct BodyNode<E: Element, B: BodyStrategy<E>> {
    key: NodeKey,
    display_name: &'static str,
    shape: Rc<RefCell<UserShape<E, B>>>,
}

impl<E: Element, B: BodyStrategy<E>> BodyNode<E, B> {
    /// Last installed element.
    pub fn element(&self) -> E {
        self.shape.borrow().element.clone()
    }
}

impl<E: Element, B: BodyStrategy<E>> AnyNode for BodyNode<E, B> {
    fn key(&self) -> NodeKey {
        self.key
    }

    fn display_name(&self) -> &'static str {
        self.display_name
    }

    fn element_type(&self) -> &'static str {
        type_name::<E>()
    }

    fn target(&self) -> Option<TargetRef> {
        self.shape.borrow().core().target().cloned()
    }

    fn target_count(&self) -> usize {
        self.shape.borrow().core().target_count()
    }

    fn visit_edges(&self, visitor: &mut dyn FnMut(&dyn AnyNode)) {
        self.shape.borrow().visit_edges(visitor);
    }

    fn update_any(
        &mut self,
        element: Option<&dyn AnyElement>,
        position: usize,
        context: &Context,
    ) -> UpdateResult {
        update_erased(self, element, position, context)
    }
}

impl<E: Element, B: BodyStrategy<E>> ElementNode for BodyNode<E, B> {
    type Element = E;

    fn make_node(element: E, position: usize, context: &Context) -> Self {
        let shape = Rc::new_cyclic(|this| {
            RefCell::new(UserShape {
                core: NodeCore::new::<E>(),
                this: Weak::clone(this),
                element,
                context: None,
                position,
                edge: None,
                _strategy: PhantomData,
            })
        });
        let result = shape.borrow_mut().mount(position, context);
        let (key, display_name) = {
            let shape = shape.borrow();
            attach(shape.core(), context, result.target_position);
            (shape.core().key(), shape.core().display_name())
        };
        Self {
            key,
            display_name,
            shape,
        }
    }

    fn compare_and_update(
        &mut self,
        element: Option<E>,
        position: usize,
        context: &Context,
    ) -> UpdateResult {
        self.shape
            .borrow_mut()
            .compare_and_update(element, position, context)
    }
}
