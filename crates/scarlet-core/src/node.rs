//! The node protocol: one generic update procedure shared by every shape.

use std::any::type_name;
use std::fmt::Write;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::attributes::AttributesStash;
use crate::context::Context;
use crate::element::{AnyElement, Element};
use crate::environment::{EnvironmentDiff, EnvironmentValues};
use crate::properties::ElementFields;
use crate::target::{MaybeTarget, TargetRef};
use crate::{fatal, NodeError, NodeKey};

static NEXT_NODE_KEY: AtomicUsize = AtomicUsize::new(1);

fn next_node_key() -> NodeKey {
    NEXT_NODE_KEY.fetch_add(1, Ordering::Relaxed)
}

/// Where a node's targets start and how many of them there are.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub target_position: usize,
    pub target_count: usize,
}

/// State every node shape carries.
pub struct NodeCore {
    key: NodeKey,
    display_name: &'static str,
    target: Option<TargetRef>,
    target_count: usize,
    attributes: AttributesStash,
}

impl NodeCore {
    pub fn new<E: Element>() -> Self {
        let display_name = E::display_name();
        let target = E::Target::create(display_name);
        let key = next_node_key();
        log::trace!(
            target: "scarlet::node",
            "creating {display_name}#{key}{}",
            if target.is_some() { " with target" } else { "" }
        );
        Self {
            key,
            display_name,
            target,
            target_count: 0,
            attributes: AttributesStash::default(),
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    pub fn target(&self) -> Option<&TargetRef> {
        self.target.as_ref()
    }

    pub fn is_substantial(&self) -> bool {
        self.target.is_some()
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }
}

/// Hooks a topology provides to the shared [`NodeShape::update`] procedure.
pub trait NodeShape: Sized + 'static {
    type Element: Element;
    type Output;

    fn core(&self) -> &NodeCore;

    fn core_mut(&mut self) -> &mut NodeCore;

    /// Derives this shape's edges from one element value.
    fn make(&self, element: &Self::Element) -> Self::Output;

    /// Updates (or creates) edges from `output`, or from nothing when the
    /// element was unchanged, starting at target position `position`.
    fn update_edges(
        &mut self,
        output: Option<Self::Output>,
        position: usize,
        context: &Context,
    ) -> UpdateResult;

    fn visit_edges(&self, visitor: &mut dyn FnMut(&dyn AnyNode));

    fn compare_environment(
        &mut self,
        _element: &Self::Element,
        context: &Context,
    ) -> (EnvironmentValues, EnvironmentDiff) {
        (
            context.environment().clone(),
            context.changed_environment().clone(),
        )
    }

    fn reset_environment_diff(&self, context: &Context) -> (EnvironmentValues, EnvironmentDiff) {
        (
            context.environment().clone(),
            context.changed_environment().clone(),
        )
    }

    /// Keeps what a later replay needs. `context` is the context this node
    /// received.
    fn persist(&mut self, _element: Option<Self::Element>, _context: &Context, _position: usize) {}

    fn update(
        &mut self,
        element: Option<Self::Element>,
        position: usize,
        context: &Context,
        initial: bool,
    ) -> UpdateResult {
        let key = self.core().key;
        let display_name = self.core().display_name;
        log::trace!(
            target: "scarlet::node",
            "updating {display_name}#{key} at {position} ({})",
            if element.is_some() { "element" } else { "no element" }
        );

        let (own, pending, environment, changed_environment) = match &element {
            Some(element) => {
                let mut setters = Vec::new();
                element.collect_attributes(&mut setters);
                let own = AttributesStash::collect(setters, key);
                let pending = own.retracting(&self.core().attributes);
                let (environment, changed) = self.compare_environment(element, context);
                (own, pending, environment, changed)
            }
            None => {
                let (environment, changed) = self.reset_environment_diff(context);
                let own = self.core().attributes.clone();
                (own.clone(), own, environment, changed)
            }
        };

        let target = self.core().target.clone();
        let (applicable, edges_context) = context
            .clearing_state_change()
            .completing_attributes(&pending)
            .with_environment(environment, changed_environment)
            .popping_attributes(target.as_ref());

        if let Some(target) = &target {
            for attribute in &applicable {
                if attribute.apply(target) {
                    log::trace!(
                        target: "scarlet::attributes",
                        "{} set on {display_name}#{key}",
                        attribute.setter.describe()
                    );
                } else {
                    log::trace!(
                        target: "scarlet::attributes",
                        "{} unchanged on {display_name}#{key}",
                        attribute.setter.describe()
                    );
                }
            }
            set_environment_attributes(target, &edges_context, initial);
        }

        let output = element.as_ref().map(|element| {
            edges_context.did_make(key, display_name);
            self.make(element)
        });

        let edges = match &target {
            Some(target) => {
                self.update_edges(output, 0, &edges_context.with_host(Rc::clone(target)))
            }
            None => self.update_edges(output, position, &edges_context),
        };
        let target_count = if target.is_some() {
            1
        } else {
            edges.target_count
        };

        let core = self.core_mut();
        core.target_count = target_count;
        core.attributes = own;
        self.persist(element, context, position);

        if initial {
            if let Some(target) = &target {
                target.borrow_mut().attributes_did_set();
            }
        }

        UpdateResult {
            target_position: position,
            target_count,
        }
    }
}

fn set_environment_attributes(target: &TargetRef, context: &Context, initial: bool) {
    // A fresh target takes every key in scope, even when it is created by a
    // replay whose diff has been cleared.
    let keys: Vec<_> = if initial {
        context.environment().keys().collect()
    } else {
        context
            .changed_environment()
            .entries()
            .filter(|(_, changed)| *changed)
            .map(|(key, _)| key)
            .collect()
    };
    for key in keys {
        if context
            .environment()
            .apply_to_target(key, &mut *target.borrow_mut())
        {
            log::trace!(
                target: "scarlet::environment",
                "{} applied to {}",
                context.environment().key_name(key),
                target.borrow().display_name()
            );
        }
    }
}

/// Object-safe view of any node.
pub trait AnyNode: 'static {
    fn key(&self) -> NodeKey;

    fn display_name(&self) -> &'static str;

    fn element_type(&self) -> &'static str;

    fn target(&self) -> Option<TargetRef>;

    fn target_count(&self) -> usize;

    fn visit_edges(&self, visitor: &mut dyn FnMut(&dyn AnyNode));

    /// Type-checked update through an erased element. A mismatched element
    /// type is fatal.
    fn update_any(
        &mut self,
        element: Option<&dyn AnyElement>,
        position: usize,
        context: &Context,
    ) -> UpdateResult;
}

/// Parent-facing node API, typed by element.
pub trait ElementNode: AnyNode {
    type Element: Element;

    /// Builds the node for `element`: installs it, runs the initial update
    /// and attaches the node's target to the host at the resulting position.
    fn make_node(element: Self::Element, position: usize, context: &Context) -> Self
    where
        Self: Sized;

    fn compare_and_update(
        &mut self,
        element: Option<Self::Element>,
        position: usize,
        context: &Context,
    ) -> UpdateResult;
}

pub fn downcast_element<E: Element>(element: &dyn AnyElement) -> Result<&E, NodeError> {
    element
        .as_any()
        .downcast_ref::<E>()
        .ok_or(NodeError::TypeMismatch {
            expected: type_name::<E>(),
            actual: element.element_type(),
        })
}

pub(crate) fn update_erased<N: ElementNode>(
    node: &mut N,
    element: Option<&dyn AnyElement>,
    position: usize,
    context: &Context,
) -> UpdateResult {
    let element = element.map(|element| match downcast_element::<N::Element>(element) {
        Ok(element) => element.clone(),
        Err(error) => fatal(error),
    });
    node.compare_and_update(element, position, context)
}

/// Shapes that never compare their own element: structural shapes whose
/// edges carry the comparison.
pub trait PassThroughShape: NodeShape {
    fn new(core: NodeCore) -> Self;

    /// Lets a shape skip derivation for an unchanged element.
    fn is_unchanged(&self, _element: &Self::Element) -> bool {
        false
    }
}

/// Node wrapper for [`PassThroughShape`]s.
pub struct ShapeNode<S> {
    shape: S,
}

impl<S> ShapeNode<S> {
    pub fn shape(&self) -> &S {
        &self.shape
    }
}

impl<S: PassThroughShape> AnyNode for ShapeNode<S> {
    fn key(&self) -> NodeKey {
        self.shape.core().key
    }

    fn display_name(&self) -> &'static str {
        self.shape.core().display_name
    }

    fn element_type(&self) -> &'static str {
        type_name::<S::Element>()
    }

    fn target(&self) -> Option<TargetRef> {
        self.shape.core().target.clone()
    }

    fn target_count(&self) -> usize {
        self.shape.core().target_count
    }

    fn visit_edges(&self, visitor: &mut dyn FnMut(&dyn AnyNode)) {
        self.shape.visit_edges(visitor);
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

impl<S: PassThroughShape> ElementNode for ShapeNode<S> {
    type Element = S::Element;

    fn make_node(element: S::Element, position: usize, context: &Context) -> Self {
        let mut shape = S::new(NodeCore::new::<S::Element>());
        let result = shape.update(Some(element), position, context, true);
        attach(shape.core(), context, result.target_position);
        Self { shape }
    }

    fn compare_and_update(
        &mut self,
        element: Option<S::Element>,
        position: usize,
        context: &Context,
    ) -> UpdateResult {
        match element {
            Some(element) if self.shape.is_unchanged(&element) => {
                log::trace!(
                    target: "scarlet::node",
                    "{}#{} unchanged",
                    self.shape.core().display_name,
                    self.shape.core().key
                );
                self.shape.update(None, position, context, false)
            }
            element => self.shape.update(element, position, context, false),
        }
    }
}

/// Entry point state locations use to re-run their owning node.
pub trait Replay {
    /// Replays the node with its stored element and context. Returns `true`
    /// if the node's target count changed, which leaves positions stored by
    /// its siblings and ancestors stale.
    fn replay(&self) -> bool;
}

pub(crate) fn attach(core: &NodeCore, context: &Context, position: usize) {
    let Some(target) = &core.target else {
        return;
    };
    match context.host() {
        Some(host) => {
            log::trace!(
                target: "scarlet::target",
                "inserting {}#{} into {} at {position}",
                core.display_name,
                core.key,
                host.borrow().display_name()
            );
            host.borrow_mut().insert_child(Rc::clone(target), position);
        }
        None => log::trace!(
            target: "scarlet::target",
            "{}#{} has no host, target left detached",
            core.display_name,
            core.key
        ),
    }
}

/// Removes every target `node` contributes to the host, `node`'s first
/// target sitting at `position`.
pub(crate) fn detach(node: &dyn AnyNode, context: &Context, position: usize) {
    if let Some(host) = context.host() {
        remove_targets(node, host, position);
    }
}

fn remove_targets(node: &dyn AnyNode, host: &TargetRef, position: usize) {
    if node.target().is_some() {
        log::trace!(
            target: "scarlet::target",
            "removing {}#{} from {} at {position}",
            node.display_name(),
            node.key(),
            host.borrow().display_name()
        );
        host.borrow_mut().remove_child(position);
        return;
    }
    // Each removal shifts the next sibling target into `position`.
    node.visit_edges(&mut |edge| remove_targets(edge, host, position));
}

/// Inserts every target `node` contributes back into the host starting at
/// `position`. Returns how many were inserted.
pub(crate) fn reattach(node: &dyn AnyNode, context: &Context, position: usize) -> usize {
    match context.host() {
        Some(host) => insert_targets(node, host, position),
        None => node.target_count(),
    }
}

fn insert_targets(node: &dyn AnyNode, host: &TargetRef, position: usize) -> usize {
    if let Some(target) = node.target() {
        host.borrow_mut().insert_child(target, position);
        return 1;
    }
    let mut count = 0;
    node.visit_edges(&mut |edge| count += insert_targets(edge, host, position + count));
    count
}

/// Indented dump of a node subtree.
pub fn dump_nodes(root: &dyn AnyNode) -> String {
    let mut output = String::new();
    dump_node(&mut output, root, 0);
    output
}

fn dump_node(output: &mut String, node: &dyn AnyNode, depth: usize) {
    let _ = writeln!(
        output,
        "{}{}#{} targets={}{}",
        "  ".repeat(depth),
        node.display_name(),
        node.key(),
        node.target_count(),
        if node.target().is_some() { " *" } else { "" }
    );
    node.visit_edges(&mut |edge| dump_node(output, edge, depth + 1));
}
