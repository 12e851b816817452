//! Elements: immutable descriptions of what should exist at one position.

use std::any::{type_name, Any};
use std::rc::Rc;

use crate::attributes::{short_type_name, AttributeField, AttributeSetter};
use crate::context::Context;
use crate::environment::EnvironmentKey;
use crate::equality::ElementEq;
use crate::node::{AnyNode, ElementNode};
use crate::nodes::{
    ConditionalNode, EnvironmentNode, LeafNode, ModifiedNode, ModifierContentNode, OptionalNode,
    StaticNode,
};
use crate::properties::ElementFields;
use crate::target::{MaybeTarget, NoTarget};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    App,
    Scene,
    View,
    ViewModifier,
}

/// An immutable description of one position in the tree.
///
/// `Node` fixes the topology of that position; `Target` decides whether the
/// node is substantial ([`NoTarget`] for elements without a target).
pub trait Element: ElementEq + ElementFields + Clone + 'static {
    type Node: ElementNode<Element = Self>;
    type Target: MaybeTarget;

    const KIND: ElementKind = ElementKind::View;

    fn display_name() -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

/// User element expanding into a body (apps, scenes and views).
pub trait Component: Element {
    type Body: Element;

    fn body(&self) -> Self::Body;
}

/// Modifier element whose body wraps the modified content, represented by
/// the [`ModifierContent`] placeholder.
pub trait ViewModifier: Element {
    type Body: Element;

    fn body(&self, content: ModifierContent) -> Self::Body;
}

/// Type-erased element. Only modifier content travels this way.
pub trait AnyElement: 'static {
    fn as_any(&self) -> &dyn Any;

    fn element_type(&self) -> &'static str;

    fn make_any_node(&self, position: usize, context: &Context) -> Box<dyn AnyNode>;
}

impl<E: Element> AnyElement for E {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn element_type(&self) -> &'static str {
        type_name::<E>()
    }

    fn make_any_node(&self, position: usize, context: &Context) -> Box<dyn AnyNode> {
        Box::new(E::Node::make_node(self.clone(), position, context))
    }
}

/// The empty element.
impl Element for () {
    type Node = LeafNode<()>;
    type Target = NoTarget;
}

impl ElementFields for () {}

impl<E: Element> Element for Option<E> {
    type Node = OptionalNode<E>;
    type Target = NoTarget;

    fn display_name() -> &'static str {
        "Optional"
    }
}

impl<E: Element> ElementFields for Option<E> {}

/// One of two element types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Either<A, B> {
    First(A),
    Second(B),
}

impl<A: ElementEq, B: ElementEq> ElementEq for Either<A, B> {
    fn any_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Either::First(a), Either::First(b)) => a.any_eq(b),
            (Either::Second(a), Either::Second(b)) => a.any_eq(b),
            _ => false,
        }
    }

    fn element_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Either::First(a), Either::First(b)) => a.element_eq(b),
            (Either::Second(a), Either::Second(b)) => a.element_eq(b),
            _ => false,
        }
    }
}

impl<A: Element, B: Element> Element for Either<A, B> {
    type Node = ConditionalNode<A, B>;
    type Target = NoTarget;

    fn display_name() -> &'static str {
        "Conditional"
    }
}

impl<A: Element, B: Element> ElementFields for Either<A, B> {}

/// Sets environment key `K` for `content` and everything below it.
pub struct WithEnvironment<K: EnvironmentKey, C> {
    pub value: K::Value,
    pub content: C,
}

impl<K: EnvironmentKey, C> WithEnvironment<K, C> {
    pub fn new(value: K::Value, content: C) -> Self {
        Self { value, content }
    }
}

impl<K: EnvironmentKey, C: Clone> Clone for WithEnvironment<K, C> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            content: self.content.clone(),
        }
    }
}

impl<K: EnvironmentKey, C: ElementEq> ElementEq for WithEnvironment<K, C> {
    fn any_eq(&self, other: &Self) -> bool {
        self.value.any_eq(&other.value) && self.content.any_eq(&other.content)
    }

    fn element_eq(&self, other: &Self) -> bool {
        self.value.element_eq(&other.value) && self.content.element_eq(&other.content)
    }
}

impl<K: EnvironmentKey, C: Element> Element for WithEnvironment<K, C> {
    type Node = EnvironmentNode<K, C>;
    type Target = NoTarget;

    fn display_name() -> &'static str {
        "Environment"
    }
}

impl<K: EnvironmentKey, C: Element> ElementFields for WithEnvironment<K, C> {}

/// `content` wrapped by `modifier`.
#[derive(Clone)]
pub struct Modified<C, M> {
    pub content: C,
    pub modifier: M,
}

impl<C: ElementEq, M: ElementEq> ElementEq for Modified<C, M> {
    fn any_eq(&self, other: &Self) -> bool {
        self.content.any_eq(&other.content) && self.modifier.any_eq(&other.modifier)
    }

    fn element_eq(&self, other: &Self) -> bool {
        self.content.element_eq(&other.content) && self.modifier.element_eq(&other.modifier)
    }
}

impl<C: Element, M: Element> Element for Modified<C, M> {
    type Node = ModifiedNode<C, M>;
    type Target = NoTarget;

    fn display_name() -> &'static str {
        "Modified"
    }
}

impl<C: Element, M: Element> ElementFields for Modified<C, M> {}

/// Stands for the content of the enclosing modifier inside its body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModifierContent;

impl ElementEq for ModifierContent {
    fn any_eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Element for ModifierContent {
    type Node = ModifierContentNode;
    type Target = NoTarget;
    const KIND: ElementKind = ElementKind::ViewModifier;
}

impl ElementFields for ModifierContent {}

/// Declares attribute `attribute` for the first compatible target inside
/// `content`.
#[derive(Clone)]
pub struct Attributed<C, A> {
    pub content: C,
    pub attribute: A,
}

impl<C: ElementEq, A: ElementEq> ElementEq for Attributed<C, A> {
    fn any_eq(&self, other: &Self) -> bool {
        self.attribute.any_eq(&other.attribute) && self.content.any_eq(&other.content)
    }

    fn element_eq(&self, other: &Self) -> bool {
        self.attribute.element_eq(&other.attribute) && self.content.element_eq(&other.content)
    }
}

impl<C: Element, A: AttributeField + ElementEq + Clone + 'static> Element for Attributed<C, A> {
    type Node = StaticNode<Self>;
    type Target = NoTarget;

    fn display_name() -> &'static str {
        "Attributed"
    }
}

impl<C: Element, A: AttributeField> ElementFields for Attributed<C, A> {
    fn collect_attributes(&self, attributes: &mut Vec<Rc<dyn AttributeSetter>>) {
        self.attribute.collect(attributes);
    }
}

/// Combinators available on every element.
pub trait ElementExt: Element + Sized {
    fn modifier<M: Element>(self, modifier: M) -> Modified<Self, M> {
        Modified {
            content: self,
            modifier,
        }
    }

    fn environment<K: EnvironmentKey>(self, value: K::Value) -> WithEnvironment<K, Self> {
        WithEnvironment::new(value, self)
    }

    fn attribute<A: AttributeField + ElementEq + Clone + 'static>(
        self,
        attribute: A,
    ) -> Attributed<Self, A> {
        Attributed {
            content: self,
            attribute,
        }
    }
}

impl<E: Element> ElementExt for E {}
