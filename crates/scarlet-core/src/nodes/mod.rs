//! One node shape per element topology.

mod conditional;
mod dynamic;
mod environment;
mod fixed;
mod leaf;
mod modifier;
mod optional;
mod user;

pub use conditional::ConditionalShape;
pub use dynamic::{DynamicShape, ForEach};
pub use environment::EnvironmentShape;
pub use fixed::{Edges, StaticElement, StaticShape};
pub use leaf::LeafShape;
pub use modifier::{ModifiedShape, ModifierContentShape};
pub use optional::OptionalShape;
pub use user::{BodyNode, BodyStrategy, ComponentBody, ModifierBody, UserShape};

use crate::node::ShapeNode;

pub type LeafNode<E> = ShapeNode<LeafShape<E>>;
pub type StaticNode<E> = ShapeNode<StaticShape<E>>;
pub type OptionalNode<E> = ShapeNode<OptionalShape<E>>;
pub type ConditionalNode<A, B> = ShapeNode<ConditionalShape<A, B>>;
pub type EnvironmentNode<K, C> = ShapeNode<EnvironmentShape<K, C>>;
pub type ModifiedNode<C, M> = ShapeNode<ModifiedShape<C, M>>;
pub type ModifierContentNode = ShapeNode<ModifierContentShape>;
pub type DynamicNode<Id, E> = ShapeNode<DynamicShape<Id, E>>;
pub type UserNode<V> = BodyNode<V, ComponentBody>;
pub type ModifierNode<M> = BodyNode<M, ModifierBody>;
