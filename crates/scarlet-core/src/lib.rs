#![doc = r"Declarative element reconciliation: immutable element trees kept in sync with a mutable target tree."]

extern crate self as scarlet_core;

pub mod attributes;
pub mod collections;
pub mod context;
pub mod element;
pub mod environment;
pub mod equality;
pub mod graph;
pub mod hash;
pub mod node;
pub mod nodes;
pub mod platform;
pub mod properties;
pub mod runtime;
pub mod target;

pub use attributes::{
    AppendAttribute, AppendSlot, Attribute, AttributeField, AttributeList, AttributeSetter,
    AttributeTarget, AttributeValue, AttributesStash, Slot,
};
pub use context::{Context, UpdateObserver};
pub use element::{
    AnyElement, Attributed, Component, Either, Element, ElementExt, ElementKind, Modified,
    ModifierContent, ViewModifier, WithEnvironment,
};
pub use environment::{EnvironmentDiff, EnvironmentKey, EnvironmentValues};
pub use equality::{Callback, ElementEq};
pub use graph::{Graph, GraphBuilder};
pub use node::{dump_nodes, AnyNode, ElementNode, UpdateResult};
pub use nodes::{ForEach, ModifierNode, StaticElement, UserNode};
pub use platform::RuntimeScheduler;
pub use properties::{DynamicProperty, ElementFields, Environment, Installer, State};
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};
pub use target::{dump_targets, MaybeTarget, NoTarget, TargetNode, TargetRef};

#[cfg(test)]
pub use runtime::TestScheduler;

use std::fmt;

pub type NodeKey = usize;

/// Invariant violations. Reconciliation cannot continue past any of them, so
/// they surface through [`fatal`] rather than as results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeError {
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    MissingOutput {
        node: String,
    },
    EmptyModifierStack {
        node: String,
    },
    DuplicateId {
        node: String,
        id: String,
    },
    UninstalledProperty {
        property: &'static str,
    },
    FacetMismatch {
        target: String,
        expected: &'static str,
        attribute: String,
    },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::TypeMismatch { expected, actual } => {
                write!(f, "element type mismatch; expected {expected}, got {actual}")
            }
            NodeError::MissingOutput { node } => {
                write!(f, "{node} has no output to create its edges from")
            }
            NodeError::EmptyModifierStack { node } => {
                write!(f, "{node} used outside of a modifier body")
            }
            NodeError::DuplicateId { node, id } => {
                write!(f, "{node} received duplicate id {id}")
            }
            NodeError::UninstalledProperty { property } => {
                write!(f, "{property} written before installation")
            }
            NodeError::FacetMismatch {
                target,
                expected,
                attribute,
            } => write!(
                f,
                "{attribute} expects a {expected} target but was applied to {target}"
            ),
        }
    }
}

impl std::error::Error for NodeError {}

#[track_caller]
pub(crate) fn fatal(error: NodeError) -> ! {
    log::error!(target: "scarlet::node", "{error}");
    panic!("{error}")
}

#[cfg(test)]
#[path = "tests/fixtures.rs"]
mod test_fixtures;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod state_tests;

#[cfg(test)]
#[path = "tests/dynamic_tests.rs"]
mod dynamic_tests;
