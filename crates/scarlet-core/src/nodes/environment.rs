use std::any::{type_name, TypeId};

use crate::context::Context;
use crate::element::{Element, WithEnvironment};
use crate::environment::{EnvironmentDiff, EnvironmentKey, EnvironmentValues};
use crate::equality::ElementEq;
use crate::node::{AnyNode, ElementNode, NodeCore, NodeShape, PassThroughShape, UpdateResult};
use crate::{fatal, NodeError};

/// Writes one environment key for its content. The only shape that changes
/// environment values.
pub struct EnvironmentShape<K: EnvironmentKey, C: Element> {
    core: NodeCore,
    value: Option<K::Value>,
    edge: Option<C::Node>,
}

impl<K: EnvironmentKey, C: Element> NodeShape for EnvironmentShape<K, C> {
    type Element = WithEnvironment<K, C>;
    type Output = C;

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn make(&self, element: &WithEnvironment<K, C>) -> C {
        element.content.clone()
    }

    fn update_edges(&mut self, output: Option<C>, position: usize, context: &Context) -> UpdateResult {
        let target_count = match self.edge.as_mut() {
            Some(edge) => edge.compare_and_update(output, position, context).target_count,
            None => {
                let Some(content) = output else {
                    fatal(NodeError::MissingOutput {
                        node: self.core.display_name().to_owned(),
                    })
                };
                let edge = C::Node::make_node(content, position, context);
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

    fn compare_environment(
        &mut self,
        element: &WithEnvironment<K, C>,
        context: &Context,
    ) -> (EnvironmentValues, EnvironmentDiff) {
        let changed = self
            .value
            .as_ref()
            .map_or(true, |previous| !previous.any_eq(&element.value));
        if changed {
            log::debug!(
                target: "scarlet::environment",
                "{} changed by {}#{}",
                type_name::<K>(),
                self.core.display_name(),
                self.core.key()
            );
        }
        self.value = Some(element.value.clone());
        (
            context.environment().setting::<K>(element.value.clone()),
            context.changed_environment().setting(TypeId::of::<K>(), changed),
        )
    }

    fn reset_environment_diff(&self, context: &Context) -> (EnvironmentValues, EnvironmentDiff) {
        let environment = match &self.value {
            Some(value) if !context.environment().get::<K>().any_eq(value) => {
                context.environment().setting::<K>(value.clone())
            }
            _ => context.environment().clone(),
        };
        (
            environment,
            context.changed_environment().setting(TypeId::of::<K>(), false),
        )
    }
}

impl<K: EnvironmentKey, C: Element> PassThroughShape for EnvironmentShape<K, C> {
    fn new(core: NodeCore) -> Self {
        Self {
            core,
            value: None,
            edge: None,
        }
    }
}
