use std::fmt;
use std::rc::Rc;

use crate::attributes::{AttributesStash, StashedAttribute};
use crate::element::AnyElement;
use crate::environment::{EnvironmentDiff, EnvironmentValues};
use crate::runtime::RuntimeHandle;
use crate::target::TargetRef;
use crate::{fatal, NodeError, NodeKey};

/// Observes node derivations. Mostly useful in tests to check which
/// elements were re-derived by a pass.
pub trait UpdateObserver {
    fn did_make(&self, key: NodeKey, display_name: &'static str);
}

struct ContentFrame {
    content: Rc<dyn AnyElement>,
    changed: bool,
    parent: Option<Rc<ContentFrame>>,
}

/// Modifier content handed to the placeholder inside a modifier body.
#[derive(Clone)]
pub struct PoppedContent {
    pub content: Rc<dyn AnyElement>,
    /// Whether the wrapping modifier node produced a fresh content element
    /// this pass.
    pub changed: bool,
}

#[derive(Clone)]
struct Services {
    runtime: RuntimeHandle,
    observer: Option<Rc<dyn UpdateObserver>>,
}

/// Everything threaded from a node to its edges during one pass.
///
/// Contexts are values: every `*ing` method returns a modified copy and
/// leaves `self` untouched. The maps inside are shared until written.
#[derive(Clone)]
pub struct Context {
    attributes: AttributesStash,
    modifier_contents: Option<Rc<ContentFrame>>,
    has_state_changed: bool,
    environment: EnvironmentValues,
    changed_environment: EnvironmentDiff,
    host: Option<TargetRef>,
    services: Services,
}

impl Context {
    pub fn root(runtime: RuntimeHandle) -> Self {
        Self {
            attributes: AttributesStash::default(),
            modifier_contents: None,
            has_state_changed: false,
            environment: EnvironmentValues::default(),
            changed_environment: EnvironmentDiff::default(),
            host: None,
            services: Services {
                runtime,
                observer: None,
            },
        }
    }

    pub fn with_observer(mut self, observer: Rc<dyn UpdateObserver>) -> Self {
        self.services.observer = Some(observer);
        self
    }

    pub fn environment(&self) -> &EnvironmentValues {
        &self.environment
    }

    pub fn changed_environment(&self) -> &EnvironmentDiff {
        &self.changed_environment
    }

    pub fn has_state_changed(&self) -> bool {
        self.has_state_changed
    }

    /// Target of the nearest substantial ancestor.
    pub fn host(&self) -> Option<&TargetRef> {
        self.host.as_ref()
    }

    pub fn runtime(&self) -> &RuntimeHandle {
        &self.services.runtime
    }

    pub fn with_host(&self, host: TargetRef) -> Self {
        Self {
            host: Some(host),
            ..self.clone()
        }
    }

    pub fn setting_state_change(&self) -> Self {
        Self {
            has_state_changed: true,
            ..self.clone()
        }
    }

    pub fn clearing_state_change(&self) -> Self {
        if !self.has_state_changed {
            return self.clone();
        }
        Self {
            has_state_changed: false,
            ..self.clone()
        }
    }

    pub fn with_environment(&self, environment: EnvironmentValues, changed: EnvironmentDiff) -> Self {
        Self {
            environment,
            changed_environment: changed,
            ..self.clone()
        }
    }

    /// The context a stateful node keeps for replaying itself later: no
    /// pending state change, no environment change.
    pub fn for_replay(&self) -> Self {
        Self {
            has_state_changed: false,
            changed_environment: EnvironmentDiff::default(),
            ..self.clone()
        }
    }

    pub fn completing_attributes(&self, own: &AttributesStash) -> Self {
        Self {
            attributes: self.attributes.completing(own),
            ..self.clone()
        }
    }

    pub fn popping_attributes(&self, target: Option<&TargetRef>) -> (Vec<StashedAttribute>, Self) {
        let (applicable, remaining) = self.attributes.popping(target);
        (
            applicable,
            Self {
                attributes: remaining,
                ..self.clone()
            },
        )
    }

    pub fn pushing_modifier_content(&self, content: Rc<dyn AnyElement>, changed: bool) -> Self {
        Self {
            modifier_contents: Some(Rc::new(ContentFrame {
                content,
                changed,
                parent: self.modifier_contents.clone(),
            })),
            ..self.clone()
        }
    }

    /// Takes the innermost modifier content. Panics when no modifier
    /// encloses the caller.
    pub fn popping_modifier_content(&self, node: &str) -> (PoppedContent, Self) {
        let Some(frame) = &self.modifier_contents else {
            fatal(NodeError::EmptyModifierStack {
                node: node.to_owned(),
            })
        };
        (
            PoppedContent {
                content: Rc::clone(&frame.content),
                changed: frame.changed,
            },
            Self {
                modifier_contents: frame.parent.clone(),
                ..self.clone()
            },
        )
    }

    pub fn modifier_depth(&self) -> usize {
        let mut depth = 0;
        let mut frame = self.modifier_contents.as_deref();
        while let Some(current) = frame {
            depth += 1;
            frame = current.parent.as_deref();
        }
        depth
    }

    pub(crate) fn did_make(&self, key: NodeKey, display_name: &'static str) {
        if let Some(observer) = &self.services.observer {
            observer.did_make(key, display_name);
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("attributes", &self.attributes)
            .field("modifier_contents", &self.modifier_depth())
            .field("has_state_changed", &self.has_state_changed)
            .field("environment", &self.environment)
            .field("changed_environment", &self.changed_environment)
            .field("has_host", &self.host.is_some())
            .finish()
    }
}
