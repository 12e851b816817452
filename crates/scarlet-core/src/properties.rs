//! Dynamic properties: element fields bound to storage that outlives the
//! element value.
//!
//! A node installs its element before deriving it. Installation walks the
//! element's dynamic properties and binds each to a location, reusing the
//! location held by the previously installed element when there is one.

use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::attributes::AttributeSetter;
use crate::environment::{EnvironmentDiff, EnvironmentKey, EnvironmentValues};
use crate::equality::ElementEq;
use crate::node::Replay;
use crate::runtime::RuntimeHandle;
use crate::{fatal, NodeError, NodeKey};

pub use scarlet_macros::ElementFields;

/// Field visitor for elements, normally produced by
/// `#[derive(ElementFields)]`.
pub trait ElementFields {
    fn collect_attributes(&self, _attributes: &mut Vec<Rc<dyn AttributeSetter>>) {}

    /// Binds every dynamic property of `self` to storage, taking existing
    /// locations from `installed`, the element this node installed last.
    fn install_dynamic_properties(&mut self, _installed: &Self, _installer: &Installer<'_>) {}

    /// Environment keys read by this element type.
    fn environment_keys(_keys: &mut Vec<TypeId>)
    where
        Self: Sized,
    {
    }
}

pub trait DynamicProperty {
    fn install(&mut self, installed: &Self, installer: &Installer<'_>);

    fn environment_keys(_keys: &mut Vec<TypeId>)
    where
        Self: Sized,
    {
    }
}

/// What a dynamic property needs to bind itself to its owning node.
pub struct Installer<'a> {
    pub(crate) owner: NodeKey,
    pub(crate) replay: Weak<dyn Replay>,
    pub(crate) runtime: RuntimeHandle,
    pub(crate) environment: &'a EnvironmentValues,
    pub(crate) changed_environment: &'a EnvironmentDiff,
    pub(crate) first: bool,
}

impl Installer<'_> {
    pub fn owner(&self) -> NodeKey {
        self.owner
    }

    pub fn is_first_installation(&self) -> bool {
        self.first
    }

    pub fn environment(&self) -> &EnvironmentValues {
        self.environment
    }

    pub fn changed_environment(&self) -> &EnvironmentDiff {
        self.changed_environment
    }
}

/// Persistent storage behind a [`State`].
pub struct StateLocation<T> {
    value: RefCell<T>,
    owner: NodeKey,
    replay: Weak<dyn Replay>,
    runtime: RuntimeHandle,
}

impl<T: Clone + ElementEq + 'static> StateLocation<T> {
    fn get(&self) -> T {
        self.value.borrow().clone()
    }

    fn set(&self, value: T) {
        if self.value.borrow().element_eq(&value) {
            log::trace!(target: "scarlet::state", "state of node {} unchanged", self.owner);
            return;
        }
        *self.value.borrow_mut() = value;
        self.invalidate();
    }

    fn invalidate(&self) {
        if self.replay.strong_count() == 0 {
            log::debug!(
                target: "scarlet::state",
                "state written after node {} was destroyed",
                self.owner
            );
            return;
        }
        log::trace!(target: "scarlet::state", "invalidating node {}", self.owner);
        self.runtime
            .register_invalid_node(self.owner, Weak::clone(&self.replay));
    }
}

/// Node-local state. Declared with a default on the element; the value
/// survives re-derivations of the element for as long as its node lives.
pub struct State<T> {
    default: T,
    location: Option<Rc<StateLocation<T>>>,
}

impl<T: Clone + ElementEq + 'static> State<T> {
    pub fn new(default: T) -> Self {
        Self {
            default,
            location: None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.location.is_some()
    }

    /// Current value, or the declared default before installation.
    pub fn get(&self) -> T {
        match &self.location {
            Some(location) => location.get(),
            None => self.default.clone(),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match &self.location {
            Some(location) => f(&location.value.borrow()),
            None => f(&self.default),
        }
    }

    /// Stores `value` and schedules a replay of the owning node unless the
    /// value is unchanged.
    pub fn set(&self, value: T) {
        self.location().set(value);
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let location = self.location();
        let mut value = location.get();
        f(&mut value);
        location.set(value);
    }

    fn location(&self) -> &StateLocation<T> {
        match &self.location {
            Some(location) => location,
            None => fatal(NodeError::UninstalledProperty {
                property: type_name::<Self>(),
            }),
        }
    }
}

impl<T: Clone> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            default: self.default.clone(),
            location: self.location.clone(),
        }
    }
}

impl<T: Default + Clone + ElementEq + 'static> Default for State<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + ElementEq + 'static> ElementEq for State<T> {
    fn any_eq(&self, other: &Self) -> bool {
        match (&self.location, &other.location) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => self.default.any_eq(&other.default),
            _ => false,
        }
    }

    fn element_eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T: Clone + ElementEq + 'static> DynamicProperty for State<T> {
    fn install(&mut self, installed: &Self, installer: &Installer<'_>) {
        self.location = match &installed.location {
            Some(location) => Some(Rc::clone(location)),
            None => {
                log::trace!(
                    target: "scarlet::state",
                    "binding {} to node {}",
                    type_name::<T>(),
                    installer.owner
                );
                Some(Rc::new(StateLocation {
                    value: RefCell::new(installed.default.clone()),
                    owner: installer.owner,
                    replay: Weak::clone(&installer.replay),
                    runtime: installer.runtime.clone(),
                }))
            }
        };
    }
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "State({:?})", location.value.borrow()),
            None => write!(f, "State(default: {:?})", self.default),
        }
    }
}

/// Read of an environment value, bound when the owning node installs.
pub struct Environment<K: EnvironmentKey> {
    location: Option<Rc<RefCell<K::Value>>>,
}

impl<K: EnvironmentKey> Environment<K> {
    pub fn new() -> Self {
        Self { location: None }
    }

    pub fn get(&self) -> K::Value {
        match &self.location {
            Some(location) => location.borrow().clone(),
            None => fatal(NodeError::UninstalledProperty {
                property: type_name::<Self>(),
            }),
        }
    }
}

impl<K: EnvironmentKey> Default for Environment<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EnvironmentKey> Clone for Environment<K> {
    fn clone(&self) -> Self {
        Self {
            location: self.location.clone(),
        }
    }
}

impl<K: EnvironmentKey> ElementEq for Environment<K> {
    fn any_eq(&self, other: &Self) -> bool {
        match (&self.location, &other.location) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    fn element_eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<K: EnvironmentKey> DynamicProperty for Environment<K> {
    fn install(&mut self, installed: &Self, installer: &Installer<'_>) {
        match &installed.location {
            None => {
                let value = installer.environment.get::<K>();
                self.location = Some(Rc::new(RefCell::new(value)));
            }
            Some(location) => {
                if installer.first || installer.changed_environment.is_changed_key::<K>() {
                    log::trace!(
                        target: "scarlet::environment",
                        "refreshing {} for node {}",
                        type_name::<K>(),
                        installer.owner
                    );
                    *location.borrow_mut() = installer.environment.get::<K>();
                }
                self.location = Some(Rc::clone(location));
            }
        }
    }

    fn environment_keys(keys: &mut Vec<TypeId>) {
        keys.push(TypeId::of::<K>());
    }
}

impl<K: EnvironmentKey> fmt::Debug for Environment<K>
where
    K::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "Environment({:?})", location.borrow()),
            None => f.write_str("Environment(unbound)"),
        }
    }
}
