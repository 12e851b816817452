//! Environment values flowing down the element tree.
//!
//! Only environment-setter nodes write into the bag. Alongside it travels an
//! [`EnvironmentDiff`] recording, per key, whether the nearest setter changed
//! its value during the current pass; nodes reading a key use it to decide
//! whether they must re-derive although their element did not change.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::attributes::short_type_name;
use crate::collections::map::HashMap;
use crate::element::Element;
use crate::equality::ElementEq;
use crate::target::TargetNode;

pub trait EnvironmentKey: 'static {
    type Value: Clone + ElementEq + 'static;

    fn default_value() -> Self::Value;

    /// Keys that double as target attributes write themselves here. Returns
    /// `true` if the target changed.
    fn apply_to_target(_value: &Self::Value, _target: &mut dyn TargetNode) -> bool {
        false
    }
}

#[derive(Clone)]
struct EnvironmentEntry {
    name: &'static str,
    value: Rc<dyn Any>,
    apply: fn(&dyn Any, &mut dyn TargetNode) -> bool,
}

fn apply_erased<K: EnvironmentKey>(value: &dyn Any, target: &mut dyn TargetNode) -> bool {
    match value.downcast_ref::<K::Value>() {
        Some(value) => K::apply_to_target(value, target),
        None => false,
    }
}

/// Copy-on-write keyed value bag.
#[derive(Clone, Default)]
pub struct EnvironmentValues {
    values: Rc<HashMap<TypeId, EnvironmentEntry>>,
}

impl EnvironmentValues {
    pub fn get<K: EnvironmentKey>(&self) -> K::Value {
        self.values
            .get(&TypeId::of::<K>())
            .and_then(|entry| entry.value.downcast_ref::<K::Value>())
            .cloned()
            .unwrap_or_else(K::default_value)
    }

    pub fn contains<K: EnvironmentKey>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<K>())
    }

    pub fn set<K: EnvironmentKey>(&mut self, value: K::Value) {
        Rc::make_mut(&mut self.values).insert(
            TypeId::of::<K>(),
            EnvironmentEntry {
                name: short_type_name(std::any::type_name::<K>()),
                value: Rc::new(value),
                apply: apply_erased::<K>,
            },
        );
    }

    pub fn setting<K: EnvironmentKey>(&self, value: K::Value) -> Self {
        let mut values = self.clone();
        values.set::<K>(value);
        values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Applies the value stored for `key` to `target` if the key writes
    /// target attributes.
    pub(crate) fn apply_to_target(&self, key: TypeId, target: &mut dyn TargetNode) -> bool {
        match self.values.get(&key) {
            Some(entry) => (entry.apply)(&*entry.value, target),
            None => false,
        }
    }

    /// Every key an enclosing setter wrote.
    pub(crate) fn keys(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.values.keys().copied()
    }

    pub(crate) fn key_name(&self, key: TypeId) -> &'static str {
        self.values.get(&key).map_or("?", |entry| entry.name)
    }
}

impl fmt::Debug for EnvironmentValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.values.values().map(|entry| entry.name))
            .finish()
    }
}

/// Which environment keys changed during the current pass.
#[derive(Clone, Default)]
pub struct EnvironmentDiff {
    changed: Rc<HashMap<TypeId, bool>>,
}

impl EnvironmentDiff {
    pub fn is_changed(&self, key: TypeId) -> bool {
        self.changed.get(&key).copied().unwrap_or(false)
    }

    pub fn is_changed_key<K: EnvironmentKey>(&self) -> bool {
        self.is_changed(TypeId::of::<K>())
    }

    pub fn set(&mut self, key: TypeId, changed: bool) {
        if self.changed.get(&key) == Some(&changed) {
            return;
        }
        Rc::make_mut(&mut self.changed).insert(key, changed);
    }

    pub fn setting(&self, key: TypeId, changed: bool) -> Self {
        let mut diff = self.clone();
        diff.set(key, changed);
        diff
    }

    pub fn any_changed(&self, keys: &[TypeId]) -> bool {
        keys.iter().any(|key| self.is_changed(*key))
    }

    /// Every key set by an enclosing environment setter, with its flag.
    pub fn entries(&self) -> impl Iterator<Item = (TypeId, bool)> + '_ {
        self.changed.iter().map(|(key, changed)| (*key, *changed))
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

impl fmt::Debug for EnvironmentDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let changed = self.changed.values().filter(|changed| **changed).count();
        write!(f, "EnvironmentDiff({} keys, {} changed)", self.changed.len(), changed)
    }
}

thread_local! {
    static ENVIRONMENT_METADATA: RefCell<HashMap<TypeId, Rc<[TypeId]>>> =
        RefCell::new(HashMap::default());
}

/// Environment keys read by elements of type `E`, computed once per type.
pub fn environment_keys_of<E: Element>() -> Rc<[TypeId]> {
    let id = TypeId::of::<E>();
    if let Some(keys) = ENVIRONMENT_METADATA.with(|cache| cache.borrow().get(&id).cloned()) {
        return keys;
    }
    let mut keys = Vec::new();
    E::environment_keys(&mut keys);
    keys.sort();
    keys.dedup();
    let keys: Rc<[TypeId]> = keys.into();
    ENVIRONMENT_METADATA.with(|cache| cache.borrow_mut().insert(id, Rc::clone(&keys)));
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Accent;

    impl EnvironmentKey for Accent {
        type Value = u32;

        fn default_value() -> u32 {
            7
        }
    }

    #[test]
    fn missing_keys_read_their_default() {
        let values = EnvironmentValues::default();
        assert_eq!(values.get::<Accent>(), 7);
        assert!(!values.contains::<Accent>());
    }

    #[test]
    fn setting_copies_on_write() {
        let base = EnvironmentValues::default();
        let derived = base.setting::<Accent>(3);
        assert_eq!(base.get::<Accent>(), 7);
        assert_eq!(derived.get::<Accent>(), 3);
    }

    #[test]
    fn diff_tracks_individual_keys() {
        let diff = EnvironmentDiff::default().setting(TypeId::of::<Accent>(), true);
        assert!(diff.is_changed_key::<Accent>());
        assert!(!diff.is_changed(TypeId::of::<u8>()));
        let reset = diff.setting(TypeId::of::<Accent>(), false);
        assert!(!reset.is_changed_key::<Accent>());
        assert!(diff.is_changed_key::<Accent>());
    }
}
