//! Attributes: values declared on elements and written into the first
//! compatible target below them.
//!
//! A *discarding* [`Attribute`] holds one value per target slot; the
//! outermost declaration wins unless it propagates. An *accumulating*
//! [`AppendAttribute`] contributes one entry per declaring node into an
//! [`AttributeList`] on the target, so several ancestors can each own and
//! update their own entry.

use std::any::{type_name, TypeId};
use std::fmt;
use std::rc::Rc;

use crate::collections::OrderedMap;
use crate::equality::ElementEq;
use crate::target::{TargetNode, TargetRef};
use crate::{fatal, NodeError, NodeKey};

/// Identifies one attribute slot on one target type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeTarget {
    pub target_type: TypeId,
    pub target_name: &'static str,
    pub name: &'static str,
}

impl AttributeTarget {
    pub fn of<T: 'static>(name: &'static str) -> Self {
        Self {
            target_type: TypeId::of::<T>(),
            target_name: short_type_name(type_name::<T>()),
            name,
        }
    }
}

impl fmt::Debug for AttributeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target_name, self.name)
    }
}

#[derive(Clone, Debug, Default)]
pub enum AttributeValue<V> {
    #[default]
    Unset,
    Set(V),
}

impl<V> AttributeValue<V> {
    pub fn as_set(&self) -> Option<&V> {
        match self {
            AttributeValue::Set(value) => Some(value),
            AttributeValue::Unset => None,
        }
    }
}

impl<V> From<Option<V>> for AttributeValue<V> {
    fn from(value: Option<V>) -> Self {
        value.map_or(AttributeValue::Unset, AttributeValue::Set)
    }
}

impl<V: ElementEq> ElementEq for AttributeValue<V> {
    fn any_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttributeValue::Set(a), AttributeValue::Set(b)) => a.any_eq(b),
            (AttributeValue::Unset, AttributeValue::Unset) => true,
            _ => false,
        }
    }
}

/// Getter and setter for a single-value attribute on target `T`.
///
/// The setter is only called when the value actually changes, so targets
/// may observe writes in it.
pub struct Slot<T, V> {
    pub name: &'static str,
    pub get: fn(&T) -> &V,
    pub set: fn(&mut T, V),
}

impl<T, V> Slot<T, V> {
    pub const fn new(name: &'static str, get: fn(&T) -> &V, set: fn(&mut T, V)) -> Self {
        Self { name, get, set }
    }
}

impl<T, V> Clone for Slot<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for Slot<T, V> {}

/// Accessor for an accumulating attribute list on target `T`.
pub struct AppendSlot<T, V> {
    pub name: &'static str,
    pub list: fn(&mut T) -> &mut AttributeList<V>,
}

impl<T, V> AppendSlot<T, V> {
    pub const fn new(name: &'static str, list: fn(&mut T) -> &mut AttributeList<V>) -> Self {
        Self { name, list }
    }
}

impl<T, V> Clone for AppendSlot<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for AppendSlot<T, V> {}

/// Object-safe view of one attribute declaration.
pub trait AttributeSetter: 'static {
    fn target(&self) -> AttributeTarget;

    /// Whether a consuming target leaves the value for its descendants too.
    fn propagate(&self) -> bool;

    fn is_accumulating(&self) -> bool;

    /// Writes the value into `target`. Returns `true` if anything changed.
    fn apply(&self, target: &mut dyn TargetNode, source: NodeKey) -> bool;

    /// Drops whatever `source` previously wrote through this declaration.
    /// Only accumulating attributes own per-source state.
    fn retract(&self, _target: &mut dyn TargetNode, _source: NodeKey) -> bool {
        false
    }

    fn describe(&self) -> String;
}

/// Stands in for an accumulating declaration its node no longer makes.
struct Retraction(Rc<dyn AttributeSetter>);

impl AttributeSetter for Retraction {
    fn target(&self) -> AttributeTarget {
        self.0.target()
    }

    fn propagate(&self) -> bool {
        self.0.propagate()
    }

    fn is_accumulating(&self) -> bool {
        true
    }

    fn apply(&self, target: &mut dyn TargetNode, source: NodeKey) -> bool {
        self.0.retract(target, source)
    }

    fn describe(&self) -> String {
        format!("{} (retracted)", self.0.describe())
    }
}

fn facet_of<'a, T: 'static>(target: &'a mut dyn TargetNode, attribute: AttributeTarget) -> &'a mut T {
    let display_name = target.display_name().to_owned();
    match target
        .facet_mut(TypeId::of::<T>())
        .and_then(|facet| facet.downcast_mut::<T>())
    {
        Some(facet) => facet,
        None => fatal(NodeError::FacetMismatch {
            target: display_name,
            expected: type_name::<T>(),
            attribute: format!("{attribute:?}"),
        }),
    }
}

pub struct Attribute<T, V> {
    slot: Slot<T, V>,
    value: AttributeValue<V>,
    propagate: bool,
}

impl<T: 'static, V: Clone + ElementEq + 'static> Attribute<T, V> {
    pub fn new(slot: Slot<T, V>, value: impl Into<AttributeValue<V>>) -> Self {
        Self {
            slot,
            value: value.into(),
            propagate: false,
        }
    }

    pub fn set(slot: Slot<T, V>, value: V) -> Self {
        Self::new(slot, AttributeValue::Set(value))
    }

    pub fn unset(slot: Slot<T, V>) -> Self {
        Self::new(slot, AttributeValue::Unset)
    }

    pub fn propagating(mut self) -> Self {
        self.propagate = true;
        self
    }

    pub fn value(&self) -> &AttributeValue<V> {
        &self.value
    }
}

impl<T, V: Clone> Clone for Attribute<T, V> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot,
            value: self.value.clone(),
            propagate: self.propagate,
        }
    }
}

impl<T, V: ElementEq> ElementEq for Attribute<T, V> {
    fn any_eq(&self, other: &Self) -> bool {
        self.slot.name == other.slot.name
            && self.propagate == other.propagate
            && self.value.any_eq(&other.value)
    }
}

impl<T: 'static, V: Clone + ElementEq + 'static> AttributeSetter for Attribute<T, V> {
    fn target(&self) -> AttributeTarget {
        AttributeTarget::of::<T>(self.slot.name)
    }

    fn propagate(&self) -> bool {
        self.propagate
    }

    fn is_accumulating(&self) -> bool {
        false
    }

    fn apply(&self, target: &mut dyn TargetNode, _source: NodeKey) -> bool {
        let AttributeValue::Set(value) = &self.value else {
            return false;
        };
        let facet = facet_of::<T>(target, self.target());
        if (self.slot.get)(facet).any_eq(value) {
            return false;
        }
        (self.slot.set)(facet, value.clone());
        true
    }

    fn describe(&self) -> String {
        format!("{:?}", self.target())
    }
}

pub struct AppendAttribute<T, V> {
    slot: AppendSlot<T, V>,
    value: AttributeValue<V>,
    propagate: bool,
}

impl<T: 'static, V: Clone + ElementEq + 'static> AppendAttribute<T, V> {
    pub fn new(slot: AppendSlot<T, V>, value: impl Into<AttributeValue<V>>) -> Self {
        Self {
            slot,
            value: value.into(),
            propagate: false,
        }
    }

    pub fn set(slot: AppendSlot<T, V>, value: V) -> Self {
        Self::new(slot, AttributeValue::Set(value))
    }

    pub fn propagating(mut self) -> Self {
        self.propagate = true;
        self
    }
}

impl<T, V: Clone> Clone for AppendAttribute<T, V> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot,
            value: self.value.clone(),
            propagate: self.propagate,
        }
    }
}

impl<T, V: ElementEq> ElementEq for AppendAttribute<T, V> {
    fn any_eq(&self, other: &Self) -> bool {
        self.slot.name == other.slot.name
            && self.propagate == other.propagate
            && self.value.any_eq(&other.value)
    }
}

impl<T: 'static, V: Clone + ElementEq + 'static> AttributeSetter for AppendAttribute<T, V> {
    fn target(&self) -> AttributeTarget {
        AttributeTarget::of::<T>(self.slot.name)
    }

    fn propagate(&self) -> bool {
        self.propagate
    }

    fn is_accumulating(&self) -> bool {
        true
    }

    fn apply(&self, target: &mut dyn TargetNode, source: NodeKey) -> bool {
        let facet = facet_of::<T>(target, self.target());
        let list = (self.slot.list)(facet);
        match &self.value {
            AttributeValue::Set(value) => list.insert(source, value.clone()),
            AttributeValue::Unset => list.remove(source),
        }
    }

    fn retract(&self, target: &mut dyn TargetNode, source: NodeKey) -> bool {
        let facet = facet_of::<T>(target, self.target());
        (self.slot.list)(facet).remove(source)
    }

    fn describe(&self) -> String {
        format!("{:?}[+]", self.target())
    }
}

/// Element fields that contribute attributes. Implemented by the attribute
/// wrappers and used by `#[derive(ElementFields)]`.
pub trait AttributeField {
    fn collect(&self, attributes: &mut Vec<Rc<dyn AttributeSetter>>);
}

impl<T: 'static, V: Clone + ElementEq + 'static> AttributeField for Attribute<T, V> {
    fn collect(&self, attributes: &mut Vec<Rc<dyn AttributeSetter>>) {
        attributes.push(Rc::new(self.clone()));
    }
}

impl<T: 'static, V: Clone + ElementEq + 'static> AttributeField for AppendAttribute<T, V> {
    fn collect(&self, attributes: &mut Vec<Rc<dyn AttributeSetter>>) {
        attributes.push(Rc::new(self.clone()));
    }
}

impl<A: AttributeField> AttributeField for Option<A> {
    fn collect(&self, attributes: &mut Vec<Rc<dyn AttributeSetter>>) {
        if let Some(attribute) = self {
            attribute.collect(attributes);
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttributeEntry<V> {
    pub value: V,
    pub changed: bool,
}

/// Unordered multi-value attribute storage on a target, one entry per
/// contributing node.
#[derive(Clone, Debug)]
pub struct AttributeList<V> {
    entries: OrderedMap<NodeKey, AttributeEntry<V>>,
}

impl<V> Default for AttributeList<V> {
    fn default() -> Self {
        Self {
            entries: OrderedMap::default(),
        }
    }
}

impl<V: ElementEq> AttributeList<V> {
    /// Inserts or replaces the entry owned by `source`. Equal values leave
    /// the entry and its `changed` flag untouched.
    pub fn insert(&mut self, source: NodeKey, value: V) -> bool {
        match self.entries.get_mut(&source) {
            Some(entry) if entry.value.any_eq(&value) => false,
            Some(entry) => {
                entry.value = value;
                entry.changed = true;
                true
            }
            None => {
                self.entries.insert(
                    source,
                    AttributeEntry {
                        value,
                        changed: true,
                    },
                );
                true
            }
        }
    }
}

impl<V> AttributeList<V> {
    pub fn remove(&mut self, source: NodeKey) -> bool {
        self.entries.shift_remove(&source).is_some()
    }

    pub fn get(&self, source: NodeKey) -> Option<&AttributeEntry<V>> {
        self.entries.get(&source)
    }

    pub fn entries(&self) -> impl Iterator<Item = (NodeKey, &AttributeEntry<V>)> {
        self.entries.iter().map(|(key, entry)| (*key, entry))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().map(|entry| &entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset_changes(&mut self) {
        for entry in self.entries.values_mut() {
            entry.changed = false;
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum StashKey {
    Single(AttributeTarget),
    Accumulating(NodeKey, AttributeTarget),
}

/// A pending attribute together with the node that declared it.
#[derive(Clone)]
pub struct StashedAttribute {
    pub source: NodeKey,
    pub setter: Rc<dyn AttributeSetter>,
}

impl StashedAttribute {
    pub fn apply(&self, target: &TargetRef) -> bool {
        self.setter.apply(&mut *target.borrow_mut(), self.source)
    }
}

/// Pending attributes flowing down the tree. Cloning is cheap; the first
/// write after a clone copies the map.
#[derive(Clone, Default)]
pub struct AttributesStash {
    entries: Rc<OrderedMap<StashKey, StashedAttribute>>,
}

impl AttributesStash {
    pub fn collect(setters: Vec<Rc<dyn AttributeSetter>>, source: NodeKey) -> Self {
        let mut entries = OrderedMap::default();
        for setter in setters {
            let target = setter.target();
            let key = if setter.is_accumulating() {
                StashKey::Accumulating(source, target)
            } else {
                StashKey::Single(target)
            };
            entries.insert(key, StashedAttribute { source, setter });
        }
        Self {
            entries: Rc::new(entries),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `self` plus a retraction for every accumulating entry in `previous`
    /// that `self` no longer declares.
    pub fn retracting(&self, previous: &AttributesStash) -> AttributesStash {
        let mut result: Option<OrderedMap<StashKey, StashedAttribute>> = None;
        for (key, attribute) in previous.entries.iter() {
            if !matches!(key, StashKey::Accumulating(..)) || self.entries.contains_key(key) {
                continue;
            }
            log::trace!(
                target: "scarlet::attributes",
                "{} dropped by node {}",
                attribute.setter.describe(),
                attribute.source
            );
            result
                .get_or_insert_with(|| (*self.entries).clone())
                .insert(
                    *key,
                    StashedAttribute {
                        source: attribute.source,
                        setter: Rc::new(Retraction(Rc::clone(&attribute.setter))),
                    },
                );
        }
        match result {
            Some(entries) => AttributesStash {
                entries: Rc::new(entries),
            },
            None => self.clone(),
        }
    }

    /// Adds `own` entries whose slot is not already pending. Inherited
    /// entries come from ancestors and take precedence.
    pub fn completing(&self, own: &AttributesStash) -> AttributesStash {
        if own.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return own.clone();
        }
        let mut merged = self.clone();
        let entries = Rc::make_mut(&mut merged.entries);
        for (key, attribute) in own.entries.iter() {
            if !entries.contains_key(key) {
                entries.insert(*key, attribute.clone());
            }
        }
        merged
    }

    /// Splits the stash into the attributes `target` consumes and the
    /// remainder passed to edges. Without a target nothing is consumed.
    pub fn popping(&self, target: Option<&TargetRef>) -> (Vec<StashedAttribute>, AttributesStash) {
        let Some(target) = target else {
            return (Vec::new(), self.clone());
        };
        if self.is_empty() {
            return (Vec::new(), self.clone());
        }
        let target = target.borrow();
        let mut applicable = Vec::new();
        let mut remaining: Option<OrderedMap<StashKey, StashedAttribute>> = None;
        for (key, attribute) in self.entries.iter() {
            if !target.supports(attribute.setter.target().target_type) {
                continue;
            }
            applicable.push(attribute.clone());
            if !attribute.setter.propagate() {
                remaining
                    .get_or_insert_with(|| (*self.entries).clone())
                    .shift_remove(key);
            }
        }
        let remaining = match remaining {
            Some(entries) => AttributesStash {
                entries: Rc::new(entries),
            },
            None => self.clone(),
        };
        (applicable, remaining)
    }
}

impl fmt::Debug for AttributesStash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.values().map(|attribute| attribute.setter.describe()))
            .finish()
    }
}

pub(crate) fn short_type_name(name: &'static str) -> &'static str {
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_replaces_only_the_contributors_entry() {
        let mut list = AttributeList::default();
        assert!(list.insert(1, "outer"));
        assert!(list.insert(2, "inner"));
        list.reset_changes();

        assert!(!list.insert(1, "outer"));
        assert!(list.insert(2, "inner-changed"));

        assert_eq!(list.get(1).map(|e| e.changed), Some(false));
        assert_eq!(list.get(2).map(|e| e.changed), Some(true));
        assert_eq!(list.values().copied().collect::<Vec<_>>(), vec!["outer", "inner-changed"]);
    }

    #[test]
    fn removing_an_entry_keeps_the_others() {
        let mut list = AttributeList::default();
        list.insert(1, 10);
        list.insert(2, 20);
        assert!(list.remove(1));
        assert!(!list.remove(1));
        assert_eq!(list.len(), 1);
        assert_eq!(list.values().copied().collect::<Vec<_>>(), vec![20]);
    }

    #[test]
    fn short_type_name_strips_paths_and_generics() {
        assert_eq!(short_type_name("a::b::Text"), "Text");
        assert_eq!(short_type_name("a::Wrapper<b::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
