use std::hash::Hash;
use std::rc::Rc;

use crate::collections::map::HashSet;
use crate::collections::OrderedMap;
use crate::context::Context;
use crate::element::Element;
use crate::equality::ElementEq;
use crate::hash::hash_one;
use crate::node::{
    detach, reattach, AnyNode, ElementNode, NodeCore, NodeShape, PassThroughShape, UpdateResult,
};
use crate::nodes::DynamicNode;
use crate::properties::ElementFields;
use crate::target::NoTarget;
use crate::{fatal, NodeError};

/// A list of elements identified by stable ids.
///
/// Edges follow their ids across updates: a reordered id keeps its node
/// (and state), a vanished id loses it.
pub struct ForEach<Id, E> {
    items: Rc<Vec<(Id, E)>>,
}

impl<Id, E> ForEach<Id, E> {
    pub fn new<T>(
        data: impl IntoIterator<Item = T>,
        id: impl Fn(&T) -> Id,
        content: impl Fn(T) -> E,
    ) -> Self {
        let items = data
            .into_iter()
            .map(|item| (id(&item), content(item)))
            .collect();
        Self {
            items: Rc::new(items),
        }
    }

    pub fn from_items(items: impl IntoIterator<Item = (Id, E)>) -> Self {
        Self {
            items: Rc::new(items.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &Id> {
        self.items.iter().map(|(id, _)| id)
    }
}

impl<Id, E> Clone for ForEach<Id, E> {
    fn clone(&self) -> Self {
        Self {
            items: Rc::clone(&self.items),
        }
    }
}

impl<Id: PartialEq, E: ElementEq> ElementEq for ForEach<Id, E> {
    fn any_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
            || (self.items.len() == other.items.len()
                && self
                    .items
                    .iter()
                    .zip(other.items.iter())
                    .all(|((a_id, a), (b_id, b))| a_id == b_id && a.any_eq(b)))
    }

    fn element_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
            || (self.items.len() == other.items.len()
                && self
                    .items
                    .iter()
                    .zip(other.items.iter())
                    .all(|((a_id, a), (b_id, b))| a_id == b_id && a.element_eq(b)))
    }
}

impl<Id: Hash + Eq + Clone + 'static, E: Element> Element for ForEach<Id, E> {
    type Node = DynamicNode<Id, E>;
    type Target = NoTarget;

    fn display_name() -> &'static str {
        "ForEach"
    }
}

impl<Id, E> ElementFields for ForEach<Id, E> {}

/// Edges keyed by id, kept in the order of the last element.
pub struct DynamicShape<Id, E: Element> {
    core: NodeCore,
    edges: OrderedMap<Id, E::Node>,
}

impl<Id: Hash + Eq + Clone + 'static, E: Element> DynamicShape<Id, E> {
    pub fn ids(&self) -> impl Iterator<Item = &Id> {
        self.edges.keys()
    }

    fn check_unique(&self, items: &[(Id, E)]) {
        let mut seen = HashSet::with_capacity(items.len());
        for (id, _) in items {
            if !seen.insert(id) {
                fatal(NodeError::DuplicateId {
                    node: self.core.display_name().to_owned(),
                    id: format!("{:#018x}", hash_one(id)),
                });
            }
        }
    }

    fn remove_vanished(&mut self, items: &[(Id, E)], position: usize, context: &Context) {
        let live: HashSet<&Id> = items.iter().map(|(id, _)| id).collect();
        let mut offset = 0;
        let mut index = 0;
        while let Some((id, edge)) = self.edges.get_index(index) {
            if live.contains(id) {
                offset += edge.target_count();
                index += 1;
                continue;
            }
            log::debug!(
                target: "scarlet::node",
                "{}#{} dropping item {:#018x}",
                self.core.display_name(),
                self.core.key(),
                hash_one(id)
            );
            detach(edge, context, position + offset);
            self.edges.shift_remove_index(index);
        }
    }

    fn reconcile(&mut self, items: &[(Id, E)], position: usize, context: &Context) -> usize {
        self.check_unique(items);
        self.remove_vanished(items, position, context);

        let mut count = 0;
        for (index, (id, element)) in items.iter().enumerate() {
            let at = position + count;
            match self.edges.get_index_of(id) {
                Some(current) if current == index => {}
                Some(current) => {
                    // Entries before `index` are already in place.
                    let from = at
                        + self
                            .edges
                            .values()
                            .skip(index)
                            .take(current - index)
                            .map(|edge| edge.target_count())
                            .sum::<usize>();
                    if let Some((_, edge)) = self.edges.get_index(current) {
                        log::trace!(
                            target: "scarlet::node",
                            "{}#{} moving item {:#018x} from {current} to {index}",
                            self.core.display_name(),
                            self.core.key(),
                            hash_one(id)
                        );
                        detach(edge, context, from);
                    }
                    self.edges.move_index(current, index);
                    if let Some((_, edge)) = self.edges.get_index(index) {
                        reattach(edge, context, at);
                    }
                }
                None => {
                    let edge = E::Node::make_node(element.clone(), at, context);
                    count += edge.target_count();
                    self.edges.shift_insert(index, id.clone(), edge);
                    continue;
                }
            }
            if let Some((_, edge)) = self.edges.get_index_mut(index) {
                count += edge
                    .compare_and_update(Some(element.clone()), at, context)
                    .target_count;
            }
        }
        count
    }
}

impl<Id: Hash + Eq + Clone + 'static, E: Element> NodeShape for DynamicShape<Id, E> {
    type Element = ForEach<Id, E>;
    type Output = Rc<Vec<(Id, E)>>;

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn make(&self, element: &ForEach<Id, E>) -> Rc<Vec<(Id, E)>> {
        Rc::clone(&element.items)
    }

    fn update_edges(
        &mut self,
        output: Option<Rc<Vec<(Id, E)>>>,
        position: usize,
        context: &Context,
    ) -> UpdateResult {
        let target_count = match output {
            Some(items) => self.reconcile(&items, position, context),
            None => {
                let mut count = 0;
                for edge in self.edges.values_mut() {
                    count += edge
                        .compare_and_update(None, position + count, context)
                        .target_count;
                }
                count
            }
        };
        log::trace!(
            target: "scarlet::node",
            "{}#{} holds {} items",
            self.core.display_name(),
            self.core.key(),
            self.edges.len()
        );
        UpdateResult {
            target_position: position,
            target_count,
        }
    }

    fn visit_edges(&self, visitor: &mut dyn FnMut(&dyn AnyNode)) {
        for edge in self.edges.values() {
            visitor(edge);
        }
    }
}

impl<Id: Hash + Eq + Clone + 'static, E: Element> PassThroughShape for DynamicShape<Id, E> {
    fn new(core: NodeCore) -> Self {
        Self {
            core,
            edges: OrderedMap::default(),
        }
    }
}
