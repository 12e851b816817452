use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use scarlet_core::{AppendSlot, AttributeList, Slot, TargetNode, TargetRef};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetEvent {
    Insert { child: String, position: usize },
    Remove { position: usize },
}

/// Container target recording every child operation it receives.
pub struct ViewTarget {
    name: String,
    children: Vec<TargetRef>,
    events: Vec<TargetEvent>,
    pub background: String,
    pub background_writes: usize,
    pub tags: AttributeList<String>,
    pub attributes_did_set: usize,
}

fn view_background(view: &ViewTarget) -> &String {
    &view.background
}

fn set_view_background(view: &mut ViewTarget, value: String) {
    view.background = value;
    view.background_writes += 1;
}

fn view_tags(view: &mut ViewTarget) -> &mut AttributeList<String> {
    &mut view.tags
}

impl ViewTarget {
    pub const BACKGROUND: Slot<ViewTarget, String> =
        Slot::new("background", view_background, set_view_background);

    pub const TAGS: AppendSlot<ViewTarget, String> = AppendSlot::new("tags", view_tags);

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            children: Vec::new(),
            events: Vec::new(),
            background: String::new(),
            background_writes: 0,
            tags: AttributeList::default(),
            attributes_did_set: 0,
        }
    }

    pub fn child_names(&self) -> Vec<String> {
        self.children
            .iter()
            .map(|child| child.borrow().display_name().to_owned())
            .collect()
    }

    pub fn events(&self) -> &[TargetEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<TargetEvent> {
        std::mem::take(&mut self.events)
    }

    /// Tag values in contribution order.
    pub fn tag_values(&self) -> Vec<String> {
        self.tags.values().cloned().collect()
    }
}

impl TargetNode for ViewTarget {
    fn create(display_name: &str) -> Self {
        Self::new(display_name)
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn insert_child(&mut self, child: TargetRef, position: usize) {
        let name = child.borrow().display_name().to_owned();
        log::trace!(target: "scarlet::testing", "{} <- {name} at {position}", self.name);
        self.children.insert(position, child);
        self.events.push(TargetEvent::Insert {
            child: name,
            position,
        });
    }

    fn remove_child(&mut self, position: usize) {
        log::trace!(target: "scarlet::testing", "{} -x {position}", self.name);
        self.children.remove(position);
        self.events.push(TargetEvent::Remove { position });
    }

    fn attributes_did_set(&mut self) {
        self.attributes_did_set += 1;
    }

    fn children(&self) -> Vec<TargetRef> {
        self.children.clone()
    }
}

/// Text target embedding a [`ViewTarget`], so view attributes apply to it
/// as well.
pub struct TextTarget {
    pub view: ViewTarget,
    pub text: String,
    pub text_writes: usize,
}

fn text_value(text: &TextTarget) -> &String {
    &text.text
}

fn set_text_value(text: &mut TextTarget, value: String) {
    text.text = value;
    text.text_writes += 1;
}

impl TextTarget {
    pub const TEXT: Slot<TextTarget, String> = Slot::new("text", text_value, set_text_value);
}

impl TargetNode for TextTarget {
    fn create(display_name: &str) -> Self {
        Self {
            view: ViewTarget::new(display_name),
            text: String::new(),
            text_writes: 0,
        }
    }

    fn display_name(&self) -> &str {
        self.view.display_name()
    }

    fn insert_child(&mut self, child: TargetRef, position: usize) {
        self.view.insert_child(child, position);
    }

    fn remove_child(&mut self, position: usize) {
        self.view.remove_child(position);
    }

    fn attributes_did_set(&mut self) {
        self.view.attributes_did_set();
    }

    fn children(&self) -> Vec<TargetRef> {
        self.view.children()
    }

    fn facet(&self, facet: TypeId) -> Option<&dyn Any> {
        if facet == TypeId::of::<TextTarget>() {
            Some(self)
        } else if facet == TypeId::of::<ViewTarget>() {
            Some(&self.view)
        } else {
            None
        }
    }

    fn facet_mut(&mut self, facet: TypeId) -> Option<&mut dyn Any> {
        if facet == TypeId::of::<TextTarget>() {
            Some(self)
        } else if facet == TypeId::of::<ViewTarget>() {
            Some(&mut self.view)
        } else {
            None
        }
    }
}

/// Root target to mount graphs into.
pub fn host() -> TargetRef {
    Rc::new(RefCell::new(ViewTarget::new("Host")))
}

/// Runs `f` with the view part of `target`.
pub fn with_view<R>(target: &TargetRef, f: impl FnOnce(&ViewTarget) -> R) -> R {
    let target = target.borrow();
    match target
        .facet(TypeId::of::<ViewTarget>())
        .and_then(|facet| facet.downcast_ref::<ViewTarget>())
    {
        Some(view) => f(view),
        None => panic!("{} is not a view target", target.display_name()),
    }
}

pub fn with_view_mut<R>(target: &TargetRef, f: impl FnOnce(&mut ViewTarget) -> R) -> R {
    let mut target = target.borrow_mut();
    let name = target.display_name().to_owned();
    match target
        .facet_mut(TypeId::of::<ViewTarget>())
        .and_then(|facet| facet.downcast_mut::<ViewTarget>())
    {
        Some(view) => f(view),
        None => panic!("{name} is not a view target"),
    }
}

pub fn child_names(target: &TargetRef) -> Vec<String> {
    with_view(target, ViewTarget::child_names)
}

pub fn child(target: &TargetRef, position: usize) -> TargetRef {
    let children = target.borrow().children();
    match children.get(position) {
        Some(child) => Rc::clone(child),
        None => panic!("no child at {position}"),
    }
}

pub fn text_of(target: &TargetRef) -> String {
    let target = target.borrow();
    match target.downcast_ref::<TextTarget>() {
        Some(text) => text.text.clone(),
        None => panic!("{} is not a text target", target.display_name()),
    }
}

pub fn take_events(target: &TargetRef) -> Vec<TargetEvent> {
    with_view_mut(target, ViewTarget::take_events)
}
