//! The platform-facing node tree the graph projects onto.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;

/// Shared, mutable handle to a target node.
pub type TargetRef = Rc<RefCell<dyn TargetNode>>;

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Capability the graph needs from a rendering backend.
///
/// Children are addressed by position only. Positions handed to
/// [`insert_child`](TargetNode::insert_child) and
/// [`remove_child`](TargetNode::remove_child) already account for every
/// non-substantial element between this target and its children.
pub trait TargetNode: AsAny {
    fn create(display_name: &str) -> Self
    where
        Self: Sized;

    fn display_name(&self) -> &str;

    fn insert_child(&mut self, child: TargetRef, position: usize);

    fn remove_child(&mut self, position: usize);

    /// Called once, after the first batch of attributes has been applied.
    fn attributes_did_set(&mut self) {}

    fn children(&self) -> Vec<TargetRef> {
        Vec::new()
    }

    /// Returns the part of this target attributes declared for `facet` write
    /// into. Targets that embed a shared base (a common view target, say)
    /// override this to expose it.
    fn facet(&self, facet: TypeId) -> Option<&dyn Any> {
        let this = self.as_any();
        ((*this).type_id() == facet).then_some(this)
    }

    fn facet_mut(&mut self, facet: TypeId) -> Option<&mut dyn Any> {
        let this = self.as_any_mut();
        if (*this).type_id() == facet {
            Some(this)
        } else {
            None
        }
    }
}

impl dyn TargetNode {
    pub fn supports(&self, facet: TypeId) -> bool {
        self.facet(facet).is_some()
    }

    pub fn downcast_ref<T: TargetNode>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: TargetNode>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Decides, per element type, whether nodes own a target.
pub trait MaybeTarget: 'static {
    fn create(display_name: &str) -> Option<TargetRef>;
}

impl<T: TargetNode> MaybeTarget for T {
    fn create(display_name: &str) -> Option<TargetRef> {
        let target: TargetRef = Rc::new(RefCell::new(T::create(display_name)));
        Some(target)
    }
}

/// Target type of non-substantial elements.
pub enum NoTarget {}

impl MaybeTarget for NoTarget {
    fn create(_display_name: &str) -> Option<TargetRef> {
        None
    }
}

/// Indented dump of a target subtree, one display name per line.
pub fn dump_targets(root: &TargetRef) -> String {
    let mut output = String::new();
    dump_target(&mut output, root, 0);
    output
}

fn dump_target(output: &mut String, target: &TargetRef, depth: usize) {
    let target = target.borrow();
    let _ = writeln!(output, "{}{}", "  ".repeat(depth), target.display_name());
    for child in target.children() {
        dump_target(output, &child, depth + 1);
    }
}
