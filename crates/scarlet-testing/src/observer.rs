use std::cell::RefCell;

use scarlet_core::{NodeKey, UpdateObserver};

/// Records every node that derived its edges, in order.
#[derive(Default)]
pub struct RecordingObserver {
    made: RefCell<Vec<(NodeKey, &'static str)>>,
}

impl RecordingObserver {
    pub fn made(&self) -> Vec<&'static str> {
        self.made.borrow().iter().map(|(_, name)| *name).collect()
    }

    pub fn count(&self, display_name: &str) -> usize {
        self.made
            .borrow()
            .iter()
            .filter(|(_, name)| *name == display_name)
            .count()
    }

    pub fn clear(&self) {
        self.made.borrow_mut().clear();
    }
}

impl UpdateObserver for RecordingObserver {
    fn did_make(&self, key: NodeKey, display_name: &'static str) {
        self.made.borrow_mut().push((key, display_name));
    }
}
