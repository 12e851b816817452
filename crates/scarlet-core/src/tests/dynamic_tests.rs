use super::*;
use crate::test_fixtures::*;
use std::cell::RefCell;
use std::rc::Rc;

use crate::collections::map::HashMap;

thread_local! {
    static ROW_STATES: RefCell<HashMap<u32, State<u32>>> = RefCell::new(HashMap::default());
}

fn row_state(id: u32) -> State<u32> {
    ROW_STATES.with(|states| states.borrow().get(&id).cloned().expect("row mounted"))
}

/// A row remembering how often it was clicked.
#[derive(Clone, ElementEq, ElementFields)]
struct Row {
    id: u32,
    clicks: State<u32>,
}

impl Element for Row {
    type Node = UserNode<Self>;
    type Target = NoTarget;
}

impl Component for Row {
    type Body = Label;

    fn body(&self) -> Label {
        count_body();
        ROW_STATES.with(|states| states.borrow_mut().insert(self.id, self.clicks.clone()));
        Label::new(&format!("{}:{}", self.id, self.clicks.get()))
    }
}

fn rows(ids: &[u32]) -> ForEach<u32, Row> {
    ForEach::new(
        ids.to_vec(),
        |id| *id,
        |id| Row {
            id,
            clicks: State::new(0),
        },
    )
}

fn mount<E: Element>(element: E) -> (Graph<E>, TargetRef) {
    let host = host();
    let graph = Graph::builder(element).host(Rc::clone(&host)).build();
    (graph, host)
}

#[test]
fn items_mount_in_order() {
    let (graph, host) = mount(rows(&[1, 2, 3]));
    assert_eq!(labels(&host), vec!["1:0", "2:0", "3:0"]);
    assert_eq!(graph.root().target_count(), 3);
}

#[test]
fn vanished_items_are_removed_at_their_position() {
    let (mut graph, host) = mount((Label::new("lead"), rows(&[1, 2, 3])));
    take_events(&host);

    graph.update((Label::new("lead"), rows(&[1, 3])));
    assert_eq!(take_events(&host), vec!["-@2"]);
    assert_eq!(labels(&host), vec!["lead", "1:0", "3:0"]);
}

#[test]
fn new_items_are_inserted_where_they_appear() {
    let (mut graph, host) = mount(rows(&[1, 3]));
    take_events(&host);

    graph.update(rows(&[0, 1, 2, 3]));
    assert_eq!(take_events(&host), vec!["+Label@0", "+Label@2"]);
    assert_eq!(labels(&host), vec!["0:0", "1:0", "2:0", "3:0"]);
}

#[test]
fn moved_items_keep_their_state() {
    let (mut graph, host) = mount(rows(&[1, 2, 3]));
    row_state(3).set(7);
    graph.process_invalidations();
    assert_eq!(labels(&host), vec!["1:0", "2:0", "3:7"]);
    let third = children(&host)[2].clone();

    graph.update(rows(&[3, 1, 2]));
    assert_eq!(labels(&host), vec!["3:7", "1:0", "2:0"]);
    assert!(Rc::ptr_eq(&third, &children(&host)[0]));
}

#[test]
fn unchanged_items_are_not_derived_again() {
    let (mut graph, _host) = mount(rows(&[1, 2]));
    assert_eq!(body_calls(), 2);
    graph.update(rows(&[1, 2]));
    assert_eq!(body_calls(), 2);
}

#[test]
fn reversal_matches_a_fresh_build() {
    let (mut graph, host) = mount(rows(&[1, 2, 3, 4]));
    graph.update(rows(&[4, 3, 2, 1]));
    let (_fresh, fresh_host) = mount(rows(&[4, 3, 2, 1]));
    assert_eq!(labels(&host), labels(&fresh_host));
}

#[test]
fn nested_substantial_items_move_as_one_target() {
    let list = |ids: &[u32]| {
        ForEach::new(
            ids.to_vec(),
            |id| *id,
            |id| {
                (
                    Label::new(&format!("{id}a")),
                    Label::new(&format!("{id}b")),
                )
            },
        )
    };
    let (mut graph, host) = mount(list(&[1, 2]));
    assert_eq!(labels(&host), vec!["1a", "1b", "2a", "2b"]);

    graph.update(list(&[2, 1]));
    assert_eq!(labels(&host), vec!["2a", "2b", "1a", "1b"]);

    graph.update(list(&[1]));
    assert_eq!(labels(&host), vec!["1a", "1b"]);
}

#[test]
#[should_panic(expected = "duplicate id")]
fn duplicate_ids_are_fatal() {
    let _ = Graph::new(rows(&[1, 1]));
}

#[test]
fn dynamic_list_equality_follows_items() {
    let a = rows(&[1, 2]);
    assert!(a.element_eq(&a.clone()));
    assert!(a.element_eq(&rows(&[1, 2])));
    assert!(!a.element_eq(&rows(&[2, 1])));
    assert_eq!(a.ids().copied().collect::<Vec<_>>(), vec![1, 2]);
}
