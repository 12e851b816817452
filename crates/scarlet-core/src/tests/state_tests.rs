use super::*;
use crate::test_fixtures::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

thread_local! {
    static COUNTER_STATE: RefCell<Option<State<u32>>> = const { RefCell::new(None) };
    static TOGGLE_STATE: RefCell<Option<State<bool>>> = const { RefCell::new(None) };
}

fn counter_state() -> State<u32> {
    COUNTER_STATE.with(|state| state.borrow().clone().expect("counter mounted"))
}

fn toggle_state() -> State<bool> {
    TOGGLE_STATE.with(|state| state.borrow().clone().expect("toggle mounted"))
}

#[derive(Clone, ElementEq, ElementFields)]
struct Counter {
    title: String,
    count: State<u32>,
}

fn counter(title: &str) -> Counter {
    Counter {
        title: title.to_owned(),
        count: State::new(0),
    }
}

impl Element for Counter {
    type Node = UserNode<Self>;
    type Target = NoTarget;
}

impl Component for Counter {
    type Body = Label;

    fn body(&self) -> Label {
        count_body();
        COUNTER_STATE.with(|state| *state.borrow_mut() = Some(self.count.clone()));
        Label::new(&format!("{} {}", self.title, self.count.get()))
    }
}

#[derive(Clone, ElementEq, ElementFields)]
struct Toggle {
    on: State<bool>,
}

fn toggle() -> Toggle {
    Toggle {
        on: State::new(false),
    }
}

impl Element for Toggle {
    type Node = UserNode<Self>;
    type Target = NoTarget;
}

impl Component for Toggle {
    type Body = Option<Label>;

    fn body(&self) -> Option<Label> {
        TOGGLE_STATE.with(|state| *state.borrow_mut() = Some(self.on.clone()));
        self.on.get().then(|| Label::new("on"))
    }
}

struct Accent;

impl EnvironmentKey for Accent {
    type Value = String;

    fn default_value() -> String {
        String::new()
    }

    fn apply_to_target(value: &String, target: &mut dyn TargetNode) -> bool {
        target
            .downcast_mut::<Recorder>()
            .is_some_and(|recorder| recorder.tags.insert(0, value.clone()))
    }
}

fn mount<E: Element>(element: E) -> (Graph<E>, TargetRef) {
    let host = host();
    let graph = Graph::builder(element).host(Rc::clone(&host)).build();
    (graph, host)
}

#[test]
fn state_write_replays_only_on_processing() {
    let (mut graph, host) = mount((Label::new("lead"), counter("count")));
    assert_eq!(labels(&host), vec!["lead", "count 0"]);
    assert!(!graph.needs_update());

    counter_state().set(5);
    assert!(graph.needs_update());
    assert_eq!(body_calls(), 1);
    assert_eq!(labels(&host), vec!["lead", "count 0"]);

    assert_eq!(graph.process_invalidations(), 1);
    assert_eq!(body_calls(), 2);
    assert_eq!(labels(&host), vec!["lead", "count 5"]);
    assert!(!graph.needs_update());
}

#[test]
fn equal_write_does_not_invalidate() {
    let (graph, _host) = mount(counter("count"));
    counter_state().set(0);
    assert!(!graph.needs_update());
}

#[test]
fn writes_between_frames_replay_once() {
    let (mut graph, host) = mount(counter("count"));
    let state = counter_state();
    state.set(1);
    state.update(|count| *count += 1);
    assert_eq!(graph.process_invalidations(), 1);
    assert_eq!(body_calls(), 2);
    assert_eq!(labels(&host), vec!["count 2"]);
}

#[test]
fn state_survives_rederivation_from_above() {
    let (mut graph, host) = mount((counter("count"),));
    counter_state().set(3);
    graph.process_invalidations();

    graph.update((counter("total"),));
    assert_eq!(labels(&host), vec!["total 3"]);
    assert_eq!(counter_state().get(), 3);
}

#[test]
fn write_after_destruction_is_ignored() {
    let (mut graph, host) = mount(Some(counter("count")));
    let state = counter_state();
    graph.update(None);
    assert!(labels(&host).is_empty());

    state.set(9);
    assert!(!graph.needs_update());
    assert_eq!(graph.process_invalidations(), 0);
}

#[test]
fn replay_that_changes_target_count_keeps_siblings_in_place() {
    let element = |tail: &str| (Label::new("lead"), toggle(), Label::new(tail));
    let (mut graph, host) = mount(element("tail"));
    assert_eq!(labels(&host), vec!["lead", "tail"]);
    take_events(&host);

    toggle_state().set(true);
    graph.process_invalidations();
    assert_eq!(take_events(&host), vec!["+Label@1"]);
    assert_eq!(labels(&host), vec!["lead", "on", "tail"]);

    graph.update(element("end"));
    assert!(take_events(&host).is_empty());
    assert_eq!(labels(&host), vec!["lead", "on", "end"]);

    toggle_state().set(false);
    graph.process_invalidations();
    assert_eq!(take_events(&host), vec!["-@1"]);
    assert_eq!(labels(&host), vec!["lead", "end"]);
}

#[test]
fn replay_inside_a_substantial_parent_uses_its_target() {
    let (mut graph, host) = mount(Group {
        content: (toggle(), Label::new("tail")),
    });
    let group = children(&host)[0].clone();
    take_events(&host);
    take_events(&group);

    toggle_state().set(true);
    graph.process_invalidations();
    assert_eq!(take_events(&group), vec!["+Label@0"]);
    assert!(take_events(&host).is_empty());
    assert_eq!(labels(&group), vec!["on", "tail"]);
}

#[test]
fn writes_schedule_frames() {
    let scheduler = Arc::new(TestScheduler::default());
    let runtime = Runtime::new(scheduler.clone());
    let mut graph = Graph::builder(counter("count")).runtime(runtime).build();
    assert_eq!(scheduler.frames(), 0);

    counter_state().set(1);
    counter_state().set(2);
    assert_eq!(scheduler.frames(), 1);
    assert!(graph.runtime_handle().needs_frame());

    graph.process_invalidations();
    assert!(!graph.runtime_handle().needs_frame());
}

#[test]
fn uninstalled_state_reads_its_default() {
    let state = State::new(4u32);
    assert!(!state.is_installed());
    assert_eq!(state.get(), 4);
    assert_eq!(state.with(|value| value * 2), 8);
}

#[test]
#[should_panic(expected = "written before installation")]
fn writing_uninstalled_state_is_fatal() {
    State::new(4u32).set(5);
}

#[test]
fn installed_root_element_exposes_its_state() {
    let (mut graph, host) = mount(counter("count"));
    graph.root().element().count.set(7);
    graph.process_invalidations();
    assert_eq!(labels(&host), vec!["count 7"]);
}

#[test]
fn targets_created_by_a_replay_receive_environment_attributes() {
    let (mut graph, host) = mount(toggle().environment::<Accent>("blue".to_owned()));
    assert!(labels(&host).is_empty());

    toggle_state().set(true);
    graph.process_invalidations();
    let label = children(&host)[0].clone();
    with_recorder(&label, |recorder| {
        assert_eq!(recorder.tags.values().cloned().collect::<Vec<_>>(), vec!["blue"]);
    });

    toggle_state().set(false);
    graph.process_invalidations();
    toggle_state().set(true);
    graph.process_invalidations();
    let label = children(&host)[0].clone();
    with_recorder(&label, |recorder| {
        assert_eq!(recorder.tags.values().cloned().collect::<Vec<_>>(), vec!["blue"]);
    });
}
