use super::*;
use crate::test_fixtures::*;
use std::cell::Cell;
use std::rc::Rc;

use crate::attributes::AttributeValue;
use crate::element::Either;

fn mount<E: Element>(element: E) -> (Graph<E>, TargetRef) {
    let host = host();
    let graph = Graph::builder(element).host(Rc::clone(&host)).build();
    (graph, host)
}

#[test]
fn static_pair_projects_only_substantial_edges() {
    let (mut graph, host) = mount((Label::new("first"), ()));
    assert_eq!(labels(&host), vec!["first"]);
    assert_eq!(take_events(&host), vec!["+Label@0"]);

    let label = children(&host)[0].clone();
    with_recorder(&label, |recorder| assert_eq!(recorder.label_writes, 1));

    graph.update((Label::new("second"), ()));
    assert!(take_events(&host).is_empty());
    assert_eq!(label_of(&label), "second");
    with_recorder(&label, |recorder| assert_eq!(recorder.label_writes, 2));
}

#[test]
fn equal_update_writes_nothing() {
    let element = (Label::new("a"), Group { content: Label::new("b") });
    let (mut graph, host) = mount(element.clone());
    let group = children(&host)[1].clone();
    take_events(&host);
    assert_eq!(take_events(&group), vec!["+Label@0"]);

    graph.update(element);
    assert!(take_events(&host).is_empty());
    assert!(take_events(&group).is_empty());
    with_recorder(&children(&group)[0], |recorder| {
        assert_eq!(recorder.label_writes, 1);
        assert_eq!(recorder.did_set, 1);
    });
}

#[test]
fn substantial_node_counts_one_target() {
    let (graph, host) = mount((
        Label::new("a"),
        Group {
            content: (Label::new("b"), Label::new("c")),
        },
        Label::new("d"),
    ));
    assert_eq!(graph.root().target_count(), 3);
    assert_eq!(labels(&host), vec!["a", "", "d"]);
    let group = children(&host)[1].clone();
    assert_eq!(labels(&group), vec!["b", "c"]);
}

#[test]
fn optional_inserts_at_its_own_position() {
    let element = |middle: Option<Label>| (Label::new("a"), middle, Label::new("c"));
    let (mut graph, host) = mount(element(None));
    assert_eq!(labels(&host), vec!["a", "c"]);
    take_events(&host);

    graph.update(element(Some(Label::new("b"))));
    assert_eq!(take_events(&host), vec!["+Label@1"]);
    assert_eq!(labels(&host), vec!["a", "b", "c"]);

    graph.update(element(None));
    assert_eq!(take_events(&host), vec!["-@1"]);
    assert_eq!(labels(&host), vec!["a", "c"]);
}

#[test]
fn removed_optional_comes_back_fresh() {
    let (mut graph, host) = mount(Some(Label::new("a")));
    let first = children(&host)[0].clone();
    graph.update(None);
    graph.update(Some(Label::new("a")));
    let second = children(&host)[0].clone();
    assert!(!Rc::ptr_eq(&first, &second));
    with_recorder(&second, |recorder| assert_eq!(recorder.did_set, 1));
}

#[test]
fn conditional_switch_tears_down_the_whole_branch() {
    type Branches = Either<(Label, Option<()>, Label), Label>;
    let first: Branches = Either::First((Label::new("a"), Some(()), Label::new("b")));
    let (mut graph, host) = mount((Label::new("lead"), first));
    assert_eq!(labels(&host), vec!["lead", "a", "b"]);
    take_events(&host);

    graph.update((Label::new("lead"), Either::Second(Label::new("c"))));
    assert_eq!(take_events(&host), vec!["-@1", "-@1", "+Label@1"]);
    assert_eq!(labels(&host), vec!["lead", "c"]);

    graph.update((
        Label::new("lead"),
        Either::First((Label::new("x"), None, Label::new("y"))),
    ));
    assert_eq!(labels(&host), vec!["lead", "x", "y"]);
}

#[test]
fn outer_attribute_wins_over_inner() {
    let element = Label::new("own")
        .attribute(label_attribute("inner"))
        .attribute(label_attribute("outer"));
    let (_graph, host) = mount(element);
    assert_eq!(labels(&host), vec!["outer"]);
}

#[test]
fn consumed_attribute_stops_at_first_target() {
    let element = Group {
        content: Label::new("own"),
    }
    .attribute(label_attribute("outer"));
    let (_graph, host) = mount(element);
    let group = children(&host)[0].clone();
    assert_eq!(label_of(&group), "outer");
    assert_eq!(labels(&group), vec!["own"]);
}

#[test]
fn propagating_attribute_reaches_every_target_below() {
    let element = Group {
        content: Label::new("own"),
    }
    .attribute(label_attribute("outer").propagating());
    let (_graph, host) = mount(element);
    let group = children(&host)[0].clone();
    assert_eq!(label_of(&group), "outer");
    assert_eq!(labels(&group), vec!["outer"]);
}

#[test]
fn unset_outer_attribute_masks_the_inner_value() {
    let element = Label::new("own").attribute(Attribute::new(LABEL, AttributeValue::Unset));
    let (_graph, host) = mount(element);
    assert_eq!(labels(&host), vec![""]);
}

#[test]
fn accumulating_entries_update_independently() {
    let element = |inner: &str| {
        Label::new("target")
            .attribute(tag(inner))
            .attribute(tag("outer"))
    };
    let (mut graph, host) = mount(element("inner"));
    let label = children(&host)[0].clone();
    let (outer_key, inner_key) = with_recorder(&label, |recorder| {
        let keys: Vec<_> = recorder.tags.entries().map(|(key, _)| key).collect();
        assert_eq!(recorder.tags.values().cloned().collect::<Vec<_>>(), vec!["outer", "inner"]);
        recorder.tags.reset_changes();
        (keys[0], keys[1])
    });

    graph.update(element("inner-2"));
    with_recorder(&label, |recorder| {
        let outer = recorder.tags.get(outer_key).map(|entry| entry.changed);
        let inner = recorder.tags.get(inner_key).map(|entry| entry.changed);
        assert_eq!(outer, Some(false));
        assert_eq!(inner, Some(true));
        assert_eq!(
            recorder.tags.values().cloned().collect::<Vec<_>>(),
            vec!["outer", "inner-2"]
        );
    });
}

#[test]
fn unset_accumulating_attribute_removes_its_entry() {
    let element = |inner: Option<&str>| {
        Label::new("target")
            .attribute(AppendAttribute::new(TAGS, inner.map(str::to_owned)))
            .attribute(tag("outer"))
    };
    let (mut graph, host) = mount(element(Some("inner")));
    let label = children(&host)[0].clone();
    graph.update(element(None));
    with_recorder(&label, |recorder| {
        assert_eq!(recorder.tags.values().cloned().collect::<Vec<_>>(), vec!["outer"]);
    });
}

#[test]
fn dropped_accumulating_attribute_removes_its_entry() {
    let element = |on: bool| {
        Label::new("target")
            .attribute(on.then(|| tag("inner")))
            .attribute(tag("outer"))
    };
    let (mut graph, host) = mount(element(true));
    let label = children(&host)[0].clone();
    let tags = |label: &TargetRef| {
        with_recorder(label, |recorder| recorder.tags.values().cloned().collect::<Vec<_>>())
    };
    assert_eq!(tags(&label), vec!["outer", "inner"]);

    graph.update(element(false));
    assert_eq!(tags(&label), vec!["outer"]);

    graph.update(element(false));
    assert_eq!(tags(&label), vec!["outer"]);

    graph.update(element(true));
    assert_eq!(tags(&label), vec!["outer", "inner"]);
}

#[derive(Clone, ElementEq, ElementFields)]
struct Greeting {
    name: String,
}

impl Element for Greeting {
    type Node = UserNode<Self>;
    type Target = NoTarget;
}

impl Component for Greeting {
    type Body = Label;

    fn body(&self) -> Label {
        count_body();
        Label::new(&format!("hello {}", self.name))
    }
}

#[test]
fn unchanged_component_is_not_derived_again() {
    let (mut graph, host) = mount((Greeting { name: "ada".into() }, Label::new("x")));
    assert_eq!(body_calls(), 1);

    graph.update((Greeting { name: "ada".into() }, Label::new("y")));
    assert_eq!(body_calls(), 1);
    assert_eq!(labels(&host), vec!["hello ada", "y"]);

    graph.update((Greeting { name: "bob".into() }, Label::new("y")));
    assert_eq!(body_calls(), 2);
    assert_eq!(labels(&host), vec!["hello bob", "y"]);
}

#[test]
fn observer_sees_every_derivation() {
    #[derive(Default)]
    struct Made(Cell<usize>);

    impl UpdateObserver for Made {
        fn did_make(&self, _key: NodeKey, display_name: &'static str) {
            if display_name == "Greeting" {
                self.0.set(self.0.get() + 1);
            }
        }
    }

    let made = Rc::new(Made::default());
    let mut graph = Graph::builder(Greeting { name: "ada".into() })
        .observer(made.clone())
        .build();
    graph.update(Greeting { name: "ada".into() });
    graph.update(Greeting { name: "eve".into() });
    assert_eq!(made.0.get(), 2);
}

struct Accent;

impl EnvironmentKey for Accent {
    type Value = String;

    fn default_value() -> String {
        "plain".into()
    }
}

#[derive(Clone, ElementEq, ElementFields)]
struct AccentReader {
    accent: Environment<Accent>,
}

impl Element for AccentReader {
    type Node = UserNode<Self>;
    type Target = NoTarget;
}

impl Component for AccentReader {
    type Body = Label;

    fn body(&self) -> Label {
        count_body();
        Label::new(&self.accent.get())
    }
}

fn reader() -> AccentReader {
    AccentReader {
        accent: Environment::new(),
    }
}

#[test]
fn environment_reads_default_without_setter() {
    let (_graph, host) = mount(reader());
    assert_eq!(labels(&host), vec!["plain"]);
}

#[test]
fn environment_change_rederives_readers_only() {
    let element = |accent: &str| {
        (
            Group {
                content: (reader(), Greeting { name: "ada".into() }),
            },
        )
            .environment::<Accent>(accent.to_owned())
    };
    let (mut graph, host) = mount(element("red"));
    let group = children(&host)[0].clone();
    assert_eq!(labels(&group), vec!["red", "hello ada"]);
    assert_eq!(body_calls(), 2);

    graph.update(element("red"));
    assert_eq!(body_calls(), 2);

    graph.update(element("blue"));
    assert_eq!(labels(&group), vec!["blue", "hello ada"]);
    assert_eq!(body_calls(), 3);
}

#[test]
fn nearest_environment_setter_wins() {
    let element = reader()
        .environment::<Accent>("inner".into())
        .environment::<Accent>("outer".into());
    let (_graph, host) = mount(element);
    assert_eq!(labels(&host), vec!["inner"]);
}

struct LabelKey;

impl EnvironmentKey for LabelKey {
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

#[test]
fn environment_attributes_reach_targets_below_the_setter() {
    let element = |value: &str| {
        Group {
            content: Label::new("x"),
        }
        .environment::<LabelKey>(value.to_owned())
    };
    let (mut graph, host) = mount(element("one"));
    let group = children(&host)[0].clone();
    let label = children(&group)[0].clone();
    with_recorder(&label, |recorder| {
        assert_eq!(recorder.tags.values().cloned().collect::<Vec<_>>(), vec!["one"]);
    });

    graph.update(element("two"));
    with_recorder(&label, |recorder| {
        assert_eq!(recorder.tags.values().cloned().collect::<Vec<_>>(), vec!["two"]);
    });
}

#[derive(Clone, ElementEq, ElementFields)]
struct Framed {
    frame: String,
}

impl Element for Framed {
    type Node = ModifierNode<Self>;
    type Target = NoTarget;
    const KIND: ElementKind = ElementKind::ViewModifier;
}

impl ViewModifier for Framed {
    type Body = Attributed<Group<ModifierContent>, Attribute<Recorder, String>>;

    fn body(&self, content: ModifierContent) -> Self::Body {
        count_body();
        Group { content }.attribute(label_attribute(&self.frame))
    }
}

#[test]
fn modifier_wraps_its_content() {
    let element = |text: &str, frame: &str| {
        Label::new(text).modifier(Framed {
            frame: frame.to_owned(),
        })
    };
    let (mut graph, host) = mount(element("a", "frame"));
    let group = children(&host)[0].clone();
    assert_eq!(label_of(&group), "frame");
    assert_eq!(labels(&group), vec!["a"]);
    assert_eq!(body_calls(), 1);

    graph.update(element("b", "frame"));
    assert_eq!(labels(&group), vec!["b"]);
    assert_eq!(body_calls(), 1);

    graph.update(element("b", "border"));
    assert_eq!(label_of(&group), "border");
    assert_eq!(body_calls(), 2);
    assert!(Rc::ptr_eq(&group, &children(&host)[0]));
}

#[test]
#[should_panic(expected = "used outside of a modifier body")]
fn modifier_content_outside_a_modifier_is_fatal() {
    let _ = Graph::new(ModifierContent);
}

#[test]
fn downcast_reports_both_types() {
    let element: Rc<dyn AnyElement> = Rc::new(Label::new("a"));
    match crate::node::downcast_element::<Greeting>(&*element) {
        Err(NodeError::TypeMismatch { expected, actual }) => {
            assert!(expected.ends_with("Greeting"));
            assert!(actual.ends_with("Label"));
        }
        _ => panic!("expected a type mismatch"),
    }
}

#[test]
fn element_eq_ignores_dynamic_properties() {
    let a = AccentReader {
        accent: Environment::new(),
    };
    let (graph, _host) = mount(a.clone());
    let installed = graph.root().element();
    assert!(installed.element_eq(&a));
    assert!(!installed.any_eq(&a));

    let left = Label::new("x");
    assert!(left.element_eq(&Label::new("x")));
    assert!(!left.element_eq(&Label::new("y")));
}

#[test]
fn dumps_show_the_structure() {
    let (graph, host) = mount((Label::new("a"), Some(Group { content: () })));
    let nodes = graph.dump_nodes();
    assert!(nodes.starts_with("Static#"));
    assert!(nodes.contains("  Label#"));
    assert!(nodes.contains("    Group#"));
    assert_eq!(dump_targets(&host), "Host\n  Label\n  Group\n");
}
