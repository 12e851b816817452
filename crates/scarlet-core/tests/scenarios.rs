use std::cell::RefCell;
use std::rc::Rc;

use scarlet_core::nodes::UserNode;
use scarlet_core::{
    dump_targets, Component, Element, ElementEq, ElementExt, ElementFields, ForEach, Graph,
    NoTarget, State, TargetRef,
};
use scarlet_testing::prelude::*;

fn mount<E: Element>(element: E) -> (Graph<E>, TargetRef) {
    let host = host();
    let graph = Graph::builder(element).host(Rc::clone(&host)).build();
    (graph, host)
}

#[test]
fn static_pair_with_one_substantial_leaf() {
    let (mut graph, host) = mount((Text::new("hello"), ()));
    assert_eq!(child_names(&host), vec!["Text"]);
    assert_eq!(
        take_events(&host),
        vec![TargetEvent::Insert {
            child: "Text".into(),
            position: 0
        }]
    );
    let text = child(&host, 0);

    graph.update((Text::new("world"), ()));
    assert!(take_events(&host).is_empty());
    assert_eq!(text_of(&text), "world");
    with_view(&text, |view| assert_eq!(view.attributes_did_set, 1));
}

#[test]
fn optional_leaf_comes_and_goes() {
    let (mut graph, host) = mount(None::<Text>);
    assert!(child_names(&host).is_empty());

    graph.update(Some(Text::new("here")));
    assert_eq!(
        take_events(&host),
        vec![TargetEvent::Insert {
            child: "Text".into(),
            position: 0
        }]
    );

    graph.update(None);
    assert_eq!(take_events(&host), vec![TargetEvent::Remove { position: 0 }]);
    assert!(child_names(&host).is_empty());
}

#[test]
fn two_ancestors_tag_the_same_target_independently() {
    let element = |inner: &str| {
        Text::new("tagged")
            .attribute(tag(inner))
            .attribute(tag("outer"))
    };
    let (mut graph, host) = mount(element("inner"));
    let text = child(&host, 0);
    let keys: Vec<_> = with_view_mut(&text, |view| {
        view.tags.reset_changes();
        view.tags.entries().map(|(key, _)| key).collect()
    });
    assert_eq!(keys.len(), 2);

    graph.update(element("inner changed"));
    with_view(&text, |view| {
        let outer = view.tags.get(keys[0]).map(|entry| (entry.value.clone(), entry.changed));
        let inner = view.tags.get(keys[1]).map(|entry| (entry.value.clone(), entry.changed));
        assert_eq!(outer, Some(("outer".to_owned(), false)));
        assert_eq!(inner, Some(("inner changed".to_owned(), true)));
    });
}

#[test]
fn view_attributes_apply_to_targets_embedding_a_view() {
    let (mut graph, host) = mount(Text::new("a").attribute(background("red")));
    let text = child(&host, 0);
    with_view(&text, |view| {
        assert_eq!(view.background, "red");
        assert_eq!(view.background_writes, 1);
    });

    graph.update(Text::new("b").attribute(background("red")));
    with_view(&text, |view| assert_eq!(view.background_writes, 1));
    assert_eq!(text_of(&text), "b");
}

thread_local! {
    static SELECTED: RefCell<Option<State<usize>>> = const { RefCell::new(None) };
}

#[derive(Clone, ElementEq, ElementFields)]
struct Picker {
    options: Vec<&'static str>,
    selected: State<usize>,
}

impl Element for Picker {
    type Node = UserNode<Self>;
    type Target = NoTarget;
}

impl Component for Picker {
    type Body = View<(ForEach<&'static str, Text>, Option<Spacer>)>;

    fn body(&self) -> Self::Body {
        SELECTED.with(|selected| *selected.borrow_mut() = Some(self.selected.clone()));
        let selected = self.selected.get();
        let rows = ForEach::new(
            self.options.iter().copied().enumerate().collect::<Vec<_>>(),
            |(_, option)| *option,
            move |(index, option)| {
                if index == selected {
                    Text::new(format!("> {option}"))
                } else {
                    Text::new(option)
                }
            },
        );
        View::new((rows, (selected == 0).then(Spacer::default)))
    }
}

#[test]
fn stateful_view_rebuilds_its_list() {
    let picker = Picker {
        options: vec!["a", "b", "c"],
        selected: State::new(0),
    };
    let (mut graph, host) = mount(picker);
    assert_eq!(
        dump_targets(&host),
        "Host\n  View\n    Text\n    Text\n    Text\n    Spacer\n"
    );
    let view = child(&host, 0);
    let texts = |view: &TargetRef| {
        (0..3)
            .map(|index| text_of(&child(view, index)))
            .collect::<Vec<_>>()
    };
    assert_eq!(texts(&view), vec!["> a", "b", "c"]);

    SELECTED.with(|selected| selected.borrow().clone().unwrap().set(2));
    assert!(graph.needs_update());
    graph.process_invalidations();
    assert_eq!(texts(&view), vec!["a", "b", "> c"]);
    assert_eq!(child_names(&view), vec!["Text", "Text", "Text"]);

    graph.update(Picker {
        options: vec!["c", "a"],
        selected: State::new(0),
    });
    assert_eq!(child_names(&view), vec!["Text", "Text"]);
    assert_eq!(text_of(&child(&view, 0)), "c");
    assert_eq!(text_of(&child(&view, 1)), "a");
}

#[test]
fn recording_observer_counts_derivations() {
    let observer = Rc::new(RecordingObserver::default());
    let mut graph = Graph::builder(View::new(Text::new("a")))
        .host(host())
        .observer(observer.clone())
        .build();
    assert_eq!(observer.count("View"), 1);
    assert_eq!(observer.count("Text"), 1);
    observer.clear();

    graph.update(View::new(Text::new("a")));
    assert_eq!(observer.made(), vec!["View"]);
}
