use scarlet_core::nodes::{LeafNode, StaticNode};
use scarlet_core::{
    AppendAttribute, Attribute, Element, ElementEq, ElementFields, StaticElement,
};

use crate::targets::{TextTarget, ViewTarget};

/// Substantial container: its children land in its own [`ViewTarget`].
#[derive(Clone, ElementEq, ElementFields)]
pub struct View<C> {
    pub content: C,
}

impl<C> View<C> {
    pub fn new(content: C) -> Self {
        Self { content }
    }
}

impl<C: Element> Element for View<C> {
    type Node = StaticNode<Self>;
    type Target = ViewTarget;

    fn display_name() -> &'static str {
        "View"
    }
}

impl<C: Element> StaticElement for View<C> {
    type Edges = (C,);

    fn edges(&self) -> (C,) {
        (self.content.clone(),)
    }
}

/// Substantial leaf carrying its own text attribute.
#[derive(Clone, ElementEq, ElementFields)]
pub struct Text {
    pub text: Attribute<TextTarget, String>,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Attribute::set(TextTarget::TEXT, text.into()),
        }
    }
}

impl Element for Text {
    type Node = LeafNode<Self>;
    type Target = TextTarget;

    fn display_name() -> &'static str {
        "Text"
    }
}

/// Substantial leaf without attributes of its own.
#[derive(Clone, Default, ElementEq, ElementFields)]
pub struct Spacer;

impl Element for Spacer {
    type Node = LeafNode<Self>;
    type Target = ViewTarget;

    fn display_name() -> &'static str {
        "Spacer"
    }
}

pub fn background(color: &str) -> Attribute<ViewTarget, String> {
    Attribute::set(ViewTarget::BACKGROUND, color.to_owned())
}

pub fn tag(value: &str) -> AppendAttribute<ViewTarget, String> {
    AppendAttribute::set(ViewTarget::TAGS, value.to_owned())
}
