//! FILENAME: core/drilldown-engine/src/view.rs
//! Tree View - the presentation contract driven by the controller.
//!
//! The controller owns the tree arena and tells the view what changed.
//! Clicks and lazy-load requests flow the other way, through the
//! controller's `on_node_click` / `on_lazy_load` / `on_level_loaded`.

use crate::tree::{NodeId, TreeArena};

pub trait TreeView {
    /// (Re)builds the whole visual tree from the arena.
    fn render(&mut self, tree: &TreeArena);

    /// Tears the visual tree down before a rebuild.
    fn destroy(&mut self);

    /// `order` is the new child order of `parent`.
    fn sort_children_of(&mut self, parent: NodeId, order: &[NodeId]);

    fn set_hidden(&mut self, node: NodeId, hidden: bool);

    /// Children of `parent` are now materialized.
    fn children_loaded(&mut self, _parent: NodeId, _children: &[NodeId]) {}

    fn set_expanded(&mut self, _node: NodeId, _expanded: bool) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Render { lines: usize },
    Destroy,
    SortChildren { parent: NodeId, order: Vec<NodeId> },
    SetHidden { node: NodeId, hidden: bool },
    ChildrenLoaded { parent: NodeId, children: Vec<NodeId> },
    SetExpanded { node: NodeId, expanded: bool },
}

/// Text view: keeps the outline of the last render and a log of every call.
#[derive(Debug, Default)]
pub struct OutlineView {
    lines: Vec<String>,
    events: Vec<ViewEvent>,
}

impl OutlineView {
    pub fn new() -> Self {
        OutlineView::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn events(&self) -> &[ViewEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }
}

impl TreeView for OutlineView {
    fn render(&mut self, tree: &TreeArena) {
        self.lines = tree.outline();
        self.events.push(ViewEvent::Render { lines: self.lines.len() });
    }

    fn destroy(&mut self) {
        self.lines.clear();
        self.events.push(ViewEvent::Destroy);
    }

    fn sort_children_of(&mut self, parent: NodeId, order: &[NodeId]) {
        self.events.push(ViewEvent::SortChildren {
            parent,
            order: order.to_vec(),
        });
    }

    fn set_hidden(&mut self, node: NodeId, hidden: bool) {
        self.events.push(ViewEvent::SetHidden { node, hidden });
    }

    fn children_loaded(&mut self, parent: NodeId, children: &[NodeId]) {
        self.events.push(ViewEvent::ChildrenLoaded {
            parent,
            children: children.to_vec(),
        });
    }

    fn set_expanded(&mut self, node: NodeId, expanded: bool) {
        self.events.push(ViewEvent::SetExpanded { node, expanded });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_view_records_calls() {
        let mut tree = TreeArena::new();
        let us = tree.add_child(NodeId::ROOT, "Country", "US".into()).unwrap();

        let mut view = OutlineView::new();
        view.render(&tree);
        view.set_hidden(us, true);
        view.destroy();

        assert!(view.lines().is_empty());
        assert_eq!(
            view.take_events(),
            vec![
                ViewEvent::Render { lines: 1 },
                ViewEvent::SetHidden { node: us, hidden: true },
                ViewEvent::Destroy,
            ]
        );
        assert!(view.events().is_empty());
    }
}
