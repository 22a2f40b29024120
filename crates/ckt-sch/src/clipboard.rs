use glam::IVec2;

use crate::component::Component;
use crate::diagram::{ComponentId, Diagram};

/// Cut/copy/paste buffer owned by an editing session.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    items: Vec<Component>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Component] {
        &self.items
    }

    /// Replaces the contents with copies of `ids` and removes them from the
    /// diagram. Wires left behind are not merged.
    pub fn cut(&mut self, diagram: &mut Diagram, ids: &[ComponentId]) -> usize {
        self.items = ids
            .iter()
            .filter_map(|id| diagram.delete(*id))
            .map(|c| c.clone_at(c.origin()))
            .collect();
        self.items.len()
    }

    pub fn copy(&mut self, diagram: &Diagram, ids: &[ComponentId]) -> usize {
        self.items = ids
            .iter()
            .filter_map(|id| diagram.component(*id))
            .map(|c| c.clone_at(c.origin()))
            .collect();
        self.items.len()
    }

    /// Places copies so that the top-left origin of the clipboard lands on
    /// `cursor`. Pasted parts get fresh instance names and the new wires are
    /// settled against the diagram. Returns the new ids in clipboard order.
    pub fn paste(&self, diagram: &mut Diagram, cursor: IVec2) -> Vec<ComponentId> {
        let Some(top_left) = self.items.iter().map(Component::origin).reduce(IVec2::min) else {
            return Vec::new();
        };
        let mut pasted = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let copy = diagram.duplicate(item, cursor + (item.origin() - top_left));
            pasted.push(diagram.place(copy));
        }
        diagram.settle(pasted.clone());
        pasted
    }
}
