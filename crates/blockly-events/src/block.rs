//! Blocks: the nodes of a workspace's block tree.
//!
//! A block owns its own state (fields, comment, flags, mutation) and knows
//! the ids of the blocks plugged into it, never the blocks themselves. The
//! [`Workspace`](crate::Workspace) owns every block and keeps the parent /
//! child links consistent.

use indexmap::IndexMap;

use blockly_types::{BlockId, Coordinate, Element};

/// How a child connects through an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum InputKind {
    /// Expression socket (`<value>` in XML).
    Value,
    /// Statement stack socket (`<statement>` in XML).
    Statement,
}

/// A named input socket on a block.
#[derive(Clone, Debug, PartialEq)]
pub struct Input {
    pub name: String,
    pub kind: InputKind,
    /// Block currently plugged into this input.
    pub target: Option<BlockId>,
}

impl Input {
    pub fn new(name: impl Into<String>, kind: InputKind) -> Self {
        Self {
            name: name.into(),
            kind,
            target: None,
        }
    }
}

/// Where a block is attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentLink {
    pub parent: BlockId,
    /// Input name on the parent; `None` means the parent's next connection.
    pub input: Option<String>,
}

/// Structural-state hooks for blocks whose shape depends on a mutation
/// (e.g. an `if` block with a variable number of `else if` arms).
#[derive(Clone, Debug, PartialEq)]
pub struct Mutator {
    /// Current `<mutation>` element.
    pub state: Element,
    /// Whether the mutator editor is currently open.
    pub open: bool,
}

/// A block in a workspace.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub block_type: String,
    pub shadow: bool,
    pub fields: IndexMap<String, String>,
    pub inputs: Vec<Input>,
    pub next: Option<BlockId>,
    pub parent: Option<ParentLink>,
    pub comment: Option<String>,
    pub collapsed: bool,
    pub disabled: bool,
    /// `None` keeps the block type's default layout.
    pub inputs_inline: Option<bool>,
    /// `None` when the block type has no mutation hooks.
    pub mutator: Option<Mutator>,
    /// Position relative to the workspace surface (meaningful for top-level blocks).
    pub xy: Coordinate,
}

impl Block {
    /// A fresh, unattached block with no fields or inputs.
    pub fn new(id: impl Into<BlockId>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            shadow: false,
            fields: IndexMap::new(),
            inputs: Vec::new(),
            next: None,
            parent: None,
            comment: None,
            collapsed: false,
            disabled: false,
            inputs_inline: None,
            mutator: None,
            xy: Coordinate::default(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, kind: InputKind) -> Self {
        self.inputs.push(Input::new(name, kind));
        self
    }

    /// Give the block mutation hooks with an initial state.
    pub fn with_mutator(mut self, state: Element) -> Self {
        self.mutator = Some(Mutator { state, open: false });
        self
    }

    pub fn as_shadow(mut self) -> Self {
        self.shadow = true;
        self
    }

    pub fn at(mut self, xy: Coordinate) -> Self {
        self.xy = xy;
        self
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    pub fn parent_id(&self) -> Option<&BlockId> {
        self.parent.as_ref().map(|p| &p.parent)
    }

    pub fn get_field_value(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Set an existing field. Returns `false` if the block has no such field.
    pub fn set_field_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn comment_text(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Set the comment; empty text removes it.
    pub fn set_comment_text(&mut self, text: &str) {
        self.comment = if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        };
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.disabled = !enabled;
    }

    pub fn set_inputs_inline(&mut self, inline: bool) {
        self.inputs_inline = Some(inline);
    }

    pub fn get_input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn get_input_mut(&mut self, name: &str) -> Option<&mut Input> {
        self.inputs.iter_mut().find(|i| i.name == name)
    }

    /// Ids plugged into this block, inputs first (in input order), then next.
    pub fn child_ids(&self) -> Vec<BlockId> {
        self.inputs
            .iter()
            .filter_map(|i| i.target.clone())
            .chain(self.next.clone())
            .collect()
    }

    pub fn has_mutator(&self) -> bool {
        self.mutator.is_some()
    }

    pub fn is_mutator_open(&self) -> bool {
        self.mutator.as_ref().is_some_and(|m| m.open)
    }

    pub fn set_mutator_open(&mut self, open: bool) {
        if let Some(m) = self.mutator.as_mut() {
            m.open = open;
        }
    }

    /// Current structural state, if the block has mutation hooks.
    pub fn mutation_to_dom(&self) -> Option<&Element> {
        self.mutator.as_ref().map(|m| &m.state)
    }

    /// Apply a structural state. Returns `false` if the block has no hooks.
    pub fn dom_to_mutation(&mut self, state: Element) -> bool {
        match self.mutator.as_mut() {
            Some(m) => {
                m.state = state;
                true
            }
            None => false,
        }
    }
}
