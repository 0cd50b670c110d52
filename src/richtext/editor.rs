// Row Editor
// The editing session: owns the document, reads and restores the selection
// through a SelectionProvider and exposes the toolbar commands.

use tracing::debug;

use super::error::{EditError, EditResult};
use super::inline_style::{BlockKind, apply_inline_styles, intersection_block_kind, intersection_style};
use super::list::{toggle_list, un_toggle_list};
use super::node_tree::{ListKind, TitleLevel};
use super::normalize::{NormalizeOptions, normalize_range};
use super::paste::{ClipboardPayload, PasteRules, paste};
use super::range::{AnchoredRange, Range, split_range};
use super::row_document::RowDocument;
use super::style::{StyleDelta, StyleProperty};
use super::title::title;
use crate::config::EditorConfig;

/// Where the editor reads the user's selection from and writes it back to
pub trait SelectionProvider {
    fn current_selection(&self) -> Option<Range>;
    fn set_selection(&mut self, range: Range);
}

/// Selection kept by the editor itself, for use without a UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSelection {
    range: Option<Range>,
}

impl SelectionProvider for SessionSelection {
    fn current_selection(&self) -> Option<Range> {
        self.range
    }

    fn set_selection(&mut self, range: Range) {
        self.range = Some(range);
    }
}

/// Toolbar state for the current selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveStatus {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    /// `None` when the selected rows differ
    pub block_kind: Option<BlockKind>,
}

pub struct RowEditor<S: SelectionProvider = SessionSelection> {
    document: RowDocument,
    selection: S,
    paste_rules: PasteRules,
    active: ActiveStatus,
}

impl RowEditor<SessionSelection> {
    /// Create an editor with a single empty row
    pub fn new() -> Self {
        Self::with_selection_provider(RowDocument::new(), SessionSelection::default())
    }

    pub fn from_markup(markup: &str) -> Self {
        Self::with_selection_provider(RowDocument::from_markup(markup), SessionSelection::default())
    }
}

impl Default for RowEditor<SessionSelection> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SelectionProvider> RowEditor<S> {
    pub fn with_selection_provider(document: RowDocument, selection: S) -> Self {
        RowEditor {
            document,
            selection,
            paste_rules: PasteRules::default(),
            active: ActiveStatus::default(),
        }
    }

    /// Apply the paste settings of `config`
    pub fn with_config(mut self, config: &EditorConfig) -> Self {
        self.paste_rules = config.paste.rules();
        self
    }

    pub fn document(&self) -> &RowDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut RowDocument {
        &mut self.document
    }

    pub fn selection(&self) -> Option<Range> {
        self.selection.current_selection()
    }

    /// The provider's selection, unless it names nodes no longer in the document
    fn live_selection(&self) -> Option<Range> {
        let range = self.selection.current_selection()?;
        let tree = self.document.tree();
        if tree.contains(range.start.node) && tree.contains(range.end.node) {
            Some(range)
        } else {
            debug!("selection refers to removed nodes, ignoring it");
            None
        }
    }

    pub fn select(&mut self, range: Range) {
        self.selection.set_selection(range);
    }

    pub fn selection_provider(&self) -> &S {
        &self.selection
    }

    pub fn to_markup(&self) -> String {
        self.document.to_markup()
    }

    /// Apply a style delta to the selected text
    pub fn format_text(&mut self, delta: &StyleDelta) -> EditResult {
        let Some(range) = self.live_selection() else {
            return Ok(());
        };
        let root = self.document.root();
        let tree = self.document.tree_mut();
        let mut range = range.ordered(tree);
        if range.is_collapsed() {
            debug!("collapsed selection, nothing to format");
            return Ok(());
        }

        split_range(tree, &mut range)?;
        let anchored = AnchoredRange::capture(tree, &range);
        apply_inline_styles(tree, &range, delta);
        let mut range = anchored.resolve(tree);
        normalize_range(tree, root, &mut range, NormalizeOptions::unwrapping_empty_spans());

        self.selection.set_selection(range);
        self.check_active_status();
        Ok(())
    }

    pub fn bold(&mut self, on: bool) -> EditResult {
        self.format_text(&StyleDelta::single(StyleProperty::FontWeight, on.then_some("bold")))
    }

    pub fn italic(&mut self, on: bool) -> EditResult {
        self.format_text(&StyleDelta::single(StyleProperty::FontStyle, on.then_some("italic")))
    }

    pub fn underline(&mut self, on: bool) -> EditResult {
        self.format_text(&StyleDelta::single(
            StyleProperty::TextDecoration,
            on.then_some("underline"),
        ))
    }

    pub fn strikethrough(&mut self, on: bool) -> EditResult {
        self.format_text(&StyleDelta::single(
            StyleProperty::TextDecoration,
            on.then_some("line-through"),
        ))
    }

    /// Turn the selected rows into headings of `level`, or back into paragraphs
    pub fn title(&mut self, level: Option<TitleLevel>) {
        let Some(range) = self.live_selection() else {
            return;
        };
        let root = self.document.root();
        if let Some(selection) = title(self.document.tree_mut(), root, &range, level) {
            self.selection.set_selection(selection);
            self.check_active_status();
        }
    }

    pub fn toggle_list(&mut self, kind: ListKind) {
        let Some(range) = self.live_selection() else {
            return;
        };
        let root = self.document.root();
        if let Some(selection) = toggle_list(self.document.tree_mut(), root, &range, kind) {
            self.selection.set_selection(selection);
            self.check_active_status();
        }
    }

    pub fn un_toggle_list(&mut self, kind: ListKind) {
        let Some(range) = self.live_selection() else {
            return;
        };
        let root = self.document.root();
        if let Some(selection) = un_toggle_list(self.document.tree_mut(), root, &range, kind) {
            self.selection.set_selection(selection);
            self.check_active_status();
        }
    }

    /// Paste at the selection start; a non-collapsed selection is collapsed first
    pub fn paste(&mut self, payload: &impl ClipboardPayload) -> EditResult {
        let Some(range) = self.live_selection() else {
            return Ok(());
        };
        let root = self.document.root();
        let tree = self.document.tree_mut();
        let caret = range.ordered(tree).start;

        match paste(tree, root, caret, payload, &self.paste_rules) {
            Ok(Some(caret)) => {
                self.selection.set_selection(Range::collapsed_at(caret));
                self.check_active_status();
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(EditError::NoRow(node)) => {
                debug!(%node, "caret is not inside a row, ignoring paste");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Recompute the toolbar state from the current selection
    pub fn check_active_status(&mut self) -> ActiveStatus {
        self.active = match self.live_selection() {
            Some(range) => {
                let tree = self.document.tree();
                let range = range.ordered(tree);
                let style = intersection_style(tree, &range);
                let decoration = style.get(StyleProperty::TextDecoration);
                ActiveStatus {
                    bold: style.get(StyleProperty::FontWeight) == Some("bold"),
                    italic: style.get(StyleProperty::FontStyle) == Some("italic"),
                    underline: decoration == Some("underline"),
                    strikethrough: decoration == Some("line-through"),
                    block_kind: intersection_block_kind(tree, &range),
                }
            }
            None => ActiveStatus::default(),
        };
        self.active
    }

    pub fn active_status(&self) -> ActiveStatus {
        self.active
    }
}
