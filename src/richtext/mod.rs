pub mod error;
pub mod node_tree;
pub mod style;

pub mod markup;
pub mod normalize;
pub mod range;
pub mod row_document;

pub mod editor;
pub mod inline_style;
pub mod list;
pub mod paste;
pub mod title;
