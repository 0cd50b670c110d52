// Library exports for rowedit

pub mod config;
pub mod richtext;

pub use config::{ConfigError, EditorConfig};
pub use richtext::editor::{ActiveStatus, RowEditor, SelectionProvider, SessionSelection};
pub use richtext::error::{EditError, EditResult};
pub use richtext::node_tree::{ListKind, NodeId, NodeTree, Tag, TitleLevel};
pub use richtext::paste::{ClipboardPayload, PayloadKind, StaticPayload};
pub use richtext::range::{Boundary, Range};
pub use richtext::row_document::RowDocument;
