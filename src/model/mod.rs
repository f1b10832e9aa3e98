//! Content model shared by extraction, translation and rendering.
//!
//! A [`Document`] owns its [`Page`]s; each page owns an ordered list of
//! [`Content`] blocks. The block kinds form a closed enum so every consumer
//! handles text, tables and images exhaustively.

mod content;
mod document;
mod grid;
mod page;

pub use content::{
    Color, Content, ImageContent, ImageFormat, TableContent, TextContent, TextStyle,
    DEFAULT_SPACE_BEFORE,
};
pub use document::Document;
pub use grid::Grid;
pub use page::{Margins, Page};
