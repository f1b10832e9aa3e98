//! Stock prompts for text and table blocks.
//!
//! Every prompt is an instruction line followed by a blank line and the
//! block's content, so offline models can recover the content verbatim.

use crate::model::{Content, Grid};

/// Separator between the instruction and the content of a prompt.
pub const CONTENT_SEPARATOR: &str = "\n\n";

/// Prompt for a paragraph of text.
pub fn text_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text into {}. Do not add any extra information.{}{}",
        target_language, CONTENT_SEPARATOR, text
    )
}

/// Prompt for a table, rendered as aligned columns.
pub fn table_prompt(grid: &Grid, target_language: &str) -> String {
    format!(
        "Translate the following table into {}. Do not add any extra information, \
         keep the spacing (spaces and separators) and reply with the table only.{}{}",
        target_language,
        CONTENT_SEPARATOR,
        grid.to_aligned_text()
    )
}

/// The stock prompt for a block. Images have no prompt.
pub fn default_prompt(content: &Content, target_language: &str) -> String {
    match content {
        Content::Text(text) => text_prompt(&text.original, target_language),
        Content::Table(table) => table_prompt(&table.original, target_language),
        Content::Image(_) => String::new(),
    }
}

/// The content portion of a stock prompt.
pub fn prompt_content(prompt: &str) -> &str {
    prompt
        .split_once(CONTENT_SEPARATOR)
        .map(|(_, content)| content)
        .unwrap_or(prompt)
}
