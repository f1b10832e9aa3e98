//! Markdown rendering for translated documents.

use crate::model::{Content, Document, Grid, Page};

/// Convert the translated blocks of a document to Markdown.
pub fn to_markdown(doc: &Document) -> String {
    MarkdownRenderer::new().render(doc)
}

/// Markdown renderer.
///
/// Text blocks become paragraphs, tables become pipe tables whose first row
/// is the header, and pages are separated by a horizontal rule. Blocks
/// without a usable translation are left out, as are images.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    blocks: usize,
}

impl MarkdownRenderer {
    /// Create a new Markdown renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a document to Markdown.
    pub fn render(mut self, doc: &Document) -> String {
        let mut output = String::new();
        let last = doc.pages.len().saturating_sub(1);

        for (idx, page) in doc.pages.iter().enumerate() {
            self.render_page(&mut output, page);
            if idx != last {
                output.push_str("---\n\n");
            }
        }

        log::debug!(
            "Rendered {} blocks from {} pages to Markdown",
            self.blocks,
            doc.page_count()
        );
        output
    }

    fn render_page(&mut self, output: &mut String, page: &Page) {
        for content in &page.contents {
            match content {
                Content::Text(text) => {
                    if let Some(translated) = text.translated() {
                        output.push_str(translated);
                        output.push_str("\n\n");
                        self.blocks += 1;
                    }
                }
                Content::Table(table) => {
                    if let Some(grid) = table.translated() {
                        render_table(output, grid);
                        self.blocks += 1;
                    }
                }
                // Markdown output carries no raster data.
                Content::Image(_) => {}
            }
        }
    }
}

fn render_table(output: &mut String, grid: &Grid) {
    let Some(header) = grid.header() else {
        return;
    };

    push_row(output, header.iter().map(String::as_str));
    push_row(output, header.iter().map(|_| "---"));
    for row in grid.body() {
        push_row(output, row.iter().map(String::as_str));
    }
    output.push('\n');
}

fn push_row<'a>(output: &mut String, cells: impl Iterator<Item = &'a str>) {
    output.push('|');
    for cell in cells {
        let content = cell.replace('\n', " ").replace('|', "\\|");
        output.push_str(&format!(" {} |", content.trim()));
    }
    output.push('\n');
}
