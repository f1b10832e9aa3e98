//! Translation of text and table blocks through a model backend.
//!
//! [`TranslationOrchestrator`] visits every translatable block of a
//! [`Document`] in order, asks a [`Translate`] implementation for a reply and
//! writes the result back into the block. A table reply that cannot be parsed
//! degrades only that block; a request failure aborts the run.

pub mod models;
pub mod prompt;
mod response;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Content, Document};

pub use response::TableReplyParser;

/// A model's answer to one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Raw reply text
    pub text: String,
    /// Whether the backend considers the reply usable
    pub success: bool,
}

impl Reply {
    /// A usable reply.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }

    /// A reply the backend flagged as unusable.
    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
        }
    }
}

/// A translation backend.
///
/// Implementations own their retry and backoff policy. Returning
/// [`Error::Request`] means retries are exhausted and aborts the run.
pub trait Translate: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Build the prompt for a block.
    fn prompt_for(&self, content: &Content, target_language: &str) -> String {
        prompt::default_prompt(content, target_language)
    }

    /// Send one prompt.
    fn translate(&self, prompt: &str) -> Result<Reply>;

    /// Upper bound on concurrent `translate` calls.
    fn max_in_flight(&self) -> usize {
        1
    }
}

impl<T: Translate + ?Sized> Translate for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn prompt_for(&self, content: &Content, target_language: &str) -> String {
        (**self).prompt_for(content, target_language)
    }

    fn translate(&self, prompt: &str) -> Result<Reply> {
        (**self).translate(prompt)
    }

    fn max_in_flight(&self) -> usize {
        (**self).max_in_flight()
    }
}

/// Callback receiving `(done, total)` after each block.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Options for a translation run.
#[derive(Clone)]
pub struct TranslateOptions {
    /// Language the blocks are translated into
    pub target_language: String,

    /// Maximum concurrent requests (1 = sequential)
    pub concurrency: usize,

    /// Checked before each block; when set, remaining blocks are left untranslated
    pub cancel: Option<Arc<AtomicBool>>,

    /// Progress callback
    pub progress: Option<ProgressFn>,
}

impl TranslateOptions {
    pub fn new(target_language: impl Into<String>) -> Self {
        Self {
            target_language: target_language.into(),
            ..Self::default()
        }
    }

    pub fn with_target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = language.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            target_language: "Chinese".to_string(),
            concurrency: 1,
            cancel: None,
            progress: None,
        }
    }
}

impl fmt::Debug for TranslateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslateOptions")
            .field("target_language", &self.target_language)
            .field("concurrency", &self.concurrency)
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Outcome counts of a translation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TranslationReport {
    /// Blocks holding a usable translation
    pub translated: usize,
    /// Blocks left untranslated by an unusable reply
    pub failed: usize,
    /// Pass-through blocks (images)
    pub skipped: usize,
    /// Blocks not attempted because the run was cancelled
    pub cancelled: usize,
}

impl TranslationReport {
    pub fn was_cancelled(&self) -> bool {
        self.cancelled > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Translated,
    Failed,
    Skipped,
    Cancelled,
}

/// Drives a [`Translate`] backend over a document.
pub struct TranslationOrchestrator<'a> {
    translator: &'a dyn Translate,
    options: TranslateOptions,
    parser: TableReplyParser,
}

impl<'a> TranslationOrchestrator<'a> {
    pub fn new(translator: &'a dyn Translate, options: TranslateOptions) -> Self {
        Self {
            translator,
            options,
            parser: TableReplyParser::new(),
        }
    }

    /// Translate every text and table block of `document` in place.
    pub fn run(&self, document: &mut Document) -> Result<TranslationReport> {
        let skipped = document.contents().filter(|c| !c.is_translatable()).count();
        let mut blocks: Vec<&mut Content> = document
            .contents_mut()
            .filter(|c| c.is_translatable())
            .collect();
        let total = blocks.len();

        let workers = self
            .options
            .concurrency
            .min(self.translator.max_in_flight())
            .max(1);

        log::info!(
            "Translating {} blocks into {} with {} ({} worker{})",
            total,
            self.options.target_language,
            self.translator.name(),
            workers,
            if workers == 1 { "" } else { "s" }
        );

        let done = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let visit = |content: &mut Content| -> Result<Outcome> {
            let outcome = self.translate_block(content, &abort)?;
            if matches!(outcome, Outcome::Translated | Outcome::Failed) {
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = &self.options.progress {
                    progress(finished, total);
                }
            }
            Ok(outcome)
        };

        let outcomes: Vec<Outcome> = if workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| Error::Config(format!("failed to start worker pool: {}", e)))?;
            pool.install(|| {
                blocks
                    .par_iter_mut()
                    .map(|content| visit(&mut **content))
                    .collect::<Result<Vec<_>>>()
            })?
        } else {
            blocks
                .iter_mut()
                .map(|content| visit(&mut **content))
                .collect::<Result<Vec<_>>>()?
        };

        let mut report = TranslationReport {
            skipped,
            ..TranslationReport::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Translated => report.translated += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Cancelled => report.cancelled += 1,
            }
        }

        if report.was_cancelled() {
            log::info!(
                "Translation cancelled; {} blocks left untranslated",
                report.cancelled
            );
        }
        log::info!(
            "Translated {} blocks, {} failed, {} images passed through",
            report.translated,
            report.failed,
            report.skipped
        );
        Ok(report)
    }

    fn translate_block(&self, content: &mut Content, abort: &AtomicBool) -> Result<Outcome> {
        if self.options.is_cancelled() || abort.load(Ordering::SeqCst) {
            return Ok(Outcome::Cancelled);
        }

        let prompt = self
            .translator
            .prompt_for(content, &self.options.target_language);
        log::debug!("Prompt: {}", prompt);

        let reply = match self.translator.translate(&prompt) {
            Ok(reply) => reply,
            Err(e) => {
                abort.store(true, Ordering::SeqCst);
                return Err(e);
            }
        };
        log::debug!("Reply: {}", reply.text);

        match content {
            Content::Text(text) => text.set_translation(reply.text, reply.success),
            Content::Table(table) => match self.parser.parse(&reply.text) {
                Ok(grid) => table.set_translation(grid, reply.success),
                Err(e) => {
                    log::warn!("Table at y={} left untranslated: {}", table.anchor, e);
                    table.clear_translation();
                }
            },
            Content::Image(_) => return Ok(Outcome::Skipped),
        }

        Ok(if content.status() {
            Outcome::Translated
        } else {
            Outcome::Failed
        })
    }
}

/// Translate a document with default orchestration.
pub fn translate_document(
    document: &mut Document,
    translator: &dyn Translate,
    options: TranslateOptions,
) -> Result<TranslationReport> {
    TranslationOrchestrator::new(translator, options).run(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Grid, ImageContent, Margins, Page, TableContent, TextContent, TextStyle};
    use models::EchoModel;
    use std::sync::Mutex;

    struct Fixed(String);

    impl Translate for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn translate(&self, _prompt: &str) -> Result<Reply> {
            Ok(Reply::ok(self.0.clone()))
        }
    }

    struct Failing;

    impl Translate for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn translate(&self, _prompt: &str) -> Result<Reply> {
            Err(Error::Request("retries exhausted".to_string()))
        }
    }

    struct Recording(Mutex<Vec<String>>);

    impl Translate for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn translate(&self, prompt: &str) -> Result<Reply> {
            self.0.lock().unwrap().push(prompt.to_string());
            Ok(Reply::failed("?"))
        }
    }

    fn margins() -> Margins {
        Margins {
            left: 72.0,
            right: 540.0,
            top: 72.0,
            bottom: 72.0,
        }
    }

    fn table_document() -> Document {
        let grid = Grid::from_rows(vec![vec!["Name", "Qty"], vec!["Apple", "3"]]).unwrap();
        let mut page = Page::new(1, 612.0, 792.0, margins());
        page.add_content(TableContent::new(grid, 600.0, vec![234.0, 234.0]));
        let mut doc = Document::new("t.pdf");
        doc.add_page(page);
        doc
    }

    fn mixed_document(paragraphs: usize) -> Document {
        let mut page = Page::new(1, 612.0, 792.0, margins());
        for i in 0..paragraphs {
            let anchor = 700.0 - i as f32 * 20.0;
            page.add_content(TextContent::new(format!("Line {}.", i), anchor, TextStyle::default()));
        }
        page.add_content(ImageContent::new(vec![0x89, b'P'], 10.0, 10.0, 100.0));
        let mut doc = Document::new("m.pdf");
        doc.add_page(page);
        doc
    }

    fn table(doc: &Document) -> &TableContent {
        match &doc.pages[0].contents[0] {
            Content::Table(table) => table,
            other => panic!("expected table, got {}", other.kind()),
        }
    }

    #[test]
    fn test_table_reply_parsed_into_grid() {
        let mut doc = table_document();
        let translator = Fixed("a, b\nc, d".to_string());
        let report = translate_document(&mut doc, &translator, TranslateOptions::default()).unwrap();

        let table = table(&doc);
        assert!(table.status);
        assert_eq!(
            table.translation.as_ref().unwrap().rows(),
            &[vec!["a", "b"], vec!["c", "d"]]
        );
        assert_eq!(report.translated, 1);
    }

    #[test]
    fn test_garbled_table_reply_degrades_block() {
        for reply in ["", "a, b\nnonsense reply here"] {
            let mut doc = table_document();
            let translator = Fixed(reply.to_string());
            let report =
                translate_document(&mut doc, &translator, TranslateOptions::default()).unwrap();

            let table = table(&doc);
            assert!(!table.status);
            assert!(table.translation.is_none());
            assert_eq!(report.failed, 1);
        }
    }

    #[test]
    fn test_text_stored_verbatim_and_images_skipped() {
        let mut doc = mixed_document(2);
        let translator = Fixed("  Bonjour  ".to_string());
        let report = translate_document(&mut doc, &translator, TranslateOptions::default()).unwrap();

        match &doc.pages[0].contents[0] {
            Content::Text(text) => assert_eq!(text.translated(), Some("  Bonjour  ")),
            other => panic!("expected text, got {}", other.kind()),
        }
        assert_eq!(report.translated, 2);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_unsuccessful_reply_keeps_status_false() {
        let mut doc = mixed_document(1);
        let translator = Recording(Mutex::new(Vec::new()));
        let options = TranslateOptions::new("Korean");
        let report = translate_document(&mut doc, &translator, options).unwrap();

        assert_eq!(report.failed, 1);
        assert!(!doc.pages[0].contents[0].status());
        let prompts = translator.0.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Korean"));
    }

    #[test]
    fn test_request_error_aborts() {
        let mut doc = mixed_document(3);
        let err = translate_document(&mut doc, &Failing, TranslateOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Request(_)));
    }

    #[test]
    fn test_cancel_leaves_blocks_untranslated() {
        let mut doc = mixed_document(3);
        let flag = Arc::new(AtomicBool::new(true));
        let options = TranslateOptions::default().with_cancel_flag(flag);
        let report = translate_document(&mut doc, &EchoModel::new(), options).unwrap();

        assert_eq!(report.cancelled, 3);
        assert!(report.was_cancelled());
        assert_eq!(doc.translation_summary(), (0, 3));
    }

    #[test]
    fn test_parallel_preserves_document_order() {
        let mut doc = mixed_document(20);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let options = TranslateOptions::default()
            .with_concurrency(4)
            .with_progress(move |_, total| {
                assert_eq!(total, 20);
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let report = translate_document(&mut doc, &EchoModel::new(), options).unwrap();

        assert_eq!(report.translated, 20);
        assert_eq!(seen.load(Ordering::SeqCst), 20);
        for (i, content) in doc.pages[0].contents.iter().take(20).enumerate() {
            match content {
                Content::Text(text) => assert_eq!(text.translated(), Some(format!("Line {}.", i).as_str())),
                other => panic!("expected text, got {}", other.kind()),
            }
        }
    }
}
