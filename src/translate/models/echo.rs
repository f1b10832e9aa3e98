//! Offline model for dry runs.

use crate::error::Result;
use crate::translate::prompt::prompt_content;
use crate::translate::{Reply, Translate};

/// Replies with the content portion of each prompt, unchanged.
///
/// Exercises the whole pipeline without a network round trip.
#[derive(Debug, Clone, Default)]
pub struct EchoModel;

impl EchoModel {
    pub fn new() -> Self {
        Self
    }
}

impl Translate for EchoModel {
    fn name(&self) -> &str {
        "echo"
    }

    fn translate(&self, prompt: &str) -> Result<Reply> {
        Ok(Reply::ok(prompt_content(prompt)))
    }

    fn max_in_flight(&self) -> usize {
        usize::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::prompt::text_prompt;

    #[test]
    fn test_echoes_content() {
        let reply = EchoModel::new().translate(&text_prompt("Bonjour.", "English")).unwrap();
        assert_eq!(reply.text, "Bonjour.");
        assert!(reply.success);
    }
}
