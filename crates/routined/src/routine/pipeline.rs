//! The routine parsing pipeline: interpreter then normalizer.

use std::sync::Arc;

use super::error::ParseFailure;
use super::interpreter::LanguageModel;
use super::interpreter::SentenceInterpreter;
use super::normalizer;
use super::normalizer::Policy;
use super::update::RoutineParseResult;

/// Parses routine sentences into normalized device updates.
///
/// Stateless across calls: `parse` borrows immutably and independent
/// invocations may run concurrently. Failures are all-or-nothing; a partial
/// result is never returned.
pub struct RoutinePipeline {
    interpreter: SentenceInterpreter,
    policy: Policy,
}

impl RoutinePipeline {
    pub fn new(model: Arc<dyn LanguageModel>, policy: Policy) -> Self {
        Self {
            interpreter: SentenceInterpreter::new(model),
            policy,
        }
    }

    /// Parse one routine sentence.
    ///
    /// The original sentence is carried into the result for audit and
    /// display.
    pub async fn parse(&self, text: &str) -> Result<RoutineParseResult, ParseFailure> {
        let raw = self.interpreter.interpret(text).await?;
        let updates = normalizer::normalize(raw, self.policy)?;

        tracing::debug!(count = updates.len(), "parsed routine sentence");

        Ok(RoutineParseResult {
            updates,
            routine: text.to_string(),
        })
    }
}
