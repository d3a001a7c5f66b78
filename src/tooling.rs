use async_trait::async_trait;
use ndarray::Array1;

use crate::errors::Result;
use crate::language::Language;

/// Batch tokenizer and vectorizer supplied by the hosting service.
///
/// Space runs in the input text are represented in the token output with
/// the `U+2581` marker, one marker char per source space, so that the
/// concatenated token values keep the char length of the source text.
#[async_trait]
pub trait ToolingAdapter: Send + Sync {
    /// Returns one token list per input utterance, order preserving.
    async fn tokenize(
        &self,
        utterances: &[String],
        language: Language,
    ) -> Result<Vec<Vec<String>>>;

    /// Returns one embedding per input token, order preserving and
    /// deterministic for identical input.
    async fn vectorize(&self, tokens: &[String], language: Language)
        -> Result<Vec<Array1<f32>>>;
}
