use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use failure::format_err;
use ndarray::prelude::*;

use crate::errors::Result;
use crate::language::Language;
use crate::tooling::ToolingAdapter;
use crate::utterance::SPACE_MARKER;

pub fn assert_epsilon_eq_array1(a: &Array1<f32>, b: &Array1<f32>, epsilon: f32) {
    assert_eq!(a.dim(), b.dim());
    for (index, elem_a) in a.indexed_iter() {
        assert!(epsilon_eq(*elem_a, b[index], epsilon))
    }
}

pub fn epsilon_eq(a: f32, b: f32, epsilon: f32) -> bool {
    let diff = a - b;
    diff < epsilon && diff > -epsilon
}

/// Whitespace tokenizer with deterministic hashed embeddings. Space runs
/// become marker tokens, one marker char per space, so offsets stay
/// aligned with the source text. Calls are counted to let tests pin the
/// batching contract.
pub struct MockedToolingAdapter {
    pub tokenize_calls: AtomicUsize,
    pub vectorize_calls: AtomicUsize,
}

impl MockedToolingAdapter {
    pub fn new() -> Self {
        Self {
            tokenize_calls: AtomicUsize::new(0),
            vectorize_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ToolingAdapter for MockedToolingAdapter {
    async fn tokenize(
        &self,
        utterances: &[String],
        _language: Language,
    ) -> Result<Vec<Vec<String>>> {
        self.tokenize_calls.fetch_add(1, Ordering::SeqCst);
        Ok(utterances.iter().map(|u| whitespace_tokenize(u)).collect())
    }

    async fn vectorize(
        &self,
        tokens: &[String],
        _language: Language,
    ) -> Result<Vec<Array1<f32>>> {
        self.vectorize_calls.fetch_add(1, Ordering::SeqCst);
        Ok(tokens.iter().map(|t| hashed_vector(t)).collect())
    }
}

/// Adapter returning one tokenize output short, violating the
/// one-output-per-input contract.
pub struct ShortTokenizeAdapter;

#[async_trait]
impl ToolingAdapter for ShortTokenizeAdapter {
    async fn tokenize(
        &self,
        utterances: &[String],
        _language: Language,
    ) -> Result<Vec<Vec<String>>> {
        let mut token_lists = utterances
            .iter()
            .map(|u| whitespace_tokenize(u))
            .collect::<Vec<_>>();
        token_lists.pop();
        Ok(token_lists)
    }

    async fn vectorize(
        &self,
        tokens: &[String],
        _language: Language,
    ) -> Result<Vec<Array1<f32>>> {
        Ok(tokens.iter().map(|t| hashed_vector(t)).collect())
    }
}

/// Adapter returning one embedding short, violating the
/// one-output-per-input contract.
pub struct ShortVectorizeAdapter;

#[async_trait]
impl ToolingAdapter for ShortVectorizeAdapter {
    async fn tokenize(
        &self,
        utterances: &[String],
        _language: Language,
    ) -> Result<Vec<Vec<String>>> {
        Ok(utterances.iter().map(|u| whitespace_tokenize(u)).collect())
    }

    async fn vectorize(
        &self,
        tokens: &[String],
        _language: Language,
    ) -> Result<Vec<Array1<f32>>> {
        let mut vectors = tokens.iter().map(|t| hashed_vector(t)).collect::<Vec<_>>();
        vectors.pop();
        Ok(vectors)
    }
}

/// Adapter whose calls always fail, for stage failure propagation tests.
pub struct FailingToolingAdapter;

#[async_trait]
impl ToolingAdapter for FailingToolingAdapter {
    async fn tokenize(
        &self,
        _utterances: &[String],
        _language: Language,
    ) -> Result<Vec<Vec<String>>> {
        Err(format_err!("tokenizer backend unavailable"))
    }

    async fn vectorize(
        &self,
        _tokens: &[String],
        _language: Language,
    ) -> Result<Vec<Array1<f32>>> {
        Err(format_err!("vectorizer backend unavailable"))
    }
}

pub fn whitespace_tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_is_space = false;

    for c in text.chars() {
        let is_space = c == ' ';
        if !current.is_empty() && is_space != current_is_space {
            tokens.push(std::mem::take(&mut current));
        }
        current.push(if is_space { SPACE_MARKER } else { c });
        current_is_space = is_space;
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

pub fn hashed_vector(token: &str) -> Array1<f32> {
    let mut state: u32 = 2_166_136_261;
    let mut components = [0.0f32; 4];
    for (index, byte) in token.bytes().enumerate() {
        state = (state ^ u32::from(byte)).wrapping_mul(16_777_619);
        components[index % 4] = (state % 1000) as f32 / 1000.0;
    }
    arr1(&components)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_tokenize_works() {
        // Given
        let text = "I want  tea";

        // When
        let tokens = whitespace_tokenize(text);

        // Then
        assert_eq!(vec!["I", "▁", "want", "▁▁", "tea"], tokens);
        assert_eq!(
            text.chars().count(),
            tokens.iter().map(|t| t.chars().count()).sum::<usize>()
        );
    }

    #[test]
    fn hashed_vector_is_deterministic() {
        // Given / When
        let first = hashed_vector("latte");
        let second = hashed_vector("latte");

        // Then
        assert_epsilon_eq_array1(&first, &second, 1e-9);
        assert_ne!(hashed_vector("tea"), first);
    }
}
