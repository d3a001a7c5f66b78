use failure::{bail, format_err};
use itertools::Itertools;
use lazy_static::lazy_static;
use ndarray::Array1;
use regex::Regex;

use crate::errors::*;
use crate::language::Language;
use crate::utils::{EntityName, SlotName};

/// Marker char standing in for a space in tokenized text. One marker char
/// per source space keeps token offsets aligned with the source text.
pub const SPACE_MARKER: char = '\u{2581}';

lazy_static! {
    static ref SPACE_MARKER_RUNS: Regex = Regex::new("\u{2581}+").unwrap();
}

pub fn is_word(value: &str, language: Language) -> bool {
    !value.is_empty()
        && !value.contains(SPACE_MARKER)
        && value.chars().any(|c| language.is_word_char(c))
}

/// Options for `Utterance::render`. Defaults: `lower_case = false`,
/// `only_words = false`, `slot_render_mode = KeepValue`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub lower_case: bool,
    pub only_words: bool,
    pub slot_render_mode: SlotRenderMode,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            lower_case: false,
            only_words: false,
            slot_render_mode: SlotRenderMode::KeepValue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRenderMode {
    KeepValue,
    KeepSlotName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntity {
    pub confidence: f32,
    pub entity: EntityName,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSlot {
    pub confidence: f32,
    pub name: SlotName,
    pub source: String,
}

/// Character bounds of a tag together with the token range they resolved
/// to. The token range is always derived from the character bounds, never
/// hand-supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRange {
    pub start: usize,
    pub end: usize,
    pub start_token: usize,
    pub end_token: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEntity {
    pub entity: ExtractedEntity,
    pub range: TokenRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedSlot {
    pub slot: ExtractedSlot,
    pub range: TokenRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub index: usize,
    pub value: String,
    pub offset: usize,
    pub is_word: bool,
    pub is_bos: bool,
    pub is_eos: bool,
    pub starts_with_space: bool,
    pub vector: Array1<f32>,
    /// tf-idf weight, 0 until assigned by the weighting stage.
    pub weight: f32,
}

impl Token {
    pub fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn char_end(&self) -> usize {
        self.offset + self.char_len()
    }
}

/// A tokenized training example: an owned token sequence plus two
/// append-only tag lists. Tokens are immutable after construction except
/// for their tf-idf weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    language: Language,
    tokens: Vec<Token>,
    entities: Vec<TaggedEntity>,
    slots: Vec<TaggedSlot>,
}

impl Utterance {
    /// Builds an utterance from parallel token value and embedding lists.
    /// Character offsets are prefix sums of the token char counts, so the
    /// concatenated values reconstruct the tokenized text exactly.
    pub fn new(
        values: Vec<String>,
        vectors: Vec<Array1<f32>>,
        language: Language,
    ) -> Result<Self> {
        if values.len() != vectors.len() {
            return Err(format_err!(
                "expected one vector per token, got {} tokens and {} vectors",
                values.len(),
                vectors.len()
            ));
        }

        let count = values.len();
        let mut tokens = Vec::with_capacity(count);
        let mut offset = 0;
        for (index, (value, vector)) in values.into_iter().zip(vectors).enumerate() {
            let char_len = value.chars().count();
            tokens.push(Token {
                index,
                is_bos: index == 0,
                is_eos: index + 1 == count,
                is_word: is_word(&value, language),
                starts_with_space: value.starts_with(SPACE_MARKER),
                offset,
                vector,
                weight: 0.0,
                value,
            });
            offset += char_len;
        }

        Ok(Self {
            language,
            tokens,
            entities: vec![],
            slots: vec![],
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn entities(&self) -> &[TaggedEntity] {
        &self.entities
    }

    pub fn slots(&self) -> &[TaggedSlot] {
        &self.slots
    }

    /// The tokenized text, space markers intact.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|token| token.value.as_str()).collect()
    }

    /// Appends an entity tag covering the given char range. The token range
    /// is resolved from the char bounds; misaligned bounds are rejected.
    pub fn tag_entity(&mut self, entity: ExtractedEntity, start: usize, end: usize) -> Result<()> {
        let range = self.resolve_range(start, end)?;
        self.entities.push(TaggedEntity { entity, range });
        Ok(())
    }

    /// Appends a slot tag covering the given char range, like `tag_entity`.
    pub fn tag_slot(&mut self, slot: ExtractedSlot, start: usize, end: usize) -> Result<()> {
        let range = self.resolve_range(start, end)?;
        self.slots.push(TaggedSlot { slot, range });
        Ok(())
    }

    /// Every entity tag whose resolved token range covers `index`.
    pub fn token_entities(&self, index: usize) -> Vec<&TaggedEntity> {
        self.entities
            .iter()
            .filter(|tagged| tagged.range.start_token <= index && index <= tagged.range.end_token)
            .collect()
    }

    /// Every slot tag whose resolved token range covers `index`.
    pub fn token_slots(&self, index: usize) -> Vec<&TaggedSlot> {
        self.slots
            .iter()
            .filter(|tagged| tagged.range.start_token <= index && index <= tagged.range.end_token)
            .collect()
    }

    /// Structurally independent copy. Tags are replayed onto the copy from
    /// their original character bounds, not their token indices.
    pub fn clone_with_tags(&self, copy_entities: bool, copy_slots: bool) -> Result<Utterance> {
        let values = self.tokens.iter().map(|t| t.value.clone()).collect_vec();
        let vectors = self.tokens.iter().map(|t| t.vector.clone()).collect_vec();
        let mut copy = Utterance::new(values, vectors, self.language)?;

        if copy_entities {
            for tagged in &self.entities {
                copy.tag_entity(tagged.entity.clone(), tagged.range.start, tagged.range.end)?;
            }
        }
        if copy_slots {
            for tagged in &self.slots {
                copy.tag_slot(tagged.slot.clone(), tagged.range.start, tagged.range.end)?;
            }
        }

        Ok(copy)
    }

    pub fn set_token_weight(&mut self, index: usize, weight: f32) {
        if let Some(token) = self.tokens.get_mut(index) {
            token.weight = weight;
        }
    }

    /// Renders the utterance back to text. Slot substitution happens once
    /// per distinct slot occurrence, space-marker runs collapse to a single
    /// literal space, and case folding is applied last.
    pub fn render(&self, options: &RenderOptions) -> String {
        let mut rendered = String::new();
        let mut last_slot: Option<usize> = None;

        for token in &self.tokens {
            let covering_slot = self
                .slots
                .iter()
                .position(|tagged| {
                    tagged.range.start_token <= token.index && token.index <= tagged.range.end_token
                });

            if options.only_words && !token.is_word && covering_slot.is_none() {
                continue;
            }

            match (covering_slot, options.slot_render_mode) {
                (Some(slot_idx), SlotRenderMode::KeepSlotName) => {
                    if last_slot != Some(slot_idx) {
                        rendered.push_str(&self.slots[slot_idx].slot.name);
                    }
                }
                _ => rendered.push_str(&token.value),
            }
            last_slot = covering_slot;
        }

        let mut rendered = SPACE_MARKER_RUNS.replace_all(&rendered, " ").into_owned();
        if options.lower_case {
            rendered = rendered.to_lowercase();
        }
        rendered
    }

    fn resolve_range(&self, start: usize, end: usize) -> Result<TokenRange> {
        if end <= start {
            bail!(NluTrainingError::MisalignedTagRange(start, end));
        }

        let covered = self
            .tokens
            .iter()
            .filter(|token| token.offset >= start && token.char_end() <= end)
            .collect_vec();

        let (first, last) = match (covered.first(), covered.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => bail!(NluTrainingError::MisalignedTagRange(start, end)),
        };

        // A range starting or ending inside a token would resolve to a
        // partial cover; reject it instead.
        if first.offset != start || last.char_end() != end {
            bail!(NluTrainingError::MisalignedTagRange(start, end));
        }

        Ok(TokenRange {
            start,
            end,
            start_token: first.index,
            end_token: last.index,
        })
    }
}
