use lazy_static::lazy_static;
use regex::Regex;

use crate::models::SlotDefinition;
use crate::utils::{EntityName, SlotName};

lazy_static! {
    static ref SLOT_ANNOTATION: Regex = Regex::new(r"\[(.+?)\]\(([\w._-]+)\)").unwrap();
}

/// A contiguous slice of a raw annotated utterance, either literal text or
/// the value of a recognized slot reference.
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceChunk {
    pub value: String,
    pub slot_idx: Option<usize>,
    pub slot_name: Option<SlotName>,
    pub entities: Option<Vec<EntityName>>,
}

impl UtteranceChunk {
    fn literal(value: &str) -> Self {
        Self {
            value: value.to_string(),
            slot_idx: None,
            slot_name: None,
            entities: None,
        }
    }

    pub fn is_slot(&self) -> bool {
        self.slot_name.is_some()
    }
}

/// Splits raw annotated text like `I want [a latte](drink_type) please`
/// into literal and slot chunks. `[value](name)` references whose name does
/// not match any slot definition are kept verbatim inside literal content.
/// Slot indices count recognized slots left to right from 0.
pub fn chunk_slots(utterance: &str, slot_definitions: &[SlotDefinition]) -> Vec<UtteranceChunk> {
    let mut chunks = Vec::new();
    let mut cursor = 0;
    let mut slot_idx = 0;

    for captures in SLOT_ANNOTATION.captures_iter(utterance) {
        let matched = match captures.get(0) {
            Some(matched) => matched,
            None => continue,
        };
        let slot_value = &captures[1];
        let slot_name = &captures[2];

        let definition = match slot_definitions.iter().find(|def| def.name == slot_name) {
            Some(definition) => definition,
            // Not a known slot: its text stays part of the surrounding
            // literal content.
            None => continue,
        };

        if cursor < matched.start() {
            chunks.push(UtteranceChunk::literal(&utterance[cursor..matched.start()]));
        }
        chunks.push(UtteranceChunk {
            value: slot_value.to_string(),
            slot_idx: Some(slot_idx),
            slot_name: Some(definition.name.clone()),
            entities: Some(definition.entities.clone()),
        });
        slot_idx += 1;
        cursor = matched.end();
    }

    if cursor < utterance.len() {
        chunks.push(UtteranceChunk::literal(&utterance[cursor..]));
    }

    chunks
}

/// Concatenation of the chunk values, i.e. the utterance text with the
/// recognized annotation syntax stripped.
pub fn plain_text(chunks: &[UtteranceChunk]) -> String {
    chunks.iter().map(|chunk| chunk.value.as_str()).collect()
}
