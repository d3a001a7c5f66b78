mod cancellation;
mod chunking;
pub mod errors;
mod language;
pub mod models;
mod storage;
#[cfg(test)]
mod testutils;
mod tooling;
mod training;
mod utils;
mod utterance;

pub use crate::cancellation::CancellationToken;
pub use crate::chunking::{chunk_slots, plain_text, UtteranceChunk};
pub use crate::errors::*;
pub use crate::language::Language;
pub use crate::models::*;
pub use crate::storage::{DocumentStore, InMemoryDocumentStore, ModelStore};
pub use crate::tooling::ToolingAdapter;
pub use crate::training::{
    AppendNoneIntents, BuildArtifacts, CancelledRun, TfidfWeights, TrainOutcome, Trainer,
    TrainingStage,
};
pub use crate::utils::{sanitize_file_name, EntityName, IntentName, SlotName};
pub use crate::utterance::{
    is_word, ExtractedEntity, ExtractedSlot, RenderOptions, SlotRenderMode, TaggedEntity,
    TaggedSlot, Token, TokenRange, Utterance, SPACE_MARKER,
};
