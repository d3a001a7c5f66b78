mod stages;

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use failure::{bail, format_err, ResultExt};
use itertools::Itertools;
use log::{debug, info};
use lru_cache::LruCache;
use ndarray::Array1;

use crate::cancellation::CancellationToken;
use crate::chunking::chunk_slots;
use crate::errors::*;
use crate::language::Language;
use crate::models::{
    SlotDefinition, StructuredTrainInput, StructuredTrainOutput, TrainArtifacts, TrainModel,
};
use crate::tooling::ToolingAdapter;
use crate::utils::sanitize_file_name;
use crate::utterance::{ExtractedSlot, Utterance};

pub use self::stages::{AppendNoneIntents, BuildArtifacts, TfidfWeights, TrainingStage};

const UTTERANCE_PROCESSING_STAGE: &str = "utterance-processing";
const VECTOR_CACHE_CAPACITY: usize = 10_000;

/// Outcome of a training run. Cancellation is neither success nor failure;
/// failures travel through the `Result` layer.
#[derive(Debug)]
pub enum TrainOutcome {
    Completed(TrainModel),
    Cancelled(CancelledRun),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancelledRun {
    /// Name of the stage that was skipped when cancellation was observed.
    pub before_stage: String,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CachePartition {
    bot_id: String,
    language: Language,
}

/// Sequences the training pipeline: input validation, utterance processing
/// (chunking, batched tokenization and vectorization, utterance
/// construction with slot tagging), then the configured extension stages.
/// The cancellation token is checked between stages, never inside one.
pub struct Trainer {
    tools: Arc<dyn ToolingAdapter>,
    stages: Vec<Box<dyn TrainingStage>>,
    vector_caches: Mutex<HashMap<CachePartition, LruCache<String, Array1<f32>>>>,
}

impl Trainer {
    pub fn new(tools: Arc<dyn ToolingAdapter>) -> Self {
        Self::with_stages(
            tools,
            vec![
                Box::new(AppendNoneIntents),
                Box::new(TfidfWeights),
                Box::new(BuildArtifacts),
            ],
        )
    }

    pub fn with_stages(tools: Arc<dyn ToolingAdapter>, stages: Vec<Box<dyn TrainingStage>>) -> Self {
        Self {
            tools,
            stages,
            vector_caches: Mutex::new(HashMap::new()),
        }
    }

    pub async fn train(
        &self,
        input: StructuredTrainInput,
        token: &CancellationToken,
    ) -> Result<TrainOutcome> {
        let started_at = Utc::now();
        let language = validate_train_input(&input)?;
        info!(
            "Training run for bot '{}' ({}) started, {} intent(s)",
            input.bot_id,
            language,
            input.intents.len()
        );

        if let Some(cancelled) = cancelled_run(token, UTTERANCE_PROCESSING_STAGE) {
            return Ok(TrainOutcome::Cancelled(cancelled));
        }

        let mut output = self
            .process_utterances(input, language)
            .await
            .with_context(|_| NluTrainingError::StageFailure(UTTERANCE_PROCESSING_STAGE))?;

        for stage in &self.stages {
            if let Some(cancelled) = cancelled_run(token, stage.name()) {
                info!(
                    "Training run for bot '{}' cancelled before stage '{}'",
                    output.bot_id,
                    stage.name()
                );
                return Ok(TrainOutcome::Cancelled(cancelled));
            }
            debug!("Applying training stage '{}'", stage.name());
            output = stage
                .apply(output, self.tools.as_ref())
                .await
                .with_context(|_| NluTrainingError::StageFailure(stage.name()))?;
        }

        let finished_at = Utc::now();
        info!("Training run for bot '{}' completed", output.bot_id);
        Ok(TrainOutcome::Completed(TrainModel {
            bot_id: output.bot_id.clone(),
            language,
            started_at,
            finished_at,
            output,
        }))
    }

    /// Chunks every utterance of every intent, tokenizes all of them in a
    /// single batch, vectorizes the deduplicated token set in a single
    /// batch, then builds utterances and tags the chunked slots onto them.
    async fn process_utterances(
        &self,
        input: StructuredTrainInput,
        language: Language,
    ) -> Result<StructuredTrainOutput> {
        let pending = input
            .intents
            .iter()
            .map(|intent| {
                intent
                    .utterances
                    .iter()
                    .map(|raw| pending_utterance(raw, &intent.slot_definitions))
                    .collect_vec()
            })
            .collect_vec();

        let texts = pending
            .iter()
            .flatten()
            .map(|utterance| utterance.text.clone())
            .collect_vec();

        let token_lists = if texts.is_empty() {
            vec![]
        } else {
            let token_lists = self.tools.tokenize(&texts, language).await?;
            if token_lists.len() != texts.len() {
                bail!(NluTrainingError::ToolingContractViolation(format!(
                    "tokenize returned {} token lists for {} utterances",
                    token_lists.len(),
                    texts.len()
                )));
            }
            token_lists
        };

        let unique_tokens = token_lists.iter().flatten().cloned().unique().collect_vec();
        let vector_map = self
            .resolve_vectors(&input.bot_id, language, unique_tokens)
            .await?;

        let mut token_lists = token_lists.into_iter();
        let mut intents = Vec::with_capacity(input.intents.len());
        for (intent, pending_utterances) in input.intents.iter().zip(pending) {
            let mut utterances = Vec::with_capacity(pending_utterances.len());
            for pending_utterance in pending_utterances {
                let tokens = token_lists
                    .next()
                    .ok_or_else(|| format_err!("tokenized batch shorter than utterance batch"))?;
                let vectors = tokens
                    .iter()
                    .map(|token| {
                        vector_map
                            .get(token)
                            .cloned()
                            .ok_or_else(|| format_err!("no vector for token '{}'", token))
                    })
                    .collect::<Result<Vec<_>>>()?;

                let mut utterance = Utterance::new(tokens, vectors, language)?;
                for slot in pending_utterance.slots {
                    utterance.tag_slot(
                        ExtractedSlot {
                            confidence: 1.0,
                            name: slot.name,
                            source: slot.source,
                        },
                        slot.start,
                        slot.end,
                    )?;
                }
                utterances.push(utterance);
            }
            intents.push(intent.with_utterances(utterances));
        }

        Ok(StructuredTrainOutput {
            bot_id: input.bot_id,
            language,
            pattern_entities: input.pattern_entities,
            list_entities: input.list_entities,
            contexts: input.contexts,
            intents,
            artifacts: TrainArtifacts::default(),
        })
    }

    /// Resolves embeddings for the given tokens, consulting the per
    /// bot+language cache first and fetching the misses in one batch call.
    /// The cache lock is never held across the adapter call.
    async fn resolve_vectors(
        &self,
        bot_id: &str,
        language: Language,
        tokens: Vec<String>,
    ) -> Result<HashMap<String, Array1<f32>>> {
        let partition = CachePartition {
            bot_id: bot_id.to_string(),
            language,
        };

        let mut resolved = HashMap::with_capacity(tokens.len());
        let mut missing = Vec::new();
        {
            let mut caches = self.vector_caches.lock().unwrap();
            let cache = caches
                .entry(partition.clone())
                .or_insert_with(|| LruCache::new(VECTOR_CACHE_CAPACITY));
            for token in tokens {
                match cache.get_mut(&token) {
                    Some(vector) => {
                        resolved.insert(token, vector.clone());
                    }
                    None => missing.push(token),
                }
            }
        }

        if !missing.is_empty() {
            let vectors = self.tools.vectorize(&missing, language).await?;
            if vectors.len() != missing.len() {
                bail!(NluTrainingError::ToolingContractViolation(format!(
                    "vectorize returned {} embeddings for {} tokens",
                    vectors.len(),
                    missing.len()
                )));
            }
            let mut caches = self.vector_caches.lock().unwrap();
            let cache = caches
                .entry(partition)
                .or_insert_with(|| LruCache::new(VECTOR_CACHE_CAPACITY));
            for (token, vector) in missing.into_iter().zip(vectors) {
                cache.insert(token.clone(), vector.clone());
                resolved.insert(token, vector);
            }
        }

        Ok(resolved)
    }
}

struct PendingUtterance {
    text: String,
    slots: Vec<PendingSlot>,
}

struct PendingSlot {
    name: String,
    source: String,
    start: usize,
    end: usize,
}

/// Flattens an annotated utterance into its clean text plus the char
/// ranges of its recognized slots, so the slot information survives until
/// utterance construction.
fn pending_utterance(raw: &str, slot_definitions: &[SlotDefinition]) -> PendingUtterance {
    let chunks = chunk_slots(raw, slot_definitions);
    let mut text = String::new();
    let mut offset = 0;
    let mut slots = Vec::new();

    for chunk in &chunks {
        let char_len = chunk.value.chars().count();
        if let Some(name) = &chunk.slot_name {
            slots.push(PendingSlot {
                name: name.clone(),
                source: chunk.value.clone(),
                start: offset,
                end: offset + char_len,
            });
        }
        text.push_str(&chunk.value);
        offset += char_len;
    }

    PendingUtterance { text, slots }
}

fn cancelled_run(token: &CancellationToken, stage: &str) -> Option<CancelledRun> {
    if token.is_cancelled() {
        Some(CancelledRun {
            before_stage: stage.to_string(),
            cancelled_at: token.cancelled_at().unwrap_or_else(Utc::now),
        })
    } else {
        None
    }
}

/// Synchronous validation of a training request. Violations are
/// non-retryable: the caller must correct the input.
fn validate_train_input(input: &StructuredTrainInput) -> Result<Language> {
    let language = Language::from_str(&input.language_code)?;

    if input.bot_id.trim().is_empty() {
        bail!(NluTrainingError::InvalidTrainInput(
            "bot id must not be empty".to_string()
        ));
    }

    let mut entity_names = HashSet::new();
    let pattern_names = input.pattern_entities.iter().map(|e| &e.name);
    let list_names = input.list_entities.iter().map(|e| &e.name);
    for name in pattern_names.chain(list_names) {
        if name.trim().is_empty() {
            bail!(NluTrainingError::InvalidTrainInput(
                "entity name must not be empty".to_string()
            ));
        }
        if !entity_names.insert(name) {
            bail!(NluTrainingError::InvalidTrainInput(format!(
                "duplicate entity '{}'",
                name
            )));
        }
    }

    let mut intent_names = HashSet::new();
    for intent in &input.intents {
        if sanitize_file_name(&intent.name).is_empty() {
            bail!(NluTrainingError::InvalidTrainInput(
                "intent name must contain at least one valid character".to_string()
            ));
        }
        if !intent_names.insert(&intent.name) {
            bail!(NluTrainingError::InvalidTrainInput(format!(
                "duplicate intent '{}'",
                intent.name
            )));
        }
        for slot in &intent.slot_definitions {
            if slot.name.trim().is_empty() {
                bail!(NluTrainingError::InvalidTrainInput(format!(
                    "intent '{}' has a slot with an empty name",
                    intent.name
                )));
            }
            for entity in &slot.entities {
                if !entity_names.contains(entity) {
                    bail!(NluTrainingError::InvalidTrainInput(format!(
                        "slot '{}' of intent '{}' references '{}', which is neither a pattern entity nor a list entity",
                        slot.name, intent.name, entity
                    )));
                }
            }
        }
    }

    Ok(language)
}
