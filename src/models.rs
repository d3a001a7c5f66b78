use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

use crate::language::Language;
use crate::utils::{EntityName, IntentName, SlotName};
use crate::utterance::Utterance;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntity {
    pub name: EntityName,
    pub pattern: String,
    pub examples: Vec<String>,
    pub ignore_case: bool,
    pub sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntity {
    pub name: EntityName,
    pub synonyms: HashMap<String, Vec<String>>,
    pub fuzzy_matching: bool,
    pub sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub name: SlotName,
    pub entities: Vec<EntityName>,
}

/// An intent moves through the pipeline in two phases: raw annotated text
/// (`Intent<String>`) before utterance processing, built utterances
/// (`Intent<Utterance>`) after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent<U> {
    pub name: IntentName,
    pub contexts: Vec<String>,
    pub slot_definitions: Vec<SlotDefinition>,
    pub utterances: Vec<U>,
}

impl<U> Intent<U> {
    pub fn with_utterances<V>(&self, utterances: Vec<V>) -> Intent<V> {
        Intent {
            name: self.name.clone(),
            contexts: self.contexts.clone(),
            slot_definitions: self.slot_definitions.clone(),
            utterances,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredTrainInput {
    pub bot_id: String,
    pub language_code: String,
    pub pattern_entities: Vec<PatternEntity>,
    pub list_entities: Vec<ListEntity>,
    pub contexts: Vec<String>,
    pub intents: Vec<Intent<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredTrainOutput {
    pub bot_id: String,
    pub language: Language,
    pub pattern_entities: Vec<PatternEntity>,
    pub list_entities: Vec<ListEntity>,
    pub contexts: Vec<String>,
    pub intents: Vec<Intent<Utterance>>,
    pub artifacts: TrainArtifacts,
}

/// Artifacts produced by the classifier construction stages. Their inner
/// layout belongs to the stage implementations, so they travel as opaque
/// JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainArtifacts {
    pub context_ranking: Option<serde_json::Value>,
    pub intent_classifier: Option<serde_json::Value>,
    pub exact_classifier: Option<serde_json::Value>,
    pub slot_tagger: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct TrainModel {
    pub bot_id: String,
    pub language: Language,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output: StructuredTrainOutput,
}

impl TrainModel {
    pub fn record(&self) -> TrainRecord {
        TrainRecord {
            bot_id: self.bot_id.clone(),
            language_code: self.language.code().to_string(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            artifacts: self.output.artifacts.clone(),
        }
    }
}

/// Serializable summary of a completed training run, the unit persisted by
/// the model store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRecord {
    pub bot_id: String,
    pub language_code: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub artifacts: TrainArtifacts,
}
