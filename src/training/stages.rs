use async_trait::async_trait;

use crate::errors::Result;
use crate::models::StructuredTrainOutput;
use crate::tooling::ToolingAdapter;

/// A training pipeline stage. Stages are pure transformations of the whole
/// structured output: they take it, return it, and keep no state between
/// runs. A failing stage must return its error; substituting an empty
/// default result is a contract violation.
#[async_trait]
pub trait TrainingStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(
        &self,
        output: StructuredTrainOutput,
        tools: &dyn ToolingAdapter,
    ) -> Result<StructuredTrainOutput>;
}

/// Augments the training set with none-intent utterances. Extension point:
/// the augmentation strategy is not part of this crate.
pub struct AppendNoneIntents;

#[async_trait]
impl TrainingStage for AppendNoneIntents {
    fn name(&self) -> &'static str {
        "none-intents"
    }

    async fn apply(
        &self,
        output: StructuredTrainOutput,
        _tools: &dyn ToolingAdapter,
    ) -> Result<StructuredTrainOutput> {
        Ok(output)
    }
}

/// Assigns tf-idf weights to utterance tokens. Extension point: the
/// weighting scheme is not part of this crate.
pub struct TfidfWeights;

#[async_trait]
impl TrainingStage for TfidfWeights {
    fn name(&self) -> &'static str {
        "tfidf-weights"
    }

    async fn apply(
        &self,
        output: StructuredTrainOutput,
        _tools: &dyn ToolingAdapter,
    ) -> Result<StructuredTrainOutput> {
        Ok(output)
    }
}

/// Materializes the classifier and slot-tagger artifact slots. Extension
/// point: actual classifier training is not part of this crate.
pub struct BuildArtifacts;

#[async_trait]
impl TrainingStage for BuildArtifacts {
    fn name(&self) -> &'static str {
        "build-artifacts"
    }

    async fn apply(
        &self,
        mut output: StructuredTrainOutput,
        _tools: &dyn ToolingAdapter,
    ) -> Result<StructuredTrainOutput> {
        let empty = || Some(serde_json::json!({}));
        output.artifacts.context_ranking = empty();
        output.artifacts.intent_classifier = empty();
        output.artifacts.exact_classifier = empty();
        output.artifacts.slot_tagger = empty();
        Ok(output)
    }
}
