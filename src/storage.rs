use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use failure::{bail, ResultExt};
use log::debug;

use crate::errors::*;
use crate::models::TrainRecord;
use crate::utils::sanitize_file_name;

const MODELS_DIR: &str = "models";
const MODEL_SUFFIX: &str = ".model.json";

/// Key-value document store keyed by folder and name, the persistence
/// boundary this crate is hosted behind. Absence is a normal outcome:
/// `read` returns `None` for a missing document and reserves errors for
/// actual I/O failures.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, folder: &str, name: &str) -> Result<Option<Vec<u8>>>;

    async fn write(&self, folder: &str, name: &str, content: Vec<u8>) -> Result<()>;

    /// Lists document names in `folder` ending with `suffix`, minus the
    /// `exclude`d ones.
    async fn list(&self, folder: &str, suffix: &str, exclude: &[String]) -> Result<Vec<String>>;

    /// Deleting a missing document fails with `DocumentNotFound`.
    async fn delete(&self, folder: &str, name: &str) -> Result<()>;
}

/// Mutex-guarded in-memory store, for tests and embedded deployments.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn read(&self, folder: &str, name: &str) -> Result<Option<Vec<u8>>> {
        let documents = self.documents.lock().unwrap();
        Ok(documents.get(&(folder.to_string(), name.to_string())).cloned())
    }

    async fn write(&self, folder: &str, name: &str, content: Vec<u8>) -> Result<()> {
        let mut documents = self.documents.lock().unwrap();
        documents.insert((folder.to_string(), name.to_string()), content);
        Ok(())
    }

    async fn list(&self, folder: &str, suffix: &str, exclude: &[String]) -> Result<Vec<String>> {
        let documents = self.documents.lock().unwrap();
        let mut names = documents
            .keys()
            .filter(|(doc_folder, name)| {
                doc_folder == folder
                    && name.ends_with(suffix)
                    && !exclude.contains(name)
            })
            .map(|(_, name)| name.clone())
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, folder: &str, name: &str) -> Result<()> {
        let mut documents = self.documents.lock().unwrap();
        if documents
            .remove(&(folder.to_string(), name.to_string()))
            .is_none()
        {
            bail!(NluTrainingError::DocumentNotFound(
                folder.to_string(),
                name.to_string()
            ));
        }
        Ok(())
    }
}

/// Persists training records through a document store, one record per
/// bot and language pair.
pub struct ModelStore<S> {
    store: S,
}

impl<S: DocumentStore> ModelStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn save(&self, record: &TrainRecord) -> Result<()> {
        let name = model_file_name(&record.bot_id, &record.language_code);
        let content = serde_json::to_vec_pretty(record)?;
        self.store.write(MODELS_DIR, &name, content).await?;
        debug!("Saved training record '{}'", name);
        Ok(())
    }

    /// Returns `None` when no record exists for the pair.
    pub async fn load(&self, bot_id: &str, language_code: &str) -> Result<Option<TrainRecord>> {
        let name = model_file_name(bot_id, language_code);
        let content = match self.store.read(MODELS_DIR, &name).await? {
            Some(content) => content,
            None => return Ok(None),
        };
        let record = serde_json::from_slice(&content)
            .with_context(|_| format!("Cannot deserialize training record '{}'", name))?;
        Ok(Some(record))
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        self.store.list(MODELS_DIR, MODEL_SUFFIX, &[]).await
    }

    pub async fn delete(&self, bot_id: &str, language_code: &str) -> Result<()> {
        let name = model_file_name(bot_id, language_code);
        self.store.delete(MODELS_DIR, &name).await
    }
}

fn model_file_name(bot_id: &str, language_code: &str) -> String {
    format!(
        "{}.{}{}",
        sanitize_file_name(bot_id),
        sanitize_file_name(language_code),
        MODEL_SUFFIX
    )
}
