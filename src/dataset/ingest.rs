//! Dataset ingestion: tab-delimited feature/interaction files into a
//! normalized, immutable in-memory dataset.

use super::record::{
    InteractionEvent, ItemRecord, UserRecord, INTERACTION_HISTORY_STR, USER_HISTORY_LENGTH,
};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Ingestion failures. Any of these is fatal for the dataset being built,
/// but never for the catalog scan as a whole.
#[derive(Error, Debug)]
pub enum DataFormatError {
    #[error("cannot read '{file}': {source}")]
    Io {
        file: PathBuf,
        source: std::io::Error,
    },

    #[error("'{file}' has no header row")]
    EmptyHeader { file: PathBuf },

    #[error("'{file}' line {line}: expected {expected} columns, found {found}")]
    RowArity {
        file: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("cannot serialize interaction history for user '{user_id}': {source}")]
    HistorySerialize {
        user_id: String,
        source: serde_json::Error,
    },
}

pub type IngestResult<T> = Result<T, DataFormatError>;

/// File groups of one dataset namespace, as classified by the catalog.
#[derive(Debug, Clone, Default)]
pub struct DatasetFiles {
    pub user_files: Vec<PathBuf>,
    pub item_files: Vec<PathBuf>,
    pub inter_files: Vec<PathBuf>,
}

/// A normalized recommendation dataset: users, items, and interaction
/// events bucketed by timestamp.
///
/// Constructed once by the catalog and never mutated afterwards. `valid()`
/// gates registration: a dataset qualifies only when it has users, items and
/// at least one timestamped interaction.
#[derive(Debug)]
pub struct Dataset {
    name: String,
    users: IndexMap<String, UserRecord>,
    items: IndexMap<String, ItemRecord>,
    /// Timestamp bucket → events, ascending key order. The key set doubles
    /// as the sorted distinct timestamp sequence.
    interactions: BTreeMap<String, Vec<InteractionEvent>>,
    user_ids: Vec<String>,
    item_ids: Vec<String>,
    user_features: Vec<String>,
    item_features: Vec<String>,
    valid: bool,
}

/// Parsed header: field names with the `:type` suffix dropped. The suffix is
/// documentation only; nothing coerces on it.
fn parse_header(file: &Path, line: Option<&str>) -> IngestResult<Vec<String>> {
    let line = line.ok_or_else(|| DataFormatError::EmptyHeader {
        file: file.to_path_buf(),
    })?;
    Ok(line
        .trim_end_matches(['\r', '\n'])
        .split('\t')
        .map(|field| field.split(':').next().unwrap_or(field).to_string())
        .collect())
}

fn split_row<'a>(
    file: &Path,
    line_no: usize,
    line: &'a str,
    expected: usize,
) -> IngestResult<Vec<&'a str>> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if fields.len() != expected {
        return Err(DataFormatError::RowArity {
            file: file.to_path_buf(),
            line: line_no,
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn read_file(file: &Path) -> IngestResult<String> {
    fs::read_to_string(file).map_err(|source| DataFormatError::Io {
        file: file.to_path_buf(),
        source,
    })
}

impl Dataset {
    /// Ingest one namespace. `files` paths are relative to `dir`.
    pub fn load(dir: &Path, name: &str, files: &DatasetFiles) -> IngestResult<Self> {
        let mut dataset = Dataset {
            name: name.to_string(),
            users: IndexMap::new(),
            items: IndexMap::new(),
            interactions: BTreeMap::new(),
            user_ids: Vec::new(),
            item_ids: Vec::new(),
            user_features: vec![USER_HISTORY_LENGTH.to_string()],
            item_features: Vec::new(),
            valid: false,
        };

        for file in &files.user_files {
            dataset.load_user_file(&dir.join(file))?;
        }
        for file in &files.item_files {
            dataset.load_item_file(&dir.join(file))?;
        }

        if !dataset.users.is_empty() && !dataset.items.is_empty() {
            dataset.user_ids = dataset.users.keys().cloned().collect();
            dataset.user_ids.sort();
            dataset.item_ids = dataset.items.keys().cloned().collect();
            dataset.item_ids.sort();

            for file in &files.inter_files {
                dataset.load_inter_file(&dir.join(file))?;
            }
            dataset.serialize_histories()?;

            dataset.valid = !dataset.interactions.is_empty();
        }

        debug!(
            dataset = name,
            users = dataset.users.len(),
            items = dataset.items.len(),
            timestamps = dataset.interactions.len(),
            valid = dataset.valid,
            "ingested dataset"
        );
        Ok(dataset)
    }

    /// Load one user-feature file. A user id seen again (same or later file)
    /// has its feature values added/overridden.
    fn load_user_file(&mut self, file: &Path) -> IngestResult<()> {
        let content = read_file(file)?;
        let mut lines = content.lines();
        let header = parse_header(file, lines.next())?;

        for name in &header {
            if !self.user_features.contains(name) {
                self.user_features.push(name.clone());
            }
        }

        for (idx, line) in lines.enumerate() {
            let fields = split_row(file, idx + 2, line, header.len())?;
            let user_id = fields[0];
            let record = self
                .users
                .entry(user_id.to_string())
                .or_insert_with(|| UserRecord::new(user_id));
            for (name, value) in header.iter().zip(&fields) {
                record.features.insert(name.clone(), value.to_string());
            }
        }
        Ok(())
    }

    fn load_item_file(&mut self, file: &Path) -> IngestResult<()> {
        let content = read_file(file)?;
        let mut lines = content.lines();
        let header = parse_header(file, lines.next())?;

        for name in &header {
            if !self.item_features.contains(name) {
                self.item_features.push(name.clone());
            }
        }

        for (idx, line) in lines.enumerate() {
            let fields = split_row(file, idx + 2, line, header.len())?;
            let item_id = fields[0];
            let record = self
                .items
                .entry(item_id.to_string())
                .or_insert_with(|| ItemRecord::new(item_id));
            for (name, value) in header.iter().zip(&fields) {
                record.features.insert(name.clone(), value.to_string());
            }
        }
        Ok(())
    }

    /// Load one interaction file. The final column is the event timestamp;
    /// the remaining columns form the event. Events whose declared first
    /// field is `user_id` and whose id is a known user are also appended,
    /// trimmed, to that user's history.
    fn load_inter_file(&mut self, file: &Path) -> IngestResult<()> {
        let content = read_file(file)?;
        let mut lines = content.lines();
        let header = parse_header(file, lines.next())?;
        let first_field_is_user = header.first().map(String::as_str) == Some("user_id");

        for (idx, line) in lines.enumerate() {
            let fields = split_row(file, idx + 2, line, header.len())?;
            let timestamp = fields[fields.len() - 1];

            let event_fields: IndexMap<String, String> = header
                .iter()
                .zip(&fields)
                .take(fields.len() - 1)
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect();
            let event = InteractionEvent::new(event_fields);

            if first_field_is_user {
                if let Some(user) = self.users.get_mut(fields[0]) {
                    user.interaction_history.push(event.without("user_id"));
                    user.history_length += 1;
                }
            }

            self.interactions
                .entry(timestamp.to_string())
                .or_default()
                .push(event);
        }
        Ok(())
    }

    /// Store the display form of every user's history once all interaction
    /// files are in.
    fn serialize_histories(&mut self) -> IngestResult<()> {
        for user in self.users.values_mut() {
            let rendered = serde_json::to_string(&user.interaction_history).map_err(|source| {
                DataFormatError::HistorySerialize {
                    user_id: user.id.clone(),
                    source,
                }
            })?;
            user.history_str = Some(rendered);
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this dataset qualifies for registration: non-empty users and
    /// items plus at least one timestamped interaction.
    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn users(&self) -> &IndexMap<String, UserRecord> {
        &self.users
    }

    pub fn items(&self) -> &IndexMap<String, ItemRecord> {
        &self.items
    }

    /// Ordered user ids, as handed to the model-inference collaborator.
    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    pub fn item_ids(&self) -> &[String] {
        &self.item_ids
    }

    pub fn user_features(&self) -> &[String] {
        &self.user_features
    }

    pub fn item_features(&self) -> &[String] {
        &self.item_features
    }

    /// All recognized feature names, user features first.
    pub fn features(&self) -> Vec<String> {
        let mut all = self.user_features.clone();
        all.extend(self.item_features.iter().cloned());
        all
    }

    /// Timestamp bucket → events, ascending timestamp order.
    pub fn interactions(&self) -> &BTreeMap<String, Vec<InteractionEvent>> {
        &self.interactions
    }

    /// Sorted distinct timestamps.
    pub fn timestamps(&self) -> Vec<&str> {
        self.interactions.keys().map(String::as_str).collect()
    }

    /// A user's interaction history, in file order. Consumed by the
    /// similarity collaborator.
    pub fn user_history(&self, user_id: &str) -> Option<&[InteractionEvent]> {
        self.users
            .get(user_id)
            .map(|u| u.interaction_history.as_slice())
    }

    /// Display label for an item: the named feature's value, or a stable
    /// placeholder when the item or feature is unknown.
    pub fn item_label(&self, item_id: &str, label_feature: &str) -> String {
        self.items
            .get(item_id)
            .and_then(|item| item.feature(label_feature))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unknown ID {item_id}"))
    }

    /// Display labels for a user's most recent `k` history events.
    pub fn recent_history_labels(
        &self,
        user_id: &str,
        k: usize,
        label_feature: &str,
    ) -> Vec<String> {
        let Some(history) = self.user_history(user_id) else {
            return Vec::new();
        };
        let start = history.len().saturating_sub(k);
        history[start..]
            .iter()
            .filter_map(|event| event.get("item_id"))
            .map(|item_id| self.item_label(item_id, label_feature))
            .collect()
    }

    /// Feature map for one user as a flat string map, including the built-in
    /// `user_history_length` and the serialized history string. This is the
    /// attribute set a user graph node starts from.
    pub fn user_node_features(&self, user: &UserRecord) -> IndexMap<String, String> {
        let mut features = user.features.clone();
        features.insert(
            USER_HISTORY_LENGTH.to_string(),
            user.history_length.to_string(),
        );
        if let Some(history_str) = &user.history_str {
            features.insert(INTERACTION_HISTORY_STR.to_string(), history_str.clone());
        }
        features
    }
}
