//! Command catalog: stored shell-command templates with declared parameters.
//!
//! A command's name is unique and immutable after creation; its template is a
//! flat `{{name}}`-placeholder string. Parameter schemas are owned by their
//! command and edited through create/update drafts; execution history is kept
//! even after a command is deleted (it is an immutable audit trail).

use crate::store::{load_json, save_json, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Declared type of one parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Text,
    Number,
    Boolean,
    Select,
    File,
}

impl ParameterKind {
    /// Parse a draft's kind string; anything unrecognized is a catalog error.
    pub fn parse(s: &str) -> Option<ParameterKind> {
        match s {
            "text" => Some(ParameterKind::Text),
            "number" => Some(ParameterKind::Number),
            "boolean" => Some(ParameterKind::Boolean),
            "select" => Some(ParameterKind::Select),
            "file" => Some(ParameterKind::File),
            _ => None,
        }
    }
}

/// One declared input slot of a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSchema {
    pub id: u64,
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    #[serde(default)]
    pub required: bool,
    /// Informational default shown by clients; the engine does not apply it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Comma-separated option list; only meaningful for select parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    /// Validation regex; only meaningful for text parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Display order for clients; not semantically load-bearing here.
    #[serde(default)]
    pub order: i32,
}

/// A stored, executable command template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// The template string, e.g. `echo {{message}}`.
    pub command: String,
    #[serde(default)]
    pub category: String,
    pub enabled: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterSchema>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameter slot in a create draft. `type` arrives as a string so an unknown
/// kind surfaces as a catalog error, not a body-parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDraft {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub options: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub order: i32,
}

/// Create draft for a new command and its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterDraft>,
}

fn default_enabled() -> bool {
    true
}

/// Parameter edit in an update: with `id` it edits (or deletes, when `delete`
/// is set) the existing slot; without `id` it creates a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterUpdate {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub delete: bool,
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub options: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub order: i32,
}

/// Update draft. The name is immutable and therefore absent; optional fields
/// left out keep their current value, `enabled` is always applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub enabled: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterUpdate>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("command not found")]
    NotFound,
    #[error("command name is required")]
    EmptyName,
    #[error("command template is required")]
    EmptyTemplate,
    #[error("command name already exists")]
    NameTaken,
    #[error("invalid parameter type: {0}")]
    InvalidKind(String),
    #[error("parameter not found")]
    ParameterNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogData {
    #[serde(default)]
    next_command_id: u64,
    #[serde(default)]
    next_parameter_id: u64,
    #[serde(default)]
    commands: Vec<Command>,
}

impl CatalogData {
    fn take_command_id(&mut self) -> u64 {
        self.next_command_id = self.next_command_id.max(1);
        let id = self.next_command_id;
        self.next_command_id += 1;
        id
    }

    fn take_parameter_id(&mut self) -> u64 {
        self.next_parameter_id = self.next_parameter_id.max(1);
        let id = self.next_parameter_id;
        self.next_parameter_id += 1;
        id
    }
}

/// File-backed command catalog (`catalog.json` in the data directory).
pub struct CatalogStore {
    path: PathBuf,
    inner: RwLock<CatalogData>,
}

impl CatalogStore {
    /// Load from path; missing or invalid file starts an empty catalog.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data: CatalogData = load_json(&path).await;
        Self {
            path,
            inner: RwLock::new(data),
        }
    }

    async fn save(&self, data: &CatalogData) -> Result<(), StoreError> {
        save_json(&self.path, data)
    }

    /// All commands, optionally filtered by category and enabled flag.
    pub async fn list(&self, category: Option<&str>, enabled: Option<bool>) -> Vec<Command> {
        let data = self.inner.read().await;
        data.commands
            .iter()
            .filter(|c| category.map_or(true, |cat| c.category == cat))
            .filter(|c| enabled.map_or(true, |e| c.enabled == e))
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: u64) -> Option<Command> {
        let data = self.inner.read().await;
        data.commands.iter().find(|c| c.id == id).cloned()
    }

    pub async fn get_by_name(&self, name: &str) -> Option<Command> {
        let data = self.inner.read().await;
        data.commands.iter().find(|c| c.name == name).cloned()
    }

    /// Create a command with its parameters and persist.
    pub async fn create(&self, draft: CommandDraft) -> Result<Command, CatalogError> {
        if draft.name.trim().is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if draft.command.trim().is_empty() {
            return Err(CatalogError::EmptyTemplate);
        }

        let mut data = self.inner.write().await;
        if data.commands.iter().any(|c| c.name == draft.name) {
            return Err(CatalogError::NameTaken);
        }

        let mut parameters = Vec::with_capacity(draft.parameters.len());
        for p in &draft.parameters {
            let kind = ParameterKind::parse(&p.kind)
                .ok_or_else(|| CatalogError::InvalidKind(p.kind.clone()))?;
            parameters.push(ParameterSchema {
                id: data.take_parameter_id(),
                name: p.name.clone(),
                label: p.label.clone(),
                kind,
                required: p.required,
                default_value: p.default_value.clone(),
                options: p.options.clone(),
                pattern: p.pattern.clone(),
                order: p.order,
            });
        }

        let now = Utc::now();
        let command = Command {
            id: data.take_command_id(),
            name: draft.name,
            description: draft.description,
            command: draft.command,
            category: draft.category,
            enabled: draft.enabled,
            parameters,
            created_at: now,
            updated_at: now,
        };
        data.commands.push(command.clone());
        self.save(&data).await?;
        Ok(command)
    }

    /// Apply an update draft to an existing command and persist. The draft is
    /// applied to a copy and swapped in whole, so a rejected draft changes
    /// nothing.
    pub async fn update(&self, id: u64, update: CommandUpdate) -> Result<Command, CatalogError> {
        if let Some(template) = &update.command {
            if template.trim().is_empty() {
                return Err(CatalogError::EmptyTemplate);
            }
        }
        for p in &update.parameters {
            if !p.delete && ParameterKind::parse(&p.kind).is_none() {
                return Err(CatalogError::InvalidKind(p.kind.clone()));
            }
        }

        let mut data = self.inner.write().await;
        let index = data
            .commands
            .iter()
            .position(|c| c.id == id)
            .ok_or(CatalogError::NotFound)?;
        let mut command = data.commands[index].clone();

        if let Some(description) = update.description {
            command.description = description;
        }
        if let Some(template) = update.command {
            command.command = template;
        }
        if let Some(category) = update.category {
            command.category = category;
        }
        command.enabled = update.enabled;

        for p in update.parameters {
            match p.id {
                Some(param_id) if p.delete => {
                    command.parameters.retain(|existing| existing.id != param_id);
                }
                Some(param_id) => {
                    let existing = command
                        .parameters
                        .iter_mut()
                        .find(|existing| existing.id == param_id)
                        .ok_or(CatalogError::ParameterNotFound)?;
                    existing.kind = ParameterKind::parse(&p.kind)
                        .ok_or_else(|| CatalogError::InvalidKind(p.kind.clone()))?;
                    existing.name = p.name;
                    existing.label = p.label;
                    existing.required = p.required;
                    existing.default_value = p.default_value;
                    existing.options = p.options;
                    existing.pattern = p.pattern;
                    existing.order = p.order;
                }
                None if p.delete => {}
                None => {
                    let kind = ParameterKind::parse(&p.kind)
                        .ok_or_else(|| CatalogError::InvalidKind(p.kind.clone()))?;
                    command.parameters.push(ParameterSchema {
                        id: data.take_parameter_id(),
                        name: p.name,
                        label: p.label,
                        kind,
                        required: p.required,
                        default_value: p.default_value,
                        options: p.options,
                        pattern: p.pattern,
                        order: p.order,
                    });
                }
            }
        }

        command.updated_at = Utc::now();
        data.commands[index] = command.clone();
        self.save(&data).await?;
        Ok(command)
    }

    /// Delete a command and its parameters. Execution history is retained.
    pub async fn delete(&self, id: u64) -> Result<Command, CatalogError> {
        let mut data = self.inner.write().await;
        let index = data
            .commands
            .iter()
            .position(|c| c.id == id)
            .ok_or(CatalogError::NotFound)?;
        let removed = data.commands.remove(index);
        self.save(&data).await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> CommandDraft {
        CommandDraft {
            name: name.to_string(),
            description: String::new(),
            command: "echo {{message}}".to_string(),
            category: "system".to_string(),
            enabled: true,
            parameters: vec![ParameterDraft {
                name: "message".to_string(),
                label: "Message".to_string(),
                kind: "text".to_string(),
                required: true,
                default_value: None,
                options: None,
                pattern: None,
                order: 0,
            }],
        }
    }

    async fn store() -> (tempfile::TempDir, CatalogStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::load(dir.path().join("catalog.json")).await;
        (dir, store)
    }

    #[tokio::test]
    async fn create_assigns_ids_and_persists() {
        let (dir, store) = store().await;
        let created = store.create(draft("echo-message")).await.unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.parameters[0].id, 1);

        // Reload from disk and confirm the command survived.
        let reloaded = CatalogStore::load(dir.path().join("catalog.json")).await;
        let fetched = reloaded.get(created.id).await.unwrap();
        assert_eq!(fetched.name, "echo-message");
        assert_eq!(fetched.parameters.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let (_dir, store) = store().await;
        store.create(draft("echo-message")).await.unwrap();
        assert!(matches!(
            store.create(draft("echo-message")).await,
            Err(CatalogError::NameTaken)
        ));
    }

    #[tokio::test]
    async fn empty_template_is_rejected() {
        let (_dir, store) = store().await;
        let mut d = draft("bad");
        d.command = "   ".to_string();
        assert!(matches!(
            store.create(d).await,
            Err(CatalogError::EmptyTemplate)
        ));
    }

    #[tokio::test]
    async fn unknown_parameter_kind_is_rejected() {
        let (_dir, store) = store().await;
        let mut d = draft("bad-kind");
        d.parameters[0].kind = "datetime".to_string();
        match store.create(d).await {
            Err(CatalogError::InvalidKind(kind)) => assert_eq!(kind, "datetime"),
            other => panic!("expected InvalidKind, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_filters_by_category_and_enabled() {
        let (_dir, store) = store().await;
        store.create(draft("one")).await.unwrap();
        let mut d = draft("two");
        d.category = "network".to_string();
        d.enabled = false;
        store.create(d).await.unwrap();

        assert_eq!(store.list(None, None).await.len(), 2);
        assert_eq!(store.list(Some("system"), None).await.len(), 1);
        assert_eq!(store.list(None, Some(false)).await.len(), 1);
        assert_eq!(store.list(Some("network"), Some(true)).await.len(), 0);
    }

    #[tokio::test]
    async fn update_edits_adds_and_deletes_parameters() {
        let (_dir, store) = store().await;
        let created = store.create(draft("edit-me")).await.unwrap();
        let existing_id = created.parameters[0].id;

        let updated = store
            .update(
                created.id,
                CommandUpdate {
                    description: Some("updated".to_string()),
                    command: None,
                    category: None,
                    enabled: false,
                    parameters: vec![
                        ParameterUpdate {
                            id: Some(existing_id),
                            delete: true,
                            name: String::new(),
                            label: String::new(),
                            kind: String::new(),
                            required: false,
                            default_value: None,
                            options: None,
                            pattern: None,
                            order: 0,
                        },
                        ParameterUpdate {
                            id: None,
                            delete: false,
                            name: "count".to_string(),
                            label: "Count".to_string(),
                            kind: "number".to_string(),
                            required: false,
                            default_value: Some("1".to_string()),
                            options: None,
                            pattern: None,
                            order: 1,
                        },
                    ],
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.description, "updated");
        assert!(!updated.enabled);
        assert_eq!(updated.parameters.len(), 1);
        assert_eq!(updated.parameters[0].name, "count");
        assert_eq!(updated.parameters[0].kind, ParameterKind::Number);
        assert_ne!(updated.parameters[0].id, existing_id);
        // Name never changes on update.
        assert_eq!(updated.name, "edit-me");
    }

    #[tokio::test]
    async fn update_missing_parameter_is_an_error() {
        let (_dir, store) = store().await;
        let created = store.create(draft("missing-param")).await.unwrap();
        let res = store
            .update(
                created.id,
                CommandUpdate {
                    description: None,
                    command: None,
                    category: None,
                    enabled: true,
                    parameters: vec![ParameterUpdate {
                        id: Some(9999),
                        delete: false,
                        name: "x".to_string(),
                        label: "x".to_string(),
                        kind: "text".to_string(),
                        required: false,
                        default_value: None,
                        options: None,
                        pattern: None,
                        order: 0,
                    }],
                },
            )
            .await;
        assert!(matches!(res, Err(CatalogError::ParameterNotFound)));
    }

    #[tokio::test]
    async fn delete_removes_the_command() {
        let (_dir, store) = store().await;
        let created = store.create(draft("doomed")).await.unwrap();
        store.delete(created.id).await.unwrap();
        assert!(store.get(created.id).await.is_none());
        assert!(matches!(
            store.delete(created.id).await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let (_dir, store) = store().await;
        let first = store.create(draft("first")).await.unwrap();
        store.delete(first.id).await.unwrap();
        let second = store.create(draft("second")).await.unwrap();
        assert!(second.id > first.id);
    }
}
