// ── Write plans ──
//
// Entity views never call the API. They return a `WritePlan`: the remote
// mutations to send, in order, and the local patches to apply once every
// mutation has been accepted. The coordinator executes plans one at a time.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::CoreError;
use crate::model::{Category, Relation};

/// A command envelope sent through the command channel.
/// Contains the plan and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub plan: WritePlan,
    pub response_tx: tokio::sync::oneshot::Sender<Result<(), CoreError>>,
}

/// One `PATCH` against a remote record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mutation {
    pub category: Category,
    pub device_id: String,
    pub attributes: Map<String, Value>,
    /// Raw JSON:API relationship objects, e.g.
    /// `{"active-schedule": {"data": {"type": "schedules", "id": "…"}}}`.
    pub relationships: Map<String, Value>,
}

impl Mutation {
    pub fn new(category: Category, device_id: impl Into<String>) -> Self {
        Self {
            category,
            device_id: device_id.into(),
            attributes: Map::new(),
            relationships: Map::new(),
        }
    }

    pub fn attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_owned(), value.into());
        self
    }

    /// Point a to-one relationship at `target`, or clear it with `None`.
    pub fn relation(mut self, name: &str, target: Option<(Category, &str)>) -> Self {
        let data = match target {
            Some((category, id)) => json!({ "type": category.to_string(), "id": id }),
            None => Value::Null,
        };
        self.relationships
            .insert(name.to_owned(), json!({ "data": data }));
        self
    }
}

/// Optimistic update applied to the cached snapshot after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalPatch {
    pub category: Category,
    pub device_id: String,
    pub attributes: Map<String, Value>,
    pub relationships: BTreeMap<String, Relation>,
}

impl LocalPatch {
    pub fn new(category: Category, device_id: impl Into<String>) -> Self {
        Self {
            category,
            device_id: device_id.into(),
            attributes: Map::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_owned(), value.into());
        self
    }

    pub fn relation(mut self, name: &str, relation: Relation) -> Self {
        self.relationships.insert(name.to_owned(), relation);
        self
    }
}

impl From<&Mutation> for LocalPatch {
    /// Mirror a mutation's attributes onto the cache.
    fn from(mutation: &Mutation) -> Self {
        Self {
            category: mutation.category,
            device_id: mutation.device_id.clone(),
            attributes: mutation.attributes.clone(),
            relationships: BTreeMap::new(),
        }
    }
}

/// Ordered remote writes plus the cache patches that follow them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WritePlan {
    pub mutations: Vec<Mutation>,
    pub patches: Vec<LocalPatch>,
}

impl WritePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `mutation` and patch the cache with the same attributes.
    pub fn write(mut self, mutation: Mutation) -> Self {
        self.patches.push(LocalPatch::from(&mutation));
        self.mutations.push(mutation);
        self
    }

    /// Send `mutation` without touching the cache.
    pub fn send(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn patch(mut self, patch: LocalPatch) -> Self {
        self.patches.push(patch);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty() && self.patches.is_empty()
    }
}
