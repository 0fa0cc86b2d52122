//! Document registry
//!
//! The registry owns the node arena and, per document location, the maps
//! that drive reference resolution: compiled schemas by pointer, unresolved
//! reference placeholders by pointer, and unknown-keyword fragments retained
//! as potential future `$ref` targets.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::compiler;
use crate::error::{BuildError, Result};
use crate::nodes::{NodeId, RefSchema, SchemaNode};
use crate::uri::{JsonPointer, SchemaUri};

/// Per-location bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct SchemaFile {
    /// Compiled schema nodes by pointer.
    pub(crate) schemas: IndexMap<JsonPointer, NodeId>,
    /// Reference placeholders awaiting a target at that pointer.
    pub(crate) unresolved: IndexMap<JsonPointer, NodeId>,
    /// Raw fragments found at unrecognized keys, by pointer.
    pub(crate) unknown_keywords: IndexMap<JsonPointer, Value>,
}

/// Node arena plus per-location schema files.
#[derive(Debug, Default)]
pub(crate) struct SchemaRegistry {
    nodes: Vec<SchemaNode>,
    files: IndexMap<String, SchemaFile>,
}

impl SchemaRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store a node and return its arena index.
    pub(crate) fn alloc(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Idempotently create the bookkeeping entry for a location.
    pub(crate) fn get_or_create_file(&mut self, location: &str) -> &mut SchemaFile {
        self.files.entry(location.to_string()).or_default()
    }

    /// Every location the registry currently knows about.
    pub(crate) fn locations(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Whether nothing has been compiled at a location yet (it is only the
    /// target of references and must be loaded).
    pub(crate) fn needs_loading(&self, location: &str) -> bool {
        self.files
            .get(location)
            .is_some_and(|file| file.schemas.is_empty())
    }

    /// Register `id` at `uri`. Duplicate registration at the same location
    /// and pointer is an error. If a placeholder was waiting at that
    /// pointer, bind it now; this is the forward-reference back-patch
    /// point.
    pub(crate) fn insert(&mut self, uri: &SchemaUri, id: NodeId) -> Result<()> {
        let file = self.get_or_create_file(uri.location());
        if file.schemas.contains_key(uri.pointer()) {
            return Err(BuildError::duplicate_schema(uri.to_string()));
        }
        file.schemas.insert(uri.pointer().clone(), id);
        trace!(uri = %uri, "registered schema");

        if let Some(placeholder) = file.unresolved.shift_remove(uri.pointer()) {
            trace!(uri = %uri, "bound forward reference");
            self.bind_ref(placeholder, id);
        }
        Ok(())
    }

    /// Resolve a reference target: an existing schema if one is registered
    /// at the pointer, an unknown-keyword fragment promoted to a schema on
    /// the spot, or a (new or reused) placeholder.
    pub(crate) fn get_or_create_ref(&mut self, uri: &SchemaUri) -> Result<NodeId> {
        if let Some(file) = self.files.get(uri.location()) {
            if let Some(&id) = file.schemas.get(uri.pointer()) {
                return Ok(id);
            }
        }

        // Referencing an unknown keyword turns it into a schema. The entry
        // leaves the store before compilation so it is promoted only once.
        let fragment = self
            .files
            .get_mut(uri.location())
            .and_then(|file| file.unknown_keywords.shift_remove(uri.pointer()));
        if let Some(raw) = fragment {
            debug!(uri = %uri, "promoting unknown keyword to schema");
            return compiler::compile(&raw, &[], vec![uri.clone()], self);
        }

        let file = self.get_or_create_file(uri.location());
        if let Some(&id) = file.unresolved.get(uri.pointer()) {
            return Ok(id);
        }
        let id = self.alloc(SchemaNode::Ref(RefSchema {
            id: uri.to_string(),
            target: None,
        }));
        self.get_or_create_file(uri.location())
            .unresolved
            .insert(uri.pointer().clone(), id);
        Ok(id)
    }

    /// Record a schema-shaped value found at an unrecognized key. If a
    /// reference already expects the pointer `uri/key`, compile the value
    /// immediately so the placeholder binds; otherwise stash it.
    pub(crate) fn insert_unknown_keyword(
        &mut self,
        uri: &SchemaUri,
        key: &str,
        raw: &Value,
    ) -> Result<()> {
        let target = uri.append(key);
        let expected = self
            .files
            .get(target.location())
            .is_some_and(|file| file.unresolved.contains_key(target.pointer()));
        if expected {
            compiler::compile(raw, &[], vec![target], self)?;
        } else {
            self.get_or_create_file(target.location())
                .unknown_keywords
                .insert(target.pointer().clone(), raw.clone());
        }
        Ok(())
    }

    /// Bind a placeholder to its target. One-shot: a placeholder never
    /// rebinds.
    fn bind_ref(&mut self, placeholder: NodeId, target: NodeId) {
        match &mut self.nodes[placeholder.0] {
            SchemaNode::Ref(r) => {
                debug_assert!(r.target.is_none(), "placeholder rebinding");
                r.target = Some(target);
            }
            _ => unreachable!("unresolved entry points at a non-reference node"),
        }
    }
}
