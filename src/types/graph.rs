//! Relationship graph types for code structure diagrams.
//!
//! A `DiagramGraph` holds the entities (module/classes/functions) and call
//! edges extracted from one source unit. Containment edges are derived from
//! `parent_id` rather than stored. The graph is closed under its edge set:
//! unresolved callees become synthetic `extern:` entities so every edge
//! endpoint is always present.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Id prefix for synthetic entities standing in for unresolved/external calls.
/// Keeps them in a namespace that cannot collide with real qualified names.
pub const EXTERN_PREFIX: &str = "extern:";

/// Kind of a code entity. The ordering (Module < Class < Function) is part of
/// the stable layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Module,
    Class,
    Function,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Module => write!(f, "module"),
            Self::Class => write!(f, "class"),
            Self::Function => write!(f, "function"),
        }
    }
}

/// One node in the relationship graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeEntity {
    /// Fully-qualified name, unique within the graph (e.g. `module.Greeter.greet`)
    pub id: String,
    pub kind: EntityKind,
    /// Id of the lexically enclosing entity. Weak back-reference used only for
    /// drawing containment edges; `None` for the root module and synthetic
    /// externals.
    pub parent_id: Option<String>,
}

impl CodeEntity {
    pub fn new(id: impl Into<String>, kind: EntityKind, parent_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            parent_id,
        }
    }

    /// Synthetic leaf entity for an unresolved callee.
    pub fn external(name: &str) -> Self {
        Self {
            id: format!("{}{}", EXTERN_PREFIX, name),
            kind: EntityKind::Function,
            parent_id: None,
        }
    }

    /// Whether this entity is a synthetic external placeholder.
    pub fn is_external(&self) -> bool {
        self.id.starts_with(EXTERN_PREFIX)
    }

    /// Display label: the terminal segment of the qualified name.
    pub fn label(&self) -> &str {
        let base = self.id.strip_prefix(EXTERN_PREFIX).unwrap_or(&self.id);
        base.rsplit('.').next().unwrap_or(base)
    }
}

/// Directed caller → callee relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller_id: String,
    pub callee_id: String,
}

/// Entity set plus call edges for one source unit.
///
/// Entities are kept in insertion (document) order; `index` maps ids to
/// positions for O(1) lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagramGraph {
    entities: Vec<CodeEntity>,
    calls: Vec<CallEdge>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl DiagramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity, ignoring duplicates by id. Returns whether it was new.
    pub fn insert_entity(&mut self, entity: CodeEntity) -> bool {
        if self.index.contains_key(&entity.id) {
            return false;
        }
        self.index.insert(entity.id.clone(), self.entities.len());
        self.entities.push(entity);
        true
    }

    /// Add a call edge. Duplicate (caller, callee) pairs are collapsed.
    pub fn add_call(&mut self, caller_id: impl Into<String>, callee_id: impl Into<String>) {
        let edge = CallEdge {
            caller_id: caller_id.into(),
            callee_id: callee_id.into(),
        };
        if !self.calls.contains(&edge) {
            self.calls.push(edge);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&CodeEntity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn entities(&self) -> &[CodeEntity] {
        &self.entities
    }

    pub fn calls(&self) -> &[CallEdge] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Containment edges derived from parent references, in document order.
    pub fn containment_edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entities.iter().filter_map(|e| {
            e.parent_id
                .as_deref()
                .map(|parent| (parent, e.id.as_str()))
        })
    }

    /// Number of parent hops to a root. Unknown parents terminate the walk, so
    /// a broken reference cannot loop.
    pub fn depth(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut current = self.get(id);
        while let Some(entity) = current {
            match entity.parent_id.as_deref() {
                Some(parent) if depth < self.entities.len() => {
                    depth += 1;
                    current = self.get(parent);
                }
                _ => break,
            }
        }
        depth
    }

    /// Invariant check: every call and containment edge endpoint resolves to a
    /// present entity.
    pub fn is_closed(&self) -> bool {
        self.calls
            .iter()
            .all(|e| self.contains(&e.caller_id) && self.contains(&e.callee_id))
            && self
                .containment_edges()
                .all(|(parent, _)| self.contains(parent))
    }

    /// Rebuild the id index (needed after deserialization, which skips it).
    pub fn reindex(&mut self) {
        self.index = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> DiagramGraph {
        let mut graph = DiagramGraph::new();
        graph.insert_entity(CodeEntity::new("module", EntityKind::Module, None));
        graph.insert_entity(CodeEntity::new(
            "module.Greeter",
            EntityKind::Class,
            Some("module".to_string()),
        ));
        graph.insert_entity(CodeEntity::new(
            "module.Greeter.greet",
            EntityKind::Function,
            Some("module.Greeter".to_string()),
        ));
        graph
    }

    #[test]
    fn test_insert_is_unique_by_id() {
        let mut graph = sample_graph();
        assert!(!graph.insert_entity(CodeEntity::new("module", EntityKind::Module, None)));
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_depth_follows_parent_chain() {
        let graph = sample_graph();
        assert_eq!(graph.depth("module"), 0);
        assert_eq!(graph.depth("module.Greeter"), 1);
        assert_eq!(graph.depth("module.Greeter.greet"), 2);
    }

    #[test]
    fn test_duplicate_calls_collapse() {
        let mut graph = sample_graph();
        graph.add_call("module.Greeter.greet", "extern:print");
        graph.add_call("module.Greeter.greet", "extern:print");
        assert_eq!(graph.calls().len(), 1);
    }

    #[test]
    fn test_closure_requires_synthetic_entity() {
        let mut graph = sample_graph();
        graph.add_call("module.Greeter.greet", "extern:print");
        assert!(!graph.is_closed());

        graph.insert_entity(CodeEntity::external("print"));
        assert!(graph.is_closed());
    }

    #[test]
    fn test_external_label_strips_prefix() {
        let entity = CodeEntity::external("print");
        assert_eq!(entity.id, "extern:print");
        assert!(entity.is_external());
        assert_eq!(entity.label(), "print");
    }

    #[test]
    fn test_entity_kind_ordering() {
        assert!(EntityKind::Module < EntityKind::Class);
        assert!(EntityKind::Class < EntityKind::Function);
    }
}
