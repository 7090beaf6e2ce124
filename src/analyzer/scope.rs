//! Scope-chain name resolution for call edges.
//!
//! Resolution is an explicit lookup over ordered definition lists, not a
//! semantic analysis: for a call site we walk the enclosing scopes innermost
//! first, binding to the lexically nearest preceding definition of the name
//! (a forward sibling binds when nothing precedes). A module-wide index by
//! terminal name catches cross-class method calls (`other.method()`), which
//! Python resolves dynamically but the diagram approximates by bare name, the
//! same way the original analyzer did. Anything still unmatched becomes a
//! synthetic external entity.

/// One definition visible for call resolution.
#[derive(Debug, Clone)]
pub struct Definition {
    /// Simple (unqualified) name
    pub name: String,
    /// Fully-qualified entity id
    pub id: String,
    /// Byte offset of the definition in the source
    pub offset: usize,
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<usize>,
    definitions: Vec<Definition>,
}

/// Arena of lexical scopes built during the extraction walk.
///
/// Scope 0 is the module scope; class and function bodies each push a child
/// scope. Scopes stay alive after the walk so recorded call sites can be
/// resolved once all definitions are known (Python allows forward calls).
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    /// Every definition in document order, for the terminal-name fallback
    all: Vec<Definition>,
}

/// Root scope index (the module scope).
pub const MODULE_SCOPE: usize = 0;

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            all: Vec::new(),
        }
    }

    /// Push a child scope and return its index.
    pub fn push_scope(&mut self, parent: usize) -> usize {
        self.scopes.push(Scope {
            parent: Some(parent),
            definitions: Vec::new(),
        });
        self.scopes.len() - 1
    }

    /// Record a definition in `scope` (and in the document-order index).
    pub fn define(&mut self, scope: usize, definition: Definition) {
        self.all.push(definition.clone());
        self.scopes[scope].definitions.push(definition);
    }

    /// Resolve `name` as seen from `scope` at byte `offset`.
    ///
    /// Scope chain first (innermost wins, nearest preceding definition within
    /// a scope), then the module-wide terminal-name index.
    pub fn resolve(&self, scope: usize, name: &str, offset: usize) -> Option<String> {
        let mut current = Some(scope);
        while let Some(idx) = current {
            if let Some(id) = Self::lookup(&self.scopes[idx].definitions, name, offset) {
                return Some(id);
            }
            current = self.scopes[idx].parent;
        }
        Self::lookup(&self.all, name, offset)
    }

    /// Nearest preceding definition of `name`; a later definition binds only
    /// when nothing precedes the call site.
    fn lookup(definitions: &[Definition], name: &str, offset: usize) -> Option<String> {
        let mut following = None;
        let mut preceding = None;
        for def in definitions {
            if def.name != name {
                continue;
            }
            if def.offset < offset {
                preceding = Some(&def.id); // later entries are nearer
            } else if following.is_none() {
                following = Some(&def.id);
            }
        }
        preceding.or(following).cloned()
    }

    #[cfg(test)]
    fn definitions_in(&self, scope: usize) -> &[Definition] {
        &self.scopes[scope].definitions
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, id: &str, offset: usize) -> Definition {
        Definition {
            name: name.to_string(),
            id: id.to_string(),
            offset,
        }
    }

    #[test]
    fn test_innermost_scope_wins() {
        let mut arena = ScopeArena::new();
        arena.define(MODULE_SCOPE, def("helper", "module.helper", 0));
        let inner = arena.push_scope(MODULE_SCOPE);
        arena.define(inner, def("helper", "module.outer.helper", 10));

        assert_eq!(
            arena.resolve(inner, "helper", 50).as_deref(),
            Some("module.outer.helper")
        );
        assert_eq!(
            arena.resolve(MODULE_SCOPE, "helper", 50).as_deref(),
            Some("module.helper")
        );
    }

    #[test]
    fn test_nearest_preceding_definition_wins() {
        let mut arena = ScopeArena::new();
        arena.define(MODULE_SCOPE, def("load", "module.load#1", 0));
        arena.define(MODULE_SCOPE, def("load", "module.load#2", 100));

        // Call between the two binds to the first, call after binds to the second
        assert_eq!(
            arena.resolve(MODULE_SCOPE, "load", 50).as_deref(),
            Some("module.load#1")
        );
        assert_eq!(
            arena.resolve(MODULE_SCOPE, "load", 150).as_deref(),
            Some("module.load#2")
        );
    }

    #[test]
    fn test_forward_reference_binds_when_nothing_precedes() {
        let mut arena = ScopeArena::new();
        arena.define(MODULE_SCOPE, def("later", "module.later", 200));
        assert_eq!(
            arena.resolve(MODULE_SCOPE, "later", 50).as_deref(),
            Some("module.later")
        );
    }

    #[test]
    fn test_global_fallback_by_terminal_name() {
        let mut arena = ScopeArena::new();
        let class_a = arena.push_scope(MODULE_SCOPE);
        let class_b = arena.push_scope(MODULE_SCOPE);
        arena.define(class_b, def("render", "module.B.render", 300));

        // From a method scope inside A, `render` is not on the scope chain
        // but resolves through the module-wide index.
        let method_a = arena.push_scope(class_a);
        assert!(arena.definitions_in(class_a).is_empty());
        assert_eq!(
            arena.resolve(method_a, "render", 100).as_deref(),
            Some("module.B.render")
        );
    }

    #[test]
    fn test_unknown_name_unresolved() {
        let arena = ScopeArena::new();
        assert!(arena.resolve(MODULE_SCOPE, "print", 10).is_none());
    }
}
