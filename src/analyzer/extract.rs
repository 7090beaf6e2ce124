//! Structure extraction over Python source.
//!
//! Parses source text with tree-sitter and walks the tree in document order,
//! collecting one Module root, a Class entity per class definition, a
//! Function entity per function/method definition, and a CallEdge per call
//! expression found inside a function body. Syntactically invalid source
//! fails with a located parse error; syntactically valid but semantically
//! unusual constructs are represented best-effort, never rejected.

use tracing::{debug, warn};
use tree_sitter::Node;

use super::scope::{Definition, ScopeArena, MODULE_SCOPE};
use crate::types::{
    CodeEntity, DiagramGraph, EntityKind, LoomError, Result, SourceUnit,
};

/// Root module entity id. The source unit is anonymous text, so the qualified
/// names of everything it defines hang off this fixed root.
pub const MODULE_ID: &str = "module";

/// One call expression recorded during the walk, resolved after all
/// definitions are known.
struct PendingCall {
    caller_id: String,
    callee_name: String,
    offset: usize,
    scope: usize,
}

/// Extracts a relationship graph from Python source text.
pub struct StructureExtractor {
    language: tree_sitter::Language,
}

impl StructureExtractor {
    pub fn new() -> Result<Self> {
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        // Validate the grammar is loadable before any extraction runs
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| LoomError::Config(format!("Failed to load Python grammar: {}", e)))?;
        Ok(Self { language })
    }

    /// Parse `source` into a closed relationship graph.
    pub fn extract(&self, source: &SourceUnit) -> Result<DiagramGraph> {
        let content = source.raw_text.as_str();

        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| LoomError::Config(format!("Failed to load Python grammar: {}", e)))?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| LoomError::parse("tree-sitter could not parse source", 1, 0))?;
        let root = tree.root_node();

        // Malformed source never yields a partial graph
        if root.has_error() {
            let (line, column, detail) = first_error(root);
            return Err(LoomError::parse(detail, line, column));
        }

        let mut graph = DiagramGraph::new();
        graph.insert_entity(CodeEntity::new(MODULE_ID, EntityKind::Module, None));

        let mut scopes = ScopeArena::new();
        let mut pending = Vec::new();
        let mut walker = Walker {
            content: content.as_bytes(),
            graph: &mut graph,
            scopes: &mut scopes,
            pending: &mut pending,
        };
        walker.walk(root, MODULE_ID, MODULE_SCOPE, None);

        resolve_calls(&mut graph, &scopes, pending);

        debug_assert!(graph.is_closed());
        debug!(
            entities = graph.len(),
            calls = graph.calls().len(),
            "extraction complete"
        );
        Ok(graph)
    }
}

/// Recursive document-order walk collecting definitions and call sites.
struct Walker<'a> {
    content: &'a [u8],
    graph: &'a mut DiagramGraph,
    scopes: &'a mut ScopeArena,
    pending: &'a mut Vec<PendingCall>,
}

impl Walker<'_> {
    fn walk(&mut self, node: Node, owner_id: &str, scope: usize, function: Option<&str>) {
        match node.kind() {
            "class_definition" => {
                if let Some(name) = self.field_text(node, "name") {
                    let id = format!("{}.{}", owner_id, name);
                    self.graph.insert_entity(CodeEntity::new(
                        &id,
                        EntityKind::Class,
                        Some(owner_id.to_string()),
                    ));
                    self.scopes.define(
                        scope,
                        Definition {
                            name,
                            id: id.clone(),
                            offset: node.start_byte(),
                        },
                    );
                    let body_scope = self.scopes.push_scope(scope);
                    self.walk_children(node, &id, body_scope, function);
                    return;
                }
            }
            "function_definition" => {
                if let Some(name) = self.field_text(node, "name") {
                    let id = format!("{}.{}", owner_id, name);
                    self.graph.insert_entity(CodeEntity::new(
                        &id,
                        EntityKind::Function,
                        Some(owner_id.to_string()),
                    ));
                    self.scopes.define(
                        scope,
                        Definition {
                            name,
                            id: id.clone(),
                            offset: node.start_byte(),
                        },
                    );
                    let body_scope = self.scopes.push_scope(scope);
                    self.walk_children(node, &id, body_scope, Some(id.as_str()));
                    return;
                }
            }
            "call" => {
                // Only calls inside a function body become edges
                if let Some(caller_id) = function
                    && let Some(callee_name) = self.callee_name(node)
                {
                    self.pending.push(PendingCall {
                        caller_id: caller_id.to_string(),
                        callee_name,
                        offset: node.start_byte(),
                        scope,
                    });
                }
                // Recurse for nested calls in arguments
            }
            _ => {}
        }
        self.walk_children(node, owner_id, scope, function);
    }

    fn walk_children(&mut self, node: Node, owner_id: &str, scope: usize, function: Option<&str>) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            self.walk(child, owner_id, scope, function);
        }
    }

    fn field_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .and_then(|n| n.utf8_text(self.content).ok())
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    }

    /// Simple name of the called target: `foo()` → `foo`,
    /// `obj.method()` → `method`. Other callables (subscripts, nested calls)
    /// are skipped as best-effort.
    fn callee_name(&self, call: Node) -> Option<String> {
        let target = call.child_by_field_name("function")?;
        match target.kind() {
            "identifier" => self.node_text(target),
            "attribute" => target
                .child_by_field_name("attribute")
                .and_then(|n| self.node_text(n)),
            _ => None,
        }
    }

    fn node_text(&self, node: Node) -> Option<String> {
        node.utf8_text(self.content)
            .ok()
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    }
}

/// Bind recorded call sites to entities, creating synthetic externals for
/// anything unresolved so the graph stays closed under its edge set.
fn resolve_calls(graph: &mut DiagramGraph, scopes: &ScopeArena, pending: Vec<PendingCall>) {
    for call in pending {
        let callee_id = match scopes.resolve(call.scope, &call.callee_name, call.offset) {
            Some(id) => id,
            None => {
                warn!(
                    name = %call.callee_name,
                    caller = %call.caller_id,
                    "unresolved call reference, using synthetic external entity"
                );
                let external = CodeEntity::external(&call.callee_name);
                let id = external.id.clone();
                graph.insert_entity(external);
                id
            }
        };
        graph.add_call(call.caller_id, callee_id);
    }
}

/// Locate the first syntax error in the tree (1-based line, 0-based column).
fn first_error(root: Node) -> (u32, u32, String) {
    let mut stack = vec![root];
    let mut best: Option<Node> = None;
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let better = match best {
                Some(b) => node.start_byte() < b.start_byte(),
                None => true,
            };
            if better {
                best = Some(node);
            }
            continue;
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }

    match best {
        Some(node) => {
            let pos = node.start_position();
            let detail = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            (pos.row as u32 + 1, pos.column as u32, detail)
        }
        None => (1, 0, "invalid syntax".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EXTERN_PREFIX;

    fn extract(source: &str) -> DiagramGraph {
        StructureExtractor::new()
            .expect("grammar")
            .extract(&SourceUnit::new(source))
            .expect("extract")
    }

    #[test]
    fn test_empty_source_has_only_module_root() {
        let graph = extract("");
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get(MODULE_ID).unwrap().kind, EntityKind::Module);
        assert!(graph.calls().is_empty());
    }

    #[test]
    fn test_function_without_calls() {
        let graph = extract("def solo():\n    return 1\n");
        assert_eq!(graph.len(), 2);
        let entity = graph.get("module.solo").expect("function entity");
        assert_eq!(entity.kind, EntityKind::Function);
        assert_eq!(entity.parent_id.as_deref(), Some(MODULE_ID));
        assert!(graph.calls().is_empty());
        assert!(graph.is_closed());
    }

    #[test]
    fn test_unresolvable_call_becomes_synthetic() {
        let graph = extract("def run():\n    launch()\n");
        let edge = &graph.calls()[0];
        assert_eq!(edge.caller_id, "module.run");
        assert_eq!(edge.callee_id, format!("{}launch", EXTERN_PREFIX));
        assert!(graph.contains(&edge.callee_id));
        assert!(graph.is_closed());
    }

    #[test]
    fn test_sibling_function_call_resolves() {
        let source = "def helper():\n    pass\n\ndef run():\n    helper()\n";
        let graph = extract(source);
        let edge = &graph.calls()[0];
        assert_eq!(edge.caller_id, "module.run");
        assert_eq!(edge.callee_id, "module.helper");
    }

    #[test]
    fn test_forward_call_resolves() {
        let source = "def run():\n    helper()\n\ndef helper():\n    pass\n";
        let graph = extract(source);
        assert_eq!(graph.calls()[0].callee_id, "module.helper");
    }

    #[test]
    fn test_cross_class_method_call_resolves() {
        let source = "\
class Greeter:
    def greet(self):
        return format_name()

class Formatter:
    def format_name(self):
        return 'x'
";
        let graph = extract(source);
        assert_eq!(graph.calls().len(), 1);
        assert_eq!(graph.calls()[0].caller_id, "module.Greeter.greet");
        assert_eq!(graph.calls()[0].callee_id, "module.Formatter.format_name");
        assert!(graph.is_closed());
    }

    #[test]
    fn test_attribute_call_uses_terminal_name() {
        let source = "\
class Store:
    def save(self):
        pass

def run():
    store = Store()
    store.save()
";
        let graph = extract(source);
        let callees: Vec<&str> = graph.calls().iter().map(|e| e.callee_id.as_str()).collect();
        assert!(callees.contains(&"module.Store"));
        assert!(callees.contains(&"module.Store.save"));
    }

    #[test]
    fn test_nested_class_parentage() {
        let source = "\
class Outer:
    class Inner:
        def act(self):
            pass
";
        let graph = extract(source);
        let inner = graph.get("module.Outer.Inner").expect("inner class");
        assert_eq!(inner.parent_id.as_deref(), Some("module.Outer"));
        let act = graph.get("module.Outer.Inner.act").expect("method");
        assert_eq!(act.parent_id.as_deref(), Some("module.Outer.Inner"));
        assert_eq!(graph.depth("module.Outer.Inner.act"), 3);
    }

    #[test]
    fn test_module_level_calls_ignored() {
        let graph = extract("print('hello')\n");
        assert!(graph.calls().is_empty());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_malformed_source_is_parse_error() {
        let result = StructureExtractor::new()
            .expect("grammar")
            .extract(&SourceUnit::new("def broken(:\n    pass\n"));
        match result {
            Err(LoomError::Parse { line, .. }) => assert!(line >= 1),
            other => panic!("expected parse error, got {:?}", other.map(|g| g.len())),
        }
    }

    #[test]
    fn test_duplicate_definitions_bind_nearest_preceding() {
        let source = "\
def task():
    pass

def run():
    task()

def task():
    pass
";
        let graph = extract(source);
        // Two defs share an id; the graph keeps one entity and the call binds
        // to the nearest preceding definition.
        assert_eq!(graph.calls()[0].callee_id, "module.task");
        assert!(graph.is_closed());
    }
}
