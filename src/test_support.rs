//! JSON fixture builders and an in-memory loader shared by the test modules.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::ast::Template;
use crate::compiler::{compile_with_loader, CompileOptions};
use crate::loader::{LoadError, TemplateLoader};
use crate::registry::RegistryScope;
use crate::validate::CompilerError;

#[derive(Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, Template>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, nodes: Value) -> Self {
        self.files.insert(PathBuf::from(path), template(nodes));
        self
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<Template, LoadError> {
        self.files.get(path).cloned().ok_or_else(|| {
            LoadError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                path.display().to_string(),
            ))
        })
    }
}

pub fn template(nodes: Value) -> Template {
    serde_json::from_value(json!({ "nodes": nodes })).unwrap()
}

pub fn session_options() -> CompileOptions {
    CompileOptions {
        file_path: "page.json".to_string(),
        registry_scope: RegistryScope::Session,
        ..CompileOptions::default()
    }
}

pub fn try_compile(nodes: Value) -> Result<String, CompilerError> {
    compile_with_loader(&template(nodes), &session_options(), &MemoryLoader::new())
}

pub fn compile_ok(nodes: Value) -> String {
    try_compile(nodes).unwrap()
}

pub fn compile_err(nodes: Value) -> CompilerError {
    try_compile(nodes).unwrap_err()
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn tag(id: u32, name: &str, attrs: Value, children: Value) -> Value {
    json!({ "type": "tag", "id": id, "name": name, "attrs": attrs, "children": children })
}

pub fn single(id: u32, name: &str, attrs: Value) -> Value {
    json!({ "type": "tag", "id": id, "name": name, "attrs": attrs, "isSingle": true })
}

pub fn text(id: u32, value: &str) -> Value {
    json!({ "type": "text", "id": id, "text": value })
}

pub fn block(id: u32, expr: Value) -> Value {
    json!({ "type": "logic-node", "id": id, "expr": expr })
}

/// `name=value` with a literal name.
pub fn attr(name: &str, value: Value) -> Value {
    json!({ "name": { "type": "string", "value": name }, "value": value })
}

pub fn flag(name: &str) -> Value {
    json!({ "name": { "type": "string", "value": name }, "value": null })
}

pub fn lit(value: &str) -> Value {
    json!({ "type": "string", "value": value })
}

pub fn logic(expr: Value) -> Value {
    json!({ "type": "logic", "expr": expr })
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSION BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn var(name: &str) -> Value {
    json!({ "type": "var", "name": name, "keys": [] })
}

pub fn var_keys(name: &str, keys: Value) -> Value {
    json!({ "type": "var", "name": name, "keys": keys })
}

pub fn num(value: i64) -> Value {
    json!({ "type": "num", "value": value })
}

pub fn string(value: &str) -> Value {
    json!({ "type": "str", "value": value })
}

pub fn func(name: &str, args: Value) -> Value {
    json!({ "type": "func", "callee": var(name), "args": args })
}
