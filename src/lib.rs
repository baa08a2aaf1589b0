//! # Markup to PHP Compiler
//!
//! Compiles a parsed markup template AST into a PHP closure that, when
//! called, returns a tree of node records:
//!
//! ```php
//! ["tag" => "div", "attrs" => [...], "children" => [...]]
//! ["text" => "..."]   ["comment" => "..."]   ["script" => ["attrs" => [...], "body" => "..."]]
//! ```
//!
//! ## Invariants
//!
//! 1. **Determinism**: equal inputs compile to byte-identical output.
//! 2. **Scope**: a name assigned anywhere in a template (`variable`,
//!    `for-each` bindings, `template`, `use-state`) is read from `$__scope`
//!    everywhere in that template; other names are read from `$__data`.
//! 3. **Attribute control flow**: `if`, `for-each` and `switch` around an
//!    `<attribute>` apply to the enclosing tag's attribute list, once per
//!    iteration or branch.
//! 4. **Components**: a component's result records are spliced flat into
//!    the caller's children, never wrapped.
//! 5. **Registry**: by default an imported component name stays registered
//!    for the rest of the process (see [`RegistryScope`]).

#[cfg(feature = "napi")]
use napi_derive::napi;

#[macro_use]
pub mod code;

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod discovery;
pub mod document;
pub mod expression;
pub mod fragment;
pub mod loader;
pub mod registry;
pub mod scope;
pub mod switch;
pub mod tags;
pub mod validate;

#[cfg(test)]
mod compiler_tests;
#[cfg(test)]
mod test_support;

pub use ast::Template;
pub use compiler::{compile, compile_json, compile_with_loader, CompileOptions};
pub use discovery::{compile_directory, CompiledFile};
pub use loader::{JsonFileLoader, LoadError, TemplateLoader};
pub use registry::RegistryScope;
pub use validate::{CompilerError, ErrorKind, ErrorReport};

/// Node.js entry point: AST JSON in, PHP source out.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_template_native(ast_json: String, options_json: Option<String>) -> napi::Result<String> {
    let options: CompileOptions = match options_json {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| napi::Error::from_reason(format!("invalid compile options: {}", e)))?,
        None => CompileOptions::default(),
    };
    compile_json(&ast_json, &options).map_err(|err| {
        let report = ErrorReport::from(&err);
        let reason = serde_json::to_string(&report).unwrap_or_else(|_| err.to_string());
        napi::Error::from_reason(reason)
    })
}
