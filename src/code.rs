//! Emission buffer.
//!
//! Generated PHP is accumulated as a list of chunks. Plain text is stored
//! verbatim; the storage root of a variable reference (`$__scope` or
//! `$__data`) is stored by name and only resolved in [`Code::render`], once
//! the whole invocation has been walked and the scope set is final.

use crate::scope::ScopeSet;
use lazy_static::lazy_static;
use regex::Regex;

pub const DATA: &str = "$__data";
pub const SCOPE: &str = "$__scope";
pub const STATE: &str = "$__state";
pub const CHILDREN: &str = "$__children";
pub const COMPONENTS: &str = "$__components";

lazy_static! {
    static ref PHP_ESCAPE: Regex = Regex::new(r#"[\\"$]"#).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    Text(String),
    /// Storage root of a variable; resolved against the final scope set.
    Root(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Code {
    chunks: Vec<Chunk>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    /// A deferred `$__scope` / `$__data` root for `name`.
    pub fn root(name: &str) -> Self {
        Self {
            chunks: vec![Chunk::Root(name.to_string())],
        }
    }

    pub fn push_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Chunk::Text(last)) = self.chunks.last_mut() {
            last.push_str(text);
        } else {
            self.chunks.push(Chunk::Text(text.to_string()));
        }
    }

    pub fn push_root(&mut self, name: &str) {
        self.chunks.push(Chunk::Root(name.to_string()));
    }

    pub fn append(&mut self, other: Code) {
        for chunk in other.chunks {
            match chunk {
                Chunk::Text(text) => self.push_str(&text),
                root => self.chunks.push(root),
            }
        }
    }

    pub fn join(parts: Vec<Code>, separator: &str) -> Code {
        let mut out = Code::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            out.append(part);
        }
        out
    }

    pub fn render(&self, scope: &ScopeSet) -> String {
        let mut out = String::new();
        for chunk in &self.chunks {
            match chunk {
                Chunk::Text(text) => out.push_str(text),
                Chunk::Root(name) if scope.is_local(name) => out.push_str(SCOPE),
                Chunk::Root(_) => out.push_str(DATA),
            }
        }
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDING
// ═══════════════════════════════════════════════════════════════════════════════

pub trait Emit {
    fn emit_into(self, code: &mut Code);
}

impl Emit for &str {
    fn emit_into(self, code: &mut Code) {
        code.push_str(self);
    }
}

impl Emit for String {
    fn emit_into(self, code: &mut Code) {
        code.push_str(&self);
    }
}

impl Emit for &String {
    fn emit_into(self, code: &mut Code) {
        code.push_str(self);
    }
}

impl Emit for u32 {
    fn emit_into(self, code: &mut Code) {
        code.push_str(&self.to_string());
    }
}

impl Emit for Code {
    fn emit_into(self, code: &mut Code) {
        code.append(self);
    }
}

impl Emit for &Code {
    fn emit_into(self, code: &mut Code) {
        code.append(self.clone());
    }
}

/// Concatenate text and [`Code`] pieces into a single [`Code`].
macro_rules! code {
    ($($part:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut out = $crate::code::Code::new();
        $($crate::code::Emit::emit_into($part, &mut out);)*
        out
    }};
}

/// Wrap a statement body in its own `<?php ... ?>` block.
pub fn statement(body: Code) -> Code {
    code!["<?php ", body, " ?>\n"]
}

/// Double-quoted PHP string literal.
pub fn php_string(value: &str) -> String {
    format!("\"{}\"", PHP_ESCAPE.replace_all(value, r"\$0"))
}
