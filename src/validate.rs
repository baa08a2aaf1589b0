#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::{AttrNode, AttrPart, SourceLocation};

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR KINDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    MissingAttribute,
    AttributeWithoutTag,
    CaseOutsideSwitch,
    DefaultOutsideSwitch,
    CaseAfterDefault,
    TextInsideSwitch,
    SelfClosingTemplate,
    StateTagNotSingle,
    StateNameNotBare,
    InvalidComponentName,
    DynamicInclude,
    IncludeFailed,
    IncludeCycle,
    UnsupportedExpression,
    InvalidAst,
    ReadFailed,
}

impl ErrorKind {
    /// Stable code reported alongside the message.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::MissingAttribute => "MPC001",
            ErrorKind::AttributeWithoutTag => "MPC002",
            ErrorKind::CaseOutsideSwitch => "MPC003",
            ErrorKind::DefaultOutsideSwitch => "MPC004",
            ErrorKind::CaseAfterDefault => "MPC005",
            ErrorKind::TextInsideSwitch => "MPC006",
            ErrorKind::SelfClosingTemplate => "MPC007",
            ErrorKind::StateTagNotSingle => "MPC008",
            ErrorKind::StateNameNotBare => "MPC009",
            ErrorKind::InvalidComponentName => "MPC010",
            ErrorKind::DynamicInclude => "MPC011",
            ErrorKind::IncludeFailed => "MPC012",
            ErrorKind::IncludeCycle => "MPC013",
            ErrorKind::UnsupportedExpression => "MPC014",
            ErrorKind::InvalidAst => "MPC015",
            ErrorKind::ReadFailed => "MPC016",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{file}:{line}:{column}: {message} [{}]", .kind.code())]
pub struct CompilerError {
    pub kind: ErrorKind,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl CompilerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, file: &str, location: &SourceLocation) -> Self {
        CompilerError {
            kind,
            message: message.into(),
            file: file.to_string(),
            line: location.line,
            column: location.column,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Serializable error summary handed across the native bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl From<&CompilerError> for ErrorReport {
    fn from(err: &CompilerError) -> Self {
        ErrorReport {
            code: err.code().to_string(),
            message: err.message.clone(),
            file: err.file.clone(),
            line: err.line,
            column: err.column,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TAG PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Control tags read their parameters from attributes with a literal name
/// and a value, e.g. `<if test={$x}>` or `<import name="x-card" from="card">`.
/// Flag attributes and attributes with computed names are ignored.
pub struct TagParams<'a> {
    attrs: &'a [AttrNode],
}

impl<'a> TagParams<'a> {
    pub fn new(attrs: &'a [AttrNode]) -> Self {
        Self { attrs }
    }

    fn find(&self, name: &str) -> Option<&'a AttrNode> {
        self.attrs.iter().rev().find(|attr| {
            attr.value.is_some()
                && matches!(&attr.name, AttrPart::Literal { value } if value == name)
        })
    }

    pub fn get(&self, name: &str) -> Option<&'a AttrPart> {
        self.find(name).and_then(|attr| attr.value.as_ref())
    }
}
