//! Input AST produced by the external markup parser.
//!
//! The parser hands us JSON; everything here is plain `serde` data with no
//! behavior. The compiler copies it into a [`crate::document::Document`]
//! arena before walking it.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// A parsed template file: the top-level sibling list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub nodes: Vec<AstNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AstNode {
    Tag(TagNode),
    Text(TextNode),
    Comment(CommentNode),
    #[serde(rename = "string")]
    StringLiteral(StringNode),
    /// `{...}` used as a value (attribute name or value).
    #[serde(rename = "logic")]
    ExpressionSlot(ExpressionNode),
    /// `{...}` placed in child position; its result is appended to the output.
    #[serde(rename = "logic-node")]
    ExpressionBlock(ExpressionNode),
    Script(ScriptNode),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagNode {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub attrs: Vec<AttrNode>,
    #[serde(default)]
    pub is_single: bool,
    #[serde(default)]
    pub children: Vec<AstNode>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub id: u32,
    pub text: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: u32,
    pub value: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringNode {
    pub id: u32,
    pub value: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionNode {
    pub id: u32,
    pub expr: Expr,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptNode {
    pub id: u32,
    #[serde(default)]
    pub attrs: Vec<AttrNode>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub location: SourceLocation,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

/// `name=value`, or a bare flag when `value` is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttrNode {
    pub name: AttrPart,
    #[serde(default)]
    pub value: Option<AttrPart>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AttrPart {
    #[serde(rename = "string")]
    Literal { value: String },
    #[serde(rename = "logic")]
    Expression { expr: Expr },
}

impl AttrPart {
    /// The static string behind this part, if it has one.
    ///
    /// Both `name="x"` and `name={"x"}` count as static.
    pub fn as_static_str(&self) -> Option<&str> {
        match self {
            AttrPart::Literal { value } => Some(value),
            AttrPart::Expression {
                expr: Expr::Str { value },
            } => Some(value),
            AttrPart::Expression { .. } => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Expr {
    /// `$name`, `$name[key]`, `$name.key`
    Var {
        name: String,
        #[serde(default)]
        keys: Vec<Expr>,
    },
    Const {
        value: String,
    },
    Str {
        value: String,
    },
    Num {
        value: serde_json::Number,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        value: Box<Expr>,
    },
    /// `$name?`
    Isset {
        value: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// `a ++ b ++ c`
    Concat {
        values: Vec<Expr>,
    },
    Array {
        #[serde(default)]
        values: Vec<ArrayEntry>,
    },
    /// `[a..b]` (closed) or `[a...b]` (open)
    Range {
        kind: RangeKind,
        start: Box<Expr>,
        end: Box<Expr>,
    },
    Func {
        callee: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArrayEntry {
    #[serde(default)]
    pub key: Option<Expr>,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    Open,
    #[serde(alias = "close")]
    Closed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Plus,
    Minus,
    Mult,
    Divis,
    Mod,
    Or,
    And,
    Bitor,
    Bitand,
    Bitxor,
    Leftshift,
    Rightshift,
    Equal,
    Notequal,
    Gt,
    Gtequal,
    Lt,
    Ltequal,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Mult => "*",
            BinaryOp::Divis => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Bitor => "|",
            BinaryOp::Bitand => "&",
            BinaryOp::Bitxor => "^",
            BinaryOp::Leftshift => "<<",
            BinaryOp::Rightshift => ">>",
            BinaryOp::Equal => "==",
            BinaryOp::Notequal => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Gtequal => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Ltequal => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    Not,
    Bitnot,
    Uminus,
    Brack,
}
