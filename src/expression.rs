//! Template expressions to PHP expression text.
//!
//! Variable storage roots are emitted as deferred [`Code`] roots so that a
//! later promotion in the same invocation still moves earlier reads to
//! `$__scope`.

use crate::ast::{ArrayEntry, Expr, RangeKind, UnaryOp};
use crate::builtins::{self, Builtin};
use crate::code::{php_string, Code, CHILDREN, DATA};
use crate::scope::ScopeSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported expression")]
pub struct UnsupportedExpression;

/// Where the compiled expression ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprContext {
    /// Attribute values, assigned values, call arguments. A top-level `$x?`
    /// becomes a safe read.
    Value,
    /// `if` / `case` tests.
    Condition,
    /// Left side of an assignment. `promote` makes a keyless name local.
    Target { promote: bool },
    /// Left side of a `param` default; always the caller's data.
    DataTarget,
}

pub struct ExprCompiler<'s> {
    scope: &'s mut ScopeSet,
}

impl<'s> ExprCompiler<'s> {
    pub fn new(scope: &'s mut ScopeSet) -> Self {
        Self { scope }
    }

    pub fn compile(&mut self, expr: &Expr, ctx: ExprContext) -> Result<Code, UnsupportedExpression> {
        match (ctx, expr) {
            (ExprContext::Value, Expr::Isset { value }) => {
                let inner = self.expr(value)?;
                Ok(safe_read(inner))
            }
            (ExprContext::Target { promote }, Expr::Var { name, keys }) => {
                if promote && keys.is_empty() && !is_reserved_name(name) {
                    self.scope.promote(name);
                }
                self.var(name, keys, false)
            }
            (ExprContext::DataTarget, Expr::Var { name, keys }) => self.var(name, keys, true),
            _ => self.expr(expr),
        }
    }

    fn expr(&mut self, expr: &Expr) -> Result<Code, UnsupportedExpression> {
        match expr {
            Expr::Var { name, keys } => self.var(name, keys, false),
            Expr::Const { value } => Ok(code![value]),
            Expr::Str { value } => Ok(code![php_string(value)]),
            Expr::Num { value } => Ok(code![value.to_string()]),
            Expr::Binary { op, left, right } => {
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                Ok(code![left, " ", op.symbol(), " ", right])
            }
            Expr::Unary { op, value } => {
                let value = self.expr(value)?;
                Ok(match op {
                    UnaryOp::Not => code!["!", value],
                    UnaryOp::Bitnot => code!["~", value],
                    UnaryOp::Uminus => code!["-", value],
                    UnaryOp::Brack => code!["(", value, ")"],
                })
            }
            Expr::Isset { value } => {
                let value = self.expr(value)?;
                Ok(code!["isset(", value, ")"])
            }
            Expr::Ternary {
                condition,
                consequent,
                alternate,
            } => {
                let condition = self.expr(condition)?;
                let consequent = self.expr(consequent)?;
                let alternate = self.expr(alternate)?;
                Ok(code!["(", condition, " ? ", consequent, " : ", alternate, ")"])
            }
            Expr::Concat { values } => {
                let parts = self.all(values)?;
                Ok(Code::join(parts, " . "))
            }
            Expr::Array { values } => self.array(values),
            Expr::Range { kind, start, end } => {
                let start = self.expr(start)?;
                let end = self.expr(end)?;
                let mode = match kind {
                    RangeKind::Open => "MKARR_OPEN",
                    RangeKind::Closed => "MKARR_CLOSE",
                };
                Ok(code!["mkArr(", start, ", ", end, ", ", mode, ")"])
            }
            Expr::Func { callee, args } => self.call(callee, args),
            Expr::Unsupported => Err(UnsupportedExpression),
        }
    }

    fn all(&mut self, exprs: &[Expr]) -> Result<Vec<Code>, UnsupportedExpression> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    fn var(&mut self, name: &str, keys: &[Expr], data_only: bool) -> Result<Code, UnsupportedExpression> {
        let mut out = match name {
            "children" => code![CHILDREN],
            "true" | "false" if keys.is_empty() => return Ok(code![name]),
            _ if data_only => code![DATA, "[", php_string(name), "]"],
            _ => code![Code::root(name), "[", php_string(name), "]"],
        };
        for key in keys {
            let key = self.expr(key)?;
            out.append(code!["[", key, "]"]);
        }
        Ok(out)
    }

    fn array(&mut self, entries: &[ArrayEntry]) -> Result<Code, UnsupportedExpression> {
        if entries.iter().all(|entry| entry.key.is_none()) {
            let values = entries
                .iter()
                .map(|entry| self.expr(&entry.value))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(code!["[", Code::join(values, ", "), "]"]);
        }

        let mut next_index: u32 = 0;
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = match &entry.key {
                Some(key) => self.expr(key)?,
                None => {
                    let index = next_index;
                    next_index += 1;
                    code![index]
                }
            };
            let value = self.expr(&entry.value)?;
            pairs.push(code![key, " => ", value]);
        }
        Ok(code!["[", Code::join(pairs, ", "), "]"])
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Code, UnsupportedExpression> {
        let name = match callee {
            Expr::Var { name, keys } if keys.is_empty() => name.as_str(),
            _ => {
                let callee = self.expr(callee)?;
                let args = self.all(args)?;
                return Ok(code![callee, "(", Code::join(args, ", "), ")"]);
            }
        };

        match builtins::lookup(name) {
            Some(Builtin::Classes) => {
                let args = args
                    .iter()
                    .map(|arg| match arg {
                        Expr::Var { name, keys } if !(keys.is_empty() && is_reserved_name(name)) => {
                            self.expr(arg).map(safe_read)
                        }
                        _ => self.expr(arg),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Builtin::Classes.render(args, &[]))
            }
            Some(builtin) => {
                let compiled = self.all(args)?;
                Ok(builtin.render(compiled, args))
            }
            None => {
                let compiled = self.all(args)?;
                Ok(builtins::call(name, compiled))
            }
        }
    }
}

/// `(isset(v) ? v : "")`
pub fn safe_read(value: Code) -> Code {
    code!["(isset(", &value, ") ? ", value, " : \"\")"]
}

fn is_reserved_name(name: &str) -> bool {
    matches!(name, "children" | "true" | "false")
}
