//! Template builtin functions and the PHP they lower to.
//!
//! Anything not listed here is emitted as a direct call with the template
//! name, so runtime helpers (e.g. user-defined PHP functions) still work.

use crate::ast::Expr;
use crate::code::Code;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Temporary holding a dynamic `str_split` separator.
const SPLIT_SEPARATOR: &str = "$__separator";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `php(args...)`
    Rename(&'static str),
    /// `php(args..., tail)`
    RenameWith(&'static str, &'static str),
    /// `str_sub(s, start[, len])`
    Substring,
    /// `str_replace(s, from, to)`, subject moves last
    Replace,
    /// `str_split(s, sep)`
    Split,
    /// `str(v, digits, sep)`
    Format,
    /// `arr_contain(a, v)`
    Contains,
    /// `arr_join(a, sep)`
    Join,
    /// `num_round(x)`
    Round,
    /// `num_rand()`
    Random,
    /// `classes(...)`, variable arguments are read safely
    Classes,
}

lazy_static! {
    pub static ref BUILTINS: HashMap<&'static str, Builtin> = {
        use Builtin::*;
        let mut m = HashMap::new();
        m.insert("str", Format);
        m.insert("str_sub", Substring);
        m.insert("str_len", RenameWith("mb_strlen", "'UTF-8'"));
        m.insert("str_replace", Replace);
        m.insert("str_pad_right", RenameWith("str_pad", "STR_PAD_RIGHT"));
        m.insert("str_pad_left", RenameWith("str_pad", "STR_PAD_LEFT"));
        m.insert("str_pad_both", RenameWith("str_pad", "STR_PAD_BOTH"));
        m.insert("str_split", Split);
        m.insert("str_lower", RenameWith("mb_strtolower", "'UTF-8'"));
        m.insert("str_upper", RenameWith("mb_strtoupper", "'UTF-8'"));
        m.insert("str_trim", Rename("trim"));
        m.insert("str_ltrim", Rename("ltrim"));
        m.insert("str_rtrim", Rename("rtrim"));
        m.insert("str_urlencode", Rename("rawurlencode"));
        m.insert("str_urldecode", Rename("rawurldecode"));
        m.insert("str_htmlescape", Rename("htmlspecialchars"));

        m.insert("arr_keys", Rename("array_keys"));
        m.insert("arr_values", Rename("array_values"));
        m.insert("arr_len", Rename("count"));
        m.insert("arr_pop", Rename("array_pop"));
        m.insert("arr_shift", Rename("array_shift"));
        m.insert("arr_slice", Rename("array_slice"));
        m.insert("arr_splice", Rename("array_splice"));
        m.insert("arr_pad", Rename("array_pad"));
        m.insert("arr_reverse", Rename("array_reverse"));
        m.insert("arr_unique", Rename("array_unique"));
        m.insert("arr_contain", Contains);
        m.insert("arr_join", Join);

        m.insert("num_int", Rename("intval"));
        m.insert("num_float", Rename("floatval"));
        m.insert("num_pow", Rename("pow"));
        m.insert("num_abs", Rename("abs"));
        m.insert("num_sqrt", Rename("sqrt"));
        m.insert("num_acos", Rename("acos"));
        m.insert("num_asin", Rename("asin"));
        m.insert("num_atan", Rename("atan"));
        m.insert("num_cos", Rename("cos"));
        m.insert("num_sin", Rename("sin"));
        m.insert("num_tan", Rename("tan"));
        m.insert("num_round", Round);
        m.insert("num_rand", Random);

        m.insert("classes", Classes);
        m
    };
}

pub fn lookup(name: &str) -> Option<Builtin> {
    BUILTINS.get(name).copied()
}

/// Direct call: `name(a, b, ...)`.
pub fn call(name: &str, args: Vec<Code>) -> Code {
    code![name, "(", Code::join(args, ", "), ")"]
}

fn arg_or(args: &[Code], index: usize, fallback: &str) -> Code {
    args.get(index).cloned().unwrap_or_else(|| code![fallback])
}

fn is_empty_string(expr: Option<&Expr>) -> Option<bool> {
    match expr {
        None => Some(true),
        Some(Expr::Str { value }) => Some(value.is_empty()),
        Some(_) => None,
    }
}

impl Builtin {
    /// `args` are the compiled arguments, `raw` the source expressions
    /// (consulted where the lowering depends on a literal argument).
    pub fn render(self, args: Vec<Code>, raw: &[Expr]) -> Code {
        match self {
            Builtin::Rename(php) => call(php, args),
            Builtin::Classes => call("classes", args),
            Builtin::RenameWith(php, tail) => {
                let mut args = args;
                args.push(code![tail]);
                call(php, args)
            }
            Builtin::Substring => {
                let mut args = args;
                while args.len() < 3 {
                    args.push(code!["NULL"]);
                }
                args.push(code!["'UTF-8'"]);
                call("mb_substr", args)
            }
            Builtin::Replace => call(
                "str_replace",
                vec![
                    arg_or(&args, 1, "NULL"),
                    arg_or(&args, 2, "NULL"),
                    arg_or(&args, 0, "NULL"),
                ],
            ),
            Builtin::Split => {
                let subject = arg_or(&args, 0, "\"\"");
                match is_empty_string(raw.get(1)) {
                    Some(true) => call("mb_str_split", vec![subject]),
                    Some(false) => call("explode", vec![arg_or(&args, 1, "\"\""), subject]),
                    None => {
                        // Only one branch runs, so the subject is evaluated once.
                        let separator = arg_or(&args, 1, "\"\"");
                        code![
                            "((",
                            SPLIT_SEPARATOR,
                            " = ",
                            separator,
                            ") === \"\" ? ",
                            call("mb_str_split", vec![subject.clone()]),
                            " : ",
                            call("explode", vec![code![SPLIT_SEPARATOR], subject]),
                            ")"
                        ]
                    }
                }
            }
            Builtin::Format => call(
                "toFixed",
                vec![
                    arg_or(&args, 0, "NULL"),
                    arg_or(&args, 1, "0"),
                    arg_or(&args, 2, "\".\""),
                ],
            ),
            Builtin::Contains => code![
                "(",
                call(
                    "array_search",
                    vec![arg_or(&args, 1, "NULL"), arg_or(&args, 0, "[]")]
                ),
                " !== false)"
            ],
            Builtin::Join => call(
                "implode",
                vec![arg_or(&args, 1, "\"\""), arg_or(&args, 0, "[]")],
            ),
            // PHP_ROUND_HALF_UP rounds halves away from zero.
            Builtin::Round => call("round", vec![arg_or(&args, 0, "0")]),
            Builtin::Random => code!["((float)rand() / (float)getrandmax())"],
        }
    }
}
