//! Submission-time validation of Python source.
//!
//! The source is parsed into a syntax tree with a pure-Rust Python parser;
//! it is never imported or executed. A script is accepted when it defines a
//! (non-async) function named `main` that takes exactly one positional
//! parameter, optionally annotated with a dict/mapping type.

use std::collections::VecDeque;

use rustpython_parser::ast::{self, Constant, Expr, Stmt};
use rustpython_parser::Parse;
use serde::{Deserialize, Serialize};

/// Name of the function every stored script must define.
pub const ENTRY_POINT: &str = "main";

/// Annotation names accepted for the entry point's parameter, bare or
/// subscripted, optionally module-qualified (`typing.Dict[str, Any]`).
const MAPPING_TYPE_NAMES: &[&str] = &["dict", "Dict", "Mapping", "MutableMapping"];

/// Reasons a submitted script is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The source does not parse. `context` holds the offending line and a
    /// caret under the error column.
    #[error("Invalid Python syntax at line {line}, column {column}:\n{context}\n{message}")]
    SyntaxInvalid {
        line: usize,
        column: usize,
        context: String,
        message: String,
    },

    #[error("Script must define a function 'main' taking one dict argument")]
    MissingEntryPoint,

    #[error(
        "Function 'main' must take exactly one positional argument of type dict, \
         found {found} parameter(s)"
    )]
    BadSignature { found: usize },

    #[error("Argument of 'main' must be of type dict, found '{annotation}'")]
    BadParameterType { annotation: String },
}

/// Result of validating one submitted source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub valid: bool,
    pub message: Option<String>,
}

impl From<Result<(), ValidationError>> for ValidationVerdict {
    fn from(result: Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => Self {
                valid: true,
                message: None,
            },
            Err(err) => Self {
                valid: false,
                message: Some(err.to_string()),
            },
        }
    }
}

/// Validate `source` and report the outcome as a verdict.
pub fn validate(source: &str) -> ValidationVerdict {
    check(source).into()
}

/// Validate `source`, returning the first structural problem found.
pub fn check(source: &str) -> Result<(), ValidationError> {
    let suite = ast::Suite::parse(source, "<submitted>").map_err(|err| {
        syntax_error(source, u32::from(err.offset) as usize, err.error.to_string())
    })?;

    let main = find_entry_point(&suite).ok_or(ValidationError::MissingEntryPoint)?;
    check_signature(&main.args)
}

/// Breadth-first search over every statement body, top level first, for a
/// `def main`. Nested definitions (inside classes, functions, control flow)
/// count, mirroring a full tree walk.
fn find_entry_point(suite: &[Stmt]) -> Option<&ast::StmtFunctionDef> {
    let mut queue: VecDeque<&Stmt> = suite.iter().collect();

    while let Some(stmt) = queue.pop_front() {
        if let Stmt::FunctionDef(def) = stmt {
            if def.name.as_str() == ENTRY_POINT {
                return Some(def);
            }
        }
        for body in child_bodies(stmt) {
            queue.extend(body.iter());
        }
    }
    None
}

/// Statement blocks directly nested in `stmt`.
fn child_bodies(stmt: &Stmt) -> Vec<&[Stmt]> {
    match stmt {
        Stmt::FunctionDef(ast::StmtFunctionDef { body, .. })
        | Stmt::AsyncFunctionDef(ast::StmtAsyncFunctionDef { body, .. })
        | Stmt::ClassDef(ast::StmtClassDef { body, .. })
        | Stmt::With(ast::StmtWith { body, .. })
        | Stmt::AsyncWith(ast::StmtAsyncWith { body, .. }) => vec![body.as_slice()],
        Stmt::If(ast::StmtIf { body, orelse, .. })
        | Stmt::For(ast::StmtFor { body, orelse, .. })
        | Stmt::AsyncFor(ast::StmtAsyncFor { body, orelse, .. })
        | Stmt::While(ast::StmtWhile { body, orelse, .. }) => {
            vec![body.as_slice(), orelse.as_slice()]
        }
        Stmt::Try(ast::StmtTry {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        })
        | Stmt::TryStar(ast::StmtTryStar {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        }) => {
            let mut bodies = vec![body.as_slice(), orelse.as_slice(), finalbody.as_slice()];
            for handler in handlers {
                let ast::ExceptHandler::ExceptHandler(h) = handler;
                bodies.push(h.body.as_slice());
            }
            bodies
        }
        Stmt::Match(ast::StmtMatch { cases, .. }) => {
            cases.iter().map(|case| case.body.as_slice()).collect()
        }
        _ => Vec::new(),
    }
}

fn check_signature(args: &ast::Arguments) -> Result<(), ValidationError> {
    let positional: Vec<&ast::ArgWithDefault> =
        args.posonlyargs.iter().chain(args.args.iter()).collect();
    let found = positional.len()
        + args.kwonlyargs.len()
        + usize::from(args.vararg.is_some())
        + usize::from(args.kwarg.is_some());

    if found != 1 || positional.len() != 1 {
        return Err(ValidationError::BadSignature { found });
    }

    match positional[0].def.annotation.as_deref() {
        None => Ok(()),
        Some(annotation) if is_mapping_annotation(annotation) => Ok(()),
        Some(annotation) => Err(ValidationError::BadParameterType {
            annotation: render_annotation(annotation),
        }),
    }
}

fn is_mapping_annotation(expr: &Expr) -> bool {
    match expr {
        Expr::Name(ast::ExprName { id, .. }) => MAPPING_TYPE_NAMES.contains(&id.as_str()),
        Expr::Attribute(ast::ExprAttribute { attr, .. }) => {
            MAPPING_TYPE_NAMES.contains(&attr.as_str())
        }
        Expr::Subscript(ast::ExprSubscript { value, .. }) => is_mapping_annotation(value),
        // Forward reference: `def main(data: "dict[str, int]")`.
        Expr::Constant(ast::ExprConstant {
            value: Constant::Str(text),
            ..
        }) => {
            let head = text.split('[').next().unwrap_or_default().trim();
            let name = head.rsplit('.').next().unwrap_or(head);
            MAPPING_TYPE_NAMES.contains(&name)
        }
        _ => false,
    }
}

/// Best-effort source-like rendering of an annotation for error messages.
fn render_annotation(expr: &Expr) -> String {
    match expr {
        Expr::Name(ast::ExprName { id, .. }) => id.as_str().to_string(),
        Expr::Attribute(ast::ExprAttribute { value, attr, .. }) => {
            format!("{}.{}", render_annotation(value), attr.as_str())
        }
        Expr::Subscript(ast::ExprSubscript { value, slice, .. }) => {
            format!("{}[{}]", render_annotation(value), render_annotation(slice))
        }
        Expr::Tuple(ast::ExprTuple { elts, .. }) => elts
            .iter()
            .map(render_annotation)
            .collect::<Vec<_>>()
            .join(", "),
        Expr::Constant(ast::ExprConstant {
            value: Constant::Str(text),
            ..
        }) => format!("{text:?}"),
        Expr::Constant(ast::ExprConstant {
            value: Constant::None,
            ..
        }) => "None".to_string(),
        Expr::BinOp(ast::ExprBinOp {
            left, right, op, ..
        }) if matches!(op, ast::Operator::BitOr) => {
            format!("{} | {}", render_annotation(left), render_annotation(right))
        }
        _ => "<expression>".to_string(),
    }
}

/// Build a [`ValidationError::SyntaxInvalid`] locating byte `offset` in
/// `source` as a 1-based line and column.
fn syntax_error(source: &str, offset: usize, message: String) -> ValidationError {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }

    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[offset..]
        .find('\n')
        .map_or(source.len(), |i| offset + i);
    let line = source[..line_start].matches('\n').count() + 1;
    let column = source[line_start..offset].chars().count() + 1;

    let text = source[line_start..line_end].trim_end();
    let caret = format!("{}^", " ".repeat(column - 1));

    ValidationError::SyntaxInvalid {
        line,
        column,
        context: format!("{text}\n{caret}"),
        message,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn accepts_annotated_main() {
        let src = "def main(data: dict) -> dict:\n    return {\"doubled\": data.get(\"value\", 0) * 2}\n";
        assert_eq!(check(src), Ok(()));
        assert_eq!(
            validate(src),
            ValidationVerdict {
                valid: true,
                message: None
            }
        );
    }

    #[test]
    fn accepts_unannotated_and_parameterized_annotations() {
        assert_eq!(check("def main(data):\n    return data\n"), Ok(()));
        assert_eq!(
            check("from typing import Any\ndef main(data: dict[str, Any]):\n    pass\n"),
            Ok(())
        );
        assert_eq!(
            check("import typing\ndef main(data: typing.Dict[str, int]):\n    pass\n"),
            Ok(())
        );
        assert_eq!(check("def main(data: \"dict\"):\n    pass\n"), Ok(()));
    }

    #[test]
    fn helper_functions_are_ignored() {
        let src = "def helper(value: int) -> int:\n    return value * 2\n\n\
                   def main(data: dict) -> dict:\n    return {\"v\": helper(1)}\n";
        assert_eq!(check(src), Ok(()));
    }

    #[test]
    fn finds_nested_definition() {
        let src = "if True:\n    def main(data):\n        return data\n";
        assert_eq!(check(src), Ok(()));
    }

    #[test]
    fn missing_entry_point() {
        let verdict = validate("def run(data: dict) -> dict:\n    return data\n");
        assert!(!verdict.valid);
        assert!(verdict.message.expect("message").contains("'main'"));
        assert_eq!(
            check("x = 1\n"),
            Err(ValidationError::MissingEntryPoint)
        );
    }

    #[test]
    fn async_main_does_not_count() {
        assert_eq!(
            check("async def main(data):\n    return data\n"),
            Err(ValidationError::MissingEntryPoint)
        );
    }

    #[test]
    fn wrong_parameter_count() {
        assert_eq!(
            check("def main():\n    return {}\n"),
            Err(ValidationError::BadSignature { found: 0 })
        );
        assert_eq!(
            check("def main(a, b):\n    return {}\n"),
            Err(ValidationError::BadSignature { found: 2 })
        );
        assert_eq!(
            check("def main(data, **kwargs):\n    return {}\n"),
            Err(ValidationError::BadSignature { found: 2 })
        );
        assert_eq!(
            check("def main(*, data):\n    return {}\n"),
            Err(ValidationError::BadSignature { found: 1 })
        );
    }

    #[test]
    fn wrong_parameter_type() {
        assert_matches!(
            check("def main(data: list[int]):\n    return {}\n"),
            Err(ValidationError::BadParameterType { annotation }) if annotation == "list[int]"
        );
        assert_matches!(
            check("def main(data: str):\n    return {}\n"),
            Err(ValidationError::BadParameterType { annotation }) if annotation == "str"
        );
    }

    #[test]
    fn syntax_error_reports_position() {
        let src = "def main(data: dict) -> dict:\n    return {\"a\": 1\n\nx = (\n";
        let err = check(src).expect_err("must not parse");
        assert_matches!(err, ValidationError::SyntaxInvalid { line, column, .. } => {
            assert!(line >= 2, "line {line}");
            assert!(column >= 1);
        });
        let message = validate(src).message.expect("message");
        assert!(message.starts_with("Invalid Python syntax at line"));
        assert!(message.contains('^'));
    }

    #[test]
    fn syntax_error_context_points_at_column() {
        let err = syntax_error("a = 1\nb = )\n", 10, "unexpected token".into());
        assert_eq!(
            err,
            ValidationError::SyntaxInvalid {
                line: 2,
                column: 5,
                context: "b = )\n    ^".to_string(),
                message: "unexpected token".to_string(),
            }
        );
    }

    #[test]
    fn syntax_error_offset_past_end_is_clamped() {
        let err = syntax_error("x = (", 99, "unexpected EOF".into());
        assert_matches!(err, ValidationError::SyntaxInvalid { line: 1, column: 6, .. });
    }
}
