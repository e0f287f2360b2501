//! # InstaParse: Line-Oriented Format DSL and Parser Generator
//!
//! A small DSL for describing line-oriented text formats, a compiler that turns a description
//! into an immutable [`ParsePlan`], a reference [`DocumentParser`] that executes plans on
//! document text, and code generators emitting standalone parsers in Python, Java and C++.
//!
//! ## DSL structure
//!
//! A format file is split into tagged sections, each introduced by a tag on its own line:
//!
//! - **`<head>`**: optional `delimiter "<text>"` declaration (default `" "`)
//! - **`<options>`**: reserved; contents are ignored
//! - **`<objects>`**: class declarations, a header line naming the class followed by its lines
//! - **`<body>`**: the lines of the document's root record (required)
//!
//! `#` starts a comment anywhere outside a delimiter literal.
//!
//! ## Field syntax
//!
//! - `name:type` where type is `int`, `float`, `bool`, `string`, `list(scalar)` or a class
//! - `name:type:rep` with `rep` one of `*`, `+`, a literal count, or an earlier int field
//! - `name:type:rep!` separates repetitions with blank lines
//! - Several fields on one line are split on the delimiter; a `list` must come last
//! - An empty line inside a class requires an empty line in the document
//!
//! ## Example
//!
//! ```text
//! <head>
//! delimiter ","
//! <objects>
//! Point
//! x:int y:int
//! <body>
//! count:int
//! points:Point:count
//! ```
//!
//! ## Usage
//!
//! ```
//! let plan = instaparse::compile("<body>\nname:string\nage:int").expect("valid format");
//! let value = instaparse::DocumentParser::new(&plan)
//!     .parse_str("Alice\n30\n")
//!     .expect("valid document");
//! assert_eq!(value.get("age").and_then(|v| v.as_i64()), Some(30));
//! ```

pub mod ast;
pub mod backend;
pub mod config;
pub mod document;
pub mod dump;
pub mod error;
pub mod parser;
pub mod plan;
pub mod scanner;
pub mod validate;
pub mod value;

pub use ast::ObjectModel;
pub use backend::{backend_for, write_files, Backend, BackendError, GeneratedFile};
pub use config::{GenerateConfig, Language};
pub use document::{DocumentError, DocumentParser, LineCursor};
pub use error::{CompileError, LineMarker, ScanError, SemanticError, SyntaxError};
pub use plan::{ClassPlan, FieldKind, FormatField, ParsePlan, RepetitionKind, ScalarKind};
pub use value::Value;

use std::path::Path;

/// Compile a format description into a parse plan.
///
/// Stages run in order and each reports all of its errors before compilation stops.
pub fn compile(source: &str) -> Result<ParsePlan, CompileError> {
    let lines: Vec<&str> = source.lines().collect();
    let intervals = scanner::scan(&lines).map_err(CompileError::Scan)?;
    log::debug!("found {} tagged section(s)", intervals.len());
    let model = parser::build_object_model(&lines, &intervals).map_err(CompileError::Syntax)?;
    log::debug!(
        "object model: {} class(es), delimiter {:?}",
        model.classes.len(),
        model.line_delimiter
    );
    let plan = plan::assemble(&model).map_err(CompileError::Semantic)?;
    log::debug!("parse plan ready, root {}", plan.root_type_name());
    Ok(plan)
}

/// Read and compile a format file.
pub fn compile_file(path: impl AsRef<Path>) -> Result<ParsePlan, CompileError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| CompileError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    compile(&source)
}
