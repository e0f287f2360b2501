//! Compile-time diagnostics for format files.
//!
//! Every diagnostic that points into the format file carries one or more [`LineMarker`]s
//! (1-based line number plus the trimmed source text). Rendering follows one shape:
//!
//! ```text
//! Error: Duplicate tag name <body>.
//!     at line 2:	"<body>"
//!     at line 9:	"<body>"
//! ```
//!
//! Scan and syntax errors are batched. Semantic errors stop the class they occur in; the
//! remaining classes are still checked and all failures are reported together.

use std::fmt;
use std::path::PathBuf;

/// Position of a diagnostic in the format file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineMarker {
    /// 1-based line number.
    pub line: usize,
    /// The source line with surrounding whitespace removed.
    pub text: String,
}

impl LineMarker {
    pub fn new(line: usize, text: impl Into<String>) -> Self {
        LineMarker {
            line,
            text: text.into(),
        }
    }

    /// Marker for the 0-based `index` into `lines`.
    pub fn at_index(lines: &[&str], index: usize) -> Self {
        let text = lines.get(index).map(|l| l.trim()).unwrap_or_default();
        LineMarker::new(index + 1, text)
    }
}

impl fmt::Display for LineMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "    at line {}:\t\"{}\"", self.line, self.text)
    }
}

/// Structural problems found while splitting the file into tag sections. Fatal for the file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("Input file empty or commented out.")]
    EmptyInput,
    #[error("Found an invalid tag declaration.\n{at}")]
    InvalidTagDeclaration { at: LineMarker },
    #[error("Duplicate tag name {tag}.\n{first}\n{duplicate}")]
    DuplicateTag {
        tag: String,
        first: LineMarker,
        duplicate: LineMarker,
    },
    #[error("Could not find the required <body> tag.")]
    MissingBodyTag,
}

/// Lines the grammar could not recognize. Fatal for the enclosing class or section.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("{}", malformed_field_line(.class_name, .header, .at, .column))]
    MalformedFieldLine {
        class_name: String,
        /// Class header; `None` for the body section.
        header: Option<LineMarker>,
        at: LineMarker,
        /// 1-based column where unrecognized text starts.
        column: usize,
    },
    #[error("Found an invalid object declaration.\n{at}")]
    InvalidObjectHeader { at: LineMarker },
    #[error("Expected delimiter declaration.\n{at}")]
    ExpectedDelimiterDeclaration { at: LineMarker },
    #[error("Delimiter declared more than once.\n{first}\n{duplicate}")]
    DuplicateDelimiter {
        first: LineMarker,
        duplicate: LineMarker,
    },
}

fn malformed_field_line(
    class_name: &str,
    header: &Option<LineMarker>,
    at: &LineMarker,
    column: &usize,
) -> String {
    match header {
        Some(header) => format!(
            "Found invalid field declarations for the object \"{}\" (unrecognized text at column {}).\n{}\n{}",
            class_name, column, header, at
        ),
        None => format!(
            "Found invalid field declarations for the body (unrecognized text at column {}).\n{}",
            column, at
        ),
    }
}

/// Why a type failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeProblem {
    /// Neither a primitive nor a class declared earlier in the file.
    Undeclared,
    /// `list(T)` where `T` is not a non-list primitive.
    BadListElement,
}

/// Which placement rule a line breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureRule {
    ListNotLast,
    ClassNotAlone,
}

impl fmt::Display for StructureRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StructureRule::ListNotLast => "a list can only be the last field on a line",
            StructureRule::ClassNotAlone => {
                "a field typed with a user defined class must be the only field on its line"
            }
        })
    }
}

/// Why a repetition spec naming a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceProblem {
    /// No field of that name earlier in the class.
    Undeclared,
    SelfReference,
    NotInteger,
    /// The referenced int field repeats, so it holds a list rather than a count.
    Repeated,
    /// Integer literal that does not fit a count.
    OutOfRange,
}

impl fmt::Display for ReferenceProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceProblem::Undeclared => "no field of that name is declared earlier in the class",
            ReferenceProblem::SelfReference => "a field cannot count its own repetitions",
            ReferenceProblem::NotInteger => "the referenced field is not an int",
            ReferenceProblem::Repeated => "the referenced int field is itself repeated",
            ReferenceProblem::OutOfRange => "the repetition count is too large",
        })
    }
}

/// Cross-class rule violations found while assembling the parse plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemanticError {
    #[error("{}", name_collision(.class_name, .name, .at, .previous))]
    NameCollision {
        class_name: String,
        name: String,
        at: LineMarker,
        /// Earlier declaration; `None` when the name is a reserved keyword.
        previous: Option<LineMarker>,
    },
    #[error("{}", unknown_type(.class_name, .field, .type_name, .problem, .at))]
    UnknownType {
        class_name: String,
        field: String,
        type_name: String,
        problem: TypeProblem,
        at: LineMarker,
    },
    #[error("Format error in user defined class \"{class_name}\": {rule} (field '{field}').\n{at}")]
    StructuralViolation {
        class_name: String,
        field: String,
        rule: StructureRule,
        at: LineMarker,
    },
    #[error("Unknown repetition mode '{reference}' for \"{class_name}.{field}\": {problem}; it must be an integer, '+', '*', or an int field declared earlier in the class.\n{at}")]
    InvalidRepetitionReference {
        class_name: String,
        field: String,
        reference: String,
        problem: ReferenceProblem,
        at: LineMarker,
    },
}

impl SemanticError {
    /// Class the error was raised in.
    pub fn class_name(&self) -> &str {
        match self {
            SemanticError::NameCollision { class_name, .. }
            | SemanticError::UnknownType { class_name, .. }
            | SemanticError::StructuralViolation { class_name, .. }
            | SemanticError::InvalidRepetitionReference { class_name, .. } => class_name,
        }
    }
}

fn name_collision(
    class_name: &str,
    name: &str,
    at: &LineMarker,
    previous: &Option<LineMarker>,
) -> String {
    match previous {
        Some(previous) => format!(
            "Name conflict in \"{}\": user defined classes and fields must have unique names, '{}' is used more than once.\n{}\n{}",
            class_name, name, previous, at
        ),
        None => format!(
            "Name conflict in \"{}\": '{}' is a primitive type and cannot name a user defined class or field.\n{}",
            class_name, name, at
        ),
    }
}

fn unknown_type(
    class_name: &str,
    field: &str,
    type_name: &str,
    problem: &TypeProblem,
    at: &LineMarker,
) -> String {
    match problem {
        TypeProblem::Undeclared => format!(
            "Unknown field type '{}' for \"{}.{}\": it should either be a primitive type or a user defined class declared earlier.\n{}",
            type_name, class_name, field, at
        ),
        TypeProblem::BadListElement => format!(
            "Invalid list type '{}' for \"{}.{}\": the type of a list can only be a non-list primitive type.\n{}",
            type_name, class_name, field, at
        ),
    }
}

/// Any failure turning a format file into a [`ParsePlan`](crate::plan::ParsePlan). No partial plan
/// is ever produced.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Error: Could not read format file {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}", render_all(.0))]
    Scan(Vec<ScanError>),
    #[error("{}", render_all(.0))]
    Syntax(Vec<SyntaxError>),
    #[error("{}", render_all(.0))]
    Semantic(Vec<SemanticError>),
}

impl CompileError {
    /// One rendered `Error: ...` block per underlying problem, in detection order.
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            CompileError::FileAccess { .. } => vec![self.to_string()],
            CompileError::Scan(errors) => errors.iter().map(render).collect(),
            CompileError::Syntax(errors) => errors.iter().map(render).collect(),
            CompileError::Semantic(errors) => errors.iter().map(render).collect(),
        }
    }

    /// Number of problems reported.
    pub fn count(&self) -> usize {
        match self {
            CompileError::FileAccess { .. } => 1,
            CompileError::Scan(errors) => errors.len(),
            CompileError::Syntax(errors) => errors.len(),
            CompileError::Semantic(errors) => errors.len(),
        }
    }
}

fn render<E: fmt::Display>(error: &E) -> String {
    format!("Error: {}", error)
}

fn render_all<E: fmt::Display>(errors: &[E]) -> String {
    errors.iter().map(render).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_tag_lists_both_occurrences() {
        let e = ScanError::DuplicateTag {
            tag: "<body>".to_string(),
            first: LineMarker::new(2, "<body>"),
            duplicate: LineMarker::new(9, "<body>"),
        };
        let text = render(&e);
        assert!(text.starts_with("Error: Duplicate tag name <body>."));
        assert!(text.contains("at line 2:\t\"<body>\""));
        assert!(text.contains("at line 9:\t\"<body>\""));
    }

    #[test]
    fn compile_error_renders_each_diagnostic() {
        let e = CompileError::Scan(vec![
            ScanError::InvalidTagDeclaration {
                at: LineMarker::new(1, "hello"),
            },
            ScanError::MissingBodyTag,
        ]);
        assert_eq!(e.count(), 2);
        let diags = e.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[1], "Error: Could not find the required <body> tag.");
        assert!(e.to_string().contains("invalid tag declaration"));
    }

    #[test]
    fn reserved_name_collision_has_single_marker() {
        let e = SemanticError::NameCollision {
            class_name: "Body".to_string(),
            name: "int".to_string(),
            at: LineMarker::new(4, "int:string"),
            previous: None,
        };
        let text = e.to_string();
        assert!(text.contains("'int' is a primitive type"));
        assert_eq!(text.matches("at line").count(), 1);
        assert_eq!(e.class_name(), "Body");
    }
}
