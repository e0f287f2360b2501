//! Object model for format files: classes, their lines, and the raw field declarations on them.
//!
//! Nothing in here is validated yet. Type names and repetition specs are kept the way they were
//! written; [`crate::plan`] resolves them into a [`ParsePlan`](crate::plan::ParsePlan).

use crate::error::LineMarker;
use std::fmt;

/// Name of the synthetic class built from the `<body>` section. It is always the root type.
pub const BODY_CLASS_NAME: &str = "Body";

/// Delimiter used to split multi-field lines when `<head>` does not declare one.
pub const DEFAULT_LINE_DELIMITER: &str = " ";

/// Keywords that can never be used as class or field names.
pub const RESERVED_NAMES: [&str; 5] = ["int", "float", "bool", "string", "list"];

/// Type as written in a field declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A primitive keyword or a class name.
    Named(String),
    /// `list(T)`. Nesting parses but never validates.
    List(Box<TypeExpr>),
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::List(inner) => write!(f, "list({})", inner),
        }
    }
}

/// One `name:type[:repetition[!]]` token.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDeclaration {
    pub name: String,
    pub type_expr: TypeExpr,
    /// Raw repetition spec: empty, `+`, `*`, an integer literal, or a field name.
    pub repetition: String,
    /// `!` after the repetition spec: instances are separated by a blank line.
    pub newline_separated: bool,
    pub at: LineMarker,
}

impl fmt::Display for FieldDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.type_expr)?;
        if !self.repetition.is_empty() {
            write!(f, ":{}", self.repetition)?;
            if self.newline_separated {
                write!(f, "!")?;
            }
        }
        Ok(())
    }
}

/// A physical line of a class declaration. No fields means a required blank line in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDecl {
    pub fields: Vec<FieldDeclaration>,
    pub at: LineMarker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDeclaration {
    pub name: String,
    pub lines: Vec<LineDecl>,
    /// Header line, or the `<body>` tag line for the synthetic body class.
    pub header: LineMarker,
}

impl ClassDeclaration {
    pub fn new(name: impl Into<String>, header: LineMarker) -> Self {
        ClassDeclaration {
            name: name.into(),
            lines: Vec::new(),
            header,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDeclaration> {
        self.lines.iter().flat_map(|l| l.fields.iter())
    }
}

impl fmt::Display for ClassDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name)?;
        for line in &self.lines {
            write!(f, "\n  -")?;
            for field in &line.fields {
                write!(f, "  {}", field)?;
            }
        }
        Ok(())
    }
}

/// Everything the builder extracted from one format file, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectModel {
    pub line_delimiter: String,
    /// User classes in file order, followed by the synthetic [`BODY_CLASS_NAME`] class.
    pub classes: Vec<ClassDeclaration>,
}

impl Default for ObjectModel {
    fn default() -> Self {
        ObjectModel {
            line_delimiter: DEFAULT_LINE_DELIMITER.to_string(),
            classes: Vec::new(),
        }
    }
}

impl ObjectModel {
    pub fn get_class(&self, name: &str) -> Option<&ClassDeclaration> {
        self.classes.iter().find(|c| c.name == name)
    }
}
