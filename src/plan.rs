//! Parse plan: the validated, immutable description of a document format.
//!
//! A [`ParsePlan`] is what every consumer works from: the reference [`DocumentParser`] and the
//! code generators. Repetition specs are resolved here once into [`RepetitionKind`] and are never
//! re-read as strings downstream.
//!
//! ## Repetition contract
//!
//! - `ZeroOrMore` / `OneOrMore`: speculative. Before each further item the reader position is
//!   marked; if the item fails to parse, the position is restored exactly and repetition stops.
//!   `OneOrMore` fails only when no item succeeded, without consuming the failing line.
//! - `Fixed(n)` / `Variable(field)`: exactly that many items. Any failure is final.
//! - With `newline_separated`, consecutive items are separated by one blank line. For the
//!   speculative kinds that separator is only consumed together with the item following it.
//!
//! [`DocumentParser`]: crate::document::DocumentParser

use crate::ast::{ClassDeclaration, FieldDeclaration, ObjectModel, BODY_CLASS_NAME};
use crate::error::{LineMarker, ReferenceProblem, SemanticError};
use crate::validate::Validator;
use std::collections::HashMap;
use std::fmt;

/// Primitive element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int,
    Float,
    Bool,
    String,
}

impl ScalarKind {
    pub fn from_keyword(name: &str) -> Option<Self> {
        match name {
            "int" => Some(ScalarKind::Int),
            "float" => Some(ScalarKind::Float),
            "bool" => Some(ScalarKind::Bool),
            "string" => Some(ScalarKind::String),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Resolved type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Bool,
    String,
    List(ScalarKind),
    ClassRef(String),
}

impl FieldKind {
    /// Scalar kind for the four primitive kinds.
    pub fn scalar(&self) -> Option<ScalarKind> {
        match self {
            FieldKind::Int => Some(ScalarKind::Int),
            FieldKind::Float => Some(ScalarKind::Float),
            FieldKind::Bool => Some(ScalarKind::Bool),
            FieldKind::String => Some(ScalarKind::String),
            FieldKind::List(_) | FieldKind::ClassRef(_) => None,
        }
    }
}

impl From<ScalarKind> for FieldKind {
    fn from(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Int => FieldKind::Int,
            ScalarKind::Float => FieldKind::Float,
            ScalarKind::Bool => FieldKind::Bool,
            ScalarKind::String => FieldKind::String,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::List(element) => write!(f, "list({})", element),
            FieldKind::ClassRef(name) => f.write_str(name),
            other => match other.scalar() {
                Some(scalar) => write!(f, "{}", scalar),
                None => Ok(()),
            },
        }
    }
}

/// How many times a line repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepetitionKind {
    None,
    ZeroOrMore,
    OneOrMore,
    Fixed(u64),
    /// Count taken from an earlier int field of the same record.
    Variable(String),
}

impl RepetitionKind {
    pub fn is_repeating(&self) -> bool {
        !matches!(self, RepetitionKind::None)
    }

    /// True for the kinds parsed by speculative attempt and rollback.
    pub fn is_speculative(&self) -> bool {
        matches!(self, RepetitionKind::ZeroOrMore | RepetitionKind::OneOrMore)
    }
}

impl fmt::Display for RepetitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepetitionKind::None => Ok(()),
            RepetitionKind::ZeroOrMore => f.write_str("*"),
            RepetitionKind::OneOrMore => f.write_str("+"),
            RepetitionKind::Fixed(n) => write!(f, "{}", n),
            RepetitionKind::Variable(field) => f.write_str(field),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatField {
    pub name: String,
    pub kind: FieldKind,
    pub repetition: RepetitionKind,
    pub newline_separated: bool,
    pub at: LineMarker,
}

impl FormatField {
    /// Repeated fields hold one value of `kind` per repetition.
    pub fn is_repeated(&self) -> bool {
        self.repetition.is_repeating()
    }
}

impl fmt::Display for FormatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.kind)?;
        if self.repetition.is_repeating() {
            write!(f, ":{}", self.repetition)?;
            if self.newline_separated {
                f.write_str("!")?;
            }
        }
        Ok(())
    }
}

/// How a document line is consumed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineShape<'a> {
    /// A required blank line.
    Blank,
    /// One field, read once.
    Simple(&'a FormatField),
    /// One field, read according to its repetition kind.
    Repeating(&'a FormatField),
    /// Several fields on one line, split on the line delimiter.
    Split(&'a [FormatField]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatLine {
    pub fields: Vec<FormatField>,
    /// Copied from the single field; always `None` on multi-field lines.
    pub repetition: RepetitionKind,
    pub newline_separated: bool,
}

impl FormatLine {
    fn new(fields: Vec<FormatField>) -> Self {
        let (repetition, newline_separated) = match fields.as_slice() {
            [only] => (only.repetition.clone(), only.newline_separated),
            _ => (RepetitionKind::None, false),
        };
        FormatLine {
            fields,
            repetition,
            newline_separated,
        }
    }

    pub fn shape(&self) -> LineShape<'_> {
        match self.fields.as_slice() {
            [] => LineShape::Blank,
            [only] if only.repetition.is_repeating() => LineShape::Repeating(only),
            [only] => LineShape::Simple(only),
            many => LineShape::Split(many),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassPlan {
    pub name: String,
    pub lines: Vec<FormatLine>,
}

impl ClassPlan {
    pub fn fields(&self) -> impl Iterator<Item = &FormatField> {
        self.lines.iter().flat_map(|l| l.fields.iter())
    }
}

/// Validated, immutable plan for one format file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsePlan {
    line_delimiter: String,
    classes: Vec<ClassPlan>,
    index: HashMap<String, usize>,
    root: usize,
}

impl ParsePlan {
    pub fn line_delimiter(&self) -> &str {
        &self.line_delimiter
    }

    /// Classes in declaration order; the root class is last.
    pub fn classes(&self) -> &[ClassPlan] {
        &self.classes
    }

    pub fn class(&self, name: &str) -> Option<&ClassPlan> {
        self.index.get(name).map(|&i| &self.classes[i])
    }

    pub fn root_type_name(&self) -> &str {
        &self.classes[self.root].name
    }

    pub fn root(&self) -> &ClassPlan {
        &self.classes[self.root]
    }
}

/// Validate `model` and resolve it into a plan.
///
/// Each class stops at its first semantic error; the remaining classes are still checked and all
/// errors are returned together.
pub fn assemble(model: &ObjectModel) -> Result<ParsePlan, Vec<SemanticError>> {
    let mut validator = Validator::new();
    let mut classes = Vec::with_capacity(model.classes.len());
    let mut errors = Vec::new();

    for class in &model.classes {
        match validator
            .check_class(class)
            .and_then(|kinds| resolve_class(class, kinds))
        {
            Ok(plan) => classes.push(plan),
            Err(e) => {
                log::debug!("class {} rejected: {}", class.name, e);
                errors.push(e);
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    if !classes.iter().any(|c| c.name == BODY_CLASS_NAME) {
        log::warn!("object model has no {} class; using an empty root", BODY_CLASS_NAME);
        classes.push(ClassPlan {
            name: BODY_CLASS_NAME.to_string(),
            lines: Vec::new(),
        });
    }
    let index: HashMap<String, usize> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.clone(), i))
        .collect();
    let root = index.get(BODY_CLASS_NAME).copied().unwrap_or(classes.len() - 1);
    log::debug!(
        "assembled parse plan: {} class(es), root {}",
        classes.len(),
        BODY_CLASS_NAME
    );
    Ok(ParsePlan {
        line_delimiter: model.line_delimiter.clone(),
        classes,
        index,
        root,
    })
}

fn resolve_class(
    class: &ClassDeclaration,
    kinds: Vec<Vec<FieldKind>>,
) -> Result<ClassPlan, SemanticError> {
    let mut lines: Vec<FormatLine> = Vec::with_capacity(class.lines.len());
    for (decl, line_kinds) in class.lines.iter().zip(kinds) {
        let mut fields = Vec::with_capacity(decl.fields.len());
        let split = decl.fields.len() > 1;
        for (field, kind) in decl.fields.iter().zip(line_kinds) {
            // Multi-field lines are always read once.
            let repetition = if split {
                if !field.repetition.is_empty() {
                    log::warn!(
                        "{}.{}: repetition {:?} ignored on a multi-field line",
                        class.name,
                        field.name,
                        field.repetition
                    );
                }
                RepetitionKind::None
            } else {
                let earlier = lines.iter().flat_map(|l| l.fields.iter()).chain(fields.iter());
                resolve_repetition(&class.name, field, earlier)?
            };
            fields.push(FormatField {
                name: field.name.clone(),
                kind,
                newline_separated: field.newline_separated && repetition.is_repeating(),
                repetition,
                at: field.at.clone(),
            });
        }
        lines.push(FormatLine::new(fields));
    }
    Ok(ClassPlan {
        name: class.name.clone(),
        lines,
    })
}

fn resolve_repetition<'a>(
    class_name: &str,
    field: &FieldDeclaration,
    mut earlier: impl Iterator<Item = &'a FormatField>,
) -> Result<RepetitionKind, SemanticError> {
    let spec = field.repetition.as_str();
    let error = |problem| SemanticError::InvalidRepetitionReference {
        class_name: class_name.to_string(),
        field: field.name.clone(),
        reference: spec.to_string(),
        problem,
        at: field.at.clone(),
    };
    match spec {
        "" => Ok(RepetitionKind::None),
        "*" => Ok(RepetitionKind::ZeroOrMore),
        "+" => Ok(RepetitionKind::OneOrMore),
        _ if spec.bytes().all(|b| b.is_ascii_digit()) => spec
            .parse::<i64>()
            .ok()
            .and_then(|n| u64::try_from(n).ok())
            .map(RepetitionKind::Fixed)
            .ok_or_else(|| error(ReferenceProblem::OutOfRange)),
        _ if spec == field.name => Err(error(ReferenceProblem::SelfReference)),
        _ => match earlier.find(|f| f.name == spec) {
            None => Err(error(ReferenceProblem::Undeclared)),
            Some(f) if f.kind != FieldKind::Int => Err(error(ReferenceProblem::NotInteger)),
            Some(f) if f.is_repeated() => Err(error(ReferenceProblem::Repeated)),
            Some(_) => Ok(RepetitionKind::Variable(spec.to_string())),
        },
    }
}
