//! Reference document parser: executes a [`ParsePlan`] directly against document text.
//!
//! This is the behavior every generated parser reproduces. Document lines are read one at a time
//! through a [`LineCursor`] and stripped of surrounding whitespace. Speculative repetitions mark
//! the cursor before each attempt and reset it on failure; exact-count repetitions never reset.

use crate::plan::{ClassPlan, FieldKind, FormatField, LineShape, ParsePlan, RepetitionKind, ScalarKind};
use crate::value::Value;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Parser Error: Problem opening file, {0}")]
    Io(#[from] std::io::Error),
    #[error("Parser Error on line {line}: Reached end of file while parsing object \"{class_name}\".")]
    EndOfFile { line: usize, class_name: String },
    #[error("Parser Error on line {line}: Could not parse \"{text}\" as {kind}.")]
    ScalarFormat {
        line: usize,
        text: String,
        kind: ScalarKind,
    },
    #[error("Parser Error on line {line}: Expecting {expected} fields ({found} found).")]
    FieldCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Parser Error on line {line}: Expecting {} {expected} \"{type_name}\" when parsing \"{class_name}.{field}\" ({found} found).", quantifier(.exact))]
    RepetitionCount {
        line: usize,
        class_name: String,
        field: String,
        type_name: String,
        expected: u64,
        found: u64,
        /// `false` for one-or-more repetitions.
        exact: bool,
        source: Option<Box<DocumentError>>,
    },
    #[error("Parser Error on line {line}: Repetition count \"{class_name}.{count_field}\" is negative ({count}).")]
    NegativeCount {
        line: usize,
        class_name: String,
        count_field: String,
        count: i64,
    },
    #[error("Parser Error on line {line}: Should be an empty line.")]
    ExpectedBlankLine { line: usize },
    #[error("Parser Error on line {line}: Finished parsing but did not reach end of file.")]
    TrailingContent { line: usize },
    #[error("Parser Error: invalid parse plan, {0}")]
    InvalidPlan(String),
}

fn quantifier(exact: &bool) -> &'static str {
    if *exact {
        "exactly"
    } else {
        "at least"
    }
}

impl DocumentError {
    /// 1-based document line the error was raised on.
    pub fn line(&self) -> Option<usize> {
        match self {
            DocumentError::EndOfFile { line, .. }
            | DocumentError::ScalarFormat { line, .. }
            | DocumentError::FieldCountMismatch { line, .. }
            | DocumentError::RepetitionCount { line, .. }
            | DocumentError::NegativeCount { line, .. }
            | DocumentError::ExpectedBlankLine { line }
            | DocumentError::TrailingContent { line } => Some(*line),
            DocumentError::Io(_) | DocumentError::InvalidPlan(_) => None,
        }
    }
}

/// Position in a document. The mark is the index of the next line to read, so restoring it
/// restores the line counter as well.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        LineCursor {
            lines: text.lines().collect(),
            pos: 0,
        }
    }

    pub fn mark(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, mark: usize) {
        self.pos = mark.min(self.lines.len());
    }

    /// 0-based index of the next line.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 1-based number of the next line.
    pub fn line_number(&self) -> usize {
        self.pos + 1
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    /// Next line, stripped. `class_name` is the object being parsed, for the end-of-file error.
    pub fn next_line(&mut self, class_name: &str) -> Result<&'a str, DocumentError> {
        match self.lines.get(self.pos) {
            Some(line) => {
                self.pos += 1;
                Ok(line.trim())
            }
            None => Err(DocumentError::EndOfFile {
                line: self.line_number(),
                class_name: class_name.to_string(),
            }),
        }
    }
}

/// Executes a plan against documents. Holds no state besides the plan.
#[derive(Debug, Clone, Copy)]
pub struct DocumentParser<'p> {
    plan: &'p ParsePlan,
}

impl<'p> DocumentParser<'p> {
    pub fn new(plan: &'p ParsePlan) -> Self {
        DocumentParser { plan }
    }

    /// Parse a whole document into the root record. Only blank lines may follow the root.
    pub fn parse_str(&self, text: &str) -> Result<Value, DocumentError> {
        let mut cursor = LineCursor::new(text);
        let root = self.parse_record(self.plan.root(), &mut cursor)?;
        expect_end(&mut cursor)?;
        Ok(root)
    }

    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Value, DocumentError> {
        let text = std::fs::read_to_string(path)?;
        self.parse_str(&text)
    }

    /// Parse one instance of `class_name` starting at the cursor.
    pub fn parse_class(
        &self,
        class_name: &str,
        cursor: &mut LineCursor<'_>,
    ) -> Result<Value, DocumentError> {
        let class = self.lookup(class_name)?;
        self.parse_record(class, cursor)
    }

    fn lookup(&self, class_name: &str) -> Result<&'p ClassPlan, DocumentError> {
        self.plan
            .class(class_name)
            .ok_or_else(|| DocumentError::InvalidPlan(format!("unknown class \"{}\"", class_name)))
    }

    fn parse_record(
        &self,
        class: &ClassPlan,
        cursor: &mut LineCursor<'_>,
    ) -> Result<Value, DocumentError> {
        let mut record = HashMap::new();
        for line in &class.lines {
            match line.shape() {
                LineShape::Blank => expect_blank(cursor, &class.name)?,
                LineShape::Simple(field) => {
                    let value = self.parse_item(&class.name, field, cursor)?;
                    record.insert(field.name.clone(), value);
                }
                LineShape::Repeating(field) => {
                    let items = self.parse_repeated(&class.name, field, &record, cursor)?;
                    record.insert(field.name.clone(), Value::List(items));
                }
                LineShape::Split(fields) => {
                    self.parse_split(&class.name, fields, cursor, &mut record)?
                }
            }
        }
        Ok(Value::Record(record))
    }

    /// One instance of the field's kind: a line for scalars and lists, a record for classes.
    fn parse_item(
        &self,
        class_name: &str,
        field: &FormatField,
        cursor: &mut LineCursor<'_>,
    ) -> Result<Value, DocumentError> {
        match &field.kind {
            FieldKind::ClassRef(name) => self.parse_class(name, cursor),
            FieldKind::List(kind) => {
                let line = cursor.line_number();
                let text = cursor.next_line(class_name)?;
                let parts = text
                    .split(self.plan.line_delimiter())
                    .map(|p| parse_scalar(p, *kind, line))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(parts))
            }
            scalar => {
                let kind = scalar.scalar().ok_or_else(|| {
                    DocumentError::InvalidPlan(format!("field \"{}\" has no scalar kind", field.name))
                })?;
                let line = cursor.line_number();
                let text = cursor.next_line(class_name)?;
                parse_scalar(text, kind, line)
            }
        }
    }

    fn parse_repeated(
        &self,
        class_name: &str,
        field: &FormatField,
        record: &HashMap<String, Value>,
        cursor: &mut LineCursor<'_>,
    ) -> Result<Vec<Value>, DocumentError> {
        let count = match &field.repetition {
            RepetitionKind::None => return Ok(vec![self.parse_item(class_name, field, cursor)?]),
            RepetitionKind::ZeroOrMore | RepetitionKind::OneOrMore => {
                return self.parse_speculative(class_name, field, cursor)
            }
            RepetitionKind::Fixed(n) => *n,
            RepetitionKind::Variable(count_field) => {
                // Plan assembly guarantees an earlier int field of this record.
                let count = record
                    .get(count_field)
                    .and_then(Value::as_i64)
                    .unwrap_or_default();
                u64::try_from(count).map_err(|_| DocumentError::NegativeCount {
                    line: cursor.line_number(),
                    class_name: class_name.to_string(),
                    count_field: count_field.clone(),
                    count,
                })?
            }
        };

        let mut items = Vec::new();
        for index in 0..count {
            let attempt = if index > 0 && field.newline_separated {
                expect_blank(cursor, class_name)
                    .and_then(|_| self.parse_item(class_name, field, cursor))
            } else {
                self.parse_item(class_name, field, cursor)
            };
            match attempt {
                Ok(item) => items.push(item),
                Err(e) => {
                    return Err(DocumentError::RepetitionCount {
                        line: e.line().unwrap_or_else(|| cursor.line_number()),
                        class_name: class_name.to_string(),
                        field: field.name.clone(),
                        type_name: field.kind.to_string(),
                        expected: count,
                        found: index,
                        exact: true,
                        source: Some(Box::new(e)),
                    })
                }
            }
        }
        Ok(items)
    }

    /// `*` and `+`: attempt items until one fails, then restore the cursor to where that attempt
    /// began. With `!` the blank separator belongs to the attempt it precedes.
    fn parse_speculative(
        &self,
        class_name: &str,
        field: &FormatField,
        cursor: &mut LineCursor<'_>,
    ) -> Result<Vec<Value>, DocumentError> {
        let mut items = Vec::new();
        let mut last_error = None;
        loop {
            let mark = cursor.mark();
            let attempt = if !items.is_empty() && field.newline_separated {
                expect_blank(cursor, class_name)
                    .and_then(|_| self.parse_item(class_name, field, cursor))
            } else {
                self.parse_item(class_name, field, cursor)
            };
            match attempt {
                // An item that consumes nothing would repeat forever.
                Ok(_) if cursor.mark() == mark => {
                    cursor.reset(mark);
                    break;
                }
                Ok(item) => items.push(item),
                Err(e) => {
                    log::trace!(
                        "{}.{}: stopped after {} item(s): {}",
                        class_name,
                        field.name,
                        items.len(),
                        e
                    );
                    cursor.reset(mark);
                    last_error = Some(e);
                    break;
                }
            }
        }

        if field.repetition == RepetitionKind::OneOrMore && items.is_empty() {
            return Err(DocumentError::RepetitionCount {
                line: cursor.line_number(),
                class_name: class_name.to_string(),
                field: field.name.clone(),
                type_name: field.kind.to_string(),
                expected: 1,
                found: 0,
                exact: false,
                source: last_error.map(Box::new),
            });
        }
        Ok(items)
    }

    fn parse_split(
        &self,
        class_name: &str,
        fields: &[FormatField],
        cursor: &mut LineCursor<'_>,
        record: &mut HashMap<String, Value>,
    ) -> Result<(), DocumentError> {
        let line = cursor.line_number();
        let text = cursor.next_line(class_name)?;
        let parts: Vec<&str> = text.split(self.plan.line_delimiter()).collect();
        let tail_list = fields
            .last()
            .map_or(false, |f| matches!(f.kind, FieldKind::List(_)));
        let count_ok = if tail_list {
            parts.len() >= fields.len()
        } else {
            parts.len() == fields.len()
        };
        if !count_ok {
            return Err(DocumentError::FieldCountMismatch {
                line,
                expected: fields.len(),
                found: parts.len(),
            });
        }

        for (i, field) in fields.iter().enumerate() {
            let value = match &field.kind {
                FieldKind::List(kind) => Value::List(
                    parts[i..]
                        .iter()
                        .map(|p| parse_scalar(p, *kind, line))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                FieldKind::ClassRef(name) => {
                    return Err(DocumentError::InvalidPlan(format!(
                        "class \"{}\" shares a line with other fields",
                        name
                    )))
                }
                scalar => match scalar.scalar() {
                    Some(kind) => parse_scalar(parts[i], kind, line)?,
                    None => continue,
                },
            };
            record.insert(field.name.clone(), value);
        }
        Ok(())
    }
}

/// Parse one scalar. Numbers and booleans ignore surrounding whitespace; strings are verbatim.
pub fn parse_scalar(text: &str, kind: ScalarKind, line: usize) -> Result<Value, DocumentError> {
    let error = || DocumentError::ScalarFormat {
        line,
        text: text.to_string(),
        kind,
    };
    let trimmed = text.trim();
    match kind {
        ScalarKind::Int => trimmed.parse().map(Value::Int).map_err(|_| error()),
        ScalarKind::Float => trimmed.parse().map(Value::Float).map_err(|_| error()),
        ScalarKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            _ => Err(error()),
        },
        ScalarKind::String => Ok(Value::String(text.to_string())),
    }
}

fn expect_blank(cursor: &mut LineCursor<'_>, class_name: &str) -> Result<(), DocumentError> {
    let line = cursor.line_number();
    if cursor.next_line(class_name)?.is_empty() {
        Ok(())
    } else {
        Err(DocumentError::ExpectedBlankLine { line })
    }
}

fn expect_end(cursor: &mut LineCursor<'_>) -> Result<(), DocumentError> {
    while !cursor.at_end() {
        let line = cursor.line_number();
        if !cursor.next_line("")?.is_empty() {
            return Err(DocumentError::TrailingContent { line });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars() {
        assert_eq!(parse_scalar(" 42 ", ScalarKind::Int, 1).ok(), Some(Value::Int(42)));
        assert_eq!(parse_scalar("TRUE", ScalarKind::Bool, 1).ok(), Some(Value::Bool(true)));
        assert_eq!(parse_scalar("0", ScalarKind::Bool, 1).ok(), Some(Value::Bool(false)));
        assert_eq!(parse_scalar("2.5", ScalarKind::Float, 1).ok(), Some(Value::Float(2.5)));
        assert_eq!(
            parse_scalar(" a b ", ScalarKind::String, 1).ok(),
            Some(Value::String(" a b ".to_string()))
        );
        let err = parse_scalar("x", ScalarKind::Int, 7).unwrap_err();
        assert_eq!(err.to_string(), "Parser Error on line 7: Could not parse \"x\" as int.");
        assert_eq!(err.line(), Some(7));
    }

    #[test]
    fn cursor_mark_and_reset() {
        let mut c = LineCursor::new("a\n  b  \n");
        let mark = c.mark();
        assert_eq!(c.next_line("X").ok(), Some("a"));
        assert_eq!(c.next_line("X").ok(), Some("b"));
        assert!(c.at_end());
        assert!(matches!(
            c.next_line("X"),
            Err(DocumentError::EndOfFile { line: 3, .. })
        ));
        c.reset(mark);
        assert_eq!(c.line_number(), 1);
    }

    #[test]
    fn separated_items_need_blank_lines() {
        let plan = crate::compile("<body>\nxs:int:2!").expect("compile");
        let parser = DocumentParser::new(&plan);
        let v = parser.parse_str("1\n\n2\n").expect("parse");
        assert_eq!(
            v.get("xs"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        let err = parser.parse_str("1\n2\n").unwrap_err();
        assert!(matches!(
            err,
            DocumentError::RepetitionCount { expected: 2, found: 1, exact: true, .. }
        ));
    }

    #[test]
    fn speculative_separator_is_left_unconsumed_on_failure() {
        let plan = crate::compile("<body>\nxs:int:*!\n\nend:string").expect("compile");
        let v = DocumentParser::new(&plan)
            .parse_str("1\n\n2\n\nEND\n")
            .expect("parse");
        assert_eq!(v.get("xs").and_then(Value::as_list).map(|l| l.len()), Some(2));
        assert_eq!(v.get("end").and_then(Value::as_str), Some("END"));
    }

    #[test]
    fn variable_count_reads_earlier_field() {
        let plan = crate::compile("<body>\nn:int\nxs:string:n").expect("compile");
        let parser = DocumentParser::new(&plan);
        let v = parser.parse_str("2\na\nb").expect("parse");
        assert_eq!(v.get("xs").and_then(Value::as_list).map(|l| l.len()), Some(2));
        assert!(matches!(
            parser.parse_str("-1"),
            Err(DocumentError::NegativeCount { count: -1, .. })
        ));
        let v = parser.parse_str("0\n\n").expect("zero items");
        assert_eq!(v.get("xs"), Some(&Value::List(Vec::new())));
    }

    #[test]
    fn trailing_content_is_rejected() {
        let plan = crate::compile("<body>\nx:int").expect("compile");
        let err = DocumentParser::new(&plan).parse_str("1\n\nextra\n").unwrap_err();
        assert!(matches!(err, DocumentError::TrailingContent { line: 3 }));
    }
}
