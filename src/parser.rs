//! Line grammar and object model builder, using PEST.
//!
//! The grammar in `grammar.pest` only ever sees one physical line. Field-declaration lines are
//! tokenized by applying the unanchored `field` rule to a shrinking remainder; a line is accepted
//! only if nothing but whitespace is left over.

use crate::ast::*;
use crate::error::{LineMarker, SyntaxError};
use crate::scanner::{self, Tag, TagIntervals};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;
use std::ops::Range;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct FormatParser;

/// Tag named by a comment-stripped line, if the line is exactly a tag marker.
pub fn parse_tag(text: &str) -> Option<Tag> {
    let pair = FormatParser::parse(Rule::tag_line, text).ok()?.next()?;
    let marker = pair.into_inner().find(|p| p.as_rule() == Rule::tag_marker)?;
    match marker.as_str() {
        "<head>" => Some(Tag::Head),
        "<options>" => Some(Tag::Options),
        "<objects>" => Some(Tag::Objects),
        "<body>" => Some(Tag::Body),
        _ => None,
    }
}

/// True for a bare identifier, the header of a class block.
pub fn is_class_header(text: &str) -> bool {
    FormatParser::parse(Rule::class_header, text).is_ok()
}

/// Literal of a `delimiter "<literal>"` line. Matched against the whole trimmed line, comment
/// included, so `#` may appear inside the literal.
pub fn parse_delimiter(text: &str) -> Option<String> {
    let pair = FormatParser::parse(Rule::delimiter_decl, text).ok()?.next()?;
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::delimiter_literal)
        .map(|p| p.as_str().to_string())
}

/// Tokenize a comment-stripped line into field declarations.
///
/// On failure returns the 0-based byte offset into `text` where unrecognized input starts. An
/// empty line yields no fields.
pub fn parse_field_line(text: &str, at: &LineMarker) -> Result<Vec<FieldDeclaration>, usize> {
    let mut fields = Vec::new();
    let mut offset = 0;
    loop {
        let rest = &text[offset..];
        if rest.trim().is_empty() {
            return Ok(fields);
        }
        let pair = match FormatParser::parse(Rule::field, rest) {
            Ok(mut pairs) => pairs.next().ok_or(offset)?,
            Err(_) => return Err(offset),
        };
        let consumed = pair.as_span().end();
        if consumed == 0 {
            return Err(offset);
        }
        fields.push(build_field(pair, at).ok_or(offset)?);
        offset += consumed;
    }
}

fn build_field(pair: Pair<Rule>, at: &LineMarker) -> Option<FieldDeclaration> {
    let mut name = None;
    let mut type_expr = None;
    let mut repetition = String::new();
    let mut newline_separated = false;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = Some(inner.as_str().to_string()),
            Rule::type_expr => type_expr = Some(build_type_expr(inner)?),
            Rule::repetition => repetition = inner.as_str().to_string(),
            Rule::newline_flag => newline_separated = true,
            _ => {}
        }
    }
    Some(FieldDeclaration {
        name: name?,
        type_expr: type_expr?,
        repetition,
        newline_separated,
        at: at.clone(),
    })
}

fn build_type_expr(pair: Pair<Rule>) -> Option<TypeExpr> {
    let inner = pair.into_inner().next()?;
    match inner.as_rule() {
        Rule::named_type => Some(TypeExpr::Named(inner.as_str().to_string())),
        Rule::list_type => {
            let element = inner.into_inner().find(|p| p.as_rule() == Rule::type_expr)?;
            Some(TypeExpr::List(Box::new(build_type_expr(element)?)))
        }
        _ => None,
    }
}

/// Build the object model from scanned sections. Syntax errors are collected across classes.
pub fn build_object_model(
    lines: &[&str],
    tags: &TagIntervals,
) -> Result<ObjectModel, Vec<SyntaxError>> {
    let mut model = ObjectModel::default();
    let mut errors = Vec::new();

    if let Some(head) = tags.get(Tag::Head) {
        if let Some(delimiter) = parse_head(lines, head.content(), &mut errors) {
            model.line_delimiter = delimiter;
        }
    }
    if let Some(options) = tags.get(Tag::Options) {
        if options.content().any(|i| !scanner::is_blank(lines[i])) {
            log::warn!(
                "ignoring contents of <options> at line {}",
                options.begin + 1
            );
        }
    }
    if let Some(objects) = tags.get(Tag::Objects) {
        parse_objects(lines, objects.content(), &mut model.classes, &mut errors);
    }
    if let Some(body) = tags.get(Tag::Body) {
        if let Some(class) = parse_body(lines, body.begin, body.content(), &mut errors) {
            model.classes.push(class);
        }
    }

    if errors.is_empty() {
        log::debug!(
            "built object model: {} class(es), delimiter {:?}",
            model.classes.len(),
            model.line_delimiter
        );
        Ok(model)
    } else {
        Err(errors)
    }
}

fn parse_head(
    lines: &[&str],
    range: Range<usize>,
    errors: &mut Vec<SyntaxError>,
) -> Option<String> {
    let mut declared: Option<(String, usize)> = None;
    for i in range {
        if scanner::is_blank(lines[i]) {
            continue;
        }
        match parse_delimiter(lines[i].trim()) {
            Some(literal) => match &declared {
                Some((_, first)) => errors.push(SyntaxError::DuplicateDelimiter {
                    first: LineMarker::at_index(lines, *first),
                    duplicate: LineMarker::at_index(lines, i),
                }),
                None => declared = Some((literal, i)),
            },
            None => errors.push(SyntaxError::ExpectedDelimiterDeclaration {
                at: LineMarker::at_index(lines, i),
            }),
        }
    }
    declared.map(|(literal, _)| literal)
}

fn parse_objects(
    lines: &[&str],
    range: Range<usize>,
    classes: &mut Vec<ClassDeclaration>,
    errors: &mut Vec<SyntaxError>,
) {
    let end = range.end;
    let mut i = range.start;
    while i < end {
        let text = scanner::strip_comment(lines[i]);
        if text.is_empty() {
            i += 1;
            continue;
        }
        if !is_class_header(text) {
            errors.push(SyntaxError::InvalidObjectHeader {
                at: LineMarker::at_index(lines, i),
            });
            i = next_header(lines, i + 1, end);
            continue;
        }

        let header = LineMarker::at_index(lines, i);
        let mut class = ClassDeclaration::new(text, header.clone());
        let block_end = next_header(lines, i + 1, end);
        match parse_block(lines, (i + 1)..block_end) {
            Ok(block) => {
                class.lines = block;
                classes.push(class);
            }
            Err((at, column)) => errors.push(SyntaxError::MalformedFieldLine {
                class_name: class.name,
                header: Some(header),
                at,
                column,
            }),
        }
        i = block_end;
    }
}

fn parse_body(
    lines: &[&str],
    tag_line: usize,
    range: Range<usize>,
    errors: &mut Vec<SyntaxError>,
) -> Option<ClassDeclaration> {
    let mut class = ClassDeclaration::new(BODY_CLASS_NAME, LineMarker::at_index(lines, tag_line));
    let start = range
        .clone()
        .find(|&i| !scanner::is_blank(lines[i]))
        .unwrap_or(range.end);
    match parse_block(lines, start..range.end) {
        Ok(block) => {
            class.lines = block;
            Some(class)
        }
        Err((at, column)) => {
            errors.push(SyntaxError::MalformedFieldLine {
                class_name: class.name,
                header: None,
                at,
                column,
            });
            None
        }
    }
}

/// First class header at or after `from`, or `end`.
fn next_header(lines: &[&str], from: usize, end: usize) -> usize {
    (from..end)
        .find(|&i| is_class_header(scanner::strip_comment(lines[i])))
        .unwrap_or(end)
}

/// Field lines of one class block. Every blank or comment-only line up to the next header is kept
/// as an empty line. Stops at the first malformed line and returns its marker and 1-based column.
fn parse_block(lines: &[&str], range: Range<usize>) -> Result<Vec<LineDecl>, (LineMarker, usize)> {
    let mut block = Vec::new();
    for i in range {
        let at = LineMarker::at_index(lines, i);
        let text = scanner::strip_comment(lines[i]);
        let fields = parse_field_line(text, &at).map_err(|offset| {
            let raw = lines[i];
            let lead = raw.len() - raw.trim_start().len();
            let column = raw[..lead].chars().count() + text[..offset].chars().count() + 1;
            (at.clone(), column)
        })?;
        block.push(LineDecl { fields, at });
    }
    Ok(block)
}
