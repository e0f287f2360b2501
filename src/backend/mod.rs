//! Parser generators: turn a [`ParsePlan`] into source code for a target language.
//!
//! Every backend emits the same three pieces:
//!
//! - a data module ([`DATA_MODULE`]) with one record type per class,
//! - a utility module ([`UTIL_MODULE`]) with a line reader supporting `mark()`/`reset()`, the
//!   scalar and list parsers, and one `parse<Class>` function per class,
//! - an entry module named after the output, exposing `parse(filename)` which parses the root
//!   and then accepts only blank lines until end of file.
//!
//! Generated parsers follow the same repetition and error semantics as
//! [`DocumentParser`](crate::document::DocumentParser), including its message texts.

pub mod cpp;
pub mod java;
pub mod python;

use crate::config::{GenerateConfig, Language};
use crate::plan::ParsePlan;
use std::fs;
use std::path::PathBuf;

pub use cpp::CppBackend;
pub use java::JavaBackend;
pub use python::PythonBackend;

/// Prefix shared by generated module and namespace names.
pub const PARSER_NAME: &str = "InstaParse";
pub const DATA_MODULE: &str = "InstaParseData";
pub const UTIL_MODULE: &str = "InstaParseUtil";
/// Name of the generated entry function.
pub const PARSE_INPUT: &str = "parse";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot generate {language} parser: {message}")]
    Emit { language: Language, message: String },
}

/// Which of the three generated pieces a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Data,
    Util,
    Entry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub role: FileRole,
    pub contents: String,
}

/// A code generator for one target language. Implementations hold no mutable state.
pub trait Backend {
    fn language(&self) -> Language;

    fn generate(
        &self,
        plan: &ParsePlan,
        config: &GenerateConfig,
    ) -> Result<Vec<GeneratedFile>, BackendError>;
}

pub fn backend_for(language: Language) -> Box<dyn Backend> {
    match language {
        Language::Python => Box::new(PythonBackend),
        Language::Java => Box::new(JavaBackend),
        Language::Cpp => Box::new(CppBackend),
    }
}

/// Write generated files, creating their directories as needed.
pub fn write_files(files: &[GeneratedFile]) -> Result<(), BackendError> {
    for file in files {
        let io_error = |source| BackendError::Io {
            path: file.path.clone(),
            source,
        };
        if let Some(dir) = file.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_error)?;
        }
        fs::write(&file.path, &file.contents).map_err(io_error)?;
        log::info!("wrote {}", file.path.display());
    }
    Ok(())
}

/// Name of the generated function parsing `class_name`.
pub fn parse_function_name(class_name: &str) -> String {
    format!("parse{}", class_name)
}

/// Escape `s` for a double-quoted string literal in any of the target languages.
pub fn quote_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Class names whose `parse<Class>` function would clash with a generated helper.
const HELPER_CLASS_NAMES: [&str; 6] = ["Int", "Float", "Bool", "String", "List", "BlankLine"];

/// Reject class and field names the target language cannot use as identifiers.
pub(crate) fn check_identifiers(
    plan: &ParsePlan,
    language: Language,
    reserved: &[&str],
) -> Result<(), BackendError> {
    let emit = |message: String| BackendError::Emit { language, message };
    for class in plan.classes() {
        if HELPER_CLASS_NAMES.contains(&class.name.as_str()) {
            return Err(emit(format!(
                "class name '{}' clashes with the generated {} function",
                class.name,
                parse_function_name(&class.name)
            )));
        }
        let names = std::iter::once(class.name.as_str()).chain(class.fields().map(|f| f.name.as_str()));
        for name in names {
            if reserved.contains(&name) || name == UTIL_MODULE || name == DATA_MODULE {
                return Err(emit(format!("'{}' is a reserved word", name)));
            }
        }
    }
    Ok(())
}

/// Indenting line writer used to assemble generated sources.
#[derive(Debug)]
pub struct SourceWriter {
    buf: String,
    level: usize,
    indent_unit: &'static str,
    comment_prefix: &'static str,
}

impl SourceWriter {
    pub fn new(indent_unit: &'static str, comment_prefix: &'static str) -> Self {
        SourceWriter {
            buf: String::new(),
            level: 0,
            indent_unit,
            comment_prefix,
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.level {
                self.buf.push_str(self.indent_unit);
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.buf.push('\n');
        self
    }

    pub fn comment(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = format!("{} {}", self.comment_prefix, text.as_ref());
        self.line(text)
    }

    pub fn indent(&mut self) -> &mut Self {
        self.level += 1;
        self
    }

    pub fn dedent(&mut self) -> &mut Self {
        self.level = self.level.saturating_sub(1);
        self
    }

    /// Write a multi-line snippet, each line at the current level plus its own indentation.
    pub fn block_text(&mut self, text: &str) -> &mut Self {
        for line in text.lines() {
            self.line(line);
        }
        self
    }

    /// `header {` followed by an indent (brace languages).
    pub fn open(&mut self, header: impl AsRef<str>) -> &mut Self {
        let text = format!("{} {{", header.as_ref());
        self.line(text).indent()
    }

    /// Dedent and write `close` (usually `}` or `};`).
    pub fn close(&mut self, close: &str) -> &mut Self {
        self.dedent().line(close)
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_indents_nested_blocks() {
        let mut w = SourceWriter::new("  ", "//");
        w.open("struct A").line("int x;").close("};").blank().comment("done");
        assert_eq!(w.finish(), "struct A {\n  int x;\n};\n\n// done\n");
    }

    #[test]
    fn literals_are_escaped() {
        assert_eq!(quote_literal("a\"b\\c\t"), "\"a\\\"b\\\\c\\t\"");
        assert_eq!(quote_literal(" "), "\" \"");
    }

    #[test]
    fn backend_for_matches_language() {
        for language in [Language::Python, Language::Java, Language::Cpp] {
            assert_eq!(backend_for(language).language(), language);
        }
    }

    #[test]
    fn reserved_identifiers_are_rejected() {
        let plan = crate::compile("<body>\nclass:int").expect("compile");
        let err = check_identifiers(&plan, Language::Java, &["class"]).unwrap_err();
        assert!(err.to_string().contains("'class' is a reserved word"));
    }
}
