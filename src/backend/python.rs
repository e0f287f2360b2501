//! Python 3 parser generator.

use super::*;
use crate::plan::{ClassPlan, FieldKind, FormatField, LineShape, RepetitionKind, ScalarKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct PythonBackend;

const INDENT: &str = "    ";

const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

const HELPERS: &str = r#"class ParserError(ValueError):
    def __init__(self, lineNumber, message):
        ValueError.__init__(self, "Parser Error on line %d: %s" % (lineNumber, message))
        self.lineNumber = lineNumber


class LineReader:
    def __init__(self, lines):
        self.lines = lines
        self.pos = 0

    def mark(self):
        return self.pos

    def reset(self, mark):
        self.pos = mark

    def lineNumber(self):
        return self.pos + 1

    def atEnd(self):
        return self.pos >= len(self.lines)

    def readline(self, className):
        if self.atEnd():
            raise ParserError(self.lineNumber(), "Reached end of file while parsing object \"%s\"." % className)
        line = self.lines[self.pos].strip()
        self.pos += 1
        return line


def parseInt(s, lineNumber):
    try:
        return int(s)
    except ValueError:
        raise ParserError(lineNumber, "Could not parse \"%s\" as int." % s)


def parseFloat(s, lineNumber):
    try:
        return float(s)
    except ValueError:
        raise ParserError(lineNumber, "Could not parse \"%s\" as float." % s)


def parseBool(s, lineNumber):
    t = s.strip().lower()
    if t == "1" or t == "true":
        return True
    if t == "0" or t == "false":
        return False
    raise ParserError(lineNumber, "Could not parse \"%s\" as bool." % s)


def parseString(s, lineNumber):
    return s


def parseList(parser, parts, lineNumber):
    if len(parts) == 0:
        raise ParserError(lineNumber, "Could not parse empty string as list.")
    return [parser(p, lineNumber) for p in parts]


def readScalar(reader, className, parser):
    lineNumber = reader.lineNumber()
    return parser(reader.readline(className), lineNumber)


def readList(reader, className, parser):
    lineNumber = reader.lineNumber()
    return parseList(parser, reader.readline(className).split(DELIMITER), lineNumber)


def readFields(reader, className, expected, atLeast):
    lineNumber = reader.lineNumber()
    fields = reader.readline(className).split(DELIMITER)
    if len(fields) < expected or (not atLeast and len(fields) != expected):
        raise ParserError(lineNumber, "Expecting %d fields (%d found)." % (expected, len(fields)))
    return fields, lineNumber


def parseBlankLine(reader, className):
    lineNumber = reader.lineNumber()
    if reader.readline(className) != "":
        raise ParserError(lineNumber, "Should be an empty line.")


def expectEndOfInput(reader):
    while not reader.atEnd():
        lineNumber = reader.lineNumber()
        if reader.readline("") != "":
            raise ParserError(lineNumber, "Finished parsing but did not reach end of file.")
"#;

impl Backend for PythonBackend {
    fn language(&self) -> Language {
        Language::Python
    }

    fn generate(
        &self,
        plan: &ParsePlan,
        config: &GenerateConfig,
    ) -> Result<Vec<GeneratedFile>, BackendError> {
        check_identifiers(plan, Language::Python, RESERVED)?;
        let dir = config.out_dir();
        Ok(vec![
            GeneratedFile {
                path: dir.join(format!("{}.py", DATA_MODULE)),
                role: FileRole::Data,
                contents: data_module(plan),
            },
            GeneratedFile {
                path: dir.join(format!("{}.py", UTIL_MODULE)),
                role: FileRole::Util,
                contents: util_module(plan),
            },
            GeneratedFile {
                path: config.entry_path(),
                role: FileRole::Entry,
                contents: entry_module(plan),
            },
        ])
    }
}

fn header(w: &mut SourceWriter) {
    w.line("#!/usr/bin/env python3");
    w.comment("Generated by instaparse. Do not edit.");
    w.blank();
}

fn data_module(plan: &ParsePlan) -> String {
    let mut w = SourceWriter::new(INDENT, "#");
    header(&mut w);
    for class in plan.classes() {
        w.blank();
        w.line(format!("class {}:", class.name)).indent();
        w.line("def __init__(self):").indent();
        let mut empty = true;
        for field in class.fields() {
            w.line(format!("self.{} = None", field.name));
            empty = false;
        }
        if empty {
            w.line("pass");
        }
        w.dedent().dedent().blank();
    }
    w.finish()
}

fn util_module(plan: &ParsePlan) -> String {
    let mut w = SourceWriter::new(INDENT, "#");
    header(&mut w);
    w.line(format!("import {}", DATA_MODULE));
    w.blank();
    w.line(format!("DELIMITER = {}", quote_literal(plan.line_delimiter())));
    w.blank();
    w.blank();
    w.block_text(HELPERS);
    for class in plan.classes() {
        w.blank();
        w.blank();
        class_parser(&mut w, class);
    }
    w.finish()
}

fn scalar_parser(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Int => "parseInt",
        ScalarKind::Float => "parseFloat",
        ScalarKind::Bool => "parseBool",
        ScalarKind::String => "parseString",
    }
}

/// Expression reading one instance of the field.
fn item_expr(class: &ClassPlan, field: &FormatField) -> String {
    let owner = quote_literal(&class.name);
    match &field.kind {
        FieldKind::ClassRef(name) => format!("{}(reader)", parse_function_name(name)),
        FieldKind::List(kind) => format!("readList(reader, {}, {})", owner, scalar_parser(*kind)),
        other => match other.scalar() {
            Some(kind) => format!("readScalar(reader, {}, {})", owner, scalar_parser(kind)),
            None => String::new(),
        },
    }
}

fn class_parser(w: &mut SourceWriter, class: &ClassPlan) {
    let owner = quote_literal(&class.name);
    w.line(format!("def {}(reader):", parse_function_name(&class.name)))
        .indent();
    w.line(format!("result = {}.{}()", DATA_MODULE, class.name));
    for line in &class.lines {
        match line.shape() {
            LineShape::Blank => {
                w.line(format!("parseBlankLine(reader, {})", owner));
            }
            LineShape::Simple(field) => {
                w.line(format!("result.{} = {}", field.name, item_expr(class, field)));
            }
            LineShape::Split(fields) => {
                let tail_list = matches!(fields.last().map(|f| &f.kind), Some(FieldKind::List(_)));
                w.line(format!(
                    "fields, lineNumber = readFields(reader, {}, {}, {})",
                    owner,
                    fields.len(),
                    if tail_list { "True" } else { "False" }
                ));
                for (i, field) in fields.iter().enumerate() {
                    let value = match &field.kind {
                        FieldKind::List(kind) => {
                            format!("parseList({}, fields[{}:], lineNumber)", scalar_parser(*kind), i)
                        }
                        other => format!(
                            "{}(fields[{}], lineNumber)",
                            other.scalar().map_or("parseString", scalar_parser),
                            i
                        ),
                    };
                    w.line(format!("result.{} = {}", field.name, value));
                }
            }
            LineShape::Repeating(field) => repeated(w, class, field),
        }
    }
    w.line("return result");
    w.dedent();
}

fn repeated(w: &mut SourceWriter, class: &ClassPlan, field: &FormatField) {
    let owner = quote_literal(&class.name);
    let target = format!("result.{}", field.name);
    let item = item_expr(class, field);
    w.line(format!("{} = []", target));

    if field.repetition.is_speculative() {
        w.line("while True:").indent();
        w.line("mark = reader.mark()");
        w.line("try:").indent();
        if field.newline_separated {
            w.line(format!("if len({}) > 0:", target))
                .indent()
                .line(format!("parseBlankLine(reader, {})", owner))
                .dedent();
        }
        w.line(format!("item = {}", item));
        w.dedent().line("except ParserError:").indent();
        w.line("reader.reset(mark)").line("break").dedent();
        w.line("if reader.mark() == mark:")
            .indent()
            .line("break")
            .dedent();
        w.line(format!("{}.append(item)", target));
        w.dedent();
        if field.repetition == RepetitionKind::OneOrMore {
            let message = format!(
                "Expecting at least 1 \"{}\" when parsing \"{}.{}\" (0 found).",
                field.kind, class.name, field.name
            );
            w.line(format!("if len({}) == 0:", target))
                .indent()
                .line(format!(
                    "raise ParserError(reader.lineNumber(), {})",
                    quote_literal(&message)
                ))
                .dedent();
        }
        return;
    }

    let count = match &field.repetition {
        RepetitionKind::Variable(count_field) => {
            let negative = format!(
                "Repetition count \"{}.{}\" is negative (%d).",
                class.name, count_field
            );
            w.line(format!("count = result.{}", count_field));
            w.line("if count < 0:")
                .indent()
                .line(format!(
                    "raise ParserError(reader.lineNumber(), {} % count)",
                    quote_literal(&negative)
                ))
                .dedent();
            "count".to_string()
        }
        other => other.to_string(),
    };
    let message = format!(
        "Expecting exactly %d \"{}\" when parsing \"{}.{}\" (%d found).",
        field.kind, class.name, field.name
    );
    w.line(format!("for index in range({}):", count)).indent();
    w.line("try:").indent();
    if field.newline_separated {
        w.line("if index > 0:")
            .indent()
            .line(format!("parseBlankLine(reader, {})", owner))
            .dedent();
    }
    w.line(format!("{}.append({})", target, item));
    w.dedent().line("except ParserError as e:").indent();
    w.line(format!(
        "raise ParserError(e.lineNumber, {} % ({}, index))",
        quote_literal(&message),
        count
    ));
    w.dedent().dedent();
}

fn entry_module(plan: &ParsePlan) -> String {
    let mut w = SourceWriter::new(INDENT, "#");
    header(&mut w);
    w.line("import sys");
    w.blank();
    w.line(format!("import {}", UTIL_MODULE));
    w.blank();
    w.blank();
    w.line(format!("def {}(filename):", PARSE_INPUT)).indent();
    w.line("try:").indent();
    w.line("with open(filename, \"r\") as inputFile:")
        .indent()
        .line("lines = inputFile.read().splitlines()")
        .dedent();
    w.dedent().line("except IOError as e:").indent();
    w.line("sys.stderr.write(\"Parser Error: Problem opening file, %s\\n\" % e)");
    w.line("sys.exit(1)").dedent();
    w.line(format!("reader = {}.LineReader(lines)", UTIL_MODULE));
    w.line("try:").indent();
    w.line(format!(
        "result = {}.{}(reader)",
        UTIL_MODULE,
        parse_function_name(plan.root_type_name())
    ));
    w.line(format!("{}.expectEndOfInput(reader)", UTIL_MODULE));
    w.dedent().line(format!("except {}.ParserError as e:", UTIL_MODULE)).indent();
    w.line("sys.stderr.write(str(e) + \"\\n\")");
    w.line("sys.exit(1)").dedent();
    w.line("return result").dedent();
    w.blank();
    w.blank();
    w.line("if __name__ == \"__main__\":").indent();
    w.comment(format!("Call {}(filename) to parse the file of that name.", PARSE_INPUT));
    w.line("if len(sys.argv) > 1:")
        .indent()
        .line(format!("{}(sys.argv[1])", PARSE_INPUT))
        .dedent();
    w.dedent();
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(src: &str) -> Vec<GeneratedFile> {
        let plan = crate::compile(src).expect("compile");
        PythonBackend
            .generate(&plan, &GenerateConfig::default())
            .expect("generate")
    }

    #[test]
    fn emits_three_modules() {
        let files = generate("<objects>\nPoint\nx:int y:int\n<body>\npoints:Point:+");
        let paths: Vec<String> = files.iter().map(|f| f.path.display().to_string()).collect();
        assert_eq!(
            paths,
            vec!["./InstaParseData.py", "./InstaParseUtil.py", "out.py"]
        );
        assert!(files[0].contents.contains("class Point:\n    def __init__(self):\n        self.x = None"));
        assert!(files[1].contents.contains("def parsePoint(reader):"));
        assert!(files[1].contents.contains("DELIMITER = \" \""));
        assert!(files[2].contents.contains("result = InstaParseUtil.parseBody(reader)"));
    }

    #[test]
    fn speculative_repetition_marks_and_resets() {
        let files = generate("<body>\nitems:int:*!");
        let util = &files[1].contents;
        assert!(util.contains("        mark = reader.mark()\n"));
        assert!(util.contains("            if len(result.items) > 0:\n                parseBlankLine(reader, \"Body\")\n"));
        assert!(util.contains("            reader.reset(mark)\n            break\n"));
        assert!(!util.contains("at least 1"));
    }

    #[test]
    fn variable_repetition_reads_count_field() {
        let files = generate("<body>\nn:int\nnames:string:n");
        let util = &files[1].contents;
        assert!(util.contains("    count = result.n\n"));
        assert!(util.contains("    for index in range(count):\n"));
        assert!(util.contains("Expecting exactly %d \\\"string\\\" when parsing \\\"Body.names\\\" (%d found)."));
    }

    #[test]
    fn python_keywords_are_rejected() {
        let plan = crate::compile("<body>\nlambda:int").expect("compile");
        assert!(matches!(
            PythonBackend.generate(&plan, &GenerateConfig::default()),
            Err(BackendError::Emit { .. })
        ));
    }
}
