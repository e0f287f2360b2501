//! Java parser generator. One public class per format class plus the utility and entry classes.

use super::*;
use crate::plan::{ClassPlan, FieldKind, FormatField, LineShape, RepetitionKind, ScalarKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct JavaBackend;

const INDENT: &str = "    ";

const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "null", "package", "private", "protected", "public", "record", "return",
    "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "try", "var", "void", "volatile", "while", "yield",
    // Types the generated code refers to by simple name.
    "Long", "Double", "Boolean", "Object", "ArrayList", "Arrays", "Pattern", "LineReader",
    "ParserException", "ScalarParser", "Fields",
];

const HELPERS: &str = r#"public static class ParserException extends RuntimeException {
    public final int lineNumber;

    public ParserException(int lineNumber, String message) {
        super("Parser Error on line " + lineNumber + ": " + message);
        this.lineNumber = lineNumber;
    }
}

public static class LineReader {
    private final List<String> lines;
    private int pos = 0;

    public LineReader(List<String> lines) {
        this.lines = lines;
    }

    public int mark() {
        return pos;
    }

    public void reset(int mark) {
        pos = mark;
    }

    public int lineNumber() {
        return pos + 1;
    }

    public boolean atEnd() {
        return pos >= lines.size();
    }

    public String readLine(String className) {
        if (atEnd()) {
            throw new ParserException(lineNumber(),
                "Reached end of file while parsing object \"" + className + "\".");
        }
        return lines.get(pos++).trim();
    }
}

public interface ScalarParser<T> {
    T parse(String s, int lineNumber);
}

static class Fields {
    final String[] parts;
    final int lineNumber;

    Fields(String[] parts, int lineNumber) {
        this.parts = parts;
        this.lineNumber = lineNumber;
    }
}

static String[] split(String line) {
    return line.split(Pattern.quote(DELIMITER), -1);
}

public static Long parseInt(String s, int lineNumber) {
    try {
        return Long.parseLong(s.trim());
    } catch (NumberFormatException e) {
        throw new ParserException(lineNumber, "Could not parse \"" + s + "\" as int.");
    }
}

public static Double parseFloat(String s, int lineNumber) {
    try {
        return Double.parseDouble(s.trim());
    } catch (NumberFormatException e) {
        throw new ParserException(lineNumber, "Could not parse \"" + s + "\" as float.");
    }
}

public static Boolean parseBool(String s, int lineNumber) {
    String t = s.trim().toLowerCase();
    if (t.equals("1") || t.equals("true")) {
        return true;
    }
    if (t.equals("0") || t.equals("false")) {
        return false;
    }
    throw new ParserException(lineNumber, "Could not parse \"" + s + "\" as bool.");
}

public static String parseString(String s, int lineNumber) {
    return s;
}

static <T> ArrayList<T> parseList(ScalarParser<T> parser, String[] parts, int from, int lineNumber) {
    ArrayList<T> result = new ArrayList<>();
    for (int i = from; i < parts.length; i++) {
        result.add(parser.parse(parts[i], lineNumber));
    }
    return result;
}

static <T> T readScalar(LineReader reader, String className, ScalarParser<T> parser) {
    int lineNumber = reader.lineNumber();
    return parser.parse(reader.readLine(className), lineNumber);
}

static <T> ArrayList<T> readList(LineReader reader, String className, ScalarParser<T> parser) {
    int lineNumber = reader.lineNumber();
    return parseList(parser, split(reader.readLine(className)), 0, lineNumber);
}

static Fields readFields(LineReader reader, String className, int expected, boolean atLeast) {
    int lineNumber = reader.lineNumber();
    String[] parts = split(reader.readLine(className));
    if (parts.length < expected || (!atLeast && parts.length != expected)) {
        throw new ParserException(lineNumber,
            "Expecting " + expected + " fields (" + parts.length + " found).");
    }
    return new Fields(parts, lineNumber);
}

public static void parseBlankLine(LineReader reader, String className) {
    int lineNumber = reader.lineNumber();
    if (!reader.readLine(className).isEmpty()) {
        throw new ParserException(lineNumber, "Should be an empty line.");
    }
}

public static void expectEndOfInput(LineReader reader) {
    while (!reader.atEnd()) {
        int lineNumber = reader.lineNumber();
        if (!reader.readLine("").isEmpty()) {
            throw new ParserException(lineNumber, "Finished parsing but did not reach end of file.");
        }
    }
}
"#;

impl Backend for JavaBackend {
    fn language(&self) -> Language {
        Language::Java
    }

    fn generate(
        &self,
        plan: &ParsePlan,
        config: &GenerateConfig,
    ) -> Result<Vec<GeneratedFile>, BackendError> {
        check_identifiers(plan, Language::Java, RESERVED)?;
        let entry = config.stem();
        check_entry_name(plan, &entry)?;

        let dir = config.out_dir();
        let mut files: Vec<GeneratedFile> = plan
            .classes()
            .iter()
            .map(|class| GeneratedFile {
                path: dir.join(format!("{}.java", class.name)),
                role: FileRole::Data,
                contents: data_class(class),
            })
            .collect();
        files.push(GeneratedFile {
            path: dir.join(format!("{}.java", UTIL_MODULE)),
            role: FileRole::Util,
            contents: util_class(plan),
        });
        files.push(GeneratedFile {
            path: config.entry_path(),
            role: FileRole::Entry,
            contents: entry_class(plan, &entry),
        });
        Ok(files)
    }
}

/// The entry class is named after the output file, which Java requires to be an identifier.
fn check_entry_name(plan: &ParsePlan, entry: &str) -> Result<(), BackendError> {
    let mut chars = entry.chars();
    let valid = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    let problem = if !valid {
        "is not a valid class name"
    } else if RESERVED.contains(&entry) {
        "is a reserved word"
    } else if entry == UTIL_MODULE || plan.class(entry).is_some() {
        "clashes with a generated class"
    } else {
        return Ok(());
    };
    Err(BackendError::Emit {
        language: Language::Java,
        message: format!("output name '{}' {}", entry, problem),
    })
}

fn header(w: &mut SourceWriter) {
    w.comment("Generated by instaparse. Do not edit.");
    w.blank();
}

fn boxed_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Int => "Long",
        ScalarKind::Float => "Double",
        ScalarKind::Bool => "Boolean",
        ScalarKind::String => "String",
    }
}

fn item_type(kind: &FieldKind) -> String {
    match kind {
        FieldKind::ClassRef(name) => name.clone(),
        FieldKind::List(k) => format!("ArrayList<{}>", boxed_type(*k)),
        other => boxed_type(other.scalar().unwrap_or(ScalarKind::String)).to_string(),
    }
}

fn field_type(field: &FormatField) -> String {
    if field.is_repeated() {
        format!("ArrayList<{}>", item_type(&field.kind))
    } else {
        item_type(&field.kind)
    }
}

fn data_class(class: &ClassPlan) -> String {
    let mut w = SourceWriter::new(INDENT, "//");
    header(&mut w);
    if class.fields().any(|f| field_type(f).starts_with("ArrayList")) {
        w.line("import java.util.ArrayList;");
        w.blank();
    }
    w.open(format!("public class {}", class.name));
    for field in class.fields() {
        w.line(format!("public {} {};", field_type(field), field.name));
    }
    w.close("}");
    w.finish()
}

fn scalar_parser(kind: ScalarKind) -> String {
    let name = match kind {
        ScalarKind::Int => "parseInt",
        ScalarKind::Float => "parseFloat",
        ScalarKind::Bool => "parseBool",
        ScalarKind::String => "parseString",
    };
    format!("{}::{}", UTIL_MODULE, name)
}

fn item_expr(class: &ClassPlan, field: &FormatField) -> String {
    let owner = quote_literal(&class.name);
    match &field.kind {
        FieldKind::ClassRef(name) => format!("{}(reader)", parse_function_name(name)),
        FieldKind::List(k) => format!("readList(reader, {}, {})", owner, scalar_parser(*k)),
        other => format!(
            "readScalar(reader, {}, {})",
            owner,
            scalar_parser(other.scalar().unwrap_or(ScalarKind::String))
        ),
    }
}

fn util_class(plan: &ParsePlan) -> String {
    let mut w = SourceWriter::new(INDENT, "//");
    header(&mut w);
    w.line("import java.util.ArrayList;");
    w.line("import java.util.List;");
    w.line("import java.util.regex.Pattern;");
    w.blank();
    w.open(format!("public class {}", UTIL_MODULE));
    w.line(format!(
        "public static final String DELIMITER = {};",
        quote_literal(plan.line_delimiter())
    ));
    w.blank();
    w.block_text(HELPERS);
    for class in plan.classes() {
        w.blank();
        class_parser(&mut w, class);
    }
    w.close("}");
    w.finish()
}

fn class_parser(w: &mut SourceWriter, class: &ClassPlan) {
    let owner = quote_literal(&class.name);
    w.open(format!(
        "public static {} {}(LineReader reader)",
        class.name,
        parse_function_name(&class.name)
    ));
    w.line(format!("{name} result = new {name}();", name = class.name));
    for line in &class.lines {
        match line.shape() {
            LineShape::Blank => {
                w.line(format!("parseBlankLine(reader, {});", owner));
            }
            LineShape::Simple(field) => {
                w.line(format!("result.{} = {};", field.name, item_expr(class, field)));
            }
            LineShape::Split(fields) => {
                let tail_list = matches!(fields.last().map(|f| &f.kind), Some(FieldKind::List(_)));
                w.line("{").indent();
                w.line(format!(
                    "Fields fields = readFields(reader, {}, {}, {});",
                    owner,
                    fields.len(),
                    tail_list
                ));
                for (i, field) in fields.iter().enumerate() {
                    let value = match &field.kind {
                        FieldKind::List(k) => format!(
                            "parseList({}, fields.parts, {}, fields.lineNumber)",
                            scalar_parser(*k),
                            i
                        ),
                        other => format!(
                            "{}(fields.parts[{}], fields.lineNumber)",
                            scalar_parser(other.scalar().unwrap_or(ScalarKind::String))
                                .replace("::", "."),
                            i
                        ),
                    };
                    w.line(format!("result.{} = {};", field.name, value));
                }
                w.close("}");
            }
            LineShape::Repeating(field) => repeated(w, class, field),
        }
    }
    w.line("return result;");
    w.close("}");
}

fn repeated(w: &mut SourceWriter, class: &ClassPlan, field: &FormatField) {
    let owner = quote_literal(&class.name);
    let target = format!("result.{}", field.name);
    let item = item_expr(class, field);
    w.line(format!("{} = new ArrayList<>();", target));

    if field.repetition.is_speculative() {
        w.open("while (true)");
        w.line("int mark = reader.mark();");
        w.line(format!("{} item;", item_type(&field.kind)));
        w.open("try");
        if field.newline_separated {
            w.open(format!("if (!{}.isEmpty())", target))
                .line(format!("parseBlankLine(reader, {});", owner))
                .close("}");
        }
        w.line(format!("item = {};", item));
        w.close("} catch (ParserException e) {").indent();
        w.line("reader.reset(mark);").line("break;");
        w.close("}");
        w.open("if (reader.mark() == mark)").line("break;").close("}");
        w.line(format!("{}.add(item);", target));
        w.close("}");
        if field.repetition == RepetitionKind::OneOrMore {
            let message = format!(
                "Expecting at least 1 \"{}\" when parsing \"{}.{}\" (0 found).",
                field.kind, class.name, field.name
            );
            w.open(format!("if ({}.isEmpty())", target))
                .line(format!(
                    "throw new ParserException(reader.lineNumber(), {});",
                    quote_literal(&message)
                ))
                .close("}");
        }
        return;
    }

    w.line("{").indent();
    match &field.repetition {
        RepetitionKind::Variable(count_field) => {
            let negative = format!(
                "Repetition count \"{}.{}\" is negative (",
                class.name, count_field
            );
            w.line(format!("long count = result.{};", count_field));
            w.open("if (count < 0)")
                .line(format!(
                    "throw new ParserException(reader.lineNumber(), {} + count + \").\");",
                    quote_literal(&negative)
                ))
                .close("}");
        }
        other => {
            w.line(format!("long count = {}L;", other));
        }
    }
    let prefix = "Expecting exactly ";
    let middle = format!(
        " \"{}\" when parsing \"{}.{}\" (",
        field.kind, class.name, field.name
    );
    w.open("for (long index = 0; index < count; index++)");
    w.open("try");
    if field.newline_separated {
        w.open("if (index > 0)")
            .line(format!("parseBlankLine(reader, {});", owner))
            .close("}");
    }
    w.line(format!("{}.add({});", target, item));
    w.close("} catch (ParserException e) {").indent();
    w.line(format!(
        "throw new ParserException(e.lineNumber, {} + count + {} + index + \" found).\");",
        quote_literal(prefix),
        quote_literal(&middle)
    ));
    w.close("}");
    w.close("}");
    w.close("}");
}

fn entry_class(plan: &ParsePlan, entry: &str) -> String {
    let root = plan.root_type_name();
    let mut w = SourceWriter::new(INDENT, "//");
    header(&mut w);
    w.line("import java.io.IOException;");
    w.line("import java.nio.file.Files;");
    w.line("import java.nio.file.Paths;");
    w.line("import java.util.List;");
    w.blank();
    w.open(format!("public class {}", entry));
    w.open(format!("public static {} {}(String filename)", root, PARSE_INPUT));
    w.line("List<String> lines;");
    w.open("try");
    w.line("lines = Files.readAllLines(Paths.get(filename));");
    w.close("} catch (IOException e) {").indent();
    w.line("System.err.println(\"Parser Error: Problem opening file, \" + e.getMessage());");
    w.line("System.exit(1);");
    w.line("return null;");
    w.close("}");
    w.line(format!(
        "{util}.LineReader reader = new {util}.LineReader(lines);",
        util = UTIL_MODULE
    ));
    w.open("try");
    w.line(format!(
        "{} result = {}.{}(reader);",
        root,
        UTIL_MODULE,
        parse_function_name(root)
    ));
    w.line(format!("{}.expectEndOfInput(reader);", UTIL_MODULE));
    w.line("return result;");
    w.close(&format!("}} catch ({}.ParserException e) {{", UTIL_MODULE))
        .indent();
    w.line("System.err.println(e.getMessage());");
    w.line("System.exit(1);");
    w.line("return null;");
    w.close("}");
    w.close("}");
    w.blank();
    w.open("public static void main(String[] args)");
    w.comment(format!("Call {}(filename) to parse the file of that name.", PARSE_INPUT));
    w.open("if (args.length > 0)")
        .line(format!("{}(args[0]);", PARSE_INPUT))
        .close("}");
    w.close("}");
    w.close("}");
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn generate(src: &str, output: &str) -> Result<Vec<GeneratedFile>, BackendError> {
        let plan = crate::compile(src).expect("compile");
        JavaBackend.generate(&plan, &GenerateConfig::new(output, Some(Language::Java)))
    }

    #[test]
    fn one_file_per_class() {
        let files = generate(
            "<objects>\nPoint\nx:int y:float\n<body>\npoints:Point:+",
            "gen/Reader",
        )
        .expect("generate");
        let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("gen/Point.java"),
                PathBuf::from("gen/Body.java"),
                PathBuf::from("gen/InstaParseUtil.java"),
                PathBuf::from("gen/Reader.java"),
            ]
        );
        assert!(files[0].contents.contains("public class Point {\n    public Long x;\n    public Double y;\n}"));
        assert!(files[1].contents.starts_with("// Generated"));
        assert!(files[1].contents.contains("import java.util.ArrayList;"));
        assert!(files[1].contents.contains("public ArrayList<Point> points;"));
        assert!(files[3].contents.contains("public class Reader {"));
        assert!(files[3].contents.contains("public static Body parse(String filename) {"));
    }

    #[test]
    fn split_line_with_tail_list_accepts_extra_fields() {
        let files = generate("<body>\nname:string scores:list(int)", "Reader").expect("generate");
        let util = &files.iter().find(|f| f.role == FileRole::Util).expect("util").contents;
        assert!(util.contains("Fields fields = readFields(reader, \"Body\", 2, true);"));
        assert!(util.contains("result.name = InstaParseUtil.parseString(fields.parts[0], fields.lineNumber);"));
        assert!(util.contains(
            "result.scores = parseList(InstaParseUtil::parseInt, fields.parts, 1, fields.lineNumber);"
        ));
    }

    #[test]
    fn invalid_entry_names_are_rejected() {
        for output in ["my-parser", "Body", "class"] {
            assert!(
                matches!(
                    generate("<body>\nx:int", output),
                    Err(BackendError::Emit { .. })
                ),
                "{} should be rejected",
                output
            );
        }
    }
}
