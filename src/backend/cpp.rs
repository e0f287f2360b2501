//! C++11 parser generator: a data header, a header-only utility library and the entry source.

use super::*;
use crate::plan::{ClassPlan, FieldKind, FormatField, LineShape, RepetitionKind, ScalarKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct CppBackend;

const INDENT: &str = "    ";

const RESERVED: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
    "case", "catch", "char", "char16_t", "char32_t", "class", "compl", "const", "constexpr",
    "const_cast", "continue", "decltype", "default", "delete", "do", "double", "dynamic_cast",
    "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
    "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "not_eq",
    "nullptr", "operator", "or", "or_eq", "private", "protected", "public", "register",
    "reinterpret_cast", "return", "short", "signed", "sizeof", "static", "static_assert",
    "static_cast", "struct", "switch", "template", "this", "thread_local", "throw", "true", "try",
    "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual", "void", "volatile",
    "wchar_t", "while", "xor", "xor_eq",
    // Names the generated code declares or includes.
    "std", "main", "parse", "InstaParse", "LineReader", "ParserError", "Fields", "DELIMITER",
];

const HELPERS: &str = r#"inline std::string trim(const std::string &s) {
    const char *space = " \t\r\n\f\v";
    std::size_t begin = s.find_first_not_of(space);
    if (begin == std::string::npos) {
        return "";
    }
    std::size_t end = s.find_last_not_of(space);
    return s.substr(begin, end - begin + 1);
}

inline std::vector<std::string> split(const std::string &s) {
    std::vector<std::string> parts;
    std::size_t start = 0;
    std::size_t found;
    while ((found = s.find(DELIMITER, start)) != std::string::npos) {
        parts.push_back(s.substr(start, found - start));
        start = found + DELIMITER.size();
    }
    parts.push_back(s.substr(start));
    return parts;
}

class ParserError : public std::runtime_error {
public:
    ParserError(int lineNumber, const std::string &message)
        : std::runtime_error("Parser Error on line " + std::to_string(lineNumber) + ": " + message),
          lineNumber(lineNumber) {}

    int lineNumber;
};

class LineReader {
public:
    explicit LineReader(std::vector<std::string> lines) : lines(std::move(lines)), pos(0) {}

    std::size_t mark() const { return pos; }

    void reset(std::size_t mark) { pos = mark; }

    int lineNumber() const { return static_cast<int>(pos) + 1; }

    bool atEnd() const { return pos >= lines.size(); }

    std::string readLine(const std::string &className) {
        if (atEnd()) {
            throw ParserError(lineNumber(),
                "Reached end of file while parsing object \"" + className + "\".");
        }
        return trim(lines[pos++]);
    }

private:
    std::vector<std::string> lines;
    std::size_t pos;
};

struct Fields {
    std::vector<std::string> parts;
    int lineNumber;
};

inline long long parseInt(const std::string &s, int lineNumber) {
    std::string t = trim(s);
    std::size_t used = 0;
    long long value = 0;
    try {
        value = std::stoll(t, &used);
    } catch (const std::exception &) {
        used = 0;
    }
    if (t.empty() || used != t.size()) {
        throw ParserError(lineNumber, "Could not parse \"" + s + "\" as int.");
    }
    return value;
}

inline double parseFloat(const std::string &s, int lineNumber) {
    std::string t = trim(s);
    std::size_t used = 0;
    double value = 0.0;
    try {
        value = std::stod(t, &used);
    } catch (const std::exception &) {
        used = 0;
    }
    if (t.empty() || used != t.size()) {
        throw ParserError(lineNumber, "Could not parse \"" + s + "\" as float.");
    }
    return value;
}

inline bool parseBool(const std::string &s, int lineNumber) {
    std::string t = trim(s);
    std::transform(t.begin(), t.end(), t.begin(),
        [](unsigned char c) { return static_cast<char>(std::tolower(c)); });
    if (t == "1" || t == "true") {
        return true;
    }
    if (t == "0" || t == "false") {
        return false;
    }
    throw ParserError(lineNumber, "Could not parse \"" + s + "\" as bool.");
}

inline std::string parseString(const std::string &s, int) {
    return s;
}

template <typename T>
std::vector<T> parseList(T (*parser)(const std::string &, int),
                         const std::vector<std::string> &parts, std::size_t from, int lineNumber) {
    std::vector<T> result;
    for (std::size_t i = from; i < parts.size(); ++i) {
        result.push_back(parser(parts[i], lineNumber));
    }
    return result;
}

template <typename T>
T readScalar(LineReader &reader, const std::string &className,
             T (*parser)(const std::string &, int)) {
    int lineNumber = reader.lineNumber();
    return parser(reader.readLine(className), lineNumber);
}

template <typename T>
std::vector<T> readList(LineReader &reader, const std::string &className,
                        T (*parser)(const std::string &, int)) {
    int lineNumber = reader.lineNumber();
    return parseList(parser, split(reader.readLine(className)), 0, lineNumber);
}

inline Fields readFields(LineReader &reader, const std::string &className, std::size_t expected,
                         bool atLeast) {
    int lineNumber = reader.lineNumber();
    std::vector<std::string> parts = split(reader.readLine(className));
    if (parts.size() < expected || (!atLeast && parts.size() != expected)) {
        throw ParserError(lineNumber, "Expecting " + std::to_string(expected) + " fields (" +
                                          std::to_string(parts.size()) + " found).");
    }
    return Fields{parts, lineNumber};
}

inline void parseBlankLine(LineReader &reader, const std::string &className) {
    int lineNumber = reader.lineNumber();
    if (!reader.readLine(className).empty()) {
        throw ParserError(lineNumber, "Should be an empty line.");
    }
}

inline void expectEndOfInput(LineReader &reader) {
    while (!reader.atEnd()) {
        int lineNumber = reader.lineNumber();
        if (!reader.readLine("").empty()) {
            throw ParserError(lineNumber, "Finished parsing but did not reach end of file.");
        }
    }
}
"#;

impl Backend for CppBackend {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn generate(
        &self,
        plan: &ParsePlan,
        config: &GenerateConfig,
    ) -> Result<Vec<GeneratedFile>, BackendError> {
        check_identifiers(plan, Language::Cpp, RESERVED)?;
        let dir = config.out_dir();
        Ok(vec![
            GeneratedFile {
                path: dir.join(format!("{}.h", DATA_MODULE)),
                role: FileRole::Data,
                contents: data_header(plan),
            },
            GeneratedFile {
                path: dir.join(format!("{}.h", UTIL_MODULE)),
                role: FileRole::Util,
                contents: util_header(plan),
            },
            GeneratedFile {
                path: config.entry_path(),
                role: FileRole::Entry,
                contents: entry_source(plan),
            },
        ])
    }
}

fn header(w: &mut SourceWriter) {
    w.comment("Generated by instaparse. Do not edit.");
    w.blank();
}

fn guard(name: &str) -> String {
    format!("{}_H", name.to_ascii_uppercase())
}

fn scalar_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Int => "long long",
        ScalarKind::Float => "double",
        ScalarKind::Bool => "bool",
        ScalarKind::String => "std::string",
    }
}

fn item_type(kind: &FieldKind) -> String {
    match kind {
        FieldKind::ClassRef(name) => name.clone(),
        FieldKind::List(k) => format!("std::vector<{}>", scalar_type(*k)),
        other => scalar_type(other.scalar().unwrap_or(ScalarKind::String)).to_string(),
    }
}

fn member(field: &FormatField) -> String {
    if field.is_repeated() {
        return format!("std::vector<{}> {};", item_type(&field.kind), field.name);
    }
    let init = match field.kind.scalar() {
        Some(ScalarKind::Int) => " = 0",
        Some(ScalarKind::Float) => " = 0.0",
        Some(ScalarKind::Bool) => " = false",
        _ => "",
    };
    format!("{} {}{};", item_type(&field.kind), field.name, init)
}

fn data_header(plan: &ParsePlan) -> String {
    let mut w = SourceWriter::new(INDENT, "//");
    header(&mut w);
    w.line(format!("#ifndef {}", guard(DATA_MODULE)));
    w.line(format!("#define {}", guard(DATA_MODULE)));
    w.blank();
    w.line("#include <string>");
    w.line("#include <vector>");
    for class in plan.classes() {
        w.blank();
        w.open(format!("struct {}", class.name));
        for field in class.fields() {
            w.line(member(field));
        }
        w.close("};");
    }
    w.blank();
    w.line("#endif");
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

fn util_header(plan: &ParsePlan) -> String {
    let mut w = SourceWriter::new(INDENT, "//");
    header(&mut w);
    w.line(format!("#ifndef {}", guard(UTIL_MODULE)));
    w.line(format!("#define {}", guard(UTIL_MODULE)));
    w.blank();
    for include in [
        "algorithm",
        "cctype",
        "cstddef",
        "stdexcept",
        "string",
        "utility",
        "vector",
    ] {
        w.line(format!("#include <{}>", include));
    }
    w.blank();
    w.line(format!("#include \"{}.h\"", DATA_MODULE));
    w.blank();
    w.line(format!("namespace {} {{", PARSER_NAME));
    w.blank();
    w.line(format!(
        "const std::string DELIMITER = {};",
        quote_literal(plan.line_delimiter())
    ));
    w.blank();
    w.block_text(HELPERS);
    for class in plan.classes() {
        w.blank();
        class_parser(&mut w, class);
    }
    w.blank();
    w.line(format!("}}  // namespace {}", PARSER_NAME));
    w.blank();
    w.line("#endif");
    w.finish()
}

fn class_parser(w: &mut SourceWriter, class: &ClassPlan) {
    let owner = quote_literal(&class.name);
    w.open(format!(
        "inline {} {}(LineReader &reader)",
        class.name,
        parse_function_name(&class.name)
    ));
    w.line(format!("{} result;", class.name));
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
                            scalar_parser(other.scalar().unwrap_or(ScalarKind::String)),
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

    if field.repetition.is_speculative() {
        w.open("while (true)");
        w.line("std::size_t mark = reader.mark();");
        w.open("try");
        if field.newline_separated {
            w.open(format!("if (!{}.empty())", target))
                .line(format!("parseBlankLine(reader, {});", owner))
                .close("}");
        }
        w.line(format!("{} item = {};", item_type(&field.kind), item));
        w.open("if (reader.mark() == mark)").line("break;").close("}");
        w.line(format!("{}.push_back(item);", target));
        w.close("} catch (const ParserError &) {").indent();
        w.line("reader.reset(mark);").line("break;");
        w.close("}");
        w.close("}");
        if field.repetition == RepetitionKind::OneOrMore {
            let message = format!(
                "Expecting at least 1 \"{}\" when parsing \"{}.{}\" (0 found).",
                field.kind, class.name, field.name
            );
            w.open(format!("if ({}.empty())", target))
                .line(format!(
                    "throw ParserError(reader.lineNumber(), {});",
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
            w.line(format!("long long count = result.{};", count_field));
            w.open("if (count < 0)")
                .line(format!(
                    "throw ParserError(reader.lineNumber(), {} + std::to_string(count) + \").\");",
                    quote_literal(&negative)
                ))
                .close("}");
        }
        other => {
            w.line(format!("long long count = {}LL;", other));
        }
    }
    let middle = format!(
        " \"{}\" when parsing \"{}.{}\" (",
        field.kind, class.name, field.name
    );
    w.open("for (long long index = 0; index < count; ++index)");
    w.open("try");
    if field.newline_separated {
        w.open("if (index > 0)")
            .line(format!("parseBlankLine(reader, {});", owner))
            .close("}");
    }
    w.line(format!("{}.push_back({});", target, item));
    w.close("} catch (const ParserError &e) {").indent();
    w.line(format!(
        "throw ParserError(e.lineNumber, \"Expecting exactly \" + std::to_string(count) + {} + std::to_string(index) + \" found).\");",
        quote_literal(&middle)
    ));
    w.close("}");
    w.close("}");
    w.close("}");
}

fn entry_source(plan: &ParsePlan) -> String {
    let root = plan.root_type_name();
    let mut w = SourceWriter::new(INDENT, "//");
    header(&mut w);
    for include in ["cstdlib", "fstream", "iostream", "string", "vector"] {
        w.line(format!("#include <{}>", include));
    }
    w.blank();
    w.line(format!("#include \"{}.h\"", UTIL_MODULE));
    w.blank();
    w.open(format!("{} {}(const std::string &filename)", root, PARSE_INPUT));
    w.line("std::ifstream input(filename);");
    w.open("if (!input)");
    w.line("std::cerr << \"Parser Error: Problem opening file, \" << filename << std::endl;");
    w.line("std::exit(1);");
    w.close("}");
    w.line("std::vector<std::string> lines;");
    w.line("std::string line;");
    w.open("while (std::getline(input, line))")
        .line("lines.push_back(line);")
        .close("}");
    w.line(format!("{}::LineReader reader(lines);", PARSER_NAME));
    w.open("try");
    w.line(format!(
        "{} result = {}::{}(reader);",
        root,
        PARSER_NAME,
        parse_function_name(root)
    ));
    w.line(format!("{}::expectEndOfInput(reader);", PARSER_NAME));
    w.line("return result;");
    w.close(&format!("}} catch (const {}::ParserError &e) {{", PARSER_NAME))
        .indent();
    w.line("std::cerr << e.what() << std::endl;");
    w.line("std::exit(1);");
    w.close("}");
    w.close("}");
    w.blank();
    w.open("int main(int argc, char **argv)");
    w.comment(format!("Call {}(filename) to parse the file of that name.", PARSE_INPUT));
    w.open("if (argc > 1)")
        .line(format!("{}(argv[1]);", PARSE_INPUT))
        .close("}");
    w.line("return 0;");
    w.close("}");
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn generate(src: &str) -> Vec<GeneratedFile> {
        let plan = crate::compile(src).expect("compile");
        CppBackend
            .generate(&plan, &GenerateConfig::new("build/reader", Some(Language::Cpp)))
            .expect("generate")
    }

    #[test]
    fn header_pair_and_entry_source() {
        let files = generate("<head>\ndelimiter \",\"\n<objects>\nPoint\nx:int y:int\n<body>\npoints:Point:3!");
        let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("build/InstaParseData.h"),
                PathBuf::from("build/InstaParseUtil.h"),
                PathBuf::from("build/reader.cpp"),
            ]
        );
        let data = &files[0].contents;
        assert!(data.contains("#ifndef INSTAPARSEDATA_H\n"));
        assert!(data.contains("struct Point {\n    long long x = 0;\n    long long y = 0;\n};"));
        assert!(data.contains("std::vector<Point> points;"));
        let util = &files[1].contents;
        assert!(util.contains("const std::string DELIMITER = \",\";"));
        assert!(util.contains("inline Point parsePoint(LineReader &reader) {"));
        assert!(util.contains("        long long count = 3LL;\n"));
        assert!(util.contains("                if (index > 0) {\n"));
        assert!(files[2].contents.contains("Body result = InstaParse::parseBody(reader);"));
    }

    #[test]
    fn cpp_keywords_are_rejected() {
        let plan = crate::compile("<body>\ntemplate:int").expect("compile");
        assert!(matches!(
            CppBackend.generate(&plan, &GenerateConfig::default()),
            Err(BackendError::Emit { .. })
        ));
    }
}
