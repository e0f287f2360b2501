//! Front-end tests: format files accepted or rejected by the scanner, field grammar, object model
//! builder, validator and plan assembler.

use instaparse::error::{ReferenceProblem, StructureRule, TypeProblem};
use instaparse::scanner::{self, Tag};
use instaparse::{
    compile, CompileError, DocumentParser, FieldKind, RepetitionKind, ScanError, SemanticError,
    SyntaxError, Value,
};

fn semantic_errors(src: &str) -> Vec<SemanticError> {
    match compile(src) {
        Err(CompileError::Semantic(errors)) => errors,
        other => panic!("expected semantic errors, got {:?}", other.map(|_| "plan")),
    }
}

fn scan_errors(src: &str) -> Vec<ScanError> {
    match compile(src) {
        Err(CompileError::Scan(errors)) => errors,
        other => panic!("expected scan errors, got {:?}", other.map(|_| "plan")),
    }
}

fn syntax_errors(src: &str) -> Vec<SyntaxError> {
    match compile(src) {
        Err(CompileError::Syntax(errors)) => errors,
        other => panic!("expected syntax errors, got {:?}", other.map(|_| "plan")),
    }
}

// ==================== Scanner ====================

#[test]
fn tag_intervals_are_contiguous_and_ordered() {
    let src = "# leading comment\n\n<options>\nanything\n<head>\ndelimiter \",\"\n<objects>\nP\nx:int\n<body>\np:P\n\n# trailing\n";
    let lines: Vec<&str> = src.lines().collect();
    let intervals = scanner::scan(&lines).expect("scan");
    let tags: Vec<Tag> = intervals.iter().map(|i| i.tag).collect();
    assert_eq!(tags, vec![Tag::Options, Tag::Head, Tag::Objects, Tag::Body]);

    let all: Vec<_> = intervals.iter().collect();
    for pair in all.windows(2) {
        assert_eq!(pair[0].end, pair[1].begin, "intervals must touch");
    }
    assert_eq!(all[0].begin, 2);
    // The body ends after its last field line; trailing blank and comment lines are dropped.
    assert_eq!(all[3].end, 11);
    assert_eq!(intervals.get(Tag::Body).map(|i| i.content()), Some(10..11));
}

#[test]
fn empty_or_commented_out_input() {
    assert_eq!(scan_errors(""), vec![ScanError::EmptyInput]);
    assert_eq!(scan_errors("  \n# nothing here\n\t\n"), vec![ScanError::EmptyInput]);
}

#[test]
fn text_before_first_tag_is_invalid() {
    let errors = scan_errors("hello\n<body>\nx:int");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ScanError::InvalidTagDeclaration { at } => {
            assert_eq!(at.line, 1);
            assert_eq!(at.text, "hello");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn scan_errors_are_batched() {
    let errors = scan_errors("junk\n<objects>\nA\na:int\n<objects>\nB\nb:int\n");
    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], ScanError::InvalidTagDeclaration { .. }));
    match &errors[1] {
        ScanError::DuplicateTag { tag, first, duplicate } => {
            assert_eq!(tag, "<objects>");
            assert_eq!(first.line, 2);
            assert_eq!(duplicate.line, 5);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(errors[2], ScanError::MissingBodyTag);
}

#[test]
fn tags_may_carry_comments() {
    let plan = compile("<body>   # the root\nx:int # a number").expect("compile");
    assert_eq!(plan.root().fields().count(), 1);
}

// ==================== Syntax ====================

#[test]
fn concatenated_fields_share_a_line() {
    let plan = compile("<body>\na:int b:float c:bool d:string").expect("compile");
    let kinds: Vec<String> = plan.root().fields().map(|f| f.kind.to_string()).collect();
    assert_eq!(kinds, vec!["int", "float", "bool", "string"]);
    assert_eq!(plan.root().lines.len(), 1);
}

#[test]
fn malformed_lines_in_several_classes_are_all_reported() {
    let src = "<objects>\nA\na:int ?\nB\nb:int\nC\nc:int extra\n<body>\nx:B";
    let errors = syntax_errors(src);
    let classes: Vec<&str> = errors
        .iter()
        .map(|e| match e {
            SyntaxError::MalformedFieldLine { class_name, .. } => class_name.as_str(),
            _ => "",
        })
        .collect();
    assert_eq!(classes, vec!["A", "C"]);
    assert!(errors[1].to_string().contains("column 7"));
}

#[test]
fn body_malformed_line_has_no_header() {
    let errors = syntax_errors("<body>\nname string");
    match &errors[0] {
        SyntaxError::MalformedFieldLine { header, column, .. } => {
            assert!(header.is_none());
            assert_eq!(*column, 1);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn objects_section_must_start_with_a_header() {
    let errors = syntax_errors("<objects>\nx:int\nP\ny:int\n<body>\np:P");
    assert!(matches!(
        &errors[0],
        SyntaxError::InvalidObjectHeader { at } if at.line == 2
    ));
}

#[test]
fn head_sets_the_line_delimiter() {
    let plan = compile("<head>\ndelimiter \" | \"\n<body>\na:int b:int").expect("compile");
    assert_eq!(plan.line_delimiter(), " | ");
    let plan = compile("<body>\na:int").expect("compile");
    assert_eq!(plan.line_delimiter(), " ");
}

#[test]
fn head_rejects_other_content() {
    let errors = syntax_errors("<head>\nseparator \",\"\n<body>\na:int");
    assert!(matches!(
        errors[0],
        SyntaxError::ExpectedDelimiterDeclaration { .. }
    ));
}

#[test]
fn options_section_is_ignored() {
    let plan = compile("<options>\nstrict yes\n<body>\na:int").expect("compile");
    assert_eq!(plan.classes().len(), 1);
}

// ==================== Semantics: names ====================

#[test]
fn names_are_unique_across_the_file() {
    let errors = semantic_errors("<objects>\nA\nx:int\nB\nx:string\n<body>\nb:B");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        SemanticError::NameCollision {
            class_name,
            name,
            at,
            previous,
        } => {
            assert_eq!(class_name, "B");
            assert_eq!(name, "x");
            assert_eq!(at.line, 5);
            assert_eq!(previous.as_ref().map(|p| p.line), Some(3));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn field_cannot_reuse_a_class_name() {
    let errors = semantic_errors("<objects>\nPoint\nx:int\n<body>\nPoint:Point");
    assert!(matches!(
        &errors[0],
        SemanticError::NameCollision { name, .. } if name == "Point"
    ));
}

#[test]
fn primitive_keywords_are_reserved() {
    for keyword in ["int", "float", "bool", "string", "list"] {
        let errors = semantic_errors(&format!("<body>\n{}:int", keyword));
        assert!(
            matches!(&errors[0], SemanticError::NameCollision { previous: None, .. }),
            "{} should be reserved",
            keyword
        );
    }
    let errors = semantic_errors("<objects>\nstring\na:int\n<body>\nb:int");
    assert!(matches!(&errors[0], SemanticError::NameCollision { .. }));
}

#[test]
fn body_is_a_reserved_class_name() {
    let errors = semantic_errors("<objects>\nBody\na:int\n<body>\nb:int");
    assert!(matches!(&errors[0], SemanticError::NameCollision { name, .. } if name == "Body"));
}

// ==================== Semantics: types ====================

#[test]
fn forward_references_are_unknown_types() {
    let errors = semantic_errors("<objects>\nA\nb:B\nB\nx:int\n<body>\na:A");
    match &errors[0] {
        SemanticError::UnknownType {
            class_name,
            type_name,
            problem,
            ..
        } => {
            assert_eq!(class_name, "A");
            assert_eq!(type_name, "B");
            assert_eq!(*problem, TypeProblem::Undeclared);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn nested_lists_are_rejected_for_every_element() {
    for element in ["int", "float", "bool", "string", "list(int)"] {
        let errors = semantic_errors(&format!("<body>\nxs:list(list({}))", element));
        assert!(
            matches!(
                &errors[0],
                SemanticError::UnknownType { problem: TypeProblem::BadListElement, .. }
            ),
            "list(list({})) should be rejected",
            element
        );
    }
}

#[test]
fn list_of_class_is_rejected() {
    let errors = semantic_errors("<objects>\nP\nx:int\n<body>\nps:list(P)");
    assert!(matches!(
        &errors[0],
        SemanticError::UnknownType { problem: TypeProblem::BadListElement, .. }
    ));
}

#[test]
fn resolved_kinds() {
    let plan = compile("<objects>\nP\nx:int\n<body>\np:P\nxs:list(float)").expect("compile");
    let kinds: Vec<FieldKind> = plan.root().fields().map(|f| f.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            FieldKind::ClassRef("P".to_string()),
            FieldKind::List(instaparse::ScalarKind::Float)
        ]
    );
}

// ==================== Semantics: structure ====================

#[test]
fn list_must_be_last_on_its_line() {
    let errors = semantic_errors("<body>\nxs:list(int) y:int");
    assert!(matches!(
        &errors[0],
        SemanticError::StructuralViolation { rule: StructureRule::ListNotLast, .. }
    ));
}

#[test]
fn class_field_must_be_alone() {
    let errors = semantic_errors("<objects>\nP\nx:int\n<body>\nn:int p:P");
    assert!(matches!(
        &errors[0],
        SemanticError::StructuralViolation { rule: StructureRule::ClassNotAlone, .. }
    ));
}

#[test]
fn repetition_on_a_split_line_is_ignored() {
    let plan = compile("<body>\nn:int xs:int:3!").expect("compile");
    let line = &plan.root().lines[0];
    assert_eq!(line.repetition, RepetitionKind::None);
    let reps: Vec<RepetitionKind> = line.fields.iter().map(|f| f.repetition.clone()).collect();
    assert_eq!(reps, vec![RepetitionKind::None, RepetitionKind::None]);
    assert!(!line.fields[1].newline_separated);

    let v = DocumentParser::new(&plan).parse_str("4 5\n").expect("parse");
    assert_eq!(v.get("xs").and_then(Value::as_i64), Some(5));
}

#[test]
fn checks_run_names_then_types_then_structure() {
    // Both a reserved name and an unknown type on one field: the name is reported.
    let errors = semantic_errors("<body>\nint:Missing");
    assert!(matches!(&errors[0], SemanticError::NameCollision { .. }));
    // A misplaced list with a bad element type: the type is reported.
    let errors = semantic_errors("<body>\nxs:list(Missing) y:int");
    assert!(matches!(&errors[0], SemanticError::UnknownType { .. }));
    // Fields are checked left to right.
    let errors = semantic_errors("<body>\nxs:list(int) y:Missing");
    assert!(matches!(
        &errors[0],
        SemanticError::StructuralViolation { rule: StructureRule::ListNotLast, .. }
    ));
}

#[test]
fn one_error_per_class_and_later_classes_are_still_checked() {
    let src = "<objects>\nA\na:Nope\nb:Nope\nB\nc:list(list(int))\nC\nd:int\n<body>\ne:C";
    let errors = semantic_errors(src);
    let classes: Vec<&str> = errors.iter().map(|e| e.class_name()).collect();
    assert_eq!(classes, vec!["A", "B"]);
}

// ==================== Semantics: repetition ====================

#[test]
fn repetition_kinds_are_resolved_once() {
    let src = "<objects>\nFoo\nv:int\n<body>\ncount:int\nitems:Foo:count\nmany:int:*\nsome:int:+!\nthree:string:3";
    let plan = compile(src).expect("compile");
    let reps: Vec<RepetitionKind> = plan.root().fields().map(|f| f.repetition.clone()).collect();
    assert_eq!(
        reps,
        vec![
            RepetitionKind::None,
            RepetitionKind::Variable("count".to_string()),
            RepetitionKind::ZeroOrMore,
            RepetitionKind::OneOrMore,
            RepetitionKind::Fixed(3),
        ]
    );
    let some = plan.root().fields().find(|f| f.name == "some").expect("some");
    assert!(some.newline_separated);
}

#[test]
fn repetition_references_are_checked() {
    let cases = [
        ("<body>\nitems:int:count", ReferenceProblem::Undeclared),
        ("<body>\nitems:int:count\ncount:int", ReferenceProblem::Undeclared),
        ("<body>\ncount:string\nitems:int:count", ReferenceProblem::NotInteger),
        ("<body>\ncount:int:2\nitems:int:count", ReferenceProblem::Repeated),
        ("<body>\nitems:int:items", ReferenceProblem::SelfReference),
        (
            "<body>\nitems:int:99999999999999999999999",
            ReferenceProblem::OutOfRange,
        ),
    ];
    for (src, expected) in cases {
        let errors = semantic_errors(src);
        match &errors[0] {
            SemanticError::InvalidRepetitionReference { problem, .. } => {
                assert_eq!(*problem, expected, "{}", src)
            }
            other => panic!("{}: unexpected {:?}", src, other),
        }
    }
}

#[test]
fn count_field_must_be_in_the_same_class() {
    let errors = semantic_errors("<objects>\nA\nn:int\n<body>\na:A\nitems:int:n");
    assert!(matches!(
        &errors[0],
        SemanticError::InvalidRepetitionReference { problem: ReferenceProblem::Undeclared, .. }
    ));
}

// ==================== Diagnostics ====================

#[test]
fn diagnostics_render_with_line_markers() {
    let err = compile("<body>\nx:int\nx:int").unwrap_err();
    let diags = err.diagnostics();
    assert_eq!(diags.len(), 1);
    assert!(diags[0].starts_with("Error: Name conflict in \"Body\""));
    assert!(diags[0].contains("\n    at line 2:\t\"x:int\"\n    at line 3:\t\"x:int\""));
}

#[test]
fn compile_file_reports_missing_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = instaparse::compile_file(dir.path().join("missing.fmt")).unwrap_err();
    assert!(matches!(err, CompileError::FileAccess { .. }));
    assert_eq!(err.count(), 1);
}
