//! Human-readable rendering of parse plans and parsed values.

use crate::plan::{LineShape, ParsePlan};
use crate::value::Value;

/// Render a plan: delimiter and root, then each class with one line per format line.
///
/// ```text
/// delimiter " "
/// root Body
///
/// Point
///   x:int y:int
///
/// Body
///   points:Point:+
/// ```
pub fn dump_plan(plan: &ParsePlan) -> String {
    let mut lines = vec![
        format!("delimiter \"{}\"", plan.line_delimiter()),
        format!("root {}", plan.root_type_name()),
    ];
    for class in plan.classes() {
        lines.push(String::new());
        lines.push(class.name.clone());
        for line in &class.lines {
            let text = match line.shape() {
                LineShape::Blank => "(blank)".to_string(),
                LineShape::Simple(f) | LineShape::Repeating(f) => f.to_string(),
                LineShape::Split(fields) => fields
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
            };
            lines.push(format!("  {}", text));
        }
    }
    lines.join("\n")
}

/// Raw scalar string; compound values fall back to debug output.
pub fn format_scalar(v: &Value) -> String {
    match v {
        Value::Int(x) => format!("{}", x),
        Value::Float(x) => format!("{}", x),
        Value::Bool(x) => format!("{}", x),
        Value::String(s) => format!("{:?}", s),
        _ => format!("{:?}", v),
    }
}

/// Multi-line rendering of a value. Record keys are sorted.
pub fn format_value(v: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match v {
        Value::List(items) if items.is_empty() => format!("{}[]", pad),
        Value::List(items) if items.iter().all(|i| !matches!(i, Value::Record(_))) => {
            let parts: Vec<String> = items.iter().map(format_scalar).collect();
            format!("{}[{}]", pad, parts.join(", "))
        }
        Value::List(items) => {
            let mut lines = vec![format!("{}[", pad)];
            for (i, item) in items.iter().enumerate() {
                let sub = format_value(item, indent + 1);
                lines.push(format!("{}  [{}] {}", pad, i, sub.trim_start()));
            }
            lines.push(format!("{}]", pad));
            lines.join("\n")
        }
        Value::Record(m) => {
            let mut lines = vec![format!("{}{{", pad)];
            let mut keys: Vec<_> = m.keys().collect();
            keys.sort();
            for k in keys {
                if let Some(val) = m.get(k) {
                    let sub = format_value(val, indent + 1);
                    lines.push(format!("{}  {}: {}", pad, k, sub.trim_start()));
                }
            }
            lines.push(format!("{}}}", pad));
            lines.join("\n")
        }
        scalar => format!("{}{}", pad, format_scalar(scalar)),
    }
}
