//! Name, type and placement checks over the object model.
//!
//! Classes are checked in file order and fields in declaration order. For every field the name is
//! checked first, then its type, then where it sits on its line, so the first error reported for a
//! class does not depend on anything but the file contents.

use crate::ast::{ClassDeclaration, FieldDeclaration, TypeExpr, RESERVED_NAMES};
use crate::error::{LineMarker, SemanticError, StructureRule, TypeProblem};
use crate::plan::{FieldKind, ScalarKind};
use std::collections::HashMap;

/// Index of a symbol in the table.
pub type SymbolId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A class; `complete` once its whole block has been checked and it may be referenced.
    Class { complete: bool },
    /// A field of the class with the given symbol.
    Field { class: SymbolId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub at: LineMarker,
}

/// Every class and field name declared so far, file-wide.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|&id| &self.symbols[id])
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// True if `name` is a class whose block has been fully checked.
    pub fn is_declared_class(&self, name: &str) -> bool {
        matches!(
            self.lookup(name).map(|s| s.kind),
            Some(SymbolKind::Class { complete: true })
        )
    }

    fn insert(&mut self, name: &str, kind: SymbolKind, at: &LineMarker) -> SymbolId {
        let id = self.symbols.len();
        self.symbols.push(Symbol {
            name: name.to_string(),
            kind,
            at: at.clone(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Reject `name` if it is reserved or already taken, otherwise record it.
    fn declare(
        &mut self,
        class_name: &str,
        name: &str,
        kind: SymbolKind,
        at: &LineMarker,
    ) -> Result<SymbolId, SemanticError> {
        if RESERVED_NAMES.contains(&name) {
            return Err(SemanticError::NameCollision {
                class_name: class_name.to_string(),
                name: name.to_string(),
                at: at.clone(),
                previous: None,
            });
        }
        if let Some(previous) = self.lookup(name) {
            return Err(SemanticError::NameCollision {
                class_name: class_name.to_string(),
                name: name.to_string(),
                at: at.clone(),
                previous: Some(previous.at.clone()),
            });
        }
        Ok(self.insert(name, kind, at))
    }
}

/// Checks classes one at a time against everything declared before them.
#[derive(Debug, Default)]
pub struct Validator {
    symbols: SymbolTable,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Check one class and return the resolved kind of every field, line by line.
    ///
    /// Stops at the first error. The class becomes referenceable afterwards either way, so later
    /// classes using it are not reported a second time.
    pub fn check_class(
        &mut self,
        class: &ClassDeclaration,
    ) -> Result<Vec<Vec<FieldKind>>, SemanticError> {
        let class_id = self.symbols.declare(
            &class.name,
            &class.name,
            SymbolKind::Class { complete: false },
            &class.header,
        )?;
        let result = self.check_lines(class, class_id);
        if let Some(symbol) = self.symbols.symbols.get_mut(class_id) {
            symbol.kind = SymbolKind::Class { complete: true };
        }
        result
    }

    fn check_lines(
        &mut self,
        class: &ClassDeclaration,
        class_id: SymbolId,
    ) -> Result<Vec<Vec<FieldKind>>, SemanticError> {
        let mut kinds = Vec::with_capacity(class.lines.len());
        for line in &class.lines {
            let mut line_kinds = Vec::with_capacity(line.fields.len());
            for (pos, field) in line.fields.iter().enumerate() {
                self.symbols.declare(
                    &class.name,
                    &field.name,
                    SymbolKind::Field { class: class_id },
                    &field.at,
                )?;
                let kind = self.resolve_type(&class.name, field)?;
                check_placement(&class.name, field, &kind, pos, line.fields.len())?;
                line_kinds.push(kind);
            }
            kinds.push(line_kinds);
        }
        Ok(kinds)
    }

    /// Resolve a field's written type against primitives and earlier classes.
    pub fn resolve_type(
        &self,
        class_name: &str,
        field: &FieldDeclaration,
    ) -> Result<FieldKind, SemanticError> {
        let error = |problem| SemanticError::UnknownType {
            class_name: class_name.to_string(),
            field: field.name.clone(),
            type_name: field.type_expr.to_string(),
            problem,
            at: field.at.clone(),
        };
        match &field.type_expr {
            TypeExpr::List(element) => match element.as_ref() {
                TypeExpr::Named(name) => ScalarKind::from_keyword(name)
                    .map(FieldKind::List)
                    .ok_or_else(|| error(TypeProblem::BadListElement)),
                TypeExpr::List(_) => Err(error(TypeProblem::BadListElement)),
            },
            TypeExpr::Named(name) => {
                if let Some(scalar) = ScalarKind::from_keyword(name) {
                    Ok(FieldKind::from(scalar))
                } else if self.symbols.is_declared_class(name) {
                    Ok(FieldKind::ClassRef(name.clone()))
                } else {
                    Err(error(TypeProblem::Undeclared))
                }
            }
        }
    }
}

fn check_placement(
    class_name: &str,
    field: &FieldDeclaration,
    kind: &FieldKind,
    pos: usize,
    count: usize,
) -> Result<(), SemanticError> {
    let rule = if count < 2 {
        None
    } else if matches!(kind, FieldKind::List(_)) && pos + 1 != count {
        Some(StructureRule::ListNotLast)
    } else if matches!(kind, FieldKind::ClassRef(_)) {
        Some(StructureRule::ClassNotAlone)
    } else {
        None
    };
    match rule {
        Some(rule) => Err(SemanticError::StructuralViolation {
            class_name: class_name.to_string(),
            field: field.name.clone(),
            rule,
            at: field.at.clone(),
        }),
        None => Ok(()),
    }
}
