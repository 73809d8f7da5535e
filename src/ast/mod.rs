//! Parse tree types shared between the parser, resolver and encoder (§3).

use std::collections::HashMap;

use derive_more::Display;

use crate::isa::{AddressingMode, Mnemonic};
use crate::token::{ArithOp, DirectiveKind, MaskKind, Value};

pub mod grammar;

/// The kind of parse node an `Expression` reduces to. Mirrors the grammar's
/// named rules in §4.2, not the lexer's token kinds.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Comment,
    Mnemonic,
    LabelDef,
    NamedConstantDef,
    Directive,
    Word,
    DWord,
    QWord,
    Number,
    Mask,
    Target,
    ArithmeticOperator,
    Constant,
    ImmValue,
}

/// An intermediate parse node: a kind plus the flattened list of typed
/// values collected from its matched children and its own rule metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExprKind,
    pub values: Vec<Value>,
    pub line: usize,
}

impl Expression {
    pub fn new(kind: ExprKind, values: Vec<Value>, line: usize) -> Self {
        Self { kind, values, line }
    }
}

/// One operand position inside a flattened `ConstantFormula`: either an
/// integer literal or a reference to a named constant/label, carrying an
/// optional explicit size and an optional mask tag.
#[derive(Debug, Clone, PartialEq)]
pub enum OperandValue {
    Literal(i64),
    Identifier(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperandTerm {
    pub value: OperandValue,
    pub size: Option<u8>,
    pub mask: Option<MaskKind>,
}

/// A flattened left-to-right arithmetic expression: N operands, N-1
/// operators (§3). Addition and subtraction only, no precedence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantFormula {
    pub terms: Vec<OperandTerm>,
    pub operators: Vec<ArithOp>,
}

impl ConstantFormula {
    pub fn single(term: OperandTerm) -> Self {
        Self { terms: vec![term], operators: Vec::new() }
    }

    pub fn push(&mut self, op: ArithOp, term: OperandTerm) {
        self.operators.push(op);
        self.terms.push(term);
    }

    /// `values.length == operators.length + 1` (§3 invariant).
    pub fn is_well_formed(&self) -> bool {
        self.terms.len() == self.operators.len() + 1
    }
}

/// A top-level parse result (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Instruction {
        mnemonic: Mnemonic,
        addressing_mode: Option<AddressingMode>,
        constant_formula: Option<ConstantFormula>,
        line: usize,
    },
    LabelDef {
        name: String,
        line: usize,
    },
    NamedConstantDef {
        name: String,
        constant_formula: ConstantFormula,
        line: usize,
    },
    Directive {
        directive: DirectiveKind,
        params: Vec<ConstantFormula>,
        line: usize,
    },
    Comment {
        line: usize,
    },
}

impl Statement {
    pub fn line(&self) -> usize {
        match self {
            Statement::Instruction { line, .. }
            | Statement::LabelDef { line, .. }
            | Statement::NamedConstantDef { line, .. }
            | Statement::Directive { line, .. }
            | Statement::Comment { line } => *line,
        }
    }
}

/// `{ name, value, size }` (§3). Labels are named constants with a fixed
/// size of 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedConstant {
    pub value: i32,
    pub size: u8,
}

/// Mapping name -> resolved value, built by the resolver and immutable
/// thereafter (§3). Wrapped rather than a bare `HashMap` so duplicate
/// insertion is caught in one place.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: HashMap<String, NamedConstant>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new symbol. Returns `false` if `name` is already bound
    /// (callers turn that into a duplicate-label/constant error with their
    /// own line-number context).
    pub fn insert(&mut self, name: impl Into<String>, value: i32, size: u8) -> bool {
        let name = name.into();
        if self.symbols.contains_key(&name) {
            return false;
        }
        self.symbols.insert(name, NamedConstant { value, size });
        true
    }

    pub fn get(&self, name: &str) -> Option<&NamedConstant> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_formula_well_formed_invariant() {
        let mut formula = ConstantFormula::single(OperandTerm {
            value: OperandValue::Literal(1),
            size: Some(1),
            mask: None,
        });
        assert!(formula.is_well_formed());
        formula.push(
            ArithOp::Add,
            OperandTerm { value: OperandValue::Literal(2), size: Some(1), mask: None },
        );
        assert!(formula.is_well_formed());
        assert_eq!(formula.terms.len(), formula.operators.len() + 1);
    }

    #[test]
    fn symbol_table_rejects_duplicate_insert() {
        let mut table = SymbolTable::new();
        assert!(table.insert("FOO", 10, 2));
        assert!(!table.insert("FOO", 20, 2));
        assert_eq!(table.get("FOO").unwrap().value, 10);
    }
}
