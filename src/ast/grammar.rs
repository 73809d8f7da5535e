//! The two grammar tables the parser walks (§4.2): an expression grammar
//! keyed by `ExprKind`, and an ordered statement grammar. Both are built
//! once, lazily, and never mutated afterwards.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ast::ExprKind;
use crate::isa::AddressingMode;
use crate::token::{TokTag, Value};

/// One element of a pattern: a literal token kind, a `Number` token
/// constrained to a specific nominal width (the lexer already folds
/// hex/bin/dec literals into a sized `Number`, so "hex-word | dec-word |
/// bin-word" collapses to "a Number token of width 1"), or a reference to
/// another expression kind to match recursively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternPart {
    Token(TokTag),
    NumberSized(u8),
    Expr(ExprKind),
}

/// An ordered sequence of pattern parts plus the metadata values the rule
/// itself contributes on a successful match (§4.2: "the matched pattern's
/// own metadata values").
#[derive(Debug, Clone)]
pub struct Pattern {
    pub parts: Vec<PatternPart>,
    pub metadata: Vec<Value>,
}

impl Pattern {
    fn new(parts: Vec<PatternPart>, metadata: Vec<Value>) -> Self {
        Self { parts, metadata }
    }
}

/// One alternative of the statement grammar: an ordered sequence of
/// expression kinds. `repeat_last` marks the directive/constant-list
/// extension (§4.2 "Resolved open point"): after the listed parts match,
/// the parser keeps matching `(',' <last kind>)*`.
#[derive(Debug, Clone)]
pub struct StmtPattern {
    pub parts: Vec<ExprKind>,
    pub repeat_last: bool,
}

impl StmtPattern {
    fn new(parts: Vec<ExprKind>) -> Self {
        Self { parts, repeat_last: false }
    }

    fn repeating(parts: Vec<ExprKind>) -> Self {
        Self { parts, repeat_last: true }
    }
}

pub static EXPRESSION_GRAMMAR: Lazy<HashMap<ExprKind, Vec<Pattern>>> =
    Lazy::new(build_expression_grammar);

pub static STATEMENT_GRAMMAR: Lazy<Vec<StmtPattern>> = Lazy::new(build_statement_grammar);

fn build_expression_grammar() -> HashMap<ExprKind, Vec<Pattern>> {
    use ExprKind::*;
    use PatternPart::*;

    let mut g: HashMap<ExprKind, Vec<Pattern>> = HashMap::new();

    g.insert(Comment, vec![Pattern::new(vec![Token(TokTag::Comment)], vec![])]);

    g.insert(Mnemonic, vec![Pattern::new(vec![Token(TokTag::Mnemonic)], vec![])]);

    g.insert(
        LabelDef,
        vec![Pattern::new(vec![Token(TokTag::Identifier), Token(TokTag::Colon)], vec![])],
    );

    g.insert(
        NamedConstantDef,
        vec![Pattern::new(
            vec![Token(TokTag::Identifier), Token(TokTag::Equals), Expr(Constant)],
            vec![],
        )],
    );

    g.insert(Directive, vec![Pattern::new(vec![Token(TokTag::Directive)], vec![])]);

    g.insert(
        QWord,
        vec![Pattern::new(vec![NumberSized(4)], vec![Value::OperandSize(4)])],
    );
    g.insert(
        DWord,
        vec![Pattern::new(vec![NumberSized(2)], vec![Value::OperandSize(2)])],
    );
    g.insert(
        Word,
        vec![
            Pattern::new(vec![NumberSized(1)], vec![Value::OperandSize(1)]),
            // mask reduces a wider literal to one byte
            Pattern::new(vec![Expr(Mask), Expr(DWord)], vec![Value::OperandSize(1)]),
        ],
    );

    // The `<`/`>` tokens already yield their own `Value::Mask` via
    // `Token::to_value`, so these rules carry no extra metadata of their
    // own -- adding it here would duplicate the tag in the flattened list.
    g.insert(
        Mask,
        vec![
            Pattern::new(vec![Token(TokTag::GreaterThan)], vec![]),
            Pattern::new(vec![Token(TokTag::LessThan)], vec![]),
        ],
    );

    g.insert(
        Target,
        vec![
            Pattern::new(
                vec![Expr(DWord), Token(TokTag::Comma), Token(TokTag::RegX)],
                vec![Value::AddressingMode(AddressingMode::Abx)],
            ),
            Pattern::new(
                vec![Expr(DWord), Token(TokTag::Comma), Token(TokTag::RegY)],
                vec![Value::AddressingMode(AddressingMode::Aby)],
            ),
            Pattern::new(
                vec![Expr(Word), Token(TokTag::Comma), Token(TokTag::RegX)],
                vec![Value::AddressingMode(AddressingMode::Zpx)],
            ),
            Pattern::new(
                vec![Expr(Word), Token(TokTag::Comma), Token(TokTag::RegY)],
                vec![Value::AddressingMode(AddressingMode::Zpy)],
            ),
            Pattern::new(vec![Expr(DWord)], vec![Value::AddressingMode(AddressingMode::Abs)]),
            Pattern::new(vec![Expr(Word)], vec![Value::AddressingMode(AddressingMode::Zrp)]),
            Pattern::new(
                vec![Token(TokTag::LeftParen), Expr(DWord), Token(TokTag::RightParen)],
                vec![Value::AddressingMode(AddressingMode::Ind)],
            ),
            Pattern::new(
                vec![
                    Token(TokTag::LeftParen),
                    Expr(Word),
                    Token(TokTag::Comma),
                    Token(TokTag::RegX),
                    Token(TokTag::RightParen),
                ],
                vec![Value::AddressingMode(AddressingMode::Izx)],
            ),
            Pattern::new(
                vec![
                    Token(TokTag::LeftParen),
                    Expr(Word),
                    Token(TokTag::RightParen),
                    Token(TokTag::Comma),
                    Token(TokTag::RegY),
                ],
                vec![Value::AddressingMode(AddressingMode::Izy)],
            ),
        ],
    );

    g.insert(
        Number,
        vec![
            Pattern::new(vec![Expr(QWord)], vec![]),
            Pattern::new(vec![Expr(DWord)], vec![]),
            Pattern::new(vec![Expr(Word)], vec![]),
        ],
    );

    g.insert(
        ArithmeticOperator,
        vec![
            Pattern::new(vec![Token(TokTag::Plus)], vec![]),
            Pattern::new(vec![Token(TokTag::Minus)], vec![]),
        ],
    );

    g.insert(
        Constant,
        vec![
            Pattern::new(
                vec![Token(TokTag::Identifier), Expr(ArithmeticOperator), Expr(Constant)],
                vec![],
            ),
            Pattern::new(vec![Expr(Number), Expr(ArithmeticOperator), Expr(Constant)], vec![]),
            Pattern::new(vec![Token(TokTag::Identifier)], vec![]),
            Pattern::new(vec![Expr(Number)], vec![]),
            Pattern::new(vec![Expr(Mask), Expr(Constant)], vec![]),
        ],
    );

    g.insert(
        ImmValue,
        vec![Pattern::new(vec![Token(TokTag::Pound), Expr(Constant)], vec![Value::Imm])],
    );

    g
}

fn build_statement_grammar() -> Vec<StmtPattern> {
    use ExprKind::*;

    vec![
        StmtPattern::new(vec![Comment]),
        StmtPattern::new(vec![LabelDef]),
        StmtPattern::new(vec![NamedConstantDef]),
        StmtPattern::repeating(vec![Directive, Constant]),
        StmtPattern::new(vec![Directive]),
        StmtPattern::new(vec![Mnemonic, ImmValue]),
        StmtPattern::new(vec![Mnemonic, Target]),
        StmtPattern::new(vec![Mnemonic, Constant]),
        StmtPattern::new(vec![Mnemonic]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_tries_indexed_forms_before_bare_ones() {
        let target = &EXPRESSION_GRAMMAR[&ExprKind::Target];
        let abs_idx = target
            .iter()
            .position(|p| p.metadata == vec![Value::AddressingMode(AddressingMode::Abs)])
            .unwrap();
        let abx_idx = target
            .iter()
            .position(|p| p.metadata == vec![Value::AddressingMode(AddressingMode::Abx)])
            .unwrap();
        assert!(abx_idx < abs_idx, "ABX must be tried before the shorter ABS alternative");
    }

    #[test]
    fn statement_grammar_tries_specific_mnemonic_forms_first() {
        let imm_idx = STATEMENT_GRAMMAR
            .iter()
            .position(|p| p.parts == vec![ExprKind::Mnemonic, ExprKind::ImmValue])
            .unwrap();
        let bare_idx = STATEMENT_GRAMMAR
            .iter()
            .position(|p| p.parts == vec![ExprKind::Mnemonic])
            .unwrap();
        assert!(imm_idx < bare_idx);
    }

    #[test]
    fn directive_constant_list_marks_repeat_last() {
        let directive_list = STATEMENT_GRAMMAR
            .iter()
            .find(|p| p.parts == vec![ExprKind::Directive, ExprKind::Constant])
            .unwrap();
        assert!(directive_list.repeat_last);
    }

    #[test]
    fn every_expr_kind_used_by_statement_grammar_has_patterns() {
        for stmt in STATEMENT_GRAMMAR.iter() {
            for kind in &stmt.parts {
                assert!(EXPRESSION_GRAMMAR.contains_key(kind), "missing rules for {kind:?}");
            }
        }
    }
}
