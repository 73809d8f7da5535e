//! Table-driven recursive-descent parser (§4.2). Walks the grammar tables
//! in `crate::ast::grammar` against one line of tokens at a time.

use crate::ast::grammar::{Pattern, PatternPart, StmtPattern, EXPRESSION_GRAMMAR, STATEMENT_GRAMMAR};
use crate::ast::{ConstantFormula, ExprKind, OperandTerm, OperandValue, Statement};
use crate::token::{ArithOp, Token, TokTag, TokenKind, Value};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("parse error at line {line}: no grammar rule matches the remaining tokens")]
    NoRuleMatched { line: usize },

    #[error("parse error at line {line}: malformed constant expression")]
    MalformedConstant { line: usize },
}

/// Parses every line's tokens into its statement(s), in source order.
pub fn parse(lines: &[Vec<Token>]) -> Result<Vec<Statement>, ParserError> {
    let mut statements = Vec::new();
    for line in lines {
        statements.extend(parse_line(line)?);
    }
    Ok(statements)
}

/// `parse(tokens)` from §4.2: repeatedly match a statement off the front of
/// the line until no tokens remain.
fn parse_line(tokens: &[Token]) -> Result<Vec<Statement>, ParserError> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        let (statement, consumed) = match_next_statement(tokens, pos)?;
        debug_assert!(consumed > pos, "a statement match must consume at least one token");
        out.push(statement);
        pos = consumed;
    }
    Ok(out)
}

/// One fully-matched statement alternative: the values collected for each
/// non-repeated part, in pattern order, plus (only when the pattern is a
/// `repeat_last` one) the values collected for each repetition, kept
/// separate so a directive's parameter list doesn't collapse into one
/// formula.
struct StmtMatch {
    parts: Vec<Vec<Value>>,
    repeated: Vec<Vec<Value>>,
    consumed: usize,
}

fn match_next_statement(tokens: &[Token], pos: usize) -> Result<(Statement, usize), ParserError> {
    let line = tokens.get(pos).map(|t| t.line).unwrap_or(0);
    for stmt_pattern in STATEMENT_GRAMMAR.iter() {
        if let Some(m) = match_stmt_pattern(tokens, pos, stmt_pattern) {
            let consumed = m.consumed;
            let statement = construct_statement(stmt_pattern, m, line)?;
            return Ok((statement, consumed));
        }
    }
    Err(ParserError::NoRuleMatched { line })
}

fn match_stmt_pattern(tokens: &[Token], pos: usize, pattern: &StmtPattern) -> Option<StmtMatch> {
    let mut cur = pos;
    let mut parts = Vec::new();
    let last = pattern.parts.len().saturating_sub(1);

    for (i, kind) in pattern.parts.iter().enumerate() {
        if pattern.repeat_last && i == last {
            break;
        }
        let (values, next) = match_expr(tokens, cur, *kind)?;
        parts.push(values);
        cur = next;
    }

    let mut repeated = Vec::new();
    if pattern.repeat_last {
        let kind = *pattern.parts.last().expect("statement pattern must not be empty");
        let (values, next) = match_expr(tokens, cur, kind)?;
        repeated.push(values);
        cur = next;
        loop {
            let Some(comma_tok) = tokens.get(cur) else { break };
            if comma_tok.tag() != TokTag::Comma {
                break;
            }
            match match_expr(tokens, cur + 1, kind) {
                Some((values, next)) => {
                    repeated.push(values);
                    cur = next;
                }
                None => break,
            }
        }
    }

    Some(StmtMatch { parts, repeated, consumed: cur })
}

/// Matches expression kind `kind` starting at `pos`, trying each of its
/// registered patterns in order and returning the first success.
fn match_expr(tokens: &[Token], pos: usize, kind: ExprKind) -> Option<(Vec<Value>, usize)> {
    let patterns = EXPRESSION_GRAMMAR.get(&kind)?;
    for pattern in patterns {
        if let Some((mut values, next)) = match_pattern(tokens, pos, pattern) {
            values.extend(pattern.metadata.iter().cloned());
            return Some((values, next));
        }
    }
    None
}

fn match_pattern(tokens: &[Token], pos: usize, pattern: &Pattern) -> Option<(Vec<Value>, usize)> {
    let mut cur = pos;
    let mut values = Vec::new();

    for part in &pattern.parts {
        match part {
            PatternPart::Token(tag) => {
                let tok = tokens.get(cur)?;
                if tok.tag() != *tag {
                    return None;
                }
                if let Some(v) = tok.to_value() {
                    values.push(v);
                }
                cur += 1;
            }
            PatternPart::NumberSized(size) => {
                let tok = tokens.get(cur)?;
                match &tok.kind {
                    TokenKind::Number(n) if n.size == *size => {
                        values.push(tok.to_value().expect("number tokens always have a value"));
                        cur += 1;
                    }
                    _ => return None,
                }
            }
            PatternPart::Expr(sub_kind) => {
                let (sub_values, next) = match_expr(tokens, cur, *sub_kind)?;
                values.extend(sub_values);
                cur = next;
            }
        }
    }

    Some((values, cur))
}

fn construct_statement(
    pattern: &StmtPattern,
    m: StmtMatch,
    line: usize,
) -> Result<Statement, ParserError> {
    let StmtMatch { mut parts, repeated, .. } = m;

    match pattern.parts[0] {
        ExprKind::Comment => Ok(Statement::Comment { line }),

        ExprKind::LabelDef => {
            let name = take_identifier(&parts[0], line)?;
            Ok(Statement::LabelDef { name, line })
        }

        ExprKind::NamedConstantDef => {
            let values = parts.remove(0);
            let (name, rest) = split_identifier(&values, line)?;
            let constant_formula = build_formula(rest, line)?;
            Ok(Statement::NamedConstantDef { name, constant_formula, line })
        }

        ExprKind::Directive => {
            let values = &parts[0];
            let directive = values
                .iter()
                .find_map(|v| match v {
                    Value::Directive(d) => Some(*d),
                    _ => None,
                })
                .ok_or(ParserError::NoRuleMatched { line })?;
            let params = repeated
                .into_iter()
                .map(|vs| build_formula(&vs, line))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Statement::Directive { directive, params, line })
        }

        ExprKind::Mnemonic => {
            let mnemonic_values = &parts[0];
            let mnemonic = mnemonic_values
                .iter()
                .find_map(|v| match v {
                    Value::Mnemonic(m) => Some(*m),
                    _ => None,
                })
                .ok_or(ParserError::NoRuleMatched { line })?;

            match pattern.parts.get(1) {
                None => Ok(Statement::Instruction {
                    mnemonic,
                    addressing_mode: None,
                    constant_formula: None,
                    line,
                }),
                Some(ExprKind::ImmValue) => {
                    let values = &parts[1];
                    let rest: Vec<Value> =
                        values.iter().filter(|v| !matches!(v, Value::Imm)).cloned().collect();
                    let constant_formula = build_formula(&rest, line)?;
                    Ok(Statement::Instruction {
                        mnemonic,
                        addressing_mode: Some(crate::isa::AddressingMode::Imm),
                        constant_formula: Some(constant_formula),
                        line,
                    })
                }
                Some(ExprKind::Target) => {
                    let values = &parts[1];
                    let mode = values
                        .iter()
                        .find_map(|v| match v {
                            Value::AddressingMode(m) => Some(*m),
                            _ => None,
                        })
                        .ok_or(ParserError::NoRuleMatched { line })?;
                    let rest: Vec<Value> = values
                        .iter()
                        .filter(|v| !matches!(v, Value::AddressingMode(_)))
                        .cloned()
                        .collect();
                    let constant_formula = build_formula(&rest, line)?;
                    Ok(Statement::Instruction {
                        mnemonic,
                        addressing_mode: Some(mode),
                        constant_formula: Some(constant_formula),
                        line,
                    })
                }
                Some(ExprKind::Constant) => {
                    let values = &parts[1];
                    let constant_formula = build_formula(values, line)?;
                    Ok(Statement::Instruction {
                        mnemonic,
                        addressing_mode: None,
                        constant_formula: Some(constant_formula),
                        line,
                    })
                }
                Some(_) => Err(ParserError::NoRuleMatched { line }),
            }
        }

        _ => Err(ParserError::NoRuleMatched { line }),
    }
}

fn take_identifier(values: &[Value], line: usize) -> Result<String, ParserError> {
    values
        .iter()
        .find_map(|v| match v {
            Value::StringLiteral(s) => Some(s.clone()),
            _ => None,
        })
        .ok_or(ParserError::MalformedConstant { line })
}

fn split_identifier(values: &[Value], line: usize) -> Result<(String, &[Value]), ParserError> {
    match values.first() {
        Some(Value::StringLiteral(s)) => Ok((s.clone(), &values[1..])),
        _ => Err(ParserError::MalformedConstant { line }),
    }
}

/// Builds a `ConstantFormula` from a flattened CONSTANT value sequence
/// (§4.2, §3): `OperandSize` tags are informational noise (the authoritative
/// size for a literal operand is the `size` field already on its
/// `NumberLiteral`) and are skipped; everything else alternates operand,
/// operator, operand, ... with an optional `Mask` tag immediately preceding
/// the operand it modifies.
fn build_formula(values: &[Value], line: usize) -> Result<ConstantFormula, ParserError> {
    let mut terms = Vec::new();
    let mut operators: Vec<ArithOp> = Vec::new();
    let mut pending_mask = None;

    for value in values {
        match value {
            Value::OperandSize(_) => {}
            Value::Mask(kind) => pending_mask = Some(*kind),
            Value::StringLiteral(name) => terms.push(OperandTerm {
                value: OperandValue::Identifier(name.clone()),
                size: None,
                mask: pending_mask.take(),
            }),
            Value::NumberLiteral { value, size } => terms.push(OperandTerm {
                value: OperandValue::Literal(*value),
                size: Some(*size),
                mask: pending_mask.take(),
            }),
            Value::MathOperator(op) => operators.push(*op),
            _ => return Err(ParserError::MalformedConstant { line }),
        }
    }

    if terms.is_empty() || terms.len() != operators.len() + 1 {
        return Err(ParserError::MalformedConstant { line });
    }

    Ok(ConstantFormula { terms, operators })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{AddressingMode, Mnemonic};
    use crate::lexer::lex;

    fn parse_str(src: &str) -> Vec<Statement> {
        let lines = lex(src).unwrap();
        parse(&lines).unwrap()
    }

    #[test]
    fn parses_bare_instruction() {
        let stmts = parse_str("NOP\n");
        assert_eq!(
            stmts,
            vec![Statement::Instruction {
                mnemonic: Mnemonic::NOP,
                addressing_mode: None,
                constant_formula: None,
                line: 1,
            }]
        );
    }

    #[test]
    fn parses_label_definition() {
        let stmts = parse_str("start:\n");
        assert_eq!(stmts, vec![Statement::LabelDef { name: "start".into(), line: 1 }]);
    }

    #[test]
    fn parses_named_constant_definition() {
        let stmts = parse_str("FOO = $10\n");
        match &stmts[0] {
            Statement::NamedConstantDef { name, constant_formula, .. } => {
                assert_eq!(name, "FOO");
                assert_eq!(constant_formula.terms.len(), 1);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_immediate_operand() {
        let stmts = parse_str("LDA #$05\n");
        match &stmts[0] {
            Statement::Instruction { mnemonic, addressing_mode, constant_formula, .. } => {
                assert_eq!(*mnemonic, Mnemonic::LDA);
                assert_eq!(*addressing_mode, Some(AddressingMode::Imm));
                assert_eq!(constant_formula.as_ref().unwrap().terms.len(), 1);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_indexed_absolute_target() {
        let stmts = parse_str("LDA $1234,X\n");
        match &stmts[0] {
            Statement::Instruction { addressing_mode, .. } => {
                assert_eq!(*addressing_mode, Some(AddressingMode::Abx));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_indirect_indexed_target() {
        let stmts = parse_str("LDA ($10),Y\n");
        assert_eq!(
            match &stmts[0] {
                Statement::Instruction { addressing_mode, .. } => *addressing_mode,
                _ => None,
            },
            Some(AddressingMode::Izy)
        );
    }

    #[test]
    fn parses_bare_constant_operand_without_mode() {
        let stmts = parse_str("JMP target\n");
        match &stmts[0] {
            Statement::Instruction { addressing_mode, constant_formula, .. } => {
                assert_eq!(*addressing_mode, None);
                assert!(constant_formula.is_some());
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_directive_with_multiple_params() {
        let stmts = parse_str(".db $01, $02, $03\n");
        match &stmts[0] {
            Statement::Directive { params, .. } => assert_eq!(params.len(), 3),
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_directive_with_one_param() {
        let stmts = parse_str(".org $8000\n");
        match &stmts[0] {
            Statement::Directive { params, .. } => assert_eq!(params.len(), 1),
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_multi_term_arithmetic_formula() {
        let stmts = parse_str("FOO = BAR + $01 - $02\n");
        match &stmts[0] {
            Statement::NamedConstantDef { constant_formula, .. } => {
                assert_eq!(constant_formula.terms.len(), 3);
                assert_eq!(constant_formula.operators, vec![ArithOp::Add, ArithOp::Sub]);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_mask_prefixed_constant() {
        let stmts = parse_str("LDA #<FOO\n");
        match &stmts[0] {
            Statement::Instruction { constant_formula, .. } => {
                let formula = constant_formula.as_ref().unwrap();
                assert_eq!(formula.terms.len(), 1);
                assert!(formula.terms[0].mask.is_some());
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn unmatched_line_is_a_parser_error() {
        let lines = lex(", ,\n").unwrap_or_default();
        if !lines.is_empty() {
            assert!(parse(&lines).is_err());
        }
    }
}
