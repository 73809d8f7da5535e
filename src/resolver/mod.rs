//! Constant/label resolver (§4.3): four passes over the statement list,
//! run before the encoder, that turn labels and named constants into a
//! flat `SymbolTable`.

use std::collections::HashMap;

use crate::ast::{ConstantFormula, OperandValue, Statement, SymbolTable};
use crate::isa::{AddressingMode, Mnemonic, MnemonicClass};
use crate::token::{ArithOp, DirectiveKind};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssemblerError {
    #[error("line {line}: duplicate label or constant `{name}`")]
    DuplicateSymbol { line: usize, name: String },

    #[error("line {line}: reference to undefined constant `{name}`")]
    UndefinedConstant { line: usize, name: String },

    #[error("line {line}: forward reference to `{name}` is not allowed")]
    ForwardReference { line: usize, name: String },

    #[error("line {line}: `.org` requires exactly one bare integer operand")]
    InvalidOrg { line: usize },

    #[error("line {line}: constant value {value} does not fit in {size} byte(s)")]
    ConstantOverflow { line: usize, value: i64, size: u8 },
}

/// Intermediate size/value bookkeeping the resolver threads through its
/// passes, kept apart from the immutable `SymbolTable` the encoder sees.
#[derive(Debug, Default)]
pub struct ResolvedProgram {
    pub symbols: SymbolTable,
}

/// Runs all four passes and returns the resulting symbol table.
pub fn resolve(statements: &[Statement]) -> Result<ResolvedProgram, AssemblerError> {
    let label_names = discover_labels(statements);
    let constant_sizes = size_named_constants(statements, &label_names)?;
    let label_offsets = assign_label_offsets(statements, &constant_sizes)?;
    let symbols = evaluate_constants(statements, &label_offsets, &constant_sizes)?;
    Ok(ResolvedProgram { symbols })
}

fn discover_labels(statements: &[Statement]) -> std::collections::HashSet<String> {
    statements
        .iter()
        .filter_map(|s| match s {
            Statement::LabelDef { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

/// Pass 2: size every named constant by the max size over its operands.
fn size_named_constants(
    statements: &[Statement],
    labels: &std::collections::HashSet<String>,
) -> Result<HashMap<String, u8>, AssemblerError> {
    let mut sizes: HashMap<String, u8> = HashMap::new();

    for statement in statements {
        if let Statement::NamedConstantDef { name, constant_formula, line } = statement {
            let mut max_size = 1u8;
            for term in &constant_formula.terms {
                let size = match &term.value {
                    OperandValue::Literal(_) => term.size.unwrap_or(1),
                    OperandValue::Identifier(id) => {
                        if labels.contains(id) {
                            2
                        } else if let Some(s) = sizes.get(id) {
                            *s
                        } else {
                            return Err(AssemblerError::UndefinedConstant {
                                line: *line,
                                name: id.clone(),
                            });
                        }
                    }
                };
                let size = if term.mask.is_some() { 1 } else { size };
                max_size = max_size.max(size);
            }
            sizes.insert(name.clone(), max_size);
        }
    }

    Ok(sizes)
}

/// Pass 3: simulate the program counter to assign every label an offset.
fn assign_label_offsets(
    statements: &[Statement],
    constant_sizes: &HashMap<String, u8>,
) -> Result<HashMap<String, i32>, AssemblerError> {
    let mut offsets: HashMap<String, i32> = HashMap::new();
    let mut pc: i32 = 0;

    for statement in statements {
        match statement {
            Statement::LabelDef { name, line } => {
                if offsets.contains_key(name) {
                    return Err(AssemblerError::DuplicateSymbol { line: *line, name: name.clone() });
                }
                offsets.insert(name.clone(), pc);
            }
            Statement::Instruction { mnemonic, addressing_mode, constant_formula, .. } => {
                let operand_bytes = instruction_width(
                    *mnemonic,
                    *addressing_mode,
                    constant_formula.as_ref(),
                    &offsets,
                    constant_sizes,
                );
                pc += 1 + operand_bytes as i32;
            }
            Statement::Directive { directive, params, line } => match directive {
                // `.org` only sets the encoder's `org_offset`; it does not
                // reset the PC this pass is tracking (scenario 4: `start`
                // resolves to file offset 0, and the jump target becomes
                // `0 + org_offset` only at encode time).
                DirectiveKind::Org => {
                    single_bare_integer(params, *line)?;
                }
                DirectiveKind::Db => pc += params.len() as i32,
                DirectiveKind::Dw => pc += 2 * params.len() as i32,
                DirectiveKind::Index | DirectiveKind::Mem => {}
            },
            Statement::NamedConstantDef { .. } | Statement::Comment { .. } => {}
        }
    }

    Ok(offsets)
}

fn single_bare_integer(params: &[ConstantFormula], line: usize) -> Result<i32, AssemblerError> {
    if params.len() != 1 {
        return Err(AssemblerError::InvalidOrg { line });
    }
    let formula = &params[0];
    if formula.terms.len() != 1 || !formula.operators.is_empty() {
        return Err(AssemblerError::InvalidOrg { line });
    }
    match (&formula.terms[0].value, formula.terms[0].mask) {
        (OperandValue::Literal(v), None) => Ok(*v as i32),
        _ => Err(AssemblerError::InvalidOrg { line }),
    }
}

fn operand_size_of(
    formula: Option<&ConstantFormula>,
    offsets: &HashMap<String, i32>,
    constant_sizes: &HashMap<String, u8>,
) -> u8 {
    let Some(formula) = formula else { return 0 };
    formula
        .terms
        .iter()
        .map(|term| {
            if term.mask.is_some() {
                return 1;
            }
            match &term.value {
                OperandValue::Literal(_) => term.size.unwrap_or(1),
                OperandValue::Identifier(id) => {
                    if offsets.contains_key(id) {
                        2
                    } else {
                        *constant_sizes.get(id).unwrap_or(&1)
                    }
                }
            }
        })
        .max()
        .unwrap_or(1)
}

fn instruction_width(
    mnemonic: Mnemonic,
    addressing_mode: Option<AddressingMode>,
    formula: Option<&ConstantFormula>,
    offsets: &HashMap<String, i32>,
    constant_sizes: &HashMap<String, u8>,
) -> u8 {
    if let Some(mode) = addressing_mode {
        // ABX/ABY targets are only ever produced from a literal DWORD
        // token (§4.2's TARGET grammar has no identifier-based indexed
        // alternative), so the literal's resolved value is already known
        // here without needing the symbol table.
        let shrunk = match literal_value_of(formula) {
            Some(value) => shrink_to_zero_page(mnemonic, mode, value),
            None => mode,
        };
        return shrunk.width();
    }
    if mnemonic.class() == MnemonicClass::Branch {
        return AddressingMode::Rel.width();
    }
    operand_size_of(formula, offsets, constant_sizes)
}

fn literal_value_of(formula: Option<&ConstantFormula>) -> Option<i64> {
    let formula = formula?;
    if formula.terms.len() != 1 {
        return None;
    }
    match formula.terms[0].value {
        OperandValue::Literal(v) => Some(v),
        OperandValue::Identifier(_) => None,
    }
}

/// The zero-page shrink rule (§4.3/§4.4): `ABX`/`ABY` collapse to
/// `ZPX`/`ZPY` when the resolved operand *value* actually fits in one byte
/// (scenario 8: `$0010,X` shrinks even though `$0010`'s four hex digits
/// lexically declare a 2-byte width) and the mnemonic has a zero-page
/// indexed variant. `ABS` never shrinks at this stage.
pub fn shrink_to_zero_page(mnemonic: Mnemonic, mode: AddressingMode, value: i64) -> AddressingMode {
    let fits_zero_page = (0..=0xFF).contains(&value);
    match mode {
        AddressingMode::Abx if fits_zero_page && mnemonic.supports(AddressingMode::Zpx) => {
            AddressingMode::Zpx
        }
        AddressingMode::Aby if fits_zero_page && mnemonic.supports(AddressingMode::Zpy) => {
            AddressingMode::Zpy
        }
        other => other,
    }
}

/// Pass 4: evaluate every named constant's formula against labels and
/// earlier constants, forward sweep only (forward references error).
fn evaluate_constants(
    statements: &[Statement],
    label_offsets: &HashMap<String, i32>,
    constant_sizes: &HashMap<String, u8>,
) -> Result<SymbolTable, AssemblerError> {
    let mut table = SymbolTable::new();

    for (name, pc) in label_offsets {
        table.insert(name.clone(), *pc, 2);
    }

    for statement in statements {
        if let Statement::NamedConstantDef { name, constant_formula, line } = statement {
            let (value, _) = evaluate_formula(constant_formula, &table, *line)?;
            let size = *constant_sizes.get(name).unwrap_or(&1);
            if !table.insert(name.clone(), value as i32, size) {
                return Err(AssemblerError::DuplicateSymbol { line: *line, name: name.clone() });
            }
        }
    }

    Ok(table)
}

/// Evaluates a `ConstantFormula` against a symbol table that already
/// contains every label (pass 3 ran first) and every earlier constant.
/// Returns `(result, max_size)`. A name absent from the table is a forward
/// reference to a not-yet-defined constant.
pub fn evaluate_formula(
    formula: &ConstantFormula,
    table: &SymbolTable,
    line: usize,
) -> Result<(i64, u8), AssemblerError> {
    let mut acc: i64 = 0;
    let mut max_size: u8 = 1;

    for (idx, term) in formula.terms.iter().enumerate() {
        let (mut value, mut size) = match &term.value {
            OperandValue::Literal(v) => (*v, term.size.unwrap_or(1)),
            OperandValue::Identifier(id) => {
                if let Some(symbol) = table.get(id) {
                    (symbol.value as i64, symbol.size)
                } else {
                    return Err(AssemblerError::ForwardReference { line, name: id.clone() });
                }
            }
        };

        if let Some(mask) = term.mask {
            value = mask.apply(value);
            size = 1;
        }
        max_size = max_size.max(size);

        if idx == 0 {
            acc = value;
        } else {
            let op = formula.operators[idx - 1];
            acc = match op {
                ArithOp::Add => acc + value,
                ArithOp::Sub => acc - value,
            };
        }
    }

    let limit = (1i64 << (8 * max_size as u32)) - 1;
    if acc < 0 || acc > limit {
        return Err(AssemblerError::ConstantOverflow { line, value: acc, size: max_size });
    }

    Ok((acc, max_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn resolve_src(src: &str) -> Result<ResolvedProgram, AssemblerError> {
        let lines = lex(src).unwrap();
        let statements = parse(&lines).unwrap();
        resolve(&statements)
    }

    #[test]
    fn labels_resolve_to_pc_offsets() {
        let program = resolve_src("start:\nNOP\nend:\n").unwrap();
        assert_eq!(program.symbols.get("start").unwrap().value, 0);
        assert_eq!(program.symbols.get("end").unwrap().value, 1);
    }

    #[test]
    fn named_constant_evaluates_arithmetic() {
        let program = resolve_src("FOO = $10 + $05\n").unwrap();
        assert_eq!(program.symbols.get("FOO").unwrap().value, 0x15);
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let err = resolve_src("x:\nx:\n").unwrap_err();
        assert!(matches!(err, AssemblerError::DuplicateSymbol { .. }));
    }

    #[test]
    fn undefined_constant_reference_is_an_error() {
        let err = resolve_src("FOO = BAR\n").unwrap_err();
        assert!(matches!(
            err,
            AssemblerError::UndefinedConstant { .. } | AssemblerError::ForwardReference { .. }
        ));
    }

    #[test]
    fn org_does_not_reset_label_offsets() {
        // Preserved quirk (§10): `.org` only anchors absolute jump targets at
        // encode time; it does not reset the PC this pass tracks, so labels
        // after `.org` still get plain file offsets.
        let program = resolve_src(".org $8000\nstart:\n").unwrap();
        assert_eq!(program.symbols.get("start").unwrap().value, 0);
    }

    #[test]
    fn mask_forces_size_to_one_byte() {
        let program = resolve_src("FOO = $1234\nBAR = <FOO\n").unwrap();
        assert_eq!(program.symbols.get("BAR").unwrap().value, 0x34);
        assert_eq!(program.symbols.get("BAR").unwrap().size, 1);
    }

    #[test]
    fn zero_page_shrink_applies_only_when_mnemonic_supports_it() {
        let shrunk = shrink_to_zero_page(Mnemonic::LDA, AddressingMode::Abx, 0x10);
        assert_eq!(shrunk, AddressingMode::Zpx);
        let not_shrunk = shrink_to_zero_page(Mnemonic::LDA, AddressingMode::Abx, 0x1234);
        assert_eq!(not_shrunk, AddressingMode::Abx);
    }
}
