//! Shared 6502 model: mnemonics, addressing modes and the opcode lookup table.
//!
//! This is the "external fixed data table" the rest of the pipeline is built
//! against: lexer, parser, resolver and encoder all refer to the types here,
//! but none of them may mutate the table itself.

use std::collections::HashMap;
use std::str::FromStr;

use derive_more::Display;
use once_cell::sync::Lazy;

/// The full set of 56 documented NMOS 6502 mnemonics.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    LDA, LDX, LDY, STA, STX, STY,
    TAX, TAY, TSX, TXA, TXS, TYA,
    PHA, PHP, PLA, PLP,
    AND, EOR, ORA, BIT,
    ADC, SBC, CMP, CPX, CPY,
    INC, INX, INY, DEC, DEX, DEY,
    ASL, LSR, ROL, ROR,
    JMP, JSR, RTS, RTI, BRK,
    BCC, BCS, BEQ, BMI, BNE, BPL, BVC, BVS,
    CLC, CLD, CLI, CLV, SEC, SED, SEI,
    NOP,
}

impl FromStr for Mnemonic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        use Mnemonic::*;
        Ok(match s.to_ascii_uppercase().as_str() {
            "LDA" => LDA, "LDX" => LDX, "LDY" => LDY,
            "STA" => STA, "STX" => STX, "STY" => STY,
            "TAX" => TAX, "TAY" => TAY, "TSX" => TSX,
            "TXA" => TXA, "TXS" => TXS, "TYA" => TYA,
            "PHA" => PHA, "PHP" => PHP, "PLA" => PLA, "PLP" => PLP,
            "AND" => AND, "EOR" => EOR, "ORA" => ORA, "BIT" => BIT,
            "ADC" => ADC, "SBC" => SBC, "CMP" => CMP, "CPX" => CPX, "CPY" => CPY,
            "INC" => INC, "INX" => INX, "INY" => INY,
            "DEC" => DEC, "DEX" => DEX, "DEY" => DEY,
            "ASL" => ASL, "LSR" => LSR, "ROL" => ROL, "ROR" => ROR,
            "JMP" => JMP, "JSR" => JSR, "RTS" => RTS, "RTI" => RTI, "BRK" => BRK,
            "BCC" => BCC, "BCS" => BCS, "BEQ" => BEQ, "BMI" => BMI,
            "BNE" => BNE, "BPL" => BPL, "BVC" => BVC, "BVS" => BVS,
            "CLC" => CLC, "CLD" => CLD, "CLI" => CLI, "CLV" => CLV,
            "SEC" => SEC, "SED" => SED, "SEI" => SEI,
            "NOP" => NOP,
            _ => return Err(()),
        })
    }
}

/// The set of known mnemonic spellings, used by the lexer to recognize a
/// `Mnemonic` token before it ever falls back to `Identifier`.
pub const MNEMONICS: &[&str] = &[
    "LDA", "LDX", "LDY", "STA", "STX", "STY", "TAX", "TAY", "TSX", "TXA", "TXS", "TYA", "PHA",
    "PHP", "PLA", "PLP", "AND", "EOR", "ORA", "BIT", "ADC", "SBC", "CMP", "CPX", "CPY", "INC",
    "INX", "INY", "DEC", "DEX", "DEY", "ASL", "LSR", "ROL", "ROR", "JMP", "JSR", "RTS", "RTI",
    "BRK", "BCC", "BCS", "BEQ", "BMI", "BNE", "BPL", "BVC", "BVS", "CLC", "CLD", "CLI", "CLV",
    "SEC", "SED", "SEI", "NOP",
];

/// How an instruction's operand is addressed, with the width (in bytes) of
/// the operand encoded after the opcode byte.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// Implicit: no operand.
    Imp,
    /// `#<operand>`
    Imm,
    /// 1-byte zero-page operand.
    Zrp,
    /// `zp,X`
    Zpx,
    /// `zp,Y`
    Zpy,
    /// Signed 8-bit branch offset.
    Rel,
    /// 2-byte absolute operand.
    Abs,
    /// `abs,X`
    Abx,
    /// `abs,Y`
    Aby,
    /// `(abs)`
    Ind,
    /// `(zp,X)`
    Izx,
    /// `(zp),Y`
    Izy,
}

impl AddressingMode {
    /// Number of operand bytes following the opcode byte.
    pub fn width(self) -> u8 {
        use AddressingMode::*;
        match self {
            Imp => 0,
            Imm | Zrp | Zpx | Zpy | Rel | Izx | Izy => 1,
            Abs | Abx | Aby | Ind => 2,
        }
    }
}

/// Classifies mnemonics that need special encoder treatment: branches are
/// always `REL`, and absolute jumps/calls are anchored to `.org`'s offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnemonicClass {
    Jump,
    Branch,
    Other,
}

impl Mnemonic {
    pub fn class(self) -> MnemonicClass {
        use Mnemonic::*;
        match self {
            JMP | JSR => MnemonicClass::Jump,
            BCC | BCS | BEQ | BMI | BNE | BPL | BVC | BVS => MnemonicClass::Branch,
            _ => MnemonicClass::Other,
        }
    }

    /// Whether this mnemonic has an encoding for `mode`.
    pub fn supports(self, mode: AddressingMode) -> bool {
        opcode_table().contains_key(&(self, mode))
    }
}

/// `(mnemonic, addressing mode) -> opcode byte`, built once and shared for
/// the lifetime of the process.
pub static OPCODE_TABLE: Lazy<HashMap<(Mnemonic, AddressingMode), u8>> = Lazy::new(build_opcode_table);

pub fn opcode_table() -> &'static HashMap<(Mnemonic, AddressingMode), u8> {
    &OPCODE_TABLE
}

pub fn lookup_opcode(mnemonic: Mnemonic, mode: AddressingMode) -> Option<u8> {
    OPCODE_TABLE.get(&(mnemonic, mode)).copied()
}

fn build_opcode_table() -> HashMap<(Mnemonic, AddressingMode), u8> {
    use AddressingMode::*;
    use Mnemonic::*;

    let mut t = HashMap::new();
    let mut ins = |m: Mnemonic, a: AddressingMode, op: u8| {
        t.insert((m, a), op);
    };

    ins(LDA, Imm, 0xA9); ins(LDA, Zrp, 0xA5); ins(LDA, Zpx, 0xB5); ins(LDA, Abs, 0xAD);
    ins(LDA, Abx, 0xBD); ins(LDA, Aby, 0xB9); ins(LDA, Izx, 0xA1); ins(LDA, Izy, 0xB1);

    ins(LDX, Imm, 0xA2); ins(LDX, Zrp, 0xA6); ins(LDX, Zpy, 0xB6); ins(LDX, Abs, 0xAE);
    ins(LDX, Aby, 0xBE);

    ins(LDY, Imm, 0xA0); ins(LDY, Zrp, 0xA4); ins(LDY, Zpx, 0xB4); ins(LDY, Abs, 0xAC);
    ins(LDY, Abx, 0xBC);

    ins(STA, Zrp, 0x85); ins(STA, Zpx, 0x95); ins(STA, Abs, 0x8D); ins(STA, Abx, 0x9D);
    ins(STA, Aby, 0x99); ins(STA, Izx, 0x81); ins(STA, Izy, 0x91);

    ins(STX, Zrp, 0x86); ins(STX, Zpy, 0x96); ins(STX, Abs, 0x8E);
    ins(STY, Zrp, 0x84); ins(STY, Zpx, 0x94); ins(STY, Abs, 0x8C);

    ins(TAX, Imp, 0xAA); ins(TAY, Imp, 0xA8); ins(TSX, Imp, 0xBA);
    ins(TXA, Imp, 0x8A); ins(TXS, Imp, 0x9A); ins(TYA, Imp, 0x98);

    ins(PHA, Imp, 0x48); ins(PHP, Imp, 0x08); ins(PLA, Imp, 0x68); ins(PLP, Imp, 0x28);

    ins(AND, Imm, 0x29); ins(AND, Zrp, 0x25); ins(AND, Zpx, 0x35); ins(AND, Abs, 0x2D);
    ins(AND, Abx, 0x3D); ins(AND, Aby, 0x39); ins(AND, Izx, 0x21); ins(AND, Izy, 0x31);

    ins(EOR, Imm, 0x49); ins(EOR, Zrp, 0x45); ins(EOR, Zpx, 0x55); ins(EOR, Abs, 0x4D);
    ins(EOR, Abx, 0x5D); ins(EOR, Aby, 0x59); ins(EOR, Izx, 0x41); ins(EOR, Izy, 0x51);

    ins(ORA, Imm, 0x09); ins(ORA, Zrp, 0x05); ins(ORA, Zpx, 0x15); ins(ORA, Abs, 0x0D);
    ins(ORA, Abx, 0x1D); ins(ORA, Aby, 0x19); ins(ORA, Izx, 0x01); ins(ORA, Izy, 0x11);

    ins(BIT, Zrp, 0x24); ins(BIT, Abs, 0x2C);

    ins(ADC, Imm, 0x69); ins(ADC, Zrp, 0x65); ins(ADC, Zpx, 0x75); ins(ADC, Abs, 0x6D);
    ins(ADC, Abx, 0x7D); ins(ADC, Aby, 0x79); ins(ADC, Izx, 0x61); ins(ADC, Izy, 0x71);

    ins(SBC, Imm, 0xE9); ins(SBC, Zrp, 0xE5); ins(SBC, Zpx, 0xF5); ins(SBC, Abs, 0xED);
    ins(SBC, Abx, 0xFD); ins(SBC, Aby, 0xF9); ins(SBC, Izx, 0xE1); ins(SBC, Izy, 0xF1);

    ins(CMP, Imm, 0xC9); ins(CMP, Zrp, 0xC5); ins(CMP, Zpx, 0xD5); ins(CMP, Abs, 0xCD);
    ins(CMP, Abx, 0xDD); ins(CMP, Aby, 0xD9); ins(CMP, Izx, 0xC1); ins(CMP, Izy, 0xD1);

    ins(CPX, Imm, 0xE0); ins(CPX, Zrp, 0xE4); ins(CPX, Abs, 0xEC);
    ins(CPY, Imm, 0xC0); ins(CPY, Zrp, 0xC4); ins(CPY, Abs, 0xCC);

    ins(INC, Zrp, 0xE6); ins(INC, Zpx, 0xF6); ins(INC, Abs, 0xEE); ins(INC, Abx, 0xFE);
    ins(INX, Imp, 0xE8); ins(INY, Imp, 0xC8);

    ins(DEC, Zrp, 0xC6); ins(DEC, Zpx, 0xD6); ins(DEC, Abs, 0xCE); ins(DEC, Abx, 0xDE);
    ins(DEX, Imp, 0xCA); ins(DEY, Imp, 0x88);

    ins(ASL, Zrp, 0x06); ins(ASL, Zpx, 0x16); ins(ASL, Abs, 0x0E); ins(ASL, Abx, 0x1E);
    ins(LSR, Zrp, 0x46); ins(LSR, Zpx, 0x56); ins(LSR, Abs, 0x4E); ins(LSR, Abx, 0x5E);
    ins(ROL, Zrp, 0x26); ins(ROL, Zpx, 0x36); ins(ROL, Abs, 0x2E); ins(ROL, Abx, 0x3E);
    ins(ROR, Zrp, 0x66); ins(ROR, Zpx, 0x76); ins(ROR, Abs, 0x6E); ins(ROR, Abx, 0x7E);

    ins(JMP, Abs, 0x4C); ins(JMP, Ind, 0x6C);
    ins(JSR, Abs, 0x20);
    ins(RTS, Imp, 0x60); ins(RTI, Imp, 0x40); ins(BRK, Imp, 0x00);

    ins(BCC, Rel, 0x90); ins(BCS, Rel, 0xB0); ins(BEQ, Rel, 0xF0); ins(BMI, Rel, 0x30);
    ins(BNE, Rel, 0xD0); ins(BPL, Rel, 0x10); ins(BVC, Rel, 0x50); ins(BVS, Rel, 0x70);

    ins(CLC, Imp, 0x18); ins(CLD, Imp, 0xD8); ins(CLI, Imp, 0x58); ins(CLV, Imp, 0xB8);
    ins(SEC, Imp, 0x38); ins(SED, Imp, 0xF8); ins(SEI, Imp, 0x78);

    ins(NOP, Imp, 0xEA);

    t
}
