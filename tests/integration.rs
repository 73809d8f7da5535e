//! End-to-end tests running the full lex -> parse -> resolve -> encode
//! pipeline against the worked scenarios from the data model's testable
//! properties, asserting on the final byte stream.

use rusm6502::assemble_source;

#[test]
fn immediate_load() {
    let bytes = assemble_source("LDA #$05\n").unwrap();
    assert_eq!(bytes, vec![0xA9, 0x05]);
}

#[test]
fn implicit_zero_page_via_two_digit_literal() {
    let bytes = assemble_source("LDA $10\n").unwrap();
    assert_eq!(bytes, vec![0xA5, 0x10]);
}

#[test]
fn explicit_absolute_via_four_digit_literal() {
    let bytes = assemble_source("LDA $0010\n").unwrap();
    assert_eq!(bytes, vec![0xAD, 0x10, 0x00]);
}

#[test]
fn org_anchors_a_forward_jump_target() {
    let src = ".org $8000\nstart: LDA #$01\nJMP start\n";
    let bytes = assemble_source(src).unwrap();
    assert_eq!(bytes, vec![0xA9, 0x01, 0x4C, 0x00, 0x80]);
}

#[test]
fn db_directive_emits_raw_bytes() {
    let bytes = assemble_source(".db $01, $02, $03\n").unwrap();
    assert_eq!(bytes, vec![0x01, 0x02, 0x03]);
}

#[test]
fn backward_branch_offset() {
    let src = "back: NOP\nNOP\nBNE back\n";
    let bytes = assemble_source(src).unwrap();
    assert_eq!(bytes, vec![0xEA, 0xEA, 0xD0, 0xFC]);
}

#[test]
fn mask_operators_pick_low_and_high_bytes() {
    let low = assemble_source("FOO = $1234\nLDA #<FOO\n").unwrap();
    assert_eq!(low, vec![0xA9, 0x34]);

    let high = assemble_source("FOO = $1234\nLDA #>FOO\n").unwrap();
    assert_eq!(high, vec![0xA9, 0x12]);
}

#[test]
fn absolute_indexed_shrinks_to_zero_page_indexed() {
    let bytes = assemble_source("LDA $0010,X\n").unwrap();
    assert_eq!(bytes, vec![0xB5, 0x10]);
}

#[test]
fn full_program_with_constants_labels_and_directives() {
    let src = "\
        .org $8000\n\
        SEED = $20\n\
        start:\n\
        LDA #SEED\n\
        STA $10\n\
        loop:\n\
        DEC $10\n\
        BNE loop\n\
        JMP start\n\
        .db $DE, $AD\n\
    ";
    let bytes = assemble_source(src).unwrap();
    assert_eq!(
        bytes,
        vec![
            0xA9, 0x20, // LDA #SEED
            0x85, 0x10, // STA $10 (zero page)
            0xC6, 0x10, // DEC $10 (zero page)
            0xD0, 0xFC, // BNE loop
            0x4C, 0x00, 0x80, // JMP start -> 0 + org_offset
            0xDE, 0xAD, // .db
        ]
    );
}
