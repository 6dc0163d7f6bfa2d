//! Assembly parser tests: operand forms, labels, comments, errors.

use tomasulo_core::common::SimError;
use tomasulo_core::isa::{parse_program, OpCode};

use crate::common::harness::reg;

#[test]
fn parses_every_operand_form() {
    let program = parse_program(
        "DADDI R1, R0, 5\n\
         ADD.D F2, F4, F6\n\
         L.D F8, 16(R1)\n\
         S.D F8, -8(R1)\n\
         BEQ R1, R0, 0\n",
    )
    .unwrap();

    assert_eq!(program.len(), 5);

    assert_eq!(program[0].op, OpCode::Daddi);
    assert_eq!(program[0].dest, Some(reg("R1")));
    assert_eq!(program[0].src1, Some(reg("R0")));
    assert_eq!(program[0].immediate, 5);

    assert_eq!(program[1].op, OpCode::AddD);
    assert_eq!(program[1].src2, Some(reg("F6")));

    assert_eq!(program[2].op, OpCode::LoadD);
    assert_eq!(program[2].dest, Some(reg("F8")));
    assert_eq!(program[2].base, Some(reg("R1")));
    assert_eq!(program[2].offset, 16);

    assert_eq!(program[3].op, OpCode::StoreD);
    assert_eq!(program[3].src1, Some(reg("F8")), "store data register");
    assert_eq!(program[3].offset, -8);
    assert_eq!(program[3].dest, None, "stores have no destination");

    assert_eq!(program[4].op, OpCode::Beq);
    assert_eq!(program[4].immediate, 0);

    // Ids are 1-based program order.
    for (i, instr) in program.iter().enumerate() {
        assert_eq!(instr.id as usize, i + 1);
    }
}

#[test]
fn resolves_labels_to_instruction_indices() {
    let program = parse_program(
        "DADDI R1, R0, 1\n\
         LOOP: DADDI R2, R2, 1\n\
         BNE R2, R1, LOOP\n\
         DADDI R3, R0, 9\n",
    )
    .unwrap();
    assert_eq!(program[2].op, OpCode::Bne);
    assert_eq!(program[2].immediate, 1, "LOOP is instruction index 1");
}

#[test]
fn standalone_label_points_at_next_instruction() {
    let program = parse_program(
        "BEQ R1, R2, SKIP\n\
         DADDI R3, R0, 9\n\
         SKIP:\n\
         DADDI R4, R0, 4\n",
    )
    .unwrap();
    assert_eq!(program.len(), 3);
    assert_eq!(program[0].immediate, 2, "SKIP resolves past the label line");
}

#[test]
fn trailing_label_points_past_the_end() {
    let program = parse_program(
        "BEQ R1, R2, END\n\
         DADDI R3, R0, 9\n\
         END:\n",
    )
    .unwrap();
    assert_eq!(program[0].immediate, 2);
}

#[test]
fn comments_and_blank_lines_are_stripped() {
    let program = parse_program(
        "// leading comment\n\
         \n\
         DADDI R1, R0, 5 // trailing\n\
         DSUBI R1, R1, 2 ; other comment style\n",
    )
    .unwrap();
    assert_eq!(program.len(), 2);
    assert_eq!(program[1].op, OpCode::Dsubi);
}

#[test]
fn mnemonics_are_case_insensitive() {
    let program = parse_program("mul.d F0, F2, F4\n").unwrap();
    assert_eq!(program[0].op, OpCode::MulD);
}

#[test]
fn unknown_mnemonic_reports_line_number() {
    let err = parse_program("DADDI R1, R0, 5\nFOO R1, R2, R3\n").unwrap_err();
    match err {
        SimError::ParseError { line, .. } => assert_eq!(line, 2),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn invalid_register_rejected() {
    assert!(parse_program("DADDI R32, R0, 5\n").is_err());
    assert!(parse_program("ADD.D F2, X4, F6\n").is_err());
}

#[test]
fn unknown_branch_target_rejected() {
    assert!(parse_program("BEQ R1, R2, NOWHERE\n").is_err());
}

#[test]
fn duplicate_label_rejected() {
    let err = parse_program("A: DADDI R1, R0, 1\nA: DADDI R2, R0, 2\n").unwrap_err();
    assert!(matches!(err, SimError::ParseError { line: 2, .. }));
}

#[test]
fn wrong_operand_count_rejected() {
    assert!(parse_program("ADD.D F2, F4\n").is_err());
    assert!(parse_program("L.D F8\n").is_err());
}

#[test]
fn bad_memory_operand_rejected() {
    assert!(parse_program("L.D F8, 16R1\n").is_err());
    assert!(parse_program("L.D F8, 16(R1\n").is_err());
}
