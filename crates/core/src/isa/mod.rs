//! Instruction set definitions and the assembly front end.
//!
//! This module covers everything between program text and the issue stage:
//! 1. **Opcodes:** The 20-instruction MIPS subset with category predicates.
//! 2. **Instructions:** Normalized, label-resolved records in program order.
//! 3. **Assembly:** A two-pass parser that resolves labels to indices.

/// Assembly parsing and label resolution.
pub mod asm;

/// Normalized instruction records.
pub mod instruction;

/// Operation codes and category predicates.
pub mod opcode;

pub use asm::parse_program;
pub use instruction::Instruction;
pub use opcode::OpCode;
