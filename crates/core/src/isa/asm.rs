//! Assembly front end.
//!
//! Parses the textual MIPS subset into normalized [`Instruction`] records:
//! 1. **Cleaning:** strips `//` and `;` comments and blank lines.
//! 2. **Labels:** accepts standalone (`LOOP:`) and inline (`LOOP: L.D ...`)
//!    label definitions.
//! 3. **Resolution:** a second pass rewrites branch-target labels into
//!    instruction indices, so the core never sees a symbolic target.
//!
//! Errors carry 1-based source line numbers.

use std::collections::HashMap;

use crate::common::{RegName, SimError};

use super::instruction::Instruction;
use super::opcode::OpCode;

struct RawLine {
    line_no: usize,
    op: OpCode,
    operands: Vec<String>,
}

/// Parses a full assembly program.
///
/// Labels may point one past the last instruction (a branch there simply ends
/// the program). A label that never precedes an instruction and is never
/// referenced is tolerated.
pub fn parse_program(source: &str) -> Result<Vec<Instruction>, SimError> {
    let mut raw: Vec<RawLine> = Vec::new();
    let mut labels: HashMap<String, usize> = HashMap::new();

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let mut text = strip_comment(line).trim().to_string();
        if text.is_empty() {
            continue;
        }

        // Peel label definitions off the front. More than one label may
        // stack on the same instruction.
        while let Some(colon) = text.find(':') {
            let (label, rest) = text.split_at(colon);
            let label = label.trim();
            if label.is_empty() || label.contains(char::is_whitespace) {
                break;
            }
            if labels.insert(label.to_string(), raw.len()).is_some() {
                return Err(SimError::ParseError {
                    line: line_no,
                    message: format!("duplicate label '{}'", label),
                });
            }
            text = rest[1..].trim().to_string();
        }
        if text.is_empty() {
            continue;
        }

        let (mnemonic, rest) = match text.split_once(char::is_whitespace) {
            Some((m, r)) => (m, r.trim()),
            None => (text.as_str(), ""),
        };
        let op = mnemonic
            .parse::<OpCode>()
            .map_err(|_| SimError::ParseError {
                line: line_no,
                message: format!("unknown instruction '{}'", mnemonic),
            })?;
        let operands: Vec<String> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(|s| s.trim().to_string()).collect()
        };
        raw.push(RawLine {
            line_no,
            op,
            operands,
        });
    }

    let count = raw.len();
    raw.iter()
        .enumerate()
        .map(|(i, line)| build_instruction(line, (i + 1) as u32, &labels, count))
        .collect()
}

fn strip_comment(line: &str) -> &str {
    let cut = line
        .find("//")
        .into_iter()
        .chain(line.find(';'))
        .min()
        .unwrap_or(line.len());
    &line[..cut]
}

fn build_instruction(
    line: &RawLine,
    id: u32,
    labels: &HashMap<String, usize>,
    program_len: usize,
) -> Result<Instruction, SimError> {
    let op = line.op;
    if op.is_integer_immediate() {
        let [dest, src, imm] = expect_operands::<3>(line)?;
        Ok(Instruction::immediate(
            id,
            op,
            parse_reg(dest, line.line_no)?,
            parse_reg(src, line.line_no)?,
            parse_int(imm, line.line_no)?,
        ))
    } else if op.is_load() {
        let [dest, mem] = expect_operands::<2>(line)?;
        let (offset, base) = parse_mem_operand(mem, line.line_no)?;
        Ok(Instruction::load(
            id,
            op,
            parse_reg(dest, line.line_no)?,
            offset,
            base,
        ))
    } else if op.is_store() {
        let [src, mem] = expect_operands::<2>(line)?;
        let (offset, base) = parse_mem_operand(mem, line.line_no)?;
        Ok(Instruction::store(
            id,
            op,
            parse_reg(src, line.line_no)?,
            offset,
            base,
        ))
    } else if op.is_branch() {
        let [src1, src2, target] = expect_operands::<3>(line)?;
        let target = resolve_target(target, labels, program_len, line.line_no)?;
        Ok(Instruction::branch(
            id,
            op,
            parse_reg(src1, line.line_no)?,
            parse_reg(src2, line.line_no)?,
            target,
        ))
    } else {
        let [dest, src1, src2] = expect_operands::<3>(line)?;
        Ok(Instruction::compute(
            id,
            op,
            parse_reg(dest, line.line_no)?,
            parse_reg(src1, line.line_no)?,
            parse_reg(src2, line.line_no)?,
        ))
    }
}

fn expect_operands<const N: usize>(line: &RawLine) -> Result<[&str; N], SimError> {
    if line.operands.len() != N {
        return Err(SimError::ParseError {
            line: line.line_no,
            message: format!(
                "{} expects {} operands, found {}",
                line.op,
                N,
                line.operands.len()
            ),
        });
    }
    let mut out = [""; N];
    for (slot, operand) in out.iter_mut().zip(&line.operands) {
        *slot = operand.as_str();
    }
    Ok(out)
}

fn parse_reg(text: &str, line_no: usize) -> Result<RegName, SimError> {
    RegName::parse(text).map_err(|_| SimError::ParseError {
        line: line_no,
        message: format!("invalid register '{}'", text),
    })
}

fn parse_int(text: &str, line_no: usize) -> Result<i32, SimError> {
    text.parse().map_err(|_| SimError::ParseError {
        line: line_no,
        message: format!("invalid immediate '{}'", text),
    })
}

/// Parses `offset(Rbase)`; an empty offset means 0.
fn parse_mem_operand(text: &str, line_no: usize) -> Result<(i32, RegName), SimError> {
    let bad = || SimError::ParseError {
        line: line_no,
        message: format!("invalid memory operand '{}'", text),
    };
    let open = text.find('(').ok_or_else(bad)?;
    if !text.ends_with(')') {
        return Err(bad());
    }
    let offset_text = text[..open].trim();
    let offset = if offset_text.is_empty() {
        0
    } else {
        parse_int(offset_text, line_no)?
    };
    let base = parse_reg(text[open + 1..text.len() - 1].trim(), line_no)?;
    Ok((offset, base))
}

fn resolve_target(
    text: &str,
    labels: &HashMap<String, usize>,
    program_len: usize,
    line_no: usize,
) -> Result<i32, SimError> {
    let index = if let Ok(index) = text.parse::<i32>() {
        index
    } else if let Some(&index) = labels.get(text) {
        index as i32
    } else {
        return Err(SimError::ParseError {
            line: line_no,
            message: format!("unknown branch target '{}'", text),
        });
    };
    if index < 0 || index as usize > program_len {
        return Err(SimError::ParseError {
            line: line_no,
            message: format!("branch target {} out of range", index),
        });
    }
    Ok(index)
}
