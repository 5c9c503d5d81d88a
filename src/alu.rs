//! Integer ALU shared by the register-register and register-immediate
//! instructions, including the M extension.
//!
//! All arithmetic wraps. Division never traps:
//!
//! | op     | divisor = 0 | `i32::MIN / -1` |
//! |--------|-------------|-----------------|
//! | DIV    | -1          | `i32::MIN`      |
//! | DIVU   | dividend    |                 |
//! | REM    | dividend    | 0               |
//! | REMU   | dividend    |                 |
//!
//! DIVU by zero returning the dividend deviates from the ISA manual
//! (which asks for all ones). Programs written against this interpreter
//! depend on it, so it is kept.

use crate::{Ixlen, Uxlen};

/// Number of bits in a register (used for high-multiply shift).
const XLEN_BITS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
}

impl AluOp {
    /// Base integer operation selected by funct3. `alternate` is funct7 bit 5
    /// (or immediate bit 10), picking SUB over ADD and SRA over SRL.
    pub fn base(funct3: u8, alternate: bool) -> AluOp {
        match (funct3 & 0b111, alternate) {
            (0b000, false) => AluOp::Add,
            (0b000, true) => AluOp::Sub,
            (0b001, _) => AluOp::Sll,
            (0b010, _) => AluOp::Slt,
            (0b011, _) => AluOp::Sltu,
            (0b100, _) => AluOp::Xor,
            (0b101, false) => AluOp::Srl,
            (0b101, true) => AluOp::Sra,
            (0b110, _) => AluOp::Or,
            _ => AluOp::And,
        }
    }

    /// M extension operation selected by funct3.
    pub fn muldiv(funct3: u8) -> AluOp {
        match funct3 & 0b111 {
            0b000 => AluOp::Mul,
            0b001 => AluOp::Mulh,
            0b010 => AluOp::Mulhsu,
            0b011 => AluOp::Mulhu,
            0b100 => AluOp::Div,
            0b101 => AluOp::Divu,
            0b110 => AluOp::Rem,
            _ => AluOp::Remu,
        }
    }
}

pub fn execute(op: AluOp, a: Uxlen, b: Uxlen) -> Uxlen {
    let shamt = b & 0b1_1111;
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Sll => a << shamt,
        AluOp::Slt => ((a as Ixlen) < (b as Ixlen)) as Uxlen,
        AluOp::Sltu => (a < b) as Uxlen,
        AluOp::Xor => a ^ b,
        AluOp::Srl => a >> shamt,
        AluOp::Sra => ((a as Ixlen) >> shamt) as Uxlen,
        AluOp::Or => a | b,
        AluOp::And => a & b,
        AluOp::Mul => a.wrapping_mul(b),
        AluOp::Mulh => ((a as Ixlen as i64 * b as Ixlen as i64) >> XLEN_BITS) as Uxlen,
        // Operand a is signed, b is unsigned.
        AluOp::Mulhsu => ((a as Ixlen as i64 * b as i64) >> XLEN_BITS) as Uxlen,
        AluOp::Mulhu => ((a as u64 * b as u64) >> XLEN_BITS) as Uxlen,
        AluOp::Div => {
            if b == 0 {
                Uxlen::MAX
            } else {
                (a as Ixlen).wrapping_div(b as Ixlen) as Uxlen
            }
        }
        AluOp::Divu => {
            if b == 0 {
                a
            } else {
                a / b
            }
        }
        AluOp::Rem => {
            if b == 0 {
                a
            } else {
                (a as Ixlen).wrapping_rem(b as Ixlen) as Uxlen
            }
        }
        AluOp::Remu => {
            if b == 0 {
                a
            } else {
                a % b
            }
        }
    }
}
