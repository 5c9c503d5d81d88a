//! Instruction formats of the base ISA, chapter 2.2 and 2.3.
//!
//! Every format keeps the raw fragments as they sit in the encoding.
//! The `imm()` accessors reassemble them and sign extend where the
//! format defines a signed immediate.

use num_enum::TryFromPrimitive;

use crate::platform::exception::DecodeFault;
use crate::{Ixlen, Uxlen};

/// Extracts `width` bits starting at bit `lsb`.
const fn field(instr: u32, lsb: u32, width: u32) -> u32 {
    (instr >> lsb) & ((1 << width) - 1)
}

/// Sign extends the lower `bits` bits of `value` to a full register.
///
/// Bit `bits - 1` is the sign bit, everything above it is discarded.
pub const fn sign_extend(value: u32, bits: u32) -> Ixlen {
    let shift = 32 - bits;
    // Shifting as i32 garantees sign extension
    ((value << shift) as i32) >> shift
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RType {
    pub opcode: u8,
    pub rd: u8,
    pub funct3: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub funct7: u8,
}

impl From<u32> for RType {
    fn from(instr: u32) -> RType {
        RType {
            opcode: field(instr, 0, 7) as u8,
            rd: field(instr, 7, 5) as u8,
            funct3: field(instr, 12, 3) as u8,
            rs1: field(instr, 15, 5) as u8,
            rs2: field(instr, 20, 5) as u8,
            funct7: field(instr, 25, 7) as u8,
        }
    }
}

/// Used by OP-IMM, LOAD, JALR and SYSTEM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IType {
    pub opcode: u8,
    pub rd: u8,
    pub funct3: u8,
    pub rs1: u8,
    pub imm11_0: u16,
}

impl From<u32> for IType {
    fn from(instr: u32) -> IType {
        IType {
            opcode: field(instr, 0, 7) as u8,
            rd: field(instr, 7, 5) as u8,
            funct3: field(instr, 12, 3) as u8,
            rs1: field(instr, 15, 5) as u8,
            imm11_0: field(instr, 20, 12) as u16,
        }
    }
}

impl IType {
    pub fn imm(&self) -> Ixlen {
        sign_extend(self.imm11_0 as u32, 12)
    }

    /// Shift amount of SLLI, SRLI and SRAI.
    pub fn shamt(&self) -> u32 {
        (self.imm11_0 & 0b1_1111) as u32
    }

    /// The upper seven immediate bits, which act as funct7 for shifts.
    pub fn imm11_5(&self) -> u8 {
        (self.imm11_0 >> 5) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SType {
    pub opcode: u8,
    pub imm4_0: u8,
    pub funct3: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub imm11_5: u8,
}

impl From<u32> for SType {
    fn from(instr: u32) -> SType {
        SType {
            opcode: field(instr, 0, 7) as u8,
            imm4_0: field(instr, 7, 5) as u8,
            funct3: field(instr, 12, 3) as u8,
            rs1: field(instr, 15, 5) as u8,
            rs2: field(instr, 20, 5) as u8,
            imm11_5: field(instr, 25, 7) as u8,
        }
    }
}

impl SType {
    pub fn imm(&self) -> Ixlen {
        sign_extend(self.imm4_0 as u32 | (self.imm11_5 as u32) << 5, 12)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BType {
    pub opcode: u8,
    pub imm11: u8,
    pub imm4_1: u8,
    pub funct3: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub imm10_5: u8,
    pub imm12: u8,
}

impl From<u32> for BType {
    fn from(instr: u32) -> BType {
        BType {
            opcode: field(instr, 0, 7) as u8,
            imm11: field(instr, 7, 1) as u8,
            imm4_1: field(instr, 8, 4) as u8,
            funct3: field(instr, 12, 3) as u8,
            rs1: field(instr, 15, 5) as u8,
            rs2: field(instr, 20, 5) as u8,
            imm10_5: field(instr, 25, 6) as u8,
            imm12: field(instr, 31, 1) as u8,
        }
    }
}

impl BType {
    /// Branch offset, a 13 bit value whose bit 0 is always zero.
    pub fn imm(&self) -> Ixlen {
        let offset = (self.imm4_1 as u32) << 1
            | (self.imm10_5 as u32) << 5
            | (self.imm11 as u32) << 11
            | (self.imm12 as u32) << 12;
        sign_extend(offset, 13)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UType {
    pub opcode: u8,
    pub rd: u8,
    pub imm31_12: u32,
}

impl From<u32> for UType {
    fn from(instr: u32) -> UType {
        UType {
            opcode: field(instr, 0, 7) as u8,
            rd: field(instr, 7, 5) as u8,
            imm31_12: field(instr, 12, 20),
        }
    }
}

impl UType {
    /// Already occupies the upper bits, so there is nothing to extend.
    pub fn imm(&self) -> Uxlen {
        self.imm31_12 << 12
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JType {
    pub opcode: u8,
    pub rd: u8,
    pub imm19_12: u8,
    pub imm11: u8,
    pub imm10_1: u16,
    pub imm20: u8,
}

impl From<u32> for JType {
    fn from(instr: u32) -> JType {
        JType {
            opcode: field(instr, 0, 7) as u8,
            rd: field(instr, 7, 5) as u8,
            imm19_12: field(instr, 12, 8) as u8,
            imm11: field(instr, 20, 1) as u8,
            imm10_1: field(instr, 21, 10) as u16,
            imm20: field(instr, 31, 1) as u8,
        }
    }
}

impl JType {
    /// Jump offset, a 21 bit value whose bit 0 is always zero.
    pub fn imm(&self) -> Ixlen {
        let offset = (self.imm10_1 as u32) << 1
            | (self.imm11 as u32) << 11
            | (self.imm19_12 as u32) << 12
            | (self.imm20 as u32) << 20;
        sign_extend(offset, 21)
    }
}

/// The major opcodes of RV32IM, from the opcode map in chapter 24.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Load = 0b00_000_11,
    OpImm = 0b00_100_11,
    Auipc = 0b00_101_11,
    Store = 0b01_000_11,
    Op = 0b01_100_11,
    Lui = 0b01_101_11,
    Branch = 0b11_000_11,
    Jalr = 0b11_001_11,
    Jal = 0b11_011_11,
    System = 0b11_100_11,
}

impl Opcode {
    pub fn decode(instr: u32) -> Result<Opcode, DecodeFault> {
        Opcode::try_from(get_opcode(instr)).map_err(|err| DecodeFault::Opcode(err.number))
    }
}

pub fn get_opcode(instr: u32) -> u8 {
    (instr & 0b111_1111) as u8
}
