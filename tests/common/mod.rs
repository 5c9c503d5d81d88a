//! Minimal instruction encoder for building test programs.

#![allow(dead_code)]

pub const OP: u32 = 0b011_0011;
pub const OP_IMM: u32 = 0b001_0011;
pub const LOAD: u32 = 0b000_0011;
pub const STORE: u32 = 0b010_0011;
pub const BRANCH: u32 = 0b110_0011;
pub const LUI: u32 = 0b011_0111;
pub const AUIPC: u32 = 0b001_0111;
pub const JAL: u32 = 0b110_1111;
pub const JALR: u32 = 0b110_0111;
pub const SYSTEM: u32 = 0b111_0011;

pub fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32) -> u32 {
    funct7 << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | OP
}

pub fn i_type(opcode: u32, imm: i32, rs1: u32, funct3: u32, rd: u32) -> u32 {
    (imm as u32 & 0xfff) << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | opcode
}

pub fn s_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = imm as u32;
    (imm >> 5 & 0x7f) << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | (imm & 0x1f) << 7 | STORE
}

pub fn b_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = imm as u32;
    (imm >> 12 & 1) << 31
        | (imm >> 5 & 0x3f) << 25
        | rs2 << 20
        | rs1 << 15
        | funct3 << 12
        | (imm >> 1 & 0xf) << 8
        | (imm >> 11 & 1) << 7
        | BRANCH
}

pub fn j_type(imm: i32, rd: u32) -> u32 {
    let imm = imm as u32;
    (imm >> 20 & 1) << 31
        | (imm >> 1 & 0x3ff) << 21
        | (imm >> 11 & 1) << 20
        | (imm >> 12 & 0xff) << 12
        | rd << 7
        | JAL
}

pub fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(OP_IMM, imm, rs1, 0b000, rd)
}

pub fn add(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0, rs2, rs1, 0b000, rd)
}

pub fn sub(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0b010_0000, rs2, rs1, 0b000, rd)
}

pub fn mul(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(1, rs2, rs1, 0b000, rd)
}

pub fn div(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(1, rs2, rs1, 0b100, rd)
}

pub fn remu(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(1, rs2, rs1, 0b111, rd)
}

pub fn lui(rd: u32, imm20: u32) -> u32 {
    (imm20 & 0xf_ffff) << 12 | rd << 7 | LUI
}

pub fn lw(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(LOAD, imm, rs1, 0b010, rd)
}

pub fn lb(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(LOAD, imm, rs1, 0b000, rd)
}

pub fn sw(rs2: u32, rs1: u32, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 0b010)
}

pub fn sb(rs2: u32, rs1: u32, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 0b000)
}

pub fn beq(rs1: u32, rs2: u32, imm: i32) -> u32 {
    b_type(imm, rs2, rs1, 0b000)
}

pub fn bne(rs1: u32, rs2: u32, imm: i32) -> u32 {
    b_type(imm, rs2, rs1, 0b001)
}

pub fn jal(rd: u32, imm: i32) -> u32 {
    j_type(imm, rd)
}

pub fn jalr(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(JALR, imm, rs1, 0b000, rd)
}

pub const ECALL: u32 = SYSTEM;

/// Little endian image bytes of `program`.
pub fn image(program: &[u32]) -> Vec<u8> {
    program.iter().flat_map(|word| word.to_le_bytes()).collect()
}

pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .format_timestamp(None)
        .is_test(true)
        .try_init();
}
