//! Interpreter for the RV32I base integer ISA plus the M extension.
//!
//! https://riscv.org/technical/specifications/
//!
//! A [`execute::Hart`] fetches words from a flat image starting at PC 0,
//! dispatches them by opcode to one executor per instruction family and
//! stops on a halting `ECALL`, at the end of the image or on a fault.

pub type Uxlen = u32;
pub type Ixlen = i32;

pub mod alu;
pub mod config;
pub mod decode;
pub mod execute;
pub mod loader;
pub mod platform;
pub mod termination;
