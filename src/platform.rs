use std::fmt;

use crate::{Ixlen, Uxlen};

use self::exception::Fault;

pub mod exception {
    use crate::decode::Opcode;
    use crate::Uxlen;

    /// Anything that stops the hart before a halting environment call.
    /// None of these are recoverable, the step that raised it has no effect.
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum Fault {
        #[error("illegal instruction: {0}")]
        IllegalInstruction(#[from] DecodeFault),

        #[error("instruction fetch at {pc:#010x} is outside the loaded image")]
        FetchAccessFault { pc: Uxlen },

        #[error("instruction fetch at {pc:#010x} is not word aligned")]
        FetchMisaligned { pc: Uxlen },

        #[error("{width} byte stack access at sp {sp:#010x} is out of bounds")]
        StackAccessFault { sp: Uxlen, width: usize },

        #[error("unsupported environment call (x10 = {0})")]
        UnsupportedEcall(Uxlen),
    }

    /// The encoding does not name an instruction this hart implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
    pub enum DecodeFault {
        #[error("unknown opcode {0:#09b}")]
        Opcode(u8),

        #[error("invalid funct3 {funct3:#05b} for {opcode:?}")]
        Funct3 { opcode: Opcode, funct3: u8 },

        #[error("invalid funct7 {funct7:#09b} with funct3 {funct3:#05b} for {opcode:?}")]
        Funct7 {
            opcode: Opcode,
            funct3: u8,
            funct7: u8,
        },

        #[error("unsupported system instruction (funct3 {funct3:#05b}, imm {imm:#05x})")]
        System { funct3: u8, imm: u16 },
    }
}

/// The integer register file.
///
/// x0 is always zero
/// x1 is usually the return address
/// x2 is usually the stack pointer
/// # INVARIANT
/// regs[0] is always zero!
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [Uxlen; 32],
}

impl RegisterFile {
    /// Size of [`RegisterFile::to_le_bytes`].
    pub const DUMP_SIZE: usize = 32 * 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// `index` is a 5 bit register field, larger values wrap around.
    pub fn read(&self, index: u8) -> Uxlen {
        self.regs[(index & 0b1_1111) as usize]
    }

    /// Writes to x0 are ignored.
    pub fn write(&mut self, index: u8, value: Uxlen) {
        let index = (index & 0b1_1111) as usize;
        if index == 0 {
            log::debug!("Ignored write of {value:#010x} to x0");
            return;
        }
        self.regs[index] = value;
    }

    /// Flat dump: x0 first, every register little endian, no header.
    pub fn to_le_bytes(&self) -> [u8; Self::DUMP_SIZE] {
        let mut bytes = [0u8; Self::DUMP_SIZE];
        for (chunk, reg) in bytes.chunks_exact_mut(4).zip(self.regs.iter()) {
            chunk.copy_from_slice(&reg.to_le_bytes());
        }
        bytes
    }
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Register file:")?;
        for (index, value) in self.regs.iter().enumerate() {
            writeln!(
                f,
                "{:>4} = {:#010x} ({})",
                format!("x{index}"),
                value,
                *value as Ixlen
            )?;
        }
        Ok(())
    }
}

/// Byte addressable data memory, accessed by byte (1B), halfword (2B) or word (4B).
/// Values are little endian.
pub trait AddressSpace {
    fn read_byte(&self, addr: Uxlen) -> Result<u8, Fault>;
    fn read_halfword(&self, addr: Uxlen) -> Result<u16, Fault>;
    fn read_word(&self, addr: Uxlen) -> Result<u32, Fault>;

    fn write_byte(&mut self, addr: Uxlen, val: u8) -> Result<(), Fault>;
    fn write_halfword(&mut self, addr: Uxlen, val: u16) -> Result<(), Fault>;
    fn write_word(&mut self, addr: Uxlen, val: u32) -> Result<(), Fault>;
}

/// Downward growing stack memory.
///
/// An address is a stack pointer value and maps to the physical index
/// `CAPACITY - sp`. Byte `k` of a multi byte value lives at `sp + k`,
/// which is physical index `CAPACITY - sp - k`.
pub struct Stack {
    memory: Box<[u8]>,
}

impl Stack {
    pub const CAPACITY: usize = 0x10_0000;

    pub fn new() -> Self {
        // Cannot use `Box::new([0u8; CAPACITY])` as this creates the data on the stack first.
        Stack {
            memory: vec![0u8; Self::CAPACITY].into_boxed_slice(),
        }
    }

    /// Physical index of the least significant byte, checking that all
    /// `width` bytes of the access are in bounds.
    fn index(sp: Uxlen, width: usize) -> Result<usize, Fault> {
        let lsb_index = Self::CAPACITY as i64 - sp as Ixlen as i64;
        let msb_index = lsb_index - (width as i64 - 1);
        if msb_index >= 0 && lsb_index < Self::CAPACITY as i64 {
            Ok(lsb_index as usize)
        } else {
            Err(Fault::StackAccessFault { sp, width })
        }
    }

    fn read<const WIDTH: usize>(&self, sp: Uxlen) -> Result<[u8; WIDTH], Fault> {
        let lsb_index = Self::index(sp, WIDTH)?;
        let mut bytes = [0u8; WIDTH];
        for (k, byte) in bytes.iter_mut().enumerate() {
            *byte = self.memory[lsb_index - k];
        }
        Ok(bytes)
    }

    fn write<const WIDTH: usize>(&mut self, sp: Uxlen, bytes: [u8; WIDTH]) -> Result<(), Fault> {
        let lsb_index = Self::index(sp, WIDTH)?;
        for (k, byte) in bytes.into_iter().enumerate() {
            self.memory[lsb_index - k] = byte;
        }
        Ok(())
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("capacity", &self.memory.len())
            .finish()
    }
}

impl AddressSpace for Stack {
    fn read_byte(&self, addr: Uxlen) -> Result<u8, Fault> {
        Ok(self.read::<1>(addr)?[0])
    }

    fn read_halfword(&self, addr: Uxlen) -> Result<u16, Fault> {
        self.read(addr).map(u16::from_le_bytes)
    }

    fn read_word(&self, addr: Uxlen) -> Result<u32, Fault> {
        self.read(addr).map(u32::from_le_bytes)
    }

    fn write_byte(&mut self, addr: Uxlen, val: u8) -> Result<(), Fault> {
        self.write(addr, [val])
    }

    fn write_halfword(&mut self, addr: Uxlen, val: u16) -> Result<(), Fault> {
        self.write(addr, val.to_le_bytes())
    }

    fn write_word(&mut self, addr: Uxlen, val: u32) -> Result<(), Fault> {
        self.write(addr, val.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x0_is_hardwired() {
        let mut regs = RegisterFile::new();
        regs.write(0, 0xdead_beef);
        assert_eq!(regs.read(0), 0);

        for index in 1..32 {
            regs.write(index, 0x100 + index as Uxlen);
        }
        for index in 1..32 {
            assert_eq!(regs.read(index), 0x100 + index as Uxlen);
        }
        assert_eq!(regs.read(0), 0);
    }

    #[test]
    fn register_dump_layout() {
        let mut regs = RegisterFile::new();
        regs.write(1, 0x1234_5678);
        regs.write(31, 0xffff_fffe);

        let dump = regs.to_le_bytes();
        assert_eq!(dump.len(), 128);
        assert_eq!(dump[0..4], [0, 0, 0, 0]);
        assert_eq!(dump[4..8], [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(dump[124..128], [0xfe, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn register_table_lists_every_register() {
        let mut regs = RegisterFile::new();
        regs.write(3, -12i32 as Uxlen);
        let table = regs.to_string();
        assert_eq!(table.lines().count(), 33);
        assert!(table.contains("  x3 = 0xfffffff4 (-12)"));
    }

    #[test]
    fn mem_test() {
        let mut stack = Stack::new();

        stack
            .write_word(0x100, 0x12_34_56_78)
            .expect("Write bound check failed");
        let index = Stack::CAPACITY - 0x100;
        assert_eq!(stack.memory[index - 3..=index], [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(
            stack.read_word(0x100).expect("Read bounds check failed"),
            0x12_34_56_78
        );
        // Bytes of the word are at increasing sp
        assert_eq!(stack.read_byte(0x100), Ok(0x78));
        assert_eq!(stack.read_byte(0x103), Ok(0x12));
        assert_eq!(stack.read_halfword(0x102), Ok(0x1234));
    }

    #[test]
    fn round_trip_truncates_to_width() {
        let mut stack = Stack::new();
        for sp in [4, 0x800, Stack::CAPACITY as Uxlen - 4] {
            stack.write_byte(sp, 0xab).unwrap();
            assert_eq!(stack.read_byte(sp), Ok(0xab));
            stack.write_halfword(sp, 0xbeef).unwrap();
            assert_eq!(stack.read_halfword(sp), Ok(0xbeef));
            stack.write_word(sp, 0xdead_beef).unwrap();
            assert_eq!(stack.read_word(sp), Ok(0xdead_beef));
        }
    }

    #[test]
    fn out_of_bounds_is_a_fault() {
        let mut stack = Stack::new();
        // sp = 0 maps one past the end of the memory
        assert_eq!(
            stack.read_byte(0),
            Err(Fault::StackAccessFault { sp: 0, width: 1 })
        );
        // Negative stack pointers are above the end as well
        assert!(stack.write_word(-4i32 as Uxlen, 1).is_err());
        // The highest byte of the word would be below index 0
        let last = Stack::CAPACITY as Uxlen;
        assert!(stack.write_byte(last, 1).is_ok());
        assert_eq!(
            stack.write_word(last - 2, 1),
            Err(Fault::StackAccessFault {
                sp: last - 2,
                width: 4
            })
        );
        assert!(stack.write_word(last - 3, 1).is_ok());
        assert!(stack.read_word(Stack::CAPACITY as Uxlen + 1).is_err());
    }
}
