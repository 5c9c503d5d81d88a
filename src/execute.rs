use crate::alu::{self, AluOp};
use crate::decode::{BType, IType, JType, Opcode, RType, SType, UType};
use crate::platform::exception::{DecodeFault, Fault};
use crate::platform::{AddressSpace, RegisterFile, Stack};
use crate::{Ixlen, Uxlen};

/// x10 (a0) selects the environment call, x11 (a1) carries its argument.
const ECALL_SELECTOR: u8 = 10;
const ECALL_ARGUMENT: u8 = 11;

const ECALL_EXIT: Uxlen = 10;
const ECALL_EXIT_WITH_CODE: Uxlen = 17;

/// What the hart does after an instruction retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue at this program counter.
    Next(Uxlen),
    Halt(Halt),
}

/// A program requested termination through `ECALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// x10 = 10
    Exit,
    /// x10 = 17, the code is taken from x11.
    ExitWithCode(Uxlen),
}

impl Halt {
    pub fn exit_code(&self) -> i32 {
        match self {
            Halt::Exit => 0,
            Halt::ExitWithCode(code) => *code as i32,
        }
    }
}

/// Result of an instruction fetch that did not fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    Instruction(u32),
    /// The PC points exactly one word past the last loaded instruction.
    EndOfProgram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Retired,
    Halted(Halt),
    EndOfProgram,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Halted(Halt),
    EndOfProgram,
    StepLimitReached,
    Fault(Fault),
}

/// Signature shared by every instruction family.
///
/// Takes the address and raw word of the instruction and returns the next
/// program counter. An `Err` leaves the register file and memory untouched.
pub type Executor<A> = fn(Uxlen, u32, &mut RegisterFile, &mut A) -> Result<Flow, Fault>;

/// Maps an opcode to the executor of its instruction family.
pub fn dispatch<A: AddressSpace>(opcode: Opcode) -> Executor<A> {
    match opcode {
        Opcode::Op => execute_op::<A>,
        Opcode::OpImm => execute_op_imm::<A>,
        Opcode::Load => execute_load::<A>,
        Opcode::Store => execute_store::<A>,
        Opcode::Branch => execute_branch::<A>,
        Opcode::Lui | Opcode::Auipc => execute_upper_imm::<A>,
        Opcode::Jal => execute_jal::<A>,
        Opcode::Jalr => execute_jalr::<A>,
        Opcode::System => execute_system::<A>,
    }
}

fn next(pc: Uxlen) -> Result<Flow, Fault> {
    Ok(Flow::Next(pc.wrapping_add(4)))
}

fn offset(base: Uxlen, offset: Ixlen) -> Uxlen {
    base.wrapping_add(offset as Uxlen)
}

/// Register-register ALU operations. funct7 bit 0 selects the M extension.
pub fn execute_op<A: AddressSpace>(
    pc: Uxlen,
    instruction: u32,
    regs: &mut RegisterFile,
    _: &mut A,
) -> Result<Flow, Fault> {
    let instr = RType::from(instruction);
    let op = match (instr.funct7, instr.funct3) {
        (0b000_0000, funct3) => AluOp::base(funct3, false),
        (0b010_0000, funct3 @ (0b000 | 0b101)) => AluOp::base(funct3, true),
        (0b000_0001, funct3) => AluOp::muldiv(funct3),
        (funct7, funct3) => {
            return Err(DecodeFault::Funct7 {
                opcode: Opcode::Op,
                funct3,
                funct7,
            }
            .into())
        }
    };
    let result = alu::execute(op, regs.read(instr.rs1), regs.read(instr.rs2));
    regs.write(instr.rd, result);
    next(pc)
}

/// Register-immediate ALU operations.
pub fn execute_op_imm<A: AddressSpace>(
    pc: Uxlen,
    instruction: u32,
    regs: &mut RegisterFile,
    _: &mut A,
) -> Result<Flow, Fault> {
    let instr = IType::from(instruction);
    let (op, operand) = match instr.funct3 {
        0b001 | 0b101 => {
            let arithmetic = instr.imm11_0 & 0b0100_0000_0000 != 0;
            match (instr.funct3, instr.imm11_5()) {
                (0b001, 0b000_0000) | (0b101, 0b000_0000 | 0b010_0000) => {}
                (funct3, funct7) => {
                    return Err(DecodeFault::Funct7 {
                        opcode: Opcode::OpImm,
                        funct3,
                        funct7,
                    }
                    .into())
                }
            }
            (AluOp::base(instr.funct3, arithmetic), instr.shamt())
        }
        funct3 => (AluOp::base(funct3, false), instr.imm() as Uxlen),
    };
    let result = alu::execute(op, regs.read(instr.rs1), operand);
    regs.write(instr.rd, result);
    next(pc)
}

/// LB, LH, LW, LBU and LHU from `rs1 + imm`.
pub fn execute_load<A: AddressSpace>(
    pc: Uxlen,
    instruction: u32,
    regs: &mut RegisterFile,
    mem: &mut A,
) -> Result<Flow, Fault> {
    let instr = IType::from(instruction);
    let addr = offset(regs.read(instr.rs1), instr.imm());
    let value = match instr.funct3 {
        0b000 => mem.read_byte(addr)? as i8 as Ixlen as Uxlen,
        0b001 => mem.read_halfword(addr)? as i16 as Ixlen as Uxlen,
        0b010 => mem.read_word(addr)?,
        0b100 => mem.read_byte(addr)? as Uxlen,
        0b101 => mem.read_halfword(addr)? as Uxlen,
        funct3 => {
            return Err(DecodeFault::Funct3 {
                opcode: Opcode::Load,
                funct3,
            }
            .into())
        }
    };
    regs.write(instr.rd, value);
    next(pc)
}

/// SB, SH and SW of `rs2` to `rs1 + imm`.
pub fn execute_store<A: AddressSpace>(
    pc: Uxlen,
    instruction: u32,
    regs: &mut RegisterFile,
    mem: &mut A,
) -> Result<Flow, Fault> {
    let instr = SType::from(instruction);
    let addr = offset(regs.read(instr.rs1), instr.imm());
    let value = regs.read(instr.rs2);
    match instr.funct3 {
        0b000 => mem.write_byte(addr, value as u8)?,
        0b001 => mem.write_halfword(addr, value as u16)?,
        0b010 => mem.write_word(addr, value)?,
        funct3 => {
            return Err(DecodeFault::Funct3 {
                opcode: Opcode::Store,
                funct3,
            }
            .into())
        }
    }
    next(pc)
}

/// Conditional branches, taken branches continue at `pc + imm`.
pub fn execute_branch<A: AddressSpace>(
    pc: Uxlen,
    instruction: u32,
    regs: &mut RegisterFile,
    _: &mut A,
) -> Result<Flow, Fault> {
    let instr = BType::from(instruction);
    let lhs = regs.read(instr.rs1);
    let rhs = regs.read(instr.rs2);
    let taken = match instr.funct3 {
        0b000 => lhs == rhs,
        0b001 => lhs != rhs,
        0b100 => (lhs as Ixlen) < (rhs as Ixlen),
        0b101 => (lhs as Ixlen) >= (rhs as Ixlen),
        0b110 => lhs < rhs,
        0b111 => lhs >= rhs,
        funct3 => {
            return Err(DecodeFault::Funct3 {
                opcode: Opcode::Branch,
                funct3,
            }
            .into())
        }
    };
    if taken {
        Ok(Flow::Next(offset(pc, instr.imm())))
    } else {
        next(pc)
    }
}

/// LUI and AUIPC, told apart by the opcode.
pub fn execute_upper_imm<A: AddressSpace>(
    pc: Uxlen,
    instruction: u32,
    regs: &mut RegisterFile,
    _: &mut A,
) -> Result<Flow, Fault> {
    let instr = UType::from(instruction);
    let value = if instr.opcode == Opcode::Auipc as u8 {
        pc.wrapping_add(instr.imm())
    } else {
        instr.imm()
    };
    regs.write(instr.rd, value);
    next(pc)
}

pub fn execute_jal<A: AddressSpace>(
    pc: Uxlen,
    instruction: u32,
    regs: &mut RegisterFile,
    _: &mut A,
) -> Result<Flow, Fault> {
    let instr = JType::from(instruction);
    regs.write(instr.rd, pc.wrapping_add(4));
    Ok(Flow::Next(offset(pc, instr.imm())))
}

pub fn execute_jalr<A: AddressSpace>(
    pc: Uxlen,
    instruction: u32,
    regs: &mut RegisterFile,
    _: &mut A,
) -> Result<Flow, Fault> {
    let instr = IType::from(instruction);
    if instr.funct3 != 0 {
        return Err(DecodeFault::Funct3 {
            opcode: Opcode::Jalr,
            funct3: instr.funct3,
        }
        .into());
    }
    // Read the base before linking, rd may equal rs1
    let target = offset(regs.read(instr.rs1), instr.imm()) & !1;
    regs.write(instr.rd, pc.wrapping_add(4));
    Ok(Flow::Next(target))
}

/// Only `ECALL` is supported, x10 selects the call.
pub fn execute_system<A: AddressSpace>(
    _pc: Uxlen,
    instruction: u32,
    regs: &mut RegisterFile,
    _: &mut A,
) -> Result<Flow, Fault> {
    let instr = IType::from(instruction);
    if instr.funct3 != 0 || instr.imm11_0 != 0 {
        return Err(DecodeFault::System {
            funct3: instr.funct3,
            imm: instr.imm11_0,
        }
        .into());
    }
    match regs.read(ECALL_SELECTOR) {
        ECALL_EXIT => Ok(Flow::Halt(Halt::Exit)),
        ECALL_EXIT_WITH_CODE => Ok(Flow::Halt(Halt::ExitWithCode(regs.read(ECALL_ARGUMENT)))),
        selector => Err(Fault::UnsupportedEcall(selector)),
    }
}

/// Hardware Thread
///
/// Owns the architectural state. Instructions are fetched from the loaded
/// image starting at PC 0, data accesses go to `address_space`.
#[derive(Debug)]
pub struct Hart<A: AddressSpace = Stack> {
    pub address_space: A,
    pub regs: RegisterFile,
    pub reg_pc: Uxlen,
    program: Vec<u32>,
    retired: u64,
}

impl Hart<Stack> {
    pub fn new(program: Vec<u32>) -> Self {
        Hart::with_address_space(program, Stack::new())
    }
}

impl<A: AddressSpace> Hart<A> {
    pub fn with_address_space(program: Vec<u32>, address_space: A) -> Self {
        Hart {
            address_space,
            regs: RegisterFile::new(),
            reg_pc: 0,
            program,
            retired: 0,
        }
    }

    /// Number of instructions executed so far.
    pub fn retired(&self) -> u64 {
        self.retired
    }

    pub fn fetch(&self) -> Result<Fetch, Fault> {
        let pc = self.reg_pc;
        if pc % 4 != 0 {
            return Err(Fault::FetchMisaligned { pc });
        }
        let index = (pc / 4) as usize;
        match self.program.get(index) {
            Some(&instruction) => Ok(Fetch::Instruction(instruction)),
            None if index == self.program.len() => Ok(Fetch::EndOfProgram),
            None => Err(Fault::FetchAccessFault { pc }),
        }
    }

    /// Fetches, decodes and executes one instruction, then adopts the
    /// program counter the executor returned.
    ///
    /// On error nothing was changed, the PC still points at the
    /// offending instruction.
    pub fn step(&mut self) -> Result<StepOutcome, Fault> {
        let instruction = match self.fetch()? {
            Fetch::Instruction(instruction) => instruction,
            Fetch::EndOfProgram => return Ok(StepOutcome::EndOfProgram),
        };
        let opcode = Opcode::decode(instruction)?;
        log::trace!("{:#010x}: {:#010x} {:?}", self.reg_pc, instruction, opcode);

        let execute = dispatch::<A>(opcode);
        let flow = execute(
            self.reg_pc,
            instruction,
            &mut self.regs,
            &mut self.address_space,
        )?;
        self.retired += 1;

        match flow {
            Flow::Next(pc) => {
                self.reg_pc = pc;
                Ok(StepOutcome::Retired)
            }
            Flow::Halt(halt) => Ok(StepOutcome::Halted(halt)),
        }
    }

    /// Runs until the program halts, ends, faults or `max_steps`
    /// instructions were executed.
    pub fn run(&mut self, max_steps: Option<u64>) -> StopReason {
        loop {
            if max_steps.map_or(false, |limit| self.retired >= limit) {
                log::debug!("Step limit of {} instructions reached", self.retired);
                return StopReason::StepLimitReached;
            }
            match self.step() {
                Ok(StepOutcome::Retired) => {}
                Ok(StepOutcome::Halted(halt)) => return StopReason::Halted(halt),
                Ok(StepOutcome::EndOfProgram) => return StopReason::EndOfProgram,
                Err(fault) => {
                    log::debug!("Stopped at pc {:#010x}: {fault}", self.reg_pc);
                    return StopReason::Fault(fault);
                }
            }
        }
    }
}
