use std::convert::TryFrom;
use std::fmt;
use std::io::{self, Write};

use crate::alu::{self, AluError, AluOp};
use crate::memory::{Byte, MemoryError, Ram, Word, RAM_SIZE};
use crate::registers::{Flags, RegisterError, Registers};
use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("unknown opcode 0b{opcode:08b} at pc 0x{pc:02X}")]
    UnknownOpcode { opcode: Byte, pc: Word },
    /// The dispatch table sent a non-ALU instruction to the ALU
    #[error("unsupported ALU operation `{0}`")]
    UnsupportedAluOp(Instruction),
    #[error("processor has already halted")]
    Halted,
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error("failed to write output")]
    Output(#[from] io::Error),
}

impl From<AluError> for ExecError {
    fn from(err: AluError) -> Self {
        match err {
            AluError::Unsupported(instruction) => ExecError::UnsupportedAluOp(instruction),
            AluError::Register(err) => ExecError::Register(err),
        }
    }
}

pub type Result<T, E = ExecError> = std::result::Result<T, E>;

/// Implements a single instruction. Receives the two bytes following the
/// opcode, whether the instruction uses them or not.
pub type Handler = fn(&mut Processor, &mut dyn Write, Byte, Byte) -> Result<()>;

/// Maps every opcode byte to the handler implementing it
#[derive(Clone, Copy)]
pub struct DispatchTable {
    handlers: [Option<Handler>; 256],
}

impl Default for DispatchTable {
    fn default() -> Self {
        let mut handlers: [Option<Handler>; 256] = [None; 256];
        for instruction in Instruction::ALL {
            handlers[Byte::from(*instruction) as usize] = Some(Self::handler(*instruction));
        }
        Self { handlers }
    }
}

impl DispatchTable {
    fn handler(instruction: Instruction) -> Handler {
        match instruction {
            Instruction::HLT => Processor::hlt,
            Instruction::RET => Processor::ret,
            Instruction::PUSH => Processor::push,
            Instruction::POP => Processor::pop,
            Instruction::PRN => Processor::prn,
            Instruction::CALL => Processor::call,
            Instruction::JMP => Processor::jmp,
            Instruction::JEQ => Processor::jeq,
            Instruction::JNE => Processor::jne,
            Instruction::LDI => Processor::ldi,
            Instruction::ST => Processor::st,
            Instruction::ADD => Processor::add,
            Instruction::MUL => Processor::mul,
            Instruction::CMP => Processor::cmp,
        }
    }

    /// Looks up the handler for `opcode`
    pub fn get(&self, opcode: Byte) -> Option<Handler> {
        self.handlers[opcode as usize]
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(
                self.handlers
                    .iter()
                    .enumerate()
                    .filter(|(_, handler)| handler.is_some())
                    .filter_map(|(opcode, _)| Instruction::try_from(opcode as Byte).ok()),
            )
            .finish()
    }
}

/// Emulates the LS-8 CPU together with its memory
#[derive(Debug, Clone)]
pub struct Processor {
    /// Program counter
    pub pc: Word,
    /// General purpose registers, `R7` is the stack pointer
    pub registers: Registers,
    /// Result of the last `CMP`
    pub flags: Flags,
    pub memory: Ram,
    /// Cleared by `HLT`
    running: bool,
    /// Log a trace line before every instruction
    tracing: bool,
    cycles: u64,
    dispatch: DispatchTable,
}

impl Default for Processor {
    /// Initializes a new CPU with empty memory
    fn default() -> Self {
        Self::new(Ram::default())
    }
}

impl Processor {
    /// Initializes a new CPU which will run the program in `memory`
    /// starting at address 0
    pub fn new(memory: Ram) -> Self {
        Self {
            pc: 0,
            registers: Registers::default(),
            flags: Flags::default(),
            memory,
            running: true,
            tracing: false,
            cycles: 0,
            dispatch: DispatchTable::default(),
        }
    }

    pub fn set_tracing(&mut self, tracing: bool) {
        self.tracing = tracing;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of instructions executed so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs one execution step
    pub fn execute(&mut self, out: &mut dyn Write) -> Result<()> {
        if !self.running {
            return Err(ExecError::Halted);
        }
        if self.tracing {
            trace!("{}", self.trace());
        }

        let opcode = self.memory.read_byte(self.pc)?; // Read opcode where PC is
        let handler = self
            .dispatch
            .get(opcode)
            .ok_or(ExecError::UnknownOpcode {
                opcode,
                pc: self.pc,
            })?;

        // Only the operands the instruction declares are fetched
        let count = operand_count(opcode);
        let operand_a = self.fetch_operand(count, 0)?;
        let operand_b = self.fetch_operand(count, 1)?;

        handler(self, out, operand_a, operand_b)?;
        self.cycles += 1;

        Ok(())
    }

    /// Run program until `HLT` is executed or an error occurs
    pub fn run(&mut self, out: &mut dyn Write) -> Result<()> {
        while self.running {
            self.execute(out)?;
        }

        info!("Program halted after {} cycle(s)", self.cycles);

        Ok(())
    }

    /// Formats the CPU state as `TRACE: PC | B0 B1 B2 | R0 .. R7`
    pub fn trace(&self) -> String {
        let peek = |offset: usize| {
            self.memory
                .data
                .get(self.pc as usize + offset)
                .copied()
                .unwrap_or(0)
        };

        let mut line = format!(
            "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
            self.pc,
            peek(0),
            peek(1),
            peek(2)
        );
        for value in self.registers.as_slice() {
            line.push_str(&format!(" {:02X}", value));
        }

        line
    }

    fn fetch_operand(&self, count: u8, index: u8) -> Result<Byte> {
        if index < count {
            Ok(self.memory.read_byte(self.pc + 1 + index as Word)?)
        } else {
            Ok(0)
        }
    }

    fn advance(&mut self, instruction: Instruction) {
        self.pc += instruction.width() as Word;
    }

    fn push_byte(&mut self, value: Byte) -> Result<()> {
        let sp = self.registers.sp().wrapping_sub(1);
        self.memory.write_byte(sp as Word, value)?;
        self.registers.set_sp(sp);
        Ok(())
    }

    fn pop_byte(&mut self) -> Result<Byte> {
        let sp = self.registers.sp();
        let value = self.memory.read_byte(sp as Word)?;
        self.registers.set_sp(sp.wrapping_add(1));
        Ok(value)
    }

    fn alu(&mut self, instruction: Instruction, reg_a: Byte, reg_b: Byte) -> Result<()> {
        let op = AluOp::try_from(instruction)?;
        alu::execute(op, &mut self.registers, &mut self.flags, reg_a, reg_b)?;
        self.advance(instruction);

        debug!(
            "{} R{} R{}: {} {}",
            instruction,
            reg_a,
            reg_b,
            self.registers.read(reg_a)?,
            self.flags
        );
        Ok(())
    }

    fn jump_if(&mut self, instruction: Instruction, reg: Byte, condition: bool) -> Result<()> {
        let addr = self.registers.read(reg)?;
        if condition {
            self.pc = addr as Word;
        } else {
            self.advance(instruction);
        }

        debug!("{} {}: {}", instruction, addr, condition);
        Ok(())
    }

    fn hlt(&mut self, _: &mut dyn Write, _: Byte, _: Byte) -> Result<()> {
        self.running = false; // stop the fetch loop

        debug!("HLT");
        Ok(())
    }

    fn ldi(&mut self, _: &mut dyn Write, reg: Byte, value: Byte) -> Result<()> {
        self.registers.write(reg, value)?;
        self.advance(Instruction::LDI);

        debug!("LDI R{} {}", reg, value);
        Ok(())
    }

    fn prn(&mut self, out: &mut dyn Write, reg: Byte, _: Byte) -> Result<()> {
        let value = self.registers.read(reg)?;
        writeln!(out, "{}", value)?;
        out.flush()?;
        self.advance(Instruction::PRN);

        debug!("PRN R{}: {}", reg, value);
        Ok(())
    }

    fn st(&mut self, _: &mut dyn Write, reg_a: Byte, reg_b: Byte) -> Result<()> {
        let addr = self.registers.read(reg_a)?;
        let value = self.registers.read(reg_b)?;
        self.memory.write_byte(addr as Word, value)?;
        self.advance(Instruction::ST);

        debug!("ST [{}] {}", addr, value);
        Ok(())
    }

    fn add(&mut self, _: &mut dyn Write, reg_a: Byte, reg_b: Byte) -> Result<()> {
        self.alu(Instruction::ADD, reg_a, reg_b)
    }

    fn mul(&mut self, _: &mut dyn Write, reg_a: Byte, reg_b: Byte) -> Result<()> {
        self.alu(Instruction::MUL, reg_a, reg_b)
    }

    fn cmp(&mut self, _: &mut dyn Write, reg_a: Byte, reg_b: Byte) -> Result<()> {
        self.alu(Instruction::CMP, reg_a, reg_b)
    }

    fn push(&mut self, _: &mut dyn Write, reg: Byte, _: Byte) -> Result<()> {
        let value = self.registers.read(reg)?;
        self.push_byte(value)?;
        self.advance(Instruction::PUSH);

        debug!("PUSH R{}: {}", reg, value);
        Ok(())
    }

    fn pop(&mut self, _: &mut dyn Write, reg: Byte, _: Byte) -> Result<()> {
        // validate the target before touching the stack
        self.registers.read(reg)?;
        let value = self.pop_byte()?;
        self.registers.write(reg, value)?;
        self.advance(Instruction::POP);

        debug!("POP R{}: {}", reg, value);
        Ok(())
    }

    fn call(&mut self, _: &mut dyn Write, reg: Byte, _: Byte) -> Result<()> {
        let addr = self.registers.read(reg)?;
        let ret = self.pc + Instruction::CALL.width() as Word;
        let ret = Byte::try_from(ret).map_err(|_| MemoryError::OutOfBounds {
            address: ret as usize,
            size: RAM_SIZE,
        })?;

        self.push_byte(ret)?;
        self.pc = addr as Word;

        debug!("CALL {}: return to {}", addr, ret);
        Ok(())
    }

    fn ret(&mut self, _: &mut dyn Write, _: Byte, _: Byte) -> Result<()> {
        let addr = self.pop_byte()?;
        self.pc = addr as Word;

        debug!("RET {}", addr);
        Ok(())
    }

    fn jmp(&mut self, _: &mut dyn Write, reg: Byte, _: Byte) -> Result<()> {
        self.jump_if(Instruction::JMP, reg, true)
    }

    fn jeq(&mut self, _: &mut dyn Write, reg: Byte, _: Byte) -> Result<()> {
        let equal = self.flags.equal();
        self.jump_if(Instruction::JEQ, reg, equal)
    }

    fn jne(&mut self, _: &mut dyn Write, reg: Byte, _: Byte) -> Result<()> {
        let equal = self.flags.equal();
        self.jump_if(Instruction::JNE, reg, !equal)
    }
}

/// The two high bits of every opcode hold its number of operands
pub fn operand_count(opcode: Byte) -> u8 {
    opcode >> 6
}

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal , )+ ) => {
        /// Defines the LS-8 instruction set
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

instructions! {
    /// Stop the execution of the program
    HLT = 0b0000_0001,
    /// Return from a subroutine to the address on top of the stack
    RET = 0b0001_0001,
    /// Push a register onto the stack
    /// @param reg The register to push
    PUSH = 0b0100_0101,
    /// Pop the top of the stack into a register
    /// @param reg The register to write
    POP = 0b0100_0110,
    /// Print the decimal value of a register
    /// @param reg The register to print
    PRN = 0b0100_0111,
    /// Push the return address and jump to the address in a register
    /// @param reg The register holding the subroutine address
    CALL = 0b0101_0000,
    /// Jump to the address in a register
    /// @param reg The register holding the address
    JMP = 0b0101_0100,
    /// Jump if the equal flag is set
    /// @param reg The register holding the address
    JEQ = 0b0101_0101,
    /// Jump if the equal flag is clear
    /// @param reg The register holding the address
    JNE = 0b0101_0110,
    /// Load an immediate into a register
    /// @param reg The register to write
    /// @param value The value to load
    LDI = 0b1000_0010,
    /// Store the value of register B at the address held by register A
    /// @param reg_a The register holding the address
    /// @param reg_b The register holding the value
    ST = 0b1000_0100,
    /// Add register B to register A
    ADD = 0b1010_0000,
    /// Multiply register A by register B
    MUL = 0b1010_0010,
    /// Compare two registers and set the flags
    CMP = 0b1010_0111,
}

impl Instruction {
    pub fn operand_count(self) -> u8 {
        operand_count(self.into())
    }

    /// Size of the instruction including its operands
    pub fn width(self) -> u8 {
        1 + self.operand_count()
    }
}
