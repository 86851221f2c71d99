//! Arithmetic logic unit.

use std::convert::TryFrom;

use thiserror::Error;

use crate::memory::Byte;
use crate::processor::Instruction;
use crate::registers::{Flags, RegisterError, Registers};

/// Operations the ALU knows how to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Mul,
    Cmp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AluError {
    /// The dispatch table routed an instruction to the ALU that it can't run
    #[error("unsupported ALU operation `{0}`")]
    Unsupported(Instruction),
    #[error(transparent)]
    Register(#[from] RegisterError),
}

impl TryFrom<Instruction> for AluOp {
    type Error = AluError;

    fn try_from(instruction: Instruction) -> Result<Self, Self::Error> {
        match instruction {
            Instruction::ADD => Ok(AluOp::Add),
            Instruction::MUL => Ok(AluOp::Mul),
            Instruction::CMP => Ok(AluOp::Cmp),
            other => Err(AluError::Unsupported(other)),
        }
    }
}

/// Runs `op` on the registers `reg_a` and `reg_b`.
///
/// `Add` and `Mul` write their wrapped result to `reg_a`, `Cmp` only updates
/// `flags`.
pub fn execute(
    op: AluOp,
    registers: &mut Registers,
    flags: &mut Flags,
    reg_a: Byte,
    reg_b: Byte,
) -> Result<(), AluError> {
    let a = registers.read(reg_a)?;
    let b = registers.read(reg_b)?;

    match op {
        AluOp::Add => registers.write(reg_a, a.wrapping_add(b))?,
        AluOp::Mul => registers.write(reg_a, a.wrapping_mul(b))?,
        AluOp::Cmp => *flags = Flags::compare(a, b),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;
    use proptest::prelude::*;

    fn setup(a: Byte, b: Byte) -> (Registers, Flags) {
        let mut regs = Registers::default();
        regs.write(0, a).unwrap();
        regs.write(1, b).unwrap();
        (regs, Flags::default())
    }

    #[test]
    fn test_add_wraps() -> Result<()> {
        let (mut regs, mut flags) = setup(255, 1);
        execute(AluOp::Add, &mut regs, &mut flags, 0, 1)?;

        assert_eq!(regs.read(0)?, 0);
        assert_eq!(regs.read(1)?, 1);
        assert_eq!(flags, Flags::default());

        Ok(())
    }

    #[test]
    fn test_mul() -> Result<()> {
        let (mut regs, mut flags) = setup(8, 9);
        execute(AluOp::Mul, &mut regs, &mut flags, 0, 1)?;

        assert_eq!(regs.read(0)?, 72);

        Ok(())
    }

    #[test]
    fn test_same_register() -> Result<()> {
        let (mut regs, mut flags) = setup(12, 0);
        execute(AluOp::Add, &mut regs, &mut flags, 0, 0)?;

        assert_eq!(regs.read(0)?, 24);

        Ok(())
    }

    #[test]
    fn test_bad_register() {
        let (mut regs, mut flags) = setup(1, 2);
        let res = execute(AluOp::Add, &mut regs, &mut flags, 0, 9);

        assert_eq!(
            res,
            Err(AluError::Register(RegisterError::OutOfRange { index: 9 }))
        );
    }

    #[test]
    fn test_unsupported() {
        assert_eq!(AluOp::try_from(Instruction::CMP), Ok(AluOp::Cmp));
        assert_eq!(
            AluOp::try_from(Instruction::LDI),
            Err(AluError::Unsupported(Instruction::LDI))
        );
    }

    proptest! {
        #[test]
        fn add_is_modular(a: Byte, b: Byte) {
            let (mut regs, mut flags) = setup(a, b);
            execute(AluOp::Add, &mut regs, &mut flags, 0, 1).unwrap();

            prop_assert_eq!(regs.read(0).unwrap() as u32, (a as u32 + b as u32) % 256);
        }

        #[test]
        fn mul_is_modular(a: Byte, b: Byte) {
            let (mut regs, mut flags) = setup(a, b);
            execute(AluOp::Mul, &mut regs, &mut flags, 0, 1).unwrap();

            prop_assert_eq!(regs.read(0).unwrap() as u32, (a as u32 * b as u32) % 256);
        }

        #[test]
        fn cmp_sets_exactly_one_flag(a: Byte, b: Byte) {
            let (mut regs, mut flags) = setup(a, b);
            let before = regs;
            execute(AluOp::Cmp, &mut regs, &mut flags, 0, 1).unwrap();

            prop_assert_eq!(regs, before);
            prop_assert_eq!(flags.bits().count_ones(), 1);
            prop_assert_eq!(flags.equal(), a == b);
            prop_assert_eq!(flags.greater(), a > b);
            prop_assert_eq!(flags.less(), a < b);
        }
    }
}
