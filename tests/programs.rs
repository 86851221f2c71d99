use std::path::PathBuf;

use color_eyre::eyre::Result;
use ls8::{ExecError, LoadError, Processor, Ram};

fn program(name: &str) -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "programs", name].iter().collect()
}

fn fixture(name: &str) -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", name]
        .iter()
        .collect()
}

fn run_file(path: PathBuf) -> Result<(Processor, String)> {
    let mut cpu = Processor::new(Ram::from_file(path)?);
    let mut out = Vec::new();
    cpu.run(&mut out)?;
    Ok((cpu, String::from_utf8(out)?))
}

#[test]
fn print8() -> Result<()> {
    let (_, out) = run_file(program("print8.ls8"))?;
    assert_eq!(out, "8\n");

    Ok(())
}

#[test]
fn mult() -> Result<()> {
    let (cpu, out) = run_file(program("mult.ls8"))?;
    assert_eq!(out, "72\n");
    assert_eq!(cpu.cycles(), 5);

    Ok(())
}

#[test]
fn stack() -> Result<()> {
    let (cpu, out) = run_file(program("stack.ls8"))?;
    assert_eq!(out, "2\n4\n1\n");
    assert_eq!(cpu.registers.sp(), ls8::registers::STACK_START);

    Ok(())
}

#[test]
fn call() -> Result<()> {
    let (cpu, out) = run_file(program("call.ls8"))?;
    assert_eq!(out, "20\n30\n36\n60\n");
    assert_eq!(cpu.registers.sp(), ls8::registers::STACK_START);

    Ok(())
}

#[test]
fn sctest() -> Result<()> {
    let (_, out) = run_file(program("sctest.ls8"))?;
    assert_eq!(out, "1\n4\n5\n");

    Ok(())
}

#[test]
fn halt_only() -> Result<()> {
    let (cpu, out) = run_file(fixture("halt.ls8"))?;
    assert_eq!(out, "");
    assert!(!cpu.is_running());

    Ok(())
}

#[test]
fn unknown_opcode() -> Result<()> {
    let mut cpu = Processor::new(Ram::from_file(fixture("unknown_opcode.ls8"))?);
    let mut out = Vec::new();

    match cpu.run(&mut out) {
        Err(ExecError::UnknownOpcode { opcode, pc }) => {
            assert_eq!(opcode, 0b1111_1111);
            assert_eq!(pc, 3);
        }
        other => panic!("expected unknown opcode, got {:?}", other),
    }
    assert!(cpu.is_running());

    Ok(())
}

#[test]
fn malformed() {
    match Ram::from_file(fixture("malformed.ls8")) {
        Err(LoadError::Malformed(errors)) => {
            let lines: Vec<usize> = errors.iter().map(|err| err.line_nr()).collect();
            assert_eq!(lines, vec![2, 3]);
        }
        other => panic!("expected malformed program, got {:?}", other),
    }
}
