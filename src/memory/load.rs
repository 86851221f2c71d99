//! Loads LS-8 programs into memory.
//!
//! A program is a text file with one byte per line, written as an 8-digit
//! binary literal. Everything after a `#` is a comment:
//!
//! ```text
//! # print8
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! 01000111 # PRN R0
//! 00000000
//! 00000001 # HLT
//! ```

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::{FromStr, Lines};

use thiserror::Error;

use super::{Byte, Memory};

/// Number of digits every byte literal must have
pub const LITERAL_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("expected 8 binary digits, found {width}")]
    InvalidWidth { width: usize },
    #[error("invalid binary digit `{digit}`")]
    InvalidDigit { digit: char },
    #[error("program does not fit into memory at address `0x{address:x}`")]
    ProgramTooLarge { address: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error [ln: {line_nr}]: {kind} - {context}")]
pub struct ParseError {
    kind: ParseErrorKind,
    context: Cow<'static, str>,
    line_nr: usize,
}

impl ParseError {
    fn new<C>(kind: ParseErrorKind, context: C, line_nr: usize) -> Self
    where
        C: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into(),
            line_nr,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// Line (starting at 1) the error was found on
    pub fn line_nr(&self) -> usize {
        self.line_nr
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{} not found", .path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("program has {} malformed line(s)", .0.len())]
    Malformed(Vec<ParseError>),
}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

#[derive(Debug, Clone)]
pub struct Loader<'a, const S: usize> {
    lines: Lines<'a>,
    line_nr: usize,
    position: usize,
    memory: Memory<S>,
}

impl<'a, const S: usize> Loader<'a, S> {
    /// Creates a new loader for `data` which will populate `memory` starting
    /// at address 0.
    pub fn new(data: &'a str, memory: Memory<S>) -> Self {
        Self {
            lines: data.lines(),
            line_nr: 0,
            position: 0,
            memory,
        }
    }

    /// Consumes `self` and tries to load every line of the program.
    ///
    /// # Errors
    ///
    /// All errors which may occur are collected and returned at the end.
    pub fn load(mut self) -> Result<Memory<S>, Vec<ParseError>> {
        let mut errors = Vec::new();

        while let Some(res) = self.load_next_line() {
            if let Err(err) = res {
                log::error!("{}", err);
                errors.push(err);
            }
        }

        if errors.is_empty() {
            log::debug!("Loaded {} byte(s)", self.position);
            Ok(self.memory)
        } else {
            Err(errors)
        }
    }

    fn load_next_line(&mut self) -> Option<Result<()>> {
        let line = self.lines.next()?;
        self.line_nr += 1;

        let literal = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();

        if literal.is_empty() {
            // Comment or empty line; skip
            return Some(Ok(()));
        }

        Some(self.parse_byte(literal).and_then(|byte| self.write_byte(byte)))
    }

    /// Parses a single byte literal like `10000010`.
    fn parse_byte(&self, literal: &str) -> Result<Byte> {
        if let Some(digit) = literal.chars().find(|c| *c != '0' && *c != '1') {
            return Err(ParseError::new(
                ParseErrorKind::InvalidDigit { digit },
                format!("`{}`", literal),
                self.line_nr,
            ));
        }

        let width = literal.len();
        if width != LITERAL_WIDTH {
            return Err(ParseError::new(
                ParseErrorKind::InvalidWidth { width },
                format!("`{}`", literal),
                self.line_nr,
            ));
        }

        // exactly eight checked digits always fit into a byte
        Ok(literal
            .bytes()
            .fold(0, |byte, digit| (byte << 1) | (digit - b'0')))
    }

    fn write_byte(&mut self, byte: Byte) -> Result<()> {
        let address = self.position;
        if address >= S {
            return Err(ParseError::new(
                ParseErrorKind::ProgramTooLarge { address },
                format!("memory holds {} bytes", S),
                self.line_nr,
            ));
        }

        self.memory.data[address] = byte;
        self.position += 1;
        Ok(())
    }
}

impl<const S: usize> FromStr for Memory<S> {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Loader::new(s, Self::default())
            .load()
            .map_err(LoadError::Malformed)
    }
}

impl<const S: usize> Memory<S> {
    /// Reads the program at `path` into a fresh memory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LoadError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        log::debug!("Loading {}", path.display());
        data.parse()
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::Ram;
    use crate::processor::Instruction;

    use super::*;
    use color_eyre::Result;

    #[test]
    fn load_print8() -> Result<()> {
        let data = r#"
            # print8.ls8: Print the number 8 on the screen

            10000010 # LDI R0,8
            00000000
            00001000
            01000111 # PRN R0
            00000000
            00000001 # HLT
        "#;

        let mem: Ram = data.parse()?;

        assert_eq!(mem.read_byte(0)?, Instruction::LDI.into());
        assert_eq!(mem.read_byte(1)?, 0);
        assert_eq!(mem.read_byte(2)?, 8);
        assert_eq!(mem.read_byte(3)?, Instruction::PRN.into());
        assert_eq!(mem.read_byte(4)?, 0);
        assert_eq!(mem.read_byte(5)?, Instruction::HLT.into());
        assert_eq!(mem.read_byte(6)?, 0);

        Ok(())
    }

    #[test]
    fn load_comment_without_space() -> Result<()> {
        let mem: Ram = "00000001#HLT\n#only a comment\n\n10100111".parse()?;

        assert_eq!(mem.read_byte(0)?, 0b0000_0001);
        assert_eq!(mem.read_byte(1)?, 0b1010_0111);

        Ok(())
    }

    #[test]
    fn load_extreme_bytes() -> Result<()> {
        let mem: Ram = "11111111\n00000000\n10000000\n00000001".parse()?;

        assert_eq!(mem.read_byte(0)?, 0xFF);
        assert_eq!(mem.read_byte(1)?, 0x00);
        assert_eq!(mem.read_byte(2)?, 0x80);
        assert_eq!(mem.read_byte(3)?, 0x01);

        Ok(())
    }

    #[test]
    fn collects_every_malformed_line() {
        let data = "00000001\n1000001\n10000020 # bad digit\n0000000000\n";

        let errors = Loader::new(data, Ram::default()).load().unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].kind(), ParseErrorKind::InvalidWidth { width: 7 });
        assert_eq!(errors[0].line_nr(), 2);
        assert_eq!(errors[1].kind(), ParseErrorKind::InvalidDigit { digit: '2' });
        assert_eq!(errors[1].line_nr(), 3);
        assert_eq!(errors[2].kind(), ParseErrorKind::InvalidWidth { width: 10 });
    }

    #[test]
    fn rejects_program_larger_than_memory() {
        let data = "00000000\n".repeat(5);

        let errors = Loader::new(&data, Memory::<4>::default())
            .load()
            .unwrap_err();

        assert_eq!(
            errors,
            vec![ParseError::new(
                ParseErrorKind::ProgramTooLarge { address: 4 },
                "memory holds 4 bytes",
                5
            )]
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let res = Ram::from_file("does/not/exist.ls8");

        assert!(matches!(res, Err(LoadError::NotFound { .. })));
    }
}
