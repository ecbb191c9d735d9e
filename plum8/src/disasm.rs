//! A naive disassembler.
//!
//! Walks a program two bytes at a time; whatever decodes to a known instruction is code,
//! anything else is taken one byte at a time as data until instructions show up again.
//! Data embedded at odd offsets can easily confuse it.
use core::fmt;

use crate::opcode::Instruction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Code(Vec<Instruction>),
    Data(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Disassembly {
    pub segments: Vec<Segment>,
}

impl Disassembly {
    fn push_code(&mut self, inst: Instruction) {
        match self.segments.last_mut() {
            Some(Segment::Code(code)) => code.push(inst),
            _ => self.segments.push(Segment::Code(vec![inst])),
        }
    }

    fn push_data(&mut self, byte: u8) {
        match self.segments.last_mut() {
            Some(Segment::Data(data)) => data.push(byte),
            _ => self.segments.push(Segment::Data(vec![byte])),
        }
    }
}

pub fn disassemble(program: &[u8]) -> Disassembly {
    let mut disassembly = Disassembly::default();
    let mut idx = 0;
    while idx < program.len() {
        let inst = program
            .get(idx + 1)
            .map(|&b2| Instruction::new(program[idx], b2))
            .filter(|inst| inst.mnemonic().is_some());
        match inst {
            Some(inst) => {
                disassembly.push_code(inst);
                idx += 2;
            }
            None => {
                disassembly.push_data(program[idx]);
                idx += 1;
            }
        }
    }
    disassembly
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, segment) in self.segments.iter().enumerate() {
            if n > 0 {
                f.write_str("\n\n")?;
            }
            match segment {
                Segment::Code(code) => {
                    f.write_str("CODE:")?;
                    for inst in code {
                        write!(f, "\n  {}", inst)?;
                    }
                }
                Segment::Data(data) => {
                    f.write_str("DATA:")?;
                    for line in data.chunks(8) {
                        f.write_str("\n ")?;
                        for byte in line {
                            write!(f, " {:#04x}", byte)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const MIXED: [u8; 20] = [
        0xD3, 0x45,
        0x80, 0x23,
        0x12, 0x34,
        0x99, 0x99,
        0x98, 0x98,
        0x96, 0x96,
        0x95, 0x95,
        0x94, 0x94,
        0xD7, 0x83,
        0x45, 0x56,
    ];

    #[test]
    fn should_disassemble_instructions_only() {
        let disassembly = disassemble(&[0xD3, 0x45, 0x80, 0x23, 0x12, 0x34]);
        assert_eq!(
            disassembly.segments,
            vec![Segment::Code(vec![
                Instruction::new(0xD3, 0x45),
                Instruction::new(0x80, 0x23),
                Instruction::new(0x12, 0x34),
            ])]
        );
    }

    #[test]
    fn should_split_code_and_data() {
        let disassembly = disassemble(&MIXED);
        assert_eq!(
            disassembly.segments,
            vec![
                Segment::Code(vec![
                    Instruction::new(0xD3, 0x45),
                    Instruction::new(0x80, 0x23),
                    Instruction::new(0x12, 0x34),
                ]),
                Segment::Data(vec![0x99, 0x99, 0x98, 0x98, 0x96, 0x96, 0x95, 0x95, 0x94, 0x94]),
                Segment::Code(vec![Instruction::new(0xD7, 0x83), Instruction::new(0x45, 0x56)]),
            ]
        );
    }

    #[test]
    fn should_render_segments() {
        let expected = "\
CODE:
  DRW V3, V4, 5
  XOR V0, V2
  JP 0x0234

DATA:
  0x99 0x99 0x98 0x98 0x96 0x96 0x95 0x95
  0x94 0x94

CODE:
  DRW V7, V8, 3
  SNE V5, 0x56";
        assert_eq!(disassemble(&MIXED).to_string(), expected);
    }

    #[test]
    fn trailing_byte_is_data() {
        let disassembly = disassemble(&[0x00, 0xE0, 0x12]);
        assert_eq!(
            disassembly.segments,
            vec![
                Segment::Code(vec![Instruction::new(0x00, 0xE0)]),
                Segment::Data(vec![0x12]),
            ]
        );
    }

    #[test]
    fn empty_program() {
        assert!(disassemble(&[]).segments.is_empty());
        assert_eq!(disassemble(&[]).to_string(), "");
    }
}
