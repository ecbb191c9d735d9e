//! Decoding of a single two-byte CHIP-8 / SUPER-CHIP / XO-CHIP instruction.
//!
//! Based on [chip8 mastering](http://mattmik.com/files/chip8/mastering/chip8.html) and
//! the [XO-CHIP spec](https://johnearnest.github.io/Octo/docs/XO-ChipSpecification.html)
//!
//! Examples:
//! ```
//! use plum8::opcode::Instruction;
//!
//! let inst = Instruction::new(0x12, 0x34);
//!
//! assert_eq!(inst.word(), 0x1234);
//! assert_eq!(inst.maj_op(), 0x10);
//! assert_eq!(inst.nnn(), 0x0234);
//! assert_eq!(inst.to_string(), "JP 0x0234");
//! ```
use core::fmt;

/// Width of a regular instruction in bytes
pub const INSTRUCTION_WIDTH: u16 = 2;

/// An immutable view over the two raw bytes of an instruction
///
/// Any bit pattern decodes; deciding what an unknown pattern means is left to the interpreter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Instruction {
    b1: u8,
    b2: u8,
}

impl Instruction {
    pub const fn new(b1: u8, b2: u8) -> Self {
        Self { b1, b2 }
    }

    pub const fn from_word(word: u16) -> Self {
        Self::new((word >> 8) as u8, (word & 0x00FF) as u8)
    }

    pub const fn b1(&self) -> u8 {
        self.b1
    }

    pub const fn b2(&self) -> u8 {
        self.b2
    }

    pub const fn word(&self) -> u16 {
        (self.b1 as u16) << 8 | self.b2 as u16
    }

    /// Opcode family, high nibble of the first byte kept in place (`0x00..=0xF0`)
    pub const fn maj_op(&self) -> u8 {
        self.b1 & 0xF0
    }

    pub const fn nnn(&self) -> u16 {
        self.word() & 0x0FFF
    }

    /// Low nibble of the second byte; also the `N` operand of `DXYN`, `00CN` and `00DN`
    pub const fn sub_op(&self) -> u8 {
        self.b2 & 0x0F
    }

    pub const fn x(&self) -> u8 {
        self.b1 & 0x0F
    }

    pub const fn y(&self) -> u8 {
        self.b2 >> 4
    }

    /// Human readable form of the instruction, `None` if it is not a known opcode
    ///
    /// Diagnostic only, has no bearing on execution.
    pub fn mnemonic(&self) -> Option<String> {
        let (x, y, b2, nnn) = (self.x(), self.y(), self.b2, self.nnn());
        let text = match self.maj_op() {
            0x00 if self.b1 == 0x00 => match b2 {
                0xE0 => "CLS".to_string(),
                0xEE => "RET".to_string(),
                0xFB => "SCR".to_string(),
                0xFC => "SCL".to_string(),
                0xFD => "EXIT".to_string(),
                0xFE => "LOW".to_string(),
                0xFF => "HIGH".to_string(),
                _ => match y {
                    0xC => format!("SCD {}", self.sub_op()),
                    0xD => format!("SCU {}", self.sub_op()),
                    _ => return None,
                },
            },
            0x10 => format!("JP {:#06x}", nnn),
            0x20 => format!("CALL {:#06x}", nnn),
            0x30 => format!("SE V{:X}, {:#04x}", x, b2),
            0x40 => format!("SNE V{:X}, {:#04x}", x, b2),
            0x50 => match self.sub_op() {
                0x0 => format!("SE V{:X}, V{:X}", x, y),
                0x2 => format!("SAVE V{:X} - V{:X}", x, y),
                0x3 => format!("LOAD V{:X} - V{:X}", x, y),
                _ => return None,
            },
            0x60 => format!("LD V{:X}, {:#04x}", x, b2),
            0x70 => format!("ADD V{:X}, {:#04x}", x, b2),
            0x80 => {
                let name = match self.sub_op() {
                    0x0 => "LD",
                    0x1 => "OR",
                    0x2 => "AND",
                    0x3 => "XOR",
                    0x4 => "ADD",
                    0x5 => "SUB",
                    0x6 => "SHR",
                    0x7 => "SUBN",
                    0xE => "SHL",
                    _ => return None,
                };
                format!("{} V{:X}, V{:X}", name, x, y)
            }
            0x90 if self.sub_op() == 0 => format!("SNE V{:X}, V{:X}", x, y),
            0x90 => return None,
            0xA0 => format!("LD I, {:#06x}", nnn),
            0xB0 => format!("JP V0, {:#06x}", nnn),
            0xC0 => format!("RND V{:X}, {:#04x}", x, b2),
            0xD0 => format!("DRW V{:X}, V{:X}, {}", x, y, self.sub_op()),
            0xE0 => match b2 {
                0x9E => format!("SKP V{:X}", x),
                0xA1 => format!("SKNP V{:X}", x),
                _ => return None,
            },
            0xF0 => match b2 {
                0x00 if x == 0 => "LD I, LONG".to_string(),
                0x01 => format!("PLANE {}", x),
                0x02 if x == 0 => "AUDIO".to_string(),
                0x07 => format!("LD V{:X}, DT", x),
                0x0A => format!("LD V{:X}, K", x),
                0x15 => format!("LD DT, V{:X}", x),
                0x18 => format!("LD ST, V{:X}", x),
                0x1E => format!("ADD I, V{:X}", x),
                0x29 => format!("LD F, V{:X}", x),
                0x30 => format!("LD HF, V{:X}", x),
                0x33 => format!("LD B, V{:X}", x),
                0x3A => format!("PITCH V{:X}", x),
                0x55 => format!("LD [I], V{:X}", x),
                0x65 => format!("LD V{:X}, [I]", x),
                0x75 => format!("LD R, V{:X}", x),
                0x85 => format!("LD V{:X}, R", x),
                _ => return None,
            },
            _ => return None,
        };
        Some(text)
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Self {
        Self::from_word(word)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(text) => f.write_str(&text),
            None => write!(f, "?? {:#06x}", self.word()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_read_fields() {
        let inst = Instruction::new(0x12, 0x34);
        assert_eq!(inst.word(), 0x1234);
        assert_eq!(inst.nnn(), 0x0234);
        assert_eq!(inst.x(), 0x02);
        assert_eq!(inst.y(), 0x03);
        assert_eq!(inst.maj_op(), 0x10);
        assert_eq!(inst.sub_op(), 0x04);
    }

    #[test]
    fn should_read_x() {
        assert_eq!(0xEu8, Instruction::from(0xDEADu16).x());
    }

    #[test]
    fn should_read_y() {
        assert_eq!(0xAu8, Instruction::from(0xDEADu16).y());
    }

    #[test]
    fn should_read_nnn() {
        assert_eq!(0xEEFu16, Instruction::from(0xBEEFu16).nnn());
    }

    #[test]
    fn should_round_trip_word() {
        for &word in &[0x0000u16, 0x00E0, 0xFFFF, 0xA123, 0x8AB4] {
            assert_eq!(Instruction::from_word(word).word(), word);
        }
    }

    #[test]
    #[rustfmt::skip]
    fn should_render_known_mnemonics() {
        let instructions = [
            (0x00E0u16, "CLS"),
            (0x00EEu16, "RET"),
            (0x00C4u16, "SCD 4"),
            (0x00D2u16, "SCU 2"),
            (0x00FDu16, "EXIT"),
            (0x1234u16, "JP 0x0234"),
            (0x2ABCu16, "CALL 0x0abc"),
            (0x3A12u16, "SE VA, 0x12"),
            (0x4556u16, "SNE V5, 0x56"),
            (0x5AB2u16, "SAVE VA - VB"),
            (0x8023u16, "XOR V0, V2"),
            (0x8AB7u16, "SUBN VA, VB"),
            (0xD345u16, "DRW V3, V4, 5"),
            (0xEA9Eu16, "SKP VA"),
            (0xF201u16, "PLANE 2"),
            (0xF000u16, "LD I, LONG"),
            (0xF33Au16, "PITCH V3"),
            (0xF185u16, "LD V1, R"),
        ];

        for &(raw, expected) in &instructions {
            assert_eq!(Instruction::from(raw).to_string(), expected);
        }
    }

    #[test]
    fn should_not_render_unknown() {
        for &raw in &[0x0123u16, 0x5AB1, 0x8AB8, 0x9AB1, 0xE000, 0xF0FF] {
            assert_eq!(Instruction::from(raw).mnemonic(), None, "{:#06x}", raw);
        }
        assert_eq!(Instruction::from(0x9AB1u16).to_string(), "?? 0x9ab1");
    }
}
