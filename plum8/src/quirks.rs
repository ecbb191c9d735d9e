//! Named behavioural toggles of the interpreter.
//!
//! Descriptions follow the community CHIP-8 quirk database. Each toggle's name describes
//! the behaviour when it is enabled; every toggle defaults to off.
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Quirks {
    pub shift_x_only: bool,
    pub memory_increment_by_x: bool,
    pub memory_i_unchanged: bool,
    pub sprite_wrap: bool,
    pub bxnn_jump: bool,
    pub vsync_draw: bool,
    pub cosmac_logic: bool,
    pub overwrite_vf: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Quirk {
    ShiftXOnly,
    MemoryIncrementByX,
    MemoryIUnchanged,
    SpriteWrap,
    BxnnJump,
    VSyncDraw,
    CosmacLogic,
    OverwriteVf,
}

impl Quirk {
    pub const ALL: [Quirk; 8] = [
        Quirk::ShiftXOnly,
        Quirk::MemoryIncrementByX,
        Quirk::MemoryIUnchanged,
        Quirk::SpriteWrap,
        Quirk::BxnnJump,
        Quirk::VSyncDraw,
        Quirk::CosmacLogic,
        Quirk::OverwriteVf,
    ];

    /// Name used in the compact text form
    pub fn name(self) -> &'static str {
        match self {
            Quirk::ShiftXOnly => "ShiftXOnly",
            Quirk::MemoryIncrementByX => "MemoryIncrementByX",
            Quirk::MemoryIUnchanged => "MemoryIUnchanged",
            Quirk::SpriteWrap => "SpriteWrapQuirk",
            Quirk::BxnnJump => "BXNNJumpQuirk",
            Quirk::VSyncDraw => "VSyncDraw",
            Quirk::CosmacLogic => "CosmacLogicQuirk",
            Quirk::OverwriteVf => "OverwriteVFQuirk",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Quirk::ShiftXOnly => {
                "On most systems the shift opcodes take `vY` as input and store the shifted \
                 version of `vY` into `vX`. The interpreters for the HP48 took `vX` as both the \
                 input and the output."
            }
            Quirk::MemoryIncrementByX => {
                "On most systems storing and retrieving registers increments `i` by `X + 1`. \
                 The CHIP-48 interpreter incremented it by `X` only."
            }
            Quirk::MemoryIUnchanged => {
                "The Superchip 1.1 interpreter did not increment `i` at all when storing and \
                 retrieving registers."
            }
            Quirk::SpriteWrap => {
                "Most systems clip sprites at the edges of the screen. Octo wraps them around \
                 to the other side instead."
            }
            Quirk::BxnnJump => {
                "The HP48 interpreters implemented jump to `<address> + v0` as jump to \
                 `<address> + vX`."
            }
            Quirk::VSyncDraw => {
                "The Cosmac VIP interpreter waited for vertical blank before each sprite draw, \
                 limiting programs to one draw per 60Hz frame."
            }
            Quirk::CosmacLogic => {
                "On the Cosmac VIP interpreter `vF` was reset after each of the logic \
                 opcodes `8XY1`, `8XY2` and `8XY3`."
            }
            Quirk::OverwriteVf => {
                "Most implementations set `vF` after an arithmetic operation even when `vF` was \
                 its destination. With this quirk the result overwrites the flag instead."
            }
        }
    }

    /// Whether the interpreter honours this toggle
    pub fn implemented(self) -> bool {
        matches!(
            self,
            Quirk::BxnnJump | Quirk::VSyncDraw | Quirk::CosmacLogic | Quirk::OverwriteVf
        )
    }
}

impl FromStr for Quirk {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quirk::ALL
            .iter()
            .copied()
            .find(|quirk| quirk.name() == s)
            .ok_or_else(|| Error::UnknownQuirk(s.to_string()))
    }
}

impl fmt::Display for Quirk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Quirks {
    pub fn get(&self, quirk: Quirk) -> bool {
        match quirk {
            Quirk::ShiftXOnly => self.shift_x_only,
            Quirk::MemoryIncrementByX => self.memory_increment_by_x,
            Quirk::MemoryIUnchanged => self.memory_i_unchanged,
            Quirk::SpriteWrap => self.sprite_wrap,
            Quirk::BxnnJump => self.bxnn_jump,
            Quirk::VSyncDraw => self.vsync_draw,
            Quirk::CosmacLogic => self.cosmac_logic,
            Quirk::OverwriteVf => self.overwrite_vf,
        }
    }

    pub fn set(&mut self, quirk: Quirk, enabled: bool) {
        let field = match quirk {
            Quirk::ShiftXOnly => &mut self.shift_x_only,
            Quirk::MemoryIncrementByX => &mut self.memory_increment_by_x,
            Quirk::MemoryIUnchanged => &mut self.memory_i_unchanged,
            Quirk::SpriteWrap => &mut self.sprite_wrap,
            Quirk::BxnnJump => &mut self.bxnn_jump,
            Quirk::VSyncDraw => &mut self.vsync_draw,
            Quirk::CosmacLogic => &mut self.cosmac_logic,
            Quirk::OverwriteVf => &mut self.overwrite_vf,
        };
        *field = enabled;
    }

    pub fn with(mut self, quirk: Quirk, enabled: bool) -> Self {
        self.set(quirk, enabled);
        self
    }
}

/// Renders as `ShiftXOnly:false,MemoryIncrementByX:false,...`
impl fmt::Display for Quirks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, quirk) in Quirk::ALL.iter().enumerate() {
            if n > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", quirk, self.get(*quirk))?;
        }
        Ok(())
    }
}

/// Parses the `Display` form; omitted quirks stay off
impl FromStr for Quirks {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut quirks = Quirks::default();
        for field in s.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            let (name, value) = field
                .split_once(':')
                .ok_or_else(|| Error::MalformedQuirk(field.to_string()))?;
            let enabled = value
                .trim()
                .parse::<bool>()
                .map_err(|_| Error::MalformedQuirk(field.to_string()))?;
            quirks.set(name.trim().parse()?, enabled);
        }
        Ok(quirks)
    }
}
