//! Emulation core for CHIP-8 programs and their SUPER-CHIP and XO-CHIP extensions.
//!
//! A machine is assembled with a [`Builder`] and stepped directly through its
//! [`Interpreter`], or handed to a [`Scheduler`] which runs it in real time on its own
//! thread. Input, video, sound and time are shared with the host through a [`Context`].
pub mod builder;
pub mod context;
pub mod disasm;
pub mod error;
pub mod font;
pub mod frame;
pub mod keypad;
pub mod machine;
pub mod opcode;
pub mod quirks;
pub mod scheduler;
pub mod snapshot;
pub mod sound;
pub mod timer;
pub mod utils;

pub use builder::Builder;
pub use context::Context;
pub use disasm::{disassemble, Disassembly, Segment};
pub use error::{Error, Result};
pub use frame::{DisplayState, Frame, FrameManager};
pub use keypad::{KeyEvent, KeyPad};
pub use machine::{Halt, Interpreter, KeyWait, MachineState, StepOutcome};
pub use opcode::Instruction;
pub use quirks::{Quirk, Quirks};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use snapshot::Snapshot;
pub use sound::{Mute, Sound, SoundPattern, Synth};
pub use timer::{Clock, ManualClock, MonotonicClock};

#[cfg(feature = "embedded-graphics")]
pub use embedded_graphics;
