//! Serializable copy of a machine, for hosts that persist or transfer running programs.
//!
//! The byte form is JSON; it is opaque to callers and only guaranteed to round-trip through
//! the same format version.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::{DisplayState, Frame, FrameManager};
use crate::machine::{Halt, MachineState, MEM_SIZE, STACK_SIZE};
use crate::timer::Clock;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    pub hires: bool,
    pub target_plane: u8,
    pub width: usize,
    pub height: usize,
    pub plane1: Vec<u8>,
    pub plane2: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub v: [u8; 16],
    pub hp: [u8; 16],
    pub stack: Vec<u16>,
    pub sp: usize,
    pub mem: Vec<u8>,
    pub i: u16,
    pub pc: u16,
    pub halted: Option<Halt>,
    /// Delay timer ticks left when the snapshot was taken
    pub delay_timer: u8,
    pub display: DisplaySnapshot,
}

impl Snapshot {
    /// Copy everything out of `state`; the display is read under its lock
    pub fn capture(state: &mut MachineState) -> Self {
        let DisplayState {
            hires,
            target_plane,
            frame,
        } = state.gfx.state();
        Self {
            version: SNAPSHOT_VERSION,
            v: state.v,
            hp: state.hp,
            stack: state.stack.to_vec(),
            sp: state.sp,
            mem: state.mem.to_vec(),
            i: state.i,
            pc: state.pc,
            halted: state.halted,
            delay_timer: state.delay_timer.load(),
            display: DisplaySnapshot {
                hires,
                target_plane,
                width: frame.width(),
                height: frame.height(),
                plane1: frame.plane1().to_vec(),
                plane2: frame.plane2().to_vec(),
            },
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Rebuild a machine, drawing into `gfx` and counting time with `clock`
    ///
    /// The delay timer restarts counting from the moment of the restore.
    pub fn restore(self, clock: Arc<dyn Clock>, gfx: Arc<FrameManager>) -> Result<MachineState> {
        if self.version != SNAPSHOT_VERSION {
            return Err(invalid(format!("unsupported version {}", self.version)));
        }
        if self.stack.len() != STACK_SIZE || self.sp > STACK_SIZE {
            return Err(invalid(format!(
                "stack of {} entries with sp {}",
                self.stack.len(),
                self.sp
            )));
        }
        if self.mem.len() != MEM_SIZE {
            return Err(invalid(format!("{} bytes of memory", self.mem.len())));
        }
        let display = self.display;
        if display.target_plane > 3 {
            return Err(invalid(format!("target plane {}", display.target_plane)));
        }
        let (width, height) = (display.width, display.height);
        let frame = Frame::from_planes(width, height, display.plane1, display.plane2)
            .ok_or_else(|| invalid(format!("bad {}x{} frame", width, height)))?;
        if display.hires != (frame.width() > crate::frame::LORES_WIDTH) {
            return Err(invalid(format!(
                "{}x{} frame in {} mode",
                width,
                height,
                if display.hires { "hires" } else { "lores" }
            )));
        }

        gfx.restore(DisplayState {
            hires: display.hires,
            target_plane: display.target_plane,
            frame,
        });

        let mut state = MachineState::blank(clock, gfx);
        state.v = self.v;
        state.hp = self.hp;
        state.stack.copy_from_slice(&self.stack);
        state.sp = self.sp;
        state.mem.copy_from_slice(&self.mem);
        state.i = self.i;
        state.pc = self.pc;
        state.halted = self.halted;
        state.delay_timer.store(self.delay_timer);
        Ok(state)
    }
}

fn invalid(reason: String) -> Error {
    Error::InvalidSnapshot(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualClock;

    fn populated() -> MachineState {
        let clock = Arc::new(ManualClock::new());
        let gfx = Arc::new(FrameManager::new());
        let mut state = MachineState::load(&[0x12, 0x00, 0xAB], clock, gfx).unwrap();
        for n in 0..16 {
            state.v[n] = n as u8 * 3;
            state.hp[n] = 0xF0 | n as u8;
        }
        for (n, slot) in state.stack.iter_mut().enumerate() {
            *slot = 0x200 + n as u16 * 2;
        }
        state.sp = 5;
        state.mem[0xFFFF] = 0x42;
        state.i = 0x1234;
        state.pc = 0x0246;
        state.halted = Some(Halt::IllegalOpcode {
            pc: 0x0244,
            opcode: 0x5121,
        });
        state.delay_timer.store(17);

        state.gfx.set_hires(true);
        state.gfx.set_target_plane(3);
        state.gfx.put_sprite(3, 4, &[0xA5, 0x3C], 1);
        state.gfx.set_target_plane(2);
        state
    }

    #[test]
    fn should_round_trip_through_bytes() {
        let mut source = populated();
        let bytes = Snapshot::capture(&mut source).to_bytes().unwrap();

        let gfx = Arc::new(FrameManager::new());
        let mut restored = Snapshot::from_bytes(&bytes)
            .unwrap()
            .restore(Arc::new(ManualClock::new()), gfx.clone())
            .unwrap();

        assert_eq!(restored.v, source.v);
        assert_eq!(restored.hp, source.hp);
        assert_eq!(restored.stack, source.stack);
        assert_eq!(restored.sp, source.sp);
        assert_eq!(restored.mem, source.mem);
        assert_eq!(restored.i, source.i);
        assert_eq!(restored.pc, source.pc);
        assert_eq!(restored.halted, source.halted);
        assert_eq!(restored.delay_timer.load(), 17);
        assert_eq!(gfx.state(), source.gfx.state());
        assert!(Arc::ptr_eq(&restored.gfx, &gfx));
    }

    #[test]
    fn should_round_trip_every_halt() {
        let halts = [
            None,
            Some(Halt::Exit { pc: 1 }),
            Some(Halt::Spin { pc: 2 }),
            Some(Halt::StackUnderflow { pc: 3 }),
            Some(Halt::StackOverflow { pc: 4 }),
            Some(Halt::InvalidBitPlane { pc: 5, plane: 9 }),
        ];
        for halted in halts.iter().copied() {
            let mut state = populated();
            state.halted = halted;
            let bytes = Snapshot::capture(&mut state).to_bytes().unwrap();
            let restored = Snapshot::from_bytes(&bytes)
                .unwrap()
                .restore(Arc::new(ManualClock::new()), Arc::new(FrameManager::new()))
                .unwrap();
            assert_eq!(restored.halted, halted);
        }
    }

    #[test]
    fn should_reject_inconsistent_snapshots() {
        let mut state = populated();
        let good = Snapshot::capture(&mut state);

        let mut broken = Vec::new();
        broken.push(Snapshot { version: 2, ..good.clone() });
        broken.push(Snapshot { stack: vec![0; 3], ..good.clone() });
        broken.push(Snapshot { sp: 65, ..good.clone() });
        broken.push(Snapshot { mem: vec![0; 4096], ..good.clone() });
        let mut bad_plane = good.clone();
        bad_plane.display.target_plane = 4;
        broken.push(bad_plane);
        let mut bad_frame = good.clone();
        bad_frame.display.plane2.pop();
        broken.push(bad_frame);
        let mut bad_mode = good.clone();
        bad_mode.display.hires = false;
        broken.push(bad_mode);

        for snapshot in broken {
            let result = snapshot.restore(Arc::new(ManualClock::new()), Arc::new(FrameManager::new()));
            assert!(matches!(result, Err(Error::InvalidSnapshot(_))));
        }
    }

    #[test]
    fn should_reject_garbage_bytes() {
        assert!(matches!(
            Snapshot::from_bytes(b"not a snapshot"),
            Err(Error::Serde(_))
        ));
    }
}
