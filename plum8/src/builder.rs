use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::context::{Clock, Context, Sound};
use crate::error::{Error, Result};
use crate::frame::FrameManager;
use crate::keypad::KeyPad;
use crate::machine::{Interpreter, MachineState};
use crate::quirks::Quirks;
use crate::snapshot::Snapshot;

/// Assembles an [`Interpreter`] from a program or a snapshot
///
/// A snapshot, when given, takes precedence over a program.
pub struct Builder<'a> {
    context: Context,
    program: Option<&'a [u8]>,
    snapshot: Option<Snapshot>,
    quirks: Quirks,
    seed: Option<u64>,
}

impl<'a> Builder<'a> {
    pub fn new() -> Self {
        Self {
            context: Context::new(),
            program: None,
            snapshot: None,
            quirks: Quirks::default(),
            seed: None,
        }
    }

    pub fn with_context(mut self, ctx: Context) -> Self {
        self.context = ctx;
        self
    }

    pub fn with_program(mut self, prog: &'a [u8]) -> Self {
        self.program = Some(prog);
        self
    }

    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn with_keypad(mut self, keypad: Arc<KeyPad>) -> Self {
        self.context = self.context.with_keypad(keypad);
        self
    }

    pub fn with_display(mut self, display: Arc<FrameManager>) -> Self {
        self.context = self.context.with_display(display);
        self
    }

    pub fn with_sound(mut self, sound: Arc<dyn Sound>) -> Self {
        self.context = self.context.with_sound(sound);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.context = self.context.with_clock(clock);
        self
    }

    /// Seed `CXNN` for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<Interpreter> {
        let clock = self.context.clock.clone();
        let display = self.context.display.clone();
        let state = match (self.snapshot, self.program) {
            (Some(snapshot), _) => snapshot.restore(clock, display)?,
            (None, Some(program)) => MachineState::load(program, clock, display)?,
            (None, None) => return Err(Error::MissingProgram),
        };
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Interpreter::new(state, &self.context, self.quirks, rng))
    }
}

impl<'a> Default for Builder<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::StepOutcome;
    use crate::timer::ManualClock;

    #[test]
    fn with_context_and_prog() {
        let result = Builder::new()
            .with_context(Context::new())
            .with_program(&[])
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn with_context_only() {
        let result = Builder::new().with_context(Context::new()).build();
        assert!(matches!(result, Err(Error::MissingProgram)));
    }

    #[test]
    fn with_oversized_program() {
        let program = vec![0u8; 0x10000];
        let result = Builder::new().with_program(&program).build();
        assert!(matches!(result, Err(Error::ProgramTooLarge { .. })));
    }

    #[test]
    fn shares_collaborators() {
        let keypad = Arc::new(KeyPad::new());
        let display = Arc::new(FrameManager::new());
        display.set_hires(true);
        let machine = Builder::new()
            .with_keypad(keypad.clone())
            .with_display(display.clone())
            .with_clock(Arc::new(ManualClock::new()))
            .with_program(&[0x00, 0xE0])
            .build()
            .unwrap();

        assert!(Arc::ptr_eq(machine.keypad(), &keypad));
        assert!(Arc::ptr_eq(machine.state().gfx(), &display));
        // Loading a program resets the display
        assert!(!display.is_hires());
    }

    #[test]
    fn with_snapshot_takes_precedence() {
        let mut machine = Builder::new()
            .with_program(&[0x60, 0x2A, 0x00, 0xFD])
            .build()
            .unwrap();
        assert_eq!(machine.tick(5), StepOutcome::Halt(crate::machine::Halt::Exit { pc: 0x202 }));
        let snapshot = crate::snapshot::Snapshot::capture(machine.state_mut());

        let restored = Builder::new()
            .with_program(&[0x00, 0xE0])
            .with_snapshot(snapshot)
            .with_quirks(Quirks { vsync_draw: true, ..Quirks::default() })
            .build()
            .unwrap();
        assert_eq!(restored.state().v()[0], 0x2A);
        assert_eq!(restored.state().halted(), machine.state().halted());
        assert!(restored.quirks().vsync_draw);
    }
}
