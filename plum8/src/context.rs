//! Collaborators a machine shares with the platform it is emulated on.
//!
//! The keypad and display are written and read from outside the interpreter thread, the
//! sound sink and clock are supplied by the host. All of them are reference counted, so a
//! `Context` can be cloned into every machine that is loaded over the lifetime of a host.

use std::sync::Arc;

use crate::frame::FrameManager;
use crate::keypad::KeyPad;
pub use crate::sound::Sound;
use crate::sound::Mute;
pub use crate::timer::Clock;
use crate::timer::MonotonicClock;

#[derive(Clone)]
pub struct Context {
    pub keypad: Arc<KeyPad>,
    pub display: Arc<FrameManager>,
    pub sound: Arc<dyn Sound>,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    /// Fresh keypad and display, no sound, wall clock time
    pub fn new() -> Self {
        Self {
            keypad: Arc::new(KeyPad::new()),
            display: Arc::new(FrameManager::new()),
            sound: Arc::new(Mute),
            clock: Arc::new(MonotonicClock::new()),
        }
    }

    pub fn with_keypad(mut self, keypad: Arc<KeyPad>) -> Self {
        self.keypad = keypad;
        self
    }

    pub fn with_display(mut self, display: Arc<FrameManager>) -> Self {
        self.display = display;
        self
    }

    pub fn with_sound(mut self, sound: Arc<dyn Sound>) -> Self {
        self.sound = sound;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("keypad", &self.keypad)
            .field("hires", &self.display.is_hires())
            .finish()
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    use crate::sound::SoundPattern;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum SoundCall {
        Pattern(SoundPattern),
        Rate(u32),
        Play(u8),
    }

    /// Sound sink remembering every request
    #[derive(Debug, Default)]
    pub struct RecordingSound {
        calls: Mutex<Vec<SoundCall>>,
    }

    impl RecordingSound {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<SoundCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Sound for RecordingSound {
        fn set_pattern(&self, pattern: SoundPattern) {
            self.calls.lock().unwrap().push(SoundCall::Pattern(pattern));
        }

        fn set_pattern_rate(&self, rate: u32) {
            self.calls.lock().unwrap().push(SoundCall::Rate(rate));
        }

        fn play(&self, ticks: u8) {
            self.calls.lock().unwrap().push(SoundCall::Play(ticks));
        }
    }

    #[test]
    fn testing_context() {
        let sound = Arc::new(RecordingSound::new());
        let ctx = Context::new().with_sound(sound.clone());

        ctx.sound.set_pattern_rate(4000);
        ctx.sound.play(3);
        assert_eq!(sound.calls(), vec![SoundCall::Rate(4000), SoundCall::Play(3)]);

        ctx.keypad.key_down(0x01);
        ctx.keypad.key_down(0x0F);
        assert_eq!(ctx.keypad.pressed_mask().count_ones(), 2);
        ctx.keypad.key_up(0x0F);
        assert_eq!(
            (ctx.keypad.is_pressed(0x01), ctx.keypad.is_pressed(0x0F)),
            (true, false)
        );

        let copy = ctx.clone();
        assert!(Arc::ptr_eq(&copy.keypad, &ctx.keypad));
        assert!(Arc::ptr_eq(&copy.display, &ctx.display));
    }
}
