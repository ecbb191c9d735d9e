//! Machine state and the instruction interpreter.
//!
//! Based on [chip8 mastering](http://mattmik.com/files/chip8/mastering/chip8.html),
//! [SUPER-CHIP](http://devernay.free.fr/hacks/chip8/schip.txt) and the
//! [XO-CHIP spec](https://johnearnest.github.io/Octo/docs/XO-ChipSpecification.html).
//!
//! `step` never blocks. Instructions that have to wait for the outside world hand back a
//! [`KeyWait`] continuation in [`StepOutcome::Await`], leaving the decision how to wait to the
//! caller.
use core::convert::Infallible;
use core::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::font::{glyph_addr, hires_glyph_addr, FONT, FONT_START, HIRES_FONT, HIRES_FONT_START};
use crate::frame::{sprite_len, FrameManager};
use crate::keypad::{Interrupted, KeyPad, ReleaseWatch};
use crate::opcode::{Instruction, INSTRUCTION_WIDTH};
use crate::quirks::Quirks;
use crate::sound::{pitch_to_rate, Sound, SoundPattern};
use crate::timer::{Clock, Timer};

/// Size of the addressable memory
pub const MEM_SIZE: usize = 0x10000;
/// Where programs are loaded and execution starts
pub const PROGRAM_START: u16 = 0x200;
/// Maximum call depth
pub const STACK_SIZE: usize = 64;

const VF: usize = 0xF;

/// Reason a program stopped, along with the address of the instruction that stopped it
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Halt {
    /// `00FD` was executed
    Exit { pc: u16 },
    /// A jump or call to itself, which would never make progress
    Spin { pc: u16 },
    IllegalOpcode { pc: u16, opcode: u16 },
    StackUnderflow { pc: u16 },
    StackOverflow { pc: u16 },
    InvalidBitPlane { pc: u16, plane: u8 },
}

impl Halt {
    pub fn pc(&self) -> u16 {
        match *self {
            Halt::Exit { pc }
            | Halt::Spin { pc }
            | Halt::IllegalOpcode { pc, .. }
            | Halt::StackUnderflow { pc }
            | Halt::StackOverflow { pc }
            | Halt::InvalidBitPlane { pc, .. } => pc,
        }
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Halt::Exit { pc } => write!(f, "EXIT at {:#06x}", pc),
            Halt::Spin { pc } => write!(f, "SPIN at {:#06x}", pc),
            Halt::IllegalOpcode { pc, opcode } => {
                write!(f, "ILLOP {:#06x} at {:#06x}", opcode, pc)
            }
            Halt::StackUnderflow { pc } => write!(f, "STACK UNDERFLOW at {:#06x}", pc),
            Halt::StackOverflow { pc } => write!(f, "STACK OVERFLOW at {:#06x}", pc),
            Halt::InvalidBitPlane { pc, plane } => {
                write!(f, "INVALID PLANE {} at {:#06x}", plane, pc)
            }
        }
    }
}

/// Result of a single `step` or a `tick` batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Await(KeyWait),
    Halt(Halt),
}

/// A pending `FX0A`, waiting for a key to be pressed and released
///
/// Until it resolves, `pc` stays on the `FX0A` instruction; stepping again simply starts a
/// fresh wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyWait {
    register: u8,
    at: u16,
    watch: ReleaseWatch,
}

impl KeyWait {
    pub fn register(&self) -> u8 {
        self.register
    }

    /// Check for a released key without blocking, completing the instruction if there is one
    pub fn poll(&mut self, machine: &mut Interpreter) -> nb::Result<(), Infallible> {
        let key = machine.keypad.poll_release(&mut self.watch)?;
        self.resolve(machine, key);
        Ok(())
    }

    /// Block until a key is pressed and released, then complete the instruction
    ///
    /// On `Interrupted` the machine is left untouched.
    pub fn wait(
        mut self,
        machine: &mut Interpreter,
        cancel: &AtomicBool,
    ) -> core::result::Result<(), Interrupted> {
        let key = machine.keypad.await_release(&mut self.watch, cancel)?;
        self.resolve(machine, key);
        Ok(())
    }

    fn resolve(&self, machine: &mut Interpreter, key: u8) {
        debug!("Key {:X} stored in V{:X}", key, self.register);
        machine.state.v[self.register as usize] = key;
        machine.state.pc = self.at.wrapping_add(INSTRUCTION_WIDTH);
    }
}

/// Everything that makes up one running machine
pub struct MachineState {
    pub(crate) v: [u8; 16],
    pub(crate) hp: [u8; 16],
    pub(crate) stack: [u16; STACK_SIZE],
    pub(crate) sp: usize,
    pub(crate) mem: Box<[u8]>,
    pub(crate) i: u16,
    pub(crate) pc: u16,
    pub(crate) halted: Option<Halt>,
    pub(crate) delay_timer: Timer,
    pub(crate) gfx: Arc<FrameManager>,
}

impl MachineState {
    /// Fresh machine with fonts and `program` in memory and a reset display
    pub fn load(program: &[u8], clock: Arc<dyn Clock>, gfx: Arc<FrameManager>) -> Result<Self> {
        let max = MEM_SIZE - PROGRAM_START as usize;
        if program.len() > max {
            return Err(Error::ProgramTooLarge {
                size: program.len(),
                max,
            });
        }

        let mut state = Self::blank(clock, gfx);
        state.gfx.reset();
        state.copy_to(FONT_START, &FONT);
        state.copy_to(HIRES_FONT_START, &HIRES_FONT);
        state.copy_to(PROGRAM_START, program);
        Ok(state)
    }

    pub(crate) fn blank(clock: Arc<dyn Clock>, gfx: Arc<FrameManager>) -> Self {
        Self {
            v: [0; 16],
            hp: [0; 16],
            stack: [0; STACK_SIZE],
            sp: 0,
            mem: vec![0; MEM_SIZE].into_boxed_slice(),
            i: 0,
            pc: PROGRAM_START,
            halted: None,
            delay_timer: Timer::new(clock),
            gfx,
        }
    }

    fn copy_to(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.mem[start..start + data.len()].copy_from_slice(data);
    }

    fn read(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.mem[addr as usize] = value;
    }

    fn fetch(&self, at: u16) -> Instruction {
        Instruction::new(self.read(at), self.read(at.wrapping_add(1)))
    }

    pub fn v(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn hp(&self) -> &[u8; 16] {
        &self.hp
    }

    pub fn stack(&self) -> &[u16; STACK_SIZE] {
        &self.stack
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn mem(&self) -> &[u8] {
        &self.mem
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn halted(&self) -> Option<Halt> {
        self.halted
    }

    /// Remaining delay timer ticks
    pub fn delay_timer(&mut self) -> u8 {
        self.delay_timer.load()
    }

    pub fn gfx(&self) -> &Arc<FrameManager> {
        &self.gfx
    }
}

/// Deep copy, including a separate display
impl Clone for MachineState {
    fn clone(&self) -> Self {
        Self {
            v: self.v,
            hp: self.hp,
            stack: self.stack,
            sp: self.sp,
            mem: self.mem.clone(),
            i: self.i,
            pc: self.pc,
            halted: self.halted,
            delay_timer: self.delay_timer.clone(),
            gfx: Arc::new(FrameManager::clone(&self.gfx)),
        }
    }
}

impl fmt::Debug for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineState")
            .field("v", &self.v)
            .field("i", &format_args!("{:#06x}", self.i))
            .field("pc", &format_args!("{:#06x}", self.pc))
            .field("sp", &self.sp)
            .field("halted", &self.halted)
            .finish()
    }
}

type Exec = core::result::Result<(), Halt>;

/// Executes instructions against a [`MachineState`]
pub struct Interpreter {
    state: MachineState,
    keypad: Arc<KeyPad>,
    sound: Arc<dyn Sound>,
    quirks: Quirks,
    rng: StdRng,
    drew: bool,
}

impl Interpreter {
    pub fn new(state: MachineState, context: &Context, quirks: Quirks, rng: StdRng) -> Self {
        Self {
            state,
            keypad: context.keypad.clone(),
            sound: context.sound.clone(),
            quirks,
            rng,
            drew: false,
        }
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    pub fn into_state(self) -> MachineState {
        self.state
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    pub fn keypad(&self) -> &Arc<KeyPad> {
        &self.keypad
    }

    /// Execute `cycles` instructions, returning early on the first `Await` or `Halt`
    ///
    /// With the vsync quirk the batch also ends right after a sprite draw.
    pub fn tick(&mut self, cycles: usize) -> StepOutcome {
        for _ in 0..cycles {
            match self.step() {
                StepOutcome::Continue if self.drew && self.quirks.vsync_draw => break,
                StepOutcome::Continue => {}
                outcome => return outcome,
            }
        }
        StepOutcome::Continue
    }

    /// Execute a single instruction
    ///
    /// Once the machine halted, returns the same halt without doing anything.
    pub fn step(&mut self) -> StepOutcome {
        if let Some(halt) = self.state.halted {
            return StepOutcome::Halt(halt);
        }

        let at = self.state.pc;
        let inst = self.state.fetch(at);
        self.state.pc = at.wrapping_add(INSTRUCTION_WIDTH);
        self.drew = false;
        trace!("{:#06x}: {}", at, inst);

        match self.execute(inst, at) {
            Ok(None) => StepOutcome::Continue,
            Ok(Some(wait)) => StepOutcome::Await(wait),
            Err(halt) => {
                if let Halt::IllegalOpcode { .. } = halt {
                    warn!("{}", halt);
                } else {
                    info!("{}", halt);
                }
                self.state.halted = Some(halt);
                StepOutcome::Halt(halt)
            }
        }
    }

    #[rustfmt::skip]
    fn execute(&mut self, inst: Instruction, at: u16) -> core::result::Result<Option<KeyWait>, Halt> {
        let (x, y, nn, nnn, n) = (inst.x(), inst.y(), inst.b2(), inst.nnn(), inst.sub_op());
        let illegal = Halt::IllegalOpcode { pc: at, opcode: inst.word() };

        let result = match inst.maj_op() {
            0x00 if inst.b1() == 0x00 => match nn {
                0xE0                => self.clear_screen(),
                0xEE                => self.subroutine_return(at),
                0xFB                => self.scroll_right(),
                0xFC                => self.scroll_left(),
                0xFD                => Err(Halt::Exit { pc: at }),
                0xFE                => self.set_hires(false),
                0xFF                => self.set_hires(true),
                _ if y == 0xC       => self.scroll_down(n),
                _ if y == 0xD       => self.scroll_up(n),
                _                   => Err(illegal),
            },
            0x10                    => self.jump_to(nnn, at),
            0x20                    => self.exec_subroutine_at(nnn, at),
            0x30                    => self.skip_if_vx_eq_nn(x, nn),
            0x40                    => self.skip_if_vx_ne_nn(x, nn),
            0x50 => match n {
                0x0                 => self.skip_if_vx_eq_vy(x, y),
                0x2                 => self.store_vx_to_vy_at_i(x, y),
                0x3                 => self.load_vx_to_vy_from_i(x, y),
                _                   => Err(illegal),
            },
            0x60                    => self.assign_vx_nn(x, nn),
            0x70                    => self.assign_add_vx_nn(x, nn),
            0x80 => match n {
                0x0                 => self.assign_vx_vy(x, y),
                0x1                 => self.assign_or_vx_vy(x, y),
                0x2                 => self.assign_and_vx_vy(x, y),
                0x3                 => self.assign_xor_vx_vy(x, y),
                0x4                 => self.assign_add_vx_vy(x, y),
                0x5                 => self.assign_sub_vx_vy(x, y),
                0x6                 => self.assign_vx_shifted_r(x),
                0x7                 => self.assign_vx_vy_sub_vx(x, y),
                0xE                 => self.assign_vx_shifted_l(x),
                _                   => Err(illegal),
            },
            0x90 if n == 0          => self.skip_if_vx_ne_vy(x, y),
            0xA0                    => self.assign_i_nnn(nnn),
            0xB0                    => self.jump_to_nnn_add_v(nnn),
            0xC0                    => self.assign_vx_random_and_nn(x, nn),
            0xD0                    => self.draw_n_at_vx_vy(x, y, n),
            0xE0 => match nn {
                0x9E                => self.skip_if_vx_in_keys(x),
                0xA1                => self.skip_if_vx_not_in_keys(x),
                _                   => Err(illegal),
            },
            0xF0 => match nn {
                0x00 if x == 0      => self.assign_i_long(),
                0x01                => self.select_planes(x, at),
                0x02 if x == 0      => self.load_audio_pattern(),
                0x07                => self.assign_vx_delay_t(x),
                0x0A                => return Ok(Some(self.wait_for_key(x, at))),
                0x15                => self.assign_delay_t_vx(x),
                0x18                => self.play_sound_vx(x),
                0x1E                => self.assign_add_i_vx(x),
                0x29                => self.assign_i_addr_of_sprite_vx(x),
                0x30                => self.assign_i_addr_of_hires_sprite_vx(x),
                0x33                => self.assign_mem_at_i_bcd_of_vx(x),
                0x3A                => self.assign_pitch_vx(x),
                0x55                => self.assign_mem_at_i_v0_to_vx(x),
                0x65                => self.assign_v0_to_vx_mem_at_i(x),
                0x75                => self.assign_flags_v0_to_vx(x),
                0x85                => self.assign_v0_to_vx_flags(x),
                _                   => Err(illegal),
            },
            _                       => Err(illegal),
        };
        result.map(|_| None)
    }

    fn skip(&mut self) {
        self.state.pc = self.state.pc.wrapping_add(INSTRUCTION_WIDTH);
    }

    fn vx(&self, x: u8) -> u8 {
        self.state.v[x as usize]
    }

    /// Store an arithmetic result and its flag; which one survives when `x` is `VF` depends on
    /// the overwrite quirk
    fn store_with_flag(&mut self, x: u8, value: u8, flag: bool) {
        let v = &mut self.state.v;
        if self.quirks.overwrite_vf {
            v[VF] = flag as u8;
            v[x as usize] = value;
        } else {
            v[x as usize] = value;
            v[VF] = flag as u8;
        }
    }

    /// Clear the selected planes
    /// 00E0
    fn clear_screen(&mut self) -> Exec {
        self.state.gfx.clear();
        Ok(())
    }

    /// Return from a subroutine
    /// 00EE
    fn subroutine_return(&mut self, at: u16) -> Exec {
        if self.state.sp == 0 {
            return Err(Halt::StackUnderflow { pc: at });
        }
        self.state.sp -= 1;
        self.state.pc = self.state.stack[self.state.sp];
        Ok(())
    }

    /// 00FB
    fn scroll_right(&mut self) -> Exec {
        self.state.gfx.scroll_right();
        Ok(())
    }

    /// 00FC
    fn scroll_left(&mut self) -> Exec {
        self.state.gfx.scroll_left();
        Ok(())
    }

    /// 00CN
    fn scroll_down(&mut self, n: u8) -> Exec {
        self.state.gfx.scroll_down(n);
        Ok(())
    }

    /// 00DN
    fn scroll_up(&mut self, n: u8) -> Exec {
        self.state.gfx.scroll_up(n);
        Ok(())
    }

    /// Switch resolution, clearing the screen
    /// 00FE, 00FF
    fn set_hires(&mut self, hires: bool) -> Exec {
        self.state.gfx.set_hires(hires);
        Ok(())
    }

    /// Jump to address NNN
    /// 1NNN
    fn jump_to(&mut self, nnn: u16, at: u16) -> Exec {
        if nnn == at {
            return Err(Halt::Spin { pc: at });
        }
        self.state.pc = nnn;
        Ok(())
    }

    /// Execute subroutine starting at address NNN
    /// 2NNN
    fn exec_subroutine_at(&mut self, nnn: u16, at: u16) -> Exec {
        if self.state.sp == STACK_SIZE {
            return Err(Halt::StackOverflow { pc: at });
        }
        if nnn == at {
            return Err(Halt::Spin { pc: at });
        }
        self.state.stack[self.state.sp] = self.state.pc;
        self.state.sp += 1;
        self.state.pc = nnn;
        Ok(())
    }

    /// Skip the following instruction if the value of register VX equals NN
    /// 3XNN
    fn skip_if_vx_eq_nn(&mut self, x: u8, nn: u8) -> Exec {
        if self.vx(x) == nn {
            self.skip();
        }
        Ok(())
    }

    /// Skip the following instruction if the value of register VX is not equal to NN
    /// 4XNN
    fn skip_if_vx_ne_nn(&mut self, x: u8, nn: u8) -> Exec {
        if self.vx(x) != nn {
            self.skip();
        }
        Ok(())
    }

    /// Skip the following instruction if the value of register VX is equal to the value of register VY
    /// 5XY0
    fn skip_if_vx_eq_vy(&mut self, x: u8, y: u8) -> Exec {
        if self.vx(x) == self.vx(y) {
            self.skip();
        }
        Ok(())
    }

    /// Store registers VX to VY (in either direction) in memory starting at I, I is unchanged
    /// 5XY2
    fn store_vx_to_vy_at_i(&mut self, x: u8, y: u8) -> Exec {
        for (offset, reg) in register_range(x, y).enumerate() {
            let addr = self.state.i.wrapping_add(offset as u16);
            self.state.write(addr, self.state.v[reg]);
        }
        Ok(())
    }

    /// Load registers VX to VY (in either direction) from memory starting at I, I is unchanged
    /// 5XY3
    fn load_vx_to_vy_from_i(&mut self, x: u8, y: u8) -> Exec {
        for (offset, reg) in register_range(x, y).enumerate() {
            let addr = self.state.i.wrapping_add(offset as u16);
            self.state.v[reg] = self.state.read(addr);
        }
        Ok(())
    }

    /// Store number NN in register VX
    /// 6XNN
    fn assign_vx_nn(&mut self, x: u8, nn: u8) -> Exec {
        self.state.v[x as usize] = nn;
        Ok(())
    }

    /// Add the value NN to register VX, VF is untouched
    /// 7XNN
    fn assign_add_vx_nn(&mut self, x: u8, nn: u8) -> Exec {
        self.state.v[x as usize] = self.vx(x).wrapping_add(nn);
        Ok(())
    }

    /// 8XY0
    fn assign_vx_vy(&mut self, x: u8, y: u8) -> Exec {
        self.state.v[x as usize] = self.vx(y);
        Ok(())
    }

    /// 8XY1
    fn assign_or_vx_vy(&mut self, x: u8, y: u8) -> Exec {
        self.state.v[x as usize] |= self.vx(y);
        self.reset_vf_after_logic();
        Ok(())
    }

    /// 8XY2
    fn assign_and_vx_vy(&mut self, x: u8, y: u8) -> Exec {
        self.state.v[x as usize] &= self.vx(y);
        self.reset_vf_after_logic();
        Ok(())
    }

    /// 8XY3
    fn assign_xor_vx_vy(&mut self, x: u8, y: u8) -> Exec {
        self.state.v[x as usize] ^= self.vx(y);
        self.reset_vf_after_logic();
        Ok(())
    }

    fn reset_vf_after_logic(&mut self) {
        if self.quirks.cosmac_logic {
            self.state.v[VF] = 0;
        }
    }

    /// Add the value of register VY to register VX, VF is set to 1 on carry
    /// 8XY4
    fn assign_add_vx_vy(&mut self, x: u8, y: u8) -> Exec {
        let sum = self.vx(x) as u16 + self.vx(y) as u16;
        self.store_with_flag(x, (sum & 0xFF) as u8, sum > 0xFF);
        Ok(())
    }

    /// Subtract the value of register VY from register VX, VF is set to 1 when there is no borrow
    /// 8XY5
    fn assign_sub_vx_vy(&mut self, x: u8, y: u8) -> Exec {
        let diff = self.vx(x) as i16 - self.vx(y) as i16;
        self.store_with_flag(x, (diff & 0xFF) as u8, diff >= 0);
        Ok(())
    }

    /// Shift VX right by one, VF is set to the bit shifted out
    /// 8XY6
    fn assign_vx_shifted_r(&mut self, x: u8) -> Exec {
        let value = self.vx(x);
        self.store_with_flag(x, value >> 1, value & 0x01 != 0);
        Ok(())
    }

    /// Set register VX to the value of VY minus VX, VF is set to 1 when there is no borrow
    /// 8XY7
    fn assign_vx_vy_sub_vx(&mut self, x: u8, y: u8) -> Exec {
        let diff = self.vx(y) as i16 - self.vx(x) as i16;
        self.store_with_flag(x, (diff & 0xFF) as u8, diff >= 0);
        Ok(())
    }

    /// Shift VX left by one, VF is set to the bit shifted out
    /// 8XYE
    fn assign_vx_shifted_l(&mut self, x: u8) -> Exec {
        let value = self.vx(x);
        self.store_with_flag(x, value << 1, value & 0x80 != 0);
        Ok(())
    }

    /// Skip the following instruction if the value of register VX is not equal to the value of register VY
    /// 9XY0
    fn skip_if_vx_ne_vy(&mut self, x: u8, y: u8) -> Exec {
        if self.vx(x) != self.vx(y) {
            self.skip();
        }
        Ok(())
    }

    /// ANNN
    fn assign_i_nnn(&mut self, nnn: u16) -> Exec {
        self.state.i = nnn;
        Ok(())
    }

    /// Jump to address NNN + V0, or NNN + VX with the BXNN quirk
    /// BNNN
    fn jump_to_nnn_add_v(&mut self, nnn: u16) -> Exec {
        let reg = if self.quirks.bxnn_jump {
            (nnn >> 8) as u8
        } else {
            0
        };
        self.state.pc = nnn.wrapping_add(self.vx(reg) as u16);
        Ok(())
    }

    /// Set VX to a random number with a mask of NN
    /// CXNN
    fn assign_vx_random_and_nn(&mut self, x: u8, nn: u8) -> Exec {
        self.state.v[x as usize] = self.rng.gen::<u8>() & nn;
        Ok(())
    }

    /// Draw a sprite at position VX, VY with N rows of data starting at I, VF is set on collision
    /// DXYN
    fn draw_n_at_vx_vy(&mut self, x: u8, y: u8, n: u8) -> Exec {
        let len = sprite_len(n, self.state.gfx.target_plane());
        let data: Vec<u8> = (0..len)
            .map(|offset| self.state.read(self.state.i.wrapping_add(offset as u16)))
            .collect();
        let collision = self
            .state
            .gfx
            .put_sprite(self.vx(x) as usize, self.vx(y) as usize, &data, n);
        self.state.v[VF] = collision as u8;
        self.drew = true;
        Ok(())
    }

    /// Skip the following instruction if the key stored in VX is pressed
    /// EX9E
    fn skip_if_vx_in_keys(&mut self, x: u8) -> Exec {
        if self.keypad.is_pressed(self.vx(x)) {
            self.skip();
        }
        Ok(())
    }

    /// Skip the following instruction if the key stored in VX is not pressed
    /// EXA1
    fn skip_if_vx_not_in_keys(&mut self, x: u8) -> Exec {
        if !self.keypad.is_pressed(self.vx(x)) {
            self.skip();
        }
        Ok(())
    }

    /// Load I with the 16-bit word following the instruction
    /// F000 NNNN
    fn assign_i_long(&mut self) -> Exec {
        let pc = self.state.pc;
        let hi = self.state.read(pc) as u16;
        let lo = self.state.read(pc.wrapping_add(1)) as u16;
        self.state.i = hi << 8 | lo;
        self.skip();
        Ok(())
    }

    /// Select drawing planes
    /// FN01
    fn select_planes(&mut self, planes: u8, at: u16) -> Exec {
        if planes > 3 {
            return Err(Halt::InvalidBitPlane { pc: at, plane: planes });
        }
        self.state.gfx.set_target_plane(planes);
        Ok(())
    }

    /// Load the 16 byte audio pattern at I
    /// F002
    fn load_audio_pattern(&mut self) -> Exec {
        let mut bytes = [0u8; 16];
        for (offset, byte) in bytes.iter_mut().enumerate() {
            *byte = self.state.read(self.state.i.wrapping_add(offset as u16));
        }
        self.sound.set_pattern(SoundPattern::from_bytes(&bytes));
        Ok(())
    }

    /// Store the current value of the delay timer in register VX
    /// FX07
    fn assign_vx_delay_t(&mut self, x: u8) -> Exec {
        self.state.v[x as usize] = self.state.delay_timer.load();
        Ok(())
    }

    /// Wait for a key press and release and store the key in register VX
    /// FX0A
    fn wait_for_key(&mut self, x: u8, at: u16) -> KeyWait {
        debug!("Waiting for key at {:#06x}", at);
        self.state.pc = at;
        KeyWait {
            register: x,
            at,
            watch: self.keypad.watch(),
        }
    }

    /// Set the delay timer to the value of register VX
    /// FX15
    fn assign_delay_t_vx(&mut self, x: u8) -> Exec {
        let ticks = self.vx(x);
        self.state.delay_timer.store(ticks);
        Ok(())
    }

    /// Sound the audio pattern for VX ticks
    /// FX18
    fn play_sound_vx(&mut self, x: u8) -> Exec {
        self.sound.play(self.vx(x));
        Ok(())
    }

    /// Add the value stored in register VX to register I
    /// FX1E
    fn assign_add_i_vx(&mut self, x: u8) -> Exec {
        self.state.i = self.state.i.wrapping_add(self.vx(x) as u16);
        Ok(())
    }

    /// Point I at the low resolution glyph of the digit in VX
    /// FX29
    fn assign_i_addr_of_sprite_vx(&mut self, x: u8) -> Exec {
        self.state.i = glyph_addr(self.vx(x));
        Ok(())
    }

    /// Point I at the high resolution glyph of the digit in VX
    /// FX30
    fn assign_i_addr_of_hires_sprite_vx(&mut self, x: u8) -> Exec {
        self.state.i = hires_glyph_addr(self.vx(x));
        Ok(())
    }

    /// Store the binary-coded decimal equivalent of VX at addresses I, I+1, and I+2
    /// FX33
    fn assign_mem_at_i_bcd_of_vx(&mut self, x: u8) -> Exec {
        let value = self.vx(x);
        let i = self.state.i;
        self.state.write(i, value / 100);
        self.state.write(i.wrapping_add(1), value % 100 / 10);
        self.state.write(i.wrapping_add(2), value % 10);
        Ok(())
    }

    /// Set the audio pattern playback rate from the pitch in VX
    /// FX3A
    fn assign_pitch_vx(&mut self, x: u8) -> Exec {
        self.sound.set_pattern_rate(pitch_to_rate(self.vx(x)));
        Ok(())
    }

    /// Store registers V0 to VX in memory starting at I, I is unchanged
    /// FX55
    fn assign_mem_at_i_v0_to_vx(&mut self, x: u8) -> Exec {
        for reg in 0..=x as usize {
            let addr = self.state.i.wrapping_add(reg as u16);
            self.state.write(addr, self.state.v[reg]);
        }
        Ok(())
    }

    /// Fill registers V0 to VX from memory starting at I, I is unchanged
    /// FX65
    fn assign_v0_to_vx_mem_at_i(&mut self, x: u8) -> Exec {
        for reg in 0..=x as usize {
            let addr = self.state.i.wrapping_add(reg as u16);
            self.state.v[reg] = self.state.read(addr);
        }
        Ok(())
    }

    /// Save registers V0 to VX into the flag registers
    /// FX75
    fn assign_flags_v0_to_vx(&mut self, x: u8) -> Exec {
        let count = x as usize + 1;
        self.state.hp[..count].copy_from_slice(&self.state.v[..count]);
        Ok(())
    }

    /// Restore registers V0 to VX from the flag registers
    /// FX85
    fn assign_v0_to_vx_flags(&mut self, x: u8) -> Exec {
        let count = x as usize + 1;
        self.state.v[..count].copy_from_slice(&self.state.hp[..count]);
        Ok(())
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("state", &self.state)
            .field("quirks", &self.quirks)
            .finish()
    }
}

/// Register indices from `x` to `y` inclusive, descending when `x > y`
fn register_range(x: u8, y: u8) -> impl Iterator<Item = usize> {
    let (x, y) = (x as usize, y as usize);
    let ascending = x <= y;
    let len = if ascending { y - x } else { x - y } + 1;
    (0..len).map(move |k| if ascending { x + k } else { x - k })
}
