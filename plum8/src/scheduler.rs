//! Real-time driver of a single machine.
//!
//! The machine runs on its own thread, executing `cycles_per_tick` instructions per 60Hz
//! frame. The interpreter is moved into that thread while running and handed back when the
//! thread is joined, so two executions of the same machine can never overlap.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{error, info, trace, warn};

use crate::builder::Builder;
use crate::context::Context;
use crate::error::Result;
use crate::frame::FrameManager;
use crate::keypad::KeyPad;
use crate::machine::{Halt, Interpreter, StepOutcome};
use crate::quirks::Quirks;
use crate::snapshot::Snapshot;
use crate::timer::TICK;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Instructions executed per frame
    pub cycles_per_tick: usize,
    pub frame_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycles_per_tick: 10,
            frame_interval: TICK,
        }
    }
}

struct Worker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Interpreter>,
}

pub struct Scheduler {
    context: Context,
    config: SchedulerConfig,
    cycles_per_tick: Arc<AtomicUsize>,
    machine: Option<Interpreter>,
    worker: Option<Worker>,
    running: Arc<AtomicBool>,
    halt: Arc<Mutex<Option<Halt>>>,
}

impl Scheduler {
    pub fn new(context: Context, config: SchedulerConfig) -> Self {
        Self {
            context,
            config,
            cycles_per_tick: Arc::new(AtomicUsize::new(config.cycles_per_tick)),
            machine: None,
            worker: None,
            running: Arc::new(AtomicBool::new(false)),
            halt: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        SchedulerConfig {
            cycles_per_tick: self.cycles_per_tick(),
            ..self.config
        }
    }

    pub fn cycles_per_tick(&self) -> usize {
        self.cycles_per_tick.load(Ordering::Relaxed)
    }

    /// Change the speed, taking effect from the next frame even while running
    pub fn set_cycles_per_tick(&self, cycles: usize) {
        info!("Running {} cycles per tick", cycles);
        self.cycles_per_tick.store(cycles, Ordering::Relaxed);
    }

    pub fn keypad(&self) -> &Arc<KeyPad> {
        &self.context.keypad
    }

    pub fn display(&self) -> &Arc<FrameManager> {
        &self.context.display
    }

    /// Replace the current machine with a fresh one running `program`
    ///
    /// Execution resumes right away if the previous machine was running.
    pub fn load(&mut self, program: &[u8], quirks: Quirks) -> Result<()> {
        let resume = self.pause();
        let machine = Builder::new()
            .with_context(self.context.clone())
            .with_program(program)
            .with_quirks(quirks)
            .build();
        let machine = self.resume_on_error(machine, resume)?;
        info!("Loaded {} byte program", program.len());
        self.install(machine, resume);
        Ok(())
    }

    /// Replace the current machine with one rebuilt from `snapshot`
    pub fn restore(&mut self, snapshot: Snapshot, quirks: Quirks) -> Result<()> {
        let resume = self.pause();
        let machine = Builder::new()
            .with_context(self.context.clone())
            .with_snapshot(snapshot)
            .with_quirks(quirks)
            .build();
        let machine = self.resume_on_error(machine, resume)?;
        info!("Restored machine at {:#06x}", machine.state().pc());
        self.install(machine, resume);
        Ok(())
    }

    /// A failed build leaves the previous machine in place, running again if it was
    fn resume_on_error(&mut self, built: Result<Interpreter>, resume: bool) -> Result<Interpreter> {
        if let Err(err) = &built {
            warn!("Keeping previous machine: {}", err);
            if resume {
                self.run();
            }
        }
        built
    }

    fn install(&mut self, machine: Interpreter, resume: bool) {
        *self.halt_slot() = machine.state().halted();
        self.machine = Some(machine);
        if resume {
            self.run();
        }
    }

    /// Start executing the loaded machine on a new thread
    ///
    /// A previous execution is always stopped and joined first.
    pub fn run(&mut self) {
        self.pause();
        let machine = match self.machine.take() {
            Some(machine) => machine,
            None => {
                warn!("Nothing loaded to run");
                return;
            }
        };

        let stop = Arc::new(AtomicBool::new(false));
        self.running.store(true, Ordering::Release);
        let handle = {
            let config = self.config;
            let cycles = self.cycles_per_tick.clone();
            let stop = stop.clone();
            let running = self.running.clone();
            let halt = self.halt.clone();
            thread::spawn(move || drive(machine, config, &cycles, &stop, &running, &halt))
        };
        info!("Machine started");
        self.worker = Some(Worker { stop, handle });
    }

    pub fn resume(&mut self) {
        self.run();
    }

    /// Stop execution and wait for the machine thread to exit
    ///
    /// Interrupts a pending key wait. Returns whether the machine was still running, as
    /// opposed to never started or already halted.
    pub fn pause(&mut self) -> bool {
        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => return false,
        };
        let was_running = self.running.load(Ordering::Acquire);
        worker.stop.store(true, Ordering::Release);
        self.context.keypad.wake();
        match worker.handle.join() {
            Ok(machine) => self.machine = Some(machine),
            Err(_) => error!("Machine thread panicked, machine dropped"),
        }
        self.running.store(false, Ordering::Release);
        info!("Machine paused");
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// How the last machine stopped, if it did
    pub fn halt(&self) -> Option<Halt> {
        *self.halt_slot()
    }

    /// Paused machine, `None` while it is running
    pub fn machine(&self) -> Option<&Interpreter> {
        self.machine.as_ref()
    }

    /// Snapshot of the paused machine
    ///
    /// A machine thread that already exited on its own is joined first; `None` while the
    /// machine is still running or nothing is loaded.
    pub fn snapshot(&mut self) -> Option<Snapshot> {
        if self
            .worker
            .as_ref()
            .map_or(false, |worker| worker.handle.is_finished())
        {
            self.pause();
        }
        if self.worker.is_some() {
            return None;
        }
        self.machine
            .as_mut()
            .map(|machine| Snapshot::capture(machine.state_mut()))
    }

    fn halt_slot(&self) -> MutexGuard<'_, Option<Halt>> {
        self.halt.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.pause();
    }
}

/// Body of the machine thread
fn drive(
    mut machine: Interpreter,
    config: SchedulerConfig,
    cycles: &AtomicUsize,
    stop: &AtomicBool,
    running: &AtomicBool,
    halt: &Mutex<Option<Halt>>,
) -> Interpreter {
    while !stop.load(Ordering::Acquire) {
        let started = Instant::now();
        match machine.tick(cycles.load(Ordering::Relaxed)) {
            StepOutcome::Continue => {}
            StepOutcome::Await(wait) => {
                if wait.wait(&mut machine, stop).is_err() {
                    break;
                }
                continue;
            }
            StepOutcome::Halt(reason) => {
                info!("Machine halted: {}", reason);
                *halt.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason);
                break;
            }
        }

        let elapsed = started.elapsed();
        match config.frame_interval.checked_sub(elapsed) {
            Some(rest) => thread::sleep(rest),
            None => trace!("Tick overran frame by {:?}", elapsed - config.frame_interval),
        }
    }
    running.store(false, Ordering::Release);
    machine
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eventually(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    fn fast() -> SchedulerConfig {
        SchedulerConfig {
            cycles_per_tick: 10,
            frame_interval: Duration::from_millis(1),
        }
    }

    #[test]
    fn should_run_until_halt() {
        let mut scheduler = Scheduler::new(Context::new(), fast());
        scheduler.load(&[0x60, 0x01, 0x00, 0xFD], Quirks::default()).unwrap();
        assert!(!scheduler.is_running());

        scheduler.run();
        assert!(eventually(|| !scheduler.is_running()));
        assert_eq!(scheduler.halt(), Some(Halt::Exit { pc: 0x202 }));

        let snapshot = scheduler.snapshot().unwrap();
        assert_eq!(snapshot.v[0], 1);
    }

    #[test]
    fn pause_returns_machine() {
        let mut scheduler = Scheduler::new(Context::new(), fast());
        // 0x200: V0 += 1; jump back
        scheduler.load(&[0x70, 0x01, 0x12, 0x00], Quirks::default()).unwrap();
        scheduler.run();
        assert!(scheduler.is_running());
        assert!(scheduler.snapshot().is_none());
        thread::sleep(Duration::from_millis(20));

        assert!(scheduler.pause());
        assert!(!scheduler.is_running());
        assert!(!scheduler.pause());
        let pc = scheduler.machine().unwrap().state().pc();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(scheduler.machine().unwrap().state().pc(), pc);
        assert_eq!(scheduler.halt(), None);
    }

    #[test]
    fn pause_interrupts_key_wait() {
        let mut scheduler = Scheduler::new(Context::new(), fast());
        scheduler.load(&[0xF0, 0x0A], Quirks::default()).unwrap();
        scheduler.run();
        thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        scheduler.pause();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(scheduler.machine().unwrap().state().pc(), 0x200);
    }

    #[test]
    fn key_wait_completes_from_keypad() {
        let mut scheduler = Scheduler::new(Context::new(), fast());
        scheduler
            .load(&[0xF1, 0x0A, 0x00, 0xFD], Quirks::default())
            .unwrap();
        scheduler.run();
        thread::sleep(Duration::from_millis(20));
        assert!(scheduler.is_running());

        scheduler.keypad().key_down(0xC);
        scheduler.keypad().key_up(0xC);
        assert!(eventually(|| !scheduler.is_running()));
        assert_eq!(scheduler.halt(), Some(Halt::Exit { pc: 0x202 }));
        assert_eq!(scheduler.snapshot().unwrap().v[1], 0xC);
    }

    #[test]
    fn load_while_running_keeps_running() {
        let mut scheduler = Scheduler::new(Context::new(), fast());
        scheduler.load(&[0x70, 0x01, 0x12, 0x00], Quirks::default()).unwrap();
        scheduler.run();
        scheduler.load(&[0x00, 0xFD], Quirks::default()).unwrap();
        assert!(eventually(|| scheduler.halt() == Some(Halt::Exit { pc: 0x200 })));
    }

    #[test]
    fn failed_load_keeps_previous_machine_running() {
        let mut scheduler = Scheduler::new(Context::new(), fast());
        scheduler.load(&[0x70, 0x01, 0x12, 0x00], Quirks::default()).unwrap();
        scheduler.run();

        let result = scheduler.load(&vec![0u8; 0x10000], Quirks::default());
        assert!(matches!(result, Err(crate::Error::ProgramTooLarge { .. })));
        assert!(scheduler.is_running());

        let mut snapshot = {
            scheduler.pause();
            let snapshot = scheduler.snapshot().unwrap();
            scheduler.run();
            snapshot
        };
        snapshot.mem.truncate(16);
        let result = scheduler.restore(snapshot, Quirks::default());
        assert!(matches!(result, Err(crate::Error::InvalidSnapshot(_))));
        assert!(scheduler.is_running());
        assert_eq!(scheduler.halt(), None);
    }

    #[test]
    fn failed_load_leaves_paused_machine_paused() {
        let mut scheduler = Scheduler::new(Context::new(), fast());
        scheduler.load(&[0x70, 0x01, 0x12, 0x00], Quirks::default()).unwrap();
        assert!(scheduler.load(&vec![0u8; 0x10000], Quirks::default()).is_err());
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.machine().unwrap().state().pc(), 0x200);
    }

    #[test]
    fn cycles_per_tick_changes_while_running() {
        let config = SchedulerConfig {
            cycles_per_tick: 0,
            ..fast()
        };
        let mut scheduler = Scheduler::new(Context::new(), config);
        // I = glyph 0, draw it, then bounce between two jumps
        scheduler
            .load(&[0xA0, 0x00, 0xD0, 0x05, 0x12, 0x06, 0x12, 0x04], Quirks::default())
            .unwrap();
        scheduler.run();
        thread::sleep(Duration::from_millis(20));
        assert!(scheduler.is_running());
        assert!(scheduler.display().next_frame(None).is_blank());

        scheduler.set_cycles_per_tick(10);
        assert_eq!(scheduler.config().cycles_per_tick, 10);
        assert!(eventually(|| !scheduler.display().next_frame(None).is_blank()));
        assert!(scheduler.is_running());
    }

    #[test]
    fn run_without_program_does_nothing() {
        let mut scheduler = Scheduler::new(Context::new(), fast());
        scheduler.run();
        assert!(!scheduler.is_running());
        assert!(scheduler.snapshot().is_none());
    }

    #[test]
    fn restore_resets_halt() {
        let mut scheduler = Scheduler::new(Context::new(), fast());
        scheduler.load(&[0x00, 0xFD], Quirks::default()).unwrap();
        scheduler.run();
        assert!(eventually(|| scheduler.halt().is_some()));

        scheduler.load(&[0x60, 0x07, 0x12, 0x02], Quirks::default()).unwrap();
        assert_eq!(scheduler.halt(), None);
        let snapshot = scheduler.snapshot().unwrap();

        scheduler.restore(snapshot, Quirks::default()).unwrap();
        scheduler.run();
        assert!(eventually(|| scheduler.halt() == Some(Halt::Spin { pc: 0x202 })));
        assert_eq!(scheduler.snapshot().unwrap().v[0], 7);
    }
}
