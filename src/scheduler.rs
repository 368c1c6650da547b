//! Fixed-cadence stepping loop on a dedicated thread.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    config::SteppingConfig,
    world::{lock_world, SharedWorld, SimulationWorld},
};

/// Called with the world still locked after every completed step.
pub type StepHook = Box<dyn FnMut(u64, &SimulationWorld) + Send>;

pub struct SteppingScheduler {
    world: SharedWorld,
    frame_budget: Duration,
    hook: Option<StepHook>,
}

impl SteppingScheduler {
    pub fn new(world: SharedWorld, frame_budget: Duration) -> Self {
        Self {
            world,
            frame_budget,
            hook: None,
        }
    }

    /// Uses the frame budget of an already validated stepping config.
    pub fn from_config(world: SharedWorld, stepping: &SteppingConfig) -> Self {
        Self::new(world, stepping.frame_budget())
    }

    pub fn with_hook(mut self, hook: impl FnMut(u64, &SimulationWorld) + Send + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    pub fn spawn(self) -> std::io::Result<SchedulerHandle> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let steps = Arc::new(AtomicU64::new(0));
        let loop_shutdown = shutdown.clone();
        let loop_steps = steps.clone();

        let thread = thread::Builder::new()
            .name("sim-stepper".into())
            .spawn(move || self.run(&loop_shutdown, &loop_steps))?;

        Ok(SchedulerHandle {
            shutdown,
            steps,
            thread: Some(thread),
        })
    }

    fn run(mut self, shutdown: &AtomicBool, steps: &AtomicU64) {
        println!("[sim] Stepping thread started.");
        while !shutdown.load(Ordering::SeqCst) {
            let started = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut world = lock_world(&self.world);
                world.step();
                let count = steps.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(hook) = self.hook.as_mut() {
                    hook(count, &*world);
                }
            }));
            if outcome.is_err() {
                eprintln!("[sim] Step panicked; continuing with the next frame.");
            }

            if let Some(remaining) = self.frame_budget.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }
        println!("[sim] Stepping thread stopped.");
    }
}

/// Owns the stepping thread; dropping it also stops the loop.
pub struct SchedulerHandle {
    shutdown: Arc<AtomicBool>,
    steps: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|thread| !thread.is_finished())
            .unwrap_or(false)
    }

    /// Signals the loop and waits for the in-flight step to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                eprintln!("[sim] Stepping thread exited abnormally.");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
