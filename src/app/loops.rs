//! The two worker threads: one samples the button and dispatches gestures,
//! the other fires pending auto-clears. They share only the scheduler lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use crate::clock::Clock;
use crate::display::DisplayScheduler;
use crate::gesture::{GestureHandler, PowerRequest};
use crate::input::{Debouncer, InputMonitor, LineReader};
use crate::metrics::SystemMetrics;
use crate::Result;

pub const INPUT_THREAD: &str = "infobutton-input";
pub const DISPLAY_THREAD: &str = "infobutton-display";
const EVENT_CHANNEL_CAP: usize = 16;
const EVENT_WAIT: Duration = Duration::from_millis(50);

/// Reports from the worker threads to the main thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Power(PowerRequest),
}

/// One button sample per `step`: read, debounce, classify, dispatch.
pub struct InputLoop<L: LineReader, M: SystemMetrics> {
    line: L,
    debouncer: Debouncer,
    monitor: InputMonitor,
    handler: GestureHandler<M>,
    clock: Arc<dyn Clock>,
}

impl<L: LineReader, M: SystemMetrics> InputLoop<L, M> {
    pub fn new(
        line: L,
        debouncer: Debouncer,
        monitor: InputMonitor,
        handler: GestureHandler<M>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            line,
            debouncer,
            monitor,
            handler,
            clock,
        }
    }

    pub fn monitor(&self) -> &InputMonitor {
        &self.monitor
    }

    pub fn step(&mut self) -> Result<Option<PowerRequest>> {
        let now = self.clock.now();
        let level = self.debouncer.filter(self.line.read_level(), now);
        match self.monitor.sample(level, now) {
            Some(event) => {
                debug!("gesture: {event:?}");
                self.handler.handle(event)
            }
            None => Ok(None),
        }
    }
}

/// Logs the first error of a failing streak and the recovery, not every
/// failed iteration in between.
struct FaultLatch {
    name: &'static str,
    failing: bool,
}

impl FaultLatch {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            failing: false,
        }
    }

    fn record<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                if self.failing {
                    info!("{} recovered", self.name);
                    self.failing = false;
                }
                Some(value)
            }
            Err(err) => {
                if !self.failing {
                    warn!("{}: {err}", self.name);
                    self.failing = true;
                }
                None
            }
        }
    }
}

pub struct LoopHandles {
    input: JoinHandle<()>,
    display: JoinHandle<()>,
    events: Receiver<AppEvent>,
}

/// Start both loops. They run until `running` is cleared.
pub fn spawn_loops<L, M>(
    input: InputLoop<L, M>,
    scheduler: DisplayScheduler,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
) -> Result<LoopHandles>
where
    L: LineReader + 'static,
    M: SystemMetrics + 'static,
{
    let (tx, rx) = bounded(EVENT_CHANNEL_CAP);
    let input_running = running.clone();
    let display_running = running.clone();
    let input = thread::Builder::new()
        .name(INPUT_THREAD.into())
        .spawn(move || run_input(input, tx, poll_interval, input_running))?;
    let display = match thread::Builder::new()
        .name(DISPLAY_THREAD.into())
        .spawn(move || run_display(scheduler, poll_interval, display_running))
    {
        Ok(handle) => handle,
        Err(err) => {
            running.store(false, Ordering::SeqCst);
            let _ = input.join();
            return Err(err.into());
        }
    };
    Ok(LoopHandles {
        input,
        display,
        events: rx,
    })
}

fn run_input<L: LineReader, M: SystemMetrics>(
    mut input: InputLoop<L, M>,
    events: Sender<AppEvent>,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
) {
    let mut latch = FaultLatch::new("input loop");
    while running.load(Ordering::SeqCst) {
        if let Some(Some(request)) = latch.record(input.step()) {
            if events.send(AppEvent::Power(request)).is_err() {
                break;
            }
        }
        thread::sleep(poll_interval);
    }
    debug!("input loop stopped");
}

fn run_display(scheduler: DisplayScheduler, poll_interval: Duration, running: Arc<AtomicBool>) {
    let mut latch = FaultLatch::new("display loop");
    while running.load(Ordering::SeqCst) {
        if let Some(true) = latch.record(scheduler.tick()) {
            debug!("display auto-cleared");
        }
        thread::sleep(poll_interval);
    }
    debug!("display loop stopped");
}

/// Wait for the loops to finish, logging power requests as they arrive.
/// Blanks the display once both threads are gone. Returns every request seen.
pub fn wait_for_loops(
    handles: LoopHandles,
    scheduler: &DisplayScheduler,
    running: &AtomicBool,
) -> Result<Vec<PowerRequest>> {
    let mut requests = Vec::new();
    loop {
        match handles.events.recv_timeout(EVENT_WAIT) {
            Ok(AppEvent::Power(request)) => {
                warn!("{request} requested by button; power control is left to the system");
                requests.push(request);
            }
            Err(RecvTimeoutError::Timeout) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    running.store(false, Ordering::SeqCst);
    for (name, handle) in [(INPUT_THREAD, handles.input), (DISPLAY_THREAD, handles.display)] {
        if handle.join().is_err() {
            warn!("{name} thread panicked");
        }
    }
    // Anything reported between the last poll and the join.
    requests.extend(handles.events.try_iter().map(|AppEvent::Power(request)| request));
    scheduler.reset()?;
    Ok(requests)
}

/// Spawn both loops and block until they stop.
pub fn run_until_stopped<L, M>(
    input: InputLoop<L, M>,
    scheduler: DisplayScheduler,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
) -> Result<Vec<PowerRequest>>
where
    L: LineReader + 'static,
    M: SystemMetrics + 'static,
{
    let handles = spawn_loops(input, scheduler.clone(), poll_interval, running.clone())?;
    wait_for_loops(handles, &scheduler, &running)
}
