//! Scripted stand-ins for the hardware the control loop talks to.
// Shared by mock_tests and control_tests; each uses only part of it.
#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    convert::Infallible,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorType as PinErrorType, InputPin, OutputPin},
    pwm::{ErrorType as PwmErrorType, SetDutyCycle},
};
use embedded_hal_mock::eh1::{
    digital::{Mock as PinMock, State as PinState, Transaction as PinTrans},
    pwm::{Mock as PwmMock, Transaction as PwmTrans},
};
use sfb_core::utils::{
    config::SpeedLimits,
    controllers::{Drivetrain, MicrosClock, MotorChannel, RangeSensor},
    math::ranging::ticks_diff,
    NO_ECHO_CM,
};

/// Create a pin expectation for a write.
pub fn set(state: PinState) -> PinTrans {
    PinTrans::set(state)
}

/// Expectations for one motor channel `(in1, in2, en)`.
pub type ChannelExpectations = (Vec<PinTrans>, Vec<PinTrans>, Vec<PwmTrans>);

/// Build a mock drivetrain from per-channel expectations (M1..M4).
pub fn mock_drivetrain(
    expectations: [ChannelExpectations; 4],
    polarity: [bool; 4],
    limits: SpeedLimits,
) -> Drivetrain<PinMock, PwmMock> {
    let channels = expectations.map(|(in1, in2, en)| {
        MotorChannel::new(PinMock::new(&in1), PinMock::new(&in2), PwmMock::new(&en))
    });
    Drivetrain::new(channels, polarity, limits)
}

/// Verify every mock of a released drivetrain.
pub fn done(drivetrain: Drivetrain<PinMock, PwmMock>) {
    for mut channel in drivetrain.release() {
        channel.in1.done();
        channel.in2.done();
        channel.en.done();
    }
}

/// Expectations for a channel that only ever sees `stop()`.
pub fn stop_expectations() -> ChannelExpectations {
    (
        vec![set(PinState::Low)],
        vec![set(PinState::Low)],
        vec![PwmTrans::set_duty_cycle(0)],
    )
}

// ---------------------------------------------------------------------------
// Shared-log drivetrain, for checks that span several pins.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// `line` is 1 for in1, 2 for in2.
    Pin { motor: usize, line: u8, high: bool },
    Duty { motor: usize, duty: u16 },
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

pub struct LogPin {
    motor: usize,
    line: u8,
    log: EventLog,
}

impl PinErrorType for LogPin {
    type Error = Infallible;
}

impl OutputPin for LogPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Pin {
            motor: self.motor,
            line: self.line,
            high: false,
        });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Pin {
            motor: self.motor,
            line: self.line,
            high: true,
        });
        Ok(())
    }
}

pub struct LogPwm {
    motor: usize,
    log: EventLog,
}

impl PwmErrorType for LogPwm {
    type Error = Infallible;
}

impl SetDutyCycle for LogPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Duty {
            motor: self.motor,
            duty,
        });
        Ok(())
    }
}

pub fn logged_drivetrain(polarity: [bool; 4]) -> (Drivetrain<LogPin, LogPwm>, EventLog) {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let channels = [0, 1, 2, 3].map(|motor| {
        MotorChannel::new(
            LogPin {
                motor,
                line: 1,
                log: log.clone(),
            },
            LogPin {
                motor,
                line: 2,
                log: log.clone(),
            },
            LogPwm {
                motor,
                log: log.clone(),
            },
        )
    });
    (
        Drivetrain::new(channels, polarity, SpeedLimits::default()),
        log,
    )
}

/// Bridge state per motor after replaying `events`: `(in1, in2, duty)`.
pub fn replay(events: &[Event]) -> [(bool, bool, u16); 4] {
    let mut state = [(false, false, 0u16); 4];
    for event in events {
        apply_event(&mut state, *event);
    }
    state
}

pub fn apply_event(
    state: &mut [(bool, bool, u16); 4],
    event: Event,
) {
    match event {
        Event::Pin { motor, line: 1, high } => state[motor].0 = high,
        Event::Pin { motor, line: _, high } => state[motor].1 = high,
        Event::Duty { motor, duty } => state[motor].2 = duty,
    }
}

// ---------------------------------------------------------------------------
// Simulated echo timing.

/// Microsecond clock that advances by `step` on every read.
#[derive(Clone)]
pub struct SimClock {
    now: Rc<Cell<u32>>,
    step: u32,
}

impl SimClock {
    pub fn starting_at(
        start: u32,
        step: u32,
    ) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
            step,
        }
    }

    pub fn elapsed_since(
        &self,
        start: u32,
    ) -> i32 {
        ticks_diff(self.now.get(), start)
    }
}

impl MicrosClock for SimClock {
    fn now_us(&mut self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }
}

/// Echo line that is high for `[rise, fall)` of simulated time.
pub struct SimEcho {
    now: Rc<Cell<u32>>,
    rise: Option<u32>,
    fall: Option<u32>,
}

impl SimEcho {
    pub fn new(
        clock: &SimClock,
        rise: Option<u32>,
        fall: Option<u32>,
    ) -> Self {
        Self {
            now: clock.now.clone(),
            rise,
            fall,
        }
    }
}

impl PinErrorType for SimEcho {
    type Error = Infallible;
}

impl InputPin for SimEcho {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let now = self.now.get();
        let risen = self.rise.is_some_and(|t| ticks_diff(now, t) >= 0);
        let fallen = self.fall.is_some_and(|t| ticks_diff(now, t) >= 0);
        Ok(risen && !fallen)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

// ---------------------------------------------------------------------------
// Range sensor, delay and serial fakes for the control loop.

/// Replays a list of distances; reports `NO_ECHO_CM` once exhausted.
#[derive(Clone)]
pub struct ScriptedRange {
    samples: Rc<RefCell<VecDeque<f32>>>,
    taken: Rc<Cell<usize>>,
}

impl ScriptedRange {
    pub fn new(samples: &[f32]) -> Self {
        Self {
            samples: Rc::new(RefCell::new(samples.iter().copied().collect())),
            taken: Rc::new(Cell::new(0)),
        }
    }

    pub fn taken(&self) -> usize {
        self.taken.get()
    }
}

impl RangeSensor for ScriptedRange {
    fn measure<D: DelayNs>(
        &mut self,
        _delay: &mut D,
        _timeout_us: u32,
    ) -> f32 {
        self.taken.set(self.taken.get() + 1);
        self.samples.borrow_mut().pop_front().unwrap_or(NO_ECHO_CM)
    }
}

/// Delay that only adds up how long it was asked to wait.
#[derive(Clone, Default)]
pub struct RecordingDelay {
    total_ns: Rc<Cell<u64>>,
}

impl RecordingDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns.get() / 1_000_000
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(
        &mut self,
        ns: u32,
    ) {
        self.total_ns.set(self.total_ns.get() + ns as u64);
    }
}

/// Delay that raises a shutdown flag once `budget_ms` of waiting has been
/// requested, so `ControlLoop::run` ends after a known number of ticks.
pub struct ShutdownAfter {
    flag: Arc<AtomicBool>,
    remaining_ns: u64,
}

impl ShutdownAfter {
    pub fn new(
        flag: Arc<AtomicBool>,
        budget_ms: u64,
    ) -> Self {
        Self {
            flag,
            remaining_ns: budget_ms * 1_000_000,
        }
    }
}

impl DelayNs for ShutdownAfter {
    fn delay_ns(
        &mut self,
        ns: u32,
    ) {
        self.remaining_ns = self.remaining_ns.saturating_sub(ns as u64);
        if self.remaining_ns == 0 {
            self.flag.store(true, Ordering::Release);
        }
    }
}

/// In-memory serial link, modelled on a loopback transport.
#[derive(Clone, Default)]
pub struct ScriptedSerial {
    rx: Rc<RefCell<VecDeque<u8>>>,
    tx: Rc<RefCell<Vec<u8>>>,
}

impl ScriptedSerial {
    pub fn inject(
        &self,
        bytes: &[u8],
    ) {
        self.rx.borrow_mut().extend(bytes.iter().copied());
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.tx.borrow()).into_owned()
    }
}

impl embedded_io::ErrorType for ScriptedSerial {
    type Error = Infallible;
}

impl embedded_io::ReadReady for ScriptedSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.borrow().is_empty())
    }
}

impl embedded_io::Read for ScriptedSerial {
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> Result<usize, Self::Error> {
        let mut rx = self.rx.borrow_mut();
        let n = rx.len().min(buf.len());
        for slot in buf.iter_mut().take(n) {
            *slot = rx.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

impl embedded_io::Write for ScriptedSerial {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> Result<usize, Self::Error> {
        self.tx.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
