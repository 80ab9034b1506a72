//! Host stand-ins for the RP2040 peripherals.
//!
//! Motor pins and PWM slices only log what they are told. The ultrasonic
//! sensor and the pan servo share a small `World` so that the echo width
//! follows the obstacle in whatever direction the servo is pointing.

use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{BufRead, Write as _},
    rc::Rc,
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorType as PinErrorType, InputPin, OutputPin},
    pwm::{ErrorType as PwmErrorType, SetDutyCycle},
};
use sfb_core::utils::controllers::{
    scanner::{CENTER_PULSE_US, LEFT_PULSE_US, RIGHT_PULSE_US, SERVO_PERIOD_US},
    Heading, MotorChannel,
};
use std::convert::Infallible;
use tracing::{debug, info, trace, warn};

/// Time between the trigger falling and the echo line rising.
const ECHO_LATENCY_US: u64 = 450;
/// Anything further away than this never returns an echo.
const MAX_RANGE_CM: f32 = 400.0;
/// Round trip per centimetre, matching `echo_to_cm`.
const US_PER_CM: f32 = 2.0 / 0.0343;

struct WorldState
{
    /// Obstacle distance seen at each heading: left, center, right.
    distances: [f32; 3],
    heading: Heading,
    fired_at: Option<Instant>,
    trigger_high: bool,
}

/// Shared simulated surroundings.
#[derive(Clone)]
pub struct World
{
    state: Rc<RefCell<WorldState>>,
}

impl World
{
    pub fn new(distances: [f32; 3]) -> Self {
        Self {
            state: Rc::new(RefCell::new(WorldState {
                distances,
                heading: Heading::Center,
                fired_at: None,
                trigger_high: false,
            })),
        }
    }

    pub fn trigger(&self) -> SimTrigger {
        SimTrigger {
            world: self.clone(),
        }
    }

    pub fn echo(&self) -> SimEcho {
        SimEcho {
            world: self.clone(),
        }
    }

    pub fn servo(&self) -> SimServo {
        SimServo {
            world: self.clone(),
            duty: 0,
        }
    }

    fn distance_ahead(&self) -> f32 {
        let state = self.state.borrow();
        let index = match state.heading {
            Heading::Left => 0,
            Heading::Center => 1,
            Heading::Right => 2,
        };
        state.distances[index]
    }
}

/// Sensor trigger line. A high-to-low edge starts a measurement.
pub struct SimTrigger
{
    world: World,
}

impl PinErrorType for SimTrigger {
    type Error = Infallible;
}

impl OutputPin for SimTrigger {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.world.state.borrow_mut();
        if state.trigger_high {
            state.fired_at = Some(Instant::now());
        }
        state.trigger_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.world.state.borrow_mut().trigger_high = true;
        Ok(())
    }
}

/// Sensor echo line, high for the round trip to the obstacle ahead.
pub struct SimEcho
{
    world: World,
}

impl PinErrorType for SimEcho {
    type Error = Infallible;
}

impl InputPin for SimEcho {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let distance = self.world.distance_ahead();
        let Some(fired_at) = self.world.state.borrow().fired_at else {
            return Ok(false);
        };
        if !(distance > 0.0 && distance <= MAX_RANGE_CM) {
            return Ok(false);
        }
        let elapsed = fired_at.elapsed().as_micros() as u64;
        let width = (distance * US_PER_CM) as u64;
        Ok(elapsed >= ECHO_LATENCY_US && elapsed < ECHO_LATENCY_US + width)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// 50 Hz servo slice. The pulse width decides where the sensor points.
pub struct SimServo
{
    world: World,
    duty: u16,
}

impl PwmErrorType for SimServo {
    type Error = Infallible;
}

impl SetDutyCycle for SimServo {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        let pulse_us = duty as u32 * SERVO_PERIOD_US / u16::MAX as u32;
        let heading = if pulse_us < (LEFT_PULSE_US + CENTER_PULSE_US) / 2 {
            Heading::Left
        } else if pulse_us > (CENTER_PULSE_US + RIGHT_PULSE_US) / 2 {
            Heading::Right
        } else {
            Heading::Center
        };
        if duty != self.duty {
            debug!(pulse_us, ?heading, "servo moved");
        }
        self.duty = duty;
        self.world.state.borrow_mut().heading = heading;
        Ok(())
    }
}

/// Motor direction input that only logs.
pub struct SimPin
{
    name: String,
    high: bool,
}

impl SimPin {
    pub fn new(name: String) -> Self {
        Self { name, high: false }
    }
}

impl PinErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.high {
            trace!(pin = %self.name, "low");
        }
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            trace!(pin = %self.name, "high");
        }
        self.high = true;
        Ok(())
    }
}

/// Motor enable PWM that only logs.
pub struct SimPwm
{
    name: String,
    duty: u16,
}

impl SimPwm {
    pub fn new(name: String) -> Self {
        Self { name, duty: 0 }
    }
}

impl PwmErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        if duty != self.duty {
            debug!(pwm = %self.name, duty, "duty changed");
        }
        self.duty = duty;
        Ok(())
    }
}

/// The four motor channels, named after the L298N inputs they stand for.
pub fn motor_channels() -> [MotorChannel<SimPin, SimPwm>; 4] {
    [1u8, 2, 3, 4].map(|n| {
        MotorChannel::new(
            SimPin::new(format!("M{n}.IN1")),
            SimPin::new(format!("M{n}.IN2")),
            SimPwm::new(format!("M{n}.EN")),
        )
    })
}

/// Blocking delay on the host thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(
        &mut self,
        ns: u32,
    ) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }
}

/// Serial link on the terminal: stdin bytes in, acknowledgements to stdout.
///
/// A reader thread fills the receive queue so the control loop can poll
/// without blocking.
pub struct StdioSerial
{
    rx: Arc<Mutex<VecDeque<u8>>>,
}

impl StdioSerial
{
    pub fn spawn() -> Self {
        let rx = Arc::new(Mutex::new(VecDeque::new()));
        let queue = rx.clone();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("stdin closed: {}", e);
                        break;
                    }
                };
                match queue.lock() {
                    Ok(mut queue) => queue.extend(line.bytes()),
                    Err(_) => break,
                }
            }
            info!("serial input ended");
        });
        Self { rx }
    }
}

impl embedded_io::ErrorType for StdioSerial {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::ReadReady for StdioSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        self.rx
            .lock()
            .map(|rx| !rx.is_empty())
            .map_err(|_| embedded_io::ErrorKind::Other)
    }
}

impl embedded_io::Read for StdioSerial {
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> Result<usize, Self::Error> {
        let mut rx = self.rx.lock().map_err(|_| embedded_io::ErrorKind::Other)?;
        let mut n = 0;
        while n < buf.len() {
            match rx.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl embedded_io::Write for StdioSerial {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> Result<usize, Self::Error> {
        std::io::stdout()
            .write(buf)
            .map_err(|_| embedded_io::ErrorKind::Other)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::stdout()
            .flush()
            .map_err(|_| embedded_io::ErrorKind::Other)
    }
}
