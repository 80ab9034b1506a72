//! Ultrasonic time-of-flight ranging (HC-SR04 style).
//!
//! A 10 us trigger pulse starts a burst; the echo line is then held high for
//! the round-trip time. Both edge waits are bounded by a timeout, and every
//! failure is reported as `NO_ECHO_CM` rather than an error so the control
//! loop simply treats it as "nothing in range".

use embedded_hal::{
    delay::DelayNs,
    digital::{Error as _, ErrorKind as PinErrorKind, InputPin, OutputPin},
};

use crate::utils::math::ranging::{echo_to_cm, ticks_diff};

/// Reading reported when no echo was timed.
pub const NO_ECHO_CM: f32 = 9999.0;

/// Free-running microsecond counter. Wrapping is expected.
pub trait MicrosClock {
    fn now_us(&mut self) -> u32;
}

/// `MicrosClock` backed by the `embassy-time` driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyClock;

impl MicrosClock for EmbassyClock {
    fn now_us(&mut self) -> u32 {
        embassy_time::Instant::now().as_micros() as u32
    }
}

/// Anything that can produce a distance sample in centimetres.
pub trait RangeSensor {
    /// Take one reading. Returns `NO_ECHO_CM` when nothing was measured.
    fn measure<D: DelayNs>(
        &mut self,
        delay: &mut D,
        timeout_us: u32,
    ) -> f32;
}

/// Trigger/echo ultrasonic sensor.
pub struct DistanceSensor<T, E, C> {
    trigger: T,
    echo: E,
    clock: C,
}

impl<T, E, C> DistanceSensor<T, E, C>
where
    T: OutputPin,
    E: InputPin,
    C: MicrosClock,
{
    pub fn new(
        trigger: T,
        echo: E,
        clock: C,
    ) -> Self {
        Self {
            trigger,
            echo,
            clock,
        }
    }

    fn fire<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<(), PinErrorKind> {
        self.trigger.set_low().map_err(|e| e.kind())?;
        delay.delay_us(2);
        self.trigger.set_high().map_err(|e| e.kind())?;
        delay.delay_us(10);
        self.trigger.set_low().map_err(|e| e.kind())
    }

    /// Spin until the echo line reads `level`, returning the timestamp of the
    /// transition, or `None` once more than `timeout_us` has passed since
    /// `since`.
    fn wait_for_level(
        &mut self,
        level: bool,
        since: u32,
        timeout_us: u32,
    ) -> Result<Option<u32>, PinErrorKind> {
        let limit = i32::try_from(timeout_us).unwrap_or(i32::MAX);
        while self.echo.is_high().map_err(|e| e.kind())? != level {
            if ticks_diff(self.clock.now_us(), since) > limit {
                return Ok(None);
            }
        }
        Ok(Some(self.clock.now_us()))
    }

    /// Fire the trigger and time the echo pulse.
    pub fn echo_width<D: DelayNs>(
        &mut self,
        delay: &mut D,
        timeout_us: u32,
    ) -> Result<Option<u32>, PinErrorKind> {
        self.fire(delay)?;

        let start = self.clock.now_us();
        let Some(rise) = self.wait_for_level(true, start, timeout_us)? else {
            tracing::debug!("echo never rose");
            return Ok(None);
        };
        let Some(fall) = self.wait_for_level(false, rise, timeout_us)? else {
            tracing::debug!("echo never fell");
            return Ok(None);
        };

        let width = ticks_diff(fall, rise);
        if width < 0 {
            tracing::warn!(rise, fall, "echo edges out of order");
            return Ok(None);
        }
        Ok(Some(width as u32))
    }

    /// Give the pins and clock back.
    pub fn release(self) -> (T, E, C) {
        (self.trigger, self.echo, self.clock)
    }
}

impl<T, E, C> RangeSensor for DistanceSensor<T, E, C>
where
    T: OutputPin,
    E: InputPin,
    C: MicrosClock,
{
    fn measure<D: DelayNs>(
        &mut self,
        delay: &mut D,
        timeout_us: u32,
    ) -> f32 {
        match self.echo_width(delay, timeout_us) {
            Ok(Some(width)) => {
                let cm = echo_to_cm(width);
                tracing::debug!(width, cm, "sonar sample");
                cm
            }
            Ok(None) => NO_ECHO_CM,
            Err(kind) => {
                tracing::warn!(?kind, "sonar pin failure");
                NO_ECHO_CM
            }
        }
    }
}
