//! Time and delay sources backed by ESP-IDF.

use crate::traits::{Clock, Delay};
use esp_idf_hal::delay::FreeRtos;

/// Monotonic clock over the ESP-IDF high-resolution timer.
///
/// `esp_timer_get_time()` counts microseconds since boot and never goes
/// backwards, which is exactly what the motion deadlines need.
#[derive(Clone, Copy, Default)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a new clock instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // Plain timer read, no side effects.
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}

/// FreeRTOS-backed delay; yields to the scheduler while waiting.
#[derive(Clone, Copy, Default)]
pub struct Esp32Delay;

impl Esp32Delay {
    /// Creates a new delay instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Delay for Esp32Delay {
    #[inline]
    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}
