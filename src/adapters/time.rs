//! ESP32 time adapter.
//!
//! Monotonic uptime for the fixed-period control loop and the local
//! wall-clock hour for the time-of-day feature.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` and the
//!   newlib `gettimeofday`/`localtime_r` pair.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` and an
//!   injectable hour for host-side testing and simulation.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU8, Ordering};

#[cfg(not(target_os = "espidf"))]
const SIM_HOUR_UNSET: u8 = u8::MAX;

#[cfg(not(target_os = "espidf"))]
static SIM_HOUR: AtomicU8 = AtomicU8::new(SIM_HOUR_UNSET);

/// Set the simulated wall-clock hour; `None` models an unsynced clock.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_hour(hour: Option<u8>) {
    SIM_HOUR.store(hour.unwrap_or(SIM_HOUR_UNSET), Ordering::Relaxed);
}

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Current hour-of-day (0–23). `None` if the wall clock was never set.
    #[cfg(target_os = "espidf")]
    pub fn current_hour(&self) -> Option<u8> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        // Anything before 2020-01-01 is the RTC's power-on default.
        const EPOCH_2020: i64 = 1_577_836_800;
        if i64::from(tv.tv_sec) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        u8::try_from(tm.tm_hour).ok().filter(|h| *h < 24)
    }

    /// Current hour-of-day from the simulated clock.
    #[cfg(not(target_os = "espidf"))]
    pub fn current_hour(&self) -> Option<u8> {
        match SIM_HOUR.load(Ordering::Relaxed) {
            h if h < 24 => Some(h),
            _ => None,
        }
    }
}
