//! Task watchdog for the control loop.
//!
//! The timeout is sized from the loop period plus the worst-case blocking
//! inside one tick (bus retries and the GSM send sequence).  On ESP-IDF the
//! calling task is subscribed to the TWDT and a stall panics the chip; on
//! the host the feeds are only counted.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU32, Ordering};

/// Floor for the watchdog timeout.
pub const MIN_TIMEOUT_MS: u32 = 10_000;

pub struct Watchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    feeds: AtomicU32,
}

impl Watchdog {
    /// Timeout covering one loop period plus `blocking_ms` of in-tick
    /// waits, doubled, never below [`MIN_TIMEOUT_MS`].
    pub fn timeout_for(period_ms: u32, blocking_ms: u32) -> u32 {
        period_ms
            .saturating_add(blocking_ms)
            .saturating_mul(2)
            .max(MIN_TIMEOUT_MS)
    }

    #[cfg(target_os = "espidf")]
    pub fn new(timeout_ms: u32) -> Self {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: plain FFI calls; a null handle means the calling task.
        let subscribed = unsafe {
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                log::warn!("twdt: reconfigure returned {}", ret);
            }
            let ret = esp_task_wdt_add(core::ptr::null_mut());
            if ret != ESP_OK {
                log::warn!("twdt: subscribe failed ({}), loop is unguarded", ret);
            }
            ret == ESP_OK
        };
        if subscribed {
            log::info!("twdt: armed, {} ms", timeout_ms);
        }
        Self {
            timeout_ms,
            subscribed,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(timeout_ms: u32) -> Self {
        log::info!("twdt(sim): {} ms", timeout_ms);
        Self {
            timeout_ms,
            feeds: AtomicU32::new(0),
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Reset the countdown.
    #[cfg(target_os = "espidf")]
    pub fn feed(&self) {
        if self.subscribed {
            // SAFETY: the calling task was subscribed in `new`.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn feed(&self) {
        self.feeds.fetch_add(1, Ordering::Relaxed);
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn feeds(&self) -> u32 {
        self.feeds.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_covers_period_and_blocking() {
        assert_eq!(Watchdog::timeout_for(5_000, 8_000), 26_000);
        assert_eq!(Watchdog::timeout_for(100, 0), MIN_TIMEOUT_MS);
        assert_eq!(Watchdog::timeout_for(u32::MAX, 1), u32::MAX);
    }

    #[test]
    fn sim_counts_feeds() {
        let wd = Watchdog::new(Watchdog::timeout_for(5_000, 0));
        wd.feed();
        wd.feed();
        assert_eq!(wd.feeds(), 2);
        assert_eq!(wd.timeout_ms(), 10_000);
    }
}
