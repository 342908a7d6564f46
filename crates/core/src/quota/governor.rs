//! Dual fixed-window request governor.

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

/// Ceilings for the two request windows the remote service enforces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Max requests in the rapid window.
    #[serde(default = "default_rapid_ceiling")]
    pub rapid_ceiling: u32,

    /// Rapid window length in seconds.
    #[serde(default = "default_rapid_window_secs")]
    pub rapid_window_secs: u64,

    /// Max requests in the prolonged window.
    #[serde(default = "default_prolonged_ceiling")]
    pub prolonged_ceiling: u32,

    /// Prolonged window length in seconds.
    #[serde(default = "default_prolonged_window_secs")]
    pub prolonged_window_secs: u64,
}

fn default_rapid_ceiling() -> u32 {
    100
}

fn default_rapid_window_secs() -> u64 {
    60
}

fn default_prolonged_ceiling() -> u32 {
    2000
}

fn default_prolonged_window_secs() -> u64 {
    21600 // 6 hours
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            rapid_ceiling: default_rapid_ceiling(),
            rapid_window_secs: default_rapid_window_secs(),
            prolonged_ceiling: default_prolonged_ceiling(),
            prolonged_window_secs: default_prolonged_window_secs(),
        }
    }
}

/// One fixed window: a counter that resets when the window elapses.
#[derive(Debug)]
struct Window {
    ceiling: u32,
    length: Duration,
    count: u32,
    started: Instant,
}

impl Window {
    fn new(ceiling: u32, length: Duration) -> Self {
        Self {
            ceiling,
            length,
            count: 0,
            started: Instant::now(),
        }
    }

    /// Start a fresh window if the current one has elapsed.
    fn roll(&mut self, now: Instant) {
        if now.duration_since(self.started) >= self.length {
            self.count = 0;
            self.started = now;
        }
    }

    fn has_room(&self) -> bool {
        self.count < self.ceiling
    }

    /// Time until this window resets.
    fn remaining(&self, now: Instant) -> Duration {
        self.length.saturating_sub(now.duration_since(self.started))
    }
}

/// Snapshot of both windows.
#[derive(Debug, Clone)]
pub struct QuotaStatus {
    pub rapid_used: u32,
    pub rapid_ceiling: u32,
    pub prolonged_used: u32,
    pub prolonged_ceiling: u32,
}

struct Windows {
    rapid: Window,
    prolonged: Window,
}

/// Serializes admission of every outbound request across two fixed windows.
///
/// The increment-and-check is performed under a single mutex so that
/// concurrent callers near a window boundary can never race past a
/// ceiling. [`QuotaGovernor::acquire`] never fails; it suspends the caller
/// until both windows admit the call.
pub struct QuotaGovernor {
    windows: Mutex<Windows>,
}

impl QuotaGovernor {
    pub fn new(config: &QuotaConfig) -> Self {
        Self {
            windows: Mutex::new(Windows {
                rapid: Window::new(
                    config.rapid_ceiling,
                    Duration::from_secs(config.rapid_window_secs),
                ),
                prolonged: Window::new(
                    config.prolonged_ceiling,
                    Duration::from_secs(config.prolonged_window_secs),
                ),
            }),
        }
    }

    /// Acquire admission for one request, waiting out window resets as
    /// needed.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut windows = self.windows.lock().await;
                let now = Instant::now();
                windows.rapid.roll(now);
                windows.prolonged.roll(now);

                if windows.rapid.has_room() && windows.prolonged.has_room() {
                    windows.rapid.count += 1;
                    windows.prolonged.count += 1;
                    return;
                }

                // Every exceeded window must reset before the call can be
                // admitted, so wait for the furthest reset.
                let mut wait = Duration::ZERO;
                if !windows.rapid.has_room() {
                    wait = wait.max(windows.rapid.remaining(now));
                }
                if !windows.prolonged.has_room() {
                    wait = wait.max(windows.prolonged.remaining(now));
                }
                wait
            };

            debug!(
                wait_ms = wait.as_millis() as u64,
                "request budget exhausted, waiting for window reset"
            );
            sleep(wait).await;
        }
    }

    /// Current usage of both windows.
    pub async fn status(&self) -> QuotaStatus {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        windows.rapid.roll(now);
        windows.prolonged.roll(now);

        QuotaStatus {
            rapid_used: windows.rapid.count,
            rapid_ceiling: windows.rapid.ceiling,
            prolonged_used: windows.prolonged.count,
            prolonged_ceiling: windows.prolonged.ceiling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(
        rapid_ceiling: u32,
        rapid_window_secs: u64,
        prolonged_ceiling: u32,
        prolonged_window_secs: u64,
    ) -> QuotaConfig {
        QuotaConfig {
            rapid_ceiling,
            rapid_window_secs,
            prolonged_ceiling,
            prolonged_window_secs,
        }
    }

    #[test]
    fn test_default_config() {
        let config = QuotaConfig::default();
        assert_eq!(config.rapid_ceiling, 100);
        assert_eq!(config.rapid_window_secs, 60);
        assert_eq!(config.prolonged_ceiling, 2000);
        assert_eq!(config.prolonged_window_secs, 21600);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_under_ceiling_is_immediate() {
        let governor = QuotaGovernor::new(&config(3, 60, 100, 3600));

        let start = Instant::now();
        for _ in 0..3 {
            governor.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        let status = governor.status().await;
        assert_eq!(status.rapid_used, 3);
        assert_eq!(status.prolonged_used, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_rapid_window_reset() {
        let governor = QuotaGovernor::new(&config(2, 10, 100, 3600));

        let start = Instant::now();
        governor.acquire().await;
        governor.acquire().await;
        // Third call must wait out the rest of the rapid window.
        governor.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prolonged_window_binds_when_rapid_has_room() {
        let governor = QuotaGovernor::new(&config(100, 1, 2, 30));

        let start = Instant::now();
        governor.acquire().await;
        governor.acquire().await;
        governor.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_elapse() {
        let governor = QuotaGovernor::new(&config(2, 5, 100, 3600));

        governor.acquire().await;
        governor.acquire().await;
        sleep(Duration::from_secs(5)).await;

        let status = governor.status().await;
        assert_eq!(status.rapid_used, 0);

        let start = Instant::now();
        governor.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_never_exceeded_within_a_window() {
        // 2 per 1s window, 5 calls: admissions must span at least 2 full
        // window lengths.
        let governor = QuotaGovernor::new(&config(2, 1, 100, 3600));

        let start = Instant::now();
        for _ in 0..5 {
            governor.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquires_serialize_at_the_ceiling() {
        let governor = std::sync::Arc::new(QuotaGovernor::new(&config(2, 5, 100, 3600)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let governor = std::sync::Arc::clone(&governor);
                tokio::spawn(async move {
                    governor.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap());
        }
        admitted.sort();

        // Two admitted in the first window, two only after the reset.
        assert_eq!(admitted[1].duration_since(admitted[0]), Duration::ZERO);
        assert!(admitted[2].duration_since(admitted[0]) >= Duration::from_secs(5));
        assert!(admitted[3].duration_since(admitted[0]) >= Duration::from_secs(5));
    }
}
