// Monotonic millisecond time source. The machine's time-window view and the
// debug runtime's idle-time accounting are both expressed in terms of this.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

pub struct Clock;

impl Clock {
    pub fn new() -> Self {
        EPOCH.get_or_init(Instant::now);
        Clock
    }

    pub fn now_ms(&self) -> u64 {
        let epoch = *EPOCH.get_or_init(Instant::now);
        epoch.elapsed().as_millis() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ms_is_monotonic() {
        let clock = Clock::new();
        let first = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = clock.now_ms();
        assert!(second >= first);
    }
}
