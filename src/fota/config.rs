use std::time::Duration;

use super::types::FotaConfig;

impl Default for FotaConfig {
    fn default() -> Self {
        Self {
            settle_time: Duration::from_secs(1),
            // The vendor application note speaks of 265-byte blocks, but
            // field-proven transfers use 256. Kept at 256 until confirmed
            // against the LFOTA specification.
            chunk_size: 256,
            inter_chunk_delay: Duration::from_millis(50),
            flash_settle: Duration::from_secs(5),
            pre_reset_delay: Duration::from_secs(1),
            post_close_delay: Duration::from_secs(1),
            reconnect_attempts: 100,
            reconnect_interval: Duration::from_secs(1),
            boot_settle: Duration::from_secs(5),
        }
    }
}

impl FotaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_inter_chunk_delay(mut self, delay: Duration) -> Self {
        self.inter_chunk_delay = delay;
        self
    }

    pub fn with_reconnect_attempts(mut self, attempts: usize) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }
}
