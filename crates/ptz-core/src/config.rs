use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::validate::IntegerPolicy;

/// Serial and timing parameters of a camera connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViscaConfig {
    pub baud_rate: u32,
    /// Address of the camera commands go to. The chain is numbered from 1.
    pub camera_address: u8,
    pub reply_timeout_ms: u64,
    /// Wait after a zoom command before the next device access.
    pub zoom_settle_usec: u64,
    /// Wait before draining the receive path on close.
    pub close_settle_usec: u64,
    pub drain_cap_bytes: usize,
    /// Treat non-numeric integer arguments as 0 instead of rejecting them.
    pub lenient_integers: bool,
}

impl Default for ViscaConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            camera_address: 1,
            reply_timeout_ms: 1000,
            zoom_settle_usec: 500_000,
            close_settle_usec: 2000,
            drain_cap_bytes: 3000,
            lenient_integers: false,
        }
    }
}

impl ViscaConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn zoom_settle(&self) -> Duration {
        Duration::from_micros(self.zoom_settle_usec)
    }

    pub fn close_settle(&self) -> Duration {
        Duration::from_micros(self.close_settle_usec)
    }

    pub fn integer_policy(&self) -> IntegerPolicy {
        if self.lenient_integers {
            IntegerPolicy::Lenient
        } else {
            IntegerPolicy::Strict
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_fields_take_defaults() -> eyre::Result<()> {
        let cfg: ViscaConfig = serde_yaml::from_str("baud_rate: 38400\n")?;
        assert_eq!(cfg.baud_rate, 38400);
        assert_eq!(cfg.camera_address, 1);
        assert_eq!(cfg.close_settle(), Duration::from_micros(2000));
        assert_eq!(cfg.integer_policy(), IntegerPolicy::Strict);

        let cfg: ViscaConfig = serde_yaml::from_str("{}")?;
        assert_eq!(cfg, ViscaConfig::default());
        Ok(())
    }

    #[test]
    fn round_trip() -> eyre::Result<()> {
        let cfg = ViscaConfig {
            lenient_integers: true,
            zoom_settle_usec: 0,
            ..Default::default()
        };
        let buf = serde_yaml::to_string(&cfg)?;
        let back: ViscaConfig = serde_yaml::from_str(&buf)?;
        assert_eq!(back, cfg);
        assert_eq!(back.integer_policy(), IntegerPolicy::Lenient);
        Ok(())
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(serde_yaml::from_str::<ViscaConfig>("baud: 9600\n").is_err());
    }
}
