// ── Link quality probes ──
//
// Latency and loss figures attached to each sample. The shipped probe is
// synthetic: a real RTT measurement needs a peer the agent cannot assume
// exists, so the numbers are drawn from fixed ranges and documented as
// stand-ins. The trait boundary lets a real prober (ICMP, TCP RTT) slot
// in without changing the sampler.

use async_trait::async_trait;

/// Latency/loss estimate for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkQuality {
    pub latency_ms: u32,
    pub packet_loss_pct: u8,
}

/// Produces a [`LinkQuality`] reading per sampling tick.
#[async_trait]
pub trait QualityProbe: Send {
    async fn probe(&mut self) -> LinkQuality;
}

/// Synthetic stand-in probe.
///
/// Draws latency uniformly from `[20, 70)` ms and loss from `[0, 5)` %
/// with an xorshift64* generator seeded from the clock.
pub struct SyntheticProbe {
    state: u64,
}

impl SyntheticProbe {
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn new() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E37_79B9_7F4A_7C15);
        Self::with_seed(seed)
    }

    /// Deterministic sequence for tests.
    pub fn with_seed(seed: u64) -> Self {
        // xorshift state must be nonzero
        Self { state: seed | 1 }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64*: small, fast, and more than random enough for
        // placeholder telemetry.
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}

impl Default for SyntheticProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QualityProbe for SyntheticProbe {
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    async fn probe(&mut self) -> LinkQuality {
        LinkQuality {
            latency_ms: 20 + (self.next_u64() % 50) as u32,
            packet_loss_pct: (self.next_u64() % 5) as u8,
        }
    }
}
