//! RFC 6298 retransmission timer estimation.

use std::time::Duration;

const INITIAL_RTO: Duration = Duration::from_secs(3);
const MIN_RTO: Duration = Duration::from_secs(1);
const MAX_RTO: Duration = Duration::from_secs(60);
const CLOCK_GRANULARITY: Duration = Duration::from_millis(1);
const K: u32 = 4;
const ALPHA_NUM: i64 = 1;
const ALPHA_DEN: i64 = 8;
const BETA_NUM: i64 = 1;
const BETA_DEN: i64 = 4;

pub struct RtoManager {
    rto: Duration,
    srtt: Option<Duration>,
    rttvar: Option<Duration>,
    retransmit_count: u32,
}

fn clamp(d: Duration) -> Duration {
    d.clamp(MIN_RTO, MAX_RTO)
}

impl RtoManager {
    pub fn new() -> Self {
        Self {
            rto: INITIAL_RTO,
            srtt: None,
            rttvar: None,
            retransmit_count: 0,
        }
    }

    pub fn rto(&self) -> Duration {
        self.rto
    }

    pub fn retransmit_count(&self) -> u32 {
        self.retransmit_count
    }

    /// Feeds one RTT sample. Must not be called for a retransmitted
    /// segment (Karn's algorithm) — callers filter that out before calling.
    pub fn on_rtt_sample(&mut self, sample: Duration) {
        match (self.srtt, self.rttvar) {
            (None, _) => {
                self.srtt = Some(sample);
                self.rttvar = Some(sample / 2);
            }
            (Some(srtt), Some(rttvar)) => {
                let diff = if sample > srtt { sample - srtt } else { srtt - sample };
                let new_rttvar = scale(rttvar, BETA_DEN - BETA_NUM, BETA_DEN) + scale(diff, BETA_NUM, BETA_DEN);
                let new_srtt = scale(srtt, ALPHA_DEN - ALPHA_NUM, ALPHA_DEN) + scale(sample, ALPHA_NUM, ALPHA_DEN);
                self.rttvar = Some(new_rttvar);
                self.srtt = Some(new_srtt);
            }
            _ => unreachable!(),
        }
        let srtt = self.srtt.unwrap();
        let rttvar = self.rttvar.unwrap();
        self.rto = clamp(srtt + CLOCK_GRANULARITY.max(rttvar * K));
        self.retransmit_count = 0;
    }

    /// Backs off on a retransmission timeout: doubles the RTO (clamped) and
    /// bumps the retransmit counter. No RTT sample is taken.
    pub fn on_timeout(&mut self) {
        self.rto = clamp(self.rto * 2);
        self.retransmit_count += 1;
    }

    pub fn on_new_data_acked(&mut self) {
        self.retransmit_count = 0;
    }
}

impl Default for RtoManager {
    fn default() -> Self {
        Self::new()
    }
}

fn scale(d: Duration, num: i64, den: i64) -> Duration {
    Duration::from_nanos((d.as_nanos() as i64 * num / den).max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rto_stays_within_bounds() {
        let mut rto = RtoManager::new();
        assert!(rto.rto() >= MIN_RTO && rto.rto() <= MAX_RTO);
        for _ in 0..10 {
            rto.on_timeout();
            assert!(rto.rto() >= MIN_RTO && rto.rto() <= MAX_RTO);
        }
    }

    #[test]
    fn first_sample_sets_srtt_and_half_rttvar() {
        let mut rto = RtoManager::new();
        rto.on_rtt_sample(Duration::from_millis(200));
        assert_eq!(rto.srtt, Some(Duration::from_millis(200)));
        assert_eq!(rto.rttvar, Some(Duration::from_millis(100)));
    }

    #[test]
    fn timeout_doubles_rto_and_increments_counter_without_sampling() {
        let mut rto = RtoManager::new();
        let before = rto.rto();
        rto.on_timeout();
        assert_eq!(rto.rto(), clamp(before * 2));
        assert_eq!(rto.retransmit_count(), 1);
    }

    #[test]
    fn successful_new_data_ack_resets_retransmit_counter() {
        let mut rto = RtoManager::new();
        rto.on_timeout();
        rto.on_timeout();
        assert_eq!(rto.retransmit_count(), 2);
        rto.on_new_data_acked();
        assert_eq!(rto.retransmit_count(), 0);
    }
}
