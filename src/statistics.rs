//! Communication quality metrics, derived from sequence numbers and local wall-clock time only.
//!
//! The wire format carries no timestamps, so everything here is reconstructed from periodic
//!  samples of three sequence numbers:
//! * the partner's sequence number (as last seen by the receiver)
//! * our own sequence number (as last sent by the sender)
//! * the feedback sequence number, i.e. our own sequence number as echoed by the partner
//!
//! Average intervals are measured by timing a full cycle of 256 sequence numbers. Loss is
//!  detected by gaps between consecutive samples and reported per cycle. RTT is measured by
//!  timing a single own sequence number until it comes back as feedback.
//!
//! NB: Cycle boundaries are detected with heuristic bands near 0 / 255 that tolerate samples
//!  skipping a few sequence numbers. The bands differ between the streams.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;
use crate::seq_nr::SeqNr;

/// number of distinct sequence numbers per cycle
const CYCLE_LEN: f64 = 256.0;

/// (previous above, new below)
const OWN_INTERVAL_WRAP_BAND: (u8, u8) = (250, 3);
const PARTNER_WRAP_BAND: (u8, u8) = (250, 5);
const FEEDBACK_WRAP_BAND: (u8, u8) = (240, 15);

/// Immutable copy of the current statistics
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statistics {
    /// average time between our own packets in milliseconds, 0 until the first full cycle
    pub avg_own_interval_ms: f64,
    /// average time between the partner's packets in milliseconds, 0 until the first full cycle
    pub avg_partner_interval_ms: f64,
    /// most recently measured round trip time in milliseconds, 0 before the first measurement
    pub last_rtt_ms: f64,
    /// packets from the partner that were lost in the current cycle
    pub partner_lost_packets: u64,
    /// gaps in the partner's feedback in the current cycle
    pub feedback_lost_packets: u64,
}

#[derive(Copy, Clone, Debug)]
struct SeqSample {
    partner_seq: SeqNr,
    own_seq: SeqNr,
    feedback_seq: SeqNr,
}

#[derive(Copy, Clone, Debug)]
struct RttProbe {
    seq: SeqNr,
    elapsed_ms: f64,
}

pub struct StatisticsTracker {
    /// period of the update calls, used to compensate the sampling bias of interval estimation
    cycle_time_ms: f64,
    stats: Statistics,

    /// `None` before the first update
    previous: Option<SeqSample>,
    own_cycle_ms: f64,
    partner_cycle_ms: f64,
    rtt_probe: Option<RttProbe>,

    last_update: Instant,
}

impl StatisticsTracker {
    pub fn new(cycle_time_ms: f64) -> StatisticsTracker {
        StatisticsTracker {
            cycle_time_ms,
            stats: Statistics::default(),
            previous: None,
            own_cycle_ms: 0.0,
            partner_cycle_ms: 0.0,
            rtt_probe: None,
            last_update: Instant::now(),
        }
    }

    pub fn snapshot(&self) -> Statistics {
        self.stats.clone()
    }

    pub fn reset(&mut self) {
        self.stats = Statistics::default();
        self.previous = None;
        self.own_cycle_ms = 0.0;
        self.partner_cycle_ms = 0.0;
        self.rtt_probe = None;
        self.last_update = Instant::now();
    }

    /// To be called once per cycle, measuring the elapsed time since the previous call
    pub fn update(&mut self, partner_seq: SeqNr, own_seq: SeqNr, feedback_seq: SeqNr) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update);
        self.last_update = now;

        self.update_with_elapsed(partner_seq, own_seq, feedback_seq, elapsed);
    }

    /// Updates all metrics for a single tick with an explicitly given elapsed time.
    ///
    /// The first call after creation or reset only establishes the baseline for comparison.
    pub fn update_with_elapsed(&mut self, partner_seq: SeqNr, own_seq: SeqNr, feedback_seq: SeqNr, elapsed: Duration) {
        let current = SeqSample {
            partner_seq,
            own_seq,
            feedback_seq,
        };
        let previous = self.previous.unwrap_or(current);
        let elapsed_ms = elapsed.as_nanos() as f64 / 1_000_000.0;

        trace!("statistics tick after {:.3}ms: {:?}", elapsed_ms, current);

        self.update_own_interval(previous.own_seq, own_seq, elapsed_ms);
        self.update_partner_interval(previous.partner_seq, partner_seq, elapsed_ms);
        self.update_packet_loss(&previous, &current);
        self.update_rtt(previous.own_seq, own_seq, feedback_seq, elapsed_ms);

        self.previous = Some(current);
    }

    fn is_wrap(band: (u8, u8), previous: SeqNr, current: SeqNr) -> bool {
        previous.to_raw() > band.0 && current.to_raw() < band.1
    }

    fn cycle_average(&self, cycle_ms: f64) -> f64 {
        cycle_ms / CYCLE_LEN - 2.0 * self.cycle_time_ms
    }

    fn update_own_interval(&mut self, previous: SeqNr, current: SeqNr, elapsed_ms: f64) {
        if Self::is_wrap(OWN_INTERVAL_WRAP_BAND, previous, current) {
            if self.own_cycle_ms > 0.0 {
                self.stats.avg_own_interval_ms = self.cycle_average(self.own_cycle_ms);
                trace!("own sequence completed a cycle: avg interval {:.3}ms", self.stats.avg_own_interval_ms);
            }
            self.own_cycle_ms = 0.0;
        }
        self.own_cycle_ms += elapsed_ms;
    }

    fn update_partner_interval(&mut self, previous: SeqNr, current: SeqNr, elapsed_ms: f64) {
        if Self::is_wrap(PARTNER_WRAP_BAND, previous, current) {
            if self.partner_cycle_ms > 0.0 {
                self.stats.avg_partner_interval_ms = self.cycle_average(self.partner_cycle_ms);
                trace!("partner sequence completed a cycle: avg interval {:.3}ms", self.stats.avg_partner_interval_ms);
            }
            self.partner_cycle_ms = 0.0;
        }
        self.partner_cycle_ms += elapsed_ms;
    }

    /// number of sequence numbers skipped between two samples, treating backward movement
    ///  as reordering rather than loss
    fn gap(previous: SeqNr, current: SeqNr) -> u64 {
        if current.is_ahead_of(previous) {
            (current.difference(previous) - 1) as u64
        }
        else {
            0
        }
    }

    fn update_packet_loss(&mut self, previous: &SeqSample, current: &SeqSample) {
        self.stats.partner_lost_packets += Self::gap(previous.partner_seq, current.partner_seq);
        if Self::is_wrap(PARTNER_WRAP_BAND, previous.partner_seq, current.partner_seq) {
            self.stats.partner_lost_packets = 0;
        }

        self.stats.feedback_lost_packets += Self::gap(previous.feedback_seq, current.feedback_seq);
        if Self::is_wrap(FEEDBACK_WRAP_BAND, previous.feedback_seq, current.feedback_seq) {
            self.stats.feedback_lost_packets = 0;
        }
    }

    fn update_rtt(&mut self, previous_own: SeqNr, own_seq: SeqNr, feedback_seq: SeqNr, elapsed_ms: f64) {
        match &mut self.rtt_probe {
            None => {
                // sequence number 0 doubles as 'no probe', so it is never tracked
                if own_seq != previous_own && own_seq != SeqNr::ZERO {
                    self.rtt_probe = Some(RttProbe {
                        seq: own_seq,
                        elapsed_ms: 0.0,
                    });
                }
            }
            Some(probe) => {
                probe.elapsed_ms += elapsed_ms;
                if probe.seq == feedback_seq {
                    self.stats.last_rtt_ms = probe.elapsed_ms;
                    trace!("RTT probe {} returned after {:.3}ms", probe.seq, probe.elapsed_ms);
                    self.rtt_probe = None;
                }
            }
        }
    }
}
