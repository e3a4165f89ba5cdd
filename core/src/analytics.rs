use hdrhistogram::Histogram;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::engine::SimTime;
use crate::traits::Application;

/// Totals across every installed application.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct DeliverySummary {
    pub sent: u64,
    pub received: u64,
    pub echoed: u64,
    pub dropped: u64,
    pub failures: u64,
    pub rtt_samples: u64,
    pub rtt_p50_us: Option<u64>,
    pub rtt_p99_us: Option<u64>,
}

pub struct DeliveryStats {
    pub sent: u64,
    pub received: u64,
    pub echoed: u64,
    pub dropped: u64,
    pub failures: u64,
    rtt: Option<Histogram<u64>>,
}

impl DeliveryStats {
    pub fn collect<'a, I>(apps: I) -> Self
    where
        I: IntoIterator<Item = &'a Box<dyn Application>>,
    {
        let mut rtt = match Histogram::<u64>::new(3) {
            Ok(h) => Some(h),
            Err(e) => {
                warn!("round trip histogram unavailable: {}", e);
                None
            }
        };
        let mut stats = Self {
            sent: 0,
            received: 0,
            echoed: 0,
            dropped: 0,
            failures: 0,
            rtt: None,
        };
        for app in apps {
            stats.sent += app.packets_sent();
            stats.received += app.packets_received();
            stats.echoed += app.packets_echoed();
            stats.dropped += app.packets_dropped();
            stats.failures += app.delivery_failures();
            if let Some(h) = rtt.as_mut() {
                for &sample in app.round_trips() {
                    h.saturating_record(sample);
                }
            }
        }
        stats.rtt = rtt;
        stats
    }

    pub fn rtt_count(&self) -> u64 {
        self.rtt.as_ref().map_or(0, |h| h.len())
    }

    pub fn rtt_percentile(&self, p: f64) -> Option<SimTime> {
        let h = self.rtt.as_ref()?;
        if h.is_empty() {
            return None;
        }
        Some(h.value_at_quantile(p / 100.0))
    }

    pub fn summary(&self) -> DeliverySummary {
        DeliverySummary {
            sent: self.sent,
            received: self.received,
            echoed: self.echoed,
            dropped: self.dropped,
            failures: self.failures,
            rtt_samples: self.rtt_count(),
            rtt_p50_us: self.rtt_percentile(50.0),
            rtt_p99_us: self.rtt_percentile(99.0),
        }
    }
}
