use crate::filters::chain::{FilterChain, FilterSettings};
use crate::prelude::{ParsedSample, SignalKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Startup assignment of one hardware channel to a modality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    pub kind: SignalKind,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            kind: SignalKind::Unknown,
        }
    }
}

/// One channel's contribution to a routed sample.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelReading {
    pub index: usize,
    pub kind: SignalKind,
    pub raw: f32,
    pub filtered: f32,
}

/// Filtered view of one parsed sample, in channel order.
#[derive(Debug, Clone, Serialize)]
pub struct RoutedSample {
    pub sequence: u8,
    pub timestamp_s: f64,
    pub channels: Vec<ChannelReading>,
}

/// Dispatches each channel's raw value into the filter chain registered
/// for its modality.
///
/// The router is a fixed dispatch table built once at session start; the
/// mutable filter state lives in the per-channel chains it owns, touched
/// only by the consumer thread.
pub struct FilterRouter {
    routes: Vec<(SignalKind, Option<FilterChain>)>,
    epoch: Instant,
}

impl FilterRouter {
    pub fn new(channels: &[ChannelSettings], filters: &FilterSettings, sample_rate: f32) -> Self {
        let routes = channels
            .iter()
            .enumerate()
            .map(|(index, settings)| {
                let chain = FilterChain::for_kind(settings.kind, filters, sample_rate);
                if chain.is_none() {
                    debug!("channel {index} has no filter chain, passing raw values through");
                }
                (settings.kind, chain)
            })
            .collect();
        Self {
            routes,
            epoch: Instant::now(),
        }
    }

    /// Routes every channel; channels without a chain are emitted
    /// unfiltered rather than silently dropped.
    pub fn route(&mut self, sample: &ParsedSample) -> RoutedSample {
        let timestamp_s = sample.timestamp.duration_since(self.epoch).as_secs_f64();
        let channels = sample
            .channels
            .iter()
            .enumerate()
            .map(|(index, &raw)| {
                let raw = raw as f32;
                let (kind, chain) = match self.routes.get_mut(index) {
                    Some((kind, chain)) => (*kind, chain.as_mut()),
                    None => (SignalKind::Unknown, None),
                };
                let filtered = match chain {
                    Some(chain) => chain.process(raw),
                    None => raw,
                };
                ChannelReading {
                    index,
                    kind,
                    raw,
                    filtered,
                }
            })
            .collect();

        RoutedSample {
            sequence: sample.sequence,
            timestamp_s,
            channels,
        }
    }

    /// Clears all chain state; the dispatch table itself is immutable.
    pub fn reset(&mut self) {
        for (_, chain) in self.routes.iter_mut() {
            if let Some(chain) = chain {
                chain.reset();
            }
        }
    }

    pub fn channel_count(&self) -> usize {
        self.routes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sample(channels: Vec<u16>) -> ParsedSample {
        ParsedSample {
            sequence: 0,
            channels,
            dropped_before: 0,
            timestamp: Instant::now(),
        }
    }

    fn channels(kinds: &[SignalKind]) -> Vec<ChannelSettings> {
        kinds.iter().map(|&kind| ChannelSettings { kind }).collect()
    }

    #[test]
    fn unknown_channel_passes_through_but_is_still_emitted() {
        let mut router = FilterRouter::new(
            &channels(&[SignalKind::Unknown, SignalKind::Emg]),
            &FilterSettings::default(),
            512.0,
        );
        let routed = router.route(&sample(vec![1234, 800]));

        assert_eq!(routed.channels.len(), 2);
        assert_eq!(routed.channels[0].kind, SignalKind::Unknown);
        assert_eq!(routed.channels[0].filtered, 1234.0);
        // the EMG chain transforms its input
        assert_ne!(routed.channels[1].filtered, 800.0);
    }

    #[test]
    fn every_configured_channel_appears_in_order() {
        let mut router = FilterRouter::new(
            &channels(&[SignalKind::Eeg, SignalKind::Eog]),
            &FilterSettings::default(),
            512.0,
        );
        let routed = router.route(&sample(vec![10, 20]));
        let indices: Vec<usize> = routed.channels.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(routed.channels[0].kind, SignalKind::Eeg);
        assert_eq!(routed.channels[1].kind, SignalKind::Eog);
    }

    #[test]
    fn reset_restores_initial_chain_state() {
        let settings = FilterSettings::default();
        let mut router = FilterRouter::new(&channels(&[SignalKind::Eeg]), &settings, 512.0);
        let mut fresh = FilterRouter::new(&channels(&[SignalKind::Eeg]), &settings, 512.0);

        for i in 0..500u16 {
            router.route(&sample(vec![i]));
        }
        router.reset();

        let a = router.route(&sample(vec![1000])).channels[0].filtered;
        let b = fresh.route(&sample(vec![1000])).channels[0].filtered;
        assert!((a - b).abs() < 1e-6);
    }
}
