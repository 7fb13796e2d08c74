//! Session lifecycle and the consumer-thread pipeline.
//!
//! One thread owns the physical read loop (`AcquisitionReader`); this
//! module owns the other side: a consumer thread that drains the bounded
//! queue and runs Parser -> Router -> Extractors -> Detectors in strict
//! arrival order. All mutable per-channel state (filter history, sliding
//! windows, detector state) is confined to the consumer thread, so no
//! per-sample locking exists anywhere on the data path.

use crate::acquisition::{AcquisitionReader, ByteLink, ReaderEvent, ReaderHandle};
use crate::detect::{
    BlinkGate, Classifier, HysteresisDetector, HysteresisSettings, LabelProfile, Prediction,
    ProfileClassifier, ProfileDetector,
};
use crate::features::eeg::{default_bands, FrequencyBand};
use crate::features::{
    BlinkEpisodeExtractor, BlinkSettings, EegExtractor, EmgExtractor, FeatureVector,
    WindowSettings,
};
use crate::filters::{ChannelSettings, FilterRouter, FilterSettings, RoutedSample};
use crate::framing::{PacketFormat, PacketParser, ParseOutcome};
use crate::prelude::{PipelineError, PipelineResult, SignalKind};
use crate::telemetry::{MetricsSnapshot, SessionMetrics};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Window and episode parameters for the feature extractors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    pub window: WindowSettings,
    pub blink: BlinkSettings,
    pub eeg_bands: Vec<FrequencyBand>,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            blink: BlinkSettings::default(),
            eeg_bands: default_bands(),
        }
    }
}

/// Detector parameters; label profiles are configuration-supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub consensus: f32,
    pub hysteresis: HysteresisSettings,
    pub blink_gate: BlinkGate,
    pub emg_profiles: Vec<LabelProfile>,
    pub eeg_profiles: Vec<LabelProfile>,
    pub eog_profiles: Vec<LabelProfile>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            consensus: 0.6,
            hysteresis: HysteresisSettings::default(),
            blink_gate: BlinkGate::default(),
            emg_profiles: Vec::new(),
            eeg_profiles: Vec::new(),
            eog_profiles: Vec::new(),
        }
    }
}

/// Everything a session needs, consumed once at `Session::start`.
/// Reconfiguration means stopping and starting a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub sample_rate_hz: f32,
    pub packet: PacketFormat,
    pub queue_capacity: usize,
    pub start_command: Option<String>,
    pub channels: Vec<ChannelSettings>,
    pub filters: FilterSettings,
    pub features: FeatureSettings,
    pub detectors: DetectorSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 512.0,
            packet: PacketFormat::default(),
            queue_capacity: 10_000,
            start_command: None,
            channels: vec![ChannelSettings::default(); PacketFormat::default().channel_count],
            filters: FilterSettings::default(),
            features: FeatureSettings::default(),
            detectors: DetectorSettings::default(),
        }
    }
}

pub type SampleSink = Box<dyn FnMut(&RoutedSample) + Send>;
pub type FeatureSink = Box<dyn FnMut(usize, &FeatureVector) + Send>;
pub type LabelSink = Box<dyn FnMut(usize, &str) + Send>;

/// Single-consumer callbacks invoked from the consumer thread. Best
/// effort: a sink must return promptly, it runs on the pipeline thread.
#[derive(Default)]
pub struct Sinks {
    pub on_sample: Option<SampleSink>,
    pub on_features: Option<FeatureSink>,
    pub on_label: Option<LabelSink>,
}

/// Delegation shim so one frozen classifier can serve several channels.
struct SharedClassifier(Arc<dyn Classifier + Send + Sync>);

impl Classifier for SharedClassifier {
    fn predict(&self, features: &FeatureVector) -> Prediction {
        self.0.predict(features)
    }
}

/// Per-channel extractor/detector pair owned by the consumer thread.
enum ChannelPipeline {
    Emg {
        extractor: EmgExtractor,
        detector: HysteresisDetector,
        published: Option<String>,
    },
    Eeg {
        extractor: EegExtractor,
        detector: ProfileDetector,
        published: Option<String>,
    },
    Eog {
        extractor: BlinkEpisodeExtractor,
        gate: BlinkGate,
        detector: ProfileDetector,
    },
    Passthrough,
}

impl ChannelPipeline {
    fn build(
        kind: SignalKind,
        config: &SessionConfig,
        classifier: Option<&Arc<dyn Classifier + Send + Sync>>,
    ) -> Self {
        let window = &config.features.window;
        let fs = config.sample_rate_hz;
        match kind {
            SignalKind::Emg => {
                let classifier: Box<dyn Classifier> = match classifier {
                    Some(shared) => Box::new(SharedClassifier(shared.clone())),
                    None => Box::new(ProfileClassifier::new(ProfileDetector::new(
                        config.detectors.emg_profiles.clone(),
                        config.detectors.consensus,
                    ))),
                };
                ChannelPipeline::Emg {
                    extractor: EmgExtractor::new(window, fs),
                    detector: HysteresisDetector::new(
                        classifier,
                        config.detectors.hysteresis.clone(),
                    ),
                    published: None,
                }
            }
            SignalKind::Eeg => ChannelPipeline::Eeg {
                extractor: EegExtractor::new(window, config.features.eeg_bands.clone(), fs),
                detector: ProfileDetector::new(
                    config.detectors.eeg_profiles.clone(),
                    config.detectors.consensus,
                ),
                published: None,
            },
            SignalKind::Eog => ChannelPipeline::Eog {
                extractor: BlinkEpisodeExtractor::new(config.features.blink.clone(), fs),
                gate: config.detectors.blink_gate.clone(),
                detector: ProfileDetector::new(
                    config.detectors.eog_profiles.clone(),
                    config.detectors.consensus,
                ),
            },
            SignalKind::Unknown => ChannelPipeline::Passthrough,
        }
    }

    fn reset(&mut self) {
        match self {
            ChannelPipeline::Emg {
                extractor,
                detector,
                published,
            } => {
                extractor.reset();
                detector.reset();
                *published = None;
            }
            ChannelPipeline::Eeg {
                extractor,
                published,
                ..
            } => {
                extractor.reset();
                *published = None;
            }
            ChannelPipeline::Eog { extractor, .. } => extractor.reset(),
            ChannelPipeline::Passthrough => {}
        }
    }

    fn process(
        &mut self,
        index: usize,
        filtered: f32,
        metrics: &SessionMetrics,
        sinks: &mut Sinks,
    ) {
        match self {
            ChannelPipeline::Emg {
                extractor,
                detector,
                published,
            } => {
                if let Some(features) = extractor.push(filtered) {
                    metrics.record_features_emitted();
                    if let Some(sink) = sinks.on_features.as_mut() {
                        sink(index, &features);
                    }
                    let stable = detector.detect(&features).map(str::to_string);
                    publish_on_change(index, stable, published, metrics, sinks);
                }
            }
            ChannelPipeline::Eeg {
                extractor,
                detector,
                published,
            } => {
                if let Some(features) = extractor.push(filtered) {
                    metrics.record_features_emitted();
                    if let Some(sink) = sinks.on_features.as_mut() {
                        sink(index, &features);
                    }
                    let label = detector.detect(&features).map(str::to_string);
                    publish_on_change(index, label, published, metrics, sinks);
                }
            }
            ChannelPipeline::Eog {
                extractor,
                gate,
                detector,
            } => {
                if let Some(features) = extractor.push(filtered) {
                    metrics.record_features_emitted();
                    if let Some(sink) = sinks.on_features.as_mut() {
                        sink(index, &features);
                    }
                    // blink events are discrete: publish every accepted one
                    if gate.admits(&features) {
                        if let Some(label) = detector.detect(&features) {
                            metrics.record_label_emitted();
                            if let Some(sink) = sinks.on_label.as_mut() {
                                sink(index, label);
                            }
                        }
                    }
                }
            }
            ChannelPipeline::Passthrough => {}
        }
    }
}

fn publish_on_change(
    index: usize,
    label: Option<String>,
    published: &mut Option<String>,
    metrics: &SessionMetrics,
    sinks: &mut Sinks,
) {
    if label.is_some() && label != *published {
        *published = label;
        metrics.record_label_emitted();
        if let Some(sink) = sinks.on_label.as_mut() {
            sink(index, published.as_deref().unwrap_or_default());
        }
    }
}

/// Handle to a running acquisition session.
pub struct Session {
    reader: ReaderHandle,
    consumer: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    reset_flag: Arc<AtomicBool>,
    metrics: Arc<SessionMetrics>,
}

impl Session {
    /// Validates the configuration, writes the optional start command, and
    /// spawns the reader and consumer threads.
    pub fn start(
        link: Box<dyn ByteLink>,
        config: SessionConfig,
        classifier: Option<Arc<dyn Classifier + Send + Sync>>,
        sinks: Sinks,
    ) -> PipelineResult<Self> {
        if config.channels.len() != config.packet.channel_count {
            return Err(PipelineError::InvalidConfig(format!(
                "{} channel mappings configured for a {}-channel packet format",
                config.channels.len(),
                config.packet.channel_count
            )));
        }
        if config.features.window.capacity == 0 || config.features.window.stride == 0 {
            return Err(PipelineError::InvalidConfig(
                "window capacity and stride must be nonzero".into(),
            ));
        }

        let metrics = Arc::new(SessionMetrics::new());
        let handshake = config
            .start_command
            .as_ref()
            .map(|cmd| format!("{cmd}\n").into_bytes());

        let (rx, reader) = AcquisitionReader::spawn(
            link,
            config.packet,
            config.queue_capacity,
            handshake,
            metrics.clone(),
        );

        let stop = Arc::new(AtomicBool::new(false));
        let reset_flag = Arc::new(AtomicBool::new(false));
        let consumer = spawn_consumer(
            rx,
            config,
            classifier,
            sinks,
            stop.clone(),
            reset_flag.clone(),
            metrics.clone(),
        );

        info!("session started");
        Ok(Self {
            reader,
            consumer: Some(consumer),
            stop,
            reset_flag,
            metrics,
        })
    }

    pub fn metrics(&self) -> Arc<SessionMetrics> {
        self.metrics.clone()
    }

    /// Requests that all filter, window, and detector state be cleared
    /// before the next packet, without touching the physical connection.
    pub fn reset_state(&self) {
        self.reset_flag.store(true, Ordering::SeqCst);
    }

    /// True while the consumer is still draining input.
    pub fn is_running(&self) -> bool {
        self.consumer
            .as_ref()
            .map(|c| !c.is_finished())
            .unwrap_or(false)
    }

    /// Blocks until the input ends (disconnect or end of replay), then
    /// tears the session down and reports the final counters.
    pub fn wait(mut self) -> MetricsSnapshot {
        if let Some(consumer) = self.consumer.take() {
            let _ = consumer.join();
        }
        self.reader.stop();
        self.metrics.snapshot()
    }

    /// Stops both threads: the reader exits after its current bounded
    /// read, in-flight frames are discarded, and the link is closed.
    pub fn stop(mut self) -> MetricsSnapshot {
        self.stop.store(true, Ordering::SeqCst);
        self.reader.stop();
        if let Some(consumer) = self.consumer.take() {
            let _ = consumer.join();
        }
        info!("session stopped");
        self.metrics.snapshot()
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_consumer(
    rx: Receiver<ReaderEvent>,
    config: SessionConfig,
    classifier: Option<Arc<dyn Classifier + Send + Sync>>,
    mut sinks: Sinks,
    stop: Arc<AtomicBool>,
    reset_flag: Arc<AtomicBool>,
    metrics: Arc<SessionMetrics>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut parser = PacketParser::new(config.packet);
        let mut router = FilterRouter::new(
            &config.channels,
            &config.filters,
            config.sample_rate_hz,
        );
        let mut pipelines: Vec<ChannelPipeline> = config
            .channels
            .iter()
            .map(|settings| ChannelPipeline::build(settings.kind, &config, classifier.as_ref()))
            .collect();

        loop {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(ReaderEvent::Frame(frame)) => {
                    if reset_flag.swap(false, Ordering::SeqCst) {
                        parser.reset();
                        router.reset();
                        for pipeline in pipelines.iter_mut() {
                            pipeline.reset();
                        }
                        info!("per-channel state cleared on reset request");
                    }
                    match parser.parse(&frame) {
                        ParseOutcome::Sample(sample) => {
                            if sample.dropped_before > 0 {
                                debug!(
                                    "sequence gap before packet {}: {} dropped",
                                    sample.sequence, sample.dropped_before
                                );
                                metrics.record_sequence_gap(sample.dropped_before as u64);
                            }
                            let routed = router.route(&sample);
                            metrics.record_sample_routed();
                            if let Some(sink) = sinks.on_sample.as_mut() {
                                sink(&routed);
                            }
                            for reading in &routed.channels {
                                if let Some(pipeline) = pipelines.get_mut(reading.index) {
                                    pipeline.process(
                                        reading.index,
                                        reading.filtered,
                                        &metrics,
                                        &mut sinks,
                                    );
                                }
                            }
                        }
                        ParseOutcome::Duplicate => metrics.record_duplicate(),
                        ParseOutcome::Rejected(reason) => {
                            debug!("frame rejected: {reason:?}");
                            metrics.record_checksum_failure();
                        }
                    }
                }
                Ok(ReaderEvent::Disconnected) => {
                    info!("link disconnected; session input ended");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        // in-flight frames are discarded, never half-processed
        while rx.try_recv().is_ok() {}
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    /// Replays canned chunks, then fails like an unplugged device.
    struct ReplayLink {
        chunks: Vec<Vec<u8>>,
        cursor: usize,
    }

    impl ReplayLink {
        fn new(chunks: Vec<Vec<u8>>) -> Self {
            Self { chunks, cursor: 0 }
        }
    }

    impl ByteLink for ReplayLink {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.cursor >= self.chunks.len() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "replay ended"));
            }
            let chunk = &self.chunks[self.cursor];
            self.cursor += 1;
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }

        fn write_all(&mut self, _bytes: &[u8]) -> io::Result<()> {
            Ok(())
        }
    }

    fn two_channel_config(kinds: [SignalKind; 2]) -> SessionConfig {
        SessionConfig {
            channels: kinds
                .iter()
                .map(|&kind| ChannelSettings { kind })
                .collect(),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn channel_count_mismatch_is_rejected_at_start() {
        let config = SessionConfig {
            channels: vec![ChannelSettings::default(); 3],
            ..SessionConfig::default()
        };
        let result = Session::start(
            Box::new(ReplayLink::new(vec![])),
            config,
            None,
            Sinks::default(),
        );
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn replayed_stream_flows_to_the_sample_sink_in_order() {
        let format = PacketFormat::default();
        let chunks: Vec<Vec<u8>> = (0..50u8)
            .map(|i| format.encode_frame(i, &[1000 + i as u16, 2000]))
            .collect();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_sink = seen.clone();
        let sinks = Sinks {
            on_sample: Some(Box::new(move |routed: &RoutedSample| {
                seen_in_sink.lock().unwrap().push(routed.sequence);
            })),
            ..Sinks::default()
        };

        let session = Session::start(
            Box::new(ReplayLink::new(chunks)),
            two_channel_config([SignalKind::Unknown, SignalKind::Unknown]),
            None,
            sinks,
        )
        .unwrap();
        let metrics = session.wait();

        let sequences = seen.lock().unwrap().clone();
        assert_eq!(sequences, (0..50u8).collect::<Vec<u8>>());
        assert_eq!(metrics.samples_routed, 50);
        assert_eq!(metrics.disconnects, 1);
    }

    #[test]
    fn duplicates_and_garbage_are_absorbed_with_counters() {
        let format = PacketFormat::default();
        let mut chunks = Vec::new();
        chunks.push(format.encode_frame(1, &[10, 20]));
        chunks.push(format.encode_frame(1, &[10, 20])); // duplicate
        chunks.push(vec![0xDE, 0xAD, 0xBE]); // garbage between frames
        chunks.push(format.encode_frame(4, &[30, 40])); // gap of 2

        let session = Session::start(
            Box::new(ReplayLink::new(chunks)),
            two_channel_config([SignalKind::Unknown, SignalKind::Unknown]),
            None,
            Sinks::default(),
        )
        .unwrap();
        let metrics = session.wait();

        assert_eq!(metrics.samples_routed, 2);
        assert_eq!(metrics.duplicates, 1);
        assert_eq!(metrics.packets_dropped, 2);
        assert!(metrics.sync_errors >= 3);
    }

    #[test]
    fn emg_channel_emits_features_once_window_fills() {
        let format = PacketFormat::default();
        // enough packets to fill a 512-sample window a few times over
        let chunks: Vec<Vec<u8>> = (0..700u32)
            .map(|i| {
                let v = (2048.0 + 500.0 * (i as f32 * 0.8).sin()) as u16;
                format.encode_frame((i % 256) as u8, &[v, 2048])
            })
            .collect();

        let emitted = Arc::new(Mutex::new(0usize));
        let emitted_in_sink = emitted.clone();
        let sinks = Sinks {
            on_features: Some(Box::new(move |index, _features: &FeatureVector| {
                assert_eq!(index, 0);
                *emitted_in_sink.lock().unwrap() += 1;
            })),
            ..Sinks::default()
        };

        let session = Session::start(
            Box::new(ReplayLink::new(chunks)),
            two_channel_config([SignalKind::Emg, SignalKind::Unknown]),
            None,
            sinks,
        )
        .unwrap();
        let metrics = session.wait();

        // 700 samples, capacity 512, stride 64 -> windows at 512, 576, 640
        assert_eq!(*emitted.lock().unwrap(), 3);
        assert_eq!(metrics.features_emitted, 3);
    }

    #[test]
    fn stop_tears_down_an_idle_session() {
        struct SilentLink;
        impl ByteLink for SilentLink {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                std::thread::sleep(Duration::from_millis(5));
                Ok(0)
            }
            fn write_all(&mut self, _bytes: &[u8]) -> io::Result<()> {
                Ok(())
            }
        }

        let session = Session::start(
            Box::new(SilentLink),
            two_channel_config([SignalKind::Unknown, SignalKind::Unknown]),
            None,
            Sinks::default(),
        )
        .unwrap();
        assert!(session.is_running());
        let metrics = session.stop();
        assert_eq!(metrics.samples_routed, 0);
    }
}
