use biocore::features::FeatureVector;
use biocore::filters::RoutedSample;
use biocore::session::Sinks;
use biocore::telemetry::SessionMetrics;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::Filter;

fn bridge_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

/// Latest pipeline outputs, refreshed from the session sinks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SnapshotModel {
    pub sample: Option<RoutedSample>,
    pub features: BTreeMap<usize, FeatureVector>,
    pub labels: BTreeMap<usize, String>,
}

pub type SharedSnapshot = Arc<RwLock<SnapshotModel>>;

pub fn shared_snapshot() -> SharedSnapshot {
    Arc::new(RwLock::new(SnapshotModel::default()))
}

/// Builds session sinks that mirror every routed sample, feature vector,
/// and stable label into the shared snapshot. The writes are a lock plus
/// a clone; the pipeline thread is never blocked on a subscriber.
pub fn snapshot_sinks(state: &SharedSnapshot) -> Sinks {
    let sample_state = state.clone();
    let feature_state = state.clone();
    let label_state = state.clone();
    Sinks {
        on_sample: Some(Box::new(move |routed: &RoutedSample| {
            sample_state.write().unwrap().sample = Some(routed.clone());
        })),
        on_features: Some(Box::new(move |index, features: &FeatureVector| {
            feature_state
                .write()
                .unwrap()
                .features
                .insert(index, features.clone());
        })),
        on_label: Some(Box::new(move |index, label: &str| {
            info!("channel {index} -> {label}");
            label_state
                .write()
                .unwrap()
                .labels
                .insert(index, label.to_string());
        })),
    }
}

/// Hosts the snapshot/metrics HTTP endpoints for external consumers
/// (visualization, storage, transport all live outside this process).
pub struct HttpBridge {
    state: SharedSnapshot,
}

impl HttpBridge {
    pub fn spawn(state: SharedSnapshot, metrics: Arc<SessionMetrics>) -> Self {
        let snapshot_state = state.clone();
        thread::spawn(move || {
            let state_filter = warp::any().map(move || snapshot_state.clone());
            let metrics_filter = warp::any().map(move || metrics.clone());

            let snapshot_route = warp::path("snapshot")
                .and(warp::get())
                .and(state_filter)
                .map(|state: SharedSnapshot| warp::reply::json(&*state.read().unwrap()));

            let metrics_route = warp::path("metrics")
                .and(warp::get())
                .and(metrics_filter)
                .map(|metrics: Arc<SessionMetrics>| warp::reply::json(&metrics.snapshot()));

            let status_route = warp::path("status")
                .and(warp::get())
                .map(|| warp::reply::json(&serde_json::json!({"status": "ok"})));

            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build runtime");
            runtime.block_on(async move {
                warp::serve(snapshot_route.or(metrics_route).or(status_route))
                    .run(bridge_bind_address())
                    .await;
            });
        });

        Self { state }
    }

    pub fn publish_status(&self, message: &str) {
        info!("[bridge] {message}");
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> SnapshotModel {
        self.state.read().unwrap().clone()
    }
}
