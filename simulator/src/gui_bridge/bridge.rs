use crate::gui_bridge::model::VisualizationModel;
use anyhow::{anyhow, Result};
use log::{error, info};
use serde::Serialize;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, reply::Response, Filter, Reply};

pub fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

type SharedModel = Arc<RwLock<VisualizationModel>>;

/// Serializes one view of the current snapshot, or 503 if the lock is poisoned.
fn view<T, F>(state: &SharedModel, select: F) -> Response
where
    T: Serialize,
    F: FnOnce(&VisualizationModel) -> T,
{
    match state.read() {
        Ok(guard) => warp::reply::json(&select(&guard)).into_response(),
        Err(_) => warp::reply::with_status(
            warp::reply::json(&serde_json::json!({"status": "error"})),
            StatusCode::SERVICE_UNAVAILABLE,
        )
        .into_response(),
    }
}

/// Read-only HTTP view over the latest fusion results.
pub struct GuiBridge {
    state: SharedModel,
}

impl GuiBridge {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(VisualizationModel::default())),
        }
    }

    /// Starts the HTTP endpoint on a background thread.
    pub fn serve(&self, addr: SocketAddr) {
        let state_for_filter = self.state.clone();
        let state_filter = warp::any().map(move || state_for_filter.clone());

        let status_route = warp::path!("api" / "status")
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: SharedModel| view(&state, |model| model.status.clone()));

        let metrics_route = warp::path!("api" / "performance_metrics")
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: SharedModel| view(&state, |model| model.summary.clone()));

        let fused_route = warp::path!("api" / "fused")
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: SharedModel| view(&state, |model| model.records.clone()));

        let bounds_route = warp::path!("api" / "bounds")
            .and(warp::get())
            .and(state_filter)
            .map(|state: SharedModel| view(&state, |model| model.bounds.clone()));

        thread::spawn(move || {
            let routes = status_route
                .or(metrics_route)
                .or(fused_route)
                .or(bounds_route);
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("failed to build bridge runtime: {err}");
                    return;
                }
            };
            info!("HTTP bridge listening on http://{addr}");
            runtime.block_on(async move {
                warp::serve(routes).run(addr).await;
            });
        });
    }

    pub fn publish(&self, model: VisualizationModel) -> Result<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| anyhow!("visualization state lock poisoned"))?;
        info!(
            "[GUI] records: {}, active sensors: {:?}",
            model.records.len(),
            model.status.sensors_active
        );
        *guard = model;
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        if let Ok(mut guard) = self.state.write() {
            guard.status.status = message.to_string();
        }
        println!("[GUI] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> VisualizationModel {
        self.state
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Default for GuiBridge {
    fn default() -> Self {
        Self::new()
    }
}
