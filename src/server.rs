use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::{load_inventory, HostOverride, InfrastructureSnapshot, InventoryInput};
use crate::optimizer::sizing::sizing_options;
use crate::optimizer::upgrades::build_recommendations;
use crate::optimizer::utilization::rank_resources;
use crate::optimizer::{RecommendationReport, ResourceRanking};
use crate::scenario::{
    AdditionalWorkload, CellConfig, CurvePoint, PlanResult, Resource, ScenarioComparison,
    ScenarioEngine, ScenarioInput, ValidationError,
};

#[derive(Clone)]
struct ApiState {
    config: Arc<Config>,
    engine: ScenarioEngine,
    infrastructure: Arc<RwLock<Option<Arc<InfrastructureSnapshot>>>>,
    next_version: Arc<AtomicU64>,
}

impl ApiState {
    fn new(config: Config) -> Self {
        Self {
            engine: config.scenario_engine(),
            config: Arc::new(config),
            infrastructure: Arc::new(RwLock::new(None)),
            next_version: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Replaces the shared snapshot; requests already holding the old one keep it.
    fn store(
        &self,
        inventory: &InventoryInput,
    ) -> std::result::Result<Arc<InfrastructureSnapshot>, ApiError> {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        let snapshot = Arc::new(InfrastructureSnapshot::new(version, inventory));
        let mut slot = self
            .infrastructure
            .write()
            .map_err(|_| ApiError::internal("infrastructure state lock poisoned"))?;
        *slot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    fn current(&self) -> std::result::Result<Arc<InfrastructureSnapshot>, ApiError> {
        let slot = self
            .infrastructure
            .read()
            .map_err(|_| ApiError::internal("infrastructure state lock poisoned"))?;
        slot.clone().ok_or_else(|| {
            ApiError::bad_request("no infrastructure loaded: POST /v1/infrastructure first")
        })
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// Scenario fields left out fall back to the configured engine defaults.
#[derive(Debug, Clone, Deserialize)]
struct CompareRequest {
    proposed: CellConfig,
    selected_resources: Option<Vec<Resource>>,
    overhead_pct: Option<f64>,
    ha_admission_pct: Option<f64>,
    throughput_curve: Option<Vec<CurvePoint>>,
    enable_throughput: Option<bool>,
    target_vcpu_ratio: Option<f64>,
    chunk_size_mb: Option<u32>,
    additional_workload: Option<AdditionalWorkload>,
    hosts: Option<HostOverride>,
}

impl CompareRequest {
    fn into_input(self, config: &Config) -> ScenarioInput {
        let mut input = config.scenario_input(self.proposed);
        if let Some(resources) = self.selected_resources {
            input = input.with_resources(resources);
        }
        if let Some(pct) = self.overhead_pct {
            input = input.with_overhead_pct(pct);
        }
        if let Some(pct) = self.ha_admission_pct {
            input = input.with_ha_admission_pct(pct);
        }
        if let Some(curve) = self.throughput_curve {
            input = input.with_curve(curve);
        }
        if let Some(enabled) = self.enable_throughput {
            input = input.with_throughput_enabled(enabled);
        }
        if let Some(ratio) = self.target_vcpu_ratio {
            input = input.with_target_vcpu_ratio(ratio);
        }
        if let Some(chunk) = self.chunk_size_mb {
            input = input.with_chunk_size_mb(chunk);
        }
        if let Some(workload) = self.additional_workload {
            input = input.with_workload(workload);
        }
        match self.hosts {
            Some(hosts) if !hosts.is_empty() => input.with_hosts(hosts),
            _ => input,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PlanRequest {
    /// Plans every sizing preset when absent.
    cell: Option<CellConfig>,
    target_vcpu_ratio: Option<f64>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    infrastructure_version: Option<u64>,
}

#[derive(Debug, Serialize)]
struct PlanResponse {
    infrastructure_version: u64,
    plans: Vec<PlanResult>,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let state = ApiState::new(config);
    preload_inventory(&state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/v1/config", get(show_config))
        .route(
            "/v1/infrastructure",
            get(show_infrastructure).post(load_infrastructure),
        )
        .route("/v1/scenario/compare", post(compare))
        .route("/v1/plan", post(plan))
        .route("/v1/bottleneck", get(bottleneck))
        .route("/v1/recommendations", get(recommendations))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn preload_inventory(state: &ApiState) {
    let Some(path) = state.config.resolved_inventory_path() else {
        return;
    };
    match load_inventory(&path) {
        Ok(inventory) => match state.store(&inventory) {
            Ok(snapshot) => info!(
                path = %path.display(),
                version = snapshot.version,
                hosts = snapshot.aggregate.total_hosts,
                "loaded infrastructure"
            ),
            Err(err) => warn!("failed storing infrastructure: {}", err.message),
        },
        Err(err) => warn!("failed loading inventory {}: {err:#}", path.display()),
    }
}

async fn health(State(state): State<ApiState>) -> Json<ApiResponse<HealthResponse>> {
    let infrastructure_version = state.current().ok().map(|s| s.version);
    ok(HealthResponse {
        status: "ok",
        infrastructure_version,
    })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config.as_ref().clone())
}

async fn load_infrastructure(
    State(state): State<ApiState>,
    Json(inventory): Json<InventoryInput>,
) -> ApiResult<InfrastructureSnapshot> {
    if inventory.clusters.is_empty() {
        return Err(ApiError::bad_request("inventory contains no clusters"));
    }
    let snapshot = state.store(&inventory)?;
    info!(
        version = snapshot.version,
        clusters = snapshot.cluster_count,
        "infrastructure replaced"
    );
    Ok(ok(snapshot.as_ref().clone()))
}

async fn show_infrastructure(State(state): State<ApiState>) -> ApiResult<InfrastructureSnapshot> {
    let snapshot = state.current()?;
    Ok(ok(snapshot.as_ref().clone()))
}

async fn compare(
    State(state): State<ApiState>,
    Json(request): Json<CompareRequest>,
) -> ApiResult<ScenarioComparison> {
    let snapshot = state.current()?;
    let input = request.into_input(&state.config);
    let result = state.engine.compare(&snapshot.aggregate, &input)?;
    Ok(ok(result))
}

async fn plan(
    State(state): State<ApiState>,
    Json(request): Json<PlanRequest>,
) -> ApiResult<PlanResponse> {
    let snapshot = state.current()?;
    let ratio = request
        .target_vcpu_ratio
        .unwrap_or(state.config.engine.target_vcpu_ratio);
    let plans = match request.cell {
        Some(cell) => vec![state.engine.plan(&snapshot.aggregate, &cell, ratio)?],
        None => sizing_options(&state.engine, &snapshot.aggregate, ratio)?,
    };
    Ok(ok(PlanResponse {
        infrastructure_version: snapshot.version,
        plans,
    }))
}

async fn bottleneck(State(state): State<ApiState>) -> ApiResult<ResourceRanking> {
    let snapshot = state.current()?;
    Ok(ok(rank_resources(&snapshot.aggregate)))
}

async fn recommendations(State(state): State<ApiState>) -> ApiResult<RecommendationReport> {
    let snapshot = state.current()?;
    Ok(ok(build_recommendations(
        &snapshot.aggregate,
        &state.config.upgrade_targets(),
    )))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ClusterSpec;

    fn inventory() -> InventoryInput {
        InventoryInput {
            name: "lab".to_string(),
            clusters: vec![ClusterSpec {
                name: "cluster-01".to_string(),
                host_count: 4,
                memory_gb_per_host: Some(1_024),
                cpu_cores_per_host: Some(64),
                cell_count: 40,
                cell_memory_gb: 32,
                cell_cpu: 4,
                cell_disk_gb: 100,
                ..ClusterSpec::default()
            }],
            total_app_memory_gb: 600,
            total_app_instances: 400,
            ..InventoryInput::default()
        }
    }

    fn compare_request(count: u32) -> CompareRequest {
        CompareRequest {
            proposed: CellConfig::new(4, 32, 100, count),
            selected_resources: None,
            overhead_pct: None,
            ha_admission_pct: None,
            throughput_curve: None,
            enable_throughput: None,
            target_vcpu_ratio: None,
            chunk_size_mb: None,
            additional_workload: None,
            hosts: None,
        }
    }

    #[test]
    fn health_reports_loaded_version() {
        let state = ApiState::new(Config::default());
        let empty = tokio_test::block_on(health(State(state.clone())));
        assert_eq!(empty.0.data.infrastructure_version, None);

        state.store(&inventory()).expect("store");
        let loaded = tokio_test::block_on(health(State(state)));
        assert_eq!(loaded.0.data.status, "ok");
        assert_eq!(loaded.0.data.infrastructure_version, Some(1));
    }

    #[tokio::test]
    async fn compare_without_infrastructure_is_bad_request() {
        let state = ApiState::new(Config::default());
        let err = compare(State(state), Json(compare_request(40)))
            .await
            .expect_err("no infrastructure loaded");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn loads_then_compares() {
        let state = ApiState::new(Config::default());
        let loaded = load_infrastructure(State(state.clone()), Json(inventory()))
            .await
            .expect("load");
        assert_eq!(loaded.0.data.version, 1);
        assert_eq!(loaded.0.data.aggregate.total_hosts, 4);

        let result = compare(State(state.clone()), Json(compare_request(50)))
            .await
            .expect("compare");
        assert_eq!(result.0.data.current.cell_count, 40);
        assert_eq!(result.0.data.proposed.cell_count, 50);

        let reloaded = load_infrastructure(State(state), Json(inventory()))
            .await
            .expect("reload");
        assert_eq!(reloaded.0.data.version, 2);
    }

    #[tokio::test]
    async fn invalid_scenario_is_bad_request() {
        let state = ApiState::new(Config::default());
        state.store(&inventory()).expect("store");
        let mut request = compare_request(40);
        request.selected_resources = Some(Vec::new());
        let err = compare(State(state), Json(request))
            .await
            .expect_err("empty resource selection");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn plan_defaults_to_presets() {
        let state = ApiState::new(Config::default());
        state.store(&inventory()).expect("store");
        let response = plan(State(state), Json(PlanRequest::default()))
            .await
            .expect("plan");
        assert_eq!(response.0.data.infrastructure_version, 1);
        assert_eq!(response.0.data.plans.len(), 6);
    }

    #[tokio::test]
    async fn empty_inventory_is_rejected() {
        let state = ApiState::new(Config::default());
        let err = load_infrastructure(State(state), Json(InventoryInput::default()))
            .await
            .expect_err("no clusters");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
