//! HTTP surface: health check plus routing endpoints whose JSON bodies
//! mirror the CLI subcommands.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use headway_core::prelude::*;

struct AppState {
    router: OnlineRouter,
}

/// Runs the HTTP server until the process is terminated.
pub fn serve(router: OnlineRouter, listen: &str) -> Result<(), Error> {
    let state = Arc::new(AppState { router });
    let app = Router::new()
        .route("/healthy", get(healthy))
        .route("/route", post(route))
        .route("/one-to-many", post(one_to_many))
        .route("/one-to-preset", post(one_to_preset))
        .with_state(state);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(listen).await?;
        log::info!("Listening on {listen}");
        axum::serve(listener, app).await?;
        Ok(())
    })
}

async fn healthy() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct CoordinateDto {
    lat: f64,
    lng: f64,
    #[serde(default)]
    id: Option<String>,
}

impl CoordinateDto {
    fn to_location(&self, fallback_id: &str) -> Location {
        Location::new(
            self.id.clone().unwrap_or_else(|| fallback_id.to_string()),
            self.lat,
            self.lng,
        )
    }
}

/// Body for `/route`: either both coordinate endpoints or both stop ids.
#[derive(Debug, Deserialize)]
struct RouteRequest {
    #[serde(default)]
    origin: Option<CoordinateDto>,
    #[serde(default)]
    destination: Option<CoordinateDto>,
    #[serde(default)]
    origin_stop_id: Option<String>,
    #[serde(default)]
    destination_stop_id: Option<String>,
    /// HH:MM:SS.
    departure_time: String,
    #[serde(default)]
    options: Option<QueryOptionsOverride>,
    /// Attach per-step shape polylines to transit steps.
    #[serde(default)]
    include_geometry: bool,
}

#[derive(Debug, Serialize)]
struct StepDto {
    #[serde(flatten)]
    step: Step,
    #[serde(skip_serializing_if = "Option::is_none")]
    geometry: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Serialize)]
struct RouteResponse {
    route: Option<RouteDto>,
}

#[derive(Debug, Serialize)]
struct RouteDto {
    departure_secs: f64,
    arrive_time_secs: f64,
    travel_time_secs: f64,
    walking_distance_km: f64,
    steps: Vec<StepDto>,
}

async fn route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RouteResponse>, AppError> {
    let RouteRequest {
        origin,
        destination,
        origin_stop_id,
        destination_stop_id,
        departure_time,
        options,
        include_geometry,
    } = request;
    let dep_secs = parse_clock_time(&departure_time).map_err(AppError::bad_request)?;
    let options = options.unwrap_or_default();

    let found = tokio::task::spawn_blocking(move || -> Result<Option<RouteDto>, Error> {
        match (&origin_stop_id, &destination_stop_id) {
            (Some(from), Some(to)) => Ok(state.router.stop_to_stop(from, dep_secs, to, &options)),
            _ => {
                let (Some(from), Some(to)) = (&origin, &destination) else {
                    return Err(Error::InvalidConfig(
                        "body needs either origin/destination coordinates or stop ids".to_string(),
                    ));
                };
                state.router.one_to_one(
                    &from.to_location("origin"),
                    dep_secs,
                    &to.to_location("destination"),
                    &options,
                )
            }
        }
        .map(|route| route.map(|r| to_route_dto(&state.router, r, include_geometry)))
    })
    .await
    .map_err(|e| AppError::internal(e.to_string()))?
    .map_err(AppError::from)?;

    Ok(Json(RouteResponse { route: found }))
}

fn to_route_dto(router: &OnlineRouter, route: Route, include_geometry: bool) -> RouteDto {
    let steps = route
        .steps
        .into_iter()
        .map(|step| {
            let geometry = if include_geometry && step.mode == StepMode::Transit {
                step.trip_id.as_deref().and_then(|trip_id| {
                    router
                        .indexed()
                        .shape_between(trip_id, &step.from, &step.to)
                        .map(|coords| coords.iter().map(|c| [c.x, c.y]).collect())
                })
            } else {
                None
            };
            StepDto { step, geometry }
        })
        .collect();
    RouteDto {
        departure_secs: route.departure_secs,
        arrive_time_secs: route.arrive_time_secs,
        travel_time_secs: route.travel_time_secs,
        walking_distance_km: route.walking_distance_km,
        steps,
    }
}

#[derive(Debug, Deserialize)]
struct OneToManyRequest {
    origin: CoordinateDto,
    departure_time: String,
    destinations: Vec<Location>,
    #[serde(default)]
    options: Option<QueryOptionsOverride>,
}

#[derive(Debug, Serialize)]
struct TravelTimesResponse {
    /// Seconds per destination id; `null` for unreachable.
    travel_times: std::collections::BTreeMap<String, Option<f64>>,
}

async fn one_to_many(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OneToManyRequest>,
) -> Result<Json<TravelTimesResponse>, AppError> {
    let OneToManyRequest {
        origin,
        departure_time,
        destinations,
        options,
    } = request;
    let dep_secs = parse_clock_time(&departure_time).map_err(AppError::bad_request)?;
    let options = options.unwrap_or_default();

    let times = tokio::task::spawn_blocking(move || {
        state
            .router
            .one_to_many(&origin.to_location("origin"), dep_secs, &destinations, &options)
    })
    .await
    .map_err(|e| AppError::internal(e.to_string()))?
    .map_err(AppError::from)?;

    Ok(Json(to_travel_times(times)))
}

#[derive(Debug, Deserialize)]
struct OneToPresetRequest {
    origin: CoordinateDto,
    departure_time: String,
    preset: String,
    #[serde(default)]
    options: Option<QueryOptionsOverride>,
}

async fn one_to_preset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OneToPresetRequest>,
) -> Result<Json<TravelTimesResponse>, AppError> {
    let OneToPresetRequest {
        origin,
        departure_time,
        preset,
        options,
    } = request;
    let dep_secs = parse_clock_time(&departure_time).map_err(AppError::bad_request)?;
    let options = options.unwrap_or_default();

    let times = tokio::task::spawn_blocking(move || {
        state
            .router
            .one_to_many_preset(&origin.to_location("origin"), dep_secs, &preset, &options)
    })
    .await
    .map_err(|e| AppError::internal(e.to_string()))?
    .map_err(AppError::from)?;

    Ok(Json(to_travel_times(times)))
}

fn to_travel_times(times: hashbrown::HashMap<String, f64>) -> TravelTimesResponse {
    TravelTimesResponse {
        travel_times: times
            .into_iter()
            .map(|(id, secs)| (id, secs.is_finite().then_some(secs)))
            .collect(),
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Application error type.
#[derive(Debug)]
enum AppError {
    BadRequest { message: String },
    Internal { message: String },
}

impl AppError {
    fn bad_request(e: impl std::fmt::Display) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }

    fn internal(message: String) -> Self {
        AppError::Internal { message }
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidTime(_)
            | Error::InvalidConfig(_)
            | Error::UnknownPreset(_)
            | Error::LocationIdCollision(_) => AppError::bad_request(e),
            other => AppError::internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        log::error!("[{status}] {message}");
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
