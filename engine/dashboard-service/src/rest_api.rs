//! REST API endpoints for the dashboard
//!
//! Read-only routes over the loaded stores. A store that failed to load
//! answers with a 500 and an `{"error": ...}` body instead of an empty list.

use chrono::NaiveDate;
use market_data::dates::parse_date;
use market_data::detected_change_points;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::service::DashboardState;

const INDEX: &str = "Brent Oil Change Point Dashboard API\n\
\n\
GET /api/prices?start=YYYY-MM-DD&end=YYYY-MM-DD  daily Brent prices (2010+)\n\
GET /api/events                                  annotated market events\n\
GET /api/change-points                           detected structural breaks\n\
GET /health                                      service health\n";

/// Price range query parameters, both optional and inclusive
#[derive(Debug, Default, Deserialize)]
pub struct PriceRangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse { error: message.into() };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// `Ok(None)` for an absent or blank bound, `Err(raw)` if it does not parse
fn parse_bound(raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => parse_date(value).map(Some).ok_or_else(|| value.to_string()),
    }
}

/// Get prices, optionally restricted to `[start, end]`
pub async fn get_prices(
    params: PriceRangeParams,
    state: Arc<DashboardState>,
) -> Result<Response, Rejection> {
    let start = match parse_bound(params.start.as_deref()) {
        Ok(date) => date,
        Err(raw) => {
            return Ok(error_reply(StatusCode::BAD_REQUEST, format!("Invalid start date: {raw}")))
        }
    };
    let end = match parse_bound(params.end.as_deref()) {
        Ok(date) => date,
        Err(raw) => {
            return Ok(error_reply(StatusCode::BAD_REQUEST, format!("Invalid end date: {raw}")))
        }
    };

    match state.prices.query(start, end) {
        Ok(slice) => {
            tracing::debug!("Serving {} price rows for {:?}..{:?}", slice.len(), start, end);
            Ok(warp::reply::json(&slice).into_response())
        }
        Err(e) => {
            tracing::warn!("Price request rejected: {}", e);
            Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Data not loaded"))
        }
    }
}

/// Get all events in load order
pub async fn get_events(state: Arc<DashboardState>) -> Result<Response, Rejection> {
    match state.events.get_all() {
        Ok(table) => Ok(warp::reply::json(table).into_response()),
        Err(e) => {
            tracing::warn!("Event request rejected: {}", e);
            Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Events not loaded"))
        }
    }
}

/// Get detected change points
pub async fn get_change_points() -> Result<Response, Rejection> {
    Ok(warp::reply::json(&detected_change_points()).into_response())
}

/// Map unmatched routes and malformed queries to JSON error bodies
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(error_reply(status, message))
}

fn with_state(
    state: Arc<DashboardState>,
) -> impl Filter<Extract = (Arc<DashboardState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Build the full route tree
pub fn create_routes(
    state: Arc<DashboardState>,
) -> impl Filter<Extract = impl warp::Reply, Error = Rejection> + Clone {
    // Index
    let index = warp::path::end().and(warp::get()).map(|| INDEX);

    // Prices endpoint
    let prices = warp::path("api")
        .and(warp::path("prices"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<PriceRangeParams>())
        .and(with_state(state.clone()))
        .and_then(get_prices);

    // Events endpoint
    let events = warp::path("api")
        .and(warp::path("events"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_events);

    // Change points endpoint
    let change_points = warp::path("api")
        .and(warp::path("change-points"))
        .and(warp::path::end())
        .and(warp::get())
        .and_then(get_change_points);

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .map(|state: Arc<DashboardState>| {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "prices_loaded": state.prices.is_available(),
                "events_loaded": state.events.is_available(),
            }))
        });

    // Combine all routes
    index
        .or(prices)
        .or(events)
        .or(change_points)
        .or(health)
        .recover(handle_rejection)
        .with(
            warp::cors()
                .allow_any_origin()
                .allow_headers(vec!["content-type"])
                .allow_methods(vec!["GET", "OPTIONS"]),
        )
}
