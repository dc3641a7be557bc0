use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analytics::{
    classify_forwarded_for, classify_user_agent, ClientIp, GeoResolver, GeoResult,
    UaClassification,
};
use crate::models::visit::{DIRECT, UNKNOWN};
use crate::models::NewVisit;
use crate::storage::Storage;

/// Destination for unresolvable short codes: the landing page with an
/// error indicator, a user-visible terminal outcome rather than a 404.
const NOT_FOUND_LOCATION: &str = "/?error=not_found";

pub struct RedirectState {
    pub storage: Arc<dyn Storage>,
    pub geo: Arc<GeoResolver>,
    /// Use the empty-string sentinel for the geo query when no public
    /// forwarded address exists (development runs behind no proxy).
    pub dev_geo_fallback: bool,
    pub redirect_status: StatusCode,
}

/// Resolve a short code, capture the visit, redirect to the destination.
///
/// Analytics are strictly best-effort: classification cannot fail, the geo
/// resolver always returns a value, and the two persistence writes are
/// joined so neither one's failure cancels the other or the redirect.
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Response {
    let link = match state.storage.get_by_code(&code).await {
        Ok(Some(link)) => link,
        Ok(None) => return redirect_to(state.redirect_status, NOT_FOUND_LOCATION),
        Err(err) => {
            tracing::error!(short_code = %code, error = %err, "link lookup failed");
            return redirect_to(state.redirect_status, NOT_FOUND_LOCATION);
        }
    };

    let user_agent = header_str(&headers, header::USER_AGENT.as_str())
        .unwrap_or(UNKNOWN)
        .to_string();
    let referrer = header_str(&headers, header::REFERER.as_str())
        .unwrap_or(DIRECT)
        .to_string();
    let forwarded_for = header_str(&headers, "x-forwarded-for");

    let client_ip = classify_forwarded_for(forwarded_for, state.dev_geo_fallback);
    let ua = classify_user_agent(&user_agent);

    let geo = match client_ip.geo_query_ip.as_deref() {
        Some(ip) => Some(state.geo.resolve(ip).await),
        None => None,
    };

    let visit = build_visit(link.id, &client_ip, ua, geo.as_ref(), user_agent, referrer);

    let (insert_result, increment_result) = tokio::join!(
        state.storage.insert_visit(&visit),
        state.storage.increment_visits(link.id),
    );
    if let Err(err) = insert_result {
        tracing::warn!(short_code = %code, error = %err, "failed to record visit");
    }
    if let Err(err) = increment_result {
        tracing::warn!(short_code = %code, error = %err, "failed to increment visit counter");
    }

    redirect_to(state.redirect_status, &link.original_url)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn redirect_to(status: StatusCode, location: &str) -> Response {
    match location.parse::<axum::http::HeaderValue>() {
        Ok(value) => (status, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Assemble the visit record, defaulting every geo field to `"unknown"`
/// when the result is absent, failed, or carries an empty field.
fn build_visit(
    link_id: i64,
    client_ip: &ClientIp,
    ua: UaClassification,
    geo: Option<&GeoResult>,
    user_agent: String,
    referrer: String,
) -> NewVisit {
    let (country, country_code, region_code, region_name, city) = match geo {
        Some(GeoResult::Success {
            country,
            country_code,
            region,
            region_name,
            city,
            ..
        }) => (
            or_unknown(country),
            or_unknown(country_code),
            or_unknown(region),
            or_unknown(region_name),
            or_unknown(city),
        ),
        _ => (
            UNKNOWN.to_string(),
            UNKNOWN.to_string(),
            UNKNOWN.to_string(),
            UNKNOWN.to_string(),
            UNKNOWN.to_string(),
        ),
    };

    NewVisit {
        link_id,
        ip: client_ip.storage_ip.clone(),
        country,
        country_code,
        region_code,
        region_name,
        city,
        referrer,
        device_type: ua.device_type.to_string(),
        browser_name: ua.browser_name.to_string(),
        os_name: ua.os_name.to_string(),
        user_agent,
    }
}

fn or_unknown(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

#[derive(Deserialize)]
pub struct LandingQuery {
    pub error: Option<String>,
}

/// Landing page, also the target of the not-found redirect.
pub async fn landing(Query(query): Query<LandingQuery>) -> impl IntoResponse {
    match query.error.as_deref() {
        Some("not_found") => "This short link does not exist or has been removed.",
        _ => "minlink is running.",
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}
