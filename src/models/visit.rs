use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Fallback value for every analytics field that could not be determined.
pub const UNKNOWN: &str = "unknown";

/// Referrer recorded when the request carried no `referer` header.
pub const DIRECT: &str = "direct";

/// A recorded visit. Written once per redirect, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Visit {
    pub id: i64,
    pub link_id: i64,
    /// First syntactically valid forwarded address, kept for audit only.
    pub ip: Option<String>,
    pub country: String,
    pub country_code: String,
    pub region_code: String,
    pub region_name: String,
    pub city: String,
    pub referrer: String,
    pub device_type: String,
    pub browser_name: String,
    pub os_name: String,
    pub user_agent: String,
    pub created_at: i64,
}

/// Insert payload for a visit. Every field already carries its fallback
/// value; storage backends persist it verbatim.
#[derive(Debug, Clone)]
pub struct NewVisit {
    pub link_id: i64,
    pub ip: Option<String>,
    pub country: String,
    pub country_code: String,
    pub region_code: String,
    pub region_name: String,
    pub city: String,
    pub referrer: String,
    pub device_type: String,
    pub browser_name: String,
    pub os_name: String,
    pub user_agent: String,
}
