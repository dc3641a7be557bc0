//! Visit analytics for the redirect hot path
//!
//! Classification of the visitor (forwarded IP chain, user agent) and
//! best-effort geolocation through an external lookup service. Everything
//! here is infallible from the handler's point of view: bad input and
//! unavailable collaborators degrade to `"unknown"` fields, never errors.

pub mod client_ip;
pub mod geo;
pub mod user_agent;

pub use client_ip::{classify_forwarded_for, ClientIp};
pub use geo::{GeoCacheConfig, GeoProvider, GeoResolver, GeoResult, IpApiProvider};
pub use user_agent::{classify_user_agent, UaClassification};
