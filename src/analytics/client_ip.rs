//! Client IP classification from the forwarded-address header
//!
//! The `x-forwarded-for` chain is client-supplied and untrusted. This module
//! extracts two addresses from it:
//! - a storage address: the first syntactically valid candidate, kept only
//!   for audit storage and never used for access control
//! - a geolocation query address: the first valid candidate that is not in a
//!   private or reserved range, so attacker-supplied internal addresses can
//!   never trigger a lookup

use std::net::IpAddr;

/// Result of classifying a forwarded-address header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientIp {
    /// First syntactically valid candidate (private ranges allowed).
    pub storage_ip: Option<String>,
    /// First valid public candidate. `Some("")` is the dev-mode sentinel
    /// meaning "let the lookup service infer from its own connecting
    /// address"; `None` means skip geolocation entirely.
    pub geo_query_ip: Option<String>,
}

/// Classify a raw `x-forwarded-for` header value.
///
/// Never panics; malformed or empty input yields `None`s. When no public
/// candidate exists and `dev_fallback` is set, the geo-query address is the
/// empty-string sentinel.
pub fn classify_forwarded_for(header: Option<&str>, dev_fallback: bool) -> ClientIp {
    let candidates: Vec<&str> = header
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(strip_ipv4_port)
        .collect();

    let storage_ip = candidates
        .iter()
        .find(|cand| cand.parse::<IpAddr>().is_ok())
        .map(|cand| cand.to_string());

    let first_public = candidates
        .iter()
        .find_map(|cand| match cand.parse::<IpAddr>() {
            Ok(ip) if !is_private_or_reserved(ip) => Some(cand.to_string()),
            _ => None,
        });

    let geo_query_ip = match first_public {
        Some(ip) => Some(ip),
        None if dev_fallback => Some(String::new()),
        None => None,
    };

    ClientIp {
        storage_ip,
        geo_query_ip,
    }
}

/// Strip a trailing `:port` from an `a.b.c.d:port` shaped token. A bare IPv6
/// address contains colons but no dot after them, so it is left untouched.
fn strip_ipv4_port(token: &str) -> &str {
    match (token.rfind('.'), token.rfind(':')) {
        (Some(dot), Some(colon)) if colon > dot => &token[..colon],
        _ => token,
    }
}

/// Private and reserved ranges excluded from geolocation queries:
/// 10/8, 127/8, 0/8, 169.254/16, 192.168/16, 172.16/12 for IPv4;
/// loopback, `fc00::/7`, `fe80::/10` for IPv6. IPv4-mapped IPv6 addresses
/// are unwrapped and re-checked as IPv4.
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, _, _] = v4.octets();
            a == 10
                || a == 127
                || a == 0
                || (a == 169 && b == 254)
                || (a == 192 && b == 168)
                || (a == 172 && (16..=31).contains(&b))
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_or_reserved(IpAddr::V4(v4));
            }
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_malformed_headers() {
        for header in [None, Some(""), Some("  ,  , "), Some("not-an-ip, 999.1.2.3")] {
            let result = classify_forwarded_for(header, false);
            assert_eq!(result.storage_ip, None, "header: {:?}", header);
            assert_eq!(result.geo_query_ip, None, "header: {:?}", header);
        }
    }

    #[test]
    fn test_first_valid_and_first_public_differ() {
        let result = classify_forwarded_for(Some("10.0.0.5, 8.8.8.8"), false);
        assert_eq!(result.storage_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(result.geo_query_ip.as_deref(), Some("8.8.8.8"));
    }

    #[test]
    fn test_public_first_candidate_used_for_both() {
        let result = classify_forwarded_for(Some("8.8.8.8, 10.0.0.5"), false);
        assert_eq!(result.storage_ip.as_deref(), Some("8.8.8.8"));
        assert_eq!(result.geo_query_ip.as_deref(), Some("8.8.8.8"));
    }

    #[test]
    fn test_private_ranges_excluded_from_geo() {
        for ip in [
            "10.0.0.1",
            "192.168.1.1",
            "172.16.5.5",
            "127.0.0.1",
            "0.1.2.3",
            "169.254.10.10",
            "::1",
            "fe80::1",
            "fc00::1",
            "fd12:3456::1",
        ] {
            let result = classify_forwarded_for(Some(ip), false);
            assert_eq!(result.storage_ip.as_deref(), Some(ip), "ip: {}", ip);
            assert_eq!(result.geo_query_ip, None, "ip: {}", ip);
        }
    }

    #[test]
    fn test_ipv4_mapped_ipv6_unwrapped() {
        assert!(is_private_or_reserved("::ffff:192.168.1.1".parse().unwrap()));
        assert!(!is_private_or_reserved("::ffff:8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_ipv4_port_stripped() {
        let result = classify_forwarded_for(Some("203.0.113.7:12345"), false);
        assert_eq!(result.storage_ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(result.geo_query_ip.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_bare_ipv6_not_truncated() {
        let result = classify_forwarded_for(Some("2001:db8::1"), false);
        assert_eq!(result.storage_ip.as_deref(), Some("2001:db8::1"));
        assert_eq!(result.geo_query_ip.as_deref(), Some("2001:db8::1"));
    }

    #[test]
    fn test_dev_fallback_sentinel() {
        let result = classify_forwarded_for(Some("192.168.1.1"), true);
        assert_eq!(result.storage_ip.as_deref(), Some("192.168.1.1"));
        assert_eq!(result.geo_query_ip.as_deref(), Some(""));

        let result = classify_forwarded_for(None, true);
        assert_eq!(result.storage_ip, None);
        assert_eq!(result.geo_query_ip.as_deref(), Some(""));
    }

    #[test]
    fn test_dev_fallback_not_used_when_public_exists() {
        let result = classify_forwarded_for(Some("8.8.8.8"), true);
        assert_eq!(result.geo_query_ip.as_deref(), Some("8.8.8.8"));
    }
}
