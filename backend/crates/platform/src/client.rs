//! Client identification utilities
//!
//! Resolves the network origin of a request for attempt throttling and
//! audit logging. IPs are coarsened into buckets so a single attacker
//! rotating addresses inside one allocation still shares a counter.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Where a request came from, as far as throttling is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOrigin {
    /// Client IP address (from X-Forwarded-For or direct connection)
    pub ip: Option<IpAddr>,
    /// Coarsened network bucket used as the throttle key
    pub bucket: String,
    /// Advisory two-letter country code from the edge proxy, if present
    pub country_code: Option<String>,
}

impl ClientOrigin {
    /// Resolve the origin from request headers and the direct connection IP
    pub fn resolve(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Self {
        let ip = extract_client_ip(headers, direct_ip);
        Self {
            ip,
            bucket: origin_bucket(ip),
            country_code: extract_country_code(headers),
        }
    }

    /// IP as string (for logging and database storage)
    pub fn ip_string(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }
}

/// Extract client IP address from headers
///
/// Checks X-Forwarded-For header first (for reverse proxy setups),
/// then falls back to direct connection IP.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    // X-Forwarded-For: first IP in the list is the original client
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_ip) = xff.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    direct_ip
}

/// Coarsen an IP into a throttle bucket
///
/// IPv4 addresses are grouped by /24, IPv6 by /48. Requests with no
/// resolvable IP all share the "unknown" bucket.
pub fn origin_bucket(ip: Option<IpAddr>) -> String {
    match ip {
        Some(IpAddr::V4(v4)) => {
            let o = v4.octets();
            format!("{}.{}.{}.0/24", o[0], o[1], o[2])
        }
        Some(IpAddr::V6(v6)) => {
            let s = v6.segments();
            format!("{:x}:{:x}:{:x}::/48", s[0], s[1], s[2])
        }
        None => "unknown".to_string(),
    }
}

/// Advisory country code from the edge proxy (e.g. cf-ipcountry)
///
/// Never used for access decisions, only recorded for audit.
pub fn extract_country_code(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("cf-ipcountry").and_then(|v| v.to_str().ok())?;
    let code = value.trim().to_ascii_uppercase();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_client_ip_xff() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.168.1.1, 10.0.0.1"),
        );

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_extract_client_ip_direct() {
        let headers = HeaderMap::new();
        let direct: IpAddr = "127.0.0.1".parse().unwrap();

        let ip = extract_client_ip(&headers, Some(direct));
        assert_eq!(ip, Some(direct));
    }

    #[test]
    fn test_origin_bucket_v4() {
        let ip: IpAddr = "203.0.113.77".parse().unwrap();
        assert_eq!(origin_bucket(Some(ip)), "203.0.113.0/24");

        // Neighbors in the same /24 share a bucket
        let neighbor: IpAddr = "203.0.113.200".parse().unwrap();
        assert_eq!(origin_bucket(Some(ip)), origin_bucket(Some(neighbor)));
    }

    #[test]
    fn test_origin_bucket_v6() {
        let ip: IpAddr = "2001:db8:abcd:12::1".parse().unwrap();
        assert_eq!(origin_bucket(Some(ip)), "2001:db8:abcd::/48");
    }

    #[test]
    fn test_origin_bucket_unknown() {
        assert_eq!(origin_bucket(None), "unknown");
    }

    #[test]
    fn test_country_code() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-ipcountry", HeaderValue::from_static("jp"));
        assert_eq!(extract_country_code(&headers), Some("JP".to_string()));

        let mut bad = HeaderMap::new();
        bad.insert("cf-ipcountry", HeaderValue::from_static("XXX"));
        assert_eq!(extract_country_code(&bad), None);

        assert_eq!(extract_country_code(&HeaderMap::new()), None);
    }

    #[test]
    fn test_resolve() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4"));
        headers.insert("cf-ipcountry", HeaderValue::from_static("DE"));

        let origin = ClientOrigin::resolve(&headers, None);
        assert_eq!(origin.ip_string(), Some("198.51.100.4".to_string()));
        assert_eq!(origin.bucket, "198.51.100.0/24");
        assert_eq!(origin.country_code, Some("DE".to_string()));
    }
}
