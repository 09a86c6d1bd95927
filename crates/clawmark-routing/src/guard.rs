// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Private-address checks for URLs supplied by third-party sites.
//!
//! Declarations are fetched from, and may point webhooks at, arbitrary
//! hosts. Literal private or loopback addresses are refused unless the
//! deployment explicitly allows them. Hostnames are not resolved here.

use std::net::{IpAddr, Ipv4Addr};

use url::{Host, Url};

/// Whether an IP is loopback, private, link-local, or otherwise internal.
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || *v4 == Ipv4Addr::new(169, 254, 169, 254)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

/// Whether the URL's host is `localhost` or a private IP literal.
pub fn targets_private_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        None => true,
    }
}

/// Parse an http(s) URL, refusing private hosts unless `allow_private`.
pub fn parse_public_http_url(raw: &str, allow_private: bool) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if !allow_private && targets_private_host(&url) {
        return None;
    }
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_literals_are_refused() {
        assert!(parse_public_http_url("http://10.0.0.1/hook", false).is_none());
        assert!(parse_public_http_url("http://127.0.0.1:8080/", false).is_none());
        assert!(parse_public_http_url("http://169.254.169.254/latest", false).is_none());
        assert!(parse_public_http_url("http://[::1]/", false).is_none());
        assert!(parse_public_http_url("http://localhost:3000/", false).is_none());
    }

    #[test]
    fn private_literals_allowed_when_configured() {
        assert!(parse_public_http_url("http://127.0.0.1:8080/", true).is_some());
    }

    #[test]
    fn public_hosts_pass() {
        assert!(parse_public_http_url("https://hooks.example.com/x", false).is_some());
        assert!(parse_public_http_url("https://8.8.8.8/", false).is_some());
    }

    #[test]
    fn non_http_schemes_are_refused() {
        assert!(parse_public_http_url("ftp://example.com/", true).is_none());
        assert!(parse_public_http_url("file:///etc/passwd", true).is_none());
        assert!(parse_public_http_url("garbage", true).is_none());
    }
}
