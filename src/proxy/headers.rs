use std::net::IpAddr;

use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

// 프록시 구간에서만 의미가 있는 헤더 (RFC 7230 6.1)
const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn tokens(headers: &HeaderMap, name: HeaderName) -> impl Iterator<Item = &str> {
    headers
        .get_all(name)
        .into_iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// `Connection: upgrade`와 함께 요청된 프로토콜 이름
pub fn upgrade_type(headers: &HeaderMap) -> Option<String> {
    let wants_upgrade = tokens(headers, header::CONNECTION)
        .any(|token| token.eq_ignore_ascii_case("upgrade"));
    if !wants_upgrade {
        return None;
    }

    headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub fn remove_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = tokens(headers, header::CONNECTION)
        .filter_map(|token| HeaderName::from_bytes(token.as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// 백엔드로 보내기 전에 요청 헤더를 정리합니다.
pub fn prepare_request(headers: &mut HeaderMap, client_ip: IpAddr, upgrade: Option<&str>) {
    let te_trailers = tokens(headers, header::TE).any(|token| token.eq_ignore_ascii_case("trailers"));

    remove_hop_by_hop(headers);

    if te_trailers {
        headers.insert(header::TE, HeaderValue::from_static("trailers"));
    }

    if let Some(value) = upgrade.and_then(|protocol| HeaderValue::from_str(protocol).ok()) {
        headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
        headers.insert(header::UPGRADE, value);
    }

    append_forwarded_for(headers, client_ip);
}

fn append_forwarded_for(headers: &mut HeaderMap, client_ip: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .into_iter()
        .filter_map(|value| value.to_str().ok())
        .collect();

    let forwarded = if prior.is_empty() {
        client_ip.to_string()
    } else {
        format!("{}, {}", prior.join(", "), client_ip)
    };

    if let Ok(value) = HeaderValue::from_str(&forwarded) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_hop_by_hop_headers_are_removed() {
        let mut map = headers(&[
            ("connection", "keep-alive, x-session-hint"),
            ("keep-alive", "timeout=5"),
            ("x-session-hint", "abc"),
            ("transfer-encoding", "chunked"),
            ("proxy-authorization", "Basic Zm9vOmJhcg=="),
            ("content-type", "application/json"),
            ("x-request-id", "42"),
        ]);

        remove_hop_by_hop(&mut map);

        assert_eq!(map.len(), 2);
        assert_eq!(map["content-type"], "application/json");
        assert_eq!(map["x-request-id"], "42");
    }

    #[test]
    fn test_prepare_request_keeps_te_trailers_and_appends_client_ip() {
        let mut map = headers(&[
            ("te", "trailers, deflate"),
            ("x-forwarded-for", "10.0.0.1"),
            ("host", "proxy.local"),
        ]);

        prepare_request(&mut map, "192.168.1.7".parse().unwrap(), None);

        assert_eq!(map["te"], "trailers");
        assert_eq!(map["x-forwarded-for"], "10.0.0.1, 192.168.1.7");
        assert_eq!(map["host"], "proxy.local");
    }

    #[test]
    fn test_upgrade_headers_survive_preparation() {
        let mut map = headers(&[("connection", "Upgrade"), ("upgrade", "tcp")]);
        let upgrade = upgrade_type(&map);
        assert_eq!(upgrade.as_deref(), Some("tcp"));

        prepare_request(&mut map, "127.0.0.1".parse().unwrap(), upgrade.as_deref());

        assert_eq!(map["connection"], "upgrade");
        assert_eq!(map["upgrade"], "tcp");
        assert_eq!(map["x-forwarded-for"], "127.0.0.1");
    }

    #[test]
    fn test_upgrade_requires_connection_token() {
        let map = headers(&[("upgrade", "websocket")]);
        assert_eq!(upgrade_type(&map), None);
    }
}
