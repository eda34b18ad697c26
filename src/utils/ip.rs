//! IP 地址处理工具
//!
//! 客户端 IP 提取（按优先级）：
//! 1. X-Forwarded-For 的第一个地址（代理链最前端）
//! 2. X-Real-IP
//! 3. CF-Connecting-IP
//! 4. 连接的 peer 地址（去掉端口，`[v6]:port` 去掉方括号）
//!
//! 不校验 IP 语法：畸形值原样返回，由下游解析当作查询失败处理。

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use tracing::trace;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";

/// 检查 IP 是否为私有、回环或其他不可路由地址
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_v4(&mapped);
            }
            is_private_v6(v6)
        }
    }
}

fn is_private_v4(v4: &Ipv4Addr) -> bool {
    let octets = v4.octets();
    v4.is_private()
        || v4.is_loopback()
        || v4.is_link_local()
        || v4.is_unspecified()
        || v4.is_broadcast()
        // 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24 (TEST-NET)
        || v4.is_documentation()
        // 224.0.0.0/4
        || v4.is_multicast()
        // 100.64.0.0/10 (carrier-grade NAT)
        || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
        // 198.18.0.0/15 (benchmarking)
        || (octets[0] == 198 && (octets[1] & 0xfe) == 18)
        // 240.0.0.0/4 (reserved)
        || octets[0] >= 240
}

fn is_private_v6(v6: &Ipv6Addr) -> bool {
    let first = v6.segments()[0];
    // - fc00::/7 (ULA): fc00::/8 + fd00::/8
    // - fe80::/10 (link-local)
    // - 2001:db8::/32 (documentation)
    v6.is_loopback()
        || v6.is_unspecified()
        || v6.is_multicast()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
        || (first == 0x2001 && v6.segments()[1] == 0x0db8)
}

/// 去掉 peer 地址的端口
///
/// - `1.2.3.4:5678` → `1.2.3.4`
/// - `[::1]:5678` → `::1`
/// - 裸 IPv6（多个冒号、无方括号）原样返回
pub fn strip_port(raw: &str) -> &str {
    if let Some(rest) = raw.strip_prefix('[')
        && let Some(end) = rest.find(']')
    {
        return &rest[..end];
    }

    match raw.rfind(':') {
        Some(idx) if idx > 0 && raw[..idx].find(':').is_none() => &raw[..idx],
        _ => raw,
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// 从请求头提取转发的 IP，全部为空时返回 None
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(first) = header_value(headers, X_FORWARDED_FOR)
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        trace!("IP from X-Forwarded-For: {}", first);
        return Some(first.to_string());
    }

    if let Some(real_ip) = header_value(headers, X_REAL_IP) {
        trace!("IP from X-Real-IP: {}", real_ip);
        return Some(real_ip.to_string());
    }

    if let Some(cf_ip) = header_value(headers, CF_CONNECTING_IP) {
        trace!("IP from CF-Connecting-IP: {}", cf_ip);
        return Some(cf_ip.to_string());
    }

    None
}

/// 核心逻辑：请求头优先，最后回落到 peer 地址
pub fn extract_client_ip_from_parts(headers: &HeaderMap, peer_addr: Option<&str>) -> String {
    extract_forwarded_ip_from_headers(headers).unwrap_or_else(|| {
        let raw = peer_addr.unwrap_or_default();
        let ip = strip_port(raw).to_string();
        trace!("IP from peer address {} -> {}", raw, ip);
        ip
    })
}

/// 从 HttpRequest 提取客户端 IP
pub fn extract_client_ip(req: &HttpRequest) -> String {
    let peer = req.peer_addr().map(|addr| addr.to_string());
    extract_client_ip_from_parts(req.headers(), peer.as_deref())
}
