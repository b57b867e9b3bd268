// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ScannerSettings;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::Policy;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::lookup_host;
use url::{Host, Url};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 目标地址校验错误
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("Missing host")]
    MissingHost,
    #[error("DNS lookup failed: {0}")]
    Lookup(String),
    #[error("SSRF protection: {0} is not allowed")]
    Forbidden(String),
}

/// 验证目标是否安全 (防止 SSRF)
///
/// 解析主机名，任一地址为私有、环回、链路本地或组播地址即拒绝
pub async fn validate_target(url: &Url) -> Result<(), TargetError> {
    let host = url.host().ok_or(TargetError::MissingHost)?;
    if is_forbidden_host(&host) {
        return Err(TargetError::Forbidden(host.to_string()));
    }

    match host {
        Host::Domain(domain) => resolve_public(domain).await.map(|_| ()),
        Host::Ipv4(_) | Host::Ipv6(_) => Ok(()),
    }
}

/// 不经 DNS 就能判定的私有目标：localhost 名称和私有 IP 字面量
pub fn is_forbidden_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => is_local_name(domain),
        Host::Ipv4(ip) => is_private_ip(IpAddr::V4(*ip)),
        Host::Ipv6(ip) => is_private_ip(IpAddr::V6(*ip)),
    }
}

fn is_local_name(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host == "localhost" || host.ends_with(".localhost")
}

async fn resolve_public(host: &str) -> Result<Vec<SocketAddr>, TargetError> {
    if is_local_name(host) {
        return Err(TargetError::Forbidden(host.to_string()));
    }

    let addrs: Vec<SocketAddr> = lookup_host((host, 0))
        .await
        .map_err(|e| TargetError::Lookup(e.to_string()))?
        .collect();

    if let Some(addr) = addrs.iter().find(|addr| is_private_ip(addr.ip())) {
        return Err(TargetError::Forbidden(addr.ip().to_string()));
    }
    Ok(addrs)
}

/// 只返回公网地址的 DNS 解析器
///
/// 客户端每次建立连接都经过它，重定向目标和重复请求都会重新校验，
/// 解析结果在两次请求之间变为内网地址也会被拒绝。
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            match resolve_public(&host).await {
                Ok(addrs) => Ok(Box::new(addrs.into_iter()) as Addrs),
                Err(e) => Err(Box::new(e) as BoxError),
            }
        })
    }
}

/// 逐跳校验的重定向策略
///
/// IP 字面量不经过 DNS 解析器，因此每一跳在发出前都在这里检查。
pub fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            return attempt.error(format!("too many redirects (max {})", max_redirects));
        }
        let blocked = match attempt.url().host() {
            None => Some(TargetError::MissingHost),
            Some(host) if is_forbidden_host(&host) => {
                Some(TargetError::Forbidden(host.to_string()))
            }
            Some(_) => None,
        };
        match blocked {
            Some(e) => attempt.error(e),
            None => attempt.follow(),
        }
    })
}

/// 扫描用 HTTP 客户端的公共配置
///
/// 不允许私有目标时挂上逐跳重定向检查和公网 DNS 解析器。
pub fn client_builder(settings: &ScannerSettings) -> reqwest::ClientBuilder {
    let builder = reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(settings.fetch_timeout());

    if settings.allow_private_targets {
        builder.redirect(Policy::limited(settings.max_redirects))
    } else {
        builder
            .redirect(redirect_policy(settings.max_redirects))
            .dns_resolver(Arc::new(PublicResolver))
    }
}

pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_private()
                || ipv4.is_loopback()
                || ipv4.is_link_local()
                || ipv4.is_multicast()
                || ipv4.is_unspecified()
                || ipv4.is_broadcast()
                // 100.64.0.0/10 (carrier-grade NAT)
                || (octets[0] == 100 && (64..=127).contains(&octets[1]))
        }
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ip(IpAddr::V4(mapped));
            }
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6.is_multicast()
                // fc00::/7
                || (first & 0xfe00) == 0xfc00
                // fe80::/10
                || (first & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_validate_target_blocks_loopback() {
        let localhost = Url::parse("http://localhost:8080").unwrap();
        assert!(validate_target(&localhost).await.is_err());

        let loopback = Url::parse("http://127.0.0.1").unwrap();
        assert!(matches!(
            validate_target(&loopback).await,
            Err(TargetError::Forbidden(_))
        ));

        let mapped = Url::parse("http://[::ffff:10.0.0.1]/").unwrap();
        assert!(validate_target(&mapped).await.is_err());
    }

    #[test]
    fn test_is_private_ip() {
        assert!(is_private_ip("127.0.0.1".parse().unwrap()));
        assert!(is_private_ip("10.0.0.1".parse().unwrap()));
        assert!(is_private_ip("192.168.1.1".parse().unwrap()));
        assert!(is_private_ip("172.16.0.1".parse().unwrap()));
        assert!(is_private_ip("100.64.0.1".parse().unwrap()));
        assert!(is_private_ip("::ffff:10.0.0.1".parse().unwrap()));
        assert!(is_private_ip("fd00::1".parse().unwrap()));
        assert!(!is_private_ip("8.8.8.8".parse().unwrap()));
        assert!(!is_private_ip("2606:4700::1111".parse().unwrap()));
    }

    #[test]
    fn test_forbidden_hosts_without_dns() {
        let host = |url: &str| Url::parse(url).unwrap().host().map(|h| is_forbidden_host(&h));
        assert_eq!(host("http://LOCALHOST./"), Some(true));
        assert_eq!(host("http://api.localhost/"), Some(true));
        assert_eq!(host("http://169.254.169.254/latest"), Some(true));
        assert_eq!(host("http://[::1]:8080/"), Some(true));
        assert_eq!(host("https://example.com/"), Some(false));
        assert_eq!(host("http://93.184.216.34/"), Some(false));
    }

    #[tokio::test]
    async fn test_resolver_rejects_private_answers() {
        assert!(matches!(
            resolve_public("localhost").await,
            Err(TargetError::Forbidden(_))
        ));
        assert!(matches!(
            resolve_public("127.0.0.1").await,
            Err(TargetError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_guarded_client_refuses_redirect_into_private_network() {
        let internal = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin"))
            .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
            .expect(0)
            .mount(&internal)
            .await;

        let public = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/admin", internal.uri()).as_str()),
            )
            .mount(&public)
            .await;
        let by_name = internal.uri().replace("127.0.0.1", "localhost");
        Mock::given(method("GET"))
            .and(path("/named"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/admin", by_name).as_str()),
            )
            .mount(&public)
            .await;

        // The first hop is sent as-is; every redirect hop goes through the policy.
        let client = client_builder(&ScannerSettings::default()).build().unwrap();
        for start in ["/start", "/named"] {
            let err = client
                .get(format!("{}{}", public.uri(), start))
                .send()
                .await
                .unwrap_err();
            assert!(err.is_redirect(), "{}: {}", start, err);
        }
    }
}
