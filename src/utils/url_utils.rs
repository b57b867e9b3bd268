// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::Url;

/// 校验分析目标：必须是带主机名的绝对 http/https URL
pub fn parse_http_url(input: &str) -> Result<Url, String> {
    let url = Url::parse(input.trim()).map_err(|e| format!("Invalid URL: {}", e))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("Unsupported URL scheme '{}'", other)),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err("URL must include a host".to_string()),
    }
}
