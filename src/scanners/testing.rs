// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::scanners::traits::PageSnapshot;
use std::collections::HashMap;
use url::Url;

/// 构造测试用页面快照
pub fn page(url: &str, body: &str, headers: &[(&str, &str)]) -> PageSnapshot {
    let url = Url::parse(url).unwrap();
    let headers: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect();
    PageSnapshot {
        requested_url: url.clone(),
        final_url: url,
        status_code: 200,
        content_type: headers
            .get("content-type")
            .cloned()
            .unwrap_or_else(|| "text/html".to_string()),
        headers,
        set_cookies: Vec::new(),
        body: body.to_string(),
        response_time_ms: 120,
        truncated: false,
    }
}
