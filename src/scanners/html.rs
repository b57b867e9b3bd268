// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use scraper::{ElementRef, Html, Node, Selector};

/// 按 CSS 选择器查找元素，选择器无效时返回空
pub fn select<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => doc.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

pub fn count(doc: &Html, css: &str) -> usize {
    select(doc, css).len()
}

/// 第一个匹配元素的文本（去除首尾空白，空文本视为不存在）
pub fn first_text(doc: &Html, css: &str) -> Option<String> {
    select(doc, css)
        .into_iter()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

/// 第一个匹配元素的属性值
pub fn first_attr(doc: &Html, css: &str, attr: &str) -> Option<String> {
    select(doc, css)
        .into_iter()
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// `<meta name=..>` 或 `<meta property=..>` 的 content，名称不区分大小写
pub fn meta_content(doc: &Html, name: &str) -> Option<String> {
    select(doc, "meta[content]")
        .into_iter()
        .find(|el| {
            let value = el.value();
            value
                .attr("name")
                .or_else(|| value.attr("property"))
                .or_else(|| value.attr("http-equiv"))
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|el| el.value().attr("content"))
        .map(|v| v.trim().to_string())
}

/// 页面可见文本（跳过 script/style/noscript/template）
pub fn visible_text(doc: &Html) -> String {
    let mut out = String::new();
    for node in doc.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor.value().as_element().is_some_and(|el| {
                matches!(el.name(), "script" | "style" | "noscript" | "template")
            })
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
