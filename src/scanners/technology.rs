// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::report::{Technology, TechnologyReport};
use crate::scanners::html;
use crate::scanners::traits::{
    PageSnapshot, ScanContext, ScanOutput, Scanner, ScannerError, ScannerKind,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

#[derive(Debug, Clone, Copy)]
enum Source {
    /// 响应头（小写名称）
    Header(&'static str),
    /// 原始 HTML
    Html,
    /// `<script src>` 地址
    Script,
    /// `<meta name>` 内容
    Meta(&'static str),
    /// Cookie 名称
    Cookie,
}

impl Source {
    fn label(&self) -> String {
        match self {
            Source::Header(name) => format!("header:{}", name),
            Source::Html => "html".to_string(),
            Source::Script => "script".to_string(),
            Source::Meta(name) => format!("meta:{}", name),
            Source::Cookie => "cookie".to_string(),
        }
    }
}

type RawSignature = (&'static str, &'static str, &'static [(Source, &'static str)]);

/// 指纹表：(名称, 类别, [(来源, 正则)])，正则的第一个捕获组视为版本号
const RAW_SIGNATURES: &[RawSignature] = &[
    ("WordPress", "CMS", &[
        (Source::Meta("generator"), r"(?i)WordPress\s*([\d.]+)?"),
        (Source::Html, r"/wp-(?:content|includes)/"),
    ]),
    ("Drupal", "CMS", &[
        (Source::Meta("generator"), r"(?i)Drupal\s*([\d.]+)?"),
        (Source::Header("x-generator"), r"(?i)Drupal\s*([\d.]+)?"),
    ]),
    ("Joomla", "CMS", &[(Source::Meta("generator"), r"(?i)Joomla!?\s*([\d.]+)?")]),
    ("Shopify", "Ecommerce", &[
        (Source::Header("x-shopid"), r".+"),
        (Source::Html, r"cdn\.shopify\.com"),
    ]),
    ("Wix", "Website builder", &[(Source::Html, r"static\.wixstatic\.com")]),
    ("Squarespace", "Website builder", &[(Source::Html, r"static1\.squarespace\.com")]),
    ("Next.js", "JavaScript framework", &[
        (Source::Html, r"__NEXT_DATA__"),
        (Source::Header("x-powered-by"), r"Next\.js\s*([\d.]+)?"),
    ]),
    ("Nuxt.js", "JavaScript framework", &[(Source::Html, r"window\.__NUXT__")]),
    ("React", "JavaScript library", &[
        (Source::Html, r"data-reactroot"),
        (Source::Script, r"react(?:-dom)?(?:@([\d.]+))?(?:\.production)?(?:\.min)?\.js"),
    ]),
    ("Vue.js", "JavaScript framework", &[
        (Source::Html, r"data-v-[0-9a-f]{8}"),
        (Source::Script, r"vue(?:@([\d.]+))?(?:\.runtime)?(?:\.global)?(?:\.prod)?(?:\.min)?\.js"),
    ]),
    ("Angular", "JavaScript framework", &[(Source::Html, r#"ng-version="([\d.]+)""#)]),
    ("Svelte", "JavaScript framework", &[(Source::Html, r#"class="[^"]*svelte-[a-z0-9]+"#)]),
    ("jQuery", "JavaScript library", &[
        (Source::Script, r"jquery(?:[.-]([\d.]+))?(?:\.slim)?(?:\.min)?\.js"),
    ]),
    ("Bootstrap", "UI framework", &[
        (Source::Script, r"bootstrap(?:@([\d.]+))?(?:\.bundle)?(?:\.min)?\.js"),
        (Source::Html, r"bootstrap(?:@([\d.]+))?(?:\.min)?\.css"),
    ]),
    ("Tailwind CSS", "UI framework", &[(Source::Html, r"tailwind(?:css)?(?:@([\d.]+))?")]),
    ("Font Awesome", "Font script", &[(Source::Html, r"font-?awesome(?:/([\d.]+))?")]),
    ("Google Analytics", "Analytics", &[
        (Source::Script, r"google-analytics\.com/(?:ga|analytics)\.js"),
        (Source::Script, r"googletagmanager\.com/gtag/js"),
    ]),
    ("Google Tag Manager", "Tag manager", &[(Source::Html, r"googletagmanager\.com/gtm\.js")]),
    ("HubSpot", "Marketing automation", &[(Source::Script, r"js\.hs-scripts\.com")]),
    ("Stripe", "Payment processor", &[(Source::Script, r"js\.stripe\.com")]),
    ("Cloudflare", "CDN", &[
        (Source::Header("cf-ray"), r".+"),
        (Source::Header("server"), r"(?i)^cloudflare"),
    ]),
    ("Amazon CloudFront", "CDN", &[(Source::Header("x-amz-cf-id"), r".+")]),
    ("Vercel", "PaaS", &[
        (Source::Header("x-vercel-id"), r".+"),
        (Source::Header("server"), r"(?i)^Vercel"),
    ]),
    ("Netlify", "PaaS", &[(Source::Header("server"), r"(?i)^Netlify")]),
    ("Nginx", "Web server", &[(Source::Header("server"), r"(?i)nginx(?:/([\d.]+))?")]),
    ("Apache", "Web server", &[(Source::Header("server"), r"(?i)Apache(?:/([\d.]+))?")]),
    ("Microsoft IIS", "Web server", &[(Source::Header("server"), r"(?i)Microsoft-IIS(?:/([\d.]+))?")]),
    ("PHP", "Programming language", &[
        (Source::Header("x-powered-by"), r"(?i)PHP(?:/([\d.]+))?"),
        (Source::Cookie, r"^PHPSESSID$"),
    ]),
    ("Express", "Web framework", &[(Source::Header("x-powered-by"), r"^Express$")]),
    ("ASP.NET", "Web framework", &[
        (Source::Header("x-aspnet-version"), r"([\d.]+)"),
        (Source::Header("x-powered-by"), r"ASP\.NET"),
        (Source::Cookie, r"^ASP\.NET_SessionId$"),
    ]),
];

struct Signature {
    name: &'static str,
    category: &'static str,
    checks: Vec<(Source, Regex)>,
}

static SIGNATURES: Lazy<Vec<Signature>> = Lazy::new(|| {
    RAW_SIGNATURES
        .iter()
        .map(|&(name, category, checks)| Signature {
            name,
            category,
            checks: checks
                .iter()
                .filter_map(|(source, pattern)| match Regex::new(pattern) {
                    Ok(re) => Some((*source, re)),
                    Err(e) => {
                        tracing::warn!("Skipping invalid signature for {}: {}", name, e);
                        None
                    }
                })
                .collect(),
        })
        .collect()
});

/// 技术栈识别扫描器
pub struct TechnologyScanner;

#[async_trait]
impl Scanner for TechnologyScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Technology
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<ScanOutput, ScannerError> {
        Ok(ScanOutput::Technology(analyze(&ctx.page)))
    }
}

/// 按来源收集的待匹配文本
struct Inputs<'a> {
    page: &'a PageSnapshot,
    scripts: Vec<String>,
    metas: Vec<(&'static str, String)>,
    cookies: Vec<String>,
}

impl Inputs<'_> {
    fn values(&self, source: Source) -> Vec<&str> {
        match source {
            Source::Header(name) => self.page.header(name).into_iter().collect(),
            Source::Html => vec![self.page.body.as_str()],
            Source::Script => self.scripts.iter().map(String::as_str).collect(),
            Source::Meta(name) => self
                .metas
                .iter()
                .filter(|(n, _)| *n == name)
                .map(|(_, v)| v.as_str())
                .collect(),
            Source::Cookie => self.cookies.iter().map(String::as_str).collect(),
        }
    }
}

pub fn analyze(page: &PageSnapshot) -> TechnologyReport {
    let inputs = {
        let doc = Html::parse_document(&page.body);
        let scripts = html::select(&doc, "script[src]")
            .iter()
            .filter_map(|el| el.value().attr("src"))
            .map(str::to_string)
            .collect();
        let metas = ["generator"]
            .into_iter()
            .filter_map(|name| html::meta_content(&doc, name).map(|v| (name, v)))
            .collect();
        let cookies = page
            .set_cookies
            .iter()
            .filter_map(|c| c.split('=').next())
            .map(|name| name.trim().to_string())
            .collect();
        Inputs {
            page,
            scripts,
            metas,
            cookies,
        }
    };

    let mut technologies = Vec::new();
    for signature in SIGNATURES.iter() {
        let mut evidence = None;
        let mut version = None;

        for (source, re) in &signature.checks {
            for value in inputs.values(*source) {
                if let Some(caps) = re.captures(value) {
                    evidence.get_or_insert_with(|| source.label());
                    if version.is_none() {
                        version = caps
                            .get(1)
                            .map(|m| m.as_str().trim_end_matches('.').to_string())
                            .filter(|v| !v.is_empty());
                    }
                }
            }
        }

        if let Some(evidence) = evidence {
            technologies.push(Technology {
                name: signature.name.to_string(),
                category: signature.category.to_string(),
                version,
                evidence,
            });
        }
    }

    TechnologyReport { technologies }
}
