//! Relay proxies expressed as URL templates.
//!
//! A template contains `{url}` (replaced by the percent-encoded target) or
//! `{raw}` (replaced verbatim), e.g. `https://relay.example/?url={url}`.

use serde::{Deserialize, Serialize};

/// One relay proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRoute {
    pub name: String,
    pub template: String,
}

impl ProxyRoute {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Rewrite `target` so the request goes through this relay.
    ///
    /// A template with no placeholder is treated as a prefix.
    pub fn apply(&self, target: &str) -> String {
        if self.template.contains("{url}") {
            self.template.replace("{url}", &urlencoding::encode(target))
        } else if self.template.contains("{raw}") {
            self.template.replace("{raw}", target)
        } else {
            format!("{}{target}", self.template)
        }
    }
}

/// Where a single attempt is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Direct,
    Proxy(&'a ProxyRoute),
}

impl Route<'_> {
    pub fn target(&self, url: &str) -> String {
        match self {
            Route::Direct => url.to_string(),
            Route::Proxy(proxy) => proxy.apply(url),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Route::Direct => "direct",
            Route::Proxy(proxy) => &proxy.name,
        }
    }
}

/// Ordered first-pass routes: the selected proxy (or direct when none is
/// selected) first, then every remaining proxy in configured order.
pub fn attempt_plan<'a>(proxies: &'a [ProxyRoute], selected: Option<&str>) -> Vec<Route<'a>> {
    let chosen = selected.and_then(|name| proxies.iter().position(|p| p.name == name));

    let mut plan = Vec::with_capacity(proxies.len() + 1);
    match chosen {
        Some(index) => plan.push(Route::Proxy(&proxies[index])),
        None => plan.push(Route::Direct),
    }
    plan.extend(
        proxies
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != chosen)
            .map(|(_, p)| Route::Proxy(p)),
    );
    plan
}
