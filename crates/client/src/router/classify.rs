//! Request classification.
//!
//! Pure and total: every URL maps to exactly one [`RequestClass`], and the
//! same URL always maps to the same class.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use super::{PartitionKind, RouterSettings};

/// The caching strategy family a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestClass {
    Api,
    StaticAsset,
    CdnAsset,
    AppShell,
    Generic,
}

impl RequestClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestClass::Api => "api",
            RequestClass::StaticAsset => "static-asset",
            RequestClass::CdnAsset => "cdn-asset",
            RequestClass::AppShell => "app-shell",
            RequestClass::Generic => "generic",
        }
    }

    /// The one partition that is authoritative for this class.
    pub fn partition(self) -> PartitionKind {
        match self {
            RequestClass::Api => PartitionKind::Api,
            RequestClass::StaticAsset | RequestClass::CdnAsset | RequestClass::AppShell => PartitionKind::Static,
            RequestClass::Generic => PartitionKind::Dynamic,
        }
    }
}

impl fmt::Display for RequestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const STATIC_EXTENSIONS: &[&str] = &[".js", ".css", ".json", ".webmanifest"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum CdnRule {
    /// `https://host/optional/path`: same origin, path on a segment boundary.
    Prefix { origin: url::Origin, path: String },
    /// Bare host name.
    Host(String),
}

impl CdnRule {
    fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        if entry.contains("://") {
            let parsed = Url::parse(entry).ok()?;
            let path = parsed.path().trim_end_matches('/').to_string();
            Some(CdnRule::Prefix { origin: parsed.origin(), path })
        } else {
            Some(CdnRule::Host(entry.trim_end_matches('/').to_ascii_lowercase()))
        }
    }

    fn matches(&self, url: &Url) -> bool {
        match self {
            CdnRule::Prefix { origin, path } => {
                url.origin() == *origin
                    && (path.is_empty()
                        || url.path() == path
                        || url.path().strip_prefix(path.as_str()).is_some_and(|rest| rest.starts_with('/')))
            }
            CdnRule::Host(host) => url.host_str().is_some_and(|h| h.eq_ignore_ascii_case(host)),
        }
    }
}

/// Ordered rule set, first match wins.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: url::Origin,
    app_root: String,
    api_host: String,
    cdn: Vec<CdnRule>,
}

impl Classifier {
    pub fn new(settings: &RouterSettings) -> Self {
        Self {
            origin: settings.origin.origin(),
            app_root: settings.app_root.clone(),
            api_host: settings.api_host.to_ascii_lowercase(),
            cdn: settings.cdn_allowlist.iter().filter_map(|entry| CdnRule::parse(entry)).collect(),
        }
    }

    pub fn classify(&self, url: &Url) -> RequestClass {
        if url.host_str().is_some_and(|host| host.eq_ignore_ascii_case(&self.api_host)) {
            return RequestClass::Api;
        }

        let same_origin = url.origin() == self.origin;
        let path = url.path();

        if same_origin && self.is_static_path(path) {
            return RequestClass::StaticAsset;
        }

        if self.cdn.iter().any(|rule| rule.matches(url)) {
            return RequestClass::CdnAsset;
        }

        if same_origin && self.is_shell_path(path) {
            return RequestClass::AppShell;
        }

        RequestClass::Generic
    }

    fn is_static_path(&self, path: &str) -> bool {
        let Some(rest) = path.strip_prefix(self.app_root.as_str()) else {
            return false;
        };
        STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
            || rest.starts_with("icons/")
            || rest.starts_with("screenshots/")
    }

    fn is_shell_path(&self, path: &str) -> bool {
        let root_without_slash = self.app_root.trim_end_matches('/');
        if path == self.app_root || path == root_without_slash {
            return true;
        }
        let Some(rest) = path.strip_prefix(self.app_root.as_str()) else {
            return false;
        };
        rest == "index.html" || !rest.rsplit('/').next().unwrap_or_default().contains('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classifier() -> Classifier {
        Classifier::new(&RouterSettings::for_tests())
    }

    fn class_of(url: &str) -> RequestClass {
        classifier().classify(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_api_host() {
        assert_eq!(class_of("https://api.github.com/users/welshDog/repos"), RequestClass::Api);
        assert_eq!(class_of("https://API.github.com/rate_limit"), RequestClass::Api);
    }

    #[test]
    fn test_static_assets() {
        let base = "https://welshdog.github.io/ULTIMATE-HYPERFOCUS-CONSTELLATION";
        assert_eq!(class_of(&format!("{base}/app.js")), RequestClass::StaticAsset);
        assert_eq!(class_of(&format!("{base}/style.css")), RequestClass::StaticAsset);
        assert_eq!(class_of(&format!("{base}/manifest.json")), RequestClass::StaticAsset);
        assert_eq!(class_of(&format!("{base}/site.webmanifest")), RequestClass::StaticAsset);
        assert_eq!(class_of(&format!("{base}/icons/icon-192x192.png")), RequestClass::StaticAsset);
        assert_eq!(class_of(&format!("{base}/screenshots/wide.png")), RequestClass::StaticAsset);
    }

    #[test]
    fn test_static_requires_same_origin() {
        assert_eq!(
            class_of("https://evil.example/ULTIMATE-HYPERFOCUS-CONSTELLATION/app.js"),
            RequestClass::Generic
        );
        assert_eq!(class_of("https://welshdog.github.io/other/app.js"), RequestClass::Generic);
    }

    #[test]
    fn test_cdn_prefix() {
        assert_eq!(
            class_of("https://cdnjs.cloudflare.com/ajax/libs/three.js/r128/three.min.js"),
            RequestClass::CdnAsset
        );
        assert_eq!(class_of("https://unpkg.com/three"), RequestClass::Generic);
    }

    #[test]
    fn test_cdn_prefix_respects_host_and_path_boundaries() {
        assert_eq!(class_of("https://cdnjs.cloudflare.com.evil.example/x.js"), RequestClass::Generic);
        assert_eq!(class_of("http://cdnjs.cloudflare.com/x.js"), RequestClass::Generic);
        assert_eq!(class_of("https://cdnjs.cloudflare.com:8443/x.js"), RequestClass::Generic);

        let mut settings = RouterSettings::for_tests();
        settings.cdn_allowlist = vec!["https://cdn.jsdelivr.net/npm/three/".into()];
        let classifier = Classifier::new(&settings);
        let class = |raw: &str| classifier.classify(&Url::parse(raw).unwrap());

        assert_eq!(class("https://cdn.jsdelivr.net/npm/three/build/three.module.js"), RequestClass::CdnAsset);
        assert_eq!(class("https://cdn.jsdelivr.net/npm/three"), RequestClass::CdnAsset);
        assert_eq!(class("https://cdn.jsdelivr.net/npm/threesome/x.js"), RequestClass::Generic);
    }

    #[test]
    fn test_cdn_bare_host() {
        let mut settings = RouterSettings::for_tests();
        settings.cdn_allowlist = vec!["fonts.gstatic.com".into()];
        let classifier = Classifier::new(&settings);

        let hit = Url::parse("https://fonts.gstatic.com/s/inter.woff2").unwrap();
        let miss = Url::parse("https://gstatic.com/s/inter.woff2").unwrap();
        assert_eq!(classifier.classify(&hit), RequestClass::CdnAsset);
        assert_eq!(classifier.classify(&miss), RequestClass::Generic);
    }

    #[test]
    fn test_app_shell() {
        assert_eq!(class_of("https://welshdog.github.io/ULTIMATE-HYPERFOCUS-CONSTELLATION/"), RequestClass::AppShell);
        assert_eq!(class_of("https://welshdog.github.io/ULTIMATE-HYPERFOCUS-CONSTELLATION"), RequestClass::AppShell);
        assert_eq!(
            class_of("https://welshdog.github.io/ULTIMATE-HYPERFOCUS-CONSTELLATION/index.html"),
            RequestClass::AppShell
        );
        assert_eq!(
            class_of("https://welshdog.github.io/ULTIMATE-HYPERFOCUS-CONSTELLATION/research?x=1"),
            RequestClass::AppShell
        );
        assert_eq!(
            class_of("https://welshdog.github.io/ULTIMATE-HYPERFOCUS-CONSTELLATION/readme.txt"),
            RequestClass::Generic
        );
    }

    #[test]
    fn test_static_wins_over_cdn_and_shell() {
        let mut settings = RouterSettings::for_tests();
        settings.cdn_allowlist = vec!["welshdog.github.io".into()];
        let classifier = Classifier::new(&settings);

        let js = Url::parse("https://welshdog.github.io/ULTIMATE-HYPERFOCUS-CONSTELLATION/app.js").unwrap();
        let shell = Url::parse("https://welshdog.github.io/ULTIMATE-HYPERFOCUS-CONSTELLATION/").unwrap();
        assert_eq!(classifier.classify(&js), RequestClass::StaticAsset);
        assert_eq!(classifier.classify(&shell), RequestClass::CdnAsset);
    }

    #[test]
    fn test_partition_mapping() {
        assert_eq!(RequestClass::Api.partition(), PartitionKind::Api);
        assert_eq!(RequestClass::StaticAsset.partition(), PartitionKind::Static);
        assert_eq!(RequestClass::CdnAsset.partition(), PartitionKind::Static);
        assert_eq!(RequestClass::AppShell.partition(), PartitionKind::Static);
        assert_eq!(RequestClass::Generic.partition(), PartitionKind::Dynamic);
    }

    #[test]
    fn test_class_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&RequestClass::StaticAsset).unwrap(), "\"static-asset\"");
        assert_eq!(RequestClass::CdnAsset.to_string(), "cdn-asset");
    }

    fn arb_url() -> impl Strategy<Value = String> {
        let hosts = prop::sample::select(vec![
            "api.github.com",
            "welshdog.github.io",
            "cdnjs.cloudflare.com",
            "example.com",
            "localhost:8080",
        ]);
        let schemes = prop::sample::select(vec!["http", "https"]);
        (schemes, hosts, "(/[A-Za-z0-9._-]{0,12}){0,4}", "(\\?[a-z]=[0-9]{1,3})?")
            .prop_map(|(scheme, host, path, query)| format!("{scheme}://{host}{path}{query}"))
    }

    proptest! {
        #[test]
        fn prop_classification_is_total_and_deterministic(raw in arb_url()) {
            let url = Url::parse(&raw).unwrap();
            let classifier = classifier();
            let first = classifier.classify(&url);
            let second = classifier.classify(&url);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_api_host_always_api(path in "(/[a-z0-9]{1,8}){0,4}") {
            let url = Url::parse(&format!("https://api.github.com{path}")).unwrap();
            prop_assert_eq!(classifier().classify(&url), RequestClass::Api);
        }

        #[test]
        fn prop_foreign_origin_never_static_or_shell(path in "(/[A-Za-z0-9._-]{1,12}){0,4}") {
            let url = Url::parse(&format!("https://example.com/ULTIMATE-HYPERFOCUS-CONSTELLATION{path}")).unwrap();
            let class = classifier().classify(&url);
            prop_assert!(class != RequestClass::StaticAsset && class != RequestClass::AppShell);
        }
    }
}
