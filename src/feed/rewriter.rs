//! Content Rewriter.
//!
//! # Responsibilities
//! - Derive the rewrite context (proxy base, feed origin) for one document
//! - Decide which resource URLs are proxied (`should_proxy`)
//! - Build proxy links and run both rule pipelines in order
//!
//! # Design Decisions
//! - Relative-path fixup always runs before resource proxying
//! - Proxy links are percent-encoded so they never contain `&` or quotes
//! - A URL that already points at the proxy is never wrapped again

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;
use url::Url;

use crate::feed::rules::{PROXY_HOSTS, RELATIVE_FIXUP, RESOURCE_PROXY};

/// Path and query prefix of the image proxy endpoint.
pub const PROXY_ENDPOINT: &str = "/api/image?url=";

static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(?:jpe?g|png|gif|webp|svg|bmp|ico|avif)(?:\?.*)?$")
        .expect("image extension pattern must compile")
});

static HTML_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:(?P<named>amp|quot|apos|lt|gt)|#(?P<dec>[0-9]{1,7})|#[xX](?P<hex>[0-9a-fA-F]{1,6}));")
        .expect("entity pattern must compile")
});

/// Decode the common named and numeric HTML entities once.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    HTML_ENTITY.replace_all(input, |caps: &Captures| {
        if let Some(named) = caps.name("named") {
            let decoded = match named.as_str() {
                "amp" => "&",
                "quot" => "\"",
                "apos" => "'",
                "lt" => "<",
                "gt" => ">",
                _ => &caps[0],
            };
            return decoded.to_string();
        }
        let code = match (caps.name("dec"), caps.name("hex")) {
            (Some(dec), _) => dec.as_str().parse::<u32>().ok(),
            (None, Some(hex)) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, None) => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    })
}

/// Decode `levels` layers of entity escaping.
pub fn decode_entities_levels(input: &str, levels: usize) -> Cow<'_, str> {
    let mut current = Cow::Borrowed(input);
    for _ in 0..levels {
        let next = match decode_entities(&current) {
            Cow::Borrowed(_) => None,
            Cow::Owned(next) => Some(next),
        };
        match next {
            Some(next) => current = Cow::Owned(next),
            None => break,
        }
    }
    current
}

/// Per-document inputs shared by every rule.
#[derive(Debug, Clone)]
pub struct RewriteContext<'a> {
    server_url: &'a str,
    origin: Option<String>,
    scheme: Option<String>,
}

impl<'a> RewriteContext<'a> {
    pub fn new(server_url: &'a str, source_url: &str) -> Self {
        let source = Url::parse(source_url).ok();
        let origin = source
            .as_ref()
            .map(|u| u.origin())
            .filter(|o| o.is_tuple())
            .map(|o| o.ascii_serialization());
        Self {
            server_url: server_url.trim_end_matches('/'),
            origin,
            scheme: source.map(|u| u.scheme().to_string()),
        }
    }

    /// Whether `url` is an image resource that should go through the proxy.
    pub fn should_proxy(&self, url: &str) -> bool {
        let is_data_uri = url
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"));
        if url.is_empty() || is_data_uri {
            return false;
        }
        if !self.server_url.is_empty() && url.contains(self.server_url) {
            return false;
        }
        if url.contains(PROXY_ENDPOINT) {
            return false;
        }

        IMAGE_EXTENSION.is_match(url) || is_proxy_host(url)
    }

    /// `{server}/api/image?url={percent-encoded url}`.
    pub fn proxy_url(&self, url: &str) -> String {
        format!("{}{}{}", self.server_url, PROXY_ENDPOINT, urlencoding::encode(url))
    }

    /// Make a root-relative or protocol-relative path absolute.
    pub fn absolutize(&self, path: &str) -> Option<String> {
        if path.contains(PROXY_ENDPOINT) {
            return None;
        }
        if path.starts_with("//") {
            return self.scheme.as_ref().map(|scheme| format!("{}:{}", scheme, path));
        }
        self.origin.as_ref().map(|origin| format!("{}{}", origin, path))
    }
}

fn is_proxy_host(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .map(|host| PROXY_HOSTS.iter().any(|cdn| host.contains(cdn)))
        .unwrap_or(false)
}

/// Applies the relative-fixup and resource-proxy pipelines to feed bodies.
#[derive(Debug, Clone)]
pub struct ContentRewriter {
    server_url: String,
}

impl ContentRewriter {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Rewrite `body`, fetched from `source_url`.
    ///
    /// Works on raw bytes; everything outside the rewritten URLs is returned
    /// unchanged, whatever charset the document uses.
    pub fn rewrite(&self, body: &[u8], source_url: &str) -> Vec<u8> {
        let ctx = RewriteContext::new(&self.server_url, source_url);
        let fixed = RELATIVE_FIXUP.apply(body, &ctx);
        RESOURCE_PROXY.apply(&fixed, &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "https://x.com/feed.xml";

    fn rewrite(doc: &str, source_url: &str) -> String {
        let out = ContentRewriter::new("https://proxy.example").rewrite(doc.as_bytes(), source_url);
        String::from_utf8(out).unwrap()
    }

    fn proxied_targets(doc: &str) -> Vec<String> {
        let re = Regex::new(r#"/api/image\?url=([^"'\s)&,]+)"#).unwrap();
        re.captures_iter(doc)
            .map(|c| urlencoding::decode(&c[1]).unwrap().into_owned())
            .collect()
    }

    #[test]
    fn test_relative_before_absolute() {
        let out = rewrite(r#"<img src="/a.png">"#, FEED);
        assert_eq!(
            out,
            r#"<img src="https://proxy.example/api/image?url=https%3A%2F%2Fx.com%2Fa.png">"#
        );
    }

    #[test]
    fn test_round_trip_recovers_original_urls() {
        let doc = r#"<item>
            <description><![CDATA[<p><img data-src="https://wx1.sinaimg.cn/large/abc" src="https://x.com/a.jpg?w=1&amp;h=2"></p>]]></description>
            <enclosure url="https://cdn.x.com/cover.webp" type="image/webp"/>
            <media:thumbnail url="https://i.example.org/t.PNG"/>
        </item>"#;
        let out = rewrite(doc, FEED);
        assert_eq!(
            proxied_targets(&out),
            vec![
                "https://wx1.sinaimg.cn/large/abc".to_string(),
                "https://x.com/a.jpg?w=1&h=2".to_string(),
                "https://cdn.x.com/cover.webp".to_string(),
                "https://i.example.org/t.PNG".to_string(),
            ]
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let doc = r#"<rss><channel><item>
            <description><![CDATA[<img src="/rel.png" srcset="https://a.com/1.jpg 1x, https://a.com/2.jpg 2x"><div style="background-image: url('https://a.com/bg.gif')"></div>]]></description>
            <content:encoded>&lt;img class=&quot;x&quot; src=&quot;https://b.com/e.jpg?a=1&amp;amp;b=2&quot; srcset=&quot;https://b.com/s.png 2x&quot;&gt;</content:encoded>
            <enclosure url="/media/cover.jpg"/>
            <media:content url="https://c.com/m.avif" medium="image"/>
        </item></channel></rss>"#;
        let once = rewrite(doc, FEED);
        let twice = rewrite(&once, FEED);
        assert_ne!(once, doc);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_data_uris_never_wrapped() {
        let doc = r#"<img src="data:image/png;base64,iVBORw0KGgo="><div style="background: url(data:image/gif;base64,R0lGOD.gif)">"#;
        assert_eq!(rewrite(doc, FEED), doc);
    }

    #[test]
    fn test_non_image_urls_untouched() {
        let doc = r#"<img src="https://example.com/tracker"><a href="https://x.com/a.png">"#;
        assert_eq!(rewrite(doc, FEED), doc);
    }

    #[test]
    fn test_entity_encoded_src_decodes_two_levels() {
        let doc = "&lt;img src=&quot;https://b.com/e.jpg?a=1&amp;amp;b=2&quot;&gt;";
        let out = rewrite(doc, FEED);
        assert_eq!(proxied_targets(&out), vec!["https://b.com/e.jpg?a=1&b=2".to_string()]);
        assert!(out.starts_with("&lt;img src=&quot;https://proxy.example/api/image?url="));
        assert!(out.ends_with("&quot;&gt;"));
    }

    #[test]
    fn test_css_background_variants() {
        let doc = r#"<div style="background-image:url(https://a.com/x.png)"></div><p style="background: url(&quot;https://a.com/y.jpg&quot;)">"#;
        let out = rewrite(doc, FEED);
        assert_eq!(
            proxied_targets(&out),
            vec!["https://a.com/x.png".to_string(), "https://a.com/y.jpg".to_string()]
        );
        assert!(out.contains("%2Fy.jpg&quot;)"));
    }

    #[test]
    fn test_should_proxy_predicate() {
        let ctx = RewriteContext::new("https://proxy.example", FEED);
        assert!(ctx.should_proxy("https://a.com/pic.jpeg"));
        assert!(ctx.should_proxy("https://a.com/pic.svg?v=3"));
        assert!(ctx.should_proxy("https://pic1.zhimg.com/v2-abc"));
        assert!(!ctx.should_proxy(""));
        assert!(!ctx.should_proxy("DATA:image/png;base64,xx.png"));
        assert!(!ctx.should_proxy("https://proxy.example/static/logo.png"));
        assert!(!ctx.should_proxy("https://other.example/api/image?url=https%3A%2F%2Fa.com%2Fb.png"));
        assert!(!ctx.should_proxy("https://a.com/article.html"));
    }

    #[test]
    fn test_proxy_url_encoding() {
        let ctx = RewriteContext::new("https://proxy.example/", FEED);
        assert_eq!(
            ctx.proxy_url("https://a.com/b c.png?x=1&y=2"),
            "https://proxy.example/api/image?url=https%3A%2F%2Fa.com%2Fb%20c.png%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a&amp;b&#38;c&#x26;d&quot;&lt;&gt;"), "a&b&c&d\"<>");
        assert_eq!(decode_entities("&amp;amp;"), "&amp;");
        assert_eq!(decode_entities_levels("&amp;amp;", 2), "&");
        assert_eq!(decode_entities("&unknown; &#xFFFFFF;"), "&unknown; &#xFFFFFF;");
        assert!(matches!(decode_entities("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_non_http_source_skips_relative_fixup() {
        let out = rewrite(r#"<img src="/a.png">"#, "not a url");
        assert_eq!(out, r#"<img src="https://proxy.example/api/image?url=%2Fa.png">"#);
    }
}
