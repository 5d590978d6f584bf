//! Rewrite Rule Set.
//!
//! # Responsibilities
//! - Define every `(pattern, role)` rewrite rule
//! - Group rules into the two ordered pipelines
//! - Implement the per-role transform applied to each match
//!
//! # Design Decisions
//! - Rules are pure: each returns a new document, nothing is mutated in place
//! - Each pipeline applies its rules left-to-right over the whole document
//! - Every transform is idempotent; proxied URLs fail `should_proxy` on a rerun
//! - Patterns are compile-time constants, compiled once on first use

use regex::bytes::{Captures, Regex, RegexBuilder};
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::feed::rewriter::{decode_entities_levels, RewriteContext};

/// Hosts (substring match) whose resources are proxied regardless of extension.
pub const PROXY_HOSTS: &[&str] = &[
    "sinaimg.cn",
    "hdslb.com",
    "zhimg.com",
    "doubanio.com",
    "qpic.cn",
    "sspai.com",
    "byteimg.com",
    "xhscdn.com",
    "ithome.com",
    "twimg.com",
    "githubusercontent.com",
    "cdninstagram.com",
];

/// What a rule matches and therefore how its capture is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    HtmlAttributeSrc,
    EnclosureUrl,
    MediaUrl,
    Srcset,
    CssBackgroundUrl,
    EntityEncodedSrc,
    EntityEncodedSrcset,
    RelativeSrc,
    RelativeDataAttr,
    RelativeEnclosureUrl,
}

impl Role {
    /// Levels of HTML escaping wrapped around URLs this role captures.
    fn escape_levels(self) -> usize {
        match self {
            Role::EntityEncodedSrc | Role::EntityEncodedSrcset => 2,
            _ => 1,
        }
    }
}

/// Byte-level pattern; non-ASCII bytes of any charset pass through unmatched.
fn byte_pattern(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .unicode(false)
        .build()
        .expect("rewrite rule pattern must compile")
}

/// A single compiled rewrite rule.
#[derive(Debug)]
pub struct RewriteRule {
    pub role: Role,
    pub pattern: Regex,
}

impl RewriteRule {
    fn new(role: Role, pattern: &str) -> Self {
        Self {
            role,
            pattern: byte_pattern(pattern),
        }
    }

    /// Apply this rule to every match in `doc`.
    pub fn apply<'d>(&self, doc: &'d [u8], ctx: &RewriteContext) -> Cow<'d, [u8]> {
        self.pattern
            .replace_all(doc, |caps: &Captures| self.transform(caps, ctx))
    }

    fn transform(&self, caps: &Captures, ctx: &RewriteContext) -> Vec<u8> {
        let whole = &caps[0];
        let rewritten = match self.role {
            Role::RelativeSrc | Role::RelativeDataAttr | Role::RelativeEnclosureUrl => {
                as_str(&caps["path"])
                    .and_then(|path| ctx.absolutize(path))
                    .map(|absolute| concat(&caps["pre"], absolute.as_bytes()))
            }
            Role::HtmlAttributeSrc => Some(
                IMG_ATTR
                    .replace_all(whole, |attr: &Captures| rewrite_quoted_attr(attr, ctx))
                    .into_owned(),
            ),
            Role::EntityEncodedSrc => Some(
                ENTITY_IMG_ATTR
                    .replace_all(whole, |attr: &Captures| {
                        rewrite_single(&attr["pre"], &attr["url"], self.role, ctx)
                    })
                    .into_owned(),
            ),
            Role::EnclosureUrl | Role::MediaUrl | Role::CssBackgroundUrl => {
                Some(rewrite_single(&caps["pre"], &caps["url"], self.role, ctx))
            }
            Role::Srcset | Role::EntityEncodedSrcset => as_str(&caps["url"])
                .and_then(|value| rewrite_srcset(value, self.role.escape_levels(), ctx))
                .map(|rewritten| concat(&caps["pre"], rewritten.as_bytes())),
        };
        rewritten.unwrap_or_else(|| whole.to_vec())
    }
}

/// URLs are only rewritten when their bytes are valid UTF-8.
fn as_str(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes).ok()
}

fn concat(head: &[u8], tail: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(head.len() + tail.len());
    out.extend_from_slice(head);
    out.extend_from_slice(tail);
    out
}

fn rewrite_single(pre: &[u8], raw: &[u8], role: Role, ctx: &RewriteContext) -> Vec<u8> {
    match as_str(raw).and_then(|raw| proxied(raw, role.escape_levels(), ctx)) {
        Some(url) => concat(pre, url.as_bytes()),
        None => concat(pre, raw),
    }
}

fn rewrite_quoted_attr(attr: &Captures, ctx: &RewriteContext) -> Vec<u8> {
    let (quote, raw) = match (attr.name("dq"), attr.name("sq")) {
        (Some(v), _) => (b'"', v.as_bytes()),
        (None, Some(v)) => (b'\'', v.as_bytes()),
        (None, None) => return attr[0].to_vec(),
    };

    let mut out = attr["pre"].to_vec();
    out.push(quote);
    match as_str(raw).and_then(|raw| proxied(raw, 1, ctx)) {
        Some(url) => out.extend_from_slice(url.as_bytes()),
        None => out.extend_from_slice(raw),
    }
    out.push(quote);
    out
}

fn proxied(raw: &str, levels: usize, ctx: &RewriteContext) -> Option<String> {
    let decoded = decode_entities_levels(raw, levels);
    let decoded = decoded.trim();
    ctx.should_proxy(decoded).then(|| ctx.proxy_url(decoded))
}

/// Rewrite the URL token of each srcset entry, keeping descriptors.
///
/// Returns `None` when no entry needed proxying so the value stays byte-identical.
pub fn rewrite_srcset(value: &str, levels: usize, ctx: &RewriteContext) -> Option<String> {
    let mut changed = false;
    let entries: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (url, descriptor) = match entry.split_once(char::is_whitespace) {
                Some((url, descriptor)) => (url, descriptor.trim()),
                None => (entry, ""),
            };
            let url = match proxied(url, levels, ctx) {
                Some(proxy) => {
                    changed = true;
                    proxy
                }
                None => url.to_string(),
            };
            if descriptor.is_empty() {
                url
            } else {
                format!("{} {}", url, descriptor)
            }
        })
        .collect();

    changed.then(|| entries.join(", "))
}

const IMG_ATTR_NAMES: &str = "src|data-src|data-original|data-lazy-src";

/// Escaped-HTML attribute quotes: `&quot;` or `&#39;` in their named and numeric forms.
const ENTITY_QUOTE: &str = "(?:&quot;|&#34;|&#x22;|&#39;|&#x27;|&apos;)";

/// Characters of an escaped-HTML attribute value; escaped quotes end it.
const ENTITY_VALUE: &str = r#"(?:[^&"<>\s]|&(?:amp|#38|#x26);)*"#;

static IMG_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    byte_pattern(&format!(
        r#"(?i)(?P<pre>\s(?:{})\s*=\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#,
        IMG_ATTR_NAMES
    ))
});

static ENTITY_IMG_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    byte_pattern(&format!(
        r"(?i)(?P<pre>\s(?:{})\s*=\s*{})(?P<url>{})",
        IMG_ATTR_NAMES, ENTITY_QUOTE, ENTITY_VALUE
    ))
});

/// An ordered list of rules applied one after another.
#[derive(Debug)]
pub struct Pipeline {
    rules: Vec<RewriteRule>,
}

impl Pipeline {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Run every rule over the whole current document, in order.
    pub fn apply(&self, doc: &[u8], ctx: &RewriteContext) -> Vec<u8> {
        let mut current = doc.to_vec();
        for rule in &self.rules {
            let next = match rule.apply(&current, ctx) {
                Cow::Owned(next) => Some(next),
                Cow::Borrowed(_) => None,
            };
            if let Some(next) = next {
                current = next;
            }
        }
        current
    }
}

const RELATIVE_PATH: &str = r#"(?P<path>/[^"'\s<>]*)"#;

/// Pass 1: prefix root-relative references with the feed's origin.
pub static RELATIVE_FIXUP: LazyLock<Pipeline> = LazyLock::new(|| {
    let open_quote = format!(r#"(?:"|'|{})"#, ENTITY_QUOTE);
    let relative = |role, attr: &str| {
        RewriteRule::new(
            role,
            &format!(r"(?i)(?P<pre>\b{}\s*=\s*{}){}", attr, open_quote, RELATIVE_PATH),
        )
    };
    Pipeline::new(vec![
        relative(Role::RelativeSrc, "src"),
        relative(Role::RelativeDataAttr, "data-[a-z0-9_-]+"),
        relative(Role::RelativeEnclosureUrl, "url"),
    ])
});

/// Pass 2: route absolute resource URLs through the image endpoint.
pub static RESOURCE_PROXY: LazyLock<Pipeline> = LazyLock::new(|| {
    Pipeline::new(vec![
        RewriteRule::new(Role::HtmlAttributeSrc, r"(?i)<img\b[^>]*>"),
        RewriteRule::new(
            Role::EnclosureUrl,
            r#"(?i)(?P<pre><enclosure\b[^>]*?\burl\s*=\s*["'])(?P<url>[^"']*)"#,
        ),
        RewriteRule::new(
            Role::MediaUrl,
            r#"(?i)(?P<pre><media:(?:content|thumbnail)\b[^>]*?\burl\s*=\s*["'])(?P<url>[^"']*)"#,
        ),
        RewriteRule::new(
            Role::Srcset,
            r#"(?i)(?P<pre>\bsrcset\s*=\s*["'])(?P<url>[^"']*)"#,
        ),
        RewriteRule::new(
            Role::CssBackgroundUrl,
            r#"(?i)(?P<pre>background(?:-image)?\s*:\s*url\(\s*(?:["']|&quot;|&#34;|&#39;)?)(?P<url>[^"'()\s&]+(?:&(?:amp|#38|#x26);[^"'()\s&]*)*)"#,
        ),
        RewriteRule::new(Role::EntityEncodedSrc, r"(?is)&lt;img\b.*?&gt;"),
        RewriteRule::new(
            Role::EntityEncodedSrcset,
            &format!(
                r#"(?i)(?P<pre>\bsrcset\s*=\s*{})(?P<url>(?:[^&"<>]|&(?:amp|#38|#x26);)*)"#,
                ENTITY_QUOTE
            ),
        ),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RewriteContext<'static> {
        RewriteContext::new("https://proxy.example", "https://x.com/feed.xml")
    }

    fn apply(pipeline: &Pipeline, doc: &str) -> String {
        String::from_utf8(pipeline.apply(doc.as_bytes(), &ctx())).unwrap()
    }

    #[test]
    fn test_pipeline_order() {
        let roles: Vec<Role> = RELATIVE_FIXUP.rules().iter().map(|r| r.role).collect();
        assert_eq!(
            roles,
            vec![Role::RelativeSrc, Role::RelativeDataAttr, Role::RelativeEnclosureUrl]
        );
        assert_eq!(RESOURCE_PROXY.rules().len(), 7);
        assert_eq!(RESOURCE_PROXY.rules()[0].role, Role::HtmlAttributeSrc);
    }

    #[test]
    fn test_relative_fixup_variants() {
        let doc = r#"<img src="/a.png" data-original='/b.jpg'><enclosure url="/c.mp3"/> &lt;img src=&quot;/d.png&quot;&gt;"#;
        let out = apply(&RELATIVE_FIXUP, doc);
        assert!(out.contains(r#"src="https://x.com/a.png""#));
        assert!(out.contains(r#"data-original='https://x.com/b.jpg'"#));
        assert!(out.contains(r#"url="https://x.com/c.mp3""#));
        assert!(out.contains("src=&quot;https://x.com/d.png&quot;"));
    }

    #[test]
    fn test_relative_fixup_protocol_relative() {
        let out = apply(&RELATIVE_FIXUP, r#"<img src="//cdn.y.com/a.png">"#);
        assert_eq!(out, r#"<img src="https://cdn.y.com/a.png">"#);
    }

    #[test]
    fn test_relative_fixup_leaves_absolute_alone() {
        let doc = r#"<img src="https://x.com/a.png"><a href="/page">"#;
        assert_eq!(apply(&RELATIVE_FIXUP, doc), doc);
    }

    #[test]
    fn test_srcset_keeps_descriptors() {
        let out = rewrite_srcset("https://a.com/1.png 1x,https://a.com/2.png 2x", 1, &ctx()).unwrap();
        assert_eq!(
            out,
            "https://proxy.example/api/image?url=https%3A%2F%2Fa.com%2F1.png 1x, \
             https://proxy.example/api/image?url=https%3A%2F%2Fa.com%2F2.png 2x"
        );
    }

    #[test]
    fn test_srcset_without_proxyable_entries_untouched() {
        assert_eq!(rewrite_srcset("https://a.com/page 1x,  data:abc 2x", 1, &ctx()), None);
    }

    #[test]
    fn test_only_img_tags_rewritten_by_attribute_rule() {
        let doc = r#"<iframe src="https://x.com/a.png"></iframe>"#;
        assert_eq!(apply(&RESOURCE_PROXY, doc), doc);
    }

    #[test]
    fn test_apostrophe_entity_quotes() {
        let doc = "&lt;img src=&#39;/a.png&#39; srcset=&#39;https://a.com/2.png 2x&#39;&gt;";
        let fixed = apply(&RELATIVE_FIXUP, doc);
        assert!(fixed.contains("src=&#39;https://x.com/a.png&#39;"));

        let out = apply(&RESOURCE_PROXY, &fixed);
        assert!(out.contains(
            "src=&#39;https://proxy.example/api/image?url=https%3A%2F%2Fx.com%2Fa.png&#39;"
        ));
        assert!(out.contains(
            "srcset=&#39;https://proxy.example/api/image?url=https%3A%2F%2Fa.com%2F2.png 2x&#39;"
        ));
    }

    #[test]
    fn test_non_utf8_bytes_survive() {
        let doc = b"<title>\xD6\xD0\xCE\xC4</title><img src=\"https://a.com/x.png\" alt=\"\xB9\xFA\">";
        let out = RESOURCE_PROXY.apply(doc, &ctx());
        assert!(out.starts_with(b"<title>\xD6\xD0\xCE\xC4</title><img src=\"https://proxy.example/"));
        assert!(out.ends_with(b" alt=\"\xB9\xFA\">"));
    }
}
