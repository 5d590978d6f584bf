//! Referer Table.
//!
//! Hotlink-protected CDNs only serve images when the `Referer` names their
//! own site. Lookup order: exact host, then suffix/substring, then the
//! target's own `scheme://host/`.

use url::Url;

/// `(host, referer)` pairs, consulted read-only.
pub const REFERER_TABLE: &[(&str, &str)] = &[
    ("cdn.sspai.com", "https://sspai.com/"),
    ("cdnfile.sspai.com", "https://sspai.com/"),
    ("sinaimg.cn", "https://weibo.com/"),
    ("hdslb.com", "https://www.bilibili.com/"),
    ("zhimg.com", "https://www.zhihu.com/"),
    ("doubanio.com", "https://www.douban.com/"),
    ("qpic.cn", "https://mp.weixin.qq.com/"),
    ("img.ithome.com", "https://www.ithome.com/"),
    ("xhscdn.com", "https://www.xiaohongshu.com/"),
    ("byteimg.com", "https://www.toutiao.com/"),
];

/// Referer to send when fetching `target`.
pub fn resolve_referer(target: &Url) -> String {
    let host = target.host_str().unwrap_or_default().to_ascii_lowercase();

    if let Some((_, referer)) = REFERER_TABLE.iter().find(|(key, _)| *key == host) {
        return referer.to_string();
    }

    if let Some((_, referer)) = REFERER_TABLE
        .iter()
        .find(|(key, _)| host.ends_with(&format!(".{}", key)) || host.contains(key))
    {
        return referer.to_string();
    }

    match target.port() {
        Some(port) => format!("{}://{}:{}/", target.scheme(), host, port),
        None => format!("{}://{}/", target.scheme(), host),
    }
}
