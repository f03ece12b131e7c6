use sha1::{Digest, Sha1};
use url::Url;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Stable logical key for a record.
///
/// Each part is trimmed, lower-cased and has inner whitespace runs replaced
/// by `_`; empty parts are dropped. Nothing else is rewritten, so labels
/// such as `Zip/Postal Code` keep their punctuation.
pub fn unique_name(page_name: &str, intent: &str, label_text: &str, ocr_type: &str) -> String {
    [page_name, intent, label_text, ocr_type]
        .iter()
        .map(|part| normalize_part(part))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn normalize_part(part: &str) -> String {
    part.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Normalize whatever identifies a captured page into a logical page name.
///
/// - `https://www.saucedemo.com/` -> `saucedemo_login`
/// - `https://www.saucedemo.com/inventory.html` -> `saucedemo_inventory`
/// - `Checkout_Info.PNG` -> `checkout_info`
/// - anything else is trimmed and lower-cased.
pub fn normalize_page_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();

    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        if let Ok(url) = Url::parse(trimmed) {
            return page_name_from_url(&url);
        }
    }

    if let Some((stem, ext)) = lowered.rsplit_once('.') {
        if IMAGE_EXTENSIONS.contains(&ext) && !stem.is_empty() {
            return stem.to_string();
        }
    }

    lowered
}

fn page_name_from_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let domain = host.split('.').next().unwrap_or_default();

    let path = url.path().trim_matches('/').to_lowercase().replace(".html", "");
    let path = if path.is_empty() {
        "login".to_string()
    } else {
        path.replace('/', "_")
    };

    if domain.is_empty() {
        path
    } else {
        format!("{}_{}", domain, path)
    }
}

/// Slug used when no intent classifier produced anything.
pub fn slugify(text: &str) -> String {
    let mut out = String::new();
    for c in text.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

/// SHA-1 hex digest used for deterministic record ids.
pub fn text_fingerprint(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
