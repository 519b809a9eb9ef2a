//! Source fetching and content-type detection.
//!
//! Resolves Google-Drive share links to their direct-download form, follows
//! redirects, classifies the payload from the `Content-Type` header, and
//! reduces HTML to its main content before conversion. PDFs are not
//! downloaded here; the converter passes them to the model by reference.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::types::{ContentType, RagError};

/// Fetched source material, normalized for the markdown converter.
#[derive(Clone, Debug)]
pub struct FetchedDocument {
    pub content_type: ContentType,
    /// Final URL after Drive rewriting and redirects.
    pub resolved_url: Url,
    /// Text payload for HTML/JSON sources; `None` for PDFs.
    pub text: Option<String>,
}

/// Rewrites a Google-Drive share link into its direct-download form; any
/// other URL passes through unchanged.
pub fn resolve_drive_url(url: &Url) -> Url {
    if !url
        .host_str()
        .is_some_and(|host| host.ends_with("drive.google.com"))
    {
        return url.clone();
    }

    static FILE_ID: OnceLock<Regex> = OnceLock::new();
    let pattern = FILE_ID.get_or_init(|| {
        Regex::new(r"/d/([^/]+)|[?&]id=([^&]+)").expect("drive id pattern is valid")
    });

    let haystack = url.as_str();
    let Some(captures) = pattern.captures(haystack) else {
        return url.clone();
    };
    let file_id = captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str())
        .unwrap_or_default();
    let direct = format!("https://drive.google.com/uc?export=download&id={file_id}");
    Url::parse(&direct).unwrap_or_else(|_| url.clone())
}

/// Fetches `url` and classifies the payload.
pub async fn fetch_document(client: &Client, url: &Url) -> Result<FetchedDocument, RagError> {
    let resolved = resolve_drive_url(url);
    let response = client
        .get(resolved.clone())
        .send()
        .await?
        .error_for_status()?;
    let final_url = response.url().clone();

    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .unwrap_or_default()
        .to_string();
    let content_type = ContentType::from_mime(&mime);
    debug!(url = %final_url, %content_type, "fetched source document");

    let text = match content_type {
        ContentType::Pdf => None,
        ContentType::Json => Some(response.text().await?),
        ContentType::Html => {
            let raw = response.text().await?;
            Some(extract_main_content(&raw))
        }
    };

    Ok(FetchedDocument {
        content_type,
        resolved_url: final_url,
        text,
    })
}

/// Reduces an HTML page to its main content container with script/style/nav
/// noise stripped, so the converter sees as little boilerplate as possible.
pub fn extract_main_content(html: &str) -> String {
    let document = Html::parse_document(html);
    let fragment = select_fragment(&document).unwrap_or_else(|| html.to_string());
    strip_noise(&fragment)
}

fn select_fragment(document: &Html) -> Option<String> {
    let main = Selector::parse("main, #main, #content, article").ok()?;
    if let Some(element) = document.select(&main).next() {
        return Some(element.html());
    }
    let body = Selector::parse("body").ok()?;
    document.select(&body).next().map(|element| element.html())
}

fn strip_noise(html: &str) -> String {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    let pattern = NOISE.get_or_init(|| {
        let blocks = [
            "script", "style", "noscript", "iframe", "svg", "form", "nav", "header", "footer",
            "aside",
        ]
        .map(|tag| format!("<{tag}\\b[^>]*>.*?</{tag}>"))
        .join("|");
        Regex::new(&format!("(?is){blocks}|<!--.*?-->")).expect("noise pattern is valid")
    });
    pattern.replace_all(html, "").to_string()
}
