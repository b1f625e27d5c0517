use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;

#[derive(Debug, Clone)]
pub struct ExtractedHeading {
    pub level: u8,
    pub text: String,
    pub position: usize,
}

#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub src: String,
    pub alt: Option<String>,
    pub is_decorative: bool,
}

#[derive(Debug, Clone)]
pub struct ExtractedLink {
    pub href: String,
    pub is_internal: bool,
    pub text: Option<String>,
}

pub struct PageExtractor;

impl PageExtractor {
    pub fn extract_title(html: &Html) -> Option<String> {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("title").unwrap());
        html.select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Content of `<meta name="...">`.
    pub fn extract_meta(html: &Html, name: &str) -> Option<String> {
        let selector = Selector::parse(&format!("meta[name='{}']", name)).ok()?;
        html.select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Content of `<meta property="...">` (Open Graph style).
    pub fn extract_meta_property(html: &Html, property: &str) -> Option<String> {
        let selector = Selector::parse(&format!("meta[property='{}']", property)).ok()?;
        html.select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn extract_canonical(html: &Html) -> Option<String> {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("link[rel='canonical']").unwrap());
        html.select(selector)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn extract_word_count(html: &Html) -> usize {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("body").unwrap());
        html.select(selector)
            .next()
            .map(|body| body.text().collect::<String>().split_whitespace().count())
            .unwrap_or(0)
    }

    pub fn extract_headings(html: &Html) -> Vec<ExtractedHeading> {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());

        html.select(selector)
            .enumerate()
            .filter_map(|(idx, element)| {
                let tag = element.value().name();
                let level = tag.trim_start_matches('h').parse::<u8>().ok()?;
                let text = element.text().collect::<String>().trim().to_string();

                Some(ExtractedHeading { level, text, position: idx })
            })
            .collect()
    }

    pub fn extract_images(html: &Html, base_url: &str) -> Vec<ExtractedImage> {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("img").unwrap());
        let base = Url::parse(base_url).ok();

        html.select(selector)
            .map(|element| {
                let src = element.value().attr("src").unwrap_or("").trim().to_string();
                let resolved_src = match &base {
                    Some(base) if !src.is_empty() => {
                        base.join(&src).map(|u| u.to_string()).unwrap_or(src)
                    }
                    _ => src,
                };

                let alt = element.value().attr("alt").map(|s| s.trim().to_string());
                let is_decorative = alt.as_deref().map(|a| a.is_empty()).unwrap_or(false)
                    || element.value().attr("role") == Some("presentation")
                    || element.value().attr("aria-hidden") == Some("true");

                ExtractedImage { src: resolved_src, alt, is_decorative }
            })
            .collect()
    }

    /// Extract anchors with resolved hrefs and accessible text.
    /// Fragment-only, `javascript:`, `mailto:` and `tel:` hrefs are skipped.
    pub fn extract_links(html: &Html, base_url: &str) -> Vec<ExtractedLink> {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("a[href]").unwrap());

        static IMG_SELECTOR: OnceLock<Selector> = OnceLock::new();
        let img_selector = IMG_SELECTOR.get_or_init(|| Selector::parse("img").unwrap());

        let base = Url::parse(base_url).ok();
        let base_host = base.as_ref().and_then(|u| u.host_str()).map(|s| s.to_string());
        let base_port = base.as_ref().and_then(|u| u.port());

        let mut links = Vec::new();

        for element in html.select(selector) {
            let Some(href) = element.value().attr("href") else { continue };
            let href = href.trim();

            if href.is_empty()
                || href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
            {
                continue;
            }

            // Visible/accessible text with aria-label, title and img alt fallbacks
            let mut text = element.text().collect::<String>().trim().to_string();
            if text.is_empty() {
                if let Some(attr) = element
                    .value()
                    .attr("aria-label")
                    .or_else(|| element.value().attr("title"))
                {
                    text = attr.trim().to_string();
                }
            }
            if text.is_empty() {
                for img in element.select(img_selector) {
                    if let Some(alt) = img.value().attr("alt") {
                        if !alt.trim().is_empty() {
                            text = alt.trim().to_string();
                            break;
                        }
                    }
                }
            }

            let resolved = match &base {
                Some(base) => base
                    .join(href)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| href.to_string()),
                None => href.to_string(),
            };

            let is_internal = match Url::parse(&resolved) {
                Ok(link_url) => {
                    link_url.host_str().map(|h| h.to_string()) == base_host
                        && link_url.port() == base_port
                }
                Err(_) => false,
            };

            links.push(ExtractedLink {
                href: resolved,
                is_internal,
                text: if text.is_empty() { None } else { Some(text) },
            });
        }

        links
    }
}
