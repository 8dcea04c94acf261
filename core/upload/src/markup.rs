//! Markup written in place of an uploaded file.
//!
//! The embed kind is chosen by the first matching rule in `MARKUP_RULES`;
//! a known content type that matches no rule becomes a named link.

use std::fmt;

use dropline_storage::mime;

/// Content type assumed for files whose name has no extension.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Final text of a resolved upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Audio(String),
    Pdf(String),
    Video(String),
    Image(String),
    Link { name: String, url: String },
    UnknownContentType { name: String },
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Markup::Audio(url) => write!(f, "{{{{audio: {}}}}}", url),
            Markup::Pdf(url) => write!(f, "{{{{pdf: {}}}}}", url),
            Markup::Video(url) => write!(f, "{{{{video: {}}}}}", url),
            Markup::Image(url) => write!(f, "![]({})", url),
            Markup::Link { name, url } => write!(f, "[{}]({})", name, url),
            Markup::UnknownContentType { name } => {
                write!(f, "Unknown Content type for file {}", name)
            }
        }
    }
}

/// One entry of the embed priority table.
pub struct MarkupRule {
    pub kind: &'static str,
    pub matches: fn(&str) -> bool,
    pub build: fn(&str) -> Markup,
}

/// Embed rules, highest priority first.
pub const MARKUP_RULES: &[MarkupRule] = &[
    MarkupRule {
        kind: "audio",
        matches: is_audio,
        build: build_audio,
    },
    MarkupRule {
        kind: "pdf",
        matches: is_pdf,
        build: build_pdf,
    },
    MarkupRule {
        kind: "video",
        matches: is_video,
        build: build_video,
    },
    MarkupRule {
        kind: "image",
        matches: is_image,
        build: build_image,
    },
];

fn is_audio(content_type: &str) -> bool {
    content_type.contains("audio/")
}

fn is_pdf(content_type: &str) -> bool {
    content_type.contains("pdf")
}

fn is_video(content_type: &str) -> bool {
    content_type.contains("video/")
}

fn is_image(content_type: &str) -> bool {
    content_type.contains("image/")
}

fn build_audio(url: &str) -> Markup {
    Markup::Audio(url.to_string())
}

fn build_pdf(url: &str) -> Markup {
    Markup::Pdf(url.to_string())
}

fn build_video(url: &str) -> Markup {
    Markup::Video(url.to_string())
}

fn build_image(url: &str) -> Markup {
    Markup::Image(image_host(url))
}

/// Turn a sharing-page URL into one that serves the raw bytes.
pub fn direct_content_url(share_url: &str) -> String {
    match share_url.strip_suffix("dl=0") {
        Some(base) => format!("{}raw=1", base),
        None => share_url.to_string(),
    }
}

/// Point a link at the direct-content host, as image embeds require.
pub fn image_host(url: &str) -> String {
    url.replacen("www.dropbox.com", "dl.dropboxusercontent.com", 1)
}

/// Content type of an uploaded file.
///
/// Names without an extension default to `text/plain`; an extension
/// `mime_guess` does not know stays unresolved.
pub fn resolve_content_type(remote_name: &str) -> Option<&'static str> {
    if !mime::has_extension(remote_name) {
        return Some(DEFAULT_CONTENT_TYPE);
    }
    mime::resolve(remote_name)
}

/// Choose the markup for an uploaded file.
pub fn select_markup(content_type: Option<&str>, file_name: &str, share_url: &str) -> Markup {
    let Some(content_type) = content_type else {
        return Markup::UnknownContentType {
            name: file_name.to_string(),
        };
    };

    let url = direct_content_url(share_url);
    MARKUP_RULES
        .iter()
        .find(|rule| (rule.matches)(content_type))
        .map(|rule| (rule.build)(&url))
        .unwrap_or_else(|| Markup::Link {
            name: file_name.to_string(),
            url,
        })
}
