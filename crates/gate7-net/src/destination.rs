//! Resource-type classification for intercepted requests.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::NetError;

/// The kind of asset a request is for.
///
/// Hosts usually know this (a navigation, an `<img>` load, a stylesheet link);
/// when they do not, [`Destination::infer`] guesses it from the URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Destination {
    /// A full page navigation.
    Document,
    Image,
    Font,
    /// A stylesheet.
    Style,
    Script,
    /// Anything else (JSON, manifests, media, ...).
    #[default]
    Other,
}

impl Destination {
    /// Infer the destination from the last path segment of `url`.
    ///
    /// Directory-like paths (`/`, `/menu/`) and extensionless paths are
    /// treated as documents.
    pub fn infer(url: &Url) -> Self {
        let file = url.path().rsplit('/').next().unwrap_or_default();
        let Some((_, ext)) = file.rsplit_once('.') else {
            return Destination::Document;
        };
        let ext = ext.to_ascii_lowercase();

        if matches!(ext.as_str(), "woff" | "woff2" | "ttf" | "otf" | "eot") {
            return Destination::Font;
        }

        match mime_guess::from_ext(&ext).first() {
            Some(m) if m.essence_str() == "text/html" => Destination::Document,
            Some(m) if m.type_() == mime::IMAGE => Destination::Image,
            Some(m) if m.type_() == mime::FONT => Destination::Font,
            Some(m) if m.essence_str() == "text/css" => Destination::Style,
            Some(m) if m.subtype() == mime::JAVASCRIPT => Destination::Script,
            _ => Destination::Other,
        }
    }

    /// Media destinations are served cache-first.
    pub fn is_media(&self) -> bool {
        matches!(self, Destination::Image | Destination::Font)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Image => "image",
            Destination::Font => "font",
            Destination::Style => "style",
            Destination::Script => "script",
            Destination::Other => "other",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "document" => Ok(Destination::Document),
            "image" => Ok(Destination::Image),
            "font" => Ok(Destination::Font),
            "style" => Ok(Destination::Style),
            "script" => Ok(Destination::Script),
            "other" | "" => Ok(Destination::Other),
            other => Err(NetError::InvalidDestination(other.to_string())),
        }
    }
}
