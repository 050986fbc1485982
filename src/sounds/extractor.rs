/// Audio element extraction from listing markup
use super::SoundDescriptor;
use crate::error::{ArchiveError, Result};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Standard alphabet, accepting sources with or without `=` padding
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const AUDIO_SELECTOR: &str = "audio[src]";
const ARTICLE_SELECTOR: &str = "div.art-article";
const HEADER_SELECTOR: &str = "blockquote.art-postheader";

/// Extracts sound descriptors from listing pages of one site
#[derive(Debug, Clone)]
pub struct SoundExtractor {
    base_url: Url,
    audio: Selector,
    article: Selector,
    header: Selector,
    leading_number: Regex,
}

impl SoundExtractor {
    /// Create an extractor resolving media paths against `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ArchiveError::Config(format!("invalid base URL '{}': {}", base_url, e)))?;

        Ok(Self {
            base_url,
            audio: parse_selector(AUDIO_SELECTOR)?,
            article: parse_selector(ARTICLE_SELECTOR)?,
            header: parse_selector(HEADER_SELECTOR)?,
            leading_number: Regex::new(r"^\d+\s+")
                .map_err(|e| ArchiveError::Config(e.to_string()))?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Extract every decodable audio element, in document order.
    ///
    /// Elements whose source cannot be decoded are logged and dropped; the
    /// rest of the page is still extracted. A page without audio elements
    /// yields an empty vector.
    pub fn extract(&self, markup: &str) -> Vec<SoundDescriptor> {
        let document = Html::parse_document(markup);
        let headers = self.headers_by_article(&document);

        let mut sounds = Vec::new();

        for (position, audio) in document.select(&self.audio).enumerate() {
            let sequence_index = position + 1;
            let src = audio.value().attr("src").unwrap_or_default();

            let (decoded_path, source_url) = match self.decode_source(src) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("Skipping audio element {}: {}", sequence_index, e);
                    continue;
                }
            };

            let filename = match filename_from_path(&decoded_path) {
                Some(filename) => filename,
                None => {
                    warn!(
                        "Skipping audio element {}: no usable filename in '{}'",
                        sequence_index, decoded_path
                    );
                    continue;
                }
            };

            let title = self
                .enclosing_article(&audio)
                .and_then(|article| {
                    headers
                        .iter()
                        .find(|(container, _)| *container == article)
                        .map(|(_, text)| self.clean_title(text))
                })
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| format!("Sound {}", sequence_index));

            debug!("Extracted sound {}: '{}' -> {}", sequence_index, title, source_url);

            sounds.push(SoundDescriptor {
                sequence_index,
                title,
                source_url,
                filename,
            });
        }

        sounds
    }

    /// Decode an obfuscated `src` value into its relative path and absolute URL
    pub fn decode_source(&self, src: &str) -> Result<(String, String)> {
        let encoded = src.trim().trim_start_matches('/');
        if encoded.is_empty() {
            return Err(ArchiveError::decode(src, "empty source"));
        }

        let bytes = LENIENT_BASE64
            .decode(encoded)
            .map_err(|e| ArchiveError::decode(src, e))?;
        let decoded_path = String::from_utf8(bytes).map_err(|e| ArchiveError::decode(src, e))?;

        let source_url = self
            .base_url
            .join(&decoded_path)
            .map_err(|e| ArchiveError::decode(src, e))?;

        Ok((decoded_path, source_url.to_string()))
    }

    /// Strip the numbering prefix of a heading and normalize its whitespace
    pub fn clean_title(&self, raw: &str) -> String {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        self.leading_number.replace(&collapsed, "").into_owned()
    }

    fn enclosing_article<'a>(&self, audio: &ElementRef<'a>) -> Option<ElementRef<'a>> {
        audio
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|element| self.article.matches(element))
    }

    /// Map every article container to the text of the nearest heading
    /// preceding it in document order.
    fn headers_by_article<'a>(&self, document: &'a Html) -> Vec<(ElementRef<'a>, String)> {
        let mut headers = Vec::new();
        let mut last_header: Option<String> = None;

        for node in document.root_element().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };

            if self.article.matches(&element) {
                if let Some(text) = &last_header {
                    headers.push((element, text.clone()));
                }
            }

            // A heading only counts for containers that start after it
            if self.header.matches(&element) {
                last_header = Some(element.text().collect::<Vec<_>>().join(" "));
            }
        }

        headers
    }
}

/// Convenience wrapper building a one-off extractor
pub fn extract_sounds(markup: &str, base_url: &str) -> Result<Vec<SoundDescriptor>> {
    Ok(SoundExtractor::new(base_url)?.extract(markup))
}

/// Last `/`-separated segment of a decoded media path
pub fn filename_from_path(path: &str) -> Option<String> {
    let filename = path.rsplit('/').next().unwrap_or_default().trim();
    match filename {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ArchiveError::Config(format!("invalid selector '{}': {:?}", selector, e)))
}
