use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::manifest::Rendition;

/// Renditions recovered from a manifest, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedManifest {
    pub renditions: Vec<Rendition>,
    /// The tokenizer hit malformed markup and stopped early.
    pub truncated: bool,
}

/// A `Representation` element being assembled.
#[derive(Default)]
struct PendingRendition {
    bandwidth: Option<u64>,
    label: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    url_attr: Option<String>,
    base_url: String,
}

impl PendingRendition {
    fn from_element(e: &BytesStart<'_>) -> Self {
        let mut pending = PendingRendition::default();
        for attr in e.attributes().flatten() {
            let Some(value) = attribute_value(&attr.value) else {
                continue;
            };
            match attr.key.local_name().as_ref() {
                b"bandwidth" => pending.bandwidth = value.trim().parse().ok(),
                b"FBQualityLabel" | b"qualityLabel" | b"label" => {
                    if !value.trim().is_empty() {
                        pending.label = Some(value.trim().to_string());
                    }
                }
                b"width" => pending.width = value.trim().parse().ok(),
                b"height" => pending.height = value.trim().parse().ok(),
                b"url" | b"src" => pending.url_attr = Some(value.trim().to_string()),
                _ => {}
            }
        }
        pending
    }

    /// Entries missing a bandwidth or a URL are dropped.
    fn finish(self) -> Option<Rendition> {
        let bandwidth = self.bandwidth?;
        let base_url = unescape_text(&self.base_url);
        let url = if base_url.trim().is_empty() {
            self.url_attr?
        } else {
            base_url.trim().to_string()
        };
        if url.is_empty() {
            return None;
        }

        Some(Rendition {
            bandwidth,
            quality_label: self.label,
            url,
            width: self.width,
            height: self.height,
        })
    }
}

/// Tokenizes a DASH-like manifest and collects every well-formed
/// `Representation`.
///
/// Never fails: malformed entries are skipped and a tokenizer error ends the
/// scan with whatever was collected so far.
pub fn parse_renditions(manifest: &str) -> ParsedManifest {
    let mut reader = Reader::from_str(manifest);

    let mut parsed = ParsedManifest::default();
    let mut current: Option<PendingRendition> = None;
    let mut in_base_url = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"Representation" => {
                    current = Some(PendingRendition::from_element(e));
                }
                b"BaseURL" => in_base_url = current.is_some(),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"Representation" {
                    if let Some(r) = PendingRendition::from_element(e).finish() {
                        parsed.renditions.push(r);
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"Representation" => {
                    if let Some(r) = current.take().and_then(PendingRendition::finish) {
                        parsed.renditions.push(r);
                    }
                    in_base_url = false;
                }
                b"BaseURL" => in_base_url = false,
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_base_url {
                    if let (Some(pending), Ok(text)) = (current.as_mut(), std::str::from_utf8(e)) {
                        pending.base_url.push_str(text);
                    }
                }
            }
            Ok(Event::CData(ref e)) => {
                if in_base_url {
                    if let (Some(pending), Ok(text)) = (current.as_mut(), std::str::from_utf8(e)) {
                        pending.base_url.push_str(text);
                    }
                }
            }
            Ok(Event::GeneralRef(ref e)) => {
                if in_base_url {
                    if let (Some(pending), Ok(name)) = (current.as_mut(), std::str::from_utf8(e)) {
                        pending.base_url.push('&');
                        pending.base_url.push_str(name);
                        pending.base_url.push(';');
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::debug!(
                    "Manifest tokenizer stopped at byte {}: {}",
                    reader.buffer_position(),
                    e
                );
                parsed.truncated = true;
                break;
            }
            _ => {}
        }
    }

    parsed
}

fn attribute_value(raw: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(raw).ok()?;
    Some(unescape_text(text))
}

fn unescape_text(text: &str) -> String {
    match quick_xml::escape::unescape(text) {
        Ok(s) => s.into_owned(),
        Err(_) => text.to_string(),
    }
}
