// Quality selector - deterministic stream selection
//
// Policy (deliberate deviation from the origin's first-in-list fallback,
// which depended on upstream listing order): an exact label match wins;
// otherwise the highest-ranked label present wins, ties broken by listing
// order. Upstream lists are not quality-sorted, so ranking here keeps the
// choice stable across providers.

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::EngineError;
use crate::models::{MediaDescriptor, QualityLabel, StreamVariant};

/// Pick the variant for a requested quality.
///
/// `NoMatchingQuality` only when the descriptor has no streams at all
/// (the placeholder case) - callers treat that as terminal.
pub fn select_stream<'a>(
    descriptor: &'a MediaDescriptor,
    requested: QualityLabel,
) -> Result<&'a StreamVariant, EngineError> {
    if descriptor.streams.is_empty() {
        return Err(EngineError::NoMatchingQuality {
            requested: requested.to_string(),
        });
    }

    if requested != QualityLabel::Unknown {
        if let Some(exact) = descriptor
            .streams
            .iter()
            .find(|s| s.quality_label == requested)
        {
            return Ok(exact);
        }
    }

    // Best available default: widest quality present.
    best_available(&descriptor.streams).ok_or_else(|| EngineError::NoMatchingQuality {
        requested: requested.to_string(),
    })
}

/// Highest-ranked variant in a list; ties keep the earlier entry.
pub fn best_available(streams: &[StreamVariant]) -> Option<&StreamVariant> {
    streams
        .iter()
        .min_by_key(|s| s.quality_label.ordinal())
}

lazy_static! {
    static ref HEIGHT_RE: Regex = Regex::new(r"(\d{3,4})").unwrap();
}

/// Parse loose upstream quality tokens like `"hd720"`, `"720"` or
/// `"1280x720"` into the bounded vocabulary.
pub fn parse_loose_quality(token: &str) -> QualityLabel {
    let exact = QualityLabel::parse(token);
    if exact != QualityLabel::Unknown {
        return exact;
    }

    // "1280x720" carries width first; the height is the last number.
    if let Some(m) = HEIGHT_RE.find_iter(token).last() {
        if let Ok(height) = m.as_str().parse::<u32>() {
            return QualityLabel::from_height(height);
        }
    }

    QualityLabel::Unknown
}
