pub(crate) const PHRASE_START: &str = "phrase_start";
pub(crate) const PHRASE_END: &str = "phrase_end";
pub(crate) const LYRIC_PREFIX: &str = "lyric ";
pub(crate) const SOLO_START: &str = "solo";
pub(crate) const SOLO_END: &str = "soloend";

pub(crate) const ENHANCED_OPENS: &str = "ENHANCED_OPENS";
pub(crate) const CHART_DYNAMICS: &str = "ENABLE_CHART_DYNAMICS";

/// Strips surrounding whitespace, quotes and one pair of brackets.
pub(crate) fn normalize_event_text(text: &str) -> &str {
    let mut text = text.trim();
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        text = text[1..text.len() - 1].trim();
    }
    if let Some(inner) = text.strip_prefix('[') {
        text = inner.strip_suffix(']').unwrap_or(inner).trim();
    }
    text
}

/// Name of a practice section marker, if `text` is one.
pub(crate) fn parse_section_name(text: &str) -> Option<&str> {
    let text = normalize_event_text(text);
    let name = text
        .strip_prefix("section ")
        .or_else(|| text.strip_prefix("section_"))
        .or_else(|| text.strip_prefix("prc_"))?;
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

pub(crate) fn is_lyric_event(text: &str) -> bool {
    text.starts_with(LYRIC_PREFIX) || text == PHRASE_START || text == PHRASE_END
}
