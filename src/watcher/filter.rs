/// Card names containing any of these keywords are treated as dividers or
/// placeholders and never counted or alarmed on.
///
/// Matching is a case-insensitive substring test, so "Training - Analyst"
/// and "INNOVATION GOLD - xyz" are both ignored. "analyst" overlaps with
/// "training" for the common divider names; both stay.
pub const IGNORED_KEYWORDS: &[&str] = &[
    "out of office",
    "training",
    "innovation",
    "divider",
    "analyst",
];

/// Decide whether a card should be ignored based on its display name.
///
/// Missing or empty names are always ignored. A whitespace-only name is
/// not empty and contains no keyword, so it is kept.
pub fn should_ignore(card_name: Option<&str>) -> bool {
    let Some(name) = card_name.filter(|name| !name.is_empty()) else {
        return true;
    };

    let clean_name = name.trim().to_lowercase();

    IGNORED_KEYWORDS
        .iter()
        .any(|keyword| clean_name.contains(keyword))
}
