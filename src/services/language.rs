use whatlang::Lang;

/// Below this length there is not enough signal for trigram detection.
const MIN_DETECT_LEN: usize = 10;

/// Below this combined length we give the benefit of the doubt entirely.
const MIN_JUDGE_LEN: usize = 20;

/// Languages we accept as English. whatlang has no separate code for Scots,
/// the classic short-text confusion; unreliable detections fall through to
/// "undetermined" instead.
const ACCEPTED_LANGS: &[Lang] = &[Lang::Eng];

/// Statistical language identification. Returns `None` when the text is too
/// short or the detector is not confident enough to decide.
pub fn detect_language(text: &str) -> Option<Lang> {
    if text.len() < MIN_DETECT_LEN {
        return None;
    }

    whatlang::detect(text)
        .filter(|info| info.is_reliable())
        .map(|info| info.lang())
}

/// Whether the article text reads as English. Short or undetermined input is
/// treated as English rather than rejected.
pub fn is_english_like(title: &str, description: &str) -> bool {
    let combined = format!("{} {}", title, description);
    let combined = combined.trim();

    if combined.chars().count() < MIN_JUDGE_LEN {
        return true;
    }

    match detect_language(combined) {
        None => true,
        Some(lang) => ACCEPTED_LANGS.contains(&lang),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gets_benefit_of_the_doubt() {
        assert!(is_english_like("", ""));
        assert!(is_english_like("Hi", ""));
    }

    #[test]
    fn english_text_is_accepted() {
        assert!(is_english_like(
            "Community garden feeds hundreds",
            "Volunteers in a small town have grown enough vegetables to supply the local food bank all winter."
        ));
    }

    #[test]
    fn french_text_is_rejected() {
        assert!(!is_english_like(
            "Bonjour le monde",
            "ceci est un texte francais assez long pour etre detecte"
        ));
    }

    #[test]
    fn short_text_is_undetermined() {
        assert_eq!(detect_language("ok"), None);
    }
}
