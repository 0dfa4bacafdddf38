//! Audio/subtitle language detection.
//!
//! Every dictionary entry is tested, so a multi-audio release yields all of
//! its languages rather than the first one found.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// `(ISO 639-1 code, names | abbreviations | flags)`.
const DICTIONARY: &[(&str, &str)] = &[
    ("en", r"\b(?:english|eng)\b|🇬🇧|🇺🇸"),
    ("es", r"\b(?:spanish|español|espanol|spa|castellano|latino)\b|🇪🇸|🇲🇽"),
    ("fr", r"\b(?:french|français|francais|fre|fra|truefrench|vff|vostfr)\b|🇫🇷"),
    ("de", r"\b(?:german|deutsch|ger|deu)\b|🇩🇪"),
    ("it", r"\b(?:italian|italiano|ita)\b|🇮🇹"),
    ("pt", r"\b(?:portuguese|português|portugues|por|dublado)\b|🇵🇹|🇧🇷"),
    ("ru", r"\b(?:russian|rus)\b|🇷🇺"),
    ("ja", r"\b(?:japanese|jpn)\b|🇯🇵"),
    ("ko", r"\b(?:korean|kor)\b|🇰🇷"),
    ("zh", r"\b(?:chinese|mandarin|cantonese|chi|chs|cht)\b|🇨🇳|🇹🇼|🇭🇰"),
    ("hi", r"\b(?:hindi|hin)\b|🇮🇳"),
    ("ar", r"\b(?:arabic|ara)\b|🇸🇦|🇦🇪"),
    ("nl", r"\b(?:dutch|nld)\b|🇳🇱"),
    ("pl", r"\b(?:polish|pol)\b|🇵🇱"),
    ("tr", r"\b(?:turkish|tur)\b|🇹🇷"),
    ("sv", r"\b(?:swedish|swe)\b|🇸🇪"),
    ("no", r"\b(?:norwegian|nor)\b|🇳🇴"),
    ("da", r"\b(?:danish)\b|🇩🇰"),
    ("fi", r"\b(?:finnish|fin)\b|🇫🇮"),
    ("uk", r"\b(?:ukrainian|ukr)\b|🇺🇦"),
    ("cs", r"\b(?:czech|cze|ces)\b|🇨🇿"),
    ("hu", r"\b(?:hungarian|hun)\b|🇭🇺"),
    ("el", r"\b(?:greek|ell)\b|🇬🇷"),
    ("he", r"\b(?:hebrew|heb)\b|🇮🇱"),
    ("th", r"\b(?:thai)\b|🇹🇭"),
    ("vi", r"\b(?:vietnamese)\b|🇻🇳"),
    ("id", r"\b(?:indonesian)\b|🇮🇩"),
    ("ro", r"\b(?:romanian|ron)\b|🇷🇴"),
];

struct LanguagePattern {
    code: &'static str,
    pattern: Regex,
}

static PATTERNS: LazyLock<Vec<LanguagePattern>> = LazyLock::new(|| {
    DICTIONARY
        .iter()
        .map(|&(code, pattern)| LanguagePattern {
            code,
            pattern: Regex::new(&format!("(?i){pattern}")).expect("language pattern"),
        })
        .collect()
});

/// `en/fr` style slash pairs of two-letter codes. `ITA-ENG` is covered by the
/// dictionary words.
static PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([a-z]{2})\s?/\s?([a-z]{2})\b").expect("pair pattern"));

fn is_known_code(code: &str) -> bool {
    DICTIONARY.iter().any(|&(known, _)| known == code)
}

/// Collect every language mentioned in `text`.
pub fn detect(text: &str) -> BTreeSet<String> {
    let mut found: BTreeSet<String> = PATTERNS
        .iter()
        .filter(|lang| lang.pattern.is_match(text))
        .map(|lang| lang.code.to_string())
        .collect();

    for caps in PAIR.captures_iter(text) {
        let left = caps[1].to_ascii_lowercase();
        let right = caps[2].to_ascii_lowercase();
        if is_known_code(&left) && is_known_code(&right) {
            found.insert(left);
            found.insert(right);
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(text: &str) -> Vec<String> {
        detect(text).into_iter().collect()
    }

    #[test]
    fn collects_all_matches() {
        assert_eq!(codes("Movie.2023.MULTi.ENG.ITA.FRENCH.1080p"), ["en", "fr", "it"]);
    }

    #[test]
    fn flags() {
        assert_eq!(codes("🇬🇧 / 🇪🇸 / 🇩🇪"), ["de", "en", "es"]);
    }

    #[test]
    fn two_letter_pairs() {
        assert_eq!(codes("Dual Audio EN/JA"), ["en", "ja"]);
        assert!(codes("TV/HD").is_empty());
    }

    #[test]
    fn hyphenated_three_letter_pairs() {
        assert_eq!(codes("Movie.2020.ITA-ENG.1080p"), ["en", "it"]);
    }

    #[test]
    fn no_language_mentioned() {
        assert!(detect("Movie.2023.1080p.WEB-DL.x264").is_empty());
    }

    #[test]
    fn substrings_do_not_match() {
        // "Final" contains "fin", "Sport" contains "por"
        assert!(detect("The.Final.Sport").is_empty());
    }
}
