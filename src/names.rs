//! Player-name normalization and matching.
//!
//! The dataset and the stats feed spell names differently: accents, "Jr.",
//! "Last, First" order, stray punctuation. Both sides are reduced to a
//! [`NormalizedName`] before comparing.

use std::fmt;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    Jr,
    Sr,
    II,
    III,
    IV,
}

impl Suffix {
    fn from_token(token: &str) -> Option<Self> {
        match token.trim_end_matches('.') {
            "jr" => Some(Suffix::Jr),
            "sr" => Some(Suffix::Sr),
            "ii" => Some(Suffix::II),
            "iii" => Some(Suffix::III),
            "iv" => Some(Suffix::IV),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Suffix::Jr => "jr",
            Suffix::Sr => "sr",
            Suffix::II => "ii",
            Suffix::III => "iii",
            Suffix::IV => "iv",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedName {
    pub first: String,
    pub last: String,
    pub suffix: Option<Suffix>,
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        if !self.last.is_empty() {
            write!(f, " {}", self.last)?;
        }
        if let Some(suffix) = self.suffix {
            write!(f, " {}", suffix.as_str())?;
        }
        Ok(())
    }
}

/// Lowercase, strip accents.
fn fold(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Keep letters, digits and single spaces.
fn clean(part: &str) -> String {
    part.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pops a trailing suffix token ("jr", "jr.", ", jr") off `text`.
fn take_suffix(text: &str) -> (&str, Option<Suffix>) {
    let trimmed = text.trim_end().trim_end_matches(',').trim_end();
    let split_at = trimmed
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace() || *c == ',')
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    if split_at == 0 {
        return (trimmed, None);
    }

    match Suffix::from_token(&trimmed[split_at..]) {
        Some(suffix) => {
            let rest = trimmed[..split_at].trim_end().trim_end_matches(',').trim_end();
            (rest, Some(suffix))
        }
        None => (trimmed, None),
    }
}

pub fn normalize(name: &str) -> NormalizedName {
    let folded = fold(name.trim());
    let (rest, mut suffix) = take_suffix(&folded);

    let parts: Vec<&str> = rest.split(',').collect();
    let (first, last) = if parts.len() == 2 && !parts[0].trim().is_empty() && !parts[1].trim().is_empty() {
        // "Acuña Jr., Ronald"
        let (last, last_suffix) = take_suffix(parts[0]);
        suffix = suffix.or(last_suffix);
        (clean(parts[1]), clean(last))
    } else {
        let cleaned = clean(rest);
        match cleaned.split_once(' ') {
            Some((first, last)) => (first.to_string(), last.to_string()),
            None => (cleaned, String::new()),
        }
    };

    NormalizedName { first, last, suffix }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NameMatch {
    Exact,
    Swapped,
    Fuzzy(f64),
    SuffixMismatch,
    NoMatch,
}

impl NameMatch {
    pub fn is_match(&self) -> bool {
        matches!(self, NameMatch::Exact | NameMatch::Swapped | NameMatch::Fuzzy(_))
    }
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diagonal = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb { diagonal + 1 } else { above.max(row[j]) };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Indel similarity of two strings on a 0-100 scale: `2 * M / (len_a + len_b)`
/// where `M` is the length of their longest common subsequence.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * longest_common_subsequence(&a, &b) as f64 / total as f64
}

/// Compare a dataset name against a feed name, both already normalized.
pub fn compare(dataset: &NormalizedName, feed: &NormalizedName, threshold: f64) -> NameMatch {
    if dataset.suffix == feed.suffix {
        if dataset.first == feed.first && dataset.last == feed.last {
            return NameMatch::Exact;
        }
        if dataset.first == feed.last && dataset.last == feed.first {
            return NameMatch::Swapped;
        }
    }

    let feed_full = format!("{} {}", feed.first, feed.last);
    let forward = similarity(&format!("{} {}", dataset.first, dataset.last), &feed_full);
    let reversed = similarity(&format!("{} {}", dataset.last, dataset.first), &feed_full);
    let score = forward.max(reversed);

    if score < threshold {
        NameMatch::NoMatch
    } else if dataset.suffix != feed.suffix {
        NameMatch::SuffixMismatch
    } else {
        NameMatch::Fuzzy(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(first: &str, last: &str, suffix: Option<Suffix>) -> NormalizedName {
        NormalizedName {
            first: first.to_string(),
            last: last.to_string(),
            suffix,
        }
    }

    #[test]
    fn strips_accents_and_suffix() {
        assert_eq!(normalize("Ronald Acuña Jr."), name("ronald", "acuna", Some(Suffix::Jr)));
        assert_eq!(normalize("Ronald Acuna Jr"), name("ronald", "acuna", Some(Suffix::Jr)));
        assert_eq!(normalize("ronald acuna, jr"), name("ronald", "acuna", Some(Suffix::Jr)));
    }

    #[test]
    fn accent_only_differences_are_equal() {
        assert_eq!(normalize("Teoscar Hernández"), normalize("Teoscar Hernandez"));
        assert_eq!(normalize("Andrés Giménez"), normalize("ANDRES GIMENEZ"));
    }

    #[test]
    fn last_first_order() {
        assert_eq!(normalize("Acuña Jr., Ronald"), name("ronald", "acuna", Some(Suffix::Jr)));
        assert_eq!(normalize("Judge, Aaron"), normalize("Aaron Judge"));
    }

    #[test]
    fn multi_word_last_name_and_punctuation() {
        assert_eq!(normalize("Elly De La Cruz"), name("elly", "de la cruz", None));
        assert_eq!(normalize("Ke'Bryan  Hayes"), name("kebryan", "hayes", None));
        assert_eq!(normalize("J.P. Crawford"), name("jp", "crawford", None));
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "Ronald Acuña Jr.",
            "Vladimir Guerrero Jr.",
            "Acuña Jr., Ronald",
            "Elly De La Cruz",
            "Ohtani",
            "Ken Griffey Sr.",
            "",
        ] {
            let once = normalize(raw);
            let twice = normalize(&once.to_string());
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn exact_and_swapped_matches() {
        let feed = normalize("Aaron Judge");
        assert_eq!(compare(&normalize("Aaron Judge"), &feed, 80.0), NameMatch::Exact);
        assert_eq!(compare(&normalize("Judge Aaron"), &feed, 80.0), NameMatch::Swapped);
    }

    #[test]
    fn fuzzy_match_requires_suffix_agreement() {
        let feed = normalize("Vladimir Guerrero Jr.");
        assert!(matches!(
            compare(&normalize("Vladamir Guerrero Jr."), &feed, 80.0),
            NameMatch::Fuzzy(_)
        ));
        assert_eq!(
            compare(&normalize("Vladimir Guerrero"), &feed, 80.0),
            NameMatch::SuffixMismatch
        );
    }

    #[test]
    fn similarity_is_an_indel_ratio() {
        // 15 common characters over 16 + 19
        let score = similarity("mike yastrzemski", "michael yastrzemski");
        assert!((score - 3000.0 / 35.0).abs() < 1e-6, "got {score}");
        assert_eq!(similarity("aaron judge", "aaron judge"), 100.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("", ""), 100.0);
    }

    #[test]
    fn shortened_first_name_is_a_fuzzy_match() {
        let result = compare(&normalize("Mike Yastrzemski"), &normalize("Michael Yastrzemski"), 80.0);
        assert!(matches!(result, NameMatch::Fuzzy(score) if score > 85.0));
        assert!(result.is_match());
    }

    #[test]
    fn different_players_do_not_match() {
        let feed = normalize("Aaron Judge");
        let result = compare(&normalize("Juan Soto"), &feed, 80.0);
        assert_eq!(result, NameMatch::NoMatch);
        assert!(!result.is_match());
    }
}
