//! Lexicon-based review sentiment
//!
//! The pipeline only depends on the `SentimentScorer` trait: a scorer maps one
//! cleaned review to a compound polarity in [-1, 1]. `analyze` averages the
//! per-review polarity and buckets it into a `SentimentLabel`.
//!
//! `LexiconScorer` is the bundled scorer. It follows the valence-aware
//! approach: summed word valences with negation, booster words, contrastive
//! "but", and exclamation emphasis, normalized by `x / sqrt(x^2 + 15)`. Its
//! word list can be replaced by a VADER-format lexicon file.

use crate::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Summary label for a product's reviews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    #[serde(rename = "Highly Positive")]
    HighlyPositive,
    #[serde(rename = "Positive")]
    Positive,
    #[serde(rename = "Mixed")]
    Mixed,
    #[serde(rename = "Negative")]
    Negative,
    #[serde(rename = "Highly Negative")]
    HighlyNegative,
    #[serde(rename = "No Reviews")]
    NoReviews,
}

impl SentimentLabel {
    /// Buckets an average compound score
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            Self::HighlyPositive
        } else if score >= 0.3 {
            Self::Positive
        } else if score >= -0.3 {
            Self::Mixed
        } else if score >= -0.7 {
            Self::Negative
        } else {
            Self::HighlyNegative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighlyPositive => "Highly Positive",
            Self::Positive => "Positive",
            Self::Mixed => "Mixed",
            Self::Negative => "Negative",
            Self::HighlyNegative => "Highly Negative",
            Self::NoReviews => "No Reviews",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Highly Positive" => Some(Self::HighlyPositive),
            "Positive" => Some(Self::Positive),
            "Mixed" => Some(Self::Mixed),
            "Negative" => Some(Self::Negative),
            "Highly Negative" => Some(Self::HighlyNegative),
            "No Reviews" => Some(Self::NoReviews),
            _ => None,
        }
    }

    /// All labels, most positive first
    pub fn all() -> [Self; 6] {
        [
            Self::HighlyPositive,
            Self::Positive,
            Self::Mixed,
            Self::Negative,
            Self::HighlyNegative,
            Self::NoReviews,
        ]
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores one cleaned piece of text
pub trait SentimentScorer: Send + Sync {
    /// Compound polarity in [-1, 1]
    fn polarity(&self, text: &str) -> f64;
}

/// Text normalizer applied to every review before scoring
///
/// Replaces the encoded apostrophe entity, turns runs of non-ASCII characters
/// into a space, collapses whitespace and trims. Cleaning is idempotent.
pub struct TextCleaner {
    non_ascii: Regex,
    whitespace: Regex,
}

impl TextCleaner {
    pub fn new() -> Self {
        Self {
            non_ascii: Regex::new(r"[^\x00-\x7F]+").expect("static pattern"),
            whitespace: Regex::new(r"\s+").expect("static pattern"),
        }
    }

    pub fn clean(&self, text: &str) -> String {
        let text = text.replace("&#39;", "'");
        let text = self.non_ascii.replace_all(&text, " ");
        let text = self.whitespace.replace_all(&text, " ");
        text.trim().to_string()
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// Averages review polarity and labels the result
///
/// An empty review list is `(NoReviews, 0.0)`.
pub fn analyze<S, T>(scorer: &S, cleaner: &TextCleaner, texts: &[T]) -> (SentimentLabel, f64)
where
    S: SentimentScorer + ?Sized,
    T: AsRef<str>,
{
    if texts.is_empty() {
        return (SentimentLabel::NoReviews, 0.0);
    }

    let total: f64 = texts
        .iter()
        .map(|text| scorer.polarity(&cleaner.clean(text.as_ref())))
        .sum();
    let average = total / texts.len() as f64;

    tracing::debug!("Average sentiment over {} reviews: {:.4}", texts.len(), average);

    (SentimentLabel::from_score(average), average)
}

const NORMALIZATION_ALPHA: f64 = 15.0;
const BOOSTER_INCREMENT: f64 = 0.293;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nothing", "neither", "nor", "without", "cannot", "can't",
    "cant", "don't", "dont", "doesn't", "doesnt", "didn't", "didnt", "isn't", "isnt", "wasn't",
    "wasnt", "won't", "wont", "wouldn't", "wouldnt", "shouldn't", "aren't", "ain't", "hardly",
];

const BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", BOOSTER_INCREMENT),
    ("completely", BOOSTER_INCREMENT),
    ("extremely", BOOSTER_INCREMENT),
    ("highly", BOOSTER_INCREMENT),
    ("incredibly", BOOSTER_INCREMENT),
    ("really", BOOSTER_INCREMENT),
    ("so", BOOSTER_INCREMENT),
    ("super", BOOSTER_INCREMENT),
    ("totally", BOOSTER_INCREMENT),
    ("very", BOOSTER_INCREMENT),
    ("barely", -BOOSTER_INCREMENT),
    ("kinda", -BOOSTER_INCREMENT),
    ("slightly", -BOOSTER_INCREMENT),
    ("somewhat", -BOOSTER_INCREMENT),
];

/// Valences on the -4..4 scale used by VADER-format lexicons
const BUILTIN_LEXICON: &[(&str, f64)] = &[
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("beautiful", 2.9),
    ("best", 3.2),
    ("better", 1.9),
    ("comfortable", 1.5),
    ("delicious", 2.7),
    ("easy", 1.9),
    ("effective", 2.1),
    ("excellent", 2.7),
    ("fantastic", 2.6),
    ("favorite", 2.0),
    ("fine", 0.8),
    ("fresh", 1.3),
    ("glad", 2.0),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("helpful", 1.8),
    ("helps", 1.4),
    ("like", 1.5),
    ("love", 3.2),
    ("loved", 2.9),
    ("loves", 2.7),
    ("nice", 1.8),
    ("ok", 0.9),
    ("okay", 0.9),
    ("perfect", 2.7),
    ("pleased", 1.9),
    ("recommend", 1.5),
    ("recommended", 1.6),
    ("satisfied", 1.8),
    ("tasty", 2.1),
    ("thanks", 1.9),
    ("wonderful", 2.7),
    ("worth", 0.9),
    ("angry", -2.3),
    ("annoying", -1.7),
    ("awful", -2.0),
    ("bad", -2.5),
    ("boring", -1.3),
    ("broke", -1.8),
    ("broken", -2.1),
    ("damaged", -2.2),
    ("defective", -1.9),
    ("disappointed", -1.9),
    ("disappointing", -2.2),
    ("disgusting", -2.4),
    ("expired", -1.3),
    ("fail", -2.3),
    ("failed", -2.3),
    ("fake", -2.1),
    ("gross", -2.1),
    ("hate", -2.7),
    ("hated", -3.2),
    ("horrible", -2.5),
    ("hurt", -2.4),
    ("mediocre", -1.0),
    ("pain", -2.3),
    ("poor", -2.1),
    ("problem", -1.7),
    ("problems", -1.7),
    ("sad", -2.1),
    ("sick", -2.0),
    ("terrible", -2.1),
    ("unhappy", -1.8),
    ("useless", -1.8),
    ("waste", -1.8),
    ("wasted", -2.2),
    ("weak", -1.9),
    ("worse", -2.1),
    ("worst", -3.1),
    ("wrong", -2.1),
];

/// Word-valence sentiment scorer
pub struct LexiconScorer {
    lexicon: HashMap<String, f64>,
}

impl LexiconScorer {
    /// Scorer backed by the built-in word list
    pub fn builtin() -> Self {
        Self {
            lexicon: BUILTIN_LEXICON
                .iter()
                .map(|(word, valence)| (word.to_string(), *valence))
                .collect(),
        }
    }

    /// Scorer backed by a VADER-format lexicon (`token<TAB>mean<TAB>...`)
    pub fn from_lexicon_str(content: &str) -> Result<Self, ConfigError> {
        let mut lexicon = HashMap::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut columns = line.split('\t');
            let token = columns.next().unwrap_or_default().trim();
            let valence = columns
                .next()
                .and_then(|v| v.trim().parse::<f64>().ok())
                .ok_or_else(|| {
                    ConfigError::Lexicon(format!("line {}: missing valence", line_no + 1))
                })?;
            lexicon.insert(token.to_lowercase(), valence);
        }

        if lexicon.is_empty() {
            return Err(ConfigError::Lexicon("lexicon is empty".to_string()));
        }
        Ok(Self { lexicon })
    }

    /// Loads a VADER-format lexicon file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_lexicon_str(&content)
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|t| {
                t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                    .to_lowercase()
            })
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn booster(token: &str) -> Option<f64> {
        BOOSTERS
            .iter()
            .find(|(word, _)| *word == token)
            .map(|(_, inc)| *inc)
    }

    fn valence_at(&self, tokens: &[String], i: usize) -> f64 {
        let Some(&base) = self.lexicon.get(&tokens[i]) else {
            return 0.0;
        };

        let mut valence = base;
        for distance in 1..=3 {
            if i < distance {
                break;
            }
            let previous = tokens[i - distance].as_str();
            if let Some(inc) = Self::booster(previous) {
                // boosters fade with distance
                let scaled = match distance {
                    1 => inc,
                    2 => inc * 0.95,
                    _ => inc * 0.9,
                };
                valence += if valence < 0.0 { -scaled } else { scaled };
            }
            if NEGATIONS.contains(&previous) {
                valence *= NEGATION_SCALAR;
            }
        }
        valence
    }
}

impl SentimentScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        let tokens = Self::tokenize(text);
        if tokens.is_empty() {
            return 0.0;
        }

        let mut valences: Vec<f64> = (0..tokens.len())
            .map(|i| self.valence_at(&tokens, i))
            .collect();

        // contrastive "but": damp what precedes, stress what follows
        if let Some(pivot) = tokens.iter().position(|t| t == "but") {
            for (i, v) in valences.iter_mut().enumerate() {
                if i < pivot {
                    *v *= 0.5;
                } else if i > pivot {
                    *v *= 1.5;
                }
            }
        }

        let mut sum: f64 = valences.iter().sum();
        if sum != 0.0 {
            let bangs = text.matches('!').count().min(MAX_EXCLAMATIONS) as f64;
            let emphasis = bangs * EXCLAMATION_INCREMENT;
            sum += if sum > 0.0 { emphasis } else { -emphasis };
        }

        let compound = sum / (sum * sum + NORMALIZATION_ALPHA).sqrt();
        compound.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScorer(f64);

    impl SentimentScorer for FixedScorer {
        fn polarity(&self, _text: &str) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_empty_reviews_are_no_reviews() {
        let scorer = LexiconScorer::builtin();
        let cleaner = TextCleaner::new();
        let texts: Vec<String> = vec![];
        assert_eq!(
            analyze(&scorer, &cleaner, &texts),
            (SentimentLabel::NoReviews, 0.0)
        );
    }

    #[test]
    fn test_label_thresholds() {
        assert_eq!(SentimentLabel::from_score(0.7), SentimentLabel::HighlyPositive);
        assert_eq!(SentimentLabel::from_score(0.69), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(0.3), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(0.29), SentimentLabel::Mixed);
        assert_eq!(SentimentLabel::from_score(-0.3), SentimentLabel::Mixed);
        assert_eq!(SentimentLabel::from_score(-0.31), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(-0.7), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(-0.71), SentimentLabel::HighlyNegative);
    }

    #[test]
    fn test_analyze_averages_scores() {
        let cleaner = TextCleaner::new();
        let (label, score) = analyze(&FixedScorer(0.5), &cleaner, &["a", "b"]);
        assert_eq!(label, SentimentLabel::Positive);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_clean_text() {
        let cleaner = TextCleaner::new();
        assert_eq!(cleaner.clean("  It&#39;s   great\u{2014}really \n"), "It's great really");
        assert_eq!(cleaner.clean("caf\u{e9} ok"), "caf ok");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let cleaner = TextCleaner::new();
        for text in ["  a \t b  ", "It&#39;s\u{00a0}fine", "\u{1F600}\u{1F600} wow", ""] {
            let once = cleaner.clean(text);
            assert_eq!(cleaner.clean(&once), once);
        }
    }

    #[test]
    fn test_whitespace_differences_do_not_change_sentiment() {
        let scorer = LexiconScorer::builtin();
        let cleaner = TextCleaner::new();
        let a = analyze(&scorer, &cleaner, &["This is  a great product"]);
        let b = analyze(&scorer, &cleaner, &["This is a\n great   product  "]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_lexicon_polarity_direction() {
        let scorer = LexiconScorer::builtin();
        assert!(scorer.polarity("I love this, it works great") > 0.5);
        assert!(scorer.polarity("terrible, broken and useless") < -0.5);
        assert_eq!(scorer.polarity("arrived on tuesday"), 0.0);
    }

    #[test]
    fn test_negation_flips_polarity() {
        let scorer = LexiconScorer::builtin();
        assert!(scorer.polarity("good") > 0.0);
        assert!(scorer.polarity("not good") < 0.0);
    }

    #[test]
    fn test_booster_and_exclamation_intensify() {
        let scorer = LexiconScorer::builtin();
        let plain = scorer.polarity("good");
        assert!(scorer.polarity("very good") > plain);
        assert!(scorer.polarity("good!!") > plain);
    }

    #[test]
    fn test_but_shifts_weight_to_second_clause() {
        let scorer = LexiconScorer::builtin();
        assert!(scorer.polarity("the taste is good but the capsules are awful") < 0.0);
    }

    #[test]
    fn test_polarity_is_bounded() {
        let scorer = LexiconScorer::builtin();
        let text = "love ".repeat(200);
        let p = scorer.polarity(&text);
        assert!(p <= 1.0 && p > 0.99);
    }

    #[test]
    fn test_lexicon_from_str() {
        let scorer =
            LexiconScorer::from_lexicon_str("splendid\t2.5\t0.5\t[2, 3]\nmeh\t-0.4\t0.3\t[]\n")
                .unwrap();
        assert_eq!(scorer.len(), 2);
        assert!(scorer.polarity("splendid") > 0.0);
        assert!(scorer.polarity("meh") < 0.0);
        assert_eq!(scorer.polarity("good"), 0.0);
    }

    #[test]
    fn test_lexicon_from_str_rejects_bad_lines() {
        assert!(LexiconScorer::from_lexicon_str("word-without-valence\n").is_err());
        assert!(LexiconScorer::from_lexicon_str("\n\n").is_err());
    }

    #[test]
    fn test_label_string_roundtrip() {
        for label in SentimentLabel::all() {
            assert_eq!(SentimentLabel::parse(label.as_str()), Some(label));
        }
        assert_eq!(SentimentLabel::parse("Ecstatic"), None);
    }
}
