use std::collections::HashSet;

const POSITIVE_WORDS: &[&str] = &[
    "growth", "profit", "increase", "expansion", "stability", "surplus",
    "dividend", "recovery", "rebound", "robust", "strong", "improved",
    "exceeded", "record", "upgrade", "accretive", "stable", "compliant",
    "transparent", "solvent", "gain", "momentum", "outperform",
];

const NEGATIVE_WORDS: &[&str] = &[
    "loss", "deficit", "impairment", "liability", "uncertain", "default",
    "restatement", "investigation", "lawsuit", "litigation", "downgrade",
    "writedown", "write-off", "fraud", "penalty", "qualified", "adverse",
    "decline", "contraction", "insolvency", "bankruptcy", "probe",
    "dilution", "headwind", "weak",
];

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "without", "neither", "nor", "hardly", "barely",
];

/// How many words back a negation flips the polarity of a match.
const NEGATION_WINDOW: usize = 3;

/// Damping added to the match count so a single hit cannot swing the score
/// to an extreme.
const SCORE_DAMPING: f64 = 2.0;

/// Deterministic lexicon tone score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexiconScore {
    /// 0-100, 50 is neutral, higher is more positive.
    pub score: f64,
    /// Number of polarity-bearing terms matched.
    pub matched_terms: usize,
    /// Total words scanned.
    pub scanned_words: usize,
}

/// Score the tone of a document plus optional headlines on the 0-100 scale.
///
/// Polarity words are tallied with a small negation window ("no material
/// growth" counts against growth); the tally is normalized by the damped
/// match count. Returns `None` when there is no text at all to scan; an
/// empty corpus has no tone, which is different from a neutral one.
pub fn tone_score(document: &str, headlines: &[String]) -> Option<LexiconScore> {
    let mut corpus = String::with_capacity(
        document.len() + headlines.iter().map(|h| h.len() + 1).sum::<usize>(),
    );
    corpus.push_str(document);
    for headline in headlines {
        corpus.push(' ');
        corpus.push_str(headline);
    }
    if corpus.trim().is_empty() {
        return None;
    }

    let lower = corpus.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '(' | ')' | '"'))
        .filter(|w| !w.is_empty())
        .collect();

    let positive: HashSet<&str> = POSITIVE_WORDS.iter().copied().collect();
    let negative: HashSet<&str> = NEGATIVE_WORDS.iter().copied().collect();
    let negation: HashSet<&str> = NEGATION_WORDS.iter().copied().collect();

    let negation_positions: Vec<usize> = words
        .iter()
        .enumerate()
        .filter(|(_, w)| negation.contains(*w))
        .map(|(i, _)| i)
        .collect();

    let mut tally: i64 = 0;
    let mut matched = 0usize;
    for (i, word) in words.iter().enumerate() {
        let polarity = if positive.contains(word) {
            1
        } else if negative.contains(word) {
            -1
        } else {
            continue;
        };
        matched += 1;

        let negated = negation_positions
            .iter()
            .any(|&neg| neg < i && i - neg <= NEGATION_WINDOW);
        tally += if negated { -polarity } else { polarity };
    }

    let score = 50.0 + 50.0 * tally as f64 / (matched as f64 + SCORE_DAMPING);
    Some(LexiconScore {
        score: score.clamp(0.0, 100.0),
        matched_terms: matched,
        scanned_words: words.len(),
    })
}
