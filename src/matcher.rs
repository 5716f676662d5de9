//! Fuzzy matching of playback catalog candidates against source metadata.
//!
//! Every candidate gets three sub-scores in `[0, 1]`:
//!
//! * title: bigram Dice coefficient of the normalized titles
//! * artist: bigram Dice coefficient of the normalized artist credits
//! * duration: step function over the absolute difference in seconds
//!
//! which are combined with fixed weights into one composite score:
//!
//! ```text
//! score = 0.45 * title + 0.35 * artist + 0.20 * duration
//! ```
//!
//! The matcher only ranks. Deciding whether the best candidate is good
//! enough is up to the [`Resolver`](crate::resolver::Resolver).
//!
//! Everything in here is pure and deterministic, so it can be called from any
//! number of tasks at once.

use std::{collections::HashSet, sync::LazyLock, time::Duration};

use regex_lite::Regex;

use crate::track::{CandidateMetadata, SourceDescriptor};

/// Weight of the title similarity in the composite score.
pub const TITLE_WEIGHT: f64 = 0.45;

/// Weight of the artist similarity in the composite score.
pub const ARTIST_WEIGHT: f64 = 0.35;

/// Weight of the duration similarity in the composite score.
pub const DURATION_WEIGHT: f64 = 0.20;

/// Duration score when either side has no known duration.
pub const NEUTRAL_DURATION_SCORE: f64 = 0.5;

/// Upper bounds of absolute duration difference and the score they earn.
const DURATION_STEPS: [(f64, f64); 4] = [(2.0, 1.0), (5.0, 0.8), (10.0, 0.5), (30.0, 0.2)];

/// `(feat. X)`, `[ft. X]` and `(featuring X)` credits anywhere in a title.
static FEATURING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[(\[]\s*(?:(?:feat|ft)\.|(?:feat|ft|featuring)\s)\s*[^)\]]*[)\]]")
        .expect("invalid featuring pattern")
});

/// One bracketed group at the end of a title, e.g. `[Live]` or `(2011 Mix)`.
static BRACKETED_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*[(\[][^()\[\]]*[)\]]\s*$").expect("invalid bracketed suffix pattern")
});

/// Dash-separated annotations like ` - Remastered 2009` or ` - Radio Edit`.
static DASH_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+-\s+[^-]*\b(?:remaster(?:ed)?|remix(?:ed)?|mix|live|version|edit|mono|stereo)\b.*$",
    )
    .expect("invalid dash annotation pattern")
});

/// Free-standing remaster or remix annotations, optionally with a year.
static ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:\d{4}\s+)?(?:remaster(?:ed)?|remix(?:ed)?)(?:\s+\d{4})?\b")
        .expect("invalid annotation pattern")
});

/// Outcome of scoring one candidate against one descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    pub candidate: CandidateMetadata,

    /// Composite score in `[0, 1]`.
    pub score: f64,

    pub title: f64,
    pub artist: f64,
    pub duration: f64,
}

/// Sub-scores without the candidate, so that ranking does not clone.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SubScores {
    title: f64,
    artist: f64,
    duration: f64,
}

impl SubScores {
    fn composite(self) -> f64 {
        TITLE_WEIGHT * self.title + ARTIST_WEIGHT * self.artist + DURATION_WEIGHT * self.duration
    }
}

/// Normalizes a title or artist credit for comparison.
///
/// Lowercases, strips featuring credits, trailing bracketed groups and
/// remaster/remix annotations, removes everything that is not alphanumeric
/// and collapses whitespace.
///
/// # Example
///
/// ```rust
/// use tunebridge::matcher::normalize;
///
/// assert_eq!(normalize("Song (feat. X) [Live]"), normalize("Song"));
/// ```
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut text = text.to_lowercase();

    text = FEATURING.replace_all(&text, " ").into_owned();
    text = DASH_ANNOTATION.replace(&text, "").into_owned();

    // Strip bracketed groups from the end one at a time: `Song (Live) [2011]`.
    loop {
        let stripped = BRACKETED_SUFFIX.replace(&text, "");
        if stripped.len() == text.len() {
            break;
        }
        text = stripped.into_owned();
    }

    text = ANNOTATION.replace_all(&text, " ").into_owned();

    let cleaned: String = text
        .chars()
        .filter_map(|chr| {
            if chr.is_alphanumeric() {
                Some(chr)
            } else if chr.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Bigram Dice coefficient of two already normalized strings.
///
/// Exact equality short-circuits to `1.0`; a string shorter than two
/// characters has no bigrams and scores `0.0` against anything else.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a = bigrams(a);
    let b = bigrams(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let shared = a.intersection(&b).count();

    #[expect(clippy::cast_precision_loss)]
    let dice = (2 * shared) as f64 / (a.len() + b.len()) as f64;
    dice
}

fn bigrams(text: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(2).map(|pair| (pair[0], pair[1])).collect()
}

/// Scores how well two durations agree.
#[must_use]
pub fn duration_score(source: Option<Duration>, candidate: Option<Duration>) -> f64 {
    let (Some(source), Some(candidate)) = (source, candidate) else {
        return NEUTRAL_DURATION_SCORE;
    };

    let difference = source.abs_diff(candidate).as_secs_f64();
    DURATION_STEPS
        .iter()
        .find(|(bound, _)| difference <= *bound)
        .map_or(0.0, |(_, score)| *score)
}

fn sub_scores(source: &SourceDescriptor, candidate: &CandidateMetadata) -> SubScores {
    SubScores {
        title: similarity(&normalize(&source.title), &normalize(&candidate.title)),
        artist: similarity(
            &normalize(&source.artist_names()),
            &normalize(&candidate.artist_names()),
        ),
        duration: duration_score(source.duration, candidate.duration),
    }
}

/// Scores a single candidate against a source descriptor.
#[must_use]
pub fn score(source: &SourceDescriptor, candidate: &CandidateMetadata) -> MatchResult {
    let scores = sub_scores(source, candidate);
    MatchResult {
        candidate: candidate.clone(),
        score: scores.composite(),
        title: scores.title,
        artist: scores.artist,
        duration: scores.duration,
    }
}

/// Picks the highest scoring candidate.
///
/// On ties the earlier candidate wins, which keeps the catalog's own
/// relevance ordering as the tie breaker. Returns `None` only when there are
/// no candidates at all.
#[must_use]
pub fn best_match<I>(source: &SourceDescriptor, candidates: I) -> Option<MatchResult>
where
    I: IntoIterator<Item = CandidateMetadata>,
{
    let mut best: Option<(CandidateMetadata, SubScores, f64)> = None;

    for candidate in candidates {
        let scores = sub_scores(source, &candidate);
        let composite = scores.composite();
        trace!(
            "{}: candidate {} scored {composite:.3} (title {:.2}, artist {:.2}, duration {:.2})",
            source.id,
            candidate.id,
            scores.title,
            scores.artist,
            scores.duration
        );

        if best.as_ref().is_none_or(|(_, _, top)| composite > *top) {
            best = Some((candidate, scores, composite));
        }
    }

    best.map(|(candidate, scores, composite)| MatchResult {
        candidate,
        score: composite,
        title: scores.title,
        artist: scores.artist,
        duration: scores.duration,
    })
}
