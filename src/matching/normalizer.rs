//! Filename normalisation and signal extraction.
//!
//! Turns a filename stem into a comparable form by lower-casing it and
//! stripping technical noise (resolution, codecs, audio layout, HDR and
//! bit-depth markers, trailing release-group tags), and pulls out the
//! structured signals the scorers key on: season/episode numbers, release
//! years and source/origin tags.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

/// Year window considered plausible for a release
const YEAR_RANGE: std::ops::RangeInclusive<u16> = 1900..=2099;

/// Four-digit numerals inside the year window that are really frame widths
const RESOLUTION_NUMERALS: &[u16] = &[1920, 2048];

/// Filler words ignored by word-overlap scoring
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "of", "proper", "repack", "extended", "internal", "limited",
    "uncut", "remastered", "multi", "sub", "subs", "dubbed",
];

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("valid token regex"));

static RELEASE_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-([A-Z0-9]{2,})$").expect("valid release group regex"));

static SEASON_EPISODE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^S\d+E\d+$").expect("valid episode code regex"));

/// Technical vocabulary removed before any comparison, applied in order
static TECHNICAL_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // resolution
        r"\b(?:\d{3,4}[pi]|4k|8k|uhd|\d{3,4}x\d{3,4})\b",
        // video codec
        r"\b(?:[xh]\.?26[45]|hevc|avc|xvid|divx|av1|vp9)\b",
        // audio codec with optional channel layout
        r"\b(?:dd\+(?:[ .]?[257]\.[01])?|(?:e?ac3|aac|ddp|dd|dts-hd|dts|truehd|atmos|flac|opus|mp3)(?:[ .]?[257]\.[01])?\b)",
        // bare channel layout
        r"\b[257]\.[01]\b",
        // bit depth
        r"\b(?:8|10|12)[ -]?bits?\b",
        // hdr
        r"\b(?:hdr10\+|(?:hdr10|hdr|dv|dolby[ .]?vision|sdr)\b)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid technical token regex"))
    .collect()
});

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[._\[\](){}]+").expect("valid separator regex"));

/// Season+episode surface forms, tried in order
static SEASON_EPISODE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"s(\d+)[ ._-]*e(\d+)",
        r"(?:^|[^0-9])(\d{1,2})x(\d{1,3})(?:[^0-9]|$)",
        r"season[ ._-]*(\d+)[ ._-]*episode[ ._-]*(\d+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid season/episode regex"))
    .collect()
});

static EPISODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^a-z0-9])(?:e|ep|episode)[ ._-]*(\d+)").expect("valid episode regex")
});

/// Source/origin of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    /// Broadcast capture (hdtv, pdtv, ...)
    Broadcast,
    /// Web distribution (web-dl, webrip)
    Web,
    /// Blu-ray disc rip
    BluRay,
    /// DVD rip
    Dvd,
    /// Theatre capture
    Camera,
}

static SOURCE_RES: LazyLock<Vec<(SourceTag, Regex)>> = LazyLock::new(|| {
    [
        (SourceTag::Broadcast, r"\b(?:hdtv|pdtv|sdtv|dsr|tvrip|hdtvrip)\b"),
        (SourceTag::Web, r"\b(?:web[ -]?dl|web[ -]?rip|web)\b"),
        (SourceTag::BluRay, r"\b(?:blu[ -]?ray|bdrip|brrip|bdremux|bd)\b"),
        (SourceTag::Dvd, r"\b(?:dvdrip|dvdscr|dvd5|dvd9|dvd)\b"),
        (SourceTag::Camera, r"\b(?:cam|camrip|hdcam|telesync|hdts)\b"),
    ]
    .into_iter()
    .map(|(tag, pattern)| (tag, Regex::new(pattern).expect("valid source regex")))
    .collect()
});

/// Lower-cased stem with technical noise removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NormalizedStem(String);

impl NormalizedStem {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured attributes derived from a stem
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedSignals {
    /// `(season, episode)` when a season+episode form matched
    pub season_episode: Option<(u32, u32)>,

    /// Episode number when only a bare episode form matched
    pub episode: Option<u32>,

    /// Plausible release years
    pub years: BTreeSet<u16>,

    /// Source/origin tags
    pub sources: BTreeSet<SourceTag>,
}

impl ExtractedSignals {
    /// First release year, if any
    pub fn year(&self) -> Option<u16> {
        self.years.iter().next().copied()
    }

    /// Episode number regardless of which pattern family produced it
    pub fn episode_number(&self) -> Option<u32> {
        self.season_episode.map(|(_, e)| e).or(self.episode)
    }

    /// Both sides carry years and none of them coincide
    pub fn years_disjoint(&self, other: &Self) -> bool {
        !self.years.is_empty() && !other.years.is_empty() && self.years.is_disjoint(&other.years)
    }

    /// Both sides carry years and at least one coincides
    pub fn years_agree(&self, other: &Self) -> bool {
        !self.years.is_empty() && !other.years.is_empty() && !self.years.is_disjoint(&other.years)
    }

    /// Both sides carry source tags and none of them coincide
    pub fn sources_disjoint(&self, other: &Self) -> bool {
        !self.sources.is_empty()
            && !other.sources.is_empty()
            && self.sources.is_disjoint(&other.sources)
    }

    /// Both sides carry the same `(season, episode)` pair
    pub fn same_episode(&self, other: &Self) -> bool {
        matches!((self.season_episode, other.season_episode), (Some(a), Some(b)) if a == b)
    }
}

/// Everything the scorers need to know about one stem, computed once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// Lower-cased stem, noise included
    pub lowered: String,

    /// Lower-cased stem with noise stripped
    pub stem: NormalizedStem,

    pub signals: ExtractedSignals,
}

impl Analysis {
    pub fn new(stem: &str) -> Self {
        let (normalized, signals) = normalize(stem);
        Self {
            lowered: stem.to_lowercase(),
            stem: normalized,
            signals,
        }
    }

    /// Content words of the cleaned stem: stopwords, source words and
    /// year tokens removed
    pub fn content_words(&self) -> BTreeSet<&str> {
        TOKEN_RE
            .find_iter(self.stem.as_str())
            .map(|m| m.as_str())
            .filter(|word| !STOPWORDS.contains(word))
            .filter(|word| !is_source_word(word))
            .filter(|word| parse_year(word).is_none())
            .collect()
    }
}

/// Normalise a filename stem and extract its signals
pub fn normalize(stem: &str) -> (NormalizedStem, ExtractedSignals) {
    let lowered = stem.to_lowercase();

    let signals = ExtractedSignals {
        season_episode: None,
        episode: None,
        years: extract_years(&lowered),
        sources: extract_sources(&lowered),
    };
    let signals = extract_episode(&lowered, signals);

    let trimmed = strip_release_group(stem).to_lowercase();
    (NormalizedStem(clean(&trimmed)), signals)
}

/// Remove a trailing `-GROUP` tag, leaving episode codes alone
fn strip_release_group(stem: &str) -> &str {
    match RELEASE_GROUP_RE.captures(stem) {
        Some(caps) => {
            let tag = &caps[1];
            let has_letter = tag.chars().any(|c| c.is_ascii_uppercase());
            if has_letter && !SEASON_EPISODE_CODE_RE.is_match(tag) {
                caps.get(0).map_or(stem, |m| &stem[..m.start()])
            } else {
                stem
            }
        }
        None => stem,
    }
}

/// Strip technical vocabulary and collapse separators into single spaces
fn clean(lowered: &str) -> String {
    let mut text = lowered.to_string();
    for re in TECHNICAL_RES.iter() {
        text = re.replace_all(&text, " ").into_owned();
    }
    let text = SEPARATOR_RE.replace_all(&text, " ");

    text.split_whitespace()
        .filter(|token| token.chars().any(|c| c.is_alphanumeric()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_year(token: &str) -> Option<u16> {
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: u16 = token.parse().ok()?;
    (YEAR_RANGE.contains(&year) && !RESOLUTION_NUMERALS.contains(&year)).then_some(year)
}

fn extract_years(lowered: &str) -> BTreeSet<u16> {
    TOKEN_RE
        .find_iter(lowered)
        .filter_map(|m| parse_year(m.as_str()))
        .collect()
}

fn spaced(lowered: &str) -> String {
    lowered.replace(['.', '_'], " ")
}

fn extract_sources(lowered: &str) -> BTreeSet<SourceTag> {
    let text = spaced(lowered);
    SOURCE_RES
        .iter()
        .filter(|(_, re)| re.is_match(&text))
        .map(|(tag, _)| *tag)
        .collect()
}

fn is_source_word(word: &str) -> bool {
    SOURCE_RES.iter().any(|(_, re)| re.is_match(word)) || matches!(word, "dl" | "rip" | "ray")
}

/// Numbers too long for `u32` (timestamps and the like) are not episode numbers
fn parse_number(digits: &str, stem: &str) -> Option<u32> {
    match digits.parse::<u32>() {
        Ok(number) => Some(number),
        Err(e) => {
            debug!("Ignoring numeric capture '{}' in '{}': {}", digits, stem, e);
            None
        }
    }
}

/// First season+episode form wins; bare episode only when none matched.
/// A capture that does not fit drops the signal, the text is still compared.
fn extract_episode(lowered: &str, mut signals: ExtractedSignals) -> ExtractedSignals {
    for re in SEASON_EPISODE_RES.iter() {
        if let Some(caps) = re.captures(lowered) {
            let season = parse_number(&caps[1], lowered);
            let episode = parse_number(&caps[2], lowered);
            signals.season_episode = season.zip(episode);
            return signals;
        }
    }

    if let Some(caps) = EPISODE_RE.captures(lowered) {
        signals.episode = parse_number(&caps[1], lowered);
    }

    signals
}
