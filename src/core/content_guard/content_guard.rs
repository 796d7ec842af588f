// Content guard - detects disguised references to external platforms in ad text.
//
// Two stages:
// 1. A direct match against the known domain/service tokens. This catches
//    almost everything in practice and is cheap.
// 2. Only on a miss: normalize the text (fold width and case, undo "dot"
//    spellings, close up a dot set off by a leading space, map look-alike
//    letters to Latin, drop quote noise, substitute ambiguous digits) and test
//    it again against the same tokens plus a generic `label.tld` shape.
//
// Ordinary whitespace survives normalization, so "great. Top" stays two words.
//
// This is a denylist. Domains outside the configured lists are not detected.

use crate::core::ads::Ad;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const DEFAULT_DOMAINS: &[&str] = &[
    // messengers
    "t.me",
    "telegram.me",
    "telegram.org",
    "telegram.dog",
    "telegra.ph",
    "tg://",
    "wa.me",
    "whatsapp.com",
    "viber.com",
    "viber://",
    "signal.me",
    "discord.gg",
    "discord.com/invite",
    // social networks
    "vk.com",
    "vk.cc",
    "vk.me",
    "ok.ru",
    "instagram.com",
    "instagr.am",
    "facebook.com",
    "fb.com",
    "fb.me",
    "tiktok.com",
    "youtube.com",
    "youtu.be",
    "twitter.com",
    "x.com",
    "linktr.ee",
    // link shorteners
    "bit.ly",
    "tinyurl.com",
    "goo.gl",
    "clck.ru",
    "cutt.ly",
    "is.gd",
    "shorturl.at",
    "rebrand.ly",
    // spreadsheets and forms
    "docs.google.com",
    "forms.gle",
];

const DEFAULT_TLDS: &[&str] = &[
    "com", "net", "org", "info", "biz", "ru", "su", "ua", "by", "kz", "uz", "io", "me", "ly",
    "gg", "cc", "co", "tv", "xyz", "site", "online", "store", "shop", "app", "link", "pro",
    "club", "top",
];

/// Characters dropped during normalization. Whitespace is kept.
const NOISE: &[char] = &[
    '[', ']', '(', ')', '{', '}', '<', '>', '"', '\'', '`', '«', '»', '„', '“', '”', '‘', '’',
    '*', '_', '|', '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}',
];

/// `[dot]`, `(dot)`, `{.}` and friends, including a Cyrillic "o" or a zero in "dot".
static BRACKETED_DOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*[\[\(\{<]\s*(?:d[oо0]t|точка|\.)\s*[\]\)\}>]\s*")
        .expect("bracketed dot regex should compile")
});

/// ` dot ` spelled out between spaces.
static SPACED_DOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+(?:d[oо0]t|точка)\s+").expect("spaced dot regex should compile")
});

/// A literal dot with whitespace before it, as in `t . me`. A sentence end has
/// no space before the dot and is left alone.
static DETACHED_DOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+\.\s*").expect("detached dot regex should compile")
});

/// Lists the guard matches against. Product-specific, so it is configuration
/// rather than code; the defaults cover the usual suspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentGuardConfig {
    #[serde(default = "default_domains")]
    pub domains: Vec<String>,
    #[serde(default = "default_tlds")]
    pub tlds: Vec<String>,
}

fn default_domains() -> Vec<String> {
    DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect()
}

fn default_tlds() -> Vec<String> {
    DEFAULT_TLDS.iter().map(|d| d.to_string()).collect()
}

impl Default for ContentGuardConfig {
    fn default() -> Self {
        Self {
            domains: default_domains(),
            tlds: default_tlds(),
        }
    }
}

pub struct ContentGuard {
    /// Tokens in the raw text, bounded on the left by a word boundary.
    direct: Option<Regex>,
    /// Tokens in normalized text, where dot spellings are already undone.
    normalized_tokens: Option<Regex>,
    /// Generic `label.tld` in normalized text.
    domain_shape: Option<Regex>,
}

impl Default for ContentGuard {
    fn default() -> Self {
        Self::new(&ContentGuardConfig::default()).expect("default content guard should compile")
    }
}

impl ContentGuard {
    pub fn new(config: &ContentGuardConfig) -> Result<Self, regex::Error> {
        let tokens = alternation(&config.domains);
        let tlds = alternation(&config.tlds);

        let direct = tokens
            .as_ref()
            .map(|t| Regex::new(&format!(r"(?i)\b(?:{t})(?:[^a-z0-9]|$)")))
            .transpose()?;
        let normalized_tokens = tokens
            .as_ref()
            .map(|t| Regex::new(&format!(r"(?:{t})(?:[^a-z0-9]|$)")))
            .transpose()?;
        let domain_shape = tlds
            .as_ref()
            .map(|t| Regex::new(&format!(r"[a-z0-9-]{{2,}}\.(?:{t})(?:[^a-z0-9]|$)")))
            .transpose()?;

        Ok(Self {
            direct,
            normalized_tokens,
            domain_shape,
        })
    }

    /// Does the text contain a (possibly disguised) reference to an external platform?
    pub fn contains_forbidden_reference(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        if matches(&self.direct, text) {
            return true;
        }

        let normalized = normalize(text);
        matches(&self.normalized_tokens, &normalized) || matches(&self.domain_shape, &normalized)
    }

    /// Check title, body and contacts independently.
    ///
    /// Returns the name of the first field that triggers the guard.
    pub fn check_ad(&self, ad: &Ad) -> Option<&'static str> {
        [
            ("title", ad.title.as_str()),
            ("body", ad.body.as_str()),
            ("contacts", ad.contacts.as_str()),
        ]
        .into_iter()
        .find(|(_, text)| self.contains_forbidden_reference(text))
        .map(|(field, _)| field)
    }
}

fn matches(regex: &Option<Regex>, text: &str) -> bool {
    regex.as_ref().is_some_and(|r| r.is_match(text))
}

fn alternation(items: &[String]) -> Option<String> {
    let escaped: Vec<String> = items
        .iter()
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .map(|item| regex::escape(&item))
        .collect();

    if escaped.is_empty() {
        None
    } else {
        Some(escaped.join("|"))
    }
}

/// Normalize text for the slow path.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .map(fold_width)
        .flat_map(char::to_lowercase)
        .collect();

    let dotted = BRACKETED_DOT.replace_all(&folded, ".");
    let dotted = SPACED_DOT.replace_all(&dotted, ".");
    let dotted = DETACHED_DOT.replace_all(&dotted, ".");

    dotted
        .chars()
        .filter(|c| !NOISE.contains(c))
        .map(latin_lookalike)
        .map(|c| match c {
            '0' => 'o',
            '1' => 'l',
            other => other,
        })
        .collect()
}

/// Fullwidth ASCII and a few dot look-alikes to their plain forms.
fn fold_width(c: char) -> char {
    match c {
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        '\u{3002}' | '\u{FF61}' | '\u{2024}' => '.',
        _ => c,
    }
}

/// Closed substitution table: lowercase Cyrillic and Greek letters that render
/// like Latin ones. Not a transliteration.
fn latin_lookalike(c: char) -> char {
    match c {
        'а' | 'α' => 'a',
        'в' | 'β' => 'b',
        'с' => 'c',
        'ԁ' => 'd',
        'е' | 'ё' | 'ε' => 'e',
        'ɡ' => 'g',
        'н' => 'h',
        'і' | 'ї' | 'ι' => 'i',
        'ј' => 'j',
        'к' | 'κ' => 'k',
        'ӏ' => 'l',
        'м' => 'm',
        'о' | 'ο' => 'o',
        'р' | 'ρ' => 'p',
        'ԛ' => 'q',
        'ѕ' => 's',
        'т' | 'τ' => 't',
        'υ' => 'u',
        'ν' => 'v',
        'ԝ' | 'ω' => 'w',
        'х' | 'χ' => 'x',
        'у' => 'y',
        other => other,
    }
}
