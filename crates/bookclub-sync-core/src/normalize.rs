//! Name normalization.
//!
//! Book titles and member names arrive as free text typed by different
//! people. [`normalize`] maps every spelling of the same name to one
//! canonical display form, which doubles as the identity key for
//! aggregation and reconciliation.
//!
//! # Rules
//!
//! 1. Trim, lowercase, and collapse whitespace runs to a single space.
//! 2. Capitalize the first letter of each word; hyphens and slashes start
//!    a new sub-word (`"jean-luc"` → `"Jean-Luc"`).
//! 3. Small words (`of`, `the`, `and`, ...) stay lowercase unless they are
//!    the first or last word (`"the lord of the rings"` →
//!    `"The Lord of the Rings"`).
//! 4. An elided `d'`, `l'`, or `o'` prefix capitalizes the letter after the
//!    apostrophe too (`"o'brien"` → `"O'Brien"`).
//!
//! Because the first step lowercases everything, the function is
//! idempotent: `normalize(&normalize(s)) == normalize(s)`.

/// Words kept lowercase in the middle of a title.
const SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "en", "for", "if", "in", "nor", "of", "on", "or",
    "per", "the", "to", "v", "v.", "vs", "vs.", "via",
];

/// Normalize a raw book title or member name into its canonical form.
///
/// Never fails; the empty string (or all-whitespace input) normalizes to
/// the empty string.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let last = words.len().saturating_sub(1);

    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            if i != 0 && i != last && SMALL_WORDS.contains(word) {
                (*word).to_string()
            } else {
                title_word(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title-case one word, treating `-` and `/` as sub-word boundaries.
fn title_word(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let mut out = String::with_capacity(word.len());
    let mut at_segment_start = true;

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == '/' {
            out.push(c);
            at_segment_start = true;
            continue;
        }
        if at_segment_start && c.is_alphabetic() {
            // Characters whose uppercase form expands (e.g. 'ß') are kept
            // as-is so a second pass sees the same text.
            let mut upper = c.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(u), None) => out.push(u),
                _ => out.push(c),
            }
            // The apostrophe is not alphanumeric, so the flag carries over
            // to the letter after it.
            at_segment_start = is_elided_prefix(&chars[i..]);
        } else {
            if c.is_alphanumeric() {
                at_segment_start = false;
            }
            out.push(c);
        }
    }

    out
}

/// `d'`, `l'`, or `o'` followed by a letter, as in `o'brien` or `l'amour`.
fn is_elided_prefix(rest: &[char]) -> bool {
    matches!(
        rest,
        ['d' | 'l' | 'o', '\'' | '\u{2019}', next, ..] if next.is_alphabetic()
    )
}
