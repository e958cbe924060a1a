use crate::util::normalize_whitespace;

/// Abbreviations whose trailing period never ends a sentence (matched
/// case-insensitively, as a whole word).
pub const ABBREVIATIONS: &[&str] = &[
    "Mr", "Mrs", "Ms", "Dr", "Prof", "Sr", "Jr", "Rev", "Gen", "Sgt", "Cpl", "Pvt", "St", "vs",
    "etc", "Inc", "Ltd", "Corp", "Co", "Vol", "No", "Dept", "approx", "est", "min", "max", "fig",
    "Jan", "Feb", "Mar", "Apr", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec", "Mon", "Tue",
    "Wed", "Thu", "Fri", "Sat", "Sun",
];

/// Characters allowed between a terminator and the following space.
const CLOSERS: &[char] = &['"', '\'', '\u{201D}', '\u{2019}', ')', ']'];

/// Characters that may open the next sentence in place of a capital letter.
const OPENERS: &[char] = &['"', '\'', '\u{201C}', '\u{2018}', '(', '['];

/// Split a paragraph into sentences suitable for speech.
///
/// A sentence ends at `.`, `?` or `!` (optionally followed by one closing
/// quote or bracket) when whitespace and then a capital letter or an opening
/// quote/bracket follow. The terminator stays with the sentence it ends.
/// Periods in ellipses, decimal numbers, known abbreviations and initials
/// never end a sentence.
///
/// Output sentences are trimmed; fragments of one character or less are
/// dropped.
pub fn tokenize_sentences(text: &str) -> Vec<String> {
    let text = normalize_whitespace(text);
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let protected = protected_periods(&chars);

    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        let gap_end = chars[i..]
            .iter()
            .position(|c| !c.is_whitespace())
            .map_or(chars.len(), |len| i + len);
        if is_boundary(&chars, &protected, i, gap_end) {
            push_sentence(&mut sentences, &chars[start..i]);
            start = gap_end;
        }
        i = gap_end;
    }
    push_sentence(&mut sentences, &chars[start..]);

    sentences
}

fn push_sentence(out: &mut Vec<String>, chars: &[char]) {
    let sentence: String = chars.iter().collect();
    let sentence = sentence.trim();
    if sentence.chars().count() > 1 {
        out.push(sentence.to_string());
    }
}

/// Whether the whitespace run `gap..gap_end` separates two sentences.
fn is_boundary(chars: &[char], protected: &[bool], gap: usize, gap_end: usize) -> bool {
    let opens_sentence = chars
        .get(gap_end)
        .is_some_and(|&c| c.is_uppercase() || OPENERS.contains(&c));
    if !opens_sentence || gap == 0 {
        return false;
    }

    let ends_at = |i: usize| match chars[i] {
        '?' | '!' => true,
        '.' => !protected[i],
        _ => false,
    };

    let before = gap - 1;
    ends_at(before) || (CLOSERS.contains(&chars[before]) && before > 0 && ends_at(before - 1))
}

/// Mark every period that must not terminate a sentence.
fn protected_periods(chars: &[char]) -> Vec<bool> {
    let mut protected = vec![false; chars.len()];

    // Ellipses: any run of two or more dots.
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '.' {
            i += 1;
            continue;
        }
        let run_end = chars[i..]
            .iter()
            .position(|&c| c != '.')
            .map_or(chars.len(), |len| i + len);
        if run_end - i >= 2 {
            protected[i..run_end].fill(true);
        }
        i = run_end;
    }

    for (i, &c) in chars.iter().enumerate() {
        if c != '.' || protected[i] || i == 0 {
            continue;
        }
        protected[i] = is_decimal_point(chars, i) || follows_abbreviation(chars, i) || is_initial(chars, i);
    }

    protected
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_decimal_point(chars: &[char], dot: usize) -> bool {
    chars[dot - 1].is_ascii_digit() && chars.get(dot + 1).is_some_and(char::is_ascii_digit)
}

fn follows_abbreviation(chars: &[char], dot: usize) -> bool {
    let start = chars[..dot]
        .iter()
        .rposition(|&c| !is_word_char(c))
        .map_or(0, |p| p + 1);
    let word: String = chars[start..dot].iter().collect();

    !word.is_empty()
        && ABBREVIATIONS
            .iter()
            .any(|abbr| abbr.eq_ignore_ascii_case(&word))
}

/// A lone capital before the period, followed by another capital or by the
/// end of the text ("J. R. R. Tolkien", "U.S.A.").
fn is_initial(chars: &[char], dot: usize) -> bool {
    let letter = dot - 1;
    if !chars[letter].is_uppercase() || (letter > 0 && is_word_char(chars[letter - 1])) {
        return false;
    }

    if dot + 1 == chars.len() {
        return true;
    }
    chars[dot + 1..]
        .iter()
        .find(|c| !c.is_whitespace())
        .is_some_and(|c| c.is_uppercase())
}
