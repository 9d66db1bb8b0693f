/// Abbreviations whose trailing period does not close a sentence.
const ABBREVIATIONS: &[&str] = &[
    "Mr", "Mrs", "Ms", "Dr", "Prof", "Sr", "Jr", "vs", "etc", "e.g", "i.e", "Inc", "Ltd", "Co",
];

/// Closing quotes and brackets allowed after terminal punctuation.
const CLOSERS: &[char] = &['"', '\'', '\u{201D}', '\u{2019}', ')', ']', '\u{BB}'];

/// Whether `word` ends a sentence.
///
/// True for words ending in `.`, `!` or `?` (optionally followed by closing
/// quotes or brackets) unless the word is a known abbreviation or a
/// single-letter initial such as `J.`.
pub fn is_sentence_end(word: &str) -> bool {
    let word = word.trim_end_matches(CLOSERS);
    if !word.ends_with(['.', '!', '?']) {
        return false;
    }

    let base = word.trim_end_matches(['.', '!', '?']);
    if ABBREVIATIONS.contains(&base) {
        return false;
    }
    if base.chars().count() == 1 && word.ends_with('.') {
        return false;
    }
    true
}
