use crate::error::CodecError;
use itertools::Itertools;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Glyph produced when a code has no entry in the table.
pub const UNKNOWN_GLYPH: char = '?';
/// Separator between words in the canonical string form.
pub const WORD_SEPARATOR: &str = " / ";
/// Separator between letters in the canonical string form.
pub const LETTER_SEPARATOR: char = ' ';

const STANDARD_CODES: &[(char, &str)] = &[
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('0', "-----"),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('.', ".-.-.-"),
    (',', "--..--"),
    ('?', "..--.."),
    ('\'', ".----."),
    ('!', "-.-.--"),
    ('/', "-..-."),
    ('(', "-.--."),
    (')', "-.--.-"),
    ('&', ".-..."),
    (':', "---..."),
    (';', "-.-.-."),
    ('=', "-...-"),
    ('+', ".-.-."),
    ('-', "-....-"),
    ('_', "..--.-"),
    ('"', ".-..-."),
    ('$', "...-..-"),
    ('@', ".--.-."),
];

/// Process-wide character table, built on first use.
pub static CODE_TABLE: Lazy<CodeTable> = Lazy::new(|| CodeTable::from_pairs(STANDARD_CODES));

/// Bidirectional character <-> code mapping
#[derive(Debug)]
pub struct CodeTable {
    to_code: HashMap<char, &'static str>,
    to_char: HashMap<&'static str, char>,
}

impl CodeTable {
    fn from_pairs(pairs: &[(char, &'static str)]) -> Self {
        let mut to_code = HashMap::with_capacity(pairs.len());
        let mut to_char = HashMap::with_capacity(pairs.len());
        for &(character, code) in pairs {
            to_code.insert(character, code);
            let previous = to_char.insert(code, character);
            debug_assert!(previous.is_none(), "code {code} assigned twice");
        }
        Self { to_code, to_char }
    }

    pub fn standard() -> &'static CodeTable {
        &CODE_TABLE
    }

    /// Code for a character, case-insensitive for letters.
    pub fn code_for(&self, character: char) -> Option<&'static str> {
        self.to_code
            .get(&character.to_ascii_uppercase())
            .copied()
    }

    pub fn char_for(&self, code: &str) -> Option<char> {
        self.to_char.get(code).copied()
    }

    pub fn contains(&self, character: char) -> bool {
        self.code_for(character).is_some()
    }

    /// All table characters in sorted order
    pub fn characters(&self) -> Vec<char> {
        self.to_code.keys().copied().sorted().collect()
    }

    pub fn len(&self) -> usize {
        self.to_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_code.is_empty()
    }
}

/// A single keyed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Dot,
    Dash,
}

impl Symbol {
    pub fn as_char(self) -> char {
        match self {
            Symbol::Dot => '.',
            Symbol::Dash => '-',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    Dot,
    Dash,
    LetterSpace,
    WordSpace,
    /// Placeholder for a character that has no code.
    Unknown,
}

impl Token {
    pub fn is_separator(self) -> bool {
        matches!(self, Token::LetterSpace | Token::WordSpace)
    }
}

impl From<Symbol> for Token {
    fn from(symbol: Symbol) -> Self {
        match symbol {
            Symbol::Dot => Token::Dot,
            Symbol::Dash => Token::Dash,
        }
    }
}

/// Ordered token sequence with a canonical string form:
/// `.- -... / -.-.` (letters split by one space, words by `" / "`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalStream {
    tokens: Vec<Token>,
}

impl SignalStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn last(&self) -> Option<Token> {
        self.tokens.last().copied()
    }

    pub fn ends_with_word_space(&self) -> bool {
        self.last() == Some(Token::WordSpace)
    }

    /// Appends a token as-is. Discrete button input goes through here.
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Appends a completed letter. No letter space is inserted at the start
    /// of the stream or directly after a word separator.
    pub fn push_letter(&mut self, symbols: &[Symbol]) {
        if symbols.is_empty() {
            return;
        }
        if let Some(last) = self.last() {
            if !last.is_separator() {
                self.tokens.push(Token::LetterSpace);
            }
        }
        self.tokens.extend(symbols.iter().map(|&s| Token::from(s)));
    }

    /// Appends a word separator unless the stream is empty or already ends
    /// with one. Returns whether anything was appended.
    pub fn promote_word_space(&mut self) -> bool {
        match self.last() {
            None | Some(Token::WordSpace) => false,
            Some(Token::LetterSpace) => {
                self.tokens.pop();
                self.tokens.push(Token::WordSpace);
                true
            }
            Some(_) => {
                self.tokens.push(Token::WordSpace);
                true
            }
        }
    }

    /// Removes the trailing token. A word separator goes as a unit.
    pub fn backspace(&mut self) -> Option<Token> {
        self.tokens.pop()
    }

    /// Copy without trailing separators.
    pub fn trimmed(&self) -> SignalStream {
        let end = self
            .tokens
            .iter()
            .rposition(|t| !t.is_separator())
            .map_or(0, |i| i + 1);
        SignalStream {
            tokens: self.tokens[..end].to_vec(),
        }
    }

    /// Copy with an in-progress letter appended, for live previews.
    pub fn with_pending(&self, pending: &[Symbol]) -> SignalStream {
        let mut preview = self.clone();
        preview.push_letter(pending);
        preview
    }

    /// True when this stream's canonical form is a prefix of `target`'s.
    pub fn is_prefix_of(&self, target: &SignalStream) -> bool {
        target.to_string().starts_with(&self.to_string())
    }
}

impl fmt::Display for SignalStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match token {
                Token::Dot => f.write_str(".")?,
                Token::Dash => f.write_str("-")?,
                Token::LetterSpace => f.write_str(" ")?,
                Token::WordSpace => f.write_str(WORD_SEPARATOR)?,
                Token::Unknown => write!(f, "{UNKNOWN_GLYPH}")?,
            }
        }
        Ok(())
    }
}

impl FromStr for SignalStream {
    type Err = CodecError;

    /// Parses the canonical form. A bare `/` is accepted as a word separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut stream = SignalStream::new();
        let mut offset = 0;
        while let Some(c) = s[offset..].chars().next() {
            let rest = &s[offset..];
            let consumed = if rest.starts_with(WORD_SEPARATOR) {
                stream.push_parsed_word_space();
                WORD_SEPARATOR.len()
            } else {
                match c {
                    '.' => stream.push(Token::Dot),
                    '-' => stream.push(Token::Dash),
                    '?' => stream.push(Token::Unknown),
                    ' ' => stream.push(Token::LetterSpace),
                    '/' => {
                        stream.push_parsed_word_space();
                        if rest[1..].starts_with(' ') {
                            offset += 1;
                        }
                    }
                    other => {
                        return Err(CodecError::InvalidSymbol {
                            symbol: other,
                            offset,
                        })
                    }
                }
                1
            };
            offset += consumed;
        }
        Ok(stream)
    }
}

impl SignalStream {
    fn push_parsed_word_space(&mut self) {
        if self.last() == Some(Token::LetterSpace) {
            self.tokens.pop();
        }
        self.tokens.push(Token::WordSpace);
    }
}

/// Text to signal stream. Words are split on spaces; characters without a
/// code become [`Token::Unknown`].
pub fn encode(text: &str) -> SignalStream {
    let upper = text.to_uppercase();
    let mut stream = SignalStream::new();
    for (w, word) in upper.split(' ').filter(|w| !w.is_empty()).enumerate() {
        if w > 0 {
            stream.push(Token::WordSpace);
        }
        for (i, character) in word.chars().enumerate() {
            if i > 0 {
                stream.push(Token::LetterSpace);
            }
            match CODE_TABLE.code_for(character) {
                Some(code) => {
                    for symbol in code.chars() {
                        stream.push(if symbol == '.' { Token::Dot } else { Token::Dash });
                    }
                }
                None => stream.push(Token::Unknown),
            }
        }
    }
    stream
}

/// Signal stream to text.
pub fn decode(stream: &SignalStream) -> String {
    decode_str(&stream.to_string())
}

/// Decodes a code string. Never fails: unknown codes come back as
/// [`UNKNOWN_GLYPH`] and trailing separators are ignored.
pub fn decode_str(code: &str) -> String {
    let trimmed = code.trim().trim_end_matches('/').trim();
    if trimmed.is_empty() {
        return String::new();
    }
    trimmed
        .split(WORD_SEPARATOR)
        .map(|word| {
            word.split(LETTER_SEPARATOR)
                .filter(|c| !c.is_empty())
                .map(|c| CODE_TABLE.char_for(c).unwrap_or(UNKNOWN_GLYPH))
                .collect::<String>()
        })
        .join(" ")
        .trim()
        .to_string()
}

/// Backspace on the raw string form: drops a trailing `" / "` whole,
/// otherwise the last character.
pub fn backspace_str(code: &str) -> String {
    if let Some(stripped) = code.strip_suffix(WORD_SEPARATOR) {
        stripped.to_string()
    } else {
        let mut chars = code.chars();
        chars.next_back();
        chars.as_str().to_string()
    }
}

/// Letter codes of a single word joined by letter spaces, no word separators.
pub fn encode_word(word: &str) -> String {
    word.to_uppercase()
        .chars()
        .map(|c| {
            CODE_TABLE
                .code_for(c)
                .map_or_else(|| UNKNOWN_GLYPH.to_string(), str::to_string)
        })
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_codes_are_unique() {
        let codes: HashSet<&str> = STANDARD_CODES.iter().map(|(_, code)| *code).collect();
        assert_eq!(codes.len(), STANDARD_CODES.len());
        assert_eq!(CODE_TABLE.len(), STANDARD_CODES.len());
    }

    #[test]
    fn test_table_inverse_is_total() {
        for c in CODE_TABLE.characters() {
            let code = CODE_TABLE.code_for(c).unwrap();
            assert_eq!(CODE_TABLE.char_for(code), Some(c));
        }
    }

    #[test]
    fn test_code_for_is_case_insensitive() {
        assert_eq!(CODE_TABLE.code_for('a'), Some(".-"));
        assert_eq!(CODE_TABLE.code_for('A'), Some(".-"));
        assert_eq!(CODE_TABLE.code_for('#'), None);
    }

    #[test]
    fn test_encode_hello_world() {
        assert_eq!(
            encode("hello world").to_string(),
            ".... . .-.. .-.. --- / .-- --- .-. .-.. -.."
        );
    }

    #[test]
    fn test_encode_empty() {
        assert!(encode("").is_empty());
        assert_eq!(encode("").to_string(), "");
    }

    #[test]
    fn test_encode_unknown_character_is_placeholder() {
        let stream = encode("a#b");
        assert_eq!(stream.to_string(), ".- ? -...");
        assert_eq!(decode(&stream), "A?B");
    }

    #[test]
    fn test_encode_skips_empty_words() {
        assert_eq!(encode(" sos  sos ").to_string(), "... --- ... / ... --- ...");
    }

    #[test]
    fn test_round_trip_all_table_characters() {
        let chars = CODE_TABLE.characters();
        let text: String = chars
            .chunks(5)
            .map(|chunk| chunk.iter().collect::<String>())
            .join(" ");
        assert_eq!(decode(&encode(&text)), text.to_uppercase());
    }

    #[test]
    fn test_round_trip_lowercase_phrase() {
        let phrase = "the quick brown fox 73";
        assert_eq!(decode(&encode(phrase)), phrase.to_uppercase());
    }

    #[test]
    fn test_decode_unknown_code() {
        assert_eq!(decode_str("...... .-"), "?A");
    }

    #[test]
    fn test_decode_in_progress_stream() {
        assert_eq!(decode_str(".... ."), "HE");
        assert_eq!(decode_str(".... . / "), "HE");
        assert_eq!(decode_str(".... . /"), "HE");
        assert_eq!(decode_str(".... . / .--"), "HE W");
        assert_eq!(decode_str(""), "");
        assert_eq!(decode_str("   "), "");
    }

    #[test]
    fn test_backspace_removes_word_separator_atomically() {
        let mut stream: SignalStream = "... / -".parse().unwrap();
        assert_eq!(stream.backspace(), Some(Token::Dash));
        assert_eq!(stream.to_string(), "... / ");
        assert_eq!(stream.backspace(), Some(Token::WordSpace));
        assert_eq!(stream.to_string(), "...");
    }

    #[test]
    fn test_backspace_on_empty_stream() {
        let mut stream = SignalStream::new();
        assert_eq!(stream.backspace(), None);
        assert!(stream.is_empty());
    }

    #[test]
    fn test_backspace_str() {
        assert_eq!(backspace_str("... / "), "...");
        assert_eq!(backspace_str("..."), "..");
        assert_eq!(backspace_str(""), "");
        assert_eq!(backspace_str(".- "), ".-");
    }

    #[test]
    fn test_promote_word_space_is_idempotent() {
        let mut stream = encode("e");
        assert!(stream.promote_word_space());
        let once = stream.clone();
        assert!(!stream.promote_word_space());
        assert!(!stream.promote_word_space());
        assert_eq!(stream, once);
        assert_eq!(stream.to_string(), ". / ");
    }

    #[test]
    fn test_promote_word_space_on_empty_stream() {
        let mut stream = SignalStream::new();
        assert!(!stream.promote_word_space());
        assert!(stream.is_empty());
    }

    #[test]
    fn test_push_letter_join_rules() {
        let mut stream = SignalStream::new();
        stream.push_letter(&[Symbol::Dot]);
        assert_eq!(stream.to_string(), ".");
        stream.push_letter(&[Symbol::Dash]);
        assert_eq!(stream.to_string(), ". -");
        stream.promote_word_space();
        stream.push_letter(&[Symbol::Dot, Symbol::Dash]);
        assert_eq!(stream.to_string(), ". - / .-");
    }

    #[test]
    fn test_trimmed_and_prefix() {
        let target = encode("hi there");
        let typed: SignalStream = ".... .. / ".parse().unwrap();
        assert!(typed.is_prefix_of(&target));
        assert_eq!(typed.trimmed().to_string(), ".... ..");
        let wrong: SignalStream = ".... -".parse().unwrap();
        assert!(!wrong.is_prefix_of(&target));
    }

    #[test]
    fn test_parse_canonical_form() {
        let text = ".- -... / -.-.";
        let stream: SignalStream = text.parse().unwrap();
        assert_eq!(stream.to_string(), text);
        assert_eq!(stream, encode("ab c"));
    }

    #[test]
    fn test_parse_bare_slash() {
        let stream: SignalStream = ".- /-...".parse().unwrap();
        assert_eq!(stream.to_string(), ".- / -...");
    }

    #[test]
    fn test_parse_rejects_foreign_symbol() {
        let err = ".-x".parse::<SignalStream>().unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidSymbol {
                symbol: 'x',
                offset: 2
            }
        );
    }

    #[test]
    fn test_encode_word() {
        assert_eq!(encode_word("sos"), "... --- ...");
        assert_eq!(encode_word(""), "");
    }
}
