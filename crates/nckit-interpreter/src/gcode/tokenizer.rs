//! Line tokenizer
//!
//! Splits one source line into lexical items. The tokenizer holds no state
//! across lines and never fails: text it cannot understand becomes a
//! [`Token::Error`] and scanning resumes after it.

use nckit_core::LexError;

/// One lexical item of a line
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Address letter with a numeric value, e.g. `X-1.5`
    Word {
        /// Upper-cased address letter
        letter: char,
        /// Parsed value
        value: f64,
        /// Number text as written, used to tell `G92` from `G92.1`
        raw: String,
        /// Column of the letter
        column: usize,
    },
    /// `N` block number
    BlockNumber(u32),
    /// Comment text without its delimiters
    Comment(String),
    /// `%` program start/end marker
    ProgramMarker,
    /// `/` block delete marker at the start of a line
    BlockDelete,
    /// Text that could not be tokenized
    Error(LexError),
}

/// Lazy token iterator over one line
///
/// Re-tokenizing the same line yields the same tokens.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    chars: Vec<(usize, char)>,
    pos: usize,
    line: &'a str,
    seen_content: bool,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer over one line of text
    pub fn new(line: &'a str) -> Self {
        Self {
            chars: line.chars().enumerate().collect(),
            pos: 0,
            line,
            seen_content: false,
        }
    }

    /// The line being tokenized
    pub fn line(&self) -> &'a str {
        self.line
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn rest_from(&self, start: usize) -> String {
        self.chars[start..].iter().map(|&(_, c)| c).collect()
    }

    /// Comments consume the rest of the line
    fn comment(&mut self, opener: char) -> Token {
        let body_start = self.pos + 1;
        self.pos = self.chars.len();
        let rest = self.rest_from(body_start);
        let text = match opener {
            '(' => match rest.find(')') {
                Some(end) => rest[..end].to_string(),
                None => rest,
            },
            _ => rest,
        };
        Token::Comment(text.trim().to_string())
    }

    /// Scan `[+-]digits[.digits]` after whitespace; returns the raw text
    fn number_text(&mut self) -> String {
        self.skip_whitespace();
        let mut text = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            text.push(sign);
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                text.push(c);
                self.pos += 1;
            } else if c == ' ' || c == '\t' {
                // digits may be separated by blanks ("X 1 0")
                let resume = self.pos;
                self.skip_whitespace();
                if !self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
                    self.pos = resume;
                    break;
                }
            } else {
                break;
            }
        }
        text
    }

    fn word(&mut self, letter: char, column: usize) -> Token {
        self.pos += 1;
        let text = self.number_text();

        if text.is_empty() || text == "+" || text == "-" {
            return Token::Error(LexError::MissingValue { column, letter });
        }
        let digits = text.trim_start_matches(['+', '-']);
        let well_formed = digits.chars().filter(|&c| c == '.').count() <= 1
            && digits.chars().any(|c| c.is_ascii_digit());
        let parsed = if well_formed {
            text.parse::<f64>().ok().filter(|v| v.is_finite())
        } else {
            None
        };

        match parsed {
            Some(value) if letter == 'N' => match u32::try_from(value as i64) {
                Ok(n) if value.fract() == 0.0 => Token::BlockNumber(n),
                _ => Token::Error(LexError::InvalidNumber {
                    column,
                    letter,
                    text,
                }),
            },
            Some(value) => Token::Word {
                letter,
                value,
                raw: text,
                column,
            },
            None => Token::Error(LexError::InvalidNumber {
                column,
                letter,
                text,
            }),
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let &(column, c) = self.chars.get(self.pos)?;
        let first = !self.seen_content;
        self.seen_content = true;

        let token = match c {
            '(' | ';' => self.comment(c),
            '%' => {
                self.pos += 1;
                Token::ProgramMarker
            }
            '/' if first => {
                self.pos += 1;
                Token::BlockDelete
            }
            c if c.is_ascii_alphabetic() => self.word(c.to_ascii_uppercase(), column),
            found => {
                self.pos += 1;
                Token::Error(LexError::UnexpectedCharacter { column, found })
            }
        };
        Some(token)
    }
}

/// Tokenize a whole line eagerly
pub fn tokenize(line: &str) -> Vec<Token> {
    Tokenizer::new(line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(letter: char, value: f64) -> (char, f64) {
        (letter, value)
    }

    fn words(line: &str) -> Vec<(char, f64)> {
        tokenize(line)
            .into_iter()
            .filter_map(|t| match t {
                Token::Word { letter, value, .. } => Some((letter, value)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_simple_line() {
        assert_eq!(
            words("G1 X10.5 Y-20 Z.5"),
            vec![
                word('G', 1.0),
                word('X', 10.5),
                word('Y', -20.0),
                word('Z', 0.5)
            ]
        );
    }

    #[test]
    fn test_packed_words_and_lowercase() {
        assert_eq!(
            words("g1x10y+5f300"),
            vec![
                word('G', 1.0),
                word('X', 10.0),
                word('Y', 5.0),
                word('F', 300.0)
            ]
        );
    }

    #[test]
    fn test_block_number() {
        let tokens = tokenize("N110 G0 X1");
        assert_eq!(tokens[0], Token::BlockNumber(110));
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_parenthesized_comment_ends_tokens() {
        let tokens = tokenize("G0 X1 (rapid to start) Y2");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2], Token::Comment("rapid to start".to_string()));
    }

    #[test]
    fn test_semicolon_comment() {
        let tokens = tokenize("G1 X5 ; cut");
        assert_eq!(tokens.last(), Some(&Token::Comment("cut".to_string())));
        assert_eq!(words("; only a comment"), vec![]);
    }

    #[test]
    fn test_unterminated_paren_comment() {
        assert_eq!(
            tokenize("(no closing"),
            vec![Token::Comment("no closing".to_string())]
        );
    }

    #[test]
    fn test_markers() {
        assert_eq!(tokenize("%"), vec![Token::ProgramMarker]);
        let tokens = tokenize("/G0 X1");
        assert_eq!(tokens[0], Token::BlockDelete);
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_decimal_gcode_keeps_raw_text() {
        match &tokenize("G92.1")[0] {
            Token::Word { raw, value, .. } => {
                assert_eq!(raw, "92.1");
                assert!((value - 92.1).abs() < 1e-9);
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_character_produces_error_and_continues() {
        let tokens = tokenize("G1 @ X5");
        assert_eq!(
            tokens[1],
            Token::Error(LexError::UnexpectedCharacter {
                column: 3,
                found: '@'
            })
        );
        assert_eq!(words("G1 @ X5"), vec![word('G', 1.0), word('X', 5.0)]);
    }

    #[test]
    fn test_letter_without_value() {
        let tokens = tokenize("G1 X Y2");
        assert_eq!(
            tokens[1],
            Token::Error(LexError::MissingValue {
                column: 3,
                letter: 'X'
            })
        );
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_malformed_number() {
        assert!(matches!(
            tokenize("X1.2.3")[0],
            Token::Error(LexError::InvalidNumber { letter: 'X', .. })
        ));
    }

    #[test]
    fn test_retokenizing_is_pure() {
        let line = "N5 G2 X10 Y0 I5 J0 (arc)";
        assert_eq!(tokenize(line), tokenize(line));
        assert_eq!(Tokenizer::new(line).count(), 7);
    }

    #[test]
    fn test_empty_line() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t").is_empty());
    }
}
