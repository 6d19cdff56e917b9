//! Tokenizer for the textual IR.

use crate::{DisError, Result};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Token {
    Num(u64),
    Ident(String),
    Punct(&'static str),
}

/// A token with the 1-based line it starts on.
#[derive(Clone, Debug)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

// Longest first so that "<=" wins over "<".
const PUNCTS: &[&str] = &[
    "<<", ">>", "==", "!=", "<=", ">=", "&&", "||", "=", "<", ">", "+", "-", "*", "/", "%", "&",
    "|", "^", "!", "~", "(", ")", ";", ":",
];

pub fn tokenize(src: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();

    for (idx, line_text) in src.lines().enumerate() {
        let line = idx + 1;
        let code = line_text.split("//").next().unwrap_or_default();
        let bytes = code.as_bytes();
        let mut pos = 0;

        while pos < bytes.len() {
            let c = bytes[pos];
            if c.is_ascii_whitespace() {
                pos += 1;
            } else if c.is_ascii_digit() {
                let start = pos;
                while pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() {
                    pos += 1;
                }
                let token = Token::Num(parse_number(&code[start..pos], line)?);
                tokens.push(Spanned { token, line });
            } else if c.is_ascii_alphabetic() || c == b'_' {
                let start = pos;
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                let token = Token::Ident(code[start..pos].to_string());
                tokens.push(Spanned { token, line });
            } else {
                let rest = &code[pos..];
                let Some(punct) = PUNCTS.iter().find(|p| rest.starts_with(**p)) else {
                    return Err(DisError::Parse {
                        line,
                        message: format!(
                            "unexpected character '{}'",
                            rest.chars().next().unwrap_or('?')
                        ),
                    });
                };
                pos += punct.len();
                tokens.push(Spanned {
                    token: Token::Punct(*punct),
                    line,
                });
            }
        }
    }

    Ok(tokens)
}

fn parse_number(text: &str, line: usize) -> Result<u64> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| DisError::Parse {
        line,
        message: format!("invalid number '{text}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_tokenize_statement() {
        assert_eq!(
            kinds("300: if (b != 0x10) goto 300;"),
            vec![
                Token::Num(300),
                Token::Punct(":"),
                Token::Ident("if".to_string()),
                Token::Punct("("),
                Token::Ident("b".to_string()),
                Token::Punct("!="),
                Token::Num(16),
                Token::Punct(")"),
                Token::Ident("goto".to_string()),
                Token::Num(300),
                Token::Punct(";"),
            ]
        );
    }

    #[test]
    fn test_tokenize_comments_and_lines() {
        let tokens = tokenize("a = 1; // set a\n\nreturn a;").unwrap();
        assert_eq!(tokens.len(), 7);
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[4].line, 3);
    }

    #[test]
    fn test_tokenize_rejects_unknown_character() {
        let err = tokenize("a = $1;").unwrap_err();
        assert!(matches!(err, DisError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_tokenize_rejects_bad_number() {
        assert!(matches!(
            tokenize("a = 12ab;"),
            Err(DisError::Parse { .. })
        ));
    }
}
