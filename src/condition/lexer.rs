//! Tokenizer shared by condition expressions and renderer output tags.

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    True,
    False,
    Eq,
    Ne,
    And,
    Or,
    Not,
    In,
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Str(s) => format!("string \"{s}\""),
            Token::Int(n) => format!("number {n}"),
            Token::True => "'true'".into(),
            Token::False => "'false'".into(),
            Token::Eq => "'=='".into(),
            Token::Ne => "'!='".into(),
            Token::And => "'and'".into(),
            Token::Or => "'or'".into(),
            Token::Not => "'not'".into(),
            Token::In => "'in'".into(),
            Token::Pipe => "'|'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::Comma => "','".into(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Splits an expression into tokens. The error is a human readable reason.
pub fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '"' | '\'' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(format!("unterminated string starting with {quote}")),
                        Some('\\') => {
                            match chars.get(i + 1) {
                                Some('n') => value.push('\n'),
                                Some('t') => value.push('\t'),
                                Some(&escaped) => value.push(escaped),
                                None => {
                                    return Err("dangling escape at end of input".into())
                                }
                            }
                            i += 2;
                        }
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal
                    .parse::<i64>()
                    .map_err(|e| format!("invalid number '{literal}': {e}"))?;
                tokens.push(Token::Int(number));
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_continue(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(word),
                });
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_comparison_with_keywords() {
        let tokens = tokenize(r#"orm == "gorm" and not driver != 'none'"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("orm".into()),
                Token::Eq,
                Token::Str("gorm".into()),
                Token::And,
                Token::Not,
                Token::Ident("driver".into()),
                Token::Ne,
                Token::Str("none".into()),
            ]
        );
    }

    #[test]
    fn distinguishes_pipe_from_or() {
        let tokens = tokenize("a || b | upper").unwrap();
        assert_eq!(tokens[1], Token::Or);
        assert_eq!(tokens[3], Token::Pipe);
    }

    #[test]
    fn reads_negative_numbers_and_escapes() {
        let tokens = tokenize(r#"-3 "say \"hi\"""#).unwrap();
        assert_eq!(tokens, vec![Token::Int(-3), Token::Str("say \"hi\"".into())]);
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(tokenize("name == \"abc").unwrap_err().contains("unterminated"));
    }

    #[test]
    fn rejects_single_equals() {
        assert!(tokenize("a = b").is_err());
    }
}
