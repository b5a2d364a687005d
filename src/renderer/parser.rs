//! Turns template text into a tree of text, output and conditional nodes.
//!
//! Tags:
//! - `{{ name | filter(arg) }}` outputs a context value or string literal
//! - `{% if cond %}`, `{% elif cond %}`, `{% else %}`, `{% endif %}`
//! - `{% raw %}...{% endraw %}` keeps its content verbatim
//! - `{# comment #}` is dropped
//!
//! A block or comment tag that is the only thing on its line removes the
//! whole line, including its indentation and newline.

use crate::condition::{
    lexer::{tokenize, Token},
    Condition,
};
use crate::error::{Error, Result};
use crate::renderer::filters;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Ref(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum Node {
    Text(String),
    Output { operand: Operand, filters: Vec<FilterCall>, line: usize },
    If { branches: Vec<(Condition, Vec<Node>)>, otherwise: Option<Vec<Node>>, line: usize },
}

#[derive(Debug)]
enum Piece {
    Text(String),
    Output(String, usize),
    Block(String, usize),
}

struct IfFrame {
    branches: Vec<(Condition, Vec<Node>)>,
    otherwise: Option<Vec<Node>>,
    current: Vec<Node>,
    in_else: bool,
    line: usize,
}

fn render_error(template: &str, line: usize, reason: impl Into<String>) -> Error {
    Error::RenderError { template: template.to_string(), line, reason: reason.into() }
}

fn count_lines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

/// Whether only indentation precedes a tag on its line. `at_line_start` tells
/// whether `pending` itself begins a line.
fn starts_own_line(pending: &str, at_line_start: bool) -> bool {
    match pending.rfind('\n') {
        Some(pos) => pending[pos + 1..].chars().all(|c| c == ' ' || c == '\t'),
        None => at_line_start && pending.chars().all(|c| c == ' ' || c == '\t'),
    }
}

/// Length of the blank rest of the line after a tag, including the newline,
/// or `None` if something else follows on the line.
fn blank_rest_of_line(rest: &str) -> Option<usize> {
    let mut len = 0;
    for c in rest.chars() {
        match c {
            ' ' | '\t' | '\r' => len += c.len_utf8(),
            '\n' => return Some(len + 1),
            _ => return None,
        }
    }
    Some(len)
}

fn trim_line_indent(pending: &mut String) {
    let keep = pending.rfind('\n').map(|pos| pos + 1).unwrap_or(0);
    pending.truncate(keep);
}

fn find_endraw(source: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    while let Some(start) = source[offset..].find("{%") {
        let start = offset + start;
        let end = source[start..].find("%}")? + start;
        if source[start + 2..end].trim() == "endraw" {
            return Some((start, end + 2));
        }
        offset = start + 2;
    }
    None
}

fn split_pieces(source: &str, name: &str) -> Result<Vec<Piece>> {
    let mut pieces = Vec::new();
    let mut pending = String::new();
    let mut line = 1;
    let mut rest = source;
    let mut at_line_start = true;

    while let Some(start) = rest.find('{') {
        let opener = &rest[start..];
        let closer = if opener.starts_with("{{") {
            "}}"
        } else if opener.starts_with("{%") {
            "%}"
        } else if opener.starts_with("{#") {
            "#}"
        } else {
            pending.push_str(&rest[..start + 1]);
            rest = &rest[start + 1..];
            continue;
        };

        pending.push_str(&rest[..start]);
        let tag_line = line + count_lines(&pending);
        let end = opener[2..]
            .find(closer)
            .ok_or_else(|| render_error(name, tag_line, format!("unclosed tag, expected '{closer}'")))?;
        let inner = opener[2..2 + end].trim().to_string();
        let mut after = &opener[2 + end + 2..];

        if closer == "}}" {
            line += count_lines(&pending);
            pieces.push(Piece::Text(std::mem::take(&mut pending)));
            pieces.push(Piece::Output(inner, tag_line));
            rest = after;
            at_line_start = false;
            continue;
        }

        let mut standalone = false;
        if starts_own_line(&pending, at_line_start) {
            if let Some(skip) = blank_rest_of_line(after) {
                trim_line_indent(&mut pending);
                line += count_lines(&after[..skip]);
                after = &after[skip..];
                standalone = true;
            }
        }

        if closer == "%}" && inner == "raw" {
            let (raw_end, tag_end) = find_endraw(after)
                .ok_or_else(|| render_error(name, tag_line, "'raw' block is never closed"))?;
            pending.push_str(&after[..raw_end]);
            rest = &after[tag_end..];
        } else {
            line += count_lines(&pending);
            pieces.push(Piece::Text(std::mem::take(&mut pending)));
            if closer == "%}" {
                pieces.push(Piece::Block(inner, tag_line));
            }
            rest = after;
            at_line_start = standalone;
        }
    }

    pending.push_str(rest);
    pieces.push(Piece::Text(pending));
    Ok(pieces)
}

fn parse_output(inner: &str, name: &str, line: usize) -> Result<(Operand, Vec<FilterCall>)> {
    let tokens = tokenize(inner).map_err(|reason| render_error(name, line, reason))?;
    let mut iter = tokens.into_iter().peekable();

    let operand = match iter.next() {
        Some(Token::Ident(reference)) => Operand::Ref(reference),
        Some(Token::Str(text)) => Operand::Literal(text),
        Some(Token::Int(n)) => Operand::Literal(n.to_string()),
        Some(token) => {
            return Err(render_error(name, line, format!("unexpected {} in output tag", token.describe())))
        }
        None => return Err(render_error(name, line, "empty output tag")),
    };

    let mut filters = Vec::new();
    while let Some(token) = iter.next() {
        if token != Token::Pipe {
            return Err(render_error(name, line, format!("expected '|' but found {}", token.describe())));
        }
        let filter = match iter.next() {
            Some(Token::Ident(filter)) => filter,
            _ => return Err(render_error(name, line, "expected a filter name after '|'")),
        };
        let mut args = Vec::new();
        if iter.peek() == Some(&Token::LParen) {
            iter.next();
            loop {
                match iter.next() {
                    Some(Token::RParen) if args.is_empty() => break,
                    Some(Token::Str(arg)) => args.push(arg),
                    Some(Token::Int(n)) => args.push(n.to_string()),
                    Some(Token::True) => args.push("true".into()),
                    Some(Token::False) => args.push("false".into()),
                    _ => {
                        return Err(render_error(
                            name,
                            line,
                            format!("filter '{filter}' arguments must be literals"),
                        ))
                    }
                }
                match iter.next() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    _ => {
                        return Err(render_error(
                            name,
                            line,
                            format!("unterminated arguments of filter '{filter}'"),
                        ))
                    }
                }
            }
        }
        match filters::arity(&filter) {
            None => return Err(render_error(name, line, format!("unknown filter '{filter}'"))),
            Some(expected) if expected != args.len() => {
                return Err(render_error(
                    name,
                    line,
                    format!("filter '{filter}' takes {expected} argument(s), got {}", args.len()),
                ))
            }
            Some(_) => {}
        }
        filters.push(FilterCall { name: filter, args });
    }

    Ok((operand, filters))
}

fn parse_condition(source: &str, name: &str, line: usize) -> Result<Condition> {
    if source.trim().is_empty() {
        return Err(render_error(name, line, "missing condition"));
    }
    Condition::parse(source).map_err(|e| render_error(name, line, e.to_string()))
}

/// Parses a template into nodes.
pub fn parse(source: &str, name: &str) -> Result<Vec<Node>> {
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<IfFrame> = Vec::new();

    for piece in split_pieces(source, name)? {
        let target = match stack.last_mut() {
            Some(frame) => &mut frame.current,
            None => &mut root,
        };
        match piece {
            Piece::Text(text) => {
                if !text.is_empty() {
                    target.push(Node::Text(text));
                }
            }
            Piece::Output(inner, line) => {
                let (operand, filters) = parse_output(&inner, name, line)?;
                target.push(Node::Output { operand, filters, line });
            }
            Piece::Block(inner, line) => {
                let (keyword, argument) = match inner.split_once(char::is_whitespace) {
                    Some((keyword, argument)) => (keyword, argument.trim()),
                    None => (inner.as_str(), ""),
                };
                match keyword {
                    "if" => {
                        let condition = parse_condition(argument, name, line)?;
                        stack.push(IfFrame {
                            branches: vec![(condition, Vec::new())],
                            otherwise: None,
                            current: Vec::new(),
                            in_else: false,
                            line,
                        });
                    }
                    "elif" => {
                        let frame = stack
                            .last_mut()
                            .filter(|frame| !frame.in_else)
                            .ok_or_else(|| render_error(name, line, "'elif' outside of 'if'"))?;
                        let condition = parse_condition(argument, name, line)?;
                        let body = std::mem::take(&mut frame.current);
                        if let Some(last) = frame.branches.last_mut() {
                            last.1 = body;
                        }
                        frame.branches.push((condition, Vec::new()));
                    }
                    "else" => {
                        let frame = stack
                            .last_mut()
                            .filter(|frame| !frame.in_else)
                            .ok_or_else(|| render_error(name, line, "'else' outside of 'if'"))?;
                        let body = std::mem::take(&mut frame.current);
                        if let Some(last) = frame.branches.last_mut() {
                            last.1 = body;
                        }
                        frame.in_else = true;
                    }
                    "endif" => {
                        let mut frame = stack
                            .pop()
                            .ok_or_else(|| render_error(name, line, "'endif' without 'if'"))?;
                        let body = std::mem::take(&mut frame.current);
                        if frame.in_else {
                            frame.otherwise = Some(body);
                        } else if let Some(last) = frame.branches.last_mut() {
                            last.1 = body;
                        }
                        let node = Node::If {
                            branches: frame.branches,
                            otherwise: frame.otherwise,
                            line: frame.line,
                        };
                        match stack.last_mut() {
                            Some(parent) => parent.current.push(node),
                            None => root.push(node),
                        }
                    }
                    other => {
                        return Err(render_error(name, line, format!("unknown block tag '{other}'")))
                    }
                }
            }
        }
    }

    if let Some(frame) = stack.last() {
        return Err(render_error(name, frame.line, "'if' block is never closed"));
    }

    Ok(root)
}
