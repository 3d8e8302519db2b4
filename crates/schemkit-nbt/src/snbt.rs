//! Stringified NBT. Rendering goes through `Display` on [`Tag`], [`Compound`] and [`List`];
//! [`parse`] reads the same text back.
//!
//! The text form is a convenience for inspection and hand-written fixtures. It is not
//! bit-exact: empty typed lists come back untyped and NaN floats come back as strings.

use crate::codec::DEFAULT_MAX_DEPTH;
use crate::tag::{Compound, List, Tag};
use schemkit_common::{Result, SchemError};
use std::fmt::{self, Display, Formatter, Write};

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Tag::End => Ok(()),
            Tag::Byte(v) => write!(f, "{}b", v),
            Tag::Short(v) => write!(f, "{}s", v),
            Tag::Int(v) => write!(f, "{}", v),
            Tag::Long(v) => write!(f, "{}L", v),
            Tag::Float(v) => write!(f, "{}f", v),
            Tag::Double(v) => write!(f, "{}d", v),
            Tag::ByteArray(v) => write_array(f, "B", v.iter().map(|b| format!("{}b", b))),
            Tag::String(v) => write_quoted(f, v),
            Tag::List(v) => v.fmt(f),
            Tag::Compound(v) => v.fmt(f),
            Tag::IntArray(v) => write_array(f, "I", v.iter().map(|i| i.to_string())),
            Tag::LongArray(v) => write_array(f, "L", v.iter().map(|l| format!("{}L", l))),
        }
    }
}

impl Display for List {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        for (i, element) in self.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            element.fmt(f)?;
        }
        f.write_char(']')
    }
}

impl Display for Compound {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char('{')?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            if !key.is_empty() && key.chars().all(is_unquoted_char) {
                f.write_str(key)?;
            } else {
                write_quoted(f, key)?;
            }
            f.write_char(':')?;
            value.fmt(f)?;
        }
        f.write_char('}')
    }
}

fn write_array(f: &mut Formatter<'_>, prefix: &str, items: impl Iterator<Item = String>) -> fmt::Result {
    write!(f, "[{};", prefix)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_char(',')?;
        }
        f.write_str(&item)?;
    }
    f.write_char(']')
}

fn write_quoted(f: &mut Formatter<'_>, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in value.chars() {
        if c == '"' || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}

fn is_unquoted_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+')
}

/// Parses SNBT text into a tag tree
pub fn parse(input: &str) -> Result<Tag> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
    };
    let tag = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos < input.len() {
        return Err(parser.error("trailing characters after value"));
    }
    Ok(tag)
}

/// Parses SNBT text that must describe a compound
pub fn parse_compound(input: &str) -> Result<Compound> {
    match parse(input)? {
        Tag::Compound(compound) => Ok(compound),
        other => Err(SchemError::TypeMismatch {
            expected: "Compound",
            found: other.tag_type().name(),
        }),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> SchemError {
        SchemError::MalformedText {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > DEFAULT_MAX_DEPTH {
            return Err(SchemError::DepthExceeded {
                max: DEFAULT_MAX_DEPTH,
            });
        }
        Ok(())
    }

    fn parse_value(&mut self) -> Result<Tag> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.parse_compound().map(Tag::Compound),
            Some('[') => self.parse_list_or_array(),
            Some('"') | Some('\'') => self.parse_quoted().map(Tag::String),
            Some(_) => {
                let token = self.parse_unquoted()?;
                Ok(classify_token(token))
            }
            None => Err(self.error("expected a value, found end of input")),
        }
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        self.enter()?;
        self.expect('{')?;
        let mut compound = Compound::new();
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.bump();
            self.depth -= 1;
            return Ok(compound);
        }
        loop {
            self.skip_whitespace();
            let key = match self.peek() {
                Some('"') | Some('\'') => self.parse_quoted()?,
                _ => self.parse_unquoted()?.to_string(),
            };
            self.expect(':')?;
            let value = self.parse_value()?;
            compound.insert(key, value);

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                _ => return Err(self.error("expected ',' or '}' in compound")),
            }
        }
        self.depth -= 1;
        Ok(compound)
    }

    fn parse_list_or_array(&mut self) -> Result<Tag> {
        self.enter()?;
        self.expect('[')?;
        let rest = &self.src[self.pos..];
        let array_kind = match rest.as_bytes() {
            [kind @ (b'B' | b'I' | b'L'), b';', ..] => Some(*kind),
            _ => None,
        };

        let tag = match array_kind {
            Some(kind) => {
                self.pos += 2;
                let tokens = self.parse_array_tokens()?;
                match kind {
                    b'B' => Tag::ByteArray(self.array_values(&tokens, 'b')?),
                    b'I' => Tag::IntArray(self.array_values(&tokens, 'i')?),
                    _ => Tag::LongArray(self.array_values(&tokens, 'l')?),
                }
            }
            None => {
                let mut list = List::new();
                self.skip_whitespace();
                if self.peek() == Some(']') {
                    self.bump();
                } else {
                    loop {
                        let value = self.parse_value()?;
                        let at = self.pos;
                        list.push(value).map_err(|e| SchemError::MalformedText {
                            position: at,
                            message: e.to_string(),
                        })?;
                        self.skip_whitespace();
                        match self.bump() {
                            Some(',') => continue,
                            Some(']') => break,
                            _ => return Err(self.error("expected ',' or ']' in list")),
                        }
                    }
                }
                Tag::List(list)
            }
        };
        self.depth -= 1;
        Ok(tag)
    }

    fn parse_array_tokens(&mut self) -> Result<Vec<&'a str>> {
        let mut tokens = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(tokens);
        }
        loop {
            self.skip_whitespace();
            tokens.push(self.parse_unquoted()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(']') => break,
                _ => return Err(self.error("expected ',' or ']' in array")),
            }
        }
        Ok(tokens)
    }

    fn array_values<T: std::str::FromStr>(&self, tokens: &[&str], suffix: char) -> Result<Vec<T>> {
        tokens
            .iter()
            .map(|token| {
                let body = token
                    .strip_suffix(suffix)
                    .or_else(|| token.strip_suffix(suffix.to_ascii_uppercase()))
                    .unwrap_or(token);
                body.parse::<T>()
                    .map_err(|_| self.error(format!("invalid array element '{}'", token)))
            })
            .collect()
    }

    fn parse_quoted(&mut self) -> Result<String> {
        let quote = self.bump().ok_or_else(|| self.error("expected a quote"))?;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c @ ('\\' | '"' | '\'')) => value.push(c),
                    Some(c) => return Err(self.error(format!("invalid escape '\\{}'", c))),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_unquoted(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_unquoted_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        if start == self.pos {
            return Err(self.error("expected a value"));
        }
        Ok(&self.src[start..self.pos])
    }
}

fn looks_numeric(body: &str) -> bool {
    body.chars().any(|c| c.is_ascii_digit())
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

fn classify_token(token: &str) -> Tag {
    match token {
        "true" => return Tag::Byte(1),
        "false" => return Tag::Byte(0),
        _ => {}
    }

    if let Some(last) = token.chars().last() {
        let body = &token[..token.len() - last.len_utf8()];
        if looks_numeric(body) {
            let parsed = match last.to_ascii_lowercase() {
                'b' => body.parse().ok().map(Tag::Byte),
                's' => body.parse().ok().map(Tag::Short),
                'l' => body.parse().ok().map(Tag::Long),
                'f' => body.parse().ok().map(Tag::Float),
                'd' => body.parse().ok().map(Tag::Double),
                _ => None,
            };
            if let Some(tag) = parsed {
                return tag;
            }
        }
    }

    if looks_numeric(token) {
        if let Ok(v) = token.parse::<i32>() {
            return Tag::Int(v);
        }
        if token.contains(['.', 'e', 'E']) {
            if let Ok(v) = token.parse::<f64>() {
                return Tag::Double(v);
            }
        }
    }
    Tag::String(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_render_compound() {
        let mut compound = Compound::new();
        compound.insert("b", 1i8);
        compound.insert("name", "minecraft:stone");
        compound.insert("ints", vec![1i32, 2]);
        compound.insert("with space", 2.5f64);
        assert_eq!(
            compound.to_string(),
            r#"{b:1b,ints:[I;1,2],name:"minecraft:stone","with space":2.5d}"#
        );
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse("1b").unwrap(), Tag::Byte(1));
        assert_eq!(parse("-2s").unwrap(), Tag::Short(-2));
        assert_eq!(parse("3").unwrap(), Tag::Int(3));
        assert_eq!(parse("4L").unwrap(), Tag::Long(4));
        assert_eq!(parse("1.5f").unwrap(), Tag::Float(1.5));
        assert_eq!(parse("2.5").unwrap(), Tag::Double(2.5));
        assert_eq!(parse("true").unwrap(), Tag::Byte(1));
        assert_eq!(parse("stone").unwrap(), Tag::String("stone".to_string()));
        assert!(parse("'it''s'").is_err());
        assert_eq!(
            parse(r#""say \"hi\"""#).unwrap(),
            Tag::String("say \"hi\"".to_string())
        );
    }

    #[test]
    fn test_parse_nested() {
        let tag = parse(r#"{Pos:[I;1,2,3],Id:"minecraft:chest",Items:[{Slot:0b,Count:1b}],Empty:[]}"#)
            .unwrap();
        let compound = tag.as_compound().unwrap();
        assert_eq!(compound.get_int_array("Pos"), &[1, 2, 3]);
        assert_eq!(compound.get_str("Id"), "minecraft:chest");
        let items = compound.get_list("Items").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items.compounds().next().unwrap().get_byte("Count"), 1);
        assert!(compound.get_list("Empty").unwrap().is_empty());
    }

    #[test]
    fn test_text_round_trip() {
        let original = parse(
            r#"{a:[B;1b,-2b],b:[L;5L,6L],c:{d:"x\\y",e:[1.5f,2.5f]},f:-9223372036854775808L}"#,
        )
        .unwrap();
        let reparsed = parse(&original.to_string()).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_heterogeneous_list_is_rejected() {
        assert_matches!(parse("[1,2b]"), Err(SchemError::MalformedText { .. }));
    }

    #[test]
    fn test_unterminated_input() {
        assert_matches!(parse("{a:1"), Err(SchemError::MalformedText { .. }));
        assert_matches!(parse("\"abc"), Err(SchemError::MalformedText { .. }));
        assert_matches!(parse("{a:1} x"), Err(SchemError::MalformedText { .. }));
    }

    #[test]
    fn test_deep_text_is_bounded() {
        let text = "[".repeat(DEFAULT_MAX_DEPTH + 1);
        assert_matches!(parse(&text), Err(SchemError::DepthExceeded { .. }));
    }

    #[test]
    fn test_parse_compound_requires_compound() {
        assert!(parse_compound("{}").unwrap().is_empty());
        assert_matches!(parse_compound("[]"), Err(SchemError::TypeMismatch { .. }));
    }
}
