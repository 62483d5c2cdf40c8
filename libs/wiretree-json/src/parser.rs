//! Lenient JSON parser, grounded on cxxtools `JsonParser`'s character state
//! machine (`state_0`/`state_object*`/`state_array*`/`state_string`/
//! `state_number`/`state_float`/`state_token`/`state_comment*`) but
//! restructured as recursive descent over a peekable char cursor — the same
//! pull-style adaptation `wiretree_binary::parser` uses for the binary
//! codec, rather than a literal one-`char`-at-a-time `advance` callback.
//!
//! Bare (unquoted) object keys and `//`/`/* */` comments anywhere whitespace
//! is allowed are accepted in addition to what the original handles, per
//! the documented leniency rules.

use crate::error::JsonError;
use std::iter::Peekable;
use wiretree_core::{Category, Composer};

#[derive(Default)]
pub struct JsonParser {
    line: usize,
}

impl JsonParser {
    pub fn new() -> Self {
        JsonParser { line: 1 }
    }

    pub fn line(&self) -> usize {
        self.line.max(1)
    }

    /// Parses exactly one JSON value from `chars`, leaving the cursor
    /// positioned right after it. Calling this repeatedly on the same
    /// cursor reads successive root-level values from one stream (e.g.
    /// `[3][4] [5]`).
    pub fn parse_value<I: Iterator<Item = char>>(
        &mut self,
        chars: &mut Peekable<I>,
        dest: &mut dyn Composer,
    ) -> Result<(), JsonError> {
        if self.line == 0 {
            self.line = 1;
        }
        self.skip_ws_and_comments(chars)?;
        if self.peek(chars).is_none() {
            return Err(JsonError::NoData);
        }
        self.parse_value_inner(chars, dest)
    }

    fn bump<I: Iterator<Item = char>>(&mut self, chars: &mut Peekable<I>) -> Option<char> {
        let c = chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn peek<I: Iterator<Item = char>>(&self, chars: &mut Peekable<I>) -> Option<char> {
        chars.peek().copied()
    }

    fn expect<I: Iterator<Item = char>>(&mut self, chars: &mut Peekable<I>, want: char) -> Result<(), JsonError> {
        match self.bump(chars) {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(JsonError::UnexpectedChar { found: c, line: self.line }),
            None => Err(JsonError::UnexpectedEnd { line: self.line }),
        }
    }

    fn skip_ws_and_comments<I: Iterator<Item = char>>(&mut self, chars: &mut Peekable<I>) -> Result<(), JsonError> {
        loop {
            match self.peek(chars) {
                Some(c) if c.is_whitespace() => {
                    self.bump(chars);
                }
                Some('/') => {
                    self.bump(chars);
                    match self.bump(chars) {
                        Some('/') => {
                            while let Some(c) = self.bump(chars) {
                                if c == '\n' {
                                    break;
                                }
                            }
                        }
                        Some('*') => loop {
                            match self.bump(chars) {
                                Some('*') if self.peek(chars) == Some('/') => {
                                    self.bump(chars);
                                    break;
                                }
                                Some(_) => {}
                                None => return Err(JsonError::UnexpectedEnd { line: self.line }),
                            }
                        },
                        Some(c) => return Err(JsonError::UnexpectedChar { found: c, line: self.line }),
                        None => return Err(JsonError::UnexpectedEnd { line: self.line }),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_value_inner<I: Iterator<Item = char>>(
        &mut self,
        chars: &mut Peekable<I>,
        dest: &mut dyn Composer,
    ) -> Result<(), JsonError> {
        match self.peek(chars) {
            Some('{') => self.parse_object(chars, dest),
            Some('[') => self.parse_array(chars, dest),
            Some('"') => self.parse_string_value(chars, dest),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.parse_number(chars, dest),
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_token(chars, dest),
            Some(c) => Err(JsonError::UnexpectedChar { found: c, line: self.line }),
            None => Err(JsonError::UnexpectedEnd { line: self.line }),
        }
    }

    fn parse_object<I: Iterator<Item = char>>(
        &mut self,
        chars: &mut Peekable<I>,
        dest: &mut dyn Composer,
    ) -> Result<(), JsonError> {
        dest.set_category(Category::Object);
        self.bump(chars);
        self.skip_ws_and_comments(chars)?;
        if self.peek(chars) == Some('}') {
            self.bump(chars);
            return Ok(());
        }
        loop {
            let name = self.parse_key(chars)?;
            self.skip_ws_and_comments(chars)?;
            self.expect(chars, ':')?;
            self.skip_ws_and_comments(chars)?;
            tracing::trace!(member = %name, "begin object member");
            let child = dest.begin_member(&name)?;
            self.parse_value_inner(chars, child)?;
            self.skip_ws_and_comments(chars)?;
            match self.bump(chars) {
                Some(',') => {
                    self.skip_ws_and_comments(chars)?;
                    continue;
                }
                Some('}') => break,
                Some(c) => return Err(JsonError::UnexpectedChar { found: c, line: self.line }),
                None => return Err(JsonError::UnexpectedEnd { line: self.line }),
            }
        }
        Ok(())
    }

    fn parse_array<I: Iterator<Item = char>>(
        &mut self,
        chars: &mut Peekable<I>,
        dest: &mut dyn Composer,
    ) -> Result<(), JsonError> {
        dest.set_category(Category::Array);
        self.bump(chars);
        self.skip_ws_and_comments(chars)?;
        if self.peek(chars) == Some(']') {
            self.bump(chars);
            return Ok(());
        }
        loop {
            self.skip_ws_and_comments(chars)?;
            let child = dest.begin_element()?;
            self.parse_value_inner(chars, child)?;
            self.skip_ws_and_comments(chars)?;
            match self.bump(chars) {
                Some(',') => continue,
                Some(']') => break,
                Some(c) => return Err(JsonError::UnexpectedChar { found: c, line: self.line }),
                None => return Err(JsonError::UnexpectedEnd { line: self.line }),
            }
        }
        Ok(())
    }

    /// An object key: a quoted string, or a bare `[A-Za-z_][A-Za-z0-9_]*`
    /// identifier.
    fn parse_key<I: Iterator<Item = char>>(&mut self, chars: &mut Peekable<I>) -> Result<String, JsonError> {
        match self.peek(chars) {
            Some('"') => self.parse_quoted_string(chars),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let mut s = String::new();
                while let Some(c) = self.peek(chars) {
                    if c.is_alphanumeric() || c == '_' {
                        s.push(c);
                        self.bump(chars);
                    } else {
                        break;
                    }
                }
                Ok(s)
            }
            Some(c) => Err(JsonError::UnexpectedChar { found: c, line: self.line }),
            None => Err(JsonError::UnexpectedEnd { line: self.line }),
        }
    }

    fn parse_string_value<I: Iterator<Item = char>>(
        &mut self,
        chars: &mut Peekable<I>,
        dest: &mut dyn Composer,
    ) -> Result<(), JsonError> {
        let s = self.parse_quoted_string(chars)?;
        dest.set_category(Category::Value);
        dest.set_type_name("string".to_string());
        dest.set_scalar(s.into())?;
        Ok(())
    }

    fn parse_quoted_string<I: Iterator<Item = char>>(&mut self, chars: &mut Peekable<I>) -> Result<String, JsonError> {
        self.bump(chars);
        let mut s = String::new();
        loop {
            match self.bump(chars) {
                None => return Err(JsonError::UnexpectedEnd { line: self.line }),
                Some('"') => break,
                Some('\\') => self.parse_escape(chars, &mut s)?,
                Some(c) => s.push(c),
            }
        }
        Ok(s)
    }

    fn parse_escape<I: Iterator<Item = char>>(
        &mut self,
        chars: &mut Peekable<I>,
        out: &mut String,
    ) -> Result<(), JsonError> {
        match self.bump(chars) {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let first = self.read_hex4(chars)?;
                let cp = if (0xd800..=0xdbff).contains(&first) {
                    let low = self.read_surrogate_partner(chars)?;
                    if !(0xdc00..=0xdfff).contains(&low) {
                        return Err(JsonError::InvalidEscape { line: self.line });
                    }
                    0x10000 + (((first as u32 & 0x3ff) << 10) | (low as u32 & 0x3ff))
                } else if (0xdc00..=0xdfff).contains(&first) {
                    let high = self.read_surrogate_partner(chars)?;
                    if !(0xd800..=0xdbff).contains(&high) {
                        return Err(JsonError::InvalidEscape { line: self.line });
                    }
                    0x10000 + (((high as u32 & 0x3ff) << 10) | (first as u32 & 0x3ff))
                } else {
                    first as u32
                };
                out.push(char::from_u32(cp).ok_or(JsonError::InvalidEscape { line: self.line })?);
            }
            Some(c) => return Err(JsonError::UnexpectedChar { found: c, line: self.line }),
            None => return Err(JsonError::UnexpectedEnd { line: self.line }),
        }
        Ok(())
    }

    fn read_surrogate_partner<I: Iterator<Item = char>>(&mut self, chars: &mut Peekable<I>) -> Result<u16, JsonError> {
        self.expect(chars, '\\')?;
        self.expect(chars, 'u')?;
        self.read_hex4(chars)
    }

    fn read_hex4<I: Iterator<Item = char>>(&mut self, chars: &mut Peekable<I>) -> Result<u16, JsonError> {
        let mut v: u16 = 0;
        for _ in 0..4 {
            let c = self.bump(chars).ok_or(JsonError::UnexpectedEnd { line: self.line })?;
            let d = c.to_digit(16).ok_or(JsonError::InvalidEscape { line: self.line })? as u16;
            v = (v << 4) | d;
        }
        Ok(v)
    }

    fn parse_number<I: Iterator<Item = char>>(
        &mut self,
        chars: &mut Peekable<I>,
        dest: &mut dyn Composer,
    ) -> Result<(), JsonError> {
        dest.set_category(Category::Value);
        let mut token = String::new();
        let mut is_float = false;
        while let Some(c) = self.peek(chars) {
            match c {
                '0'..='9' | '+' | '-' => {
                    token.push(c);
                    self.bump(chars);
                }
                '.' | 'e' | 'E' => {
                    is_float = true;
                    token.push(c);
                    self.bump(chars);
                }
                _ => break,
            }
        }
        if is_float {
            let v: f64 = token
                .parse()
                .map_err(|_| JsonError::InvalidNumber { token: token.clone(), line: self.line })?;
            dest.set_type_name("double".to_string());
            dest.set_scalar(v.into())?;
        } else {
            let v: i64 = token
                .parse()
                .map_err(|_| JsonError::InvalidNumber { token: token.clone(), line: self.line })?;
            dest.set_type_name("int".to_string());
            dest.set_scalar(v.into())?;
        }
        Ok(())
    }

    fn parse_token<I: Iterator<Item = char>>(
        &mut self,
        chars: &mut Peekable<I>,
        dest: &mut dyn Composer,
    ) -> Result<(), JsonError> {
        dest.set_category(Category::Value);
        let mut token = String::new();
        while let Some(c) = self.peek(chars) {
            if c.is_alphanumeric() || c == '_' {
                token.push(c.to_ascii_lowercase());
                self.bump(chars);
            } else {
                break;
            }
        }
        match token.as_str() {
            "true" => {
                dest.set_type_name("bool".to_string());
                dest.set_scalar(true.into())?;
            }
            "false" => {
                dest.set_type_name("bool".to_string());
                dest.set_scalar(false.into())?;
            }
            "null" => {
                dest.set_type_name("null".to_string());
                dest.set_null()?;
            }
            _ => {
                return Err(JsonError::UnexpectedChar {
                    found: token.chars().next().unwrap_or('?'),
                    line: self.line,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiretree_core::Node;

    fn parse(input: &str) -> Node {
        let mut chars = input.chars().peekable();
        let mut node = Node::void();
        JsonParser::new().parse_value(&mut chars, &mut node).unwrap();
        node
    }

    #[test]
    fn lenient_object_with_bare_keys_and_comments() {
        let node = parse(
            r#"{ intValue: 17, stringValue: "foo bar\t", /* c */ doubleValue: "1000", // line
            boolValue: true, nullValue: null }"#,
        );
        assert_eq!(node.get_member("intValue").unwrap().as_i64().unwrap(), 17);
        assert_eq!(node.get_member("stringValue").unwrap().as_text().unwrap(), "foo bar\t");
        assert!(node.get_member("boolValue").unwrap().as_bool().unwrap());
        assert!(node.get_member("nullValue").unwrap().is_null());
    }

    #[test]
    fn multiple_roots_read_sequentially_from_one_stream() {
        let input = "[3][4] [5]";
        let mut chars = input.chars().peekable();
        let mut parser = JsonParser::new();

        for expected in [3i64, 4, 5] {
            let mut node = Node::void();
            parser.parse_value(&mut chars, &mut node).unwrap();
            assert_eq!(node.members()[0].as_i64().unwrap(), expected);
        }
    }

    #[test]
    fn empty_input_raises_no_data() {
        let mut chars = "   ".chars().peekable();
        let mut node = Node::void();
        let err = JsonParser::new().parse_value(&mut chars, &mut node).unwrap_err();
        assert!(matches!(err, JsonError::NoData));
    }

    #[test]
    fn surrogate_pair_decodes_to_single_code_point() {
        let node = parse(r#""\uD83D\uDE00""#);
        assert_eq!(node.as_text().unwrap(), "\u{1f600}");
    }
}
