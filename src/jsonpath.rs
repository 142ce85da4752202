// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! A kubectl-compatible subset of jsonpath templates.
//!
//! `oc get -o=jsonpath=...` is the only way the end-to-end suites read cluster state.
//! The `oc` backend hands the template to the CLI verbatim; the kube backend evaluates
//! it locally with [`Template::render`] so both backends agree on the output format.
//!
//! # Supported syntax
//!
//! - `{.status.replicas}` - field access, `$` root prefix optional
//! - `{.items[0].metadata.name}`, `{.items[-1]...}` - array index
//! - `{.items[*].metadata.name}` - wildcard over arrays and object values
//! - `{.metadata.labels['app.kubernetes.io/name']}` - quoted member names
//! - `{.status.conditions[?(@.type=="Available")].status}` - filters with `==`, `!=`
//!   or bare existence (`[?(@.deletionTimestamp)]`)
//! - literal text between expressions, e.g. `{.a}/{.b}`
//!
//! Missing fields render as the empty string. Multiple results of one expression are
//! joined with a single space, matching kubectl.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A jsonpath template failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid jsonpath '{expression}' at offset {offset}: {message}")]
pub struct JsonPathError {
    /// The full template text
    pub expression: String,
    /// Byte offset of the problem
    pub offset: usize,
    /// What went wrong
    pub message: String,
}

/// A parsed jsonpath template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    Expr(Vec<Segment>),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Field(String),
    Index(i64),
    Wildcard,
    Filter(Filter),
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    path: Vec<String>,
    op: FilterOp,
}

#[derive(Debug, Clone, PartialEq)]
enum FilterOp {
    Exists,
    Eq(String),
    Ne(String),
}

impl Template {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns [`JsonPathError`] for unbalanced braces, unsupported constructs such as
    /// `{range}`, or a template without any `{...}` expression.
    pub fn parse(source: &str) -> Result<Self, JsonPathError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            if c != '{' {
                literal.push(c);
                continue;
            }
            if !literal.is_empty() {
                parts.push(Part::Literal(std::mem::take(&mut literal)));
            }

            let start = offset + 1;
            let mut quote: Option<char> = None;
            let mut end = None;
            for (idx, ch) in chars.by_ref() {
                match (quote, ch) {
                    (Some(q), ch) if ch == q => quote = None,
                    (Some(_), _) => {}
                    (None, '\'' | '"') => quote = Some(ch),
                    (None, '}') => {
                        end = Some(idx);
                        break;
                    }
                    (None, _) => {}
                }
            }
            let end = end.ok_or_else(|| error(source, offset, "unterminated '{'"))?;
            let segments = ExprParser::new(source, start, &source[start..end]).parse()?;
            parts.push(Part::Expr(segments));
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        if !parts.iter().any(|p| matches!(p, Part::Expr(_))) {
            return Err(error(source, 0, "template contains no '{...}' expression"));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    /// `{.status.conditions[?(@.type=="<name>")].status}` for each name, concatenated.
    #[must_use]
    pub fn condition_statuses(names: &[&str]) -> Self {
        let source = names
            .iter()
            .map(|name| format!(r#"{{.status.conditions[?(@.type=="{name}")].status}}"#))
            .collect();
        let parts = names
            .iter()
            .map(|name| {
                Part::Expr(vec![
                    Segment::Field("status".to_string()),
                    Segment::Field("conditions".to_string()),
                    Segment::Filter(Filter {
                        path: vec!["type".to_string()],
                        op: FilterOp::Eq((*name).to_string()),
                    }),
                    Segment::Field("status".to_string()),
                ])
            })
            .collect();
        Self { source, parts }
    }

    /// The original template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Render the template against a JSON document.
    #[must_use]
    pub fn render(&self, root: &Value) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Expr(segments) => {
                    let rendered: Vec<String> = evaluate(segments, root)
                        .into_iter()
                        .filter_map(scalar_text)
                        .collect();
                    out.push_str(&rendered.join(" "));
                }
            }
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn error(source: &str, offset: usize, message: &str) -> JsonPathError {
    JsonPathError {
        expression: source.to_string(),
        offset,
        message: message.to_string(),
    }
}

struct ExprParser<'a> {
    source: &'a str,
    base: usize,
    expr: &'a [u8],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn new(source: &'a str, base: usize, expr: &'a str) -> Self {
        Self {
            source,
            base,
            expr: expr.as_bytes(),
            pos: 0,
        }
    }

    fn fail(&self, message: &str) -> JsonPathError {
        error(self.source, self.base + self.pos, message)
    }

    fn peek(&self) -> Option<u8> {
        self.expr.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), JsonPathError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.fail(&format!("expected '{}'", byte as char)))
        }
    }

    fn parse(mut self) -> Result<Vec<Segment>, JsonPathError> {
        let mut segments = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b'$') {
            self.pos += 1;
        }

        while let Some(c) = self.peek() {
            match c {
                b'.' => {
                    self.pos += 1;
                    if self.peek() == Some(b'.') {
                        return Err(self.fail("recursive descent '..' is not supported"));
                    }
                    let name = self.identifier();
                    if !name.is_empty() {
                        segments.push(Segment::Field(name));
                    }
                }
                b'[' => {
                    self.pos += 1;
                    segments.push(self.bracket()?);
                }
                b' ' | b'\t' => {
                    self.skip_ws();
                    if self.peek().is_some() {
                        return Err(self.fail("unexpected whitespace in expression"));
                    }
                }
                _ if segments.is_empty() && self.pos == 0 => {
                    let word = self.identifier();
                    return Err(self.fail(&format!("unsupported template function '{word}'")));
                }
                _ => return Err(self.fail("unexpected character")),
            }
        }
        Ok(segments)
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.expr[start..self.pos]).into_owned()
    }

    fn quoted(&mut self) -> Result<String, JsonPathError> {
        let quote = self.peek().ok_or_else(|| self.fail("expected quote"))?;
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let text = String::from_utf8_lossy(&self.expr[start..self.pos]).into_owned();
                self.pos += 1;
                return Ok(text);
            }
            self.pos += 1;
        }
        Err(self.fail("unterminated string"))
    }

    fn bracket(&mut self) -> Result<Segment, JsonPathError> {
        self.skip_ws();
        let segment = match self.peek() {
            Some(b'*') => {
                self.pos += 1;
                Segment::Wildcard
            }
            Some(b'\'' | b'"') => Segment::Field(self.quoted()?),
            Some(b'?') => {
                self.pos += 1;
                Segment::Filter(self.filter()?)
            }
            Some(c) if c == b'-' || c.is_ascii_digit() => {
                let start = self.pos;
                self.pos += 1;
                while matches!(self.peek(), Some(d) if d.is_ascii_digit()) {
                    self.pos += 1;
                }
                let text = std::str::from_utf8(&self.expr[start..self.pos])
                    .map_err(|_| self.fail("invalid index"))?;
                let index = text.parse::<i64>().map_err(|_| self.fail("invalid index"))?;
                Segment::Index(index)
            }
            _ => return Err(self.fail("unsupported subscript")),
        };
        self.skip_ws();
        self.expect(b']')?;
        Ok(segment)
    }

    fn filter(&mut self) -> Result<Filter, JsonPathError> {
        self.expect(b'(')?;
        self.skip_ws();
        // kubectl accepts `?(.type == "x")` as shorthand for `?(@.type == "x")`
        if self.peek() == Some(b'@') {
            self.pos += 1;
        }

        let mut path = Vec::new();
        while self.peek() == Some(b'.') {
            self.pos += 1;
            let name = self.identifier();
            if name.is_empty() {
                return Err(self.fail("expected field name in filter"));
            }
            path.push(name);
        }
        if path.is_empty() {
            return Err(self.fail("filter must reference a field"));
        }

        self.skip_ws();
        let op = match (self.peek(), self.expr.get(self.pos + 1).copied()) {
            (Some(b'='), Some(b'=')) => {
                self.pos += 2;
                self.skip_ws();
                FilterOp::Eq(self.literal()?)
            }
            (Some(b'!'), Some(b'=')) => {
                self.pos += 2;
                self.skip_ws();
                FilterOp::Ne(self.literal()?)
            }
            (Some(b')'), _) => FilterOp::Exists,
            _ => return Err(self.fail("expected '==', '!=' or ')' in filter")),
        };
        self.skip_ws();
        self.expect(b')')?;
        Ok(Filter { path, op })
    }

    fn literal(&mut self) -> Result<String, JsonPathError> {
        match self.peek() {
            Some(b'\'' | b'"') => self.quoted(),
            Some(_) => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'.' || c == b'-')
                {
                    self.pos += 1;
                }
                if start == self.pos {
                    return Err(self.fail("expected literal"));
                }
                Ok(String::from_utf8_lossy(&self.expr[start..self.pos]).into_owned())
            }
            None => Err(self.fail("expected literal")),
        }
    }
}

fn evaluate<'v>(segments: &[Segment], root: &'v Value) -> Vec<&'v Value> {
    let mut current = vec![root];
    for segment in segments {
        let mut next = Vec::new();
        for value in current {
            match segment {
                Segment::Field(name) => {
                    if let Some(child) = value.get(name.as_str()) {
                        next.push(child);
                    }
                }
                Segment::Index(index) => {
                    if let Value::Array(items) = value {
                        let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                        let resolved = if *index < 0 { len + index } else { *index };
                        if let Some(item) = usize::try_from(resolved).ok().and_then(|i| items.get(i))
                        {
                            next.push(item);
                        }
                    }
                }
                Segment::Wildcard => match value {
                    Value::Array(items) => next.extend(items.iter()),
                    Value::Object(map) => next.extend(map.values()),
                    _ => {}
                },
                Segment::Filter(filter) => {
                    if let Value::Array(items) = value {
                        next.extend(items.iter().filter(|item| filter.accepts(item)));
                    }
                }
            }
        }
        current = next;
    }
    current
}

impl Filter {
    fn accepts(&self, item: &Value) -> bool {
        let found = self
            .path
            .iter()
            .try_fold(item, |value, name| value.get(name.as_str()));
        match (&self.op, found) {
            (FilterOp::Exists, Some(value)) => !matches!(value, Value::Null | Value::Bool(false)),
            (FilterOp::Exists, None) => false,
            (FilterOp::Eq(expected), Some(value)) => {
                scalar_text(value).as_deref() == Some(expected.as_str())
            }
            (FilterOp::Eq(_), None) => false,
            (FilterOp::Ne(expected), Some(value)) => {
                scalar_text(value).as_deref() != Some(expected.as_str())
            }
            (FilterOp::Ne(_), None) => true,
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
#[path = "jsonpath_tests.rs"]
mod jsonpath_tests;
