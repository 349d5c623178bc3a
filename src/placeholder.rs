//! Placeholder resolution over a merged configuration tree.
//!
//! String values may embed `${path}` or `${path:default}` tokens. Each token is looked up
//! in the source tree first, then in the environment, then falls back to its default.
//! Looked-up strings that carry their own tokens are resolved recursively; a reference
//! chain that revisits a path fails instead of recursing forever.

use crate::errors::{Error, Result};
use crate::tree::{self, Env, Tree};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::trace;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{[^{}]*\}").expect("placeholder pattern is valid"));

/// Upper bound on nested lookups, independent of the explicit cycle check.
const MAX_DEPTH: usize = 64;

/// Resolve every placeholder in `tree`, returning a new tree of the same shape.
pub fn resolve_placeholders(tree: &Tree, env: &Env) -> Result<Tree> {
    PlaceholderResolver::new(tree, env).resolve_tree()
}

/// Map a dotted path to its conventional environment variable name.
///
/// `services.default.host` becomes `SERVICES_DEFAULT_HOST`.
pub fn env_key(path: &str) -> String {
    path.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

#[derive(Debug, PartialEq)]
struct Token {
    path: String,
    default: Option<String>,
}

#[derive(Debug, PartialEq)]
enum Segment<'s> {
    Literal(&'s str),
    Token(Token),
}

fn parse_segments(input: &str) -> Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for found in PLACEHOLDER.find_iter(input) {
        push_literal(&mut segments, input, &input[last..found.start()])?;

        let text = found.as_str();
        let body = &text[2..text.len() - 1];
        let (path, default) = match body.split_once(':') {
            Some((path, default)) => (path.trim(), Some(default.to_string())),
            None => (body.trim(), None),
        };
        if path.is_empty() {
            return Err(Error::syntax(input, "placeholder has an empty path"));
        }

        segments.push(Segment::Token(Token { path: path.to_string(), default }));
        last = found.end();
    }

    push_literal(&mut segments, input, &input[last..])?;
    Ok(segments)
}

fn push_literal<'s>(segments: &mut Vec<Segment<'s>>, input: &str, literal: &'s str) -> Result<()> {
    if literal.contains("${") {
        return Err(Error::syntax(input, "unterminated or nested placeholder"));
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Resolves placeholders against an immutable source tree.
pub struct PlaceholderResolver<'a> {
    source: &'a Tree,
    env: &'a Env,
}

impl<'a> PlaceholderResolver<'a> {
    pub fn new(source: &'a Tree, env: &'a Env) -> Self {
        Self { source, env }
    }

    /// Produce a fully resolved copy of the source tree.
    pub fn resolve_tree(&self) -> Result<Tree> {
        let mut stack = Vec::new();
        let mut resolved = Tree::new();
        for (key, value) in self.source {
            resolved.insert(key.clone(), self.resolve_value(value, &mut stack)?);
        }
        Ok(resolved)
    }

    /// Resolve a single string as if it appeared in the tree.
    pub fn resolve_str(&self, input: &str) -> Result<Value> {
        self.resolve_string(input, &mut Vec::new())
    }

    fn resolve_value(&self, value: &Value, stack: &mut Vec<String>) -> Result<Value> {
        match value {
            Value::String(s) => self.resolve_string(s, stack),
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item, stack))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut resolved = Tree::new();
                for (key, item) in map {
                    resolved.insert(key.clone(), self.resolve_value(item, stack)?);
                }
                Ok(Value::Object(resolved))
            }
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(&self, input: &str, stack: &mut Vec<String>) -> Result<Value> {
        let segments = parse_segments(input)?;

        // A lone token keeps a mapping or sequence intact instead of flattening it.
        if let [Segment::Token(token)] = segments.as_slice() {
            let value = self.resolve_token(token, stack)?;
            return Ok(match scalar_text(&value) {
                Some(text) => Value::String(text),
                None => value,
            });
        }

        let mut output = String::with_capacity(input.len());
        for segment in &segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Token(token) => {
                    let value = self.resolve_token(token, stack)?;
                    let text = scalar_text(&value).ok_or_else(|| {
                        Error::syntax(
                            input,
                            format!(
                                "'{}' is a mapping or sequence and cannot be embedded in text",
                                token.path
                            ),
                        )
                    })?;
                    output.push_str(&text);
                }
            }
        }
        Ok(Value::String(output))
    }

    fn resolve_token(&self, token: &Token, stack: &mut Vec<String>) -> Result<Value> {
        if let Some(found) = tree::lookup(self.source, &token.path) {
            if stack.contains(&token.path) || stack.len() >= MAX_DEPTH {
                let mut chain = stack.clone();
                chain.push(token.path.clone());
                return Err(Error::CyclicReference { chain: chain.join(" -> ") });
            }

            trace!(path = %token.path, source = "tree", "Resolving placeholder");
            stack.push(token.path.clone());
            let resolved = self.resolve_value(found, stack);
            stack.pop();
            return resolved;
        }

        if let Some(value) = self.lookup_env(&token.path) {
            trace!(path = %token.path, source = "env", "Resolving placeholder");
            return Ok(Value::String(value.clone()));
        }

        if let Some(default) = &token.default {
            trace!(path = %token.path, source = "default", "Resolving placeholder");
            return Ok(Value::String(default.clone()));
        }

        Err(Error::unresolved(&token.path))
    }

    fn lookup_env(&self, path: &str) -> Option<&String> {
        self.env.get(path).or_else(|| self.env.get(&env_key(path)))
    }
}
