//! Matching request URLs against the document's `servers` list.
//!
//! A server URL is a template: `{var}` placeholders match one of the
//! variable's `enum` values when given, otherwise any text without `/`.
//! Relative server URLs (`/v1`) match any host; absolute ones must agree on
//! scheme and host, and on the port when the server URL names one.

use crate::error::RouteIndexError;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct ServerEntry {
    url: String,
    #[serde(default)]
    variables: BTreeMap<String, ServerVariableEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerVariableEntry {
    #[serde(rename = "enum", default)]
    values: Vec<String>,
}

/// One compiled entry of the `servers` list.
#[derive(Debug, Clone)]
pub struct ServerMatcher {
    url: String,
    /// Anchored matcher for `scheme://authority`; `None` for relative servers.
    origin: Option<Regex>,
    /// Matches the base path and captures the remainder as `rest`.
    base_path: Regex,
}

fn invalid(url: &str, reason: impl Into<String>) -> RouteIndexError {
    RouteIndexError::InvalidServer {
        url: url.to_string(),
        reason: reason.into(),
    }
}

/// Turn a server URL fragment into regex source, expanding variables.
fn template_regex(
    url: &str,
    fragment: &str,
    variables: &BTreeMap<String, ServerVariableEntry>,
) -> Result<String, RouteIndexError> {
    let mut out = String::with_capacity(fragment.len() + 8);
    let mut rest = fragment;
    while let Some(start) = rest.find('{') {
        let literal = &rest[..start];
        if literal.contains('}') {
            return Err(invalid(url, "unbalanced `}`"));
        }
        out.push_str(&regex::escape(literal));
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| invalid(url, "unbalanced `{`"))?;
        let name = &after[..end];
        match variables.get(name) {
            Some(var) if !var.values.is_empty() => {
                let alternatives: Vec<String> = var.values.iter().map(|v| regex::escape(v)).collect();
                out.push_str("(?:");
                out.push_str(&alternatives.join("|"));
                out.push(')');
            }
            _ => out.push_str("[^/]+"),
        }
        rest = &after[end + 1..];
    }
    if rest.contains('}') {
        return Err(invalid(url, "unbalanced `}`"));
    }
    out.push_str(&regex::escape(rest));
    Ok(out)
}

impl ServerMatcher {
    /// The implicit server used when a document declares none.
    fn root() -> Result<Self, RouteIndexError> {
        Self::compile(&ServerEntry {
            url: "/".to_string(),
            variables: BTreeMap::new(),
        })
    }

    /// Compile every entry of the document's top-level `servers` list.
    pub fn from_document(document: &Value) -> Result<Vec<Self>, RouteIndexError> {
        let entries = match document.get("servers") {
            None | Some(Value::Null) => Vec::new(),
            Some(servers) => Vec::<ServerEntry>::deserialize(servers)
                .map_err(|e| invalid("<servers>", e.to_string()))?,
        };
        if entries.is_empty() {
            return Ok(vec![Self::root()?]);
        }
        entries.iter().map(Self::compile).collect()
    }

    fn compile(entry: &ServerEntry) -> Result<Self, RouteIndexError> {
        let url = entry.url.trim();

        let (origin, path) = match url.split_once("://") {
            Some((scheme, remainder)) => {
                if scheme.is_empty() {
                    return Err(invalid(url, "missing scheme"));
                }
                let (authority, path) = match remainder.find('/') {
                    Some(pos) => remainder.split_at(pos),
                    None => (remainder, ""),
                };
                if authority.is_empty() {
                    return Err(invalid(url, "missing host"));
                }
                let mut source = format!(
                    "^(?i:{}://{})",
                    template_regex(url, scheme, &entry.variables)?,
                    template_regex(url, authority, &entry.variables)?
                );
                // A server without an explicit port accepts any port
                if !authority.contains(':') {
                    source.push_str(r"(?::\d+)?");
                }
                source.push('$');
                let origin = Regex::new(&source).map_err(|e| invalid(url, e.to_string()))?;
                (Some(origin), path.to_string())
            }
            None if url.is_empty() || url == "." => (None, String::new()),
            None if url.starts_with('/') => (None, url.to_string()),
            None => (None, format!("/{url}")),
        };

        let base = template_regex(url, path.trim_end_matches('/'), &entry.variables)?;
        let base_path = Regex::new(&format!("^{base}(?P<rest>/.*)?$"))
            .map_err(|e| invalid(url, e.to_string()))?;

        Ok(Self {
            url: url.to_string(),
            origin,
            base_path,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.origin.is_some()
    }

    /// Match a request and return the path below the server's base path.
    ///
    /// An absolute server never matches a request without an authority.
    #[must_use]
    pub fn strip<'a>(&self, scheme: &str, authority: Option<&str>, path: &'a str) -> Option<&'a str> {
        if let Some(origin) = &self.origin {
            let authority = authority?;
            if !origin.is_match(&format!("{scheme}://{authority}")) {
                return None;
            }
        }
        let captures = self.base_path.captures(path)?;
        Some(captures.name("rest").map_or("/", |m| m.as_str()))
    }
}
