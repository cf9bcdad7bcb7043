//! Radix tree over path template segments
//!
//! Each node represents one `/`-separated segment of a path template:
//! - Static segments (e.g. `users`) match exactly
//! - Parameter segments (e.g. `{id}`) match any single segment
//! - Pattern segments (e.g. `{name}.json`) match through a compiled regex
//!
//! Routes are stored at terminal nodes, keyed by HTTP method. Lookup prefers
//! static over pattern over parameter children and backtracks when a more
//! specific branch dead-ends.

use http::Method;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

use super::core::ParamVec;
use crate::error::RouteIndexError;
use crate::spec::RouteMeta;

/// A parsed segment of a path template.
#[derive(Debug, Clone)]
pub(crate) enum TemplateSegment {
    Static(String),
    Param(Arc<str>),
    Pattern(SegmentPattern),
}

/// A segment mixing literal text and parameters, like `{name}.{ext}`.
#[derive(Debug, Clone)]
pub(crate) struct SegmentPattern {
    regex: Regex,
    names: Vec<Arc<str>>,
    /// Regex source with parameter names erased, used as the segment's shape.
    shape: String,
}

impl TemplateSegment {
    fn shape(&self) -> &str {
        match self {
            TemplateSegment::Static(s) => s,
            TemplateSegment::Param(_) => "{}",
            TemplateSegment::Pattern(p) => &p.shape,
        }
    }
}

fn invalid(path: &str, reason: impl Into<String>) -> RouteIndexError {
    RouteIndexError::InvalidTemplate {
        path: path.to_string(),
        reason: reason.into(),
    }
}

/// Split a path template into segments, validating its syntax.
pub(crate) fn parse_template(path: &str) -> Result<Vec<TemplateSegment>, RouteIndexError> {
    if !path.starts_with('/') {
        return Err(invalid(path, "must start with `/`"));
    }

    let mut segments = Vec::new();
    let mut seen_names: Vec<Arc<str>> = Vec::new();

    for raw in path.split('/').filter(|s| !s.is_empty()) {
        if !raw.contains('{') && !raw.contains('}') {
            segments.push(TemplateSegment::Static(raw.to_string()));
            continue;
        }

        let mut names = Vec::new();
        let mut pattern = String::from("^");
        let mut shape = String::new();
        let mut rest = raw;
        while !rest.is_empty() {
            match rest.find(['{', '}']) {
                None => {
                    pattern.push_str(&regex::escape(rest));
                    shape.push_str(rest);
                    rest = "";
                }
                Some(pos) if rest.as_bytes()[pos] == b'}' => {
                    return Err(invalid(path, "unbalanced `}`"));
                }
                Some(pos) => {
                    let literal = &rest[..pos];
                    pattern.push_str(&regex::escape(literal));
                    shape.push_str(literal);
                    let after = &rest[pos + 1..];
                    let end = after
                        .find('}')
                        .ok_or_else(|| invalid(path, "unbalanced `{`"))?;
                    let name = &after[..end];
                    if name.is_empty() || name.contains('{') {
                        return Err(invalid(path, "empty or nested parameter name"));
                    }
                    names.push(Arc::<str>::from(name));
                    pattern.push_str("(.+?)");
                    shape.push_str("{}");
                    rest = &after[end + 1..];
                }
            }
        }
        pattern.push('$');

        for name in &names {
            if seen_names.contains(name) {
                return Err(invalid(path, format!("parameter `{name}` appears twice")));
            }
            seen_names.push(Arc::clone(name));
        }

        if shape == "{}" {
            segments.push(TemplateSegment::Param(Arc::clone(&names[0])));
        } else {
            let regex = Regex::new(&pattern).map_err(|e| invalid(path, e.to_string()))?;
            segments.push(TemplateSegment::Pattern(SegmentPattern {
                regex,
                names,
                shape,
            }));
        }
    }

    Ok(segments)
}

/// Shape of a template: parameter names erased, so `/a/{x}` and `/a/{y}` agree.
pub(crate) fn template_shape(segments: &[TemplateSegment]) -> String {
    let mut shape = String::new();
    for segment in segments {
        shape.push('/');
        shape.push_str(segment.shape());
    }
    if shape.is_empty() {
        shape.push('/');
    }
    shape
}

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Static(String),
    Param(Arc<str>),
    Pattern(SegmentPattern),
}

/// Node in the radix tree for route matching
#[derive(Debug, Clone)]
struct RadixNode {
    kind: NodeKind,
    /// Route metadata per HTTP method, when a template ends at this node
    routes: HashMap<Method, Arc<RouteMeta>>,
    children: Vec<RadixNode>,
    pattern_children: Vec<RadixNode>,
    param_children: Vec<RadixNode>,
}

impl RadixNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            routes: HashMap::new(),
            children: Vec::new(),
            pattern_children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    fn insert(&mut self, segments: &[TemplateSegment], route: Arc<RouteMeta>) {
        let Some((segment, remaining)) = segments.split_first() else {
            self.routes.insert(route.method.clone(), route);
            return;
        };

        let child = match segment {
            TemplateSegment::Static(s) => {
                let pos = self
                    .children
                    .iter()
                    .position(|c| matches!(&c.kind, NodeKind::Static(existing) if existing == s));
                match pos {
                    Some(pos) => &mut self.children[pos],
                    None => {
                        self.children.push(RadixNode::new(NodeKind::Static(s.clone())));
                        let last = self.children.len() - 1;
                        &mut self.children[last]
                    }
                }
            }
            TemplateSegment::Param(name) => {
                // Different parameter names at the same depth get distinct nodes
                let pos = self
                    .param_children
                    .iter()
                    .position(|c| matches!(&c.kind, NodeKind::Param(existing) if existing == name));
                match pos {
                    Some(pos) => &mut self.param_children[pos],
                    None => {
                        self.param_children
                            .push(RadixNode::new(NodeKind::Param(Arc::clone(name))));
                        let last = self.param_children.len() - 1;
                        &mut self.param_children[last]
                    }
                }
            }
            TemplateSegment::Pattern(pattern) => {
                let pos = self.pattern_children.iter().position(|c| {
                    matches!(&c.kind, NodeKind::Pattern(existing)
                        if existing.regex.as_str() == pattern.regex.as_str() && existing.names == pattern.names)
                });
                match pos {
                    Some(pos) => &mut self.pattern_children[pos],
                    None => {
                        self.pattern_children
                            .push(RadixNode::new(NodeKind::Pattern(pattern.clone())));
                        let last = self.pattern_children.len() - 1;
                        &mut self.pattern_children[last]
                    }
                }
            }
        };
        child.insert(remaining, route);
    }

    /// Depth-first search with backtracking.
    ///
    /// `path_matched` is set when some template matched the whole path, even
    /// if it has no operation for `method`.
    fn search(
        &self,
        segments: &[&str],
        method: &Method,
        params: &mut ParamVec,
        path_matched: &mut bool,
    ) -> Option<Arc<RouteMeta>> {
        let Some((segment, remaining)) = segments.split_first() else {
            if self.routes.is_empty() {
                return None;
            }
            *path_matched = true;
            return self.routes.get(method).cloned();
        };

        for child in &self.children {
            if matches!(&child.kind, NodeKind::Static(s) if s == segment) {
                if let Some(route) = child.search(remaining, method, params, path_matched) {
                    return Some(route);
                }
            }
        }

        for child in &self.pattern_children {
            let NodeKind::Pattern(pattern) = &child.kind else { continue };
            let Some(captures) = pattern.regex.captures(segment) else { continue };
            let mark = params.len();
            for (i, name) in pattern.names.iter().enumerate() {
                let value = captures.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                params.push((Arc::clone(name), value.to_string()));
            }
            if let Some(route) = child.search(remaining, method, params, path_matched) {
                return Some(route);
            }
            params.truncate(mark);
        }

        for child in &self.param_children {
            let NodeKind::Param(name) = &child.kind else { continue };
            params.push((Arc::clone(name), (*segment).to_string()));
            if let Some(route) = child.search(remaining, method, params, path_matched) {
                return Some(route);
            }
            // Backtrack: remove the parameter if the search fails
            params.pop();
        }

        None
    }
}

/// Outcome of a path lookup.
#[derive(Debug)]
pub(crate) enum PathLookup {
    Matched(Arc<RouteMeta>, ParamVec),
    MethodNotAllowed,
    NotFound,
}

/// Radix tree-based path matcher
#[derive(Debug, Clone)]
pub(crate) struct PathTree {
    root: RadixNode,
}

impl PathTree {
    /// Build the tree, rejecting invalid templates and ambiguous routes.
    pub(crate) fn new(routes: &[Arc<RouteMeta>]) -> Result<Self, RouteIndexError> {
        let mut root = RadixNode::new(NodeKind::Root);
        let mut shapes: HashMap<(String, Method), Arc<str>> = HashMap::new();

        for route in routes {
            let segments = parse_template(&route.path_pattern)?;
            let key = (template_shape(&segments), route.method.clone());
            if let Some(first) = shapes.get(&key) {
                return Err(RouteIndexError::Ambiguous {
                    method: route.method.clone(),
                    first: first.to_string(),
                    second: route.path_pattern.to_string(),
                });
            }
            shapes.insert(key, Arc::clone(&route.path_pattern));
            root.insert(&segments, Arc::clone(route));
        }

        Ok(Self { root })
    }

    /// Look up already percent-decoded path segments.
    pub(crate) fn lookup(&self, segments: &[&str], method: &Method) -> PathLookup {
        let mut params = ParamVec::new();
        let mut path_matched = false;
        match self.root.search(segments, method, &mut params, &mut path_matched) {
            Some(route) => PathLookup::Matched(route, params),
            None if path_matched => PathLookup::MethodNotAllowed,
            None => PathLookup::NotFound,
        }
    }
}
