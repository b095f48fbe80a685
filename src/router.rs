use std::collections::HashMap;

use url::form_urlencoded;

pub const DEFAULT_PATH: &str = "/search";

pub type Params = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                _ => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }

    fn matches(&self, path: &str) -> Option<Params> {
        let parts = path.split('/').collect::<Vec<_>>();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() || part.contains('?') => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub handler: &'a H,
    pub pattern: &'a str,
    pub params: Params,
    pub query: Params,
}

#[derive(Debug)]
pub enum Resolution<'a, H> {
    Matched(RouteMatch<'a, H>),
    NotFound { handler: &'a H, path: String },
    Unhandled,
}

impl<H> Resolution<'_, H> {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

#[derive(Debug)]
pub struct Router<H> {
    literal: HashMap<String, H>,
    patterns: Vec<(Pattern, H)>,
    not_found: Option<H>,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self {
            literal: HashMap::new(),
            patterns: Vec::new(),
            not_found: None,
        }
    }
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&mut self, pattern: &str, handler: H) {
        let parsed = Pattern::parse(pattern);
        if parsed.is_literal() {
            self.literal.insert(pattern.to_string(), handler);
            return;
        }

        match self.patterns.iter_mut().find(|(p, _)| p.raw == pattern) {
            Some((_, existing)) => *existing = handler,
            None => self.patterns.push((parsed, handler)),
        }
    }

    pub fn set_not_found(&mut self, handler: H) {
        self.not_found = Some(handler);
    }

    pub fn resolve<'a>(&'a self, full_path: &str) -> Resolution<'a, H> {
        let (path, query_string) = match full_path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (full_path, None),
        };

        // Literal routes shadow parametrized ones.
        if let Some((pattern, handler)) = self.literal.get_key_value(path) {
            return Resolution::Matched(RouteMatch {
                handler,
                pattern: pattern.as_str(),
                params: Params::new(),
                query: parse_query(query_string),
            });
        }

        for (pattern, handler) in &self.patterns {
            if let Some(params) = pattern.matches(path) {
                return Resolution::Matched(RouteMatch {
                    handler,
                    pattern: pattern.raw.as_str(),
                    params,
                    query: parse_query(query_string),
                });
            }
        }

        match &self.not_found {
            Some(handler) => Resolution::NotFound {
                handler,
                path: path.to_string(),
            },
            None => Resolution::Unhandled,
        }
    }
}

pub fn parse_query(query_string: Option<&str>) -> Params {
    let Some(query_string) = query_string.filter(|q| !q.is_empty()) else {
        return Params::new();
    };
    let mut params = Params::new();
    for (key, value) in form_urlencoded::parse(query_string.as_bytes()) {
        params.insert(key.into_owned(), value.into_owned());
    }
    params
}

#[derive(Debug)]
pub struct Navigator<H> {
    router: Router<H>,
    history: Vec<String>,
}

impl<H> Navigator<H> {
    pub fn new(router: Router<H>) -> Self {
        Self {
            router,
            history: Vec::new(),
        }
    }

    pub fn router(&self) -> &Router<H> {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router<H> {
        &mut self.router
    }

    pub fn current_path(&self) -> &str {
        self.history
            .last()
            .map(String::as_str)
            .filter(|path| !path.is_empty())
            .unwrap_or(DEFAULT_PATH)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn navigate(&mut self, path: &str, replace: bool) -> Resolution<'_, H> {
        if replace {
            self.history.pop();
        }
        self.history.push(path.to_string());
        self.handle_current()
    }

    pub fn back(&mut self) -> Option<Resolution<'_, H>> {
        self.history.pop()?;
        Some(self.handle_current())
    }

    pub fn handle_current(&self) -> Resolution<'_, H> {
        self.router.resolve(self.current_path())
    }
}
