//! URI templates with `{name}` placeholders in the path and query.
//!
//! A template such as `/users/{id}?active={active}` compiles to an anchored
//! path regex plus one matcher per declared query key. Matching is boolean;
//! it does not extract parameter values.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use oas_transcode::{ParamDefinition, UriTemplate};
//!
//! let template = UriTemplate::new("/users/{id}").unwrap();
//! assert!(template.matches("/users/42"));
//! assert!(!template.matches("/users/42/extra"));
//!
//! let definitions = HashMap::from([("id".to_string(), ParamDefinition::required())]);
//! let values = HashMap::from([("id".to_string(), "7".to_string())]);
//! assert_eq!(template.resolve(&definitions, &values).unwrap(), "/users/7");
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use tracing::debug;

use crate::error::UriTemplateError;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("valid regex"));

/// What a placeholder matches: one or more characters up to the next
/// separator.
const WILDCARD: &str = "[^/&?]+";

/// Everything but RFC 3986 unreserved characters is escaped on resolve.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Declared properties of a template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamDefinition {
    pub required: bool,
}

impl ParamDefinition {
    pub fn required() -> Self {
        Self { required: true }
    }

    pub fn optional() -> Self {
        Self { required: false }
    }
}

#[derive(Debug, Clone)]
struct QueryMatcher {
    regex: Regex,
    /// Decoded literal value; `None` for placeholders.
    literal: Option<String>,
}

impl QueryMatcher {
    /// A key whose matcher demands a non-empty literal must be present.
    fn requires_presence(&self) -> bool {
        self.literal.as_deref().is_some_and(|l| !l.is_empty())
    }
}

/// A compiled URI template. Immutable once built.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    pattern: String,
    path_matcher: Regex,
    query_matchers: IndexMap<String, QueryMatcher>,
}

impl UriTemplate {
    /// Compile a template.
    ///
    /// # Errors
    ///
    /// Returns `UriTemplateError::InvalidPattern` if a matcher fails to compile.
    pub fn new(pattern: impl Into<String>) -> Result<Self, UriTemplateError> {
        let pattern = pattern.into();
        let (path, query) = split_query(&pattern);

        let path_matcher = compile(&pattern, &path_regex(path))?;

        let mut query_matchers = IndexMap::new();
        for (name, value) in query_pairs(query.unwrap_or("")) {
            let matcher = if is_placeholder(value) {
                QueryMatcher {
                    regex: compile(&pattern, &format!("^{}$", WILDCARD))?,
                    literal: None,
                }
            } else {
                let literal = decode(value);
                QueryMatcher {
                    regex: compile(&pattern, &format!("^{}$", regex::escape(&literal)))?,
                    literal: Some(literal),
                }
            };
            query_matchers.insert(decode(name), matcher);
        }

        debug!(
            pattern = %pattern,
            query_params = query_matchers.len(),
            "URI template compiled"
        );

        Ok(Self {
            pattern,
            path_matcher,
            query_matchers,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        PLACEHOLDER
            .captures_iter(&self.pattern)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Check whether `uri` fits this template.
    ///
    /// The decoded path must match in full. Every query key of `uri` must be
    /// declared and its decoded value must match the declared matcher.
    /// Declared keys missing from `uri` are tolerated unless their template
    /// value is a non-empty literal; whether a placeholder is required is
    /// decided by the parameter definitions, not here.
    pub fn matches(&self, uri: &str) -> bool {
        let (path, query) = split_query(uri);
        if !self.path_matcher.is_match(&decode(path)) {
            return false;
        }

        let mut seen = HashSet::new();
        for (key, value) in query_pairs(query.unwrap_or("")) {
            let key = decode(key);
            let Some(matcher) = self.query_matchers.get(&key) else {
                return false;
            };
            if !matcher.regex.is_match(&decode(value)) {
                return false;
            }
            seen.insert(key);
        }

        self.query_matchers
            .iter()
            .all(|(key, matcher)| seen.contains(key) || !matcher.requires_presence())
    }

    /// Substitute parameter values into the template.
    ///
    /// Placeholders are visited in order of first appearance. A placeholder
    /// without a value is replaced by the empty string unless its definition
    /// marks it required. Values are percent-decoded, then re-encoded, so
    /// pre-escaped input is not escaped twice.
    ///
    /// # Errors
    ///
    /// Returns `UriTemplateError::MissingRequiredParameter` for the first
    /// required placeholder without a value.
    pub fn resolve(
        &self,
        definitions: &HashMap<String, ParamDefinition>,
        values: &HashMap<String, String>,
    ) -> Result<String, UriTemplateError> {
        let mut resolved = self.pattern.clone();

        for name in self.placeholders() {
            let raw = match values.get(name) {
                Some(value) => value.as_str(),
                None if definitions.get(name).is_some_and(|d| d.required) => {
                    return Err(UriTemplateError::MissingRequiredParameter {
                        name: name.to_string(),
                    })
                }
                None => "",
            };

            let encoded = utf8_percent_encode(&decode(raw), COMPONENT).to_string();
            resolved = resolved.replace(&format!("{{{}}}", name), &encoded);
        }

        Ok(resolved)
    }
}

impl FromStr for UriTemplate {
    type Err = UriTemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UriTemplate::new(s)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

// --- Internal implementation ---

fn split_query(uri: &str) -> (&str, Option<&str>) {
    match uri.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (uri, None),
    }
}

/// `name=value` pairs of a raw query string. A pair without `=` has an
/// empty value.
fn query_pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDER
        .find(value)
        .is_some_and(|m| m.start() == 0 && m.end() == value.len())
}

fn path_regex(path: &str) -> String {
    let mut regex = String::from("^");
    let mut last = 0;
    for m in PLACEHOLDER.find_iter(path) {
        regex.push_str(&regex::escape(&decode(&path[last..m.start()])));
        regex.push_str(WILDCARD);
        last = m.end();
    }
    regex.push_str(&regex::escape(&decode(&path[last..])));
    regex.push('$');
    regex
}

fn compile(pattern: &str, regex: &str) -> Result<Regex, UriTemplateError> {
    Regex::new(regex).map_err(|source| UriTemplateError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}
