//! Rewrite rules: a path pattern paired with a target.

use std::fmt;
use std::sync::Arc;

use axum::http::Uri;
use regex::{Captures, Regex};

use crate::config::schema::{RewriteConfig, TargetConfig};

/// Signature of a computed rewrite target.
pub type TargetFn = dyn Fn(&RewriteContext<'_>) -> String + Send + Sync;

/// Input handed to a computed target.
pub struct RewriteContext<'a> {
    /// The request URI as received.
    pub parsed_url: &'a Uri,
    /// Result of matching the rule's pattern against the path.
    pub captures: &'a Captures<'a>,
}

impl<'a> RewriteContext<'a> {
    pub fn pathname(&self) -> &'a str {
        self.parsed_url.path()
    }

    pub fn query(&self) -> Option<&'a str> {
        self.parsed_url.query()
    }

    /// Positional capture group, `0` being the whole match.
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.captures.get(index).map(|m| m.as_str())
    }

    /// Named capture group.
    pub fn name(&self, name: &str) -> Option<&'a str> {
        self.captures.name(name).map(|m| m.as_str())
    }

    /// Decoded `key=value` pairs of the query string.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Where a matching request is sent.
#[derive(Clone)]
pub enum RewriteTarget {
    /// Used verbatim.
    Literal(String),
    /// Computed per request from the URI and the pattern captures.
    Computed(Arc<TargetFn>),
    /// A configured value that is neither a path nor a template.
    ///
    /// Only reported once a request actually matches the rule.
    Unsupported(String),
}

impl RewriteTarget {
    pub fn literal(target: impl Into<String>) -> Self {
        Self::Literal(target.into())
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&RewriteContext<'_>) -> String + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Target expanded from the captures, e.g. `/user?id=$1` or `/user?id=${id}`.
    pub fn template(template: impl Into<String>) -> Self {
        let template = template.into();
        Self::computed(move |ctx| {
            let mut out = String::new();
            ctx.captures.expand(&template, &mut out);
            out
        })
    }
}

impl fmt::Debug for RewriteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
            Self::Unsupported(kind) => f.debug_tuple("Unsupported").field(kind).finish(),
        }
    }
}

impl From<&str> for RewriteTarget {
    fn from(target: &str) -> Self {
        Self::literal(target)
    }
}

impl From<String> for RewriteTarget {
    fn from(target: String) -> Self {
        Self::Literal(target)
    }
}

/// A custom rewrite rule. The pattern is searched, not anchored.
#[derive(Debug, Clone)]
pub struct Rule {
    pub from: Regex,
    pub to: RewriteTarget,
}

impl Rule {
    pub fn new(from: Regex, to: impl Into<RewriteTarget>) -> Self {
        Self {
            from,
            to: to.into(),
        }
    }

    /// Compile a rule from its configured form.
    pub fn from_config(config: &RewriteConfig) -> Result<Self, regex::Error> {
        let from = Regex::new(&config.from)?;
        let to = match &config.to {
            TargetConfig::Path(path) => RewriteTarget::literal(path.clone()),
            TargetConfig::Template { template } => RewriteTarget::template(template.clone()),
            TargetConfig::Other(value) => RewriteTarget::Unsupported(value.type_str().to_string()),
        };
        Ok(Self { from, to })
    }
}
