//! The rewrite decision function.
//!
//! # Data Flow
//! ```text
//! method != GET                → skip
//! no Accept header            → skip
//! Accept starts with JSON      → skip
//! Accept lacks HTML and */*    → skip
//! first matching custom rule   → rewrite to its target
//! path contains '.'            → skip (looks like an asset)
//! otherwise                    → rewrite to the index
//! ```
//!
//! # Design Decisions
//! - `decide` is pure; `apply` adds the single log line and the URI swap
//! - Rule targets are checked only when a request matches the rule
//! - At most one rewrite per request: first match wins, index only when none

use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, Request, Uri};
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::config::schema::FallbackConfig;
use crate::observability::metrics;
use crate::rewrite::accept;
use crate::rewrite::log::{NoopLog, RewriteLog, TracingLog};
use crate::rewrite::rule::{RewriteContext, RewriteTarget, Rule};

/// Fallback target when none is configured.
pub const DEFAULT_INDEX: &str = "/index.html";

/// Why a request was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MethodNotGet,
    MissingAccept,
    PrefersJson,
    NotAcceptingHtml,
    DotInPath,
}

impl SkipReason {
    /// Short label for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MethodNotGet => "method_not_get",
            SkipReason::MissingAccept => "missing_accept",
            SkipReason::PrefersJson => "prefers_json",
            SkipReason::NotAcceptingHtml => "not_accepting_html",
            SkipReason::DotInPath => "dot_in_path",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::MethodNotGet => "the method is not GET",
            SkipReason::MissingAccept => "the client did not send an HTTP accept header",
            SkipReason::PrefersJson => "the client prefers JSON",
            SkipReason::NotAcceptingHtml => "the client does not accept HTML",
            SkipReason::DotInPath => "the path includes a dot (.) character",
        };
        f.write_str(text)
    }
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    Skip {
        reason: SkipReason,
    },
    Rewrite {
        #[serde(serialize_with = "serialize_uri")]
        target: Uri,
        /// Index of the matching custom rule, `None` for the index fallback.
        rule: Option<usize>,
    },
}

impl Decision {
    pub fn target(&self) -> Option<&Uri> {
        match self {
            Decision::Rewrite { target, .. } => Some(target),
            Decision::Skip { .. } => None,
        }
    }

    pub fn is_rewrite(&self) -> bool {
        matches!(self, Decision::Rewrite { .. })
    }
}

fn serialize_uri<S: Serializer>(uri: &Uri, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(uri)
}

/// Errors that halt processing of the current request.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("rewrite rule `{pattern}` has a {kind} target, but rewrite rules can only be a path or a function")]
    UnsupportedTarget { pattern: String, kind: String },

    #[error("rewrite target `{target}` is not a valid request target: {reason}")]
    InvalidTarget { target: String, reason: String },
}

/// The URI a request carried before it was rewritten.
///
/// Inserted into the request extensions on every rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenFrom(pub Uri);

/// Setup options for [`RewriteEngine`].
#[derive(Default)]
pub struct RewriteOptions {
    /// Custom rules, evaluated in order.
    pub rewrites: Vec<Rule>,
    /// Fallback target, [`DEFAULT_INDEX`] when unset.
    pub index: Option<String>,
    /// Decision sink. Takes precedence over `verbose`.
    pub logger: Option<Arc<dyn RewriteLog>>,
    /// Log through [`TracingLog`] when no logger is given.
    ///
    /// Messages only appear once a `tracing` subscriber is installed and its
    /// filter admits `spa_fallback::rewrite=info`. Pass an explicit `logger`
    /// to write somewhere unconditionally.
    pub verbose: bool,
}

impl RewriteOptions {
    pub fn rewrite(mut self, from: Regex, to: impl Into<RewriteTarget>) -> Self {
        self.rewrites.push(Rule::new(from, to));
        self
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn logger(mut self, logger: impl RewriteLog + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Decides whether a request is rewritten to the single-page-app entry point.
///
/// Immutable once built; share it behind an `Arc`.
pub struct RewriteEngine {
    rewrites: Vec<Rule>,
    index: String,
    logger: Arc<dyn RewriteLog>,
}

impl RewriteEngine {
    pub fn new(options: RewriteOptions) -> Self {
        let logger: Arc<dyn RewriteLog> = match options.logger {
            Some(logger) => logger,
            None if options.verbose => Arc::new(TracingLog),
            None => Arc::new(NoopLog),
        };

        Self {
            rewrites: options.rewrites,
            index: options.index.unwrap_or_else(|| DEFAULT_INDEX.to_string()),
            logger,
        }
    }

    /// Build an engine from the `[fallback]` config section.
    pub fn from_config(config: &FallbackConfig) -> Result<Self, regex::Error> {
        let rewrites = config
            .rewrites
            .iter()
            .map(Rule::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(RewriteOptions {
            rewrites,
            index: Some(config.index.clone()),
            logger: None,
            verbose: config.verbose,
        }))
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rewrites
    }

    /// Evaluate a request without touching it.
    pub fn decide(
        &self,
        method: &Method,
        headers: &HeaderMap,
        uri: &Uri,
    ) -> Result<Decision, RewriteError> {
        if method != Method::GET {
            return Ok(skip(SkipReason::MethodNotGet));
        }

        let Some(accept) = accept::accept_header(headers) else {
            return Ok(skip(SkipReason::MissingAccept));
        };
        if accept::prefers_json(&accept) {
            return Ok(skip(SkipReason::PrefersJson));
        }
        if !accept::accepts_html(&accept) {
            return Ok(skip(SkipReason::NotAcceptingHtml));
        }

        let path = uri.path();

        for (position, rule) in self.rewrites.iter().enumerate() {
            let Some(captures) = rule.from.captures(path) else {
                continue;
            };

            let target = match &rule.to {
                RewriteTarget::Literal(target) => target.clone(),
                RewriteTarget::Computed(compute) => compute(&RewriteContext {
                    parsed_url: uri,
                    captures: &captures,
                }),
                RewriteTarget::Unsupported(kind) => {
                    return Err(RewriteError::UnsupportedTarget {
                        pattern: rule.from.as_str().to_string(),
                        kind: kind.clone(),
                    });
                }
            };

            return Ok(Decision::Rewrite {
                target: parse_target(target)?,
                rule: Some(position),
            });
        }

        if path.contains('.') {
            return Ok(skip(SkipReason::DotInPath));
        }

        Ok(Decision::Rewrite {
            target: parse_target(self.index.clone())?,
            rule: None,
        })
    }

    /// Evaluate a request, log the outcome and rewrite its URI if needed.
    pub fn apply<B>(&self, req: &mut Request<B>) -> Result<Decision, RewriteError> {
        let decision = match self.decide(req.method(), req.headers(), req.uri()) {
            Ok(decision) => decision,
            Err(e) => {
                metrics::record_error();
                return Err(e);
            }
        };

        match &decision {
            Decision::Skip { reason } => {
                self.logger.log(&format!(
                    "Not rewriting {} {} because {}.",
                    req.method(),
                    req.uri(),
                    reason
                ));
            }
            Decision::Rewrite { target, .. } => {
                self.logger.log(&format!(
                    "Rewriting {} {} to {}",
                    req.method(),
                    req.uri(),
                    target
                ));
                let original = std::mem::replace(req.uri_mut(), target.clone());
                req.extensions_mut().insert(RewrittenFrom(original));
            }
        }

        metrics::record_decision(&decision);
        Ok(decision)
    }
}

impl fmt::Debug for RewriteEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriteEngine")
            .field("rewrites", &self.rewrites)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

fn skip(reason: SkipReason) -> Decision {
    Decision::Skip { reason }
}

/// Targets must carry an absolute path; `app.html` would parse as an authority.
fn parse_target(target: String) -> Result<Uri, RewriteError> {
    let reason = match Uri::try_from(target.as_str()) {
        Ok(uri) if uri.authority().is_some() && uri.scheme().is_none() => {
            "authority without scheme".to_string()
        }
        Ok(uri) if !uri.path().starts_with('/') => "path must start with `/`".to_string(),
        Ok(uri) => return Ok(uri),
        Err(e) => e.to_string(),
    };
    Err(RewriteError::InvalidTarget { target, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::body::Body;
    use axum::http::header::ACCEPT;

    fn request(method: &str, uri: &str, accept: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(accept) = accept {
            builder = builder.header(ACCEPT, accept);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn apply(engine: &RewriteEngine, req: &mut Request<Body>) -> Decision {
        engine.apply(req).unwrap()
    }

    fn recording() -> (Arc<Mutex<Vec<String>>>, RewriteOptions) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let options = RewriteOptions::default()
            .logger(move |message: &str| sink.lock().unwrap().push(message.to_string()));
        (lines, options)
    }

    #[test]
    fn test_unknown_path_falls_back_to_index() {
        let engine = RewriteEngine::new(RewriteOptions::default());
        let mut req = request("GET", "/dashboard", Some("text/html"));

        let decision = apply(&engine, &mut req);

        assert_eq!(req.uri(), "/index.html");
        assert_eq!(decision.target().map(|t| t.to_string()), Some("/index.html".into()));
        assert_eq!(
            req.extensions().get::<RewrittenFrom>(),
            Some(&RewrittenFrom("/dashboard".parse().unwrap()))
        );
    }

    #[test]
    fn test_asset_path_is_left_alone() {
        let engine = RewriteEngine::new(RewriteOptions::default());
        let mut req = request("GET", "/app.js", Some("*/*"));

        let decision = apply(&engine, &mut req);

        assert_eq!(decision, skip(SkipReason::DotInPath));
        assert_eq!(req.uri(), "/app.js");
        assert!(req.extensions().get::<RewrittenFrom>().is_none());
    }

    #[test]
    fn test_computed_rule_uses_captures() {
        let engine = RewriteEngine::new(RewriteOptions::default().rewrite(
            Regex::new(r"^/users/(\d+)$").unwrap(),
            RewriteTarget::computed(|ctx| format!("/user-profile?id={}", ctx.get(1).unwrap_or(""))),
        ));
        let mut req = request("GET", "/users/42", Some("text/html"));

        apply(&engine, &mut req);

        assert_eq!(req.uri(), "/user-profile?id=42");
    }

    #[test]
    fn test_non_get_is_left_alone() {
        let engine = RewriteEngine::new(RewriteOptions::default());
        for method in ["POST", "HEAD", "PUT", "DELETE", "OPTIONS"] {
            let mut req = request(method, "/dashboard", Some("text/html"));
            assert_eq!(apply(&engine, &mut req), skip(SkipReason::MethodNotGet));
            assert_eq!(req.uri(), "/dashboard");
        }
    }

    #[test]
    fn test_json_prefix_wins_over_html() {
        let engine = RewriteEngine::new(RewriteOptions::default());
        let mut req = request("GET", "/data", Some("application/json, text/html"));

        assert_eq!(apply(&engine, &mut req), skip(SkipReason::PrefersJson));
        assert_eq!(req.uri(), "/data");
    }

    #[test]
    fn test_json_later_in_list_still_rewrites() {
        let engine = RewriteEngine::new(RewriteOptions::default());
        let mut req = request("GET", "/data", Some("text/html, application/json"));

        assert!(apply(&engine, &mut req).is_rewrite());
        assert_eq!(req.uri(), "/index.html");
    }

    #[test]
    fn test_missing_accept() {
        let engine = RewriteEngine::new(RewriteOptions::default());
        let mut req = request("GET", "/dashboard", None);

        assert_eq!(apply(&engine, &mut req), skip(SkipReason::MissingAccept));
        assert_eq!(req.uri(), "/dashboard");
    }

    #[test]
    fn test_accept_with_latin1_bytes_is_still_checked() {
        let engine = RewriteEngine::new(RewriteOptions::default());

        let mut req = request("GET", "/dashboard", None);
        req.headers_mut().insert(
            ACCEPT,
            axum::http::HeaderValue::from_bytes(b"text/html, application/x-caf\xe9").unwrap(),
        );
        assert!(apply(&engine, &mut req).is_rewrite());
        assert_eq!(req.uri(), "/index.html");

        let mut req = request("GET", "/dashboard", None);
        req.headers_mut().insert(
            ACCEPT,
            axum::http::HeaderValue::from_bytes(b"image/caf\xe9").unwrap(),
        );
        assert_eq!(apply(&engine, &mut req), skip(SkipReason::NotAcceptingHtml));
    }

    #[test]
    fn test_client_without_html() {
        let engine = RewriteEngine::new(RewriteOptions::default());
        let mut req = request("GET", "/dashboard", Some("image/png"));

        assert_eq!(apply(&engine, &mut req), skip(SkipReason::NotAcceptingHtml));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let engine = RewriteEngine::new(
            RewriteOptions::default()
                .rewrite(Regex::new("^/docs").unwrap(), "/docs.html")
                .rewrite(Regex::new("^/docs/api").unwrap(), "/api.html"),
        );
        let mut req = request("GET", "/docs/api", Some("text/html"));

        let decision = apply(&engine, &mut req);

        assert_eq!(req.uri(), "/docs.html");
        assert!(matches!(decision, Decision::Rewrite { rule: Some(0), .. }));
    }

    #[test]
    fn test_rule_matches_anywhere_in_path() {
        let engine = RewriteEngine::new(
            RewriteOptions::default().rewrite(Regex::new("admin").unwrap(), "/admin.html"),
        );
        let mut req = request("GET", "/org/admin/settings", Some("text/html"));

        apply(&engine, &mut req);

        assert_eq!(req.uri(), "/admin.html");
    }

    #[test]
    fn test_rule_applies_before_dot_check() {
        let engine = RewriteEngine::new(
            RewriteOptions::default().rewrite(Regex::new(r"^/legacy\.php$").unwrap(), "/index.html"),
        );
        let mut req = request("GET", "/legacy.php", Some("text/html"));

        apply(&engine, &mut req);

        assert_eq!(req.uri(), "/index.html");
    }

    #[test]
    fn test_dotted_directory_is_treated_as_asset() {
        let engine = RewriteEngine::new(RewriteOptions::default());
        let mut req = request("GET", "/v1.2/page", Some("text/html"));

        assert_eq!(apply(&engine, &mut req), skip(SkipReason::DotInPath));
    }

    #[test]
    fn test_query_string_is_ignored_for_matching() {
        let engine = RewriteEngine::new(
            RewriteOptions::default().rewrite(Regex::new(r"q=").unwrap(), "/never.html"),
        );
        let mut req = request("GET", "/search?q=a.b", Some("text/html"));

        apply(&engine, &mut req);

        assert_eq!(req.uri(), "/index.html");
    }

    #[test]
    fn test_custom_index() {
        let engine = RewriteEngine::new(RewriteOptions::default().index("/app/shell.html"));
        let mut req = request("GET", "/settings/profile", Some("text/html"));

        apply(&engine, &mut req);

        assert_eq!(req.uri(), "/app/shell.html");
        assert_eq!(engine.index(), "/app/shell.html");
    }

    #[test]
    fn test_unsupported_target_fails_only_when_matched() {
        let engine = RewriteEngine::new(RewriteOptions::default().rewrite(
            Regex::new("^/broken").unwrap(),
            RewriteTarget::Unsupported("integer".into()),
        ));

        let mut req = request("GET", "/fine", Some("text/html"));
        assert!(engine.apply(&mut req).is_ok());

        let mut req = request("GET", "/broken", Some("text/html"));
        let err = engine.apply(&mut req).unwrap_err();
        assert!(matches!(err, RewriteError::UnsupportedTarget { ref kind, .. } if kind == "integer"));
        assert_eq!(req.uri(), "/broken");
    }

    #[test]
    fn test_invalid_computed_target() {
        let engine = RewriteEngine::new(RewriteOptions::default().rewrite(
            Regex::new("^/x").unwrap(),
            RewriteTarget::computed(|_| "not a uri".to_string()),
        ));
        let mut req = request("GET", "/x", Some("text/html"));

        let err = engine.apply(&mut req).unwrap_err();

        assert!(matches!(err, RewriteError::InvalidTarget { ref target, .. } if target == "not a uri"));
        assert_eq!(req.uri(), "/x");
    }

    #[test]
    fn test_relative_index_is_rejected() {
        let engine = RewriteEngine::new(RewriteOptions::default().index("app.html"));
        let mut req = request("GET", "/dashboard", Some("text/html"));

        let err = engine.apply(&mut req).unwrap_err();

        assert!(matches!(err, RewriteError::InvalidTarget { ref target, .. } if target == "app.html"));
        assert_eq!(req.uri(), "/dashboard");
    }

    #[test]
    fn test_relative_computed_target_is_rejected() {
        let engine = RewriteEngine::new(RewriteOptions::default().rewrite(
            Regex::new("^/x").unwrap(),
            RewriteTarget::computed(|_| "example.com:8080".to_string()),
        ));
        let mut req = request("GET", "/x", Some("text/html"));

        assert!(matches!(
            engine.apply(&mut req),
            Err(RewriteError::InvalidTarget { .. })
        ));
        assert_eq!(req.uri(), "/x");
    }

    #[test]
    fn test_absolute_target_is_accepted() {
        let engine = RewriteEngine::new(
            RewriteOptions::default().rewrite(Regex::new("^/old").unwrap(), "https://example.com/new?x=1"),
        );
        let mut req = request("GET", "/old", Some("text/html"));

        apply(&engine, &mut req);

        assert_eq!(req.uri().path(), "/new");
    }

    #[test]
    fn test_one_log_line_per_request() {
        let (lines, options) = recording();
        let engine = RewriteEngine::new(options);

        let mut req = request("POST", "/dashboard", Some("text/html"));
        apply(&engine, &mut req);
        let mut req = request("GET", "/app.js", Some("*/*"));
        apply(&engine, &mut req);
        let mut req = request("GET", "/dashboard?tab=1", Some("text/html"));
        apply(&engine, &mut req);

        let lines = lines.lock().unwrap();
        assert_eq!(
            *lines,
            vec![
                "Not rewriting POST /dashboard because the method is not GET.".to_string(),
                "Not rewriting GET /app.js because the path includes a dot (.) character.".to_string(),
                "Rewriting GET /dashboard?tab=1 to /index.html".to_string(),
            ]
        );
    }

    #[test]
    fn test_decision_serializes_with_outcome_tag() {
        let rewrite = Decision::Rewrite {
            target: "/index.html".parse().unwrap(),
            rule: None,
        };
        assert_eq!(
            serde_json::to_value(&rewrite).unwrap(),
            serde_json::json!({"outcome": "rewrite", "target": "/index.html", "rule": null})
        );
        assert_eq!(
            serde_json::to_value(skip(SkipReason::PrefersJson)).unwrap(),
            serde_json::json!({"outcome": "skip", "reason": "prefers_json"})
        );
    }

    #[test]
    fn test_from_config_compiles_rules() {
        let config: FallbackConfig = toml::from_str(
            r#"
            index = "/shell.html"

            [[rewrites]]
            from = "^/users/(?P<id>\\d+)$"
            to = { template = "/user-profile?id=${id}" }
            "#,
        )
        .unwrap();
        let engine = RewriteEngine::from_config(&config).unwrap();
        assert_eq!(engine.rules().len(), 1);

        let mut req = request("GET", "/users/7", Some("text/html"));
        apply(&engine, &mut req);
        assert_eq!(req.uri(), "/user-profile?id=7");
    }
}
