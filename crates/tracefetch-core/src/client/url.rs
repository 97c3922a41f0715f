//! LangSmith web URL parsing

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Host every LangSmith web URL lives under
const WEB_HOST: &str = "smith.langchain.com";

static DIRECT_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|/)(?:runs?|r)/([0-9a-f-]{36})(?:/|$)").expect("valid regex")
});

/// Which URL layout a locator came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlKind {
    /// `/public/...` share link
    PublicShare,
    /// `/o/{org}/projects/p/{project}/r/{run}`
    ProjectTrace,
    /// Any other path ending in `run/`, `runs/` or `r/` plus a UUID
    DirectRun,
}

/// Where a trace lives, as decoded from a web URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceLocator {
    /// Trace id, run id or share token
    pub trace_id: String,
    /// Whether the URL points at publicly shared data
    pub is_public: bool,
    /// Organisation slug or id, when present
    pub org_slug: Option<String>,
    /// Project id for project URLs
    pub project_id: Option<String>,
    /// URL layout
    pub kind: UrlKind,
}

impl TraceLocator {
    fn public(trace_id: &str, org_slug: Option<&str>) -> Self {
        Self {
            trace_id: trace_id.to_string(),
            is_public: true,
            org_slug: org_slug.map(String::from),
            project_id: None,
            kind: UrlKind::PublicShare,
        }
    }
}

/// Decode a LangSmith web URL into a [`TraceLocator`]
pub fn parse_trace_url(raw: &str) -> Result<TraceLocator> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::validation(format!("invalid URL {raw}: {e}")))?;

    if !url.host_str().is_some_and(|h| h.contains(WEB_HOST)) {
        return Err(Error::validation(format!(
            "not a LangSmith URL: {raw}. Expected a URL from {WEB_HOST}"
        )));
    }

    let path = url.path().trim_matches('/');
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let shared = url
        .query()
        .is_some_and(|q| q.to_ascii_lowercase().contains("share=true"));

    match parts.as_slice() {
        ["public", token, "r"] => return Ok(TraceLocator::public(token, None)),
        ["public", org, token, "r"] => return Ok(TraceLocator::public(token, Some(*org))),
        ["public", org, token, ..] if is_uuid_like(token) => {
            return Ok(TraceLocator::public(token, Some(*org)))
        }
        ["public", token, ..] => return Ok(TraceLocator::public(token, None)),
        ["o", org, "projects", _, project, _, run, ..] => {
            return Ok(TraceLocator {
                trace_id: (*run).to_string(),
                is_public: shared,
                org_slug: Some((*org).to_string()),
                project_id: Some((*project).to_string()),
                kind: UrlKind::ProjectTrace,
            })
        }
        ["o", _, "projects", ..] if parts.len() >= 6 => {
            return Err(Error::validation(format!(
                "project URL has no run id: {raw}"
            )))
        }
        _ => {}
    }

    if let Some(captures) = DIRECT_RUN.captures(path) {
        return Ok(TraceLocator {
            trace_id: captures[1].to_string(),
            is_public: shared,
            org_slug: None,
            project_id: None,
            kind: UrlKind::DirectRun,
        });
    }

    Err(Error::validation(format!(
        "unrecognized LangSmith URL: {raw}. Expected https://{WEB_HOST}/public/<token>/r \
         or https://{WEB_HOST}/o/<org>/projects/p/<project>/r/<run>"
    )))
}

/// Resolve the argument of the `public` command: a share URL or a bare token
pub fn resolve_public_target(input: &str) -> Result<TraceLocator> {
    let input = input.trim();
    if !input.contains("://") {
        if input.is_empty() || input.contains('/') {
            return Err(Error::validation(format!("not a share token: {input:?}")));
        }
        return Ok(TraceLocator::public(input, None));
    }

    let locator = parse_trace_url(input)?;
    if !locator.is_public {
        return Err(Error::validation(format!(
            "{input} is not a public share URL. Use `tracefetch tree {}` with LANGSMITH_API_KEY set",
            locator.trace_id
        )));
    }
    Ok(locator)
}

/// 8-4-4-4-12 hex layout
fn is_uuid_like(s: &str) -> bool {
    s.len() == 36 && Uuid::try_parse(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const RUN: &str = "0f8b1c5e-3d2a-4b7c-9e6f-1a2b3c4d5e6f";

    #[rstest]
    #[case("https://smith.langchain.com/public/abc123/r", "abc123", None)]
    #[case("https://smith.langchain.com/public/myorg/abc123/r", "abc123", Some("myorg"))]
    #[case("https://smith.langchain.com/public/abc123", "abc123", None)]
    #[case(
        "https://smith.langchain.com/public/myorg/0f8b1c5e-3d2a-4b7c-9e6f-1a2b3c4d5e6f",
        RUN,
        Some("myorg")
    )]
    #[case("https://eu.smith.langchain.com/public/abc123/r/", "abc123", None)]
    fn test_public_share_urls(
        #[case] url: &str,
        #[case] token: &str,
        #[case] org: Option<&str>,
    ) {
        let locator = parse_trace_url(url).unwrap();
        assert_eq!(locator.kind, UrlKind::PublicShare);
        assert!(locator.is_public);
        assert_eq!(locator.trace_id, token);
        assert_eq!(locator.org_slug.as_deref(), org);
        assert_eq!(locator.project_id, None);
    }

    #[rstest]
    #[case("", false)]
    #[case("?share=true", true)]
    #[case("?foo=1&SHARE=TRUE", true)]
    fn test_project_trace_urls(#[case] query: &str, #[case] public: bool) {
        let url = format!("https://smith.langchain.com/o/org-1/projects/p/proj-9/r/{RUN}{query}");
        let locator = parse_trace_url(&url).unwrap();

        assert_eq!(locator.kind, UrlKind::ProjectTrace);
        assert_eq!(locator.trace_id, RUN);
        assert_eq!(locator.org_slug.as_deref(), Some("org-1"));
        assert_eq!(locator.project_id.as_deref(), Some("proj-9"));
        assert_eq!(locator.is_public, public);
    }

    #[rstest]
    #[case("https://smith.langchain.com/runs/0f8b1c5e-3d2a-4b7c-9e6f-1a2b3c4d5e6f")]
    #[case("https://smith.langchain.com/run/0F8B1C5E-3D2A-4B7C-9E6F-1A2B3C4D5E6F/")]
    #[case("https://smith.langchain.com/foo/r/0f8b1c5e-3d2a-4b7c-9e6f-1a2b3c4d5e6f")]
    fn test_direct_run_urls(#[case] url: &str) {
        let locator = parse_trace_url(url).unwrap();
        assert_eq!(locator.kind, UrlKind::DirectRun);
        assert_eq!(locator.trace_id.to_ascii_lowercase(), RUN);
        assert!(!locator.is_public);
    }

    #[rstest]
    #[case("https://example.com/public/abc123/r")]
    #[case("not a url")]
    #[case("https://smith.langchain.com/settings")]
    #[case("https://smith.langchain.com/o/org/projects/p/proj")]
    fn test_rejected_urls(#[case] url: &str) {
        assert!(matches!(parse_trace_url(url), Err(Error::Validation(_))));
    }

    #[test]
    fn test_resolve_public_target() {
        let bare = resolve_public_target("abc123").unwrap();
        assert_eq!(bare.trace_id, "abc123");
        assert!(bare.is_public);

        let url = resolve_public_target("https://smith.langchain.com/public/org/abc/r").unwrap();
        assert_eq!(url.org_slug.as_deref(), Some("org"));

        let private = format!("https://smith.langchain.com/o/org/projects/p/proj/r/{RUN}");
        let err = resolve_public_target(&private).unwrap_err();
        assert!(err.to_string().contains("tracefetch tree"));

        assert!(resolve_public_target("a/b").is_err());
    }
}
