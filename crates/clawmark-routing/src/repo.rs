// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extract an `owner/repo` pair from a GitHub URL.

use url::Url;

const GITHUB_HOSTS: &[&str] = &["github.com", "www.github.com"];

/// Top-level GitHub routes that are not repository owners.
const RESERVED_OWNERS: &[&str] = &[
    "about",
    "apps",
    "codespaces",
    "collections",
    "contact",
    "customer-stories",
    "dashboard",
    "enterprise",
    "events",
    "explore",
    "features",
    "issues",
    "join",
    "login",
    "logout",
    "marketplace",
    "new",
    "notifications",
    "organizations",
    "orgs",
    "pricing",
    "pulls",
    "readme",
    "search",
    "security",
    "settings",
    "signup",
    "site",
    "sponsors",
    "topics",
    "trending",
];

/// A repository reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// `owner/repo`.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Returns the repository a GitHub URL points into, or `None` when the URL
/// is on another host, is a reserved route, or has fewer than two segments.
pub fn extract_github_repo(source_url: &str) -> Option<RepoRef> {
    let parsed = Url::parse(source_url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if !GITHUB_HOSTS.contains(&host.as_str()) {
        return None;
    }

    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;

    if RESERVED_OWNERS.contains(&owner.to_ascii_lowercase().as_str()) {
        return None;
    }

    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if !is_valid_name(owner) || !is_valid_name(repo) {
        return None;
    }

    Some(RepoRef {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

fn is_valid_name(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn slug(url: &str) -> Option<String> {
        extract_github_repo(url).map(|r| r.slug())
    }

    #[test]
    fn extracts_from_issue_url() {
        assert_eq!(
            slug("https://github.com/coco-xyz/clawmark/issues/38").as_deref(),
            Some("coco-xyz/clawmark")
        );
    }

    #[test]
    fn strips_git_suffix() {
        assert_eq!(
            slug("https://github.com/coco-xyz/clawmark.git").as_deref(),
            Some("coco-xyz/clawmark")
        );
    }

    #[test]
    fn accepts_www_host() {
        assert_eq!(
            slug("https://www.github.com/rust-lang/rust/pulls").as_deref(),
            Some("rust-lang/rust")
        );
    }

    #[test]
    fn rejects_other_hosts() {
        assert_eq!(slug("https://gitlab.com/coco-xyz/clawmark"), None);
        assert_eq!(slug("https://github.com.evil.io/coco-xyz/clawmark"), None);
    }

    #[test]
    fn rejects_single_segment() {
        assert_eq!(slug("https://github.com/coco-xyz"), None);
        assert_eq!(slug("https://github.com/"), None);
    }

    #[test]
    fn rejects_reserved_routes() {
        assert_eq!(slug("https://github.com/settings/profile"), None);
        assert_eq!(slug("https://github.com/orgs/coco-xyz/people"), None);
        assert_eq!(slug("https://github.com/marketplace/actions"), None);
        assert_eq!(slug("https://github.com/Settings/profile"), None);
    }

    #[test]
    fn rejects_unparseable() {
        assert_eq!(slug("not a url"), None);
        assert_eq!(slug(""), None);
        assert_eq!(slug("https://github.com/a/.git"), None);
    }

    proptest! {
        #[test]
        fn owner_repo_round_trips(
            owner in "[a-z][a-z0-9-]{0,12}",
            repo in "[a-z][a-z0-9_]{0,12}",
            suffix in prop_oneof![Just(""), Just("/issues/1"), Just("/tree/main/src")],
        ) {
            prop_assume!(!RESERVED_OWNERS.contains(&owner.as_str()));
            let expected = RepoRef { owner: owner.clone(), repo: repo.clone() };

            let plain = format!("https://github.com/{owner}/{repo}{suffix}");
            prop_assert_eq!(extract_github_repo(&plain), Some(expected.clone()));

            let git = format!("https://github.com/{owner}/{repo}.git");
            prop_assert_eq!(extract_github_repo(&git), Some(expected));
        }
    }
}
