// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Target resolution for Clawmark.
//!
//! Decides which external target(s) should receive an event: URL glob
//! matching, GitHub repository extraction, site-declared targets with
//! positive/negative caching, and the layered resolver that combines them
//! with per-user rules and the system default.

pub mod declaration;
pub mod guard;
pub mod pattern;
pub mod repo;
pub mod resolver;

pub use declaration::DeclarationFetcher;
pub use pattern::matches_url_pattern;
pub use repo::{RepoRef, extract_github_repo};
pub use resolver::{RoutingInput, RoutingRequest, RoutingResolver, resolve_target, resolve_targets};
