//! Declarative endpoint and route configuration, and its resolution rules.
//!
//! An endpoint owns a default channel plus optional allow-list and route
//! rules. Rules are evaluated in declared order; the first match wins, and
//! no match is a non-error outcome (the event is simply not republished).

use serde::{Deserialize, Serialize};

use super::patterns::matches;

/// One configured webhook endpoint. Identity is the path; the collection is
/// ordered and immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub path: String,
    /// Default logical channel for notifications from this endpoint.
    pub channel: String,
    /// Service-name patterns allowed to post here. Absent or empty means
    /// nothing is allowed (fails closed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_services: Option<Vec<String>>,
    /// Event routing rules, evaluated in declared order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<RouteRule>>,
}

/// A rule mapping an inbound event's type/action/branch to a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<String>>,
    pub channel: String,
}

impl RouteRule {
    /// A rule matches when it carries no filters at all, or when the
    /// payload's action is a member of `actions`, or when the payload's
    /// branch satisfies at least one branch glob.
    fn matches_payload(&self, action: Option<&str>, branch: Option<&str>) -> bool {
        if self.actions.is_none() && self.branches.is_none() {
            return true;
        }
        if let (Some(actions), Some(action)) = (&self.actions, action)
            && actions.iter().any(|a| a == action)
        {
            return true;
        }
        if let (Some(branches), Some(branch)) = (&self.branches, branch)
            && branches.iter().any(|pattern| matches(pattern, branch))
        {
            return true;
        }
        false
    }
}

impl EndpointConfig {
    /// Whether `service` satisfies the allow-list. Empty or absent list
    /// fails closed.
    pub fn service_allowed(&self, service: &str) -> bool {
        self.allowed_services
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .any(|pattern| matches(pattern, service))
    }

    /// Select the first rule matching the inbound event, in declared order.
    pub fn resolve_route(
        &self,
        event: &str,
        action: Option<&str>,
        branch: Option<&str>,
    ) -> Option<&RouteRule> {
        self.routes
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .find(|rule| rule.event == event && rule.matches_payload(action, branch))
    }
}

/// Find the endpoint configured for `path`.
pub fn find_endpoint<'a>(endpoints: &'a [EndpointConfig], path: &str) -> Option<&'a EndpointConfig> {
    endpoints.iter().find(|endpoint| endpoint.path == path)
}

/// Strip the `refs/heads/` prefix from a git ref to get the branch name.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.strip_prefix("refs/heads/").unwrap_or(git_ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(allowed: Option<Vec<&str>>, routes: Option<Vec<RouteRule>>) -> EndpointConfig {
        EndpointConfig {
            path: "/test".to_string(),
            channel: "#test".to_string(),
            allowed_services: allowed.map(|v| v.iter().map(|s| s.to_string()).collect()),
            routes,
        }
    }

    fn rule(event: &str, actions: Option<Vec<&str>>, branches: Option<Vec<&str>>, channel: &str) -> RouteRule {
        RouteRule {
            event: event.to_string(),
            actions: actions.map(|v| v.iter().map(|s| s.to_string()).collect()),
            branches: branches.map(|v| v.iter().map(|s| s.to_string()).collect()),
            channel: channel.to_string(),
        }
    }

    #[test]
    fn allow_list_scenario() {
        // {path:"/event", allowed_services:["api-*","worker"]}
        let ep = endpoint(Some(vec!["api-*", "worker"]), None);
        assert!(ep.service_allowed("api-gateway"));
        assert!(ep.service_allowed("worker"));
        assert!(!ep.service_allowed("scheduler"));
    }

    #[test]
    fn absent_allow_list_fails_closed() {
        let ep = endpoint(None, None);
        assert!(!ep.service_allowed("anything"));
        let ep = endpoint(Some(vec![]), None);
        assert!(!ep.service_allowed("anything"));
    }

    #[test]
    fn branch_glob_routing_scenario() {
        // [{event:"push", branches:["main","release-*"], channel:"#prs"}]
        let ep = endpoint(
            None,
            Some(vec![rule("push", None, Some(vec!["main", "release-*"]), "#prs")]),
        );
        let hit = ep.resolve_route("push", None, Some(branch_from_ref("refs/heads/release-2.0")));
        assert_eq!(hit.unwrap().channel, "#prs");
        assert!(
            ep.resolve_route("push", None, Some(branch_from_ref("refs/heads/feature-x")))
                .is_none()
        );
    }

    #[test]
    fn first_match_wins() {
        let ep = endpoint(
            None,
            Some(vec![
                rule("push", None, Some(vec!["main"]), "#first"),
                rule("push", None, Some(vec!["main"]), "#second"),
            ]),
        );
        let hit = ep.resolve_route("push", None, Some("main"));
        assert_eq!(hit.unwrap().channel, "#first");
    }

    #[test]
    fn action_membership_matches() {
        let ep = endpoint(
            None,
            Some(vec![rule("pull_request", Some(vec!["opened", "closed"]), None, "#prs")]),
        );
        assert!(ep.resolve_route("pull_request", Some("opened"), None).is_some());
        assert!(ep.resolve_route("pull_request", Some("labeled"), None).is_none());
    }

    #[test]
    fn filterless_rule_matches_all_of_its_event() {
        let ep = endpoint(None, Some(vec![rule("check_suite", None, None, "#ci")]));
        assert!(ep.resolve_route("check_suite", None, None).is_some());
        assert!(ep.resolve_route("check_suite", Some("completed"), None).is_some());
        assert!(ep.resolve_route("push", None, None).is_none());
    }

    #[test]
    fn filtered_rule_does_not_match_payload_without_the_field() {
        let ep = endpoint(None, Some(vec![rule("push", None, Some(vec!["main"]), "#prs")]));
        assert!(ep.resolve_route("push", None, None).is_none());
    }

    #[test]
    fn find_endpoint_by_path() {
        let endpoints = vec![
            EndpointConfig {
                path: "/event".to_string(),
                channel: "#dev-feed".to_string(),
                allowed_services: None,
                routes: None,
            },
            EndpointConfig {
                path: "/alert".to_string(),
                channel: "#alerts".to_string(),
                allowed_services: None,
                routes: None,
            },
        ];
        assert_eq!(find_endpoint(&endpoints, "/alert").unwrap().channel, "#alerts");
        assert!(find_endpoint(&endpoints, "/missing").is_none());
    }

    #[test]
    fn branch_from_ref_strips_heads_prefix() {
        assert_eq!(branch_from_ref("refs/heads/main"), "main");
        assert_eq!(branch_from_ref("main"), "main");
        assert_eq!(branch_from_ref("refs/tags/v1"), "refs/tags/v1");
    }
}
