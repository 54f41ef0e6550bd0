//! List filtering and pagination.
//!
//! Applied in memory after the storage scan: the catalog's cardinality is
//! hundreds of services, not millions, and the filesystem is the only index.

use serde::{Deserialize, Serialize};

use dashops_core::Tier;

use crate::service::Service;

/// Recognized list-filter options. Unknown query options are ignored by the
/// transport before this struct is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFilter {
    /// Owning team slug (case-insensitive match).
    pub team: Option<String>,
    /// Criticality tier.
    pub tier: Option<Tier>,
    /// Health status. Accepted for wire compatibility but currently selects
    /// nothing: no persisted status field exists.
    pub status: Option<String>,
    /// Case-insensitive substring over name and description.
    pub search: Option<String>,
    /// Page size; `None` means unbounded.
    pub limit: Option<usize>,
    /// Page offset.
    pub offset: usize,
}

impl ServiceFilter {
    /// Returns true when no option is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of list processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResult {
    /// The requested page of services.
    pub services: Vec<Service>,
    /// Count of services matching the filter BEFORE pagination.
    pub total: usize,
}

/// Applies filters and pagination to a scanned service collection.
///
/// `total` is always the post-filter, pre-pagination count; an offset past
/// the end yields an empty page but leaves `total` intact so clients can
/// still render page controls.
#[must_use]
pub fn process_service_list(services: Vec<Service>, filter: Option<&ServiceFilter>) -> ListResult {
    let Some(filter) = filter else {
        let total = services.len();
        return ListResult { services, total };
    };

    if filter.status.is_some() {
        tracing::debug!("status filter is accepted but not yet backed by persisted state");
    }

    let filtered: Vec<Service> = services
        .into_iter()
        .filter(|service| matches_filter(service, filter))
        .collect();
    let total = filtered.len();

    let services: Vec<Service> = filtered
        .into_iter()
        .skip(filter.offset)
        .take(filter.limit.unwrap_or(usize::MAX))
        .collect();

    ListResult { services, total }
}

fn matches_filter(service: &Service, filter: &ServiceFilter) -> bool {
    if let Some(team) = filter.team.as_deref() {
        if !service.spec.team.github_team.eq_ignore_ascii_case(team) {
            return false;
        }
    }

    if let Some(tier) = filter.tier {
        if service.metadata.tier != tier {
            return false;
        }
    }

    if let Some(search) = filter.search.as_deref() {
        let needle = search.to_lowercase();
        let name = service.metadata.name.to_lowercase();
        let description = service.spec.description.to_lowercase();
        if !name.contains(&needle) && !description.contains(&needle) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ServiceMetadata, ServiceSpec, TeamSpec};

    fn service(name: &str, tier: Tier, team: &str, description: &str) -> Service {
        Service {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            metadata: ServiceMetadata {
                name: name.to_string(),
                tier,
                created_at: None,
                created_by: None,
                updated_at: None,
                updated_by: None,
                version: 1,
            },
            spec: ServiceSpec {
                description: description.to_string(),
                team: TeamSpec {
                    github_team: team.to_string(),
                    members: None,
                    url: None,
                },
                business: None,
                technology: None,
                kubernetes: None,
                observability: None,
                runbooks: Vec::new(),
            },
        }
    }

    fn fleet() -> Vec<Service> {
        vec![
            service("cart", Tier::Tier3, "shop", "Shopping cart"),
            service("checkout", Tier::Tier1, "shop", "Checkout flow"),
            service("ledger", Tier::Tier1, "billing", "General ledger"),
            service("reports", Tier::Tier3, "billing", "Nightly reports"),
        ]
    }

    #[test]
    fn no_filter_is_identity() {
        let result = process_service_list(fleet(), None);
        assert_eq!(result.total, 4);
        assert_eq!(result.services.len(), 4);
    }

    #[test]
    fn team_filter_is_case_insensitive() {
        let filter = ServiceFilter {
            team: Some("SHOP".to_string()),
            ..ServiceFilter::default()
        };
        let result = process_service_list(fleet(), Some(&filter));
        assert_eq!(result.total, 2);
        assert!(result.services.iter().all(|s| s.spec.team.github_team == "shop"));
    }

    #[test]
    fn tier_and_search_compose() {
        let filter = ServiceFilter {
            tier: Some(Tier::Tier1),
            search: Some("ledger".to_string()),
            ..ServiceFilter::default()
        };
        let result = process_service_list(fleet(), Some(&filter));
        assert_eq!(result.total, 1);
        assert_eq!(result.services[0].metadata.name, "ledger");
    }

    #[test]
    fn search_matches_description() {
        let filter = ServiceFilter {
            search: Some("NIGHTLY".to_string()),
            ..ServiceFilter::default()
        };
        let result = process_service_list(fleet(), Some(&filter));
        assert_eq!(result.total, 1);
        assert_eq!(result.services[0].metadata.name, "reports");
    }

    #[test]
    fn total_is_post_filter_pre_pagination() {
        let filter = ServiceFilter {
            limit: Some(1),
            offset: 1,
            ..ServiceFilter::default()
        };
        let result = process_service_list(fleet(), Some(&filter));
        assert_eq!(result.total, 4);
        assert_eq!(result.services.len(), 1);
        assert_eq!(result.services[0].metadata.name, "checkout");
    }

    #[test]
    fn offset_past_end_is_empty_page_with_total() {
        let filter = ServiceFilter {
            offset: 10,
            ..ServiceFilter::default()
        };
        let result = process_service_list(fleet(), Some(&filter));
        assert!(result.services.is_empty());
        assert_eq!(result.total, 4);
    }

    #[test]
    fn status_filter_is_a_no_op() {
        let filter = ServiceFilter {
            status: Some("healthy".to_string()),
            ..ServiceFilter::default()
        };
        let result = process_service_list(fleet(), Some(&filter));
        assert_eq!(result.total, 4);
    }
}
