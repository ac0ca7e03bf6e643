//! VMI proposals: append-only version chain, diff engine and status rules

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::business_unit::{public_brand_scope, FulfillmentUnit};
use super::order::OrderItem;
use crate::error::{DomainError, DomainResult};
use crate::validation::{validate_item_list, validate_items_in_scope};

/// Who authored a proposal version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    SalesRep,
    Dispensary,
}

impl AuthorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorRole::SalesRep => "sales_rep",
            AuthorRole::Dispensary => "dispensary",
        }
    }
}

impl fmt::Display for AuthorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sales_rep" => Ok(AuthorRole::SalesRep),
            "dispensary" => Ok(AuthorRole::Dispensary),
            other => Err(DomainError::validation(
                "created_by",
                format!("unknown author role '{}'", other),
            )),
        }
    }
}

/// Stored proposal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    SubmittedToCustomer,
    PendingReview,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::SubmittedToCustomer => "submitted_to_customer",
            ProposalStatus::PendingReview => "pending_review",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
        }
    }

    /// Accepted and rejected are terminal for status purposes
    pub fn is_decided(&self) -> bool {
        matches!(self, ProposalStatus::Accepted | ProposalStatus::Rejected)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted_to_customer" => Ok(ProposalStatus::SubmittedToCustomer),
            "pending_review" => Ok(ProposalStatus::PendingReview),
            "accepted" => Ok(ProposalStatus::Accepted),
            "rejected" => Ok(ProposalStatus::Rejected),
            other => Err(DomainError::validation(
                "status",
                format!("unknown proposal status '{}'", other),
            )),
        }
    }
}

/// Status shown to users. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayStatus {
    Sent,
    Changed,
    Accepted,
}

/// One entry of a version's change list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposalChange {
    Added {
        product_id: String,
        product_name: String,
        new_value: i32,
    },
    Removed {
        product_id: String,
        product_name: String,
        previous_value: i32,
    },
    QuantityChange {
        product_id: String,
        product_name: String,
        previous_value: i32,
        new_value: i32,
    },
}

impl ProposalChange {
    pub fn product_id(&self) -> &str {
        match self {
            ProposalChange::Added { product_id, .. }
            | ProposalChange::Removed { product_id, .. }
            | ProposalChange::QuantityChange { product_id, .. } => product_id,
        }
    }
}

/// Minimal change list turning `previous` into `next`, matched by product id.
///
/// Runs in linear time. Removals and quantity changes come in the order of
/// `previous`, additions in the order of `next`; the set of changes does not
/// depend on map iteration order.
pub fn diff(previous: &[OrderItem], next: &[OrderItem]) -> Vec<ProposalChange> {
    let previous_by_id: HashMap<&str, &OrderItem> = previous
        .iter()
        .map(|item| (item.product_id.as_str(), item))
        .collect();
    let next_by_id: HashMap<&str, &OrderItem> = next
        .iter()
        .map(|item| (item.product_id.as_str(), item))
        .collect();

    let mut changes = Vec::new();
    let mut seen: HashSet<&str> = HashSet::with_capacity(previous_by_id.len());

    for item in previous {
        let id = item.product_id.as_str();
        if !seen.insert(id) {
            continue;
        }
        let before = previous_by_id[id];
        match next_by_id.get(id) {
            None => changes.push(ProposalChange::Removed {
                product_id: id.to_string(),
                product_name: before.name.clone(),
                previous_value: before.order_qty,
            }),
            Some(after) if after.order_qty != before.order_qty => {
                changes.push(ProposalChange::QuantityChange {
                    product_id: id.to_string(),
                    product_name: before.name.clone(),
                    previous_value: before.order_qty,
                    new_value: after.order_qty,
                })
            }
            Some(_) => {}
        }
    }

    seen.clear();
    for item in next {
        let id = item.product_id.as_str();
        if previous_by_id.contains_key(id) || !seen.insert(id) {
            continue;
        }
        let after = next_by_id[id];
        changes.push(ProposalChange::Added {
            product_id: id.to_string(),
            product_name: after.name.clone(),
            new_value: after.order_qty,
        });
    }

    changes
}

/// Immutable snapshot of a proposal's items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalVersion {
    pub version_number: i32,
    pub created_by: AuthorRole,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    /// Changes relative to the previous version; empty for version 1
    #[serde(default)]
    pub changes: Vec<ProposalChange>,
}

impl ProposalVersion {
    /// First version of a proposal, always authored by the sales rep
    pub fn initial(items: Vec<OrderItem>, created_at: DateTime<Utc>) -> Self {
        Self {
            version_number: 1,
            created_by: AuthorRole::SalesRep,
            created_at,
            items,
            changes: Vec::new(),
        }
    }

    /// Version that follows `self`, with its diff against `self`
    pub fn next(&self, items: Vec<OrderItem>, created_by: AuthorRole, created_at: DateTime<Utc>) -> Self {
        let changes = diff(&self.items, &items);
        Self {
            version_number: self.version_number + 1,
            created_by,
            created_at,
            items,
            changes,
        }
    }

    /// Display status of this version given the proposal's stored status
    pub fn display_status(&self, proposal_status: ProposalStatus, is_latest: bool) -> DisplayStatus {
        if is_latest && proposal_status == ProposalStatus::Accepted {
            return DisplayStatus::Accepted;
        }
        match self.created_by {
            AuthorRole::Dispensary => DisplayStatus::Changed,
            AuthorRole::SalesRep => DisplayStatus::Sent,
        }
    }
}

/// Whether edits may land on a proposal that was already accepted or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPolicy {
    pub allow_edit_after_decision: bool,
}

impl Default for EditPolicy {
    fn default() -> Self {
        Self {
            allow_edit_after_decision: true,
        }
    }
}

/// Reject an append before anything is computed or written
pub fn ensure_appendable(is_active: bool, status: ProposalStatus, policy: EditPolicy) -> DomainResult<()> {
    if !is_active {
        return Err(DomainError::Conflict(
            "Proposal has been superseded by a newer proposal".to_string(),
        ));
    }
    if status.is_decided() && !policy.allow_edit_after_decision {
        return Err(DomainError::Conflict(format!(
            "Proposal is already {} and can no longer be edited",
            status
        )));
    }
    Ok(())
}

/// Check a submitted item list for use in a proposal of the given fulfillment value
pub fn validate_proposal_items(items: &[OrderItem], business_unit: FulfillmentUnit) -> DomainResult<()> {
    validate_item_list(items, "items")?;
    validate_items_in_scope(items, public_brand_scope(business_unit))
}

/// A VMI proposal with its full version history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub dispensary_id: Uuid,
    pub sales_rep_id: Uuid,
    pub business_unit: FulfillmentUnit,
    pub is_active: bool,
    pub status: ProposalStatus,
    pub versions: Vec<ProposalVersion>,
}

impl Proposal {
    /// New active proposal holding version 1
    pub fn create(
        id: Uuid,
        dispensary_id: Uuid,
        sales_rep_id: Uuid,
        business_unit: FulfillmentUnit,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate_proposal_items(&items, business_unit)?;

        Ok(Self {
            id,
            dispensary_id,
            sales_rep_id,
            business_unit,
            is_active: true,
            status: ProposalStatus::SubmittedToCustomer,
            versions: vec![ProposalVersion::initial(items, created_at)],
        })
    }

    pub fn latest_version(&self) -> Option<&ProposalVersion> {
        self.versions.last()
    }

    /// Append a new version. Any edit, by either party, reopens review.
    pub fn append_version(
        &mut self,
        items: Vec<OrderItem>,
        author: AuthorRole,
        created_at: DateTime<Utc>,
        policy: EditPolicy,
    ) -> DomainResult<&ProposalVersion> {
        ensure_appendable(self.is_active, self.status, policy)?;
        validate_proposal_items(&items, self.business_unit)?;

        let next = self
            .latest_version()
            .ok_or_else(|| DomainError::NotFound("Proposal version".to_string()))?
            .next(items, author, created_at);

        self.versions.push(next);
        self.status = ProposalStatus::PendingReview;

        Ok(&self.versions[self.versions.len() - 1])
    }

    pub fn accept(&mut self) {
        self.status = ProposalStatus::Accepted;
    }

    pub fn reject(&mut self) {
        self.status = ProposalStatus::Rejected;
    }

    /// Mark as superseded. The version history is left untouched.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Display status of the proposal as a whole (its latest version)
    pub fn display_status(&self) -> Option<DisplayStatus> {
        self.latest_version()
            .map(|v| v.display_status(self.status, true))
    }

    /// Display status of one version by number
    pub fn version_display_status(&self, version_number: i32) -> Option<DisplayStatus> {
        let latest = self.latest_version()?.version_number;
        self.versions
            .iter()
            .find(|v| v.version_number == version_number)
            .map(|v| v.display_status(self.status, v.version_number == latest))
    }

    /// Version numbers run 1..=n without gaps
    pub fn has_contiguous_versions(&self) -> bool {
        self.versions
            .iter()
            .enumerate()
            .all(|(i, v)| v.version_number == i as i32 + 1)
    }
}

/// Deactivate every active proposal of `dispensary_id` in `proposals`,
/// returning the ids that were superseded.
pub fn supersede_active(proposals: &mut [Proposal], dispensary_id: Uuid) -> Vec<Uuid> {
    proposals
        .iter_mut()
        .filter(|p| p.dispensary_id == dispensary_id && p.is_active)
        .map(|p| {
            p.deactivate();
            p.id
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BusinessUnit;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn item(id: &str, qty: i32) -> OrderItem {
        item_in(id, qty, BusinessUnit::Sunshine)
    }

    fn item_in(id: &str, qty: i32, bu: BusinessUnit) -> OrderItem {
        OrderItem::new(id, format!("Product {}", id), "Vape - 1g", dec!(35.00), qty, id, "Vape", bu)
    }

    fn proposal(items: Vec<OrderItem>) -> Proposal {
        Proposal::create(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            FulfillmentUnit::SunshinePf,
            items,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_diff_quantity_change() {
        let changes = diff(&[item("A", 10)], &[item("A", 8)]);
        assert_eq!(
            changes,
            vec![ProposalChange::QuantityChange {
                product_id: "A".to_string(),
                product_name: "Product A".to_string(),
                previous_value: 10,
                new_value: 8,
            }]
        );
    }

    #[test]
    fn test_diff_added_and_removed() {
        let changes = diff(&[item("A", 1), item("B", 2)], &[item("B", 2), item("C", 5)]);
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[0],
            ProposalChange::Removed {
                product_id: "A".to_string(),
                product_name: "Product A".to_string(),
                previous_value: 1,
            }
        );
        assert_eq!(
            changes[1],
            ProposalChange::Added {
                product_id: "C".to_string(),
                product_name: "Product C".to_string(),
                new_value: 5,
            }
        );
    }

    #[test]
    fn test_diff_identical_lists_is_empty() {
        let items = vec![item("A", 1), item("B", 2)];
        assert!(diff(&items, &items).is_empty());
    }

    #[test]
    fn test_diff_ignores_price_only_changes() {
        let mut repriced = item("A", 3);
        repriced.price = dec!(99.00);
        assert!(diff(&[item("A", 3)], &[repriced]).is_empty());
    }

    #[test]
    fn test_change_serialization() {
        let change = ProposalChange::QuantityChange {
            product_id: "A".to_string(),
            product_name: "Product A".to_string(),
            previous_value: 10,
            new_value: 8,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "quantity_change");
        assert_eq!(json["previous_value"], 10);
        assert_eq!(json["new_value"], 8);
    }

    #[test]
    fn test_create_proposal() {
        let p = proposal(vec![item("A", 10)]);
        assert!(p.is_active);
        assert_eq!(p.status, ProposalStatus::SubmittedToCustomer);
        assert_eq!(p.versions.len(), 1);
        assert_eq!(p.versions[0].version_number, 1);
        assert_eq!(p.versions[0].created_by, AuthorRole::SalesRep);
        assert!(p.versions[0].changes.is_empty());
        assert_eq!(p.display_status(), Some(DisplayStatus::Sent));
    }

    #[test]
    fn test_create_rejects_empty_items() {
        let result = Proposal::create(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            FulfillmentUnit::Fairwinds,
            vec![],
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_create_rejects_items_outside_brand_scope() {
        let result = Proposal::create(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            FulfillmentUnit::Fairwinds,
            vec![item_in("A", 1, BusinessUnit::PassionFlower)],
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_sunshine_pf_proposal_accepts_passion_flower_items() {
        let p = proposal(vec![
            item_in("A", 1, BusinessUnit::Sunshine),
            item_in("B", 2, BusinessUnit::PassionFlower),
        ]);
        assert_eq!(p.versions[0].items.len(), 2);
    }

    #[test]
    fn test_negotiation_scenario() {
        let mut p = proposal(vec![item("A", 10)]);

        let v2 = p
            .append_version(vec![item("A", 8)], AuthorRole::Dispensary, Utc::now(), EditPolicy::default())
            .unwrap()
            .clone();
        assert_eq!(v2.version_number, 2);
        assert_eq!(
            v2.changes,
            vec![ProposalChange::QuantityChange {
                product_id: "A".to_string(),
                product_name: "Product A".to_string(),
                previous_value: 10,
                new_value: 8,
            }]
        );
        assert_eq!(p.status, ProposalStatus::PendingReview);
        assert_eq!(p.display_status(), Some(DisplayStatus::Changed));

        let v3 = p
            .append_version(
                vec![item("A", 8), item("B", 3)],
                AuthorRole::SalesRep,
                Utc::now(),
                EditPolicy::default(),
            )
            .unwrap()
            .clone();
        assert_eq!(v3.version_number, 3);
        assert_eq!(
            v3.changes,
            vec![ProposalChange::Added {
                product_id: "B".to_string(),
                product_name: "Product B".to_string(),
                new_value: 3,
            }]
        );
        assert_eq!(p.status, ProposalStatus::PendingReview);
        assert_eq!(p.display_status(), Some(DisplayStatus::Sent));
        assert!(p.has_contiguous_versions());
    }

    #[test]
    fn test_append_by_rep_still_reopens_review() {
        let mut p = proposal(vec![item("A", 1)]);
        p.append_version(vec![item("A", 2)], AuthorRole::SalesRep, Utc::now(), EditPolicy::default())
            .unwrap();
        assert_eq!(p.status, ProposalStatus::PendingReview);
    }

    #[test]
    fn test_accept_and_reject_do_not_append() {
        let mut p = proposal(vec![item("A", 1)]);
        p.accept();
        assert_eq!(p.status, ProposalStatus::Accepted);
        assert_eq!(p.versions.len(), 1);
        assert_eq!(p.display_status(), Some(DisplayStatus::Accepted));

        p.reject();
        assert_eq!(p.status, ProposalStatus::Rejected);
        assert_eq!(p.versions.len(), 1);
        assert_eq!(p.display_status(), Some(DisplayStatus::Sent));
    }

    #[test]
    fn test_accepted_shows_only_on_latest_version() {
        let mut p = proposal(vec![item("A", 1)]);
        p.append_version(vec![item("A", 2)], AuthorRole::Dispensary, Utc::now(), EditPolicy::default())
            .unwrap();
        p.accept();
        assert_eq!(p.version_display_status(1), Some(DisplayStatus::Sent));
        assert_eq!(p.version_display_status(2), Some(DisplayStatus::Accepted));
        assert_eq!(p.version_display_status(3), None);
    }

    #[test]
    fn test_edit_after_decision_reopens_by_default() {
        let mut p = proposal(vec![item("A", 1)]);
        p.accept();
        p.append_version(vec![item("A", 4)], AuthorRole::Dispensary, Utc::now(), EditPolicy::default())
            .unwrap();
        assert_eq!(p.status, ProposalStatus::PendingReview);
        assert_eq!(p.versions.len(), 2);
    }

    #[test]
    fn test_edit_after_decision_blocked_by_policy() {
        let policy = EditPolicy {
            allow_edit_after_decision: false,
        };
        let mut p = proposal(vec![item("A", 1)]);
        p.reject();
        let result = p.append_version(vec![item("A", 4)], AuthorRole::SalesRep, Utc::now(), policy);
        assert!(matches!(result, Err(DomainError::Conflict(_))));
        assert_eq!(p.versions.len(), 1);
        assert_eq!(p.status, ProposalStatus::Rejected);
    }

    #[test]
    fn test_append_to_superseded_proposal_conflicts() {
        let mut p = proposal(vec![item("A", 1)]);
        p.deactivate();
        let result = p.append_version(vec![item("A", 2)], AuthorRole::SalesRep, Utc::now(), EditPolicy::default());
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[test]
    fn test_append_without_versions_is_not_found() {
        let mut p = proposal(vec![item("A", 1)]);
        p.versions.clear();
        let result = p.append_version(vec![item("A", 2)], AuthorRole::SalesRep, Utc::now(), EditPolicy::default());
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[test]
    fn test_append_from_latest_version_only() {
        let mut full = proposal(vec![item("A", 1)]);
        full.append_version(vec![item("A", 2)], AuthorRole::Dispensary, Utc::now(), EditPolicy::default())
            .unwrap();

        let mut tail = Proposal {
            versions: full.versions[1..].to_vec(),
            ..full.clone()
        };
        let next = tail
            .append_version(vec![item("A", 2), item("B", 1)], AuthorRole::SalesRep, Utc::now(), EditPolicy::default())
            .unwrap()
            .clone();

        assert_eq!(next.version_number, 3);
        assert_eq!(next.changes, diff(&full.versions[1].items, &next.items));
        assert_eq!(tail.status, ProposalStatus::PendingReview);
    }

    #[test]
    fn test_append_rejects_inconsistent_line_total() {
        let mut p = proposal(vec![item("A", 1)]);
        let mut tampered = item("A", 2);
        tampered.line_total = Decimal::ONE;
        let result = p.append_version(vec![tampered], AuthorRole::SalesRep, Utc::now(), EditPolicy::default());
        assert!(matches!(result, Err(DomainError::Validation { .. })));
        assert_eq!(p.versions.len(), 1);
    }

    #[test]
    fn test_supersede_active_keeps_history() {
        let dispensary = Uuid::new_v4();
        let mut first = proposal(vec![item("A", 1)]);
        first.dispensary_id = dispensary;
        first
            .append_version(vec![item("A", 5)], AuthorRole::Dispensary, Utc::now(), EditPolicy::default())
            .unwrap();
        let history = first.versions.clone();
        let other = proposal(vec![item("Z", 1)]);

        let mut all = vec![first, other];
        let superseded = supersede_active(&mut all, dispensary);

        assert_eq!(superseded, vec![all[0].id]);
        assert!(!all[0].is_active);
        assert_eq!(all[0].versions, history);
        assert!(all[1].is_active);
    }

    #[test]
    fn test_status_strings() {
        for status in [
            ProposalStatus::SubmittedToCustomer,
            ProposalStatus::PendingReview,
            ProposalStatus::Accepted,
            ProposalStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<ProposalStatus>(), Ok(status));
        }
        assert!("draft".parse::<ProposalStatus>().is_err());
        assert_eq!("dispensary".parse::<AuthorRole>(), Ok(AuthorRole::Dispensary));
    }
}
