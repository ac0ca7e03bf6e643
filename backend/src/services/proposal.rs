//! VMI proposal service
//!
//! Persists the version chain defined in `shared`. Two invariants are
//! enforced here with row locks:
//! - a dispensary has at most one active proposal (the dispensary row is
//!   locked while the previous proposal is superseded);
//! - version numbers are dense per proposal (the proposal row is locked while
//!   the next number is allocated).
//!
//! Both are also backed by unique indexes, which surface as `Conflict`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow, PgConnection, PgPool};
use uuid::Uuid;

use shared::{
    reconcile_with_catalog, supersede_active, validate_item_list, AuthorRole, DisplayStatus, EditPolicy,
    FulfillmentUnit, Notification, NotificationBucket, OrderItem, Proposal, ProposalChange, ProposalStatus,
    ProposalVersion,
};

use super::items::{insert_items, load_items, ItemOwner};
use super::{parse_stored, CatalogService, DispensaryService, NotificationService};
use crate::error::{AppError, AppResult};

/// VMI proposal service
#[derive(Clone)]
pub struct ProposalService {
    db: PgPool,
    policy: EditPolicy,
}

// ============================================================================
// Rows and views
// ============================================================================

#[derive(Debug, FromRow)]
struct ProposalRow {
    id: Uuid,
    dispensary_id: Uuid,
    sales_rep_id: Uuid,
    business_unit: String,
    is_active: bool,
    status: String,
}

impl ProposalRow {
    fn business_unit(&self) -> AppResult<FulfillmentUnit> {
        parse_stored(&self.business_unit, "vmi_proposals.business_unit")
    }

    fn status(&self) -> AppResult<ProposalStatus> {
        parse_stored(&self.status, "vmi_proposals.status")
    }

    fn into_proposal(self, versions: Vec<ProposalVersion>) -> AppResult<Proposal> {
        Ok(Proposal {
            business_unit: self.business_unit()?,
            status: self.status()?,
            id: self.id,
            dispensary_id: self.dispensary_id,
            sales_rep_id: self.sales_rep_id,
            is_active: self.is_active,
            versions,
        })
    }
}

#[derive(Debug, FromRow)]
struct VersionRow {
    id: Uuid,
    proposal_id: Uuid,
    version_number: i32,
    created_by: String,
    created_at: DateTime<Utc>,
    changes: Json<Vec<ProposalChange>>,
}

impl VersionRow {
    fn into_version(self, items: Vec<OrderItem>) -> AppResult<ProposalVersion> {
        Ok(ProposalVersion {
            version_number: self.version_number,
            created_by: parse_stored(&self.created_by, "vmi_proposal_versions.created_by")?,
            created_at: self.created_at,
            items,
            changes: self.changes.0,
        })
    }
}

/// A version together with its derived display status
#[derive(Debug, Clone, Serialize)]
pub struct VersionView {
    #[serde(flatten)]
    pub version: ProposalVersion,
    pub display_status: DisplayStatus,
}

/// A proposal as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct ProposalView {
    pub id: Uuid,
    pub dispensary_id: Uuid,
    pub sales_rep_id: Uuid,
    pub business_unit: FulfillmentUnit,
    pub is_active: bool,
    pub status: ProposalStatus,
    pub display_status: Option<DisplayStatus>,
    pub versions: Vec<VersionView>,
}

impl From<Proposal> for ProposalView {
    fn from(proposal: Proposal) -> Self {
        let display_status = proposal.display_status();
        let latest = proposal.latest_version().map(|v| v.version_number);
        let versions = proposal
            .versions
            .iter()
            .map(|v| VersionView {
                display_status: v.display_status(proposal.status, Some(v.version_number) == latest),
                version: v.clone(),
            })
            .collect();

        Self {
            id: proposal.id,
            dispensary_id: proposal.dispensary_id,
            sales_rep_id: proposal.sales_rep_id,
            business_unit: proposal.business_unit,
            is_active: proposal.is_active,
            status: proposal.status,
            display_status,
            versions,
        }
    }
}

/// Result of appending a version
#[derive(Debug, Clone, Serialize)]
pub struct AppendOutcome {
    pub proposal_id: Uuid,
    pub status: ProposalStatus,
    pub new_version: ProposalVersion,
}

/// Input for creating a proposal
#[derive(Debug, Clone)]
pub struct NewProposal {
    pub dispensary_id: Uuid,
    pub sales_rep_id: Uuid,
    pub business_unit: FulfillmentUnit,
    pub items: Vec<OrderItem>,
}

/// Filters for listing proposals
#[derive(Debug, Clone, Default)]
pub struct ProposalFilter {
    pub dispensary_id: Option<Uuid>,
    pub business_unit: Option<FulfillmentUnit>,
    pub active_only: bool,
}

const PROPOSAL_COLUMNS: &str = "id, dispensary_id, sales_rep_id, business_unit, is_active, status";

// ============================================================================
// Service
// ============================================================================

impl ProposalService {
    pub fn new(db: PgPool, policy: EditPolicy) -> Self {
        Self { db, policy }
    }

    /// Create a proposal, superseding the dispensary's current active one
    pub async fn create(&self, input: NewProposal) -> AppResult<Proposal> {
        validate_item_list(&input.items, "items")?;

        let mut tx = self.db.begin().await?;

        let dispensary = DispensaryService::lock(&mut tx, input.dispensary_id).await?;
        let items = reconcile(&mut tx, &input.items).await?;

        let proposal = Proposal::create(
            Uuid::new_v4(),
            dispensary.id,
            input.sales_rep_id,
            input.business_unit,
            items,
            Utc::now(),
        )?;

        // Loaded without history; only the active flag changes
        let mut active = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {} FROM vmi_proposals WHERE dispensary_id = $1 AND is_active FOR UPDATE",
            PROPOSAL_COLUMNS
        ))
        .bind(dispensary.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|row| row.into_proposal(Vec::new()))
        .collect::<AppResult<Vec<Proposal>>>()?;

        let superseded = supersede_active(&mut active, dispensary.id);
        if !superseded.is_empty() {
            sqlx::query("UPDATE vmi_proposals SET is_active = FALSE, updated_at = NOW() WHERE id = ANY($1)")
                .bind(&superseded)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO vmi_proposals (id, dispensary_id, sales_rep_id, business_unit, is_active, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(proposal.id)
        .bind(proposal.dispensary_id)
        .bind(proposal.sales_rep_id)
        .bind(proposal.business_unit.as_str())
        .bind(proposal.is_active)
        .bind(proposal.status.as_str())
        .execute(&mut *tx)
        .await?;

        for version in &proposal.versions {
            insert_version(&mut tx, proposal.id, version).await?;
        }

        tx.commit().await?;

        tracing::info!(
            proposal_id = %proposal.id,
            dispensary_id = %proposal.dispensary_id,
            business_unit = %proposal.business_unit,
            superseded = ?superseded,
            "Created VMI proposal"
        );

        Ok(proposal)
    }

    /// Append a version to an active proposal.
    ///
    /// When `acting_dispensary` is set the proposal must belong to it;
    /// a mismatch reads as "not found".
    pub async fn append(
        &self,
        proposal_id: Uuid,
        items: Vec<OrderItem>,
        author: AuthorRole,
        acting_dispensary: Option<Uuid>,
    ) -> AppResult<AppendOutcome> {
        validate_item_list(&items, "items")?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {} FROM vmi_proposals WHERE id = $1 FOR UPDATE",
            PROPOSAL_COLUMNS
        ))
        .bind(proposal_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|row| acting_dispensary.map_or(true, |d| row.dispensary_id == d))
        .ok_or_else(|| AppError::NotFound("Proposal".to_string()))?;

        // Extending the chain only needs its latest link
        let latest = latest_version(&mut tx, proposal_id).await?;
        let mut proposal = row.into_proposal(latest.into_iter().collect())?;

        let items = reconcile(&mut tx, &items).await?;
        let next = proposal
            .append_version(items, author, Utc::now(), self.policy)?
            .clone();

        insert_version(&mut tx, proposal_id, &next).await?;

        let status = proposal.status;
        sqlx::query("UPDATE vmi_proposals SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(proposal_id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await?;

        if author == AuthorRole::Dispensary {
            let dispensary = DispensaryService::find(&mut tx, proposal.dispensary_id).await?;
            let notification = Notification::proposal_changed(
                Uuid::new_v4(),
                proposal.sales_rep_id,
                NotificationBucket::from(proposal.business_unit),
                &dispensary.name,
                next.version_number,
                next.created_at,
            );
            NotificationService::insert(&mut tx, &notification).await?;
        }

        tx.commit().await?;

        tracing::info!(
            proposal_id = %proposal_id,
            version_number = next.version_number,
            author = %author,
            changes = next.changes.len(),
            "Appended proposal version"
        );

        Ok(AppendOutcome {
            proposal_id,
            status,
            new_version: next,
        })
    }

    /// Accept the latest version without appending
    pub async fn accept(&self, proposal_id: Uuid) -> AppResult<ProposalView> {
        self.set_status(proposal_id, ProposalStatus::Accepted).await
    }

    /// Reject the latest version without appending
    pub async fn reject(&self, proposal_id: Uuid) -> AppResult<ProposalView> {
        self.set_status(proposal_id, ProposalStatus::Rejected).await
    }

    async fn set_status(&self, proposal_id: Uuid, status: ProposalStatus) -> AppResult<ProposalView> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            "UPDATE vmi_proposals SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING id",
        )
        .bind(proposal_id)
        .bind(status.as_str())
        .fetch_optional(&self.db)
        .await?;

        if updated.is_none() {
            return Err(AppError::NotFound("Proposal".to_string()));
        }

        tracing::info!(proposal_id = %proposal_id, status = %status, "Updated proposal status");
        self.get(proposal_id).await
    }

    /// Hard-delete a proposal and its whole version history
    pub async fn delete(&self, proposal_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM vmi_proposals WHERE id = $1")
            .bind(proposal_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Proposal".to_string()));
        }

        tracing::info!(proposal_id = %proposal_id, "Deleted VMI proposal");
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Proposal with full history
    pub async fn get(&self, proposal_id: Uuid) -> AppResult<ProposalView> {
        self.find(proposal_id).await.map(ProposalView::from)
    }

    /// Proposal with full history, as the domain type
    pub async fn find(&self, proposal_id: Uuid) -> AppResult<Proposal> {
        let mut conn = self.db.acquire().await?;

        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {} FROM vmi_proposals WHERE id = $1",
            PROPOSAL_COLUMNS
        ))
        .bind(proposal_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Proposal".to_string()))?;

        assemble(&mut conn, vec![row])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound("Proposal".to_string()))
    }

    /// The dispensary's active proposal, if any
    pub async fn active_for_dispensary(&self, dispensary_id: Uuid) -> AppResult<Option<ProposalView>> {
        let filter = ProposalFilter {
            dispensary_id: Some(dispensary_id),
            business_unit: None,
            active_only: true,
        };
        Ok(self.list(&filter).await?.into_iter().next())
    }

    /// Proposals matching the filter, newest first
    pub async fn list(&self, filter: &ProposalFilter) -> AppResult<Vec<ProposalView>> {
        let mut conn = self.db.acquire().await?;

        let rows = sqlx::query_as::<_, ProposalRow>(&format!(
            r#"
            SELECT {}
            FROM vmi_proposals
            WHERE ($1::uuid IS NULL OR dispensary_id = $1)
              AND ($2::text IS NULL OR business_unit = $2)
              AND (NOT $3 OR is_active)
            ORDER BY created_at DESC
            "#,
            PROPOSAL_COLUMNS
        ))
        .bind(filter.dispensary_id)
        .bind(filter.business_unit.map(|bu| bu.as_str()))
        .bind(filter.active_only)
        .fetch_all(&mut *conn)
        .await?;

        let proposals = assemble(&mut conn, rows).await?;
        Ok(proposals.into_iter().map(ProposalView::from).collect())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Reconcile submitted items against current catalog prices
async fn reconcile(conn: &mut PgConnection, items: &[OrderItem]) -> AppResult<Vec<OrderItem>> {
    let ids: Vec<String> = items.iter().map(|i| i.product_id.clone()).collect();
    let catalog = CatalogService::load_entries(conn, &ids).await?;
    Ok(reconcile_with_catalog(items, &catalog)?)
}

async fn insert_version(conn: &mut PgConnection, proposal_id: Uuid, version: &ProposalVersion) -> AppResult<()> {
    let version_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO vmi_proposal_versions (proposal_id, version_number, created_by, created_at, changes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(proposal_id)
    .bind(version.version_number)
    .bind(version.created_by.as_str())
    .bind(version.created_at)
    .bind(Json(&version.changes))
    .fetch_one(&mut *conn)
    .await?;

    insert_items(conn, ItemOwner::Version, version_id, &version.items).await
}

/// Highest-numbered version of a proposal with its items
async fn latest_version(conn: &mut PgConnection, proposal_id: Uuid) -> AppResult<Option<ProposalVersion>> {
    let row = sqlx::query_as::<_, VersionRow>(
        r#"
        SELECT id, proposal_id, version_number, created_by, created_at, changes
        FROM vmi_proposal_versions
        WHERE proposal_id = $1
        ORDER BY version_number DESC
        LIMIT 1
        "#,
    )
    .bind(proposal_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut items = load_items(conn, ItemOwner::Version, &[row.id]).await?;
    let version_items = items.remove(&row.id).unwrap_or_default();
    row.into_version(version_items).map(Some)
}

/// Attach versions and items to proposal rows, preserving row order
async fn assemble(conn: &mut PgConnection, rows: Vec<ProposalRow>) -> AppResult<Vec<Proposal>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let proposal_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let version_rows = sqlx::query_as::<_, VersionRow>(
        r#"
        SELECT id, proposal_id, version_number, created_by, created_at, changes
        FROM vmi_proposal_versions
        WHERE proposal_id = ANY($1)
        ORDER BY proposal_id, version_number
        "#,
    )
    .bind(&proposal_ids)
    .fetch_all(&mut *conn)
    .await?;

    let version_ids: Vec<Uuid> = version_rows.iter().map(|v| v.id).collect();
    let mut items = load_items(conn, ItemOwner::Version, &version_ids).await?;

    let mut versions: HashMap<Uuid, Vec<ProposalVersion>> = HashMap::with_capacity(rows.len());
    for version_row in version_rows {
        let proposal_id = version_row.proposal_id;
        let version_items = items.remove(&version_row.id).unwrap_or_default();
        versions
            .entry(proposal_id)
            .or_default()
            .push(version_row.into_version(version_items)?);
    }

    let proposals = rows
        .into_iter()
        .map(|row| {
            let history = versions.remove(&row.id).unwrap_or_default();
            row.into_proposal(history)
        })
        .collect::<AppResult<Vec<Proposal>>>()?;

    for proposal in proposals.iter().filter(|p| !p.has_contiguous_versions()) {
        tracing::error!(proposal_id = %proposal.id, "Proposal has a gap in its version numbers");
    }

    Ok(proposals)
}
