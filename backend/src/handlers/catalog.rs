//! Catalog listing handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use shared::{Action, CatalogProduct, CatalogView, FulfillmentUnit, Resource};

use super::parse_param;
use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser, LicensedDispensary};
use crate::services::CatalogService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminCatalogQuery {
    /// `sunshine` (default) or `fairwinds-pf`
    pub view: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PublicCatalogQuery {
    /// `sunshine-pf` (default) or `fairwinds`
    pub brand: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub products: Vec<CatalogProduct>,
}

/// Admin catalog view
pub async fn get_catalog(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AdminCatalogQuery>,
) -> AppResult<Json<CatalogResponse>> {
    check_permission(&user, Resource::Products, Action::View)?;

    let view = parse_param::<CatalogView>(query.view.as_deref())?.unwrap_or(CatalogView::Sunshine);
    let products = CatalogService::new(state.db).admin_catalog(view).await?;

    Ok(Json(CatalogResponse { products }))
}

/// Storefront catalog, hiding low-stock products
pub async fn get_public_catalog(
    State(state): State<AppState>,
    LicensedDispensary(_dispensary): LicensedDispensary,
    Query(query): Query<PublicCatalogQuery>,
) -> AppResult<Json<CatalogResponse>> {
    let selection =
        parse_param::<FulfillmentUnit>(query.brand.as_deref())?.unwrap_or(FulfillmentUnit::SunshinePf);
    let defaults = state.config.catalog.default_thresholds();
    let products = CatalogService::new(state.db).public_catalog(selection, defaults).await?;

    Ok(Json(CatalogResponse { products }))
}
