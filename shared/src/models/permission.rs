//! Role permissions as a fixed record of capability flags

use serde::{Deserialize, Serialize};

/// Role names that see data across all users
pub const PRIVILEGED_ROLES: &[&str] = &["Admin", "Super Admin"];

pub fn is_privileged_role(role_name: &str) -> bool {
    PRIVILEGED_ROLES.contains(&role_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    Products,
    ProductTypes,
    CategorySort,
    AlertBanners,
    OrdersRegular,
    OrdersVmi,
    Dispensaries,
    Users,
    Roles,
    Inventory,
    MobileNav,
    Categories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Edit,
    Create,
    Delete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudFlags {
    pub view: bool,
    pub edit: bool,
    pub create: bool,
    pub delete: bool,
}

impl CrudFlags {
    pub const ALL: CrudFlags = CrudFlags {
        view: true,
        edit: true,
        create: true,
        delete: true,
    };
    pub const VIEW: CrudFlags = CrudFlags {
        view: true,
        edit: false,
        create: false,
        delete: false,
    };

    fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Edit => self.edit,
            Action::Create => self.create,
            Action::Delete => self.delete,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewEditFlags {
    pub view: bool,
    pub edit: bool,
}

impl ViewEditFlags {
    fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Edit => self.edit,
            Action::Create | Action::Delete => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewFlag {
    pub view: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmiFlags {
    pub view: bool,
    pub edit: bool,
    pub delete: bool,
}

impl VmiFlags {
    fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Edit => self.edit,
            Action::Delete => self.delete,
            Action::Create => false,
        }
    }
}

/// Capabilities of a role, one entry per resource.
///
/// Stored as JSON on the role row and carried in access tokens. Missing
/// resources deserialize as "no access".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionSet {
    pub products: CrudFlags,
    pub product_types: CrudFlags,
    pub category_sort: ViewEditFlags,
    pub alert_banners: CrudFlags,
    pub orders_regular: ViewFlag,
    pub orders_vmi: VmiFlags,
    pub dispensaries: CrudFlags,
    pub users: CrudFlags,
    pub roles: CrudFlags,
    pub inventory: ViewEditFlags,
    pub mobile_nav: ViewEditFlags,
    pub categories: CrudFlags,
}

impl PermissionSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        let view_edit = ViewEditFlags { view: true, edit: true };
        Self {
            products: CrudFlags::ALL,
            product_types: CrudFlags::ALL,
            category_sort: view_edit,
            alert_banners: CrudFlags::ALL,
            orders_regular: ViewFlag { view: true },
            orders_vmi: VmiFlags {
                view: true,
                edit: true,
                delete: true,
            },
            dispensaries: CrudFlags::ALL,
            users: CrudFlags::ALL,
            roles: CrudFlags::ALL,
            inventory: view_edit,
            mobile_nav: view_edit,
            categories: CrudFlags::ALL,
        }
    }

    /// Default capabilities of the built-in Sales Rep role
    pub fn sales_rep() -> Self {
        Self {
            products: CrudFlags::VIEW,
            orders_regular: ViewFlag { view: true },
            orders_vmi: VmiFlags {
                view: true,
                edit: true,
                delete: false,
            },
            dispensaries: CrudFlags::VIEW,
            users: CrudFlags::VIEW,
            inventory: ViewEditFlags { view: true, edit: false },
            ..Self::none()
        }
    }

    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        match resource {
            Resource::Products => self.products.allows(action),
            Resource::ProductTypes => self.product_types.allows(action),
            Resource::CategorySort => self.category_sort.allows(action),
            Resource::AlertBanners => self.alert_banners.allows(action),
            Resource::OrdersRegular => action == Action::View && self.orders_regular.view,
            Resource::OrdersVmi => self.orders_vmi.allows(action),
            Resource::Dispensaries => self.dispensaries.allows(action),
            Resource::Users => self.users.allows(action),
            Resource::Roles => self.roles.allows(action),
            Resource::Inventory => self.inventory.allows(action),
            Resource::MobileNav => self.mobile_nav.allows(action),
            Resource::Categories => self.categories.allows(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_and_none() {
        assert!(PermissionSet::all().allows(Resource::OrdersVmi, Action::Delete));
        assert!(!PermissionSet::none().allows(Resource::Products, Action::View));
    }

    #[test]
    fn test_sales_rep_capabilities() {
        let rep = PermissionSet::sales_rep();
        assert!(rep.allows(Resource::OrdersVmi, Action::View));
        assert!(rep.allows(Resource::OrdersVmi, Action::Edit));
        assert!(!rep.allows(Resource::OrdersVmi, Action::Delete));
        assert!(rep.allows(Resource::OrdersRegular, Action::View));
        assert!(rep.allows(Resource::Products, Action::View));
        assert!(!rep.allows(Resource::Products, Action::Edit));
        assert!(!rep.allows(Resource::Roles, Action::View));
    }

    #[test]
    fn test_unsupported_actions_are_denied() {
        let all = PermissionSet::all();
        assert!(!all.allows(Resource::OrdersRegular, Action::Edit));
        assert!(!all.allows(Resource::Inventory, Action::Delete));
        assert!(!all.allows(Resource::OrdersVmi, Action::Create));
    }

    #[test]
    fn test_json_shape_uses_camel_case() {
        let json = serde_json::to_value(PermissionSet::sales_rep()).unwrap();
        assert_eq!(json["ordersVmi"]["edit"], true);
        assert_eq!(json["productTypes"]["view"], false);
    }

    #[test]
    fn test_partial_json_defaults_to_no_access() {
        let set: PermissionSet = serde_json::from_str(r#"{"ordersVmi":{"view":true}}"#).unwrap();
        assert!(set.allows(Resource::OrdersVmi, Action::View));
        assert!(!set.allows(Resource::OrdersVmi, Action::Edit));
        assert!(!set.allows(Resource::Products, Action::View));
    }

    #[test]
    fn test_privileged_roles() {
        assert!(is_privileged_role("Admin"));
        assert!(is_privileged_role("Super Admin"));
        assert!(!is_privileged_role("Sales Rep"));
        assert!(!is_privileged_role("admin"));
    }
}
