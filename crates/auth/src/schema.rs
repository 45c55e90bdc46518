//! The closed catalog of permission categories and actions.
//!
//! The schema is versioned application configuration: persisted roles may
//! predate it, so everything read back from storage goes through
//! [`crate::PermissionMatrix::sanitize`] against the schema before use.

use serde::{Deserialize, Serialize};

use crate::level::Level;

/// Permission category (top-level grouping of actions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    StoreManagement,
    Items,
    Inventory,
    Users,
    Reports,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::StoreManagement,
        Category::Items,
        Category::Inventory,
        Category::Users,
        Category::Reports,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::StoreManagement => "store_management",
            Category::Items => "items",
            Category::Inventory => "inventory",
            Category::Users => "users",
            Category::Reports => "reports",
        }
    }

    /// UI grouping label.
    pub fn label(self) -> &'static str {
        match self {
            Category::StoreManagement => "Store Management",
            Category::Items => "Items",
            Category::Inventory => "Inventory",
            Category::Users => "Users Access",
            Category::Reports => "Reports",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "store_management" => Some(Category::StoreManagement),
            "items" => Some(Category::Items),
            "inventory" => Some(Category::Inventory),
            "users" => Some(Category::Users),
            "reports" => Some(Category::Reports),
            _ => None,
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission action within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    // store_management
    StoreList,
    AddStore,
    EditStore,
    DeleteStore,
    AddChildStore,
    StoreConfig,
    TaxInfo,
    Discount,
    OrderType,
    PaymentType,
    QuickBill,
    SaveDraft,
    InvoiceList,
    InvoiceDownload,
    Payments,
    // items
    ItemMaster,
    Categories,
    // inventory
    Suppliers,
    Buyers,
    StockPurchase,
    StockSold,
    Wastage,
    StockReport,
    Skus,
    // users
    Users,
    Role,
    // reports
    SalesReport,
    TaxReport,
    InvoiceReport,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::StoreList => "store_list",
            Action::AddStore => "add_store",
            Action::EditStore => "edit_store",
            Action::DeleteStore => "delete_store",
            Action::AddChildStore => "add_child_store",
            Action::StoreConfig => "store_config",
            Action::TaxInfo => "tax_info",
            Action::Discount => "discount",
            Action::OrderType => "order_type",
            Action::PaymentType => "payment_type",
            Action::QuickBill => "quick_bill",
            Action::SaveDraft => "save_draft",
            Action::InvoiceList => "invoice_list",
            Action::InvoiceDownload => "invoice_download",
            Action::Payments => "payments",
            Action::ItemMaster => "item_master",
            Action::Categories => "categories",
            Action::Suppliers => "suppliers",
            Action::Buyers => "buyers",
            Action::StockPurchase => "stock_purchase",
            Action::StockSold => "stock_sold",
            Action::Wastage => "wastage",
            Action::StockReport => "stock_report",
            Action::Skus => "skus",
            Action::Users => "users",
            Action::Role => "role",
            Action::SalesReport => "sales_report",
            Action::TaxReport => "tax_report",
            Action::InvoiceReport => "invoice_report",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "store_list" => Some(Action::StoreList),
            "add_store" => Some(Action::AddStore),
            "edit_store" => Some(Action::EditStore),
            "delete_store" => Some(Action::DeleteStore),
            "add_child_store" => Some(Action::AddChildStore),
            "store_config" => Some(Action::StoreConfig),
            "tax_info" => Some(Action::TaxInfo),
            "discount" => Some(Action::Discount),
            "order_type" => Some(Action::OrderType),
            "payment_type" => Some(Action::PaymentType),
            "quick_bill" => Some(Action::QuickBill),
            "save_draft" => Some(Action::SaveDraft),
            "invoice_list" => Some(Action::InvoiceList),
            "invoice_download" => Some(Action::InvoiceDownload),
            "payments" => Some(Action::Payments),
            "item_master" => Some(Action::ItemMaster),
            "categories" => Some(Action::Categories),
            "suppliers" => Some(Action::Suppliers),
            "buyers" => Some(Action::Buyers),
            "stock_purchase" => Some(Action::StockPurchase),
            "stock_sold" => Some(Action::StockSold),
            "wastage" => Some(Action::Wastage),
            "stock_report" => Some(Action::StockReport),
            "skus" => Some(Action::Skus),
            "users" => Some(Action::Users),
            "role" => Some(Action::Role),
            "sales_report" => Some(Action::SalesReport),
            "tax_report" => Some(Action::TaxReport),
            "invoice_report" => Some(Action::InvoiceReport),
            _ => None,
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one action: its allowed levels and default assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionSpec {
    pub action: Action,
    pub label: &'static str,
    pub levels: &'static [Level],
    pub default_level: Level,
}

impl ActionSpec {
    pub fn allows(&self, level: Level) -> bool {
        self.levels.contains(&level)
    }

    /// Map a requested level onto this action's allowed set.
    ///
    /// Coercion precedence for levels outside the set: view/download actions
    /// pull read grants down to `download` and everything else to `show`;
    /// read/write actions pull `download` up to `read_write` and everything
    /// else to `read_only`; failing both, the first declared level wins.
    pub fn coerce(&self, requested: Level) -> Level {
        if self.allows(requested) {
            return requested;
        }
        if self.levels.contains(&Level::Download) {
            return match requested {
                Level::ReadWrite | Level::ReadOnly => Level::Download,
                _ => Level::Show,
            };
        }
        if self.levels.contains(&Level::ReadOnly) && self.levels.contains(&Level::ReadWrite) {
            return match requested {
                Level::Download => Level::ReadWrite,
                _ => Level::ReadOnly,
            };
        }
        self.first_level()
    }

    /// Landing level for vocabulary the schema no longer knows at all.
    pub fn stale_level(&self) -> Level {
        if self.levels.contains(&Level::Download) {
            Level::Show
        } else if self.levels.contains(&Level::ReadOnly) && self.levels.contains(&Level::ReadWrite)
        {
            Level::ReadOnly
        } else {
            self.first_level()
        }
    }

    fn first_level(&self) -> Level {
        self.levels.first().copied().unwrap_or(Level::Show)
    }
}

const READ_WRITE_LEVELS: &[Level] = &[Level::Show, Level::ReadOnly, Level::ReadWrite];
const VIEW_DOWNLOAD_LEVELS: &[Level] = &[Level::Show, Level::Download];
const VIEW_ONLY_LEVELS: &[Level] = &[Level::Show, Level::ReadOnly];

macro_rules! spec {
    ($action:ident, $label:literal, $levels:ident, $default:ident) => {
        ActionSpec {
            action: Action::$action,
            label: $label,
            levels: $levels,
            default_level: Level::$default,
        }
    };
}

const STORE_MANAGEMENT: &[ActionSpec] = &[
    spec!(StoreList, "Store List", READ_WRITE_LEVELS, ReadOnly),
    spec!(AddStore, "Add Store", READ_WRITE_LEVELS, ReadWrite),
    spec!(EditStore, "Edit Store", READ_WRITE_LEVELS, ReadWrite),
    spec!(DeleteStore, "Delete Store", READ_WRITE_LEVELS, ReadWrite),
    spec!(AddChildStore, "Create Child Store", READ_WRITE_LEVELS, ReadWrite),
    spec!(StoreConfig, "Store Configuration", READ_WRITE_LEVELS, ReadWrite),
    spec!(TaxInfo, "Taxes", READ_WRITE_LEVELS, ReadWrite),
    spec!(Discount, "Discounts", READ_WRITE_LEVELS, ReadWrite),
    spec!(OrderType, "Order Types", READ_WRITE_LEVELS, ReadWrite),
    spec!(PaymentType, "Payment Types", READ_WRITE_LEVELS, ReadWrite),
    spec!(QuickBill, "Quick Bill / New Invoice", READ_WRITE_LEVELS, ReadWrite),
    spec!(SaveDraft, "Save Draft Invoice", READ_WRITE_LEVELS, ReadWrite),
    spec!(InvoiceList, "Invoice List", READ_WRITE_LEVELS, ReadOnly),
    // Download stays a separate privilege from read access.
    spec!(InvoiceDownload, "Invoice Download", VIEW_DOWNLOAD_LEVELS, Download),
    spec!(Payments, "Payments", READ_WRITE_LEVELS, ReadWrite),
];

const ITEMS: &[ActionSpec] = &[
    spec!(ItemMaster, "Items", READ_WRITE_LEVELS, ReadOnly),
    spec!(Categories, "Categories", READ_WRITE_LEVELS, ReadOnly),
];

const INVENTORY: &[ActionSpec] = &[
    spec!(Suppliers, "Suppliers", READ_WRITE_LEVELS, ReadOnly),
    spec!(Buyers, "Buyers", READ_WRITE_LEVELS, ReadOnly),
    spec!(StockPurchase, "Stock Purchase", READ_WRITE_LEVELS, ReadOnly),
    // Sold rows are written by invoice issuance, never by hand.
    spec!(StockSold, "Stock Sold", VIEW_ONLY_LEVELS, ReadOnly),
    spec!(Wastage, "Wastage", READ_WRITE_LEVELS, ReadOnly),
    spec!(StockReport, "Stock Report", VIEW_DOWNLOAD_LEVELS, Download),
    spec!(Skus, "SKUs (Legacy)", READ_WRITE_LEVELS, Show),
];

const USERS: &[ActionSpec] = &[
    spec!(Users, "Employees", READ_WRITE_LEVELS, ReadOnly),
    spec!(Role, "Roles", READ_WRITE_LEVELS, ReadOnly),
];

const REPORTS: &[ActionSpec] = &[
    spec!(SalesReport, "Sales Report", VIEW_DOWNLOAD_LEVELS, Download),
    spec!(TaxReport, "Tax Report", VIEW_DOWNLOAD_LEVELS, Download),
    spec!(InvoiceReport, "Invoice Report", VIEW_DOWNLOAD_LEVELS, Download),
];

/// The declarative category → action → allowed-levels table.
///
/// Owned by the application and injected into sanitization; the domain never
/// assumes a particular schema instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSchema {
    categories: Vec<(Category, &'static [ActionSpec])>,
}

impl PermissionSchema {
    /// The retail back-office schema.
    pub fn retail() -> Self {
        Self {
            categories: vec![
                (Category::StoreManagement, STORE_MANAGEMENT),
                (Category::Items, ITEMS),
                (Category::Inventory, INVENTORY),
                (Category::Users, USERS),
                (Category::Reports, REPORTS),
            ],
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = (Category, &'static [ActionSpec])> + '_ {
        self.categories.iter().copied()
    }

    pub fn actions(&self, category: Category) -> Option<&'static [ActionSpec]> {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, specs)| *specs)
    }

    pub fn action_spec(&self, category: Category, action: Action) -> Option<&'static ActionSpec> {
        self.actions(category)?.iter().find(|s| s.action == action)
    }

    pub fn contains(&self, category: Category, action: Action) -> bool {
        self.action_spec(category, action).is_some()
    }
}
