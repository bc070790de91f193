//! # Domain Types
//!
//! Entity records persisted by the repositories.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Entity Records                                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    TaxRate      │   │      Task       │   │   CreditNote    │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  code (unique)  │   │  task_type      │   │  number (uniq)  │        │
//! │  │  percentage     │   │  task_status    │   │  line_items     │        │
//! │  │  fixed_value    │   │  record counts  │   │  idempotency    │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────────────────────────┐      │
//! │  │     Secret      │   │  Common to all: id, tenant_id,          │      │
//! │  │  ─────────────  │   │  environment_id, status, created_at/by, │      │
//! │  │  value (unique) │   │  updated_at/by                          │      │
//! │  │  last_used_at   │   └─────────────────────────────────────────┘      │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Lifecycle
//! `draft → published → archived → deleted`. Rows are never hard-deleted:
//! `deleted` is a status, excluded from default listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Record Contract
// =============================================================================

/// Fields every persisted entity carries.
pub trait Record {
    fn id(&self) -> &str;
    fn tenant_id(&self) -> &str;
    fn environment_id(&self) -> &str;
    fn set_environment_id(&mut self, environment_id: String);
    fn status(&self) -> Status;

    /// Fills `created_by`/`updated_by` with `user_id` where still empty.
    fn stamp_created(&mut self, user_id: &str);

    /// Sets `updated_at`/`updated_by`.
    fn stamp_updated(&mut self, user_id: &str, at: DateTime<Utc>);
}

/// Implements [`Record`] for a struct with the standard field names.
macro_rules! impl_record {
    ($ty:ty) => {
        impl Record for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn tenant_id(&self) -> &str {
                &self.tenant_id
            }

            fn environment_id(&self) -> &str {
                &self.environment_id
            }

            fn set_environment_id(&mut self, environment_id: String) {
                self.environment_id = environment_id;
            }

            fn status(&self) -> Status {
                self.status
            }

            fn stamp_created(&mut self, user_id: &str) {
                if self.created_by.is_empty() {
                    self.created_by = user_id.to_string();
                }
                if self.updated_by.is_empty() {
                    self.updated_by = user_id.to_string();
                }
            }

            fn stamp_updated(&mut self, user_id: &str, at: DateTime<Utc>) {
                self.updated_by = user_id.to_string();
                self.updated_at = at;
            }
        }
    };
}

/// Generates a prefixed entity id, e.g. `txr_5f0c...`.
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

// =============================================================================
// Status
// =============================================================================

/// Lifecycle status shared by every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    #[default]
    Published,
    Archived,
    Deleted,
}

impl Status {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Published => "published",
            Status::Archived => "archived",
            Status::Deleted => "deleted",
        }
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TaxRateType {
    #[default]
    Percentage,
    Fixed,
}

impl TaxRateType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaxRateType::Percentage => "percentage",
            TaxRateType::Fixed => "fixed",
        }
    }
}

/// A tax rate applicable to invoices. `code` is unique per tenant+environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TaxRate {
    pub id: String,
    pub tenant_id: String,
    pub environment_id: String,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub tax_rate_type: TaxRateType,
    /// Percentage as a plain number, 8.25 = 8.25%.
    pub percentage_value: Option<f64>,
    /// Fixed amount in cents.
    pub fixed_value_cents: Option<i64>,
    pub scope: String,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl_record!(TaxRate);

impl TaxRate {
    /// Creates a published percentage tax rate for `tenant_id`.
    pub fn percentage(tenant_id: &str, code: &str, name: &str, percentage: f64) -> Self {
        let now = Utc::now();
        TaxRate {
            id: generate_id("txr"),
            tenant_id: tenant_id.to_string(),
            environment_id: String::new(),
            name: name.to_string(),
            code: code.to_string(),
            description: None,
            tax_rate_type: TaxRateType::Percentage,
            percentage_value: Some(percentage),
            fixed_value_cents: None,
            scope: "external".to_string(),
            valid_from: None,
            valid_to: None,
            status: Status::Published,
            created_at: now,
            updated_at: now,
            created_by: String::new(),
            updated_by: String::new(),
        }
    }
}

// =============================================================================
// Task
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Import,
    Export,
}

impl TaskType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskType::Import => "import",
            TaskType::Export => "export",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

/// A bulk import/export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Task {
    pub id: String,
    pub tenant_id: String,
    pub environment_id: String,
    pub task_type: TaskType,
    /// What is being imported, e.g. `events`, `prices`.
    pub entity_type: String,
    pub file_url: String,
    pub file_name: Option<String>,
    pub task_status: TaskStatus,
    pub total_records: Option<i64>,
    pub processed_records: i64,
    pub successful_records: i64,
    pub failed_records: i64,
    pub error_summary: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl_record!(Task);

impl Task {
    /// Creates a pending, published task.
    pub fn new(tenant_id: &str, task_type: TaskType, entity_type: &str, file_url: &str) -> Self {
        let now = Utc::now();
        Task {
            id: generate_id("task"),
            tenant_id: tenant_id.to_string(),
            environment_id: String::new(),
            task_type,
            entity_type: entity_type.to_string(),
            file_url: file_url.to_string(),
            file_name: None,
            task_status: TaskStatus::Pending,
            total_records: None,
            processed_records: 0,
            successful_records: 0,
            failed_records: 0,
            error_summary: None,
            started_at: None,
            completed_at: None,
            failed_at: None,
            status: Status::Published,
            created_at: now,
            updated_at: now,
            created_by: String::new(),
            updated_by: String::new(),
        }
    }
}

// =============================================================================
// Credit Note
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CreditNoteStatus {
    #[default]
    Draft,
    Finalized,
    Voided,
}

impl CreditNoteStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CreditNoteStatus::Draft => "draft",
            CreditNoteStatus::Finalized => "finalized",
            CreditNoteStatus::Voided => "voided",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CreditNoteType {
    #[default]
    Adjustment,
    Refund,
}

impl CreditNoteType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CreditNoteType::Adjustment => "adjustment",
            CreditNoteType::Refund => "refund",
        }
    }
}

/// A credit issued against an invoice.
///
/// `line_items` is not a column; it is filled by
/// `CreditNoteRepository::get_with_line_items` and written by
/// `create_with_line_items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CreditNote {
    pub id: String,
    pub tenant_id: String,
    pub environment_id: String,
    pub invoice_id: String,
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub credit_note_number: String,
    pub credit_note_status: CreditNoteStatus,
    pub credit_note_type: CreditNoteType,
    pub reason: String,
    pub memo: String,
    pub currency: String,
    pub total_amount_cents: i64,
    pub idempotency_key: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub line_items: Vec<CreditNoteLineItem>,
}

impl_record!(CreditNote);

impl CreditNote {
    /// Creates a published draft credit note with no line items.
    pub fn new(tenant_id: &str, invoice_id: &str, customer_id: &str, number: &str, currency: &str) -> Self {
        let now = Utc::now();
        CreditNote {
            id: generate_id("cn"),
            tenant_id: tenant_id.to_string(),
            environment_id: String::new(),
            invoice_id: invoice_id.to_string(),
            customer_id: customer_id.to_string(),
            subscription_id: None,
            credit_note_number: number.to_string(),
            credit_note_status: CreditNoteStatus::Draft,
            credit_note_type: CreditNoteType::Adjustment,
            reason: String::new(),
            memo: String::new(),
            currency: currency.to_string(),
            total_amount_cents: 0,
            idempotency_key: None,
            voided_at: None,
            finalized_at: None,
            status: Status::Published,
            created_at: now,
            updated_at: now,
            created_by: String::new(),
            updated_by: String::new(),
            line_items: Vec::new(),
        }
    }

    /// Appends a line item and adds its amount to the total.
    pub fn add_line_item(&mut self, display_name: &str, amount_cents: i64) -> &CreditNoteLineItem {
        let item = CreditNoteLineItem {
            id: generate_id("cnli"),
            tenant_id: self.tenant_id.clone(),
            environment_id: self.environment_id.clone(),
            credit_note_id: self.id.clone(),
            display_name: display_name.to_string(),
            amount_cents,
            currency: self.currency.clone(),
            status: Status::Published,
            created_at: self.created_at,
            updated_at: self.updated_at,
            created_by: self.created_by.clone(),
            updated_by: self.updated_by.clone(),
        };
        self.total_amount_cents += amount_cents;
        self.line_items.push(item);
        &self.line_items[self.line_items.len() - 1]
    }
}

/// One line of a credit note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CreditNoteLineItem {
    pub id: String,
    pub tenant_id: String,
    pub environment_id: String,
    pub credit_note_id: String,
    pub display_name: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl_record!(CreditNoteLineItem);

// =============================================================================
// Secret
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    #[default]
    PrivateKey,
    PublishableKey,
    Integration,
}

impl SecretType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SecretType::PrivateKey => "private_key",
            SecretType::PublishableKey => "publishable_key",
            SecretType::Integration => "integration",
        }
    }
}

/// An API key or integration credential. `value` is globally unique and is
/// the natural lookup key for API-key authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Secret {
    pub id: String,
    pub tenant_id: String,
    pub environment_id: String,
    pub name: String,
    pub secret_type: SecretType,
    pub provider: String,
    pub value: String,
    /// Short, displayable suffix of the value.
    pub display_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl_record!(Secret);

impl Secret {
    /// Creates a published private API key with a random value.
    pub fn api_key(tenant_id: &str, name: &str) -> Self {
        let now = Utc::now();
        let value = format!("sk_{}", Uuid::new_v4().simple());
        let display_id = value[value.len() - 6..].to_string();
        Secret {
            id: generate_id("secret"),
            tenant_id: tenant_id.to_string(),
            environment_id: String::new(),
            name: name.to_string(),
            secret_type: SecretType::PrivateKey,
            provider: "ledgerline".to_string(),
            value,
            display_id,
            expires_at: None,
            last_used_at: None,
            status: Status::Published,
            created_at: now,
            updated_at: now,
            created_by: String::new(),
            updated_by: String::new(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
