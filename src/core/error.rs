use rust_decimal::Decimal;

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Abstract failure classes, used by callers to decide on retry vs. surface.
///
/// Only `Conflict` is retryable; every other kind must reach the caller
/// unchanged together with the entity that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input (negative amount, empty details, bad config)
    Validation,
    /// A referenced record does not exist
    NotFound,
    /// The operation would break a ledger invariant
    InvariantViolation,
    /// Lost a race against a concurrent writer; safe to retry
    Conflict,
    /// The storage backend failed
    Storage,
}

/// Main ledger error type
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    /// Validation errors for business rules
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Capture larger than the invoice's remaining due amount
    #[error("invoice {invoice} has {due} due; cannot capture {requested}")]
    InsufficientDueAmount {
        invoice: String,
        due: Decimal,
        requested: Decimal,
    },

    /// Payment declared a total its details do not cover
    #[error("payment total {declared} exceeds the sum of its details ({detailed})")]
    AmountMismatch { declared: Decimal, detailed: Decimal },

    /// Payment with no details, or details that are all zero
    #[error("payment carries no payable detail")]
    EmptyPayment,

    /// A payment detail asks for more than the invoice's due amount
    #[error("detail of {requested} against invoice {invoice} exceeds its due amount ({due})")]
    ExceedsDueAmount {
        invoice: String,
        due: Decimal,
        requested: Decimal,
    },

    /// Credit memo exists but cannot be applied to this payment
    #[error("credit memo {credit_memo} is not applicable: {reason}")]
    CreditMemoNotApplicable { credit_memo: String, reason: String },

    /// Credit memo was already redeemed once
    #[error("credit memo {0} has already been redeemed")]
    AlreadyRedeemed(String),

    /// Status value outside the entity's state machine
    #[error("invalid status '{0}'")]
    InvalidStatus(String),

    /// Transaction kind other than Credit or Debit
    #[error("invalid transaction type '{0}'")]
    InvalidTransactionType(String),

    /// Adjusted capture exceeds what the invoice can absorb
    #[error("new capture of {requested} exceeds the {available} available on invoice {invoice}")]
    ExceedsAvailableDue {
        invoice: String,
        available: Decimal,
        requested: Decimal,
    },

    /// Estimate referenced orders that resolve to a different dealer
    #[error("only {matched} of {requested} orders belong to dealer {dealer}")]
    OrdersDoNotBelongToDealer {
        dealer: String,
        requested: usize,
        matched: usize,
    },

    /// Estimate deletion could not release every linked order
    #[error("estimate {estimate}: released {updated} of {expected} linked orders")]
    PartialOrderUpdateFailure {
        estimate: String,
        expected: usize,
        updated: usize,
    },

    /// A reversal would drive an invoice's paid amount negative
    #[error("ledger corruption on invoice {invoice}: reversing {amount} would drive its paid amount negative")]
    LedgerCorruption { invoice: String, amount: Decimal },

    /// Lost a race against a concurrent writer
    #[error("concurrent modification: {0}")]
    Conflict(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored document snapshot failed to encode or decode
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LedgerError {
    /// Classify this error into one of the abstract failure classes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_)
            | LedgerError::EmptyPayment
            | LedgerError::AmountMismatch { .. }
            | LedgerError::InvalidStatus(_)
            | LedgerError::InvalidTransactionType(_)
            | LedgerError::Configuration(_) => ErrorKind::Validation,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::InsufficientDueAmount { .. }
            | LedgerError::ExceedsDueAmount { .. }
            | LedgerError::CreditMemoNotApplicable { .. }
            | LedgerError::AlreadyRedeemed(_)
            | LedgerError::ExceedsAvailableDue { .. }
            | LedgerError::OrdersDoNotBelongToDealer { .. }
            | LedgerError::PartialOrderUpdateFailure { .. }
            | LedgerError::LedgerCorruption { .. } => ErrorKind::InvariantViolation,
            LedgerError::Conflict(_) => ErrorKind::Conflict,
            LedgerError::Database(_)
            | LedgerError::Migration(_)
            | LedgerError::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// Whether the caller may safely retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

// Helper functions for common error scenarios
impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        LedgerError::Conflict(msg.into())
    }
}
