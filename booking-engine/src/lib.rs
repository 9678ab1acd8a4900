//! Community dinner booking engine
//!
//! # Overview
//!
//! - **Pricing** (`pricing`): ticket category and price from age or amount
//! - **Reconciliation** (`scaffold`): preferences against orders, bucketed plan, batched apply
//! - **User actions** (`orders`): book, cancel, claim, change mode; the audit trail
//!   reconciliation reads
//! - **Billing** (`billing`): frozen snapshots, invoices, period statistics, CSV in and out
//! - **Jobs** (`jobs`): run ledger around reconciliation and billing runs
//!
//! # Layout
//!
//! ```text
//! booking-engine/src/
//! ├── core/          # config, caller identity
//! ├── utils/         # logger, dates, validation
//! ├── db/            # repository trait, in-memory store
//! ├── pricing/       # ticket price resolver
//! ├── scaffold/      # order reconciliation engine
//! ├── orders/        # single-order user actions
//! ├── billing/       # snapshot, aggregator, billing run, CSV
//! └── jobs/          # job-run ledger
//! ```

pub mod billing;
pub mod core;
pub mod db;
pub mod jobs;
pub mod orders;
pub mod pricing;
pub mod scaffold;
pub mod utils;

// Re-export public types
pub use billing::{BillingPeriod, BillingPeriodAggregator, BillingService};
pub use core::{Actor, Config};
pub use db::{BookingRepository, MemoryStore};
pub use jobs::{JobResultSummary, JobRunLedger, MemoryLedger, run_monthly_billing, run_tracked};
pub use orders::OrderActions;
pub use pricing::resolve_ticket_price;
pub use scaffold::{HouseholdScope, OrderScaffoldEngine, ScaffoldRequest, ScaffoldResult};
pub use utils::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env`, read the config and start logging
pub fn setup_environment() -> Config {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );
    tracing::debug!(
        community = %config.community_name,
        tz = %config.business_tz,
        batch_size = config.scaffold_batch_size,
        "Environment ready"
    );
    config
}
