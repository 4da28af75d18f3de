//! # petbox-engine: Services and Background Workers
//!
//! Request/response services over `petbox-db` plus the two interval
//! workers that keep drafts and plans moving without a caller.
//!
//! ## Module Organization
//! ```text
//! petbox_engine/
//! ├── catalog.rs       ← Eligible products, availability, shop view
//! ├── drafts.rs        ← Draft creation and line mutations
//! ├── plans.rs         ← Plan activation, bundle checkout, status changes
//! ├── scheduler/
//! │   ├── expiry.rs    ← Deletes expired drafts
//! │   └── renewal.rs   ← Bills due plans once per cycle
//! ├── collaborators.rs ← PaymentGateway / ImageUrlResolver seams
//! ├── config.rs        ← Engine tunables
//! └── error.rs         ← EngineError → ErrorCode
//! ```
//!
//! ## Wiring
//! ```text
//!   Database ──┬──► Engine { drafts, catalog, plans }  ◄── HTTP handlers
//!              │
//!              ├──► ExpirySweeper    ──┐
//!              └──► RenewalScheduler ──┴── tokio::spawn(worker.run())
//! ```

pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod drafts;
pub mod error;
pub mod plans;
pub mod scheduler;

use std::sync::Arc;

use petbox_db::Database;

pub use catalog::CatalogService;
pub use collaborators::{
    ChargeReceipt, ChargeRequest, DeferredCaptureGateway, ImageUrlResolver, PaymentGateway,
    PublicBucketResolver,
};
pub use config::EngineConfig;
pub use drafts::DraftService;
pub use error::{EngineError, EngineResult, ErrorCode, PaymentError};
pub use plans::PlanService;
pub use scheduler::{ExpirySweeper, RenewalReport, RenewalScheduler, WorkerHandle};

/// The request/response services, sharing one database handle.
#[derive(Clone)]
pub struct Engine {
    pub drafts: DraftService,
    pub catalog: CatalogService,
    pub plans: PlanService,
}

impl Engine {
    pub fn new(db: Database, config: &EngineConfig, images: Arc<dyn ImageUrlResolver>) -> Self {
        Engine {
            drafts: DraftService::new(db.clone(), images.clone(), config.draft_ttl),
            catalog: CatalogService::new(db.clone(), images),
            plans: PlanService::new(db, config.bundle_discount),
        }
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================
