//! Domain models shared across the engine.

pub mod analysis;
pub mod billing_rules;
pub mod credential;
pub mod order;
pub mod record;
pub mod report;
pub mod timestamps;

pub use analysis::{
    AnalysisResult, Classification, DetentionAction, ProcessedAction, ProcessingState,
};
pub use billing_rules::{
    BillingRules, FreeTimeTable, RateUnit, RawBillingRule, RoundingMode, StaticRulesCatalog,
};
pub use credential::Credential;
pub use order::{
    ExecutionLinkage, ExistingHold, LoadType, NewPricingLine, OrderFacts, OrderStatus, OrderView,
    PricingLine, Stop, StopType,
};
pub use record::OrderRecord;
pub use report::{ReportEntry, ReportStatus};
pub use timestamps::{StopTimestamps, TourTimestamps};
