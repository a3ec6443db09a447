// Focus modes and the restriction engine
//
// A focus mode pairs a set of blocked apps with an activation rule. The
// restriction engine evaluates every enabled mode on each tick, unions the
// scopes of the active ones and forwards scope changes to the enforcement
// boundary, gated on the user's authorization.

pub mod auth;
pub mod catalog;
pub mod enforcement;
pub mod engine;
pub mod error;
pub mod mode;
pub mod schedule;
pub mod session;
pub mod usage;

pub use auth::{AuthorizationBoundary, AuthorizationState, AuthorizationStatus, GrantFileAuthorizer};
pub use catalog::{compute_content_hash, CatalogStore, FocusModeCatalog, SharedCatalog, YamlCatalogStore};
pub use enforcement::{format_scope, CommandEnforcer, EnforcementBoundary, LogOnlyEnforcer, RestrictionCommand};
pub use engine::{Evaluation, RestrictionEngine};
pub use mode::{ActivationRule, AppLimit, AppSelector, DayOfWeek, FlowSession, FocusMode, PickupLimit, Schedule};
pub use session::SessionState;
pub use usage::{JsonUsageFile, UsageSnapshot, UsageSource};
