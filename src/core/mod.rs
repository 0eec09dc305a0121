//! Core business logic - framework-agnostic bookkeeping operations.
//!
//! Everything here is a free async function over a `DatabaseConnection`,
//! with permissions resolved through [`authorizer::Actor`]. The HTTP layer
//! and the job runner are both thin callers of these modules.

/// Role and permission resolution
pub mod authorizer;
/// Breakfast entry and cost splitting
pub mod breakfast;
/// Month-end charge application
pub mod charges;
/// Holiday calendar and weekend policy
pub mod holidays;
/// Atomic balance mutation with the transaction audit trail
pub mod ledger;
/// Prioritized force-on/force-off rules
pub mod overrides;
/// Effective meal status and toggling
pub mod resolver;
/// Month settings, rates, and finalization
pub mod settings;
/// User and balance management
pub mod users;
