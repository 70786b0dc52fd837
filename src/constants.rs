//! Named Constants
//!
//! All limits use big-endian naming: `CATEGORY_SPECIFICS_UNIT_LIMIT`
//! Example: `TYPE_NAME_BYTES_MAX` (not `MAX_TYPE_NAME`)
//!
//! Every constant includes units in the name where applicable:
//! - _`BYTES_MAX` for size limits
//! - _`COUNT_MAX` for quantity limits
//! - _DEFAULT for configurable defaults

// =============================================================================
// Envelope
// =============================================================================

/// Schema version written into every new envelope
pub const SCHEMA_VERSION_DEFAULT: u32 = 1;

// =============================================================================
// Type Names
// =============================================================================

/// Maximum length of a canonical type name
pub const TYPE_NAME_BYTES_MAX: usize = 256;

// =============================================================================
// Backend Tuning
// =============================================================================

/// Maximum connections held by the postgres pool
pub const POSTGRES_POOL_CONNECTIONS_MAX: u32 = 10;

/// Default key prefix for the redis backend
pub const REDIS_KEY_PREFIX_DEFAULT: &str = "exostore";
