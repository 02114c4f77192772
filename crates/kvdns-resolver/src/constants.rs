//! Constants for the resolution engine.

use std::time::Duration;

// ============================================================================
// Key Convention Constants
// ============================================================================

/// Separator between path segments of a store key.
///
/// Keys look like `{prefix}/{zone}/{subdomain}/{qtype}/{id}`, e.g.
/// `/dns/example.net/www/A/1`.
pub const KEY_SEPARATOR: char = '/';

/// Suffix marking a key that holds a defaults object rather than a record.
pub const DEFAULTS_SUFFIX: &str = "-defaults";

/// Subdomain label used for the zone apex.
pub const APEX_LABEL: &str = "@";

/// Label separator in domain names.
pub const LABEL_SEPARATOR: char = '.';

// ============================================================================
// Query Types
// ============================================================================

/// Wildcard query type requesting every record type under a name.
pub const QTYPE_ANY: &str = "ANY";

/// Start-of-authority query type. SOA records live under an exact key.
pub const QTYPE_SOA: &str = "SOA";

// ============================================================================
// Limits
// ============================================================================

/// First zone id handed out by the zone registry.
pub const FIRST_ZONE_ID: i32 = 1;

/// Smallest accepted value for any duration field.
pub const MIN_DURATION: Duration = Duration::from_secs(1);

/// Default bound on the store calls made by a single lookup.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
