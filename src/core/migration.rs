//! State schema version detection and migration.
//!
//! Migrations run automatically on every load and chain until the document
//! reaches [`CURRENT_VERSION`]. Each migration is idempotent. A version this
//! binary does not recognize fails loudly rather than guessing.

use crate::core::error::LudusError;
use crate::core::state::{State, CURRENT_VERSION};

/// Version stamped by pre-schema builds.
const LEGACY_VERSION_WITHOUT_SCHEMA: &str = "0.9";

/// One in-place schema upgrade step.
struct Migration {
    from: &'static str,
    up: fn(&mut State),
}

/// All migrations, keyed by the version they upgrade from.
fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        from: LEGACY_VERSION_WITHOUT_SCHEMA,
        up: migrate_v09_to_v10,
    }]
}

/// Upgrades state to [`CURRENT_VERSION`] in-place.
pub fn migrate_state(st: &mut State) -> Result<(), LudusError> {
    let mut version = if st.version.is_empty() {
        LEGACY_VERSION_WITHOUT_SCHEMA.to_string()
    } else {
        st.version.clone()
    };

    let migrations = all_migrations();
    while version != CURRENT_VERSION {
        let step = migrations
            .iter()
            .find(|m| m.from == version)
            .ok_or_else(|| LudusError::UnsupportedVersion(version.clone()))?;
        (step.up)(st);
        if st.version == version {
            // A migration that does not advance the version would loop forever.
            return Err(LudusError::UnsupportedVersion(version));
        }
        version = st.version.clone();
    }

    Ok(())
}

fn migrate_v09_to_v10(st: &mut State) {
    st.version = CURRENT_VERSION.to_string();
}
