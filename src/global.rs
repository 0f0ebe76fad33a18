//! Process-wide suffix database.
//!
//! Installed once, then shared read-only by every lookup without locking.

use once_cell::sync::OnceCell;
use tracing::info;

use crate::database::SuffixDatabase;
use crate::error::{PslError, Result};

static DATABASE: OnceCell<SuffixDatabase> = OnceCell::new();

/// Install the process-wide database. Fails if one is already installed.
pub fn install(db: SuffixDatabase) -> Result<&'static SuffixDatabase> {
    let stats = db.stats();
    DATABASE.set(db).map_err(|_| PslError::AlreadyInstalled)?;
    info!(
        nodes = stats.nodes,
        label_bytes = stats.label_bytes,
        "installed public suffix database"
    );
    get()
}

/// Process-wide database, if installed.
pub fn get() -> Result<&'static SuffixDatabase> {
    DATABASE.get().ok_or(PslError::NotInstalled)
}

/// Registrable domain of `hostname` using the process-wide database.
pub fn registrable_domain(hostname: &str) -> Result<Option<&str>> {
    Ok(get()?.registrable_domain(hostname))
}
