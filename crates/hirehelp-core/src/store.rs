use std::sync::Arc;

use arc_swap::ArcSwap;
use hirehelp_schema::{default_company, CompanyConfig};

/// Holds the active tenant. Readers take a snapshot per turn; the admin
/// workflow swaps the whole record at once.
pub struct CompanyStore {
    current: ArcSwap<CompanyConfig>,
}

impl CompanyStore {
    pub fn new(initial: CompanyConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    pub fn snapshot(&self) -> Arc<CompanyConfig> {
        self.current.load_full()
    }

    /// Installs `next` and returns the record it replaced.
    pub fn replace(&self, next: CompanyConfig) -> Arc<CompanyConfig> {
        let previous = self.current.swap(Arc::new(next));
        tracing::info!(
            from = %previous.name,
            to = %self.current.load().name,
            "company config replaced"
        );
        previous
    }
}

impl Default for CompanyStore {
    fn default() -> Self {
        Self::new(default_company())
    }
}
