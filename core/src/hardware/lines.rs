use crate::prelude::{ScanError, ScanResult};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Book of which component owns which digital line.
///
/// A line can have one owner at a time. Claims are released when the
/// returned [`LineClaim`] is dropped, so every exit path hands the line back.
#[derive(Debug, Default)]
pub struct LineRegistry {
    claims: Mutex<BTreeMap<u8, String>>,
}

static GLOBAL: OnceLock<Arc<LineRegistry>> = OnceLock::new();

impl LineRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Process-wide registry shared by the binaries.
    pub fn global() -> Arc<Self> {
        GLOBAL.get_or_init(LineRegistry::new).clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u8, String>> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn claim(self: &Arc<Self>, line: u8, owner: &str) -> ScanResult<LineClaim> {
        let mut claims = self.lock();
        if let Some(current) = claims.get(&line) {
            return Err(ScanError::LineConflict {
                line,
                owner: current.clone(),
            });
        }
        claims.insert(line, owner.to_string());
        Ok(LineClaim {
            registry: Arc::clone(self),
            line,
        })
    }

    /// Claims several lines at once; nothing stays claimed if any one fails.
    pub fn claim_all(self: &Arc<Self>, lines: &[u8], owner: &str) -> ScanResult<Vec<LineClaim>> {
        lines.iter().map(|&line| self.claim(line, owner)).collect()
    }

    pub fn owner(&self, line: u8) -> Option<String> {
        self.lock().get(&line).cloned()
    }

    pub fn claimed(&self) -> Vec<u8> {
        self.lock().keys().copied().collect()
    }

    fn release(&self, line: u8) {
        self.lock().remove(&line);
    }
}

/// Exclusive ownership of one line, released on drop.
#[derive(Debug)]
pub struct LineClaim {
    registry: Arc<LineRegistry>,
    line: u8,
}

impl LineClaim {
    pub fn line(&self) -> u8 {
        self.line
    }
}

impl Drop for LineClaim {
    fn drop(&mut self) {
        self.registry.release(self.line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_conflicts_until_release() {
        let registry = LineRegistry::new();
        let claim = registry.claim(12, "range sensor").unwrap();
        assert_eq!(claim.line(), 12);

        let err = registry.claim(12, "alert panel").unwrap_err();
        assert_eq!(
            err,
            ScanError::LineConflict {
                line: 12,
                owner: "range sensor".into()
            }
        );

        drop(claim);
        assert!(registry.claimed().is_empty());
        assert!(registry.claim(12, "alert panel").is_ok());
    }

    #[test]
    fn failed_group_claim_releases_partial_claims() {
        let registry = LineRegistry::new();
        let _held = registry.claim(3, "motors").unwrap();
        assert!(registry.claim_all(&[1, 2, 3], "sensor").is_err());
        assert_eq!(registry.claimed(), vec![3]);
    }
}
