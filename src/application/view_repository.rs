// Key-value persistence seam for saved views
use std::collections::BTreeMap;

/// Backing store for non-default views: one record per view id, value is the
/// serialized view. Swappable for a disk file, an embedded KV store or a
/// remote service without touching layout logic.
pub trait ViewRepository: Send {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()>;

    /// Returns whether a record was removed
    fn delete(&mut self, key: &str) -> anyhow::Result<bool>;

    fn keys(&self) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryViewRepository {
    records: BTreeMap<String, String>,
}

impl InMemoryViewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewRepository for InMemoryViewRepository {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        self.records.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<bool> {
        Ok(self.records.remove(key).is_some())
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.records.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_set_get_delete() {
        let mut repo = InMemoryViewRepository::new();
        repo.set("a", "[]".to_string()).unwrap();

        assert_eq!(repo.get("a").unwrap().as_deref(), Some("[]"));
        assert_eq!(repo.keys().unwrap(), vec!["a".to_string()]);
        assert!(repo.delete("a").unwrap());
        assert!(!repo.delete("a").unwrap());
        assert_eq!(repo.get("a").unwrap(), None);
    }
}
