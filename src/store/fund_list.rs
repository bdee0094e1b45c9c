use crate::core::fund::{FundCode, FundEntry, FundError};
use anyhow::Context;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Invalid(#[from] FundError),
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Entries as found on disk. Early versions stored a bare list of codes.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredFund {
    Entry(FundEntry),
    Legacy(String),
}

/// The user's fund list, persisted as one pretty-printed JSON array.
///
/// Every operation reads the file, and every mutation rewrites it in full.
/// Operations are serialized through an async mutex so concurrent requests
/// cannot lose each other's updates.
pub struct FundListStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FundListStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn list(&self) -> Result<Vec<FundEntry>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    pub async fn add(&self, raw_code: &str) -> Result<FundCode> {
        let code = FundCode::parse(raw_code)?;
        let _guard = self.lock.lock().await;
        let mut funds = self.load().await?;
        if funds.iter().any(|f| f.code == code) {
            return Err(FundError::Duplicate(code.to_string()).into());
        }
        funds.push(FundEntry::new(code.clone()));
        self.save(&funds).await?;
        info!("Added fund {}", code);
        Ok(code)
    }

    pub async fn remove(&self, raw_code: &str) -> Result<()> {
        let code = FundCode::parse(raw_code)?;
        let _guard = self.lock.lock().await;
        let mut funds = self.load().await?;
        let before = funds.len();
        funds.retain(|f| f.code != code);
        if funds.len() == before {
            return Err(FundError::NotFound(code.to_string()).into());
        }
        self.save(&funds).await?;
        info!("Removed fund {}", code);
        Ok(())
    }

    /// Sets or clears the shares held of a fund.
    pub async fn set_shares(&self, raw_code: &str, shares: Option<f64>) -> Result<FundEntry> {
        let code = FundCode::parse(raw_code)?;
        if let Some(value) = shares
            && (!value.is_finite() || value < 0.0)
        {
            return Err(FundError::InvalidShares(value.to_string()).into());
        }

        let _guard = self.lock.lock().await;
        let mut funds = self.load().await?;
        let entry = funds
            .iter_mut()
            .find(|f| f.code == code)
            .ok_or_else(|| FundError::NotFound(code.to_string()))?;
        entry.shares = shares;
        let updated = entry.clone();
        self.save(&funds).await?;
        debug!("Updated shares of fund {} to {:?}", code, shares);
        Ok(updated)
    }

    /// Replaces the list with `codes` in the given order. Shares follow their
    /// code; codes missing from `codes` are dropped from the list.
    pub async fn reorder(&self, codes: &[String]) -> Result<Vec<FundEntry>> {
        let codes = codes
            .iter()
            .map(|c| FundCode::parse(c))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut seen = HashSet::new();
        if let Some(dup) = codes.iter().find(|c| !seen.insert(*c)) {
            return Err(FundError::DuplicateInOrder(dup.to_string()).into());
        }

        let _guard = self.lock.lock().await;
        let funds = self.load().await?;
        let shares: HashMap<&FundCode, Option<f64>> =
            funds.iter().map(|f| (&f.code, f.shares)).collect();
        let dropped = funds.iter().filter(|f| !seen.contains(&f.code)).count();

        let reordered: Vec<FundEntry> = codes
            .iter()
            .map(|code| FundEntry {
                code: code.clone(),
                shares: shares.get(code).copied().flatten(),
            })
            .collect();
        self.save(&reordered).await?;
        if dropped > 0 {
            info!("Reorder dropped {} fund(s) missing from the new order", dropped);
        }
        Ok(reordered)
    }

    async fn load(&self) -> Result<Vec<FundEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No fund list at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(anyhow::Error::from(e)
                    .context(format!("Failed to read fund list: {}", self.path.display()))
                    .into());
            }
        };

        let stored: Vec<StoredFund> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fund list: {}", self.path.display()))?;

        let funds = stored
            .into_iter()
            .filter_map(|fund| match fund {
                StoredFund::Entry(entry) => Some(entry),
                StoredFund::Legacy(raw) => match FundCode::parse(&raw) {
                    Ok(code) => Some(FundEntry::new(code)),
                    Err(e) => {
                        warn!("Skipping legacy entry: {}", e);
                        None
                    }
                },
            })
            .collect();
        Ok(funds)
    }

    async fn save(&self, funds: &[FundEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(funds).context("Failed to serialize fund list")?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write fund list: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> FundListStore {
        FundListStore::new(dir.path().join("data").join("funds.json"))
    }

    fn codes(funds: &[FundEntry]) -> Vec<&str> {
        funds.iter().map(|f| f.code.as_str()).collect()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.add("000001").await.unwrap();
        store.add("161725").await.unwrap();

        let funds = store.list().await.unwrap();
        assert_eq!(codes(&funds), vec!["000001", "161725"]);
        assert!(funds.iter().all(|f| f.shares.is_none()));

        let on_disk = std::fs::read_to_string(store.path()).unwrap();
        assert!(on_disk.contains("\n  {\n    \"code\": \"000001\""));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_and_duplicate_codes() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.add("000001").await.unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        for bad in ["00001", "abcdef", "0000011", " 000002", "000002 "] {
            let err = store.add(bad).await.unwrap_err();
            assert!(matches!(err, StoreError::Invalid(FundError::InvalidCode(_))));
        }
        let err = store.add("000001").await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(FundError::Duplicate(_))));

        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.add("000001").await.unwrap();
        store.add("000002").await.unwrap();

        store.remove("000001").await.unwrap();
        assert_eq!(codes(&store.list().await.unwrap()), vec!["000002"]);

        let err = store.remove("000001").await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(FundError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_shares() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.add("000001").await.unwrap();

        let entry = store.set_shares("000001", Some(1234.56)).await.unwrap();
        assert_eq!(entry.shares, Some(1234.56));
        assert_eq!(store.list().await.unwrap()[0].shares, Some(1234.56));

        store.set_shares("000001", None).await.unwrap();
        assert_eq!(store.list().await.unwrap()[0].shares, None);
    }

    #[tokio::test]
    async fn test_set_shares_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.add("000001").await.unwrap();
        store.set_shares("000001", Some(10.0)).await.unwrap();

        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let err = store.set_shares("000001", Some(bad)).await.unwrap_err();
            assert!(matches!(err, StoreError::Invalid(FundError::InvalidShares(_))));
        }
        assert_eq!(store.list().await.unwrap()[0].shares, Some(10.0));

        let err = store.set_shares("999999", Some(1.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(FundError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reorder_keeps_shares_and_drops_omitted() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        for code in ["000001", "000002", "000003"] {
            store.add(code).await.unwrap();
        }
        store.set_shares("000002", Some(50.0)).await.unwrap();

        let order = vec!["000002".to_string(), "000001".to_string()];
        store.reorder(&order).await.unwrap();

        let funds = store.list().await.unwrap();
        assert_eq!(codes(&funds), vec!["000002", "000001"]);
        assert_eq!(funds[0].shares, Some(50.0));
        assert_eq!(funds[1].shares, None);
    }

    #[tokio::test]
    async fn test_reorder_rejects_invalid_payloads() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.add("000001").await.unwrap();

        let malformed = vec!["000001".to_string(), "12345".to_string()];
        let err = store.reorder(&malformed).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(FundError::InvalidCode(_))));

        let duplicated = vec!["000001".to_string(), "000001".to_string()];
        let err = store.reorder(&duplicated).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Invalid(FundError::DuplicateInOrder(_))
        ));

        assert_eq!(codes(&store.list().await.unwrap()), vec!["000001"]);
    }

    #[tokio::test]
    async fn test_legacy_format_is_upgraded() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"["000001","000002"]"#).unwrap();

        let funds = store.list().await.unwrap();
        assert_eq!(codes(&funds), vec!["000001", "000002"]);
        assert!(funds.iter().all(|f| f.shares.is_none()));

        // Nothing is rewritten until the next mutation
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            r#"["000001","000002"]"#
        );

        store.set_shares("000002", Some(3.0)).await.unwrap();
        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(
            on_disk,
            serde_json::json!([
                {"code": "000001", "shares": null},
                {"code": "000002", "shares": 3.0}
            ])
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(err.to_string().starts_with("Failed to parse fund list"));
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(store(&dir));

        let handles: Vec<_> = (1..=20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.add(&format!("{i:06}")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 20);
    }
}
