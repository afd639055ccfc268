//! Snapshots of locally parsed statements.
//!
//! Each `recon parse` run writes the `IngestionResult` it produced to
//! `$RECON_HOME/.parsed/{kind}.YYYY-MM-DD-NNN.json`, keeping a bounded number of copies per kind.

use crate::ingest::FileKind;
use crate::model::IngestionResult;
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSION: &str = "json";

/// Saves and rotates parse snapshots.
///
/// Create a new instance via `Config::snapshots()` or `Snapshots::new()`.
#[derive(Debug, Clone)]
pub struct Snapshots {
    dir: PathBuf,
    copies: u32,
}

impl Snapshots {
    pub fn new(config: &Config) -> Self {
        Self {
            dir: config.snapshots_dir().to_path_buf(),
            copies: config.snapshot_copies(),
        }
    }

    /// Saves `result` as a pretty-printed JSON file and rotates old snapshots of the same kind.
    ///
    /// Returns the path to the created file.
    pub async fn save(&self, kind: FileKind, result: &IngestionResult) -> Result<PathBuf> {
        let prefix = kind.to_string();
        let date = today();
        let seq = self.next_sequence_number(&prefix, &date).await?;
        let path = self.dir.join(format!("{prefix}.{date}-{seq:03}.{EXTENSION}"));

        let json = serde_json::to_string_pretty(result)
            .context("Failed to serialize the parse result to JSON")?;
        utils::write(&path, json).await?;
        debug!("Saved snapshot {}", path.display());

        self.rotate(kind).await?;
        Ok(path)
    }

    /// Snapshot files of `kind`, oldest first.
    pub async fn list(&self, kind: FileKind) -> Result<Vec<PathBuf>> {
        let prefix = kind.to_string();
        let mut files: Vec<(PathBuf, (String, u32))> = Vec::new();

        let mut dir = utils::read_dir(&self.dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name();
            if let Some(key) = snapshot_key(&name.to_string_lossy(), &prefix) {
                files.push((entry.path(), key));
            }
        }

        files.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(files.into_iter().map(|(path, _)| path).collect())
    }

    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Result<u32> {
        let mut max_seq: u32 = 0;
        let mut dir = utils::read_dir(&self.dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name();
            if let Some(seq) = parse_sequence_number(&name.to_string_lossy(), prefix, date) {
                max_seq = max_seq.max(seq);
            }
        }
        Ok(max_seq + 1)
    }

    /// Deletes the oldest snapshots of `kind` beyond `copies`.
    async fn rotate(&self, kind: FileKind) -> Result<()> {
        let files = self.list(kind).await?;
        let to_delete = files.len().saturating_sub(self.copies as usize);
        for path in files.iter().take(to_delete) {
            remove_snapshot(path).await?;
        }
        Ok(())
    }
}

async fn remove_snapshot(path: &Path) -> Result<()> {
    debug!("Removing old snapshot {}", path.display());
    utils::remove(path).await
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses NNN out of `{prefix}.{date}-NNN.json`.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    filename
        .strip_prefix(&format!("{prefix}.{date}-"))?
        .strip_suffix(&format!(".{EXTENSION}"))?
        .parse()
        .ok()
}

/// The (date, sequence number) of a `{prefix}.{date}-NNN.json` file name.
fn snapshot_key(filename: &str, prefix: &str) -> Option<(String, u32)> {
    let (date, seq) = filename
        .strip_prefix(&format!("{prefix}."))?
        .strip_suffix(&format!(".{EXTENSION}"))?
        .rsplit_once('-')?;
    Some((date.to_string(), seq.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_statement;
    use crate::test::TestEnv;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("bank.2026-01-14-001.json", "bank", "2026-01-14"),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number("bank.2026-01-14-042.json", "bank", "2026-01-14"),
            Some(42)
        );
        assert_eq!(
            parse_sequence_number("accounting.2026-01-14-001.json", "bank", "2026-01-14"),
            None
        );
        assert_eq!(
            parse_sequence_number("bank.2026-01-13-001.json", "bank", "2026-01-14"),
            None
        );
        assert_eq!(
            parse_sequence_number("bank.2026-01-14-001.csv", "bank", "2026-01-14"),
            None
        );
    }

    #[test]
    fn test_snapshot_key() {
        assert_eq!(
            snapshot_key("bank.2026-01-14-001.json", "bank"),
            Some(("2026-01-14".to_string(), 1))
        );
        assert_eq!(
            snapshot_key("accounting.2026-01-14-1000.json", "accounting"),
            Some(("2026-01-14".to_string(), 1000))
        );
        assert_eq!(snapshot_key("bank.2026-01-14-001.json", "accounting"), None);
        assert_eq!(snapshot_key("bank.2026-01-14-001", "bank"), None);
        assert_eq!(snapshot_key("bank.2026-01-14-abc.json", "bank"), None);
    }

    #[tokio::test]
    async fn test_list_orders_by_sequence_number() {
        let env = TestEnv::new().await;
        let snapshots = env.config().snapshots();
        let dir = env.config().snapshots_dir().to_path_buf();
        for name in [
            "bank.2026-01-15-001.json",
            "bank.2026-01-14-1000.json",
            "bank.2026-01-14-999.json",
        ] {
            utils::write(dir.join(name), "{}").await.unwrap();
        }

        let names: Vec<String> = snapshots
            .list(FileKind::Bank)
            .await
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "bank.2026-01-14-999.json",
                "bank.2026-01-14-1000.json",
                "bank.2026-01-15-001.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_save_and_rotate() {
        let env = TestEnv::new().await;
        let snapshots = env.config().snapshots();
        let result = parse_statement("date;libelle;montant\n01/01/2024;A;-1\n").unwrap();

        let mut saved = Vec::new();
        for _ in 0..7 {
            saved.push(snapshots.save(FileKind::Bank, &result).await.unwrap());
        }
        snapshots.save(FileKind::Accounting, &result).await.unwrap();

        let kept = snapshots.list(FileKind::Bank).await.unwrap();
        assert_eq!(kept.len(), 5);
        assert_eq!(kept, saved[2..].to_vec());
        assert_eq!(snapshots.list(FileKind::Accounting).await.unwrap().len(), 1);

        let restored: IngestionResult = utils::deserialize(&kept[4]).await.unwrap();
        assert_eq!(restored, result);
    }
}
