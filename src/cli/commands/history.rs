//! `history`: show past transfers.

use std::path::Path;

use tokio::runtime::Runtime;

use super::open_history;
use crate::config::Config;
use crate::transfer::{HistoryStore, TransferRecord};

pub fn cmd_history(rt: &Runtime, config: &Config, db: Option<&Path>, limit: usize, json: bool) -> anyhow::Result<()> {
    rt.block_on(async {
        let history = open_history(config, db).await?;
        let records: Vec<TransferRecord> = history.list().await?.into_iter().take(limit).collect();

        if json {
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        if records.is_empty() {
            println!("No transfers recorded yet.");
            return Ok(());
        }

        println!("Transfer History");
        println!("================");
        for record in &records {
            println!("{}", format_record(record));
        }
        Ok(())
    })
}

fn format_record(record: &TransferRecord) -> String {
    let mut line = format!(
        "{}  {:<9}  '{}'  {} → {}  {}/{} tracks",
        record.timestamp.format("%Y-%m-%d %H:%M"),
        format!("{:?}", record.outcome),
        record.source_playlist.name,
        record.source_platform.display_name(),
        record.target_platform.display_name(),
        record.transferred_tracks,
        record.total_tracks,
    );
    if !record.unmatched.is_empty() {
        line.push_str(&format!(" ({} unmatched)", record.unmatched.len()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_record;

    #[test]
    fn test_format_record() {
        let record = mock_record(7);
        let line = format_record(&record);
        assert!(line.contains("Completed"));
        assert!(line.contains("'Road Trip'"));
        assert!(line.contains("7/7 tracks"));
    }
}
