//! `assistant-bridge threads list`.

use ab_domain::config::Config;
use ab_threads::{ChannelMapping, MappingStore};

use crate::bootstrap;

/// Print stored mappings, oldest first. Needs no API access.
pub fn list(config: &Config, json_output: bool) -> anyhow::Result<()> {
    let store = bootstrap::open_mappings(config)?;
    let mappings = store.list();

    if json_output {
        let json = serde_json::to_string_pretty(&mappings)
            .map_err(|e| anyhow::anyhow!("serializing mappings: {e}"))?;
        println!("{json}");
    } else {
        print!("{}", render_table(&mappings));
        eprintln!("{} channel(s) in {}", mappings.len(), store.path().display());
    }
    Ok(())
}

fn render_table(mappings: &[ChannelMapping]) -> String {
    let width = mappings
        .iter()
        .map(|m| m.channel_id.chars().count())
        .max()
        .unwrap_or(0)
        .max("CHANNEL".len());

    let mut out = format!("{:<width$}  {:<32}  CREATED\n", "CHANNEL", "THREAD");
    for m in mappings {
        out.push_str(&format!(
            "{:<width$}  {:<32}  {}\n",
            m.channel_id,
            m.thread_id,
            m.created_at.format("%Y-%m-%d %H:%M:%S"),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_aligns_channel_column() {
        let rows = [
            ChannelMapping::new("telegram:123456789", "thread_abc"),
            ChannelMapping::new("cli", "thread_def"),
        ];
        let table = render_table(&rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("CHANNEL "));
        let thread_col = lines[1].find("thread_abc").unwrap();
        assert_eq!(lines[2].find("thread_def"), Some(thread_col));
    }

    #[test]
    fn empty_store_prints_header_only() {
        assert_eq!(render_table(&[]).lines().count(), 1);
    }
}
