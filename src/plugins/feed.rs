//! RSS feed generation.
//!
//! Emits one syndication document from a configured collection. Output is
//! deterministic for identical inputs: entry timestamps come from content
//! metadata, never the clock. The only time-varying field is the channel
//! `lastBuildDate`, which uses the build timestamp.

use crate::config::SiteConfig;
use crate::content::ContentItem;
use crate::plugins::{Phase, Plugin, PluginContext};
use crate::{artifact::OutputArtifact, log};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rss::validation::Validate;
use rss::{ChannelBuilder, GuidBuilder, Item, ItemBuilder};

/// Feed plugin. Runs post-render and contributes one output artifact.
pub struct FeedPlugin;

impl Plugin for FeedPlugin {
    fn name(&self) -> &str {
        "feed"
    }

    fn phases(&self) -> &[Phase] {
        &[Phase::PostRender]
    }

    fn reads(&self) -> &[&str] {
        &["site"]
    }

    fn run(&self, _phase: Phase, ctx: &mut PluginContext) -> Result<()> {
        let config = ctx.config;
        if !config.feed.enable {
            return Ok(());
        }

        let collection = ctx
            .collections
            .get(&config.feed.collection)
            .ok_or_else(|| anyhow!("feed collection `{}` not built", config.feed.collection))?;

        let entries: Vec<&ContentItem> = collection.iter(ctx.items).collect();
        let xml = build_feed(&entries, config, Utc::now())?;

        ctx.artifacts.push(OutputArtifact::new(
            config.feed.path.clone(),
            xml.into_bytes(),
        ));
        log!("feed"; "{} ({} entries)", config.feed.path.display(), feed_len(&entries, config));
        Ok(())
    }
}

fn feed_len(entries: &[&ContentItem], config: &SiteConfig) -> usize {
    match config.feed.limit {
        0 => entries.len(),
        limit => entries.len().min(limit),
    }
}

/// Build the feed document for a collection's items, in collection order.
///
/// `build_time` is threaded in rather than read from the clock so callers
/// (and tests) control the single non-deterministic field.
pub fn build_feed(
    entries: &[&ContentItem],
    config: &SiteConfig,
    build_time: DateTime<Utc>,
) -> Result<String> {
    let limited: &[&ContentItem] = match config.feed.limit {
        0 => entries,
        limit => &entries[..entries.len().min(limit)],
    };

    let items: Vec<Item> = limited
        .iter()
        .filter_map(|item| entry_to_item(item, config))
        .collect();

    let channel = ChannelBuilder::default()
        .title(config.site.title.clone())
        .link(config.base_url().to_string())
        .description(config.site.description.clone())
        .language(Some(config.site.language.clone()))
        .generator(Some("kiln".to_string()))
        .last_build_date(Some(build_time.to_rfc2822()))
        .items(items)
        .build();

    channel
        .validate()
        .map_err(|e| anyhow!("feed validation failed: {e}"))?;
    Ok(channel.to_string())
}

/// Convert one content item to a feed entry.
/// Items missing a title or publish date are skipped.
fn entry_to_item(item: &ContentItem, config: &SiteConfig) -> Option<Item> {
    let title = item.title()?;
    let date = item.date()?;
    let link = format!("{}{}", config.base_url(), item.url_path);
    let description = item
        .summary()
        .map(String::from)
        .unwrap_or_else(|| item.body_html());

    Some(
        ItemBuilder::default()
            .title(Some(title.to_string()))
            .link(Some(link.clone()))
            .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
            .description(Some(description))
            .pub_date(Some(date.to_rfc2822()))
            .author(author_field(config))
            .build(),
    )
}

/// RSS author format: `email@example.com (Name)`, when both are set.
fn author_field(config: &SiteConfig) -> Option<String> {
    if config.site.email.is_empty() || config.site.author.is_empty() {
        return None;
    }
    Some(format!("{} ({})", config.site.email, config.site.author))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn config(limit: usize) -> SiteConfig {
        let mut config = SiteConfig::from_str(
            r#"
            [site]
            title = "Example"
            description = "An example site"
            base_url = "https://example.com"
            author = "Author"
            email = "author@example.com"
            "#,
        )
        .unwrap();
        config.feed.enable = true;
        config.feed.limit = limit;
        config
    }

    fn post(relative: &str, title: &str, date: &str) -> ContentItem {
        ContentItem {
            source: PathBuf::from(format!("content/{relative}.md")),
            relative: relative.to_string(),
            url_path: format!("/{relative}/"),
            output: PathBuf::from(format!("{relative}/index.html")),
            template: "page.html".to_string(),
            meta: toml::from_str(&format!(
                "title = \"{title}\"\ndate = \"{date}\"\ntags = [\"post\"]\nsummary = \"s\""
            ))
            .unwrap(),
            body: String::new(),
        }
    }

    fn build_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_entries_in_collection_order() {
        let b = post("posts/b", "B", "2024-02-01");
        let a = post("posts/a", "A", "2024-01-01");
        let xml = build_feed(&[&b, &a], &config(0), build_time()).unwrap();

        let b_pos = xml.find("<title>B</title>").unwrap();
        let a_pos = xml.find("<title>A</title>").unwrap();
        assert!(b_pos < a_pos);
        assert!(xml.contains("https://example.com/posts/a/"));
    }

    #[test]
    fn test_limit_zero_is_unlimited() {
        let a = post("posts/a", "A", "2024-01-01");
        let b = post("posts/b", "B", "2024-02-01");
        let xml = build_feed(&[&a, &b], &config(0), build_time()).unwrap();
        assert!(xml.contains("<title>A</title>"));
        assert!(xml.contains("<title>B</title>"));
    }

    #[test]
    fn test_limit_truncates_collection_order() {
        // Collection sorted newest-first; limit=1 keeps the most recent
        let b = post("posts/b", "B", "2024-02-01");
        let a = post("posts/a", "A", "2024-01-01");
        let xml = build_feed(&[&b, &a], &config(1), build_time()).unwrap();
        assert!(xml.contains("<title>B</title>"));
        assert!(!xml.contains("<title>A</title>"));
    }

    #[test]
    fn test_deterministic_given_same_inputs() {
        let a = post("posts/a", "A", "2024-01-01");
        let b = post("posts/b", "B", "2024-02-01");
        let first = build_feed(&[&a, &b], &config(0), build_time()).unwrap();
        let second = build_feed(&[&a, &b], &config(0), build_time()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_pub_date_from_metadata_not_clock() {
        let a = post("posts/a", "A", "2024-01-01");
        let xml = build_feed(&[&a], &config(0), build_time()).unwrap();
        // RFC 2822 day-of-month is not zero-padded
        assert!(xml.contains("1 Jan 2024"));
    }

    #[test]
    fn test_items_without_date_skipped() {
        let mut a = post("posts/a", "A", "2024-01-01");
        a.meta.remove("date");
        let b = post("posts/b", "B", "2024-02-01");
        let xml = build_feed(&[&a, &b], &config(0), build_time()).unwrap();
        assert!(!xml.contains("<title>A</title>"));
        assert!(xml.contains("<title>B</title>"));
    }

    #[test]
    fn test_author_field_format() {
        assert_eq!(
            author_field(&config(0)).unwrap(),
            "author@example.com (Author)"
        );
    }
}
