//! Thin RSS adapter: fetch the configured feed over HTTP and lift its items
//! into `FeedEntry` records. The core only ever sees the `FeedSource` trait.

use async_trait::async_trait;
use regex::Regex;

use submux_core::feed::{FeedEntry, FeedError, FeedSource};

pub struct HttpFeedSource {
    http: reqwest::Client,
    url: String,
    item_re: Regex,
    title_re: Regex,
    link_re: Regex,
    guid_re: Regex,
    thumb_re: Regex,
}

impl HttpFeedSource {
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            item_re: Regex::new(r"(?s)<item>(.*?)</item>").unwrap(),
            title_re: Regex::new(r"(?s)<title>(.*?)</title>").unwrap(),
            link_re: Regex::new(r"(?s)<link>(.*?)</link>").unwrap(),
            guid_re: Regex::new(r"(?s)<guid[^>]*>(.*?)</guid>").unwrap(),
            thumb_re: Regex::new(r#"<(?:media:thumbnail|enclosure)[^>]*url="([^"]+)""#).unwrap(),
        }
    }

    fn parse_item(&self, body: &str) -> Option<FeedEntry> {
        let title = self
            .title_re
            .captures(body)
            .map(|c| strip_cdata(&c[1]))
            .filter(|t| !t.is_empty())?;
        let link = self
            .link_re
            .captures(body)
            .map(|c| strip_cdata(&c[1]))
            .filter(|l| !l.is_empty())?;
        let id = self
            .guid_re
            .captures(body)
            .map(|c| strip_cdata(&c[1]))
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| link.clone());
        let thumbnail = self.thumb_re.captures(body).map(|c| c[1].to_string());

        Some(FeedEntry {
            id,
            title,
            link,
            thumbnail,
        })
    }
}

fn strip_cdata(text: &str) -> String {
    text.trim()
        .trim_start_matches("<![CDATA[")
        .trim_end_matches("]]>")
        .trim()
        .to_string()
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Vec<FeedEntry>, FeedError> {
        let body = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FeedError::Fetch(e.to_string()))?
            .text()
            .await
            .map_err(|e| FeedError::Fetch(e.to_string()))?;

        Ok(self
            .item_re
            .captures_iter(&body)
            .filter_map(|c| self.parse_item(&c[1]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_parse_with_guid_and_thumbnail() {
        let source = HttpFeedSource::new("http://unused".into());
        let body = r#"
            <item>
              <title><![CDATA[Episode 5]]></title>
              <link>https://example.com/e5</link>
              <guid isPermaLink="false">ep-5</guid>
              <media:thumbnail url="https://example.com/e5.jpg"/>
            </item>
        "#;
        let entry = source.parse_item(body).unwrap();
        assert_eq!(entry.title, "Episode 5");
        assert_eq!(entry.id, "ep-5");
        assert_eq!(entry.thumbnail.as_deref(), Some("https://example.com/e5.jpg"));
    }

    #[test]
    fn guid_falls_back_to_link() {
        let source = HttpFeedSource::new("http://unused".into());
        let entry = source
            .parse_item("<title>t</title><link>https://x/1</link>")
            .unwrap();
        assert_eq!(entry.id, "https://x/1");
        assert!(entry.thumbnail.is_none());
    }

    #[test]
    fn items_without_title_or_link_are_dropped() {
        let source = HttpFeedSource::new("http://unused".into());
        assert!(source.parse_item("<link>https://x/1</link>").is_none());
        assert!(source.parse_item("<title>t</title>").is_none());
    }
}
