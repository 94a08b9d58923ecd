//! Builds the announcement post published to the main channel after a
//! successful upload.

use crate::session::meta::{MetaField, MetaMap};

const SYNOPSIS_LIMIT: usize = 100;

/// Assembles post bodies from session metadata.
#[derive(Debug, Clone)]
pub struct PostBuilder {
    /// Truncate synopses longer than 100 characters.
    pub short_synopsis: bool,
}

impl PostBuilder {
    pub fn new(short_synopsis: bool) -> Self {
        Self { short_synopsis }
    }

    /// Render the post body. Empty optional fields are omitted together with
    /// their bullet line; the synopsis block keeps one blank line above it.
    pub fn build(&self, meta: &MetaMap) -> String {
        let get = |f: MetaField| meta.get(&f).map(String::as_str).unwrap_or("");

        let title = get(MetaField::Title);
        if title.is_empty() {
            return "☗   Upload Complete".to_string();
        }

        let mut parts = vec![format!("☗   {title}\n")];

        let rating = get(MetaField::Rating);
        let episode = get(MetaField::Episode);
        let genres = get(MetaField::Genres);
        if !rating.is_empty() {
            parts.push(format!("⦿   Ratings: {rating}"));
        }
        if !episode.is_empty() {
            parts.push(format!("⦿   Episode: {episode}"));
        }
        if !genres.is_empty() {
            parts.push(format!("⦿   Genres: {genres}"));
        }

        let description = meta
            .get(&MetaField::Description)
            .or_else(|| meta.get(&MetaField::Synopsis))
            .map(String::as_str)
            .unwrap_or("");
        if !description.is_empty() {
            parts.push(String::new());
            parts.push(format!("◆   Synopsis: {}", self.clip(description)));
        }

        parts.join("\n")
    }

    /// Cover image URL for the post, when one was supplied and looks usable.
    pub fn cover_url<'a>(&self, meta: &'a MetaMap) -> Option<&'a str> {
        meta.get(&MetaField::CoverUrl)
            .map(String::as_str)
            .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
    }

    fn clip(&self, text: &str) -> String {
        if !self.short_synopsis || text.chars().count() <= SYNOPSIS_LIMIT {
            return text.to_string();
        }
        let head: String = text.chars().take(SYNOPSIS_LIMIT - 3).collect();
        format!("{head}...")
    }
}
