use std::collections::BTreeMap;

use crate::error::PipelineError;

/// Recognized metadata keys for the URL-ingest path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetaField {
    Title,
    Description,
    Rating,
    Episode,
    Genres,
    CoverUrl,
    DdlUrl,
    Quality,
    Status,
    Size,
    Synopsis,
}

pub type MetaMap = BTreeMap<MetaField, String>;

impl MetaField {
    pub const ALL: [MetaField; 11] = [
        MetaField::Title,
        MetaField::Description,
        MetaField::Rating,
        MetaField::Episode,
        MetaField::Genres,
        MetaField::CoverUrl,
        MetaField::DdlUrl,
        MetaField::Quality,
        MetaField::Status,
        MetaField::Size,
        MetaField::Synopsis,
    ];

    /// Fields offered on the post-creation menu, in display order.
    pub const MENU: [MetaField; 9] = [
        MetaField::Title,
        MetaField::DdlUrl,
        MetaField::Rating,
        MetaField::Description,
        MetaField::Episode,
        MetaField::Genres,
        MetaField::CoverUrl,
        MetaField::Status,
        MetaField::Quality,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MetaField::Title => "title",
            MetaField::Description => "description",
            MetaField::Rating => "rating",
            MetaField::Episode => "episode",
            MetaField::Genres => "genres",
            MetaField::CoverUrl => "cover_url",
            MetaField::DdlUrl => "ddl_url",
            MetaField::Quality => "quality",
            MetaField::Status => "status",
            MetaField::Size => "size",
            MetaField::Synopsis => "synopsis",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        MetaField::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            MetaField::Title => "Title (Required)",
            MetaField::Description => "Description",
            MetaField::Rating => "Rating (0-100)",
            MetaField::Episode => "Episode Number",
            MetaField::Genres => "Genres",
            MetaField::CoverUrl => "Cover URL",
            MetaField::DdlUrl => "Direct Download Link (Required)",
            MetaField::Quality => "Quality",
            MetaField::Status => "Status",
            MetaField::Size => "Size",
            MetaField::Synopsis => "Synopsis",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            MetaField::Title => "Please send the title for the post:",
            MetaField::Description => "Please send the description/synopsis:",
            MetaField::Rating => "Please send the rating (0-100):",
            MetaField::Episode => "Please send the episode number:",
            MetaField::Genres => "Please send the genres (comma-separated):",
            MetaField::CoverUrl => "Please send the cover image URL:",
            MetaField::DdlUrl => "Please send the direct download link:",
            MetaField::Quality => "Please send the quality (e.g. 720p):",
            MetaField::Status => "Please send the status (e.g. Airing):",
            MetaField::Size => "Please send the size (e.g. 84.9 MB):",
            MetaField::Synopsis => "Please send the synopsis:",
        }
    }
}

/// Field-format validation. Rating must be an integer in 0..=100, episode
/// must be all digits, link fields must be http(s) URLs.
pub fn validate(field: MetaField, value: &str) -> Result<(), PipelineError> {
    match field {
        MetaField::Rating => {
            let ok = value
                .parse::<i64>()
                .map(|r| (0..=100).contains(&r))
                .unwrap_or(false);
            if !ok {
                return Err(PipelineError::Validation {
                    field: "rating",
                    reason: "must be an integer between 0 and 100".into(),
                });
            }
        }
        MetaField::Episode => {
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PipelineError::Validation {
                    field: "episode",
                    reason: "must be a number".into(),
                });
            }
        }
        MetaField::DdlUrl | MetaField::CoverUrl => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(PipelineError::Validation {
                    field: field.key(),
                    reason: "must be an http(s) URL".into(),
                });
            }
        }
        _ => {}
    }
    Ok(())
}

/// Fields that must be present before `create_post` is accepted.
pub fn missing_required(meta: &MetaMap) -> Vec<MetaField> {
    [MetaField::Title, MetaField::DdlUrl]
        .into_iter()
        .filter(|f| !meta.contains_key(f))
        .collect()
}
