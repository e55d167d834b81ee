use std::fmt;

use chrono::{DateTime, Utc};

/// Origin of a scraped source record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceKind {
    /// Public-domain film archive item.
    #[cfg_attr(feature = "serde", serde(rename = "archive"))]
    Archive,
    /// Video-sharing channel upload.
    #[cfg_attr(feature = "serde", serde(rename = "youtube"))]
    VideoChannel,
}

impl SourceKind {
    /// Prefix used when deriving provisional keys.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            SourceKind::Archive => "archive",
            SourceKind::VideoChannel => "youtube",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_prefix())
    }
}

/// `(type, sourceId)` identity of a source record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceRef {
    pub kind: SourceKind,
    pub source_id: String,
}

impl SourceRef {
    pub fn new(kind: SourceKind, source_id: impl Into<String>) -> Self {
        Self {
            kind,
            source_id: source_id.into(),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.source_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArchiveSource {
    pub source_id: String,
    pub url: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub title: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub description: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub year: Option<u16>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub collection: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub downloads: Option<u64>,
}

impl ArchiveSource {
    pub fn new(source_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            url: url.into(),
            title: None,
            description: None,
            year: None,
            collection: None,
            downloads: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoChannelSource {
    /// Platform video id.
    pub source_id: String,
    pub url: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub title: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub description: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub channel_id: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub channel_name: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub published_at: Option<DateTime<Utc>>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub duration_seconds: Option<u32>,
}

impl VideoChannelSource {
    pub fn new(source_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            url: url.into(),
            title: None,
            description: None,
            channel_id: None,
            channel_name: None,
            published_at: None,
            duration_seconds: None,
        }
    }
}

/// A scraped record backing a movie entity, tagged by `type`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum Source {
    #[cfg_attr(feature = "serde", serde(rename = "archive"))]
    Archive(ArchiveSource),
    #[cfg_attr(feature = "serde", serde(rename = "youtube"))]
    VideoChannel(VideoChannelSource),
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Archive(_) => SourceKind::Archive,
            Source::VideoChannel(_) => SourceKind::VideoChannel,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            Source::Archive(s) => &s.source_id,
            Source::VideoChannel(s) => &s.source_id,
        }
    }

    pub fn identity(&self) -> SourceRef {
        SourceRef::new(self.kind(), self.source_id())
    }

    pub fn url(&self) -> &str {
        match self {
            Source::Archive(s) => &s.url,
            Source::VideoChannel(s) => &s.url,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Source::Archive(s) => s.title.as_deref(),
            Source::VideoChannel(s) => s.title.as_deref(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Source::Archive(s) => s.description.as_deref(),
            Source::VideoChannel(s) => s.description.as_deref(),
        }
    }

    /// Release year carried by the source payload itself, if any.
    ///
    /// Upload dates are not release years, so video-channel sources never
    /// contribute one.
    pub fn year(&self) -> Option<u16> {
        match self {
            Source::Archive(s) => s.year,
            Source::VideoChannel(_) => None,
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn sources_serialize_with_type_tag() {
        let mut archive = ArchiveSource::new("night_of_the_living_dead", "u");
        archive.year = Some(1968);
        let json = serde_json::to_value(Source::Archive(archive)).unwrap();
        assert_eq!(json["type"], "archive");
        assert_eq!(json["year"], 1968);

        let video = VideoChannelSource::new("abc", "u");
        let json = serde_json::to_value(Source::VideoChannel(video)).unwrap();
        assert_eq!(json["type"], "youtube");
        assert!(json.get("channel_name").is_none());
    }

    #[test]
    fn sources_round_trip_from_scraper_documents() {
        let raw = r#"{"type":"youtube","source_id":"abc","url":"u","title":"His Girl Friday (1940)"}"#;
        let source: Source = serde_json::from_str(raw).unwrap();
        assert_eq!(source.kind(), SourceKind::VideoChannel);
        assert_eq!(source.title(), Some("His Girl Friday (1940)"));
        assert_eq!(source.identity().to_string(), "youtube:abc");
    }
}
