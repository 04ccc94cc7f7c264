//! Fixed five-category file classification used by the `type` sort key.

use serde::{Deserialize, Serialize};

/// The five fixed categories, declared in their sort order. Tasks inside one
/// category are ordered by name, so the category rank is the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Video,
    Audio,
    Image,
    Document,
    Other,
}

const VIDEO: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts", "rmvb",
];
const AUDIO: &[&str] = &[
    "mp3", "flac", "wav", "aac", "ogg", "m4a", "wma", "ape", "opus", "mid",
];
const IMAGE: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "svg", "heic", "ico",
];
const DOCUMENT: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "md", "epub", "mobi", "rtf", "csv",
];

impl FileType {
    /// Classify a lowercased extension; anything unrecognized is `Other`.
    pub fn from_extension(ext: &str) -> Self {
        if VIDEO.contains(&ext) {
            FileType::Video
        } else if AUDIO.contains(&ext) {
            FileType::Audio
        } else if IMAGE.contains(&ext) {
            FileType::Image
        } else if DOCUMENT.contains(&ext) {
            FileType::Document
        } else {
            FileType::Other
        }
    }

    /// Section title shown for this category.
    pub fn label(self) -> &'static str {
        match self {
            FileType::Video => "Video",
            FileType::Audio => "Audio",
            FileType::Image => "Image",
            FileType::Document => "Document",
            FileType::Other => "Other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_classify() {
        assert_eq!(FileType::from_extension("mkv"), FileType::Video);
        assert_eq!(FileType::from_extension("flac"), FileType::Audio);
        assert_eq!(FileType::from_extension("png"), FileType::Image);
        assert_eq!(FileType::from_extension("pdf"), FileType::Document);
        assert_eq!(FileType::from_extension("iso"), FileType::Other);
        assert_eq!(FileType::from_extension(""), FileType::Other);
    }

    #[test]
    fn category_rank_matches_declaration_order() {
        assert!(FileType::Video < FileType::Audio);
        assert!(FileType::Audio < FileType::Image);
        assert!(FileType::Image < FileType::Document);
        assert!(FileType::Document < FileType::Other);
    }
}
