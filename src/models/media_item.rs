use super::MediaKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Photo,
}

impl MediaKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" | "avif" | "heic" => Some(Self::Photo),
            "webm" | "mp4" | "mkv" | "avi" | "mov" | "m4v" => Some(Self::Video),
            "mp3" | "wav" | "ogg" | "m4a" | "aac" | "flac" | "opus" => Some(Self::Audio),
            _ => None,
        }
    }

    /// Guess the kind from the extension of an object-storage key.
    pub fn from_storage_key(storage_key: &str) -> Option<Self> {
        let name = storage_key.rsplit('/').next().unwrap_or(storage_key);
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Audio and video have a play/pause state in the viewer.
    pub fn is_playable(self) -> bool {
        matches!(self, Self::Audio | Self::Video)
    }
}

/// A catalog entry as handed over by the storage layer.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub storage_key: String,
    pub kind: MediaKind,
    pub title: Option<String>,
}

impl CatalogItem {
    pub fn new(storage_key: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            storage_key: storage_key.into(),
            kind,
            title: None,
        }
    }

    /// Build an item whose kind is inferred from the storage key, falling back
    /// to `Photo` for unknown extensions.
    pub fn from_storage_key(storage_key: impl Into<String>) -> Self {
        let storage_key = storage_key.into();
        let kind = MediaKind::from_storage_key(&storage_key).unwrap_or(MediaKind::Photo);
        Self::new(storage_key, kind)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn media_key(&self, base: &str) -> MediaKey {
        MediaKey::resolve(base, &self.storage_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("JPG"), Some(MediaKind::Photo));
        assert_eq!(MediaKind::from_extension("mp4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("m4a"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_extension("txt"), None);
    }

    #[test]
    fn test_kind_from_storage_key() {
        assert_eq!(
            MediaKind::from_storage_key("uploads/2024/clip.final.webm"),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaKind::from_storage_key("uploads/v1.2/noext"), None);
        assert!(MediaKind::Audio.is_playable());
        assert!(!MediaKind::Photo.is_playable());
    }

    #[test]
    fn test_catalog_items_sharing_storage_key_share_media_key() {
        let a = CatalogItem::from_storage_key("photos/cat.png").with_title("Cat");
        let b = CatalogItem::from_storage_key("photos/cat.png").with_title("Also cat");

        assert_eq!(a.kind, MediaKind::Photo);
        assert_eq!(
            a.media_key("https://cdn.test/"),
            b.media_key("https://cdn.test/")
        );
    }
}
