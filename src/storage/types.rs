//! Storage types

/// The two renditions kept for every page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Thumbnail,
}

impl MediaKind {
    /// Top-level directory under the media root
    pub fn dir_name(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Thumbnail => "thumbnails",
        }
    }

    /// Path segment used by the serving routes
    pub fn route_segment(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Thumbnail => "thumbnail",
        }
    }
}

/// Ordered output paths for one document, one entry per page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagePaths {
    pub image_paths: Vec<String>,
    pub thumbnail_paths: Vec<String>,
}

impl PagePaths {
    pub fn with_capacity(pages: usize) -> Self {
        Self {
            image_paths: Vec::with_capacity(pages),
            thumbnail_paths: Vec::with_capacity(pages),
        }
    }

    pub fn push(&mut self, image_path: String, thumbnail_path: String) {
        self.image_paths.push(image_path);
        self.thumbnail_paths.push(thumbnail_path);
    }

    /// True when both sequences hold exactly `page_count` entries
    pub fn matches(&self, page_count: usize) -> bool {
        self.image_paths.len() == page_count && self.thumbnail_paths.len() == page_count
    }
}
