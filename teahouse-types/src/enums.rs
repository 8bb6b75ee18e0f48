use serde::{Deserialize, Serialize};

/// Feed ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedFilter {
    #[default]
    Recency,
    Trending,
}

impl FeedFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedFilter::Recency => "recency",
            FeedFilter::Trending => "trending",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeedFilter::Recency => "All",
            FeedFilter::Trending => "Trending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "recency" | "all" => Some(FeedFilter::Recency),
            "trending" | "trend" => Some(FeedFilter::Trending),
            _ => None,
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            FeedFilter::Recency => FeedFilter::Trending,
            FeedFilter::Trending => FeedFilter::Recency,
        }
    }
}

/// Object storage buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bucket {
    PostImages,
    ProfileImages,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::PostImages => "tea-moments",
            Bucket::ProfileImages => "avatars",
        }
    }
}

/// Replaceable profile images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSlot {
    Avatar,
    Cover,
}

impl ImageSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSlot::Avatar => "avatar",
            ImageSlot::Cover => "cover",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            ImageSlot::Avatar => ImageSlot::Cover,
            ImageSlot::Cover => ImageSlot::Avatar,
        }
    }
}

/// Cosmetic badge derived from a commenter's position in a thread.
/// Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Mayor,
    Regular,
    Member,
}

impl Rank {
    /// First comment gets the top rank, the next four the middle one.
    pub fn for_position(index: usize) -> Self {
        match index {
            0 => Rank::Mayor,
            1..=4 => Rank::Regular,
            _ => Rank::Member,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rank::Mayor => "Café Mayor",
            Rank::Regular => "Regular",
            Rank::Member => "Active Member",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_boundaries() {
        assert_eq!(Rank::for_position(0), Rank::Mayor);
        assert_eq!(Rank::for_position(1), Rank::Regular);
        assert_eq!(Rank::for_position(4), Rank::Regular);
        assert_eq!(Rank::for_position(5), Rank::Member);
        assert_eq!(Rank::for_position(250), Rank::Member);
    }

    #[test]
    fn test_feed_filter_parse_and_toggle() {
        assert_eq!(FeedFilter::parse("Trending"), Some(FeedFilter::Trending));
        assert_eq!(FeedFilter::parse("all"), Some(FeedFilter::Recency));
        assert_eq!(FeedFilter::parse("controversial"), None);
        assert_eq!(FeedFilter::Recency.toggle(), FeedFilter::Trending);
        assert_eq!(FeedFilter::default(), FeedFilter::Recency);
    }

    #[test]
    fn test_bucket_names() {
        assert_eq!(Bucket::PostImages.as_str(), "tea-moments");
        assert_eq!(Bucket::ProfileImages.as_str(), "avatars");
    }
}
