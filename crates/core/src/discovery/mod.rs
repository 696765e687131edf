//! Discovery collaborator: newest item per source and per-item metadata.
//!
//! Sources are polled through ordered tiers. The primary tier lists the
//! source with yt-dlp; the secondary tier derives the channel id from an
//! uploads playlist id and reads the channel's Atom feed.

mod error;
mod feed;
mod tiered;
mod traits;
mod types;
mod ytdlp;

pub use error::DiscoveryError;
pub use feed::{channel_id_for_source, parse_feed, playlist_id, FeedLister};
pub use tiered::TieredDiscovery;
pub use traits::Discovery;
pub use types::{watch_url, ItemDetails, ListingEntry, LiveStatus};
pub use ytdlp::YtDlpLister;
