//! The MTP authoring sequencer: composes [`mtp_proto::MtpSession`]
//! operations into the observed upload/retrofit/playlist flows a real
//! sync client drives a device through.

pub mod cache;
pub mod library_cache;
pub mod playlist;
pub mod property_list;
pub mod props;
pub mod result;
pub mod retrofit;
pub mod upload;

pub use cache::TrackIdCache;
pub use library_cache::{AlbumContainer, ArtistContainer, LibraryCache};
pub use result::{BatchRetrofitCounts, RetrofitOutcome, ZuneUploadResult};
pub use upload::{upload_track, TrackUploadRequest};
