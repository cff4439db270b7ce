use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use log::info;

use mtp_author::{upload_track, LibraryCache, TrackIdCache, TrackUploadRequest};
use mtp_proto::UploadStream;

use crate::config::HostConfig;
use crate::device;

#[derive(Subcommand, Debug, Clone)]
pub enum ZuneSubcommand {
    /// Upload a single audio file, creating artist/album containers as needed.
    Upload(UploadArgs),
    /// Give an existing artist a sync-partner GUID, replacing its container.
    Retrofit(RetrofitArgs),
    /// Create or replace a playlist's track list.
    Playlist(PlaylistArgs),
    /// Bring up the USB-tunneled network bridge (Pavo-family devices only).
    Serve,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    #[clap(long)]
    pub artist: String,
    #[clap(long)]
    pub album: String,
    #[clap(long)]
    pub title: String,
    #[clap(long)]
    pub genre: String,
    #[clap(long)]
    pub file: std::path::PathBuf,
    #[clap(long, default_value_t = 1)]
    pub track_number: u16,
    #[clap(long, default_value_t = 0)]
    pub year: u32,
}

#[derive(Args, Debug, Clone)]
pub struct RetrofitArgs {
    #[clap(long)]
    pub artist: String,
    #[clap(long)]
    pub guid: String,
}

#[derive(Args, Debug, Clone)]
pub struct PlaylistArgs {
    #[clap(subcommand)]
    pub action: PlaylistAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlaylistAction {
    Create { name: String, content_type_guid: String },
    Delete { playlist_id: u32 },
}

struct FileStream {
    file: std::fs::File,
    total_size: u64,
}

impl FileStream {
    fn open(path: &std::path::Path) -> Result<Self> {
        let file = std::fs::File::open(path).with_context(|| format!("opening {path:?}"))?;
        let total_size = file.metadata()?.len();
        Ok(Self { file, total_size })
    }
}

impl UploadStream for FileStream {
    fn total_size(&self) -> u64 {
        self.total_size
    }
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::io::Read::read(&mut self.file, buf)
    }
}

pub fn run(command: ZuneSubcommand, config: &HostConfig) -> Result<()> {
    match command {
        ZuneSubcommand::Upload(args) => run_upload(args, config),
        ZuneSubcommand::Retrofit(args) => run_retrofit(args, config),
        ZuneSubcommand::Playlist(args) => run_playlist(args, config),
        ZuneSubcommand::Serve => run_serve(config),
    }
}

fn run_upload(args: UploadArgs, _config: &HostConfig) -> Result<()> {
    let mut session = device::connect()?;
    let mut library = LibraryCache::new();
    let mut track_ids = TrackIdCache::new();
    let filename = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("upload file path has no filename"))?
        .to_string();
    let mut stream = FileStream::open(&args.file)?;

    let request = TrackUploadRequest {
        artist: &args.artist,
        artist_guid: None,
        album: &args.album,
        album_artist: None,
        year: args.year,
        title: &args.title,
        genre: &args.genre,
        filename: &filename,
        track_number: args.track_number,
        disc_number: 1,
        duration_ms: 0,
        cover_jpeg: None,
    };

    let result = upload_track(session.as_mut(), &mut library, &mut track_ids, &request, &mut stream)?;
    info!("uploaded track object {}", result.track_object_id);

    // Signals the device the upload session is done and leaves it ready for
    // the next command, mirroring the disable-trusted-files / reopen-session
    // pair a bulk upload run ends with.
    session.operation_9215()?;
    session.operation_922b(3, 1, 0)?;
    Ok(())
}

fn run_retrofit(args: RetrofitArgs, _config: &HostConfig) -> Result<()> {
    let mut session = device::connect()?;
    let mut library = LibraryCache::new();
    let mut track_ids = TrackIdCache::new();
    let outcome = mtp_author::retrofit::retrofit_artist_guid(
        session.as_mut(),
        &mut library,
        &mut track_ids,
        &args.artist,
        &args.guid,
    )?;
    info!("retrofit outcome: {outcome:?}");
    Ok(())
}

fn run_playlist(args: PlaylistArgs, _config: &HostConfig) -> Result<()> {
    let mut session = device::connect()?;
    match args.action {
        PlaylistAction::Create { name, content_type_guid } => {
            let storage = *session
                .get_storage_ids()?
                .first()
                .ok_or_else(|| anyhow!("device reports no storage"))?;
            let playlist_id = mtp_author::playlist::create_playlist(
                session.as_mut(),
                storage,
                &name,
                &content_type_guid,
                &[],
            )?;
            info!("created playlist object {playlist_id}");
        }
        PlaylistAction::Delete { playlist_id } => {
            mtp_author::playlist::delete_playlist(session.as_mut(), playlist_id)?;
            info!("deleted playlist object {playlist_id}");
        }
    }
    Ok(())
}

fn run_serve(config: &HostConfig) -> Result<()> {
    if !config.network_mode_enabled {
        return Err(anyhow!("network mode is disabled in config; set network_mode_enabled = true"));
    }
    let mut session = device::connect()?;
    pair_with_device(session.as_mut(), config)?;
    session.operation_922c(3, 3)?;

    let pipe = session.get_bulk_pipe()?;
    let dns = build_dns_responder(config);
    let responder = Arc::new(build_http_responder(config));
    let dispatcher = netstack::Dispatcher::new(config.to_netstack_config(), dns);
    dispatcher.run(pipe, responder)?;
    Ok(())
}

/// Hands the host's pairing GUID to the device (generating one on first run)
/// and persists whatever session GUID the device returns once pairing
/// succeeds, so later runs can skip the handshake.
fn pair_with_device(session: &mut dyn mtp_proto::MtpSession, config: &HostConfig) -> Result<()> {
    let pairing_path = config.pairing_guid_path();
    let pairing_guid = match mtp_proto::persisted_state::read_pairing_guid(&pairing_path)? {
        Some(guid) => guid,
        None => {
            let guid = uuid::Uuid::new_v4().to_string();
            mtp_proto::persisted_state::write_pairing_guid(&pairing_path, &guid)?;
            guid
        }
    };
    session.operation_922a(&pairing_guid)?;

    let raw = session.get_device_property(mtp_proto::DEVICE_PROP_SESSION_GUID)?;
    let (session_guid, _) = zcommon::bytes::decode_utf16le_until_nul(&raw, 0);
    if !session_guid.is_empty() {
        mtp_proto::persisted_state::write_device_session_guid(
            &config.device_session_guid_path(),
            &session_guid,
        )?;
        info!("paired; device session guid persisted");
    }
    Ok(())
}

fn build_dns_responder(config: &HostConfig) -> netstack::dns::DnsResponder {
    netstack::dns::DnsResponder::new().with_record("catalog.zune.net", config.dns_server_ip)
}

fn build_http_responder(config: &HostConfig) -> netstack::http::HttpResponder {
    let mode = match &config.proxy_upstream_base {
        Some(upstream) => netstack::http::ResponderMode::Proxy { upstream_base: upstream.clone() },
        None => netstack::http::ResponderMode::Test,
    };
    netstack::http::HttpResponder::new(mode, vec!["catalog.zune.net".to_string()])
}
