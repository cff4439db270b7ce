/// Host-supplied sink for human-readable progress/error messages. Internal
/// code logs through the `log` facade regardless; this callback is an
/// additional boundary-level channel a host can wire up without touching
/// its logging configuration.
pub trait LogCallback: Send + Sync {
    fn log(&self, message: &str);
}

/// Fired by SSDP discovery (an external collaborator; no discovery logic
/// lives in this workspace) when a device announces itself on the LAN.
pub trait DeviceDiscoveredCallback: Send + Sync {
    fn device_discovered(&self, ip: &str, uuid: &str);
}

/// Static-mode HTTP file lookup: resolves an artist UUID plus endpoint kind
/// (biography, images, deviceBackgroundImage, primaryImage) plus an optional
/// resource id to an absolute path on disk.
pub trait PathResolverCallback: Send + Sync {
    fn resolve(&self, artist_uuid: &str, endpoint_type: &str, resource_id: Option<&str>) -> Option<String>;
}

/// Hybrid mode: persist a freshly proxied response so a later request for
/// the same resource can be served statically instead of round-tripping to
/// the upstream origin again.
pub trait CacheStorageCallback: Send + Sync {
    fn store(
        &self,
        artist_uuid: &str,
        endpoint_type: &str,
        resource_id: Option<&str>,
        data: &[u8],
        content_type: &str,
    ) -> bool;
}
