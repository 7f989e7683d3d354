//! AVDTP service categories and their capability parameters

use heapless::Vec;

/// Maximum opaque payload kept for content-protection and codec-info blobs
pub const MAX_OPAQUE_CAPABILITY: usize = 16;

/// Stream Endpoint type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SepType {
    Source = 0x00,
    Sink = 0x01,
}

/// Media type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MediaType {
    Audio = 0x00,
    Video = 0x01,
    Multimedia = 0x02,
}

/// AVDTP service category identifiers. The discriminant doubles as the bit
/// position in [`RegisteredCategories`] - do not renumber without updating
/// that bitmap's documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ServiceCategory {
    MediaTransport = 0x01,
    Reporting = 0x02,
    Recovery = 0x03,
    ContentProtection = 0x04,
    HeaderCompression = 0x05,
    Multiplexing = 0x06,
    MediaCodec = 0x07,
    DelayReporting = 0x08,
}

/// Bitmap of which service categories have been registered on a endpoint.
/// Bit `n` corresponds to `ServiceCategory` discriminant `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisteredCategories(u16);

impl RegisteredCategories {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn set(&mut self, category: ServiceCategory) {
        self.0 |= 1 << (category as u16);
    }

    pub fn contains(&self, category: ServiceCategory) -> bool {
        self.0 & (1 << (category as u16)) != 0
    }

    pub const fn bits(&self) -> u16 {
        self.0
    }
}

/// Recovery capability parameters (only RFC2733 is defined by AVDTP)
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecoveryCapability {
    pub recovery_type: u8,
    pub max_window_size: u8,
    pub max_media_packets: u8,
}

/// Content protection capability parameters
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContentProtectionCapability {
    pub cp_type: u16,
    pub value: Vec<u8, MAX_OPAQUE_CAPABILITY>,
}

/// Header compression capability parameters
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeaderCompressionCapability {
    pub back_channel: bool,
    pub media: bool,
    pub recovery: bool,
}

/// Media codec capability parameters
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MediaCodecCapability {
    pub media_type: u8,
    pub codec_type: u8,
    pub codec_info: Vec<u8, MAX_OPAQUE_CAPABILITY>,
}

/// Multiplexing capability parameters
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MultiplexingCapability {
    pub fragmentation: bool,
}

/// All capability parameters a stream endpoint may register, one slot per
/// category. A category with no parameters worth storing (media transport,
/// reporting, delay reporting) only needs its bit set in
/// [`RegisteredCategories`].
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities {
    pub registered: RegisteredCategories,
    pub recovery: RecoveryCapability,
    pub content_protection: ContentProtectionCapability,
    pub header_compression: HeaderCompressionCapability,
    pub media_codec: MediaCodecCapability,
    pub multiplexing: MultiplexingCapability,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_tracks_registered_categories() {
        let mut caps = RegisteredCategories::empty();
        assert!(!caps.contains(ServiceCategory::MediaTransport));
        caps.set(ServiceCategory::MediaTransport);
        caps.set(ServiceCategory::MediaCodec);
        assert!(caps.contains(ServiceCategory::MediaTransport));
        assert!(caps.contains(ServiceCategory::MediaCodec));
        assert!(!caps.contains(ServiceCategory::Reporting));
    }
}
