use crate::device::DeviceClass;

/// How a stream is framed for a given device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectPolicy {
    /// 9:16 portrait, phones.
    Portrait,
    /// 4:3, tablets.
    Standard,
    /// 16:9, everything else.
    Widescreen,
}

impl AspectPolicy {
    pub fn ratio(self) -> (u32, u32) {
        match self {
            AspectPolicy::Portrait => (9, 16),
            AspectPolicy::Standard => (4, 3),
            AspectPolicy::Widescreen => (16, 9),
        }
    }

    /// The transformation tag the historical policy used in stream URLs.
    pub fn tag(self) -> &'static str {
        match self {
            AspectPolicy::Portrait => "ar-9-16",
            AspectPolicy::Standard => "ar-4-3",
            AspectPolicy::Widescreen => "ar-16-9",
        }
    }
}

/// Fixed table, no fallback ambiguity.
pub fn aspect_ratio_for(device: DeviceClass) -> AspectPolicy {
    match device {
        DeviceClass::Mobile => AspectPolicy::Portrait,
        DeviceClass::Tablet => AspectPolicy::Standard,
        DeviceClass::Desktop => AspectPolicy::Widescreen,
    }
}

/// Maps an original asset locator to the URL actually handed to the player.
/// Implementations must stay substitutable without touching callers.
pub trait StreamPolicy: Send + Sync {
    fn stream_url_for(&self, original_url: &str, device: DeviceClass) -> String;
}

/// Current policy: serve the original stream for every device class.
///
/// On-the-fly transformed delivery burns provider processing units and starts
/// failing outright once the quota is exhausted, which is worse than serving
/// a non-optimized stream. Re-enable [`TransformedStreams`] if the plan ever
/// covers it again.
#[derive(Debug, Default)]
pub struct OriginalStreams;

impl StreamPolicy for OriginalStreams {
    fn stream_url_for(&self, original_url: &str, _device: DeviceClass) -> String {
        original_url.to_string()
    }
}

/// Historical policy: request a device-cropped rendition via a `tr` query
/// parameter.
#[derive(Debug, Default)]
pub struct TransformedStreams;

impl StreamPolicy for TransformedStreams {
    fn stream_url_for(&self, original_url: &str, device: DeviceClass) -> String {
        let tag = aspect_ratio_for(device).tag();
        let sep = if original_url.contains('?') { '&' } else { '?' };
        format!("{original_url}{sep}tr={tag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_table_is_fixed() {
        assert_eq!(aspect_ratio_for(DeviceClass::Mobile), AspectPolicy::Portrait);
        assert_eq!(aspect_ratio_for(DeviceClass::Tablet), AspectPolicy::Standard);
        assert_eq!(
            aspect_ratio_for(DeviceClass::Desktop),
            AspectPolicy::Widescreen
        );
        assert_eq!(aspect_ratio_for(DeviceClass::Mobile).ratio(), (9, 16));
    }

    #[test]
    fn test_original_streams_is_identity() {
        let policy = OriginalStreams;
        let url = "https://cdn.example.com/v.mp4";
        assert_eq!(policy.stream_url_for(url, DeviceClass::Mobile), url);
        assert_eq!(policy.stream_url_for(url, DeviceClass::Tablet), url);
        assert_eq!(policy.stream_url_for(url, DeviceClass::Desktop), url);
    }

    #[test]
    fn test_transformed_streams_tags_per_device() {
        let policy = TransformedStreams;
        assert_eq!(
            policy.stream_url_for("https://cdn.example.com/v.mp4", DeviceClass::Mobile),
            "https://cdn.example.com/v.mp4?tr=ar-9-16"
        );
        assert_eq!(
            policy.stream_url_for("https://cdn.example.com/v.mp4?sig=abc", DeviceClass::Desktop),
            "https://cdn.example.com/v.mp4?sig=abc&tr=ar-16-9"
        );
    }
}
