use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Widths below this are phones.
pub const MOBILE_BREAKPOINT: u32 = 768;
/// Widths below this (and at least `MOBILE_BREAKPOINT`) are tablets.
pub const TABLET_BREAKPOINT: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Tablet,
    Mobile,
}

impl DeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Tablet => "tablet",
            DeviceClass::Mobile => "mobile",
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a viewport width (columns of pixels) to a device class.
pub fn classify(width: u32) -> DeviceClass {
    if width < MOBILE_BREAKPOINT {
        DeviceClass::Mobile
    } else if width < TABLET_BREAKPOINT {
        DeviceClass::Tablet
    } else {
        DeviceClass::Desktop
    }
}

/// Owns the current device class and republishes it on width changes.
///
/// Constructed once per session and handed to whoever needs classification;
/// consumers either read `current()` or hold a `subscribe()` receiver. The
/// watch channel keeps only the latest value, so a burst of resize events
/// collapses to the final classification.
#[derive(Debug)]
pub struct DeviceMonitor {
    tx: watch::Sender<DeviceClass>,
}

impl DeviceMonitor {
    pub fn new(initial_width: u32) -> Self {
        let (tx, _) = watch::channel(classify(initial_width));
        Self { tx }
    }

    pub fn current(&self) -> DeviceClass {
        *self.tx.borrow()
    }

    /// Reclassify for a new viewport width. Subscribers are only woken when
    /// the class actually changes.
    pub fn observe_width(&self, width: u32) {
        let class = classify(width);
        self.tx.send_if_modified(|cur| {
            if *cur == class {
                false
            } else {
                *cur = class;
                true
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceClass> {
        self.tx.subscribe()
    }
}
