//! Keypad detection.
//!
//! The keypad exposes several HID interfaces; key signals arrive on the
//! vendor-defined one, so enumeration filters by usage page as well as
//! VID/PID.

use hidapi::{DeviceInfo, HidApi};
use tracing::debug;

/// Keypad USB Vendor ID
pub const KEYPAD_VID: u16 = 0x1189;
/// Keypad USB Product ID
pub const KEYPAD_PID: u16 = 0x8890;
/// Vendor-defined usage page carrying the raw key reports
pub const VENDOR_USAGE_PAGE: u16 = 0xFF00;

/// Whether the vendor interface matches the keypad.
#[must_use]
pub fn matches_keypad(info: &DeviceInfo) -> bool {
    info.vendor_id() == KEYPAD_VID
        && info.product_id() == KEYPAD_PID
        && info.usage_page() == VENDOR_USAGE_PAGE
}

/// Find the keypad's vendor interface, if the device is plugged in.
#[must_use]
pub fn find_keypad(api: &HidApi) -> Option<&DeviceInfo> {
    api.device_list().find(|info| matches_keypad(info))
}

/// Check whether a keypad is currently connected, without opening it.
///
/// Uses USB enumeration rather than hidapi so it works even when the HID
/// interface is held open elsewhere.
#[must_use]
pub fn is_keypad_connected() -> bool {
    let Ok(devices) = rusb::devices() else {
        debug!("Failed to enumerate USB devices");
        return false;
    };

    for device in devices.iter() {
        if let Ok(desc) = device.device_descriptor()
            && desc.vendor_id() == KEYPAD_VID
            && desc.product_id() == KEYPAD_PID
        {
            return true;
        }
    }

    false
}
