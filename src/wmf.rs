//! WMF detection and one-call conversion to SVG

use log::info;

use crate::error::{WmfError, WmfResult};
use crate::player::{Player, PlayerOptions};
use crate::stream::PLACEABLE_KEY;
use crate::svg_device::{SvgDevice, SvgOptions};

/// Check if data is WMF format
pub fn is_wmf_format(data: &[u8]) -> bool {
    // Placeable prefix
    if data.len() >= 4 {
        let sig = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if sig == PLACEABLE_KEY {
            return true;
        }
    }

    // Bare header: memory or disk metafile type followed by a 9-word header
    if data.len() >= 4 {
        let file_type = u16::from_le_bytes([data[0], data[1]]);
        let header_size = u16::from_le_bytes([data[2], data[3]]);
        return (file_type == 1 || file_type == 2) && header_size == 9;
    }

    false
}

/// Convert WMF data to SVG string
pub fn convert_wmf_to_svg(data: &[u8]) -> WmfResult<String> {
    convert_wmf_to_svg_with(data, PlayerOptions::default(), SvgOptions::default())
}

/// Convert WMF data to SVG with explicit player and backend options
pub fn convert_wmf_to_svg_with(data: &[u8], options: PlayerOptions, svg: SvgOptions) -> WmfResult<String> {
    if !is_wmf_format(data) {
        return Err(WmfError::bad_format("Invalid WMF format"));
    }

    let mut player = Player::from_bytes(data, options)?;
    let bbox = player.scan()?;
    info!(
        "WMF bounding box {:.2}x{:.2} device units",
        bbox.width(),
        bbox.height()
    );

    let mut device = SvgDevice::new(SvgOptions {
        ignore_nonfatal: svg.ignore_nonfatal || options.ignore_nonfatal,
        ..svg
    });
    player.play(&mut device)?;
    player.close(&mut device)?;

    device
        .take_svg()
        .ok_or_else(|| WmfError::DeviceError("no SVG document was produced".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_placeable_and_bare() {
        assert!(is_wmf_format(&[0xD7, 0xCD, 0xC6, 0x9A]));
        assert!(is_wmf_format(&[1, 0, 9, 0]));
        assert!(!is_wmf_format(&[1, 0, 8, 0]));
        assert!(!is_wmf_format(b"%PDF"));
        assert!(!is_wmf_format(&[1, 0]));
    }

    #[test]
    fn test_reject_non_wmf() {
        assert!(matches!(convert_wmf_to_svg(b"GIF89a"), Err(WmfError::BadFormat(_))));
    }
}
