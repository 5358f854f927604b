use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::sources::FrameMetadata;

/// Significant digits carried in the filename quality field.
const QUALITY_DIGITS: i32 = 4;

/// Canonical save path:
/// `{dir}/frame-{yyyyMMdd-hhmmsszzz}-{fff}-q{quality}.tiff`, UTC
/// timestamp, zero-padded intra-second counter, quality in 4
/// significant digits.
pub fn save_filename(dir: &Path, metadata: &FrameMetadata, quality: f32) -> PathBuf {
    let name = format!(
        "frame-{}-{:03}-q{}.tiff",
        metadata.timestamp.format("%Y%m%d-%H%M%S%3f"),
        metadata.frame_of_second,
        format_quality(quality)
    );
    dir.join(name)
}

/// Fields recovered from a save filename.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParsedFilename {
    pub timestamp: DateTime<Utc>,
    pub frame_of_second: u32,
    pub quality: f32,
}

pub fn parse_save_filename(path: &Path) -> Option<ParsedFilename> {
    let stem = path.file_stem()?.to_str()?;
    let rest = stem.strip_prefix("frame-")?;
    // Timestamp field is fixed-width: YYYYMMDD-HHMMSSmmm.
    if rest.len() < 19 {
        return None;
    }
    let (ts, rest) = rest.split_at(18);
    let base = NaiveDateTime::parse_from_str(&ts[..15], "%Y%m%d-%H%M%S").ok()?;
    let millis: i64 = ts[15..18].parse().ok()?;
    let timestamp = base.and_utc() + Duration::milliseconds(millis);

    let rest = rest.strip_prefix('-')?;
    let q_idx = rest.find("-q")?;
    let frame_of_second: u32 = rest[..q_idx].parse().ok()?;
    let quality: f32 = rest[q_idx + 2..].parse().ok()?;

    Some(ParsedFilename {
        timestamp,
        frame_of_second,
        quality,
    })
}

/// General (printf `%.4g`) formatting: fixed notation for moderate
/// exponents, scientific otherwise, trailing zeros trimmed. The output
/// parses back to the same value at 4 significant digits.
pub fn format_quality(quality: f32) -> String {
    let value = quality as f64;
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -4 || exponent >= QUALITY_DIGITS {
        let digits = (QUALITY_DIGITS - 1) as usize;
        let formatted = format!("{value:.digits$e}");
        match formatted.split_once('e') {
            Some((mantissa, exp)) => {
                let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
                format!("{mantissa}e{exp}")
            }
            None => formatted,
        }
    } else {
        let decimals = (QUALITY_DIGITS - 1 - exponent).max(0) as usize;
        let formatted = format!("{value:.decimals$}");
        if formatted.contains('.') {
            formatted
                .trim_end_matches('0')
                .trim_end_matches('.')
                .to_string()
        } else {
            formatted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metadata() -> FrameMetadata {
        FrameMetadata {
            timestamp: Utc
                .with_ymd_and_hms(2026, 3, 21, 10, 15, 30)
                .unwrap()
                + Duration::milliseconds(123),
            frame_of_second: 7,
        }
    }

    #[test]
    fn filename_layout() {
        let path = save_filename(Path::new("/data/run1"), &metadata(), 1.5);
        assert_eq!(
            path,
            PathBuf::from("/data/run1/frame-20260321-101530123-007-q1.5.tiff")
        );
    }

    #[test]
    fn quality_general_format() {
        assert_eq!(format_quality(0.0), "0");
        assert_eq!(format_quality(2.0), "2");
        assert_eq!(format_quality(1.5), "1.5");
        assert_eq!(format_quality(0.5), "0.5");
        assert_eq!(format_quality(3.14159), "3.142");
        assert_eq!(format_quality(1234.4), "1234");
        assert_eq!(format_quality(12345.0), "1.234e4");
        assert_eq!(format_quality(0.00001234), "1.234e-5");
    }

    #[test]
    fn filename_round_trip() {
        for quality in [0.0f32, 0.5, 1.5, 2.0, 3.14159, 42.42, 12345.0] {
            let path = save_filename(Path::new("out"), &metadata(), quality);
            let parsed = parse_save_filename(&path).expect("parseable");
            assert_eq!(parsed.timestamp, metadata().timestamp);
            assert_eq!(parsed.frame_of_second, 7);
            let rounded: f32 = format_quality(quality).parse().unwrap();
            assert_eq!(parsed.quality, rounded);
            let rel = (parsed.quality - quality).abs() / quality.max(1e-6);
            assert!(rel < 1e-3, "quality {quality} round-tripped to {}", parsed.quality);
        }
    }

    #[test]
    fn rejects_foreign_names() {
        assert!(parse_save_filename(Path::new("image-001.tiff")).is_none());
        assert!(parse_save_filename(Path::new("frame-abc.tiff")).is_none());
    }
}
