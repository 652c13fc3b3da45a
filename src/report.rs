use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Serialize;

use crate::pixel_mode::PixelMode;

/// One `[tag, value]` child row under an image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataEntry {
    pub tag: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swatches: Option<Vec<[u8; 3]>>,
}

impl MetadataEntry {
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        MetadataEntry {
            tag: tag.into(),
            value: value.into(),
            swatches: None,
        }
    }

    pub fn with_swatches(mut self, swatches: Vec<[u8; 3]>) -> Self {
        self.swatches = Some(swatches);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub path: PathBuf,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub resolution: (u32, u32),
    pub mode: Option<PixelMode>,
    pub bit_depth: Option<u16>,
    pub entries: Vec<MetadataEntry>,
}

impl ImageReport {
    pub fn pixel_size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn resolution_text(&self) -> String {
        format!("{}x{}", self.resolution.0, self.resolution.1)
    }

    pub fn bit_depth_text(&self) -> String {
        match self.bit_depth {
            Some(depth) => depth.to_string(),
            None => String::from("unknown"),
        }
    }

    pub fn entry(&self, tag: &str) -> Option<&MetadataEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ScanSummary {
    pub folder: PathBuf,
    pub reports: Vec<ImageReport>,
    pub failures: Vec<ScanFailure>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl ScanSummary {
    pub fn new(folder: &Path) -> Self {
        ScanSummary {
            folder: folder.to_path_buf(),
            ..Default::default()
        }
    }

    pub fn total_files(&self) -> usize {
        self.reports.len() + self.failures.len()
    }

    /// `None` when nothing was scanned.
    pub fn average(&self) -> Option<Duration> {
        let total = u32::try_from(self.total_files()).ok()?;
        if total == 0 {
            return None;
        }
        Some(self.elapsed / total)
    }

    pub fn timing_line(&self) -> String {
        let mut line = format!(
            "Time elapsed {:.3}s for {} images.",
            self.elapsed.as_secs_f64(),
            self.total_files()
        );
        if let Some(avg) = self.average() {
            let _ = write!(line, " Avg: {:.3}s", avg.as_secs_f64());
        }
        line
    }

    /// Indented text rendering of the tree, used by the headless scan.
    pub fn to_text(&self, max_value_chars: usize) -> String {
        let mut out = String::new();
        for report in &self.reports {
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{}",
                report.name,
                report.pixel_size(),
                report.resolution_text(),
                report.bit_depth_text()
            );
            for entry in &report.entries {
                let _ = writeln!(
                    out,
                    "    {}\t{}",
                    entry.tag,
                    truncate(&entry.value, max_value_chars)
                );
            }
        }
        for failure in &self.failures {
            let _ = writeln!(out, "! {}\t{}", failure.path.display(), failure.reason);
        }
        out
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

/// Cuts `value` to `max` chars, appending an ellipsis. `0` disables the limit.
pub fn truncate(value: &str, max: usize) -> String {
    if max == 0 || value.chars().count() <= max {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(max).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ImageReport {
        ImageReport {
            path: PathBuf::from("/tmp/a.gif"),
            name: "a.gif".to_string(),
            width: 640,
            height: 480,
            resolution: (0, 0),
            mode: Some(PixelMode::Palette),
            bit_depth: Some(8),
            entries: vec![MetadataEntry::new("Duration", "100")],
        }
    }

    #[test]
    fn columns_are_formatted() {
        let r = report();
        assert_eq!(r.pixel_size(), "640x480");
        assert_eq!(r.resolution_text(), "0x0");
        assert_eq!(r.bit_depth_text(), "8");
        assert_eq!(r.entry("Duration").map(|e| e.value.as_str()), Some("100"));
    }

    #[test]
    fn unknown_depth_is_labelled() {
        let mut r = report();
        r.bit_depth = None;
        assert_eq!(r.bit_depth_text(), "unknown");
    }

    #[test]
    fn empty_scan_has_no_average() {
        let summary = ScanSummary::new(Path::new("/tmp"));
        assert!(summary.average().is_none());
        assert!(!summary.timing_line().contains("Avg"));
    }

    #[test]
    fn average_divides_by_all_files() {
        let mut summary = ScanSummary::new(Path::new("/tmp"));
        summary.reports.push(report());
        summary.failures.push(ScanFailure {
            path: PathBuf::from("/tmp/b.png"),
            reason: "broken".to_string(),
        });
        summary.elapsed = Duration::from_millis(200);

        assert_eq!(summary.average(), Some(Duration::from_millis(100)));
        assert!(summary.timing_line().contains("for 2 images"));
    }

    #[test]
    fn text_rendering_nests_entries() {
        let mut summary = ScanSummary::new(Path::new("/tmp"));
        summary.reports.push(report());
        let text = summary.to_text(0);
        assert_eq!(text, "a.gif\t640x480\t0x0\t8\n    Duration\t100\n");
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("abcdef", 3), "abc…");
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("ééé", 0), "ééé");
    }
}
