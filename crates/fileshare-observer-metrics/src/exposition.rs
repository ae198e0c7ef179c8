//! Prometheus text exposition.

use prometheus::{Encoder, TextEncoder};

use crate::publisher::MetricsPublisher;

/// Content type of [`render_text`] output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Render every published gauge in the Prometheus text format, sorted by name.
///
/// Gauges that were described but never set are omitted.
pub fn render_text(publisher: &MetricsPublisher) -> prometheus::Result<String> {
    let families = publisher.registry().gather();
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gauges;

    #[test]
    fn test_render_empty() {
        let text = render_text(&MetricsPublisher::with_standard_gauges()).unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn test_render_sorted_with_help() {
        let publisher = MetricsPublisher::with_standard_gauges();
        publisher.set_gauge(gauges::NUMBER_OF_FILES, 3.0);
        publisher.set_gauge(gauges::FILESHARE_SIZE_BYTES, 60.0);

        let text = render_text(&publisher).unwrap();
        let expected = "\
# HELP fileshare_size_bytes Total size of all files in the target file share in bytes
# TYPE fileshare_size_bytes gauge
fileshare_size_bytes 60
# HELP number_of_files Number of files in the target file share
# TYPE number_of_files gauge
number_of_files 3
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_undescribed_gauge_uses_name_as_help() {
        let publisher = MetricsPublisher::new();
        publisher.set_gauge("custom", 1.5);

        let text = render_text(&publisher).unwrap();
        assert_eq!(text, "# HELP custom custom\n# TYPE custom gauge\ncustom 1.5\n");
    }

    #[test]
    fn test_special_values() {
        let publisher = MetricsPublisher::new();
        publisher.set_gauge("empty_selection", f64::NAN);
        publisher.set_gauge("negative", -12.0);

        let text = render_text(&publisher).unwrap();
        assert!(text.contains("\nempty_selection NaN\n"));
        assert!(text.contains("\nnegative -12\n"));
    }

    #[test]
    fn test_content_type_is_text_format() {
        assert!(CONTENT_TYPE.starts_with("text/plain; version=0.0.4"));
    }
}
