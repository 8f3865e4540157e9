// (c) 2025 Ross Younger
//! Progress bar styling

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::transfer::Purpose;

/// Maximum update frequency we will use for the progress display
pub const MAX_UPDATE_FPS: u8 = 20;

/// A single-line style format for Indicatif which should cover most situations.
///
/// ```text
/// 11111111111111111111111111111111111111111111111111111111111111111111111111111111
/// Search.zip [==========================            ] 2m30s @ 123.4kB/s [204.8kB]
/// 11111111111111111111111111111111111111111111111111111111111111111111111111111111
/// ```
const PROGRESS_STYLE_COMPACT: &str =
    "{msg:.dim} {wide_bar:.cyan} {eta} @ {decimal_bytes_per_sec} [{decimal_total_bytes:.dim}]";

/// Space to allow for the data readout and a useful bar
const DATA_AND_PROGRESS: usize = 55;

/// A double-line style format for Indicatif for use when the filename is too long.
///
/// ```text
/// 11111111111111111111111111111111111111111111111111111111111111111111111111111111
/// Some Author - An Extremely Long Title, Being The Complete Works.epub [204.8kB]
/// [==========================                                  ] 2m30s @ 12.4kB/s
/// 11111111111111111111111111111111111111111111111111111111111111111111111111111111
/// ```
const PROGRESS_STYLE_OVERLONG: &str = "{wide_msg:.dim} [{decimal_total_bytes:.dim}]\n{wide_bar:.cyan} {eta} @ {decimal_bytes_per_sec}";

/// For transfers whose peer advertised no size
const SPINNER_TEMPLATE: &str = "{spinner} {wide_msg:.dim} {decimal_bytes} @ {decimal_bytes_per_sec}";

/// Determine and retrieve the appropriate progress style to use
pub(crate) fn style_for(msg_size: usize) -> &'static str {
    let term_width = console::Term::stderr().size().1 as usize; // this returns a reasonable default if it can't detect
    if msg_size + DATA_AND_PROGRESS > term_width {
        PROGRESS_STYLE_OVERLONG
    } else {
        PROGRESS_STYLE_COMPACT
    }
}

/// Creates and registers the progress bar for one transfer
pub(crate) fn progress_bar_for(
    display: &MultiProgress,
    file_name: &str,
    expected_size: u64,
    purpose: Purpose,
    quiet: bool,
) -> anyhow::Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let message = match purpose {
        Purpose::Catalog => format!("{file_name} (catalog)"),
        Purpose::Item => file_name.to_string(),
    };
    let bar = if expected_size == 0 {
        ProgressBar::new_spinner().with_style(ProgressStyle::with_template(SPINNER_TEMPLATE)?)
    } else {
        ProgressBar::new(expected_size)
            .with_style(ProgressStyle::with_template(style_for(message.len()))?)
    };
    Ok(display.add(bar.with_message(message)))
}

#[cfg(test)]
mod test {
    use super::{progress_bar_for, style_for, PROGRESS_STYLE_COMPACT, PROGRESS_STYLE_OVERLONG};
    use crate::transfer::Purpose;
    use indicatif::{MultiProgress, ProgressDrawTarget};

    #[test]
    fn filename_sizes() {
        assert_eq!(style_for(10), PROGRESS_STYLE_COMPACT);
        assert_eq!(style_for(500), PROGRESS_STYLE_OVERLONG);
    }

    #[test]
    fn bars() {
        let display = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let bar = progress_bar_for(&display, "dune.epub", 1000, Purpose::Item, false).unwrap();
        assert_eq!(bar.length(), Some(1000));
        assert_eq!(bar.message(), "dune.epub");

        let spinner = progress_bar_for(&display, "Search.zip", 0, Purpose::Catalog, false).unwrap();
        assert_eq!(spinner.length(), None);
        assert_eq!(spinner.message(), "Search.zip (catalog)");

        let quiet = progress_bar_for(&display, "dune.epub", 1000, Purpose::Item, true).unwrap();
        assert!(quiet.is_hidden());
    }
}
