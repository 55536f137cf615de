use std::io::IsTerminal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use nvmc_core::VersionId;
use nvmc_installer::{ActivationStatus, InstallReport, ListedVersion, ProgressFn, UninstallReport};

const NO_COLOR_ENV: &str = "NO_COLOR";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

/// Byte-level download progress fed by the fetcher callback.
pub(crate) struct DownloadProgress {
    style: OutputStyle,
    label: String,
    progress_bar: Option<ProgressBar>,
    tally: Arc<TransferTally>,
    started_at: Instant,
}

/// Running byte count across the bodies fetched for one install.
///
/// The fetcher reports `downloaded == 0` at the start of every body, which
/// closes out the previous one.
#[derive(Debug, Default)]
pub(crate) struct TransferTally {
    finished: AtomicU64,
    current: AtomicU64,
}

impl TransferTally {
    /// Records a fetcher callback and returns the combined position and length.
    pub(crate) fn record(&self, downloaded: u64, total: Option<u64>) -> (u64, Option<u64>) {
        if downloaded == 0 {
            let previous = self.current.swap(0, Ordering::Relaxed);
            self.finished.fetch_add(previous, Ordering::Relaxed);
        } else {
            self.current.store(downloaded, Ordering::Relaxed);
        }
        let finished = self.finished.load(Ordering::Relaxed);
        (finished + downloaded, total.map(|total| finished + total))
    }

    pub(crate) fn bytes(&self) -> u64 {
        self.finished.load(Ordering::Relaxed) + self.current.load(Ordering::Relaxed)
    }
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn current() -> Self {
        Self::from_style(current_output_style())
    }

    pub(crate) fn style(self) -> OutputStyle {
        self.style
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        println!("{}", render_status_line(self.style, status, message));
    }

    pub(crate) fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }

    pub(crate) fn start_download(self, label: &str) -> DownloadProgress {
        let progress_bar = if self.style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.cyan.bold} {msg:<12} [{bar:20.cyan/blue}] {bytes:>10}/{total_bytes:10} {elapsed_precise}",
            ) {
                progress_bar.set_style(style.tick_chars(".oO@* ").progress_chars("=>-"));
            }
            progress_bar.set_message(label.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };

        DownloadProgress {
            style: self.style,
            label: label.to_string(),
            progress_bar,
            tally: Arc::default(),
            started_at: Instant::now(),
        }
    }
}

impl DownloadProgress {
    /// Callback for the fetcher, or `None` when nothing is drawn.
    pub(crate) fn callback(&self) -> Option<ProgressFn> {
        let progress_bar = self.progress_bar.clone()?;
        let tally = Arc::clone(&self.tally);
        Some(Box::new(move |downloaded, total| {
            let (position, length) = tally.record(downloaded, total);
            if let Some(length) = length {
                progress_bar.set_length(length);
            }
            progress_bar.set_position(position);
        }))
    }

    pub(crate) fn finish_success(mut self) {
        let Some(progress_bar) = self.progress_bar.take() else {
            return;
        };

        let downloaded = self.tally.bytes();
        progress_bar.finish_and_clear();
        if let Some(line) = render_download_summary(
            self.style,
            &self.label,
            downloaded,
            Some(self.started_at.elapsed()),
        ) {
            println!("{line}");
        }
    }

    pub(crate) fn finish_abandon(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

pub(crate) fn current_output_style() -> OutputStyle {
    resolve_output_style(
        std::io::stdout().is_terminal(),
        std::env::var_os(NO_COLOR_ENV).is_some_and(|value| !value.is_empty()),
    )
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool, no_color: bool) -> OutputStyle {
    if stdout_is_tty && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

/// Lines printed after an install, in the order the steps happened.
pub(crate) fn format_install_lines(report: &InstallReport, style: OutputStyle) -> Vec<String> {
    let version = &report.version;
    let mut lines = Vec::new();

    if report.replaced_existing {
        lines.push(render_status_line(
            style,
            "step",
            &format!("replaced existing installation at {}", report.version_dir.display()),
        ));
    }
    if !report.checksum_verified {
        lines.push(render_status_line(
            style,
            "warn",
            "checksum validation was skipped",
        ));
    }

    if let ActivationStatus::Activated { implicit } = report.activation {
        if implicit {
            lines.push(render_status_line(
                style,
                "step",
                &format!("there is not a current node version activated, will activate {version}"),
            ));
        }
        lines.push(render_status_line(
            style,
            "ok",
            &format!("now using node {version}"),
        ));
    }

    lines.push(render_status_line(
        style,
        "ok",
        &format!("successfully installed {version}"),
    ));
    lines
}

pub(crate) fn format_list_lines(
    versions: &[ListedVersion],
    current: Option<&VersionId>,
    style: OutputStyle,
) -> Vec<String> {
    versions
        .iter()
        .map(|entry| {
            let is_current = entry.is_parsed()
                && current.is_some_and(|current| current.as_str() == entry.name());
            if !is_current {
                return entry.to_string();
            }
            let line = format!("{entry} (current)");
            match style {
                OutputStyle::Plain => line,
                OutputStyle::Rich => colorize(current_style(), &line),
            }
        })
        .collect()
}

pub(crate) fn format_list_json(versions: &[ListedVersion], current: Option<&VersionId>) -> String {
    let entries = versions
        .iter()
        .map(|entry| {
            let version = match entry {
                ListedVersion::Parsed { version, .. } => Some(version.to_string()),
                ListedVersion::Unparsable { .. } => None,
            };
            serde_json::json!({
                "name": entry.name(),
                "version": version,
                "current": current.is_some_and(|current| current.as_str() == entry.name()),
            })
        })
        .collect::<Vec<_>>();
    serde_json::Value::Array(entries).to_string()
}

pub(crate) fn format_uninstall_lines(report: &UninstallReport, style: OutputStyle) -> Vec<String> {
    let mut lines = vec![render_status_line(
        style,
        "ok",
        &format!("uninstalled {}", report.version),
    )];
    if report.was_active {
        lines.push(render_status_line(
            style,
            "warn",
            &format!(
                "{} was the active version; run `nvmc use <version>` to activate another",
                report.version
            ),
        ));
    }
    lines
}

fn render_download_summary(
    style: OutputStyle,
    label: &str,
    downloaded: u64,
    elapsed: Option<Duration>,
) -> Option<String> {
    if style == OutputStyle::Plain {
        return None;
    }

    let suffix = elapsed
        .map(|value| format!(" in {}", format_elapsed(value)))
        .unwrap_or_default();
    Some(format!(
        "{} {}{}",
        colorize(progress_label_style(), label),
        HumanBytes(downloaded),
        suffix
    ))
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn current_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightGreen.into()))
        .effects(Effects::BOLD)
}

fn progress_label_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
