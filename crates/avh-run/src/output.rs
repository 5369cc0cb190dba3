//! Output formatting: text banners or JSON.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use owo_colors::OwoColorize;

use avh_core::RunReport;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Render a finished run in the chosen format.
pub fn render_report(
    report: &RunReport,
    elapsed: Duration,
    format: OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => Ok(render_text(report, elapsed, color)),
    }
}

fn render_text(report: &RunReport, elapsed: Duration, color: bool) -> String {
    let mut out = String::new();
    let origin = if report.created_instance {
        "created"
    } else {
        "existing"
    };

    let _ = writeln!(out, "{:<13}{} ({origin})", "Instance:", report.instance_id);
    let _ = writeln!(out, "{:<13}{}", "Image:", report.firmware_image);
    let _ = writeln!(
        out,
        "{:<13}{} -> {}",
        "Temperature:", report.initial_temperature, report.raised_temperature
    );
    let _ = writeln!(out, "{:<13}{}", "LEDs before:", report.leds_before);
    let _ = writeln!(out, "{:<13}{}", "LEDs after:", report.leds_after);

    let _ = writeln!(out, "\n{}", banner("=== UART output log: ====", color));
    out.push_str(&report.console_output);
    if !report.console_output.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "{}\n", banner("=== End of UART output log: ====", color));

    // Sub-millisecond precision is noise here.
    let elapsed = Duration::from_millis(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    let done = format!(
        "Execution completed! ({})",
        humantime::format_duration(elapsed)
    );
    if color {
        let _ = write!(out, "{}", done.green().bold());
    } else {
        out.push_str(&done);
    }
    out
}

fn banner(text: &str, color: bool) -> String {
    if color {
        text.cyan().bold().to_string()
    } else {
        text.to_string()
    }
}

/// Print the rendered output to stdout.
pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}
