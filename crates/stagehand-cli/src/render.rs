use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputStyle {
    Plain,
    Rich,
}

/// Rich output only on an interactive stdout; `--plain` and `NO_COLOR` force
/// the unadorned form.
pub fn current_output_style(plain_flag: bool) -> OutputStyle {
    if plain_flag || std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal() {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

pub fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {}", status_badge(status), message),
    }
}

pub fn render_section_header(style: OutputStyle, title: &str) -> Option<String> {
    match style {
        OutputStyle::Plain => None,
        OutputStyle::Rich => Some(colorize(section_style(), &format!("== {title} =="))),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "err" => "[ERR]",
        "warn" => "[WARN]",
        _ => "[..]",
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

/// Batch progress: an indicatif bar in rich mode, silent in plain mode.
/// Status lines go through [`TerminalProgress::println`] so they do not
/// clobber an active bar.
pub struct TerminalProgress {
    total: u64,
    current: u64,
    progress_bar: Option<ProgressBar>,
    started_at: Instant,
}

impl TerminalProgress {
    pub fn start(style: OutputStyle, label: &str, total: u64) -> Self {
        let progress_bar = if style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new(total.max(1));
            if let Ok(template) = ProgressStyle::with_template(
                "{spinner:.cyan.bold} {msg:<12} [{bar:20.cyan/blue}] {pos:>3}/{len:3} {elapsed_precise}",
            ) {
                progress_bar.set_style(template.progress_chars("=>-"));
            }
            progress_bar.set_message(label.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };

        Self {
            total,
            current: 0,
            progress_bar,
            started_at: Instant::now(),
        }
    }

    pub fn advance(&mut self) {
        self.current = (self.current + 1).min(self.total);
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_position(self.current);
        }
    }

    pub fn println(&self, line: &str) {
        match &self.progress_bar {
            Some(progress_bar) => progress_bar.println(line),
            None => println!("{line}"),
        }
    }

    pub fn finish(&mut self) {
        let Some(progress_bar) = self.progress_bar.take() else {
            return;
        };
        progress_bar.finish_and_clear();
        let elapsed = self.started_at.elapsed();
        println!(
            "{}/{} complete in {}",
            self.current,
            self.total,
            format_elapsed(elapsed)
        );
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}
