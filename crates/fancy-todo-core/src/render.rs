use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::filter::FilterMode;
use crate::task::Task;
use crate::theme::ThemePreference;

/// ANSI SGR codes for one theme.
#[derive(Debug, Clone, Copy)]
struct Palette {
    title: &'static str,
    accent: &'static str,
    muted: &'static str,
    done: &'static str,
}

impl Palette {
    fn for_theme(theme: ThemePreference) -> Self {
        match theme {
            ThemePreference::Light => Self {
                title: "1;30",
                accent: "1;34",
                muted: "90",
                done: "9;90",
            },
            ThemePreference::Dark => Self {
                title: "1;97",
                accent: "1;96",
                muted: "37",
                done: "9;37",
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Colour needs both the `color` setting and a terminal on stdout.
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.color_enabled()? && io::stdout().is_terminal();
        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, tasks, counts))]
    pub fn print_view<W: Write>(
        &self,
        out: &mut W,
        tasks: &[&Task],
        mode: FilterMode,
        counts: (usize, usize, usize),
        theme: ThemePreference,
    ) -> anyhow::Result<()> {
        let palette = Palette::for_theme(theme);

        writeln!(out, "{}", self.paint("Fancy Todo List", palette.title))?;

        let bar = FilterMode::ALL_MODES
            .iter()
            .map(|&candidate| {
                if candidate == mode {
                    self.paint(&format!("[{}]", candidate.label()), palette.accent)
                } else {
                    format!(" {} ", candidate.label())
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{bar}")?;
        writeln!(out)?;

        if tasks.is_empty() {
            let message = match mode {
                FilterMode::All => "No tasks yet.",
                FilterMode::Active => "No active tasks.",
                FilterMode::Completed => "No completed tasks.",
            };
            writeln!(out, "{}", self.paint(message, palette.muted))?;
        } else {
            let headers = vec![
                "#".to_string(),
                "Done".to_string(),
                "Task".to_string(),
                "Id".to_string(),
            ];

            let rows = tasks
                .iter()
                .enumerate()
                .map(|(idx, task)| {
                    let (mark, text) = if task.completed {
                        ("[x]", self.paint(&printable(&task.text), palette.done))
                    } else {
                        ("[ ]", printable(&task.text))
                    };
                    vec![
                        self.paint(&(idx + 1).to_string(), palette.accent),
                        mark.to_string(),
                        text,
                        self.paint(&task.short_id(), palette.muted),
                    ]
                })
                .collect();

            write_table(&mut *out, headers, rows)?;
        }

        let (total, active, completed) = counts;
        writeln!(out)?;
        writeln!(
            out,
            "{}",
            self.paint(
                &format!("{total} total, {active} active, {completed} completed"),
                palette.muted
            )
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|header| visible_width(header)).collect();

    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, &width)| pad(header, width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", header_line.trim_end())?;

    let rule = widths
        .iter()
        .map(|&width| "-".repeat(width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{rule}")?;

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| pad(cell, width))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

/// Escapes control characters so stored text cannot drive the terminal or
/// break a table row.
pub fn printable(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_control() {
            out.extend(ch.escape_default());
        } else {
            out.push(ch);
        }
    }
    out
}

fn pad(cell: &str, width: usize) -> String {
    let padding = width.saturating_sub(visible_width(cell));
    format!("{cell}{}", " ".repeat(padding))
}

fn visible_width(cell: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(cell).as_str())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
