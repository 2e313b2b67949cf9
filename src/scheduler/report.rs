//! Fixed-width text table rendering of [`TaskRecord`]s.

use crate::config::ReportLayout;
use crate::scheduler::query::TaskRecord;

/// Renders task records as a left-justified fixed-width table.
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    layout: ReportLayout,
}

impl ReportFormatter {
    /// Create a formatter for the given layout.
    pub fn new(layout: ReportLayout) -> Self {
        Self { layout }
    }

    /// Header row followed by one row per record.
    pub fn format(&self, records: &[TaskRecord]) -> String {
        let mut out = self.header();
        for record in records {
            out.push_str(&self.row(record));
            out.push('\n');
        }
        out
    }

    /// Header row followed by a single record row, with no trailing newline.
    pub fn format_one(&self, record: &TaskRecord) -> String {
        let mut out = self.header();
        out.push_str(&self.row(record));
        out
    }

    fn header(&self) -> String {
        let mut line = self.line("Task", "Status", "Next Run");
        line.push('\n');
        line
    }

    fn row(&self, record: &TaskRecord) -> String {
        let name = self.truncate_name(&record.name);
        self.line(&name, &record.status, &record.next_run)
    }

    fn line(&self, name: &str, status: &str, next_run: &str) -> String {
        let ReportLayout {
            name_width,
            status_width,
            next_run_width,
            ..
        } = self.layout;
        format!("{name:<name_width$} {status:<status_width$} {next_run:<next_run_width$}")
    }

    /// Names longer than `name_width - ellipsis` characters are cut and suffixed.
    fn truncate_name(&self, name: &str) -> String {
        let ellipsis = &self.layout.ellipsis;
        let keep = self
            .layout
            .name_width
            .saturating_sub(ellipsis.chars().count());
        if name.chars().count() > keep {
            let mut cut: String = name.chars().take(keep).collect();
            cut.push_str(ellipsis);
            cut
        } else {
            name.to_owned()
        }
    }
}
