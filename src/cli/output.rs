use crate::core::configure::ConfigView;
use crate::domain::error::ShroudResult;
use std::io::{self, Write};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output writer trait for command results
pub trait OutputWriter {
    fn write_message(&mut self, message: &str) -> ShroudResult<()>;
    fn write_sections(&mut self, sections: &[String]) -> ShroudResult<()>;
    fn write_options(
        &mut self,
        section: &str,
        values: &[(String, Option<String>)],
    ) -> ShroudResult<()>;

    fn write_view(&mut self, view: &ConfigView) -> ShroudResult<()> {
        match view {
            ConfigView::Sections(sections) => self.write_sections(sections),
            ConfigView::Options { section, values } => self.write_options(section, values),
        }
    }
}

/// Console output writer
pub struct ConsoleWriter<W: Write = io::Stdout> {
    out: W,
}

impl ConsoleWriter {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutputWriter for ConsoleWriter<W> {
    fn write_message(&mut self, message: &str) -> ShroudResult<()> {
        writeln!(self.out, "{}", message)?;
        Ok(())
    }

    fn write_sections(&mut self, sections: &[String]) -> ShroudResult<()> {
        if sections.is_empty() {
            writeln!(self.out, "No sections found")?;
            return Ok(());
        }
        writeln!(self.out, "All available sections:")?;
        for section in sections {
            writeln!(self.out, "    {}", section)?;
        }
        Ok(())
    }

    fn write_options(
        &mut self,
        section: &str,
        values: &[(String, Option<String>)],
    ) -> ShroudResult<()> {
        writeln!(self.out, "Section: {}", section)?;
        if values.is_empty() {
            writeln!(self.out, "No options found")?;
            return Ok(());
        }
        let rows: Vec<OptionTableRow> = values.iter().map(OptionTableRow::from).collect();
        let mut table = Table::new(rows);
        table.with(Style::psql());
        writeln!(self.out, "{}", table)?;
        Ok(())
    }
}

// Table row structures for tabled
#[derive(Tabled)]
struct OptionTableRow {
    option: String,
    value: String,
}

impl From<&(String, Option<String>)> for OptionTableRow {
    fn from((option, value): &(String, Option<String>)) -> Self {
        Self {
            option: option.clone(),
            value: value.clone().unwrap_or_else(|| "(unset)".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(view: &ConfigView) -> String {
        let mut writer = ConsoleWriter::new(Vec::new());
        writer.write_view(view).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_sections_listing() {
        let output = render(&ConfigView::Sections(vec!["builder".into(), "runtime".into()]));
        assert!(output.starts_with("All available sections:"));
        assert!(output.contains("    runtime"));
    }

    #[test]
    fn test_options_table() {
        let output = render(&ConfigView::Options {
            section: "builder".into(),
            values: vec![
                ("output".into(), Some("dist".into())),
                ("mix_str".into(), None),
            ],
        });
        assert!(output.contains("Section: builder"));
        assert!(output.contains("option"));
        assert!(output.contains("dist"));
        assert!(output.contains("(unset)"));
    }

    #[test]
    fn test_empty_views() {
        assert!(render(&ConfigView::Sections(Vec::new())).contains("No sections found"));
        let output = render(&ConfigView::Options {
            section: "extra".into(),
            values: Vec::new(),
        });
        assert!(output.contains("No options found"));
    }
}
