//! Named, ordered buffers of emitted assembly
//!
//! Each function gets a section named after its mangled symbol; each
//! global data word gets one as well. A section renders as a `:name`
//! header followed by four-space-indented lines. The entry section always
//! renders first; the rest keep creation order.

use std::fmt;

/// One named buffer of assembly lines
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    name: String,
    lines: Vec<String>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.name)?;
        for line in &self.lines {
            write!(f, "\n    {}", line)?;
        }
        Ok(())
    }
}

/// The creation-ordered section container
#[derive(Debug, Default)]
pub struct Sections {
    sections: Vec<Section>,
}

impl Sections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a section by name, creating a fresh empty one on first access
    pub fn get_or_insert(&mut self, name: &str) -> &mut Section {
        if let Some(index) = self.sections.iter().position(|s| s.name == name) {
            return &mut self.sections[index];
        }
        self.sections.push(Section::new(name));
        self.sections.last_mut().unwrap()
    }

    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Render all sections: the entry section first (when present), the
    /// rest in creation order, blocks separated by blank lines.
    pub fn render(&self, entry: &str) -> String {
        let mut blocks: Vec<String> = Vec::with_capacity(self.sections.len());
        if let Some(section) = self.get(entry) {
            blocks.push(section.to_string());
        }
        for section in &self.sections {
            if section.name != entry {
                blocks.push(section.to_string());
            }
        }
        let mut out = blocks.join("\n\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_access_yields_fresh_empty_section() {
        let mut sections = Sections::new();
        let section = sections.get_or_insert("_f");
        assert_eq!(section.name(), "_f");
        assert!(section.lines().is_empty());
    }

    #[test]
    fn test_get_or_insert_returns_same_buffer() {
        let mut sections = Sections::new();
        sections.get_or_insert("_f").push("SET A, 1");
        sections.get_or_insert("_f").push("SET A, 2");
        assert_eq!(sections.get("_f").unwrap().lines().len(), 2);
    }

    #[test]
    fn test_section_display_indents_lines() {
        let mut sections = Sections::new();
        let section = sections.get_or_insert("_f");
        section.push("SET PUSH, Z");
        section.push("SET Z, SP");
        assert_eq!(section.to_string(), ":_f\n    SET PUSH, Z\n    SET Z, SP");
    }

    #[test]
    fn test_entry_section_renders_first() {
        let mut sections = Sections::new();
        sections.get_or_insert("_helper").push("SET PC, POP");
        sections.get_or_insert("_main").push("SET PC, POP");
        sections.get_or_insert("_other").push("SET PC, POP");

        let out = sections.render("_main");
        assert_eq!(
            out,
            ":_main\n    SET PC, POP\n\n:_helper\n    SET PC, POP\n\n:_other\n    SET PC, POP\n"
        );
    }

    #[test]
    fn test_render_without_entry_keeps_creation_order() {
        let mut sections = Sections::new();
        sections.get_or_insert("_g").push("DAT 1");
        sections.get_or_insert("_h").push("DAT 2");

        let out = sections.render("_main");
        assert_eq!(out, ":_g\n    DAT 1\n\n:_h\n    DAT 2\n");
    }
}
