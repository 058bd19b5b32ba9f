#![forbid(unsafe_code)]

/// Line-oriented program text with tab indentation.
#[derive(Clone, Debug, Default)]
pub struct BoogieWriter {
    out: String,
    depth: usize,
    at_line_start: bool,
}

impl BoogieWriter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
            at_line_start: true,
        }
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn write(&mut self, text: &str) {
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.out.push('\n');
                self.at_line_start = true;
            }
            if part.is_empty() {
                continue;
            }
            if self.at_line_start {
                for _ in 0..self.depth {
                    self.out.push('\t');
                }
                self.at_line_start = false;
            }
            self.out.push_str(part);
        }
    }

    pub fn line(&mut self, text: &str) {
        self.write(text);
        self.blank();
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    /// Appends text rendered by another writer, re-indented to this depth.
    pub fn append(&mut self, other: &BoogieWriter) {
        self.write(&other.out);
        if !other.out.is_empty() && !other.at_line_start {
            self.blank();
        }
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks_are_tab_indented() {
        let mut w = BoogieWriter::new();
        w.line("if (c) {");
        w.indent();
        w.line("x := 1;");
        w.dedent();
        w.line("}");
        assert_eq!(w.finish(), "if (c) {\n\tx := 1;\n}\n");
    }

    #[test]
    fn appended_text_takes_the_current_depth() {
        let mut inner = BoogieWriter::new();
        inner.line("a;");
        inner.line("b;");
        let mut w = BoogieWriter::new();
        w.indent();
        w.append(&inner);
        assert_eq!(w.finish(), "\ta;\n\tb;\n");
    }
}
