//! Line-oriented output with Ninja `$` continuations.

/// Accumulates escaped Ninja text, wrapping long lines.
pub(crate) struct Writer {
    out: String,
    width: Option<usize>,
}

impl Writer {
    pub(crate) const fn new(width: Option<usize>) -> Self {
        Self {
            out: String::new(),
            width,
        }
    }

    pub(crate) fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Write `key = value` where `value` is already escaped.
    pub(crate) fn binding(&mut self, key: &str, value: &str, indent: usize) {
        self.line(&format!("{key} = {value}"), indent);
    }

    /// Write one logical line, breaking at unescaped spaces when it exceeds
    /// the configured width. Continuation lines are indented two levels
    /// deeper.
    pub(crate) fn line(&mut self, text: &str, indent: usize) {
        let mut leading = "  ".repeat(indent);
        let mut rest = text;
        if let Some(width) = self.width {
            while leading.len() + rest.len() > width {
                let available = width.saturating_sub(leading.len() + " $".len());
                let Some(split) = last_break_before(rest, available)
                    .or_else(|| first_break_from(rest, available))
                else {
                    break;
                };
                let (head, tail) = rest.split_at(split);
                self.out.push_str(&leading);
                self.out.push_str(head);
                self.out.push_str(" $\n");
                rest = tail.get(1..).unwrap_or_default();
                leading = "  ".repeat(indent + 2);
            }
        }
        self.out.push_str(&leading);
        self.out.push_str(rest);
        self.out.push('\n');
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

fn break_points(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.match_indices(' ')
        .map(|(idx, _)| idx)
        .filter(move |&idx| idx > 0 && is_breakable(text, idx))
}

fn last_break_before(text: &str, limit: usize) -> Option<usize> {
    break_points(text).take_while(|&idx| idx < limit).last()
}

fn first_break_from(text: &str, limit: usize) -> Option<usize> {
    break_points(text).find(|&idx| idx >= limit)
}

/// A space is breakable when it is not itself escaped and the next line would
/// not start with a space that Ninja strips from continuations.
fn is_breakable(text: &str, idx: usize) -> bool {
    let dollars = text
        .get(..idx)
        .map_or(0, |head| head.chars().rev().take_while(|&c| c == '$').count());
    let next_is_space = text.get(idx + 1..).is_some_and(|tail| tail.starts_with(' '));
    dollars.rem_euclid(2) == 0 && !next_is_space
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapped(text: &str, width: usize, indent: usize) -> String {
        let mut writer = Writer::new(Some(width));
        writer.line(text, indent);
        writer.finish()
    }

    #[test]
    fn short_lines_are_untouched() {
        assert_eq!(wrapped("build a: cc b", 78, 0), "build a: cc b\n");
    }

    #[test]
    fn long_lines_break_at_spaces() {
        let text = "build out: link one.o two.o three.o";
        assert_eq!(
            wrapped(text, 20, 0),
            "build out: link $\n    one.o two.o $\n    three.o\n"
        );
    }

    #[test]
    fn escaped_spaces_are_never_split() {
        let text = "build a$ b$ c$ d: phony";
        assert_eq!(wrapped(text, 10, 0), "build $\n    a$ b$ c$ d: $\n    phony\n");
    }

    #[test]
    fn unbreakable_lines_are_left_long() {
        assert_eq!(wrapped("abcdefghijklmnop", 5, 0), "abcdefghijklmnop\n");
    }

    #[test]
    fn no_width_disables_wrapping() {
        let mut writer = Writer::new(None);
        let text = "x ".repeat(100);
        writer.line(text.trim_end(), 1);
        assert_eq!(writer.finish().lines().count(), 1);
    }
}
