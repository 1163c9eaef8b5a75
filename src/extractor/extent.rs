//! Section extent detection

/// Lines scanned past the match line while looking for the closing brace
const LOOKAHEAD_LINES: usize = 500;
/// Lines kept when no balanced block is found
const UNBALANCED_MAX_LINES: usize = 50;

/// Text and last line of a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extent {
    pub body: String,
    /// 1-based, inclusive
    pub end_line: usize,
}

/// Decides where a section that starts on a given line ends
pub trait ExtentFinder: Send + Sync {
    /// `lines` are the file's `\n`-separated lines; `start_line` is 1-based and in range
    fn find_extent(&self, lines: &[&str], start_line: usize) -> Extent;
}

/// Brace-balance scan
///
/// Counts every `{` and `}` from the start line onward, including braces inside strings
/// and comments. The section closes on the line where the count returns to zero after
/// having been positive. Without such a line the first few scanned lines are kept.
#[derive(Debug, Clone, Copy)]
pub struct BraceBalanceExtent {
    lookahead: usize,
    fallback_lines: usize,
}

impl Default for BraceBalanceExtent {
    fn default() -> Self {
        Self {
            lookahead: LOOKAHEAD_LINES,
            fallback_lines: UNBALANCED_MAX_LINES,
        }
    }
}

impl BraceBalanceExtent {
    pub fn new(lookahead: usize, fallback_lines: usize) -> Self {
        Self {
            lookahead,
            fallback_lines: fallback_lines.max(1),
        }
    }
}

impl ExtentFinder for BraceBalanceExtent {
    fn find_extent(&self, lines: &[&str], start_line: usize) -> Extent {
        let first = start_line.saturating_sub(1);
        let stop = lines.len().min(start_line + self.lookahead);

        let mut depth: i64 = 0;
        let mut opened = false;

        for i in first..stop {
            for ch in lines[i].chars() {
                match ch {
                    '{' => {
                        depth += 1;
                        opened = true;
                    }
                    '}' => {
                        depth -= 1;
                        if opened && depth == 0 {
                            return Extent {
                                body: lines[first..=i].join("\n"),
                                end_line: i + 1,
                            };
                        }
                    }
                    _ => {}
                }
            }
        }

        let scanned = stop.saturating_sub(first);
        let kept = scanned.min(self.fallback_lines);
        if kept == 0 {
            return Extent {
                body: String::new(),
                end_line: start_line,
            };
        }
        Extent {
            body: lines[first..first + kept].join("\n"),
            end_line: start_line + kept - 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<&str> {
        text.split('\n').collect()
    }

    #[test]
    fn test_single_line_block() {
        let l = lines("function handleClick() { doThing(); }");
        let extent = BraceBalanceExtent::default().find_extent(&l, 1);
        assert_eq!(extent.end_line, 1);
        assert_eq!(extent.body, "function handleClick() { doThing(); }");
    }

    #[test]
    fn test_multi_line_nested_block() {
        let l = lines("// header\nfn run() {\n    if x {\n        y();\n    }\n}\nfn other() {}");
        let extent = BraceBalanceExtent::default().find_extent(&l, 2);
        assert_eq!(extent.end_line, 6);
        assert!(extent.body.starts_with("fn run() {"));
        assert!(extent.body.ends_with('}'));
    }

    #[test]
    fn test_brace_on_following_line() {
        let l = lines("class Foo\n{\n  a\n}\n");
        let extent = BraceBalanceExtent::default().find_extent(&l, 1);
        assert_eq!(extent.end_line, 4);
    }

    #[test]
    fn test_unbalanced_keeps_at_most_fifty_lines() {
        let text = std::iter::once("def run(x):")
            .chain(std::iter::repeat_n("    pass", 80))
            .collect::<Vec<_>>()
            .join("\n");
        let l = lines(&text);
        let extent = BraceBalanceExtent::default().find_extent(&l, 1);
        assert_eq!(extent.end_line, 50);
        assert_eq!(extent.body.split('\n').count(), 50);
    }

    #[test]
    fn test_unbalanced_near_end_of_file() {
        let l = lines("a\nb\ndef tail():\n    return 1");
        let extent = BraceBalanceExtent::default().find_extent(&l, 3);
        assert_eq!(extent.end_line, 4);
        assert_eq!(extent.body, "def tail():\n    return 1");
    }

    #[test]
    fn test_closing_before_opening_does_not_end_section() {
        let l = lines("} x {\n}\n}");
        let extent = BraceBalanceExtent::default().find_extent(&l, 1);
        // the stray `}` leaves the count below zero for the rest of the scan
        assert_eq!(extent.end_line, 3);
        assert_eq!(extent.body, "} x {\n}\n}");
    }

    #[test]
    fn test_lookahead_window_is_bounded() {
        let mut text = vec!["struct Big {"];
        text.extend(std::iter::repeat_n("  field: u8,", 600));
        text.push("}");
        let joined = text.join("\n");
        let l = lines(&joined);

        let extent = BraceBalanceExtent::default().find_extent(&l, 1);
        assert_eq!(extent.end_line, 50);

        let wide = BraceBalanceExtent::new(1000, 50).find_extent(&l, 1);
        assert_eq!(wide.end_line, 602);
    }
}
