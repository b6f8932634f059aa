use serde::{Deserialize, Serialize};

/// Syntax used to combine selection strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// ROOT TTree syntax, joined with `&&`
    #[default]
    Root,
    /// numexpr syntax, joined with `&`
    Numexpr,
}

impl SelectionMode {
    pub fn and_op(&self) -> &'static str {
        match self {
            SelectionMode::Root => "&&",
            SelectionMode::Numexpr => "&",
        }
    }
}

/// Selection expression; `"1"` selects everything
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    expr: String,
    mode: SelectionMode,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(SelectionMode::default())
    }
}

impl Selection {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            expr: "1".to_string(),
            mode,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    /// Replace the selection (normalized through the join rules)
    pub fn set(&mut self, expr: &str) {
        self.expr = join_selection(&[expr], self.mode.and_op(), false);
    }

    /// AND (or `op`) another expression onto the current one
    pub fn add(&mut self, expr: &str, op: Option<&str>, bracket: bool) {
        let op = op.unwrap_or_else(|| self.mode.and_op());
        self.expr = join_selection(&[self.expr.as_str(), expr], op, bracket);
    }
}

/// Join selection parts with `op`
///
/// Empty parts and the trivial `"1"` are dropped, every remaining part is
/// wrapped in parentheses unless it already is, and `bracket` wraps the whole
/// result once more. Nothing left to join yields `"1"`.
pub fn join_selection(parts: &[&str], op: &str, bracket: bool) -> String {
    let parts: Vec<String> = parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty() && *part != "1")
        .map(wrap)
        .collect();

    if parts.is_empty() {
        return "1".to_string();
    }

    let joined = parts.join(&format!(" {} ", op));
    if bracket && parts.len() > 1 {
        format!("({})", joined)
    } else {
        joined
    }
}

fn wrap(part: &str) -> String {
    if is_wrapped(part) {
        part.to_string()
    } else {
        format!("({})", part)
    }
}

// true when the leading '(' closes at the very last character
fn is_wrapped(part: &str) -> bool {
    if !part.starts_with('(') || !part.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in part.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != part.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_wraps_expression() {
        let mut sel = Selection::default();
        sel.set("myBranchC > 0");
        assert_eq!(sel.as_str(), "(myBranchC > 0)");
    }

    #[test]
    fn test_add_with_bracket_and_custom_op() {
        let mut sel = Selection::default();
        sel.set("myBranchA > 0");
        sel.add("myBranchB < 100", None, true);
        assert_eq!(sel.as_str(), "((myBranchA > 0) && (myBranchB < 100))");

        sel.add("myWeight", Some("*"), false);
        assert_eq!(
            sel.as_str(),
            "((myBranchA > 0) && (myBranchB < 100)) * (myWeight)"
        );
    }

    #[test]
    fn test_numexpr_mode() {
        let mut sel = Selection::new(SelectionMode::Numexpr);
        sel.set("myBranchA > 0");
        sel.add("myBranchB < 100", None, false);
        assert_eq!(sel.as_str(), "(myBranchA > 0) & (myBranchB < 100)");
    }

    #[test]
    fn test_trivial_parts_are_dropped() {
        assert_eq!(join_selection(&["1", ""], "&&", true), "1");
        assert_eq!(join_selection(&["1", "x"], "&&", false), "(x)");
    }

    #[test]
    fn test_is_wrapped() {
        assert!(is_wrapped("(a)"));
        assert!(is_wrapped("((a) && (b))"));
        assert!(!is_wrapped("(a) && (b)"));
    }
}
