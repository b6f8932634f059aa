use serde::{Deserialize, Serialize};

/// Display label with an optional short form
///
/// Both forms fall back: the label to the owning object's name, the short
/// label to the label.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Label {
    label: Option<String>,
    short: Option<String>,
}

impl Label {
    pub fn new(label: Option<String>, short: Option<String>) -> Self {
        Self { label, short }
    }

    pub fn label<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(fallback)
    }

    pub fn short<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.short.as_deref().unwrap_or_else(|| self.label(fallback))
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub fn set_short(&mut self, short: Option<String>) {
        self.short = short;
    }
}

/// Convert a LaTeX string to ROOT's `#`-flavoured notation
///
/// Strips math delimiters and thin spaces, turns `~` into a space,
/// unescapes braces and replaces the remaining backslashes with `#`.
pub fn to_root_latex(text: &str) -> String {
    text.replace("\\,", "")
        .replace("\\;", "")
        .replace('$', "")
        .replace('~', " ")
        .replace("\\{", "{")
        .replace("\\}", "}")
        .replace('\\', "#")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallbacks() {
        let mut label = Label::default();
        assert_eq!(label.label("muon"), "muon");
        assert_eq!(label.short("muon"), "muon");

        label.set_label(Some("Muon".to_string()));
        assert_eq!(label.short("muon"), "Muon");

        label.set_short(Some("$\\mu$".to_string()));
        assert_eq!(label.short("muon"), "$\\mu$");
    }

    #[test]
    fn test_to_root_latex() {
        assert_eq!(to_root_latex("$\\mu p_{T}$"), "#mu p_{T}");
        assert_eq!(to_root_latex("a~b\\,c"), "a bc");
        assert_eq!(to_root_latex("\\{x\\}"), "{x}");
    }
}
