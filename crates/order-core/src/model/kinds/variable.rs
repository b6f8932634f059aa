use serde::{Deserialize, Serialize};

use super::label::to_root_latex;
use super::selection::{Selection, SelectionMode};
use super::{builtin_relations_named, CATEGORY_VARIABLES, VARIABLE};
use crate::errors::{OrderError, Result};
use crate::model::{FromIdentity, HasIdentity, HasRelations, IdSpec, UniqueObject};
use crate::ops::relations::RelationDecl;
use crate::unique_object;

/// Histogram binning `(bins, min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Binning {
    pub bins: u32,
    pub min: f64,
    pub max: f64,
}

impl Default for Binning {
    fn default() -> Self {
        Self {
            bins: 1,
            min: 0.0,
            max: 1.0,
        }
    }
}

impl Binning {
    pub fn new(bins: u32, min: f64, max: f64) -> Self {
        Self { bins, min, max }
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / f64::from(self.bins)
    }
}

/// Options for [`Variable::full_title`]
#[derive(Debug, Clone, PartialEq)]
pub struct TitleOptions {
    /// Histogram name, defaults to the variable name
    pub name: Option<String>,
    pub short_x: bool,
    pub short_y: bool,
    pub root: bool,
    pub bin_width: Option<f64>,
}

impl Default for TitleOptions {
    fn default() -> Self {
        Self {
            name: None,
            short_x: false,
            short_y: false,
            root: true,
            bin_width: None,
        }
    }
}

impl TitleOptions {
    /// Use the short form on both axes
    pub fn short() -> Self {
        Self {
            short_x: true,
            short_y: true,
            ..Self::default()
        }
    }
}

/// Variable - a quantity that is histogrammed, with plotting metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    unique: UniqueObject,
    expression: Option<String>,
    binning: Binning,
    x_title: String,
    x_title_short: Option<String>,
    y_title: String,
    y_title_short: Option<String>,
    unit: Option<String>,
    log_x: bool,
    log_y: bool,
    selection: Selection,
}

unique_object!(Variable, unique);

impl Variable {
    /// Create a new, unregistered variable
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentity` for an invalid name or id.
    pub fn new(name: impl Into<String>, id: impl Into<IdSpec>) -> Result<Self> {
        Ok(Self::from_unique(UniqueObject::new(VARIABLE, name, id)?))
    }

    /// Expression to evaluate, defaults to the variable name
    pub fn expression(&self) -> &str {
        self.expression.as_deref().unwrap_or_else(|| self.name())
    }

    /// Set the expression; `None` restores the default
    ///
    /// # Errors
    ///
    /// Returns `InvalidAttribute` for an empty expression.
    pub fn set_expression(&mut self, expression: Option<String>) -> Result<()> {
        if let Some(expr) = &expression {
            if expr.trim().is_empty() {
                return Err(self.invalid("expression", "cannot be empty".to_string()));
            }
        }
        self.expression = expression;
        Ok(())
    }

    pub fn binning(&self) -> Binning {
        self.binning
    }

    /// Set the binning
    ///
    /// # Errors
    ///
    /// Returns `InvalidAttribute` for zero bins or a non-finite or empty range.
    pub fn set_binning(&mut self, binning: Binning) -> Result<()> {
        if binning.bins == 0 {
            return Err(self.invalid("binning", "needs at least one bin".to_string()));
        }
        if !binning.min.is_finite() || !binning.max.is_finite() || binning.max <= binning.min {
            return Err(self.invalid(
                "binning",
                format!("invalid range [{}, {}]", binning.min, binning.max),
            ));
        }
        self.binning = binning;
        Ok(())
    }

    pub fn bin_width(&self) -> f64 {
        self.binning.bin_width()
    }

    pub fn x_title(&self) -> &str {
        &self.x_title
    }

    pub fn set_x_title(&mut self, x_title: impl Into<String>) {
        self.x_title = x_title.into();
    }

    pub fn x_title_short(&self) -> &str {
        self.x_title_short.as_deref().unwrap_or(&self.x_title)
    }

    pub fn set_x_title_short(&mut self, x_title_short: Option<String>) {
        self.x_title_short = x_title_short;
    }

    pub fn y_title(&self) -> &str {
        &self.y_title
    }

    pub fn set_y_title(&mut self, y_title: impl Into<String>) {
        self.y_title = y_title.into();
    }

    pub fn y_title_short(&self) -> &str {
        self.y_title_short.as_deref().unwrap_or(&self.y_title)
    }

    pub fn set_y_title_short(&mut self, y_title_short: Option<String>) {
        self.y_title_short = y_title_short;
    }

    /// Unit shown on both axes; `None` and `"1"` show no unit
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn set_unit(&mut self, unit: Option<String>) {
        self.unit = unit;
    }

    pub fn log_x(&self) -> bool {
        self.log_x
    }

    pub fn set_log_x(&mut self, log_x: bool) {
        self.log_x = log_x;
    }

    pub fn log_y(&self) -> bool {
        self.log_y
    }

    pub fn set_log_y(&mut self, log_y: bool) {
        self.log_y = log_y;
    }

    pub fn selection(&self) -> &str {
        self.selection.as_str()
    }

    pub fn set_selection(&mut self, selection: &str) {
        self.selection.set(selection);
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.selection.set_mode(mode);
    }

    pub fn add_selection(&mut self, selection: &str, op: Option<&str>, bracket: bool) {
        self.selection.add(selection, op, bracket);
    }

    /// x-axis title including the unit
    pub fn full_x_title(&self, short: bool, root: bool) -> String {
        let mut title = if short {
            self.x_title_short().to_string()
        } else {
            self.x_title.clone()
        };
        if let Some(unit) = self.shown_unit() {
            title.push_str(&format!(" [{}]", unit));
        }
        if root {
            to_root_latex(&title)
        } else {
            title
        }
    }

    /// y-axis title including bin width and unit
    ///
    /// Without an explicit `bin_width` the binning's width is used, rounded
    /// to two decimals.
    pub fn full_y_title(&self, bin_width: Option<f64>, short: bool, root: bool) -> String {
        let mut title = if short {
            self.y_title_short().to_string()
        } else {
            self.y_title.clone()
        };
        let bin_width = bin_width.unwrap_or_else(|| (self.bin_width() * 100.0).round() / 100.0);
        title.push_str(&format!(" / {}", format_number(bin_width)));
        if let Some(unit) = self.shown_unit() {
            title.push_str(&format!(" {}", unit));
        }
        if root {
            to_root_latex(&title)
        } else {
            title
        }
    }

    /// Combined `name;x-title;y-title` as understood by ROOT histograms
    pub fn full_title(&self, options: &TitleOptions) -> String {
        let name = options.name.as_deref().unwrap_or_else(|| self.name());
        let x_title = self.full_x_title(options.short_x, options.root);
        let y_title = self.full_y_title(options.bin_width, options.short_y, options.root);
        [name, x_title.as_str(), y_title.as_str()].join(";")
    }

    fn shown_unit(&self) -> Option<&str> {
        self.unit.as_deref().filter(|unit| *unit != "1")
    }

    fn invalid(&self, attribute: &str, reason: String) -> OrderError {
        OrderError::InvalidAttribute {
            object: self.name().to_string(),
            attribute: attribute.to_string(),
            reason,
        }
    }
}

// integral values keep one decimal ("1.0"), others print as-is ("0.25")
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

impl FromIdentity for Variable {
    fn from_unique(unique: UniqueObject) -> Self {
        Self {
            unique,
            expression: None,
            binning: Binning::default(),
            x_title: String::new(),
            x_title_short: None,
            y_title: "Entries".to_string(),
            y_title_short: None,
            unit: Some("1".to_string()),
            log_x: false,
            log_y: false,
            selection: Selection::default(),
        }
    }
}

impl HasRelations for Variable {
    fn relation_decls() -> Vec<RelationDecl> {
        builtin_relations_named(&[CATEGORY_VARIABLES])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_var(name: &str) -> Variable {
        let mut var = Variable::new(name, IdSpec::Auto).unwrap();
        var.set_expression(Some("myBranchA * myBranchB".to_string()))
            .unwrap();
        var.set_selection("myBranchC > 0");
        var.set_binning(Binning::new(20, 0.0, 10.0)).unwrap();
        var.set_x_title("p_{T}");
        var.set_unit(Some("GeV".to_string()));
        var
    }

    #[test]
    fn test_defaults() {
        let var = Variable::new("pt", IdSpec::Auto).unwrap();
        assert_eq!(var.expression(), "pt");
        assert_eq!(var.binning(), Binning::new(1, 0.0, 1.0));
        assert_eq!(var.y_title(), "Entries");
        assert_eq!(var.unit(), Some("1"));
        assert_eq!(var.full_y_title(None, false, false), "Entries / 1.0");
    }

    #[test]
    fn test_constructor_title() {
        let var = make_var("constructor_var");
        assert_eq!(var.expression(), "myBranchA * myBranchB");
        assert_eq!(var.selection(), "(myBranchC > 0)");
        assert_eq!(
            var.full_title(&TitleOptions::default()),
            "constructor_var;p_{T} [GeV];Entries / 0.5 GeV"
        );
    }

    #[test]
    fn test_titles() {
        let mut var = make_var("foo");
        var.set_x_title("Muon transverse momentum");
        var.set_x_title_short(Some("$\\mu p_{T}$".to_string()));
        var.set_y_title_short(Some("N".to_string()));
        var.set_binning(Binning::new(40, 0.0, 10.0)).unwrap();

        assert_eq!(
            var.full_x_title(false, false),
            "Muon transverse momentum [GeV]"
        );
        assert_eq!(var.full_x_title(true, false), "$\\mu p_{T}$ [GeV]");
        assert_eq!(var.full_x_title(true, true), "#mu p_{T} [GeV]");
        assert_eq!(var.full_y_title(None, false, false), "Entries / 0.25 GeV");
        assert_eq!(var.full_y_title(Some(0.2), false, false), "Entries / 0.2 GeV");
        assert_eq!(var.full_y_title(None, true, false), "N / 0.25 GeV");
        assert_eq!(
            var.full_title(&TitleOptions::short()),
            "foo;#mu p_{T} [GeV];N / 0.25 GeV"
        );
    }

    #[test]
    fn test_short_titles_fall_back() {
        let mut var = make_var("fallback");
        var.set_x_title_short(Some("bar".to_string()));
        assert_eq!(var.x_title_short(), "bar");
        var.set_x_title_short(None);
        assert_eq!(var.x_title_short(), "p_{T}");
    }

    #[test]
    fn test_invalid_attributes() {
        let mut var = make_var("invalid");
        assert!(matches!(
            var.set_expression(Some(" ".to_string())),
            Err(OrderError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            var.set_binning(Binning::new(0, 0.0, 1.0)),
            Err(OrderError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            var.set_binning(Binning::new(10, 1.0, 1.0)),
            Err(OrderError::InvalidAttribute { .. })
        ));
        assert_eq!(var.expression(), "myBranchA * myBranchB");
    }
}
