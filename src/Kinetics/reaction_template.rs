//! # Reaction templates
//!
//! A template is the human-authored form of one process row:
//!
//! ```text
//! [1/Y_H]S_S + [?]S_O + [?]S_NH + [?]S_ALK -> X_BH
//! ```
//!
//! Each term is an optional coefficient followed by a component id. The coefficient is
//! a bracketed expression (`[1/Y_H]`, `[0.5]`, `[?]`) or a plain number (`2 S_O2`,
//! `2*S_O2`); a missing coefficient means 1. `[?]` marks a coefficient that the
//! conservation resolver must find. Coefficients are parsed once, here, into
//! `Coefficient` values.
use crate::Components::component::ConservedQuantity;
use crate::Kinetics::kinetics_errors::KineticsError;
use crate::Kinetics::symbolic::{Expr, ParsedExpr, as_const};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub enum Coefficient {
    Literal(f64),
    /// parameter-linked coefficient, e.g. `1/Y_PAO`
    Expression(ParsedExpr),
    /// `?`, solved from conservation
    Unknown,
}

impl Coefficient {
    pub fn parse(text: &str) -> Result<Coefficient, KineticsError> {
        let text = text.trim();
        if text == "?" {
            return Ok(Coefficient::Unknown);
        }
        let parsed = ParsedExpr::parse(text)?;
        Ok(match as_const(parsed.expr()) {
            Some(value) => Coefficient::Literal(value),
            None => Coefficient::Expression(parsed),
        })
    }

    /// known coefficients as an expression, `None` for `?`
    pub fn as_expr(&self) -> Option<Expr> {
        match self {
            Coefficient::Literal(v) => Some(Expr::Const(*v)),
            Coefficient::Expression(e) => Some(e.expr().clone()),
            Coefficient::Unknown => None,
        }
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Coefficient::Literal(v) => write!(f, "[{}]", v),
            Coefficient::Expression(e) => write!(f, "[{}]", e),
            Coefficient::Unknown => write!(f, "[?]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Reactant,
    Product,
}

impl Side {
    /// sign of a known coefficient written on this side
    pub fn sign(&self) -> f64 {
        match self {
            Side::Reactant => -1.0,
            Side::Product => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReactionTerm {
    pub component: String,
    pub coefficient: Coefficient,
    pub side: Side,
}

/// One process row before compilation
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionTemplate {
    pub id: String,
    pub terms: Vec<ReactionTerm>,
    pub reference: Option<String>,
    pub rate_equation: Option<ParsedExpr>,
    pub parameters: Vec<String>,
    /// overrides the collection-wide conserved quantities when set
    pub conserved_for: Option<Vec<ConservedQuantity>>,
}

fn term_regex() -> Result<&'static Regex, String> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:\[(?P<bracket>[^\]]*)\]\s*|(?P<num>\d*\.?\d+(?:[eE][+-]?\d+)?)\s*\*?\s*)?(?P<id>[A-Za-z_][A-Za-z0-9_]*)$",
        )
    })
    .as_ref()
    .map_err(|e| e.to_string())
}

/// splits a reaction side on '+' outside brackets
fn split_terms(side: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in side.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth -= 1;
                current.push(c);
            }
            '+' if depth == 0 => {
                terms.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    terms.push(current.trim().to_string());
    terms.into_iter().filter(|t| !t.is_empty()).collect()
}

impl ReactionTemplate {
    pub fn new(id: &str, reaction: &str) -> Result<Self, KineticsError> {
        Ok(ReactionTemplate {
            id: id.to_string(),
            terms: Self::parse_reaction(reaction)?,
            reference: None,
            rate_equation: None,
            parameters: Vec::new(),
            conserved_for: None,
        })
    }

    pub fn parse_reaction(reaction: &str) -> Result<Vec<ReactionTerm>, KineticsError> {
        let fail = |reason: String| KineticsError::ReactionParse {
            reaction: reaction.to_string(),
            reason,
        };
        let sides: Vec<&str> = reaction.split("->").collect();
        if sides.len() != 2 {
            return Err(fail("expected exactly one '->'".to_string()));
        }
        let re = term_regex().map_err(fail)?;
        let mut terms = Vec::new();
        let mut seen = HashSet::new();
        for (text, side) in [(sides[0], Side::Reactant), (sides[1], Side::Product)] {
            for raw in split_terms(text) {
                let caps = re
                    .captures(&raw)
                    .ok_or_else(|| fail(format!("cannot read term '{}'", raw)))?;
                let component = caps["id"].to_string();
                let coefficient = if let Some(bracket) = caps.name("bracket") {
                    Coefficient::parse(bracket.as_str())?
                } else if let Some(num) = caps.name("num") {
                    let value: f64 = num
                        .as_str()
                        .parse()
                        .map_err(|_| fail(format!("bad coefficient in '{}'", raw)))?;
                    Coefficient::Literal(value)
                } else {
                    Coefficient::Literal(1.0)
                };
                if !seen.insert(component.clone()) {
                    return Err(fail(format!("'{}' appears more than once", component)));
                }
                terms.push(ReactionTerm {
                    component,
                    coefficient,
                    side,
                });
            }
        }
        if terms.is_empty() {
            return Err(fail("no components".to_string()));
        }
        Ok(terms)
    }

    pub fn with_reference(mut self, component: &str) -> Self {
        self.reference = Some(component.to_string());
        self
    }

    pub fn with_rate(mut self, rate_equation: &str) -> Result<Self, KineticsError> {
        self.rate_equation = Some(ParsedExpr::parse(rate_equation)?);
        Ok(self)
    }

    pub fn with_parameters(mut self, parameters: &[&str]) -> Self {
        self.parameters = parameters.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_conserved_for(mut self, quantities: &[ConservedQuantity]) -> Self {
        self.conserved_for = Some(quantities.to_vec());
        self
    }

    pub fn components(&self) -> Vec<&str> {
        self.terms.iter().map(|t| t.component.as_str()).collect()
    }

    pub fn unknowns(&self) -> Vec<&str> {
        self.terms
            .iter()
            .filter(|t| t.coefficient == Coefficient::Unknown)
            .map(|t| t.component.as_str())
            .collect()
    }

    pub fn term(&self, component: &str) -> Option<&ReactionTerm> {
        self.terms.iter().find(|t| t.component == component)
    }

    /// canonical reaction text; parses back to the same terms
    pub fn reaction_string(&self) -> String {
        let side = |s: Side| {
            self.terms
                .iter()
                .filter(|t| t.side == s)
                .map(|t| match &t.coefficient {
                    Coefficient::Literal(v) if *v == 1.0 => t.component.clone(),
                    c => format!("{}{}", c, t.component),
                })
                .collect::<Vec<_>>()
                .join(" + ")
        };
        format!("{} -> {}", side(Side::Reactant), side(Side::Product))
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_terms() {
        let t = ReactionTemplate::new(
            "growth",
            "[1/Y_H]S_S + [?]S_O + 2.5 S_NH + 2*S_ALK -> X_BH + [0.5]S_N2",
        )
        .unwrap();
        assert_eq!(t.terms.len(), 6);
        assert!(matches!(t.terms[0].coefficient, Coefficient::Expression(_)));
        assert_eq!(t.terms[1].coefficient, Coefficient::Unknown);
        assert_eq!(t.terms[2].coefficient, Coefficient::Literal(2.5));
        assert_eq!(t.terms[3].coefficient, Coefficient::Literal(2.0));
        assert_eq!(t.terms[4].coefficient, Coefficient::Literal(1.0));
        assert_eq!(t.terms[4].side, Side::Product);
        assert_eq!(t.terms[5].coefficient, Coefficient::Literal(0.5));
        assert_eq!(t.unknowns(), vec!["S_O"]);
    }

    #[test]
    fn test_constant_brackets_fold_to_literals() {
        let t = ReactionTemplate::new("p", "[2*0.25]A + [-1.5e-1]B -> [?]C").unwrap();
        assert_eq!(t.terms[0].coefficient, Coefficient::Literal(0.5));
        assert_eq!(t.terms[1].coefficient, Coefficient::Literal(-0.15));
        let rate = ReactionTemplate::new("p", "A -> B").unwrap().with_rate("k**2*A");
        assert!(rate.unwrap().rate_equation.is_some());
        assert!(matches!(
            ReactionTemplate::new("p", "A -> B").unwrap().with_rate("k*(A"),
            Err(KineticsError::ExpressionParse { .. })
        ));
    }

    #[test]
    fn test_brackets_may_contain_plus() {
        let t = ReactionTemplate::new("p", "[1 + Y]A -> [?]B").unwrap();
        assert_eq!(t.components(), vec!["A", "B"]);
    }

    #[test]
    fn test_empty_sides() {
        let t = ReactionTemplate::new("decay", "X_BH -> ").unwrap();
        assert_eq!(t.terms.len(), 1);
        assert_eq!(t.reaction_string(), "X_BH ->");
    }

    #[test]
    fn test_parse_failures() {
        assert!(ReactionTemplate::new("p", "A + B").is_err());
        assert!(ReactionTemplate::new("p", "A -> B -> C").is_err());
        assert!(ReactionTemplate::new("p", "A + A -> B").is_err());
        assert!(ReactionTemplate::new("p", "[1/]A -> B").is_err());
        assert!(ReactionTemplate::new("p", "3-A -> B").is_err());
        assert!(ReactionTemplate::new("p", " -> ").is_err());
    }

    #[test]
    fn test_reaction_string_roundtrip() {
        let text = "[1/Y_A]S_NH + [?]S_O -> X_BA + [(1 - Y_A)/(2.86*Y_A)]S_NO";
        let t = ReactionTemplate::new("p", text).unwrap();
        assert_eq!(t.reaction_string(), text);
        let again = ReactionTemplate::new("p", &t.reaction_string()).unwrap();
        assert_eq!(t.terms, again.terms);
    }
}
