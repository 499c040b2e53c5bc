//! # Symbolic expressions
//!
//! ## Aim
//! Rate laws and parameter-linked stoichiometric coefficients are RustedSciThe `Expr`
//! trees. This module adds what a process model needs on top of the symbolic engine:
//! - `parse_expression`: checks the text first (balanced parentheses, operand/operator
//!   order, known functions) and rewrites the forms the engine does not read
//!   (`**`, exponent notation, unary minus) before handing it to
//!   `Expr::parse_expression`, so malformed input is an error value instead of a panic
//! - `evaluate`: a checked walk of the tree; division by exactly zero, a negative base
//!   raised to a non-integer power, the logarithm of a non-positive number and overflow
//!   are reported as `NumericDomainError` instead of producing NaN
//! - `BoundExpr`: an expression whose variables are resolved once to concentration or
//!   parameter slots
//!
//! Functions accepted in expressions: `exp`, `ln` (`log` is read as `ln`).
use crate::Kinetics::kinetics_errors::{KineticsError, NumericDomainError};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::OnceLock;

pub use RustedSciThe::symbolic::symbolic_engine::Expr;

fn finite(value: f64) -> Result<f64, NumericDomainError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(NumericDomainError::NonFinite { value })
    }
}

pub(crate) fn checked_div(a: f64, b: f64) -> Result<f64, NumericDomainError> {
    if b == 0.0 {
        return Err(NumericDomainError::DivisionByZero { numerator: a });
    }
    finite(a / b)
}

pub(crate) fn checked_pow(base: f64, exponent: f64) -> Result<f64, NumericDomainError> {
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(NumericDomainError::NegativeFractionalPower { base, exponent });
    }
    if base == 0.0 && exponent < 0.0 {
        return Err(NumericDomainError::DivisionByZero { numerator: 1.0 });
    }
    finite(base.powf(exponent))
}

pub(crate) fn checked_ln(x: f64) -> Result<f64, NumericDomainError> {
    if x <= 0.0 {
        return Err(NumericDomainError::LogOfNonPositive { value: x });
    }
    finite(x.ln())
}

////////////////////////////PARSING////////////////////////////////////

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    /// one of `+ - * / ^`, `**` is read as `^`
    Op(char),
    Open,
    Close,
}

fn token_regex() -> Result<&'static Regex, String> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\s*(?:(?P<num>(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)|(?P<id>[A-Za-z_][A-Za-z0-9_]*)|(?P<op>\*\*|[-+*/^])|(?P<open>\()|(?P<close>\)))",
        )
    })
    .as_ref()
    .map_err(|e| e.to_string())
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let re = token_regex()?;
    let mut tokens = Vec::new();
    let mut end = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() != end {
            return Err(format!("unexpected character at {}", end));
        }
        end = whole.end();
        let token = if let Some(num) = caps.name("num") {
            let value: f64 = num
                .as_str()
                .parse()
                .map_err(|_| format!("bad number '{}'", num.as_str()))?;
            Token::Number(value)
        } else if let Some(id) = caps.name("id") {
            Token::Ident(id.as_str().to_string())
        } else if let Some(op) = caps.name("op") {
            match op.as_str() {
                "**" => Token::Op('^'),
                other => Token::Op(other.chars().next().unwrap_or('+')),
            }
        } else if caps.name("open").is_some() {
            Token::Open
        } else {
            Token::Close
        };
        tokens.push(token);
    }
    if !text[end..].trim().is_empty() {
        return Err(format!("unexpected character at {}", end));
    }
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    Ok(tokens)
}

fn function_name(name: &str) -> Option<&'static str> {
    match name {
        "exp" => Some("exp"),
        "ln" | "log" => Some("ln"),
        _ => None,
    }
}

/// Plain decimal text of a literal; exponent notation is not read by the engine.
fn number_text(value: f64) -> String {
    format!("{}", value)
}

/// Checks the token sequence and writes it in the syntax `Expr::parse_expression` reads.
/// A unary minus becomes `(0-1)*`, or `(0-x)` right after `/` and `^` where `x` must be
/// a plain number or name.
fn normalize(tokens: &[Token]) -> Result<String, String> {
    let mut out = String::new();
    let mut depth = 0usize;
    let mut expect_operand = true;
    let mut previous: Option<&Token> = None;
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if expect_operand {
            match token {
                Token::Number(v) => {
                    out.push_str(&number_text(*v));
                    expect_operand = false;
                }
                Token::Ident(name) => {
                    if let Some(Token::Open) = tokens.get(i + 1) {
                        let function =
                            function_name(name).ok_or(format!("unknown function '{}'", name))?;
                        out.push_str(function);
                        out.push('(');
                        depth += 1;
                        i += 1;
                    } else {
                        out.push_str(name);
                        expect_operand = false;
                    }
                }
                Token::Open => {
                    out.push('(');
                    depth += 1;
                }
                Token::Op('+') => {}
                Token::Op('-') => match previous {
                    Some(Token::Op('/')) | Some(Token::Op('^')) => {
                        let operand = match (tokens.get(i + 1), tokens.get(i + 2)) {
                            (Some(Token::Number(v)), next) if !matches!(next, Some(Token::Op('^'))) => {
                                number_text(*v)
                            }
                            (Some(Token::Ident(name)), next)
                                if !matches!(next, Some(Token::Op('^')) | Some(Token::Open)) =>
                            {
                                name.clone()
                            }
                            _ => return Err("put a negative divisor or exponent in parentheses".to_string()),
                        };
                        out.push_str(&format!("(0-{})", operand));
                        expect_operand = false;
                        i += 1;
                    }
                    _ => out.push_str("(0-1)*"),
                },
                Token::Op(op) => return Err(format!("operator '{}' without a left operand", op)),
                Token::Close => return Err("expected an operand before ')'".to_string()),
            }
        } else {
            match token {
                Token::Op(op) => {
                    out.push(*op);
                    expect_operand = true;
                }
                Token::Close => {
                    if depth == 0 {
                        return Err("unbalanced ')'".to_string());
                    }
                    depth -= 1;
                    out.push(')');
                }
                _ => return Err("missing operator between operands".to_string()),
            }
        }
        previous = Some(token);
        i += 1;
    }
    if expect_operand {
        return Err("expression ends without an operand".to_string());
    }
    if depth != 0 {
        return Err("missing ')'".to_string());
    }
    Ok(out)
}

/// Parses `text` into a RustedSciThe expression.
pub fn parse_expression(text: &str) -> Result<Expr, KineticsError> {
    let fail = |reason: String| KineticsError::ExpressionParse {
        expression: text.to_string(),
        reason,
    };
    let tokens = tokenize(text).map_err(fail)?;
    let normalized = normalize(&tokens).map_err(fail)?;
    Ok(Expr::parse_expression(&normalized))
}

/// An expression together with the text it was written as. Printing gives the
/// text back unchanged, so templates render exactly as they were authored.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpr {
    text: String,
    expr: Expr,
}

impl ParsedExpr {
    pub fn parse(text: &str) -> Result<ParsedExpr, KineticsError> {
        let text = text.trim();
        Ok(ParsedExpr {
            text: text.to_string(),
            expr: parse_expression(text)?,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl fmt::Display for ParsedExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

////////////////////////////INSPECTION AND EVALUATION////////////////////////////////////

/// Variable names of `expr`, sorted.
pub fn variables(expr: &Expr) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_variables(expr, &mut out);
    out
}

fn collect_variables(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Const(_) => {}
        Expr::Var(name) => {
            out.insert(name.clone());
        }
        Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
            collect_variables(a, out);
            collect_variables(b, out);
        }
        Expr::Exp(a) | Expr::Ln(a) => collect_variables(a, out),
        other => out.extend(
            other
                .all_arguments_are_variables()
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        ),
    }
}

/// Value of an expression without variables.
pub fn as_const(expr: &Expr) -> Option<f64> {
    if !variables(expr).is_empty() {
        return None;
    }
    evaluate(expr, &|_: &str| None).ok()
}

/// Checked evaluation; `lookup` supplies the value of every variable.
pub fn evaluate<F>(expr: &Expr, lookup: &F) -> Result<f64, NumericDomainError>
where
    F: Fn(&str) -> Option<f64>,
{
    match expr {
        Expr::Const(c) => finite(*c),
        Expr::Var(name) => match lookup(name) {
            Some(value) => finite(value),
            None => Err(NumericDomainError::UnboundVariable { name: name.clone() }),
        },
        Expr::Add(a, b) => finite(evaluate(a, lookup)? + evaluate(b, lookup)?),
        Expr::Sub(a, b) => finite(evaluate(a, lookup)? - evaluate(b, lookup)?),
        Expr::Mul(a, b) => finite(evaluate(a, lookup)? * evaluate(b, lookup)?),
        Expr::Div(a, b) => checked_div(evaluate(a, lookup)?, evaluate(b, lookup)?),
        Expr::Pow(a, b) => checked_pow(evaluate(a, lookup)?, evaluate(b, lookup)?),
        Expr::Exp(a) => finite(evaluate(a, lookup)?.exp()),
        Expr::Ln(a) => checked_ln(evaluate(a, lookup)?),
        other => {
            // forms without a checked rule: substitute and let the engine fold
            let mut bound = other.clone();
            for name in variables(other) {
                let value = lookup(&name).ok_or(NumericDomainError::UnboundVariable {
                    name: name.clone(),
                })?;
                bound = bound.set_variable(&name, value);
            }
            match bound.symplify() {
                Expr::Const(c) => finite(c),
                _ => Err(NumericDomainError::Unsupported {
                    expression: other.to_string(),
                }),
            }
        }
    }
}

/// `expr` with the given variables replaced by numbers, folded.
pub fn substitute(expr: &Expr, values: &[(&str, f64)]) -> Expr {
    let present = variables(expr);
    let mut out = expr.clone();
    for (name, value) in values {
        if present.contains(*name) {
            out = out.set_variable(name, *value);
        }
    }
    out.symplify()
}

/// Where a bound variable reads its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Concentration(usize),
    Parameter(usize),
}

/// Expression with every variable resolved to a slot
#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpr {
    expr: Expr,
    slots: HashMap<String, Slot>,
}

impl BoundExpr {
    pub fn constant(value: f64) -> BoundExpr {
        BoundExpr {
            expr: Expr::Const(value),
            slots: HashMap::new(),
        }
    }

    /// Resolves every variable through `resolve`; the first unresolved name (in sorted
    /// order) is returned as the error.
    pub fn bind<F>(expr: &Expr, resolve: &F) -> Result<BoundExpr, String>
    where
        F: Fn(&str) -> Option<Slot>,
    {
        let mut slots = HashMap::new();
        for name in variables(expr) {
            let slot = resolve(&name).ok_or_else(|| name.clone())?;
            slots.insert(name, slot);
        }
        Ok(BoundExpr {
            expr: expr.clone(),
            slots,
        })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn eval(&self, concentrations: &[f64], parameters: &[f64]) -> Result<f64, NumericDomainError> {
        evaluate(&self.expr, &|name: &str| match self.slots.get(name)? {
            Slot::Concentration(i) => concentrations.get(*i).copied(),
            Slot::Parameter(i) => parameters.get(*i).copied(),
        })
    }
}
