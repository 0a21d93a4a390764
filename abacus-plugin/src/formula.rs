//! Formula language for manifest plugins
//!
//! A formula is an expression over the two operands `a` and `b`:
//! decimal literals, `+ - * / ^`, unary minus, parentheses and the
//! functions `abs(x)`, `min(x, y)`, `max(x, y)`. Formulas are compiled
//! once when the plugin loads, so a bad formula is a load failure rather
//! than a calculation failure.

use abacus_core::{codes, CalcError, Number};

/// Largest exponent magnitude accepted by `^`
pub const MAX_EXPONENT: i64 = 1000;

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Number),
    Operand(Operand),
    BinaryOp(Box<Expr>, BinOp, Box<Expr>),
    Neg(Box<Expr>),
    Call(Func, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand { A, B }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp { Add, Sub, Mul, Div, Pow }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func { Abs, Min, Max }

impl Func {
    fn lookup(name: &str) -> Option<(Self, usize)> {
        match name {
            "abs" => Some((Func::Abs, 1)),
            "min" => Some((Func::Min, 2)),
            "max" => Some((Func::Max, 2)),
            _ => None,
        }
    }
}

/// A compiled formula
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Compile `source`, rejecting syntax errors, unknown variables and
    /// unknown functions.
    pub fn parse(source: &str) -> Result<Self, CalcError> {
        let expr = parse_expr(source).map_err(|details| {
            CalcError::new(codes::PARSE_ERROR, format!("Invalid formula '{}': {}", source.trim(), details))
                .with_suggestion("Formulas may use a, b, numbers, + - * / ^, parentheses, abs, min, max")
        })?;
        Ok(Self { source: source.trim().to_string(), expr })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn eval(&self, a: &Number, b: &Number) -> Result<Number, CalcError> {
        eval_expr(&self.expr, a, b)
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

// ========== Parsing ==========

type ParseResult = Result<Expr, String>;

fn parse_expr(input: &str) -> ParseResult {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty expression".to_string());
    }
    parse_additive(input)
}

/// True when the sign at `idx` is a binary operator rather than a unary
/// sign or part of an exponent literal such as `1e-3`.
fn is_binary_sign(chars: &[(usize, char)], idx: usize) -> bool {
    let before: Vec<char> = chars[..idx].iter().map(|&(_, c)| c).collect();
    let prev = match before.iter().rev().find(|c| !c.is_whitespace()) {
        Some(&c) => c,
        None => return false,
    };
    if matches!(prev, '+' | '-' | '*' | '/' | '^' | '(' | ',') {
        return false;
    }
    // Exponent sign: directly after 'e' that follows a digit
    if matches!(before.last(), Some('e') | Some('E')) {
        let len = before.len();
        if len >= 2 && (before[len - 2].is_ascii_digit() || before[len - 2] == '.') {
            return false;
        }
    }
    true
}

fn parse_additive(input: &str) -> ParseResult {
    // Find the rightmost + or - outside parentheses (left associative)
    let mut paren_depth = 0;
    let char_indices: Vec<(usize, char)> = input.char_indices().collect();

    for idx in (0..char_indices.len()).rev() {
        let (byte_pos, c) = char_indices[idx];
        match c {
            ')' => paren_depth += 1,
            '(' => paren_depth -= 1,
            '+' | '-' if paren_depth == 0 && is_binary_sign(&char_indices, idx) => {
                let left = input[..byte_pos].trim();
                let right = input[byte_pos + c.len_utf8()..].trim();
                if right.is_empty() {
                    return Err(format!("missing operand after '{}'", c));
                }
                let op = if c == '+' { BinOp::Add } else { BinOp::Sub };
                return Ok(Expr::BinaryOp(
                    Box::new(parse_additive(left)?),
                    op,
                    Box::new(parse_multiplicative(right)?),
                ));
            }
            _ => {}
        }
    }

    parse_multiplicative(input)
}

fn parse_multiplicative(input: &str) -> ParseResult {
    let mut paren_depth = 0;
    let char_indices: Vec<(usize, char)> = input.char_indices().collect();

    for idx in (0..char_indices.len()).rev() {
        let (byte_pos, c) = char_indices[idx];
        match c {
            ')' => paren_depth += 1,
            '(' => paren_depth -= 1,
            '*' | '/' if paren_depth == 0 => {
                let left = input[..byte_pos].trim();
                let right = input[byte_pos + c.len_utf8()..].trim();
                if left.is_empty() || right.is_empty() {
                    return Err(format!("missing operand around '{}'", c));
                }
                let op = if c == '*' { BinOp::Mul } else { BinOp::Div };
                return Ok(Expr::BinaryOp(
                    Box::new(parse_multiplicative(left)?),
                    op,
                    Box::new(parse_unary(right)?),
                ));
            }
            _ => {}
        }
    }

    parse_unary(input)
}

fn parse_unary(input: &str) -> ParseResult {
    let input = input.trim();
    if let Some(rest) = input.strip_prefix('-') {
        // Keep negative literals as literals
        if let Ok(n) = input.parse::<Number>() {
            return Ok(Expr::Literal(n));
        }
        return Ok(Expr::Neg(Box::new(parse_unary(rest)?)));
    }
    if let Some(rest) = input.strip_prefix('+') {
        return parse_unary(rest);
    }
    parse_power(input)
}

fn parse_power(input: &str) -> ParseResult {
    let mut paren_depth = 0;

    for (byte_pos, c) in input.char_indices() {
        match c {
            '(' => paren_depth += 1,
            ')' => paren_depth -= 1,
            '^' if paren_depth == 0 => {
                let left = input[..byte_pos].trim();
                let right = input[byte_pos + c.len_utf8()..].trim();
                if left.is_empty() || right.is_empty() {
                    return Err("missing operand around '^'".to_string());
                }
                // Right associative: a ^ b ^ c == a ^ (b ^ c)
                return Ok(Expr::BinaryOp(
                    Box::new(parse_primary(left)?),
                    BinOp::Pow,
                    Box::new(parse_unary(right)?),
                ));
            }
            _ => {}
        }
    }

    parse_primary(input)
}

fn parse_primary(input: &str) -> ParseResult {
    let input = input.trim();
    if input.is_empty() {
        return Err("missing operand".to_string());
    }

    // Parentheses
    if input.starts_with('(') && input.ends_with(')') {
        return parse_expr(&input[1..input.len() - 1]);
    }

    // Function call
    if let Some(paren_pos) = input.find('(') {
        let name = input[..paren_pos].trim();
        let after_open = &input[paren_pos + 1..];
        let close_idx = matching_paren(after_open)
            .ok_or_else(|| format!("unbalanced parentheses in '{}'", input))?;
        if !after_open[close_idx + 1..].trim().is_empty() {
            return Err(format!("unexpected text after '{}(...)'", name));
        }
        let (func, arity) = Func::lookup(name)
            .ok_or_else(|| format!("unknown function '{}'", name))?;
        let args = parse_args(&after_open[..close_idx])?;
        if args.len() != arity {
            return Err(format!("{}() expects {} arguments, got {}", name, arity, args.len()));
        }
        return Ok(Expr::Call(func, args));
    }

    if input.contains(')') {
        return Err(format!("unbalanced parentheses in '{}'", input));
    }

    // Number
    if input.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.') {
        return input
            .parse::<Number>()
            .map(Expr::Literal)
            .map_err(|_| format!("invalid number '{}'", input));
    }

    match input {
        "a" => Ok(Expr::Operand(Operand::A)),
        "b" => Ok(Expr::Operand(Operand::B)),
        other => Err(format!("unknown variable '{}' (only a and b are defined)", other)),
    }
}

/// Byte index of the parenthesis closing an already-opened group
fn matching_paren(after_open: &str) -> Option<usize> {
    let mut depth = 1;
    for (i, c) in after_open.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_args(input: &str) -> Result<Vec<Expr>, String> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut args = Vec::new();
    let mut paren_depth = 0;
    let mut current_start = 0;

    for (byte_pos, c) in input.char_indices() {
        match c {
            '(' => paren_depth += 1,
            ')' => paren_depth -= 1,
            ',' if paren_depth == 0 => {
                args.push(parse_expr(&input[current_start..byte_pos])?);
                current_start = byte_pos + c.len_utf8();
            }
            _ => {}
        }
    }

    args.push(parse_expr(&input[current_start..])?);
    Ok(args)
}

// ========== Evaluation ==========

fn eval_expr(expr: &Expr, a: &Number, b: &Number) -> Result<Number, CalcError> {
    match expr {
        Expr::Literal(n) => Ok(n.clone()),
        Expr::Operand(Operand::A) => Ok(a.clone()),
        Expr::Operand(Operand::B) => Ok(b.clone()),
        Expr::Neg(inner) => Ok(eval_expr(inner, a, b)?.neg()),
        Expr::BinaryOp(left, op, right) => {
            let l = eval_expr(left, a, b)?;
            let r = eval_expr(right, a, b)?;
            eval_binary_op(&l, *op, &r)
        }
        Expr::Call(func, args) => {
            let values = args
                .iter()
                .map(|arg| eval_expr(arg, a, b))
                .collect::<Result<Vec<_>, _>>()?;
            match (func, values.as_slice()) {
                (Func::Abs, [x]) => Ok(x.abs()),
                (Func::Min, [x, y]) => Ok(x.min(y).clone()),
                (Func::Max, [x, y]) => Ok(x.max(y).clone()),
                _ => Err(CalcError::internal("function arity was not validated")),
            }
        }
    }
}

fn eval_binary_op(l: &Number, op: BinOp, r: &Number) -> Result<Number, CalcError> {
    match op {
        BinOp::Add => Ok(l.add(r)?),
        BinOp::Sub => Ok(l.sub(r)?),
        BinOp::Mul => Ok(l.mul(r)?),
        BinOp::Div => Ok(l.checked_div(r)?),
        BinOp::Pow => {
            let exp = r
                .to_i64()
                .filter(|e| e.abs() <= MAX_EXPONENT)
                .ok_or_else(|| CalcError::domain_error(format!(
                    "exponent must be an integer between -{0} and {0}, got {1}",
                    MAX_EXPONENT, r
                )))?;
            // Bounded above, so the cast cannot truncate
            Ok(l.pow(exp as i32)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> Number {
        s.parse().unwrap()
    }

    fn eval(src: &str, a: &str, b: &str) -> Result<Number, CalcError> {
        Formula::parse(src).unwrap().eval(&num(a), &num(b))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("a + b * 2", "1", "3").unwrap(), num("7"));
        assert_eq!(eval("(a + b) * 2", "1", "3").unwrap(), num("8"));
        assert_eq!(eval("a - b - 1", "10", "3").unwrap(), num("6"));
        assert_eq!(eval("a / b / 2", "20", "5").unwrap(), num("2"));
    }

    #[test]
    fn test_mean_formula() {
        assert_eq!(eval("(a + b) / 2", "5", "3").unwrap(), num("4"));
        assert_eq!(eval("(a + b) / 2", "1", "2").unwrap(), num("1.5"));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval("-a + b", "2", "5").unwrap(), num("3"));
        assert_eq!(eval("a * -b", "2", "5").unwrap(), num("-10"));
        assert_eq!(eval("-(a - b)", "2", "5").unwrap(), num("3"));
    }

    #[test]
    fn test_power() {
        assert_eq!(eval("a ^ b", "2", "10").unwrap(), num("1024"));
        assert_eq!(eval("2 ^ 3 ^ 2", "0", "0").unwrap(), num("512"));
        assert_eq!(eval("a ^ -1", "4", "0").unwrap(), num("0.25"));
        let err = eval("a ^ b", "2", "0.5").unwrap_err();
        assert_eq!(err.code, codes::DOMAIN_ERROR);
        let err = eval("a ^ b", "2", "5000").unwrap_err();
        assert_eq!(err.code, codes::DOMAIN_ERROR);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("abs(a - b)", "2", "5").unwrap(), num("3"));
        assert_eq!(eval("min(a, b)", "2", "5").unwrap(), num("2"));
        assert_eq!(eval("max(a, b) * 2", "2", "5").unwrap(), num("10"));
        assert_eq!(eval("max(abs(a), min(b, 1))", "-7", "5").unwrap(), num("7"));
    }

    #[test]
    fn test_scientific_literal() {
        assert_eq!(eval("a * 1e-2", "250", "0").unwrap(), num("2.5"));
        assert_eq!(eval("a * 1.5e2", "2", "0").unwrap(), num("300"));
    }

    #[test]
    fn test_division_by_zero_at_runtime() {
        let err = eval("a / b", "1", "0").unwrap_err();
        assert_eq!(err.code, codes::DIV_ZERO);
        assert_eq!(err.message, "Cannot divide by zero.");
    }

    #[test]
    fn test_rejects_invalid_formulas() {
        for bad in ["", "a +", "* b", "c + 1", "sqrt(a)", "min(a)", "(a + b", "a + b)", "abs(a) b", "1..2"] {
            let err = Formula::parse(bad).unwrap_err();
            assert_eq!(err.code, codes::PARSE_ERROR, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_source_is_trimmed() {
        let f = Formula::parse("  a * b / 100 ").unwrap();
        assert_eq!(f.source(), "a * b / 100");
        assert_eq!(f.to_string(), "a * b / 100");
    }
}
