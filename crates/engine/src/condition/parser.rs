// Condition parser - converts raw condition text into an AST
// Supports: numbers, quoted strings, True/False, column names (bare or `backticked`),
// comparisons (==, !=, <, <=, >, >=), in / not in, arithmetic (+, -, *, /),
// logical operators (&, |, ~, and, or, not), grouping, and the column methods
// .between(lo, hi), .isin([...]), .isna(), .notna()

use crate::error::LmError;

use super::Literal;

/// Generic condition AST, parameterized over the column reference type.
/// - Parser outputs `ParsedExpr = Expr<String>` (column names unresolved)
/// - After binding against a table, becomes `BoundExpr = Expr<usize>`
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<C> {
    Literal(Literal),
    Column(C),
    Compare {
        op: CmpOp,
        left: Box<Expr<C>>,
        right: Box<Expr<C>>,
    },
    Arith {
        op: ArithOp,
        left: Box<Expr<C>>,
        right: Box<Expr<C>>,
    },
    And(Box<Expr<C>>, Box<Expr<C>>),
    Or(Box<Expr<C>>, Box<Expr<C>>),
    Not(Box<Expr<C>>),
    Neg(Box<Expr<C>>),
    /// `target.between(low, high)`, inclusive on both ends
    Between {
        target: Box<Expr<C>>,
        low: Box<Expr<C>>,
        high: Box<Expr<C>>,
    },
    /// `target.isin([...])`, `target in [...]`, `target not in [...]`
    IsIn {
        target: Box<Expr<C>>,
        values: Vec<Literal>,
        negated: bool,
    },
    /// `target.isna()` / `target.notna()`
    IsMissing {
        target: Box<Expr<C>>,
        negated: bool,
    },
}

/// Parser output: column names are unresolved
pub type ParsedExpr = Expr<String>;

/// Bound expression: column names resolved to table positions
pub type BoundExpr = Expr<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,    // ==
    NotEq, // !=
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Parse condition text into an unbound AST.
/// Call `bind_expr()` with a column resolver before evaluation.
pub fn parse(text: &str) -> Result<ParsedExpr, LmError> {
    let syntax = |message: String| LmError::ExpressionSyntax {
        expr: text.to_string(),
        message,
    };

    let tokens = tokenize(text).map_err(syntax)?;
    if tokens.is_empty() {
        return Err(syntax("empty condition".to_string()));
    }
    let (expr, pos) = parse_or(&tokens, 0).map_err(syntax)?;
    if pos < tokens.len() {
        return Err(syntax(format!("unexpected {} after end of condition", tokens[pos].describe())));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    And,
    Or,
    Not,
    In,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Amp,
    Pipe,
    Tilde,
    Lt,
    Gt,
    LtEq,
    GtEq,
    EqEq,
    NotEq,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Str(s) => format!("string \"{s}\""),
            Token::Ident(name) => format!("name '{name}'"),
            other => format!("{other:?}"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' => { tokens.push(Token::Star); chars.next(); }
            '/' => { tokens.push(Token::Slash); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            '[' => { tokens.push(Token::LBracket); chars.next(); }
            ']' => { tokens.push(Token::RBracket); chars.next(); }
            ',' => { tokens.push(Token::Comma); chars.next(); }
            '&' => { tokens.push(Token::Amp); chars.next(); }
            '|' => { tokens.push(Token::Pipe); chars.next(); }
            '~' => { tokens.push(Token::Tilde); chars.next(); }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    tokens.push(Token::LtEq);
                    chars.next();
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    tokens.push(Token::GtEq);
                    chars.next();
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    tokens.push(Token::EqEq);
                    chars.next();
                } else {
                    return Err("single '=' is not a comparison, use '=='".to_string());
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    tokens.push(Token::NotEq);
                    chars.next();
                } else {
                    return Err("unexpected '!', use '~' or 'not' for negation".to_string());
                }
            }
            '"' | '\'' => {
                let quote = c;
                chars.next(); // consume opening quote
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => s.push(escaped),
                            None => return Err("unterminated string literal".to_string()),
                        },
                        Some(ch) if ch == quote => break,
                        Some(ch) => s.push(ch),
                        None => return Err("unterminated string literal".to_string()),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '`' => {
                // Quoted column name, for names that are not plain identifiers
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('`') => break,
                        Some(ch) => name.push(ch),
                        None => return Err("unterminated `quoted` column name".to_string()),
                    }
                }
                tokens.push(Token::Ident(name));
            }
            '.' => {
                // `.5` is a number, `.isin(` is a method call
                let mut lookahead = chars.clone();
                lookahead.next();
                if lookahead.peek().map(|ch| ch.is_ascii_digit()).unwrap_or(false) {
                    tokens.push(Token::Number(read_number(&mut chars)?));
                } else {
                    tokens.push(Token::Dot);
                    chars.next();
                }
            }
            '0'..='9' => {
                tokens.push(Token::Number(read_number(&mut chars)?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match ident.as_str() {
                    "True" => Token::True,
                    "False" => Token::False,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    _ => Token::Ident(ident),
                });
            }
            _ => return Err(format!("unexpected character '{}'", c)),
        }
    }

    Ok(tokens)
}

fn read_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<f64, String> {
    let mut num_str = String::new();
    while let Some(&d) = chars.peek() {
        if d.is_ascii_digit() || d == '.' {
            num_str.push(d);
            chars.next();
        } else {
            break;
        }
    }
    // Exponent: 1e-3, 2.5E4
    if matches!(chars.peek(), Some('e') | Some('E')) {
        let mut lookahead = chars.clone();
        lookahead.next();
        if matches!(lookahead.peek(), Some('+') | Some('-')) {
            lookahead.next();
        }
        if lookahead.peek().map(|ch| ch.is_ascii_digit()).unwrap_or(false) {
            num_str.push('e');
            chars.next();
            if let Some(&sign) = chars.peek() {
                if sign == '+' || sign == '-' {
                    num_str.push(sign);
                    chars.next();
                }
            }
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    num_str.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
        }
    }
    num_str.parse().map_err(|_| format!("invalid number: {}", num_str))
}

// Lowest precedence: or / |
fn parse_or(tokens: &[Token], pos: usize) -> Result<(ParsedExpr, usize), String> {
    let (mut left, mut pos) = parse_and(tokens, pos)?;

    while pos < tokens.len() && matches!(tokens[pos], Token::Or | Token::Pipe) {
        let (right, new_pos) = parse_and(tokens, pos + 1)?;
        left = Expr::Or(Box::new(left), Box::new(right));
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_and(tokens: &[Token], pos: usize) -> Result<(ParsedExpr, usize), String> {
    let (mut left, mut pos) = parse_not(tokens, pos)?;

    while pos < tokens.len() && matches!(tokens[pos], Token::And | Token::Amp) {
        let (right, new_pos) = parse_not(tokens, pos + 1)?;
        left = Expr::And(Box::new(left), Box::new(right));
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_not(tokens: &[Token], pos: usize) -> Result<(ParsedExpr, usize), String> {
    if pos < tokens.len() && matches!(tokens[pos], Token::Not | Token::Tilde) {
        let (inner, new_pos) = parse_not(tokens, pos + 1)?;
        return Ok((Expr::Not(Box::new(inner)), new_pos));
    }
    parse_comparison(tokens, pos)
}

fn parse_comparison(tokens: &[Token], pos: usize) -> Result<(ParsedExpr, usize), String> {
    let (mut left, mut pos) = parse_add_sub(tokens, pos)?;

    while pos < tokens.len() {
        // `in [...]` and `not in [...]`
        let membership = match (&tokens[pos], tokens.get(pos + 1)) {
            (Token::In, _) => Some((false, pos + 1)),
            (Token::Not, Some(Token::In)) => Some((true, pos + 2)),
            _ => None,
        };
        if let Some((negated, list_pos)) = membership {
            let (values, new_pos) = parse_literal_list(tokens, list_pos)?;
            left = Expr::IsIn { target: Box::new(left), values, negated };
            pos = new_pos;
            continue;
        }

        let op = match &tokens[pos] {
            Token::EqEq => CmpOp::Eq,
            Token::NotEq => CmpOp::NotEq,
            Token::Lt => CmpOp::Lt,
            Token::LtEq => CmpOp::LtEq,
            Token::Gt => CmpOp::Gt,
            Token::GtEq => CmpOp::GtEq,
            _ => break,
        };
        let (right, new_pos) = parse_add_sub(tokens, pos + 1)?;
        left = Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(ParsedExpr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => ArithOp::Add,
            Token::Minus => ArithOp::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::Arith {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(ParsedExpr, usize), String> {
    let (mut left, mut pos) = parse_unary(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => ArithOp::Mul,
            Token::Slash => ArithOp::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1)?;
        left = Expr::Arith {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_unary(tokens: &[Token], pos: usize) -> Result<(ParsedExpr, usize), String> {
    match tokens.get(pos) {
        Some(Token::Minus) => {
            let (inner, new_pos) = parse_unary(tokens, pos + 1)?;
            // Fold negative literals so `-5` stays a literal
            let expr = match inner {
                Expr::Literal(Literal::Number(n)) => Expr::Literal(Literal::Number(-n)),
                other => Expr::Neg(Box::new(other)),
            };
            Ok((expr, new_pos))
        }
        Some(Token::Plus) => parse_unary(tokens, pos + 1),
        _ => parse_postfix(tokens, pos),
    }
}

// Method calls bind tightest: age.between(1, 5), sex.isin(["M"]), bmi.isna()
fn parse_postfix(tokens: &[Token], pos: usize) -> Result<(ParsedExpr, usize), String> {
    let (mut expr, mut pos) = parse_primary(tokens, pos)?;

    while pos < tokens.len() && tokens[pos] == Token::Dot {
        let method = match tokens.get(pos + 1) {
            Some(Token::Ident(name)) => name.clone(),
            _ => return Err("expected method name after '.'".to_string()),
        };
        if tokens.get(pos + 2) != Some(&Token::LParen) {
            return Err(format!("expected '(' after .{}", method));
        }
        pos += 3;

        expr = match method.as_str() {
            "between" => {
                let (low, p) = parse_add_sub(tokens, pos)?;
                expect(tokens, p, &Token::Comma, "',' in between(low, high)")?;
                let (high, p) = parse_add_sub(tokens, p + 1)?;
                expect(tokens, p, &Token::RParen, "')' closing between(")?;
                pos = p + 1;
                Expr::Between {
                    target: Box::new(expr),
                    low: Box::new(low),
                    high: Box::new(high),
                }
            }
            "isin" => {
                let (values, p) = parse_literal_list(tokens, pos)?;
                expect(tokens, p, &Token::RParen, "')' closing isin(")?;
                pos = p + 1;
                Expr::IsIn { target: Box::new(expr), values, negated: false }
            }
            "isna" | "isnull" | "notna" | "notnull" => {
                expect(tokens, pos, &Token::RParen, "')' - this method takes no arguments")?;
                pos += 1;
                Expr::IsMissing {
                    target: Box::new(expr),
                    negated: method.starts_with("not"),
                }
            }
            other => return Err(format!("unknown method .{}()", other)),
        };
    }

    Ok((expr, pos))
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(ParsedExpr, usize), String> {
    if pos >= tokens.len() {
        return Err("unexpected end of condition".to_string());
    }

    match &tokens[pos] {
        Token::Number(n) => Ok((Expr::Literal(Literal::Number(*n)), pos + 1)),
        Token::Str(s) => Ok((Expr::Literal(Literal::Text(s.clone())), pos + 1)),
        Token::True => Ok((Expr::Literal(Literal::Boolean(true)), pos + 1)),
        Token::False => Ok((Expr::Literal(Literal::Boolean(false)), pos + 1)),
        Token::Ident(name) => {
            if tokens.get(pos + 1) == Some(&Token::LParen) {
                return Err(format!("'{}' is not callable", name));
            }
            Ok((Expr::Column(name.clone()), pos + 1))
        }
        Token::LParen => {
            let (expr, pos) = parse_or(tokens, pos + 1)?;
            expect(tokens, pos, &Token::RParen, "closing parenthesis")?;
            Ok((expr, pos + 1))
        }
        other => Err(format!("unexpected {}", other.describe())),
    }
}

/// `[lit, lit, ...]` - literals only, negative numbers allowed
fn parse_literal_list(tokens: &[Token], pos: usize) -> Result<(Vec<Literal>, usize), String> {
    expect(tokens, pos, &Token::LBracket, "'[' starting a list")?;
    let mut values = Vec::new();
    let mut pos = pos + 1;

    if tokens.get(pos) == Some(&Token::RBracket) {
        return Ok((values, pos + 1));
    }

    loop {
        let (value, new_pos) = match (tokens.get(pos), tokens.get(pos + 1)) {
            (Some(Token::Minus), Some(Token::Number(n))) => (Literal::Number(-n), pos + 2),
            (Some(Token::Number(n)), _) => (Literal::Number(*n), pos + 1),
            (Some(Token::Str(s)), _) => (Literal::Text(s.clone()), pos + 1),
            (Some(Token::True), _) => (Literal::Boolean(true), pos + 1),
            (Some(Token::False), _) => (Literal::Boolean(false), pos + 1),
            (Some(other), _) => return Err(format!("list items must be literals, found {}", other.describe())),
            (None, _) => return Err("missing ']' closing list".to_string()),
        };
        values.push(value);
        pos = new_pos;

        match tokens.get(pos) {
            Some(Token::Comma) => pos += 1,
            Some(Token::RBracket) => return Ok((values, pos + 1)),
            _ => return Err("expected ',' or ']' in list".to_string()),
        }
    }
}

fn expect(tokens: &[Token], pos: usize, token: &Token, what: &str) -> Result<(), String> {
    if tokens.get(pos) == Some(token) {
        Ok(())
    } else {
        Err(format!("expected {}", what))
    }
}

// =============================================================================
// Expression Binding - Convert ParsedExpr to BoundExpr
// =============================================================================

/// Bind a parsed expression by resolving column names to table positions.
///
/// Returns the first unresolved name as the error.
pub fn bind_expr<F>(expr: &ParsedExpr, resolver: F) -> Result<BoundExpr, String>
where
    F: Fn(&str) -> Option<usize> + Copy,
{
    Ok(match expr {
        Expr::Literal(lit) => Expr::Literal(lit.clone()),
        Expr::Column(name) => Expr::Column(resolver(name.as_str()).ok_or_else(|| name.clone())?),
        Expr::Compare { op, left, right } => Expr::Compare {
            op: *op,
            left: bind_boxed(left, resolver)?,
            right: bind_boxed(right, resolver)?,
        },
        Expr::Arith { op, left, right } => Expr::Arith {
            op: *op,
            left: bind_boxed(left, resolver)?,
            right: bind_boxed(right, resolver)?,
        },
        Expr::And(left, right) => Expr::And(bind_boxed(left, resolver)?, bind_boxed(right, resolver)?),
        Expr::Or(left, right) => Expr::Or(bind_boxed(left, resolver)?, bind_boxed(right, resolver)?),
        Expr::Not(inner) => Expr::Not(bind_boxed(inner, resolver)?),
        Expr::Neg(inner) => Expr::Neg(bind_boxed(inner, resolver)?),
        Expr::Between { target, low, high } => Expr::Between {
            target: bind_boxed(target, resolver)?,
            low: bind_boxed(low, resolver)?,
            high: bind_boxed(high, resolver)?,
        },
        Expr::IsIn { target, values, negated } => Expr::IsIn {
            target: bind_boxed(target, resolver)?,
            values: values.clone(),
            negated: *negated,
        },
        Expr::IsMissing { target, negated } => Expr::IsMissing {
            target: bind_boxed(target, resolver)?,
            negated: *negated,
        },
    })
}

fn bind_boxed<F>(expr: &ParsedExpr, resolver: F) -> Result<Box<BoundExpr>, String>
where
    F: Fn(&str) -> Option<usize> + Copy,
{
    bind_expr(expr, resolver).map(Box::new)
}

/// Column names referenced by an expression, in first-seen order
pub fn referenced_columns(expr: &ParsedExpr) -> Vec<&str> {
    let mut names = Vec::new();
    collect_columns(expr, &mut names);
    names
}

fn collect_columns<'a>(expr: &'a ParsedExpr, names: &mut Vec<&'a str>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Column(name) => {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        Expr::Compare { left, right, .. }
        | Expr::Arith { left, right, .. }
        | Expr::And(left, right)
        | Expr::Or(left, right) => {
            collect_columns(left, names);
            collect_columns(right, names);
        }
        Expr::Not(inner) | Expr::Neg(inner) => collect_columns(inner, names),
        Expr::Between { target, low, high } => {
            collect_columns(target, names);
            collect_columns(low, names);
            collect_columns(high, names);
        }
        Expr::IsIn { target, .. } | Expr::IsMissing { target, .. } => {
            collect_columns(target, names)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> Box<ParsedExpr> {
        Box::new(Expr::Column(name.to_string()))
    }

    fn num(n: f64) -> Box<ParsedExpr> {
        Box::new(Expr::Literal(Literal::Number(n)))
    }

    #[test]
    fn test_parse_simple_comparison() {
        let expr = parse("(age<5)").unwrap();
        assert_eq!(expr, Expr::Compare { op: CmpOp::Lt, left: col("age"), right: num(5.0) });
    }

    #[test]
    fn test_parse_equality_with_string() {
        let expr = parse("(sex==\"M\")").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CmpOp::Eq,
                left: col("sex"),
                right: Box::new(Expr::Literal(Literal::Text("M".into()))),
            }
        );
        // Single quotes too
        assert_eq!(parse("sex == 'M'").unwrap(), expr);
    }

    #[test]
    fn test_and_binds_looser_than_comparison() {
        let expr = parse("age >= 15 & sex == 'F'").unwrap();
        match expr {
            Expr::And(left, right) => {
                assert!(matches!(*left, Expr::Compare { op: CmpOp::GtEq, .. }));
                assert!(matches!(*right, Expr::Compare { op: CmpOp::Eq, .. }));
            }
            other => panic!("Expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let expr = parse("a == 1 or b == 2 and c == 3").unwrap();
        match expr {
            Expr::Or(_, right) => assert!(matches!(*right, Expr::And(_, _))),
            other => panic!("Expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_tilde_and_not_negate() {
        assert!(matches!(parse("~is_alive").unwrap(), Expr::Not(_)));
        assert!(matches!(parse("not (age > 3)").unwrap(), Expr::Not(_)));
    }

    #[test]
    fn test_arithmetic_precedence() {
        // age + 2 * 3 > 10  =>  (age + (2 * 3)) > 10
        let expr = parse("age + 2 * 3 > 10").unwrap();
        match expr {
            Expr::Compare { op: CmpOp::Gt, left, .. } => match *left {
                Expr::Arith { op: ArithOp::Add, right, .. } => {
                    assert!(matches!(*right, Expr::Arith { op: ArithOp::Mul, .. }))
                }
                other => panic!("Expected Add, got {:?}", other),
            },
            other => panic!("Expected Compare, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_literal_folds() {
        let expr = parse("x > -2.5").unwrap();
        assert_eq!(expr, Expr::Compare { op: CmpOp::Gt, left: col("x"), right: num(-2.5) });
    }

    #[test]
    fn test_decimal_and_exponent_numbers() {
        assert_eq!(parse(".5").unwrap(), *num(0.5));
        assert_eq!(parse("1e-3").unwrap(), *num(0.001));
        assert_eq!(parse("2.5E2").unwrap(), *num(250.0));
    }

    #[test]
    fn test_between_method() {
        let expr = parse("(age.between(15, 49))").unwrap();
        assert_eq!(expr, Expr::Between { target: col("age"), low: num(15.0), high: num(49.0) });
    }

    #[test]
    fn test_isin_and_in_operator_agree() {
        let method = parse("region.isin(['North', 'South'])").unwrap();
        let operator = parse("region in ['North', 'South']").unwrap();
        assert_eq!(method, operator);

        match parse("region not in [1, -2]").unwrap() {
            Expr::IsIn { values, negated, .. } => {
                assert!(negated);
                assert_eq!(values, vec![Literal::Number(1.0), Literal::Number(-2.0)]);
            }
            other => panic!("Expected IsIn, got {:?}", other),
        }
    }

    #[test]
    fn test_isna_family() {
        assert_eq!(parse("bmi.isna()").unwrap(), Expr::IsMissing { target: col("bmi"), negated: false });
        assert_eq!(parse("bmi.notnull()").unwrap(), Expr::IsMissing { target: col("bmi"), negated: true });
    }

    #[test]
    fn test_backtick_column_name() {
        assert_eq!(parse("`age years` > 3").unwrap(), Expr::Compare {
            op: CmpOp::Gt,
            left: col("age years"),
            right: num(3.0),
        });
    }

    #[test]
    fn test_booleans_are_keywords() {
        assert_eq!(parse("True").unwrap(), Expr::Literal(Literal::Boolean(true)));
        // lower-case is a column name
        assert_eq!(parse("true").unwrap(), Expr::Column("true".into()));
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["", "(age < 5", "age = 5", "age !5", "age <", "'open", "age.foo()", "age 5", "f(1)"] {
            let err = parse(bad).unwrap_err();
            assert!(
                matches!(err, LmError::ExpressionSyntax { .. }),
                "expected syntax error for {:?}, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_unbalanced_numeric_equality_is_rejected() {
        // An equality missing its closing parenthesis must not parse
        assert!(parse("(age == 5").is_err());
        assert!(parse("(age == 5)").is_ok());
    }

    #[test]
    fn test_bind_resolves_and_reports_unknown() {
        let expr = parse("age > 5 & sex == 'M'").unwrap();
        let resolver = |name: &str| match name {
            "age" => Some(0),
            "sex" => Some(1),
            _ => None,
        };
        let bound = bind_expr(&expr, resolver).unwrap();
        match bound {
            Expr::And(left, _) => assert!(matches!(*left, Expr::Compare { .. })),
            other => panic!("Expected And, got {:?}", other),
        }

        let expr = parse("age > 5 & li_bmi == 2").unwrap();
        assert_eq!(bind_expr(&expr, resolver).unwrap_err(), "li_bmi");
    }

    #[test]
    fn test_referenced_columns() {
        let expr = parse("(age > 5) & (sex == 'M') | age.between(1, x)").unwrap();
        assert_eq!(referenced_columns(&expr), vec!["age", "sex", "x"]);
    }
}
