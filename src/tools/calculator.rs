//! # Calculadora
//!
//! Avaliador aritmético protegido: só dígitos, espaços e `+ - * / ( ) .`.
//! Parser descendente recursivo com `**` (potência, associativa à direita),
//! sinais unários e parênteses. Inteiros continuam inteiros, exceto em `/`.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Maior magnitude aceita para o resultado
pub const MAX_MAGNITUDE: f64 = 1e10;

/// Profundidade máxima de aninhamento (parênteses e sinais unários)
pub const MAX_NESTING: usize = 200;

static ALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+\-*/(). ]+$").expect("regex da calculadora é válida"));

static ARITHMETIC_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+\-*/().\s]+$").expect("regex de expressão é válida"));

/// Erros da calculadora
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalcError {
    /// Caracteres fora do permitido
    #[error("Invalid or unsafe expression")]
    Unsafe,

    /// Divisão por zero
    #[error("Calculation failed: division by zero")]
    DivisionByZero,

    /// Resultado acima de 1e10
    #[error("Result too large")]
    TooLarge,

    /// Expressão mal formada
    #[error("Calculation failed: {0}")]
    Syntax(String),
}

/// Valor numérico
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Inteiro
    Int(i64),
    /// Ponto flutuante
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            // `{:?}` mantém o ".0" de floats inteiros (8/2 → 4.0)
            Self::Float(x) => write!(f, "{:?}", x),
        }
    }
}

/// Se a pergunta é uma expressão aritmética pura (sem letras).
pub fn is_arithmetic_expression(query: &str) -> bool {
    !query.chars().any(char::is_alphabetic) && ARITHMETIC_QUERY.is_match(query)
}

/// Avalia a expressão.
pub fn evaluate(expression: &str) -> Result<Number, CalcError> {
    if !ALLOWED_CHARS.is_match(expression) {
        return Err(CalcError::Unsafe);
    }

    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(CalcError::Syntax("invalid syntax".into()));
    }

    let magnitude = value.as_f64().abs();
    if magnitude.is_nan() {
        return Err(CalcError::Syntax("math domain error".into()));
    }
    if magnitude > MAX_MAGNITUDE {
        return Err(CalcError::TooLarge);
    }
    Ok(value)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TOKENIZER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Pow,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_number(&literal)?));
            }
            _ => return Err(CalcError::Unsafe),
        }
    }

    Ok(tokens)
}

fn parse_number(literal: &str) -> Result<Number, CalcError> {
    let invalid = || CalcError::Syntax(format!("invalid number '{}'", literal));
    if literal.contains('.') {
        if literal == "." || literal.matches('.').count() > 1 {
            return Err(invalid());
        }
        literal.parse::<f64>().map(Number::Float).map_err(|_| invalid())
    } else {
        match literal.parse::<i64>() {
            Ok(i) => Ok(Number::Int(i)),
            Err(_) => Err(CalcError::TooLarge),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PARSER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// expr   := term (('+' | '-') term)*
// term   := unary (('*' | '/') unary)*
// unary  := ('+' | '-') unary | power
// power  := atom ('**' unary)?
// atom   := number | '(' expr ')'

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Number, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = binary(op, value, rhs)?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<Number, CalcError> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = binary(op, value, rhs)?;
        }
        Ok(value)
    }

    // Toda recursão passa por aqui; o limite evita estouro de pilha
    fn unary(&mut self) -> Result<Number, CalcError> {
        if self.depth >= MAX_NESTING {
            return Err(CalcError::Syntax("expression too deeply nested".into()));
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<Number, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(match self.unary()? {
                    Number::Int(i) => i
                        .checked_neg()
                        .map(Number::Int)
                        .unwrap_or(Number::Float(-(i as f64))),
                    Number::Float(f) => Number::Float(-f),
                })
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Number, CalcError> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            let exponent = self.unary()?;
            return binary(Token::Pow, base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Number, CalcError> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(CalcError::Syntax("'(' was never closed".into())),
                }
            }
            _ => Err(CalcError::Syntax("invalid syntax".into())),
        }
    }
}

fn binary(op: Token, lhs: Number, rhs: Number) -> Result<Number, CalcError> {
    use Number::{Float, Int};

    if op == Token::Slash {
        let divisor = rhs.as_f64();
        if divisor == 0.0 {
            return Err(CalcError::DivisionByZero);
        }
        return Ok(Float(lhs.as_f64() / divisor));
    }

    if let (Int(a), Int(b)) = (lhs, rhs) {
        let exact = match op {
            Token::Plus => a.checked_add(b),
            Token::Minus => a.checked_sub(b),
            Token::Star => a.checked_mul(b),
            Token::Pow if b >= 0 => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
            Token::Pow => {
                if a == 0 {
                    return Err(CalcError::DivisionByZero);
                }
                return Ok(Float((a as f64).powf(b as f64)));
            }
            _ => None,
        };
        if let Some(value) = exact {
            return Ok(Int(value));
        }
    }

    let (a, b) = (lhs.as_f64(), rhs.as_f64());
    let value = match op {
        Token::Plus => a + b,
        Token::Minus => a - b,
        Token::Star => a * b,
        Token::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(CalcError::DivisionByZero);
            }
            a.powf(b)
        }
        _ => return Err(CalcError::Syntax("invalid syntax".into())),
    };
    Ok(Float(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> String {
        evaluate(expr).map(|n| n.to_string()).unwrap_or_else(|e| e.to_string())
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(eval("2+2"), "4");
        assert_eq!(eval("2 + 3 * 4"), "14");
        assert_eq!(eval("(2 + 3) * 4"), "20");
        assert_eq!(eval("7 / 2"), "3.5");
        assert_eq!(eval("8 / 2"), "4.0");
        assert_eq!(eval("1.5 + 1"), "2.5");
    }

    #[test]
    fn test_power_and_unary() {
        assert_eq!(eval("2 ** 10"), "1024");
        assert_eq!(eval("2 ** 3 ** 2"), "512");
        assert_eq!(eval("-2 ** 2"), "-4");
        assert_eq!(eval("(-2) ** 2"), "4");
        assert_eq!(eval("2 ** -1"), "0.5");
        assert_eq!(eval("--3"), "3");
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let nested = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(
            evaluate(&nested),
            Err(CalcError::Syntax("expression too deeply nested".into()))
        );
        assert_eq!(
            eval(&format!("{}5", "-".repeat(100_000))),
            "Calculation failed: expression too deeply nested"
        );
        assert_eq!(eval(&format!("{}7{}", "(".repeat(50), ")".repeat(50))), "7");
    }

    #[test]
    fn test_errors() {
        assert_eq!(evaluate("1/0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("10 ** 11"), Err(CalcError::TooLarge));
        assert_eq!(evaluate("2 % 3"), Err(CalcError::Unsafe));
        assert_eq!(evaluate("what is rust"), Err(CalcError::Unsafe));
        assert!(matches!(evaluate("(1 + 2"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("1 +"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("1..2"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("2 3"), Err(CalcError::Syntax(_))));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(CalcError::Unsafe.to_string(), "Invalid or unsafe expression");
        assert_eq!(CalcError::TooLarge.to_string(), "Result too large");
    }

    #[test]
    fn test_is_arithmetic_expression() {
        assert!(is_arithmetic_expression("2+2"));
        assert!(is_arithmetic_expression(" (3 * 4) / 2 "));
        assert!(!is_arithmetic_expression("2+2 apples"));
        assert!(!is_arithmetic_expression("impact of X"));
        assert!(!is_arithmetic_expression(""));
    }
}
