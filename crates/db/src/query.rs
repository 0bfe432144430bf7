//! Search-expression parsing and matching.
//!
//! Grammar, joins case-insensitive:
//!
//! ```text
//! expr       := constraint ( "and" constraint )*
//! constraint := "code#" HEX "#"          code contains the byte sequence
//!             | "func#" SIGNATURE "#"    code contains PUSH4 of the selector
//!             | "bal" CMP DECIMAL        instance balance comparison
//! CMP        := "<=" | ">=" | "<" | ">" | "="
//! ```
//!
//! Anything else is a syntax error surfaced as a plain message.

use argus_core::{normalize_hex_string, selector};
use argus_utils::errors::DbError;
use num_bigint::BigUint;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cmp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// Code contains this byte sequence.
    Code(Vec<u8>),
    /// Code contains a PUSH4 of this selector.
    Func([u8; 4]),
    /// Instance balance passes this comparison, in wei.
    Balance(Cmp, BigUint),
}

/// A parsed search expression: the conjunction of its constraints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub constraints: Vec<Constraint>,
}

impl Query {
    pub fn parse(expr: &str) -> Result<Self, DbError> {
        let mut rest = expr.trim();
        if rest.is_empty() {
            return Err(DbError::Syntax("empty expression".into()));
        }

        let mut constraints = Vec::new();
        loop {
            let (constraint, remaining) = parse_constraint(rest)?;
            constraints.push(constraint);
            rest = remaining.trim_start();
            if rest.is_empty() {
                break;
            }
            if rest.len() >= 3 && rest[..3].eq_ignore_ascii_case("and") {
                rest = rest[3..].trim_start();
                if rest.is_empty() {
                    return Err(DbError::Syntax("dangling 'and'".into()));
                }
            } else {
                return Err(DbError::Syntax(format!("expected 'and' before '{rest}'")));
            }
        }
        Ok(Self { constraints })
    }

    /// True when every code-level constraint holds for `code`.
    pub fn matches_code(&self, code: &[u8]) -> bool {
        self.constraints.iter().all(|c| match c {
            Constraint::Code(needle) => contains(code, needle),
            Constraint::Func(sel) => {
                let mut pattern = vec![0x63u8];
                pattern.extend_from_slice(sel);
                contains(code, &pattern)
            }
            Constraint::Balance(..) => true,
        })
    }

    /// True when every balance constraint holds for `balance`.
    pub fn matches_balance(&self, balance: &BigUint) -> bool {
        self.constraints.iter().all(|c| match c {
            Constraint::Balance(cmp, value) => match cmp {
                Cmp::Lt => balance < value,
                Cmp::Le => balance <= value,
                Cmp::Eq => balance == value,
                Cmp::Ge => balance >= value,
                Cmp::Gt => balance > value,
            },
            _ => true,
        })
    }
}

fn parse_constraint(input: &str) -> Result<(Constraint, &str), DbError> {
    if let Some(rest) = input.strip_prefix("code#") {
        let (body, rest) = take_hash_delimited(rest)?;
        let normalized = normalize_hex_string(body)
            .map_err(|e| DbError::Syntax(format!("bad hex in code constraint: {e}")))?;
        let bytes = hex::decode(&normalized)
            .map_err(|e| DbError::Syntax(format!("bad hex in code constraint: {e}")))?;
        if bytes.is_empty() {
            return Err(DbError::Syntax("empty code constraint".into()));
        }
        Ok((Constraint::Code(bytes), rest))
    } else if let Some(rest) = input.strip_prefix("func#") {
        let (body, rest) = take_hash_delimited(rest)?;
        if body.is_empty() {
            return Err(DbError::Syntax("empty function signature".into()));
        }
        Ok((Constraint::Func(selector(body)), rest))
    } else if let Some(rest) = input.strip_prefix("bal") {
        parse_balance(rest)
    } else {
        Err(DbError::Syntax(format!(
            "unrecognized constraint at '{input}'"
        )))
    }
}

fn parse_balance(input: &str) -> Result<(Constraint, &str), DbError> {
    let rest = input.trim_start();
    let (cmp, rest) = if let Some(r) = rest.strip_prefix("<=") {
        (Cmp::Le, r)
    } else if let Some(r) = rest.strip_prefix(">=") {
        (Cmp::Ge, r)
    } else if let Some(r) = rest.strip_prefix('<') {
        (Cmp::Lt, r)
    } else if let Some(r) = rest.strip_prefix('>') {
        (Cmp::Gt, r)
    } else if let Some(r) = rest.strip_prefix('=') {
        (Cmp::Eq, r)
    } else {
        return Err(DbError::Syntax(format!(
            "expected comparison operator after 'bal', got '{rest}'"
        )));
    };

    let rest = rest.trim_start();
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(DbError::Syntax("expected a decimal balance value".into()));
    }
    let value = BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| DbError::Syntax(format!("bad balance value '{digits}'")))?;
    Ok((Constraint::Balance(cmp, value), &rest[digits.len()..]))
}

fn take_hash_delimited(input: &str) -> Result<(&str, &str), DbError> {
    let end = input
        .find('#')
        .ok_or_else(|| DbError::Syntax("missing closing '#'".into()))?;
    Ok((&input[..end], &input[end + 1..]))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_constraints() {
        let q = Query::parse("code#6001#").unwrap();
        assert_eq!(q.constraints, vec![Constraint::Code(vec![0x60, 0x01])]);

        let q = Query::parse("func#transfer(address,uint256)#").unwrap();
        assert_eq!(
            q.constraints,
            vec![Constraint::Func([0xa9, 0x05, 0x9c, 0xbb])]
        );

        let q = Query::parse("bal > 1000").unwrap();
        assert_eq!(
            q.constraints,
            vec![Constraint::Balance(Cmp::Gt, BigUint::from(1000u32))]
        );
    }

    #[test]
    fn parses_conjunctions() {
        let q = Query::parse("code#ff# and bal>=1 AND func#foo()#").unwrap();
        assert_eq!(q.constraints.len(), 3);
    }

    #[test]
    fn rejects_malformed_expressions() {
        for bad in [
            "",
            "code#6001",
            "code##",
            "func#transfer#extra",
            "bal ~ 5",
            "bal >",
            "balance > 5",
            "code#xyz#",
            "code#ff# or bal>1",
        ] {
            assert!(
                matches!(Query::parse(bad), Err(DbError::Syntax(_))),
                "expected syntax error for {bad:?}"
            );
        }
    }

    #[test]
    fn code_matching_finds_push4_selectors() {
        let q = Query::parse("func#transfer(address,uint256)#").unwrap();
        let code = hex::decode("600063a9059cbb1456").unwrap();
        assert!(q.matches_code(&code));
        assert!(!q.matches_code(&hex::decode("600160020100").unwrap()));
    }

    #[test]
    fn balance_matching() {
        let q = Query::parse("bal>=10 and bal<100").unwrap();
        assert!(q.matches_balance(&BigUint::from(10u8)));
        assert!(q.matches_balance(&BigUint::from(99u8)));
        assert!(!q.matches_balance(&BigUint::from(9u8)));
        assert!(!q.matches_balance(&BigUint::from(100u8)));
    }
}
