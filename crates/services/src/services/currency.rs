//! Brazilian real amounts. Values are carried as integer cents everywhere; these helpers
//! convert to and from the `R$ 1.234,56` display form.

use thiserror::Error;

const SYMBOL: &str = "R$";
// Enough digits for any amount a user can type without overflowing i64 cents
const MAX_INPUT_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyError {
    #[error("empty amount")]
    Empty,
    #[error("invalid character '{0}' in amount")]
    InvalidCharacter(char),
    #[error("misplaced thousands separator")]
    InvalidGrouping,
    #[error("at most two decimal places are allowed")]
    TooManyDecimals,
    #[error("amount is too large")]
    Overflow,
}

/// `123456` → `R$ 1.234,56`, `-5` → `-R$ 0,05`
pub fn format_brl(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!(
        "{sign}{SYMBOL} {},{:02}",
        group_thousands(abs / 100),
        abs % 100
    )
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Parse `R$ 1.234,56`, `1234,5`, `-R$ 10` and similar into cents
pub fn parse_brl(input: &str) -> Result<i64, CurrencyError> {
    let mut rest = input.trim();
    let mut negative = false;

    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped.trim_start();
    }
    if let Some(stripped) = rest.strip_prefix(SYMBOL) {
        rest = stripped.trim_start();
    }
    if !negative {
        if let Some(stripped) = rest.strip_prefix('-') {
            negative = true;
            rest = stripped.trim_start();
        }
    }
    if rest.is_empty() {
        return Err(CurrencyError::Empty);
    }

    let (integer, fraction) = match rest.split_once(',') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (rest, None),
    };

    let reais = parse_integer_part(integer)?;
    let centavos = match fraction {
        None => 0,
        Some(f) => parse_fraction(f)?,
    };

    let cents = reais
        .checked_mul(100)
        .and_then(|v| v.checked_add(centavos))
        .ok_or(CurrencyError::Overflow)?;
    Ok(if negative { -cents } else { cents })
}

fn parse_integer_part(integer: &str) -> Result<i64, CurrencyError> {
    if integer.is_empty() {
        return Ok(0);
    }
    if let Some(bad) = integer.chars().find(|c| !c.is_ascii_digit() && *c != '.') {
        return Err(CurrencyError::InvalidCharacter(bad));
    }
    if integer.contains('.') {
        let mut groups = integer.split('.');
        let first = groups.next().unwrap_or_default();
        if first.is_empty() || first.len() > 3 || groups.any(|g| g.len() != 3) {
            return Err(CurrencyError::InvalidGrouping);
        }
    }

    integer
        .chars()
        .filter(char::is_ascii_digit)
        .try_fold(0i64, |acc, c| {
            acc.checked_mul(10)
                .and_then(|v| v.checked_add(i64::from(c as u8 - b'0')))
        })
        .ok_or(CurrencyError::Overflow)
}

fn parse_fraction(fraction: &str) -> Result<i64, CurrencyError> {
    if let Some(bad) = fraction.chars().find(|c| !c.is_ascii_digit()) {
        return Err(CurrencyError::InvalidCharacter(bad));
    }
    match fraction.len() {
        0 => Ok(0),
        1 => Ok(i64::from(fraction.as_bytes()[0] - b'0') * 10),
        2 => Ok(fraction.parse::<i64>().unwrap_or_default()),
        _ => Err(CurrencyError::TooManyDecimals),
    }
}

/// Format a stream of typed digits as an amount: `"12345"` → `R$ 123,45`.
/// Non-digits are dropped and input beyond the supported length is ignored.
pub fn mask_brl_input(typed: &str) -> String {
    let digits: String = typed
        .chars()
        .filter(char::is_ascii_digit)
        .skip_while(|c| *c == '0')
        .take(MAX_INPUT_DIGITS)
        .collect();
    let cents = digits.parse::<i64>().unwrap_or(0);
    format_brl(cents)
}
