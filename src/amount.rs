use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Fixed-point decimal with 4 decimal places, stored as a scaled integer.
///
/// PayPal only accepts two decimals, so `Display` renders the NVP wire format:
/// rounded half away from zero to whole cents, `.` as decimal separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Amount(i64);

/// Error returned when a decimal string cannot be read as an [`Amount`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("empty amount")]
    Empty,
    #[error("invalid amount '{0}'")]
    Invalid(String),
    #[error("amount '{0}' is out of range")]
    OutOfRange(String),
}

impl Amount {
    const SCALE: i64 = 10_000;
    /// Scaled units in one cent.
    const CENT: i64 = 100;
    const FRACTION_DIGITS: usize = 4;
    /// Largest magnitude `FromStr` accepts, in scaled units.
    const MAX_SCALED: i64 = i64::MAX - Self::CENT;

    pub const ZERO: Amount = Amount(0);

    pub fn from_float(value: f64) -> Self {
        Amount((value * Self::SCALE as f64).round() as i64)
    }

    pub fn from_scaled(value: i64) -> Self {
        Amount(value)
    }

    pub fn from_cents(cents: i64) -> Self {
        Amount(cents * Self::CENT)
    }

    /// The value rounded half away from zero to whole cents.
    pub fn cents(self) -> i64 {
        let value = i128::from(self.0);
        let half = i128::from(Self::CENT / 2);
        let cents = if value < 0 {
            (value - half) / i128::from(Self::CENT)
        } else {
            (value + half) / i128::from(Self::CENT)
        };
        // |i64| / 100 always fits back
        cents as i64
    }

    /// Compare at cent precision, the granularity PayPal settles in.
    pub fn cmp_cents(self, other: Self) -> Ordering {
        self.cents().cmp(&other.cents())
    }

    pub fn eq_cents(self, other: Self) -> bool {
        self.cmp_cents(other) == Ordering::Equal
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = self.cents();
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let invalid = || AmountParseError::Invalid(s.to_string());
        let out_of_range = || AmountParseError::OutOfRange(s.to_string());

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| out_of_range())?
        };

        let mut fraction = 0;
        let mut unit = Self::SCALE;
        for digit in frac.bytes().take(Self::FRACTION_DIGITS) {
            unit /= 10;
            fraction += i64::from(digit - b'0') * unit;
        }
        // digits past the internal precision round half up
        if frac
            .as_bytes()
            .get(Self::FRACTION_DIGITS)
            .is_some_and(|digit| *digit >= b'5')
        {
            fraction += 1;
        }

        let value = whole
            .checked_mul(Self::SCALE)
            .and_then(|value| value.checked_add(fraction))
            .filter(|value| *value <= Self::MAX_SCALED)
            .ok_or_else(out_of_range)?;

        Ok(Amount(if negative { -value } else { value }))
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::ops::SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}
