//! Value Objects for the storefront

use serde::{Deserialize, Serialize};
use std::fmt;

/// Line quantity. At least one and at most `i32::MAX`, the largest count a
/// stock adjustment can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Self = Self(1);
    pub const MAX: Self = Self(i32::MAX as u32);

    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::Zero); }
        if value > Self::MAX.0 { return Err(QuantityError::TooLarge); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u32 { self.0 }
    /// Sum of both quantities, capped at [`Quantity::MAX`].
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0).min(Self::MAX.0)) }
    pub fn to_i32(&self) -> i32 { i32::try_from(self.0).unwrap_or(i32::MAX) }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 1 { return Err(QuantityError::Zero); }
        let value = u32::try_from(value).map_err(|_| QuantityError::TooLarge)?;
        Self::new(value)
    }
}

impl From<Quantity> for u32 { fn from(q: Quantity) -> Self { q.0 } }

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { Zero, TooLarge }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "Quantity must be at least 1"),
            Self::TooLarge => write!(f, "Quantity too large"),
        }
    }
}

/// Review rating, 1 to 5 stars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, RatingError> {
        if !(Self::MIN..=Self::MAX).contains(&value) { return Err(RatingError::OutOfRange); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u8 { self.0 }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value).map_err(|_| RatingError::OutOfRange).and_then(Self::new)
    }
}

impl From<Rating> for u8 { fn from(r: Rating) -> Self { r.0 } }

#[derive(Debug, Clone, PartialEq, Eq)] pub enum RatingError { OutOfRange }
impl std::error::Error for RatingError {}
impl fmt::Display for RatingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Rating must be between 1 and 5") }
}
