use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::error::{HimawariArchError, Result};

pub const DEFAULT_BANDS: [&str; 7] = ["01", "02", "03", "04", "07", "08", "13"];

/// A spectral band id, always stored as a zero padded two digit string (`3` -> `03`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BandId(String);

impl BandId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalize a raw digit string. Anything that is not all ascii digits is rejected.
    pub fn from_digits(digits: &str) -> Option<Self> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let num: u32 = digits.parse().ok()?;
        Some(BandId(format!("{:02}", num)))
    }
}

impl FromStr for BandId {
    type Err = HimawariArchError;

    fn from_str(s: &str) -> Result<Self> {
        BandId::from_digits(s.trim())
            .ok_or_else(|| HimawariArchError::InvalidInput(format!("invalid band id '{}'", s)))
    }
}

impl Display for BandId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BandSet(BTreeSet<BandId>);

impl BandSet {
    pub fn new<I: IntoIterator<Item = BandId>>(bands: I) -> Self {
        BandSet(bands.into_iter().collect())
    }

    pub fn contains(&self, band: &BandId) -> bool {
        self.0.contains(band)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BandId> {
        self.0.iter()
    }

    /// Comma separated band digits. Empty input selects `defaults`, non-digit tokens are
    /// dropped and an input without a single usable token is an error.
    pub fn parse(input: &str, defaults: &BandSet) -> Result<BandSet> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(defaults.clone());
        }

        let selected = BandSet::new(
            input
                .split(',')
                .map(str::trim)
                .filter_map(BandId::from_digits),
        );

        if selected.is_empty() {
            return Err(HimawariArchError::InvalidInput(format!(
                "no valid band numbers in '{}', expected digits separated by commas",
                input
            )));
        }

        log::info!("Selected bands: {}", selected);
        Ok(selected)
    }
}

impl Default for BandSet {
    fn default() -> Self {
        BandSet::new(DEFAULT_BANDS.iter().filter_map(|b| BandId::from_digits(b)))
    }
}

impl Display for BandSet {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let bands: Vec<&str> = self.0.iter().map(BandId::as_str).collect();
        write!(f, "{}", bands.join(","))
    }
}
