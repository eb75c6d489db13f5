use chrono::{naive::NaiveDateTime, NaiveDate};
use serde::Deserialize;
use strum::{EnumString, IntoStaticStr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, IntoStaticStr, EnumString, Deserialize)]
pub enum Satellite {
    #[strum(serialize = "H08")]
    #[serde(rename = "H08")]
    Himawari8,
    #[default]
    #[strum(serialize = "H09")]
    #[serde(rename = "H09")]
    Himawari9,
}

impl Satellite {
    pub fn sensor_id(&self) -> &'static str {
        self.into()
    }

    /// Start of operational full-disk data in the archive.
    pub fn earliest_operational_date(&self) -> NaiveDateTime {
        let (y, m, d) = match *self {
            Satellite::Himawari8 => (2015, 7, 7),
            Satellite::Himawari9 => (2022, 12, 13),
        };

        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("operational dates are valid calendar dates")
    }
}
