use serde::Deserialize;

use crate::shared::ValidationError;

const fn default_page_size() -> i64 {
    Ga4Config::DEFAULT_PAGE_SIZE
}

/// Configuration for the GA4 reporting source.
#[derive(Debug, Clone, Deserialize)]
pub struct Ga4Config {
    /// Numeric GA4 property id, without the `properties/` prefix.
    pub property_id: String,
    /// Maximum number of rows requested per report page.
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Ga4Config {
    /// Default report page size. Matches the API's default `limit`.
    pub const DEFAULT_PAGE_SIZE: i64 = 10_000;

    /// Largest page size the reporting API accepts.
    pub const MAX_PAGE_SIZE: i64 = 250_000;

    /// Validates the GA4 source settings.
    ///
    /// The property id must be a plain number; a placeholder or a
    /// `properties/`-prefixed resource name is rejected here rather than as a
    /// request failure later.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.property_id.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "ga4.property_id",
            });
        }

        if !self.property_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidPropertyId(
                self.property_id.clone(),
            ));
        }

        if self.page_size < 1 || self.page_size > Self::MAX_PAGE_SIZE {
            return Err(ValidationError::PageSizeOutOfRange {
                max: Self::MAX_PAGE_SIZE,
                got: self.page_size,
            });
        }

        Ok(())
    }
}
