use lazy_static::lazy_static;
use regex::Regex;
use validator::{ValidateUrl, ValidationError};

lazy_static! {
    /// Run of characters that may not appear in a slug
    /// - "Home & Garden!!" lowercased has the runs " & " and "!!"
    pub static ref SLUG_SEPARATOR_REGEX: Regex = Regex::new(r"[^a-z0-9]+").unwrap();

    /// Regex for validating slug fields produced by `SLUG_SEPARATOR_REGEX` replacement
    /// - Valid: "home-garden-", "-books", "tv"
    /// - Invalid: "Home", "home--garden", "home_garden"
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^-?(?:[a-z0-9]+-?)*$").unwrap();
}

/// Image URLs are optional: blank values pass, anything else must be an absolute URL
pub fn validate_image_url(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || value.trim().validate_url() {
        return Ok(());
    }

    let mut err = ValidationError::new("image_url");
    err.message = Some("Please enter a valid image URL".into());
    Err(err)
}
