//! Strongly typed codes that provider endpoints accept as path or query arguments.
//!
//! Validation runs synchronously at construction so malformed input fails before any
//! request is assembled.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_code {
	($name:ident, $doc:literal, $kind:literal, $validate:ident) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new code after validation and case normalization.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				$validate($kind, value.as_ref()).map($name)
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

/// Error returned when code validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The code was empty or whitespace.
	#[error("{kind} code cannot be empty.")]
	Empty {
		/// Kind of code (country, language).
		kind: &'static str,
	},
	/// The code has the wrong number of characters.
	#[error("{kind} code must have {expected} letters, got {found}.")]
	InvalidLength {
		/// Kind of code (country, language).
		kind: &'static str,
		/// Human-readable accepted length.
		expected: &'static str,
		/// Character count that was supplied.
		found: usize,
	},
	/// The code contains something other than ASCII letters.
	#[error("{kind} code may only contain ASCII letters.")]
	NonAlphabetic {
		/// Kind of code (country, language).
		kind: &'static str,
	},
}

def_code! { CountryCode, "ISO 3166-1 alpha-2 country code, stored upper-case.", "Country", validate_country }
def_code! { LanguageCode, "ISO 639 language code (two or three letters), stored lower-case.", "Language", validate_language }

fn validate_country(kind: &'static str, view: &str) -> Result<String, IdentifierError> {
	validate_letters(kind, view, 2..=2, "2")?;

	Ok(view.to_ascii_uppercase())
}

fn validate_language(kind: &'static str, view: &str) -> Result<String, IdentifierError> {
	validate_letters(kind, view, 2..=3, "2 or 3")?;

	Ok(view.to_ascii_lowercase())
}

fn validate_letters(
	kind: &'static str,
	view: &str,
	accepted: std::ops::RangeInclusive<usize>,
	expected: &'static str,
) -> Result<(), IdentifierError> {
	if view.trim().is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if !view.chars().all(|c| c.is_ascii_alphabetic()) {
		return Err(IdentifierError::NonAlphabetic { kind });
	}
	if !accepted.contains(&view.len()) {
		return Err(IdentifierError::InvalidLength { kind, expected, found: view.len() });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn country_codes_normalize_and_validate() {
		let code = CountryCode::new("de").expect("Two letters should be accepted.");

		assert_eq!(code.as_ref(), "DE");
		assert_eq!(format!("{code:?}"), "Country(DE)");
		assert_eq!(
			CountryCode::new("DEU"),
			Err(IdentifierError::InvalidLength { kind: "Country", expected: "2", found: 3 })
		);
		assert_eq!(CountryCode::new(""), Err(IdentifierError::Empty { kind: "Country" }));
		assert_eq!(CountryCode::new("D1"), Err(IdentifierError::NonAlphabetic { kind: "Country" }));
		assert!(CountryCode::new(" D").is_err(), "Whitespace must be rejected.");
	}

	#[test]
	fn language_codes_accept_two_or_three_letters() {
		assert_eq!(LanguageCode::new("EN").expect("Two letters should pass.").as_ref(), "en");
		assert_eq!(LanguageCode::new("deu").expect("Three letters should pass.").as_ref(), "deu");
		assert!(LanguageCode::new("e").is_err());
		assert!(LanguageCode::new("engl").is_err());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let code: CountryCode =
			serde_json::from_str("\"br\"").expect("Country code should deserialize.");

		assert_eq!(code.as_ref(), "BR");
		assert_eq!(serde_json::to_string(&code).expect("Country code should serialize."), "\"BR\"");
		assert!(serde_json::from_str::<CountryCode>("\"BRA\"").is_err());
		assert_eq!("fr".parse::<CountryCode>().map(String::from), Ok("FR".to_owned()));
	}
}
