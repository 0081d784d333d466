//! Query-string serialization shared by every provider endpoint.
//!
//! Rules: null and blank values are dropped, booleans render lower-case, multi-valued
//! entries join with commas unless the key is marked as an array key (then the pair is
//! repeated in input order), flag sets expand to the comma-joined names of their active
//! options. Keys are emitted in ordinal order so equivalent parameter sets always produce
//! the same query string; both key and value are percent-encoded with the RFC 3986
//! unreserved set left literal.

// std
use std::collections::BTreeSet;
// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
// self
use crate::{
	_prelude::*,
	id::{CountryCode, LanguageCode},
};

const QUERY_COMPONENT: &AsciiSet =
	&NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Percent-encodes one key or value.
pub fn encode_component(value: &str) -> String {
	utf8_percent_encode(value, QUERY_COMPONENT).to_string()
}

/// Types whose value may represent several simultaneous options.
pub trait QueryFlags {
	/// Names of the options that are currently set.
	fn active_flags(&self) -> Vec<&'static str>;
}

/// One query parameter value before serialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryValue {
	/// Dropped entirely.
	Null,
	/// Rendered as `true`/`false`.
	Bool(bool),
	/// Trimmed text; blank text is dropped.
	Text(String),
	/// Several values; comma-joined unless the key is an array key.
	List(Vec<String>),
	/// Active option names of a flag set; always comma-joined.
	Flags(Vec<String>),
}
impl QueryValue {
	/// Builds a [`QueryValue::Flags`] from a flag set.
	pub fn flags(value: &impl QueryFlags) -> Self {
		Self::Flags(value.active_flags().into_iter().map(str::to_owned).collect())
	}

	/// Builds a [`QueryValue::Text`] from any displayable value.
	pub fn display(value: impl Display) -> Self {
		Self::Text(value.to_string())
	}

	fn rendered(&self, array: bool) -> Vec<String> {
		match self {
			QueryValue::Null => Vec::new(),
			QueryValue::Bool(b) => vec![b.to_string()],
			QueryValue::Text(text) => non_blank(text).into_iter().collect(),
			QueryValue::List(items) | QueryValue::Flags(items) => {
				let items = items.iter().filter_map(|item| non_blank(item)).collect::<Vec<_>>();

				if items.is_empty() {
					Vec::new()
				} else if array && matches!(self, QueryValue::List(_)) {
					items
				} else {
					vec![items.join(",")]
				}
			},
		}
	}
}
impl From<bool> for QueryValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<&str> for QueryValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}
impl From<String> for QueryValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<&CountryCode> for QueryValue {
	fn from(value: &CountryCode) -> Self {
		Self::display(value)
	}
}
impl From<&LanguageCode> for QueryValue {
	fn from(value: &LanguageCode) -> Self {
		Self::display(value)
	}
}
impl<T> From<Option<T>> for QueryValue
where
	T: Into<QueryValue>,
{
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}
impl<T> From<Vec<T>> for QueryValue
where
	T: Display,
{
	fn from(values: Vec<T>) -> Self {
		Self::List(values.iter().map(ToString::to_string).collect())
	}
}

macro_rules! impl_display_query_value {
	($($ty:ty),*) => {$(
		impl From<$ty> for QueryValue {
			fn from(value: $ty) -> Self {
				Self::display(value)
			}
		}
	)*};
}
impl_display_query_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

/// Ordered parameter set rendered into a deterministic query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
	entries: Vec<(String, QueryValue)>,
	array_keys: BTreeSet<String>,
}
impl QueryParams {
	/// Creates an empty parameter set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a parameter.
	pub fn push(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
		self.entries.push((key.into(), value.into()));

		self
	}

	/// Adds a multi-valued parameter whose values are repeated as `key=v1&key=v2`.
	pub fn push_array<I, T>(self, key: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = T>,
		T: Display,
	{
		let key = key.into();
		let values = values.into_iter().map(|v| v.to_string()).collect::<Vec<_>>();

		self.mark_array(key.clone()).push(key, QueryValue::List(values))
	}

	/// Marks `key` as an array key.
	pub fn mark_array(mut self, key: impl Into<String>) -> Self {
		self.array_keys.insert(key.into());

		self
	}

	/// Whether a non-null value exists for `key`.
	pub fn contains_key(&self, key: &str) -> bool {
		self.entries
			.iter()
			.any(|(k, v)| k == key && !v.rendered(self.array_keys.contains(k)).is_empty())
	}

	/// Whether serialization would produce an empty string.
	pub fn is_empty(&self) -> bool {
		self.pairs().is_empty()
	}

	/// Renders `k=v` pairs joined with `&`, without the leading `?`.
	pub fn to_query_string(&self) -> String {
		self.pairs()
			.into_iter()
			.map(|(k, v)| format!("{}={}", encode_component(k), encode_component(&v)))
			.collect::<Vec<_>>()
			.join("&")
	}

	fn pairs(&self) -> Vec<(&str, String)> {
		let mut entries = self.entries.iter().collect::<Vec<_>>();

		// Stable sort keeps repeated keys in input order.
		entries.sort_by(|(a, _), (b, _)| a.cmp(b));
		entries
			.into_iter()
			.flat_map(|(key, value)| {
				value
					.rendered(self.array_keys.contains(key))
					.into_iter()
					.map(move |v| (key.as_str(), v))
			})
			.collect()
	}
}

fn non_blank(value: &str) -> Option<String> {
	let trimmed = value.trim();

	(!trimmed.is_empty()).then(|| trimmed.to_owned())
}
