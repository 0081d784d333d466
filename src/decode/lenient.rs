//! Permissive [`Deserializer`] over a parsed [`serde_json::Value`].
//!
//! Struct fields match case-insensitively against the shape's declared names, numbers and
//! booleans may arrive as quoted strings, and enum variants match by name regardless of
//! case (or by ordinal when sent as an integer).

// crates.io
use serde::{
	Deserializer,
	de::{
		self, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, Unexpected,
		VariantAccess, Visitor, value::StringDeserializer,
	},
	forward_to_deserialize_any,
};
use serde_json::{Error as JsonError, Map, Value};

/// Wraps a JSON value so nested containers are decoded with the same leniency.
pub(crate) struct Lenient(pub(crate) Value);

macro_rules! lenient_number {
	($($method:ident),*) => {$(
		fn $method<V>(self, visitor: V) -> Result<V::Value, JsonError>
		where
			V: Visitor<'de>,
		{
			match self.0 {
				Value::String(text) => visit_numeric_text(&text, visitor),
				other => Lenient(other).deserialize_any(visitor),
			}
		}
	)*};
}

impl<'de> Deserializer<'de> for Lenient {
	type Error = JsonError;

	forward_to_deserialize_any! { char bytes byte_buf unit_struct identifier }

	lenient_number!(
		deserialize_i8,
		deserialize_i16,
		deserialize_i32,
		deserialize_i64,
		deserialize_u8,
		deserialize_u16,
		deserialize_u32,
		deserialize_u64,
		deserialize_f32,
		deserialize_f64
	);

	fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		match self.0 {
			Value::Null => visitor.visit_unit(),
			Value::Bool(b) => visitor.visit_bool(b),
			Value::Number(n) => n.deserialize_any(visitor),
			Value::String(s) => visitor.visit_string(s),
			Value::Array(items) => visitor.visit_seq(LenientSeq(items.into_iter())),
			Value::Object(map) => visitor.visit_map(LenientMap::new(map, &[])),
		}
	}

	fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		match self.0 {
			Value::String(text) if text.trim().eq_ignore_ascii_case("true") =>
				visitor.visit_bool(true),
			Value::String(text) if text.trim().eq_ignore_ascii_case("false") =>
				visitor.visit_bool(false),
			other => Lenient(other).deserialize_any(visitor),
		}
	}

	fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		self.deserialize_string(visitor)
	}

	fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		match self.0 {
			Value::Number(n) => visitor.visit_string(n.to_string()),
			other => Lenient(other).deserialize_any(visitor),
		}
	}

	fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		match self.0 {
			Value::Null => visitor.visit_none(),
			other => visitor.visit_some(Lenient(other)),
		}
	}

	fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		self.deserialize_any(visitor)
	}

	fn deserialize_newtype_struct<V>(
		self,
		_name: &'static str,
		visitor: V,
	) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		visitor.visit_newtype_struct(self)
	}

	fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		self.deserialize_any(visitor)
	}

	fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		self.deserialize_any(visitor)
	}

	fn deserialize_tuple_struct<V>(
		self,
		_name: &'static str,
		_len: usize,
		visitor: V,
	) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		self.deserialize_any(visitor)
	}

	fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		self.deserialize_any(visitor)
	}

	fn deserialize_struct<V>(
		self,
		_name: &'static str,
		fields: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		match self.0 {
			Value::Object(map) => visitor.visit_map(LenientMap::new(map, fields)),
			other => Lenient(other).deserialize_any(visitor),
		}
	}

	fn deserialize_enum<V>(
		self,
		_name: &'static str,
		variants: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		match self.0 {
			Value::String(name) => {
				let name: StringDeserializer<JsonError> =
					resolve_name(name.trim(), variants).into_deserializer();

				visitor.visit_enum(name)
			},
			Value::Number(n) => {
				let variant = n
					.as_u64()
					.and_then(|idx| usize::try_from(idx).ok())
					.and_then(|idx| variants.get(idx))
					.ok_or_else(|| {
						de::Error::invalid_value(Unexpected::Other("enum ordinal"), &"a variant index")
					})?;
				let name: StringDeserializer<JsonError> = (*variant).to_owned().into_deserializer();

				visitor.visit_enum(name)
			},
			Value::Object(map) if map.len() == 1 => {
				let mut entries = map.into_iter();
				let (name, value) = entries
					.next()
					.ok_or_else(|| de::Error::invalid_length(0, &"a single-key object"))?;

				visitor.visit_enum(LenientEnum { variant: resolve_name(&name, variants), value })
			},
			other => Err(de::Error::invalid_type(unexpected(&other), &"an enum")),
		}
	}

	fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		visitor.visit_unit()
	}
}

struct LenientSeq(std::vec::IntoIter<Value>);
impl<'de> SeqAccess<'de> for LenientSeq {
	type Error = JsonError;

	fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, JsonError>
	where
		T: DeserializeSeed<'de>,
	{
		self.0.next().map(|value| seed.deserialize(Lenient(value))).transpose()
	}

	fn size_hint(&self) -> Option<usize> {
		Some(self.0.len())
	}
}

struct LenientMap {
	entries: serde_json::map::IntoIter,
	pending: Option<Value>,
	fields: &'static [&'static str],
}
impl LenientMap {
	fn new(map: Map<String, Value>, fields: &'static [&'static str]) -> Self {
		Self { entries: map.into_iter(), pending: None, fields }
	}
}
impl<'de> MapAccess<'de> for LenientMap {
	type Error = JsonError;

	fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, JsonError>
	where
		K: DeserializeSeed<'de>,
	{
		let Some((key, value)) = self.entries.next() else {
			return Ok(None);
		};

		self.pending = Some(value);

		let key: StringDeserializer<JsonError> = resolve_name(&key, self.fields).into_deserializer();

		seed.deserialize(key).map(Some)
	}

	fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, JsonError>
	where
		V: DeserializeSeed<'de>,
	{
		let value = self.pending.take().ok_or_else(|| de::Error::custom("value is missing"))?;

		seed.deserialize(Lenient(value))
	}

	fn size_hint(&self) -> Option<usize> {
		Some(self.entries.len())
	}
}

struct LenientEnum {
	variant: String,
	value: Value,
}
impl<'de> EnumAccess<'de> for LenientEnum {
	type Error = JsonError;
	type Variant = Lenient;

	fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Lenient), JsonError>
	where
		V: DeserializeSeed<'de>,
	{
		let variant: StringDeserializer<JsonError> = self.variant.into_deserializer();

		Ok((seed.deserialize(variant)?, Lenient(self.value)))
	}
}
impl<'de> VariantAccess<'de> for Lenient {
	type Error = JsonError;

	fn unit_variant(self) -> Result<(), JsonError> {
		match self.0 {
			Value::Null => Ok(()),
			other => Err(de::Error::invalid_type(unexpected(&other), &"a unit variant")),
		}
	}

	fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, JsonError>
	where
		T: DeserializeSeed<'de>,
	{
		seed.deserialize(self)
	}

	fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		self.deserialize_any(visitor)
	}

	fn struct_variant<V>(
		self,
		fields: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, JsonError>
	where
		V: Visitor<'de>,
	{
		self.deserialize_struct("", fields, visitor)
	}
}

/// Maps `name` onto a declared name ignoring ASCII case; unknown names pass through.
fn resolve_name(name: &str, declared: &'static [&'static str]) -> String {
	declared
		.iter()
		.find(|candidate| **candidate == name)
		.or_else(|| declared.iter().find(|candidate| candidate.eq_ignore_ascii_case(name)))
		.map_or_else(|| name.to_owned(), |candidate| (*candidate).to_owned())
}

fn visit_numeric_text<'de, V>(text: &str, visitor: V) -> Result<V::Value, JsonError>
where
	V: Visitor<'de>,
{
	let trimmed = text.trim();

	if let Ok(n) = trimmed.parse::<i64>() {
		visitor.visit_i64(n)
	} else if let Ok(n) = trimmed.parse::<u64>() {
		visitor.visit_u64(n)
	} else if let Ok(n) = trimmed.parse::<f64>() {
		visitor.visit_f64(n)
	} else {
		Err(de::Error::invalid_value(Unexpected::Str(text), &"a number"))
	}
}

fn unexpected(value: &Value) -> Unexpected<'_> {
	match value {
		Value::Null => Unexpected::Unit,
		Value::Bool(b) => Unexpected::Bool(*b),
		Value::Number(n) => n
			.as_i64()
			.map(Unexpected::Signed)
			.or_else(|| n.as_u64().map(Unexpected::Unsigned))
			.unwrap_or_else(|| Unexpected::Float(n.as_f64().unwrap_or_default())),
		Value::String(s) => Unexpected::Str(s),
		Value::Array(_) => Unexpected::Seq,
		Value::Object(_) => Unexpected::Map,
	}
}
