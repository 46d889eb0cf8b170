// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use crate::error::TagError;

/// Flat key/value description of one tag, as handed to a setter
///
/// Keys are snake_case (`uses_podping`); they become lowerCamelCase XML
/// attributes on output.
pub type Fields = BTreeMap<String, String>;

pub(crate) const YES_NO: &[&str] = &["yes", "no"];
pub(crate) const TRUE_FALSE: &[&str] = &["true", "false"];

/// Build a [`Fields`] map from `key => value` pairs
///
/// ```
/// use audioshelf::fields;
///
/// let funding = fields! {
///     "text" => "Support the show",
///     "url" => "https://example.com/donate",
/// };
/// assert_eq!(funding["text"], "Support the show");
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::feed::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::feed::Fields::new();
        $(
            fields.insert(::std::string::String::from($key), ::std::string::String::from($value));
        )+
        fields
    }};
}

/// Check every entry against the keys and values a tag accepts
///
/// Rejects keys outside `allowed`, entries lacking a `required` key and
/// values outside the set listed for their key in `allowed_values`.
pub fn ensure_format(
    tag: &'static str,
    entries: &[Fields],
    allowed: &[&str],
    required: &[&'static str],
    allowed_values: &[(&str, &[&str])],
) -> Result<(), TagError> {
    for entry in entries {
        if let Some(key) = entry.keys().find(|key| !allowed.contains(&key.as_str())) {
            return Err(TagError::UnknownKey {
                tag,
                key: key.clone(),
            });
        }

        if let Some(&key) = required.iter().find(|key| !entry.contains_key(**key)) {
            return Err(TagError::MissingKey { tag, key });
        }

        for (key, values) in allowed_values {
            if let Some(value) = entry.get(*key)
                && !values.contains(&value.as_str())
            {
                return Err(TagError::InvalidValue {
                    tag,
                    key: key.to_string(),
                    value: value.clone(),
                });
            }
        }
    }
    Ok(())
}

/// `uses_podping` -> `usesPodping`; names without underscores pass through
pub fn to_lower_camel_case(name: &str) -> String {
    if !name.contains('_') {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len());
    for (i, part) in name.to_lowercase().split('_').enumerate() {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) if i > 0 => {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
            Some(_) => out.push_str(part),
            None => {}
        }
    }
    out
}

/// Parse a field that must hold a whole number
pub(crate) fn integer_field(
    tag: &'static str,
    fields: &Fields,
    key: &str,
) -> Result<Option<u64>, TagError> {
    match fields.get(key) {
        None => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| TagError::InvalidValue {
                tag,
                key: key.to_string(),
                value: value.clone(),
            }),
    }
}

/// Parse a field that must hold a non-negative decimal number
pub(crate) fn decimal_field(
    tag: &'static str,
    fields: &Fields,
    key: &str,
) -> Result<Option<f64>, TagError> {
    match fields.get(key) {
        None => Ok(None),
        Some(value) => match value.parse::<f64>() {
            Ok(number) if number.is_finite() && number >= 0.0 => Ok(Some(number)),
            _ => Err(TagError::InvalidValue {
                tag,
                key: key.to_string(),
                value: value.clone(),
            }),
        },
    }
}
