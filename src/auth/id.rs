//! Strongly typed identifiers for applications and provider-side users.
//!
//! Provider identifiers are short printable-ASCII tokens: application keys such as
//! `dingoa0xxxxxx` or `suite4xxxxxx`, organization user ids of at most 64 characters, and
//! base64-like union and open ids. Anything else (blank values, whitespace, control or
//! non-ASCII characters, oversized input) is rejected before it reaches a provider call.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

/// Longest identifier the provider issues (organization user ids cap at 64 characters).
pub const PROVIDER_ID_MAX_LEN: usize = 64;

macro_rules! def_id {
	($name:ident, $kind:literal, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Label used in validation errors and `Debug` output.
			pub const KIND: &'static str = $kind;

			/// Validates and copies `value`.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				Self::try_from(value.as_ref().to_owned())
			}

			/// Returns the identifier as a string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				check(Self::KIND, &value).map(|()| Self(value))
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", Self::KIND, self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

/// Identifier validation failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Identifier label (`AppKey`, `UserId`, `UnionId`, `OpenId`).
		kind: &'static str,
	},
	/// The identifier holds a character outside printable ASCII.
	#[error("{kind} identifier contains {character:?} at byte {index}.")]
	InvalidCharacter {
		/// Identifier label.
		kind: &'static str,
		/// Offending character.
		character: char,
		/// Byte offset of the offending character.
		index: usize,
	},
	/// The identifier is longer than [`PROVIDER_ID_MAX_LEN`].
	#[error("{kind} identifier is {len} characters long; the limit is {max}.", max = PROVIDER_ID_MAX_LEN)]
	TooLong {
		/// Identifier label.
		kind: &'static str,
		/// Length of the rejected value.
		len: usize,
	},
}
impl IdentifierError {
	/// Label of the identifier that failed validation.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Empty { kind } | Self::InvalidCharacter { kind, .. } | Self::TooLong { kind, .. } =>
				kind,
		}
	}
}

def_id! { AppKey, "AppKey", "Public application key (`appKey`, `appId`, or suite id) issued by the provider." }
def_id! { UserId, "UserId", "Provider-side user identifier, unique within one organization." }
def_id! { UnionId, "UnionId", "Provider-wide user identifier shared by every application of a developer." }
def_id! { OpenId, "OpenId", "User identifier scoped to a single provider application." }

fn check(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if let Some((index, character)) = value.char_indices().find(|(_, c)| !c.is_ascii_graphic()) {
		return Err(IdentifierError::InvalidCharacter { kind, character, index });
	}
	// Printable ASCII from here on, so bytes and characters agree.
	if value.len() > PROVIDER_ID_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, len: value.len() });
	}

	Ok(())
}
