//! Flattening of heterogeneous provider responses into one normalized principal.
//!
//! Mapping is pure: no network or cache access. Optional fields that are missing or
//! unparseable stay unset; only the organization user id is mandatory.

// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, OpenId, UnionId, UserId},
	provider::{FullProfile, UnionIdentity},
};

/// Mapping failure for an otherwise successful provider response.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum MappingError {
	/// A field the active flow requires was absent or blank.
	#[error("Provider response lacks mandatory field `{field}`.")]
	MissingField {
		/// Provider field name.
		field: &'static str,
	},
	/// A mandatory identifier was present but malformed.
	#[error("Provider response field `{field}` is not a valid identifier.")]
	InvalidIdentifier {
		/// Provider field name.
		field: &'static str,
		/// Underlying validation failure.
		#[source]
		source: IdentifierError,
	},
}

/// Flow-agnostic representation of an authenticated provider user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPrincipal {
	/// Organization user id; always present.
	pub user_id: UserId,
	/// Provider-wide identifier, when the flow resolved one.
	pub union_id: Option<UnionId>,
	/// Application-scoped identifier, when the flow resolved one.
	pub open_id: Option<OpenId>,
	/// Display name.
	pub display_name: Option<String>,
	/// Nickname.
	pub nickname: Option<String>,
	/// Avatar URL.
	pub avatar_url: Option<String>,
	/// Mobile number.
	pub mobile: Option<String>,
	/// Personal email.
	pub email: Option<String>,
	/// Organization mailbox.
	pub org_email: Option<String>,
	/// Employee number.
	pub job_number: Option<String>,
	/// Job title.
	pub position: Option<String>,
	/// Extension number.
	pub tel: Option<String>,
	/// Office location.
	pub work_place: Option<String>,
	/// Free-form remark.
	pub remark: Option<String>,
	/// Country calling code.
	pub state_code: Option<String>,
	/// Hire date.
	pub hired_at: Option<OffsetDateTime>,
	/// Department ids in provider order.
	pub department_ids: Vec<i64>,
	/// Role names.
	pub roles: BTreeSet<String>,
	/// Organization administrator flag.
	pub is_admin: bool,
	/// Organization owner flag.
	pub is_boss: bool,
	/// Activation flag.
	pub is_active: bool,
	/// Hidden-number flag.
	pub is_hidden: bool,
	/// Senior-executive flag.
	pub is_senior: bool,
	/// Extended attributes flattened to strings.
	pub extended_attributes: BTreeMap<String, String>,
}

/// Collects provider response fragments and produces a [`NormalizedPrincipal`].
///
/// The user id given through [`with_user_id`](Self::with_user_id) comes from the
/// identity step of the flow and wins over the one echoed by the profile. Union and
/// open ids from the scan-code exchange likewise win over the profile's union id.
#[derive(Clone, Debug, Default)]
pub struct PrincipalBuilder {
	user_id: Option<String>,
	union: Option<UnionIdentity>,
	profile: Option<FullProfile>,
}
impl PrincipalBuilder {
	/// Starts an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the user id resolved by the flow's identity step.
	pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = Some(user_id.into());

		self
	}

	/// Attaches the scan-code union identity.
	pub fn with_union_identity(mut self, union: UnionIdentity) -> Self {
		self.union = Some(union);

		self
	}

	/// Attaches the full profile.
	pub fn with_profile(mut self, profile: FullProfile) -> Self {
		self.profile = Some(profile);

		self
	}

	/// Produces the principal, failing only when the user id is missing or malformed.
	pub fn build(self) -> Result<NormalizedPrincipal, MappingError> {
		let Self { user_id, union, profile } = self;
		let profile = profile.unwrap_or_default();
		let union = union.unwrap_or_default();
		let raw_user_id = non_blank(user_id)
			.or_else(|| non_blank(profile.user_id.clone()))
			.ok_or(MappingError::MissingField { field: "userid" })?;
		let user_id = UserId::new(&raw_user_id)
			.map_err(|source| MappingError::InvalidIdentifier { field: "userid", source })?;
		let union_id = non_blank(union.union_id)
			.or_else(|| non_blank(profile.union_id))
			.and_then(|value| UnionId::new(value).ok());
		let open_id = non_blank(union.open_id).and_then(|value| OpenId::new(value).ok());
		let roles = profile.roles.into_iter().filter_map(|role| non_blank(role.name)).collect();

		Ok(NormalizedPrincipal {
			user_id,
			union_id,
			open_id,
			display_name: non_blank(profile.name),
			nickname: non_blank(profile.nickname).or_else(|| non_blank(union.nickname)),
			avatar_url: non_blank(profile.avatar),
			mobile: non_blank(profile.mobile),
			email: non_blank(profile.email),
			org_email: non_blank(profile.org_email),
			job_number: non_blank(profile.job_number),
			position: non_blank(profile.position),
			tel: non_blank(profile.tel),
			work_place: non_blank(profile.work_place),
			remark: non_blank(profile.remark),
			state_code: non_blank(profile.state_code),
			hired_at: profile.hired_date.and_then(hired_at),
			department_ids: profile.department,
			roles,
			is_admin: profile.is_admin.unwrap_or(false),
			is_boss: profile.is_boss.unwrap_or(false),
			is_active: profile.active.unwrap_or(false),
			is_hidden: profile.is_hide.unwrap_or(false),
			is_senior: profile.is_senior.unwrap_or(false),
			extended_attributes: profile.ext_attr.map(extended_attributes).unwrap_or_default(),
		})
	}
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.filter(|v| !v.trim().is_empty())
}

fn hired_at(epoch_millis: i64) -> Option<OffsetDateTime> {
	OffsetDateTime::from_unix_timestamp_nanos(i128::from(epoch_millis) * 1_000_000).ok()
}

// The provider sends `extattr` either as an object or as a JSON-encoded object string.
fn extended_attributes(raw: serde_json::Value) -> BTreeMap<String, String> {
	let object = match raw {
		serde_json::Value::Object(object) => object,
		serde_json::Value::String(encoded) =>
			match serde_json::from_str::<serde_json::Value>(&encoded) {
				Ok(serde_json::Value::Object(object)) => object,
				_ => return BTreeMap::new(),
			},
		_ => return BTreeMap::new(),
	};

	object
		.into_iter()
		.filter_map(|(key, value)| match value {
			serde_json::Value::Null => None,
			serde_json::Value::String(text) => Some((key, text)),
			other => Some((key, other.to_string())),
		})
		.collect()
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::provider::ProfileRole;

	fn alice() -> FullProfile {
		FullProfile {
			user_id: Some("u1".into()),
			name: Some("Alice".into()),
			department: vec![10, 20],
			is_admin: Some(true),
			..Default::default()
		}
	}

	#[test]
	fn maps_the_code_login_profile() {
		let principal = PrincipalBuilder::new()
			.with_user_id("u1")
			.with_profile(alice())
			.build()
			.expect("Complete profile should map.");

		assert_eq!(principal.user_id.as_str(), "u1");
		assert_eq!(principal.display_name.as_deref(), Some("Alice"));
		assert_eq!(principal.department_ids, vec![10, 20]);
		assert!(principal.is_admin);
		assert!(!principal.is_boss);
		assert_eq!(principal.union_id, None);
		assert_eq!(principal.hired_at, None);
	}

	#[test]
	fn missing_extattr_yields_empty_attributes() {
		let principal =
			PrincipalBuilder::new().with_profile(alice()).build().expect("Profile should map.");

		assert!(principal.extended_attributes.is_empty());
	}

	#[test]
	fn missing_user_id_is_a_mapping_error() {
		let profile = FullProfile { user_id: None, ..alice() };
		let err = PrincipalBuilder::new()
			.with_profile(profile)
			.build()
			.expect_err("Profiles without a user id must fail.");

		assert_eq!(err, MappingError::MissingField { field: "userid" });

		let err = PrincipalBuilder::new()
			.with_user_id("  ")
			.build()
			.expect_err("Blank user ids must fail.");

		assert_eq!(err, MappingError::MissingField { field: "userid" });
	}

	#[test]
	fn identity_step_user_id_wins_over_profile() {
		let principal = PrincipalBuilder::new()
			.with_user_id("from-identity")
			.with_profile(alice())
			.build()
			.expect("Profile should map.");

		assert_eq!(principal.user_id.as_str(), "from-identity");
	}

	#[test]
	fn union_identity_fills_scan_login_fields() {
		let union = UnionIdentity {
			union_id: Some("union-1".into()),
			open_id: Some("open-1".into()),
			nickname: Some("Ally".into()),
		};
		let profile = FullProfile { union_id: Some("profile-union".into()), ..alice() };
		let principal = PrincipalBuilder::new()
			.with_user_id("u1")
			.with_union_identity(union)
			.with_profile(profile)
			.build()
			.expect("Combined fragments should map.");

		assert_eq!(principal.union_id.as_deref(), Some("union-1"));
		assert_eq!(principal.open_id.as_deref(), Some("open-1"));
		assert_eq!(principal.nickname.as_deref(), Some("Ally"));
	}

	#[test]
	fn extattr_accepts_objects_and_encoded_strings() {
		let object = FullProfile { ext_attr: Some(json!({ "desk": "A-12", "floor": 3 })), ..alice() };
		let encoded = FullProfile {
			ext_attr: Some(json!(r#"{"desk":"A-12","floor":3}"#)),
			..alice()
		};
		let garbage = FullProfile { ext_attr: Some(json!("not json")), ..alice() };

		for profile in [object, encoded] {
			let principal = PrincipalBuilder::new().with_profile(profile).build().expect("Should map.");

			assert_eq!(principal.extended_attributes.get("desk").map(String::as_str), Some("A-12"));
			assert_eq!(principal.extended_attributes.get("floor").map(String::as_str), Some("3"));
		}

		let principal = PrincipalBuilder::new().with_profile(garbage).build().expect("Should map.");

		assert!(principal.extended_attributes.is_empty());
	}

	#[test]
	fn roles_hire_date_and_flags_are_normalized() {
		let profile = FullProfile {
			roles: vec![
				ProfileRole { id: Some(1), name: Some("Manager".into()), group_name: None },
				ProfileRole { id: Some(2), name: None, group_name: None },
				ProfileRole { id: Some(3), name: Some("Manager".into()), group_name: None },
			],
			hired_date: Some(1_520_265_600_000),
			is_hide: Some(true),
			active: Some(true),
			..alice()
		};
		let principal = PrincipalBuilder::new().with_profile(profile).build().expect("Should map.");

		assert_eq!(principal.roles.iter().collect::<Vec<_>>(), vec!["Manager"]);
		assert_eq!(principal.hired_at.map(OffsetDateTime::unix_timestamp), Some(1_520_265_600));
		assert!(principal.is_hidden);
		assert!(principal.is_active);
		assert!(!principal.is_senior);
	}
}
