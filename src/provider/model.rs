//! Provider response payloads, shaped after the provider's JSON field names.
//!
//! Every identity field is optional at this layer: presence is enforced by the flows
//! and the principal mapper, which turn a missing mandatory field into a
//! [`MappingError`](crate::principal::MappingError) rather than a decode failure.

// self
use crate::{_prelude::*, auth::AccessToken};

/// Access token minted by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenGrant {
	/// Token value.
	pub access_token: AccessToken,
	/// Lifetime reported by the provider, if any.
	pub expires_in: Option<Duration>,
}
impl TokenGrant {
	/// Creates a grant without a provider-reported lifetime.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self { access_token: AccessToken::new(access_token), expires_in: None }
	}

	/// Attaches the provider-reported lifetime.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
		self.expires_in = Some(expires_in);

		self
	}
}

/// Identity returned by the internal-app code exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicIdentity {
	/// Organization user id.
	#[serde(default, rename = "userid")]
	pub user_id: Option<String>,
	/// Administrative level (0 member, 1 primary admin, 2 sub admin, 100 boss).
	#[serde(default)]
	pub sys_level: Option<i64>,
	/// Whether the user is an administrator.
	#[serde(default)]
	pub is_sys: Option<bool>,
}

/// Identity returned by the scan-code exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionIdentity {
	/// Provider-wide user identifier.
	#[serde(default, rename = "unionid")]
	pub union_id: Option<String>,
	/// Application-scoped user identifier.
	#[serde(default, rename = "openid")]
	pub open_id: Option<String>,
	/// Nickname shown in the provider client.
	#[serde(default, rename = "nick")]
	pub nickname: Option<String>,
}

/// Result of resolving a union id inside one organization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdLookup {
	/// Organization user id.
	#[serde(default, rename = "userid")]
	pub user_id: Option<String>,
	/// 0 for internal members, 1 for external contacts.
	#[serde(default, rename = "contactType")]
	pub contact_type: Option<i64>,
}

/// Role entry attached to a user profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRole {
	/// Role identifier.
	#[serde(default)]
	pub id: Option<i64>,
	/// Role name.
	#[serde(default)]
	pub name: Option<String>,
	/// Role group name.
	#[serde(default)]
	pub group_name: Option<String>,
}

/// Full user profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullProfile {
	/// Organization user id.
	#[serde(default, rename = "userid")]
	pub user_id: Option<String>,
	/// Provider-wide user identifier.
	#[serde(default, rename = "unionid")]
	pub union_id: Option<String>,
	/// Display name.
	#[serde(default)]
	pub name: Option<String>,
	/// Nickname.
	#[serde(default)]
	pub nickname: Option<String>,
	/// Avatar URL.
	#[serde(default)]
	pub avatar: Option<String>,
	/// Mobile number.
	#[serde(default)]
	pub mobile: Option<String>,
	/// Personal email.
	#[serde(default)]
	pub email: Option<String>,
	/// Organization mailbox, when one is provisioned.
	#[serde(default)]
	pub org_email: Option<String>,
	/// Employee number.
	#[serde(default, rename = "jobnumber")]
	pub job_number: Option<String>,
	/// Job title.
	#[serde(default)]
	pub position: Option<String>,
	/// Extension number.
	#[serde(default)]
	pub tel: Option<String>,
	/// Office location.
	#[serde(default)]
	pub work_place: Option<String>,
	/// Free-form remark.
	#[serde(default)]
	pub remark: Option<String>,
	/// Country calling code.
	#[serde(default)]
	pub state_code: Option<String>,
	/// Hire date as epoch milliseconds.
	#[serde(default)]
	pub hired_date: Option<i64>,
	/// Department ids in provider order.
	#[serde(default)]
	pub department: Vec<i64>,
	/// Roles held by the user.
	#[serde(default)]
	pub roles: Vec<ProfileRole>,
	/// Organization administrator flag.
	#[serde(default)]
	pub is_admin: Option<bool>,
	/// Organization owner flag.
	#[serde(default)]
	pub is_boss: Option<bool>,
	/// Hidden-number flag.
	#[serde(default)]
	pub is_hide: Option<bool>,
	/// Senior-executive flag.
	#[serde(default)]
	pub is_senior: Option<bool>,
	/// Activation flag.
	#[serde(default)]
	pub active: Option<bool>,
	/// Extended attributes; either a JSON object or a JSON-encoded string.
	#[serde(default, rename = "extattr")]
	pub ext_attr: Option<serde_json::Value>,
}
