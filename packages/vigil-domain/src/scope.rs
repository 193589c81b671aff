use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
	Researcher,
	Admin,
}
impl Role {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"RESEARCHER" => Some(Self::Researcher),
			"ADMIN" => Some(Self::Admin),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Researcher => "RESEARCHER",
			Self::Admin => "ADMIN",
		}
	}

	pub fn is_admin(&self) -> bool {
		matches!(self, Self::Admin)
	}
}

/// A caller whose identity has already been resolved by the transport layer.
#[derive(Clone, Copy, Debug)]
pub struct Caller {
	pub id: Uuid,
	pub role: Role,
}
impl Caller {
	pub fn scope(&self) -> AccessScope {
		AccessScope::of(self)
	}
}

/// Row-visibility predicate derived from a caller's role. Every query against
/// the vulnerability and comment tables goes through this, directly or via
/// the parent vulnerability.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccessScope {
	Admin,
	Researcher(Uuid),
}
impl AccessScope {
	pub fn of(caller: &Caller) -> Self {
		match caller.role {
			Role::Admin => Self::Admin,
			Role::Researcher => Self::Researcher(caller.id),
		}
	}

	/// The reporter the scope is restricted to, if any. `None` means full
	/// visibility.
	pub fn reporter_filter(&self) -> Option<Uuid> {
		match self {
			Self::Admin => None,
			Self::Researcher(id) => Some(*id),
		}
	}

	pub fn allows_reporter(&self, reporter_id: Uuid) -> bool {
		match self {
			Self::Admin => true,
			Self::Researcher(id) => *id == reporter_id,
		}
	}
}
