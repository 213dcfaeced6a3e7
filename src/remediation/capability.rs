//! Well-known behaviors a remediation can advertise.
//!
//! Capabilities let callers branch on specialized behavior (poll this form,
//! follow this redirect) without string-matching raw remediation names. They
//! are purely descriptive; `proceed` works the same with or without them.

// self
use crate::_prelude::*;

/// Specialized behavior attached to a remediation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Capability {
	/// Re-issue the same request after the interval when no user action occurs.
	Poll {
		/// Server-suggested polling interval.
		interval: Duration,
	},
	/// The form re-sends a challenge (e.g. another email or SMS code).
	Resend,
	/// The form starts an account-recovery branch.
	Recover,
	/// The step is completed by navigating a browser to an external address.
	Redirect {
		/// Address the user agent must visit.
		url: Url,
	},
	/// The step delegates to a social/external identity provider.
	SocialIdp {
		/// Provider-assigned identifier.
		id: String,
		/// Human-readable provider service name.
		service: String,
	},
}
impl Capability {
	/// Returns the lookup tag for this capability.
	pub fn tag(&self) -> CapabilityTag {
		match self {
			Self::Poll { .. } => CapabilityTag::Poll,
			Self::Resend => CapabilityTag::Resend,
			Self::Recover => CapabilityTag::Recover,
			Self::Redirect { .. } => CapabilityTag::Redirect,
			Self::SocialIdp { .. } => CapabilityTag::SocialIdp,
		}
	}
}

/// Tag used to look a capability up on a remediation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapabilityTag {
	/// [`Capability::Poll`].
	Poll,
	/// [`Capability::Resend`].
	Resend,
	/// [`Capability::Recover`].
	Recover,
	/// [`Capability::Redirect`].
	Redirect,
	/// [`Capability::SocialIdp`].
	SocialIdp,
}
impl CapabilityTag {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CapabilityTag::Poll => "poll",
			CapabilityTag::Resend => "resend",
			CapabilityTag::Recover => "recover",
			CapabilityTag::Redirect => "redirect",
			CapabilityTag::SocialIdp => "social_idp",
		}
	}
}
impl Display for CapabilityTag {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
