//! Page-level settings of the custom element bridge.

use core::fmt::{self, Display, Formatter};

/// [`BridgeConfig::tag_prefix`] default.
pub const DEFAULT_TAG_PREFIX: &str = "chakra";
/// [`BridgeConfig::host_id`] default.
pub const DEFAULT_HOST_ID: &str = "chakra-wc-portal-host";
/// [`BridgeConfig::recheck_delay_ms`] default.
pub const DEFAULT_RECHECK_DELAY_MS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
	/// Every custom element is defined as `<tag_prefix>-<suffix>`. Always lowercase.
	pub tag_prefix: String,
	/// The `id` of the hidden element the render root is mounted into.
	pub host_id: String,
	/// How long kinds with a deferred recheck wait before deriving their state again.
	pub recheck_delay_ms: u32,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			tag_prefix: DEFAULT_TAG_PREFIX.to_owned(),
			host_id: DEFAULT_HOST_ID.to_owned(),
			recheck_delay_ms: DEFAULT_RECHECK_DELAY_MS,
		}
	}
}

impl BridgeConfig {
	/// Lowercases `tag_prefix`.
	#[must_use]
	pub fn with_tag_prefix(mut self, tag_prefix: &str) -> Self {
		self.tag_prefix = tag_prefix.to_ascii_lowercase();
		self
	}

	#[must_use]
	pub fn with_host_id(mut self, host_id: &str) -> Self {
		self.host_id = host_id.to_owned();
		self
	}

	#[must_use]
	pub fn with_recheck_delay_ms(mut self, recheck_delay_ms: u32) -> Self {
		self.recheck_delay_ms = recheck_delay_ms;
		self
	}

	/// Checks that combined tag names are valid custom element names.
	///
	/// # Errors
	///
	/// Iff the prefix is empty, doesn't start with an ASCII letter or contains anything other than ASCII alphanumerics, `-`, `.` and `_`.
	/// Also iff the host id is empty.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let mut chars = self.tag_prefix.chars();
		match chars.next() {
			None => return Err(ConfigError::EmptyTagPrefix),
			Some(first) if !first.is_ascii_lowercase() => return Err(ConfigError::InvalidTagPrefix(self.tag_prefix.clone())),
			Some(_) => (),
		}
		if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_')) {
			return Err(ConfigError::InvalidTagPrefix(self.tag_prefix.clone()));
		}
		if self.host_id.is_empty() {
			return Err(ConfigError::EmptyHostId);
		}
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
	EmptyTagPrefix,
	InvalidTagPrefix(String),
	EmptyHostId,
}

impl Display for ConfigError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::EmptyTagPrefix => f.write_str("The tag prefix must not be empty."),
			ConfigError::InvalidTagPrefix(prefix) => write!(f, "{:?} can't be used as custom element name prefix.", prefix),
			ConfigError::EmptyHostId => f.write_str("The host id must not be empty."),
		}
	}
}

impl std::error::Error for ConfigError {}
