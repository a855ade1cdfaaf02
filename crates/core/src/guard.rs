//! Address policies: the host security denylist and the audio allow-list.

use crate::error::CaptureError;

/// Returns true if `url` starts with any of the restricted scheme prefixes.
pub fn is_restricted(url: &str, prefixes: &[String]) -> bool {
	prefixes.iter().any(|prefix| url.starts_with(prefix.as_str()))
}

/// Fails with [`CaptureError::Restricted`] when the address is on the denylist.
///
/// Surfaces without an address are not restricted here; readiness covers them.
pub fn ensure_capturable(url: Option<&str>, prefixes: &[String]) -> Result<(), CaptureError> {
	match url {
		Some(url) if is_restricted(url, prefixes) => Err(CaptureError::Restricted {
			url: url.to_string(),
		}),
		_ => Ok(()),
	}
}

/// Returns true if `url` mentions any allow-listed domain.
///
/// Matching is a plain substring test, so `youtube.com` also admits
/// `music.youtube.com` and any path on it.
pub fn is_allow_listed(url: &str, domains: &[String]) -> bool {
	domains
		.iter()
		.any(|domain| !domain.is_empty() && url.contains(domain.as_str()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::PanelConfig;

	#[test]
	fn default_denylist() {
		let prefixes = PanelConfig::default().restricted_prefixes;

		assert!(is_restricted("chrome://settings", &prefixes));
		assert!(is_restricted("chrome-extension://abc/panel.html", &prefixes));
		assert!(is_restricted("edge://flags", &prefixes));
		assert!(is_restricted("about:blank", &prefixes));
		assert!(!is_restricted("https://example.com/chrome://", &prefixes));
	}

	#[test]
	fn missing_address_is_not_restricted() {
		let prefixes = PanelConfig::default().restricted_prefixes;
		assert_eq!(ensure_capturable(None, &prefixes), Ok(()));
		assert_eq!(
			ensure_capturable(Some("about:blank"), &prefixes),
			Err(CaptureError::Restricted {
				url: "about:blank".into()
			})
		);
	}

	#[test]
	fn allow_list_matches_substrings() {
		let domains = vec!["youtube.com".to_string(), String::new()];

		assert!(is_allow_listed("https://music.youtube.com/watch?v=1", &domains));
		assert!(!is_allow_listed("https://example.com", &domains));
	}
}
