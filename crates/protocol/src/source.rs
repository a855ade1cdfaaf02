//! Sources, host surfaces and the annotated catalog view.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque handle identifying a source (a browser tab id on the Chrome host).
///
/// Identity is by handle only: two [`Source`] values with the same id refer
/// to the same candidate even if every other field differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub i32);

impl fmt::Display for SourceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.pad(&self.0.to_string())
	}
}

impl FromStr for SourceId {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.trim().parse().map(SourceId)
	}
}

impl From<i32> for SourceId {
	fn from(id: i32) -> Self {
		SourceId(id)
	}
}

/// A capturable candidate as reported by the catalog.
///
/// Sources are snapshots: the catalog regenerates them on every query and
/// nothing mutates them in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
	pub id: SourceId,
	/// Display name (tab title). May be empty.
	#[serde(default)]
	pub title: String,
	/// Address of the underlying resource, when the host exposes it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	/// Whether the source is currently producing sound.
	#[serde(default)]
	pub audible: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fav_icon_url: Option<String>,
}

impl Source {
	pub fn new(id: impl Into<SourceId>, title: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			title: title.into(),
			url: None,
			audible: false,
			fav_icon_url: None,
		}
	}

	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.url = Some(url.into());
		self
	}

	pub fn audible(mut self, audible: bool) -> Self {
		self.audible = audible;
		self
	}

	/// Title for display, falling back to `Untitled` for blank titles.
	pub fn display_title(&self) -> &str {
		if self.title.trim().is_empty() {
			"Untitled"
		} else {
			&self.title
		}
	}
}

/// Audibility filter applied on top of the visibility rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFilter {
	#[default]
	All,
	WithAudio,
	WithoutAudio,
}

impl SourceFilter {
	pub fn as_str(&self) -> &'static str {
		match self {
			SourceFilter::All => "all",
			SourceFilter::WithAudio => "with-audio",
			SourceFilter::WithoutAudio => "without-audio",
		}
	}

	/// Returns true if a source with the given audibility passes this filter.
	pub fn admits(&self, audible: bool) -> bool {
		match self {
			SourceFilter::All => true,
			SourceFilter::WithAudio => audible,
			SourceFilter::WithoutAudio => !audible,
		}
	}
}

impl fmt::Display for SourceFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SourceFilter {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"all" => Ok(SourceFilter::All),
			"with-audio" => Ok(SourceFilter::WithAudio),
			"without-audio" => Ok(SourceFilter::WithoutAudio),
			_ => Err(format!("unknown filter: {s}")),
		}
	}
}

/// One row of the presentation view: a source plus its selection markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEntry {
	pub id: SourceId,
	pub title: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	pub audible: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fav_icon_url: Option<String>,
	pub selected: bool,
	pub disabled: bool,
}

/// Loading status of a host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceStatus {
	#[default]
	Loading,
	Complete,
}

/// Host-side view of a source at the moment it is queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Surface {
	pub id: SourceId,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(default)]
	pub status: SurfaceStatus,
}

impl Surface {
	/// A surface is ready for capture once it has an address and finished loading.
	pub fn is_ready(&self) -> bool {
		self.url.as_deref().is_some_and(|u| !u.is_empty()) && self.status == SurfaceStatus::Complete
	}
}
