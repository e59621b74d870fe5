use serde::{Deserialize, Serialize};

use crate::Result;

use super::{Packaging, Track};

/// A WARP catalog, published as JSON on its own track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Catalog {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<u32>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub generated_at: Option<u64>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub tracks: Vec<Track>,
}

impl Catalog {
	/// The conventional name of the catalog track.
	pub const DEFAULT_NAME: &'static str = "catalog";

	pub fn from_slice(data: &[u8]) -> Result<Self> {
		Ok(serde_json::from_slice(data)?)
	}

	#[allow(clippy::should_implement_trait)]
	pub fn from_str(data: &str) -> Result<Self> {
		Ok(serde_json::from_str(data)?)
	}

	pub fn to_vec(&self) -> Result<Vec<u8>> {
		Ok(serde_json::to_vec(self)?)
	}

	pub fn to_string_pretty(&self) -> Result<String> {
		Ok(serde_json::to_string_pretty(self)?)
	}

	/// The CMAF media tracks a player should consider subscribing.
	pub fn media_tracks(&self) -> impl Iterator<Item = &Track> {
		self.tracks
			.iter()
			.filter(|track| track.packaging == Some(Packaging::Cmaf) && track.init_track.is_some())
	}

	/// Look up a track by name, e.g. to resolve an `initTrack` reference.
	pub fn track(&self, name: &str) -> Option<&Track> {
		self.tracks.iter().find(|track| track.name == name)
	}
}
