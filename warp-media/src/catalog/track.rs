use serde::{Deserialize, Serialize};

/// How a track's objects are packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Packaging {
	/// ISO-BMFF fragments (init segment + moof/mdat pairs).
	Cmaf,
	/// Low Overhead Container; not played by this client.
	Loc,
}

/// One track entry in the catalog.
///
/// Only a few fields matter to playback; the rest is retained so a catalog
/// can be inspected or re-serialized losslessly enough for debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Track {
	pub name: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub namespace: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub packaging: Option<Packaging>,

	/// Name of the track carrying this track's initialization segment.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub init_track: Option<String>,

	/// Inline initialization data, base64; unused when `init_track` is set.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub init_data: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub codec: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub mime_type: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub framerate: Option<f64>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub bitrate: Option<u64>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub timescale: Option<u64>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub width: Option<u32>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub height: Option<u32>,

	#[serde(rename = "samplerate", skip_serializing_if = "Option::is_none")]
	pub sample_rate: Option<u32>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub channel_config: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub lang: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub render_group: Option<u64>,
}

impl Track {
	pub fn is_video(&self) -> bool {
		self.width.is_some() || self.mime_type.as_deref().is_some_and(|m| m.starts_with("video/"))
	}

	pub fn is_audio(&self) -> bool {
		self.sample_rate.is_some() || self.mime_type.as_deref().is_some_and(|m| m.starts_with("audio/"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_heuristics() {
		let video: Track = serde_json::from_str(r#"{"name": "v", "width": 640}"#).unwrap();
		assert!(video.is_video());
		assert!(!video.is_audio());

		let audio: Track = serde_json::from_str(r#"{"name": "a", "mimeType": "audio/mp4"}"#).unwrap();
		assert!(audio.is_audio());
		assert!(!audio.is_video());
	}

	#[test]
	fn packaging_is_lowercase_on_the_wire() {
		let track: Track = serde_json::from_str(r#"{"name": "v", "packaging": "cmaf"}"#).unwrap();
		assert_eq!(track.packaging, Some(Packaging::Cmaf));

		let json = serde_json::to_string(&track).unwrap();
		assert!(json.contains(r#""packaging":"cmaf""#));
	}
}
