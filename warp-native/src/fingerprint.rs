use url::Url;

/// Problems obtaining the server certificate fingerprint.
#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
	#[error("fetch failed: {0}")]
	Fetch(#[from] reqwest::Error),

	#[error("unexpected status: {0}")]
	Status(reqwest::StatusCode),

	#[error("invalid hex: {0}")]
	Hex(#[from] hex::FromHexError),

	#[error("wrong length: expected 32 bytes, got {0}")]
	WrongLength(usize),
}

/// Fetch the server's certificate fingerprint over plain HTTPS.
///
/// The endpoint serves the SHA-256 of its (usually self-signed, short
/// lived) certificate as ASCII hex, with or without colons.
pub async fn fetch_fingerprint(url: &Url) -> Result<[u8; 32], FingerprintError> {
	tracing::debug!(%url, "fetching certificate fingerprint");

	let response = reqwest::get(url.clone()).await?;
	if !response.status().is_success() {
		return Err(FingerprintError::Status(response.status()));
	}

	let text = response.text().await?;
	parse_fingerprint(&text)
}

/// Parse an ASCII hex SHA-256 digest, tolerating colons and whitespace.
pub fn parse_fingerprint(text: &str) -> Result<[u8; 32], FingerprintError> {
	let cleaned: String = text.trim().chars().filter(|c| *c != ':').collect();
	let digest = hex::decode(cleaned)?;
	let size = digest.len();
	digest.try_into().map_err(|_| FingerprintError::WrongLength(size))
}

#[cfg(test)]
mod tests {
	use super::*;

	const DIGEST: &str = "d14d2c9b8f7e1a3c5b6d7e8f9a0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b";

	#[test]
	fn plain_hex() {
		let parsed = parse_fingerprint(DIGEST).unwrap();
		assert_eq!(parsed[0], 0xd1);
		assert_eq!(parsed[31], 0x8b);
	}

	#[test]
	fn colons_and_whitespace_are_stripped() {
		let with_colons = DIGEST
			.as_bytes()
			.chunks(2)
			.map(|pair| std::str::from_utf8(pair).unwrap())
			.collect::<Vec<_>>()
			.join(":");

		let parsed = parse_fingerprint(&format!("  {with_colons}\n")).unwrap();
		assert_eq!(parsed, parse_fingerprint(DIGEST).unwrap());
	}

	#[test]
	fn rejects_wrong_length() {
		assert!(matches!(
			parse_fingerprint("d14d2c"),
			Err(FingerprintError::WrongLength(3))
		));
	}

	#[test]
	fn rejects_non_hex() {
		assert!(matches!(
			parse_fingerprint("not a fingerprint at all, sorry!"),
			Err(FingerprintError::Hex(_))
		));
	}
}
