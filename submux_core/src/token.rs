//! Share tokens: a reversible, URL-safe reference to a message in the
//! storage channel. The `get-` prefix and the product computation are
//! load-bearing — older links must keep decoding across versions.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token does not belong to this channel")]
    WrongChannel,
}

/// Encode `(message_id, channel_id)` as a share token.
///
/// The payload is the ASCII string `get-{message_id * |channel_id|}`,
/// URL-safe base64 with padding retained.
pub fn mint(message_id: i64, channel_id: i64) -> String {
    let product = message_id as i128 * (channel_id as i128).abs();
    URL_SAFE.encode(format!("get-{product}"))
}

/// Recover the message id from a token minted against `channel_id`.
pub fn decode(token: &str, channel_id: i64) -> Result<i64, TokenError> {
    let bytes = URL_SAFE.decode(token).map_err(|_| TokenError::Malformed)?;
    let text = std::str::from_utf8(&bytes).map_err(|_| TokenError::Malformed)?;
    let product: i128 = text
        .strip_prefix("get-")
        .ok_or(TokenError::Malformed)?
        .parse()
        .map_err(|_| TokenError::Malformed)?;

    let divisor = (channel_id as i128).abs();
    if divisor == 0 || product <= 0 || product % divisor != 0 {
        return Err(TokenError::WrongChannel);
    }
    i64::try_from(product / divisor).map_err(|_| TokenError::WrongChannel)
}

pub fn share_url(bot_username: &str, token: &str) -> String {
    format!("https://t.me/{bot_username}?start={token}")
}
