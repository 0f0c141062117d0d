use serde::{Deserialize, Serialize};

use crate::SessionSnapshot;

pub const SESSION_FILE_MAGIC: [u8; 4] = *b"NBSS";
pub const SESSION_FILE_VERSION: u32 = 1;
const SESSION_HEADER_LEN: usize = SESSION_FILE_MAGIC.len() + std::mem::size_of::<u32>();

/// Every session recorded for one project, open and completed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFileData {
    pub sessions: Vec<SessionSnapshot>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SessionFileDecodeError {
    UnsupportedVersion(u32),
    InvalidData,
}

impl std::fmt::Display for SessionFileDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionFileDecodeError::UnsupportedVersion(version) => {
                write!(f, "unsupported session file version {version}")
            }
            SessionFileDecodeError::InvalidData => write!(f, "invalid session file"),
        }
    }
}

impl std::error::Error for SessionFileDecodeError {}

#[derive(Debug, PartialEq, Eq)]
pub struct SessionFileEncodeError(pub String);

impl std::fmt::Display for SessionFileEncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to encode session file: {}", self.0)
    }
}

impl std::error::Error for SessionFileEncodeError {}

/// Header plus bincode body. Nothing is produced if the body cannot be
/// encoded, so callers never persist a header-only file.
pub fn encode_session_file(data: &SessionFileData) -> Result<Vec<u8>, SessionFileEncodeError> {
    let body = bincode::serde::encode_to_vec(data, bincode::config::standard())
        .map_err(|e| SessionFileEncodeError(e.to_string()))?;
    let mut payload = Vec::with_capacity(SESSION_HEADER_LEN + body.len());
    payload.extend_from_slice(&SESSION_FILE_MAGIC);
    payload.extend_from_slice(&SESSION_FILE_VERSION.to_le_bytes());
    payload.extend_from_slice(&body);
    Ok(payload)
}

pub fn decode_session_file(payload: &[u8]) -> Result<SessionFileData, SessionFileDecodeError> {
    if !(payload.len() >= SESSION_HEADER_LEN && payload.starts_with(&SESSION_FILE_MAGIC)) {
        return Err(SessionFileDecodeError::InvalidData);
    }
    let version = u32::from_le_bytes(
        payload[SESSION_FILE_MAGIC.len()..SESSION_HEADER_LEN]
            .try_into()
            .map_err(|_| SessionFileDecodeError::InvalidData)?,
    );
    let body = &payload[SESSION_HEADER_LEN..];
    match version {
        1 => bincode::serde::decode_from_slice(body, bincode::config::standard())
            .map(|(data, _)| data)
            .map_err(|_| SessionFileDecodeError::InvalidData),
        _ => Err(SessionFileDecodeError::UnsupportedVersion(version)),
    }
}
