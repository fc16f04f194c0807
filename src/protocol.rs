//! Framing shared by the server and the CLI.
//!
//! Request:  [OpCode u8][Length u32 LE][JSON body]
//! Response: [Status u8][Length u32 LE][JSON body]

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::ErrorStatus;
use crate::model::{ShipDraft, ShipPatch};
use crate::query::{ShipCriteria, ShipOrder};

// --- OpCodes ---
pub const OP_LIST: u8    = 0x01;
pub const OP_COUNT: u8   = 0x02;
pub const OP_GET: u8     = 0x03;
pub const OP_CREATE: u8  = 0x04;
pub const OP_UPDATE: u8  = 0x05;
pub const OP_DELETE: u8  = 0x06;
pub const OP_COMPACT: u8 = 0x07;

// --- Status ---
pub const STATUS_OK: u8          = 0x00;
pub const STATUS_BAD_REQUEST: u8 = 0x01;
pub const STATUS_NOT_FOUND: u8   = 0x02;
pub const STATUS_INTERNAL: u8    = 0x03;

// 64KB request cap to prevent large-payload DoS
pub const MAX_BODY_LEN: usize = 64 * 1024;
// Responses carry whole listings
pub const MAX_RESPONSE_LEN: usize = 64 * 1024 * 1024;

pub fn status_byte(status: ErrorStatus) -> u8 {
    match status {
        ErrorStatus::BadRequest => STATUS_BAD_REQUEST,
        ErrorStatus::NotFound => STATUS_NOT_FOUND,
        ErrorStatus::Internal => STATUS_INTERNAL,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ListRequest {
    #[serde(flatten)]
    pub criteria: ShipCriteria,
    pub order: ShipOrder,
    pub page_number: Option<usize>,
    pub page_size: Option<usize>,
}

/// Ids travel as raw strings so the server can report malformed ones.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct IdRequest {
    pub id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct UpdateRequest {
    pub id: Option<String>,
    pub patch: ShipPatch,
}

pub type CreateRequest = ShipDraft;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CountBody {
    pub count: usize,
}

fn too_large(len: usize, max: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Payload too large: {} bytes (Max {})", len, max),
    )
}

/// Reads one frame. `Ok(None)` when the peer closed cleanly before a header.
pub async fn read_frame_async<R: AsyncReadExt + Unpin>(reader: &mut R) -> io::Result<Option<(u8, Vec<u8>)>> {
    let mut head = [0u8; 1];
    if reader.read(&mut head).await? == 0 {
        return Ok(None);
    }

    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_BODY_LEN {
        return Err(too_large(len, MAX_BODY_LEN));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some((head[0], body)))
}

pub async fn write_frame_async<W: AsyncWriteExt + Unpin>(writer: &mut W, head: u8, body: &[u8]) -> io::Result<()> {
    writer.write_all(&[head]).await?;
    writer.write_all(&(body.len() as u32).to_le_bytes()).await?;
    writer.write_all(body).await?;
    Ok(())
}

/// Client side: reads a response frame.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<(u8, Vec<u8>)> {
    let mut head = [0u8; 1];
    reader.read_exact(&mut head)?;

    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_RESPONSE_LEN {
        return Err(too_large(len, MAX_RESPONSE_LEN));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    Ok((head[0], body))
}

/// Client side: writes a request frame.
pub fn write_frame<W: Write>(writer: &mut W, head: u8, body: &[u8]) -> io::Result<()> {
    if body.len() > MAX_BODY_LEN {
        return Err(too_large(body.len(), MAX_BODY_LEN));
    }
    writer.write_all(&[head])?;
    writer.write_all(&(body.len() as u32).to_le_bytes())?;
    writer.write_all(body)?;
    writer.flush()
}
