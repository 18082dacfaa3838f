//! 快照的紧凑二进制编码（用于备份）
//!
//! 基于 MessagePack + Zstd：
//! - 16 字节文件头：魔数 `FPLN`、格式版本、标志位、压缩后长度
//! - 负载为按字段名编码的 MessagePack，再经 Zstd 压缩
//!
//! 按字段名编码保证旧坐标写法的兼容读取在二进制格式中同样生效。

use crate::error::StoreError;
use fplan_core::snapshot::LayoutSnapshot;
use std::io::{Read, Write};

/// 魔数 "FPLN"
const MAGIC: &[u8; 4] = b"FPLN";

/// 当前编码格式版本
const FORMAT_VERSION: u32 = 1;

/// Zstd 压缩级别（1-22，3 是默认值，平衡速度和压缩比）
const COMPRESSION_LEVEL: i32 = 3;

/// 文件头长度（字节）
pub const HEADER_LEN: usize = 16;

/// 编码头（16 字节）
#[derive(Debug)]
struct Header {
    magic: [u8; 4],
    version: u32,
    /// 预留
    flags: u32,
    payload_len: u32,
}

impl Header {
    fn new(payload_len: u32) -> Self {
        Self {
            magic: *MAGIC,
            version: FORMAT_VERSION,
            flags: 0,
            payload_len,
        }
    }

    fn write(&self, writer: &mut impl Write) -> Result<(), std::io::Error> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        writer.write_all(&self.payload_len.to_le_bytes())?;
        Ok(())
    }

    fn read(reader: &mut impl Read) -> Result<Self, StoreError> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|_| StoreError::InvalidFormat("Truncated header".to_string()))?;

        if &magic != MAGIC {
            return Err(StoreError::InvalidFormat(
                "Invalid magic number, not an encoded layout".to_string(),
            ));
        }

        let mut buf = [0u8; 4];

        reader.read_exact(&mut buf)?;
        let version = u32::from_le_bytes(buf);

        reader.read_exact(&mut buf)?;
        let flags = u32::from_le_bytes(buf);

        reader.read_exact(&mut buf)?;
        let payload_len = u32::from_le_bytes(buf);

        Ok(Self {
            magic,
            version,
            flags,
            payload_len,
        })
    }
}

/// 编码快照
pub fn encode(snapshot: &LayoutSnapshot) -> Result<Vec<u8>, StoreError> {
    let msgpack_data = rmp_serde::to_vec_named(snapshot)?;
    let compressed = zstd::encode_all(msgpack_data.as_slice(), COMPRESSION_LEVEL)?;

    let payload_len = u32::try_from(compressed.len())
        .map_err(|_| StoreError::InvalidFormat("Payload exceeds 4 GiB".to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    Header::new(payload_len).write(&mut out)?;
    out.write_all(&compressed)?;

    tracing::debug!(
        "Encoded layout: {} bytes msgpack, {} bytes compressed",
        msgpack_data.len(),
        compressed.len()
    );
    Ok(out)
}

/// 解码快照（解码后执行规范化）
pub fn decode(bytes: &[u8]) -> Result<LayoutSnapshot, StoreError> {
    let mut reader = bytes;
    let header = Header::read(&mut reader)?;

    if header.version > FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion(format!(
            "Encoded version {} is newer than supported version {}",
            header.version, FORMAT_VERSION
        )));
    }

    if reader.len() != header.payload_len as usize {
        return Err(StoreError::Corruption(format!(
            "Payload length mismatch: header says {}, found {}",
            header.payload_len,
            reader.len()
        )));
    }

    let msgpack_data = zstd::decode_all(reader)?;
    let mut snapshot: LayoutSnapshot = rmp_serde::from_slice(&msgpack_data)?;
    snapshot.normalize();
    Ok(snapshot)
}
