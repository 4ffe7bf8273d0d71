//! Native messaging 帧格式
//!
//! 4 字节小端 u32 长度前缀 + UTF-8 JSON。
//! 每个进程只收发一帧：读取端读到 EOF 后再解码。

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::FrameError;

const PREFIX_LEN: usize = 4;

/// 从完整输入中解码一帧
///
/// 不足 4 字节或 JSON 非法时返回 `None`；声明长度之后的多余字节被忽略，
/// 声明长度超过实际数据时按实际数据解析。
pub fn decode_frame(buf: &[u8]) -> Option<Value> {
    if buf.len() < PREFIX_LEN {
        debug!("Frame too short: {} bytes", buf.len());
        return None;
    }

    let declared = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let end = PREFIX_LEN.saturating_add(declared).min(buf.len());

    match serde_json::from_slice(&buf[PREFIX_LEN..end]) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Frame payload is not valid JSON: {}", e);
            None
        }
    }
}

/// 编码一帧
pub fn encode_frame<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, FrameError> {
    let payload = serde_json::to_vec(value)?;
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge(payload.len()))?;

    let mut frame = Vec::with_capacity(PREFIX_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// 读取输入直到 EOF 并解码
///
/// 读取失败与格式错误一样返回 `None`，调用方只需区分“有无可处理消息”。
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Option<Value> {
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        debug!("Failed to read input stream: {}", e);
        return None;
    }
    decode_frame(&buf)
}

/// 写入一帧并 flush
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let frame = encode_frame(value)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_frame(declared: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = declared.to_le_bytes().to_vec();
        buf.extend_from_slice(payload);
        buf
    }

    #[tokio::test]
    async fn test_round_trip() {
        let value = json!({
            "type": "sync",
            "force": true,
            "nested": {"list": [1, 2.5, null, "中文"]},
        });

        let mut out = Vec::new();
        write_frame(&mut out, &value).await.unwrap();

        let mut input = out.as_slice();
        assert_eq!(read_frame(&mut input).await, Some(value));
    }

    #[test]
    fn test_prefix_is_little_endian_byte_length() {
        let frame = encode_frame(&json!("é")).unwrap();
        // "é" 编码为 0x22 0xC3 0xA9 0x22
        assert_eq!(&frame[..4], &[4, 0, 0, 0]);
        assert_eq!(frame.len(), 8);
    }

    #[tokio::test]
    async fn test_short_input_is_none() {
        assert_eq!(decode_frame(&[]), None);
        assert_eq!(decode_frame(&[1, 0, 0]), None);

        let mut empty: &[u8] = &[];
        assert_eq!(read_frame(&mut empty).await, None);
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let payload = br#"{"type":"ping"}"#;
        let mut buf = raw_frame(payload.len() as u32, payload);
        buf.extend_from_slice(b"garbage after frame");

        assert_eq!(decode_frame(&buf), Some(json!({"type": "ping"})));
    }

    #[test]
    fn test_invalid_json_is_none() {
        let payload = b"{not json";
        assert_eq!(decode_frame(&raw_frame(payload.len() as u32, payload)), None);
    }

    #[test]
    fn test_declared_length_beyond_input() {
        // 截断后仍是非法 JSON
        assert_eq!(decode_frame(&raw_frame(1000, b"{\"type\":")), None);
        // 截断后恰好完整
        assert_eq!(decode_frame(&raw_frame(1000, b"{}")), Some(json!({})));
    }

    #[test]
    fn test_zero_length_is_none() {
        assert_eq!(decode_frame(&raw_frame(0, b"{}")), None);
    }
}
