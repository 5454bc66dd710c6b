//! Response body reader.
//!
//! # Responsibilities
//! - Read the response body into [`BodyBuffer`] in place, so bytes read before a
//!   failure are still there for the response builder
//! - Pick a strategy from the declared length:
//!   - small known length: allocate exactly, read straight into it
//!   - large known length: allocate exactly, read through a pooled buffer
//!   - unknown length: grow until end of stream, reading through a pooled buffer
//! - Report a short stream as `UnexpectedEof`, never as a truncated success
//!
//! # Design Decisions
//! - Large destinations are never handed to the socket directly; a kept-alive
//!   connection may hold on to the buffer it last read into
//! - Pooled buffers are RAII guards, so a dropped read returns them

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::buffer::BufferPool;
use crate::transport::state::BodyBuffer;

/// Size limits steering the read strategy.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReadLimits {
    pub preferred_read_size: usize,
    pub large_object_threshold: usize,
}

/// Read the whole body of `stream` into `dest`.
pub(crate) async fn read_body<R>(
    stream: &mut R,
    content_length: Option<u64>,
    dest: &mut BodyBuffer,
    pool: &BufferPool,
    limits: ReadLimits,
) -> io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match content_length {
        Some(declared) if declared > 0 => {
            let length = usize::try_from(declared).map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Content-Length {} does not fit in memory", declared),
                )
            })?;

            *dest = BodyBuffer::Exact {
                bytes: allocate_exact(length)?,
                filled: 0,
            };
            if let BodyBuffer::Exact { bytes, filled } = dest {
                if length < limits.large_object_threshold {
                    read_direct(stream, bytes, filled, limits.preferred_read_size).await?;
                } else {
                    read_through_pool(stream, bytes, filled, pool).await?;
                }

                if *filled < length {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "Response stream ended prematurely. Read only {} byte(s), but Content-Length specified {}.",
                            filled, length
                        ),
                    ));
                }
            }
            Ok(())
        }
        _ => {
            *dest = BodyBuffer::Growable(BytesMut::new());
            if let BodyBuffer::Growable(buf) = dest {
                read_to_end_through_pool(stream, buf, pool).await?;
            }
            Ok(())
        }
    }
}

/// Zeroed buffer of `length` bytes, or an error when the allocation fails.
fn allocate_exact(length: usize) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes.try_reserve_exact(length).map_err(|error| {
        io::Error::new(
            io::ErrorKind::OutOfMemory,
            format!("Cannot allocate {} byte(s) for response body: {}", length, error),
        )
    })?;
    bytes.resize(length, 0);
    Ok(bytes)
}

async fn read_direct<R>(
    stream: &mut R,
    dest: &mut [u8],
    filled: &mut usize,
    chunk: usize,
) -> io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let chunk = chunk.max(1);
    while *filled < dest.len() {
        let end = dest.len().min(*filled + chunk);
        let read = stream.read(&mut dest[*filled..end]).await?;
        if read == 0 {
            break;
        }
        *filled += read;
    }
    Ok(())
}

async fn read_through_pool<R>(
    stream: &mut R,
    dest: &mut [u8],
    filled: &mut usize,
    pool: &BufferPool,
) -> io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = pool.acquire();
    while *filled < dest.len() {
        let want = (dest.len() - *filled).min(buffer.len());
        let read = stream.read(&mut buffer[..want]).await?;
        if read == 0 {
            break;
        }
        dest[*filled..*filled + read].copy_from_slice(&buffer[..read]);
        *filled += read;
    }
    Ok(())
}

async fn read_to_end_through_pool<R>(
    stream: &mut R,
    dest: &mut BytesMut,
    pool: &BufferPool,
) -> io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = pool.acquire();
    loop {
        let read = stream.read(&mut buffer[..]).await?;
        if read == 0 {
            return Ok(());
        }
        dest.extend_from_slice(&buffer[..read]);
    }
}
