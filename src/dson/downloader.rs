//! Resumable decoders (spec §4.8 "Decoder"): header bytes accumulate
//! until 12 are present, the header is validated, then a destination is
//! chosen — an in-RAM buffer under `threshold` bytes, otherwise a
//! fresh file handed out by a [`DsonFileController`].

use std::path::PathBuf;

use super::header::{DsonHeader, HEADER_SIZE};
use super::object::DsonObject;
use crate::error::{Exception, ResultCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloaderState {
    Empty,
    LoadingHeader,
    LoadingData,
    Ready,
    Error,
}

/// Where decoded payload bytes past `threshold` get written instead of
/// staying in RAM.
pub trait DsonFileController: Send + Sync {
    fn fresh_path(&self) -> PathBuf;
}

enum Destination {
    InMemory(Vec<u8>),
    File { path: PathBuf, file: std::fs::File },
}

/// Decodes an object incrementally from caller-supplied chunks, e.g.
/// bytes read off a shared buffer, a file descriptor, or a stream.
pub struct DownloaderFromSharedBuf {
    header_buf: Vec<u8>,
    header: Option<DsonHeader>,
    destination: Option<Destination>,
    received: usize,
    threshold: usize,
    file_controller: Option<Box<dyn DsonFileController>>,
    state: DownloaderState,
}

impl DownloaderFromSharedBuf {
    pub fn new(threshold: usize) -> Self {
        Self {
            header_buf: Vec::with_capacity(HEADER_SIZE),
            header: None,
            destination: None,
            received: 0,
            threshold,
            file_controller: None,
            state: DownloaderState::Empty,
        }
    }

    pub fn with_file_controller(mut self, controller: Box<dyn DsonFileController>) -> Self {
        self.file_controller = Some(controller);
        self
    }

    pub fn state(&self) -> DownloaderState {
        self.state
    }

    /// Feeds `chunk`, advancing the state machine. Returns `OkReady`
    /// once the whole object has been absorbed, `OkInProcess` while
    /// more input is needed, or `EFail` on a malformed header / write
    /// failure.
    pub fn absorb(&mut self, mut chunk: &[u8]) -> Result<ResultCode, Exception> {
        if self.state == DownloaderState::Error {
            return Ok(ResultCode::EFail);
        }
        if self.state == DownloaderState::Empty {
            self.state = DownloaderState::LoadingHeader;
        }

        if self.header.is_none() {
            let need = HEADER_SIZE - self.header_buf.len();
            let take = need.min(chunk.len());
            self.header_buf.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];
            if self.header_buf.len() < HEADER_SIZE {
                return Ok(ResultCode::OkInProcess);
            }
            let header = DsonHeader::from_bytes(&self.header_buf)?;
            if !header.validate() {
                self.state = DownloaderState::Error;
                return Err(crate::exception!(format!(
                    "malformed dson header: size={} type={}",
                    header.data_size, header.data_type
                )));
            }
            self.destination = Some(self.choose_destination(header.data_size as usize)?);
            self.header = Some(header);
            self.state = DownloaderState::LoadingData;
        }

        let header = self.header.unwrap();
        let remaining = header.data_size as usize - self.received;
        let take = remaining.min(chunk.len());
        if take > 0 {
            self.write_payload(&chunk[..take])?;
            self.received += take;
        }

        if self.received >= header.data_size as usize {
            self.state = DownloaderState::Ready;
            Ok(ResultCode::OkReady)
        } else {
            Ok(ResultCode::OkInProcess)
        }
    }

    fn choose_destination(&self, data_size: usize) -> Result<Destination, Exception> {
        if data_size <= self.threshold {
            return Ok(Destination::InMemory(Vec::with_capacity(data_size)));
        }
        let controller = self
            .file_controller
            .as_ref()
            .ok_or_else(|| crate::exception!("payload exceeds threshold but no file controller is configured"))?;
        let path = controller.fresh_path();
        let file = std::fs::File::create(&path)
            .map_err(|e| crate::exception!(format!("failed to create spill file {path:?}: {e}")))?;
        Ok(Destination::File { path, file })
    }

    fn write_payload(&mut self, bytes: &[u8]) -> Result<(), Exception> {
        use std::io::Write;
        match self.destination.as_mut().expect("destination chosen before payload writes") {
            Destination::InMemory(buf) => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            Destination::File { file, path } => file
                .write_all(bytes)
                .map_err(|e| crate::exception!(format!("failed writing spill file {path:?}: {e}"))),
        }
    }

    /// Once [`DownloaderState::Ready`], decodes the fully-absorbed
    /// object. Only valid for the in-memory destination; a file-backed
    /// payload is read back through [`DownloaderFromSharedBuf::spilled_path`].
    pub fn finish_in_memory(self) -> Result<DsonObject, Exception> {
        let header = self.header.ok_or_else(|| crate::exception!("downloader never loaded a header"))?;
        match self.destination {
            Some(Destination::InMemory(payload)) => {
                let mut bytes = header.to_bytes().to_vec();
                bytes.extend_from_slice(&payload);
                DsonObject::decode(&bytes)
            }
            _ => Err(crate::exception!("payload spilled to a file, not in memory")),
        }
    }

    pub fn spilled_path(&self) -> Option<&std::path::Path> {
        match &self.destination {
            Some(Destination::File { path, .. }) => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dson::object::DsonValue;

    #[test]
    fn absorbs_a_small_object_in_one_chunk() {
        let object = DsonObject::new(3, DsonValue::I32(99));
        let bytes = object.encode();
        let mut downloader = DownloaderFromSharedBuf::new(4096);
        assert_eq!(downloader.absorb(&bytes).unwrap(), ResultCode::OkReady);
        assert_eq!(downloader.finish_in_memory().unwrap(), object);
    }

    #[test]
    fn absorbs_across_header_split_mid_chunk() {
        let object = DsonObject::new(3, DsonValue::Str("hi".into()));
        let bytes = object.encode();
        let mut downloader = DownloaderFromSharedBuf::new(4096);
        assert_eq!(downloader.absorb(&bytes[..5]).unwrap(), ResultCode::OkInProcess);
        assert_eq!(downloader.absorb(&bytes[5..]).unwrap(), ResultCode::OkReady);
        assert_eq!(downloader.finish_in_memory().unwrap(), object);
    }

    #[test]
    fn malformed_header_is_rejected() {
        let mut bytes = DsonHeader::new(0, -1, 2).to_bytes().to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        let mut downloader = DownloaderFromSharedBuf::new(4096);
        assert!(downloader.absorb(&bytes).is_err());
        assert_eq!(downloader.state(), DownloaderState::Error);
    }

    #[test]
    fn payload_over_threshold_without_a_file_controller_errors() {
        let object = DsonObject::new(1, DsonValue::VecF64(vec![1.0; 64]));
        let bytes = object.encode();
        let mut downloader = DownloaderFromSharedBuf::new(8);
        assert!(downloader.absorb(&bytes).is_err());
    }
}
