//! Resumable encoders (spec §4.8 "Encoder"), grounded on
//! `examples/original_source/include/thread_highways/dson/detail/i_uploader.h`'s
//! `IUploader`/`DefaultUploader`: the caller either hands over a ready
//! buffer (`upload_chunk`) or borrows one from the uploader
//! (`upload_with_uploader_buf` + `set_uploaded`), and progress is
//! tracked by `(start_offset, cur_offset, finish_offset)` so a partial
//! transmit can resume.

use crate::error::ResultCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploaderState {
    StartPosition,
    Next,
    UploadingFromLocalBuf,
    UploadingFromRemoteBuf,
    Finished,
    Error,
}

/// Common surface for every `UploaderTo*` sink (spec §4.8; only the
/// in-memory variant, [`UploaderToBuff`], ships in this crate — FD and
/// stream sinks are a non-goal here since no network/file I/O surface
/// is specified beyond the editor in `edit_controller.rs`).
pub trait Uploader {
    /// Caller-provided bytes to absorb.
    fn upload_chunk(&mut self, chunk: &[u8]) -> ResultCode;
    /// Caller requests a buffer of `chunk_size` bytes to fill itself.
    fn upload_with_uploader_buf(&mut self, chunk_size: usize) -> Option<&mut [u8]>;
    /// Caller reports how many bytes of the borrowed buffer it filled.
    fn set_uploaded(&mut self, uploaded: usize) -> ResultCode;
    fn reset_uploader(&mut self);
    fn state(&self) -> UploaderState;
}

/// Encodes a byte source into an in-memory destination buffer.
pub struct UploaderToBuff {
    source: Vec<u8>,
    destination: Vec<u8>,
    local_buf: Vec<u8>,
    start_offset: usize,
    cur_offset: usize,
    finish_offset: usize,
    state: UploaderState,
}

impl UploaderToBuff {
    pub fn new(source: Vec<u8>) -> Self {
        let finish_offset = source.len();
        Self {
            source,
            destination: Vec::new(),
            local_buf: Vec::new(),
            start_offset: 0,
            cur_offset: 0,
            finish_offset,
            state: UploaderState::StartPosition,
        }
    }

    pub fn into_destination(self) -> Vec<u8> {
        self.destination
    }

    pub fn is_finished(&self) -> bool {
        self.state == UploaderState::Finished
    }
}

impl Uploader for UploaderToBuff {
    fn upload_chunk(&mut self, chunk: &[u8]) -> ResultCode {
        if self.state == UploaderState::Error {
            return ResultCode::EFail;
        }
        self.destination.extend_from_slice(chunk);
        self.cur_offset += chunk.len();
        self.state = UploaderState::UploadingFromRemoteBuf;
        if self.cur_offset >= self.finish_offset {
            self.state = UploaderState::Finished;
            return ResultCode::OkReady;
        }
        ResultCode::OkInProcess
    }

    fn upload_with_uploader_buf(&mut self, chunk_size: usize) -> Option<&mut [u8]> {
        if chunk_size == 0 {
            self.state = UploaderState::Error;
            return None;
        }
        let available = self.finish_offset.saturating_sub(self.cur_offset);
        let take = chunk_size.min(available);
        if take == 0 {
            self.state = UploaderState::Finished;
            return None;
        }
        self.local_buf.clear();
        self.local_buf
            .extend_from_slice(&self.source[self.cur_offset..self.cur_offset + take]);
        self.state = UploaderState::UploadingFromLocalBuf;
        Some(&mut self.local_buf[..])
    }

    fn set_uploaded(&mut self, uploaded: usize) -> ResultCode {
        if self.cur_offset + uploaded > self.finish_offset {
            self.state = UploaderState::Error;
            return ResultCode::EFail;
        }
        self.destination.extend_from_slice(&self.local_buf[..uploaded]);
        self.cur_offset += uploaded;
        if self.cur_offset >= self.finish_offset {
            self.state = UploaderState::Finished;
            return ResultCode::OkReady;
        }
        self.state = UploaderState::Next;
        ResultCode::OkInProcess
    }

    fn reset_uploader(&mut self) {
        self.destination.clear();
        self.local_buf.clear();
        self.start_offset = 0;
        self.cur_offset = 0;
        self.finish_offset = self.source.len();
        self.state = UploaderState::StartPosition;
    }

    fn state(&self) -> UploaderState {
        self.state
    }
}
