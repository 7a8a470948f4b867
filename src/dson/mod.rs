//! The Dson wire format (spec §4.8): a 12-byte header, a fixed type-id
//! registry, a recursive container, resumable streaming codecs, and a
//! file-backed editor. Grounded on
//! `examples/original_source/include/thread_highways/dson/detail/{types_map,obj_view,i_uploader}.h`.

pub mod downloader;
pub mod edit_controller;
pub mod header;
pub mod object;
pub mod types;
pub mod uploader;

pub use downloader::{DownloaderFromSharedBuf, DownloaderState, DsonFileController};
pub use edit_controller::DsonEditController;
pub use header::{DsonHeader, HEADER_SIZE};
pub use object::{DsonObject, DsonValue};
pub use types::{is_dson_header, is_ok_header, TypeId, LAST_TYPE_ID};
pub use uploader::{Uploader, UploaderState, UploaderToBuff};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_stream_decode_round_trips_a_container() {
        let original = DsonObject::container(
            0,
            vec![
                DsonObject::new(1, DsonValue::Str("alpha".into())),
                DsonObject::new(2, DsonValue::VecI32(vec![1, 2, 3])),
            ],
        );
        let bytes = original.encode();

        let mut downloader = DownloaderFromSharedBuf::new(bytes.len() + 1);
        let (first, second) = bytes.split_at(bytes.len() / 2);
        assert_eq!(downloader.absorb(first).unwrap(), crate::error::ResultCode::OkInProcess);
        assert_eq!(downloader.absorb(second).unwrap(), crate::error::ResultCode::OkReady);
        assert_eq!(downloader.finish_in_memory().unwrap(), original);
    }
}
