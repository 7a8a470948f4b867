//! [`DsonEditController`]: opens a Dson file via an mmap-backed view,
//! permits in-place edits in a scratch buffer, and on save rewrites the
//! edited object plus every ancestor container header whose `data_size`
//! shifts as a result, preserving any sibling bytes that follow the
//! edited object on disk (spec §4.8).

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use super::header::{DsonHeader, HEADER_SIZE};
use super::object::DsonObject;
use crate::error::Exception;

struct Frame {
    /// Byte offset, within the mmap, of this container's header.
    object_offset: usize,
}

/// A pending edit: the object at `object_start` is replaced by
/// `replacement` on the next `save`, and every ancestor container header
/// still in `stack` at the time of the edit has its `data_size` adjusted
/// to match.
struct PendingEdit {
    object_start: usize,
    ancestor_offsets: Vec<usize>,
    replacement: Vec<u8>,
}

pub struct DsonEditController {
    path: PathBuf,
    mmap: Mmap,
    stack: Vec<Frame>,
    pending: Option<PendingEdit>,
}

impl DsonEditController {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Exception> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| crate::exception!(format!("failed to open dson file {path:?}: {e}")))?;
        let mmap = unsafe {
            Mmap::map(&file).map_err(|e| crate::exception!(format!("failed to mmap dson file {path:?}: {e}")))?
        };
        Ok(Self {
            path,
            mmap,
            stack: vec![Frame { object_offset: 0 }],
            pending: None,
        })
    }

    fn current_bytes(&self) -> &[u8] {
        &self.mmap[self.stack.last().unwrap().object_offset..]
    }

    /// The root object as currently on disk (ignores any unsaved edit).
    pub fn root(&self) -> Result<DsonObject, Exception> {
        DsonObject::decode(&self.mmap)
    }

    /// The object at the current navigation position, as on disk.
    pub fn current(&self) -> Result<DsonObject, Exception> {
        DsonObject::decode(self.current_bytes())
    }

    /// Descends into the first child with `key`, relative to the
    /// current position. Pushes a navigation frame; `close` pops one.
    pub fn navigate_into(&mut self, key: i32) -> Result<(), Exception> {
        let child_offset = find_child_byte_offset(self.current_bytes(), key)?;
        let absolute = self.stack.last().unwrap().object_offset + child_offset;
        self.stack.push(Frame { object_offset: absolute });
        Ok(())
    }

    /// Pops one navigation level. `false` if already at the root.
    pub fn close(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        self.stack.pop();
        true
    }

    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Replaces the object at the current position with `new_value`.
    /// Queues the rewrite; call `save` to persist it. Bytes before this
    /// position, and any sibling bytes that follow it, are left
    /// untouched; `save` adjusts every ancestor container header still
    /// on the current navigation stack so their `data_size` reflects the
    /// new size.
    ///
    /// Errors if an edit is already pending — this controller queues one
    /// edit at a time; call `save` before editing again.
    pub fn edit_current(&mut self, new_value: DsonObject) -> Result<(), Exception> {
        if self.pending.is_some() {
            return Err(crate::exception!("a pending edit already exists; call save() before editing again"));
        }
        let object_start = self.stack.last().unwrap().object_offset;
        let ancestor_offsets = self.stack[..self.stack.len() - 1].iter().map(|f| f.object_offset).collect();
        let replacement = new_value.encode();
        self.pending = Some(PendingEdit {
            object_start,
            ancestor_offsets,
            replacement,
        });
        Ok(())
    }

    /// Serialized size of the object at the current position, as it
    /// would be written by the next `save` (or as currently on disk,
    /// absent a pending edit).
    pub fn serialized_size(&self) -> Result<usize, Exception> {
        if let Some(pending) = &self.pending {
            return Ok(pending.replacement.len());
        }
        Ok(self.current()?.all_size())
    }

    /// Rewrites the pending edit's object in place, re-appending the
    /// bytes that originally followed it (sibling objects and anything
    /// in outer containers), then patches every ancestor container
    /// header's `data_size` by the resulting size delta. No-op if there
    /// is no pending edit.
    pub fn save(&mut self) -> Result<(), Exception> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let original_header = DsonHeader::from_bytes(&self.mmap[pending.object_start..])
            .map_err(|e| crate::exception!(format!("corrupt header at offset {}: {e}", pending.object_start)))?;
        let original_end = pending.object_start + original_header.all_size();
        let trailing = self.mmap[original_end..].to_vec();
        let delta = pending.replacement.len() as i64 - original_header.all_size() as i64;

        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| crate::exception!(format!("failed to reopen {:?} for save: {e}", self.path)))?;

        for &ancestor_offset in &pending.ancestor_offsets {
            let ancestor_header = DsonHeader::from_bytes(&self.mmap[ancestor_offset..])
                .map_err(|e| crate::exception!(format!("corrupt ancestor header at offset {ancestor_offset}: {e}")))?;
            let new_data_size = ancestor_header.data_size as i64 + delta;
            let new_data_size = i32::try_from(new_data_size)
                .map_err(|_| crate::exception!(format!("ancestor at offset {ancestor_offset} overflowed data_size")))?;
            file.seek(SeekFrom::Start((ancestor_offset + 4) as u64))
                .map_err(|e| crate::exception!(format!("failed to seek {:?}: {e}", self.path)))?;
            file.write_all(&new_data_size.to_ne_bytes())
                .map_err(|e| crate::exception!(format!("failed patching ancestor header in {:?}: {e}", self.path)))?;
        }

        file.seek(SeekFrom::Start(pending.object_start as u64))
            .map_err(|e| crate::exception!(format!("failed to seek {:?}: {e}", self.path)))?;
        file.write_all(&pending.replacement)
            .map_err(|e| crate::exception!(format!("failed writing object to {:?}: {e}", self.path)))?;
        file.write_all(&trailing)
            .map_err(|e| crate::exception!(format!("failed re-appending tail to {:?}: {e}", self.path)))?;
        let new_len = pending.object_start as u64 + pending.replacement.len() as u64 + trailing.len() as u64;
        file.set_len(new_len)
            .map_err(|e| crate::exception!(format!("failed to truncate {:?}: {e}", self.path)))?;

        self.remap()
    }

    fn remap(&mut self) -> Result<(), Exception> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| crate::exception!(format!("failed to reopen {:?} after save: {e}", self.path)))?;
        self.mmap = unsafe {
            Mmap::map(&file).map_err(|e| crate::exception!(format!("failed to remap {:?}: {e}", self.path)))?
        };
        self.stack.truncate(1);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn find_child_byte_offset(container_bytes: &[u8], key: i32) -> Result<usize, Exception> {
    let header = super::header::DsonHeader::from_bytes(container_bytes)?;
    let mut offset = HEADER_SIZE;
    let end = header.all_size();
    while offset < end {
        let child_header = super::header::DsonHeader::from_bytes(&container_bytes[offset..])?;
        if child_header.key == key {
            return Ok(offset);
        }
        offset += child_header.all_size();
    }
    Err(crate::exception!(format!("no child with key {key} found while navigating")))
}
