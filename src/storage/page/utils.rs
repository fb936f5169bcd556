//! Utility functions shared by the page layouts.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::storage::PAGE_SIZE;
use byteorder::{ByteOrder, LittleEndian};

/// Width of an encoded `PageId`.
pub const PAGE_ID_SIZE: usize = 8;

/// Reject buffers that are not exactly one page long.
pub fn check_page_len(len: usize) -> StorageResult<()> {
    if len != PAGE_SIZE {
        return Err(StorageError::InvalidBufferSize {
            expected: PAGE_SIZE,
            actual: len,
        });
    }
    Ok(())
}

/// Page ids are stored as u64 LE and reinterpreted as signed, so `-1`
/// round-trips as all ones.
pub fn read_page_id(data: &[u8], offset: usize) -> PageId {
    PageId(LittleEndian::read_u64(&data[offset..offset + PAGE_ID_SIZE]) as i64)
}

pub fn write_page_id(data: &mut [u8], offset: usize, page_id: PageId) {
    LittleEndian::write_u64(&mut data[offset..offset + PAGE_ID_SIZE], page_id.0 as u64);
}

pub fn read_u16(data: &[u8], offset: usize) -> u16 {
    LittleEndian::read_u16(&data[offset..offset + 2])
}

pub fn write_u16(data: &mut [u8], offset: usize, value: u16) {
    LittleEndian::write_u16(&mut data[offset..offset + 2], value);
}

/// Decode an optional sibling pointer; the invalid id means "absent".
pub fn read_optional_page_id(data: &[u8], offset: usize) -> Option<PageId> {
    let page_id = read_page_id(data, offset);
    page_id.is_valid().then_some(page_id)
}

pub fn write_optional_page_id(
    data: &mut [u8],
    offset: usize,
    page_id: Option<PageId>,
) -> StorageResult<()> {
    let page_id = match page_id {
        Some(page_id) if !page_id.is_valid() => {
            return Err(StorageError::InvalidPageId(page_id));
        }
        Some(page_id) => page_id,
        None => PageId::INVALID,
    };
    write_page_id(data, offset, page_id);
    Ok(())
}
