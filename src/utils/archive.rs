use crate::utils::error::Result;
use std::io::{Cursor, Read, Write};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// 將單一檔案壓縮成 zip
pub fn compress_entry(entry_name: &str, data: &[u8]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry_name, options)?;
    zip.write_all(data)?;
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// 從 zip 取出指定檔案內容
pub fn decompress_entry(archive_bytes: &[u8], entry_name: &str) -> Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut file = archive.by_name(entry_name)?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(content)
}
