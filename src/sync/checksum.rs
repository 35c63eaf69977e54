use crate::error::{Result, SyncError};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// BLAKE3 digest of a file's contents, hex encoded
pub fn hash_file(path: &Path) -> Result<String> {
    let hash_err = |e| SyncError::HashError {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = File::open(path).map_err(hash_err)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(hash_err)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize().as_bytes()))
}
