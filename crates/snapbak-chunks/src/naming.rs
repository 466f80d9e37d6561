/// Prefix of every staged chunk file
pub const CHUNK_PREFIX: &str = "snapshot_chunk_";

/// File name of the chunk at `index`
pub fn chunk_file_name(index: u64) -> String {
    format!("{CHUNK_PREFIX}{index}")
}

/// Parse a chunk file name back into its index. Non-chunk files yield None.
pub fn chunk_index(name: &str) -> Option<u64> {
    name.strip_prefix(CHUNK_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_index_invert() {
        assert_eq!(chunk_file_name(0), "snapshot_chunk_0");
        assert_eq!(chunk_file_name(12), "snapshot_chunk_12");
        assert_eq!(chunk_index("snapshot_chunk_0"), Some(0));
        assert_eq!(chunk_index("snapshot_chunk_12"), Some(12));
    }

    #[test]
    fn foreign_names_are_rejected() {
        assert_eq!(chunk_index("snapshot_20260806"), None);
        assert_eq!(chunk_index("snapshot_chunk_"), None);
        assert_eq!(chunk_index("snapshot_chunk_x"), None);
    }
}
