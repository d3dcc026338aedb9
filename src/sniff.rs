//! Content-signature file typing
//!
//! Every resolved file is classified by its leading bytes, never by its
//! filename — inputs arrive as extensionless temp files and are renamed
//! repeatedly during the pipeline. [`sniff`] is a pure function over a fixed
//! signature table so the classification is trivially testable.

use std::path::Path;

use tokio::io::AsyncReadExt;

/// Bytes of header read when sniffing a file on disk
const SNIFF_HEADER_LEN: usize = 256;

/// File type determined by content signature
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// ISO base media container ("ftyp" brand)
    Mp4,
    /// Matroska/WebM (EBML magic)
    Webm,
    /// JPEG image
    Jpeg,
    /// PNG image
    Png,
    /// WebP image (RIFF container)
    Webp,
    /// GIF image
    Gif,
    /// Zip archive bundle
    Zip,
    /// DASH MPD manifest (XML document)
    DashManifest,
    /// Unrecognized content
    Unknown,
}

impl FileKind {
    /// File extension used when renaming or committing
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Mp4 => "mp4",
            FileKind::Webm => "webm",
            FileKind::Jpeg => "jpg",
            FileKind::Png => "png",
            FileKind::Webp => "webp",
            FileKind::Gif => "gif",
            FileKind::Zip => "zip",
            FileKind::DashManifest => "mpd",
            FileKind::Unknown => "dat",
        }
    }

    /// Whether this kind is video-typed (overlay-merge base track)
    pub fn is_video(&self) -> bool {
        matches!(self, FileKind::Mp4 | FileKind::Webm)
    }

    /// Whether this kind is image-typed (overlay-merge overlay layer)
    pub fn is_image(&self) -> bool {
        matches!(
            self,
            FileKind::Jpeg | FileKind::Png | FileKind::Webp | FileKind::Gif
        )
    }
}

/// Classify content by its leading bytes
pub fn sniff(header: &[u8]) -> FileKind {
    // MP4/MOV: bytes 4..8 == "ftyp"
    if header.len() >= 8 && &header[4..8] == b"ftyp" {
        return FileKind::Mp4;
    }

    // MKV/WebM: EBML magic bytes at offset 0
    if header.len() >= 4 && header[0..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        return FileKind::Webm;
    }

    if header.len() >= 3 && header[0..3] == [0xFF, 0xD8, 0xFF] {
        return FileKind::Jpeg;
    }

    if header.len() >= 8 && header[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return FileKind::Png;
    }

    // WebP: RIFF container with WEBP fourcc at offset 8
    if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
        return FileKind::Webp;
    }

    if header.len() >= 4 && &header[0..4] == b"GIF8" {
        return FileKind::Gif;
    }

    // Zip: local file header, or end-of-central-directory for empty archives
    if header.len() >= 4
        && (&header[0..4] == b"PK\x03\x04" || &header[0..4] == b"PK\x05\x06")
    {
        return FileKind::Zip;
    }

    if looks_like_manifest(header) {
        return FileKind::DashManifest;
    }

    FileKind::Unknown
}

/// XML documents are only ever DASH manifests in this pipeline
fn looks_like_manifest(header: &[u8]) -> bool {
    let mut rest = header;
    // Skip a UTF-8 BOM if present
    if rest.len() >= 3 && rest[0..3] == [0xEF, 0xBB, 0xBF] {
        rest = &rest[3..];
    }
    while let Some((first, tail)) = rest.split_first() {
        if first.is_ascii_whitespace() {
            rest = tail;
        } else {
            break;
        }
    }
    rest.starts_with(b"<?xml") || rest.starts_with(b"<MPD")
}

/// Classify a file on disk by reading its header
pub async fn sniff_file(path: &Path) -> std::io::Result<FileKind> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut header = vec![0u8; SNIFF_HEADER_LEN];
    let mut filled = 0;
    while filled < header.len() {
        let n = file.read(&mut header[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    header.truncate(filled);
    Ok(sniff(&header))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mp4_is_detected_by_ftyp_brand() {
        let header = [0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p', b'm', b'p', b'4', b'2'];
        assert_eq!(sniff(&header), FileKind::Mp4);
        assert!(FileKind::Mp4.is_video());
    }

    #[test]
    fn webm_is_detected_by_ebml_magic() {
        let header = [0x1A, 0x45, 0xDF, 0xA3, 0x01, 0x02];
        assert_eq!(sniff(&header), FileKind::Webm);
        assert!(FileKind::Webm.is_video());
    }

    #[test]
    fn image_signatures_are_detected() {
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), FileKind::Jpeg);
        assert_eq!(
            sniff(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            FileKind::Png
        );
        assert_eq!(sniff(b"GIF89a"), FileKind::Gif);

        let mut webp = Vec::new();
        webp.extend_from_slice(b"RIFF");
        webp.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        webp.extend_from_slice(b"WEBP");
        assert_eq!(sniff(&webp), FileKind::Webp);

        for kind in [FileKind::Jpeg, FileKind::Png, FileKind::Webp, FileKind::Gif] {
            assert!(kind.is_image());
            assert!(!kind.is_video());
        }
    }

    #[test]
    fn zip_is_detected_including_empty_archives() {
        assert_eq!(sniff(b"PK\x03\x04rest"), FileKind::Zip);
        assert_eq!(sniff(b"PK\x05\x06"), FileKind::Zip);
    }

    #[test]
    fn manifest_is_detected_with_and_without_xml_declaration() {
        assert_eq!(
            sniff(b"<?xml version=\"1.0\"?><MPD></MPD>"),
            FileKind::DashManifest
        );
        assert_eq!(sniff(b"<MPD xmlns=\"urn:mpeg:dash\">"), FileKind::DashManifest);
        // Leading BOM and whitespace are tolerated
        let mut with_bom = vec![0xEF, 0xBB, 0xBF, b'\n', b' '];
        with_bom.extend_from_slice(b"<?xml version=\"1.0\"?>");
        assert_eq!(sniff(&with_bom), FileKind::DashManifest);
    }

    #[test]
    fn html_is_not_mistaken_for_a_manifest() {
        assert_eq!(sniff(b"<html><body>404</body></html>"), FileKind::Unknown);
    }

    #[test]
    fn short_and_empty_headers_are_unknown() {
        assert_eq!(sniff(&[]), FileKind::Unknown);
        assert_eq!(sniff(&[0xFF]), FileKind::Unknown);
        assert_eq!(sniff(b"PK"), FileKind::Unknown);
    }

    #[test]
    fn every_kind_has_a_distinct_extension() {
        let kinds = [
            FileKind::Mp4,
            FileKind::Webm,
            FileKind::Jpeg,
            FileKind::Png,
            FileKind::Webp,
            FileKind::Gif,
            FileKind::Zip,
            FileKind::DashManifest,
            FileKind::Unknown,
        ];
        let mut extensions: Vec<_> = kinds.iter().map(|k| k.extension()).collect();
        extensions.sort_unstable();
        extensions.dedup();
        assert_eq!(extensions.len(), kinds.len());
    }

    #[tokio::test]
    async fn sniff_file_reads_the_header_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("media.tmp");
        let mut data = vec![0x00, 0x00, 0x00, 0x18];
        data.extend_from_slice(b"ftypisom");
        data.extend_from_slice(&[0u8; 512]);
        tokio::fs::write(&path, &data).await.unwrap();

        assert_eq!(sniff_file(&path).await.unwrap(), FileKind::Mp4);
    }

    #[tokio::test]
    async fn sniff_file_handles_files_shorter_than_the_header_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.tmp");
        tokio::fs::write(&path, b"GIF89a").await.unwrap();

        assert_eq!(sniff_file(&path).await.unwrap(), FileKind::Gif);
    }
}
