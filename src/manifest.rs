//! DASH manifest rewriting
//!
//! Manifests fetched from the proprietary service carry relative `BaseURL`
//! values; the chaptered muxer needs them rooted at the public CDN. The
//! rewrite is event-level (quick-xml), so everything except `BaseURL` text
//! nodes passes through untouched.

use std::path::Path;

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::error::{Error, Result};

/// Rewrite every `BaseURL` text node of `xml`, prepending `cdn_prefix`
///
/// Returns the serialized document and the number of rewritten nodes.
pub fn rewrite_base_urls_str(xml: &str, cdn_prefix: &str) -> Result<(String, usize)> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut in_base_url = false;
    let mut rewritten = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Manifest(format!("parse error at byte {}: {e}", reader.buffer_position())))?;

        match event {
            Event::Eof => break,
            Event::Start(ref e) if e.local_name().as_ref() == b"BaseURL" => {
                in_base_url = true;
                write_event(&mut writer, event)?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"BaseURL" => {
                in_base_url = false;
                write_event(&mut writer, event)?;
            }
            Event::Text(ref e) if in_base_url => {
                let original = e
                    .unescape()
                    .map_err(|e| Error::Manifest(format!("invalid BaseURL text: {e}")))?;
                let prefixed = format!("{cdn_prefix}{original}");
                write_event(&mut writer, Event::Text(BytesText::new(&prefixed)))?;
                rewritten += 1;
            }
            other => write_event(&mut writer, other)?,
        }
    }

    let bytes = writer.into_inner();
    let serialized = String::from_utf8(bytes)
        .map_err(|e| Error::Manifest(format!("rewritten manifest is not UTF-8: {e}")))?;
    Ok((serialized, rewritten))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Manifest(format!("serialization error: {e}")))
}

/// Rewrite a manifest file on disk
///
/// Reads `input`, rewrites every `BaseURL`, and writes the result to
/// `output`. Returns the number of rewritten nodes.
pub async fn rewrite_base_urls(input: &Path, output: &Path, cdn_prefix: &str) -> Result<usize> {
    let xml = tokio::fs::read_to_string(input).await?;
    let (serialized, rewritten) = rewrite_base_urls_str(&xml, cdn_prefix)?;
    tokio::fs::write(output, serialized).await?;

    debug!(?input, ?output, rewritten, "rewrote manifest BaseURLs");
    Ok(rewritten)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "https://cdn.example.com/d/";

    #[test]
    fn every_base_url_is_prefixed() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static">
  <Period>
    <AdaptationSet mimeType="video/mp4">
      <Representation id="v0" bandwidth="1000000">
        <BaseURL>chunk-video.mp4</BaseURL>
      </Representation>
    </AdaptationSet>
    <AdaptationSet mimeType="audio/mp4">
      <Representation id="a0" bandwidth="128000">
        <BaseURL>chunk-audio.mp4</BaseURL>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>"#;

        let (out, rewritten) = rewrite_base_urls_str(xml, PREFIX).unwrap();

        assert_eq!(rewritten, 2);
        assert!(out.contains("<BaseURL>https://cdn.example.com/d/chunk-video.mp4</BaseURL>"));
        assert!(out.contains("<BaseURL>https://cdn.example.com/d/chunk-audio.mp4</BaseURL>"));
    }

    #[test]
    fn surrounding_structure_is_preserved() {
        let xml = r#"<MPD type="static" mediaPresentationDuration="PT30S"><Period start="PT0S"><BaseURL>seg</BaseURL></Period></MPD>"#;

        let (out, rewritten) = rewrite_base_urls_str(xml, PREFIX).unwrap();

        assert_eq!(rewritten, 1);
        // Attributes and element nesting survive byte-for-byte
        assert!(out.contains(r#"<MPD type="static" mediaPresentationDuration="PT30S">"#));
        assert!(out.contains(r#"<Period start="PT0S">"#));
        assert!(out.ends_with("</Period></MPD>"));
    }

    #[test]
    fn text_outside_base_url_is_untouched() {
        let xml = r#"<MPD><Title>my clip</Title><BaseURL>seg-1</BaseURL></MPD>"#;

        let (out, rewritten) = rewrite_base_urls_str(xml, PREFIX).unwrap();

        assert_eq!(rewritten, 1);
        assert!(out.contains("<Title>my clip</Title>"));
        assert!(out.contains(&format!("<BaseURL>{PREFIX}seg-1</BaseURL>")));
    }

    #[test]
    fn manifest_without_base_urls_round_trips_unchanged() {
        let xml = r#"<MPD><Period></Period></MPD>"#;

        let (out, rewritten) = rewrite_base_urls_str(xml, PREFIX).unwrap();

        assert_eq!(rewritten, 0);
        assert_eq!(out, xml);
    }

    #[test]
    fn escaped_characters_in_base_url_survive_the_rewrite() {
        let xml = r#"<MPD><BaseURL>seg?a=1&amp;b=2</BaseURL></MPD>"#;

        let (out, _) = rewrite_base_urls_str(xml, PREFIX).unwrap();

        assert!(out.contains(&format!("<BaseURL>{PREFIX}seg?a=1&amp;b=2</BaseURL>")));
    }

    #[test]
    fn malformed_xml_is_a_manifest_error() {
        let err = rewrite_base_urls_str("<MPD><BaseURL>x</MPD>", PREFIX).unwrap_err();
        assert!(matches!(err, Error::Manifest(_)));
    }

    #[tokio::test]
    async fn file_rewrite_reads_and_writes_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("playlist.tmp");
        let output = dir.path().join("playlist.mpd");
        tokio::fs::write(&input, r#"<MPD><BaseURL>clip.mp4</BaseURL></MPD>"#)
            .await
            .unwrap();

        let rewritten = rewrite_base_urls(&input, &output, PREFIX).await.unwrap();

        assert_eq!(rewritten, 1);
        let out = tokio::fs::read_to_string(&output).await.unwrap();
        assert!(out.contains(&format!("<BaseURL>{PREFIX}clip.mp4</BaseURL>")));
    }
}
