//! Core types for media-dl

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Unique identifier for a ledger task
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<TaskId> for i64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for TaskId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> std::result::Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskId {
    fn decode(
        value: sqlx::sqlite::SqliteValueRef<'r>,
    ) -> std::result::Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Lifecycle stage of a ledger task
///
/// `Downloading` is initial; `Merging` is entered only by the overlay
/// branch; `Saved`, `Failed` and `MergeFailed` are terminal. No stage is
/// ever revisited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStage {
    /// Inputs are being fetched and transformed
    Downloading,
    /// The overlay muxer is running
    Merging,
    /// Final artifact committed to permanent storage
    Saved,
    /// Request failed (fetch, DASH, crypto, or any non-merge error)
    Failed,
    /// Overlay compositing failed
    MergeFailed,
}

impl DownloadStage {
    /// Convert integer stage code to DownloadStage
    pub fn from_i32(stage: i32) -> Self {
        match stage {
            0 => DownloadStage::Downloading,
            1 => DownloadStage::Merging,
            2 => DownloadStage::Saved,
            3 => DownloadStage::Failed,
            4 => DownloadStage::MergeFailed,
            _ => DownloadStage::Failed, // Default to Failed for unknown codes
        }
    }

    /// Convert DownloadStage to integer stage code
    pub fn to_i32(&self) -> i32 {
        match self {
            DownloadStage::Downloading => 0,
            DownloadStage::Merging => 1,
            DownloadStage::Saved => 2,
            DownloadStage::Failed => 3,
            DownloadStage::MergeFailed => 4,
        }
    }

    /// Whether the stage is terminal (the task will never advance again)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadStage::Saved | DownloadStage::Failed | DownloadStage::MergeFailed
        )
    }
}

/// Classification metadata recorded on a task, used for list filtering
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    /// Media received in a conversation
    ChatMedia,
    /// Story post
    Story,
    /// Spotlight post
    Spotlight,
    /// Anything else
    #[default]
    Generic,
}

impl MediaCategory {
    /// Stable string code used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::ChatMedia => "chat_media",
            MediaCategory::Story => "story",
            MediaCategory::Spotlight => "spotlight",
            MediaCategory::Generic => "generic",
        }
    }

    /// Decode a database string code; unknown codes become `Generic`
    pub fn from_db(code: &str) -> Self {
        match code {
            "chat_media" => MediaCategory::ChatMedia,
            "story" => MediaCategory::Story,
            "spotlight" => MediaCategory::Spotlight,
            _ => MediaCategory::Generic,
        }
    }
}

/// Filter applied to ledger queries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaFilter {
    /// No filtering — every task matches
    #[default]
    None,
    /// Only tasks that have not reached a terminal stage
    Pending,
    /// Only chat-media tasks
    ChatMedia,
    /// Only story tasks
    Story,
    /// Only spotlight tasks
    Spotlight,
}

impl MediaFilter {
    /// Whether a task with the given stage and category passes this filter
    pub fn matches(&self, stage: DownloadStage, category: MediaCategory) -> bool {
        match self {
            MediaFilter::None => true,
            MediaFilter::Pending => !stage.is_terminal(),
            MediaFilter::ChatMedia => category == MediaCategory::ChatMedia,
            MediaFilter::Story => category == MediaCategory::Story,
            MediaFilter::Spotlight => category == MediaCategory::Spotlight,
        }
    }
}

/// How an input source is addressed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Opaque reference bytes for the external resolver (base64url)
    ProtoReference,
    /// Payload bytes carried inline (base64url)
    DirectBytes,
    /// Plain HTTP(S) URL
    RemoteUrl,
    /// Existing file on the local filesystem
    LocalPath,
}

/// Symmetric key material for an encrypted input (base64url-encoded)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptionKeyPair {
    /// AES key, base64url
    pub key: String,
    /// CBC initialization vector, base64url
    pub iv: String,
}

/// One declared media source of a request
///
/// Immutable once constructed; also used as the key of the fetcher's result
/// map, hence `Eq + Hash`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputMedia {
    /// How `content` is interpreted
    pub kind: InputKind,
    /// Reference bytes, inline payload, URL, or path depending on `kind`
    pub content: String,
    /// Decryption keys, if the source bytes are encrypted
    #[serde(default)]
    pub encryption: Option<EncryptionKeyPair>,
}

impl InputMedia {
    /// Create an unencrypted input
    pub fn new(kind: InputKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            encryption: None,
        }
    }

    /// Create an encrypted input
    pub fn encrypted(
        kind: InputKind,
        content: impl Into<String>,
        encryption: EncryptionKeyPair,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            encryption: Some(encryption),
        }
    }
}

/// Time window for DASH chapter muxing, in seconds
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DashOptions {
    /// Start offset within the stream
    pub offset_time: f64,
    /// Chapter length; `None` muxes to end of stream
    #[serde(default)]
    pub duration: Option<f64>,
}

/// A declarative download request — the inbound half of the trigger contract
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Ordered input sources
    pub inputs: Vec<InputMedia>,
    /// The single input is a DASH manifest to rewrite and chapter-mux
    #[serde(default)]
    pub is_dash_playlist: bool,
    /// Composite a video with an image overlay
    #[serde(default)]
    pub should_merge_overlay: bool,
    /// Chapter window for the DASH branch
    #[serde(default)]
    pub dash_options: Option<DashOptions>,
}

impl DownloadRequest {
    /// Validate the structural invariants that can be checked before any I/O
    ///
    /// The overlay-shape invariant (one video + one image) depends on sniffed
    /// file types and is enforced by the pipeline after fetching.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(Error::Precondition(
                "request declares no input media".to_string(),
            ));
        }

        if self.is_dash_playlist {
            if self.inputs.len() != 1 || self.inputs[0].kind != InputKind::RemoteUrl {
                return Err(Error::Precondition(format!(
                    "dash playlist request must have exactly one remote_url input, got {} input(s)",
                    self.inputs.len()
                )));
            }
            if self.dash_options.is_none() {
                return Err(Error::Precondition(
                    "dash playlist request is missing dash_options".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// The serialized task half of the trigger contract
///
/// Carries everything the controller needs to register a ledger entry
/// before the pipeline starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Destination path without extension; the sniffed extension is appended
    /// at commit time
    pub output_path: String,
    /// Display label for list UIs
    pub label: String,
    /// Classification metadata used for filtering
    #[serde(default)]
    pub category: MediaCategory,
}

/// A ledger entry as seen by consumers of the query surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingTask {
    /// Unique, monotonically increasing id
    pub id: TaskId,
    /// Display label
    pub label: String,
    /// Classification metadata
    pub category: MediaCategory,
    /// Current lifecycle stage
    pub stage: DownloadStage,
    /// Destination path template (no extension)
    pub output_path: String,
    /// Absolute final path, populated only once `stage` is `Saved`
    pub output_file: Option<String>,
    /// Failure message, populated on `Failed`/`MergeFailed`
    pub error_message: Option<String>,
    /// Unix timestamp of task creation
    pub created_at: i64,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // --- DownloadStage integer encoding ---

    #[test]
    fn stage_round_trips_through_i32_for_all_variants() {
        let cases = [
            (DownloadStage::Downloading, 0),
            (DownloadStage::Merging, 1),
            (DownloadStage::Saved, 2),
            (DownloadStage::Failed, 3),
            (DownloadStage::MergeFailed, 4),
        ];

        for (variant, expected_int) in cases {
            assert_eq!(
                variant.to_i32(),
                expected_int,
                "{variant:?} should encode to {expected_int}"
            );
            assert_eq!(
                DownloadStage::from_i32(expected_int),
                variant,
                "{expected_int} should decode to {variant:?}"
            );
        }
    }

    #[test]
    fn stage_from_unknown_integer_defaults_to_failed() {
        assert_eq!(
            DownloadStage::from_i32(99),
            DownloadStage::Failed,
            "unknown stage 99 must fall back to Failed so corrupted rows surface visibly"
        );
        assert_eq!(DownloadStage::from_i32(-1), DownloadStage::Failed);
    }

    #[test]
    fn exactly_three_stages_are_terminal() {
        assert!(DownloadStage::Saved.is_terminal());
        assert!(DownloadStage::Failed.is_terminal());
        assert!(DownloadStage::MergeFailed.is_terminal());
        assert!(!DownloadStage::Downloading.is_terminal());
        assert!(!DownloadStage::Merging.is_terminal());
    }

    // --- MediaCategory codes ---

    #[test]
    fn category_round_trips_through_db_code() {
        for category in [
            MediaCategory::ChatMedia,
            MediaCategory::Story,
            MediaCategory::Spotlight,
            MediaCategory::Generic,
        ] {
            assert_eq!(MediaCategory::from_db(category.as_str()), category);
        }
    }

    #[test]
    fn unknown_category_code_decodes_to_generic() {
        assert_eq!(MediaCategory::from_db("banana"), MediaCategory::Generic);
        assert_eq!(MediaCategory::from_db(""), MediaCategory::Generic);
    }

    // --- MediaFilter matching ---

    #[test]
    fn filter_none_matches_everything() {
        for stage in [
            DownloadStage::Downloading,
            DownloadStage::Saved,
            DownloadStage::MergeFailed,
        ] {
            assert!(MediaFilter::None.matches(stage, MediaCategory::Generic));
        }
    }

    #[test]
    fn filter_pending_matches_only_non_terminal_stages() {
        let filter = MediaFilter::Pending;
        assert!(filter.matches(DownloadStage::Downloading, MediaCategory::Story));
        assert!(filter.matches(DownloadStage::Merging, MediaCategory::Story));
        assert!(!filter.matches(DownloadStage::Saved, MediaCategory::Story));
        assert!(!filter.matches(DownloadStage::Failed, MediaCategory::Story));
        assert!(!filter.matches(DownloadStage::MergeFailed, MediaCategory::Story));
    }

    #[test]
    fn category_filters_match_their_category_regardless_of_stage() {
        assert!(MediaFilter::Story.matches(DownloadStage::Saved, MediaCategory::Story));
        assert!(MediaFilter::Story.matches(DownloadStage::Downloading, MediaCategory::Story));
        assert!(!MediaFilter::Story.matches(DownloadStage::Saved, MediaCategory::Spotlight));
        assert!(!MediaFilter::ChatMedia.matches(DownloadStage::Saved, MediaCategory::Generic));
        assert!(MediaFilter::Spotlight.matches(DownloadStage::Failed, MediaCategory::Spotlight));
    }

    // --- DownloadRequest validation ---

    fn remote(url: &str) -> InputMedia {
        InputMedia::new(InputKind::RemoteUrl, url)
    }

    #[test]
    fn empty_request_is_rejected() {
        let request = DownloadRequest {
            inputs: vec![],
            is_dash_playlist: false,
            should_merge_overlay: false,
            dash_options: None,
        };
        assert!(matches!(
            request.validate(),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn dash_request_requires_single_remote_url_input() {
        let request = DownloadRequest {
            inputs: vec![remote("https://cdn.example.com/a.mpd"), remote("https://x/b")],
            is_dash_playlist: true,
            should_merge_overlay: false,
            dash_options: Some(DashOptions::default()),
        };
        assert!(request.validate().is_err(), "two inputs must be rejected");

        let request = DownloadRequest {
            inputs: vec![InputMedia::new(InputKind::LocalPath, "/tmp/a.mpd")],
            is_dash_playlist: true,
            should_merge_overlay: false,
            dash_options: Some(DashOptions::default()),
        };
        assert!(
            request.validate().is_err(),
            "non-remote input must be rejected"
        );
    }

    #[test]
    fn dash_request_requires_options() {
        let request = DownloadRequest {
            inputs: vec![remote("https://cdn.example.com/a.mpd")],
            is_dash_playlist: true,
            should_merge_overlay: false,
            dash_options: None,
        };
        assert!(matches!(
            request.validate(),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn valid_dash_and_overlay_requests_pass() {
        let dash = DownloadRequest {
            inputs: vec![remote("https://cdn.example.com/a.mpd")],
            is_dash_playlist: true,
            should_merge_overlay: false,
            dash_options: Some(DashOptions {
                offset_time: 12.5,
                duration: Some(30.0),
            }),
        };
        dash.validate().unwrap();

        let overlay = DownloadRequest {
            inputs: vec![remote("https://x/video"), remote("https://x/overlay")],
            is_dash_playlist: false,
            should_merge_overlay: true,
            dash_options: None,
        };
        overlay.validate().unwrap();
    }

    // --- TaskId ---

    #[test]
    fn task_id_conversions_and_display() {
        let id = TaskId::from(42_i64);
        let raw: i64 = id.into();
        assert_eq!(raw, 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(TaskId::from_str("123").unwrap().get(), 123);
        assert!(TaskId::from_str("abc").is_err());
    }

    // --- Trigger contract serialization ---

    #[test]
    fn request_deserializes_with_defaults_for_optional_fields() {
        let json = r#"{
            "inputs": [
                {"kind": "remote_url", "content": "https://cdn.example.com/media"}
            ]
        }"#;
        let request: DownloadRequest = serde_json::from_str(json).unwrap();
        assert!(!request.is_dash_playlist);
        assert!(!request.should_merge_overlay);
        assert!(request.dash_options.is_none());
        assert!(request.inputs[0].encryption.is_none());
    }

    #[test]
    fn template_deserializes_with_default_category() {
        let json = r#"{"output_path": "/media/story/2024-01-01_abc", "label": "story"}"#;
        let template: TaskTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.category, MediaCategory::Generic);
    }
}
