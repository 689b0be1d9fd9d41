//! meow-client - Submission and status streaming for the meow
//! video-stitching service.
//!
//! Hexagonal architecture:
//! - domain/: Pure logic (settings validation, frame decoding, progress,
//!   outcome resolution)
//! - ports/: Trait definitions for the I/O seams
//! - adapters/: Concrete implementations (reqwest HTTP, tungstenite
//!   WebSocket)
//! - application/: Generic services that use ports
//! - config: Service endpoints and timeouts
//!
//! Typical flow: validate raw settings into [`JobSettings`], submit the two
//! camera file lists with [`MeowClient::submit_job`], subscribe to the
//! returned task id, then derive [`ProgressView`]s from the history and the
//! final [`TaskOutcome`] from the terminal message.

pub mod adapters;
pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use application::submit::{SubmitService, TaskHandle, UploadRequest};
pub use application::subscriptions::{
    StreamEvent, StreamPhase, StreamState, SubscriptionHandle, SubscriptionRegistry,
};
pub use client::MeowClient;
pub use config::ClientConfig;
pub use domain::outcome::{resolve, CompletionAction, TaskOutcome};
pub use domain::progress::ProgressView;
pub use domain::settings::{
    validate, JobSettings, ProcessingType, RawJobSettings, ValidationError, ValidationReason,
};
pub use domain::status::{decode_frame, ParseError, StatusMessage, TaskPayload, TaskStatus};
pub use ports::stream::{ConnectionError, StreamConnector};
pub use ports::upload::{FileSource, UploadError, UploadTransport};
