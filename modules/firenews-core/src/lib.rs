//! Scoring and moderation core.
//!
//! Submissions are scored by an external [`Predictor`], persisted through a
//! [`DocumentStore`] via the document mapper, and reviewed through the
//! [`ModerationQueue`]. Both collaborators sit behind traits so the same
//! workflow runs against Firestore, Postgres, or the in-memory test doubles.

pub mod articles;
pub mod deps;
pub mod mapper;
pub mod moderation;
pub mod predictor;
pub mod store;
pub mod submission;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use articles::ArticleRepository;
pub use deps::FireNews;
pub use mapper::FieldEncoding;
pub use moderation::{ModerationQueue, ScoreOverride, DEFAULT_OVERRIDE_CONFIDENCE};
pub use predictor::{Prediction, Predictor, ProcessPredictor};
pub use store::{DocumentStore, FieldMap, Scalar, SortDirection, StoreQuery, StoredDocument};
pub use submission::{parse_published_at, SubmissionOrchestrator};
