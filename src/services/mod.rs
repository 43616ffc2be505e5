//! Business logic services.

pub mod archive;
pub mod extraction;
pub mod git;
pub mod github;
pub mod materialize;
pub mod model_client;
pub mod pipeline;
pub mod scanner;
pub mod worker;
pub mod workspace;

pub use git::{GitCli, Publisher, WorkingCopyProvider};
pub use github::{GitHubClient, RepositoryHost};
pub use model_client::{ModelClient, OpenAiClient};
pub use pipeline::ConversionPipeline;
pub use worker::{WorkerHandle, spawn_worker};
pub use workspace::Workspace;
