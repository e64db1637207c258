//! Client for a remote identity directory service.
//!
//! Looks up, lists, creates, updates, deletes and bulk-imports user
//! accounts over the service's JSON-over-HTTPS account API, and normalizes
//! the service's loosely-typed user objects into [`UserRecord`]s.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use xavyo_directory_client::{CredentialTokenSource, DirectoryClient, DirectoryConfig};
//!
//! # async fn run() -> xavyo_directory_client::DirectoryResult<()> {
//! let client = DirectoryClient::new(
//!     DirectoryConfig::default(),
//!     Arc::new(CredentialTokenSource::bearer("token")),
//! )?;
//! let cancel = CancellationToken::new();
//! let user = client.get_user(&cancel, "some-uid").await?;
//!
//! let mut pager = client.list_users(Some(500), None)?;
//! while let Some(page) = pager.next_page(&cancel).await? {
//!     for record in page.users {
//!         println!("{}", record.uid);
//!     }
//! }
//! # let _ = user;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod import;
pub mod mapper;
pub mod model;
pub mod normalize;
pub mod pager;
pub mod request;
pub mod retry;
pub mod validate;
pub mod wire;

pub use auth::{CredentialTokenSource, DirectoryCredentials, TokenSource};
pub use client::DirectoryClient;
pub use config::{DirectoryConfig, DirectoryConfigBuilder};
pub use error::{DirectoryError, DirectoryResult, ElementFailure};
pub use import::{
    ImportErrorInfo, ImportFailureKind, ImportUserRecord, UserImportHash, UserImportOptions,
    UserImportResult,
    MAX_IMPORT_BATCH_SIZE,
};
pub use mapper::{MappingPolicy, ResponseMapper};
pub use model::{
    ExportedUserRecord, PageCursor, ProviderId, ProviderInfo, UserMetadata, UserRecord,
};
pub use pager::{UserPage, UserPager};
pub use request::{FieldUpdate, UserCreate, UserLookup, UserUpdate};
pub use retry::RetryPolicy;
