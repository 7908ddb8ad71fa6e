//! # Spotbook Firebase
//!
//! [`RecordStore`](spotbook_core::store::RecordStore) implementation over the
//! Firebase Realtime Database REST API.
//!
//! ## Example
//!
//! ```no_run
//! use spotbook_firebase::{FirebaseConfig, FirebaseStore};
//! use spotbook_core::store::RecordStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FirebaseConfig::new("https://my-project.firebaseio.com", "my-project")
//!         .with_auth_token("secret");
//!     let store = FirebaseStore::new(config)?;
//!
//!     let reservations = store.get_all("reservations").await?;
//!     println!("{} reservations", reservations.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Database rules
//!
//! Equality queries use `orderBy`/`equalTo`, which the database only serves
//! for indexed children:
//!
//! ```json
//! { "rules": { "reservations": { ".indexOn": ["email"] } } }
//! ```

pub mod client;
pub mod config;

pub use client::FirebaseStore;
pub use config::FirebaseConfig;
