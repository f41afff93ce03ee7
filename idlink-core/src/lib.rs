#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Links external identifiers (OpenID URLs and XRIs) to local accounts.
//!
//! The crate validates and normalizes identifiers, drives the relying-party
//! handshake through a host-provided [`RelyingPartyGateway`], decides what a
//! provider's answer means for the logged in account and keeps the resulting
//! associations in an [`AssociationStore`]. [`AssociationService`] ties these
//! together; host request handlers call it and map the returned
//! [`MessageKey`]s to localized text.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use idlink_core::{
//!     AccountRef, AssociationService, MemoryAssociationStore, RelyingPartyGateway,
//! };
//!
//! fn serve(gateway: Arc<dyn RelyingPartyGateway>) -> Result<(), idlink_core::AssociationError> {
//!     let service =
//!         AssociationService::with_defaults(Arc::new(MemoryAssociationStore::new()), gateway);
//!     let result = service.complete_association(Some(&AccountRef::new("42")), Some("/account"))?;
//!     println!("{:?}", result.message);
//!     Ok(())
//! }
//! ```

mod authorizer;
pub use authorizer::*;

mod claims;
pub use claims::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod gateway;
pub use gateway::*;

mod identifier;
pub use identifier::*;

mod messages;
pub use messages::*;

mod redirect;
pub use redirect::*;

mod service;
pub use service::*;

pub mod logger;
pub mod store;

pub use store::{
    Association, AssociationStore, BlobAssociationStore, MemoryAssociationStore, StoreError,
};

#[cfg(feature = "ffi")]
mod ffi;
#[cfg(feature = "ffi")]
pub use ffi::*;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("idlink_core");
