//! Business Services
//!
//! This module contains the core business logic services:
//!
//! - `NodeModel` - tree construction and mutation (save, clone, reorder,
//!   remove, trash, publish) over a pluggable storage adapter
//! - `NodeValidator` - pre-save validation against sibling data
//!
//! Services coordinate between the storage boundary and application logic,
//! implementing the business rules and orchestrating multi-step operations.

pub mod error;
pub mod node_model;
pub mod validator;

pub use error::{NodeModelError, NodeValidationIssue};
pub use node_model::{Breadcrumb, NodeModel, NodeOrder};
pub use validator::{normalize_route, NodeValidator};
