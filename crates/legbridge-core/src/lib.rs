//! # legbridge Core Library
//!
//! Serial command protocol engine for legged-robot controller boards.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - 9-byte frame encoding and validation
//! - A link reader that extracts response frames from the raw byte stream
//! - A dispatcher that serializes concurrent named commands onto the link
//! - The command registry mapping names and parameters to frames
//! - A simulated controller board for running without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use legbridge_core::protocol::{Gateway, LinkConfig};
//! use legbridge_core::registry::CommandRegistry;
//!
//! let gateway = Gateway::open(&LinkConfig::default(), CommandRegistry::standard())?;
//!
//! let mut params = HashMap::new();
//! params.insert("height".to_string(), "60".to_string());
//! let answer = gateway.invoke("body_height", params).await;
//! assert_eq!(answer, "ok");
//! ```

pub mod protocol;
pub mod registry;
pub mod sim;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::protocol::{Gateway, LinkConfig, ProtocolError, ScanMode};
    pub use crate::registry::{CommandDefinition, CommandRegistry, Conversion, Decoder, ParamSpec};
    pub use crate::sim::SimulatedBoard;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
