//! Leakhunt Runtime
//!
//! Drives a scan: root events go onto the bus, pending events are handed to
//! every module that watches their type, and a runtime limit stops the crawl
//! cooperatively.

pub mod scan;

pub use scan::*;
