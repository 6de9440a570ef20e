//! Static practice content on disk.

pub mod shadowing;
