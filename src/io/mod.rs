//! Frame I/O over byte streams
//!
//! Blocking readers and writers work on any `std::io::Read`/`Write`
//! (stdin and stdout in the command line tool); the async variants work on
//! any Tokio `AsyncRead`/`AsyncWrite`.

pub mod async_io;
pub mod reader;
pub mod writer;

pub use async_io::{AsyncFrameReader, AsyncFrameWriter};
pub use reader::FrameReader;
pub use writer::FrameWriter;
