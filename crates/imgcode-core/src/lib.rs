//! ImgCode Core - source text stored in RGBA pixel grids
//!
//! This crate packs text into the colour channels of an image and reads it
//! back: escaping, optional token codecs (minify, dictionary, LZW), grid
//! sizing, the container header, PNG I/O and the load/run orchestration
//! around them.

pub mod codec;
pub mod decode;
pub mod encode;
pub mod escape;
pub mod events;
pub mod grid;
pub mod header;
pub mod options;
pub mod payload;
pub mod run;

pub use codec::{CodecError, Registry, RegistryError, TokenCodec};
pub use decode::{decode, decode_text, DecodeError};
pub use encode::{encode, encode_text, encode_with, EncodeError};
pub use escape::{escape, unescape, EscapeError};
pub use events::{DispatchReport, Event, HandlerError, HandlerKind, Handlers, Pending};
pub use grid::{decode_png, encode_png, Geometry, GridError, PixelGrid, SurfaceLimits};
pub use header::{CodecTag, ContainerHeader, FORMAT_VERSION};
pub use options::{EncodeOptions, MinifyOptions};
pub use payload::Payload;
pub use run::{run, ExecutionFailure, Executor, FetchError, Fetcher, LoadEvent, Loader, RunError};
