//! text-render runs a native text-layout engine in an isolated worker and turns
//! its flat numeric output into typed drawing commands.
//!
//! # Pieces
//!
//! 1. **Dispatch**: [`Dispatcher`] queues layout jobs ([`TextData`]) and hands them
//!    to the worker one at a time, correlating every reply with its caller.
//! 2. **Font relay**: the worker asks the controller for font bytes it lacks; a
//!    bound [`FontResolver`] answers. Each family is requested at most once while
//!    a request is outstanding.
//! 3. **Worker**: a dedicated thread that owns the [`LayoutEngine`], loads fonts
//!    into it and executes jobs strictly serially.
//! 4. **Decode**: [`decode`] parses the engine's command buffer into boxes and
//!    [`Command`]s; [`paint`] replays them onto any [`Painter`].
//!
//! Messages between controller and worker are [`Envelope`]s with the JSON shape
//! `{"type": ..., "content": ...}`.
#![forbid(unsafe_code)]

pub mod codec;
pub mod dispatch;
pub mod engine;
pub mod foundation;
pub mod model;
pub mod paint;
pub mod protocol;
pub mod relay;
pub mod worker;

pub use codec::color::{HexColor, pack_rgb, unpack_rgb};
pub use codec::command::{BBox, Command, DecodedResult, PathSegment, Stroke, Transform};
pub use codec::decode::decode;
pub use codec::encode::encode;
pub use dispatch::dispatcher::Dispatcher;
pub use engine::{FontCacheSlots, LayoutEngine};
pub use foundation::config::{DEFAULT_FONT_FAMILY, DispatcherOpts};
pub use foundation::error::{DecodeError, DecodeErrorKind, TextRenderError, TextRenderResult};
pub use model::text_data::TextData;
pub use paint::{Painter, paint};
pub use protocol::message::Envelope;
pub use relay::resolver::{FontResolver, StaticFontResolver};
pub use worker::runtime::{WorkerChannels, WorkerState, spawn_worker};
