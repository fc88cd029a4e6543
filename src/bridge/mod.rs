// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the host-facing surface of molvis-core. A viewer widget talks to
// a `Session` through JSON messages; nothing outside this module needs to know the
// wire format.
//
// Data Flow (one message):
//
//   1. [Session::handle_message]   -> Receives a raw JSON string
//         |
//         `-> a. `protocol` decodes it into a `Request`
//         |
//         `-> b. `Session::execute` dispatches on `method`
//
//   2. [Command]                   -> Edits the trajectory, the data source or the pipeline
//         |
//         `-> `format` converts frame JSON <-> `Frame` where frames cross the boundary
//
//   3. [ModifierPipeline::apply]   -> Recomputes the displayed frame from scratch
//         |
//         `-> the result is handed to the `SceneSink` for rendering
//
//   4. [Response]                  -> `{ result }` or `{ error }`; the host is never faulted
//
// ====================================================================================
pub mod format;
pub mod protocol;
pub mod scene;
pub mod session;

pub use self::protocol::{Request, Response};
pub use self::scene::{NullSink, SceneSink};
pub use self::session::{InteractionMode, Session};
