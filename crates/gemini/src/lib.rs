//! Client for the Gemini generative-text endpoint
//!
//! One request shape, one response shape: POST a single text prompt with
//! generation and safety configuration, the API key as a query
//! parameter, and read the generated text out of the first candidate's
//! first content part. No retries here; retry policy lives in the
//! batch orchestrator and above.
//!
//! Models are asked for strict JSON but routinely wrap it in markdown
//! fences or chatter around it; `extract` carries the cleaning step that
//! turns such a response into something `serde_json` will accept.

pub mod client;
pub mod error;
pub mod extract;

pub use client::{Client, ClientConfig};
pub use error::{Error, Result};
pub use extract::clean_json_block;
