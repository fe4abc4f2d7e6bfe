//! Pipeline stages for one OCR task.
//!
//! Each submodule implements exactly one step, so each can be tested alone.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ invoke ──▶ sections ──▶ output
//! (list)    (base64)   (Bedrock)  (parse)      (.txt + .json)
//!                          │
//!                          └── any TaskError ──▶ errlog
//! ```
//!
//! 1. [`input`]: load the image list once at startup
//! 2. [`encode`]: read image bytes, detect format, base64-wrap
//! 3. [`invoke`]: build the Nova request and call the model; the only
//!    stage with network I/O
//! 4. [`sections`]: pick the tagged blocks out of the generated text
//! 5. [`output`]: write the text and raw response side by side
//! 6. [`errlog`]: append one line per failed task

pub mod encode;
pub mod errlog;
pub mod input;
pub mod invoke;
pub mod output;
pub mod sections;
