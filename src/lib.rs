//! Rivertown Ball Company customer-service chat
//!
//! The server side ([`emitter`], [`api`]) forwards one user message to a
//! hosted model and answers with the whole reply or a stream of frames.
//! The widget side ([`assembler`], [`client`]) merges those frames into a
//! transcript.

pub mod api;
pub mod assembler;
pub mod client;
pub mod config;
pub mod emitter;
pub mod llm;
pub mod protocol;
pub mod system_prompt;
