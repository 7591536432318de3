//! prompt-enhancer - Rewrite rough prompts for a specific target LLM
//!
//! An interactive wizard that detects which framework components a raw
//! prompt already covers for the chosen target (Claude, ChatGPT, Gemini,
//! Perplexity), asks a few clarifying questions about the gaps, and has a
//! generation service rewrite the prompt in that target's preferred
//! structure. Supports Anthropic, OpenAI and Gemini as the generation
//! backend.

pub mod cli;
pub mod compare;
pub mod config;
pub mod intent;
pub mod llm;
pub mod model;
pub mod parse;
pub mod pipeline;
pub mod profiles;
pub mod session;
pub mod util;
