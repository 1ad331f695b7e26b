//! # diagscope - Live Vehicle Diagnostics Console
//!
//! diagscope cyclically requests a chosen subset of named signals from the
//! control units on a request/response diagnostics bus, decodes the answers,
//! and keeps a terminal dashboard current while the operator picks which
//! signals to watch.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Bus back-end (own thread)                      │
//! │        simulated ECU (--simulate) | log replay (--replay)       │
//! └───────────────┬─────────────────────────────▲───────────────────┘
//!                 │ received frames             │ request frames
//!                 ▼ (unbounded channel)         │ (unbounded channel)
//! ┌─────────────────────────────────────────────┴───────────────────┐
//! │                  Render loop (foreground thread)                │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Correlator  │──▶│ Value Cache  │──▶│     TUI      │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! │         ▲                                      ▲                │
//! │         │ catalog lookup                       │ key presses    │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Catalog    │   │  Scheduler   │◀──│ State Machine│         │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘         │
//! │                                               │ commit          │
//! │                                        ┌──────▼───────┐         │
//! │                                        │ Active Set   │         │
//! │                                        │ (JSON file)  │         │
//! │                                        └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! ### Engine
//!
//! - [`catalog`]: ordered registry of signals and their decoders
//! - [`cache`]: latest decoded text per signal, plus unmatched responses
//! - [`store`]: the active signal set and its JSON persistence
//! - [`protocol`]: request encoding and response parsing
//! - [`correlator`]: routes received frames into the cache
//! - [`scheduler`]: emits requests for the on-screen signals
//! - [`state`]: View/Configure modes, cursor and scroll window
//! - [`session`]: owns all of the above for one run
//!
//! ### I/O
//!
//! - [`transport`]: the two-call bus boundary and its back-ends
//! - [`tui`]: render loop and widgets
//! - [`cli`]: command-line arguments
//! - [`domain`]: signal identity and error types
//!
//! ## Typical Usage
//!
//! ```bash
//! # Simulated ECU
//! diagscope --simulate
//!
//! # Replay a capture, logging to a file
//! diagscope --replay capture.log --log-file diagscope.log -v
//! ```
//!
//! ## Key Concepts
//!
//! - **Signal key**: `(node, service, parameter)`, the one identity used everywhere
//! - **Direction bit**: bit 3 of the address; set on responses
//! - **Active set**: the signals the operator chose to poll and display
//! - **Commit**: leaving Configure mode, which is the only time the set is saved

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod correlator;
pub mod domain;
pub mod protocol;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod store;
pub mod transport;
pub mod tui;
