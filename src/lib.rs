//! # Lectern
//!
//! A lecture ingestion and summarization service.
//!
//! Lectern ingests lecture documents (PDF), splits them into overlapping
//! chunks stored in SQLite, and produces single-shot LLM summaries at a
//! requested word count. Summaries adapt to the dominant language of the
//! source material (English or Arabic) and are cached per
//! (lecture, word count) pair. Everything is exposed through a CLI (`lct`)
//! and a JSON HTTP API with token-based authentication.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────┐
//! │  Upload  │──▶│   Pipeline    │──▶│  SQLite   │
//! │   PDF    │   │ Extract+Chunk │   │  chunks   │
//! └──────────┘   └──────────────┘   └────┬─────┘
//!                                        │
//!                    ┌───────────────────┤
//!                    ▼                   ▼
//!               ┌──────────┐       ┌──────────┐
//!               │   CLI    │       │   HTTP   │
//!               │  (lct)   │       │  (JSON)  │
//!               └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lct init                                  # create database, seed admin
//! lct subject add "Operating Systems"
//! lct ingest notes/os-week3.pdf --title "Scheduling" --subject "Operating Systems"
//! lct summarize scheduling-1a2b3c4d --words 300
//! lct serve                                 # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Document text extraction |
//! | [`chunk`] | Recursive text chunking |
//! | [`ingest`] | Upload pipeline |
//! | [`retrieve`] | Chunk retrieval |
//! | [`summarize`] | Tiered prompts, language detection, summarizer client |
//! | [`auth`] | Passwords and signed bearer tokens |
//! | [`users`] | User account management |
//! | [`subjects`] | Subject management |
//! | [`lectures`] | Lecture listing and deletion |
//! | [`intro`] | Intro splash sequencing |
//! | [`bootstrap`] | One-shot git repository bootstrap |
//! | [`server`] | JSON HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations and seeding |

pub mod auth;
pub mod bootstrap;
pub mod chunk;
pub mod config;
pub mod db;
pub mod extract;
pub mod ingest;
pub mod intro;
pub mod lectures;
pub mod migrate;
pub mod models;
pub mod retrieve;
pub mod server;
pub mod subjects;
pub mod summarize;
pub mod users;
