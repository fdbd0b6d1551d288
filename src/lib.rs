//! Declarative, dependency-resolved machine provisioning.
//!
//! A layered YAML description of named tasks, each bound to a script and an
//! optional function inside it, is resolved into the set of tasks that should
//! run and then executed concurrently in dependency order.
//!
//! The public API is organised into these layers:
//!
//! - **[`config`]**: load and normalize YAML, merge layers, the task field schema
//! - **[`scripts`]**: classify the top-level blocks of Bash and Python scripts
//! - **[`resolver`]**: turn configuration into an ordered list of runnable tasks
//! - **[`scheduler`]**: run resolved tasks on worker threads, honouring dependencies
//! - **[`commands`]**: top-level subcommand orchestration (`run`, `plan`, `check`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod resolver;
pub mod scheduler;
pub mod scripts;
