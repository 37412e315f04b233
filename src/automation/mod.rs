//! Screen-scraping share automation for a connected Android device.
//!
//! A flow is a chain of steps run by [`runner::FlowRunner`]; each step reads
//! a fresh [`tree::UiTree`] snapshot through a [`driver::UiDriver`], acts on
//! it, and schedules the next step after a settle delay.

pub mod adb;
pub mod driver;
pub mod gestures;
pub mod runner;
pub mod search;
pub mod strategies;
pub mod tree;
pub mod worker;

pub use adb::AdbDriver;
pub use driver::UiDriver;
pub use runner::{FlowRunner, Outcome};
pub use tree::{Bounds, NodeId, UiNode, UiTree};
pub use worker::{AutomationCommand, AutomationSession, AutomationWorker, ForegroundTracker};
