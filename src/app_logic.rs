/*
 * This module provides the application logic layer, centered around
 * `SessionController`, which owns the session state and coordinates the
 * core stores, the preview cache and the print merge. `dispatch` is the
 * platform edge that hands finished artifacts to the OS.
 * Unit tests for `SessionController` are in `handler_tests.rs`.
 */
pub mod dispatch;
pub mod handler;


pub use handler::{
    AddRejection, AddReport, CollectionLoadReport, PrintOutcome, SessionController,
};
