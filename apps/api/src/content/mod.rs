// Content records: validation, persistence, the service that keeps the
// search index in step with writes, and the HTTP handlers on top.

pub mod handlers;
pub mod repository;
pub mod service;
pub mod validation;
